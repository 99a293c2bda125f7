extern crate nalgebra;
extern crate smallvec;
extern crate ordered_float;
extern crate regex;
extern crate failure;
#[macro_use] extern crate failure_derive;
#[macro_use] extern crate log;
extern crate serde;
extern crate serde_json;
#[cfg(test)]
extern crate approx;

pub mod geom;
pub mod diag;
pub mod input;
pub mod track;
pub mod build;
pub mod output;

pub use build::{spawn_build, BuildControl, BuildHandle, BuildOutcome, BuildPhase};
pub use diag::Diagnostics;
pub use input::blocks::RouteData;
pub use track::Route;

use std::path::Path;
pub type AppResult<T> = Result<T, failure::Error>;

pub fn read_file(f :&Path) -> AppResult<String> {
  use std::fs::File;
  use std::io::prelude::*;
  use std::io::BufReader;

  let file = File::open(f)?;
  let mut file = BufReader::new(&file);
  let mut contents = String::new();
  file.read_to_string(&mut contents)?;
  Ok(contents)
}

use input::stations;
use input::tables;

pub fn get_structures(
    s :&Path,
    loader: &mut dyn tables::ResourceLoader,
    diag: &mut Diagnostics,
) -> AppResult<tables::KeyTable<tables::ObjectHandle>> {
    let contents = read_file(s)?;
    Ok(tables::load_structure_list(&contents, loader, diag))
}

pub fn get_sounds(
    s :&Path,
    loader: &mut dyn tables::ResourceLoader,
    diag: &mut Diagnostics,
) -> AppResult<tables::KeyTable<tables::SoundHandle>> {
    let contents = read_file(s)?;
    Ok(tables::load_sound_list(&contents, loader, diag))
}

pub fn get_signals(
    s :&Path,
    objects: &tables::KeyTable<tables::ObjectHandle>,
    diag: &mut Diagnostics,
) -> AppResult<tables::KeyTable<tables::SignalData>> {
    let contents = read_file(s)?;
    Ok(tables::load_signal_list(&contents, objects, diag))
}

pub fn get_stations(
    s :&Path,
    sounds: &tables::KeyTable<tables::SoundHandle>,
    diag: &mut Diagnostics,
) -> AppResult<Vec<stations::Station>> {
    let contents = read_file(s)?;
    Ok(stations::parse_station_list(&contents, sounds, diag))
}
