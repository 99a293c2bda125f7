use std::collections::HashMap;
use std::f64::INFINITY;

use diag::Diagnostics;

pub type ObjectHandle = usize;
pub type SoundHandle = usize;
pub type BackgroundHandle = usize;

/// Resolves resource paths named by list files into handles. Loading the
/// actual mesh/buffer happens outside this crate; a `None` means the
/// resource could not be produced and the record is skipped.
pub trait ResourceLoader {
    fn object(&mut self, path: &str) -> Option<ObjectHandle>;
    fn sound(&mut self, path: &str) -> Option<SoundHandle>;
}

/// String-keyed side table. Keys compare case-insensitively and the most
/// recent declaration of a key wins, with a warning on the collision.
#[derive(Debug, Clone)]
pub struct KeyTable<T> {
    kind: &'static str,
    entries: HashMap<String, T>,
}

impl<T> KeyTable<T> {
    pub fn new(kind: &'static str) -> KeyTable<T> {
        KeyTable { kind: kind, entries: HashMap::new() }
    }

    pub fn insert(&mut self, key: &str, value: T, diag: &mut Diagnostics) {
        if self.entries.insert(key.to_lowercase(), value).is_some() {
            diag.warning(format!(
                "The {} {} has been declared twice: the most recent declaration is used",
                self.kind, key
            ));
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.get(&key.to_lowercase())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        self.entries.get_mut(&key.to_lowercase())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One signal family: aspect numbers with the head object shown for each.
/// A missing object keeps its slot so numbering stays aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalData {
    pub key: String,
    pub numbers: Vec<i32>,
    pub objects: Vec<Option<ObjectHandle>>,
}

/// Speed limit for a signal aspect number. Aspects outside the table
/// impose no limit.
pub fn aspect_speed(speeds: &[f64], aspect: i32) -> f64 {
    if aspect >= 0 && (aspect as usize) < speeds.len() {
        speeds[aspect as usize]
    } else {
        INFINITY
    }
}

fn fields(line: &str) -> Vec<&str> {
    line.split(',').map(|f| f.trim()).collect()
}

fn is_record(line: &str) -> bool {
    !line.is_empty() && !line.starts_with('#') && !line.starts_with("BveTs")
}

/// Structure list: `key, path` per line. Records whose object fails to
/// load are skipped with a warning.
pub fn load_structure_list(
    content: &str,
    loader: &mut dyn ResourceLoader,
    diag: &mut Diagnostics,
) -> KeyTable<ObjectHandle> {
    let mut table = KeyTable::new("structure");
    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if !is_record(line) {
            continue;
        }
        let f = fields(line);
        if f.len() < 2 || f[0].is_empty() {
            diag.warning(format!("Structure list line {}: expected key and path", lineno + 1));
            continue;
        }
        match loader.object(f[1]) {
            Some(handle) => table.insert(f[0], handle, diag),
            None => diag.warning(format!("The object {} could not be found", f[1])),
        }
    }
    table
}

/// Sound list: `key, path` per line, resolved to sound buffers.
pub fn load_sound_list(
    content: &str,
    loader: &mut dyn ResourceLoader,
    diag: &mut Diagnostics,
) -> KeyTable<SoundHandle> {
    let mut table = KeyTable::new("sound");
    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if !is_record(line) {
            continue;
        }
        let f = fields(line);
        if f.len() < 2 || f[0].is_empty() {
            diag.warning(format!("Sound list line {}: expected key and path", lineno + 1));
            continue;
        }
        match loader.sound(f[1]) {
            Some(handle) => table.insert(f[0], handle, diag),
            None => diag.warning(format!("The sound {} could not be found", f[1])),
        }
    }
    table
}

/// Signal list: `key, aspect number, object key` per line. Lines sharing a
/// key extend the same signal family; object keys resolve against the
/// structure table and missing ones leave an empty slot.
pub fn load_signal_list(
    content: &str,
    objects: &KeyTable<ObjectHandle>,
    diag: &mut Diagnostics,
) -> KeyTable<SignalData> {
    let mut table: KeyTable<SignalData> = KeyTable::new("signal");
    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if !is_record(line) {
            continue;
        }
        let f = fields(line);
        if f.len() < 3 || f[0].is_empty() {
            diag.warning(format!(
                "Signal list line {}: expected key, aspect number and object key",
                lineno + 1
            ));
            continue;
        }
        let number = match f[1].parse::<i32>() {
            Ok(n) => n,
            Err(_) => {
                diag.warning(format!(
                    "Signal list line {}: {} is not a valid aspect number",
                    lineno + 1,
                    f[1]
                ));
                continue;
            }
        };
        let object = objects.get(f[2]).cloned();
        if object.is_none() {
            diag.warning(format!("The signal object {} could not be found", f[2]));
        }
        if let Some(sig) = table.get_mut(f[0]) {
            sig.numbers.push(number);
            sig.objects.push(object);
            continue;
        }
        let sig = SignalData {
            key: f[0].to_string(),
            numbers: vec![number],
            objects: vec![object],
        };
        table.insert(f[0], sig, diag);
    }
    table
}
