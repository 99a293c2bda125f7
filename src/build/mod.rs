pub mod cant;
pub mod control;
pub mod driver;
pub mod events;
pub mod geometry;
pub mod sections;

pub use self::control::{BuildControl, BuildPhase};
pub use self::driver::{build_route, spawn_build, BuildHandle, BuildOutcome};
