pub mod config;
pub mod errors;
pub mod systems;

pub use errors::{Anomaly, EngineError, EngineResult};
pub use systems::engine::{Plan, SubdivisionEngine, SubdivisionPlugin};
pub use systems::params::{validate, validate_reporting, Parameters, RawValue};
