pub mod engine;
pub mod export;
pub mod input;
pub mod params;
