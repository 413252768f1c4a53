// geometry helpers shared by the pipeline stages

pub mod buffer;
pub mod subdivision;
pub mod triangulate;
pub mod utils;
