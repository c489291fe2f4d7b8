pub mod orchestrator;
pub mod summary;

pub use orchestrator::*;
pub use summary::*;
