pub mod controller;
pub mod records;

pub use controller::*;
pub use records::*;
