pub mod agenda;
pub mod classification;
pub mod segment;
pub mod speech;

pub use agenda::*;
pub use classification::*;
pub use segment::*;
pub use speech::*;
