//! Text grammars: numbered agenda lines and the oracle's embedded result array.

pub mod agenda_lines;
pub mod oracle_array;

pub use agenda_lines::{parse_agenda_block, parse_agenda_line};
pub use oracle_array::{parse_entry, parse_oracle_array, ArrayParseError, OracleEntry};
