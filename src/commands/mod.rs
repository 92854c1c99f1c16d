//! Binary command protocol: frame parsing, response serialisation and
//! the shared types

pub mod parser;
pub mod serialiser;
pub mod types;

pub use parser::CommandParser;
pub use serialiser::{ResponseId, ResponseSerialiser};
pub use types::{Command, CommandId, Response, ResponseStatus};
