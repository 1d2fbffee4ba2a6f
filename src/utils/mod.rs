pub mod command;
pub mod scratch;
