/// Newline delimited text.
pub mod lines;
