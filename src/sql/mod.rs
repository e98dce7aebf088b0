//! SQL text generation.

mod command;
pub mod formatter;

pub use command::{CommandParameter, FormatResult, ParameterSource, SqlCommand, TypedValue};
pub use formatter::{format, SqlFormatter};
