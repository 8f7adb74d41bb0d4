pub mod error;
pub mod formats;

pub use error::{ConverterError, ConverterResult};
pub use formats::{OutputFormat, rewrite_extension};
