pub mod error;
pub mod raw;
pub mod types;

pub use error::SchemaError;
pub use raw::*;
pub use types::*;
