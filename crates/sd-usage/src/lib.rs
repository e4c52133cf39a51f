mod error;
mod modes;
mod store;

pub use error::UsageError;
pub use modes::{
    aspect_key, definition_key, keyword_of, register_new, run_usage, Aspect, UsageCalculator,
    UsageMode, UsageOptions, UsageReport,
};
pub use store::{UsageKey, UsageKeyword, UsageStore};

#[cfg(test)]
mod tests;
