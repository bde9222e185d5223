//! Configuration file support.
//!
//! `config.ini` is parsed with `rust-ini` into an immutable [`ConfigFile`].
//! Each section maps onto the config struct of the component it drives:
//!
//! | Section | Type |
//! |---|---|
//! | `[api]` | [`ApiConfig`](crate::provider::ApiConfig) |
//! | `[search]` | [`SearchConfig`](crate::provider::SearchConfig), [`IntervalResolver`](crate::targets::IntervalResolver) |
//! | `[order]` | [`OrderConfig`](crate::provider::OrderConfig) |
//! | `[samples]` | [`SampleConfig`](crate::samples::SampleConfig) |
//! | `[storage]` | [`StorageSettings`] |
//! | `[logging]` | [`LoggingSettings`] |
//!
//! Missing files and keys fall back to defaults; malformed values are
//! rejected with [`ConfigFileError::InvalidValue`].

mod file;
mod parser;
mod settings;

pub use file::{ConfigFileError, API_KEY_ENV};
pub use settings::{
    ConfigFile, LoggingSettings, StorageSettings, DEFAULT_DATA_DIR, DEFAULT_LOG_FILE,
    DEFAULT_TARGETS_DIR,
};
