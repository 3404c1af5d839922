//! Account management module.
//!
//! Provides account configuration and validation.

mod model;
mod validation;

pub use model::{AccountConfig, DEFAULT_FOLDER};
pub use validation::{ValidationError, ValidationResult, validate_account, validate_settings};
