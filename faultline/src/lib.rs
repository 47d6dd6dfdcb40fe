//! # faultline
//!
//! Structured errors that carry queryable metadata through wrapping chains.
//!
//! ## Design Philosophy
//!
//! - **ErrorClass**: What went wrong, mapped to an HTTP status
//! - **Category / Severity**: Where it happened and how bad it is
//! - **Fields**: Ordered key/value context for structured logs
//! - **Stack**: Captured once, redacted at render time by a [`StackTraceConfig`]
//! - **Chain**: Wrap any `std::error::Error`; metadata is read from the nearest link
//!
//! ## Usage
//!
//! ```rust
//! use faultline::{http_code, Error, ErrorClass, Opt};
//!
//! fn load_user(id: u64) -> faultline::Result<String> {
//!     Err(Error::build("user not found", [Opt::field("user_id", id)])
//!         .with_class(ErrorClass::NotFound))
//! }
//!
//! let err = load_user(123).unwrap_err();
//! let err = Error::wrap(err, "render profile");
//!
//! assert_eq!(err.to_string(), "render profile: user not found");
//! assert_eq!(err.class(), ErrorClass::NotFound);
//! assert_eq!(http_code(&err), 404);
//! ```
//!
//! ## Principles
//!
//! - Rendering never emits a detail the active config hides
//! - `Display` is the joined chain message and is never empty
//! - Foreign errors stay reachable through `source()`
//! - Process-wide defaults live in [`config`] and are safe for production

pub mod config;
pub mod log;

mod category;
mod class;
mod collect;
mod error;
mod field;
mod format;
mod gatherer;
mod options;
mod severity;
mod stack;
mod template;

pub use category::Category;
pub use class::ErrorClass;
pub use collect::{ErrorList, ErrorSet, KeyGetter, MultiError};
pub use config::ConfigError;
pub use error::{class_of, find_native, has_class, Chain, Error, Link, JOINER};
pub use field::Field;
pub use format::{
    http_code, http_code_of, log_fields, visible_fields, DefaultFormatter, Formatter, RenderMode,
};
pub use gatherer::{
    add_to_gatherer, clear_gatherer, disable_gathering, enable_gathering, gathered_errors,
    set_gatherer_key, Gatherer,
};
pub use log::{log_error, RenderOptions};
pub use options::Opt;
pub use severity::Severity;
pub use stack::{StackFrame, StackPreset, StackSnapshot, StackTraceConfig};
pub use template::{Template, TemplateError};

/// Result type alias using faultline Error
pub type Result<T> = std::result::Result<T, Error>;
