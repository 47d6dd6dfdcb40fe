//! Process-wide defaults
//!
//! Each setting lives in its own slot: an `RwLock` for values, an atomic for
//! flags. Setters take effect for every call made after they return; strings
//! that were already rendered are not touched.
//!
//! Defaults are safe for production logs: the production stack preset, no
//! automatic stack capture, the [`DefaultFormatter`].
//!
//! Call [`reset`] to restore every slot, the gatherer included. Tests that
//! change global state should hold their own lock around it, since the test
//! harness runs tests in parallel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::format::{DefaultFormatter, Formatter};
use crate::gatherer;
use crate::stack::{StackPreset, StackTraceConfig};

/// Environment variable holding a stack preset name
pub const STACK_ENV: &str = "FAULTLINE_STACK";

/// Environment variable enabling the gatherer
pub const GATHER_ENV: &str = "FAULTLINE_GATHER";

/// Errors raised while reading configuration
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown stack preset '{0}'")]
    UnknownPreset(String),

    #[error("invalid value '{value}' for {var}, expected a boolean")]
    InvalidFlag { var: &'static str, value: String },
}

static DEFAULT_STACK: Lazy<RwLock<StackTraceConfig>> =
    Lazy::new(|| RwLock::new(StackTraceConfig::production()));

static DEFAULT_FORMATTER: Lazy<RwLock<Arc<dyn Formatter>>> =
    Lazy::new(|| RwLock::new(Arc::new(DefaultFormatter)));

static AUTO_CAPTURE: AtomicBool = AtomicBool::new(false);

// =============================================================================
// Stack config
// =============================================================================

/// The stack config used when a render call does not supply one
pub fn default_stack_config() -> StackTraceConfig {
    DEFAULT_STACK
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn set_default_stack_config(cfg: StackTraceConfig) {
    tracing::debug!(enabled = cfg.enabled, "default stack config replaced");
    *DEFAULT_STACK.write().unwrap_or_else(PoisonError::into_inner) = cfg;
}

pub fn set_stack_preset(preset: StackPreset) {
    set_default_stack_config(preset.config());
}

/// Whether `Error::new` captures a stack without an explicit directive
pub fn auto_capture() -> bool {
    AUTO_CAPTURE.load(Ordering::Acquire)
}

pub fn set_auto_capture(on: bool) {
    tracing::debug!(on, "stack auto-capture toggled");
    AUTO_CAPTURE.store(on, Ordering::Release);
}

// =============================================================================
// Formatter
// =============================================================================

/// The formatter used for errors without a per-node override
pub fn default_formatter() -> Arc<dyn Formatter> {
    DEFAULT_FORMATTER
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn set_default_formatter(formatter: Arc<dyn Formatter>) {
    tracing::debug!("default formatter replaced");
    *DEFAULT_FORMATTER.write().unwrap_or_else(PoisonError::into_inner) = formatter;
}

pub fn reset_default_formatter() {
    set_default_formatter(Arc::new(DefaultFormatter));
}

// =============================================================================
// Environment
// =============================================================================

/// Apply [`STACK_ENV`] and [`GATHER_ENV`] from the process environment.
///
/// Unset variables leave the current value alone.
pub fn init_from_env() -> Result<(), ConfigError> {
    init_from(|var| std::env::var(var).ok())
}

/// Like [`init_from_env`] with a custom variable lookup
pub fn init_from<F>(lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    // Parse both before applying either
    let preset = lookup(STACK_ENV)
        .map(|value| value.parse::<StackPreset>())
        .transpose()?;
    let gather = lookup(GATHER_ENV)
        .map(|value| parse_flag(GATHER_ENV, &value))
        .transpose()?;

    if let Some(preset) = preset {
        set_stack_preset(preset);
    }
    match gather {
        Some(true) => gatherer::enable_gathering(),
        Some(false) => gatherer::disable_gathering(),
        None => {}
    }
    Ok(())
}

fn parse_flag(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: value.to_string(),
        }),
    }
}

/// Restore every process-wide slot to its initial state
pub fn reset() {
    set_default_stack_config(StackTraceConfig::production());
    set_auto_capture(false);
    reset_default_formatter();
    gatherer::Gatherer::global().reset();
}
