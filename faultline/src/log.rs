//! Adapter toward structured loggers
//!
//! [`log_error`] hands a message and a flat field list to any sink closure.
//! [`emit`] is the built-in sink that turns an error into a `tracing` event
//! at the level its severity maps to.

use tracing::Level;

use crate::config;
use crate::error::Error;
use crate::field::Field;
use crate::format::log_fields;
use crate::stack::StackTraceConfig;

/// Per-call rendering knobs for the logging adapter
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Config to render under; `None` uses the process default
    pub stack_config: Option<StackTraceConfig>,
    /// Keep the `stack` entry in the field list
    pub include_stack: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            stack_config: None,
            include_stack: true,
        }
    }
}

impl RenderOptions {
    pub fn with_stack_config(mut self, cfg: StackTraceConfig) -> Self {
        self.stack_config = Some(cfg);
        self
    }

    pub fn without_stack(mut self) -> Self {
        self.include_stack = false;
        self
    }
}

/// Call `sink(message, fields)` once for `err`; never for `None`
pub fn log_error<F>(err: Option<&Error>, sink: F, opts: &RenderOptions)
where
    F: FnOnce(&str, &[Field]),
{
    let Some(err) = err else {
        return;
    };

    let cfg = match &opts.stack_config {
        Some(cfg) => cfg.clone(),
        None => config::default_stack_config(),
    };
    let mut fields = log_fields(err, &cfg);
    if !opts.include_stack {
        fields.retain(|f| f.key != "stack");
    }
    sink(&err.to_string(), &fields);
}

/// Emit `err` as a `tracing` event under the process default config
pub fn emit(err: &Error) {
    emit_with(err, &RenderOptions::default());
}

pub fn emit_with(err: &Error, opts: &RenderOptions) {
    let level = err.severity().level();
    log_error(
        Some(err),
        |message, fields| {
            let details = fields
                .iter()
                .filter(|f| f.key != "message")
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            let class = err.class().as_str();
            let status = err.class().http_code();

            if level == Level::ERROR {
                tracing::error!(class, status, details = %details, "{}", message);
            } else if level == Level::WARN {
                tracing::warn!(class, status, details = %details, "{}", message);
            } else {
                tracing::info!(class, status, details = %details, "{}", message);
            }
        },
        opts,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ErrorClass;

    #[test]
    fn test_none_never_calls_sink() {
        let mut calls = 0;
        log_error(None, |_, _| calls += 1, &RenderOptions::default());
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_sink_called_once() {
        let err = Error::wrap(Error::new("no rows"), "load user")
            .with_class(ErrorClass::NotFound)
            .with_field("user_id", 9);

        let mut seen = Vec::new();
        log_error(
            Some(&err),
            |message, fields| seen.push((message.to_string(), fields.to_vec())),
            &RenderOptions::default().with_stack_config(StackTraceConfig::production()),
        );

        assert_eq!(seen.len(), 1);
        let (message, fields) = &seen[0];
        assert_eq!(message, "load user: no rows");
        assert_eq!(fields[0], Field::new("message", "load user: no rows"));
        assert!(fields.contains(&Field::new("class", "NotFound")));
        assert!(fields.contains(&Field::new("user_id", 9)));
    }

    #[test]
    fn test_without_stack() {
        let err = Error::new("x").with_stack_config(&StackTraceConfig::development());
        let opts = RenderOptions::default()
            .with_stack_config(StackTraceConfig::development())
            .without_stack();
        log_error(
            Some(&err),
            |_, fields| assert!(fields.iter().all(|f| f.key != "stack")),
            &opts,
        );
    }

    #[test]
    fn test_strict_options_redact() {
        let err = Error::new("charge failed").with_field("card", "4242");
        let opts = RenderOptions::default().with_stack_config(StackTraceConfig::strict());
        log_error(
            Some(&err),
            |_, fields| assert!(fields.contains(&Field::new("card", "<redacted>"))),
            &opts,
        );
    }
}
