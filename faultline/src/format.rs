//! Rendering errors for people, log pipelines, and HTTP layers

use std::error::Error as StdError;

use serde::Serialize;

use crate::category::Category;
use crate::class::ErrorClass;
use crate::config;
use crate::error::{class_of, Error};
use crate::field::Field;
use crate::severity::Severity;
use crate::stack::StackTraceConfig;

/// What a render call produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Joined chain messages only
    Simple,
    /// Messages, metadata, fields, and stack as multi-line text
    Full,
    /// One JSON object
    Json,
}

/// Turns an error chain into text.
///
/// Implementations must honor `cfg`: anything it hides stays hidden.
pub trait Formatter: Send + Sync {
    fn format(&self, err: &Error, mode: RenderMode, cfg: &StackTraceConfig) -> String;
}

/// The built-in text and JSON renderer
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFormatter;

impl Formatter for DefaultFormatter {
    fn format(&self, err: &Error, mode: RenderMode, cfg: &StackTraceConfig) -> String {
        match mode {
            RenderMode::Simple => err.to_string(),
            RenderMode::Full => full_text(err, cfg),
            RenderMode::Json => json(err, cfg),
        }
    }
}

impl Error {
    /// Render under the process default stack config
    pub fn render(&self, mode: RenderMode) -> String {
        self.render_with(mode, &config::default_stack_config())
    }

    /// Render under `cfg`, using the nearest per-link formatter override or
    /// the process default formatter
    pub fn render_with(&self, mode: RenderMode, cfg: &StackTraceConfig) -> String {
        match self.formatter() {
            Some(formatter) => formatter.format(self, mode, cfg),
            None => config::default_formatter().format(self, mode, cfg),
        }
    }
}

/// Fields of the chain, outer first, values redacted when `cfg` hides them
pub fn visible_fields(err: &Error, cfg: &StackTraceConfig) -> Vec<Field> {
    err.fields()
        .map(|field| {
            if cfg.show_fields {
                field.clone()
            } else {
                field.redacted(&cfg.function_redacted)
            }
        })
        .collect()
}

fn full_text(err: &Error, cfg: &StackTraceConfig) -> String {
    let class = err.class();
    let mut out = err.to_string();
    out.push_str(&format!("\n    class: {} ({})", class, class.http_code()));
    out.push_str(&format!("\n    category: {}", err.category()));
    out.push_str(&format!("\n    severity: {}", err.severity()));
    if let Some(id) = err.id() {
        out.push_str(&format!("\n    id: {}", id));
    }
    out.push_str(&format!("\n    retryable: {}", err.is_retryable()));

    let fields = visible_fields(err, cfg);
    if !fields.is_empty() {
        out.push_str("\n    fields:");
        for field in &fields {
            out.push_str(&format!("\n        {}", field));
        }
    }

    if let Some(stack) = err.stack() {
        for line in stack.format_full(cfg).lines() {
            out.push_str("\n    ");
            out.push_str(line);
        }
    }
    out
}

#[derive(Serialize)]
struct Report<'a> {
    message: String,
    chain: Vec<String>,
    class: ErrorClass,
    status: u16,
    category: Category,
    severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a str>,
    retryable: bool,
    fields: Vec<Field>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stack: Vec<String>,
}

fn json(err: &Error, cfg: &StackTraceConfig) -> String {
    let class = err.class();
    let report = Report {
        message: err.to_string(),
        chain: err.chain().map(|link| link.message()).collect(),
        class,
        status: class.http_code(),
        category: err.category(),
        severity: err.severity(),
        id: err.id(),
        retryable: err.is_retryable(),
        fields: visible_fields(err, cfg),
        frames: err.stack().map(|s| s.total(cfg)).filter(|n| *n > 0),
        stack: err.stack().map(|s| s.lines(cfg)).unwrap_or_default(),
    };

    serde_json::to_string(&report).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "json rendering failed, falling back to text");
        err.to_string()
    })
}

/// Flat key/value list for structured loggers.
///
/// Order is stable: `message`, `class`, `category`, `severity`, `id` (when
/// set), `retryable`, `span_id` (when set), every field outer first, and
/// `stack` when `cfg` renders one.
pub fn log_fields(err: &Error, cfg: &StackTraceConfig) -> Vec<Field> {
    let mut out = vec![
        Field::new("message", err.to_string()),
        Field::new("class", err.class().as_str()),
        Field::new("category", err.category().as_str()),
        Field::new("severity", err.severity().as_str()),
    ];
    if let Some(id) = err.id() {
        out.push(Field::new("id", id));
    }
    out.push(Field::new("retryable", err.is_retryable()));
    if let Some(span_id) = err.span().and_then(tracing::Span::id) {
        out.push(Field::new("span_id", span_id.into_u64()));
    }
    out.extend(visible_fields(err, cfg));
    if let Some(stack) = err.stack() {
        let rendered = stack.render(cfg);
        if !rendered.is_empty() {
            out.push(Field::new("stack", rendered));
        }
    }
    out
}

/// HTTP status for an error; 500 when no class is set
pub fn http_code(err: &Error) -> u16 {
    err.class().http_code()
}

/// HTTP status for any error, looking through foreign links for a class
pub fn http_code_of(err: &(dyn StdError + 'static)) -> u16 {
    class_of(err).unwrap_or_default().http_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Opt;
    use crate::stack::{StackFrame, StackSnapshot};
    use serde_json::Value;
    use std::sync::Arc;

    #[test]
    fn test_user_not_found_scenario() {
        let err = Error::build("user not found", [Opt::field("user_id", 123)])
            .with_class(ErrorClass::NotFound);
        assert_eq!(http_code(&err), 404);

        let fields = log_fields(&err, &StackTraceConfig::production());
        assert!(fields.contains(&Field::new("user_id", 123)));
        assert!(fields.contains(&Field::new("message", "user not found")));
        assert_eq!(fields[0].key, "message");
        assert_eq!(fields[1], Field::new("class", "NotFound"));
    }

    #[test]
    fn test_http_code_mapping() {
        assert_eq!(http_code(&Error::validation("bad email")), 400);
        assert_eq!(http_code(&Error::permission_denied("nope")), 403);
        assert_eq!(http_code(&Error::already_exists("dup")), 409);
        assert_eq!(http_code(&Error::new("plain")), 500);

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "raw");
        assert_eq!(http_code_of(&io_err), 500);
        let wrapped = Error::wrap(Error::not_found("x"), "outer");
        assert_eq!(http_code_of(&wrapped), 404);
    }

    #[test]
    fn test_full_text() {
        let inner = Error::new("row missing")
            .with_class(ErrorClass::NotFound)
            .with_field("table", "users");
        let err = Error::wrap(inner, "load profile")
            .with_id("req-1")
            .with_field("user_id", 7);

        let text = err.render_with(RenderMode::Full, &StackTraceConfig::production());
        assert_eq!(
            text,
            "load profile: row missing\n    class: NotFound (404)\n    category: General\n    \
             severity: error\n    id: req-1\n    retryable: false\n    fields:\n        \
             user_id: 7\n        table: users"
        );
    }

    #[test]
    fn test_json() {
        let err = Error::wrap(Error::new("timeout"), "call billing")
            .with_class(ErrorClass::Unavailable)
            .with_field("attempt", 2)
            .with_field("attempt", 3);

        let text = err.render_with(RenderMode::Json, &StackTraceConfig::production());
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["message"], "call billing: timeout");
        assert_eq!(value["class"], "Unavailable");
        assert_eq!(value["status"], 503);
        assert_eq!(value["chain"], serde_json::json!(["call billing", "timeout"]));
        assert_eq!(value["fields"].as_array().unwrap().len(), 2);
        assert_eq!(value["fields"][1]["value"], 3);
        assert!(value.get("id").is_none());
        assert!(value.get("stack").is_none());
        assert!(value.get("frames").is_none());
    }

    #[test]
    fn test_json_frame_count_matches_text() {
        let err = Error::new("x").with_stack_config(&StackTraceConfig::development());
        let Some(captured) = err.stack().map(StackSnapshot::len).filter(|n| *n > 0) else {
            return;
        };

        let strict = StackTraceConfig::strict();
        let value: Value =
            serde_json::from_str(&err.render_with(RenderMode::Json, &strict)).unwrap();
        assert_eq!(value["frames"], captured);
        assert!(value.get("stack").is_none());

        let text = err.render_with(RenderMode::Full, &strict);
        assert!(text.contains(&format!("stack trace: {} frames", captured)));
        let stack_field = Field::new("stack", format!("{} frames", captured));
        assert!(log_fields(&err, &strict).contains(&stack_field));

        let value: Value = serde_json::from_str(
            &err.render_with(RenderMode::Json, &StackTraceConfig::disabled()),
        )
        .unwrap();
        assert!(value.get("frames").is_none());
    }

    #[test]
    fn test_strict_redacts_fields_and_stack() {
        let err = Error::new("charge failed")
            .with_field("card_number", "4111111111111111");
        let text = err.render_with(RenderMode::Full, &StackTraceConfig::strict());
        assert!(!text.contains("4111111111111111"));
        assert!(text.contains("card_number: <redacted>"));

        let fields = log_fields(&err, &StackTraceConfig::strict());
        assert!(fields.contains(&Field::new("card_number", "<redacted>")));
    }

    #[test]
    fn test_render_is_idempotent() {
        let err = Error::new("x")
            .with_field("k", "v")
            .with_stack_config(&StackTraceConfig::development());
        let cfg = StackTraceConfig::production();
        assert_eq!(
            err.render_with(RenderMode::Full, &cfg),
            err.render_with(RenderMode::Full, &cfg)
        );
        assert_eq!(
            err.render_with(RenderMode::Json, &cfg),
            err.render_with(RenderMode::Json, &cfg)
        );
    }

    struct Shouting;

    impl Formatter for Shouting {
        fn format(&self, err: &Error, _mode: RenderMode, _cfg: &StackTraceConfig) -> String {
            err.to_string().to_uppercase()
        }
    }

    #[test]
    fn test_per_link_formatter() {
        let inner = Error::new("quiet").with_formatter(Arc::new(Shouting));
        let err = Error::wrap(inner, "outer");
        assert_eq!(err.render(RenderMode::Full), "OUTER: QUIET");
        assert_eq!(format!("{:#}", err), "OUTER: QUIET");
        assert_eq!(err.to_string(), "outer: quiet");
    }

    #[test]
    fn test_log_fields_stack_entry() {
        let snapshot = StackSnapshot::from_frames(vec![StackFrame::new(
            "shop::cart::checkout",
            Some("/srv/shop/src/cart.rs".to_string()),
            Some(10),
        )]);
        assert_eq!(
            snapshot.render(&StackTraceConfig::production()),
            "shop::<redacted> at cart.rs:10"
        );

        let err = Error::new("x").with_stack_config(&StackTraceConfig::disabled());
        let fields = log_fields(&err, &StackTraceConfig::production());
        assert!(fields.iter().all(|f| f.key != "stack"));

        let err = Error::new("x").with_stack_config(&StackTraceConfig::development());
        let captured = err.stack().map_or(false, |s| !s.is_empty());
        let fields = log_fields(&err, &StackTraceConfig::production());
        assert_eq!(fields.iter().any(|f| f.key == "stack"), captured);
        let fields = log_fields(&err, &StackTraceConfig::disabled());
        assert!(fields.iter().all(|f| f.key != "stack"));
    }
}
