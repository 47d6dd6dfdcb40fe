//! Stack capture and redacted rendering
//!
//! A [`StackSnapshot`] is captured once, when an error is constructed, and is
//! never modified afterwards. What it reveals is decided later, at render
//! time, by a [`StackTraceConfig`]. The same snapshot can therefore be shown
//! in full on a developer machine and as a bare frame count in production.

use std::fmt;
use std::str::FromStr;

use crate::config::{self, ConfigError};

/// Frames shown when `show_all_code_frames` is off
pub const SUMMARY_FRAMES: usize = 3;

/// Default cap on captured and rendered frames
pub const DEFAULT_MAX_FRAMES: usize = 32;

/// Text substituted for hidden function names
pub const DEFAULT_REDACTION: &str = "<redacted>";

/// Module prefixes whose frames belong to the capture machinery itself
const INTERNAL_PREFIXES: &[&str] = &[
    "backtrace::",
    "faultline::stack::",
    "faultline::error::",
    "faultline::options::",
    "faultline::template::",
];

// =============================================================================
// Config
// =============================================================================

/// Controls what a rendered stack trace reveals.
///
/// This is a plain value: build one from a preset, tweak fields, and pass it
/// to a render call or install it as the process default with
/// [`config::set_default_stack_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTraceConfig {
    /// Capture and render at all
    pub enabled: bool,
    /// Absolute paths instead of the trailing `path_elements` components
    pub show_full_paths: bool,
    pub show_function_names: bool,
    pub show_package_names: bool,
    pub show_line_numbers: bool,
    /// List every frame instead of the first [`SUMMARY_FRAMES`]
    pub show_all_code_frames: bool,
    /// Path components kept when `show_full_paths` is off; 0 hides paths
    pub path_elements: usize,
    /// Replacement text for function names that are hidden
    pub function_redacted: String,
    /// Cap on frames captured and shown
    pub max_frames: usize,
    /// Innermost caller frames dropped at capture time
    pub skip_frames: usize,
    /// Render field values; when off they are replaced by `function_redacted`
    pub show_fields: bool,
}

impl StackTraceConfig {
    /// Everything visible
    pub fn development() -> Self {
        Self {
            enabled: true,
            show_full_paths: true,
            show_function_names: true,
            show_package_names: true,
            show_line_numbers: true,
            show_all_code_frames: true,
            path_elements: 0,
            function_redacted: DEFAULT_REDACTION.to_string(),
            max_frames: DEFAULT_MAX_FRAMES,
            skip_frames: 0,
            show_fields: true,
        }
    }

    /// File base names, line numbers, and packages; function names redacted
    pub fn production() -> Self {
        Self {
            enabled: true,
            show_full_paths: false,
            show_function_names: false,
            show_package_names: true,
            show_line_numbers: true,
            show_all_code_frames: false,
            path_elements: 1,
            function_redacted: DEFAULT_REDACTION.to_string(),
            max_frames: DEFAULT_MAX_FRAMES,
            skip_frames: 0,
            show_fields: true,
        }
    }

    /// Frame counts only; field values redacted
    pub fn strict() -> Self {
        Self {
            enabled: true,
            show_full_paths: false,
            show_function_names: false,
            show_package_names: false,
            show_line_numbers: false,
            show_all_code_frames: false,
            path_elements: 0,
            function_redacted: DEFAULT_REDACTION.to_string(),
            max_frames: DEFAULT_MAX_FRAMES,
            skip_frames: 0,
            show_fields: false,
        }
    }

    /// No capture, nothing rendered
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            max_frames: 0,
            ..Self::strict()
        }
    }
}

impl Default for StackTraceConfig {
    fn default() -> Self {
        Self::production()
    }
}

/// Named presets, parseable from configuration text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackPreset {
    Development,
    Production,
    Strict,
    Disabled,
}

impl StackPreset {
    pub fn config(&self) -> StackTraceConfig {
        match self {
            StackPreset::Development => StackTraceConfig::development(),
            StackPreset::Production => StackTraceConfig::production(),
            StackPreset::Strict => StackTraceConfig::strict(),
            StackPreset::Disabled => StackTraceConfig::disabled(),
        }
    }
}

impl FromStr for StackPreset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(StackPreset::Development),
            "production" | "prod" => Ok(StackPreset::Production),
            "strict" => Ok(StackPreset::Strict),
            "disabled" | "off" | "none" => Ok(StackPreset::Disabled),
            _ => Err(ConfigError::UnknownPreset(s.to_string())),
        }
    }
}

// =============================================================================
// Frames
// =============================================================================

/// One captured call frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackFrame {
    /// Demangled path without the trailing hash, e.g. `app::db::load`
    pub function: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// First segment of the function path
    pub package: String,
}

impl StackFrame {
    pub fn new(
        function: impl Into<String>,
        file: Option<String>,
        line: Option<u32>,
    ) -> Self {
        let function = strip_hash(&function.into()).to_string();
        let package = package_of(&function).to_string();
        Self {
            function,
            file,
            line,
            package,
        }
    }

    fn from_symbol(symbol: &backtrace::BacktraceSymbol) -> Option<Self> {
        let name = symbol.name()?;
        Some(Self::new(
            format!("{:#}", name),
            symbol.filename().map(|p| p.display().to_string()),
            symbol.lineno(),
        ))
    }

    /// Render under `cfg`; `None` when the config hides every detail
    fn render(&self, cfg: &StackTraceConfig) -> Option<String> {
        let label = match (cfg.show_function_names, cfg.show_package_names) {
            (true, true) => Some(self.function.clone()),
            (true, false) => Some(strip_package(&self.function).to_string()),
            (false, true) => Some(format!("{}::{}", self.package, cfg.function_redacted)),
            (false, false) => None,
        };

        let path = self.file.as_deref().and_then(|f| display_path(f, cfg));
        let location = match (path, self.line.filter(|_| cfg.show_line_numbers)) {
            (Some(path), Some(line)) => Some(format!("{}:{}", path, line)),
            (Some(path), None) => Some(path),
            (None, Some(line)) => Some(format!("line {}", line)),
            (None, None) => None,
        };

        match (label, location) {
            (Some(label), Some(location)) => Some(format!("{} at {}", label, location)),
            (Some(label), None) => Some(label),
            (None, Some(location)) => Some(location),
            (None, None) => None,
        }
    }
}

fn strip_hash(name: &str) -> &str {
    match name.rfind("::h") {
        Some(idx)
            if name.len() - idx == 19
                && name[idx + 3..].chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            &name[..idx]
        }
        _ => name,
    }
}

fn package_of(function: &str) -> &str {
    let trimmed = function.trim_start_matches('<');
    trimmed.split("::").next().unwrap_or(trimmed)
}

fn strip_package(function: &str) -> &str {
    let trimmed = function.trim_start_matches('<');
    match trimmed.find("::") {
        Some(idx) => &trimmed[idx + 2..],
        None => trimmed,
    }
}

fn display_path(file: &str, cfg: &StackTraceConfig) -> Option<String> {
    if cfg.show_full_paths {
        return Some(file.to_string());
    }
    if cfg.path_elements == 0 {
        return None;
    }
    let parts: Vec<&str> = file
        .split(|c| c == '/' || c == '\\')
        .filter(|p| !p.is_empty())
        .collect();
    let start = parts.len().saturating_sub(cfg.path_elements);
    Some(parts[start..].join("/"))
}

fn is_internal(function: &str) -> bool {
    let name = function.trim_start_matches('<');
    !name.contains("::tests::") && INTERNAL_PREFIXES.iter().any(|p| name.starts_with(p))
}

// =============================================================================
// Snapshot
// =============================================================================

/// Frames captured at error construction, innermost first
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackSnapshot {
    frames: Vec<StackFrame>,
}

impl StackSnapshot {
    /// Capture the current call stack under `cfg`.
    ///
    /// Returns `None` when `cfg.enabled` is false, so disabled configs never
    /// pay for a stack walk.
    pub fn capture(cfg: &StackTraceConfig) -> Option<Self> {
        if !cfg.enabled || cfg.max_frames == 0 {
            return None;
        }

        let bt = backtrace::Backtrace::new();
        let frames = bt
            .frames()
            .iter()
            .flat_map(|frame| frame.symbols())
            .filter_map(StackFrame::from_symbol)
            .skip_while(|frame| is_internal(&frame.function))
            .skip(cfg.skip_frames)
            .take(cfg.max_frames)
            .collect();

        Some(Self { frames })
    }

    /// Build a snapshot from frames obtained elsewhere
    pub fn from_frames(frames: Vec<StackFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames counted under `cfg`; 0 when disabled
    pub(crate) fn total(&self, cfg: &StackTraceConfig) -> usize {
        if !cfg.enabled {
            return 0;
        }
        self.frames.len().min(cfg.max_frames)
    }

    /// Frame total under `cfg` and the rendered lines that are listed
    fn visible(&self, cfg: &StackTraceConfig) -> (usize, Vec<String>) {
        let total = self.total(cfg);
        let listed = if cfg.show_all_code_frames {
            total
        } else {
            total.min(SUMMARY_FRAMES)
        };
        let lines = self.frames[..listed]
            .iter()
            .filter_map(|frame| frame.render(cfg))
            .collect();
        (total, lines)
    }

    /// Single-line summary
    pub fn render(&self, cfg: &StackTraceConfig) -> String {
        if !cfg.enabled || self.frames.is_empty() {
            return String::new();
        }

        let (total, lines) = self.visible(cfg);
        match lines.first() {
            Some(first) if total > 1 => format!("{} (+{} more frames)", first, total - 1),
            Some(first) => first.clone(),
            None => format!("{} frames", total),
        }
    }

    /// Multi-line dump, one frame per line
    pub fn format_full(&self, cfg: &StackTraceConfig) -> String {
        if !cfg.enabled || self.frames.is_empty() {
            return String::new();
        }

        let (total, lines) = self.visible(cfg);
        if lines.is_empty() {
            return format!("stack trace: {} frames (details redacted)", total);
        }

        let mut out = format!("stack trace ({} frames):", total);
        for (i, line) in lines.iter().enumerate() {
            out.push_str(&format!("\n    #{} {}", i, line));
        }
        if lines.len() < total {
            out.push_str(&format!("\n    ... {} more frames", total - lines.len()));
        }
        out
    }

    /// Rendered frame lines for structured output
    pub(crate) fn lines(&self, cfg: &StackTraceConfig) -> Vec<String> {
        if !cfg.enabled {
            return Vec::new();
        }
        self.visible(cfg).1
    }
}

impl fmt::Display for StackSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cfg = config::default_stack_config();
        if f.alternate() {
            f.write_str(&self.format_full(&cfg))
        } else {
            f.write_str(&self.render(&cfg))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StackSnapshot {
        StackSnapshot::from_frames(vec![
            StackFrame::new(
                "billing::charge::submit_payment::h0123456789abcdef",
                Some("/home/dev/billing/src/charge.rs".to_string()),
                Some(42),
            ),
            StackFrame::new(
                "billing::api::handle",
                Some("/home/dev/billing/src/api.rs".to_string()),
                Some(7),
            ),
            StackFrame::new(
                "tokio::runtime::task::poll",
                Some("/root/.cargo/registry/tokio/src/task.rs".to_string()),
                Some(300),
            ),
            StackFrame::new("std::rt::lang_start", None, None),
        ])
    }

    #[test]
    fn test_frame_parsing() {
        let binding = sample();
        let frame = &binding.frames()[0];
        assert_eq!(frame.function, "billing::charge::submit_payment");
        assert_eq!(frame.package, "billing");
    }

    #[test]
    fn test_development_shows_everything() {
        let out = sample().format_full(&StackTraceConfig::development());
        assert!(out.contains("billing::charge::submit_payment at /home/dev/billing/src/charge.rs:42"));
        assert!(out.contains("std::rt::lang_start"));
        assert!(!out.contains("more frames"));
    }

    #[test]
    fn test_production_redacts_functions() {
        let out = sample().format_full(&StackTraceConfig::production());
        assert!(out.contains("billing::<redacted> at charge.rs:42"));
        assert!(!out.contains("submit_payment"));
        assert!(!out.contains("/home/dev"));
        assert!(out.contains("... 1 more frames"));
    }

    #[test]
    fn test_strict_is_count_only() {
        let snap = sample();
        let cfg = StackTraceConfig::strict();
        assert_eq!(snap.render(&cfg), "4 frames");
        assert_eq!(snap.format_full(&cfg), "stack trace: 4 frames (details redacted)");
    }

    #[test]
    fn test_strict_never_leaks_development_details() {
        let snap = sample();
        let strict = snap.format_full(&StackTraceConfig::strict())
            + &snap.render(&StackTraceConfig::strict());
        for frame in snap.frames() {
            assert!(!strict.contains(&frame.function));
            if let Some(file) = &frame.file {
                assert!(!strict.contains(file.as_str()));
            }
        }
    }

    #[test]
    fn test_disabled_renders_nothing() {
        let snap = sample();
        assert_eq!(snap.render(&StackTraceConfig::disabled()), "");
        assert_eq!(snap.format_full(&StackTraceConfig::disabled()), "");
        assert!(StackSnapshot::capture(&StackTraceConfig::disabled()).is_none());
    }

    #[test]
    fn test_single_line_summary() {
        let out = sample().render(&StackTraceConfig::development());
        assert_eq!(
            out,
            "billing::charge::submit_payment at /home/dev/billing/src/charge.rs:42 (+3 more frames)"
        );
    }

    #[test]
    fn test_path_elements() {
        let cfg = StackTraceConfig {
            path_elements: 2,
            ..StackTraceConfig::production()
        };
        let out = sample().render(&cfg);
        assert!(out.starts_with("billing::<redacted> at src/charge.rs:42"));
    }

    #[test]
    fn test_hidden_package_strips_prefix() {
        let cfg = StackTraceConfig {
            show_package_names: false,
            ..StackTraceConfig::development()
        };
        let out = sample().render(&cfg);
        assert!(out.starts_with("charge::submit_payment at"));
    }

    #[test]
    fn test_max_frames_caps_render() {
        let cfg = StackTraceConfig {
            max_frames: 2,
            ..StackTraceConfig::development()
        };
        let out = sample().format_full(&cfg);
        assert!(out.starts_with("stack trace (2 frames):"));
        assert!(!out.contains("tokio"));
    }

    #[test]
    fn test_render_is_idempotent() {
        let snap = sample();
        let cfg = StackTraceConfig::production();
        assert_eq!(snap.format_full(&cfg), snap.format_full(&cfg));
        assert_eq!(snap.render(&cfg), snap.render(&cfg));
    }

    #[test]
    fn test_capture_respects_max_frames() {
        let cfg = StackTraceConfig {
            max_frames: 4,
            ..StackTraceConfig::development()
        };
        let snap = StackSnapshot::capture(&cfg).expect("enabled config captures");
        assert!(snap.len() <= 4);
        assert!(snap.frames().iter().all(|f| !f.function.starts_with("backtrace::")));
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("Production".parse::<StackPreset>().unwrap(), StackPreset::Production);
        assert_eq!("off".parse::<StackPreset>().unwrap(), StackPreset::Disabled);
        assert!("verbose".parse::<StackPreset>().is_err());
    }
}
