//! The main Error type for faultline

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::category::Category;
use crate::class::ErrorClass;
use crate::config;
use crate::field::Field;
use crate::format::{Formatter, RenderMode};
use crate::options::{generate_id, Folded, Opt};
use crate::severity::Severity;
use crate::stack::{StackSnapshot, StackTraceConfig};

/// Separator placed between the messages of a chain
pub const JOINER: &str = ": ";

/// One link in an error chain.
///
/// Every link carries its own message and metadata and exclusively owns the
/// error it wraps:
/// - `class`: routing taxonomy, mapped to HTTP status codes
/// - `category`: informational domain tag
/// - `severity`: how bad it is
/// - `id`: correlation key
/// - `retryable`: retry hint
/// - `fields`: ordered key/value pairs, duplicates allowed
/// - `stack`: call frames captured at construction, rendered under a redaction config
/// - `cause`: the wrapped error, native or foreign
///
/// Chain-level accessors ([`Error::class`], [`Error::severity`], ...) walk from
/// this link towards the root and return the first value that was set
/// explicitly, falling back to a documented default.
///
/// Builders consume `self`. Once an error is shared (for example inside an
/// `Arc` in a collection) it can no longer be changed.
///
/// # Example
///
/// ```rust
/// use faultline::{Error, ErrorClass, Opt, Severity};
///
/// let root = Error::build("row missing", [Opt::field("table", "users")])
///     .with_class(ErrorClass::NotFound);
/// let err = Error::wrap(root, "load profile")
///     .with_severity(Severity::Warning)
///     .with_field("user_id", 42);
///
/// assert_eq!(err.to_string(), "load profile: row missing");
/// assert_eq!(err.class(), ErrorClass::NotFound);
/// assert_eq!(err.fields().count(), 2);
/// ```
pub struct Error {
    repr: Repr,
}

enum Repr {
    /// Message, class, and cause only; never captures a stack
    Light(LightNode),
    Full(Box<Node>),
}

struct LightNode {
    message: String,
    class: Option<ErrorClass>,
    cause: Option<Cause>,
}

#[derive(Default)]
struct Node {
    message: String,
    class: Option<ErrorClass>,
    category: Option<Category>,
    severity: Option<Severity>,
    id: Option<String>,
    retryable: Option<bool>,
    fields: Vec<Field>,
    stack: Option<StackSnapshot>,
    template: Option<Arc<str>>,
    formatter: Option<Arc<dyn Formatter>>,
    span: Option<tracing::Span>,
    cause: Option<Cause>,
}

/// The error a link wraps
enum Cause {
    Native(Box<Error>),
    /// Opaque leaf: native chain walking stops here
    Foreign(anyhow::Error),
}

impl Cause {
    /// A native `Error` is taken as is; anything else goes through anyhow
    fn from_cause<E>(cause: E) -> Option<Self>
    where
        E: Into<anyhow::Error> + 'static,
    {
        let mut slot = Some(cause);
        if let Some(native) = (&mut slot as &mut dyn Any)
            .downcast_mut::<Option<Error>>()
            .and_then(Option::take)
        {
            return Some(Cause::Native(Box::new(native)));
        }
        slot.map(|cause| Cause::from_anyhow(cause.into()))
    }

    fn from_anyhow(err: anyhow::Error) -> Self {
        if err.downcast_ref::<Error>().is_none() {
            return Cause::Foreign(err);
        }

        // Context messages stacked on the native error, outer first
        let layers: Vec<String> = err
            .chain()
            .take_while(|link| !link.is::<Error>())
            .map(ToString::to_string)
            .collect();

        match err.downcast::<Error>() {
            Ok(native) => layers
                .into_iter()
                .rev()
                .fold(Cause::Native(Box::new(native)), |cause, message| {
                    Cause::Native(Box::new(Error {
                        repr: Repr::Light(LightNode {
                            message,
                            class: None,
                            cause: Some(cause),
                        }),
                    }))
                }),
            Err(foreign) => Cause::Foreign(foreign),
        }
    }

    fn link(&self) -> Link<'_> {
        match self {
            Cause::Native(err) => Link::Native(err),
            Cause::Foreign(err) => Link::Foreign(&**err),
        }
    }
}

// =============================================================================
// Constructors
// =============================================================================

impl Error {
    /// Create a root error.
    ///
    /// A stack is captured when automatic capture is switched on with
    /// [`config::set_auto_capture`].
    pub fn new(message: impl Into<String>) -> Self {
        Self::from_parts(message.into(), None, Folded::default())
    }

    /// Create a root error from an option sequence
    pub fn build<I>(message: impl Into<String>, opts: I) -> Self
    where
        I: IntoIterator<Item = Opt>,
    {
        Self::from_parts(message.into(), None, Folded::from_opts(opts))
    }

    /// Wrap `cause` with a new message.
    ///
    /// A faultline `Error` is linked as a native node without touching
    /// anyhow. Inside an `anyhow::Error` it is recovered too, and every
    /// context message stacked on it becomes a light link. Any other error
    /// becomes an opaque leaf.
    pub fn wrap(cause: impl Into<anyhow::Error> + 'static, message: impl Into<String>) -> Self {
        Self::from_parts(message.into(), Cause::from_cause(cause), Folded::default())
    }

    /// Wrap `cause` with a new message and an option sequence
    pub fn wrap_with<I>(
        cause: impl Into<anyhow::Error> + 'static,
        message: impl Into<String>,
        opts: I,
    ) -> Self
    where
        I: IntoIterator<Item = Opt>,
    {
        Self::from_parts(message.into(), Cause::from_cause(cause), Folded::from_opts(opts))
    }

    /// Wrap a cause that may be missing.
    ///
    /// `None` produces a causeless error carrying `message`. It does not
    /// panic and does not report a separate failure; callers that must not
    /// wrap a missing cause check for it first.
    pub fn wrap_opt<E>(cause: Option<E>, message: impl Into<String>) -> Self
    where
        E: Into<anyhow::Error> + 'static,
    {
        match cause {
            Some(cause) => Self::wrap(cause, message),
            None => {
                let message = message.into();
                tracing::debug!(message = %message, "wrapping a missing cause");
                Self::new(message)
            }
        }
    }

    /// Cheap root error: no stack, no metadata beyond the class
    pub fn light(message: impl Into<String>) -> Self {
        Self {
            repr: Repr::Light(LightNode {
                message: message.into(),
                class: None,
                cause: None,
            }),
        }
    }

    /// Cheap wrapping link: no stack, no metadata beyond the class
    pub fn wrap_light(
        cause: impl Into<anyhow::Error> + 'static,
        message: impl Into<String>,
    ) -> Self {
        Self {
            repr: Repr::Light(LightNode {
                message: message.into(),
                class: None,
                cause: Cause::from_cause(cause),
            }),
        }
    }

    fn from_parts(message: String, cause: Option<Cause>, folded: Folded) -> Self {
        let stack = match folded.stack {
            Some(Some(cfg)) => StackSnapshot::capture(&cfg),
            Some(None) => StackSnapshot::capture(&config::default_stack_config()),
            None if config::auto_capture() => {
                StackSnapshot::capture(&config::default_stack_config())
            }
            None => None,
        };

        Self {
            repr: Repr::Full(Box::new(Node {
                message,
                class: folded.class,
                category: folded.category,
                severity: folded.severity,
                id: folded.id,
                retryable: folded.retryable,
                fields: folded.fields,
                stack,
                template: None,
                formatter: folded.formatter,
                span: folded.span,
                cause,
            })),
        }
    }

    /// Full node for this link, promoting a light one
    fn into_node(self) -> Box<Node> {
        match self.repr {
            Repr::Full(node) => node,
            Repr::Light(light) => Box::new(Node {
                message: light.message,
                class: light.class,
                cause: light.cause,
                ..Node::default()
            }),
        }
    }

    fn map_node(self, f: impl FnOnce(&mut Node)) -> Self {
        let mut node = self.into_node();
        f(&mut node);
        Self {
            repr: Repr::Full(node),
        }
    }
}

// =============================================================================
// Builders (chainable)
// =============================================================================

impl Error {
    /// Append a field to this link
    pub fn with_field(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let field = Field::new(key, value);
        self.map_node(|node| node.fields.push(field))
    }

    /// Append several fields to this link, in order
    pub fn with_fields<I, F>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Field>,
    {
        self.map_node(|node| node.fields.extend(fields.into_iter().map(Into::into)))
    }

    pub fn with_class(self, class: ErrorClass) -> Self {
        // Light nodes carry a class, no promotion needed
        let repr = match self.repr {
            Repr::Light(mut light) => {
                light.class = Some(class);
                Repr::Light(light)
            }
            Repr::Full(mut node) => {
                node.class = Some(class);
                Repr::Full(node)
            }
        };
        Self { repr }
    }

    pub fn with_category(self, category: Category) -> Self {
        self.map_node(|node| node.category = Some(category))
    }

    pub fn with_severity(self, severity: Severity) -> Self {
        self.map_node(|node| node.severity = Some(severity))
    }

    pub fn with_id(self, id: impl Into<String>) -> Self {
        let id = id.into();
        self.map_node(|node| node.id = Some(id))
    }

    /// Assign a fresh UUID as this link's id
    pub fn with_generated_id(self) -> Self {
        self.with_id(generate_id())
    }

    pub fn with_retryable(self, retryable: bool) -> Self {
        self.map_node(|node| node.retryable = Some(retryable))
    }

    /// Attach an opaque span reference
    pub fn with_span(self, span: tracing::Span) -> Self {
        self.map_node(|node| node.span = Some(span))
    }

    /// Render this chain with `formatter` instead of the process default
    pub fn with_formatter(self, formatter: Arc<dyn Formatter>) -> Self {
        self.map_node(|node| node.formatter = Some(formatter))
    }

    /// Capture a stack now, under the process default config
    pub fn with_stack(self) -> Self {
        self.with_stack_config(&config::default_stack_config())
    }

    /// Capture a stack now, under `cfg`; replaces any earlier snapshot
    pub fn with_stack_config(self, cfg: &StackTraceConfig) -> Self {
        let stack = StackSnapshot::capture(cfg);
        self.map_node(|node| node.stack = stack)
    }

    pub(crate) fn with_template(self, format: Arc<str>) -> Self {
        self.map_node(|node| node.template = Some(format))
    }
}

// =============================================================================
// Link-local getters
// =============================================================================

impl Error {
    /// This link's own message
    pub fn own_message(&self) -> &str {
        match &self.repr {
            Repr::Light(light) => &light.message,
            Repr::Full(node) => &node.message,
        }
    }

    /// This link's own fields
    pub fn own_fields(&self) -> &[Field] {
        match &self.repr {
            Repr::Light(_) => &[],
            Repr::Full(node) => &node.fields,
        }
    }

    /// The class set on this link, if any
    pub fn explicit_class(&self) -> Option<ErrorClass> {
        match &self.repr {
            Repr::Light(light) => light.class,
            Repr::Full(node) => node.class,
        }
    }

    /// True for links built with [`Error::light`] or [`Error::wrap_light`]
    pub fn is_light(&self) -> bool {
        matches!(self.repr, Repr::Light(_))
    }

    fn node(&self) -> Option<&Node> {
        match &self.repr {
            Repr::Light(_) => None,
            Repr::Full(node) => Some(node),
        }
    }

    fn cause(&self) -> Option<&Cause> {
        match &self.repr {
            Repr::Light(light) => light.cause.as_ref(),
            Repr::Full(node) => node.cause.as_ref(),
        }
    }

    pub(crate) fn own_formatter(&self) -> Option<&Arc<dyn Formatter>> {
        self.node().and_then(|n| n.formatter.as_ref())
    }
}

// =============================================================================
// Chain traversal
// =============================================================================

/// One element of a chain
#[derive(Clone, Copy)]
pub enum Link<'a> {
    Native(&'a Error),
    Foreign(&'a (dyn StdError + Send + Sync + 'static)),
}

impl Link<'_> {
    /// The text this link contributes to the joined message
    pub fn message(&self) -> String {
        match self {
            Link::Native(err) => err.own_message().to_string(),
            Link::Foreign(err) => err.to_string(),
        }
    }
}

/// Iterator over a chain, head first
pub struct Chain<'a> {
    next: Option<Link<'a>>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = Link<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let link = self.next.take()?;
        if let Link::Native(err) = link {
            self.next = err.cause().map(Cause::link);
        }
        Some(link)
    }
}

impl Error {
    /// Every link from this one to the root
    pub fn chain(&self) -> Chain<'_> {
        Chain {
            next: Some(Link::Native(self)),
        }
    }

    /// The native links of the chain
    pub fn nodes(&self) -> impl Iterator<Item = &Error> + '_ {
        self.chain().filter_map(|link| match link {
            Link::Native(err) => Some(err),
            Link::Foreign(_) => None,
        })
    }

    /// Number of links, foreign leaf included
    pub fn depth(&self) -> usize {
        self.chain().count()
    }

    /// The innermost link
    pub fn root_cause(&self) -> Link<'_> {
        let mut last = Link::Native(self);
        for link in self.chain() {
            last = link;
        }
        last
    }

    fn find<'a, T>(&'a self, get: impl Fn(&'a Node) -> Option<T>) -> Option<T> {
        self.nodes().filter_map(Error::node).find_map(get)
    }
}

// =============================================================================
// Chain getters
// =============================================================================

impl Error {
    /// Nearest explicit class, else [`ErrorClass::Internal`]
    pub fn class(&self) -> ErrorClass {
        self.class_set().unwrap_or_default()
    }

    /// Nearest explicit class, if any link set one
    pub fn class_set(&self) -> Option<ErrorClass> {
        self.nodes().find_map(Error::explicit_class)
    }

    /// Nearest explicit category, else [`Category::General`]
    pub fn category(&self) -> Category {
        self.find(|n| n.category.clone()).unwrap_or_default()
    }

    /// Nearest explicit severity, else [`Severity::Error`]
    pub fn severity(&self) -> Severity {
        self.find(|n| n.severity).unwrap_or_default()
    }

    pub fn id(&self) -> Option<&str> {
        self.find(|n| n.id.as_deref())
    }

    /// Nearest explicit retry hint, else `false`
    pub fn is_retryable(&self) -> bool {
        self.find(|n| n.retryable).unwrap_or(false)
    }

    /// First non-empty message in the chain
    pub fn message(&self) -> &str {
        self.nodes()
            .map(Error::own_message)
            .find(|m| !m.is_empty())
            .unwrap_or("")
    }

    /// Fields of every link, outer link first
    pub fn fields(&self) -> impl Iterator<Item = &Field> + '_ {
        self.nodes().flat_map(|err| err.own_fields().iter())
    }

    /// Nearest captured stack
    pub fn stack(&self) -> Option<&StackSnapshot> {
        self.find(|n| n.stack.as_ref())
    }

    /// Format string of the template that produced a link
    pub fn template(&self) -> Option<&str> {
        self.find(|n| n.template.as_deref())
    }

    pub fn span(&self) -> Option<&tracing::Span> {
        self.find(|n| n.span.as_ref())
    }

    pub(crate) fn formatter(&self) -> Option<&Arc<dyn Formatter>> {
        self.nodes().find_map(Error::own_formatter)
    }
}

// =============================================================================
// Capability helpers for any error
// =============================================================================

/// First faultline link reachable through `source()`
pub fn find_native<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a Error> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(native) = e.downcast_ref::<Error>() {
            return Some(native);
        }
        current = e.source();
    }
    None
}

/// Nearest explicit class anywhere in the `source()` chain.
///
/// Foreign errors need not implement anything: they are skipped, and native
/// links behind them are still found.
pub fn class_of(err: &(dyn StdError + 'static)) -> Option<ErrorClass> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(class) = e.downcast_ref::<Error>().and_then(Error::explicit_class) {
            return Some(class);
        }
        current = e.source();
    }
    None
}

/// True when any link of the `source()` chain has `class` set explicitly
pub fn has_class(err: &(dyn StdError + 'static), class: ErrorClass) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.downcast_ref::<Error>().and_then(Error::explicit_class) == Some(class) {
            return true;
        }
        current = e.source();
    }
    false
}

// =============================================================================
// Display - joined messages, outer first
// =============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            return f.write_str(&self.render(RenderMode::Full));
        }

        let mut written = false;
        for link in self.chain() {
            let message = link.message();
            if message.is_empty() {
                continue;
            }
            if written {
                f.write_str(JOINER)?;
            }
            f.write_str(&message)?;
            written = true;
        }

        if !written {
            f.write_str(self.class().description())?;
        }
        Ok(())
    }
}

// =============================================================================
// Debug - full multi-line rendering
// =============================================================================

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(RenderMode::Full))
    }
}

// =============================================================================
// std::error::Error implementation
// =============================================================================

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause().map(|cause| match cause {
            Cause::Native(err) => &**err as &(dyn StdError + 'static),
            Cause::Foreign(err) => &**err as &(dyn StdError + 'static),
        })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let class = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorClass::NotFound,
            std::io::ErrorKind::PermissionDenied => ErrorClass::PermissionDenied,
            std::io::ErrorKind::AlreadyExists => ErrorClass::AlreadyExists,
            std::io::ErrorKind::TimedOut => ErrorClass::Timeout,
            _ => ErrorClass::Internal,
        };
        Error::wrap_with(err, "io", [Opt::Class(class), Opt::Category(Category::Io)])
    }
}

// =============================================================================
// Convenience constructors
// =============================================================================

impl Error {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(message).with_class(ErrorClass::NotFound)
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(message).with_class(ErrorClass::Validation)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(message).with_class(ErrorClass::PermissionDenied)
    }

    pub fn already_exists(message: impl Into<String>) -> Self {
        Self::new(message).with_class(ErrorClass::AlreadyExists)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message).with_class(ErrorClass::Internal)
    }
}
