//! Construction options
//!
//! `Error::build` and `Error::wrap_with` take a sequence of [`Opt`] values and
//! fold them into the new node. Options of the same kind are last-wins;
//! fields are appended in the order given.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::category::Category;
use crate::class::ErrorClass;
use crate::field::Field;
use crate::format::Formatter;
use crate::severity::Severity;
use crate::stack::StackTraceConfig;

/// One construction option
#[derive(Clone)]
pub enum Opt {
    Class(ErrorClass),
    Category(Category),
    Severity(Severity),
    Id(String),
    /// Assign a fresh UUID as the id
    GeneratedId,
    Retryable(bool),
    /// Capture a stack; `None` uses the process default config
    Stack(Option<StackTraceConfig>),
    Formatter(Arc<dyn Formatter>),
    Span(tracing::Span),
    Field(Field),
}

impl Opt {
    pub fn field(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Opt::Field(Field::new(key, value))
    }

    pub fn id(id: impl Into<String>) -> Self {
        Opt::Id(id.into())
    }

    /// Capture a stack under the process default config
    pub fn stack() -> Self {
        Opt::Stack(None)
    }

    pub fn stack_with(cfg: StackTraceConfig) -> Self {
        Opt::Stack(Some(cfg))
    }

    pub fn retryable() -> Self {
        Opt::Retryable(true)
    }
}

impl fmt::Debug for Opt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opt::Class(c) => f.debug_tuple("Class").field(c).finish(),
            Opt::Category(c) => f.debug_tuple("Category").field(c).finish(),
            Opt::Severity(s) => f.debug_tuple("Severity").field(s).finish(),
            Opt::Id(id) => f.debug_tuple("Id").field(id).finish(),
            Opt::GeneratedId => f.write_str("GeneratedId"),
            Opt::Retryable(r) => f.debug_tuple("Retryable").field(r).finish(),
            Opt::Stack(cfg) => f.debug_tuple("Stack").field(cfg).finish(),
            Opt::Formatter(_) => f.write_str("Formatter(..)"),
            Opt::Span(span) => f.debug_tuple("Span").field(span).finish(),
            Opt::Field(field) => f.debug_tuple("Field").field(field).finish(),
        }
    }
}

impl From<ErrorClass> for Opt {
    fn from(class: ErrorClass) -> Self {
        Opt::Class(class)
    }
}

impl From<Category> for Opt {
    fn from(category: Category) -> Self {
        Opt::Category(category)
    }
}

impl From<Severity> for Opt {
    fn from(severity: Severity) -> Self {
        Opt::Severity(severity)
    }
}

impl From<Field> for Opt {
    fn from(field: Field) -> Self {
        Opt::Field(field)
    }
}

impl From<StackTraceConfig> for Opt {
    fn from(cfg: StackTraceConfig) -> Self {
        Opt::Stack(Some(cfg))
    }
}

/// The result of folding an option sequence
#[derive(Default)]
pub(crate) struct Folded {
    pub class: Option<ErrorClass>,
    pub category: Option<Category>,
    pub severity: Option<Severity>,
    pub id: Option<String>,
    pub retryable: Option<bool>,
    pub stack: Option<Option<StackTraceConfig>>,
    pub formatter: Option<Arc<dyn Formatter>>,
    pub span: Option<tracing::Span>,
    pub fields: Vec<Field>,
}

impl Folded {
    pub fn from_opts<I>(opts: I) -> Self
    where
        I: IntoIterator<Item = Opt>,
    {
        opts.into_iter().fold(Folded::default(), |mut acc, opt| {
            match opt {
                Opt::Class(c) => acc.class = Some(c),
                Opt::Category(c) => acc.category = Some(c),
                Opt::Severity(s) => acc.severity = Some(s),
                Opt::Id(id) => acc.id = Some(id),
                Opt::GeneratedId => acc.id = Some(generate_id()),
                Opt::Retryable(r) => acc.retryable = Some(r),
                Opt::Stack(cfg) => acc.stack = Some(cfg),
                Opt::Formatter(f) => acc.formatter = Some(f),
                Opt::Span(span) => acc.span = Some(span),
                Opt::Field(field) => acc.fields.push(field),
            }
            acc
        })
    }
}

/// A fresh error id
pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
