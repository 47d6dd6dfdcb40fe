//! Reusable error factories

use std::fmt::{self, Display};
use std::sync::Arc;

use crate::category::Category;
use crate::class::ErrorClass;
use crate::error::Error;

/// Placeholder substituted by each argument
const PLACEHOLDER: &str = "{}";

/// Text rendered for a placeholder with no matching argument
const MISSING: &str = "<missing>";

/// Errors raised by [`Template::try_error`]
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template '{format}' expects {expected} arguments, got {got}")]
    Arity {
        format: String,
        expected: usize,
        got: usize,
    },
}

/// A fixed-arity error factory bound to a class and category.
///
/// ```rust
/// use faultline::{Category, ErrorClass, Template};
///
/// let missing = Template::new("order {} not found in {}", ErrorClass::NotFound, Category::Database);
/// let err = missing.error(&[&42, &"orders"]);
///
/// assert_eq!(err.to_string(), "order 42 not found in orders");
/// assert_eq!(err.class(), ErrorClass::NotFound);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Template {
    format: Arc<str>,
    arity: usize,
    class: ErrorClass,
    category: Category,
}

impl Template {
    /// `format` uses `{}` for each positional argument
    pub fn new(format: impl Into<String>, class: ErrorClass, category: Category) -> Self {
        let format: String = format.into();
        let arity = format.matches(PLACEHOLDER).count();
        Self {
            format: format.into(),
            arity,
            class,
            category,
        }
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn class(&self) -> ErrorClass {
        self.class
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    /// Build an error; a wrong argument count is logged, not fatal
    pub fn error(&self, args: &[&dyn Display]) -> Error {
        self.stamp(Error::new(self.message(args)))
    }

    /// Build an error wrapping `cause`
    pub fn wrap(
        &self,
        cause: impl Into<anyhow::Error> + 'static,
        args: &[&dyn Display],
    ) -> Error {
        self.stamp(Error::wrap(cause, self.message(args)))
    }

    /// Build an error, rejecting a wrong argument count
    pub fn try_error(&self, args: &[&dyn Display]) -> Result<Error, TemplateError> {
        self.check(args.len())?;
        Ok(self.error(args))
    }

    fn check(&self, got: usize) -> Result<(), TemplateError> {
        if got == self.arity {
            return Ok(());
        }
        Err(TemplateError::Arity {
            format: self.format.to_string(),
            expected: self.arity,
            got,
        })
    }

    fn message(&self, args: &[&dyn Display]) -> String {
        if let Err(e) = self.check(args.len()) {
            tracing::warn!(error = %e, "template argument count mismatch");
        }

        let mut out = String::with_capacity(self.format.len());
        let mut args = args.iter();
        let mut pieces = self.format.split(PLACEHOLDER).peekable();
        while let Some(piece) = pieces.next() {
            out.push_str(piece);
            if pieces.peek().is_some() {
                match args.next() {
                    Some(arg) => out.push_str(&arg.to_string()),
                    None => out.push_str(MISSING),
                }
            }
        }
        out
    }

    fn stamp(&self, err: Error) -> Error {
        err.with_class(self.class)
            .with_category(self.category.clone())
            .with_template(Arc::clone(&self.format))
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("format", &self.format)
            .field("arity", &self.arity)
            .field("class", &self.class)
            .field("category", &self.category)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order_missing() -> Template {
        Template::new(
            "order {} not found for customer {}",
            ErrorClass::NotFound,
            Category::Payment,
        )
    }

    #[test]
    fn test_arity() {
        assert_eq!(order_missing().arity(), 2);
        assert_eq!(
            Template::new("no args", ErrorClass::Internal, Category::General).arity(),
            0
        );
    }

    #[test]
    fn test_error() {
        let err = order_missing().error(&[&17, &"acme"]);
        assert_eq!(err.to_string(), "order 17 not found for customer acme");
        assert_eq!(err.class(), ErrorClass::NotFound);
        assert_eq!(err.category(), Category::Payment);
        assert_eq!(err.template(), Some("order {} not found for customer {}"));
    }

    #[test]
    fn test_wrap() {
        let cause = std::io::Error::new(std::io::ErrorKind::Other, "socket closed");
        let err = order_missing().wrap(cause, &[&1, &"x"]);
        assert_eq!(err.to_string(), "order 1 not found for customer x: socket closed");
        assert_eq!(err.depth(), 2);
    }

    #[test]
    fn test_arity_mismatch() {
        let tpl = order_missing();
        assert_eq!(
            tpl.error(&[&5]).to_string(),
            "order 5 not found for customer <missing>"
        );
        assert_eq!(
            tpl.error(&[&1, &2, &3]).to_string(),
            "order 1 not found for customer 2"
        );

        let err = tpl.try_error(&[&5]).unwrap_err();
        assert_eq!(
            err,
            TemplateError::Arity {
                format: "order {} not found for customer {}".to_string(),
                expected: 2,
                got: 1
            }
        );
        assert!(tpl.try_error(&[&5, &6]).is_ok());
    }

    #[test]
    fn test_trailing_placeholder() {
        let tpl = Template::new("{} failed", ErrorClass::Internal, Category::General);
        assert_eq!(tpl.error(&[&"sync"]).to_string(), "sync failed");
    }
}
