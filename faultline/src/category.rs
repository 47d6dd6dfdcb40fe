//! Domain categories

use std::borrow::Cow;
use std::fmt;

use serde::{Serialize, Serializer};

/// Free-form domain tag attached to an error.
///
/// Categories are informational: they never influence the status code.
/// Use [`Category::Custom`] for domains without a dedicated variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Category {
    /// No category was set anywhere in the chain
    #[default]
    General,
    Payment,
    Database,
    Api,
    Network,
    Storage,
    Auth,
    Config,
    Io,
    Business,
    Custom(Cow<'static, str>),
}

impl Category {
    /// A category with a caller-chosen name
    pub fn custom(name: impl Into<Cow<'static, str>>) -> Self {
        Category::Custom(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::General => "General",
            Category::Payment => "Payment",
            Category::Database => "Database",
            Category::Api => "Api",
            Category::Network => "Network",
            Category::Storage => "Storage",
            Category::Auth => "Auth",
            Category::Config => "Config",
            Category::Io => "Io",
            Category::Business => "Business",
            Category::Custom(name) => name,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Category {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}
