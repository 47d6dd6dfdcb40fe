//! Process-wide error gathering
//!
//! The gatherer is an [`ErrorSet`](crate::ErrorSet) with an on/off switch,
//! shared by the whole process. It starts disabled. While disabled,
//! [`add_to_gatherer`] returns before computing a key, so call sites can
//! gather unconditionally and pay nothing when nobody is listening.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use once_cell::sync::Lazy;

use crate::collect::{lock, Dedup, KeyGetter, MultiError};
use crate::error::Error;

static GLOBAL: Lazy<Gatherer> = Lazy::new(Gatherer::new);

/// Deduplicating error collector with an enable flag
pub struct Gatherer {
    enabled: AtomicBool,
    key: RwLock<KeyGetter>,
    inner: Mutex<Dedup>,
}

impl Gatherer {
    /// A disabled gatherer keyed by message
    pub fn new() -> Self {
        Self {
            enabled: AtomicBool::new(false),
            key: RwLock::new(KeyGetter::by_message()),
            inner: Mutex::new(Dedup::default()),
        }
    }

    /// The process-wide instance
    pub fn global() -> &'static Gatherer {
        &GLOBAL
    }

    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Release);
        tracing::info!("error gathering enabled");
    }

    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Release);
        tracing::info!("error gathering disabled");
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Replace the key getter; entries already gathered keep their keys
    pub fn set_key(&self, key: KeyGetter) {
        tracing::debug!(key = key.name(), "gatherer key getter replaced");
        *self.key.write().unwrap_or_else(PoisonError::into_inner) = key;
    }

    /// Gather `err` if enabled and its key is new; true when stored
    pub fn add(&self, err: impl Into<Arc<Error>>) -> bool {
        if !self.is_enabled() {
            return false;
        }
        let err = err.into();
        let key = self
            .key
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .key(&err);
        lock(&self.inner).insert(key, err)
    }

    pub fn get_all(&self) -> Vec<Arc<Error>> {
        lock(&self.inner).entries().to_vec()
    }

    pub fn err(&self) -> Option<MultiError> {
        MultiError::from_errors(self.get_all())
    }

    pub fn clear(&self) {
        lock(&self.inner).clear();
    }

    /// Disable, clear, and restore the default key getter
    pub fn reset(&self) {
        self.enabled.store(false, Ordering::Release);
        self.set_key(KeyGetter::by_message());
        self.clear();
    }
}

impl Default for Gatherer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Process-wide shortcuts
// =============================================================================

pub fn add_to_gatherer(err: impl Into<Arc<Error>>) -> bool {
    Gatherer::global().add(err)
}

pub fn gathered_errors() -> Vec<Arc<Error>> {
    Gatherer::global().get_all()
}

pub fn enable_gathering() {
    Gatherer::global().enable();
}

pub fn disable_gathering() {
    Gatherer::global().disable();
}

pub fn set_gatherer_key(key: KeyGetter) {
    Gatherer::global().set_key(key);
}

pub fn clear_gatherer() {
    Gatherer::global().clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_disabled_is_a_no_op() {
        let gatherer = Gatherer::new();
        for _ in 0..10 {
            assert!(!gatherer.add(Error::new("ignored")));
        }
        assert!(gatherer.get_all().is_empty());
        assert!(gatherer.err().is_none());
    }

    #[test]
    fn test_disabled_skips_key_computation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&calls);
        let gatherer = Gatherer::new();
        gatherer.set_key(KeyGetter::new("counting", move |err| {
            counted.fetch_add(1, Ordering::SeqCst);
            err.to_string()
        }));

        gatherer.add(Error::new("a"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        gatherer.enable();
        gatherer.add(Error::new("a"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_enabled_dedups() {
        let gatherer = Gatherer::new();
        gatherer.enable();
        assert!(gatherer.add(Error::new("x")));
        assert!(!gatherer.add(Error::new("x")));
        assert!(gatherer.add(Error::new("y")));
        assert_eq!(gatherer.err().unwrap().to_string(), "x\ny");

        gatherer.reset();
        assert!(!gatherer.is_enabled());
        assert!(gatherer.get_all().is_empty());
    }
}
