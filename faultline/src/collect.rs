//! Thread-safe error collections
//!
//! [`ErrorList`] keeps every error it is given. [`ErrorSet`] keeps the first
//! error for each key produced by its [`KeyGetter`] and silently drops later
//! ones. Both preserve insertion order as observed by their lock.

use std::collections::HashSet;
use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::Error;
use crate::format::RenderMode;

// =============================================================================
// Keys
// =============================================================================

/// Computes the dedup key of an error
#[derive(Clone)]
pub struct KeyGetter {
    name: &'static str,
    get: Arc<dyn Fn(&Error) -> String + Send + Sync>,
}

impl KeyGetter {
    pub fn new<F>(name: &'static str, get: F) -> Self
    where
        F: Fn(&Error) -> String + Send + Sync + 'static,
    {
        Self {
            name,
            get: Arc::new(get),
        }
    }

    /// The joined chain message (the default)
    pub fn by_message() -> Self {
        Self::new("message", |err| err.to_string())
    }

    /// The nearest id, falling back to the joined message
    pub fn by_id() -> Self {
        Self::new("id", |err| match err.id() {
            Some(id) => id.to_string(),
            None => err.to_string(),
        })
    }

    /// The full text rendering under the process default config
    pub fn by_full_text() -> Self {
        Self::new("full_text", |err| err.render(RenderMode::Full))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self, err: &Error) -> String {
        (self.get)(err)
    }
}

impl Default for KeyGetter {
    fn default() -> Self {
        Self::by_message()
    }
}

impl fmt::Debug for KeyGetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGetter").field("name", &self.name).finish()
    }
}

// =============================================================================
// Combined error
// =============================================================================

/// Several errors folded into one, in insertion order
#[derive(Clone)]
pub struct MultiError {
    errors: Vec<Arc<Error>>,
}

impl MultiError {
    /// `None` when `errors` is empty
    pub fn from_errors(errors: Vec<Arc<Error>>) -> Option<Self> {
        if errors.is_empty() {
            None
        } else {
            Some(Self { errors })
        }
    }

    pub fn errors(&self) -> &[Arc<Error>] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl fmt::Display for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MultiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} errors:", self.errors.len())?;
        for err in &self.errors {
            writeln!(f, "  - {}", err)?;
        }
        Ok(())
    }
}

impl StdError for MultiError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.errors
            .first()
            .map(|err| err.as_ref() as &(dyn StdError + 'static))
    }
}

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Every critical section leaves the data consistent
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// List
// =============================================================================

/// Append-only list of errors
#[derive(Default)]
pub struct ErrorList {
    errors: Mutex<Vec<Arc<Error>>>,
}

impl ErrorList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, err: impl Into<Arc<Error>>) {
        lock(&self.errors).push(err.into());
    }

    /// No-op for `None`
    pub fn add_opt<E: Into<Arc<Error>>>(&self, err: Option<E>) {
        if let Some(err) = err {
            self.add(err);
        }
    }

    /// Everything collected as one error; `None` when empty
    pub fn err(&self) -> Option<MultiError> {
        MultiError::from_errors(self.get_all())
    }

    /// Snapshot of the current contents
    pub fn get_all(&self) -> Vec<Arc<Error>> {
        lock(&self.errors).clone()
    }

    pub fn clear(&self) {
        lock(&self.errors).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.errors).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.errors).is_empty()
    }
}

// =============================================================================
// Set
// =============================================================================

/// Entries plus the keys already seen
#[derive(Default)]
pub(crate) struct Dedup {
    entries: Vec<Arc<Error>>,
    seen: HashSet<String>,
}

impl Dedup {
    /// Insert unless `key` was seen; true when inserted
    pub fn insert(&mut self, key: String, err: Arc<Error>) -> bool {
        if !self.seen.insert(key) {
            return false;
        }
        self.entries.push(err);
        true
    }

    pub fn entries(&self) -> &[Arc<Error>] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.seen.clear();
    }
}

/// Keeps the first error seen for each key
pub struct ErrorSet {
    inner: Mutex<Dedup>,
    key: KeyGetter,
}

impl ErrorSet {
    /// Deduplicate by joined message
    pub fn new() -> Self {
        Self::with_key(KeyGetter::by_message())
    }

    pub fn with_key(key: KeyGetter) -> Self {
        Self {
            inner: Mutex::new(Dedup::default()),
            key,
        }
    }

    /// Add `err` unless an error with the same key is already present.
    ///
    /// Returns true when the error was stored.
    pub fn add(&self, err: impl Into<Arc<Error>>) -> bool {
        let err = err.into();
        let key = self.key.key(&err);
        lock(&self.inner).insert(key, err)
    }

    /// No-op for `None`
    pub fn add_opt<E: Into<Arc<Error>>>(&self, err: Option<E>) -> bool {
        match err {
            Some(err) => self.add(err),
            None => false,
        }
    }

    pub fn err(&self) -> Option<MultiError> {
        MultiError::from_errors(self.get_all())
    }

    pub fn get_all(&self) -> Vec<Arc<Error>> {
        lock(&self.inner).entries().to_vec()
    }

    /// Drop every entry and forget every key
    pub fn clear(&self) {
        lock(&self.inner).clear();
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn key_getter(&self) -> &KeyGetter {
        &self.key
    }
}

impl Default for ErrorSet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ErrorClass;

    #[test]
    fn test_list_keeps_everything_in_order() {
        let list = ErrorList::new();
        assert!(list.err().is_none());

        list.add(Error::new("first"));
        list.add(Error::new("first"));
        list.add(Error::new("second"));
        list.add_opt(None::<Error>);

        assert_eq!(list.len(), 3);
        let combined = list.err().unwrap();
        assert_eq!(combined.to_string(), "first\nfirst\nsecond");
        assert_eq!(combined.source().unwrap().to_string(), "first");
    }

    #[test]
    fn test_set_dedups_by_message() {
        let set = ErrorSet::new();
        assert!(set.add(Error::new("disk full")));
        assert!(!set.add(Error::new("disk full").with_class(ErrorClass::Unavailable)));
        assert!(set.add(Error::new("disk slow")));

        let all = set.get_all();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].to_string(), "disk full");
        // First occurrence wins
        assert_eq!(all[0].class_set(), None);
        assert_eq!(all[1].to_string(), "disk slow");
    }

    #[test]
    fn test_set_by_id() {
        let set = ErrorSet::with_key(KeyGetter::by_id());
        set.add(Error::new("timeout").with_id("req-1"));
        set.add(Error::new("timeout again").with_id("req-1"));
        set.add(Error::new("timeout").with_id("req-2"));
        assert_eq!(set.len(), 2);
        assert_eq!(set.key_getter().name(), "id");
    }

    #[test]
    fn test_custom_key() {
        let by_class = KeyGetter::new("class", |err| err.class().to_string());
        let set = ErrorSet::with_key(by_class);
        set.add(Error::not_found("a"));
        set.add(Error::not_found("b"));
        set.add(Error::validation("c"));
        let messages: Vec<String> = set.get_all().iter().map(|e| e.to_string()).collect();
        assert_eq!(messages, ["a", "c"]);
    }

    #[test]
    fn test_clear_forgets_keys() {
        let set = ErrorSet::new();
        set.add(Error::new("x"));
        set.clear();
        assert!(set.is_empty());
        assert!(set.err().is_none());
        assert!(set.add(Error::new("x")));
    }

    #[test]
    fn test_get_all_is_a_snapshot() {
        let list = ErrorList::new();
        list.add(Error::new("a"));
        let snapshot = list.get_all();
        list.add(Error::new("b"));
        list.clear();
        assert_eq!(snapshot.len(), 1);
        assert!(list.is_empty());
    }

    #[test]
    fn test_shared_arc_errors() {
        let err = Arc::new(Error::new("shared"));
        let list = ErrorList::new();
        list.add(Arc::clone(&err));
        list.add(err);
        assert_eq!(list.len(), 2);
    }
}
