//! Live-or-inert handles to engine objects.

use std::fmt;
use std::sync::Arc;

/// Shared handle to an engine object, or the Null sentinel.
///
/// Setup code runs unchanged on every rank, so a constructor call for a
/// compute-only object still has to return *something* on a postprocess
/// rank. That something is a Null handle: it can be stored, cloned and
/// passed back into other setup calls, but never dereferences.
pub struct Handle<T> {
    inner: Option<Arc<T>>,
}

impl<T> Handle<T> {
    /// Wrap a freshly constructed object.
    pub fn live(value: T) -> Self {
        Self {
            inner: Some(Arc::new(value)),
        }
    }

    /// Wrap an object the engine already shares.
    pub fn from_arc(value: Arc<T>) -> Self {
        Self { inner: Some(value) }
    }

    /// The inert placeholder.
    pub fn null() -> Self {
        Self { inner: None }
    }

    /// Whether this is the Null sentinel.
    pub fn is_null(&self) -> bool {
        self.inner.is_none()
    }

    /// Borrow the object, if live.
    pub fn get(&self) -> Option<&T> {
        self.inner.as_deref()
    }

    /// Clone out the shared pointer, if live.
    pub fn shared(&self) -> Option<Arc<T>> {
        self.inner.clone()
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(v) => f.debug_tuple("Handle").field(v).finish(),
            None => f.write_str("Handle(Null)"),
        }
    }
}
