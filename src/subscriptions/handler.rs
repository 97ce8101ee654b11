//! Handler type invoked on publish.

use std::fmt;
use std::sync::Arc;

/// Error a handler may return to abort a publish pass.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

type HandlerFn<T> = dyn Fn(&T) -> Result<(), HandlerError> + Send + Sync;

/// A callable subscribed to a topic.
///
/// Cloning is cheap and preserves identity: a clone can be passed to
/// [`Registry::unsubscribe_handler`](crate::Registry::unsubscribe_handler) to
/// remove the subscription created with the original. Two handlers built
/// separately from identical closures are distinct.
pub struct Handler<T> {
    inner: Arc<HandlerFn<T>>,
}

impl<T: 'static> Handler<T> {
    /// Wrap an infallible closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |args: &T| {
                f(args);
                Ok(())
            }),
        }
    }

    /// Wrap a closure whose error aborts the publish that invoked it.
    pub fn fallible<F, E>(f: F) -> Self
    where
        F: Fn(&T) -> Result<(), E> + Send + Sync + 'static,
        E: Into<HandlerError>,
    {
        Self {
            inner: Arc::new(move |args: &T| f(args).map_err(Into::into)),
        }
    }
}

impl<T> Handler<T> {
    /// Identity comparison. True only for clones of the same handler.
    pub fn same_as(&self, other: &Handler<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn call(&self, args: &T) -> Result<(), HandlerError> {
        (self.inner)(args)
    }
}

impl<T> Clone for Handler<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Handler<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("ptr", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_identity() {
        let a: Handler<u32> = Handler::new(|_| {});
        let b = a.clone();
        assert!(a.same_as(&b));
    }

    #[test]
    fn test_identical_closures_are_distinct() {
        let a: Handler<u32> = Handler::new(|_| {});
        let b: Handler<u32> = Handler::new(|_| {});
        assert!(!a.same_as(&b));
    }

    #[test]
    fn test_fallible_error_is_returned() {
        let h: Handler<u32> = Handler::fallible(|v: &u32| {
            if *v > 10 {
                Err("too big")
            } else {
                Ok(())
            }
        });
        assert!(h.call(&3).is_ok());
        let err = h.call(&11).unwrap_err();
        assert_eq!(err.to_string(), "too big");
    }
}
