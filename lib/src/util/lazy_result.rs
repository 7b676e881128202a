use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

type LazyResult<T, E> = Lazy<Result<T, E>, Box<dyn FnOnce() -> Result<T, E> + Send + Sync>>;

/// A shareable, fallible value computed at most once, on first access.
pub struct LazyFallibleArc<T, E>(Arc<LazyResult<T, E>>);

impl<T, E> LazyFallibleArc<T, E> {
    #[inline(always)]
    pub fn new<F>(with: F) -> Self
        where F: FnOnce() -> Result<T, E> + Send + Sync + 'static
    {
        LazyFallibleArc(Arc::new(Lazy::new(Box::new(with))))
    }

    /// A value that is already computed.
    pub fn ready(value: T) -> Self
        where T: Send + Sync + 'static, E: Send + Sync + 'static
    {
        let lazy = Self::new(move || Ok(value));
        Lazy::force(&*lazy.0);
        lazy
    }

    pub fn force(&self) -> Result<&T, &E> {
        Lazy::force(&*self.0).as_ref()
    }

    /// Returns `true` if the value has been computed.
    pub fn is_forced(&self) -> bool {
        Lazy::get(&*self.0).is_some()
    }
}

impl<T, E> Clone for LazyFallibleArc<T, E> {
    #[inline(always)]
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T: fmt::Debug, E: fmt::Debug> fmt::Debug for LazyFallibleArc<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Lazy::get(&*self.0) {
            Some(value) => f.debug_tuple("LazyFallibleArc").field(value).finish(),
            None => f.write_str("LazyFallibleArc(<pending>)"),
        }
    }
}
