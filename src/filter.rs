//! Filter trait and the filter manager.
//!
//! A filter takes the downstream handler and returns a new handler that adds
//! one cross-cutting behaviour around it. The manager nests its filters
//! around a terminal handler in onion order: the first filter added is the
//! outermost layer, the last one sits right next to the terminal handler.
//!
//! ```text
//! add_filter(f0); add_filter(f1); add_filter(f2);
//! wrap(t)  ==  f0(f1(f2(t)))
//!
//! request  → f0 pre → f1 pre → f2 pre → t
//! response ← f0 post ← f1 post ← f2 post ←
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::handler::{BoxedHandler, Handler};

/// A cross-cutting wrapper around a downstream handler.
///
/// Implemented for every closure `Fn(BoxedHandler) -> BoxedHandler`, so a
/// filter is usually written as a plain function:
///
/// ```rust
/// use tsu_action::{BoxedHandler, Request};
///
/// fn deny_all(_next: BoxedHandler) -> BoxedHandler {
///     BoxedHandler::new(|_req: Request| async { tsu_action::Status::Forbidden })
/// }
/// ```
pub trait Filter: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<F> Filter for F
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self(next)
    }
}

/// An ordered, append-only collection of filters.
///
/// `add_filter` takes the write lock and `wrap` the read lock, so setup code
/// and concurrent `wrap` calls never observe a half-updated sequence. Each
/// `wrap` composes from the filters present at that moment; handlers returned
/// by earlier calls are not affected by later additions.
#[derive(Default)]
pub struct FilterManager {
    filters: RwLock<Vec<Arc<dyn Filter>>>,
}

impl FilterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `filter` as the new innermost layer.
    pub fn add_filter(&self, filter: impl Filter) {
        self.filters
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(filter));
    }

    /// Nests every registered filter around `terminal` and returns the
    /// combined handler.
    pub fn wrap(&self, terminal: impl Handler) -> BoxedHandler {
        // Snapshot under the read lock; filters run outside it.
        let filters = self.filters
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut handler = terminal.into_boxed_handler();
        for (i, filter) in filters.iter().enumerate().rev() {
            debug!(index = i, "wrap handler");
            handler = filter.wrap(handler);
        }
        handler
    }

    pub fn len(&self) -> usize {
        self.filters.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
