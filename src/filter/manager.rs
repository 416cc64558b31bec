//! Filter Manager - shared filter state edited from many interactive contexts.
//!
//! State is two generations of the filter set plus the context that is
//! currently driving edits:
//!
//! ```text
//!   confirmed ──(same context edits again)──▶ active := confirmed + new
//!   active    ──(another context takes over)─▶ confirmed := active
//! ```
//!
//! A context that edits repeatedly (a range slider being dragged) replaces
//! its own previous edit instead of accumulating it, while a context taking
//! over freezes everything that was active as the new baseline.
//!
//! Everything is single-threaded. Subscribers are notified synchronously
//! after every edit, with no borrow held, so they may read the manager.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::{Filter, FilterSet};
use crate::model::field::Field;

/// Identifies a filter context within one manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx#{}", self.0)
    }
}

type Subscriber = Rc<dyn Fn()>;

#[derive(Default)]
struct State {
    confirmed: FilterSet,
    active: FilterSet,
    active_context: Option<ContextId>,
    next_context: u64,
    subscribers: Vec<Subscriber>,
}

/// Owns the active filter set. Cloning shares the same state.
#[derive(Clone, Default)]
pub struct FilterManager {
    state: Rc<RefCell<State>>,
}

impl FilterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new interactive context.
    pub fn create_context(&self) -> FilterContext {
        let mut state = self.state.borrow_mut();
        let id = ContextId(state.next_context);
        state.next_context += 1;
        FilterContext {
            id,
            manager: self.clone(),
        }
    }

    /// Register a callback fired after every filter edit or drop.
    pub fn on_update(&self, callback: impl Fn() + 'static) {
        self.state.borrow_mut().subscribers.push(Rc::new(callback));
    }

    /// Current active filters, in insertion order.
    pub fn filters(&self) -> Vec<Filter> {
        self.state.borrow().active.to_vec()
    }

    /// Snapshot of the active filter set.
    pub fn active(&self) -> FilterSet {
        self.state.borrow().active.clone()
    }

    /// Snapshot of the confirmed baseline.
    pub fn confirmed(&self) -> FilterSet {
        self.state.borrow().confirmed.clone()
    }

    /// The context currently driving edits, if any.
    pub fn active_context(&self) -> Option<ContextId> {
        self.state.borrow().active_context
    }

    /// Remove the filter on `field`, whoever set it, and notify. A group
    /// involving `field` is removed whole.
    ///
    /// Removing a field with no active filter is not an error.
    pub fn drop_filter(&self, field: &Field) {
        let remaining = {
            let mut state = self.state.borrow_mut();
            let removed = state.active.remove(field).is_some();
            tracing::debug!(field = field.id(), removed, "dropped filter");
            state.active.len()
        };
        tracing::trace!(active = remaining, "filter set changed");
        self.notify();
    }

    fn apply(&self, context: ContextId, filters: Vec<Filter>) {
        {
            let mut state = self.state.borrow_mut();
            if state.active_context == Some(context) {
                state.active = state.confirmed.clone();
            } else {
                state.confirmed = state.active.clone();
                state.active_context = Some(context);
            }
            for filter in filters {
                state.active.replace(filter);
            }
            tracing::debug!(
                context = %context,
                active = state.active.len(),
                confirmed = state.confirmed.len(),
                "applied context filters"
            );
        }
        self.notify();
    }

    fn notify(&self) {
        let subscribers: Vec<Subscriber> = self.state.borrow().subscribers.clone();
        for subscriber in subscribers {
            subscriber();
        }
    }
}

impl fmt::Debug for FilterManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("FilterManager")
            .field("active", &state.active)
            .field("confirmed", &state.confirmed)
            .field("active_context", &state.active_context)
            .field("subscribers", &state.subscribers.len())
            .finish()
    }
}

/// An interactive owner of edits against a shared [`FilterManager`].
#[derive(Clone)]
pub struct FilterContext {
    id: ContextId,
    manager: FilterManager,
}

impl FilterContext {
    pub fn id(&self) -> ContextId {
        self.id
    }

    /// Apply filters from this context.
    ///
    /// If this context is already driving edits, its previous edit is undone
    /// first; otherwise the current active set becomes the new baseline.
    pub fn filter(&self, filters: Vec<Filter>) {
        self.manager.apply(self.id, filters);
    }

    /// Remove the filter on `field`, regardless of which context set it.
    pub fn drop_filter(&self, field: &Field) {
        self.manager.drop_filter(field);
    }
}

impl fmt::Debug for FilterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterContext").field("id", &self.id).finish()
    }
}
