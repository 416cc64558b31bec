//! Dashboard / Update Scheduler.
//!
//! A dashboard owns one [`FilterManager`], a tree of containers and panels,
//! and the update callbacks registered by each panel.
//!
//! ```text
//!   Panel::filter ──▶ FilterContext::filter ──▶ FilterManager notifies
//!                                                     │
//!                                                     ▼
//!                                        Dashboard::trigger_updates
//!                                                     │
//!                           ┌─────────────────────────┴──────────┐
//!                           ▼                                    ▼
//!                   visible panel: run callbacks     hidden panel: mark pending
//!                                                                │
//!                                  shown again via a container ◀─┘ run callbacks
//! ```
//!
//! Every state transition is synchronous: by the time `filter` returns,
//! all visible panels have run their callbacks. Only [`Panel::fetch`]
//! suspends, at the transport call.
//!
//! Nodes live in arenas addressed by stable ids; they are never removed
//! while the dashboard lives. Dropping a panel only unregisters its
//! callbacks and its id is never handed out again.

mod container;
mod error;
mod panel;

pub use container::{Container, ContainerKind};
pub use error::FetchError;
pub use panel::{FetchOptions, FetchResult, Panel, PanelOptions};

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::config::{DashboardSettings, QuerySettings, Settings};
use crate::filter::{Filter, FilterManager};
use crate::model::schema::Schema;
use crate::transport::QueryTransport;

/// Stable panel identifier. Allocated in increasing order, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PanelId(u64);

impl PanelId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panel#{}", self.0)
    }
}

/// Arena index of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContainerId(usize);

/// A child slot of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Node {
    Panel(PanelId),
    Container(ContainerId),
}

type Callback = Rc<dyn Fn()>;

pub(crate) struct PanelState {
    pub(crate) visible: bool,
    pub(crate) pending_update: bool,
    pub(crate) active: bool,
    pub(crate) base_filter: Option<Filter>,
    /// Number of fetches issued so far.
    pub(crate) fetch_seq: u64,
}

pub(crate) struct ContainerState {
    pub(crate) kind: ContainerKind,
    /// Effective visibility of the container itself.
    pub(crate) visible: bool,
    pub(crate) children: Vec<Node>,
    /// Visibility last reported for each child slot.
    pub(crate) child_visible: Vec<bool>,
    /// Selected child for tabbed containers.
    pub(crate) selected: usize,
}

#[derive(Default)]
pub(crate) struct State {
    pub(crate) panels: BTreeMap<PanelId, PanelState>,
    pub(crate) containers: Vec<ContainerState>,
    pub(crate) handlers: BTreeMap<PanelId, Vec<Callback>>,
    pub(crate) last_panel_id: u64,
}

pub(crate) struct Inner {
    pub(crate) state: RefCell<State>,
    pub(crate) filter_manager: FilterManager,
    pub(crate) schema: Schema,
    pub(crate) transport: Rc<dyn QueryTransport>,
    pub(crate) query: QuerySettings,
    pub(crate) settings: DashboardSettings,
}

impl Inner {
    /// Run a panel's callbacks if visible, otherwise defer.
    pub(crate) fn update_panel(&self, id: PanelId) {
        let callbacks = {
            let mut state = self.state.borrow_mut();
            let Some(callbacks) = state.handlers.get(&id).cloned() else {
                // Dropped
                return;
            };
            let Some(panel) = state.panels.get_mut(&id) else {
                return;
            };
            if !panel.visible {
                panel.pending_update = true;
                tracing::trace!(panel = %id, "deferred update for hidden panel");
                return;
            }
            panel.pending_update = false;
            callbacks
        };
        for callback in callbacks {
            callback();
        }
    }

    pub(crate) fn trigger_updates(&self) {
        let ids: Vec<PanelId> = self.state.borrow().panels.keys().copied().collect();
        for id in &ids {
            self.update_panel(*id);
        }
        let deferred = self
            .state
            .borrow()
            .panels
            .values()
            .filter(|p| p.pending_update)
            .count();
        tracing::debug!(panels = ids.len(), deferred, "triggered updates");
    }

    /// Set a panel's visibility. Returns whether it just became visible with
    /// an update pending.
    pub(crate) fn apply_panel_visibility(&self, id: PanelId, visible: bool) -> bool {
        let mut state = self.state.borrow_mut();
        match state.panels.get_mut(&id) {
            Some(panel) => {
                panel.visible = visible;
                visible && panel.pending_update
            }
            None => false,
        }
    }

    /// Mark `active` as the only active panel, or clear all when `None`.
    pub(crate) fn set_active(&self, active: Option<PanelId>) {
        let mut state = self.state.borrow_mut();
        for (id, panel) in state.panels.iter_mut() {
            panel.active = Some(*id) == active;
        }
    }

    pub(crate) fn allocate_panel(&self, visible: bool, base_filter: Option<Filter>) -> PanelId {
        let mut state = self.state.borrow_mut();
        state.last_panel_id += 1;
        let id = PanelId(state.last_panel_id);
        state.panels.insert(
            id,
            PanelState {
                visible,
                pending_update: false,
                active: false,
                base_filter,
                fetch_seq: 0,
            },
        );
        state.handlers.insert(id, Vec::new());
        id
    }
}

/// A dashboard instance: filter state, panel tree and update scheduling.
///
/// Cloning shares the same dashboard.
#[derive(Clone)]
pub struct Dashboard {
    inner: Rc<Inner>,
}

impl Dashboard {
    /// Create a dashboard with default settings.
    pub fn new(schema: Schema, transport: Rc<dyn QueryTransport>) -> Self {
        Self::with_settings(schema, transport, &Settings::default())
    }

    /// Create a dashboard using the `[query]` and `[dashboard]` settings.
    pub fn with_settings(
        schema: Schema,
        transport: Rc<dyn QueryTransport>,
        settings: &Settings,
    ) -> Self {
        let inner = Rc::new(Inner {
            state: RefCell::new(State::default()),
            filter_manager: FilterManager::new(),
            schema,
            transport,
            query: settings.query.clone(),
            settings: settings.dashboard.clone(),
        });

        let weak = Rc::downgrade(&inner);
        inner.filter_manager.on_update(move || {
            if let Some(inner) = weak.upgrade() {
                inner.trigger_updates();
            }
        });

        Self { inner }
    }

    /// Create a top-level container.
    pub fn create_container(&self, kind: ContainerKind) -> Container {
        Container::create(Rc::clone(&self.inner), kind, true)
    }

    /// Create a panel outside any container. It starts visible.
    pub fn create_panel(&self, options: PanelOptions) -> Panel {
        let id = self.inner.allocate_panel(true, options.filter);
        Panel::new(Rc::clone(&self.inner), id)
    }

    /// Run `update()` on every registered panel.
    pub fn trigger_updates(&self) {
        self.inner.trigger_updates();
    }

    /// Current active filters.
    pub fn filters(&self) -> Vec<Filter> {
        self.inner.filter_manager.filters()
    }

    /// The shared filter manager, for consumers that are not panels.
    pub fn filter_manager(&self) -> &FilterManager {
        &self.inner.filter_manager
    }

    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// Page size from the dashboard settings.
    pub fn page_size(&self) -> u64 {
        self.inner.settings.page_size
    }

    /// Ids of every panel created so far, including dropped ones.
    pub fn panel_ids(&self) -> Vec<PanelId> {
        self.inner.state.borrow().panels.keys().copied().collect()
    }
}

impl fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("Dashboard")
            .field("panels", &state.panels.len())
            .field("containers", &state.containers.len())
            .field("dialect", &self.inner.query.dialect)
            .finish_non_exhaustive()
    }
}
