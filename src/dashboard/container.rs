//! Containers and visibility propagation.
//!
//! A child slot is effectively visible when its container is visible, the
//! slot was last reported visible, and (for tabs) the slot is the selected
//! one. Any change is pushed down to every panel below the slot; panels
//! that come into view with a deferred update run it once the walk is done.

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::panel::{Panel, PanelOptions};
use super::{ContainerId, ContainerState, Inner, Node, PanelId, State};

/// How a container forwards visibility to its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerKind {
    /// Every child follows its own reported visibility.
    #[default]
    Grid,
    /// Only the selected child is shown.
    Tabs,
}

/// Handle to one container of a dashboard.
#[derive(Clone)]
pub struct Container {
    id: ContainerId,
    inner: Rc<Inner>,
}

impl Container {
    pub(crate) fn create(inner: Rc<Inner>, kind: ContainerKind, visible: bool) -> Self {
        let id = {
            let mut state = inner.state.borrow_mut();
            state.containers.push(ContainerState {
                kind,
                visible,
                children: Vec::new(),
                child_visible: Vec::new(),
                selected: 0,
            });
            ContainerId(state.containers.len() - 1)
        };
        Self { id, inner }
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn kind(&self) -> ContainerKind {
        self.with_state(|c| c.kind)
    }

    pub fn is_visible(&self) -> bool {
        self.with_state(|c| c.visible)
    }

    /// Number of child slots.
    pub fn len(&self) -> usize {
        self.with_state(|c| c.children.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Selected child slot of a tabbed container.
    pub fn selected_tab(&self) -> usize {
        self.with_state(|c| c.selected)
    }

    /// Append a nested container.
    pub fn create_container(&self, kind: ContainerKind) -> Container {
        let visible = self.append_slot();
        let child = Container::create(Rc::clone(&self.inner), kind, visible);
        self.attach(Node::Container(child.id));
        child
    }

    /// Append a panel. It starts with the visibility of its slot.
    pub fn create_panel(&self, options: PanelOptions) -> Panel {
        let visible = self.append_slot();
        let id = self.inner.allocate_panel(visible, options.filter);
        self.attach(Node::Panel(id));
        Panel::new(Rc::clone(&self.inner), id)
    }

    /// Record that child slot `index` became visible or hidden, and apply
    /// the result to every panel below it.
    ///
    /// An index past the last slot is ignored.
    pub fn set_child_visibility(&self, index: usize, visible: bool) {
        let shown = {
            let mut state = self.inner.state.borrow_mut();
            let container = &mut state.containers[self.id.0];
            let Some(slot) = container.child_visible.get_mut(index) else {
                tracing::warn!(container = self.id.0, index, "no such child slot");
                return;
            };
            *slot = visible;
            let mut shown = Vec::new();
            refresh_child(&mut state, self.id, index, &mut shown);
            shown
        };
        tracing::debug!(
            container = self.id.0,
            index,
            visible,
            shown = shown.len(),
            "child visibility changed"
        );
        self.run_deferred(shown);
    }

    /// Show child slot `index` of a tabbed container and hide the others.
    ///
    /// Grid containers only record the selection.
    pub fn select_tab(&self, index: usize) {
        let shown = {
            let mut state = self.inner.state.borrow_mut();
            let container = &mut state.containers[self.id.0];
            if index >= container.children.len() {
                tracing::warn!(container = self.id.0, index, "no such tab");
                return;
            }
            container.selected = index;
            let mut shown = Vec::new();
            if container.kind == ContainerKind::Tabs {
                let slots = container.children.len();
                for i in 0..slots {
                    refresh_child(&mut state, self.id, i, &mut shown);
                }
            }
            shown
        };
        tracing::debug!(container = self.id.0, index, "selected tab");
        self.run_deferred(shown);
    }

    /// Add a child slot and return its effective visibility.
    fn append_slot(&self) -> bool {
        let mut state = self.inner.state.borrow_mut();
        let container = &mut state.containers[self.id.0];
        container.child_visible.push(true);
        child_effective(container, container.child_visible.len() - 1)
    }

    fn attach(&self, node: Node) {
        self.inner.state.borrow_mut().containers[self.id.0]
            .children
            .push(node);
    }

    fn run_deferred(&self, shown: Vec<PanelId>) {
        for id in shown {
            self.inner.update_panel(id);
        }
    }

    fn with_state<T>(&self, f: impl FnOnce(&ContainerState) -> T) -> T {
        f(&self.inner.state.borrow().containers[self.id.0])
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        let container = &state.containers[self.id.0];
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("kind", &container.kind)
            .field("visible", &container.visible)
            .field("children", &container.children.len())
            .finish()
    }
}

fn child_effective(container: &ContainerState, index: usize) -> bool {
    container.visible
        && container.child_visible.get(index).copied().unwrap_or(false)
        && (container.kind != ContainerKind::Tabs || index == container.selected)
}

fn refresh_child(state: &mut State, id: ContainerId, index: usize, shown: &mut Vec<PanelId>) {
    let container = &state.containers[id.0];
    let visible = child_effective(container, index);
    if let Some(node) = container.children.get(index).copied() {
        apply(state, node, visible, shown);
    }
}

/// Push `visible` down to `node` and everything below it.
fn apply(state: &mut State, node: Node, visible: bool, shown: &mut Vec<PanelId>) {
    match node {
        Node::Panel(id) => {
            if let Some(panel) = state.panels.get_mut(&id) {
                panel.visible = visible;
                if visible && panel.pending_update {
                    shown.push(id);
                }
            }
        }
        Node::Container(id) => {
            state.containers[id.0].visible = visible;
            let slots = state.containers[id.0].children.len();
            for i in 0..slots {
                refresh_child(state, id, i, shown);
            }
        }
    }
}
