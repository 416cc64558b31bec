//! Panel handles: the surface offered to the presentation layer.

use std::fmt;
use std::rc::Rc;

use super::error::FetchError;
use super::{Inner, PanelId};
use crate::filter::{Filter, FilterContext};
use crate::model::field::Field;
use crate::query::{build_statements, decode_count, decode_rows, QueryOptions, Record, Selection};
use crate::sql::query::OrderDirection;
use crate::transport::TransportError;

/// Options for creating a panel.
#[derive(Debug, Clone, Default)]
pub struct PanelOptions {
    /// Filter applied to every fetch of this panel, in addition to the
    /// dashboard's active filters.
    pub filter: Option<Filter>,
}

impl PanelOptions {
    pub fn with_filter(filter: Filter) -> Self {
        Self {
            filter: Some(filter),
        }
    }
}

/// Ordering and paging for one fetch.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    pub order_by: Vec<(Field, OrderDirection)>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page `index` (zero-based) of `size` rows.
    pub fn page(index: u64, size: u64) -> Self {
        Self {
            order_by: Vec::new(),
            limit: Some(size),
            offset: Some(index.saturating_mul(size)),
        }
    }

    pub fn order_by(mut self, field: &Field, dir: OrderDirection) -> Self {
        self.order_by.push((field.clone(), dir));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Decoded rows of one fetch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FetchResult {
    pub records: Vec<Record>,
    /// Number of result groups before paging. Present only for paged fetches.
    pub total: Option<u64>,
}

/// Handle to one panel of a dashboard.
///
/// Cloning yields another handle to the same panel.
#[derive(Clone)]
pub struct Panel {
    id: PanelId,
    inner: Rc<Inner>,
    context: FilterContext,
}

impl Panel {
    pub(crate) fn new(inner: Rc<Inner>, id: PanelId) -> Self {
        let context = inner.filter_manager.create_context();
        tracing::debug!(panel = %id, context = %context.id(), "created panel");
        Self { id, inner, context }
    }

    pub fn id(&self) -> PanelId {
        self.id
    }

    /// Fetch `selection` under the panel's base filter and every active
    /// dashboard filter.
    ///
    /// Paged fetches (`limit` or `offset` set) also report the total number
    /// of groups. Failure leaves every filter and visibility flag as it was.
    pub async fn fetch(
        &self,
        selection: &Selection,
        options: FetchOptions,
    ) -> Result<FetchResult, FetchError> {
        Ok(self.fetch_sequenced(selection, options).await?.1)
    }

    /// Like [`fetch`](Self::fetch), but returns `Ok(None)` when a newer fetch
    /// of this panel was issued while this one was in flight.
    pub async fn fetch_latest(
        &self,
        selection: &Selection,
        options: FetchOptions,
    ) -> Result<Option<FetchResult>, FetchError> {
        let (seq, result) = self.fetch_sequenced(selection, options).await?;
        if self.fetch_seq() != seq {
            tracing::debug!(panel = %self.id, seq, "discarding superseded fetch");
            return Ok(None);
        }
        Ok(Some(result))
    }

    async fn fetch_sequenced(
        &self,
        selection: &Selection,
        options: FetchOptions,
    ) -> Result<(u64, FetchResult), FetchError> {
        let (batch, seq) = {
            let mut state = self.inner.state.borrow_mut();
            let panel = state.panels.get_mut(&self.id);
            let base = panel.as_ref().and_then(|p| p.base_filter.clone());
            let filters: Vec<Filter> = base
                .into_iter()
                .chain(self.inner.filter_manager.filters())
                .collect();

            let query_options = QueryOptions {
                select: selection.clone(),
                filters,
                order_by: options.order_by,
                limit: options.limit,
                offset: options.offset,
            };
            let batch = build_statements(
                &self.inner.schema,
                &query_options,
                &self.inner.query.staging_table,
                self.inner.query.dialect,
            );

            let seq = match panel {
                Some(p) => {
                    p.fetch_seq += 1;
                    p.fetch_seq
                }
                None => 0,
            };
            (batch, seq)
        };

        let results = match self.inner.transport.execute(batch.statements()).await {
            Ok(results) => results,
            Err(e) => {
                tracing::warn!(panel = %self.id, error = %e, "fetch failed");
                return Err(e.into());
            }
        };

        let rows = results
            .get(batch.rows_index())
            .ok_or(TransportError::ResultCountMismatch {
                expected: batch.len(),
                actual: results.len(),
            })?;
        let records = decode_rows(selection, rows)?;

        let total = match batch.count_index() {
            Some(i) => {
                let rows = results.get(i).ok_or(TransportError::ResultCountMismatch {
                    expected: batch.len(),
                    actual: results.len(),
                })?;
                Some(decode_count(rows)?)
            }
            None => None,
        };

        tracing::debug!(
            panel = %self.id,
            seq,
            records = records.len(),
            total,
            "fetched"
        );
        Ok((seq, FetchResult { records, total }))
    }

    /// Apply filters from this panel, making it the only active panel.
    pub fn filter(&self, filters: Vec<Filter>) {
        self.inner.set_active(Some(self.id));
        self.context.filter(filters);
    }

    /// Remove the filter on `field`, whoever set it. Deactivates all panels.
    pub fn drop_filter(&self, field: &Field) {
        self.inner.set_active(None);
        self.context.drop_filter(field);
    }

    /// Run the update callbacks now if visible, otherwise defer them until
    /// the panel is shown.
    pub fn update(&self) {
        self.inner.update_panel(self.id);
    }

    /// Register a callback run on every update while visible.
    ///
    /// Ignored once the panel has been dropped.
    pub fn on_update(&self, callback: impl Fn() + 'static) {
        let mut state = self.inner.state.borrow_mut();
        if let Some(handlers) = state.handlers.get_mut(&self.id) {
            handlers.push(Rc::new(callback));
        }
    }

    /// Unregister the panel's callbacks and deactivate all panels.
    ///
    /// Later updates of this panel do nothing. The id stays allocated.
    pub fn drop_panel(&self) {
        self.inner.set_active(None);
        let mut state = self.inner.state.borrow_mut();
        state.handlers.remove(&self.id);
        if let Some(panel) = state.panels.get_mut(&self.id) {
            panel.pending_update = false;
        }
        tracing::debug!(panel = %self.id, "dropped panel");
    }

    pub fn is_visible(&self) -> bool {
        self.flag(|p| p.visible)
    }

    pub fn is_active(&self) -> bool {
        self.flag(|p| p.active)
    }

    pub fn has_pending_update(&self) -> bool {
        self.flag(|p| p.pending_update)
    }

    /// Whether `drop_panel` has been called.
    pub fn is_dropped(&self) -> bool {
        !self.inner.state.borrow().handlers.contains_key(&self.id)
    }

    /// Set this panel's visibility directly, running a deferred update when
    /// it becomes visible.
    ///
    /// Panels inside containers are normally shown and hidden through
    /// [`Container::set_child_visibility`](super::Container::set_child_visibility).
    pub fn set_visible(&self, visible: bool) {
        if self.inner.apply_panel_visibility(self.id, visible) {
            self.update();
        }
    }

    fn fetch_seq(&self) -> u64 {
        self.inner
            .state
            .borrow()
            .panels
            .get(&self.id)
            .map_or(0, |p| p.fetch_seq)
    }

    fn flag(&self, f: impl Fn(&super::PanelState) -> bool) -> bool {
        self.inner.state.borrow().panels.get(&self.id).is_some_and(f)
    }
}

impl fmt::Debug for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Panel")
            .field("id", &self.id)
            .field("context", &self.context.id())
            .field("visible", &self.is_visible())
            .field("active", &self.is_active())
            .finish()
    }
}
