//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use prodplan_core::BusinessCalendar;

use crate::db::{
    BatchStore, GroupStore, ItemCatalog, MemoryStore, PgBatchStore, PgGroupStore, PgItemCatalog,
    PgSummaryStore, SummaryStore,
};
use crate::services::{
    BatchTrackingService, DailySummaryService, IndentAggregator, ProductionGroupService,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    calendar: BusinessCalendar,
    pool: Option<PgPool>,
    summaries: Arc<dyn SummaryStore>,
    batches: Arc<dyn BatchStore>,
    groups: Arc<dyn GroupStore>,
    catalog: Arc<dyn ItemCatalog>,
}

impl AppState {
    /// State backed by `PostgreSQL`.
    #[must_use]
    pub fn postgres(pool: PgPool, calendar: BusinessCalendar) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                calendar,
                summaries: Arc::new(PgSummaryStore::new(pool.clone())),
                batches: Arc::new(PgBatchStore::new(pool.clone())),
                groups: Arc::new(PgGroupStore::new(pool.clone())),
                catalog: Arc::new(PgItemCatalog::new(pool.clone())),
                pool: Some(pool),
            }),
        }
    }

    /// State backed by an in-memory store.
    #[must_use]
    pub fn in_memory(store: MemoryStore, calendar: BusinessCalendar) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                calendar,
                pool: None,
                summaries: Arc::new(store.clone()),
                batches: Arc::new(store.clone()),
                groups: Arc::new(store.clone()),
                catalog: Arc::new(store),
            }),
        }
    }

    #[must_use]
    pub fn calendar(&self) -> BusinessCalendar {
        self.inner.calendar
    }

    /// Database pool, when backed by `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn indent_aggregator(&self) -> IndentAggregator<'_> {
        IndentAggregator::new(
            self.inner.summaries.as_ref(),
            self.inner.catalog.as_ref(),
            self.inner.calendar,
        )
    }

    #[must_use]
    pub fn daily_summaries(&self) -> DailySummaryService<'_> {
        DailySummaryService::new(self.inner.summaries.as_ref())
    }

    #[must_use]
    pub fn batch_tracking(&self) -> BatchTrackingService<'_> {
        BatchTrackingService::new(
            self.inner.batches.as_ref(),
            self.inner.summaries.as_ref(),
            self.inner.calendar,
        )
    }

    #[must_use]
    pub fn production_groups(&self) -> ProductionGroupService<'_> {
        ProductionGroupService::new(
            self.inner.groups.as_ref(),
            self.inner.summaries.as_ref(),
            self.inner.catalog.as_ref(),
            self.inner.calendar,
        )
    }
}
