//! Per-zone index cache with single-flight construction

use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::error::Result;
use crate::types::ZoneCode;

use super::index::ZoneIndex;

/// Whether a lookup reused a cached index or built one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Built,
}

/// Process-lifetime map from zone code to its built index
///
/// At most one build runs per zone at a time; concurrent callers for the
/// same zone wait for it. A failed build caches nothing. Entries are never
/// evicted or refreshed.
#[derive(Debug, Default)]
pub struct IndexCache {
    cells: DashMap<ZoneCode, Arc<OnceCell<Arc<ZoneIndex>>>>,
}

impl IndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached index for `zone`, if one has been built
    pub fn get(&self, zone: &ZoneCode) -> Option<Arc<ZoneIndex>> {
        self.cells.get(zone).and_then(|cell| cell.get().cloned())
    }

    /// Return the cached index or run `build` to create it
    pub async fn get_or_try_build<F, Fut>(
        &self,
        zone: &ZoneCode,
        build: F,
    ) -> Result<(Arc<ZoneIndex>, CacheOutcome)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ZoneIndex>>,
    {
        // Clone the cell out so no map shard lock is held across the await
        let cell = self.cells.entry(zone.clone()).or_default().value().clone();

        if let Some(index) = cell.get() {
            tracing::debug!("Index cache hit for zone {}", zone);
            return Ok((Arc::clone(index), CacheOutcome::Hit));
        }

        let mut built = false;
        let built_flag = &mut built;
        let index = cell
            .get_or_try_init(|| async move {
                *built_flag = true;
                build().await.map(Arc::new)
            })
            .await?;

        let outcome = if built {
            CacheOutcome::Built
        } else {
            tracing::debug!("Index for zone {} was built by a concurrent query", zone);
            CacheOutcome::Hit
        };
        Ok((Arc::clone(index), outcome))
    }

    /// Number of zones with a built index
    pub fn len(&self) -> usize {
        self.cells.iter().filter(|cell| cell.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Zones with a built index, sorted
    pub fn zones(&self) -> Vec<ZoneCode> {
        let mut zones: Vec<ZoneCode> = self
            .cells
            .iter()
            .filter(|cell| cell.value().initialized())
            .map(|cell| cell.key().clone())
            .collect();
        zones.sort();
        zones
    }
}
