//! Metric sink written by the store-backed batch processor.

use crate::models::Metric;
use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Errors returned by a [`MetricStore`].
#[derive(Debug, Error)]
pub enum MetricStoreError {
    /// A writer panicked while holding the store lock.
    #[error("metric store lock poisoned")]
    Poisoned,
}

/// Storage for metric data points.
pub trait MetricStore: Send + Sync {
    /// Stores data points.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn insert_batch(&self, metrics: Vec<Metric>) -> Result<(), MetricStoreError>;

    /// Returns every data point with the given name, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn by_name(&self, name: &str) -> Result<Vec<Metric>, MetricStoreError>;

    /// Total number of stored data points.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn count(&self) -> Result<usize, MetricStoreError>;
}

/// Keeps one time-ordered series per metric name in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetricStore {
    series: RwLock<HashMap<String, Vec<Metric>>>,
}

impl InMemoryMetricStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricStore for InMemoryMetricStore {
    fn insert_batch(&self, metrics: Vec<Metric>) -> Result<(), MetricStoreError> {
        let mut series = self.series.write().map_err(|_| MetricStoreError::Poisoned)?;
        for metric in metrics {
            let points = series.entry(metric.name.clone()).or_default();
            // Equal timestamps keep arrival order.
            let at = points.partition_point(|p| p.timestamp <= metric.timestamp);
            points.insert(at, metric);
        }
        Ok(())
    }

    fn by_name(&self, name: &str) -> Result<Vec<Metric>, MetricStoreError> {
        let series = self.series.read().map_err(|_| MetricStoreError::Poisoned)?;
        Ok(series.get(name).cloned().unwrap_or_default())
    }

    fn count(&self) -> Result<usize, MetricStoreError> {
        let series = self.series.read().map_err(|_| MetricStoreError::Poisoned)?;
        Ok(series.values().map(Vec::len).sum())
    }
}
