//! Metric data points decoded from OTLP metric exports.
//!
//! Every supported OTLP data point becomes one [`Metric`]. Gauges and
//! non-monotonic sums map to [`MetricData::Gauge`], monotonic sums to
//! [`MetricData::Counter`] and explicit-bucket histograms to
//! [`MetricData::Histogram`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use validator::Validate;

/// Shape of a metric data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Monotonic running total.
    Counter,
    /// Point-in-time value.
    Gauge,
    /// Bucketed distribution.
    Histogram,
}

impl MetricType {
    /// Lowercase name used in JSON and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
        }
    }
}

impl std::fmt::Display for MetricType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit-bucket histogram in OTLP layout.
///
/// `bucket_counts[i]` counts observations in `(bounds[i-1], bounds[i]]`; the
/// last bucket is unbounded, so there is one more count than bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistogramData {
    /// Ascending bucket upper bounds.
    pub bounds: Vec<f64>,
    /// Per-bucket (not cumulative) observation counts.
    pub bucket_counts: Vec<u64>,
    /// Sum of all observations.
    pub sum: f64,
    /// Number of observations.
    pub count: u64,
}

/// The measured value of a data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum MetricData {
    /// Monotonic running total.
    Counter(f64),
    /// Point-in-time value.
    Gauge(f64),
    /// Bucketed distribution.
    Histogram(HistogramData),
}

impl MetricData {
    /// The data point's shape.
    #[must_use]
    pub fn metric_type(&self) -> MetricType {
        match self {
            Self::Counter(_) => MetricType::Counter,
            Self::Gauge(_) => MetricType::Gauge,
            Self::Histogram(_) => MetricType::Histogram,
        }
    }

    /// The scalar value of a counter or gauge.
    #[must_use]
    pub fn number(&self) -> Option<f64> {
        match self {
            Self::Counter(v) | Self::Gauge(v) => Some(*v),
            Self::Histogram(_) => None,
        }
    }

    /// The histogram payload, for histogram points.
    #[must_use]
    pub fn as_histogram(&self) -> Option<&HistogramData> {
        match self {
            Self::Histogram(h) => Some(h),
            Self::Counter(_) | Self::Gauge(_) => None,
        }
    }
}

/// A single metric data point.
///
/// ```
/// use shared::models::{Metric, MetricType};
///
/// let metric = Metric::counter("http_requests_total", 1234.0)
///     .with_label("method", "GET")
///     .with_unit("1");
///
/// assert_eq!(metric.metric_type(), MetricType::Counter);
/// assert!(metric.validate_metric().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Metric {
    /// Instrument name.
    #[validate(length(min = 1, message = "name is empty"))]
    pub name: String,

    /// Measured value.
    pub data: MetricData,

    /// Observation time of the data point.
    pub timestamp: DateTime<Utc>,

    /// String-valued data point attributes plus `service`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Unit, e.g. `By` or `s`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Instrument description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Why a metric was rejected.
#[derive(Debug, Error)]
pub enum MetricValidationError {
    /// A required field is missing.
    #[error("metric: {0}")]
    Fields(#[from] validator::ValidationErrors),

    /// A counter or gauge is NaN or infinite.
    #[error("metric {name:?} has a non-finite value")]
    NonFinite {
        /// Offending metric.
        name: String,
    },

    /// Histogram bounds are not strictly ascending.
    #[error("histogram {name:?} bounds are not ascending")]
    UnsortedBounds {
        /// Offending metric.
        name: String,
    },

    /// Bucket counts do not match the bounds, or do not add up to `count`.
    #[error("histogram {name:?} has {buckets} bucket(s) for {bounds} bound(s) and count {count}")]
    BucketMismatch {
        /// Offending metric.
        name: String,
        /// Number of bounds.
        bounds: usize,
        /// Number of bucket counts.
        buckets: usize,
        /// Declared observation count.
        count: u64,
    },
}

impl Metric {
    /// Creates a data point observed now.
    #[must_use]
    pub fn new(name: impl Into<String>, data: MetricData) -> Self {
        Self {
            name: name.into(),
            data,
            timestamp: Utc::now(),
            labels: BTreeMap::new(),
            unit: None,
            description: None,
        }
    }

    /// Creates a counter data point observed now.
    #[must_use]
    pub fn counter(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, MetricData::Counter(value))
    }

    /// Creates a gauge data point observed now.
    #[must_use]
    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, MetricData::Gauge(value))
    }

    /// Creates a histogram data point observed now.
    #[must_use]
    pub fn histogram(name: impl Into<String>, data: HistogramData) -> Self {
        Self::new(name, MetricData::Histogram(data))
    }

    /// Adds a label.
    #[must_use]
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Sets the unit.
    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the observation time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Type of the data point.
    #[must_use]
    pub fn metric_type(&self) -> MetricType {
        self.data.metric_type()
    }

    /// Number of observations behind this data point.
    #[must_use]
    pub fn observation_count(&self) -> u64 {
        match &self.data {
            MetricData::Counter(_) | MetricData::Gauge(_) => 1,
            MetricData::Histogram(h) => h.count,
        }
    }

    /// Checks the data point before it is stored.
    ///
    /// A histogram without buckets (sum and count only) is valid.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate_metric(&self) -> Result<(), MetricValidationError> {
        self.validate()?;

        match &self.data {
            MetricData::Counter(v) | MetricData::Gauge(v) if !v.is_finite() => {
                Err(MetricValidationError::NonFinite {
                    name: self.name.clone(),
                })
            }
            MetricData::Histogram(h) => self.validate_histogram(h),
            MetricData::Counter(_) | MetricData::Gauge(_) => Ok(()),
        }
    }

    fn validate_histogram(&self, h: &HistogramData) -> Result<(), MetricValidationError> {
        if h.bounds.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(MetricValidationError::UnsortedBounds {
                name: self.name.clone(),
            });
        }
        if h.bucket_counts.is_empty() && h.bounds.is_empty() {
            return Ok(());
        }
        let shape_ok = h.bucket_counts.len() == h.bounds.len() + 1;
        let total = h
            .bucket_counts
            .iter()
            .try_fold(0u64, |acc, &n| acc.checked_add(n));
        if !shape_ok || total != Some(h.count) {
            return Err(MetricValidationError::BucketMismatch {
                name: self.name.clone(),
                bounds: h.bounds.len(),
                buckets: h.bucket_counts.len(),
                count: h.count,
            });
        }
        Ok(())
    }
}
