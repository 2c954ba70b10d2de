//! Batch processors: the business end of the intake pipeline.
//!
//! A [`BatchProcessor`] receives the events decoded from one export request.
//! The receiver side only observes whether processing succeeded.

mod store;

pub use store::StoreProcessor;

use crate::context::Context;
use crate::models::Batch;
use thiserror::Error;

/// Errors a batch processor can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProcessorError {
    /// At least one event failed validation; nothing was processed.
    #[error("batch rejected: {count} invalid event(s), first: {first}")]
    InvalidEvents {
        /// Number of invalid events in the batch.
        count: usize,
        /// Validation message of the first invalid event.
        first: String,
    },

    /// The backing storage could not accept the batch.
    #[error("storage unavailable: {0}")]
    Storage(String),
}

/// Processes batches of decoded events.
///
/// Implementations may consume or rewrite the batch in place.
#[tonic::async_trait]
pub trait BatchProcessor: Send + Sync {
    /// Processes one batch.
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be processed.
    async fn process_batch(&self, ctx: &Context, batch: &mut Batch) -> Result<(), ProcessorError>;
}
