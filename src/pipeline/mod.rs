//! Pipeline coordination: run state, requests, sequential runs and batches
//!
//! A run threads one [`PipelineState`] through forecast, replenishment and
//! pricing. Stage failures are captured in the state rather than returned,
//! so callers always get back whatever partial results were produced.

pub mod batch;
pub mod coordinator;
pub mod request;
pub mod state;

pub use batch::{BatchSummary, PipelineSummary};
pub use coordinator::{CancellationToken, RetailPipeline};
pub use request::{PipelineRequest, RequestOverrides};
pub use state::{PipelineState, PipelineStatus, StageError};
