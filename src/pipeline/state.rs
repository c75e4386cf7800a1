//! Accumulated result state of one pipeline run

use crate::error::RetailError;
use crate::forecast::ForecastResult;
use crate::pricing::PriceResult;
use crate::replenishment::ReplenishResult;
use crate::types::{Category, Days, Stage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Running,
    Completed,
    FailedForecast,
    FailedReplenishment,
    FailedPricing,
    /// Stopped at a stage boundary on request; partial results are valid
    Cancelled,
}

impl PipelineStatus {
    /// Failure status for a stage
    pub fn failed_at(stage: Stage) -> Self {
        match stage {
            Stage::Forecast => PipelineStatus::FailedForecast,
            Stage::Replenishment => PipelineStatus::FailedReplenishment,
            Stage::Pricing => PipelineStatus::FailedPricing,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            PipelineStatus::FailedForecast
                | PipelineStatus::FailedReplenishment
                | PipelineStatus::FailedPricing
        )
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineStatus::Running)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStatus::Running => "running",
            PipelineStatus::Completed => "completed",
            PipelineStatus::FailedForecast => "failed_forecast",
            PipelineStatus::FailedReplenishment => "failed_replenishment",
            PipelineStatus::FailedPricing => "failed_pricing",
            PipelineStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stage failure recorded as data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageError {
    pub stage: Stage,
    pub message: String,
}

/// Single accumulator threaded through the three stages.
///
/// Each result field is written at most once, in stage order, and only while
/// the run is still `Running`. Errors are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    category: Category,
    horizon_days: Days,
    forecast: Option<ForecastResult>,
    replenishment: Option<ReplenishResult>,
    pricing: Option<PriceResult>,
    errors: Vec<StageError>,
    status: PipelineStatus,
}

impl PipelineState {
    /// Fresh state for a run
    pub fn new(category: impl Into<Category>, horizon_days: Days) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            category: category.into(),
            horizon_days,
            forecast: None,
            replenishment: None,
            pricing: None,
            errors: Vec::new(),
            status: PipelineStatus::Running,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn horizon_days(&self) -> Days {
        self.horizon_days
    }

    pub fn forecast(&self) -> Option<&ForecastResult> {
        self.forecast.as_ref()
    }

    pub fn replenishment(&self) -> Option<&ReplenishResult> {
        self.replenishment.as_ref()
    }

    pub fn pricing(&self) -> Option<&PriceResult> {
        self.pricing.as_ref()
    }

    pub fn errors(&self) -> &[StageError] {
        &self.errors
    }

    pub fn status(&self) -> PipelineStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == PipelineStatus::Completed
    }

    /// Stages that produced a result, in order
    pub fn completed_stages(&self) -> Vec<Stage> {
        let mut stages = Vec::new();
        if self.forecast.is_some() {
            stages.push(Stage::Forecast);
        }
        if self.replenishment.is_some() {
            stages.push(Stage::Replenishment);
        }
        if self.pricing.is_some() {
            stages.push(Stage::Pricing);
        }
        stages
    }

    /// The stage that would run next
    pub fn next_stage(&self) -> Option<Stage> {
        if self.status.is_terminal() {
            return None;
        }
        match (&self.forecast, &self.replenishment, &self.pricing) {
            (None, _, _) => Some(Stage::Forecast),
            (Some(_), None, _) => Some(Stage::Replenishment),
            (Some(_), Some(_), None) => Some(Stage::Pricing),
            _ => None,
        }
    }

    pub(crate) fn record_forecast(&mut self, result: ForecastResult) {
        debug_assert_eq!(self.next_stage(), Some(Stage::Forecast));
        if self.next_stage() == Some(Stage::Forecast) {
            self.forecast = Some(result);
        }
    }

    pub(crate) fn record_replenishment(&mut self, result: ReplenishResult) {
        debug_assert_eq!(self.next_stage(), Some(Stage::Replenishment));
        if self.next_stage() == Some(Stage::Replenishment) {
            self.replenishment = Some(result);
        }
    }

    /// Recording pricing completes the run
    pub(crate) fn record_pricing(&mut self, result: PriceResult) {
        debug_assert_eq!(self.next_stage(), Some(Stage::Pricing));
        if self.next_stage() == Some(Stage::Pricing) {
            self.pricing = Some(result);
            self.finish(PipelineStatus::Completed);
        }
    }

    pub(crate) fn record_failure(&mut self, stage: Stage, error: &RetailError) {
        if self.status.is_terminal() {
            return;
        }
        self.errors.push(StageError {
            stage,
            message: error.to_string(),
        });
        self.finish(PipelineStatus::failed_at(stage));
    }

    pub(crate) fn cancel(&mut self) {
        self.finish(PipelineStatus::Cancelled);
    }

    fn finish(&mut self, status: PipelineStatus) {
        if !self.status.is_terminal() {
            self.status = status;
            self.finished_at = Some(Utc::now());
        }
    }
}
