//! Sequential forecast -> replenishment -> pricing coordinator

use super::request::PipelineRequest;
use super::state::PipelineState;
use crate::config::PipelineConfig;
use crate::data::ReferenceData;
use crate::error::RetailError;
use crate::forecast::{Forecaster, MovingAverageForecaster};
use crate::narrative::Narrator;
use crate::pricing::{InventoryRatioPricer, Pricer};
use crate::replenishment::{Replenisher, SafetyStockReplenisher};
use crate::types::Stage;
use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag, checked between stages
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Runs the three stages in order over a single [`PipelineState`].
///
/// A failing stage is recorded in the state and the remaining stages are
/// skipped; `run` itself never returns an error.
#[derive(Clone)]
pub struct RetailPipeline {
    forecaster: Arc<dyn Forecaster>,
    replenisher: Arc<dyn Replenisher>,
    pricer: Arc<dyn Pricer>,
}

impl RetailPipeline {
    pub fn new(
        forecaster: Arc<dyn Forecaster>,
        replenisher: Arc<dyn Replenisher>,
        pricer: Arc<dyn Pricer>,
    ) -> Self {
        Self {
            forecaster,
            replenisher,
            pricer,
        }
    }

    /// Default stage implementations wired to one reference data source
    pub fn from_reference_data(
        data: Arc<dyn ReferenceData>,
        config: &PipelineConfig,
        narrator: Arc<dyn Narrator>,
        as_of: NaiveDate,
    ) -> Self {
        let forecaster = MovingAverageForecaster::new(Arc::clone(&data), as_of)
            .with_config(config.forecast.clone())
            .with_narrator(Arc::clone(&narrator));
        let replenisher = SafetyStockReplenisher::new(config.replenishment.clone())
            .with_narrator(Arc::clone(&narrator));
        let pricer = InventoryRatioPricer::new(data)
            .with_config(config.pricing.clone())
            .with_narrator(narrator);
        Self::new(Arc::new(forecaster), Arc::new(replenisher), Arc::new(pricer))
    }

    /// Run all stages for one request
    pub fn run(&self, request: &PipelineRequest) -> PipelineState {
        self.run_with_cancel(request, &CancellationToken::new())
    }

    /// Run all stages, stopping at the next stage boundary once `token` is cancelled
    pub fn run_with_cancel(
        &self,
        request: &PipelineRequest,
        token: &CancellationToken,
    ) -> PipelineState {
        let mut state = PipelineState::new(request.category.clone(), request.horizon_days);
        log::info!(
            "Pipeline {} started for {} (horizon {}d)",
            state.run_id(),
            request.category,
            request.horizon_days
        );

        if let Err(e) = request.validate() {
            self.fail(&mut state, Stage::Forecast, e);
            return state;
        }

        if self.cancelled(&mut state, token) {
            return state;
        }
        let forecast = match self
            .forecaster
            .forecast(&request.category, request.horizon_days)
        {
            Ok(forecast) => forecast,
            Err(e) => {
                self.fail(&mut state, Stage::Forecast, e);
                return state;
            }
        };
        let replenish_input = request.replenish_input(&forecast);
        let price_input = request.price_input(&forecast);
        state.record_forecast(forecast);

        if self.cancelled(&mut state, token) {
            return state;
        }
        match self.replenisher.replenish(&replenish_input) {
            Ok(result) => state.record_replenishment(result),
            Err(e) => {
                self.fail(&mut state, Stage::Replenishment, e);
                return state;
            }
        }

        if self.cancelled(&mut state, token) {
            return state;
        }
        match self.pricer.price(&price_input) {
            Ok(result) => state.record_pricing(result),
            Err(e) => {
                self.fail(&mut state, Stage::Pricing, e);
                return state;
            }
        }

        log::info!(
            "Pipeline {} completed for {}",
            state.run_id(),
            request.category
        );
        state
    }

    fn cancelled(&self, state: &mut PipelineState, token: &CancellationToken) -> bool {
        if !token.is_cancelled() {
            return false;
        }
        log::warn!(
            "Pipeline {} for {} cancelled before {:?}",
            state.run_id(),
            state.category(),
            state.next_stage()
        );
        state.cancel();
        true
    }

    fn fail(&self, state: &mut PipelineState, stage: Stage, error: RetailError) {
        log::warn!(
            "Pipeline {} for {} failed at {}: {}",
            state.run_id(),
            state.category(),
            stage,
            error
        );
        state.record_failure(stage, &error);
    }
}
