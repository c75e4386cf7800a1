//! Bounded parallel batch runs and run summaries

use super::coordinator::{CancellationToken, RetailPipeline};
use super::request::PipelineRequest;
use super::state::{PipelineState, PipelineStatus};
use crate::error::{Result, RetailError};
use crate::pricing::PricingStrategy;
use crate::replenishment::ReorderTiming;
use crate::types::{Category, Price, Quantity};
use hashbrown::HashMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

impl RetailPipeline {
    /// Run independent requests on at most `max_concurrency` threads.
    ///
    /// States come back in request order. Each request gets its own state,
    /// so one failing category never affects another.
    pub fn run_batch(
        &self,
        requests: &[PipelineRequest],
        max_concurrency: usize,
    ) -> Result<Vec<PipelineState>> {
        self.run_batch_with_cancel(requests, max_concurrency, &CancellationToken::new())
    }

    /// Batch run sharing one cancellation token across all requests
    pub fn run_batch_with_cancel(
        &self,
        requests: &[PipelineRequest],
        max_concurrency: usize,
        token: &CancellationToken,
    ) -> Result<Vec<PipelineState>> {
        if max_concurrency == 0 {
            return Err(RetailError::ConfigError(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let threads = max_concurrency.min(requests.len());
        log::info!(
            "Running batch of {} requests on {} threads",
            requests.len(),
            threads
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("retail-batch-{}", i))
            .build()
            .map_err(|e| RetailError::ConfigError(format!("thread pool: {}", e)))?;

        let states: Vec<PipelineState> = pool.install(|| {
            requests
                .par_iter()
                .map(|request| self.run_with_cancel(request, token))
                .collect()
        });

        let summary = BatchSummary::from_states(&states);
        log::info!(
            "Batch finished: {} completed, {} failed, {} cancelled",
            summary.completed,
            summary.failed,
            summary.cancelled
        );
        Ok(states)
    }
}

/// Flattened view of one run, for reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSummary {
    pub run_id: Uuid,
    pub category: Category,
    pub status: PipelineStatus,
    pub final_demand: Option<Quantity>,
    pub nearest_event: Option<String>,
    pub reorder_qty: Option<Quantity>,
    pub timing: Option<ReorderTiming>,
    pub strategy: Option<PricingStrategy>,
    pub recommended_price: Option<Price>,
    pub error: Option<String>,
}

impl PipelineSummary {
    pub fn from_state(state: &PipelineState) -> Self {
        let forecast = state.forecast();
        let replenishment = state.replenishment();
        let pricing = state.pricing();
        Self {
            run_id: state.run_id(),
            category: state.category().to_string(),
            status: state.status(),
            final_demand: forecast.map(|f| f.final_demand),
            nearest_event: forecast.and_then(|f| f.nearest_event.clone()),
            reorder_qty: replenishment.map(|r| r.reorder_qty),
            timing: replenishment.map(|r| r.timing),
            strategy: pricing.map(|p| p.strategy),
            recommended_price: pricing.map(|p| p.recommended_price),
            error: state.errors().last().map(|e| e.message.clone()),
        }
    }
}

/// Status counts across a batch
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub by_status: HashMap<PipelineStatus, usize>,
    /// Categories whose replenishment says order now
    pub immediate_reorders: Vec<Category>,
}

impl BatchSummary {
    pub fn from_states(states: &[PipelineState]) -> Self {
        let mut summary = BatchSummary {
            total: states.len(),
            ..Default::default()
        };
        for state in states {
            let status = state.status();
            *summary.by_status.entry(status).or_insert(0) += 1;
            match status {
                PipelineStatus::Completed => summary.completed += 1,
                PipelineStatus::Cancelled => summary.cancelled += 1,
                s if s.is_failed() => summary.failed += 1,
                _ => {}
            }
            if state
                .replenishment()
                .map_or(false, |r| r.timing == ReorderTiming::Immediate)
            {
                summary.immediate_reorders.push(state.category().to_string());
            }
        }
        summary
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.completed as f64 / self.total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::data::InMemoryReferenceData;
    use crate::narrative::TemplateNarrator;
    use crate::types::DailySales;
    use chrono::{Duration, NaiveDate};
    use std::sync::Arc;

    fn pipeline() -> RetailPipeline {
        let as_of = NaiveDate::from_ymd_opt(2024, 10, 20).unwrap();
        let mut data = InMemoryReferenceData::new();
        for category in ["tv", "phone", "fashion"] {
            for i in 1..=30 {
                data.add_sales(DailySales::new(as_of - Duration::days(i), category, 20.0))
                    .unwrap();
            }
        }
        RetailPipeline::from_reference_data(
            Arc::new(data),
            &PipelineConfig::default(),
            Arc::new(TemplateNarrator),
            as_of,
        )
    }

    fn requests(categories: &[&str]) -> Vec<PipelineRequest> {
        let config = PipelineConfig::default();
        categories
            .iter()
            .map(|c| PipelineRequest::for_category(*c, &config))
            .collect()
    }

    #[test]
    fn test_batch_preserves_order() {
        let categories = ["phone", "missing", "tv", "fashion"];
        let states = pipeline().run_batch(&requests(&categories), 2).unwrap();
        let got: Vec<&str> = states.iter().map(|s| s.category()).collect();
        assert_eq!(got, categories);
        assert_eq!(states[1].status(), PipelineStatus::FailedForecast);
        assert!(states[0].is_completed());
        assert!(states[2].is_completed());
    }

    #[test]
    fn test_batch_zero_concurrency_rejected() {
        assert!(matches!(
            pipeline().run_batch(&requests(&["tv"]), 0),
            Err(RetailError::ConfigError(_))
        ));
    }

    #[test]
    fn test_empty_batch() {
        assert!(pipeline().run_batch(&[], 4).unwrap().is_empty());
    }

    #[test]
    fn test_batch_summary_counts() {
        let states = pipeline()
            .run_batch(&requests(&["tv", "missing", "phone"]), 3)
            .unwrap();
        let summary = BatchSummary::from_states(&states);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.completed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.by_status.get(&PipelineStatus::FailedForecast), Some(&1));
        assert!((summary.success_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_cancelled_batch() {
        let token = CancellationToken::new();
        token.cancel();
        let states = pipeline()
            .run_batch_with_cancel(&requests(&["tv", "phone"]), 2, &token)
            .unwrap();
        assert!(states.iter().all(|s| s.status() == PipelineStatus::Cancelled));
        assert_eq!(BatchSummary::from_states(&states).cancelled, 2);
    }

    #[test]
    fn test_pipeline_summary() {
        let state = pipeline().run(&requests(&["tv"])[0]);
        let summary = PipelineSummary::from_state(&state);
        assert_eq!(summary.status, PipelineStatus::Completed);
        assert_eq!(summary.final_demand, Some(20.0));
        assert!(summary.recommended_price.is_some());
        assert!(summary.error.is_none());
    }
}
