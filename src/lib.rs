//! # Rusty-Retail
//!
//! A retail planning pipeline: demand forecasting, inventory replenishment
//! and dynamic pricing, run per product category.
//!
//! Each run forecasts demand from recent daily sales and the event calendar,
//! turns the forecast into a reorder recommendation, and finally proposes a
//! price adjustment. Results accumulate in a [`pipeline::PipelineState`];
//! a failing stage is recorded there and stops the run without losing the
//! results of earlier stages.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rusty_retail::prelude::*;
//! use std::sync::Arc;
//!
//! let data = ReferenceDataLoader::new("data").load().unwrap();
//! let config = PipelineConfig::default();
//! let pipeline = RetailPipeline::from_reference_data(
//!     Arc::new(data),
//!     &config,
//!     Arc::new(TemplateNarrator),
//!     chrono::Utc::now().date_naive(),
//! );
//!
//! let state = pipeline.run(&PipelineRequest::for_category("tv", &config));
//! println!("{}: {}", state.category(), state.status());
//! ```

pub mod calendar;
pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod narrative;
pub mod pipeline;
pub mod pricing;
pub mod replenishment;
pub mod types;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::calendar::{EventCalendar, RetailEvent};
    pub use crate::config::{CategoryProfile, PipelineConfig};
    pub use crate::data::{InMemoryReferenceData, ReferenceData, ReferenceDataLoader};
    pub use crate::error::{Result, RetailError};
    pub use crate::forecast::{ForecastResult, Forecaster, MovingAverageForecaster};
    pub use crate::narrative::{Narrator, SilentNarrator, TemplateNarrator};
    pub use crate::pipeline::{
        BatchSummary, CancellationToken, PipelineRequest, PipelineState, PipelineStatus,
        PipelineSummary, RequestOverrides, RetailPipeline,
    };
    pub use crate::pricing::{InventoryRatioPricer, PriceInput, PriceResult, Pricer, PricingStrategy};
    pub use crate::replenishment::{
        ReorderTiming, ReplenishInput, ReplenishResult, Replenisher, SafetyStockReplenisher,
        StockoutRisk,
    };
    pub use crate::types::*;
}
