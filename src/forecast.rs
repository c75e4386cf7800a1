//! Forecast stage: moving-average demand with seasonal and surge adjustment

use crate::config::ForecastConfig;
use crate::data::ReferenceData;
use crate::error::{Result, RetailError};
use crate::narrative::{narrate_advisory, NarrativeFacts, Narrator, TemplateNarrator};
use crate::types::{Category, Days, EventProximity, Quantity, Stage};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution};
use std::sync::Arc;

/// Demand forecast for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub category: Category,
    pub horizon_days: Days,
    /// Mean daily units over the recent history window
    pub base: Quantity,
    /// Generic event multiplier (1.0 = no effect)
    pub seasonal_multiplier: f64,
    /// Category-specific event surge (1.0 = no effect)
    pub surge_factor: f64,
    /// `base * seasonal_multiplier * surge_factor`
    #[serde(rename = "final")]
    pub final_demand: Quantity,
    pub nearest_event: Option<String>,
    pub days_to_event: Option<Days>,
    /// Number of daily points that went into `base`
    pub history_days: usize,
    pub narrative: Option<String>,
}

impl ForecastResult {
    /// Event proximity, when an event was found
    pub fn event_proximity(&self) -> Option<EventProximity> {
        match (&self.nearest_event, self.days_to_event) {
            (Some(name), Some(days)) => Some(EventProximity {
                name: name.clone(),
                days_to_event: days,
            }),
            _ => None,
        }
    }

    /// Average daily demand over the forecast horizon
    pub fn avg_daily_demand(&self) -> Quantity {
        if self.horizon_days == 0 {
            return 0.0;
        }
        self.final_demand / self.horizon_days as f64
    }
}

/// Forecast stage collaborator
pub trait Forecaster: Send + Sync {
    /// Forecast demand for a category over `horizon_days`
    fn forecast(&self, category: &str, horizon_days: Days) -> Result<ForecastResult>;
}

/// Moving-average forecaster backed by reference data
pub struct MovingAverageForecaster {
    data: Arc<dyn ReferenceData>,
    narrator: Arc<dyn Narrator>,
    config: ForecastConfig,
    /// Forecast start date
    as_of: NaiveDate,
}

impl MovingAverageForecaster {
    /// Create a forecaster starting at `as_of` with the default settings
    pub fn new(data: Arc<dyn ReferenceData>, as_of: NaiveDate) -> Self {
        Self {
            data,
            narrator: Arc::new(TemplateNarrator),
            config: ForecastConfig::default(),
            as_of,
        }
    }

    pub fn with_config(mut self, config: ForecastConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Mean of the most recent window of daily sales
    fn base_demand(&self, category: &str) -> Result<(Quantity, usize)> {
        let history = self
            .data
            .recent_daily_sales(category, self.config.moving_average_days)?;
        if history.is_empty() {
            return Err(RetailError::InsufficientHistory {
                category: category.to_string(),
            });
        }
        let days = history.len();
        let mean = Data::new(history).mean().ok_or_else(|| RetailError::InsufficientHistory {
            category: category.to_string(),
        })?;
        Ok((mean, days))
    }
}

impl Forecaster for MovingAverageForecaster {
    fn forecast(&self, category: &str, horizon_days: Days) -> Result<ForecastResult> {
        if horizon_days == 0 {
            return Err(RetailError::malformed("horizon_days", "must be > 0"));
        }

        let (base, history_days) = self.base_demand(category)?;

        let nearest = self
            .data
            .calendar()
            .nearest_event(self.as_of, self.config.event_window_days);
        let (nearest_event, days_to_event, seasonal_multiplier) = match nearest {
            Some((event, days)) => (Some(event.name.clone()), Some(days), event.multiplier),
            None => (None, None, 1.0),
        };

        let surge_factor = nearest_event
            .as_deref()
            .and_then(|event| self.data.surge_factor(category, event))
            .unwrap_or(1.0);

        for (field, factor) in [
            ("base", base),
            ("seasonal_multiplier", seasonal_multiplier),
            ("surge_factor", surge_factor),
        ] {
            if !factor.is_finite() || factor < 0.0 {
                return Err(RetailError::malformed(
                    field,
                    format!("must be a non-negative number, got {}", factor),
                ));
            }
        }
        let final_demand = base * seasonal_multiplier * surge_factor;

        log::debug!(
            "Forecast {}: base={:.2} seasonal={} surge={} final={:.2} event={:?}",
            category,
            base,
            seasonal_multiplier,
            surge_factor,
            final_demand,
            nearest_event
        );

        let facts = NarrativeFacts::new()
            .with("category", category)
            .with("base", format!("{:.2}", base))
            .with("seasonal_multiplier", seasonal_multiplier)
            .with("surge_factor", surge_factor)
            .with("final", format!("{:.2}", final_demand))
            .with_opt("event", nearest_event.as_ref());
        let narrative = narrate_advisory(self.narrator.as_ref(), Stage::Forecast, &facts);

        Ok(ForecastResult {
            category: category.to_string(),
            horizon_days,
            base,
            seasonal_multiplier,
            surge_factor,
            final_demand,
            nearest_event,
            days_to_event,
            history_days,
            narrative,
        })
    }
}
