//! Replenishment stage: safety stock, reorder quantity and timing risk
//!
//! The decision is a pure function of [`ReplenishInput`] built from seven
//! ordered steps, each using only results of earlier steps:
//!
//! 1. volatility multiplier
//! 2. festival urgency multiplier
//! 3. effective stock (on hand + in transit)
//! 4. runway days
//! 5. safety stock
//! 6. reorder quantity (raised to the supplier minimum when triggered)
//! 7. timing and stockout-risk classification

use crate::config::ReplenishmentConfig;
use crate::error::{Result, RetailError};
use crate::narrative::{narrate_advisory, NarrativeFacts, Narrator, TemplateNarrator};
use crate::types::{Category, Days, EventProximity, Quantity, Stage, Volatility};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Replenishment inputs: forecast demand, inventory and supplier terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishInput {
    pub category: Category,
    /// Demand expected over the forecast horizon
    pub forecasted_demand: Quantity,
    pub avg_daily_demand: Quantity,
    pub volatility: Volatility,
    pub current_stock: Quantity,
    pub in_transit_stock: Quantity,
    pub lead_time_days: Days,
    pub minimum_order_quantity: Quantity,
    pub event: Option<EventProximity>,
}

impl ReplenishInput {
    /// Reject negative or non-finite quantities
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("forecasted_demand", self.forecasted_demand),
            ("avg_daily_demand", self.avg_daily_demand),
            ("current_stock", self.current_stock),
            ("in_transit_stock", self.in_transit_stock),
            ("minimum_order_quantity", self.minimum_order_quantity),
        ] {
            if !value.is_finite() {
                return Err(RetailError::malformed(field, format!("must be finite, got {}", value)));
            }
            if value < 0.0 {
                return Err(RetailError::malformed(field, format!("must be >= 0, got {}", value)));
            }
        }
        Ok(())
    }
}

/// When to place the reorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReorderTiming {
    Immediate,
    Soon,
    Defer,
}

impl fmt::Display for ReorderTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReorderTiming::Immediate => "immediate",
            ReorderTiming::Soon => "soon",
            ReorderTiming::Defer => "defer",
        })
    }
}

/// Likelihood of running out before new stock arrives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockoutRisk {
    High,
    Medium,
    Low,
}

impl fmt::Display for StockoutRisk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StockoutRisk::High => "high",
            StockoutRisk::Medium => "medium",
            StockoutRisk::Low => "low",
        })
    }
}

/// Replenishment decision with its intermediate quantities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplenishResult {
    pub reorder_qty: Quantity,
    pub timing: ReorderTiming,
    pub stockout_risk: StockoutRisk,
    pub volatility_multiplier: f64,
    pub festival_multiplier: f64,
    pub effective_stock: Quantity,
    /// `None` when there is no daily demand (stock never runs out)
    pub runway_days: Option<f64>,
    pub safety_stock: Quantity,
    pub explanation_factors: Vec<String>,
    pub narrative: Option<String>,
}

/// Run the seven replenishment steps; no narrative
pub fn plan_replenishment(input: &ReplenishInput, config: &ReplenishmentConfig) -> Result<ReplenishResult> {
    input.validate()?;
    let mut factors = Vec::new();

    let volatility_multiplier = config.volatility_multiplier(input.volatility);
    factors.push(format!("demand volatility is {}", input.volatility));

    let festival_multiplier = match &input.event {
        Some(event) if event.days_to_event <= input.lead_time_days => {
            factors.push(format!(
                "festival ({}) is within supplier lead time",
                event.name
            ));
            config.festival_multiplier
        }
        _ => 1.0,
    };

    let effective_stock = input.current_stock + input.in_transit_stock;

    let runway = if input.avg_daily_demand > 0.0 {
        effective_stock / input.avg_daily_demand
    } else {
        f64::INFINITY
    };

    let safety_stock = input.avg_daily_demand
        * input.lead_time_days as f64
        * volatility_multiplier
        * festival_multiplier;

    let raw_qty = (input.forecasted_demand + safety_stock - effective_stock).max(0.0);
    let reorder_qty = if raw_qty > 0.0 {
        raw_qty.max(input.minimum_order_quantity)
    } else {
        0.0
    };

    let lead_time = input.lead_time_days as f64;
    let (timing, stockout_risk) = if runway < lead_time {
        (ReorderTiming::Immediate, StockoutRisk::High)
    } else if runway < config.soon_runway_days {
        (ReorderTiming::Soon, StockoutRisk::Medium)
    } else {
        (ReorderTiming::Defer, StockoutRisk::Low)
    };

    let runway_days = runway.is_finite().then_some(runway);
    match runway_days {
        Some(days) => factors.push(format!("stock runway is {:.1} days", days)),
        None => factors.push("there is no daily demand to deplete stock".to_string()),
    }

    log::debug!(
        "Replenish {}: effective={} runway={:?} safety={:.2} raw={:.2} qty={:.2} {}/{}",
        input.category,
        effective_stock,
        runway_days,
        safety_stock,
        raw_qty,
        reorder_qty,
        timing,
        stockout_risk
    );

    Ok(ReplenishResult {
        reorder_qty,
        timing,
        stockout_risk,
        volatility_multiplier,
        festival_multiplier,
        effective_stock,
        runway_days,
        safety_stock,
        explanation_factors: factors,
        narrative: None,
    })
}

/// Replenishment stage collaborator
pub trait Replenisher: Send + Sync {
    fn replenish(&self, input: &ReplenishInput) -> Result<ReplenishResult>;
}

/// Safety-stock replenishment policy
pub struct SafetyStockReplenisher {
    config: ReplenishmentConfig,
    narrator: Arc<dyn Narrator>,
}

impl SafetyStockReplenisher {
    pub fn new(config: ReplenishmentConfig) -> Self {
        Self {
            config,
            narrator: Arc::new(TemplateNarrator),
        }
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn config(&self) -> &ReplenishmentConfig {
        &self.config
    }
}

impl Default for SafetyStockReplenisher {
    fn default() -> Self {
        Self::new(ReplenishmentConfig::default())
    }
}

impl Replenisher for SafetyStockReplenisher {
    fn replenish(&self, input: &ReplenishInput) -> Result<ReplenishResult> {
        let mut result = plan_replenishment(input, &self.config)?;

        let facts = NarrativeFacts::new()
            .with("category", &input.category)
            .with("reorder_qty", format!("{:.0}", result.reorder_qty.ceil()))
            .with("timing", result.timing)
            .with("stockout_risk", result.stockout_risk)
            .with("factors", result.explanation_factors.join(", "));
        result.narrative = narrate_advisory(self.narrator.as_ref(), Stage::Replenishment, &facts);

        Ok(result)
    }
}
