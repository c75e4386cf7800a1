//! Pricing stage: inventory- and competitor-driven price adjustment
//!
//! Rules are evaluated in a fixed order and the first match wins:
//! clearance (overstock), premium (scarce stock), competitive (priced above
//! the market), then maintain.
//!
//! Elasticity and target profit are carried through for reporting but do
//! not move the recommended price.

use crate::config::PricingConfig;
use crate::data::{ReferenceData, DEFAULT_ELASTICITY};
use crate::error::{Result, RetailError};
use crate::narrative::{narrate_advisory, NarrativeFacts, Narrator, TemplateNarrator};
use crate::types::{round2, Category, Percentage, Price, Quantity, Stage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Smallest display unit a recommended price is allowed to reach
pub const MIN_PRICE: Price = 0.01;

/// Pricing inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceInput {
    pub category: Category,
    pub current_price: Price,
    pub forecasted_demand: Quantity,
    pub inventory_level: Quantity,
    /// Accepted but not applied to the price
    pub target_profit_pct: Percentage,
}

impl PriceInput {
    pub fn validate(&self) -> Result<()> {
        if !self.current_price.is_finite() || self.current_price <= 0.0 {
            return Err(RetailError::malformed(
                "current_price",
                format!("must be > 0, got {}", self.current_price),
            ));
        }
        for (field, value) in [
            ("forecasted_demand", self.forecasted_demand),
            ("inventory_level", self.inventory_level),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RetailError::malformed(field, format!("must be >= 0, got {}", value)));
            }
        }
        if !self.target_profit_pct.is_finite() {
            return Err(RetailError::malformed("target_profit_pct", "must be finite"));
        }
        Ok(())
    }

    /// Inventory over forecast demand; infinite when there is no demand
    pub fn inventory_ratio(&self) -> f64 {
        if self.forecasted_demand <= 0.0 {
            f64::INFINITY
        } else {
            self.inventory_level / self.forecasted_demand
        }
    }
}

/// Pricing mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingStrategy {
    Clearance,
    Premium,
    Competitive,
    Maintain,
}

impl fmt::Display for PricingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PricingStrategy::Clearance => "clearance",
            PricingStrategy::Premium => "premium",
            PricingStrategy::Competitive => "competitive",
            PricingStrategy::Maintain => "maintain",
        })
    }
}

/// Pricing recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceResult {
    pub category: Category,
    pub current_price: Price,
    pub recommended_price: Price,
    pub change_pct: Percentage,
    pub strategy: PricingStrategy,
    /// `None` when there is no forecast demand
    pub inventory_ratio: Option<f64>,
    /// Competitor average used by the competitive rule
    pub competitor_price: Price,
    /// Informational; not applied to the price
    pub elasticity: f64,
    pub explanation_factors: Vec<String>,
    pub narrative: Option<String>,
}

/// Select the pricing rule for an input
pub fn select_strategy(
    input: &PriceInput,
    competitor_price: Price,
    config: &PricingConfig,
) -> (PricingStrategy, Percentage, Option<&'static str>) {
    let ratio = input.inventory_ratio();
    if ratio > config.clearance_ratio {
        (PricingStrategy::Clearance, config.clearance_change_pct, Some("excess inventory"))
    } else if ratio < config.premium_ratio {
        (PricingStrategy::Premium, config.premium_change_pct, Some("low inventory"))
    } else if input.current_price > competitor_price * config.competitive_margin {
        (
            PricingStrategy::Competitive,
            config.competitive_change_pct,
            Some("above competitor pricing"),
        )
    } else {
        (PricingStrategy::Maintain, 0.0, None)
    }
}

/// Pricing stage collaborator
pub trait Pricer: Send + Sync {
    fn price(&self, input: &PriceInput) -> Result<PriceResult>;
}

/// Rule-based pricer reading competitor and elasticity tables
pub struct InventoryRatioPricer {
    data: Arc<dyn ReferenceData>,
    narrator: Arc<dyn Narrator>,
    config: PricingConfig,
}

impl InventoryRatioPricer {
    pub fn new(data: Arc<dyn ReferenceData>) -> Self {
        Self {
            data,
            narrator: Arc::new(TemplateNarrator),
            config: PricingConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PricingConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_narrator(mut self, narrator: Arc<dyn Narrator>) -> Self {
        self.narrator = narrator;
        self
    }
}

impl Pricer for InventoryRatioPricer {
    fn price(&self, input: &PriceInput) -> Result<PriceResult> {
        input.validate()?;

        // No competitor data means the competitive rule compares against ourselves.
        let competitor_price = self
            .data
            .competitor_price(&input.category)
            .unwrap_or(input.current_price);
        let elasticity = self
            .data
            .elasticity(&input.category)
            .unwrap_or(DEFAULT_ELASTICITY);

        let (strategy, change_pct, factor) = select_strategy(input, competitor_price, &self.config);
        let recommended_price =
            round2(input.current_price * (1.0 + change_pct / 100.0)).max(MIN_PRICE);
        let ratio = input.inventory_ratio();
        let explanation_factors: Vec<String> = factor.into_iter().map(String::from).collect();

        log::debug!(
            "Price {}: ratio={:.2} competitor={} -> {} ({:+}%) {}",
            input.category,
            ratio,
            competitor_price,
            strategy,
            change_pct,
            recommended_price
        );

        let facts = NarrativeFacts::new()
            .with("category", &input.category)
            .with("strategy", strategy)
            .with("current_price", format!("{:.2}", input.current_price))
            .with("recommended_price", format!("{:.2}", recommended_price))
            .with("change_pct", change_pct)
            .with("elasticity", elasticity)
            .with(
                "factors",
                if explanation_factors.is_empty() {
                    "stable inventory and market pricing".to_string()
                } else {
                    explanation_factors.join(", ")
                },
            );
        let narrative = narrate_advisory(self.narrator.as_ref(), Stage::Pricing, &facts);

        Ok(PriceResult {
            category: input.category.clone(),
            current_price: input.current_price,
            recommended_price,
            change_pct,
            strategy,
            inventory_ratio: ratio.is_finite().then_some(ratio),
            competitor_price,
            elasticity,
            explanation_factors,
            narrative,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::InMemoryReferenceData;

    fn pricer(competitor: Option<f64>) -> InventoryRatioPricer {
        let mut data = InMemoryReferenceData::new();
        if let Some(price) = competitor {
            data.set_competitor_price("tv", price).unwrap();
        }
        InventoryRatioPricer::new(Arc::new(data))
    }

    fn input(inventory: f64, demand: f64, price: f64) -> PriceInput {
        PriceInput {
            category: "tv".to_string(),
            current_price: price,
            forecasted_demand: demand,
            inventory_level: inventory,
            target_profit_pct: 0.0,
        }
    }

    #[test]
    fn test_clearance() {
        let result = pricer(None).price(&input(350.0, 150.0, 28000.0)).unwrap();
        assert_eq!(result.strategy, PricingStrategy::Clearance);
        assert_eq!(result.change_pct, -8.0);
        assert_eq!(result.recommended_price, 25760.0);
    }

    #[test]
    fn test_clearance_beats_competitive() {
        let result = pricer(Some(1000.0)).price(&input(350.0, 150.0, 28000.0)).unwrap();
        assert_eq!(result.strategy, PricingStrategy::Clearance);
    }

    #[test]
    fn test_premium() {
        let result = pricer(None).price(&input(80.0, 200.0, 1500.0)).unwrap();
        assert_eq!(result.strategy, PricingStrategy::Premium);
        assert_eq!(result.change_pct, 5.0);
        assert_eq!(result.recommended_price, 1575.0);
    }

    #[test]
    fn test_competitive() {
        let result = pricer(Some(25000.0)).price(&input(100.0, 100.0, 28000.0)).unwrap();
        assert_eq!(result.strategy, PricingStrategy::Competitive);
        assert_eq!(result.change_pct, -5.0);
        assert_eq!(result.recommended_price, 26600.0);
        assert_eq!(result.competitor_price, 25000.0);
    }

    #[test]
    fn test_competitive_margin_is_strict() {
        // exactly at competitor * 1.1 is not above the margin
        let result = pricer(Some(25000.0)).price(&input(100.0, 100.0, 27500.0)).unwrap();
        assert_eq!(result.strategy, PricingStrategy::Maintain);
    }

    #[test]
    fn test_maintain_without_competitor_data() {
        let result = pricer(None).price(&input(100.0, 100.0, 28000.0)).unwrap();
        assert_eq!(result.strategy, PricingStrategy::Maintain);
        assert_eq!(result.change_pct, 0.0);
        assert_eq!(result.recommended_price, 28000.0);
        assert_eq!(result.elasticity, DEFAULT_ELASTICITY);
    }

    #[test]
    fn test_ratio_boundaries_are_strict() {
        let p = pricer(None);
        assert_eq!(p.price(&input(200.0, 100.0, 100.0)).unwrap().strategy, PricingStrategy::Maintain);
        assert_eq!(p.price(&input(50.0, 100.0, 100.0)).unwrap().strategy, PricingStrategy::Maintain);
    }

    #[test]
    fn test_zero_demand_forces_clearance() {
        let result = pricer(None).price(&input(10.0, 0.0, 100.0)).unwrap();
        assert_eq!(result.strategy, PricingStrategy::Clearance);
        assert_eq!(result.inventory_ratio, None);
    }

    #[test]
    fn test_target_profit_does_not_move_price() {
        let p = pricer(None);
        let mut a = input(350.0, 150.0, 28000.0);
        let mut b = a.clone();
        a.target_profit_pct = -20.0;
        b.target_profit_pct = 35.0;
        assert_eq!(
            p.price(&a).unwrap().recommended_price,
            p.price(&b).unwrap().recommended_price
        );
    }

    #[test]
    fn test_sub_cent_price_stays_positive() {
        let result = pricer(None).price(&input(350.0, 100.0, 0.004)).unwrap();
        assert_eq!(result.strategy, PricingStrategy::Clearance);
        assert!(result.recommended_price > 0.0);
        assert_eq!(result.recommended_price, MIN_PRICE);
    }

    #[test]
    fn test_invalid_price_rejected() {
        let err = pricer(None).price(&input(10.0, 10.0, 0.0)).unwrap_err();
        assert!(matches!(err, RetailError::MalformedInput { .. }));
    }

    #[test]
    fn test_narrative_mentions_strategy() {
        let result = pricer(None).price(&input(350.0, 150.0, 28000.0)).unwrap();
        assert!(result.narrative.unwrap().starts_with("clearance pricing"));
    }
}
