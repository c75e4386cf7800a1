//! Pipeline configuration: stage constants and per-category defaults

use crate::error::{Result, RetailError};
use crate::types::{Days, Percentage, Price, Quantity, Volatility};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Forecast stage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Days of history in the moving average
    pub moving_average_days: usize,
    /// How far ahead an event still affects the forecast
    pub event_window_days: Days,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            moving_average_days: 30,
            event_window_days: 15,
        }
    }
}

/// Replenishment stage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplenishmentConfig {
    pub low_volatility_multiplier: f64,
    pub medium_volatility_multiplier: f64,
    pub high_volatility_multiplier: f64,
    /// Applied when an event falls inside the supplier lead time
    pub festival_multiplier: f64,
    /// Runway below this many days is classed `soon`
    pub soon_runway_days: f64,
    pub default_lead_time_days: Days,
    pub default_minimum_order_quantity: Quantity,
    pub default_volatility: Volatility,
}

impl ReplenishmentConfig {
    /// Safety-stock multiplier for a volatility class
    pub fn volatility_multiplier(&self, volatility: Volatility) -> f64 {
        match volatility {
            Volatility::Low => self.low_volatility_multiplier,
            Volatility::Medium => self.medium_volatility_multiplier,
            Volatility::High => self.high_volatility_multiplier,
        }
    }
}

impl Default for ReplenishmentConfig {
    fn default() -> Self {
        Self {
            low_volatility_multiplier: 1.1,
            medium_volatility_multiplier: 1.25,
            high_volatility_multiplier: 1.4,
            festival_multiplier: 1.2,
            soon_runway_days: 30.0,
            default_lead_time_days: 10,
            default_minimum_order_quantity: 50.0,
            default_volatility: Volatility::Medium,
        }
    }
}

/// Pricing stage settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Inventory ratio above which stock is cleared
    pub clearance_ratio: f64,
    /// Inventory ratio below which a premium is charged
    pub premium_ratio: f64,
    /// Price above competitor average times this margin triggers a cut
    pub competitive_margin: f64,
    pub clearance_change_pct: Percentage,
    pub premium_change_pct: Percentage,
    pub competitive_change_pct: Percentage,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            clearance_ratio: 2.0,
            premium_ratio: 0.5,
            competitive_margin: 1.1,
            clearance_change_pct: -8.0,
            premium_change_pct: 5.0,
            competitive_change_pct: -5.0,
        }
    }
}

/// Default operating parameters for a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryProfile {
    pub current_stock: Quantity,
    pub in_transit_stock: Quantity,
    pub current_price: Price,
}

impl CategoryProfile {
    pub fn new(current_stock: Quantity, in_transit_stock: Quantity, current_price: Price) -> Self {
        Self {
            current_stock,
            in_transit_stock,
            current_price,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub default_horizon_days: Days,
    pub forecast: ForecastConfig,
    pub replenishment: ReplenishmentConfig,
    pub pricing: PricingConfig,
    /// Profile used for categories missing from `categories`
    pub fallback_profile: CategoryProfile,
    pub categories: HashMap<String, CategoryProfile>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_horizon_days: 30,
            forecast: ForecastConfig::default(),
            replenishment: ReplenishmentConfig::default(),
            pricing: PricingConfig::default(),
            fallback_profile: CategoryProfile::new(200.0, 50.0, 5000.0),
            categories: default_category_profiles(),
        }
    }
}

fn default_category_profiles() -> HashMap<String, CategoryProfile> {
    [
        ("tv", 45.0, 10.0, 28000.0),
        ("laptop", 25.0, 5.0, 48000.0),
        ("phone", 80.0, 20.0, 16000.0),
        ("kitchen_appliances", 120.0, 30.0, 5500.0),
        ("fashion", 350.0, 50.0, 1500.0),
        ("groceries", 800.0, 200.0, 220.0),
        ("electronics", 450.0, 100.0, 9000.0),
    ]
    .into_iter()
    .map(|(name, stock, transit, price)| {
        (name.to_string(), CategoryProfile::new(stock, transit, price))
    })
    .collect()
}

impl PipelineConfig {
    /// Profile for a category, falling back to `fallback_profile`
    pub fn profile(&self, category: &str) -> &CategoryProfile {
        self.categories
            .get(category)
            .unwrap_or(&self.fallback_profile)
    }

    /// Parse from JSON
    pub fn from_json_str(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.default_horizon_days == 0 {
            return Err(RetailError::ConfigError(
                "default_horizon_days must be > 0".to_string(),
            ));
        }
        if self.forecast.moving_average_days == 0 {
            return Err(RetailError::ConfigError(
                "moving_average_days must be > 0".to_string(),
            ));
        }
        let r = &self.replenishment;
        for (name, value) in [
            ("low_volatility_multiplier", r.low_volatility_multiplier),
            ("medium_volatility_multiplier", r.medium_volatility_multiplier),
            ("high_volatility_multiplier", r.high_volatility_multiplier),
            ("festival_multiplier", r.festival_multiplier),
            ("soon_runway_days", r.soon_runway_days),
            ("default_minimum_order_quantity", r.default_minimum_order_quantity),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(RetailError::ConfigError(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        let p = &self.pricing;
        if !(p.premium_ratio < p.clearance_ratio) {
            return Err(RetailError::ConfigError(format!(
                "premium_ratio ({}) must be below clearance_ratio ({})",
                p.premium_ratio, p.clearance_ratio
            )));
        }
        if !p.competitive_margin.is_finite() || p.competitive_margin <= 0.0 {
            return Err(RetailError::ConfigError(format!(
                "competitive_margin must be > 0, got {}",
                p.competitive_margin
            )));
        }
        for (name, pct) in [
            ("clearance_change_pct", p.clearance_change_pct),
            ("premium_change_pct", p.premium_change_pct),
            ("competitive_change_pct", p.competitive_change_pct),
        ] {
            if !pct.is_finite() || pct <= -100.0 {
                return Err(RetailError::ConfigError(format!(
                    "{} must be greater than -100, got {}",
                    name, pct
                )));
            }
        }
        Ok(())
    }
}
