//! Caller-supplied parameters for one pipeline run

use crate::config::PipelineConfig;
use crate::error::{Result, RetailError};
use crate::forecast::ForecastResult;
use crate::pricing::PriceInput;
use crate::replenishment::ReplenishInput;
use crate::types::{Category, Days, Percentage, Price, Quantity, Volatility};
use serde::{Deserialize, Serialize};

/// Inventory, supplier and price parameters for one category run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRequest {
    pub category: Category,
    pub horizon_days: Days,
    pub current_stock: Quantity,
    pub in_transit_stock: Quantity,
    pub lead_time_days: Days,
    pub minimum_order_quantity: Quantity,
    pub volatility: Volatility,
    pub current_price: Price,
    /// Stock level seen by pricing; defaults to `current_stock`
    pub inventory_level: Option<Quantity>,
    pub target_profit_pct: Percentage,
}

/// Partial request parameters, e.g. from command-line flags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOverrides {
    pub horizon_days: Option<Days>,
    pub current_stock: Option<Quantity>,
    pub in_transit_stock: Option<Quantity>,
    pub lead_time_days: Option<Days>,
    pub minimum_order_quantity: Option<Quantity>,
    pub volatility: Option<Volatility>,
    pub current_price: Option<Price>,
}

impl PipelineRequest {
    /// Request filled from the category profile and supplier defaults
    pub fn for_category(category: impl Into<Category>, config: &PipelineConfig) -> Self {
        let category = category.into();
        let profile = config.profile(&category);
        Self {
            horizon_days: config.default_horizon_days,
            current_stock: profile.current_stock,
            in_transit_stock: profile.in_transit_stock,
            lead_time_days: config.replenishment.default_lead_time_days,
            minimum_order_quantity: config.replenishment.default_minimum_order_quantity,
            volatility: config.replenishment.default_volatility,
            current_price: profile.current_price,
            inventory_level: None,
            target_profit_pct: 0.0,
            category,
        }
    }

    pub fn with_horizon(mut self, horizon_days: Days) -> Self {
        self.horizon_days = horizon_days;
        self
    }

    pub fn with_stock(mut self, current_stock: Quantity, in_transit_stock: Quantity) -> Self {
        self.current_stock = current_stock;
        self.in_transit_stock = in_transit_stock;
        self
    }

    pub fn with_supplier(mut self, lead_time_days: Days, minimum_order_quantity: Quantity) -> Self {
        self.lead_time_days = lead_time_days;
        self.minimum_order_quantity = minimum_order_quantity;
        self
    }

    pub fn with_volatility(mut self, volatility: Volatility) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_price(mut self, current_price: Price) -> Self {
        self.current_price = current_price;
        self
    }

    pub fn with_inventory_level(mut self, inventory_level: Quantity) -> Self {
        self.inventory_level = Some(inventory_level);
        self
    }

    pub fn with_target_profit_pct(mut self, target_profit_pct: Percentage) -> Self {
        self.target_profit_pct = target_profit_pct;
        self
    }

    /// Apply caller overrides; fields left `None` keep their current value
    pub fn with_overrides(mut self, overrides: &RequestOverrides) -> Self {
        if let Some(horizon_days) = overrides.horizon_days {
            self.horizon_days = horizon_days;
        }
        if let Some(current_stock) = overrides.current_stock {
            self.current_stock = current_stock;
        }
        if let Some(in_transit_stock) = overrides.in_transit_stock {
            self.in_transit_stock = in_transit_stock;
        }
        if let Some(lead_time_days) = overrides.lead_time_days {
            self.lead_time_days = lead_time_days;
        }
        if let Some(minimum_order_quantity) = overrides.minimum_order_quantity {
            self.minimum_order_quantity = minimum_order_quantity;
        }
        if let Some(volatility) = overrides.volatility {
            self.volatility = volatility;
        }
        if let Some(current_price) = overrides.current_price {
            self.current_price = current_price;
        }
        self
    }

    /// Checks that must hold before any stage runs
    pub fn validate(&self) -> Result<()> {
        if self.category.trim().is_empty() {
            return Err(RetailError::malformed("category", "must not be empty"));
        }
        if self.horizon_days == 0 {
            return Err(RetailError::malformed("horizon_days", "must be > 0"));
        }
        Ok(())
    }

    /// Replenishment input derived from a forecast
    pub fn replenish_input(&self, forecast: &ForecastResult) -> ReplenishInput {
        ReplenishInput {
            category: self.category.clone(),
            forecasted_demand: forecast.final_demand,
            avg_daily_demand: forecast.avg_daily_demand(),
            volatility: self.volatility,
            current_stock: self.current_stock,
            in_transit_stock: self.in_transit_stock,
            lead_time_days: self.lead_time_days,
            minimum_order_quantity: self.minimum_order_quantity,
            event: forecast.event_proximity(),
        }
    }

    /// Pricing input derived from a forecast
    pub fn price_input(&self, forecast: &ForecastResult) -> PriceInput {
        PriceInput {
            category: self.category.clone(),
            current_price: self.current_price,
            forecasted_demand: forecast.final_demand,
            inventory_level: self.inventory_level.unwrap_or(self.current_stock),
            target_profit_pct: self.target_profit_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventProximity;

    fn forecast() -> ForecastResult {
        ForecastResult {
            category: "tv".to_string(),
            horizon_days: 30,
            base: 145.2,
            seasonal_multiplier: 1.45,
            surge_factor: 2.5,
            final_demand: 526.35,
            nearest_event: Some("Diwali".to_string()),
            days_to_event: Some(12),
            history_days: 30,
            narrative: None,
        }
    }

    #[test]
    fn test_for_category_uses_profile() {
        let request = PipelineRequest::for_category("tv", &PipelineConfig::default());
        assert_eq!(request.current_stock, 45.0);
        assert_eq!(request.in_transit_stock, 10.0);
        assert_eq!(request.current_price, 28000.0);
        assert_eq!(request.lead_time_days, 10);
        assert_eq!(request.minimum_order_quantity, 50.0);
        assert_eq!(request.volatility, Volatility::Medium);
        assert_eq!(request.horizon_days, 30);
    }

    #[test]
    fn test_replenish_input_from_forecast() {
        let request = PipelineRequest::for_category("tv", &PipelineConfig::default());
        let input = request.replenish_input(&forecast());
        assert_eq!(input.forecasted_demand, 526.35);
        assert!((input.avg_daily_demand - 17.545).abs() < 1e-9);
        assert_eq!(
            input.event,
            Some(EventProximity {
                name: "Diwali".to_string(),
                days_to_event: 12
            })
        );
    }

    #[test]
    fn test_price_input_inventory_defaults_to_stock() {
        let request = PipelineRequest::for_category("tv", &PipelineConfig::default());
        assert_eq!(request.price_input(&forecast()).inventory_level, 45.0);

        let request = request.with_inventory_level(350.0).with_target_profit_pct(12.0);
        let input = request.price_input(&forecast());
        assert_eq!(input.inventory_level, 350.0);
        assert_eq!(input.target_profit_pct, 12.0);
    }

    #[test]
    fn test_overrides_keep_unset_fields() {
        let config = PipelineConfig::default();
        let overrides = RequestOverrides {
            current_stock: Some(12.0),
            lead_time_days: Some(21),
            ..Default::default()
        };
        let request = PipelineRequest::for_category("tv", &config).with_overrides(&overrides);

        assert_eq!(request.current_stock, 12.0);
        assert_eq!(request.in_transit_stock, 10.0);
        assert_eq!(request.lead_time_days, 21);
        assert_eq!(request.minimum_order_quantity, 50.0);
        assert_eq!(request.current_price, 28000.0);
        assert_eq!(request.horizon_days, 30);
    }

    #[test]
    fn test_overrides_apply_every_field() {
        let config = PipelineConfig::default();
        let overrides = RequestOverrides {
            horizon_days: Some(14),
            current_stock: Some(5.0),
            in_transit_stock: Some(7.0),
            lead_time_days: Some(3),
            minimum_order_quantity: Some(20.0),
            volatility: Some(Volatility::High),
            current_price: Some(999.0),
        };
        let request = PipelineRequest::for_category("tv", &config).with_overrides(&overrides);
        let expected = PipelineRequest::for_category("tv", &config)
            .with_horizon(14)
            .with_stock(5.0, 7.0)
            .with_supplier(3, 20.0)
            .with_volatility(Volatility::High)
            .with_price(999.0);
        assert_eq!(request, expected);

        let untouched = PipelineRequest::for_category("tv", &config)
            .with_overrides(&RequestOverrides::default());
        assert_eq!(untouched, PipelineRequest::for_category("tv", &config));
    }

    #[test]
    fn test_validate() {
        let config = PipelineConfig::default();
        assert!(PipelineRequest::for_category("tv", &config).validate().is_ok());
        assert!(PipelineRequest::for_category(" ", &config).validate().is_err());
        assert!(PipelineRequest::for_category("tv", &config)
            .with_horizon(0)
            .validate()
            .is_err());
    }
}
