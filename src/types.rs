//! Core types and constants

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Product category identifier (e.g. "tv", "groceries")
pub type Category = String;

/// Unit quantity (stock, demand, order size)
pub type Quantity = f64;

/// Price in the store currency
pub type Price = f64;

/// Percentage expressed in points (5.0 == 5%)
pub type Percentage = f64;

/// Number of calendar days
pub type Days = u32;

/// Units sold for a category on a single day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub category: Category,
    pub sales: Quantity,
}

impl DailySales {
    /// Create a new daily sales record
    pub fn new(date: NaiveDate, category: impl Into<Category>, sales: Quantity) -> Self {
        Self {
            date,
            category: category.into(),
            sales,
        }
    }
}

/// Demand volatility class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volatility {
    Low,
    Medium,
    High,
}

impl Volatility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Volatility::Low => "low",
            Volatility::Medium => "medium",
            Volatility::High => "high",
        }
    }
}

impl Default for Volatility {
    fn default() -> Self {
        Volatility::Medium
    }
}

impl fmt::Display for Volatility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Volatility {
    type Err = crate::error::RetailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Volatility::Low),
            "medium" => Ok(Volatility::Medium),
            "high" => Ok(Volatility::High),
            other => Err(crate::error::RetailError::ParseError(format!(
                "unknown volatility '{}'",
                other
            ))),
        }
    }
}

/// The three independently failable pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Forecast,
    Replenishment,
    Pricing,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Forecast => "forecast",
            Stage::Replenishment => "replenishment",
            Stage::Pricing => "pricing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upcoming calendar event as seen from a forecast start date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventProximity {
    pub name: String,
    pub days_to_event: Days,
}

/// Round to two decimals (paise/cents)
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volatility_parse() {
        assert_eq!("HIGH".parse::<Volatility>().unwrap(), Volatility::High);
        assert_eq!(" low ".parse::<Volatility>().unwrap(), Volatility::Low);
        assert!("extreme".parse::<Volatility>().is_err());
        assert_eq!(Volatility::default(), Volatility::Medium);
    }

    #[test]
    fn test_stage_serde_names() {
        let json = serde_json::to_string(&Stage::Replenishment).unwrap();
        assert_eq!(json, "\"replenishment\"");
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(25760.004), 25760.0);
        assert_eq!(round2(1574.999), 1575.0);
    }
}
