//! Read-only reference data: sales history, events, surge, competitor and
//! elasticity tables

pub mod loader;

pub use loader::ReferenceDataLoader;

use crate::calendar::{EventCalendar, RetailEvent};
use crate::error::{Result, RetailError};
use crate::types::{Category, DailySales, Price, Quantity};
use chrono::NaiveDate;
use hashbrown::HashMap;
use std::collections::BTreeMap;

/// Default elasticity when a category has no entry
pub const DEFAULT_ELASTICITY: f64 = -1.5;

/// Reference data provider consumed by the stages
///
/// Implementations are loaded once and shared read-only between runs.
pub trait ReferenceData: Send + Sync {
    /// Most recent `days` per-day unit sales for a category, oldest first.
    ///
    /// Fails with `DataUnavailable` when the category is unknown.
    fn recent_daily_sales(&self, category: &str, days: usize) -> Result<Vec<Quantity>>;

    /// Event calendar
    fn calendar(&self) -> &EventCalendar;

    /// Historical surge factor for a category during an event
    fn surge_factor(&self, category: &str, event: &str) -> Option<f64>;

    /// Average competitor price for a category
    fn competitor_price(&self, category: &str) -> Option<Price>;

    /// Price elasticity for a category
    fn elasticity(&self, category: &str) -> Option<f64>;

    /// Categories with sales history
    fn categories(&self) -> Vec<Category>;
}

/// In-memory reference data tables
#[derive(Debug, Clone, Default)]
pub struct InMemoryReferenceData {
    /// category -> (date -> units sold that day)
    sales: HashMap<Category, BTreeMap<NaiveDate, Quantity>>,
    calendar: EventCalendar,
    /// event -> (category -> surge factor)
    surge: HashMap<String, HashMap<Category, f64>>,
    competitor_prices: HashMap<Category, Price>,
    elasticities: HashMap<Category, f64>,
}

impl InMemoryReferenceData {
    /// Create empty reference tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sales record; records for the same day are summed
    pub fn add_sales(&mut self, record: DailySales) -> Result<()> {
        if !record.sales.is_finite() || record.sales < 0.0 {
            return Err(RetailError::malformed(
                "sales",
                format!(
                    "must be >= 0, got {} for {} on {}",
                    record.sales, record.category, record.date
                ),
            ));
        }
        *self
            .sales
            .entry(record.category)
            .or_default()
            .entry(record.date)
            .or_insert(0.0) += record.sales;
        Ok(())
    }

    /// Add many sales records
    pub fn add_sales_records(&mut self, records: impl IntoIterator<Item = DailySales>) -> Result<usize> {
        let mut count = 0;
        for record in records {
            self.add_sales(record)?;
            count += 1;
        }
        Ok(count)
    }

    /// Register a category with an empty history
    pub fn register_category(&mut self, category: impl Into<Category>) {
        self.sales.entry(category.into()).or_default();
    }

    /// Add an event to the calendar
    pub fn add_event(&mut self, event: RetailEvent) -> Result<()> {
        self.calendar.add_event(event)
    }

    /// Replace the whole calendar
    pub fn set_calendar(&mut self, calendar: EventCalendar) {
        self.calendar = calendar;
    }

    /// Set the surge factor for (category, event)
    pub fn set_surge_factor(&mut self, event: impl Into<String>, category: impl Into<Category>, factor: f64) -> Result<()> {
        if !factor.is_finite() || factor < 0.0 {
            return Err(RetailError::malformed(
                "surge_factor",
                format!("must be >= 0, got {}", factor),
            ));
        }
        self.surge
            .entry(event.into())
            .or_default()
            .insert(category.into(), factor);
        Ok(())
    }

    /// Set the competitor average price for a category
    pub fn set_competitor_price(&mut self, category: impl Into<Category>, price: Price) -> Result<()> {
        if !price.is_finite() || price <= 0.0 {
            return Err(RetailError::malformed(
                "competitor_avg_price",
                format!("must be > 0, got {}", price),
            ));
        }
        self.competitor_prices.insert(category.into(), price);
        Ok(())
    }

    /// Set the price elasticity for a category
    pub fn set_elasticity(&mut self, category: impl Into<Category>, elasticity: f64) {
        self.elasticities.insert(category.into(), elasticity);
    }

    /// Number of distinct days of history for a category
    pub fn history_len(&self, category: &str) -> usize {
        self.sales.get(category).map(|h| h.len()).unwrap_or(0)
    }
}

impl ReferenceData for InMemoryReferenceData {
    fn recent_daily_sales(&self, category: &str, days: usize) -> Result<Vec<Quantity>> {
        let history = self
            .sales
            .get(category)
            .ok_or_else(|| RetailError::DataUnavailable {
                category: category.to_string(),
            })?;

        let skip = history.len().saturating_sub(days);
        Ok(history.values().skip(skip).copied().collect())
    }

    fn calendar(&self) -> &EventCalendar {
        &self.calendar
    }

    fn surge_factor(&self, category: &str, event: &str) -> Option<f64> {
        self.surge.get(event).and_then(|by_cat| by_cat.get(category).copied())
    }

    fn competitor_price(&self, category: &str) -> Option<Price> {
        self.competitor_prices.get(category).copied()
    }

    fn elasticity(&self, category: &str) -> Option<f64> {
        self.elasticities.get(category).copied()
    }

    fn categories(&self) -> Vec<Category> {
        let mut categories: Vec<Category> = self.sales.keys().cloned().collect();
        categories.sort();
        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    #[test]
    fn test_recent_sales_tail() {
        let mut data = InMemoryReferenceData::new();
        for d in 1..=10 {
            data.add_sales(DailySales::new(date(d), "tv", d as f64)).unwrap();
        }

        let recent = data.recent_daily_sales("tv", 3).unwrap();
        assert_eq!(recent, vec![8.0, 9.0, 10.0]);

        let all = data.recent_daily_sales("tv", 30).unwrap();
        assert_eq!(all.len(), 10);
    }

    #[test]
    fn test_same_day_records_summed() {
        let mut data = InMemoryReferenceData::new();
        data.add_sales(DailySales::new(date(1), "tv", 4.0)).unwrap();
        data.add_sales(DailySales::new(date(1), "tv", 6.0)).unwrap();
        assert_eq!(data.recent_daily_sales("tv", 30).unwrap(), vec![10.0]);
    }

    #[test]
    fn test_out_of_order_records_sorted() {
        let mut data = InMemoryReferenceData::new();
        data.add_sales(DailySales::new(date(3), "tv", 3.0)).unwrap();
        data.add_sales(DailySales::new(date(1), "tv", 1.0)).unwrap();
        data.add_sales(DailySales::new(date(2), "tv", 2.0)).unwrap();
        assert_eq!(data.recent_daily_sales("tv", 2).unwrap(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_unknown_category() {
        let data = InMemoryReferenceData::new();
        let err = data.recent_daily_sales("laptop", 30).unwrap_err();
        assert!(matches!(err, RetailError::DataUnavailable { .. }));
    }

    #[test]
    fn test_registered_category_is_empty() {
        let mut data = InMemoryReferenceData::new();
        data.register_category("laptop");
        assert!(data.recent_daily_sales("laptop", 30).unwrap().is_empty());
        assert_eq!(data.categories(), vec!["laptop".to_string()]);
    }

    #[test]
    fn test_negative_sales_rejected() {
        let mut data = InMemoryReferenceData::new();
        assert!(data.add_sales(DailySales::new(date(1), "tv", -1.0)).is_err());
    }

    #[test]
    fn test_lookup_tables() {
        let mut data = InMemoryReferenceData::new();
        data.set_surge_factor("Diwali", "tv", 2.5).unwrap();
        data.set_competitor_price("tv", 27000.0).unwrap();
        data.set_elasticity("tv", -1.2);

        assert_eq!(data.surge_factor("tv", "Diwali"), Some(2.5));
        assert_eq!(data.surge_factor("tv", "Christmas"), None);
        assert_eq!(data.surge_factor("laptop", "Diwali"), None);
        assert_eq!(data.competitor_price("tv"), Some(27000.0));
        assert_eq!(data.elasticity("tv"), Some(-1.2));
        assert!(data.set_competitor_price("tv", 0.0).is_err());
    }
}
