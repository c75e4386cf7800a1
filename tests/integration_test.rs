//! Integration tests for rusty-retail

use approx::assert_relative_eq;
use chrono::{Duration, NaiveDate};
use rusty_retail::prelude::*;
use std::fs;
use std::sync::Arc;

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 10, 20).unwrap()
}

/// tv at 145.2/day with Diwali 12 days out
fn festival_data() -> InMemoryReferenceData {
    let mut data = InMemoryReferenceData::new();
    for day in 1..=30 {
        data.add_sales(DailySales::new(as_of() - Duration::days(day), "tv", 145.2))
            .unwrap();
        data.add_sales(DailySales::new(as_of() - Duration::days(day), "fashion", 5.0))
            .unwrap();
    }
    data.add_event(RetailEvent::new("Diwali", as_of() + Duration::days(12), 1.45).unwrap())
        .unwrap();
    data.set_surge_factor("Diwali", "tv", 2.5).unwrap();
    data.set_competitor_price("tv", 25000.0).unwrap();
    data
}

fn pipeline(data: InMemoryReferenceData) -> RetailPipeline {
    RetailPipeline::from_reference_data(
        Arc::new(data),
        &PipelineConfig::default(),
        Arc::new(TemplateNarrator),
        as_of(),
    )
}

fn request(category: &str) -> PipelineRequest {
    PipelineRequest::for_category(category, &PipelineConfig::default())
}

#[test]
fn test_festival_run_end_to_end() {
    let state = pipeline(festival_data()).run(&request("tv"));
    assert_eq!(state.status(), PipelineStatus::Completed);
    assert!(state.errors().is_empty());

    let forecast = state.forecast().unwrap();
    assert_relative_eq!(forecast.base, 145.2, epsilon = 1e-9);
    assert_relative_eq!(forecast.final_demand, 526.35, epsilon = 1e-6);
    assert_eq!(forecast.nearest_event.as_deref(), Some("Diwali"));
    assert_eq!(forecast.days_to_event, Some(12));

    // 55 units cover ~3 days of festival demand
    let replenishment = state.replenishment().unwrap();
    assert_eq!(replenishment.timing, ReorderTiming::Immediate);
    assert_eq!(replenishment.stockout_risk, StockoutRisk::High);
    assert_eq!(replenishment.festival_multiplier, 1.0);
    assert_eq!(replenishment.effective_stock, 55.0);
    assert_relative_eq!(replenishment.safety_stock, 219.3125, epsilon = 1e-6);
    assert_relative_eq!(replenishment.reorder_qty, 690.6625, epsilon = 1e-6);

    let pricing = state.pricing().unwrap();
    assert_eq!(pricing.strategy, PricingStrategy::Premium);
    assert_eq!(pricing.recommended_price, 29400.0);
}

#[test]
fn test_event_inside_lead_time_raises_safety_stock() {
    let req = request("tv").with_supplier(14, 50.0);
    let state = pipeline(festival_data()).run(&req);
    let replenishment = state.replenishment().unwrap();
    assert_eq!(replenishment.festival_multiplier, 1.2);
    assert_relative_eq!(
        replenishment.safety_stock,
        17.545 * 14.0 * 1.25 * 1.2,
        epsilon = 1e-6
    );
    assert!(replenishment
        .explanation_factors
        .iter()
        .any(|f| f.contains("Diwali")));
}

#[test]
fn test_overstock_goes_to_clearance() {
    // fashion: 5/day, no Diwali surge, 350 on hand
    let req = request("fashion").with_stock(350.0, 0.0).with_price(1500.0);
    let state = pipeline(festival_data()).run(&req);
    assert_eq!(state.status(), PipelineStatus::Completed);

    let replenishment = state.replenishment().unwrap();
    assert_eq!(replenishment.reorder_qty, 0.0);
    assert_eq!(replenishment.timing, ReorderTiming::Defer);

    let pricing = state.pricing().unwrap();
    assert_eq!(pricing.strategy, PricingStrategy::Clearance);
    assert_eq!(pricing.change_pct, -8.0);
    assert_eq!(pricing.recommended_price, 1380.0);
}

#[test]
fn test_replenishment_failure_keeps_forecast() {
    let req = request("tv").with_stock(-5.0, 0.0);
    let state = pipeline(festival_data()).run(&req);

    assert_eq!(state.status(), PipelineStatus::FailedReplenishment);
    assert!(state.forecast().is_some());
    assert!(state.replenishment().is_none());
    assert!(state.pricing().is_none());
    assert_eq!(state.errors().len(), 1);
    assert_eq!(state.errors()[0].stage, Stage::Replenishment);
    assert!(state.errors()[0].message.contains("current_stock"));
}

#[test]
fn test_pricing_failure_keeps_replenishment() {
    let req = request("tv").with_price(0.0);
    let state = pipeline(festival_data()).run(&req);
    assert_eq!(state.status(), PipelineStatus::FailedPricing);
    assert!(state.forecast().is_some());
    assert!(state.replenishment().is_some());
    assert!(state.pricing().is_none());
}

#[test]
fn test_unknown_category_fails_forecast() {
    let state = pipeline(festival_data()).run(&request("garden"));
    assert_eq!(state.status(), PipelineStatus::FailedForecast);
    assert!(state.completed_stages().is_empty());
    assert!(state.errors()[0].message.contains("garden"));
}

#[test]
fn test_silent_narrator_does_not_change_outcome() {
    let loud = pipeline(festival_data()).run(&request("tv"));
    let quiet = RetailPipeline::from_reference_data(
        Arc::new(festival_data()),
        &PipelineConfig::default(),
        Arc::new(SilentNarrator),
        as_of(),
    )
    .run(&request("tv"));

    assert_eq!(quiet.status(), PipelineStatus::Completed);
    assert!(quiet.forecast().unwrap().narrative.is_none());
    assert!(quiet.pricing().unwrap().narrative.is_none());
    assert_eq!(
        loud.replenishment().unwrap().reorder_qty,
        quiet.replenishment().unwrap().reorder_qty
    );
    assert_eq!(
        loud.pricing().unwrap().recommended_price,
        quiet.pricing().unwrap().recommended_price
    );
}

#[test]
fn test_runs_are_idempotent() {
    let p = pipeline(festival_data());
    let a = p.run(&request("tv"));
    let b = p.run(&request("tv"));
    assert_ne!(a.run_id(), b.run_id());
    assert_eq!(a.forecast(), b.forecast());
    assert_eq!(a.replenishment(), b.replenishment());
    assert_eq!(a.pricing(), b.pricing());
}

#[test]
fn test_batch_isolates_failures() {
    let requests = vec![request("garden"), request("tv"), request("fashion")];
    let states = pipeline(festival_data()).run_batch(&requests, 2).unwrap();

    let statuses: Vec<PipelineStatus> = states.iter().map(|s| s.status()).collect();
    assert_eq!(
        statuses,
        vec![
            PipelineStatus::FailedForecast,
            PipelineStatus::Completed,
            PipelineStatus::Completed
        ]
    );
    let summary = BatchSummary::from_states(&states);
    assert_eq!(summary.immediate_reorders, vec!["tv".to_string()]);
}

#[test]
fn test_state_serializes_with_status_and_errors() {
    let state = pipeline(festival_data()).run(&request("garden"));
    let json: serde_json::Value = serde_json::to_value(&state).unwrap();
    assert_eq!(json["status"], "failed_forecast");
    assert_eq!(json["errors"][0]["stage"], "forecast");
    assert!(json["forecast"].is_null());
}

#[test]
fn test_load_from_directory_and_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut csv = String::from("date,category,sales\n");
    for day in 1..=30 {
        let date = as_of() - Duration::days(day);
        csv.push_str(&format!("{},tv,145.2\n", date));
    }
    fs::write(dir.path().join("sales_history.csv"), csv).unwrap();
    fs::write(
        dir.path().join("events.json"),
        r#"{"events": [{"name": "Diwali", "date": "2024-11-01", "multiplier": 1.45}]}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("surge_profile.json"),
        r#"{"Diwali": {"tv": 2.5}}"#,
    )
    .unwrap();

    let data = ReferenceDataLoader::new(dir.path()).load().unwrap();
    let state = pipeline(data).run(&request("tv"));
    assert_eq!(state.status(), PipelineStatus::Completed);
    assert_relative_eq!(
        state.forecast().unwrap().final_demand,
        526.35,
        epsilon = 1e-6
    );
}
