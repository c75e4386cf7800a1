//! Batch pipeline example over in-memory reference data

use chrono::{Duration, NaiveDate};
use rusty_retail::prelude::*;
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::init();

    println!("=== Rusty-Retail: Festival Batch Example ===\n");

    let as_of = NaiveDate::from_ymd_opt(2024, 10, 20).unwrap();

    // 30 days of flat sales per category
    let mut data = InMemoryReferenceData::new();
    let daily = [("tv", 145.2), ("phone", 60.0), ("fashion", 12.0), ("groceries", 400.0)];
    for (category, sales) in daily {
        for day in 1..=30 {
            data.add_sales(DailySales::new(as_of - Duration::days(day), category, sales))?;
        }
    }

    // Diwali lands inside the forecast window and the supplier lead time
    data.add_event(RetailEvent::new("Diwali", as_of + Duration::days(8), 1.45)?)?;
    data.set_surge_factor("Diwali", "tv", 2.5)?;
    data.set_surge_factor("Diwali", "phone", 1.8)?;
    data.set_competitor_price("tv", 25000.0)?;
    data.set_competitor_price("groceries", 150.0)?;

    let config = PipelineConfig::default();
    let pipeline = RetailPipeline::from_reference_data(
        Arc::new(data),
        &config,
        Arc::new(TemplateNarrator),
        as_of,
    );

    let requests: Vec<PipelineRequest> = ["tv", "phone", "fashion", "groceries", "garden"]
        .iter()
        .map(|category| PipelineRequest::for_category(*category, &config))
        .collect();

    let states = pipeline.run_batch(&requests, 2)?;

    for state in &states {
        println!("{} [{}]", state.category(), state.status());
        if let Some(forecast) = state.forecast() {
            println!(
                "  forecast: {:.2} (event: {})",
                forecast.final_demand,
                forecast.nearest_event.as_deref().unwrap_or("none")
            );
        }
        if let Some(r) = state.replenishment() {
            println!(
                "  reorder:  {:.0} units, {} (risk {})",
                r.reorder_qty.ceil(),
                r.timing,
                r.stockout_risk
            );
        }
        if let Some(p) = state.pricing() {
            println!(
                "  price:    {:.2} -> {:.2} ({})",
                p.current_price, p.recommended_price, p.strategy
            );
        }
        for error in state.errors() {
            println!("  error:    {} stage: {}", error.stage, error.message);
        }
        println!();
    }

    let summary = BatchSummary::from_states(&states);
    println!(
        "Completed {}/{} runs; reorder now: {:?}",
        summary.completed, summary.total, summary.immediate_reorders
    );

    Ok(())
}
