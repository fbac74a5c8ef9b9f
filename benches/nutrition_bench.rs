// ABOUTME: Criterion benchmarks for the pure pipeline helpers
// ABOUTME: Measures the nutrition calculator, response extraction and pricing normalization
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Criterion benchmarks for the CPU-only parts of the pipeline.
//!
//! Agent calls dominate a real run; these numbers exist to catch
//! regressions in the code that runs between them.

#![allow(clippy::missing_docs_in_private_items, missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nourish_server::agents::extraction::extract_json_object;
use nourish_server::config::NutritionConfig;
use nourish_server::intelligence::{calculate_nutrition, NutritionInputs};
use nourish_server::models::PricingDetails;
use serde_json::json;

const ACTIVITIES: [&str; 5] = [
    "Sedentary",
    "Lightly active",
    "Moderately active",
    "Very active",
    "Extra active",
];

const GOALS: [&str; 3] = ["Weight loss", "Maintenance", "Muscle gain"];

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn generate_inputs(count: usize) -> Vec<NutritionInputs> {
    (0..count)
        .map(|index| NutritionInputs {
            age: 18 + (index % 60) as u32,
            gender: if index % 2 == 0 { "Male" } else { "Female" }.to_owned(),
            weight_kg: 45.0 + (index % 70) as f64,
            height_cm: 150.0 + (index % 45) as f64,
            activity: ACTIVITIES[index % ACTIVITIES.len()].to_owned(),
            goal: GOALS[index % GOALS.len()].to_owned(),
            diet: if index % 3 == 0 { "Vegan" } else { "Vegetarian" }.to_owned(),
        })
        .collect()
}

fn bench_nutrition_calculator(c: &mut Criterion) {
    let mut group = c.benchmark_group("nutrition_calculator");
    let config = NutritionConfig::global();

    for count in [1_usize, 100, 1000] {
        let inputs = generate_inputs(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("profiles", count), &inputs, |b, inputs| {
            b.iter(|| {
                for input in inputs {
                    black_box(calculate_nutrition(black_box(input), config));
                }
            });
        });
    }

    group.finish();
}

fn bench_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("extraction");

    let plain = json!({
        "Day 1": {
            "Breakfast": {"dish_name": "Poha", "protein_grams": 25},
            "Lunch": {"dish_name": "Rajma Chawal", "protein_grams": 30},
            "Dinner": {"dish_name": "Paneer Tikka", "protein_grams": 35}
        }
    })
    .to_string();
    let fenced = format!("Here is your plan:\n```json\n{plain}\n```\nEnjoy!");

    group.bench_function("plain_object", |b| {
        b.iter(|| black_box(extract_json_object(black_box(&plain))));
    });
    group.bench_function("prose_and_fence", |b| {
        b.iter(|| black_box(extract_json_object(black_box(&fenced))));
    });

    group.finish();
}

fn bench_pricing(c: &mut Criterion) {
    let mut group = c.benchmark_group("pricing");
    let raw = json!({
        "Grains": {"items": [{"name": "Rice", "price": 80}, {"name": "Poha", "price": "₹45"}]},
        "Vegetables": {"items": [{"name": "Onion", "price": 30}, {"name": "Tomato", "price": "₹40"}]},
        "Dairy": {"items": [{"name": "Paneer", "price": 90}]},
        "Grand_Total": 285
    });

    group.bench_function("from_agent_value", |b| {
        b.iter(|| black_box(PricingDetails::from_agent_value(black_box(&raw))));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_nutrition_calculator,
    bench_extraction,
    bench_pricing
);
criterion_main!(benches);
