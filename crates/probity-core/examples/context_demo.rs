//! Assertion context demo
//!
//! Buffers several failures in one scope and prints the aggregate through
//! the console adapter instead of panicking on the first one.
//!
//! Run with: cargo run -p probity-core --example context_demo

use probity_core::context::AssertionContext;
use probity_core::logging_facility::{init, Profile};
use probity_core::reporting::ConsoleAdapter;
use probity_core::{assert_that, describe_struct};
use std::sync::Arc;

#[derive(Debug)]
struct Shipment {
    id: u32,
    weight_kg: f64,
    items: Vec<&'static str>,
}

describe_struct!(Shipment { id, weight_kg as "WeightKg", items });

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init(Profile::Cli);

    let expected = Shipment {
        id: 17,
        weight_kg: 12.5,
        items: vec!["crate", "pallet"],
    };
    let actual = Shipment {
        id: 17,
        weight_kg: 12.500_000_1,
        items: vec!["crate", "box"],
    };

    let scope = AssertionContext::begin("shipment-checks")?;
    scope.configure(|c| c.reporting_adapter = Arc::new(ConsoleAdapter::stderr()));

    assert_that(&actual)
        .named("shipment")
        .is_structurally_equal_to(&expected);
    assert_that(actual.items.clone())
        .named("items")
        .is_equivalent_to(&["pallet", "crate"]);
    assert_that(actual.weight_kg)
        .named("weight")
        .is_approximately(12.5, None);

    println!("{} failure(s) buffered in '{}'", scope.len(), scope.name());
    scope.dispose();
    Ok(())
}
