//! Probity Core - structural equivalence and fluent assertions
//!
//! This crate provides:
//! - The `Describe` model that exposes values to structural comparison
//! - A cycle-safe, depth-bounded structural comparator and its JSON twin
//! - Order-independent multiset matching and approximate float equality
//! - Fluent assertions that buffer failures in ambient assertion contexts
//! - Reporting adapters, snapshot baselines and the logging facility
//!
//! ```
//! use probity_core::{assert_that, describe_struct};
//!
//! #[derive(Debug)]
//! struct Item {
//!     name: String,
//!     value: i64,
//! }
//!
//! describe_struct!(Item { name as "Name", value as "Value" });
//!
//! let actual = Item { name: "Test".into(), value: 123 };
//! assert_that(actual).is_structurally_equal_to(&Item { name: "Test".into(), value: 123 });
//! ```

pub mod approx;
pub mod assertion;
pub mod compare;
pub mod config;
pub mod context;
pub mod describe;
pub mod errors;
pub mod failure;
pub mod json;
pub mod logging_facility;
pub mod multiset;
pub mod reporting;
pub mod snapshot;

pub use probity_core_types::schema;

// Re-export commonly used types
pub use assertion::{assert_that, check, check_named, completes_within_async, Assertion};
pub use compare::{Comparator, ComparisonPath, Difference, DifferenceKind, PathSegment};
pub use config::Configuration;
pub use context::{AssertionContext, ContextGuard, ContextHandle};
pub use describe::{Describe, Shape};
pub use errors::{ErrorKind, ProbityError, Result};
pub use failure::{Failure, SourceLocation};
pub use json::JsonComparator;
pub use multiset::Relation;
pub use reporting::{AssertionEvent, AssertionObserver, ReportingAdapter};
pub use snapshot::{SnapshotOutcome, SnapshotStore};
