//! bulkmap Benchmark Suite
//!
//! Criterion benchmarks for the per-operation hot paths, which scale with
//! properties times batch size.
//!
//! # Benchmark Categories
//!
//! - **Resolve**: Introspection, classification and accessor compilation
//! - **Reconcile**: Placeholder assignment, output merge, key lookup, read-back
//!   and the blocking and async completion drivers

pub mod fixtures;

pub use fixtures::{customer_model, generate_customers, output_rowset, CannedOutput, Customer, Scale};
