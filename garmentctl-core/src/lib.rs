//! garmentctl-core: seed-and-verify fixture harness for the `garment` table
//!
//! Reloads a fixed seed script, then walks an ordered chain of named steps
//! that query the table and compare results to literal expectations.

pub mod config;
pub mod error;
pub mod fixture;
pub mod model;
pub mod report;
pub mod runner;
pub mod seed;
pub mod steps;
pub mod store;

pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use fixture::reset;
pub use model::{Garment, Gender, GenderCount, NewGarment, Season};
pub use report::{Failure, RunReport, StepOutcome, StepReport};
pub use runner::{create_schema, reset_database, run_pipeline, run_suite, run_suite_in_memory};
pub use seed::{SeedScript, SeedSummary};
pub use steps::{suite, Snapshot, Step};
pub use store::{GarmentRepo, GarmentStore, MemoryStore, StoreError};
