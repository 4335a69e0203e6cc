//! Executor module - statement execution and trivial planning

mod executor;
mod planner;

pub use executor::{Executor, QueryResult};
