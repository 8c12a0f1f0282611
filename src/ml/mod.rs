//! Machine learning building blocks shared by the competition pipelines.
//!
//! Boosted trees and evaluation metrics live here; feature engineering stays with each pipeline.

pub mod gbdt;
pub mod metrics;
