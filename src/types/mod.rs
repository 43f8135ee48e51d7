//! Type definitions for the churn prediction service

pub mod customer;
pub mod prediction;
pub mod value;

pub use customer::RawCustomerRecord;
pub use prediction::{AttributionResult, Driver, PredictionResult};
pub use value::FeatureValue;
