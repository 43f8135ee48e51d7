//! Feature engineering shared by the serving path and the batch preprocessor.
//!
//! Derived features and category sentinels are defined once, in
//! [`vocabulary`] and [`deriver`], and reused by [`crate::batch`].

pub mod assembler;
pub mod deriver;
pub mod vocabulary;

pub use assembler::{assemble, FeatureVector};
pub use deriver::{DerivedFeatures, FeatureDeriver, TechIssuePolicy, TenureCeiling, TenureGroup};
