//! Shared fixtures for unit tests

use crate::artifacts::FeatureContract;
use crate::features::FeatureDeriver;
use crate::models::linear::{LinearChurnModel, LinearWeights};
use crate::service::PredictionService;
use crate::types::RawCustomerRecord;
use proptest::prelude::*;
use std::sync::Arc;

pub const FEATURES: [&str; 25] = [
    "MonthlyCharges",
    "tenure",
    "TotalCharges",
    "SeniorCitizen",
    "TotalServices",
    "IsFiberCustomer",
    "IsMonthToMonth",
    "TechIssueRisk",
    "PaymentRisk",
    "HasPhoneAndInternet",
    "Partner",
    "Dependents",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
    "TenureGroup",
];

pub const CATEGORICAL: [&str; 15] = [
    "Partner",
    "Dependents",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
    "TenureGroup",
];

/// New fiber customer on a monthly contract paying by electronic check.
pub fn sample_record() -> RawCustomerRecord {
    RawCustomerRecord {
        monthly_charges: 70.35,
        tenure: 1,
        total_charges: 70.35,
        senior_citizen: 0,
        contract: "Month-to-month".to_string(),
        internet_service: "Fiber optic".to_string(),
        payment_method: "Electronic check".to_string(),
        phone_service: "Yes".to_string(),
        multiple_lines: "No".to_string(),
        online_security: "No".to_string(),
        online_backup: "No".to_string(),
        device_protection: "No".to_string(),
        tech_support: "No".to_string(),
        streaming_tv: "No".to_string(),
        streaming_movies: "No".to_string(),
        partner: "No".to_string(),
        dependents: "No".to_string(),
        paperless_billing: "Yes".to_string(),
    }
}

pub fn sample_contract() -> FeatureContract {
    FeatureContract::new(
        FEATURES.iter().map(|s| s.to_string()).collect(),
        CATEGORICAL.iter().map(|s| s.to_string()).collect(),
    )
    .expect("valid contract")
}

pub fn sample_model() -> LinearChurnModel {
    let weights: LinearWeights = serde_json::from_value(serde_json::json!({
        "name": "test-logistic",
        "intercept": -1.0,
        "numeric": {
            "tenure": { "weight": -0.04, "mean": 32.0 },
            "MonthlyCharges": { "weight": 0.01, "mean": 65.0 },
            "TotalServices": { "weight": -0.1, "mean": 3.0 },
            "PaymentRisk": { "weight": 0.4, "mean": 0.34 },
            "TechIssueRisk": { "weight": 0.3, "mean": 0.4 },
            "IsFiberCustomer": { "weight": 0.5, "mean": 0.44 }
        },
        "categorical": {
            "Contract": {
                "levels": { "Month-to-month": 0.9, "One year": -0.4, "Two year": -1.2 },
                "baseline": 0.2
            },
            "TenureGroup": {
                "levels": { "0-6": 0.6, "6-12": 0.3, "12-24": 0.0, "24-48": -0.2, "48+": -0.5 },
                "baseline": 0.0
            }
        }
    }))
    .expect("valid weights");

    LinearChurnModel::new(weights, &sample_contract()).expect("model binds")
}

pub fn sample_service() -> PredictionService {
    PredictionService::new(
        Arc::new(sample_contract()),
        Arc::new(sample_model()),
        FeatureDeriver::default(),
        0.5,
        5,
    )
}

fn tri_state() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Yes".to_string()),
        Just("No".to_string()),
        Just("No internet service".to_string()),
        Just("No phone service".to_string()),
        "[a-z]{0,6}",
    ]
}

/// Arbitrary well-typed records, including off-vocabulary categories.
pub fn arb_record() -> impl Strategy<Value = RawCustomerRecord> {
    let numbers = (0.0..150.0f64, 0i64..100, 0.0..9000.0f64, 0i64..=1);
    let plans = (
        prop_oneof![
            Just("Month-to-month".to_string()),
            Just("One year".to_string()),
            Just("Two year".to_string()),
            "[A-Za-z ]{0,8}",
        ],
        prop_oneof![
            Just("DSL".to_string()),
            Just("Fiber optic".to_string()),
            Just("No".to_string()),
        ],
        prop_oneof![
            Just("Electronic check".to_string()),
            Just("Mailed check".to_string()),
            Just("Credit card (automatic)".to_string()),
        ],
    );
    let services = proptest::collection::vec(tri_state(), 8);
    let flags = proptest::collection::vec(tri_state(), 3);

    (numbers, plans, services, flags).prop_map(
        |((monthly, tenure, total, senior), (contract, internet, payment), s, f)| {
            RawCustomerRecord {
                monthly_charges: monthly,
                tenure,
                total_charges: total,
                senior_citizen: senior,
                contract,
                internet_service: internet,
                payment_method: payment,
                phone_service: s[0].clone(),
                multiple_lines: s[1].clone(),
                online_security: s[2].clone(),
                online_backup: s[3].clone(),
                device_protection: s[4].clone(),
                tech_support: s[5].clone(),
                streaming_tv: s[6].clone(),
                streaming_movies: s[7].clone(),
                partner: f[0].clone(),
                dependents: f[1].clone(),
                paperless_billing: f[2].clone(),
            }
        },
    )
}
