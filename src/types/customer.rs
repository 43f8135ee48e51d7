//! Raw customer record as submitted by clients and found in training data

use crate::error::ValidationError;
use crate::types::value::FeatureValue;
use serde::{Deserialize, Serialize};

/// Account and service attributes of one customer.
///
/// Every field is required; a missing field is a client error, never
/// silently zero-filled. Field names match the Telco dataset columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCustomerRecord {
    /// Monthly charge
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,

    /// Months with the company
    #[serde(rename = "tenure")]
    pub tenure: i64,

    /// Total charged to date
    #[serde(rename = "TotalCharges")]
    pub total_charges: f64,

    /// 1 if the customer is a senior citizen, 0 otherwise
    #[serde(rename = "SeniorCitizen")]
    pub senior_citizen: i64,

    /// "Month-to-month", "One year" or "Two year"
    #[serde(rename = "Contract")]
    pub contract: String,

    /// "DSL", "Fiber optic" or "No"
    #[serde(rename = "InternetService")]
    pub internet_service: String,

    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,

    #[serde(rename = "PhoneService")]
    pub phone_service: String,

    #[serde(rename = "MultipleLines")]
    pub multiple_lines: String,

    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,

    #[serde(rename = "OnlineBackup")]
    pub online_backup: String,

    #[serde(rename = "DeviceProtection")]
    pub device_protection: String,

    #[serde(rename = "TechSupport")]
    pub tech_support: String,

    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,

    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: String,

    #[serde(rename = "Partner")]
    pub partner: String,

    #[serde(rename = "Dependents")]
    pub dependents: String,

    #[serde(rename = "PaperlessBilling")]
    pub paperless_billing: String,
}

impl RawCustomerRecord {
    /// Column names of every raw field, in dataset order.
    pub const FIELD_NAMES: [&'static str; 18] = [
        "MonthlyCharges",
        "tenure",
        "TotalCharges",
        "SeniorCitizen",
        "Contract",
        "InternetService",
        "PaymentMethod",
        "PhoneService",
        "MultipleLines",
        "OnlineSecurity",
        "OnlineBackup",
        "DeviceProtection",
        "TechSupport",
        "StreamingTV",
        "StreamingMovies",
        "Partner",
        "Dependents",
        "PaperlessBilling",
    ];

    /// Check numeric fields before the record reaches the deriver.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_amount("MonthlyCharges", self.monthly_charges)?;
        check_amount("TotalCharges", self.total_charges)?;

        if self.tenure < 0 {
            return Err(ValidationError::InvalidField {
                field: "tenure",
                reason: format!("must be non-negative, got {}", self.tenure),
            });
        }

        if !matches!(self.senior_citizen, 0 | 1) {
            return Err(ValidationError::InvalidField {
                field: "SeniorCitizen",
                reason: format!("must be 0 or 1, got {}", self.senior_citizen),
            });
        }

        Ok(())
    }

    /// Look up a raw field by its column name.
    pub fn field(&self, name: &str) -> Option<FeatureValue> {
        let value = match name {
            "MonthlyCharges" => FeatureValue::Number(self.monthly_charges),
            "tenure" => FeatureValue::Number(self.tenure as f64),
            "TotalCharges" => FeatureValue::Number(self.total_charges),
            "SeniorCitizen" => FeatureValue::Number(self.senior_citizen as f64),
            "Contract" => FeatureValue::text(&self.contract),
            "InternetService" => FeatureValue::text(&self.internet_service),
            "PaymentMethod" => FeatureValue::text(&self.payment_method),
            "PhoneService" => FeatureValue::text(&self.phone_service),
            "MultipleLines" => FeatureValue::text(&self.multiple_lines),
            "OnlineSecurity" => FeatureValue::text(&self.online_security),
            "OnlineBackup" => FeatureValue::text(&self.online_backup),
            "DeviceProtection" => FeatureValue::text(&self.device_protection),
            "TechSupport" => FeatureValue::text(&self.tech_support),
            "StreamingTV" => FeatureValue::text(&self.streaming_tv),
            "StreamingMovies" => FeatureValue::text(&self.streaming_movies),
            "Partner" => FeatureValue::text(&self.partner),
            "Dependents" => FeatureValue::text(&self.dependents),
            "PaperlessBilling" => FeatureValue::text(&self.paperless_billing),
            _ => return None,
        };
        Some(value)
    }

    /// The eight subscription fields counted by `TotalServices`.
    pub fn service_fields(&self) -> [&str; 8] {
        [
            &self.phone_service,
            &self.multiple_lines,
            &self.online_security,
            &self.online_backup,
            &self.device_protection,
            &self.tech_support,
            &self.streaming_tv,
            &self.streaming_movies,
        ]
    }
}

fn check_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::InvalidField {
            field,
            reason: "must be a finite number".to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::InvalidField {
            field,
            reason: format!("must be non-negative, got {}", value),
        });
    }
    Ok(())
}
