//! Category values, bucket edges and derived column names shared by the
//! online and batch feature paths.

/// Subscribed service
pub const YES: &str = "Yes";
/// Not subscribed, also the "no internet" sentinel of `InternetService`
pub const NO: &str = "No";
pub const FIBER_OPTIC: &str = "Fiber optic";
pub const MONTH_TO_MONTH: &str = "Month-to-month";
pub const ELECTRONIC_CHECK: &str = "Electronic check";

/// Lower edge of the first tenure bucket (inclusive).
pub const TENURE_FLOOR: f64 = 0.0;
/// Upper edges (inclusive) of the bounded tenure buckets.
pub const TENURE_EDGES: [f64; 4] = [6.0, 12.0, 24.0, 48.0];
/// Batch ceiling used when the dataset has no numeric tenure.
pub const FALLBACK_MAX_TENURE: f64 = 72.0;

pub const TOTAL_SERVICES: &str = "TotalServices";
pub const IS_FIBER_CUSTOMER: &str = "IsFiberCustomer";
pub const IS_MONTH_TO_MONTH: &str = "IsMonthToMonth";
pub const TECH_ISSUE_RISK: &str = "TechIssueRisk";
pub const PAYMENT_RISK: &str = "PaymentRisk";
pub const HAS_PHONE_AND_INTERNET: &str = "HasPhoneAndInternet";
pub const TENURE_GROUP: &str = "TenureGroup";

/// Derived columns in the order they are appended to a table.
pub const DERIVED_COLUMNS: [&str; 7] = [
    TOTAL_SERVICES,
    IS_FIBER_CUSTOMER,
    IS_MONTH_TO_MONTH,
    TECH_ISSUE_RISK,
    PAYMENT_RISK,
    HAS_PHONE_AND_INTERNET,
    TENURE_GROUP,
];

/// Raw columns counted by `TotalServices`.
pub const SERVICE_COLUMNS: [&str; 8] = [
    "PhoneService",
    "MultipleLines",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
];
