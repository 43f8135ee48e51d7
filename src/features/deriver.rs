//! Derived feature rules.
//!
//! Each rule is a free function over plain values so the online deriver and
//! the batch preprocessor evaluate exactly the same code.

use crate::features::vocabulary::*;
use crate::types::{FeatureValue, RawCustomerRecord};
use serde::Deserialize;
use std::fmt;

/// Which definition of `TechIssueRisk` is in force.
///
/// Two definitions exist in deployed history; both are kept so they can be
/// compared, but a deployment uses exactly one for serving and batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechIssuePolicy {
    /// Has internet service and no tech support
    #[default]
    InternetSubscriber,
    /// No online security, no tech support and no internet service.
    /// Never fires on Telco data, where those customers report
    /// "No internet service" for the add-ons.
    NoInternetLegacy,
}

/// Tenure bucket label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TenureGroup {
    UpToSix,
    SixToTwelve,
    TwelveToTwentyFour,
    TwentyFourToFortyEight,
    OverFortyEight,
}

/// Upper edge of the last tenure bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TenureCeiling {
    /// Online path: every tenure above 48 is "48+"
    Unbounded,
    /// Batch path: the largest tenure observed in the dataset
    Observed(f64),
}

impl TenureGroup {
    const ORDERED: [TenureGroup; 5] = [
        TenureGroup::UpToSix,
        TenureGroup::SixToTwelve,
        TenureGroup::TwelveToTwentyFour,
        TenureGroup::TwentyFourToFortyEight,
        TenureGroup::OverFortyEight,
    ];

    pub fn label(self) -> &'static str {
        match self {
            TenureGroup::UpToSix => "0-6",
            TenureGroup::SixToTwelve => "6-12",
            TenureGroup::TwelveToTwentyFour => "12-24",
            TenureGroup::TwentyFourToFortyEight => "24-48",
            TenureGroup::OverFortyEight => "48+",
        }
    }

    /// Bucket a tenure with right-inclusive edges `[0,6], (6,12], (12,24],
    /// (24,48], (48,ceiling]`. Returns `None` outside `[0, ceiling]` or for NaN.
    pub fn bucket(tenure: f64, ceiling: TenureCeiling) -> Option<Self> {
        if tenure.is_nan() || tenure < TENURE_FLOOR {
            return None;
        }
        for (group, edge) in Self::ORDERED.iter().zip(TENURE_EDGES) {
            if tenure <= edge {
                return Some(*group);
            }
        }
        match ceiling {
            TenureCeiling::Unbounded => Some(TenureGroup::OverFortyEight),
            TenureCeiling::Observed(max) if tenure <= max => Some(TenureGroup::OverFortyEight),
            TenureCeiling::Observed(_) => None,
        }
    }
}

impl fmt::Display for TenureGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

pub fn total_services<'a>(services: impl IntoIterator<Item = &'a str>) -> u8 {
    services.into_iter().filter(|s| *s == YES).count() as u8
}

pub fn is_fiber_customer(internet_service: &str) -> bool {
    internet_service == FIBER_OPTIC
}

pub fn is_month_to_month(contract: &str) -> bool {
    contract == MONTH_TO_MONTH
}

pub fn payment_risk(payment_method: &str) -> bool {
    payment_method == ELECTRONIC_CHECK
}

pub fn has_phone_and_internet(phone_service: &str, internet_service: &str) -> bool {
    phone_service == YES && internet_service != NO
}

pub fn tech_issue_risk(
    policy: TechIssuePolicy,
    internet_service: &str,
    online_security: &str,
    tech_support: &str,
) -> bool {
    match policy {
        TechIssuePolicy::InternetSubscriber => internet_service != NO && tech_support == NO,
        TechIssuePolicy::NoInternetLegacy => {
            online_security == NO && tech_support == NO && internet_service == NO
        }
    }
}

/// Features computed from a single raw record.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFeatures {
    pub total_services: u8,
    pub is_fiber_customer: bool,
    pub is_month_to_month: bool,
    pub tech_issue_risk: bool,
    pub payment_risk: bool,
    pub has_phone_and_internet: bool,
    pub tenure_group: TenureGroup,
}

impl DerivedFeatures {
    /// Look up a derived feature by column name.
    pub fn field(&self, name: &str) -> Option<FeatureValue> {
        let value = match name {
            TOTAL_SERVICES => FeatureValue::Number(f64::from(self.total_services)),
            IS_FIBER_CUSTOMER => FeatureValue::flag(self.is_fiber_customer),
            IS_MONTH_TO_MONTH => FeatureValue::flag(self.is_month_to_month),
            TECH_ISSUE_RISK => FeatureValue::flag(self.tech_issue_risk),
            PAYMENT_RISK => FeatureValue::flag(self.payment_risk),
            HAS_PHONE_AND_INTERNET => FeatureValue::flag(self.has_phone_and_internet),
            TENURE_GROUP => FeatureValue::text(self.tenure_group.label()),
            _ => return None,
        };
        Some(value)
    }
}

/// Online feature deriver. Pure and total over well-typed records.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureDeriver {
    policy: TechIssuePolicy,
}

impl FeatureDeriver {
    pub fn new(policy: TechIssuePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> TechIssuePolicy {
        self.policy
    }

    pub fn derive(&self, raw: &RawCustomerRecord) -> DerivedFeatures {
        // Negative tenure is rejected by validation; if one slips through it
        // lands in the first bucket, as the per-request encoding always has.
        let tenure_group = TenureGroup::bucket(raw.tenure as f64, TenureCeiling::Unbounded)
            .unwrap_or(TenureGroup::UpToSix);

        DerivedFeatures {
            total_services: total_services(raw.service_fields()),
            is_fiber_customer: is_fiber_customer(&raw.internet_service),
            is_month_to_month: is_month_to_month(&raw.contract),
            tech_issue_risk: tech_issue_risk(
                self.policy,
                &raw.internet_service,
                &raw.online_security,
                &raw.tech_support,
            ),
            payment_risk: payment_risk(&raw.payment_method),
            has_phone_and_internet: has_phone_and_internet(
                &raw.phone_service,
                &raw.internet_service,
            ),
            tenure_group,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{arb_record, sample_record};
    use proptest::prelude::*;

    #[test]
    fn test_reference_customer() {
        let derived = FeatureDeriver::default().derive(&sample_record());

        assert_eq!(derived.total_services, 1);
        assert!(derived.is_fiber_customer);
        assert!(derived.is_month_to_month);
        assert!(derived.payment_risk);
        assert!(derived.has_phone_and_internet);
        assert!(derived.tech_issue_risk);
        assert_eq!(derived.tenure_group, TenureGroup::UpToSix);
    }

    #[test]
    fn test_tenure_edges_are_right_inclusive() {
        let online = |t: f64| TenureGroup::bucket(t, TenureCeiling::Unbounded).map(|g| g.label());

        assert_eq!(online(0.0), Some("0-6"));
        assert_eq!(online(6.0), Some("0-6"));
        assert_eq!(online(7.0), Some("6-12"));
        assert_eq!(online(12.0), Some("6-12"));
        assert_eq!(online(24.0), Some("12-24"));
        assert_eq!(online(48.0), Some("24-48"));
        assert_eq!(online(49.0), Some("48+"));
        assert_eq!(online(500.0), Some("48+"));
        assert_eq!(online(-1.0), None);
        assert_eq!(online(f64::NAN), None);
    }

    #[test]
    fn test_observed_ceiling_caps_last_bucket() {
        let batch = |t: f64| TenureGroup::bucket(t, TenureCeiling::Observed(72.0));

        assert_eq!(batch(72.0), Some(TenureGroup::OverFortyEight));
        assert_eq!(batch(73.0), None);
        assert_eq!(batch(30.0), Some(TenureGroup::TwentyFourToFortyEight));
    }

    #[test]
    fn test_unknown_categories_fall_through() {
        let mut record = sample_record();
        record.internet_service = "Satellite".to_string();
        record.contract = "month-to-month".to_string();
        record.payment_method = String::new();
        record.phone_service = "yes".to_string();

        let derived = FeatureDeriver::default().derive(&record);
        assert_eq!(derived.total_services, 0);
        assert!(!derived.is_fiber_customer);
        assert!(!derived.is_month_to_month);
        assert!(!derived.payment_risk);
        assert!(!derived.has_phone_and_internet);
    }

    #[test]
    fn test_tech_issue_policies() {
        let subscriber = TechIssuePolicy::InternetSubscriber;
        let legacy = TechIssuePolicy::NoInternetLegacy;

        assert!(tech_issue_risk(subscriber, "DSL", "Yes", "No"));
        assert!(!tech_issue_risk(subscriber, "No", "No", "No"));
        assert!(!tech_issue_risk(subscriber, "DSL", "No", "Yes"));

        assert!(tech_issue_risk(legacy, "No", "No", "No"));
        assert!(!tech_issue_risk(legacy, "No", "No internet service", "No internet service"));
        assert!(!tech_issue_risk(legacy, "Fiber optic", "No", "No"));
    }

    #[test]
    fn test_derived_field_lookup() {
        let derived = FeatureDeriver::default().derive(&sample_record());

        assert_eq!(derived.field(TOTAL_SERVICES), Some(FeatureValue::Number(1.0)));
        assert_eq!(derived.field(PAYMENT_RISK), Some(FeatureValue::Number(1.0)));
        assert_eq!(derived.field(TENURE_GROUP), Some(FeatureValue::text("0-6")));
        assert_eq!(derived.field("tenure"), None);
        for name in DERIVED_COLUMNS {
            assert!(derived.field(name).is_some());
        }
    }

    proptest! {
        #[test]
        fn prop_derive_is_deterministic(record in arb_record()) {
            let deriver = FeatureDeriver::default();
            prop_assert_eq!(deriver.derive(&record), deriver.derive(&record));
        }

        #[test]
        fn prop_total_services_counts_yes(record in arb_record()) {
            let derived = FeatureDeriver::default().derive(&record);
            let expected = record.service_fields().iter().filter(|s| **s == "Yes").count();
            prop_assert!(derived.total_services <= 8);
            prop_assert_eq!(usize::from(derived.total_services), expected);
        }
    }
}
