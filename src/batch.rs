//! Offline batch preprocessing.
//!
//! Applies the online derivation rules column-wise over a whole dataset and
//! shapes the result into the model's column contract. Used for retraining
//! and evaluation, never on the request path.

use crate::artifacts::FeatureContract;
use crate::error::BatchError;
use crate::features::deriver::{
    has_phone_and_internet, is_fiber_customer, is_month_to_month, payment_risk, tech_issue_risk,
    total_services, TechIssuePolicy, TenureCeiling, TenureGroup,
};
use crate::features::vocabulary::*;
use crate::types::{FeatureValue, RawCustomerRecord};
use std::borrow::Cow;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Columnar table of feature values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Vec<FeatureValue>>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// One row per record, raw columns in dataset order.
    pub fn from_records(records: &[RawCustomerRecord]) -> Self {
        let mut frame = Frame::new();
        for name in RawCustomerRecord::FIELD_NAMES {
            let values = records
                .iter()
                .map(|r| r.field(name).unwrap_or(FeatureValue::Missing))
                .collect();
            frame.names.push(name.to_string());
            frame.columns.push(values);
        }
        frame
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.names.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column(&self, name: &str) -> Option<&[FeatureValue]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    fn require(&self, name: &str) -> Result<&[FeatureValue], BatchError> {
        self.column(name)
            .ok_or_else(|| BatchError::MissingColumn(name.to_string()))
    }

    /// Append a column, or replace an existing column of the same name.
    pub fn push_column(
        &mut self,
        name: &str,
        values: Vec<FeatureValue>,
    ) -> Result<(), BatchError> {
        if self.width() > 0 && values.len() != self.len() {
            return Err(BatchError::LengthMismatch {
                column: name.to_string(),
                expected: self.len(),
                actual: values.len(),
            });
        }

        match self.names.iter().position(|n| n == name) {
            Some(i) => self.columns[i] = values,
            None => {
                self.names.push(name.to_string());
                self.columns.push(values);
            }
        }
        Ok(())
    }

    /// Values of one row in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&FeatureValue>> {
        if index >= self.len() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c[index]).collect())
    }

    /// Read a CSV with a header row.
    ///
    /// A column is numeric when every non-blank cell parses as a float;
    /// blank cells are missing in either kind of column.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self, BatchError> {
        let mut reader = csv::Reader::from_reader(reader);
        let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let mut cells: Vec<Vec<String>> = vec![Vec::new(); names.len()];
        for record in reader.records() {
            let record = record?;
            for (column, cell) in cells.iter_mut().zip(record.iter()) {
                column.push(cell.to_string());
            }
        }

        let columns = cells
            .iter()
            .map(|column| {
                let numeric = column
                    .iter()
                    .map(|c| c.trim())
                    .filter(|c| !c.is_empty())
                    .all(|c| c.parse::<f64>().is_ok());
                column
                    .iter()
                    .map(|c| FeatureValue::parse_cell(c, numeric))
                    .collect()
            })
            .collect();

        Ok(Self { names, columns })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, BatchError> {
        Self::read_csv(File::open(path)?)
    }

    /// Write the frame as CSV; missing values become blank cells.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), BatchError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.names)?;
        for i in 0..self.len() {
            writer.write_record(self.columns.iter().map(|c| c[i].to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), BatchError> {
        self.write_csv(File::create(path)?)
    }
}

/// Cell as the string the derivation rules compare against.
fn cell_str(value: &FeatureValue) -> Cow<'_, str> {
    match value {
        FeatureValue::Text(s) => Cow::Borrowed(s),
        FeatureValue::Number(n) => Cow::Owned(n.to_string()),
        FeatureValue::Missing => Cow::Borrowed(""),
    }
}

fn flags(values: impl Iterator<Item = bool>) -> Vec<FeatureValue> {
    values.map(FeatureValue::flag).collect()
}

/// Tenure in months. Text cells are parsed one by one, so a single bad cell
/// does not cost the rest of a text-typed column its buckets.
fn tenure_months(value: &FeatureValue) -> Option<f64> {
    let months = match value {
        FeatureValue::Number(n) => Some(*n),
        FeatureValue::Text(s) => s.trim().parse::<f64>().ok(),
        FeatureValue::Missing => None,
    };
    months.filter(|t| !t.is_nan())
}

/// Largest tenure in the column truncated to whole months, or the fallback
/// when no cell holds a tenure.
fn observed_max_tenure(tenure: &[FeatureValue]) -> f64 {
    tenure
        .iter()
        .filter_map(tenure_months)
        .reduce(f64::max)
        .map_or(FALLBACK_MAX_TENURE, f64::trunc)
}

/// Append the derived columns to a copy of the dataset.
///
/// Uses the same rule functions as the online deriver. Tenure buckets are
/// capped at the largest tenure in the dataset, truncated to whole months.
/// Tenures outside `[0, max]` or not numeric get a missing bucket.
pub fn preprocess(frame: &Frame, policy: TechIssuePolicy) -> Result<Frame, BatchError> {
    let services = SERVICE_COLUMNS
        .iter()
        .map(|name| frame.require(name))
        .collect::<Result<Vec<_>, _>>()?;
    let internet = frame.require("InternetService")?;
    let contract = frame.require("Contract")?;
    let payment = frame.require("PaymentMethod")?;
    let phone = frame.require("PhoneService")?;
    let security = frame.require("OnlineSecurity")?;
    let support = frame.require("TechSupport")?;
    let tenure = frame.require("tenure")?;

    let rows = frame.len();
    let ceiling = TenureCeiling::Observed(observed_max_tenure(tenure));

    let total = (0..rows)
        .map(|i| {
            let cells: Vec<Cow<'_, str>> = services.iter().map(|c| cell_str(&c[i])).collect();
            FeatureValue::Number(f64::from(total_services(cells.iter().map(|c| &**c))))
        })
        .collect();
    let fiber = flags(internet.iter().map(|v| is_fiber_customer(&cell_str(v))));
    let monthly = flags(contract.iter().map(|v| is_month_to_month(&cell_str(v))));
    let tech = flags((0..rows).map(|i| {
        tech_issue_risk(
            policy,
            &cell_str(&internet[i]),
            &cell_str(&security[i]),
            &cell_str(&support[i]),
        )
    }));
    let risky_payment = flags(payment.iter().map(|v| payment_risk(&cell_str(v))));
    let bundled = flags(
        (0..rows).map(|i| has_phone_and_internet(&cell_str(&phone[i]), &cell_str(&internet[i]))),
    );
    let groups = tenure
        .iter()
        .map(|v| {
            tenure_months(v)
                .and_then(|t| TenureGroup::bucket(t, ceiling))
                .map_or(FeatureValue::Missing, |g| FeatureValue::text(g.label()))
        })
        .collect();

    let mut out = frame.clone();
    for (name, values) in DERIVED_COLUMNS
        .iter()
        .zip([total, fiber, monthly, tech, risky_payment, bundled, groups])
    {
        out.push_column(name, values)?;
    }

    debug!(rows, ?ceiling, "Derived batch features");
    Ok(out)
}

/// Reorder to the contract's columns, zero-fill columns the dataset lacks
/// and apply categorical encoding. Columns outside the contract are dropped.
pub fn prepare_for_model(frame: &Frame, contract: &FeatureContract) -> Frame {
    let rows = frame.len();
    let columns = contract
        .feature_names()
        .iter()
        .map(|name| match frame.column(name) {
            Some(values) => values
                .iter()
                .map(|v| contract.encode_column(name, v.clone()))
                .collect(),
            None => vec![contract.encode_column(name, FeatureValue::Number(0.0)); rows],
        })
        .collect();

    Frame {
        names: contract.feature_names().to_vec(),
        columns,
    }
}
