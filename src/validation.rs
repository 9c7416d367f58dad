//! Field validation for records submitted through the create/update actions.
//!
//! Field rules are declared on the model structs with `validator`; this
//! module flattens the result into the per-field list the envelopes carry.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use validator::{Validate, ValidationError};

use crate::model::{Asset, Record};

/// Struct-level errors are reported by `validator` under this key; the
/// error code then names the offending field.
const SCHEMA_KEY: &str = "__all__";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// All field errors of one submission, sorted by field. Any entry blocks the
/// write.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.errors.iter().map(|e| format!("{} {}", e.field, e.message)).collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<validator::ValidationErrors> for ValidationErrors {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut errors = Vec::new();
        for (field_name, field_errors) in err.field_errors() {
            let field_name = field_name.to_string();
            for e in field_errors.iter() {
                let field = if field_name == SCHEMA_KEY { e.code.to_string() } else { field_name.clone() };
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("failed validation: {}", e.code));
                errors.push(FieldError { field, message });
            }
        }
        errors.sort_by(|a, b| a.field.cmp(&b.field));
        Self { errors }
    }
}

/// Path segments under a collection that a record code would collide with.
const RESERVED_CODES: &[&str] = &["stats"];

pub(crate) fn code_is_addressable(code: &str) -> Result<(), ValidationError> {
    if RESERVED_CODES.contains(&code) {
        let mut err = ValidationError::new("reserved");
        err.message = Some(Cow::from("is reserved"));
        return Err(err);
    }
    Ok(())
}

pub(crate) fn salvage_within_cost(asset: &Asset) -> Result<(), ValidationError> {
    if asset.salvage_value > asset.purchase_cost {
        let mut err = ValidationError::new("salvage_value");
        err.message = Some(Cow::from("must not exceed purchase_cost"));
        return Err(err);
    }
    Ok(())
}

impl Validate for Record {
    fn validate(&self) -> Result<(), validator::ValidationErrors> {
        match self {
            Record::Asset(r) => r.validate(),
            Record::Inventory(r) => r.validate(),
            Record::Return(r) => r.validate(),
            Record::Purchase(r) => r.validate(),
        }
    }
}

/// Validates a submitted record.
pub fn validate_record(record: &Record) -> Result<(), ValidationErrors> {
    record.validate().map_err(ValidationErrors::from)
}

/// Status updates only need a non-empty value.
pub fn validate_status(status: &str) -> Result<(), ValidationErrors> {
    if status.trim().is_empty() {
        return Err(ValidationErrors {
            errors: vec![FieldError { field: "status".into(), message: "is required".into() }],
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PurchaseRecord;
    use chrono::NaiveDate;

    fn purchase(name: &str, cost: f64) -> PurchaseRecord {
        PurchaseRecord {
            code: "PO-9".into(),
            name: name.into(),
            description: String::new(),
            vendor: String::new(),
            status: "draft".into(),
            category: String::new(),
            facility: String::new(),
            total_cost: cost,
            ordered_on: NaiveDate::from_ymd_opt(2026, 2, 2).unwrap(),
        }
    }

    fn asset(cost: f64, salvage: f64, life: u32) -> Asset {
        Asset {
            code: "AST-9".into(),
            name: "Autoklaf".into(),
            description: String::new(),
            manufacturer: String::new(),
            status: "tersedia".into(),
            category: "Medis".into(),
            facility: String::new(),
            criticality: "sedang".into(),
            location: String::new(),
            purchase_cost: cost,
            salvage_value: salvage,
            useful_life_years: life,
            acquired_on: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            next_maintenance: None,
        }
    }

    #[test]
    fn short_name_is_rejected() {
        let err = validate_record(&Record::Purchase(purchase("PC", 10.0))).unwrap_err();
        assert!(err.has("name"));
        assert_eq!(err.errors.len(), 1);
        assert_eq!(err.errors[0].message, "must be at least 3 characters");
    }

    #[test]
    fn every_failing_field_is_reported() {
        let mut p = purchase("", -1.0);
        p.code.clear();
        let err = validate_record(&Record::Purchase(p)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "code is required; name must be at least 3 characters; total_cost must be a non-negative number"
        );
    }

    #[test]
    fn salvage_above_cost_is_a_field_error() {
        let err = validate_record(&Record::Asset(asset(1_000.0, 2_000.0, 5))).unwrap_err();
        assert!(err.has("salvage_value"));
        assert_eq!(err.errors[0].message, "must not exceed purchase_cost");

        let err = validate_record(&Record::Asset(asset(1_000.0, 0.0, 0))).unwrap_err();
        assert!(err.has("useful_life_years"));
    }

    #[test]
    fn reserved_code_is_rejected() {
        let mut p = purchase("Printer", 5.0);
        p.code = "stats".into();
        let err = validate_record(&Record::Purchase(p)).unwrap_err();
        assert!(err.has("code"));
        assert_eq!(err.to_string(), "code is reserved");
    }

    #[test]
    fn valid_record_passes() {
        assert!(validate_record(&Record::Purchase(purchase("Printer", 5.0))).is_ok());
        assert!(validate_record(&Record::Asset(asset(1_000.0, 100.0, 5))).is_ok());
        assert!(validate_status("").is_err());
        assert!(validate_status("rusak").is_ok());
    }
}
