use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

use crate::validation::{code_is_addressable, salvage_within_cost};

// Status vocabularies. Records may carry values outside these lists; the
// aggregator reports those as unmapped.
pub const ASSET_STATUSES: &[&str] = &["tersedia", "dipakai", "rusak", "habis", "dipensiunkan"];
pub const INVENTORY_STATUSES: &[&str] = &["tersedia", "menipis", "habis"];
pub const RETURN_STATUSES: &[&str] = &["menunggu", "disetujui", "ditolak", "selesai"];
pub const PURCHASE_STATUSES: &[&str] = &["draft", "diajukan", "disetujui", "diterima"];
pub const CRITICALITIES: &[&str] = &["tinggi", "sedang", "rendah"];

/// A tracked fixed asset.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Validate)]
#[validate(schema(function = "salvage_within_cost"))]
pub struct Asset {
    #[validate(length(min = 1, message = "is required"), custom(function = "code_is_addressable"))]
    pub code: String,
    #[validate(length(min = 3, message = "must be at least 3 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub manufacturer: String,
    #[validate(length(min = 1, message = "is required"))]
    pub status: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub facility: String,
    #[serde(default)]
    pub criticality: String,
    #[serde(default)]
    pub location: String,
    #[validate(range(min = 0.0, message = "must be a non-negative number"))]
    pub purchase_cost: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "must be a non-negative number"))]
    pub salvage_value: f64,
    #[validate(range(min = 1, message = "must be greater than zero"))]
    pub useful_life_years: u32,
    pub acquired_on: NaiveDate,
    #[serde(default)]
    pub next_maintenance: Option<NaiveDate>,
}

/// A stock line held in a warehouse.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Validate)]
pub struct InventoryItem {
    #[validate(length(min = 1, message = "is required"), custom(function = "code_is_addressable"))]
    pub code: String,
    #[validate(length(min = 3, message = "must be at least 3 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub manufacturer: String,
    #[validate(length(min = 1, message = "is required"))]
    pub status: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub facility: String,
    /// Resolved against the warehouse list at display time only.
    #[validate(length(min = 1, message = "is required"))]
    pub warehouse_id: String,
    pub quantity: u32,
    #[serde(default)]
    pub reorder_point: u32,
    #[validate(range(min = 0.0, message = "must be a non-negative number"))]
    pub unit_cost: f64,
    pub received_on: NaiveDate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Validate)]
pub struct ReturnRecord {
    #[validate(length(min = 1, message = "is required"), custom(function = "code_is_addressable"))]
    pub code: String,
    #[validate(length(min = 3, message = "must be at least 3 characters"))]
    pub name: String,
    /// Reason given for the return.
    #[serde(default)]
    pub description: String,
    #[validate(length(min = 1, message = "is required"))]
    pub status: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub facility: String,
    #[serde(default)]
    pub asset_code: String,
    #[validate(range(min = 1, message = "must be greater than zero"))]
    pub quantity: u32,
    pub requested_on: NaiveDate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Validate)]
pub struct PurchaseRecord {
    #[validate(length(min = 1, message = "is required"), custom(function = "code_is_addressable"))]
    pub code: String,
    #[validate(length(min = 3, message = "must be at least 3 characters"))]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub vendor: String,
    #[validate(length(min = 1, message = "is required"))]
    pub status: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub facility: String,
    #[validate(range(min = 0.0, message = "must be a non-negative number"))]
    pub total_cost: f64,
    pub ordered_on: NaiveDate,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Warehouse {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
}

/// Any row of any list view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Asset(Asset),
    Inventory(InventoryItem),
    Return(ReturnRecord),
    Purchase(PurchaseRecord),
}

impl Record {
    pub fn collection(&self) -> CollectionKind {
        match self {
            Record::Asset(_) => CollectionKind::Assets,
            Record::Inventory(_) => CollectionKind::Inventory,
            Record::Return(_) => CollectionKind::Returns,
            Record::Purchase(_) => CollectionKind::Purchases,
        }
    }

    pub fn set_status(&mut self, status: String) {
        match self {
            Record::Asset(r) => r.status = status,
            Record::Inventory(r) => r.status = status,
            Record::Return(r) => r.status = status,
            Record::Purchase(r) => r.status = status,
        }
    }
}

/// The four list views of the desk.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    Assets,
    Inventory,
    Returns,
    Purchases,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 4] = [
        CollectionKind::Assets,
        CollectionKind::Inventory,
        CollectionKind::Returns,
        CollectionKind::Purchases,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Assets => "assets",
            CollectionKind::Inventory => "inventory",
            CollectionKind::Returns => "returns",
            CollectionKind::Purchases => "purchases",
        }
    }

    /// Named status buckets shown on the stat cards of this view.
    pub fn statuses(&self) -> &'static [&'static str] {
        match self {
            CollectionKind::Assets => ASSET_STATUSES,
            CollectionKind::Inventory => INVENTORY_STATUSES,
            CollectionKind::Returns => RETURN_STATUSES,
            CollectionKind::Purchases => PURCHASE_STATUSES,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "assets" | "asset" => Ok(CollectionKind::Assets),
            "inventory" => Ok(CollectionKind::Inventory),
            "returns" | "return" => Ok(CollectionKind::Returns),
            "purchases" | "purchase" => Ok(CollectionKind::Purchases),
            other => Err(format!("unknown collection '{}'", other)),
        }
    }
}

/// Uniform read access to the fields the list pipeline filters, searches
/// and aggregates on.
pub trait Listable {
    fn code(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn manufacturer(&self) -> Option<&str>;
    fn status(&self) -> &str;
    fn category(&self) -> &str;
    fn facility(&self) -> &str;

    fn criticality(&self) -> Option<&str> {
        None
    }

    /// The date range filters compare against.
    fn record_date(&self) -> Option<NaiveDate>;

    /// The amount range filters compare against.
    fn amount(&self) -> Option<f64>;

    fn next_maintenance(&self) -> Option<NaiveDate> {
        None
    }
}

impl Listable for Asset {
    fn code(&self) -> &str { &self.code }
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { &self.description }
    fn manufacturer(&self) -> Option<&str> { Some(&self.manufacturer) }
    fn status(&self) -> &str { &self.status }
    fn category(&self) -> &str { &self.category }
    fn facility(&self) -> &str { &self.facility }
    fn criticality(&self) -> Option<&str> { Some(&self.criticality) }
    fn record_date(&self) -> Option<NaiveDate> { Some(self.acquired_on) }
    fn amount(&self) -> Option<f64> { Some(self.purchase_cost) }
    fn next_maintenance(&self) -> Option<NaiveDate> { self.next_maintenance }
}

impl Listable for InventoryItem {
    fn code(&self) -> &str { &self.code }
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { &self.description }
    fn manufacturer(&self) -> Option<&str> { Some(&self.manufacturer) }
    fn status(&self) -> &str { &self.status }
    fn category(&self) -> &str { &self.category }
    fn facility(&self) -> &str { &self.facility }
    fn record_date(&self) -> Option<NaiveDate> { Some(self.received_on) }
    fn amount(&self) -> Option<f64> { Some(self.unit_cost) }
}

impl Listable for ReturnRecord {
    fn code(&self) -> &str { &self.code }
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { &self.description }
    fn manufacturer(&self) -> Option<&str> { None }
    fn status(&self) -> &str { &self.status }
    fn category(&self) -> &str { &self.category }
    fn facility(&self) -> &str { &self.facility }
    fn record_date(&self) -> Option<NaiveDate> { Some(self.requested_on) }
    fn amount(&self) -> Option<f64> { None }
}

impl Listable for PurchaseRecord {
    fn code(&self) -> &str { &self.code }
    fn name(&self) -> &str { &self.name }
    fn description(&self) -> &str { &self.description }
    fn manufacturer(&self) -> Option<&str> { Some(&self.vendor) }
    fn status(&self) -> &str { &self.status }
    fn category(&self) -> &str { &self.category }
    fn facility(&self) -> &str { &self.facility }
    fn record_date(&self) -> Option<NaiveDate> { Some(self.ordered_on) }
    fn amount(&self) -> Option<f64> { Some(self.total_cost) }
}

macro_rules! delegate {
    ($self:ident, $r:ident => $body:expr) => {
        match $self {
            Record::Asset($r) => $body,
            Record::Inventory($r) => $body,
            Record::Return($r) => $body,
            Record::Purchase($r) => $body,
        }
    };
}

impl Listable for Record {
    fn code(&self) -> &str { delegate!(self, r => r.code()) }
    fn name(&self) -> &str { delegate!(self, r => r.name()) }
    fn description(&self) -> &str { delegate!(self, r => r.description()) }
    fn manufacturer(&self) -> Option<&str> { delegate!(self, r => r.manufacturer()) }
    fn status(&self) -> &str { delegate!(self, r => r.status()) }
    fn category(&self) -> &str { delegate!(self, r => r.category()) }
    fn facility(&self) -> &str { delegate!(self, r => r.facility()) }
    fn criticality(&self) -> Option<&str> { delegate!(self, r => r.criticality()) }
    fn record_date(&self) -> Option<NaiveDate> { delegate!(self, r => r.record_date()) }
    fn amount(&self) -> Option<f64> { delegate!(self, r => r.amount()) }
    fn next_maintenance(&self) -> Option<NaiveDate> { delegate!(self, r => r.next_maintenance()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_json_is_tagged_by_kind() {
        let json = r#"{
            "kind": "purchase",
            "code": "PO-001",
            "name": "Laptop batch",
            "vendor": "Lenovo",
            "status": "diajukan",
            "total_cost": 125000000.0,
            "ordered_on": "2026-03-01"
        }"#;
        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.collection(), CollectionKind::Purchases);
        assert_eq!(record.manufacturer(), Some("Lenovo"));
        assert_eq!(record.category(), "");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["kind"], "purchase");
    }

    #[test]
    fn collection_kind_parses_singular_and_plural() {
        assert_eq!("ASSETS".parse::<CollectionKind>().unwrap(), CollectionKind::Assets);
        assert_eq!("return".parse::<CollectionKind>().unwrap(), CollectionKind::Returns);
        assert!("widgets".parse::<CollectionKind>().is_err());
    }
}
