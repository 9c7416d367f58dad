use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::Listable;

/// Keys a list view can be filtered on.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum FilterKey {
    Search,
    Status,
    Category,
    Facility,
    Criticality,
    From,
    To,
    Min,
    Max,
}

impl FilterKey {
    pub const ALL: [FilterKey; 9] = [
        FilterKey::Search,
        FilterKey::Status,
        FilterKey::Category,
        FilterKey::Facility,
        FilterKey::Criticality,
        FilterKey::From,
        FilterKey::To,
        FilterKey::Min,
        FilterKey::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKey::Search => "search",
            FilterKey::Status => "status",
            FilterKey::Category => "category",
            FilterKey::Facility => "facility",
            FilterKey::Criticality => "criticality",
            FilterKey::From => "from",
            FilterKey::To => "to",
            FilterKey::Min => "min",
            FilterKey::Max => "max",
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKey {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        FilterKey::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| FilterError::UnknownKey(s.to_string()))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("unknown filter key '{0}'")]
    UnknownKey(String),
    #[error("filter '{key}' expects a yyyy-mm-dd date, got '{value}'")]
    InvalidDate { key: FilterKey, value: String },
    #[error("filter '{key}' expects a number, got '{value}'")]
    InvalidAmount { key: FilterKey, value: String },
}

/// Current filter values of a list view.
///
/// Every key is always present; an empty string means the key places no
/// constraint on the result.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct FilterState {
    pub search: String,
    pub status: String,
    pub category: String,
    pub facility: String,
    pub criticality: String,
    pub from: String,
    pub to: String,
    pub min: String,
    pub max: String,
}

impl FilterState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: FilterKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: FilterKey) -> &str {
        match key {
            FilterKey::Search => &self.search,
            FilterKey::Status => &self.status,
            FilterKey::Category => &self.category,
            FilterKey::Facility => &self.facility,
            FilterKey::Criticality => &self.criticality,
            FilterKey::From => &self.from,
            FilterKey::To => &self.to,
            FilterKey::Min => &self.min,
            FilterKey::Max => &self.max,
        }
    }

    pub fn set(&mut self, key: FilterKey, value: impl Into<String>) {
        let slot = match key {
            FilterKey::Search => &mut self.search,
            FilterKey::Status => &mut self.status,
            FilterKey::Category => &mut self.category,
            FilterKey::Facility => &mut self.facility,
            FilterKey::Criticality => &mut self.criticality,
            FilterKey::From => &mut self.from,
            FilterKey::To => &mut self.to,
            FilterKey::Min => &mut self.min,
            FilterKey::Max => &mut self.max,
        };
        *slot = value.into();
    }

    /// True when no key constrains the result.
    pub fn is_empty(&self) -> bool {
        FilterKey::ALL.iter().all(|k| self.get(*k).is_empty())
    }

    /// Active (non-empty) entries, in key order.
    pub fn active(&self) -> Vec<(FilterKey, &str)> {
        FilterKey::ALL
            .iter()
            .map(|k| (*k, self.get(*k)))
            .filter(|(_, v)| !v.is_empty())
            .collect()
    }

    /// Builds the conjunction of predicates for every active key.
    pub fn compile(&self) -> Result<PredicateSet, FilterError> {
        let mut set = PredicateSet::new();

        if !self.search.is_empty() {
            set.add(Box::new(TextSearch::new(&self.search)));
        }

        for key in [FilterKey::Status, FilterKey::Category, FilterKey::Facility, FilterKey::Criticality] {
            let value = self.get(key);
            if !value.is_empty() {
                set.add(Box::new(ExactMatch::new(key, value)));
            }
        }

        let from = parse_date(FilterKey::From, &self.from)?;
        let to = parse_date(FilterKey::To, &self.to)?;
        if from.is_some() || to.is_some() {
            set.add(Box::new(DateRange { from, to }));
        }

        let min = parse_amount(FilterKey::Min, &self.min)?;
        let max = parse_amount(FilterKey::Max, &self.max)?;
        if min.is_some() || max.is_some() {
            set.add(Box::new(AmountRange { min, max }));
        }

        Ok(set)
    }
}

fn parse_date(key: FilterKey, value: &str) -> Result<Option<NaiveDate>, FilterError> {
    if value.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map(Some)
        .map_err(|_| FilterError::InvalidDate { key, value: value.to_string() })
}

fn parse_amount(key: FilterKey, value: &str) -> Result<Option<f64>, FilterError> {
    if value.is_empty() {
        return Ok(None);
    }
    match value.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(Some(n)),
        _ => Err(FilterError::InvalidAmount { key, value: value.to_string() }),
    }
}

/// A single inclusion test over a record.
pub trait Predicate: Send + Sync {
    fn matches(&self, record: &dyn Listable) -> bool;

    fn description(&self) -> String;
}

/// Case-insensitive substring search over name, code, description and
/// manufacturer. Any one field matching is enough.
#[derive(Debug, Clone)]
pub struct TextSearch {
    needle: String,
}

impl TextSearch {
    pub fn new(term: &str) -> Self {
        Self { needle: term.to_lowercase() }
    }
}

impl Predicate for TextSearch {
    fn matches(&self, record: &dyn Listable) -> bool {
        let fields = [
            Some(record.name()),
            Some(record.code()),
            Some(record.description()),
            record.manufacturer(),
        ];
        fields
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(&self.needle))
    }

    fn description(&self) -> String {
        format!("search~'{}'", self.needle)
    }
}

/// Field equality. A record that lacks the field never matches.
#[derive(Debug, Clone)]
pub struct ExactMatch {
    key: FilterKey,
    value: String,
}

impl ExactMatch {
    pub fn new(key: FilterKey, value: &str) -> Self {
        Self { key, value: value.to_string() }
    }
}

/// The record field an exact-match key compares against.
pub fn field_value(record: &dyn Listable, key: FilterKey) -> Option<&str> {
    match key {
        FilterKey::Status => Some(record.status()),
        FilterKey::Category => Some(record.category()),
        FilterKey::Facility => Some(record.facility()),
        FilterKey::Criticality => record.criticality(),
        _ => None,
    }
}

impl Predicate for ExactMatch {
    fn matches(&self, record: &dyn Listable) -> bool {
        field_value(record, self.key) == Some(self.value.as_str())
    }

    fn description(&self) -> String {
        format!("{}='{}'", self.key, self.value)
    }
}

/// Inclusive bounds on the record date.
#[derive(Debug, Clone)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl Predicate for DateRange {
    fn matches(&self, record: &dyn Listable) -> bool {
        let Some(date) = record.record_date() else { return false };
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }

    fn description(&self) -> String {
        let from = self.from.map(|d| d.to_string()).unwrap_or_default();
        let to = self.to.map(|d| d.to_string()).unwrap_or_default();
        format!("date[{}..{}]", from, to)
    }
}

/// Inclusive bounds on the record amount.
#[derive(Debug, Clone)]
pub struct AmountRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Predicate for AmountRange {
    fn matches(&self, record: &dyn Listable) -> bool {
        let Some(amount) = record.amount() else { return false };
        self.min.map_or(true, |min| amount >= min) && self.max.map_or(true, |max| amount <= max)
    }

    fn description(&self) -> String {
        let min = self.min.map(|n| n.to_string()).unwrap_or_default();
        let max = self.max.map(|n| n.to_string()).unwrap_or_default();
        format!("amount[{}..{}]", min, max)
    }
}

/// Conjunction of predicates. An empty set includes every record.
#[derive(Default)]
pub struct PredicateSet {
    predicates: Vec<Box<dyn Predicate>>,
}

impl PredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, predicate: Box<dyn Predicate>) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn add(&mut self, predicate: Box<dyn Predicate>) {
        self.predicates.push(predicate);
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn matches(&self, record: &dyn Listable) -> bool {
        self.predicates.iter().all(|p| p.matches(record))
    }

    /// Filters `records` preserving store order.
    pub fn apply<'a, R: Listable>(&self, records: &'a [R]) -> Vec<&'a R> {
        records.iter().filter(|r| self.matches(*r)).collect()
    }

    pub fn description(&self) -> String {
        if self.predicates.is_empty() {
            return "all".to_string();
        }
        self.predicates
            .iter()
            .map(|p| p.description())
            .collect::<Vec<_>>()
            .join(" AND ")
    }
}

impl fmt::Debug for PredicateSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateSet")
            .field("predicates", &self.description())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, PurchaseRecord};

    fn asset(code: &str, name: &str, status: &str, criticality: &str) -> Asset {
        Asset {
            code: code.to_string(),
            name: name.to_string(),
            description: String::new(),
            manufacturer: "Dell".to_string(),
            status: status.to_string(),
            category: "IT".to_string(),
            facility: "Jakarta".to_string(),
            criticality: criticality.to_string(),
            location: String::new(),
            purchase_cost: 15_000_000.0,
            salvage_value: 0.0,
            useful_life_years: 4,
            acquired_on: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            next_maintenance: None,
        }
    }

    #[test]
    fn search_is_case_insensitive_and_spans_fields() {
        let set = FilterState::new().with(FilterKey::Search, "DELL").compile().unwrap();
        assert!(set.matches(&asset("AST-1", "Laptop", "tersedia", "")));

        let set = FilterState::new().with(FilterKey::Search, "ast-").compile().unwrap();
        assert!(set.matches(&asset("AST-1", "Laptop", "tersedia", "")));

        let set = FilterState::new().with(FilterKey::Search, "printer").compile().unwrap();
        assert!(!set.matches(&asset("AST-1", "Laptop", "tersedia", "")));
    }

    #[test]
    fn exact_match_requires_full_equality() {
        let set = FilterState::new().with(FilterKey::Status, "tersedia").compile().unwrap();
        assert!(set.matches(&asset("A", "Laptop", "tersedia", "")));
        assert!(!set.matches(&asset("A", "Laptop", "Tersedia", "")));
        assert!(!set.matches(&asset("A", "Laptop", "tersedia-baru", "")));
    }

    #[test]
    fn criticality_filter_excludes_records_without_the_field() {
        let purchase = PurchaseRecord {
            code: "PO-1".into(),
            name: "Toner".into(),
            description: String::new(),
            vendor: "HP".into(),
            status: "draft".into(),
            category: "IT".into(),
            facility: "Jakarta".into(),
            total_cost: 10.0,
            ordered_on: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        };
        let set = FilterState::new().with(FilterKey::Criticality, "tinggi").compile().unwrap();
        assert!(!set.matches(&purchase));
    }

    #[test]
    fn empty_state_compiles_to_empty_set() {
        let set = FilterState::new().compile().unwrap();
        assert!(set.is_empty());
        assert_eq!(set.description(), "all");
        assert!(set.matches(&asset("A", "Laptop", "rusak", "")));
    }

    #[test]
    fn ranges_are_inclusive() {
        let a = asset("A", "Laptop", "tersedia", "");
        let set = FilterState::new()
            .with(FilterKey::From, "2024-05-01")
            .with(FilterKey::To, "2024-05-01")
            .with(FilterKey::Min, "15000000")
            .with(FilterKey::Max, "15000000")
            .compile()
            .unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.matches(&a));

        let set = FilterState::new().with(FilterKey::From, "2024-05-02").compile().unwrap();
        assert!(!set.matches(&a));
    }

    #[test]
    fn malformed_range_values_are_rejected() {
        let err = FilterState::new().with(FilterKey::From, "01/05/2024").compile().unwrap_err();
        assert!(matches!(err, FilterError::InvalidDate { key: FilterKey::From, .. }));

        let err = FilterState::new().with(FilterKey::Max, "lots").compile().unwrap_err();
        assert!(matches!(err, FilterError::InvalidAmount { key: FilterKey::Max, .. }));
    }

    #[test]
    fn active_lists_only_non_empty_keys() {
        let state = FilterState::new()
            .with(FilterKey::Status, "rusak")
            .with(FilterKey::Facility, "Bandung");
        assert_eq!(
            state.active(),
            vec![(FilterKey::Status, "rusak"), (FilterKey::Facility, "Bandung")]
        );
        assert_eq!("FACILITY".parse::<FilterKey>().unwrap(), FilterKey::Facility);
    }
}
