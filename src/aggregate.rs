//! Stat-card counters over a record sequence.
//!
//! Everything here is a read-only projection. Values that fall outside the
//! named buckets are kept out of them but tallied in `unmapped`, so the
//! buckets plus `unmapped` always add up to `total`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::filter::{field_value, FilterKey};
use crate::model::{CollectionKind, Listable, Record, CRITICALITIES};

/// Default look-ahead for the maintenance-due counter, in days.
pub const MAINTENANCE_WINDOW_DAYS: i64 = 7;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct BucketCounts {
    pub buckets: Vec<Bucket>,
    pub unmapped: usize,
    pub total: usize,
}

impl BucketCounts {
    pub fn get(&self, label: &str) -> usize {
        self.buckets
            .iter()
            .find(|b| b.label == label)
            .map_or(0, |b| b.count)
    }

    pub fn mapped(&self) -> usize {
        self.buckets.iter().map(|b| b.count).sum()
    }
}

/// Tallies `key` over `records` into the given named buckets, in the order
/// given.
pub fn count_by<'a, R, I>(records: I, key: FilterKey, labels: &[&str]) -> BucketCounts
where
    R: Listable + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut counts = BucketCounts {
        buckets: labels
            .iter()
            .map(|l| Bucket { label: l.to_string(), count: 0 })
            .collect(),
        ..Default::default()
    };

    for record in records {
        counts.total += 1;
        let value = field_value(record, key);
        match value.and_then(|v| counts.buckets.iter_mut().find(|b| b.label == v)) {
            Some(bucket) => bucket.count += 1,
            None => counts.unmapped += 1,
        }
    }
    counts
}

/// Like [`count_by`], but every distinct non-empty value gets a bucket,
/// sorted by label.
pub fn count_distinct<'a, R, I>(records: I, key: FilterKey) -> BucketCounts
where
    R: Listable + 'a,
    I: IntoIterator<Item = &'a R> + Clone,
{
    let labels: BTreeSet<&str> = records
        .clone()
        .into_iter()
        .filter_map(|r| field_value(r, key))
        .filter(|v| !v.is_empty())
        .collect();
    let labels: Vec<&str> = labels.into_iter().collect();
    count_by(records, key, &labels)
}

/// Records whose next maintenance falls within `window_days` of `today`.
/// Overdue maintenance counts as due.
pub fn maintenance_due<'a, R, I>(records: I, today: NaiveDate, window_days: i64) -> usize
where
    R: Listable + 'a,
    I: IntoIterator<Item = &'a R>,
{
    records
        .into_iter()
        .filter_map(|r| r.next_maintenance())
        .filter(|next| (*next - today).num_days() <= window_days)
        .count()
}

/// Stat cards for one list view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CollectionStats {
    pub collection: CollectionKind,
    pub total: usize,
    pub by_status: BucketCounts,
    pub by_category: BucketCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_criticality: Option<BucketCounts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_due: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_stock: Option<usize>,
    /// Purchase cost of assets, stock value of inventory, order value of
    /// purchases. Returns carry no amount.
    pub total_value: f64,
}

pub fn collection_stats<'a, I>(kind: CollectionKind, records: I, today: NaiveDate, window_days: i64) -> CollectionStats
where
    I: IntoIterator<Item = &'a Record> + Clone,
{
    let by_status = count_by(records.clone(), FilterKey::Status, kind.statuses());
    let by_category = count_distinct(records.clone(), FilterKey::Category);

    let mut stats = CollectionStats {
        collection: kind,
        total: by_status.total,
        by_status,
        by_category,
        by_criticality: None,
        maintenance_due: None,
        low_stock: None,
        total_value: 0.0,
    };

    match kind {
        CollectionKind::Assets => {
            stats.by_criticality = Some(count_by(records.clone(), FilterKey::Criticality, CRITICALITIES));
            stats.maintenance_due = Some(maintenance_due(records.clone(), today, window_days));
            stats.total_value = records.into_iter().filter_map(|r| r.amount()).sum();
        }
        CollectionKind::Inventory => {
            let mut low = 0;
            for record in records {
                if let Record::Inventory(item) = record {
                    if item.quantity <= item.reorder_point {
                        low += 1;
                    }
                    stats.total_value += item.quantity as f64 * item.unit_cost;
                }
            }
            stats.low_stock = Some(low);
        }
        CollectionKind::Returns => {}
        CollectionKind::Purchases => {
            stats.total_value = records.into_iter().filter_map(|r| r.amount()).sum();
        }
    }

    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Asset, InventoryItem, ASSET_STATUSES};

    fn asset(status: &str, criticality: &str, next: Option<NaiveDate>) -> Record {
        Record::Asset(Asset {
            code: format!("AST-{}", status),
            name: "Generator".into(),
            description: String::new(),
            manufacturer: String::new(),
            status: status.into(),
            category: "Mesin".into(),
            facility: String::new(),
            criticality: criticality.into(),
            location: String::new(),
            purchase_cost: 100.0,
            salvage_value: 0.0,
            useful_life_years: 5,
            acquired_on: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            next_maintenance: next,
        })
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn unknown_statuses_are_unmapped_not_lost() {
        let records = vec![
            asset("tersedia", "", None),
            asset("tersedia", "", None),
            asset("hilang", "", None),
            asset("rusak", "", None),
        ];
        let counts = count_by(&records, FilterKey::Status, ASSET_STATUSES);
        assert_eq!(counts.get("tersedia"), 2);
        assert_eq!(counts.get("rusak"), 1);
        assert_eq!(counts.get("hilang"), 0);
        assert_eq!(counts.unmapped, 1);
        assert_eq!(counts.mapped() + counts.unmapped, counts.total);
    }

    #[test]
    fn distinct_buckets_skip_empty_values() {
        let mut records = vec![asset("tersedia", "", None), asset("rusak", "", None)];
        if let Record::Asset(a) = &mut records[1] {
            a.category.clear();
        }
        let counts = count_distinct(&records, FilterKey::Category);
        assert_eq!(counts.buckets.len(), 1);
        assert_eq!(counts.get("Mesin"), 1);
        assert_eq!(counts.unmapped, 1);
    }

    #[test]
    fn maintenance_window_includes_overdue() {
        let today = day(10);
        let records = vec![
            asset("tersedia", "", Some(day(17))),
            asset("tersedia", "", Some(day(18))),
            asset("tersedia", "", Some(day(2))),
            asset("tersedia", "", None),
        ];
        assert_eq!(maintenance_due(&records, today, MAINTENANCE_WINDOW_DAYS), 2);
    }

    #[test]
    fn asset_stats_fill_asset_cards() {
        let records = vec![
            asset("tersedia", "tinggi", Some(day(12))),
            asset("dipakai", "rendah", None),
            asset("rusak", "kritis", None),
        ];
        let stats = collection_stats(CollectionKind::Assets, &records, day(10), 7);
        assert_eq!(stats.total, 3);
        let crit = stats.by_criticality.unwrap();
        assert_eq!(crit.get("tinggi"), 1);
        assert_eq!(crit.unmapped, 1);
        assert_eq!(stats.maintenance_due, Some(1));
        assert_eq!(stats.low_stock, None);
        assert_eq!(stats.total_value, 300.0);
    }

    #[test]
    fn stats_over_borrowed_subset() {
        let records = vec![
            asset("tersedia", "tinggi", Some(day(12))),
            asset("dipakai", "rendah", None),
            asset("rusak", "kritis", None),
        ];
        let subset: Vec<&Record> = records.iter().filter(|r| r.status() != "rusak").collect();
        let stats = collection_stats(CollectionKind::Assets, subset.iter().copied(), day(10), 7);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_status.get("rusak"), 0);
        assert_eq!(stats.maintenance_due, Some(1));
        assert_eq!(stats.total_value, 200.0);
    }

    #[test]
    fn inventory_stats_count_low_stock() {
        let item = |qty: u32| {
            Record::Inventory(InventoryItem {
                code: format!("INV-{}", qty),
                name: "Kabel".into(),
                description: String::new(),
                manufacturer: String::new(),
                status: "tersedia".into(),
                category: "Elektrik".into(),
                facility: String::new(),
                warehouse_id: "WH-1".into(),
                quantity: qty,
                reorder_point: 5,
                unit_cost: 2.0,
                received_on: day(1),
            })
        };
        let records = vec![item(3), item(5), item(40)];
        let stats = collection_stats(CollectionKind::Inventory, &records, day(10), 7);
        assert_eq!(stats.low_stock, Some(2));
        assert_eq!(stats.total_value, 96.0);
        assert!(stats.by_criticality.is_none());
    }
}
