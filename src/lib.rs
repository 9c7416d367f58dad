pub mod model;
pub mod store;
pub mod filter;
pub mod aggregate;
pub mod paginate;
pub mod view;
pub mod validation;
pub mod depreciation;
pub mod error;
pub mod actions;
pub mod config;
pub mod manager;
pub mod parser;
pub mod server;

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::RwLock;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::aggregate::CollectionStats;
use crate::depreciation::DepreciationReport;
use crate::error::{DeskError, DeskResult};
use crate::filter::FilterState;
use crate::model::{CollectionKind, Listable, Record, Warehouse};
use crate::paginate::Page;
use crate::store::RecordStore;
use crate::validation::{validate_record, validate_status};
use crate::view::ListView;

/// On-disk shape of fixtures and snapshots.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Fixture {
    #[serde(default)]
    pub warehouses: Vec<Warehouse>,
    #[serde(default)]
    pub records: Vec<Record>,
}

type Stores = BTreeMap<CollectionKind, RecordStore<Record>>;

/// All list-view collections of the back office plus the warehouse list.
pub struct AssetDesk {
    stores: RwLock<Stores>,
    warehouses: RwLock<Vec<Warehouse>>,
}

impl fmt::Debug for AssetDesk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("AssetDesk");
        if let Ok(stores) = self.stores.read() {
            for (kind, store) in stores.iter() {
                s.field(kind.as_str(), &store.len());
            }
        }
        s.finish()
    }
}

impl Default for AssetDesk {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_stores() -> Stores {
    CollectionKind::ALL
        .into_iter()
        .map(|kind| (kind, RecordStore::new()))
        .collect()
}

fn build_stores(records: Vec<Record>) -> DeskResult<Stores> {
    let mut stores = empty_stores();
    for record in records {
        let kind = record.collection();
        if let Some(store) = stores.get_mut(&kind) {
            store.insert(record).map_err(|e| DeskError::from_store(kind, e))?;
        }
    }
    Ok(stores)
}

impl AssetDesk {
    pub fn new() -> Self {
        Self {
            stores: RwLock::new(empty_stores()),
            warehouses: RwLock::new(Vec::new()),
        }
    }

    /// Fixture records are not validated; they are taken as the source of
    /// truth. Duplicate codes within a collection are still rejected.
    pub fn from_fixture(fixture: Fixture) -> DeskResult<Self> {
        let stores = build_stores(fixture.records)?;
        Ok(Self {
            stores: RwLock::new(stores),
            warehouses: RwLock::new(fixture.warehouses),
        })
    }

    pub fn load(path: &Path) -> DeskResult<Self> {
        let bytes = fs::read(path)?;
        let fixture: Fixture = serde_json::from_slice(&bytes)?;
        let desk = Self::from_fixture(fixture)?;
        info!(path = %path.display(), desk = ?desk, "loaded fixture");
        Ok(desk)
    }

    pub fn count(&self, kind: CollectionKind) -> DeskResult<usize> {
        let stores = self.stores.read().map_err(|_| DeskError::Poisoned)?;
        Ok(stores.get(&kind).map_or(0, |s| s.len()))
    }

    /// Filtered, paginated rows of one collection. The page index is clamped
    /// onto the last page of the result.
    pub fn list(&self, kind: CollectionKind, view: &ListView) -> DeskResult<Page<Record>> {
        let stores = self.stores.read().map_err(|_| DeskError::Poisoned)?;
        let records = stores.get(&kind).map_or(&[][..], |s| s.records());
        let mut view = view.clone();
        let page = view.derive(records)?.into_page();
        debug!(%kind, total = page.total, page = page.page, "list");
        Ok(page)
    }

    pub fn get(&self, kind: CollectionKind, code: &str) -> DeskResult<Record> {
        let stores = self.stores.read().map_err(|_| DeskError::Poisoned)?;
        stores
            .get(&kind)
            .and_then(|s| s.get(code))
            .cloned()
            .ok_or_else(|| DeskError::NotFound { kind, code: code.to_string() })
    }

    /// Stat cards over the records of `kind` that pass `filter`. An empty
    /// filter aggregates the whole collection.
    pub fn stats(
        &self,
        kind: CollectionKind,
        filter: &FilterState,
        today: NaiveDate,
        window_days: i64,
    ) -> DeskResult<CollectionStats> {
        let predicates = filter.compile()?;
        let stores = self.stores.read().map_err(|_| DeskError::Poisoned)?;
        let records = stores.get(&kind).map_or(&[][..], |s| s.records());
        let stats = if predicates.is_empty() {
            aggregate::collection_stats(kind, records, today, window_days)
        } else {
            let matched = predicates.apply(records);
            aggregate::collection_stats(kind, matched.iter().copied(), today, window_days)
        };
        Ok(stats)
    }

    pub fn create(&self, kind: CollectionKind, record: Record) -> DeskResult<Record> {
        if record.collection() != kind {
            return Err(DeskError::WrongCollection { expected: kind, found: record.collection() });
        }
        validate_record(&record)?;
        let mut stores = self.stores.write().map_err(|_| DeskError::Poisoned)?;
        let store = stores.entry(kind).or_default();
        store
            .insert(record.clone())
            .map_err(|e| DeskError::from_store(kind, e))?;
        info!(%kind, code = record.code(), "created");
        Ok(record)
    }

    /// Replaces the record stored under `code` with `record`.
    pub fn replace(&self, kind: CollectionKind, code: &str, record: Record) -> DeskResult<Record> {
        if record.collection() != kind {
            return Err(DeskError::WrongCollection { expected: kind, found: record.collection() });
        }
        if record.code() != code {
            return Err(DeskError::CodeMismatch { path: code.to_string(), body: record.code().to_string() });
        }
        validate_record(&record)?;
        let mut stores = self.stores.write().map_err(|_| DeskError::Poisoned)?;
        let store = stores.entry(kind).or_default();
        let updated = store
            .update(code, |slot| *slot = record)
            .map_err(|e| DeskError::from_store(kind, e))?
            .clone();
        info!(%kind, code, "replaced");
        Ok(updated)
    }

    pub fn update_status(&self, kind: CollectionKind, code: &str, status: &str) -> DeskResult<Record> {
        validate_status(status)?;
        let mut stores = self.stores.write().map_err(|_| DeskError::Poisoned)?;
        let store = stores.entry(kind).or_default();
        let updated = store
            .update(code, |r| r.set_status(status.to_string()))
            .map_err(|e| DeskError::from_store(kind, e))?
            .clone();
        info!(%kind, code, status, "status changed");
        Ok(updated)
    }

    pub fn remove(&self, kind: CollectionKind, code: &str) -> DeskResult<Record> {
        let mut stores = self.stores.write().map_err(|_| DeskError::Poisoned)?;
        let store = stores.entry(kind).or_default();
        let removed = store.remove(code).map_err(|e| DeskError::from_store(kind, e))?;
        info!(%kind, code, "removed");
        Ok(removed)
    }

    /// Depreciation of the assets that pass `filter`, valued at `as_of`.
    pub fn depreciation(&self, filter: &FilterState, as_of: NaiveDate) -> DeskResult<DepreciationReport> {
        let predicates = filter.compile()?;
        let stores = self.stores.read().map_err(|_| DeskError::Poisoned)?;
        let records = stores
            .get(&CollectionKind::Assets)
            .map_or(&[][..], |s| s.records());
        let assets = predicates.apply(records).into_iter().filter_map(|r| match r {
            Record::Asset(a) => Some(a),
            _ => None,
        });
        Ok(depreciation::report(assets, as_of))
    }

    pub fn warehouses(&self) -> DeskResult<Vec<Warehouse>> {
        let warehouses = self.warehouses.read().map_err(|_| DeskError::Poisoned)?;
        Ok(warehouses.clone())
    }

    /// Linear lookup; an inventory item may name a warehouse that does not
    /// exist.
    pub fn warehouse(&self, id: &str) -> DeskResult<Option<Warehouse>> {
        let warehouses = self.warehouses.read().map_err(|_| DeskError::Poisoned)?;
        Ok(warehouses.iter().find(|w| w.id == id).cloned())
    }

    // --- SNAPSHOTS ---

    pub fn snapshot(&self) -> DeskResult<Vec<u8>> {
        let fixture = {
            let stores = self.stores.read().map_err(|_| DeskError::Poisoned)?;
            let warehouses = self.warehouses.read().map_err(|_| DeskError::Poisoned)?;
            Fixture {
                warehouses: warehouses.clone(),
                records: stores.values().flat_map(|s| s.records().iter().cloned()).collect(),
            }
        };
        debug!(records = fixture.records.len(), "serializing snapshot");
        Ok(serde_json::to_vec_pretty(&fixture)?)
    }

    /// Replaces every collection with the contents of `data`. On error the
    /// desk is left untouched.
    pub fn restore(&self, data: &[u8]) -> DeskResult<()> {
        let fixture: Fixture = serde_json::from_slice(data)?;
        let count = fixture.records.len();
        let rebuilt = build_stores(fixture.records)?;

        let mut stores = self.stores.write().map_err(|_| DeskError::Poisoned)?;
        let mut warehouses = self.warehouses.write().map_err(|_| DeskError::Poisoned)?;
        *stores = rebuilt;
        *warehouses = fixture.warehouses;
        info!(records = count, "restored snapshot");
        Ok(())
    }

    pub fn save(&self, path: &Path) -> DeskResult<()> {
        let bytes = self.snapshot()?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, &bytes)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKey;
    use crate::model::{Asset, InventoryItem};

    fn asset(code: &str, status: &str) -> Record {
        Record::Asset(Asset {
            code: code.into(),
            name: format!("Server {}", code),
            description: String::new(),
            manufacturer: "HPE".into(),
            status: status.into(),
            category: "IT".into(),
            facility: "Jakarta".into(),
            criticality: "tinggi".into(),
            location: "Rack 4".into(),
            purchase_cost: 80_000_000.0,
            salvage_value: 5_000_000.0,
            useful_life_years: 5,
            acquired_on: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            next_maintenance: None,
        })
    }

    fn desk() -> AssetDesk {
        AssetDesk::from_fixture(Fixture {
            warehouses: vec![Warehouse { id: "WH-1".into(), name: "Gudang Utama".into(), location: "Cikarang".into() }],
            records: vec![asset("AST-1", "tersedia"), asset("AST-2", "rusak")],
        })
        .unwrap()
    }

    #[test]
    fn duplicate_fixture_codes_fail() {
        let err = AssetDesk::from_fixture(Fixture {
            warehouses: vec![],
            records: vec![asset("AST-1", "tersedia"), asset("AST-1", "rusak")],
        })
        .unwrap_err();
        assert!(matches!(err, DeskError::Duplicate { kind: CollectionKind::Assets, .. }));
    }

    #[test]
    fn get_unknown_code_is_not_found() {
        let err = desk().get(CollectionKind::Assets, "AST-404").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "assets 'AST-404' not found");
    }

    #[test]
    fn create_validates_and_lists() {
        let desk = desk();
        let mut bad = asset("AST-3", "tersedia");
        if let Record::Asset(a) = &mut bad {
            a.name = "X".into();
        }
        assert!(matches!(desk.create(CollectionKind::Assets, bad), Err(DeskError::Validation(_))));

        desk.create(CollectionKind::Assets, asset("AST-3", "tersedia")).unwrap();
        let mut view = ListView::default();
        view.set_filter(FilterKey::Status, "tersedia");
        let page = desk.list(CollectionKind::Assets, &view).unwrap();
        assert_eq!(page.total, 2);
    }

    #[test]
    fn replace_checks_collection_and_code() {
        let desk = desk();
        let err = desk.replace(CollectionKind::Assets, "AST-2", asset("AST-1", "rusak")).unwrap_err();
        assert!(matches!(err, DeskError::CodeMismatch { .. }));

        let item = Record::Inventory(InventoryItem {
            code: "AST-1".into(),
            name: "Kabel".into(),
            description: String::new(),
            manufacturer: String::new(),
            status: "tersedia".into(),
            category: String::new(),
            facility: String::new(),
            warehouse_id: "WH-1".into(),
            quantity: 1,
            reorder_point: 0,
            unit_cost: 1.0,
            received_on: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        });
        let err = desk.replace(CollectionKind::Assets, "AST-1", item).unwrap_err();
        assert!(matches!(err, DeskError::WrongCollection { .. }));

        let updated = desk.replace(CollectionKind::Assets, "AST-2", asset("AST-2", "dipakai")).unwrap();
        assert_eq!(updated.status(), "dipakai");
    }

    #[test]
    fn stats_respect_filter() {
        let desk = desk();
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let all = desk.stats(CollectionKind::Assets, &FilterState::new(), today, 7).unwrap();
        assert_eq!(all.total, 2);
        let only = desk
            .stats(CollectionKind::Assets, &FilterState::new().with(FilterKey::Status, "rusak"), today, 7)
            .unwrap();
        assert_eq!(only.total, 1);
        assert_eq!(only.by_status.get("rusak"), 1);
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let source = desk();
        source.update_status(CollectionKind::Assets, "AST-1", "dipakai").unwrap();
        let bytes = source.snapshot().unwrap();

        let target = AssetDesk::new();
        target.restore(&bytes).unwrap();
        assert_eq!(target.count(CollectionKind::Assets).unwrap(), 2);
        assert_eq!(target.get(CollectionKind::Assets, "AST-1").unwrap().status(), "dipakai");
        assert_eq!(target.warehouse("WH-1").unwrap().unwrap().name, "Gudang Utama");
        assert!(target.warehouse("WH-9").unwrap().is_none());
    }
}
