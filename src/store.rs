use std::collections::HashMap;
use thiserror::Error;

use crate::model::Listable;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("code '{0}' not found")]
    NotFound(String),
    #[error("code '{0}' already exists")]
    Duplicate(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Ordered records of one collection with a code index.
///
/// Insertion order is display order. Codes are unique within the store.
#[derive(Debug, Clone)]
pub struct RecordStore<R> {
    records: Vec<R>,
    index: HashMap<String, usize>,
}

impl<R> Default for RecordStore<R> {
    fn default() -> Self {
        Self { records: Vec::new(), index: HashMap::new() }
    }
}

impl<R: Listable> RecordStore<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<R>) -> StoreResult<Self> {
        let mut store = Self::new();
        for record in records {
            store.insert(record)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn get(&self, code: &str) -> Option<&R> {
        let pos = *self.index.get(code)?;
        self.records.get(pos)
    }

    pub fn insert(&mut self, record: R) -> StoreResult<()> {
        let code = record.code().to_string();
        if self.index.contains_key(&code) {
            return Err(StoreError::Duplicate(code));
        }
        self.index.insert(code, self.records.len());
        self.records.push(record);
        Ok(())
    }

    /// Applies `f` in place. `f` must not change the record's code.
    pub fn update<F>(&mut self, code: &str, f: F) -> StoreResult<&R>
    where
        F: FnOnce(&mut R),
    {
        let pos = *self
            .index
            .get(code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        let record = &mut self.records[pos];
        f(record);
        debug_assert_eq!(record.code(), code);
        Ok(&self.records[pos])
    }

    pub fn remove(&mut self, code: &str) -> StoreResult<R> {
        let pos = self
            .index
            .remove(code)
            .ok_or_else(|| StoreError::NotFound(code.to_string()))?;
        let record = self.records.remove(pos);
        for slot in self.index.values_mut() {
            if *slot > pos {
                *slot -= 1;
            }
        }
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ReturnRecord;
    use chrono::NaiveDate;

    fn ret(code: &str) -> ReturnRecord {
        ReturnRecord {
            code: code.into(),
            name: "Monitor retak".into(),
            description: "Layar pecah saat pengiriman".into(),
            status: "menunggu".into(),
            category: "IT".into(),
            facility: "Medan".into(),
            asset_code: "AST-010".into(),
            quantity: 1,
            requested_on: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
        }
    }

    #[test]
    fn duplicate_codes_are_rejected() {
        let mut store = RecordStore::new();
        store.insert(ret("RT-1")).unwrap();
        assert_eq!(store.insert(ret("RT-1")), Err(StoreError::Duplicate("RT-1".into())));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn remove_keeps_order_and_index() {
        let mut store = RecordStore::from_records(vec![ret("RT-1"), ret("RT-2"), ret("RT-3")]).unwrap();
        let removed = store.remove("RT-1").unwrap();
        assert_eq!(removed.code, "RT-1");
        assert_eq!(store.get("RT-3").unwrap().code, "RT-3");
        let codes: Vec<&str> = store.records().iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["RT-2", "RT-3"]);
        assert_eq!(store.remove("RT-1"), Err(StoreError::NotFound("RT-1".into())));
    }

    #[test]
    fn update_in_place() {
        let mut store = RecordStore::from_records(vec![ret("RT-1")]).unwrap();
        let updated = store.update("RT-1", |r| r.status = "disetujui".into()).unwrap();
        assert_eq!(updated.status, "disetujui");
        assert!(store.update("RT-9", |_| {}).is_err());
    }
}
