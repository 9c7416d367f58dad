//! Straight-line depreciation report.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::Asset;

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DepreciationRow {
    pub code: String,
    pub name: String,
    pub purchase_cost: f64,
    pub salvage_value: f64,
    pub annual_depreciation: f64,
    pub accumulated: f64,
    pub book_value: f64,
    pub elapsed_years: f64,
    pub fully_depreciated: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DepreciationReport {
    pub as_of: NaiveDate,
    pub rows: Vec<DepreciationRow>,
    pub total_cost: f64,
    pub total_accumulated: f64,
    pub total_book_value: f64,
}

/// Depreciates one asset to `as_of`. Accumulated depreciation never exceeds
/// `cost - salvage`, and nothing accrues before the acquisition date.
pub fn depreciate(asset: &Asset, as_of: NaiveDate) -> DepreciationRow {
    let cost = asset.purchase_cost.max(0.0);
    let salvage = asset.salvage_value.clamp(0.0, cost);
    let depreciable = cost - salvage;

    let elapsed_days = (as_of - asset.acquired_on).num_days().max(0);
    let elapsed_years = elapsed_days as f64 / DAYS_PER_YEAR;

    let (annual, accumulated) = if asset.useful_life_years == 0 {
        (depreciable, depreciable)
    } else {
        let annual = depreciable / asset.useful_life_years as f64;
        (annual, (annual * elapsed_years).min(depreciable))
    };

    DepreciationRow {
        code: asset.code.clone(),
        name: asset.name.clone(),
        purchase_cost: cost,
        salvage_value: salvage,
        annual_depreciation: annual,
        accumulated,
        book_value: cost - accumulated,
        elapsed_years,
        fully_depreciated: accumulated >= depreciable,
    }
}

pub fn report<'a, I>(assets: I, as_of: NaiveDate) -> DepreciationReport
where
    I: IntoIterator<Item = &'a Asset>,
{
    let rows: Vec<DepreciationRow> = assets.into_iter().map(|a| depreciate(a, as_of)).collect();
    DepreciationReport {
        as_of,
        total_cost: rows.iter().map(|r| r.purchase_cost).sum(),
        total_accumulated: rows.iter().map(|r| r.accumulated).sum(),
        total_book_value: rows.iter().map(|r| r.book_value).sum(),
        rows,
    }
}
