//! Asynchronous server actions over an [`AssetDesk`].
//!
//! Every action waits out a simulated latency and then runs against the desk,
//! the whole call bounded by a timeout. Dropping an action future before the
//! delay elapses cancels it; the desk is only touched after the delay, in a
//! single locked step, so a cancelled or timed-out action never leaves a
//! partial write behind.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use crate::aggregate::CollectionStats;
use crate::config::DeskConfig;
use crate::depreciation::DepreciationReport;
use crate::error::{DeskError, DeskResult};
use crate::filter::FilterState;
use crate::model::{CollectionKind, Record, Warehouse};
use crate::paginate::Page;
use crate::validation::FieldError;
use crate::view::ListView;
use crate::AssetDesk;

#[derive(Error, Debug)]
pub enum ActionError {
    #[error(transparent)]
    Desk(#[from] DeskError),
    #[error("action timed out after {0:?}")]
    Timeout(Duration),
}

/// Failure category carried by an envelope; the HTTP layer maps it to a
/// status code.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Duplicate,
    Validation,
    BadRequest,
    Timeout,
    Internal,
}

impl ActionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ActionError::Timeout(_) => ErrorKind::Timeout,
            ActionError::Desk(e) => match e {
                DeskError::NotFound { .. } => ErrorKind::NotFound,
                DeskError::Duplicate { .. } => ErrorKind::Duplicate,
                DeskError::Validation(_) => ErrorKind::Validation,
                DeskError::Filter(_) | DeskError::WrongCollection { .. } | DeskError::CodeMismatch { .. } => {
                    ErrorKind::BadRequest
                }
                DeskError::Poisoned | DeskError::Snapshot(_) | DeskError::Io(_) => ErrorKind::Internal,
            },
        }
    }
}

/// Result envelope returned by every action: a success flag, the data, an
/// optional total and a message on failure. Failures never panic or throw.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActionResult<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorKind>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
    pub request_id: Uuid,
}

impl<T> ActionResult<T> {
    pub fn ok(request_id: Uuid, data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            total: None,
            message: None,
            error: None,
            field_errors: Vec::new(),
            request_id,
        }
    }

    pub fn failed(request_id: Uuid, err: &ActionError) -> Self {
        let field_errors = match err {
            ActionError::Desk(DeskError::Validation(v)) => v.errors.clone(),
            _ => Vec::new(),
        };
        Self {
            success: false,
            data: None,
            total: None,
            message: Some(err.to_string()),
            error: Some(err.kind()),
            field_errors,
            request_id,
        }
    }

    /// Failure raised before any action ran, such as a malformed query or
    /// body. Gets its own request id.
    pub fn rejected(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            total: None,
            message: Some(message.into()),
            error: Some(kind),
            field_errors: Vec::new(),
            request_id: Uuid::new_v4(),
        }
    }

    pub fn from_result(request_id: Uuid, result: Result<T, ActionError>) -> Self {
        match result {
            Ok(data) => Self::ok(request_id, data),
            Err(err) => Self::failed(request_id, &err),
        }
    }

    pub fn with_total(mut self, total: usize) -> Self {
        self.total = Some(total);
        self
    }
}

/// Simulated latency plus a hard timeout around each action.
#[derive(Debug, Clone, Copy)]
pub struct ActionRunner {
    delay: Duration,
    timeout: Duration,
}

impl ActionRunner {
    pub fn new(delay: Duration, timeout: Duration) -> Self {
        Self { delay, timeout }
    }

    /// Runs `f` after the simulated delay. Returns the request id assigned to
    /// the call together with its outcome.
    pub async fn run<T, F>(&self, name: &'static str, f: F) -> (Uuid, Result<T, ActionError>)
    where
        F: FnOnce() -> DeskResult<T>,
    {
        let request_id = Uuid::new_v4();
        let span = info_span!("action", action = name, %request_id);
        let delay = self.delay;

        let call = async move {
            tokio::time::sleep(delay).await;
            f().map_err(ActionError::from)
        };

        let result = match tokio::time::timeout(self.timeout, call).instrument(span.clone()).await {
            Ok(result) => result,
            Err(_) => Err(ActionError::Timeout(self.timeout)),
        };

        if let Err(e) = &result {
            span.in_scope(|| warn!(error = %e, "action failed"));
        }
        (request_id, result)
    }
}

/// The server actions of the desk.
#[derive(Debug, Clone)]
pub struct Actions {
    desk: Arc<AssetDesk>,
    runner: ActionRunner,
    default_page_size: usize,
    max_page_size: usize,
    maintenance_window_days: i64,
}

impl Actions {
    pub fn new(desk: Arc<AssetDesk>, config: &DeskConfig) -> Self {
        Self {
            desk,
            runner: ActionRunner::new(
                Duration::from_millis(config.action_delay_ms),
                Duration::from_millis(config.action_timeout_ms),
            ),
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            maintenance_window_days: config.maintenance_window_days,
        }
    }

    pub fn default_page_size(&self) -> usize {
        self.default_page_size
    }

    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Envelope `total` is the filtered row count across all pages.
    pub async fn list(&self, kind: CollectionKind, view: ListView) -> ActionResult<Page<Record>> {
        let desk = self.desk.clone();
        let (id, result) = self.runner.run("list", move || desk.list(kind, &view)).await;
        match result {
            Ok(page) => {
                let total = page.total;
                ActionResult::ok(id, page).with_total(total)
            }
            Err(e) => ActionResult::failed(id, &e),
        }
    }

    pub async fn get(&self, kind: CollectionKind, code: &str) -> ActionResult<Record> {
        let desk = self.desk.clone();
        let (id, result) = self.runner.run("get", move || desk.get(kind, code)).await;
        ActionResult::from_result(id, result)
    }

    pub async fn stats(
        &self,
        kind: CollectionKind,
        filter: FilterState,
        today: Option<NaiveDate>,
    ) -> ActionResult<CollectionStats> {
        let desk = self.desk.clone();
        let today = today.unwrap_or_else(|| Local::now().date_naive());
        let window = self.maintenance_window_days;
        let (id, result) = self
            .runner
            .run("stats", move || desk.stats(kind, &filter, today, window))
            .await;
        ActionResult::from_result(id, result)
    }

    pub async fn create(&self, kind: CollectionKind, record: Record) -> ActionResult<Record> {
        let desk = self.desk.clone();
        let (id, result) = self.runner.run("create", move || desk.create(kind, record)).await;
        ActionResult::from_result(id, result)
    }

    pub async fn replace(&self, kind: CollectionKind, code: &str, record: Record) -> ActionResult<Record> {
        let desk = self.desk.clone();
        let (id, result) = self
            .runner
            .run("replace", move || desk.replace(kind, code, record))
            .await;
        ActionResult::from_result(id, result)
    }

    pub async fn update_status(&self, kind: CollectionKind, code: &str, status: &str) -> ActionResult<Record> {
        let desk = self.desk.clone();
        let (id, result) = self
            .runner
            .run("update_status", move || desk.update_status(kind, code, status))
            .await;
        ActionResult::from_result(id, result)
    }

    pub async fn remove(&self, kind: CollectionKind, code: &str) -> ActionResult<Record> {
        let desk = self.desk.clone();
        let (id, result) = self.runner.run("remove", move || desk.remove(kind, code)).await;
        ActionResult::from_result(id, result)
    }

    pub async fn depreciation(&self, filter: FilterState, as_of: Option<NaiveDate>) -> ActionResult<DepreciationReport> {
        let desk = self.desk.clone();
        let as_of = as_of.unwrap_or_else(|| Local::now().date_naive());
        let (id, result) = self
            .runner
            .run("depreciation", move || desk.depreciation(&filter, as_of))
            .await;
        match result {
            Ok(report) => {
                let total = report.rows.len();
                ActionResult::ok(id, report).with_total(total)
            }
            Err(e) => ActionResult::failed(id, &e),
        }
    }

    pub async fn warehouses(&self) -> ActionResult<Vec<Warehouse>> {
        let desk = self.desk.clone();
        let (id, result) = self.runner.run("warehouses", move || desk.warehouses()).await;
        match result {
            Ok(list) => {
                let total = list.len();
                ActionResult::ok(id, list).with_total(total)
            }
            Err(e) => ActionResult::failed(id, &e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runner_times_out_when_delay_exceeds_budget() {
        let runner = ActionRunner::new(Duration::from_millis(200), Duration::from_millis(20));
        let (_, result) = runner.run("slow", || Ok::<_, DeskError>(1)).await;
        assert!(matches!(result, Err(ActionError::Timeout(_))));
    }

    #[tokio::test]
    async fn dropped_action_never_runs() {
        let desk = Arc::new(AssetDesk::new());
        let runner = ActionRunner::new(Duration::from_millis(500), Duration::from_secs(5));
        let d = desk.clone();
        let call = runner.run("slow_remove", move || d.remove(CollectionKind::Assets, "AST-1"));
        // Abandon the call long before its delay elapses.
        let abandoned = tokio::time::timeout(Duration::from_millis(10), call).await;
        assert!(abandoned.is_err());
        assert_eq!(desk.count(CollectionKind::Assets).unwrap(), 0);
    }

    #[test]
    fn failed_envelope_carries_kind_and_message() {
        let err = ActionError::Desk(DeskError::NotFound { kind: CollectionKind::Returns, code: "RT-9".into() });
        let env: ActionResult<Record> = ActionResult::failed(Uuid::nil(), &err);
        assert!(!env.success);
        assert!(env.data.is_none());
        assert_eq!(env.error, Some(ErrorKind::NotFound));
        assert_eq!(env.message.as_deref(), Some("returns 'RT-9' not found"));

        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["success"], false);
        assert!(json.get("field_errors").is_none());
    }
}
