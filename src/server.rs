use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use warp::http::StatusCode;
use warp::Filter;

use crate::actions::{ActionResult, Actions, ErrorKind};
use crate::filter::{FilterKey, FilterState};
use crate::model::{CollectionKind, Record};
use crate::paginate::Paginator;
use crate::view::ListView;

/// Upper bound on JSON request bodies.
const MAX_BODY_BYTES: u64 = 64 * 1024;

/// Query string of list, stats and depreciation requests. `page` is 0-based.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ListParams {
    pub search: Option<String>,
    pub status: Option<String>,
    pub category: Option<String>,
    pub facility: Option<String>,
    pub criticality: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub today: Option<NaiveDate>,
    pub as_of: Option<NaiveDate>,
}

impl ListParams {
    pub fn filter_state(&self) -> FilterState {
        let mut state = FilterState::new();
        let pairs = [
            (FilterKey::Search, &self.search),
            (FilterKey::Status, &self.status),
            (FilterKey::Category, &self.category),
            (FilterKey::Facility, &self.facility),
            (FilterKey::Criticality, &self.criticality),
            (FilterKey::From, &self.from),
            (FilterKey::To, &self.to),
            (FilterKey::Min, &self.min),
            (FilterKey::Max, &self.max),
        ];
        for (key, value) in pairs {
            if let Some(v) = value {
                state.set(key, v.as_str());
            }
        }
        state
    }

    pub fn list_view(&self, default_page_size: usize, max_page_size: usize) -> ListView {
        let mut paginator = Paginator::with_limit(self.page_size.unwrap_or(default_page_size), max_page_size);
        paginator.set_page(self.page.unwrap_or(0));
        ListView::new(self.filter_state(), paginator)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusBody {
    pub status: String,
}

fn status_for(error: Option<ErrorKind>, success: StatusCode) -> StatusCode {
    match error {
        None => success,
        Some(ErrorKind::NotFound) => StatusCode::NOT_FOUND,
        Some(ErrorKind::Duplicate) => StatusCode::CONFLICT,
        Some(ErrorKind::Validation) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorKind::BadRequest) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::Timeout) => StatusCode::GATEWAY_TIMEOUT,
        Some(ErrorKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn reply<T: Serialize>(envelope: ActionResult<T>, success: StatusCode) -> warp::reply::WithStatus<warp::reply::Json> {
    let status = status_for(envelope.error, success);
    warp::reply::with_status(warp::reply::json(&envelope), status)
}

fn with_actions(actions: Actions) -> impl Filter<Extract = (Actions,), Error = Infallible> + Clone {
    warp::any().map(move || actions.clone())
}

/// Path segments arrive percent-encoded. A segment that does not decode to
/// UTF-8 is kept as sent.
fn decode_code(raw: String) -> String {
    match urlencoding::decode(&raw) {
        Ok(code) => code.into_owned(),
        Err(_) => raw,
    }
}

/// Turns warp's own rejections into failure envelopes.
async fn handle_rejection(err: warp::Rejection) -> Result<impl warp::Reply, Infallible> {
    let (status, kind, message) = if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        (StatusCode::BAD_REQUEST, ErrorKind::BadRequest, e.to_string())
    } else if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, ErrorKind::BadRequest, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::PayloadTooLarge>() {
        (StatusCode::PAYLOAD_TOO_LARGE, ErrorKind::BadRequest, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::LengthRequired>() {
        (StatusCode::LENGTH_REQUIRED, ErrorKind::BadRequest, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::UnsupportedMediaType>() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, ErrorKind::BadRequest, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::MethodNotAllowed>() {
        (StatusCode::METHOD_NOT_ALLOWED, ErrorKind::BadRequest, e.to_string())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, ErrorKind::NotFound, "no such route".to_string())
    } else {
        warn!(rejection = ?err, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, ErrorKind::Internal, "internal error".to_string())
    };
    let envelope: ActionResult<()> = ActionResult::rejected(kind, message);
    Ok(warp::reply::with_status(warp::reply::json(&envelope), status))
}

/// All `/api` routes of the desk. Paths are matched before methods so an
/// unknown collection is a 404 rather than a 405.
pub fn routes(actions: Actions) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    // 1. GET /api/warehouses
    let warehouses = warp::path!("api" / "warehouses")
        .and(warp::get())
        .and(with_actions(actions.clone()))
        .and_then(|actions: Actions| async move {
            Ok::<_, warp::Rejection>(reply(actions.warehouses().await, StatusCode::OK))
        });

    // 2. GET /api/depreciation
    let depreciation = warp::path!("api" / "depreciation")
        .and(warp::get())
        .and(warp::query::<ListParams>())
        .and(with_actions(actions.clone()))
        .and_then(|params: ListParams, actions: Actions| async move {
            let envelope = actions.depreciation(params.filter_state(), params.as_of).await;
            Ok::<_, warp::Rejection>(reply(envelope, StatusCode::OK))
        });

    // 3. GET /api/{collection}/stats
    let stats = warp::path!("api" / CollectionKind / "stats")
        .and(warp::get())
        .and(warp::query::<ListParams>())
        .and(with_actions(actions.clone()))
        .and_then(|kind: CollectionKind, params: ListParams, actions: Actions| async move {
            let envelope = actions.stats(kind, params.filter_state(), params.today).await;
            Ok::<_, warp::Rejection>(reply(envelope, StatusCode::OK))
        });

    // 4. GET /api/{collection}
    let list = warp::path!("api" / CollectionKind)
        .and(warp::get())
        .and(warp::query::<ListParams>())
        .and(with_actions(actions.clone()))
        .and_then(|kind: CollectionKind, params: ListParams, actions: Actions| async move {
            let view = params.list_view(actions.default_page_size(), actions.max_page_size());
            Ok::<_, warp::Rejection>(reply(actions.list(kind, view).await, StatusCode::OK))
        });

    // 5. GET /api/{collection}/{code}
    let get = warp::path!("api" / CollectionKind / String)
        .and(warp::get())
        .and(with_actions(actions.clone()))
        .and_then(|kind: CollectionKind, code: String, actions: Actions| async move {
            let code = decode_code(code);
            Ok::<_, warp::Rejection>(reply(actions.get(kind, &code).await, StatusCode::OK))
        });

    // 6. POST /api/{collection}
    let create = warp::path!("api" / CollectionKind)
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_actions(actions.clone()))
        .and_then(|kind: CollectionKind, record: Record, actions: Actions| async move {
            Ok::<_, warp::Rejection>(reply(actions.create(kind, record).await, StatusCode::CREATED))
        });

    // 7. PUT /api/{collection}/{code}/status
    let update_status = warp::path!("api" / CollectionKind / String / "status")
        .and(warp::put())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_actions(actions.clone()))
        .and_then(|kind: CollectionKind, code: String, body: StatusBody, actions: Actions| async move {
            let code = decode_code(code);
            let envelope = actions.update_status(kind, &code, &body.status).await;
            Ok::<_, warp::Rejection>(reply(envelope, StatusCode::OK))
        });

    // 8. PUT /api/{collection}/{code}
    let replace = warp::path!("api" / CollectionKind / String)
        .and(warp::put())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_actions(actions.clone()))
        .and_then(|kind: CollectionKind, code: String, record: Record, actions: Actions| async move {
            let code = decode_code(code);
            Ok::<_, warp::Rejection>(reply(actions.replace(kind, &code, record).await, StatusCode::OK))
        });

    // 9. DELETE /api/{collection}/{code}
    let remove = warp::path!("api" / CollectionKind / String)
        .and(warp::delete())
        .and(with_actions(actions))
        .and_then(|kind: CollectionKind, code: String, actions: Actions| async move {
            let code = decode_code(code);
            Ok::<_, warp::Rejection>(reply(actions.remove(kind, &code).await, StatusCode::OK))
        });

    warehouses
        .or(depreciation)
        .or(stats)
        .or(list)
        .or(get)
        .or(create)
        .or(update_status)
        .or(replace)
        .or(remove)
        .recover(handle_rejection)
        .with(warp::trace::request())
}

/// Serves the API on `addr` until `shutdown` resolves.
pub async fn serve<S>(actions: Actions, addr: SocketAddr, shutdown: S) -> Result<(), warp::Error>
where
    S: Future<Output = ()> + Send + 'static,
{
    let (bound, server) = warp::serve(routes(actions)).try_bind_with_graceful_shutdown(addr, shutdown)?;
    info!(addr = %bound, "assetdesk API listening");
    server.await;
    Ok(())
}
