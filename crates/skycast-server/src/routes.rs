//! HTTP surface: a thin axum layer over the stores, the provider client,
//! and the sync engine. Handlers translate wire shapes; all domain rules
//! live below this layer.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::json;

use skycast_provider::{ProviderError, WeatherClient};
use skycast_store::{LocationStore, LocationUpdate, SnapshotStore, StoreError};
use skycast_sync::{SyncEngine, SyncError};

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<SyncEngine>,
    pub locations: LocationStore,
    pub snapshots: SnapshotStore,
    pub client: Arc<WeatherClient>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/locations", get(list_locations).post(create_location))
        .route("/api/locations/search", get(search_locations))
        .route(
            "/api/locations/{id}",
            get(get_location).put(update_location).delete(delete_location),
        )
        .route("/api/locations/{id}/weather", get(get_weather))
        .route("/api/locations/{id}/weather/history", get(get_history))
        .route("/api/locations/{id}/weather/refresh", post(refresh_weather))
        .route("/api/locations/{id}/forecast", get(get_forecast))
        .route("/api/weather/city", get(weather_by_city))
        .route("/api/forecast/city", get(forecast_by_city))
        .fallback(route_not_found)
        .with_state(state)
}

/// Wire-level error: every failure leaves this layer as
/// `{success: false, error, type?}` with a matching status.
pub struct ApiError {
    status: StatusCode,
    message: String,
    kind: Option<&'static str>,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>, kind: &'static str) -> Self {
        Self {
            status,
            message: message.into(),
            kind: Some(kind),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "validation")
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, "not_found")
    }

    fn from_kind(status_code: u16, message: String, kind: &'static str) -> Self {
        let status =
            StatusCode::from_u16(status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, message, kind)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!("Request failed: {}", self.message);
        }
        let mut body = json!({ "success": false, "error": self.message });
        if let Some(kind) = self.kind {
            body["type"] = kind.into();
        }
        (self.status, Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::from_kind(err.status_code(), err.to_string(), err.kind())
    }
}

impl From<ProviderError> for ApiError {
    fn from(err: ProviderError) -> Self {
        Self::from_kind(err.status_code(), err.to_string(), err.kind())
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        Self::from_kind(err.status_code(), err.to_string(), err.kind())
    }
}

fn ok_data<T: serde::Serialize>(data: T) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "data": data }))
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now(),
        "syncService": state.engine.stats(),
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    is_active: Option<bool>,
}

async fn list_locations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let locations = state.locations.find_all(query.is_active)?;
    Ok(Json(json!({
        "success": true,
        "count": locations.len(),
        "data": locations,
    })))
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search_locations(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let q = query
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Search query is required"))?;
    Ok(ok_data(state.locations.search(&q)?))
}

async fn get_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let location = state
        .locations
        .find_by_id(id)?
        .ok_or_else(|| ApiError::not_found("Location not found"))?;
    Ok(ok_data(location))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateLocationBody {
    name: String,
    country: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    timezone: Option<String>,
}

/// Register a location. When coordinates are omitted the name (plus an
/// optional country hint) is geocoded; an unresolvable city is a 404.
async fn create_location(
    State(state): State<AppState>,
    Json(body): Json<CreateLocationBody>,
) -> Result<impl IntoResponse, ApiError> {
    let new = match (body.latitude, body.longitude) {
        (Some(latitude), Some(longitude)) => skycast_store::NewLocation {
            name: body.name,
            country: body.country.unwrap_or_default(),
            latitude,
            longitude,
            timezone: body.timezone,
        },
        _ => {
            let city = state
                .client
                .geocode_city(&body.name, body.country.as_deref())
                .await?;
            skycast_store::NewLocation {
                name: body.name,
                country: city.country,
                latitude: city.latitude,
                longitude: city.longitude,
                timezone: body.timezone,
            }
        }
    };

    let location = state.locations.create(new)?;
    Ok((StatusCode::CREATED, ok_data(location)))
}

async fn update_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(update): Json<LocationUpdate>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let location = state
        .locations
        .update(id, update)?
        .ok_or_else(|| ApiError::not_found("Location not found"))?;
    Ok(ok_data(location))
}

async fn delete_location(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.locations.delete(id)? {
        return Err(ApiError::not_found("Location not found"));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Location deleted successfully",
    })))
}

/// Location plus its latest reading. A location that has never been
/// synced is not an error; its `weather` field is simply null.
async fn get_weather(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let location = state
        .locations
        .find_by_id(id)?
        .ok_or_else(|| ApiError::not_found("Location not found"))?;

    let snapshot = state.snapshots.latest(id)?;
    Ok(Json(json!({
        "success": true,
        "data": { "location": location, "weather": snapshot },
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (Some(start_raw), Some(end_raw)) = (query.start_date, query.end_date) else {
        return Err(ApiError::bad_request("startDate and endDate are required"));
    };

    state
        .locations
        .find_by_id(id)?
        .ok_or_else(|| ApiError::not_found("Location not found"))?;

    let start = parse_date(&start_raw)?;
    let end = parse_date(&end_raw)?;
    let history = state.snapshots.history(id, start, end)?;
    Ok(Json(json!({
        "success": true,
        "count": history.len(),
        "data": history,
    })))
}

/// RFC3339 timestamp or a plain `YYYY-MM-DD` date (start of day UTC).
fn parse_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDate>()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| ApiError::bad_request(format!("Invalid date: '{}'", raw)))
}

async fn refresh_weather(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let snapshot = state.engine.sync_single_location(id).await?;
    Ok(ok_data(snapshot))
}

async fn get_forecast(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let location = state
        .locations
        .find_by_id(id)?
        .ok_or_else(|| ApiError::not_found("Location not found"))?;

    let forecast = state
        .client
        .fetch_forecast_by_coords(location.latitude, location.longitude)
        .await?;
    Ok(ok_data(forecast))
}

#[derive(Deserialize)]
struct CityQuery {
    city: Option<String>,
    country: Option<String>,
}

impl CityQuery {
    fn city(self) -> Result<(String, Option<String>), ApiError> {
        let city = self
            .city
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| ApiError::bad_request("City parameter is required"))?;
        Ok((city, self.country))
    }
}

async fn weather_by_city(
    State(state): State<AppState>,
    Query(query): Query<CityQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (city, country) = query.city()?;
    let weather = state
        .client
        .fetch_current_by_city(&city, country.as_deref())
        .await?;
    Ok(ok_data(weather))
}

async fn forecast_by_city(
    State(state): State<AppState>,
    Query(query): Query<CityQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let (city, country) = query.city()?;
    let forecast = state
        .client
        .fetch_forecast_by_city(&city, country.as_deref())
        .await?;
    Ok(ok_data(forecast))
}

async fn route_not_found() -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        message: "Route not found".to_string(),
        kind: None,
    }
}
