use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::UrbanSiteError;
use crate::autocomplete::DEFAULT_LIMIT;
use crate::config::SearchConfig;
use crate::geodata::PlaceSuggestion;
use crate::location_resolver::LocationInput;
use crate::models::{InfraType, Recommendation};
use crate::service::{RecommendRequest, SiteService};

/// Shared state of the API handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<SiteService>,
    pub default_infra: String,
    pub default_radius_m: u32,
}

impl AppState {
    #[must_use]
    pub fn new(service: Arc<SiteService>, search: &SearchConfig) -> Self {
        Self {
            service,
            default_infra: search.default_infra.clone(),
            default_radius_m: search.default_radius_m,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecommendParams {
    pub place: Option<String>,
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub infra: Option<String>,
    pub radius: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AutocompleteParams {
    pub q: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Serialize, Deserialize)]
pub struct AutocompleteResponse {
    pub results: Vec<PlaceSuggestion>,
}

/// Error body returned by the API
pub struct ApiError(UrbanSiteError);

impl From<UrbanSiteError> for ApiError {
    fn from(err: UrbanSiteError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            UrbanSiteError::PlaceNotFound { .. } => StatusCode::NOT_FOUND,
            UrbanSiteError::Validation { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(json!({ "error": self.0.user_message() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/recommend", get(recommend))
        .route("/autocomplete", get(autocomplete))
        .route("/clear-cache", post(clear_cache))
        .with_state(state)
}

async fn recommend(
    State(state): State<AppState>,
    Query(params): Query<RecommendParams>,
) -> Result<Json<Recommendation>, ApiError> {
    let location = LocationInput::from_query(
        params.place.as_deref(),
        params.lat.as_deref(),
        params.lon.as_deref(),
    )?;
    let infra = InfraType::parse(params.infra.as_deref().unwrap_or(&state.default_infra));
    let radius_m = params.radius.unwrap_or(state.default_radius_m);

    let request = RecommendRequest::new(location, infra, radius_m)?;
    let recommendation = state.service.recommend(request).await?;
    Ok(Json(recommendation))
}

async fn autocomplete(
    State(state): State<AppState>,
    Query(params): Query<AutocompleteParams>,
) -> Json<AutocompleteResponse> {
    let query = params.q.unwrap_or_default();
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 20);
    let results = state.service.autocomplete(&query, limit).await;
    Json(AutocompleteResponse { results })
}

async fn clear_cache(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.service.clear_cache().await?;
    Ok(Json(json!({ "message": "Cache cleared successfully" })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_error_status_mapping() {
        let cases = [
            (UrbanSiteError::place_not_found("Atlantis"), StatusCode::NOT_FOUND),
            (UrbanSiteError::validation("bad"), StatusCode::BAD_REQUEST),
            (UrbanSiteError::cache("locked"), StatusCode::INTERNAL_SERVER_ERROR),
            (UrbanSiteError::config("bad port"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[tokio::test]
    async fn test_place_not_found_body() {
        let response = ApiError::from(UrbanSiteError::place_not_found("Atlantis")).into_response();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Place not found" }));
    }

    #[test]
    fn test_params_deserialize() {
        let request = Request::builder()
            .uri("/recommend?place=Hebbal&infra=school&radius=1500")
            .body(Body::empty())
            .unwrap();
        let Query(params): Query<RecommendParams> = Query::try_from_uri(request.uri()).unwrap();
        assert_eq!(params.place.as_deref(), Some("Hebbal"));
        assert_eq!(params.infra.as_deref(), Some("school"));
        assert_eq!(params.radius, Some(1500));
        assert!(params.lat.is_none());
    }
}
