//! HTTP routes for location search, archive reports and CSV downloads

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Form, Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, instrument};

use crate::api::WeatherSource;
use crate::config::{ArchiveConfig, ServerConfig};
use crate::export;
use crate::forms::{DateRangeForm, DateRules, LocationForm, LocationQuery};
use crate::location_resolver::LocationResolver;
use crate::models::{Granularity, Location};
use crate::report::WeatherReport;
use crate::ArchiveError;

const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub source: Arc<dyn WeatherSource>,
    pub date_rules: DateRules,
    pub z_threshold: f64,
}

impl AppState {
    pub fn new(source: Arc<dyn WeatherSource>, config: &ArchiveConfig) -> Self {
        Self {
            source,
            date_rules: config.forms.date_rules(),
            z_threshold: config.analysis.z_threshold,
        }
    }
}

/// Resolved location returned by the search form
#[derive(Debug, Serialize)]
pub struct LocationSearchResponse {
    pub query: LocationQuery,
    pub display_name: String,
    pub location: Location,
}

pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(daily_data))
        .route("/download/", get(download_daily_csv))
        .route("/hourly/", get(hourly_data))
        .route("/hourly/download/", get(download_hourly_csv))
        .route("/location", post(location_search))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

pub async fn run(config: &ServerConfig, state: AppState) -> anyhow::Result<()> {
    let app = router(
        state,
        Duration::from_secs(config.request_timeout_seconds.into()),
    );

    let addr = tokio::net::lookup_host((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to resolve bind address {}", config.host))?
        .next()
        .with_context(|| format!("No address found for {}", config.host))?;

    match (&config.tls_cert_path, &config.tls_key_path) {
        #[cfg(feature = "tls")]
        (Some(cert), Some(key)) => {
            let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
                .await
                .with_context(|| "Failed to load TLS certificate or key")?;
            info!("Web server running at https://{}", addr);
            axum_server::bind_rustls(addr, tls)
                .serve(app.into_make_service())
                .await?;
        }
        #[cfg(not(feature = "tls"))]
        (Some(_), Some(_)) => {
            anyhow::bail!("TLS is configured but the `tls` feature is disabled");
        }
        _ => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!("Web server running at http://{}", addr);
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}

#[instrument(skip(state))]
async fn location_search(
    State(state): State<AppState>,
    Form(form): Form<LocationForm>,
) -> Result<Json<LocationSearchResponse>, ArchiveError> {
    let query = form.validate()?;
    let location = LocationResolver::resolve_location(state.source.as_ref(), &query).await?;
    Ok(Json(LocationSearchResponse {
        query,
        display_name: location.display_name(),
        location,
    }))
}

async fn daily_data(
    State(state): State<AppState>,
    Query(form): Query<DateRangeForm>,
) -> Result<Json<WeatherReport>, ArchiveError> {
    build_report(&state, &form, Granularity::Daily).await.map(Json)
}

async fn hourly_data(
    State(state): State<AppState>,
    Query(form): Query<DateRangeForm>,
) -> Result<Json<WeatherReport>, ArchiveError> {
    build_report(&state, &form, Granularity::Hourly).await.map(Json)
}

async fn download_daily_csv(
    State(state): State<AppState>,
    Query(form): Query<DateRangeForm>,
) -> Result<Response, ArchiveError> {
    csv_download(&state, &form, Granularity::Daily).await
}

async fn download_hourly_csv(
    State(state): State<AppState>,
    Query(form): Query<DateRangeForm>,
) -> Result<Response, ArchiveError> {
    csv_download(&state, &form, Granularity::Hourly).await
}

#[instrument(skip(state))]
async fn build_report(
    state: &AppState,
    form: &DateRangeForm,
    granularity: Granularity,
) -> Result<WeatherReport, ArchiveError> {
    let request = form.validate(granularity, &state.date_rules)?;
    WeatherReport::build(state.source.as_ref(), request, state.z_threshold).await
}

async fn csv_download(
    state: &AppState,
    form: &DateRangeForm,
    granularity: Granularity,
) -> Result<Response, ArchiveError> {
    let report = build_report(state, form, granularity).await?;
    let body = export::to_csv(&report.observations)?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::filename(&report.request)
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}

impl IntoResponse for ArchiveError {
    fn into_response(self) -> Response {
        if let ArchiveError::Validation(errors) = &self {
            debug!("Rejected input: {}", errors);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "errors": errors })),
            )
                .into_response();
        }

        let status = match &self {
            ArchiveError::LocationNotFound { .. } => StatusCode::NOT_FOUND,
            ArchiveError::Api { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            debug!("Request failed: {}", self);
        }

        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}
