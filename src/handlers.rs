use crate::errors::AppError;
use crate::metrics::{
    PERFORMANCE_LEADERS, build_dashboard, derive_cities, filter_cities, performance, summarize,
    visible_cities,
};
use crate::models::{
    CitiesResponse, CityFilter, DashboardFilters, DashboardQuery, DashboardResponse,
    DashboardSummary, ElectorateBucket, PerformanceSummary, YearSelection,
};
use crate::state::AppState;
use crate::ui::{render_dashboard, render_unavailable};
use axum::{
    Json,
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};

pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let filters = parse_filters(query)?;
    let response = match state.dataset().await {
        Ok(dataset) => {
            let dashboard = build_dashboard(&dataset.records, &filters, &dataset.loaded_at);
            Html(render_dashboard(&dashboard)).into_response()
        }
        Err(err) => (err.status, Html(render_unavailable())).into_response(),
    };
    Ok(response)
}

pub async fn get_dashboard(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, AppError> {
    let filters = parse_filters(query)?;
    let dataset = state.dataset().await?;
    Ok(Json(build_dashboard(
        &dataset.records,
        &filters,
        &dataset.loaded_at,
    )))
}

pub async fn get_cities(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<CitiesResponse>, AppError> {
    let filters = parse_filters(query)?;
    let dataset = state.dataset().await?;
    let cities = derive_cities(visible_cities(&dataset.records, &filters));
    Ok(Json(CitiesResponse {
        count: cities.len(),
        cities,
    }))
}

pub async fn get_summary(State(state): State<AppState>) -> Result<Json<DashboardSummary>, AppError> {
    let dataset = state.dataset().await?;
    Ok(Json(summarize(&dataset.records)))
}

pub async fn get_performance(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<PerformanceSummary>, AppError> {
    let filters = parse_filters(query)?;
    let dataset = state.dataset().await?;
    let filtered = filter_cities(&dataset.records, &filters.city);
    Ok(Json(performance(&filtered, &filters.years, PERFORMANCE_LEADERS)))
}

pub async fn health() -> &'static str {
    "ok"
}

/// Absent parameters mean "no filter"; `years=` with no value is an empty selection.
fn parse_filters(query: DashboardQuery) -> Result<DashboardFilters, AppError> {
    let bucket = match query.bucket.as_deref().map(str::trim) {
        None | Some("") => ElectorateBucket::All,
        Some(value) => value.parse().map_err(AppError::bad_request)?,
    };
    let years = match query.years.as_deref() {
        None => YearSelection::all(),
        Some(value) => value.parse().map_err(AppError::bad_request)?,
    };

    Ok(DashboardFilters {
        city: CityFilter {
            query: query.q.unwrap_or_default(),
            bucket,
        },
        years,
    })
}
