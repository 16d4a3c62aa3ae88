//! HTTP request handlers for the API endpoints.

use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{HttpResponse, web};
use chrono::Local;
use duckdb::Connection;
use securecheck_analytics::filter::parse_date;
use securecheck_analytics::{AnalyticsError, FilterPredicate, PanelCache, exec, export};
use securecheck_analytics_models::{DateRange, PanelId, PanelInfo, PanelResult};
use securecheck_server_models::{ApiDashboard, ApiError, ApiHealth, FilterQueryParams};

use crate::{AppState, DuckDbPool};

/// Health check endpoint.
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Resolves the query string into a date range and predicate.
fn resolve(params: &FilterQueryParams) -> Result<(DateRange, FilterPredicate), AnalyticsError> {
    let date = |value: Option<&String>| {
        value
            .filter(|s| !s.trim().is_empty())
            .map(|s| parse_date(s))
            .transpose()
    };

    let range = DateRange::from_parts(
        date(params.from.as_ref())?,
        date(params.to.as_ref())?,
        Local::now().date_naive(),
    );
    let predicate = FilterPredicate::build(&params.selection(), &range);

    Ok((range, predicate))
}

fn parse_panel_id(id: &str) -> Result<PanelId, AnalyticsError> {
    id.parse().map_err(|_| AnalyticsError::UnknownPanel { id: id.to_string() })
}

fn error_response(e: &AnalyticsError) -> HttpResponse {
    match e {
        AnalyticsError::InvalidDate { .. } => {
            HttpResponse::BadRequest().json(ApiError::new(e.to_string()))
        }
        AnalyticsError::UnknownPanel { .. } => {
            HttpResponse::NotFound().json(ApiError::new(e.to_string()))
        }
        AnalyticsError::Database(_) | AnalyticsError::Csv(_) => {
            log::error!("Query failed: {e}");
            HttpResponse::InternalServerError().json(ApiError::new("Query failed"))
        }
    }
}

/// Runs `f` against the pool on the blocking thread pool. `f` acquires a
/// connection for each query it runs.
async fn with_pool<T, F>(state: &web::Data<AppState>, f: F) -> Result<T, HttpResponse>
where
    F: FnOnce(&DuckDbPool, &str) -> Result<T, AnalyticsError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = web::block(move || f(&state.pool, &state.table)).await;

    match result {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(error_response(&e)),
        Err(e) => {
            log::error!("Blocking task failed: {e}");
            Err(HttpResponse::InternalServerError().json(ApiError::new("Internal error")))
        }
    }
}

/// Runs a single query on one pooled connection.
async fn with_connection<T, F>(state: &web::Data<AppState>, f: F) -> Result<T, HttpResponse>
where
    F: FnOnce(&Connection, &str) -> Result<T, AnalyticsError> + Send + 'static,
    T: Send + 'static,
{
    with_pool(state, move |pool, table| f(&pool.acquire(), table)).await
}

/// Returns the option lists for the five filter dimensions.
pub async fn filters(state: web::Data<AppState>) -> HttpResponse {
    match with_connection(&state, exec::filter_options).await {
        Ok(options) => HttpResponse::Ok().json(options),
        Err(response) => response,
    }
}

/// Returns the headline metrics under the requested filters.
pub async fn metrics(
    state: web::Data<AppState>,
    query: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let predicate = match resolve(&query) {
        Ok((_, predicate)) => predicate,
        Err(e) => return error_response(&e),
    };

    match with_connection(&state, move |conn, table| {
        exec::headline_metrics(conn, table, &predicate)
    })
    .await
    {
        Ok(metrics) => HttpResponse::Ok().json(metrics),
        Err(response) => response,
    }
}

/// Lists the panel catalog.
pub async fn panel_catalog() -> HttpResponse {
    let panels: Vec<PanelInfo> = PanelId::all().iter().copied().map(PanelInfo::from).collect();
    HttpResponse::Ok().json(panels)
}

/// Returns every panel under the requested filters.
pub async fn all_panels(
    state: web::Data<AppState>,
    query: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let predicate = match resolve(&query) {
        Ok((_, predicate)) => predicate,
        Err(e) => return error_response(&e),
    };

    match with_pool(&state, move |pool, table| {
        exec::run_all(|| pool.acquire(), table, &predicate)
    })
    .await
    {
        Ok(panels) => HttpResponse::Ok().json(panels),
        Err(response) => response,
    }
}

/// Returns the metrics and every panel for one dashboard render.
pub async fn dashboard(
    state: web::Data<AppState>,
    query: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let (range, predicate) = match resolve(&query) {
        Ok(resolved) => resolved,
        Err(e) => return error_response(&e),
    };

    match with_pool(&state, move |pool, table| {
        let metrics = exec::headline_metrics(&pool.acquire(), table, &predicate)?;
        let mut cache = PanelCache::new();
        let panels = exec::run_panels(
            || pool.acquire(),
            table,
            &predicate,
            PanelId::all(),
            &mut cache,
        )?;
        log::debug!(
            "Dashboard ran {} distinct panels ({} cache hits)",
            cache.len(),
            cache.hits()
        );
        Ok(ApiDashboard {
            from: range.start().to_string(),
            to: range.end().to_string(),
            metrics,
            panels,
        })
    })
    .await
    {
        Ok(dashboard) => HttpResponse::Ok().json(dashboard),
        Err(response) => response,
    }
}

/// Returns one panel's table as JSON.
pub async fn panel(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let resolved = parse_panel_id(&path).and_then(|id| Ok((id, resolve(&query)?.1)));
    let (id, predicate) = match resolved {
        Ok(resolved) => resolved,
        Err(e) => return error_response(&e),
    };

    match with_connection(&state, move |conn, table| {
        exec::run_panel(conn, table, &predicate, id)
    })
    .await
    {
        Ok(table) => HttpResponse::Ok().json(PanelResult::new(id, table)),
        Err(response) => response,
    }
}

/// Returns one panel's table as a CSV attachment.
pub async fn panel_csv(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<FilterQueryParams>,
) -> HttpResponse {
    let resolved = parse_panel_id(&path).and_then(|id| Ok((id, resolve(&query)?.1)));
    let (id, predicate) = match resolved {
        Ok(resolved) => resolved,
        Err(e) => return error_response(&e),
    };

    match with_connection(&state, move |conn, table| {
        let result = exec::run_panel(conn, table, &predicate, id)?;
        export::to_csv(&result)
    })
    .await
    {
        Ok(body) => HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header(ContentDisposition {
                disposition: DispositionType::Attachment,
                parameters: vec![DispositionParam::Filename(id.csv_file_name())],
            })
            .body(body),
        Err(response) => response,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;

    use actix_web::http::StatusCode;
    use actix_web::http::header::CONTENT_DISPOSITION;
    use actix_web::{App, test};
    use chrono::{NaiveDate, NaiveTime};
    use securecheck_database::{schema, stops};
    use securecheck_stop_models::{StopColumn, TrafficStopRecord};
    use serde_json::Value;

    use crate::{AppState, DuckDbPool, configure};

    const TABLE: &str = "traffic_stops";

    #[allow(clippy::too_many_arguments)]
    fn stop(
        date: (i32, u32, u32),
        hour: u32,
        country: &str,
        gender: &str,
        violation: &str,
        arrested: i32,
        drugs: i32,
        vehicle: &str,
    ) -> TrafficStopRecord {
        TrafficStopRecord {
            stop_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2),
            stop_time: NaiveTime::from_hms_opt(hour, 0, 0),
            country_name: Some(country.to_string()),
            driver_gender: Some(gender.to_string()),
            driver_age: Some(30),
            driver_race: Some("Asian".to_string()),
            violation: Some(violation.to_string()),
            search_conducted: Some(0),
            search_type: Some("Frisk".to_string()),
            stop_outcome: Some("Warning".to_string()),
            is_arrested: Some(arrested),
            stop_duration: Some("0-15 Min".to_string()),
            drugs_related_stop: Some(drugs),
            vehicle_number: Some(vehicle.to_string()),
            ..TrafficStopRecord::default()
        }
    }

    fn state(table: &str) -> actix_web::web::Data<AppState> {
        let mut conn = duckdb::Connection::open_in_memory().unwrap();
        schema::create_table_if_not_exists(&conn, TABLE, StopColumn::all()).unwrap();
        let records = vec![
            stop((2021, 3, 1), 10, "India", "Male", "Speeding", 1, 1, "V1"),
            stop((2021, 3, 2), 23, "USA", "Female", "Signal", 0, 0, "V2"),
            stop((2022, 1, 1), 8, "Canada", "Male", "Speeding", 0, 0, "V1"),
        ];
        stops::insert_records(&mut conn, TABLE, StopColumn::all(), &records, |_| {}).unwrap();

        actix_web::web::Data::new(AppState {
            pool: Arc::new(DuckDbPool::from_connection(conn, 2).unwrap()),
            table: table.to_string(),
        })
    }

    async fn get(state: actix_web::web::Data<AppState>, uri: &str) -> (StatusCode, Value) {
        let app = test::init_service(App::new().app_data(state).configure(configure)).await;
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }

    #[actix_web::test]
    async fn health_reports_version() {
        let (status, body) = get(state(TABLE), "/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthy"], true);
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    }

    #[actix_web::test]
    async fn catalog_lists_every_panel() {
        let (status, body) = get(state(TABLE), "/api/panels").await;
        assert_eq!(status, StatusCode::OK);
        let panels = body.as_array().unwrap();
        assert_eq!(panels.len(), 19);
        assert_eq!(panels[0]["id"], "drug_stops_by_vehicle");
        assert_eq!(panels[0]["csvFileName"], "drug_stops.csv");
    }

    #[actix_web::test]
    async fn metrics_follow_date_range_and_filters() {
        let (status, body) = get(state(TABLE), "/api/metrics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalLogs"], 3);
        assert_eq!(body["totalViolations"], 3);

        let (_, body) = get(state(TABLE), "/api/metrics?from=2021-01-01&to=2021-12-31").await;
        assert_eq!(body["totalLogs"], 2);

        let (_, body) = get(state(TABLE), "/api/metrics?vehicles=V1,&genders=Male").await;
        assert_eq!(body["totalLogs"], 2);
    }

    #[actix_web::test]
    async fn single_date_selects_one_day() {
        let (_, body) = get(state(TABLE), "/api/dashboard?from=2021-03-02").await;
        assert_eq!(body["from"], "2021-03-02");
        assert_eq!(body["to"], "2021-03-02");
        assert_eq!(body["metrics"]["totalLogs"], 1);
        assert_eq!(body["panels"].as_array().unwrap().len(), 19);
    }

    #[actix_web::test]
    async fn malformed_date_is_a_bad_request() {
        let (status, body) = get(state(TABLE), "/api/metrics?from=03/01/2021").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("YYYY-MM-DD"));
    }

    #[actix_web::test]
    async fn unknown_panel_is_not_found() {
        let (status, body) = get(state(TABLE), "/api/panels/no_such_panel").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("no_such_panel"));
    }

    #[actix_web::test]
    async fn panel_returns_table_with_metadata() {
        let (status, body) = get(state(TABLE), "/api/panels/drug_stops_by_vehicle").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], "drug_stops_by_vehicle");
        assert_eq!(
            body["table"]["columns"],
            serde_json::json!(["vehicle_number", "drug_stop_count"])
        );
        assert_eq!(body["table"]["rows"], serde_json::json!([["V1", 1]]));
    }

    #[actix_web::test]
    async fn dashboard_acquires_a_connection_per_query() {
        let state = state(TABLE);
        let (status, _) = get(state.clone(), "/api/dashboard").await;
        assert_eq!(status, StatusCode::OK);
        // One metrics query plus one per panel.
        assert_eq!(state.pool.next.load(Ordering::Relaxed), 20);

        let (status, _) = get(state.clone(), "/api/panels/all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.pool.next.load(Ordering::Relaxed), 39);
    }

    #[actix_web::test]
    async fn panels_carry_tab_label_and_highlight() {
        let (status, body) = get(state(TABLE), "/api/panels/arrest_rate_by_time_period").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tabLabel"], "Time & Duration");
        assert_eq!(body["highlight"]["heading"], "Highest Arrest Rate");
        assert_eq!(body["highlight"]["subject"], "Daytime (6 AM-7 PM)");

        let (_, body) = get(state(TABLE), "/api/panels/stops_by_hour").await;
        assert!(body.get("highlight").is_none());
    }

    #[actix_web::test]
    async fn all_panels_is_not_taken_for_a_panel_id() {
        let (status, body) = get(state(TABLE), "/api/panels/all").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 19);
    }

    #[actix_web::test]
    async fn empty_window_gives_empty_tables() {
        let (status, body) = get(
            state(TABLE),
            "/api/panels/gender_by_country?from=2020-01-01&to=2020-01-31",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["table"]["rows"], serde_json::json!([]));
    }

    #[actix_web::test]
    async fn filters_list_distinct_values() {
        let (status, body) = get(state(TABLE), "/api/filters").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["vehicles"], serde_json::json!(["V1", "V2"]));
        assert_eq!(body["countries"], serde_json::json!(["Canada", "India", "USA"]));
    }

    #[actix_web::test]
    async fn published_gender_options_select_stored_rows() {
        let (_, options) = get(state(TABLE), "/api/filters").await;
        let first = options["genders"][0].as_str().unwrap().to_string();
        assert_eq!(first, "Male");

        let (status, body) = get(state(TABLE), &format!("/api/metrics?genders={first}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["totalLogs"], 2);
    }

    #[actix_web::test]
    async fn csv_download_is_an_attachment() {
        let app = test::init_service(App::new().app_data(state(TABLE)).configure(configure)).await;
        let req = test::TestRequest::get()
            .uri("/api/panels/searches_by_vehicle/csv")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let disposition = resp
            .headers()
            .get(CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains("frequent_searches.csv"));

        // No stop in the fixture had a search, so only the header remains.
        let body = test::read_body(resp).await;
        assert_eq!(&body[..], b"vehicle_number,search_count\n");
    }

    #[actix_web::test]
    async fn database_failure_is_a_server_error() {
        let (status, body) = get(state("missing_table"), "/api/metrics").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Query failed");
    }
}
