use actix_web::{HttpResponse, Responder, get, web};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::app::services::{ServiceError, SessionQueryHandler, SqliteSessionService};

#[derive(Clone)]
pub struct ApiState {
    pub session_queries: SqliteSessionService,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub id: String,
    pub started_at: Option<String>,
    pub finished_at: String,
    pub duration_ms: i64,
    pub kwh: f64,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DiagnosticsLogQuery {
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSessionSummary {
    pub id: String,
    pub status: String,
    pub started_reason: String,
    pub finished_reason: String,
    pub started_at: Option<String>,
    pub finished_at: String,
    pub duration_ms: i64,
    pub kwh: f64,
    pub error_count_during_session: i64,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsDbResponse {
    pub schema_version: u32,
    pub sessions_count: i64,
    pub log_events_count: i64,
    pub latest_session: Option<DiagnosticsSessionSummary>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsLogEventResponse {
    pub id: String,
    pub created_at: String,
    pub level: String,
    pub code: String,
    pub message: String,
    pub source: String,
    pub station_id: Option<String>,
    pub details_json: Option<String>,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(get_latest_session_endpoint)
        .service(get_recent_session_endpoint)
        .service(list_sessions_endpoint)
        .service(get_db_diagnostics_endpoint)
        .service(list_log_events_diagnostics_endpoint);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/sessions/latest")]
async fn get_latest_session_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.session_queries.get_latest_session() {
        Ok(Some(session)) => HttpResponse::Ok().json(SessionResponse {
            id: session.id,
            started_at: session.started_at,
            finished_at: session.finished_at,
            duration_ms: session.duration_ms,
            kwh: session.energy_kwh,
        }),
        Ok(None) => HttpResponse::NotFound().json(serde_json::json!({
            "error": "no sessions available"
        })),
        Err(error) => service_error_response(error),
    }
}

#[get("/sessions")]
async fn list_sessions_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<ListQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let offset = query.offset.unwrap_or(0);

    match state.session_queries.list_sessions(limit, offset) {
        Ok(sessions) => {
            let mapped: Vec<SessionResponse> = sessions
                .into_iter()
                .map(|session| SessionResponse {
                    id: session.id,
                    started_at: session.started_at,
                    finished_at: session.finished_at,
                    duration_ms: session.duration_ms,
                    kwh: session.energy_kwh,
                })
                .collect();

            HttpResponse::Ok().json(mapped)
        }
        Err(error) => service_error_response(error),
    }
}

#[get("/sessions/recent")]
async fn get_recent_session_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let threshold =
        (Utc::now() - chrono::Duration::minutes(5)).to_rfc3339_opts(SecondsFormat::Millis, true);

    match state.session_queries.get_latest_session_since(&threshold) {
        Ok(Some(session)) => HttpResponse::Ok().json(SessionResponse {
            id: session.id,
            started_at: session.started_at,
            finished_at: session.finished_at,
            duration_ms: session.duration_ms,
            kwh: session.energy_kwh,
        }),
        Ok(None) => HttpResponse::NoContent().finish(),
        Err(error) => service_error_response(error),
    }
}

#[get("/diagnostics/db")]
async fn get_db_diagnostics_endpoint(state: web::Data<ApiState>) -> impl Responder {
    let schema_version = match state.session_queries.get_schema_version() {
        Ok(value) => value,
        Err(error) => return service_error_response(error),
    };
    let sessions_count = match state.session_queries.count_sessions() {
        Ok(value) => value,
        Err(error) => return service_error_response(error),
    };
    let log_events_count = match state.session_queries.count_log_events() {
        Ok(value) => value,
        Err(error) => return service_error_response(error),
    };
    let latest_session = match state.session_queries.get_latest_session() {
        Ok(value) => value,
        Err(error) => return service_error_response(error),
    };

    let latest_session = latest_session.map(|session| DiagnosticsSessionSummary {
        id: session.id,
        status: session.status,
        started_reason: session.started_reason,
        finished_reason: session.finished_reason,
        started_at: session.started_at,
        finished_at: session.finished_at,
        duration_ms: session.duration_ms,
        kwh: session.energy_kwh,
        error_count_during_session: session.error_count_during_session,
    });

    HttpResponse::Ok().json(DiagnosticsDbResponse {
        schema_version,
        sessions_count,
        log_events_count,
        latest_session,
    })
}

#[get("/diagnostics/log-events")]
async fn list_log_events_diagnostics_endpoint(
    state: web::Data<ApiState>,
    query: web::Query<DiagnosticsLogQuery>,
) -> impl Responder {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    match state.session_queries.list_recent_log_events(limit) {
        Ok(events) => {
            let mapped: Vec<DiagnosticsLogEventResponse> = events
                .into_iter()
                .map(|event| DiagnosticsLogEventResponse {
                    id: event.id,
                    created_at: event.created_at,
                    level: event.level,
                    code: event.code,
                    message: event.message,
                    source: event.source,
                    station_id: event.station_id,
                    details_json: event.details_json,
                })
                .collect();
            HttpResponse::Ok().json(mapped)
        }
        Err(error) => service_error_response(error),
    }
}

fn service_error_response(error: ServiceError) -> HttpResponse {
    match error {
        ServiceError::DbLockPoisoned => {
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "database lock poisoned"
            }))
        }
        ServiceError::Database(error) => {
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": format!("database query failed: {error}")
            }))
        }
    }
}
