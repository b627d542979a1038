//! Ops REST surface: liveness and a read-only preview of due reminders.

use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
};
use chrono::{Local, NaiveTime};
use homecare_core::{DueReminder, ReminderEvaluator, parse_time_of_day};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

/// Application state shared across REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub evaluator: Arc<ReminderEvaluator>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DueQuery {
    /// Time of day to evaluate, `HH:MM` or `HH:MM:SS`. Defaults to the server's local time.
    pub at: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DueReminderRes {
    pub medication_id: String,
    pub medication_name: String,
    pub patient_id: String,
    pub scheduled: String,
    /// Address the reminder would be sent to; absent when `error` is set.
    pub recipient: Option<String>,
    pub body: Option<String>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct DueRes {
    pub at: String,
    pub tolerance_seconds: i64,
    pub reminders: Vec<DueReminderRes>,
}

impl From<DueReminder> for DueReminderRes {
    fn from(due: DueReminder) -> Self {
        let (recipient, body, error) = match due.delivery {
            Ok(delivery) => (Some(delivery.to), Some(delivery.body), None),
            Err(e) => (None, None, Some(e.to_string())),
        };
        Self {
            medication_id: due.medication_id.to_string(),
            medication_name: due.medication_name.to_string(),
            patient_id: due.patient_id.to_string(),
            scheduled: due.scheduled.to_string(),
            recipient,
            body,
            error,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(health, due_reminders),
    components(schemas(HealthRes, DueRes, DueReminderRes))
)]
struct ApiDoc;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/reminders/due", get(due_reminders))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "homecare is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/reminders/due",
    params(DueQuery),
    responses(
        (status = 200, description = "Reminders due at the given time", body = DueRes),
        (status = 400, description = "Malformed time"),
        (status = 503, description = "Medication store unavailable"),
        (status = 500, description = "Preview task failed")
    )
)]
/// Preview the reminders a pass would send at a time of day.
///
/// Nothing is dispatched. Medications whose patient cannot be resolved are listed with an
/// `error` instead of a recipient.
async fn due_reminders(
    State(state): State<AppState>,
    Query(query): Query<DueQuery>,
) -> Result<Json<DueRes>, (StatusCode, String)> {
    let now: NaiveTime = match query.at {
        Some(at) => {
            parse_time_of_day(&at).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?
        }
        None => Local::now().time(),
    };

    let evaluator = state.evaluator.clone();
    let due = tokio::task::spawn_blocking(move || evaluator.due_at(now))
        .await
        .map_err(|e| {
            tracing::error!("due reminders preview task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .map_err(|e| {
            tracing::error!("due reminders preview failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
        })?;

    Ok(Json(DueRes {
        at: now.format("%H:%M:%S").to_string(),
        tolerance_seconds: state.evaluator.config().tolerance().num_seconds(),
        reminders: due.into_iter().map(DueReminderRes::from).collect(),
    }))
}
