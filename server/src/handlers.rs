use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use common::{BudgetContext, Granularity, PeriodKey, ReportFormat, ReportRequest};
use report::{build_report, AnalysisConfig, ReportError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::service::CostQuery;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn CostQuery>,
    pub analysis: Arc<AnalysisConfig>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetBody {
    pub threshold: f64,
    #[serde(default)]
    pub breach_date: Option<chrono::NaiveDate>,
    #[serde(default)]
    pub baseline: Option<PeriodKey>,
    #[serde(default)]
    pub current: Option<PeriodKey>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportBody {
    pub client_name: String,
    pub months: Vec<PeriodKey>,
    #[serde(default)]
    pub format: Option<ReportFormat>,
    #[serde(default)]
    pub granularity: Option<Granularity>,
    #[serde(default)]
    pub budget: Option<BudgetBody>,
}

#[derive(Serialize)]
pub struct ReportResponse {
    pub file: String,
    pub filename: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn report_error_response(err: &ReportError) -> Response {
    let status = match err {
        ReportError::InvalidRequest(_) | ReportError::MalformedInput(_) => StatusCode::BAD_REQUEST,
        ReportError::Render { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, err.to_string())
}

/// Months arrive in any order; the pipeline wants them ascending.
fn parse_request(body: CreateReportBody) -> ReportRequest {
    let mut periods = body.months;
    periods.sort();
    ReportRequest {
        client: body.client_name,
        periods,
        granularity: body.granularity.unwrap_or_default(),
        format: body.format.unwrap_or(ReportFormat::Spreadsheet),
        budget: body.budget.map(|b| BudgetContext {
            threshold: b.threshold,
            breach_date: b.breach_date,
            baseline: b.baseline,
            current: b.current,
        }),
    }
}

pub async fn healthz() -> &'static str {
    "ok"
}

pub async fn create_report(
    State(state): State<AppState>,
    Json(body): Json<CreateReportBody>,
) -> Response {
    let request = parse_request(body);

    if let Err(err) = report::validate_request(&request) {
        return report_error_response(&err);
    }

    let data = match state.service.fetch(&request.periods).await {
        Ok(data) => data,
        Err(err) => {
            log::error!("cost data fetch failed: {err:#}");
            return error_response(StatusCode::BAD_GATEWAY, "cost data fetch failed");
        }
    };

    match build_report(&request, &data, &state.analysis, Utc::now()) {
        Ok(artifact) => {
            log::info!(
                "built {} ({} bytes) for {}",
                artifact.filename,
                artifact.bytes.len(),
                request.client
            );
            Json(ReportResponse {
                file: STANDARD.encode(&artifact.bytes),
                filename: artifact.filename,
            })
            .into_response()
        }
        Err(err) => {
            log::error!("report build failed: {err}");
            report_error_response(&err)
        }
    }
}
