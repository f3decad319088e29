//! The billing REST surface: tenant-scoped usage/export/budget
//! endpoints. Every handler 403s a path `tenantId` that doesn't match the
//! authenticated tenant before touching `BillingMeter`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use pf_billing::BillingMeter;
use pf_core::{Clock, SystemClock};

use crate::error::ApiError;
use crate::state::AppState;
use crate::tenant::{require_matching_tenant, AuthenticatedTenant};

#[derive(Debug, Serialize)]
struct UsageRowJson {
    date: String,
    model: String,
    input_tokens: i64,
    output_tokens: i64,
    cost_usd: f64,
    job_count: i64,
}

#[derive(Debug, Serialize)]
struct UsageResponse {
    #[serde(rename = "tenantId")]
    tenant_id: String,
    #[serde(rename = "totalSpend")]
    total_spend: f64,
    #[serde(rename = "budgetLimit")]
    budget_limit: Option<f64>,
    rows: Vec<UsageRowJson>,
}

/// `GET /billing/usage/<tenantId>`
pub async fn get_usage(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Path(tenant_id): Path<String>,
) -> Result<Json<UsageResponse>, ApiError> {
    require_matching_tenant(&tenant, &tenant_id)?;

    let meter = BillingMeter::new(&state.store);
    let report = meter.usage(&tenant)?;

    Ok(Json(UsageResponse {
        tenant_id: report.tenant_id.to_string(),
        total_spend: report.total_spend,
        budget_limit: report.budget_limit,
        rows: report
            .rows
            .into_iter()
            .map(|r| UsageRowJson {
                date: r.date,
                model: r.model.to_string(),
                input_tokens: r.input_tokens,
                output_tokens: r.output_tokens,
                cost_usd: r.cost_usd,
                job_count: r.job_count,
            })
            .collect(),
    }))
}

/// `GET /billing/export/<tenantId>` — `text/csv`.
pub async fn get_export(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Path(tenant_id): Path<String>,
) -> Result<Response, ApiError> {
    require_matching_tenant(&tenant, &tenant_id)?;

    let meter = BillingMeter::new(&state.store);
    let rows = meter.export(&tenant)?;
    let csv = pf_billing::export_csv(&rows);

    Ok(([(axum::http::header::CONTENT_TYPE, "text/csv")], csv).into_response())
}

#[derive(Debug, Deserialize)]
pub struct SetBudgetRequest {
    #[serde(rename = "limitUSD")]
    limit_usd: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SetBudgetResponse {
    #[serde(rename = "tenantId")]
    tenant_id: String,
    #[serde(rename = "limitUSD")]
    limit_usd: f64,
    message: String,
}

/// `POST /billing/budget/<tenantId>`
pub async fn post_budget(
    State(state): State<AppState>,
    AuthenticatedTenant(tenant): AuthenticatedTenant,
    Path(tenant_id): Path<String>,
    Json(body): Json<SetBudgetRequest>,
) -> Result<(StatusCode, Json<SetBudgetResponse>), ApiError> {
    require_matching_tenant(&tenant, &tenant_id)?;

    let limit_usd = body
        .limit_usd
        .as_f64()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .ok_or_else(|| ApiError::BadRequest("limitUSD must be a non-negative number".to_string()))?;

    let meter = BillingMeter::new(&state.store);
    meter.set_budget(&tenant, limit_usd, SystemClock.epoch_ms())?;

    Ok((
        StatusCode::OK,
        Json(SetBudgetResponse { tenant_id: tenant.to_string(), limit_usd, message: "budget updated".to_string() }),
    ))
}
