use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

use super::domain::MethodId;
use super::ranking::{CandidateView, Recommendation};
use super::service::{RewardService, RewardServiceError};
use super::store::RewardStore;

#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    pub amount: f64,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub brand: String,
    pub amount: f64,
    pub candidate_count: usize,
    pub top: Vec<CandidateView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl From<&Recommendation> for EvaluateResponse {
    fn from(recommendation: &Recommendation) -> Self {
        Self {
            brand: recommendation.brand.clone(),
            amount: recommendation.amount,
            candidate_count: recommendation.candidates.len(),
            top: recommendation.views(),
            message: recommendation
                .is_empty()
                .then_some("No active methods with positive reward %. Check your settings."),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub rank: usize,
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// Router exposing evaluation, usage commits and route settings.
pub fn reward_router<S>(service: Arc<RewardService<S>>) -> Router
where
    S: RewardStore + 'static,
{
    Router::new()
        .route("/api/v1/rewards/evaluate", post(evaluate_handler::<S>))
        .route("/api/v1/rewards/commit", post(commit_handler::<S>))
        .route("/api/v1/rewards/methods", get(methods_handler::<S>))
        .route(
            "/api/v1/rewards/methods/:method_id/active",
            put(set_active_handler::<S>),
        )
        .route("/api/v1/rewards/status", get(status_handler::<S>))
        .with_state(service)
}

pub(crate) async fn evaluate_handler<S>(
    State(service): State<Arc<RewardService<S>>>,
    axum::Json(request): axum::Json<EvaluateRequest>,
) -> Response
where
    S: RewardStore + 'static,
{
    let today = request.today.unwrap_or_else(|| Local::now().date_naive());
    match service.evaluate(request.amount, request.brand.as_deref(), today) {
        Ok(recommendation) => {
            let body = EvaluateResponse::from(&recommendation);
            (StatusCode::OK, axum::Json(body)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn commit_handler<S>(
    State(service): State<Arc<RewardService<S>>>,
    axum::Json(request): axum::Json<CommitRequest>,
) -> Response
where
    S: RewardStore + 'static,
{
    let today = request.today.unwrap_or_else(|| Local::now().date_naive());
    match service.commit(request.rank, today) {
        Ok(receipt) => (StatusCode::OK, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn methods_handler<S>(State(service): State<Arc<RewardService<S>>>) -> Response
where
    S: RewardStore + 'static,
{
    (StatusCode::OK, axum::Json(service.methods())).into_response()
}

pub(crate) async fn set_active_handler<S>(
    State(service): State<Arc<RewardService<S>>>,
    Path(method_id): Path<String>,
    axum::Json(request): axum::Json<ActiveRequest>,
) -> Response
where
    S: RewardStore + 'static,
{
    match service.set_method_active(&MethodId(method_id), request.active) {
        Ok(method) => (StatusCode::OK, axum::Json(method)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<S>(
    State(service): State<Arc<RewardService<S>>>,
    axum::extract::Query(query): axum::extract::Query<StatusQuery>,
) -> Response
where
    S: RewardStore + 'static,
{
    let today = query.today.unwrap_or_else(|| Local::now().date_naive());
    (StatusCode::OK, axum::Json(service.status(today))).into_response()
}

fn error_response(error: RewardServiceError) -> Response {
    AppError::from(error).into_response()
}
