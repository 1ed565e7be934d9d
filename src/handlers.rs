use crate::auth;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::{
    ApiResponse, CreateLoanRequest, LoanResponse, LoanTypeResponse, LoginRequest,
    LoginResponse, RegisterRequest, SaveLoanDataRequest, UserResponse,
};
use crate::services::{CatalogService, LoanService, UserService};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
}

pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "rust-loan-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserResponse>>), AppError> {
    let tenant_id = auth::tenant_id_from_headers(&headers)?;
    let user = UserService::register(&state.pool, tenant_id, &request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("User registered successfully", user)),
    ))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let tenant_id = auth::tenant_id_from_headers(&headers)?;
    let response = UserService::login(&state.pool, &state.config, tenant_id, &request).await?;
    Ok(Json(ApiResponse::new("Login successful", response)))
}

pub async fn list_loan_types(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<LoanTypeResponse>>>, AppError> {
    let tenant_id = auth::tenant_id_from_headers(&headers)?;
    let loan_types = CatalogService::list_loan_types(&state.pool, tenant_id).await?;
    Ok(Json(ApiResponse::new(
        "Loan types retrieved successfully",
        loan_types,
    )))
}

pub async fn create_loan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateLoanRequest>,
) -> Result<(StatusCode, Json<ApiResponse<LoanResponse>>), AppError> {
    let claims = auth::authenticate(&state.config, &headers)?;
    let loan = LoanService::create(
        &state.pool,
        claims.tenant_id,
        claims.user_id,
        request.loan_type_id,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new("Loan application created", loan)),
    ))
}

pub async fn save_loan_data(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<SaveLoanDataRequest>,
) -> Result<Json<ApiResponse<LoanResponse>>, AppError> {
    auth::authenticate(&state.config, &headers)?;
    let loan = LoanService::save_data(&state.pool, request.loan_id, &request.data).await?;
    Ok(Json(ApiResponse::new("Loan data saved successfully", loan)))
}

pub async fn list_user_loans(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<LoanResponse>>>, AppError> {
    let claims = auth::authenticate(&state.config, &headers)?;
    let loans = LoanService::list_for_user(&state.pool, claims.user_id).await?;
    Ok(Json(ApiResponse::new("Loans retrieved successfully", loans)))
}

pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(loan_id): Path<i64>,
) -> Result<Json<ApiResponse<LoanResponse>>, AppError> {
    auth::authenticate(&state.config, &headers)?;
    let loan = LoanService::get(&state.pool, loan_id).await?;
    Ok(Json(ApiResponse::new("Loan retrieved successfully", loan)))
}

pub async fn process_decision(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(loan_id): Path<i64>,
) -> Result<Json<ApiResponse<LoanResponse>>, AppError> {
    auth::authenticate(&state.config, &headers)?;
    let loan = LoanService::process_decision(&state.pool, loan_id).await?;
    Ok(Json(ApiResponse::new("Decision processed", loan)))
}
