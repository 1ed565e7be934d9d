use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

// ============ Enumerations ============

/// Lifecycle states of a loan application.
///
/// `Approved` and `Rejected` are terminal; once reached, neither data
/// saves nor decision calls may mutate the loan again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    OnProgress,
    Completed,
    Approved,
    Rejected,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::OnProgress => "on_progress",
            LoanStatus::Completed => "completed",
            LoanStatus::Approved => "approved",
            LoanStatus::Rejected => "rejected",
        }
    }

    /// Whether the loan still accepts data saves. Only pending and
    /// on_progress applications may be edited; a completed application
    /// waits for its decision.
    pub fn accepts_data(&self) -> bool {
        matches!(self, LoanStatus::Pending | LoanStatus::OnProgress)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, LoanStatus::Approved | LoanStatus::Rejected)
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(LoanStatus::Pending),
            "on_progress" => Ok(LoanStatus::OnProgress),
            "completed" => Ok(LoanStatus::Completed),
            "approved" => Ok(LoanStatus::Approved),
            "rejected" => Ok(LoanStatus::Rejected),
            other => Err(format!("unknown loan status: {}", other)),
        }
    }
}

/// Accepted identity document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Cedula,
    Pasaporte,
    TarjetaIdentidad,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Cedula => "cedula",
            DocumentType::Pasaporte => "pasaporte",
            DocumentType::TarjetaIdentidad => "tarjeta_identidad",
        }
    }
}

impl FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cedula" => Ok(DocumentType::Cedula),
            "pasaporte" => Ok(DocumentType::Pasaporte),
            "tarjeta_identidad" => Ok(DocumentType::TarjetaIdentidad),
            other => Err(format!("unknown document type: {}", other)),
        }
    }
}

// ============ Database Models ============

/// An isolated client organization owning its own loan products and users.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: String,
    pub is_active: bool,
    /// Free-form tenant configuration; the core never inspects it.
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A tenant-scoped registered user.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document_type: String,
    pub document_number: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A loan product definition scoped to a tenant.
#[derive(Debug, Clone, FromRow)]
pub struct LoanType {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub code: String,
    pub description: String,
    pub is_active: bool,
    pub min_amount: BigDecimal,
    pub max_amount: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A versioned ruleset of a loan type. Only one version per loan type is
/// both `is_active` and `is_default`; that version drives new applications.
#[derive(Debug, Clone, FromRow)]
pub struct LoanTypeVersion {
    pub id: i64,
    pub loan_type_id: i64,
    pub version: String,
    pub description: String,
    pub is_active: bool,
    pub is_default: bool,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A named form section (e.g. "Personal Information") within a version.
#[derive(Debug, Clone, FromRow)]
pub struct LoanTypeForm {
    pub id: i64,
    pub loan_type_version_id: i64,
    pub label: String,
    pub code: String,
    pub description: String,
    pub sort_order: i32,
    pub is_required: bool,
    pub is_active: bool,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A single input of a form. The JSON columns (validation rules, options,
/// config) stay opaque; the core only consumes code/required/active/order.
#[derive(Debug, Clone, FromRow)]
pub struct LoanTypeVersionFormInput {
    pub id: i64,
    pub loan_type_form_id: i64,
    pub label: String,
    pub code: String,
    pub input_type: String,
    pub placeholder: String,
    pub default_value: String,
    pub validation_rules: serde_json::Value,
    pub options: serde_json::Value,
    pub sort_order: i32,
    pub is_required: bool,
    pub is_active: bool,
    pub config: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// The loan application aggregate.
///
/// `credit_score` and `identity_verified` stay NULL until a data save
/// triggers their computation; once set they are only ever overwritten,
/// never cleared.
#[derive(Debug, Clone, FromRow)]
pub struct Loan {
    pub id: i64,
    pub loan_type_id: i64,
    pub user_id: i64,
    pub status: String,
    pub observation: String,
    pub amount_approved: BigDecimal,
    pub credit_score: Option<i32>,
    pub identity_verified: Option<bool>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// One submitted answer: unique per (loan, key, index). The index allows
/// the same logical form to be submitted multiple times.
#[derive(Debug, Clone, FromRow)]
pub struct LoanData {
    pub id: i64,
    pub loan_id: i64,
    pub form_id: i64,
    pub key: String,
    pub value: String,
    pub index: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============ Request DTOs ============

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document_type: String,
    pub document_number: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateLoanRequest {
    pub loan_type_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct SaveLoanDataRequest {
    pub loan_id: i64,
    pub data: Vec<LoanDataItemRequest>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoanDataItemRequest {
    pub form_id: i64,
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub index: i32,
}

// ============ Response DTOs ============

/// Standard success envelope: `{success:true, message, data}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }
}

/// User representation without sensitive fields.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub tenant_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub document_type: String,
    pub document_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            tenant_id: user.tenant_id,
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            document_type: user.document_type.clone(),
            document_number: user.document_number.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct LoanTypeResponse {
    pub id: i64,
    pub name: String,
    pub code: String,
    pub description: String,
    pub min_amount: BigDecimal,
    pub max_amount: BigDecimal,
    pub version: LoanTypeVersionResponse,
}

#[derive(Debug, Serialize)]
pub struct LoanTypeVersionResponse {
    pub id: i64,
    pub version: String,
    pub description: String,
    pub forms: Vec<LoanTypeFormResponse>,
}

#[derive(Debug, Serialize)]
pub struct LoanTypeFormResponse {
    pub id: i64,
    pub label: String,
    pub code: String,
    pub description: String,
    pub order: i32,
    pub is_required: bool,
    pub form_inputs: Vec<FormInputResponse>,
}

#[derive(Debug, Serialize)]
pub struct FormInputResponse {
    pub id: i64,
    pub label: String,
    pub code: String,
    pub input_type: String,
    pub placeholder: String,
    pub default_value: String,
    pub validation_rules: serde_json::Value,
    pub options: serde_json::Value,
    pub order: i32,
    pub is_required: bool,
}

#[derive(Debug, Serialize)]
pub struct LoanResponse {
    pub id: i64,
    pub loan_type_id: i64,
    pub loan_type: LoanTypeResponse,
    pub user_id: i64,
    pub user: UserResponse,
    pub status: String,
    pub observation: String,
    pub amount_approved: BigDecimal,
    pub credit_score: Option<i32>,
    pub identity_verified: Option<bool>,
    pub data: Vec<LoanDataResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct LoanDataResponse {
    pub id: i64,
    pub form_id: i64,
    pub key: String,
    pub value: String,
    pub index: i32,
}

impl From<&LoanData> for LoanDataResponse {
    fn from(data: &LoanData) -> Self {
        Self {
            id: data.id,
            form_id: data.form_id,
            key: data.key.clone(),
            value: data.value.clone(),
            index: data.index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_pending_and_on_progress_accept_data() {
        assert!(LoanStatus::Pending.accepts_data());
        assert!(LoanStatus::OnProgress.accepts_data());
        assert!(!LoanStatus::Completed.accepts_data());
        assert!(!LoanStatus::Approved.accepts_data());
        assert!(!LoanStatus::Rejected.accepts_data());
    }

    #[test]
    fn only_decision_outcomes_are_terminal() {
        assert!(LoanStatus::Approved.is_terminal());
        assert!(LoanStatus::Rejected.is_terminal());
        assert!(!LoanStatus::Pending.is_terminal());
        assert!(!LoanStatus::OnProgress.is_terminal());
        assert!(!LoanStatus::Completed.is_terminal());
    }
}
