use crate::auth;
use crate::catalog::{self, FormCatalog};
use crate::config::Config;
use crate::decision;
use crate::errors::{AppError, ResultExt};
use crate::lifecycle;
use crate::models::{
    DocumentType, LoanDataItemRequest, LoanDataResponse, LoanResponse, LoanStatus,
    LoanType, LoanTypeResponse, LoginRequest, LoginResponse, RegisterRequest, User,
    UserResponse,
};
use crate::scoring;
use crate::store::{CatalogStore, LoanStore, TenantStore, UserStore};
use sqlx::PgPool;
use std::str::FromStr;
use tracing::{info, warn};

/// Registration and login.
pub struct UserService;

impl UserService {
    pub async fn register(
        pool: &PgPool,
        tenant_id: i64,
        request: &RegisterRequest,
    ) -> Result<UserResponse, AppError> {
        TenantStore::find_active(pool, tenant_id).await?;
        Self::validate_registration(request)?;

        if UserStore::find_by_email(pool, tenant_id, request.email.trim())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "Email already registered for this tenant".to_string(),
            ));
        }

        let password_hash = auth::hash_password(&request.password);
        let user = UserStore::insert(
            pool,
            tenant_id,
            request.name.trim(),
            request.email.trim(),
            request.phone.trim(),
            request.document_type.trim(),
            request.document_number.trim(),
            &password_hash,
        )
        .await?;

        info!(user_id = user.id, tenant_id, "user registered");
        Ok(UserResponse::from(&user))
    }

    fn validate_registration(request: &RegisterRequest) -> Result<(), AppError> {
        if request.name.trim().len() < 2 {
            return Err(AppError::Validation(
                "Name must be at least 2 characters".to_string(),
            ));
        }
        if !request.email.contains('@') {
            return Err(AppError::Validation("Invalid email address".to_string()));
        }
        if DocumentType::from_str(request.document_type.trim()).is_err() {
            return Err(AppError::Validation(
                "Document type must be one of: cedula, pasaporte, tarjeta_identidad"
                    .to_string(),
            ));
        }
        if request.document_number.trim().len() < 5 {
            return Err(AppError::Validation(
                "Document number must be at least 5 characters".to_string(),
            ));
        }
        if request.password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }
        if request.password != request.password_confirmation {
            return Err(AppError::Validation(
                "Password confirmation does not match".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn login(
        pool: &PgPool,
        config: &Config,
        tenant_id: i64,
        request: &LoginRequest,
    ) -> Result<LoginResponse, AppError> {
        let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

        TenantStore::find_active(pool, tenant_id).await?;
        let user = UserStore::find_by_email(pool, tenant_id, request.email.trim())
            .await?
            .ok_or_else(invalid)?;

        if !auth::verify_password(&request.password, &user.password_hash) {
            return Err(invalid());
        }

        let token = auth::issue_token(config, &user);
        info!(user_id = user.id, tenant_id, "user logged in");
        Ok(LoginResponse {
            user: UserResponse::from(&user),
            token,
        })
    }
}

/// Loan-type catalog reads.
pub struct CatalogService;

impl CatalogService {
    /// Lists the tenant's active loan types with their default form tree.
    /// Types whose catalog is misconfigured (no active default version)
    /// are skipped rather than failing the whole listing.
    pub async fn list_loan_types(
        pool: &PgPool,
        tenant_id: i64,
    ) -> Result<Vec<LoanTypeResponse>, AppError> {
        TenantStore::find_active(pool, tenant_id).await?;
        let loan_types = CatalogStore::list_active_loan_types(pool, tenant_id).await?;

        let mut responses = Vec::with_capacity(loan_types.len());
        for loan_type in loan_types {
            match catalog::load_default_catalog(pool, loan_type.id).await {
                Ok(catalog) => responses.push(loan_type_response(&loan_type, &catalog)),
                Err(AppError::NotFound(_)) => {
                    warn!(
                        loan_type_id = loan_type.id,
                        "skipping loan type without an active default version"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        Ok(responses)
    }
}

fn loan_type_response(loan_type: &LoanType, catalog: &FormCatalog) -> LoanTypeResponse {
    LoanTypeResponse {
        id: loan_type.id,
        name: loan_type.name.clone(),
        code: loan_type.code.clone(),
        description: loan_type.description.clone(),
        min_amount: loan_type.min_amount.clone(),
        max_amount: loan_type.max_amount.clone(),
        version: catalog.to_version_response(),
    }
}

/// Known loan-data keys consumed by the evaluators.
const KEY_DOCUMENT_TYPE: &str = "document_type";
const KEY_DOCUMENT_NUMBER: &str = "document_number";
const KEY_FULL_NAME: &str = "full_name";
const KEY_REQUESTED_AMOUNT: &str = "requested_amount";
const KEY_MONTHLY_INCOME: &str = "monthly_income";

/// Application lifecycle: creation, data saves, and the decision.
pub struct LoanService;

impl LoanService {
    pub async fn create(
        pool: &PgPool,
        tenant_id: i64,
        user_id: i64,
        loan_type_id: i64,
    ) -> Result<LoanResponse, AppError> {
        let user = UserStore::find_by_id(pool, user_id).await?;
        if user.tenant_id != tenant_id {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        let loan_type = CatalogStore::find_loan_type(pool, tenant_id, loan_type_id).await?;
        // A loan type without a resolvable catalog cannot take applications.
        catalog::load_default_catalog(pool, loan_type.id).await?;

        let observation =
            lifecycle::status_observation(LoanStatus::Pending, None, None);
        let loan = LoanStore::insert(pool, loan_type.id, user.id, &observation).await?;

        info!(loan_id = loan.id, user_id, loan_type_id, "loan application created");
        Self::get(pool, loan.id).await
    }

    /// Replaces the loan's data snapshot and re-evaluates its state.
    ///
    /// The loan row is locked for the whole flow, so concurrent saves and
    /// decisions on the same loan serialize.
    pub async fn save_data(
        pool: &PgPool,
        loan_id: i64,
        items: &[LoanDataItemRequest],
    ) -> Result<LoanResponse, AppError> {
        let mut tx = pool.begin().await.context("begin save-data transaction")?;

        let loan = LoanStore::find_for_update(&mut tx, loan_id).await?;
        let status = LoanStatus::from_str(&loan.status)
            .map_err(AppError::Technical)?;
        if !status.accepts_data() {
            return Err(AppError::InvalidState(format!(
                "Loan in status '{}' no longer accepts data",
                loan.status
            )));
        }

        let saved = LoanStore::replace_data(&mut tx, loan_id, items).await?;

        // Recompute score and identity when this save carries their inputs;
        // otherwise previous values persist (they are never reset).
        let document_type = latest_value(items, KEY_DOCUMENT_TYPE);
        let document_number = latest_value(items, KEY_DOCUMENT_NUMBER);
        let full_name = latest_value(items, KEY_FULL_NAME);

        let mut credit_score = loan.credit_score;
        if let (Some(doc_type), Some(doc_number)) = (document_type, document_number) {
            let score = scoring::simulate_credit_score(
                doc_type,
                doc_number,
                &mut rand::thread_rng(),
            );
            info!(loan_id, score, "credit score simulated");
            credit_score = Some(score);
        }

        let mut identity_verified = loan.identity_verified;
        if let (Some(doc_type), Some(doc_number), Some(name)) =
            (document_type, document_number, full_name)
        {
            let user = UserStore::find_by_id_tx(&mut tx, loan.user_id).await?;
            let verified =
                scoring::verify_identity(user.as_ref(), doc_type, doc_number, name)?;
            info!(loan_id, verified, "identity verification executed");
            identity_verified = Some(verified);
        }

        let catalog = catalog::load_default_catalog(pool, loan.loan_type_id).await?;
        let complete = lifecycle::is_application_complete(
            &catalog,
            saved.iter().map(|d| (d.key.as_str(), d.value.as_str())),
        );
        let next = lifecycle::next_status(saved.len(), complete, credit_score, identity_verified);
        let observation = lifecycle::status_observation(next, credit_score, identity_verified);

        LoanStore::update_evaluation(
            &mut tx,
            loan_id,
            next,
            &observation,
            credit_score,
            identity_verified,
        )
        .await?;

        tx.commit().await.context("commit save-data transaction")?;

        info!(loan_id, status = %next, "loan data saved");
        Self::get(pool, loan_id).await
    }

    /// Runs the approval rules on a completed application and, on approval,
    /// attempts the disbursement. Either way the loan ends terminal.
    pub async fn process_decision(pool: &PgPool, loan_id: i64) -> Result<LoanResponse, AppError> {
        let mut tx = pool.begin().await.context("begin decision transaction")?;

        let loan = LoanStore::find_for_update(&mut tx, loan_id).await?;
        let status = LoanStatus::from_str(&loan.status)
            .map_err(AppError::Technical)?;
        if status != LoanStatus::Completed {
            return Err(AppError::InvalidState(format!(
                "Only completed applications can be evaluated; loan is '{}'",
                loan.status
            )));
        }

        let credit_score = loan.credit_score.ok_or_else(|| {
            AppError::IncompleteEvaluation(
                "Credit score has not been computed for this application".to_string(),
            )
        })?;
        let identity_verified = loan.identity_verified.ok_or_else(|| {
            AppError::IncompleteEvaluation(
                "Identity verification has not been executed for this application"
                    .to_string(),
            )
        })?;

        let data = sqlx::query_as::<_, crate::models::LoanData>(
            "SELECT * FROM loan_data WHERE loan_id = $1 ORDER BY form_id, index, id",
        )
        .bind(loan_id)
        .fetch_all(&mut *tx)
        .await
        .context("load loan data for decision")?;

        let requested_amount = decision::parse_amount(
            data.iter()
                .rev()
                .find(|d| d.key == KEY_REQUESTED_AMOUNT)
                .map(|d| d.value.as_str()),
        );
        let monthly_income = decision::parse_amount(
            data.iter()
                .rev()
                .find(|d| d.key == KEY_MONTHLY_INCOME)
                .map(|d| d.value.as_str()),
        );

        let outcome = decision::evaluate_approval(
            credit_score,
            identity_verified,
            &requested_amount,
            &monthly_income,
        );

        let (final_status, final_reason, amount_approved) = match outcome.status {
            LoanStatus::Approved => {
                let amount = decision::approved_amount(&requested_amount, &monthly_income);
                if decision::simulate_disbursement(loan.user_id, &amount) {
                    info!(loan_id, %amount, "disbursement completed");
                    (
                        LoanStatus::Approved,
                        format!("{} - Disbursement completed successfully", outcome.reason),
                        amount,
                    )
                } else {
                    warn!(loan_id, %amount, "disbursement failed");
                    (
                        LoanStatus::Rejected,
                        "Application approved but disbursement failed. Contact support."
                            .to_string(),
                        amount,
                    )
                }
            }
            _ => (outcome.status, outcome.reason, loan.amount_approved.clone()),
        };

        LoanStore::update_decision(&mut tx, loan_id, final_status, &final_reason, &amount_approved)
            .await?;

        tx.commit().await.context("commit decision transaction")?;

        info!(loan_id, status = %final_status, "decision recorded");
        Self::get(pool, loan_id).await
    }

    /// Loads the full loan response: loan, user, loan type with catalog,
    /// and the data snapshot.
    pub async fn get(pool: &PgPool, loan_id: i64) -> Result<LoanResponse, AppError> {
        let loan = LoanStore::find_by_id(pool, loan_id).await?;
        let user = UserStore::find_by_id(pool, loan.user_id).await?;
        let loan_type = CatalogStore::find_loan_type_any_tenant(pool, loan.loan_type_id).await?;
        let catalog = catalog::load_default_catalog(pool, loan_type.id).await?;
        let data = LoanStore::load_data(pool, loan_id).await?;

        Ok(build_loan_response(&loan, &user, &loan_type, &catalog, &data))
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: i64,
    ) -> Result<Vec<LoanResponse>, AppError> {
        let loans = LoanStore::list_for_user(pool, user_id).await?;

        let mut responses = Vec::with_capacity(loans.len());
        for loan in &loans {
            responses.push(Self::get(pool, loan.id).await?);
        }

        Ok(responses)
    }
}

/// Last submitted non-empty value for a key, if any.
fn latest_value<'a>(items: &'a [LoanDataItemRequest], key: &str) -> Option<&'a str> {
    items
        .iter()
        .rev()
        .find(|item| item.key == key && !item.value.trim().is_empty())
        .map(|item| item.value.trim())
}

fn build_loan_response(
    loan: &crate::models::Loan,
    user: &User,
    loan_type: &LoanType,
    catalog: &FormCatalog,
    data: &[crate::models::LoanData],
) -> LoanResponse {
    LoanResponse {
        id: loan.id,
        loan_type_id: loan.loan_type_id,
        loan_type: loan_type_response(loan_type, catalog),
        user_id: loan.user_id,
        user: UserResponse::from(user),
        status: loan.status.clone(),
        observation: loan.observation.clone(),
        amount_approved: loan.amount_approved.clone(),
        credit_score: loan.credit_score,
        identity_verified: loan.identity_verified,
        data: data.iter().map(LoanDataResponse::from).collect(),
        created_at: loan.created_at,
        updated_at: loan.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(key: &str, value: &str) -> LoanDataItemRequest {
        LoanDataItemRequest {
            form_id: 1,
            key: key.to_string(),
            value: value.to_string(),
            index: 0,
        }
    }

    #[test]
    fn latest_value_takes_the_last_non_empty_entry() {
        let items = vec![
            item("document_number", "111"),
            item("full_name", "Maria"),
            item("document_number", "222"),
            item("document_number", "   "),
        ];
        assert_eq!(latest_value(&items, "document_number"), Some("222"));
        assert_eq!(latest_value(&items, "full_name"), Some("Maria"));
        assert_eq!(latest_value(&items, "monthly_income"), None);
    }

    #[test]
    fn registration_validation_rejects_bad_input() {
        let mut request = RegisterRequest {
            name: "Maria Lopez".to_string(),
            email: "maria@example.com".to_string(),
            phone: "3001234567".to_string(),
            document_type: "cedula".to_string(),
            document_number: "10203040".to_string(),
            password: "supersecret".to_string(),
            password_confirmation: "supersecret".to_string(),
        };
        assert!(UserService::validate_registration(&request).is_ok());

        request.name = "M".to_string();
        assert!(UserService::validate_registration(&request).is_err());
        request.name = "Maria Lopez".to_string();

        request.email = "not-an-email".to_string();
        assert!(UserService::validate_registration(&request).is_err());
        request.email = "maria@example.com".to_string();

        request.document_type = "licencia".to_string();
        assert!(UserService::validate_registration(&request).is_err());
        request.document_type = "cedula".to_string();

        request.document_number = "123".to_string();
        assert!(UserService::validate_registration(&request).is_err());
        request.document_number = "10203040".to_string();

        request.password = "short".to_string();
        request.password_confirmation = "short".to_string();
        assert!(UserService::validate_registration(&request).is_err());

        request.password = "supersecret".to_string();
        request.password_confirmation = "different-pass".to_string();
        assert!(UserService::validate_registration(&request).is_err());
    }
}
