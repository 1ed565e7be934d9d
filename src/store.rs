use crate::errors::{AppError, ResultExt};
use crate::models::{Loan, LoanData, LoanDataItemRequest, LoanStatus, LoanType, Tenant, User};
use bigdecimal::BigDecimal;
use sqlx::{PgPool, Postgres, Transaction};

/// Tenant lookups.
pub struct TenantStore;

impl TenantStore {
    pub async fn find_active(pool: &PgPool, tenant_id: i64) -> Result<Tenant, AppError> {
        sqlx::query_as::<_, Tenant>(
            "SELECT * FROM tenants \
             WHERE id = $1 AND is_active = TRUE AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
        .context("load tenant")?
        .ok_or_else(|| AppError::NotFound(format!("Tenant {} not found", tenant_id)))
    }
}

/// User persistence, always tenant-scoped.
pub struct UserStore;

impl UserStore {
    pub async fn find_by_id(pool: &PgPool, user_id: i64) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("load user")?
        .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    pub async fn find_by_email(
        pool: &PgPool,
        tenant_id: i64,
        email: &str,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users \
             WHERE tenant_id = $1 AND email = $2 AND deleted_at IS NULL",
        )
        .bind(tenant_id)
        .bind(email)
        .fetch_optional(pool)
        .await
        .context("load user by email")
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        pool: &PgPool,
        tenant_id: i64,
        name: &str,
        email: &str,
        phone: &str,
        document_type: &str,
        document_number: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users \
             (tenant_id, name, email, phone, document_type, document_number, password_hash) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING *",
        )
        .bind(tenant_id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(document_type)
        .bind(document_number)
        .bind(password_hash)
        .fetch_one(pool)
        .await
        .context("insert user")
    }

    /// Transaction-scoped user lookup, used while the loan row is locked.
    pub async fn find_by_id_tx(
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(&mut **tx)
        .await
        .context("load user in transaction")
    }
}

/// Loan-type catalog reads.
pub struct CatalogStore;

impl CatalogStore {
    pub async fn list_active_loan_types(
        pool: &PgPool,
        tenant_id: i64,
    ) -> Result<Vec<LoanType>, AppError> {
        sqlx::query_as::<_, LoanType>(
            "SELECT * FROM loan_types \
             WHERE tenant_id = $1 AND is_active = TRUE AND deleted_at IS NULL \
             ORDER BY id",
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
        .context("list loan types")
    }

    pub async fn find_loan_type(
        pool: &PgPool,
        tenant_id: i64,
        loan_type_id: i64,
    ) -> Result<LoanType, AppError> {
        sqlx::query_as::<_, LoanType>(
            "SELECT * FROM loan_types \
             WHERE id = $1 AND tenant_id = $2 AND is_active = TRUE AND deleted_at IS NULL",
        )
        .bind(loan_type_id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
        .context("load loan type")?
        .ok_or_else(|| AppError::NotFound(format!("Loan type {} not found", loan_type_id)))
    }

    pub async fn find_loan_type_any_tenant(
        pool: &PgPool,
        loan_type_id: i64,
    ) -> Result<LoanType, AppError> {
        sqlx::query_as::<_, LoanType>(
            "SELECT * FROM loan_types WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(loan_type_id)
        .fetch_optional(pool)
        .await
        .context("load loan type")?
        .ok_or_else(|| AppError::NotFound(format!("Loan type {} not found", loan_type_id)))
    }
}

/// Loan aggregate persistence. Mutating flows run inside a transaction
/// holding a `FOR UPDATE` lock on the loan row.
pub struct LoanStore;

impl LoanStore {
    pub async fn insert(
        pool: &PgPool,
        loan_type_id: i64,
        user_id: i64,
        observation: &str,
    ) -> Result<Loan, AppError> {
        sqlx::query_as::<_, Loan>(
            "INSERT INTO loans (loan_type_id, user_id, status, observation) \
             VALUES ($1, $2, $3, $4) \
             RETURNING *",
        )
        .bind(loan_type_id)
        .bind(user_id)
        .bind(LoanStatus::Pending.as_str())
        .bind(observation)
        .fetch_one(pool)
        .await
        .context("insert loan")
    }

    pub async fn find_by_id(pool: &PgPool, loan_id: i64) -> Result<Loan, AppError> {
        sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(loan_id)
        .fetch_optional(pool)
        .await
        .context("load loan")?
        .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))
    }

    pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<Loan>, AppError> {
        sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans \
             WHERE user_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
        .context("list loans for user")
    }

    /// Locks and returns the loan row for the duration of the transaction.
    /// Serializes concurrent saves and decisions on the same loan.
    pub async fn find_for_update(
        tx: &mut Transaction<'_, Postgres>,
        loan_id: i64,
    ) -> Result<Loan, AppError> {
        sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE id = $1 AND deleted_at IS NULL FOR UPDATE",
        )
        .bind(loan_id)
        .fetch_optional(&mut **tx)
        .await
        .context("lock loan")?
        .ok_or_else(|| AppError::NotFound(format!("Loan {} not found", loan_id)))
    }

    /// Full-replace data semantics: every save wipes the previous snapshot
    /// and inserts the submitted items.
    pub async fn replace_data(
        tx: &mut Transaction<'_, Postgres>,
        loan_id: i64,
        items: &[LoanDataItemRequest],
    ) -> Result<Vec<LoanData>, AppError> {
        sqlx::query("DELETE FROM loan_data WHERE loan_id = $1")
            .bind(loan_id)
            .execute(&mut **tx)
            .await
            .context("delete loan data")?;

        let mut saved = Vec::with_capacity(items.len());
        for item in items {
            let row = sqlx::query_as::<_, LoanData>(
                "INSERT INTO loan_data (loan_id, form_id, key, value, index) \
                 VALUES ($1, $2, $3, $4, $5) \
                 RETURNING *",
            )
            .bind(loan_id)
            .bind(item.form_id)
            .bind(&item.key)
            .bind(&item.value)
            .bind(item.index)
            .fetch_one(&mut **tx)
            .await
            .context("insert loan data item")?;
            saved.push(row);
        }

        Ok(saved)
    }

    pub async fn load_data(pool: &PgPool, loan_id: i64) -> Result<Vec<LoanData>, AppError> {
        sqlx::query_as::<_, LoanData>(
            "SELECT * FROM loan_data WHERE loan_id = $1 ORDER BY form_id, index, id",
        )
        .bind(loan_id)
        .fetch_all(pool)
        .await
        .context("load loan data")
    }

    /// Writes the post-save evaluation: status, observation, and the two
    /// computed fields. NULLs are preserved by passing the previous values.
    pub async fn update_evaluation(
        tx: &mut Transaction<'_, Postgres>,
        loan_id: i64,
        status: LoanStatus,
        observation: &str,
        credit_score: Option<i32>,
        identity_verified: Option<bool>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE loans \
             SET status = $2, observation = $3, credit_score = $4, \
                 identity_verified = $5, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(loan_id)
        .bind(status.as_str())
        .bind(observation)
        .bind(credit_score)
        .bind(identity_verified)
        .execute(&mut **tx)
        .await
        .context("update loan evaluation")?;

        Ok(())
    }

    /// Writes the terminal decision in a single statement.
    pub async fn update_decision(
        tx: &mut Transaction<'_, Postgres>,
        loan_id: i64,
        status: LoanStatus,
        observation: &str,
        amount_approved: &BigDecimal,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE loans \
             SET status = $2, observation = $3, amount_approved = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(loan_id)
        .bind(status.as_str())
        .bind(observation)
        .bind(amount_approved)
        .execute(&mut **tx)
        .await
        .context("update loan decision")?;

        Ok(())
    }
}
