use std::env;

use rust_loan_api::config::Config;
use rust_loan_api::db::Database;
use rust_loan_api::models::{LoanDataItemRequest, RegisterRequest};
use rust_loan_api::services::{LoanService, UserService};
use sqlx::PgPool;

/// Integration smoke test for the full application lifecycle against a real
/// database. Marked ignored to avoid running against production by accident;
/// set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn loan_lifecycle_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    let pool = db.pool;
    let config = Config {
        database_url: db_url,
        port: 0,
        token_secret: "integration-test-secret".to_string(),
        token_ttl_hours: 1,
    };

    let suffix = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let (tenant_id, loan_type_id, form_id) = seed_catalog(&pool, suffix).await?;

    // Register and log in.
    let register = RegisterRequest {
        name: "Integration Tester".to_string(),
        email: format!("tester{}@example.com", suffix),
        phone: "3000000000".to_string(),
        document_type: "cedula".to_string(),
        document_number: "10203048".to_string(),
        password: "integration-pass".to_string(),
        password_confirmation: "integration-pass".to_string(),
    };
    let user = UserService::register(&pool, tenant_id, &register).await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let login = UserService::login(
        &pool,
        &config,
        tenant_id,
        &rust_loan_api::models::LoginRequest {
            email: register.email.clone(),
            password: register.password.clone(),
        },
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(!login.token.is_empty());

    // Create the application.
    let loan = LoanService::create(&pool, tenant_id, user.id, loan_type_id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(loan.status, "pending");

    // A decision before the application completes must be refused.
    assert!(LoanService::process_decision(&pool, loan.id).await.is_err());

    // First save: a single key not in the final set, leaving the loan in
    // progress.
    let partial = vec![LoanDataItemRequest {
        form_id,
        key: "nickname".to_string(),
        value: "Majo".to_string(),
        index: 0,
    }];
    let in_progress = LoanService::save_data(&pool, loan.id, &partial)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(in_progress.status, "on_progress");
    assert_eq!(in_progress.data.len(), 1);
    assert!(LoanService::process_decision(&pool, loan.id).await.is_err());

    // Save a complete data set; the loan should finish completed with both
    // computed fields populated.
    let items = [
        ("full_name", "Integration Tester"),
        ("document_type", "cedula"),
        ("document_number", "10203048"),
        ("requested_amount", "2000000"),
        ("monthly_income", "8000000"),
    ]
    .into_iter()
    .map(|(key, value)| LoanDataItemRequest {
        form_id,
        key: key.to_string(),
        value: value.to_string(),
        index: 0,
    })
    .collect::<Vec<_>>();

    let loan = LoanService::save_data(&pool, loan.id, &items)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(loan.status, "completed");
    assert!(loan.credit_score.is_some());
    assert_eq!(loan.identity_verified, Some(true));

    // Full-replace semantics: the second save leaves exactly its own key
    // set, not a union with the first.
    assert_eq!(loan.data.len(), items.len());
    assert!(loan.data.iter().all(|d| d.key != "nickname"));

    // Document ending in 8 scores at least 675 even with worst-case jitter,
    // so the decision lands on an approval (or a rejected disbursement for
    // ids ending in 0 — both are terminal).
    let loan = LoanService::process_decision(&pool, loan.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(loan.status == "approved" || loan.status == "rejected");

    // Terminal loans accept no further mutations.
    assert!(LoanService::save_data(&pool, loan.id, &items).await.is_err());
    assert!(LoanService::process_decision(&pool, loan.id).await.is_err());

    Ok(())
}

/// Seeds a tenant with one loan type, one default version, and one required
/// form carrying the five inputs the evaluators consume.
async fn seed_catalog(pool: &PgPool, suffix: i64) -> anyhow::Result<(i64, i64, i64)> {
    let (tenant_id,): (i64,) = sqlx::query_as(
        "INSERT INTO tenants (name, code) VALUES ($1, $2) RETURNING id",
    )
    .bind("Integration Tenant")
    .bind(format!("it-{}", suffix))
    .fetch_one(pool)
    .await?;

    let (loan_type_id,): (i64,) = sqlx::query_as(
        "INSERT INTO loan_types (tenant_id, name, code, min_amount, max_amount) \
         VALUES ($1, $2, $3, 100000, 50000000) RETURNING id",
    )
    .bind(tenant_id)
    .bind("Personal Loan")
    .bind(format!("personal-{}", suffix))
    .fetch_one(pool)
    .await?;

    let (version_id,): (i64,) = sqlx::query_as(
        "INSERT INTO loan_type_versions (loan_type_id, version, is_active, is_default) \
         VALUES ($1, 'v1', TRUE, TRUE) RETURNING id",
    )
    .bind(loan_type_id)
    .fetch_one(pool)
    .await?;

    let (form_id,): (i64,) = sqlx::query_as(
        "INSERT INTO loan_type_forms \
         (loan_type_version_id, label, code, sort_order, is_required) \
         VALUES ($1, 'Applicant', 'applicant', 1, TRUE) RETURNING id",
    )
    .bind(version_id)
    .fetch_one(pool)
    .await?;

    for (order, code) in [
        "full_name",
        "document_type",
        "document_number",
        "requested_amount",
        "monthly_income",
    ]
    .iter()
    .enumerate()
    {
        sqlx::query(
            "INSERT INTO loan_type_version_form_inputs \
             (loan_type_form_id, label, code, input_type, sort_order, is_required) \
             VALUES ($1, $2, $2, 'text', $3, TRUE)",
        )
        .bind(form_id)
        .bind(code)
        .bind(order as i32)
        .execute(pool)
        .await?;
    }

    Ok((tenant_id, loan_type_id, form_id))
}
