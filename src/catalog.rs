use crate::errors::{AppError, ResultExt};
use crate::models::{
    FormInputResponse, LoanTypeForm, LoanTypeFormResponse, LoanTypeVersion,
    LoanTypeVersionFormInput, LoanTypeVersionResponse,
};
use sqlx::PgPool;

/// The resolved form tree of a loan type's default active version.
///
/// Forms and inputs are pre-filtered to `is_active = true` and ordered by
/// `sort_order`; this is the tree new applications collect data against.
#[derive(Debug, Clone)]
pub struct FormCatalog {
    pub version: LoanTypeVersion,
    pub forms: Vec<CatalogForm>,
}

#[derive(Debug, Clone)]
pub struct CatalogForm {
    pub form: LoanTypeForm,
    pub inputs: Vec<LoanTypeVersionFormInput>,
}

impl FormCatalog {
    /// Builds the version response payload embedded in loan-type responses.
    pub fn to_version_response(&self) -> LoanTypeVersionResponse {
        LoanTypeVersionResponse {
            id: self.version.id,
            version: self.version.version.clone(),
            description: self.version.description.clone(),
            forms: self
                .forms
                .iter()
                .map(|entry| LoanTypeFormResponse {
                    id: entry.form.id,
                    label: entry.form.label.clone(),
                    code: entry.form.code.clone(),
                    description: entry.form.description.clone(),
                    order: entry.form.sort_order,
                    is_required: entry.form.is_required,
                    form_inputs: entry
                        .inputs
                        .iter()
                        .map(|input| FormInputResponse {
                            id: input.id,
                            label: input.label.clone(),
                            code: input.code.clone(),
                            input_type: input.input_type.clone(),
                            placeholder: input.placeholder.clone(),
                            default_value: input.default_value.clone(),
                            validation_rules: input.validation_rules.clone(),
                            options: input.options.clone(),
                            order: input.sort_order,
                            is_required: input.is_required,
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Resolves the form catalog for a loan type: the single version marked
/// both `is_active` and `is_default`, with its active forms and inputs.
///
/// Fails with `NotFound` when the loan type has no such version.
pub async fn load_default_catalog(
    pool: &PgPool,
    loan_type_id: i64,
) -> Result<FormCatalog, AppError> {
    let version = sqlx::query_as::<_, LoanTypeVersion>(
        "SELECT * FROM loan_type_versions \
         WHERE loan_type_id = $1 AND is_active = TRUE AND is_default = TRUE \
         AND deleted_at IS NULL \
         LIMIT 1",
    )
    .bind(loan_type_id)
    .fetch_optional(pool)
    .await
    .context("load default loan type version")?
    .ok_or_else(|| {
        AppError::NotFound(format!(
            "No active default version configured for loan type {}",
            loan_type_id
        ))
    })?;

    let forms = sqlx::query_as::<_, LoanTypeForm>(
        "SELECT * FROM loan_type_forms \
         WHERE loan_type_version_id = $1 AND is_active = TRUE AND deleted_at IS NULL \
         ORDER BY sort_order, id",
    )
    .bind(version.id)
    .fetch_all(pool)
    .await
    .context("load loan type forms")?;

    let form_ids: Vec<i64> = forms.iter().map(|form| form.id).collect();
    let inputs = sqlx::query_as::<_, LoanTypeVersionFormInput>(
        "SELECT * FROM loan_type_version_form_inputs \
         WHERE loan_type_form_id = ANY($1) AND is_active = TRUE AND deleted_at IS NULL \
         ORDER BY sort_order, id",
    )
    .bind(&form_ids)
    .fetch_all(pool)
    .await
    .context("load form inputs")?;

    let forms = forms
        .into_iter()
        .map(|form| {
            let inputs = inputs
                .iter()
                .filter(|input| input.loan_type_form_id == form.id)
                .cloned()
                .collect();
            CatalogForm { form, inputs }
        })
        .collect();

    Ok(FormCatalog { version, forms })
}
