use crate::catalog::FormCatalog;
use crate::models::LoanStatus;
use std::collections::HashMap;

/// Determines whether every required, active input of every required,
/// active form in the catalog has at least one non-empty submitted value
/// (whitespace-trimmed) across all repeat indices.
pub fn is_application_complete<'a, I>(catalog: &FormCatalog, answers: I) -> bool
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    // key -> has at least one non-empty value across indices
    let mut filled: HashMap<&str, bool> = HashMap::new();
    for (key, value) in answers {
        let entry = filled.entry(key).or_insert(false);
        *entry = *entry || !value.trim().is_empty();
    }

    for entry in &catalog.forms {
        if !entry.form.is_required || !entry.form.is_active {
            continue;
        }

        for input in &entry.inputs {
            if !input.is_required || !input.is_active {
                continue;
            }

            if !filled.get(input.code.as_str()).copied().unwrap_or(false) {
                return false;
            }
        }
    }

    true
}

/// Status transition rule evaluated after every data save.
///
/// Empty data returns the loan to `pending`; a complete application with
/// both computed fields present becomes `completed`; everything else is
/// `on_progress`.
pub fn next_status(
    data_count: usize,
    complete: bool,
    credit_score: Option<i32>,
    identity_verified: Option<bool>,
) -> LoanStatus {
    if data_count == 0 {
        LoanStatus::Pending
    } else if complete && credit_score.is_some() && identity_verified.is_some() {
        LoanStatus::Completed
    } else {
        LoanStatus::OnProgress
    }
}

/// Regenerates the human-readable observation for a post-save status.
///
/// Terminal statuses are worded by the decision evaluator, not here.
pub fn status_observation(
    status: LoanStatus,
    credit_score: Option<i32>,
    identity_verified: Option<bool>,
) -> String {
    match status {
        LoanStatus::Pending => "Application created, awaiting data".to_string(),
        LoanStatus::OnProgress => {
            "Partial data saved, complete missing information".to_string()
        }
        LoanStatus::Completed => {
            let mut observation = "Application completed.".to_string();
            if let Some(score) = credit_score {
                observation.push_str(&format!(" Credit score: {}.", score));
            }
            if let Some(verified) = identity_verified {
                if verified {
                    observation.push_str(" Identity verification: successful.");
                } else {
                    observation.push_str(" Identity verification: failed.");
                }
            }
            observation
        }
        LoanStatus::Approved | LoanStatus::Rejected => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogForm, FormCatalog};
    use crate::models::{LoanTypeForm, LoanTypeVersion, LoanTypeVersionFormInput};
    use chrono::Utc;
    use serde_json::json;

    fn version() -> LoanTypeVersion {
        let now = Utc::now();
        LoanTypeVersion {
            id: 1,
            loan_type_id: 1,
            version: "v1".to_string(),
            description: String::new(),
            is_active: true,
            is_default: true,
            config: json!({}),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn form(id: i64, code: &str, is_required: bool) -> LoanTypeForm {
        let now = Utc::now();
        LoanTypeForm {
            id,
            loan_type_version_id: 1,
            label: code.to_string(),
            code: code.to_string(),
            description: String::new(),
            sort_order: id as i32,
            is_required,
            is_active: true,
            config: json!({}),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn input(form_id: i64, code: &str, is_required: bool) -> LoanTypeVersionFormInput {
        let now = Utc::now();
        LoanTypeVersionFormInput {
            id: 0,
            loan_type_form_id: form_id,
            label: code.to_string(),
            code: code.to_string(),
            input_type: "text".to_string(),
            placeholder: String::new(),
            default_value: String::new(),
            validation_rules: json!({}),
            options: json!([]),
            sort_order: 0,
            is_required,
            is_active: true,
            config: json!({}),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn two_form_catalog() -> FormCatalog {
        FormCatalog {
            version: version(),
            forms: vec![
                CatalogForm {
                    form: form(1, "personal", true),
                    inputs: vec![
                        input(1, "full_name", true),
                        input(1, "nickname", false),
                    ],
                },
                CatalogForm {
                    form: form(2, "financial", true),
                    inputs: vec![input(2, "monthly_income", true)],
                },
            ],
        }
    }

    #[test]
    fn complete_when_all_required_inputs_filled() {
        let catalog = two_form_catalog();
        let answers = [("full_name", "Maria Lopez"), ("monthly_income", "5000000")];
        assert!(is_application_complete(&catalog, answers));
    }

    #[test]
    fn incomplete_when_a_required_input_is_missing() {
        let catalog = two_form_catalog();
        let answers = [("full_name", "Maria Lopez")];
        assert!(!is_application_complete(&catalog, answers));
    }

    #[test]
    fn whitespace_only_values_do_not_count() {
        let catalog = two_form_catalog();
        let answers = [("full_name", "Maria Lopez"), ("monthly_income", "   ")];
        assert!(!is_application_complete(&catalog, answers));
    }

    #[test]
    fn one_non_empty_index_satisfies_a_repeated_input() {
        let catalog = two_form_catalog();
        // Same key submitted twice (repeatable group); one blank, one filled.
        let answers = [
            ("full_name", "Maria Lopez"),
            ("monthly_income", ""),
            ("monthly_income", "5000000"),
        ];
        assert!(is_application_complete(&catalog, answers));
    }

    #[test]
    fn optional_forms_and_inputs_are_ignored() {
        let mut catalog = two_form_catalog();
        catalog.forms[1].form.is_required = false;
        let answers = [("full_name", "Maria Lopez")];
        assert!(is_application_complete(&catalog, answers));
    }

    #[test]
    fn transition_rules_cover_all_branches() {
        assert_eq!(next_status(0, false, None, None), LoanStatus::Pending);
        assert_eq!(next_status(3, false, Some(700), Some(true)), LoanStatus::OnProgress);
        assert_eq!(next_status(3, true, None, Some(true)), LoanStatus::OnProgress);
        assert_eq!(next_status(3, true, Some(700), None), LoanStatus::OnProgress);
        assert_eq!(next_status(3, true, Some(700), Some(false)), LoanStatus::Completed);
    }

    #[test]
    fn observations_follow_the_status() {
        assert_eq!(
            status_observation(LoanStatus::Pending, None, None),
            "Application created, awaiting data"
        );
        assert_eq!(
            status_observation(LoanStatus::OnProgress, Some(500), None),
            "Partial data saved, complete missing information"
        );
        assert_eq!(
            status_observation(LoanStatus::Completed, Some(720), Some(true)),
            "Application completed. Credit score: 720. Identity verification: successful."
        );
        assert_eq!(
            status_observation(LoanStatus::Completed, Some(320), Some(false)),
            "Application completed. Credit score: 320. Identity verification: failed."
        );
    }
}
