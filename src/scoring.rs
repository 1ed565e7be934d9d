use crate::errors::AppError;
use crate::models::User;
use rand::Rng;

/// Lower bound of the simulated score range.
pub const MIN_SCORE: i32 = 300;
/// Upper bound of the simulated score range.
pub const MAX_SCORE: i32 = 850;
/// Maximum absolute jitter applied on top of the base score.
pub const MAX_JITTER: i32 = 25;

/// Maps the last digit of the document number to a score band.
///
/// Stand-in for an external bureau call; the digit-to-band mapping is part
/// of the contract so tests can pin expected scores:
/// {0,1} -> 300..350, {2,3,4} -> 400..500, {5,6,7} -> 550..650,
/// {8,9} -> 700..750. Non-digit or empty input stays at the base of 300.
pub fn base_score(document_number: &str) -> i32 {
    let Some(digit) = document_number
        .chars()
        .last()
        .and_then(|c| c.to_digit(10))
    else {
        return MIN_SCORE;
    };

    let digit = digit as i32;
    match digit {
        0 | 1 => 300 + digit * 50,
        2..=4 => 400 + (digit - 2) * 50,
        5..=7 => 550 + (digit - 5) * 50,
        _ => 700 + (digit - 8) * 50,
    }
}

/// Applies a fixed jitter to the base score and clamps to the valid range.
pub fn score_with_jitter(document_number: &str, jitter: i32) -> i32 {
    (base_score(document_number) + jitter).clamp(MIN_SCORE, MAX_SCORE)
}

/// Simulates a credit bureau lookup for a document.
///
/// The RNG is injected so callers can pin the jitter in tests; production
/// callers pass `rand::thread_rng()`. The document type does not influence
/// the simulated score.
pub fn simulate_credit_score<R: Rng>(
    _document_type: &str,
    document_number: &str,
    rng: &mut R,
) -> i32 {
    let jitter = rng.gen_range(-MAX_JITTER..=MAX_JITTER);
    score_with_jitter(document_number, jitter)
}

/// Verifies the applicant's identity against the registered user record.
///
/// Empty inputs or a missing user record are technical failures, distinct
/// from a verification result of `false`.
pub fn verify_identity(
    registered: Option<&User>,
    document_type: &str,
    document_number: &str,
    full_name: &str,
) -> Result<bool, AppError> {
    if document_type.is_empty() || document_number.is_empty() || full_name.is_empty() {
        return Err(AppError::Technical(
            "insufficient data for identity verification".to_string(),
        ));
    }

    let registered = registered.ok_or_else(|| {
        AppError::Technical("could not load registered user data".to_string())
    })?;

    Ok(identity_matches(
        registered,
        document_type,
        document_number,
        full_name,
    ))
}

/// The three identity checks, short-circuiting to `false` on the first
/// mismatch. The registered name only needs to be *contained* in the
/// submitted full name (case-insensitive) to accommodate middle names.
pub fn identity_matches(
    registered: &User,
    document_type: &str,
    document_number: &str,
    full_name: &str,
) -> bool {
    if registered.document_type != document_type {
        return false;
    }

    if registered.document_number != document_number {
        return false;
    }

    let registered_name = registered.name.trim().to_lowercase();
    let submitted_name = full_name.trim().to_lowercase();
    submitted_name.contains(&registered_name)
}
