//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest identity accepted at connection time.
pub const MAX_IDENTITY_LEN: usize = 64;

/// Validates a participant identity supplied during the WebSocket handshake.
///
/// # Examples
///
/// ```ignore
/// validate_identity("alice")   // Ok
/// validate_identity("   ")     // Err - blank
/// validate_identity("a\tb")    // Err - control character
/// ```
pub fn validate_identity(identity: &str) -> Result<(), ValidationError> {
    if identity.trim().is_empty() {
        let mut err = ValidationError::new("identity_blank");
        err.message = Some("Participant identity must not be blank".into());
        return Err(err);
    }

    let len = identity.chars().count();
    if len > MAX_IDENTITY_LEN {
        let mut err = ValidationError::new("identity_length");
        err.message = Some(
            format!("Participant identity must be at most {MAX_IDENTITY_LEN} characters (got {len})")
                .into(),
        );
        return Err(err);
    }

    if identity.chars().any(char::is_control) {
        let mut err = ValidationError::new("identity_format");
        err.message = Some("Participant identity must not contain control characters".into());
        return Err(err);
    }

    Ok(())
}
