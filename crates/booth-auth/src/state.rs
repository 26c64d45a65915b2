//! CSRF state generation
//!
//! The `state` parameter is an opaque random value round-tripped through the
//! authorization redirect. The flow generates a fresh value per authorize
//! request and rejects any callback whose `state` differs, which prevents an
//! attacker from injecting their own authorization code into our session.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;

/// Generate a cryptographically random CSRF state value.
///
/// 32 random bytes encoded as URL-safe base64 (no padding), 43 characters.
/// The value is single-use: one authorize request, one callback.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_is_url_safe_base64() {
        let state = generate_state();
        // 32 bytes → 43 base64url chars (no padding)
        assert_eq!(state.len(), 43);
        assert!(
            state
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "state must be URL-safe base64 (no padding): {state}"
        );
    }

    #[test]
    fn states_are_unique() {
        let a = generate_state();
        let b = generate_state();
        assert_ne!(a, b, "two state values must not collide");
    }
}
