use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

const JOIN_CODE_BYTES: usize = 6;

/// Eight URL-safe characters drawn from 48 random bits.
pub(crate) fn generate_join_code() -> String {
    let mut bytes = [0u8; JOIN_CODE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub(crate) fn join_link(api_prefix: &str, join_code: &str) -> String {
    format!("{}/tests/join/{join_code}", api_prefix.trim_end_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_code_is_url_safe_and_unpadded() {
        let code = generate_join_code();
        assert_eq!(code.len(), 8);
        assert!(code.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_'));
        assert_ne!(code, generate_join_code());
    }

    #[test]
    fn join_link_uses_api_prefix() {
        assert_eq!(join_link("/api/v1", "abcDEF12"), "/api/v1/tests/join/abcDEF12");
        assert_eq!(join_link("/api/v1/", "x"), "/api/v1/tests/join/x");
    }
}
