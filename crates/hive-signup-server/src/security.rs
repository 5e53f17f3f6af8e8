//! Bearer-token checks for the admin and metrics endpoints.

use actix_web::HttpRequest;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Constant-time byte comparison that does not leak input lengths or content.
///
/// Both inputs are hashed to fixed-length SHA-256 digests before the
/// `subtle` comparison.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha.ct_eq(&hb).into()
}

/// `Authorization: Bearer <token>` value, if present.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Whether the request carries `expected` as its bearer token.
pub fn has_bearer(req: &HttpRequest, expected: &str) -> bool {
    bearer_token(req)
        .map(|token| constant_time_eq(token.as_bytes(), expected.as_bytes()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn equal_inputs_match() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn different_inputs_do_not_match() {
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"much longer string"));
    }

    #[test]
    fn bearer_header_is_checked() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer s3cret"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("s3cret"));
        assert!(has_bearer(&req, "s3cret"));
        assert!(!has_bearer(&req, "other"));

        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic s3cret"))
            .to_http_request();
        assert!(!has_bearer(&req, "s3cret"));
        assert!(!has_bearer(&TestRequest::default().to_http_request(), "s3cret"));
    }
}
