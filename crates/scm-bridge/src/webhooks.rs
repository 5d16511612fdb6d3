//! Inbound webhook authenticity checks.
//!
//! Each provider authenticates deliveries differently: GitHub signs the raw
//! body with HMAC-SHA256, GitLab sends a static token header, Azure DevOps
//! sends HTTP Basic credentials. All comparisons are constant-time.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Signature header prefix GitHub uses for SHA-256 signatures.
const GITHUB_SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a GitHub webhook signature.
///
/// # Arguments
/// * `secret` - Webhook signing secret
/// * `body` - Raw webhook body bytes
/// * `signature_header` - Value of the `x-hub-signature-256` header,
///   expected as `sha256=<hex>`
///
/// # Returns
/// `true` if the signature is valid, `false` otherwise
#[must_use]
pub fn verify_github_signature(secret: &str, body: &[u8], signature_header: &str) -> bool {
    let Some(signature_hex) = signature_header.strip_prefix(GITHUB_SIGNATURE_PREFIX) else {
        return false;
    };

    let Ok(signature_bytes) = hex::decode(signature_hex) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    let computed = mac.finalize().into_bytes();

    // Constant-time comparison to prevent timing attacks
    computed.as_slice().ct_eq(&signature_bytes).into()
}

/// Verify a GitLab webhook token. Exact match, case-sensitive, no trimming.
#[must_use]
pub fn verify_gitlab_token(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Verify HTTP Basic credentials from an `Authorization` header value against
/// the expected username and password.
#[must_use]
pub fn verify_basic_auth(expected_user: &str, expected_password: &str, header: &str) -> bool {
    let Some(encoded) = header.strip_prefix("Basic ") else {
        return false;
    };

    let Ok(decoded) = BASE64.decode(encoded) else {
        return false;
    };
    let Ok(credentials) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((username, password)) = credentials.split_once(':') else {
        return false;
    };

    let user_ok: bool = username.as_bytes().ct_eq(expected_user.as_bytes()).into();
    let password_ok: bool = password
        .as_bytes()
        .ct_eq(expected_password.as_bytes())
        .into();
    user_ok && password_ok
}
