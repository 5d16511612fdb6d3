//! GitHub App authentication.
//!
//! A GitHub App authenticates with an RS256-signed JWT, then exchanges it for
//! a short-lived installation access token scoped to one installation. All
//! repository-level calls use the installation token as a Bearer credential.

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::providers::ProviderError;

/// Backdate applied to `iat` to absorb clock skew between us and GitHub.
const JWT_BACKDATE_SECS: i64 = 60;

/// JWT lifetime. GitHub rejects App JWTs living longer than 10 minutes.
const JWT_LIFETIME_SECS: i64 = 9 * 60;

#[derive(Serialize)]
struct Claims {
    iat: i64,
    exp: i64,
    iss: String,
}

#[derive(Deserialize)]
struct InstallationToken {
    token: String,
}

/// App-level credentials used to mint installation tokens.
pub(super) struct AppAuth<'a> {
    pub app_id: &'a str,
    pub private_key: &'a str,
    pub installation_id: &'a str,
    pub api_url: &'a str,
}

impl AppAuth<'_> {
    /// Sign the App JWT.
    fn app_jwt(&self) -> Result<String, ProviderError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            iat: now - JWT_BACKDATE_SECS,
            exp: now + JWT_LIFETIME_SECS,
            iss: self.app_id.to_string(),
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes())
            .map_err(|e| ProviderError::Auth(format!("invalid GitHub App private key: {e}")))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| ProviderError::Auth(format!("failed to sign App JWT: {e}")))
    }

    /// Exchange the App JWT for an installation access token.
    pub async fn installation_token(
        &self,
        client: &reqwest::Client,
    ) -> Result<String, ProviderError> {
        let jwt = self.app_jwt()?;
        let url = format!(
            "{}/app/installations/{}/access_tokens",
            self.api_url, self.installation_id
        );
        debug!(installation_id = %self.installation_id, "Requesting installation access token");

        let response = client.post(&url).bearer_auth(jwt).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Auth(format!(
                "installation token request failed: {status} - {text}"
            )));
        }

        let token: InstallationToken = serde_json::from_str(&text)?;
        Ok(token.token)
    }
}
