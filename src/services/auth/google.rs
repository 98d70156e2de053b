use color_eyre::eyre::{Context, Result, bail};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::ports::google::{GoogleIdentity, GoogleTokenVerifier};

const TOKEN_INFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Fields of Google's tokeninfo response. Booleans arrive as strings.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
}

fn identity_from(info: TokenInfo, client_id: Option<&str>) -> Result<GoogleIdentity> {
    if let Some(client_id) = client_id {
        if info.aud != client_id {
            bail!("ID token was issued for a different client");
        }
    }
    if info.email_verified.as_deref() != Some("true") {
        bail!("Google account email is not verified");
    }
    let Some(email) = info.email.filter(|e| !e.is_empty()) else {
        bail!("ID token carries no email address");
    };
    Ok(GoogleIdentity {
        subject: info.sub,
        email,
        name: info.name,
    })
}

/// Verifies ID tokens with Google's tokeninfo endpoint.
pub struct GoogleTokenInfoAdapter {
    client: Client,
    client_id: Option<String>,
}

impl GoogleTokenInfoAdapter {
    /// Without a client id the audience is not checked.
    pub fn new(client_id: Option<String>) -> Self {
        Self {
            client: Client::new(),
            client_id,
        }
    }
}

#[async_trait::async_trait]
impl GoogleTokenVerifier for GoogleTokenInfoAdapter {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity> {
        let url = Url::parse_with_params(TOKEN_INFO_URL, &[("id_token", id_token)])?;
        let info = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()
            .wrap_err("Google rejected the ID token")?
            .json::<TokenInfo>()
            .await
            .wrap_err("Failed to parse Google tokeninfo response")?;
        identity_from(info, self.client_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(aud: &str, verified: &str) -> TokenInfo {
        TokenInfo {
            aud: aud.into(),
            sub: "1234".into(),
            email: Some("someone@example.com".into()),
            email_verified: Some(verified.into()),
            name: Some("Someone".into()),
        }
    }

    #[test]
    fn test_identity_from_valid_info() {
        let identity = identity_from(info("client", "true"), Some("client")).unwrap();
        assert_eq!(identity.subject, "1234");
        assert_eq!(identity.email, "someone@example.com");
    }

    #[test]
    fn test_audience_mismatch() {
        assert!(identity_from(info("other", "true"), Some("client")).is_err());
        assert!(identity_from(info("other", "true"), None).is_ok());
    }

    #[test]
    fn test_unverified_email() {
        assert!(identity_from(info("client", "false"), Some("client")).is_err());
    }
}
