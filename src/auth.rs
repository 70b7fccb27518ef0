//! OAuth client-credentials authentication with a cached bearer token

use crate::error::{Error, Result};
use crate::token_cache::TokenCache;
use crate::types::Credential;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::{error, info};
use url::Url;

/// Nominal lifetime of a freshly issued token, in hours
pub const TOKEN_LIFETIME_HOURS: i64 = 10;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// A credential together with where it came from
#[derive(Clone, Debug)]
pub struct Obtained {
    /// The credential to use for the rest of the run
    pub credential: Credential,
    /// True if it was served by the token cache
    pub cached: bool,
}

/// Obtains bearer credentials, consulting the token cache first
pub struct Authenticator {
    http_client: reqwest::Client,
    token_url: Url,
    cache: TokenCache,
}

impl Authenticator {
    /// Create an authenticator posting to `token_url`
    pub fn new(http_client: reqwest::Client, token_url: Url, cache: TokenCache) -> Self {
        Self {
            http_client,
            token_url,
            cache,
        }
    }

    /// Return a usable credential for the given client pair
    ///
    /// A valid cached credential is returned without any network call. Otherwise a
    /// client-credentials grant is exchanged and the result cached for
    /// [`TOKEN_LIFETIME_HOURS`].
    ///
    /// # Errors
    /// - [`Error::Config`] if either half of the pair is empty
    /// - [`Error::Auth`] if the endpoint answers anything but 200 with an access token
    /// - [`Error::Network`] if the endpoint cannot be reached
    pub async fn obtain_token(&self, client_id: &str, client_secret: &str) -> Result<Obtained> {
        if client_id.is_empty() || client_secret.is_empty() {
            return Err(Error::Config {
                message: "CLIENT_ID and CLIENT_SECRET must both be set".to_string(),
                key: Some(if client_id.is_empty() {
                    crate::config::CLIENT_ID_KEY.to_string()
                } else {
                    crate::config::CLIENT_SECRET_KEY.to_string()
                }),
            });
        }

        if let Some(credential) = self.cache.load().await? {
            return Ok(Obtained {
                credential,
                cached: true,
            });
        }

        info!(url = %self.token_url, "requesting new access token");
        let response = self
            .http_client
            .post(self.token_url.clone())
            .query(&[
                ("client_id", client_id),
                ("client_secret", client_secret),
                ("grant_type", "client_credentials"),
            ])
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded; charset=UTF-8")
            .body("")
            .send()
            .await
            .map_err(|e| {
                error!(url = %self.token_url, error = %e, "token request failed");
                Error::Network(e)
            })?;

        let status = response.status();
        let body = response.text().await?;

        if status != reqwest::StatusCode::OK {
            error!(status = status.as_u16(), %body, "token request rejected");
            return Err(Error::Auth {
                status: status.as_u16(),
                body,
            });
        }

        let token = serde_json::from_str::<TokenResponse>(&body)
            .ok()
            .and_then(|r| r.access_token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                error!(%body, "token response has no access_token");
                Error::Auth {
                    status: status.as_u16(),
                    body: body.clone(),
                }
            })?;

        let credential = self.cache.save(&token, TOKEN_LIFETIME_HOURS).await?;
        info!(expiry = %credential.expiry, "obtained new access token");

        Ok(Obtained {
            credential,
            cached: false,
        })
    }
}
