use crate::interface::clock::Clock;
use crate::model::error::token::TokenRefreshError;
use crate::model::target::{Credentials, TargetKind};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct RefreshOutcome {
    pub credentials: Credentials,
    pub refreshed: bool,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

pub struct CredentialRefresher {
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
    margin_millis: i64,
    google_token_url: String,
    dropbox_token_url: String,
}

impl CredentialRefresher {
    pub fn new(
        client: reqwest::Client,
        clock: Arc<dyn Clock>,
        margin_seconds: i64,
        google_token_url: impl Into<String>,
        dropbox_token_url: impl Into<String>,
    ) -> Self {
        Self {
            client,
            clock,
            margin_millis: margin_seconds.saturating_mul(1000),
            google_token_url: google_token_url.into(),
            dropbox_token_url: dropbox_token_url.into(),
        }
    }

    /// Returns credentials whose access token is valid for at least the
    /// refresh margin, exchanging the refresh token when it is not.
    pub async fn ensure_fresh(
        &self,
        kind: TargetKind,
        credentials: &Credentials,
    ) -> Result<RefreshOutcome, TokenRefreshError> {
        let token_url = match kind {
            TargetKind::GoogleDrive => &self.google_token_url,
            TargetKind::Dropbox => &self.dropbox_token_url,
            other => return Err(TokenRefreshError::UnsupportedProvider(other.as_str())),
        };
        let refresh_token = required("refreshToken", &credentials.refresh_token)?;
        let client_id = required("clientId", &credentials.client_id)?;
        let client_secret = required("clientSecret", &credentials.client_secret)?;
        let expires_at = credentials
            .expires_at
            .ok_or_else(|| TokenRefreshError::MissingField("expiresAt"))?;

        let now = self.clock.now_millis();
        if expires_at.saturating_sub(now) >= self.margin_millis {
            return Ok(RefreshOutcome {
                credentials: credentials.clone(),
                refreshed: false,
            });
        }

        let response = self
            .client
            .post(token_url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(TokenRefreshError::RequestFailed)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenRefreshError::Rejected(status.as_u16(), body));
        }
        let token = response
            .json::<TokenResponse>()
            .await
            .map_err(TokenRefreshError::InvalidResponse)?;

        let expires_at = token
            .expires_in
            .checked_mul(1000)
            .and_then(|lifetime| now.checked_add(lifetime))
            .ok_or_else(|| {
                TokenRefreshError::InvalidResponse(format!("expires_in {} is out of range", token.expires_in))
            })?;

        let mut refreshed = credentials.clone();
        refreshed.access_token = Some(token.access_token);
        refreshed.expires_at = Some(expires_at);
        if let Some(refresh_token) = token.refresh_token {
            refreshed.refresh_token = Some(refresh_token);
        }
        Ok(RefreshOutcome {
            credentials: refreshed,
            refreshed: true,
        })
    }
}

fn required<'a>(field: &str, value: &'a Option<String>) -> Result<&'a str, TokenRefreshError> {
    match value.as_deref() {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(TokenRefreshError::MissingField(field)),
    }
}
