//! HTTP adapter for the hosted session provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;

use crate::application::session::{SessionError, SessionProvider, SessionUser};

#[derive(Debug, Deserialize)]
struct UserBody {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ProviderErrorBody {
    fn into_message(self, status: StatusCode) -> String {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_else(|| format!("session rejected with status {status}"))
    }
}

/// Verifies tokens with `GET {provider}/auth/v1/user`.
#[derive(Clone, Debug)]
pub struct HttpSessionProvider {
    client: Client,
    user_endpoint: Url,
    service_key: String,
}

impl HttpSessionProvider {
    pub fn new(provider_url: &Url, service_key: &str, timeout: Duration) -> Result<Self, SessionError> {
        let user_endpoint = provider_url
            .join("auth/v1/user")
            .map_err(|err| SessionError::Unavailable(err.to_string()))?;
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("quillpress/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| SessionError::Unavailable(err.to_string()))?;

        Ok(Self {
            client,
            user_endpoint,
            service_key: service_key.to_string(),
        })
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn verify(&self, token: &str) -> Result<SessionUser, SessionError> {
        let response = self
            .client
            .get(self.user_endpoint.clone())
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|err| SessionError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(SessionError::Unavailable(format!(
                "session provider returned {status}"
            )));
        }
        if !status.is_success() {
            let body = response
                .json::<ProviderErrorBody>()
                .await
                .unwrap_or_default();
            return Err(SessionError::Rejected(body.into_message(status)));
        }

        let user = response
            .json::<UserBody>()
            .await
            .map_err(|err| SessionError::Unavailable(err.to_string()))?;

        Ok(SessionUser {
            id: user.id,
            email: user.email,
        })
    }
}
