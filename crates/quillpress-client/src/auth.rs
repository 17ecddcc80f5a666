//! Email/password sign-in against the hosted session provider.

use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ClientError, message_from_body};
use crate::fetch::user_agent;
use crate::gate::SessionHandle;

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(default)]
    access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    /// The provider issued a session straight away.
    SignedIn,
    /// The provider sent a confirmation mail; no session yet.
    ConfirmationSent,
}

#[derive(Clone, Debug)]
pub struct AuthClient {
    http: Client,
    provider: Url,
    api_key: String,
}

impl AuthClient {
    pub fn new(provider_url: &str, api_key: impl Into<String>) -> Result<Self, ClientError> {
        let mut provider = Url::parse(provider_url)?;
        if !provider.path().ends_with('/') {
            let path = format!("{}/", provider.path());
            provider.set_path(&path);
        }
        let http = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self {
            http,
            provider,
            api_key: api_key.into(),
        })
    }

    /// Exchanges email and password for a session token and publishes it on `session`.
    pub async fn sign_in(
        &self,
        session: &SessionHandle,
        email: &str,
        password: &str,
    ) -> Result<String, ClientError> {
        let mut url = self.provider.join("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;
        let body = token_body(response).await?;
        let token = body
            .access_token
            .ok_or_else(|| ClientError::Auth("provider returned no access token".to_string()))?;

        session.resolve(Some(token.clone()));
        info!(target = "quillpress_client::auth", "signed in");
        Ok(token)
    }

    /// Registers a new account. `redirect_to` is where the confirmation mail links back to.
    pub async fn sign_up(
        &self,
        session: &SessionHandle,
        email: &str,
        password: &str,
        redirect_to: Option<&str>,
    ) -> Result<SignUpOutcome, ClientError> {
        let mut url = self.provider.join("auth/v1/signup")?;
        if let Some(redirect) = redirect_to {
            url.query_pairs_mut().append_pair("redirect_to", redirect);
        }

        let response = self
            .http
            .post(url)
            .header("apikey", &self.api_key)
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;
        let body = token_body(response).await?;

        match body.access_token {
            Some(token) => {
                session.resolve(Some(token));
                Ok(SignUpOutcome::SignedIn)
            }
            None => Ok(SignUpOutcome::ConfirmationSent),
        }
    }

    pub fn sign_out(&self, session: &SessionHandle) {
        session.sign_out();
    }
}

async fn token_body(response: Response) -> Result<TokenBody, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(ClientError::Auth(message_from_body(&bytes)));
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| ClientError::Auth(format!("failed to parse provider response: {err}")))
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use serde_json::json;

    use super::*;
    use crate::gate::Credentials;

    #[tokio::test]
    async fn sign_in_resolves_session() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/auth/v1/token")
                    .query_param("grant_type", "password")
                    .header("apikey", "anon");
                then.status(200)
                    .json_body(json!({"access_token": "jwt", "token_type": "bearer"}));
            })
            .await;

        let auth = AuthClient::new(&server.base_url(), "anon").expect("client");
        let session = SessionHandle::new();
        let token = auth
            .sign_in(&session, "a@example.com", "secret")
            .await
            .expect("signed in");

        assert_eq!(token, "jwt");
        assert_eq!(session.current(), Credentials::Resolved(Some("jwt".into())));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_sign_in_keeps_session_untouched() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST").path("/auth/v1/token");
                then.status(400).json_body(json!({
                    "error": "invalid_grant",
                    "error_description": "Invalid login credentials"
                }));
            })
            .await;

        let auth = AuthClient::new(&server.base_url(), "anon").expect("client");
        let session = SessionHandle::new();
        let err = auth
            .sign_in(&session, "a@example.com", "wrong")
            .await
            .expect_err("rejected");

        assert!(matches!(err, ClientError::Auth(ref message) if message == "Invalid login credentials"));
        assert!(session.current().is_pending());
    }

    #[tokio::test]
    async fn sign_up_without_session_reports_confirmation() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/auth/v1/signup")
                    .query_param("redirect_to", "https://blog.example.test/admin");
                then.status(200)
                    .json_body(json!({"id": "u1", "email": "a@example.com"}));
            })
            .await;

        let auth = AuthClient::new(&server.base_url(), "anon").expect("client");
        let session = SessionHandle::new();
        let outcome = auth
            .sign_up(
                &session,
                "a@example.com",
                "secret",
                Some("https://blog.example.test/admin"),
            )
            .await
            .expect("signed up");

        assert_eq!(outcome, SignUpOutcome::ConfirmationSent);
        assert!(session.current().is_pending());
    }
}
