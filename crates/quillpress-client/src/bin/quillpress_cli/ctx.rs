use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use quillpress_client::{AdminClient, ClientError, FetchClient, FetchError, FetchState, SessionHandle};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("site URL is required (use --site or QUILLPRESS_SITE_URL)")]
    MissingSite,
    #[error("session token is required (use --token-file or QUILLPRESS_TOKEN)")]
    MissingToken,
    #[error("password is required (set QUILLPRESS_PASSWORD)")]
    MissingPassword,
    #[error("failed to read token file: {0}")]
    TokenFile(std::io::Error),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("not found")]
    NotFound,
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub struct Ctx {
    pub fetch: Arc<FetchClient>,
    pub admin: AdminClient,
}

impl Ctx {
    pub fn new(site: &str, token: Option<String>) -> Result<Self, CliError> {
        let fetch = Arc::new(FetchClient::new(site)?);
        let admin = AdminClient::new(fetch.clone(), SessionHandle::resolved(token));
        Ok(Self { fetch, admin })
    }

    pub fn require_token(&self) -> Result<(), CliError> {
        match self.admin.session().current().token() {
            Some(_) => Ok(()),
            None => Err(CliError::MissingToken),
        }
    }
}

pub fn build_ctx(
    site: Option<&str>,
    token_file: Option<&PathBuf>,
    token_env: Option<&str>,
) -> Result<Ctx, CliError> {
    let site = site.ok_or(CliError::MissingSite)?;
    Ctx::new(site, token_from_cli(token_file, token_env)?)
}

fn token_from_cli(
    file: Option<&PathBuf>,
    env_token: Option<&str>,
) -> Result<Option<String>, CliError> {
    if let Some(path) = file {
        let token = fs::read_to_string(path)
            .map_err(CliError::TokenFile)?
            .trim()
            .to_string();
        return Ok((!token.is_empty()).then_some(token));
    }
    Ok(env_token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string))
}

/// Turns a cached read into a printable value or an error.
pub fn settle<T>(state: FetchState<T>) -> Result<T, CliError> {
    match state {
        FetchState::Ready(data) => Ok(data),
        FetchState::NotFound => Err(CliError::NotFound),
        FetchState::Failed(err) => Err(CliError::Fetch(err)),
        FetchState::Loading => Err(CliError::MissingToken),
    }
}
