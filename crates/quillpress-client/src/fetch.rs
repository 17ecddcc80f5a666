//! Keyed read cache with in-flight de-duplication.
//!
//! Every read is keyed by `(endpoint, token)`. Concurrent reads of one key await a
//! single shared request, and a forced revalidation supersedes whatever request is
//! still running for that key: only the newest request may write the cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::{Client, StatusCode, Url};
use serde::de::{Deserialize, DeserializeOwned};
use serde_json::Value;
use tracing::debug;

use crate::error::{ClientError, FetchError, message_from_body};
use crate::gate::Credentials;

const TARGET: &str = "quillpress_client::fetch";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// No request is issued until a token is available.
    Required,
    Public,
}

/// What a reader sees for one key.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Loading,
    NotFound,
    Ready(T),
    Failed(FetchError),
}

impl<T> FetchState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading)
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            FetchState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            FetchState::Ready(data) => Some(data),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchState::Failed(err) => Some(err),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> FetchState<U> {
        match self {
            FetchState::Loading => FetchState::Loading,
            FetchState::NotFound => FetchState::NotFound,
            FetchState::Ready(data) => FetchState::Ready(f(data)),
            FetchState::Failed(err) => FetchState::Failed(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    endpoint: String,
    token: Option<String>,
}

/// Parsed body of a successful read; `None` records a 404.
type Body = Option<Arc<Value>>;
type InFlight = Shared<BoxFuture<'static, Result<Body, FetchError>>>;

pub struct FetchClient {
    http: Client,
    base: Url,
    cache: DashMap<CacheKey, Body>,
    in_flight: DashMap<CacheKey, (u64, InFlight)>,
    generation: AtomicU64,
}

impl FetchClient {
    pub fn new(site: &str) -> Result<Self, ClientError> {
        let base = Url::parse(site)?.join("/")?;
        let http = Client::builder().user_agent(user_agent()).build()?;
        Ok(Self::with_client(http, base))
    }

    pub fn with_client(http: Client, base: Url) -> Self {
        Self {
            http,
            base,
            cache: DashMap::new(),
            in_flight: DashMap::new(),
            generation: AtomicU64::new(0),
        }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Returns the cached value for the key or loads it.
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        endpoint: Option<&str>,
        mode: AuthMode,
        credentials: &Credentials,
    ) -> FetchState<T> {
        let Some(key) = cache_key(endpoint, mode, credentials) else {
            return FetchState::Loading;
        };

        if let Some(body) = self.cache.get(&key).map(|entry| entry.value().clone()) {
            debug!(target = TARGET, endpoint = %key.endpoint, "cache hit");
            return decode(body);
        }

        settle(self.load(key, false).await)
    }

    /// Re-runs the request for the key and replaces the cached value.
    pub async fn revalidate<T: DeserializeOwned>(
        &self,
        endpoint: Option<&str>,
        mode: AuthMode,
        credentials: &Credentials,
    ) -> FetchState<T> {
        let Some(key) = cache_key(endpoint, mode, credentials) else {
            return FetchState::Loading;
        };

        settle(self.load(key, true).await)
    }

    /// Cached value for the key without touching the network.
    pub fn cached<T: DeserializeOwned>(
        &self,
        endpoint: Option<&str>,
        mode: AuthMode,
        credentials: &Credentials,
    ) -> Option<FetchState<T>> {
        let key = cache_key(endpoint, mode, credentials)?;
        let body = self.cache.get(&key).map(|entry| entry.value().clone())?;
        Some(decode(body))
    }

    /// Drops every cached token variant of `endpoint`. Requests already running for
    /// it still answer their waiters but no longer write the cache.
    pub fn invalidate(&self, endpoint: &str) {
        self.in_flight.retain(|key, _| key.endpoint != endpoint);
        self.cache.retain(|key, _| key.endpoint != endpoint);
    }

    pub fn clear(&self) {
        self.in_flight.clear();
        self.cache.clear();
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    async fn load(&self, key: CacheKey, force: bool) -> Result<Body, FetchError> {
        let (generation, request) = self.join_or_start(&key, force)?;
        let outcome = request.await;

        let latest = self
            .in_flight
            .remove_if(&key, |_, (current, _)| *current == generation)
            .is_some();
        if latest {
            if let Ok(body) = &outcome {
                self.cache.insert(key, body.clone());
            }
        }

        outcome
    }

    fn join_or_start(&self, key: &CacheKey, force: bool) -> Result<(u64, InFlight), FetchError> {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) if !force => {
                let (generation, request) = entry.get();
                debug!(target = TARGET, endpoint = %key.endpoint, "joining in-flight request");
                Ok((*generation, request.clone()))
            }
            entry => {
                let url = self
                    .base
                    .join(&key.endpoint)
                    .map_err(|err| FetchError::Endpoint(err.to_string()))?;
                let generation = self.generation.fetch_add(1, Ordering::Relaxed);
                let request = send(self.http.clone(), url, key.token.clone())
                    .boxed()
                    .shared();
                debug!(
                    target = TARGET,
                    endpoint = %key.endpoint,
                    generation,
                    "starting request"
                );

                match entry {
                    Entry::Occupied(mut occupied) => {
                        occupied.insert((generation, request.clone()));
                    }
                    Entry::Vacant(vacant) => {
                        vacant.insert((generation, request.clone()));
                    }
                }
                Ok((generation, request))
            }
        }
    }
}

pub(crate) fn user_agent() -> &'static str {
    concat!("quillpress-client/", env!("CARGO_PKG_VERSION"))
}

fn cache_key(endpoint: Option<&str>, mode: AuthMode, credentials: &Credentials) -> Option<CacheKey> {
    let endpoint = endpoint?;
    let token = match mode {
        AuthMode::Public => None,
        AuthMode::Required => Some(credentials.token()?.to_string()),
    };
    Some(CacheKey {
        endpoint: endpoint.to_string(),
        token,
    })
}

async fn send(http: Client, url: Url, token: Option<String>) -> Result<Body, FetchError> {
    let mut request = http.get(url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|err| FetchError::Transport(err.to_string()))?;
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Ok(None);
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|err| FetchError::Transport(err.to_string()))?;
    if !status.is_success() {
        return Err(FetchError::Status {
            status: status.as_u16(),
            message: message_from_body(&bytes),
        });
    }

    let value: Value =
        serde_json::from_slice(&bytes).map_err(|err| FetchError::Decode(err.to_string()))?;
    Ok(Some(Arc::new(value)))
}

fn decode<T: DeserializeOwned>(body: Body) -> FetchState<T> {
    match body {
        None => FetchState::NotFound,
        Some(value) => match <T as Deserialize>::deserialize(value.as_ref()) {
            Ok(data) => FetchState::Ready(data),
            Err(err) => FetchState::Failed(FetchError::Decode(err.to_string())),
        },
    }
}

fn settle<T: DeserializeOwned>(outcome: Result<Body, FetchError>) -> FetchState<T> {
    match outcome {
        Ok(body) => decode(body),
        Err(err) => FetchState::Failed(err),
    }
}
