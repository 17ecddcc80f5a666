#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use tempfile::TempDir;
use time::{Duration, OffsetDateTime, UtcOffset, macros::datetime};
use tokio::sync::Mutex;

use quillpress::application::admin::categories::AdminCategoryService;
use quillpress::application::admin::posts::AdminPostService;
use quillpress::application::contact::{ContactError, ContactService, ContactSink};
use quillpress::application::feed::FeedService;
use quillpress::application::repos::{
    CategoriesRepo, CategoriesWriteRepo, CreateCategoryParams, CreatePostParams, PostsRepo,
    PostsWriteRepo, RepoError, UpdateCategoryParams, UpdatePostParams,
};
use quillpress::application::session::{SessionError, SessionProvider, SessionUser};
use quillpress::application::thumbnails::ThumbnailResolver;
use quillpress::domain::contact::ContactMessage;
use quillpress::domain::entities::{
    CategoryRecord, CategorySummary, PostRecord, PostWithCategories,
};
use quillpress::infra::db::PostgresRepositories;
use quillpress::infra::http::{ApiState, HttpState, RouterState, build_app};
use quillpress::infra::storage::ObjectStorage;
use quillpress::presentation::views::LayoutChrome;

pub const VALID_TOKEN: &str = "valid-session-token";
pub const OUTAGE_TOKEN: &str = "provider-down";
pub const MAX_UPLOAD_BYTES: u64 = 1024;

#[derive(Default)]
struct StoreState {
    next_post_id: i64,
    next_category_id: i64,
    ticks: i64,
    posts: BTreeMap<i64, PostRecord>,
    categories: BTreeMap<i64, CategoryRecord>,
    links: BTreeSet<(i64, i64)>,
    writes: usize,
}

impl StoreState {
    fn tick(&mut self) -> OffsetDateTime {
        self.ticks += 1;
        datetime!(2026-01-01 00:00 UTC) + Duration::seconds(self.ticks)
    }

    fn check_categories(&self, ids: &[i64]) -> Result<(), RepoError> {
        if ids.iter().all(|id| self.categories.contains_key(id)) {
            Ok(())
        } else {
            Err(RepoError::invalid_input(
                "referenced row does not exist (post_categories_category_id_fkey)",
            ))
        }
    }

    fn with_categories(&self, post: &PostRecord) -> PostWithCategories {
        let categories = self
            .links
            .iter()
            .filter(|(post_id, _)| *post_id == post.id)
            .filter_map(|(_, category_id)| self.categories.get(category_id))
            .map(|category| CategorySummary {
                id: category.id,
                name: category.name.clone(),
            })
            .collect();
        PostWithCategories {
            post: post.clone(),
            categories,
        }
    }

    fn link(&mut self, post_id: i64, category_ids: &[i64]) {
        self.links.retain(|(linked, _)| *linked != post_id);
        for id in category_ids {
            self.links.insert((post_id, *id));
        }
    }
}

/// Repository double that mirrors the Postgres adapter's ordering and cascade rules.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    /// Number of successful mutations since construction.
    pub async fn writes(&self) -> usize {
        self.state.lock().await.writes
    }

    pub async fn link_count(&self) -> usize {
        self.state.lock().await.links.len()
    }

    pub async fn seed_category(&self, name: &str) -> i64 {
        self.create_category(CreateCategoryParams {
            name: name.to_string(),
        })
        .await
        .expect("seed category")
        .id
    }

    pub async fn seed_post(&self, title: &str, key: Option<&str>, categories: &[i64]) -> i64 {
        self.create_post(CreatePostParams {
            title: title.to_string(),
            content: format!("<p>{title} body</p>"),
            thumbnail_image_key: key.map(str::to_string),
            category_ids: categories.to_vec(),
        })
        .await
        .expect("seed post")
        .id
    }
}

#[async_trait]
impl PostsRepo for MemoryStore {
    async fn list_posts(&self) -> Result<Vec<PostWithCategories>, RepoError> {
        let state = self.state.lock().await;
        let mut posts: Vec<_> = state.posts.values().collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(posts
            .into_iter()
            .map(|post| state.with_categories(post))
            .collect())
    }

    async fn find_post(&self, id: i64) -> Result<Option<PostWithCategories>, RepoError> {
        let state = self.state.lock().await;
        Ok(state.posts.get(&id).map(|post| state.with_categories(post)))
    }
}

#[async_trait]
impl PostsWriteRepo for MemoryStore {
    async fn create_post(&self, params: CreatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        state.check_categories(&params.category_ids)?;

        state.next_post_id += 1;
        let now = state.tick();
        let record = PostRecord {
            id: state.next_post_id,
            title: params.title,
            content: params.content,
            thumbnail_image_key: params.thumbnail_image_key,
            created_at: now,
            updated_at: now,
        };
        state.posts.insert(record.id, record.clone());
        state.link(record.id, &params.category_ids);
        state.writes += 1;
        Ok(record)
    }

    async fn update_post(&self, params: UpdatePostParams) -> Result<PostRecord, RepoError> {
        let mut state = self.state.lock().await;
        let Some(current) = state.posts.get(&params.id).cloned() else {
            return Err(RepoError::NotFound);
        };
        state.check_categories(&params.category_ids)?;

        let linked: BTreeSet<i64> = state
            .links
            .iter()
            .filter(|(post_id, _)| *post_id == params.id)
            .map(|(_, category_id)| *category_id)
            .collect();
        let wanted: BTreeSet<i64> = params.category_ids.iter().copied().collect();
        let changed = current.title != params.title
            || current.content != params.content
            || current.thumbnail_image_key != params.thumbnail_image_key
            || linked != wanted;

        let updated_at = if changed { state.tick() } else { current.updated_at };
        let record = PostRecord {
            title: params.title,
            content: params.content,
            thumbnail_image_key: params.thumbnail_image_key,
            updated_at,
            ..current
        };
        state.posts.insert(record.id, record.clone());
        state.link(record.id, &params.category_ids);
        state.writes += 1;
        Ok(record)
    }

    async fn delete_post(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        if state.posts.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        state.links.retain(|(post_id, _)| *post_id != id);
        state.writes += 1;
        Ok(())
    }
}

#[async_trait]
impl CategoriesRepo for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let state = self.state.lock().await;
        let mut categories: Vec<_> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(categories)
    }

    async fn find_category(&self, id: i64) -> Result<Option<CategoryRecord>, RepoError> {
        Ok(self.state.lock().await.categories.get(&id).cloned())
    }
}

#[async_trait]
impl CategoriesWriteRepo for MemoryStore {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.lock().await;
        state.next_category_id += 1;
        let now = state.tick();
        let record = CategoryRecord {
            id: state.next_category_id,
            name: params.name,
            created_at: now,
            updated_at: now,
        };
        state.categories.insert(record.id, record.clone());
        state.writes += 1;
        Ok(record)
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let mut state = self.state.lock().await;
        let Some(current) = state.categories.get(&params.id).cloned() else {
            return Err(RepoError::NotFound);
        };
        let updated_at = if current.name != params.name {
            state.tick()
        } else {
            current.updated_at
        };
        let record = CategoryRecord {
            name: params.name,
            updated_at,
            ..current
        };
        state.categories.insert(record.id, record.clone());
        state.writes += 1;
        Ok(record)
    }

    async fn delete_category(&self, id: i64) -> Result<(), RepoError> {
        let mut state = self.state.lock().await;
        if state.categories.remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        state.links.retain(|(_, category_id)| *category_id != id);
        state.writes += 1;
        Ok(())
    }
}

/// Accepts [`VALID_TOKEN`], reports an outage for [`OUTAGE_TOKEN`] and rejects the rest.
pub struct StaticSessions;

#[async_trait]
impl SessionProvider for StaticSessions {
    async fn verify(&self, token: &str) -> Result<SessionUser, SessionError> {
        match token {
            VALID_TOKEN => Ok(SessionUser {
                id: "user-1".to_string(),
                email: Some("editor@example.com".to_string()),
            }),
            OUTAGE_TOKEN => Err(SessionError::Unavailable("connection refused".to_string())),
            _ => Err(SessionError::Rejected("invalid JWT".to_string())),
        }
    }
}

/// Contact sink that keeps every delivered message in memory.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<ContactMessage>>,
    pub fail: bool,
}

#[async_trait]
impl ContactSink for RecordingSink {
    async fn deliver(&self, message: &ContactMessage) -> Result<(), ContactError> {
        if self.fail {
            return Err(ContactError::Delivery("upstream returned 500".to_string()));
        }
        self.delivered.lock().await.push(message.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub sink: Arc<RecordingSink>,
    pub thumbnails: Arc<ThumbnailResolver>,
    pub storage_dir: TempDir,
}

pub struct TestAppBuilder {
    auth_failure_status: StatusCode,
    sink: RecordingSink,
}

impl Default for TestAppBuilder {
    fn default() -> Self {
        Self {
            auth_failure_status: StatusCode::BAD_REQUEST,
            sink: RecordingSink::default(),
        }
    }
}

impl TestAppBuilder {
    pub fn auth_failure_status(mut self, status: StatusCode) -> Self {
        self.auth_failure_status = status;
        self
    }

    pub fn failing_contact_sink(mut self) -> Self {
        self.sink.fail = true;
        self
    }

    /// Must run inside a Tokio runtime; the lazy pool spawns its maintenance task.
    pub fn build(self) -> TestApp {
        let store = Arc::new(MemoryStore::default());
        let sink = Arc::new(self.sink);
        let storage_dir = TempDir::new().expect("storage tempdir");

        let storage = Arc::new(
            ObjectStorage::new(
                storage_dir.path().to_path_buf(),
                "post_thumbnail",
                MAX_UPLOAD_BYTES,
            )
            .expect("object storage"),
        );
        let thumbnails = Arc::new(ThumbnailResolver::new(
            "/storage",
            "post_thumbnail",
            NonZeroUsize::new(16).expect("non-zero"),
        ));

        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://quillpress@127.0.0.1:1/unused")
            .expect("lazy pool");
        let db = Arc::new(PostgresRepositories::new(pool));

        let feed = Arc::new(FeedService::new(store.clone(), thumbnails.clone()));
        let contact_sink: Arc<dyn ContactSink> = sink.clone();

        let http = HttpState {
            feed: feed.clone(),
            contact: Arc::new(ContactService::new(Some(contact_sink))),
            storage: storage.clone(),
            db,
            chrome: LayoutChrome {
                site_title: "Test Blog".to_string(),
                utc_offset: UtcOffset::UTC,
            },
        };
        let api = ApiState {
            feed,
            posts: Arc::new(AdminPostService::new(
                store.clone(),
                store.clone(),
                thumbnails.clone(),
            )),
            categories: Arc::new(AdminCategoryService::new(store.clone(), store.clone())),
            sessions: Arc::new(StaticSessions),
            storage,
            thumbnails: thumbnails.clone(),
            auth_failure_status: self.auth_failure_status,
        };

        TestApp {
            router: build_app(RouterState { http, api }),
            store,
            sink,
            thumbnails,
            storage_dir,
        }
    }
}

pub fn test_app() -> TestApp {
    TestAppBuilder::default().build()
}

pub async fn send(router: &Router, request: Request<Body>) -> Response<Body> {
    use tower::ServiceExt;

    router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .expect("collect body")
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    serde_json::from_slice(&bytes).expect("json body")
}

pub async fn body_text(response: Response<Body>) -> String {
    String::from_utf8(body_bytes(response).await).expect("utf-8 body")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

pub fn authed(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", token);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}
