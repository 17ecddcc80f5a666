//! Token-carrying reads and writes against the admin API.
//!
//! Reads go through the shared [`FetchClient`] cache. Writes are sent directly and,
//! on success, refresh the cached list and detail reads they affect.

use std::path::Path;
use std::sync::Arc;

use quillpress_api_types::{
    CategoriesResponse, CategoryResponse, CategoryWriteRequest, CreatedResponse, MessageResponse,
    PostResponse, PostWriteRequest, PostsResponse, UploadResponse,
};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::error::{ClientError, message_from_body};
use crate::fetch::{AuthMode, FetchClient, FetchState};
use crate::gate::SessionHandle;

pub const ADMIN_POSTS: &str = "api/admin/posts";
pub const ADMIN_CATEGORIES: &str = "api/admin/categories";
pub const ADMIN_UPLOADS: &str = "api/admin/uploads";
pub const PUBLIC_POSTS: &str = "api/posts";

pub fn admin_post_endpoint(id: i64) -> String {
    format!("{ADMIN_POSTS}/{id}")
}

pub fn admin_category_endpoint(id: i64) -> String {
    format!("{ADMIN_CATEGORIES}/{id}")
}

pub fn public_post_endpoint(id: i64) -> String {
    format!("{PUBLIC_POSTS}/{id}")
}

#[derive(Clone)]
pub struct AdminClient {
    fetch: Arc<FetchClient>,
    session: SessionHandle,
}

impl AdminClient {
    pub fn new(fetch: Arc<FetchClient>, session: SessionHandle) -> Self {
        Self { fetch, session }
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub fn fetch_client(&self) -> &FetchClient {
        &self.fetch
    }

    pub async fn posts(&self) -> FetchState<PostsResponse> {
        self.read(ADMIN_POSTS).await
    }

    pub async fn post(&self, id: i64) -> FetchState<PostResponse> {
        self.read(&admin_post_endpoint(id)).await
    }

    pub async fn categories(&self) -> FetchState<CategoriesResponse> {
        self.read(ADMIN_CATEGORIES).await
    }

    pub async fn category(&self, id: i64) -> FetchState<CategoryResponse> {
        self.read(&admin_category_endpoint(id)).await
    }

    pub async fn create_post(&self, body: &PostWriteRequest) -> Result<CreatedResponse, ClientError> {
        let created: CreatedResponse = self.write(Method::POST, ADMIN_POSTS, Some(body)).await?;
        info!(target = "quillpress_client::admin", id = created.id, "post created");
        self.refresh_posts(None).await;
        Ok(created)
    }

    pub async fn update_post(
        &self,
        id: i64,
        body: &PostWriteRequest,
    ) -> Result<MessageResponse, ClientError> {
        let endpoint = admin_post_endpoint(id);
        let response = self.write(Method::PUT, &endpoint, Some(body)).await?;
        self.refresh_posts(Some(id)).await;
        Ok(response)
    }

    pub async fn delete_post(&self, id: i64) -> Result<MessageResponse, ClientError> {
        let endpoint = admin_post_endpoint(id);
        let response = self
            .write(Method::DELETE, &endpoint, None::<&()>)
            .await?;
        self.refresh_posts(Some(id)).await;
        Ok(response)
    }

    pub async fn create_category(
        &self,
        body: &CategoryWriteRequest,
    ) -> Result<CreatedResponse, ClientError> {
        let created: CreatedResponse = self
            .write(Method::POST, ADMIN_CATEGORIES, Some(body))
            .await?;
        info!(target = "quillpress_client::admin", id = created.id, "category created");
        self.refresh_categories(None).await;
        Ok(created)
    }

    pub async fn update_category(
        &self,
        id: i64,
        body: &CategoryWriteRequest,
    ) -> Result<MessageResponse, ClientError> {
        let endpoint = admin_category_endpoint(id);
        let response = self.write(Method::PUT, &endpoint, Some(body)).await?;
        self.refresh_categories(Some(id)).await;
        Ok(response)
    }

    pub async fn delete_category(&self, id: i64) -> Result<MessageResponse, ClientError> {
        let endpoint = admin_category_endpoint(id);
        let response = self
            .write(Method::DELETE, &endpoint, None::<&()>)
            .await?;
        self.refresh_categories(Some(id)).await;
        Ok(response)
    }

    /// Uploads a thumbnail image and returns its storage key and public URL.
    pub async fn upload_thumbnail(
        &self,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<UploadResponse, ClientError> {
        let token = self.token().await?;
        let url = self.fetch.base().join(ADMIN_UPLOADS)?;
        let part = reqwest::multipart::Part::bytes(data).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .fetch
            .http()
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        decode_response(response).await
    }

    pub async fn upload_thumbnail_file(&self, path: &Path) -> Result<UploadResponse, ClientError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::InputFile {
                path: path.display().to_string(),
                source,
            })?;
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload.bin")
            .to_string();
        self.upload_thumbnail(&file_name, data).await
    }

    async fn read<T: DeserializeOwned>(&self, endpoint: &str) -> FetchState<T> {
        let credentials = self.session.current();
        self.fetch
            .fetch(Some(endpoint), AuthMode::Required, &credentials)
            .await
    }

    async fn token(&self) -> Result<String, ClientError> {
        self.session.token().await.ok_or(ClientError::MissingToken)
    }

    async fn write<B, T>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.token().await?;
        let url = self.fetch.base().join(endpoint)?;
        let mut request: RequestBuilder = self.fetch.http().request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }
        decode_response(request.send().await?).await
    }

    /// Drops every cached post read the write could have changed and re-reads the admin list.
    async fn refresh_posts(&self, id: Option<i64>) {
        self.fetch.invalidate(PUBLIC_POSTS);
        if let Some(id) = id {
            self.fetch.invalidate(&admin_post_endpoint(id));
            self.fetch.invalidate(&public_post_endpoint(id));
        }
        self.revalidate_list(ADMIN_POSTS).await;
    }

    async fn refresh_categories(&self, id: Option<i64>) {
        if let Some(id) = id {
            self.fetch.invalidate(&admin_category_endpoint(id));
            // Post reads embed category names.
            self.fetch.invalidate(ADMIN_POSTS);
            self.fetch.invalidate(PUBLIC_POSTS);
        }
        self.revalidate_list(ADMIN_CATEGORIES).await;
    }

    async fn revalidate_list(&self, endpoint: &str) {
        self.fetch.invalidate(endpoint);
        let credentials = self.session.current();
        let _: FetchState<serde_json::Value> = self
            .fetch
            .revalidate(Some(endpoint), AuthMode::Required, &credentials)
            .await;
    }
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    let bytes = response.bytes().await?;
    if !status.is_success() {
        return Err(ClientError::Server {
            status,
            message: message_from_body(&bytes),
        });
    }
    serde_json::from_slice(&bytes)
        .map_err(|err| ClientError::InvalidInput(format!("failed to parse body: {err}")))
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;
    use quillpress_api_types::CategoryIdRef;
    use serde_json::json;

    use super::*;

    fn admin(server: &MockServer, token: Option<&str>) -> AdminClient {
        let fetch = Arc::new(FetchClient::new(&server.base_url()).expect("client"));
        AdminClient::new(fetch, SessionHandle::resolved(token.map(str::to_string)))
    }

    #[tokio::test]
    async fn writes_require_a_token() {
        let server = MockServer::start_async().await;
        let client = admin(&server, None);

        let err = client
            .create_category(&CategoryWriteRequest {
                name: "Tech".into(),
            })
            .await
            .expect_err("no token");
        assert!(matches!(err, ClientError::MissingToken));
    }

    #[tokio::test]
    async fn create_post_sends_payload_and_refreshes_list() {
        let server = MockServer::start_async().await;
        let create = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/api/admin/posts")
                    .header("authorization", "Bearer tok")
                    .json_body_includes(json!({
                        "title": "T",
                        "content": "C",
                        "thumbnailImageKey": "2026/10/a.png",
                        "categories": [{"id": 1}, {"id": 3}]
                    }).to_string());
                then.status(200).json_body(json!({"id": 42}));
            })
            .await;
        let list = server
            .mock_async(|when, then| {
                when.method("GET").path("/api/admin/posts");
                then.status(200).json_body(json!({"posts": []}));
            })
            .await;
        let client = admin(&server, Some("tok"));

        let created = client
            .create_post(&PostWriteRequest {
                title: "T".into(),
                content: "C".into(),
                thumbnail_image_key: Some("2026/10/a.png".into()),
                categories: vec![CategoryIdRef { id: 1 }, CategoryIdRef { id: 3 }],
            })
            .await
            .expect("created");

        assert_eq!(created.id, 42);
        create.assert_async().await;
        list.assert_async().await;

        let cached = client.posts().await;
        assert_eq!(cached.data().map(|body| body.posts.len()), Some(0));
        list.assert_async().await;
    }

    #[tokio::test]
    async fn server_messages_are_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method("DELETE").path("/api/admin/categories/7");
                then.status(404)
                    .json_body(json!({"message": "カテゴリーが見つかりません。"}));
            })
            .await;
        let client = admin(&server, Some("tok"));

        let err = client.delete_category(7).await.expect_err("missing");
        match err {
            ClientError::Server { status, message } => {
                assert_eq!(status.as_u16(), 404);
                assert_eq!(message, "カテゴリーが見つかりません。");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_posts_multipart_file() {
        let server = MockServer::start_async().await;
        let upload = server
            .mock_async(|when, then| {
                when.method("POST")
                    .path("/api/admin/uploads")
                    .header("authorization", "Bearer tok")
                    .body_includes("filename=\"cover.png\"");
                then.status(200).json_body(json!({
                    "key": "2026/10/abc.png",
                    "url": "/storage/post_thumbnail/2026/10/abc.png"
                }));
            })
            .await;
        let client = admin(&server, Some("tok"));

        let response = client
            .upload_thumbnail("cover.png", b"\x89PNG".to_vec())
            .await
            .expect("uploaded");
        assert_eq!(response.key, "2026/10/abc.png");
        upload.assert_async().await;
    }
}
