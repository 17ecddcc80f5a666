mod support;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;

use support::{
    MAX_UPLOAD_BYTES, OUTAGE_TOKEN, TestAppBuilder, VALID_TOKEN, authed, body_json, body_text, get,
    send, test_app,
};

#[tokio::test]
async fn public_posts_list_newest_first_with_categories() {
    let app = test_app();
    let tech = app.store.seed_category("Tech").await;
    let older = app.store.seed_post("older", None, &[tech]).await;
    let newer = app
        .store
        .seed_post("newer", Some("2026/01/cover.png"), &[])
        .await;

    let response = send(&app.router, get("/api/posts")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let posts = body["posts"].as_array().expect("posts array");
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0]["id"], newer);
    assert_eq!(posts[0]["thumbnailUrl"], "/storage/post_thumbnail/2026/01/cover.png");
    assert_eq!(posts[1]["id"], older);
    assert_eq!(posts[1]["postCategories"][0]["category"]["name"], "Tech");
    assert!(posts[1]["thumbnailUrl"].is_null());
}

#[tokio::test]
async fn missing_post_is_404_on_public_and_admin_reads() {
    let app = test_app();

    let response = send(&app.router, get("/api/posts/999")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "記事が見つかりません。");

    let response = send(
        &app.router,
        authed("GET", "/api/admin/posts/999", Some(VALID_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app.router,
        authed("GET", "/api/admin/categories/999", Some(VALID_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "カテゴリーが見つかりません。");
}

#[tokio::test]
async fn admin_rejects_missing_or_invalid_tokens_without_writing() {
    let app = test_app();
    let payload = json!({"title": "t", "content": "c"});

    for token in [None, Some("forged"), Some("Bearer forged")] {
        let response = send(
            &app.router,
            authed("POST", "/api/admin/posts", token, Some(payload.clone())),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "token {token:?}");
        assert!(body_json(response).await["message"].is_string());
    }

    let response = send(&app.router, authed("GET", "/api/admin/categories", None, None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(app.store.writes().await, 0);
}

#[tokio::test]
async fn auth_failure_status_is_configurable() {
    let app = TestAppBuilder::default()
        .auth_failure_status(StatusCode::UNAUTHORIZED)
        .build();

    let response = send(
        &app.router,
        authed("DELETE", "/api/admin/posts/1", Some("forged"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn provider_outage_is_service_unavailable() {
    let app = test_app();
    let response = send(
        &app.router,
        authed("GET", "/api/admin/posts", Some(OUTAGE_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(app.store.writes().await, 0);
}

#[tokio::test]
async fn raw_and_bearer_tokens_are_both_accepted() {
    let app = test_app();
    for header in [VALID_TOKEN.to_string(), format!("Bearer {VALID_TOKEN}")] {
        let response = send(
            &app.router,
            authed("GET", "/api/admin/posts", Some(header.as_str()), None),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

#[tokio::test]
async fn created_post_round_trips_its_categories() {
    let app = test_app();
    let one = app.store.seed_category("One").await;
    let _two = app.store.seed_category("Two").await;
    let three = app.store.seed_category("Three").await;

    let response = send(
        &app.router,
        authed(
            "POST",
            "/api/admin/posts",
            Some(VALID_TOKEN),
            Some(json!({
                "title": "  Hello  ",
                "content": "<p>body</p>",
                "thumbnailImageKey": "2026/01/a.png",
                "categories": [{"id": one}, {"id": three}, {"id": one}]
            })),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let id = body_json(response).await["id"].as_i64().expect("created id");

    let response = send(
        &app.router,
        authed("GET", &format!("/api/admin/posts/{id}"), Some(VALID_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let post = &body["post"];

    assert_eq!(post["title"], "Hello");
    assert_eq!(post["thumbnailImageKey"], "2026/01/a.png");
    let mut ids: Vec<i64> = post["postCategories"]
        .as_array()
        .expect("categories")
        .iter()
        .map(|entry| entry["category"]["id"].as_i64().expect("id"))
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![one, three]);
}

#[tokio::test]
async fn unknown_category_is_rejected_without_writing() {
    let app = test_app();
    let response = send(
        &app.router,
        authed(
            "POST",
            "/api/admin/posts",
            Some(VALID_TOKEN),
            Some(json!({"title": "t", "content": "c", "categories": [{"id": 42}]})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.writes().await, 0);
}

#[tokio::test]
async fn repeated_update_leaves_post_unchanged() {
    let app = test_app();
    let tech = app.store.seed_category("Tech").await;
    let id = app.store.seed_post("draft", None, &[]).await;
    let uri = format!("/api/admin/posts/{id}");
    let payload = json!({
        "title": "final",
        "content": "<p>final</p>",
        "thumbnailImageKey": null,
        "categories": [{"id": tech}]
    });

    let response = send(
        &app.router,
        authed("PUT", &uri, Some(VALID_TOKEN), Some(payload.clone())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "OK");
    let first = body_json(send(&app.router, authed("GET", &uri, Some(VALID_TOKEN), None)).await)
        .await["post"]
        .clone();

    let response = send(
        &app.router,
        authed("PUT", &uri, Some(VALID_TOKEN), Some(payload)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let second = body_json(send(&app.router, authed("GET", &uri, Some(VALID_TOKEN), None)).await)
        .await["post"]
        .clone();

    assert_eq!(first, second);
    assert_eq!(second["postCategories"][0]["category"]["id"], tech);
}

#[tokio::test]
async fn update_replaces_category_set() {
    let app = test_app();
    let a = app.store.seed_category("A").await;
    let b = app.store.seed_category("B").await;
    let id = app.store.seed_post("post", None, &[a]).await;

    let response = send(
        &app.router,
        authed(
            "PUT",
            &format!("/api/admin/posts/{id}"),
            Some(VALID_TOKEN),
            Some(json!({"title": "post", "content": "c", "categories": [{"id": b}]})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(send(&app.router, get(&format!("/api/posts/{id}"))).await).await;
    let categories = body["post"]["postCategories"].as_array().expect("array");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["category"]["id"], b);
}

#[tokio::test]
async fn update_and_delete_of_missing_post_are_404() {
    let app = test_app();
    let response = send(
        &app.router,
        authed(
            "PUT",
            "/api/admin/posts/77",
            Some(VALID_TOKEN),
            Some(json!({"title": "t", "content": "c"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &app.router,
        authed("DELETE", "/api/admin/posts/77", Some(VALID_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.store.writes().await, 0);
}

#[tokio::test]
async fn deleted_post_disappears_from_reads() {
    let app = test_app();
    let tech = app.store.seed_category("Tech").await;
    let id = app.store.seed_post("gone", None, &[tech]).await;

    let response = send(
        &app.router,
        authed("DELETE", &format!("/api/admin/posts/{id}"), Some(VALID_TOKEN), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(&app.router, get(&format!("/api/posts/{id}"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.store.link_count().await, 0);
}

#[tokio::test]
async fn blank_title_or_content_is_rejected() {
    let app = test_app();
    for payload in [
        json!({"title": "   ", "content": "c"}),
        json!({"title": "t", "content": ""}),
    ] {
        let response = send(
            &app.router,
            authed("POST", "/api/admin/posts", Some(VALID_TOKEN), Some(payload)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
    assert_eq!(app.store.writes().await, 0);
}

#[tokio::test]
async fn malformed_ids_and_bodies_are_400() {
    let app = test_app();

    let response = send(&app.router, get("/api/posts/not-a-number")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"].is_string());

    let request = Request::builder()
        .method("POST")
        .uri("/api/admin/categories")
        .header("authorization", VALID_TOKEN)
        .header("content-type", "application/json")
        .body(Body::from("{\"name\":"))
        .expect("request");
    let response = send(&app.router, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["message"].is_string());

    assert_eq!(app.store.writes().await, 0);
}

#[tokio::test]
async fn created_category_is_listed_first() {
    let app = test_app();
    app.store.seed_category("Old").await;

    let response = send(
        &app.router,
        authed(
            "POST",
            "/api/admin/categories",
            Some(VALID_TOKEN),
            Some(json!({"name": " Rust "})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let id = body_json(response).await["id"].as_i64().expect("id");

    let response = send(
        &app.router,
        authed("GET", "/api/admin/categories", Some(VALID_TOKEN), None),
    )
    .await;
    let body = body_json(response).await;
    assert_eq!(body["categories"][0]["id"], id);
    assert_eq!(body["categories"][0]["name"], "Rust");
    assert!(body["categories"][0]["createdAt"].is_string());
}

#[tokio::test]
async fn category_rename_and_blank_name() {
    let app = test_app();
    let id = app.store.seed_category("Tech").await;
    let uri = format!("/api/admin/categories/{id}");

    let response = send(
        &app.router,
        authed("PUT", &uri, Some(VALID_TOKEN), Some(json!({"name": "Science"}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(send(&app.router, authed("GET", &uri, Some(VALID_TOKEN), None)).await).await;
    assert_eq!(body["category"]["name"], "Science");

    let writes = app.store.writes().await;
    let response = send(
        &app.router,
        authed("PUT", &uri, Some(VALID_TOKEN), Some(json!({"name": " "}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.store.writes().await, writes);
}

#[tokio::test]
async fn deleting_a_category_detaches_it_from_posts() {
    let app = test_app();
    let keep = app.store.seed_category("Keep").await;
    let dropped = app.store.seed_category("Drop").await;
    let id = app.store.seed_post("post", None, &[keep, dropped]).await;

    let response = send(
        &app.router,
        authed(
            "DELETE",
            &format!("/api/admin/categories/{dropped}"),
            Some(VALID_TOKEN),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "OK");

    let body = body_json(send(&app.router, get(&format!("/api/posts/{id}"))).await).await;
    let categories = body["post"]["postCategories"].as_array().expect("array");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0]["category"]["id"], keep);

    let response = send(
        &app.router,
        authed(
            "DELETE",
            &format!("/api/admin/categories/{dropped}"),
            Some(VALID_TOKEN),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn multipart_upload(filename: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "quillpress-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\n\
             Content-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/admin/uploads")
        .header("authorization", VALID_TOKEN)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request")
}

#[tokio::test]
async fn uploaded_thumbnail_is_served_back() {
    let app = test_app();
    let payload = b"\x89PNG fake image bytes";

    let response = send(&app.router, multipart_upload("Cover.PNG", payload)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    let key = body["key"].as_str().expect("key").to_string();
    assert!(key.ends_with(".png"));
    let url = body["url"].as_str().expect("url").to_string();
    assert_eq!(url, format!("/storage/post_thumbnail/{key}"));

    let response = send(&app.router, get(&url)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().expect("header"),
        "image/png"
    );
    assert_eq!(support::body_bytes(response).await, payload.to_vec());
}

#[tokio::test]
async fn oversized_upload_is_413() {
    let app = test_app();
    let payload = vec![7u8; MAX_UPLOAD_BYTES as usize + 1];

    let response = send(&app.router, multipart_upload("big.png", &payload)).await;
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn unknown_object_is_404() {
    let app = test_app();
    let response = send(&app.router, get("/storage/post_thumbnail/2026/01/missing.png")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app.router, get("/storage/other_bucket/a.png")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body_text(response).await.contains("Object not found"));
}
