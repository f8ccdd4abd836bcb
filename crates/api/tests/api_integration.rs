//! API integration tests.
//!
//! These drive the assembled router over a migrated in-memory SQLite store,
//! with a manual clock shared by the services and the response cache.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header},
};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tower::ServiceExt;
use yatube_api::{AppSettings, AppState, app};
use yatube_common::{ManualClock, MemoryCacheBackend, ResponseCache};
use yatube_db::test_utils::TestDatabase;

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

impl TestResponse {
    fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .expect("no Location header")
            .to_str()
            .unwrap()
    }
}

struct Harness {
    db: TestDatabase,
    clock: Arc<ManualClock>,
    cache: MemoryCacheBackend,
    state: AppState,
}

impl Harness {
    async fn new() -> Self {
        let db = TestDatabase::new().await.unwrap();
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = Arc::new(ManualClock::new(start));
        let cache = MemoryCacheBackend::new(clock.clone());
        let state = AppState::new(
            db.connection(),
            ResponseCache::new(Arc::new(cache.clone())),
            AppSettings::default(),
            clock.clone(),
        );

        Self {
            db,
            clock,
            cache,
            state,
        }
    }

    fn router(&self) -> Router {
        app(self.state.clone())
    }

    /// Seed a post one second after the previous one.
    async fn seed_post(&self, id: &str, author_id: &str, group_id: Option<&str>, text: &str) {
        self.clock.advance(Duration::seconds(1));
        let at: DateTime<Utc> = yatube_common::Clock::now(self.clock.as_ref());
        self.db
            .insert_post(id, author_id, group_id, text, at)
            .await
            .unwrap();
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    async fn get(&self, uri: &str, user: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(username) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer token-{username}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_form(&self, uri: &str, user: Option<&str>, form: &str) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(username) = user {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer token-{username}"));
        }
        self.send(builder.body(Body::from(form.to_string())).unwrap())
            .await
    }
}

fn texts(page: &Value) -> Vec<String> {
    page["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["text"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_post_detail_shows_text_author_and_no_comments() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "leo").await.unwrap();
    h.seed_post("p1", "u1", None, "hello").await;

    let resp = h.get("/posts/p1/", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["post"]["text"], "hello");
    assert_eq!(resp.body["title"], "hello");
    assert_eq!(resp.body["author"]["username"], "leo");
    assert_eq!(resp.body["num_posts"], 1);
    assert_eq!(resp.body["comments"].as_array().unwrap().len(), 0);
    assert_eq!(resp.body["form"]["fields"]["text"], "");
}

#[tokio::test]
async fn test_unknown_resources_are_404() {
    let h = Harness::new().await;

    let resp = h.get("/posts/missing/", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["error"]["code"], "POST_NOT_FOUND");

    let resp = h.get("/group/nope/", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["error"]["code"], "GROUP_NOT_FOUND");

    let resp = h.get("/profile/nobody/", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.body["error"]["code"], "USER_NOT_FOUND");

    let resp = h.get("/unexisting_page/", None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_follow_feed_includes_only_followed_authors() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "reader").await.unwrap();
    h.db.insert_user("u2", "writer").await.unwrap();
    h.db.insert_user("u3", "stranger").await.unwrap();

    let resp = h.get("/profile/writer/follow/", Some("reader")).await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/follow/");

    let resp = h.post_form("/create/", Some("writer"), "text=Fresh").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/profile/writer/");

    let resp = h.get("/follow/", Some("reader")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(texts(&resp.body["page"]), vec!["Fresh"]);

    let resp = h.get("/follow/", Some("stranger")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(texts(&resp.body["page"]).is_empty());
    assert_eq!(resp.body["page"]["total_pages"], 1);

    let resp = h.get("/profile/writer/unfollow/", Some("reader")).await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/follow/");

    let resp = h.get("/follow/", Some("reader")).await;
    assert!(texts(&resp.body["page"]).is_empty());
}

#[tokio::test]
async fn test_index_serves_cached_page_until_ttl_lapses() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "leo").await.unwrap();
    h.seed_post("p1", "u1", None, "one").await;
    h.seed_post("p2", "u1", None, "two").await;
    h.seed_post("p3", "u1", None, "three").await;

    let resp = h.get("/", None).await;
    assert_eq!(resp.body["page"]["total_items"], 3);
    assert_eq!(texts(&resp.body["page"]), vec!["three", "two", "one"]);

    let resp = h.post_form("/posts/p3/delete/", Some("leo"), "").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/profile/leo/");

    h.clock.advance(Duration::seconds(19));
    let resp = h.get("/", None).await;
    assert_eq!(resp.body["page"]["total_items"], 3);

    h.clock.advance(Duration::seconds(1));
    let resp = h.get("/", None).await;
    assert_eq!(resp.body["page"]["total_items"], 2);
    assert_eq!(texts(&resp.body["page"]), vec!["two", "one"]);
}

#[tokio::test]
async fn test_index_cache_clear_forces_recompute() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "leo").await.unwrap();
    h.seed_post("p1", "u1", None, "one").await;

    let resp = h.get("/", None).await;
    assert_eq!(resp.body["page"]["total_items"], 1);

    h.seed_post("p2", "u1", None, "two").await;
    let resp = h.get("/", None).await;
    assert_eq!(resp.body["page"]["total_items"], 1);

    h.state.cache.clear().await.unwrap();
    let resp = h.get("/", None).await;
    assert_eq!(resp.body["page"]["total_items"], 2);
}

#[tokio::test]
async fn test_index_cache_does_not_grow_with_distinct_page_values() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "leo").await.unwrap();
    h.seed_post("p1", "u1", None, "one").await;

    for i in 0..40 {
        let resp = h.get(&format!("/?page=x{i}"), None).await;
        assert_eq!(resp.body["page"]["number"], 1);
    }
    assert_eq!(h.cache.len().await, 1);

    for i in 0..5 {
        let resp = h.get(&format!("/?page={}", 100 + i), None).await;
        assert_eq!(resp.body["page"]["number"], 1);
    }
    assert_eq!(h.cache.len().await, 6);

    h.clock.advance(Duration::seconds(20));
    h.get("/", None).await;
    assert_eq!(h.cache.len().await, 1);
}

#[tokio::test]
async fn test_edit_by_non_author_redirects_and_keeps_text() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "author").await.unwrap();
    h.db.insert_user("u2", "intruder").await.unwrap();
    h.seed_post("p1", "u1", None, "original").await;

    let resp = h.get("/posts/p1/edit/", Some("intruder")).await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/posts/p1/");

    let resp = h
        .post_form("/posts/p1/edit/", Some("intruder"), "text=hacked")
        .await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/posts/p1/");

    let resp = h.get("/posts/p1/", None).await;
    assert_eq!(resp.body["post"]["text"], "original");
    assert!(resp.body["post"]["updated_at"].is_null());
}

#[tokio::test]
async fn test_edit_by_author_updates_post() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "author").await.unwrap();
    h.db.insert_group("g1", "cats").await.unwrap();
    h.seed_post("p1", "u1", None, "original").await;

    let resp = h.get("/posts/p1/edit/", Some("author")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["is_edit"], true);
    assert_eq!(resp.body["form"]["fields"]["text"], "original");
    assert_eq!(resp.body["groups"][0]["slug"], "cats");

    let resp = h
        .post_form("/posts/p1/edit/", Some("author"), "text=revised&group=g1")
        .await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/posts/p1/");

    let resp = h.get("/posts/p1/", None).await;
    assert_eq!(resp.body["post"]["text"], "revised");
    assert_eq!(resp.body["post"]["group"]["slug"], "cats");

    let resp = h.get("/group/cats/", None).await;
    assert_eq!(texts(&resp.body["page"]), vec!["revised"]);
}

#[tokio::test]
async fn test_invalid_edit_rerenders_form() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "author").await.unwrap();
    h.seed_post("p1", "u1", None, "original").await;

    let resp = h
        .post_form("/posts/p1/edit/", Some("author"), "text=%20%20")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["is_edit"], true);
    assert_eq!(resp.body["form"]["errors"]["text"][0], "This field is required.");

    let resp = h.get("/posts/p1/", None).await;
    assert_eq!(resp.body["post"]["text"], "original");
}

#[tokio::test]
async fn test_anonymous_gated_requests_redirect_to_login() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "leo").await.unwrap();
    h.seed_post("p1", "u1", None, "hello").await;

    let resp = h.get("/create/", None).await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/auth/login/?next=%2Fcreate%2F");

    let resp = h.get("/follow/?page=2", None).await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/auth/login/?next=%2Ffollow%2F%3Fpage%3D2");

    let resp = h.post_form("/posts/p1/comment/", None, "text=hi").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(
        resp.location(),
        "/auth/login/?next=%2Fposts%2Fp1%2Fcomment%2F"
    );

    let resp = h.get("/profile/leo/follow/", Some("forged")).await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert!(resp.location().starts_with("/auth/login/?next="));

    let resp = h.get("/posts/p1/", None).await;
    assert_eq!(resp.body["comments"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_invalid_create_rerenders_and_writes_nothing() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "leo").await.unwrap();

    let resp = h.get("/create/", Some("leo")).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["is_edit"], false);
    assert_eq!(resp.body["form"]["fields"]["text"], "");

    let resp = h.post_form("/create/", Some("leo"), "text=").await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["form"]["errors"]["text"][0], "This field is required.");

    let resp = h
        .post_form("/create/", Some("leo"), "text=Orphan&group=no-such-group")
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["form"]["fields"]["text"], "Orphan");
    assert!(resp.body["form"]["errors"]["group"].is_array());

    let resp = h.get("/profile/leo/", None).await;
    assert_eq!(resp.body["num_posts"], 0);
}

#[tokio::test]
async fn test_out_of_range_and_garbage_pages_clamp() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "leo").await.unwrap();
    for i in 0..13 {
        h.seed_post(&format!("p{i:02}"), "u1", None, &format!("post {i}"))
            .await;
    }

    let resp = h.get("/profile/leo/?page=99", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["page"]["number"], 2);
    assert_eq!(resp.body["page"]["items"].as_array().unwrap().len(), 3);
    assert_eq!(resp.body["page"]["has_next"], false);
    assert_eq!(resp.body["num_posts"], 13);

    let resp = h.get("/profile/leo/?page=99999999999999999999", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["page"]["number"], 2);

    for query in ["?page=abc", "?page=0", "?page=-1", ""] {
        let resp = h.get(&format!("/profile/leo/{query}"), None).await;
        assert_eq!(resp.status, StatusCode::OK, "query = {query}");
        assert_eq!(resp.body["page"]["number"], 1, "query = {query}");
        assert_eq!(resp.body["page"]["items"].as_array().unwrap().len(), 10);
        assert_eq!(resp.body["page"]["items"][0]["text"], "post 12");
    }

    let resp = h.get("/?page=2", None).await;
    assert_eq!(texts(&resp.body["page"]), vec!["post 2", "post 1", "post 0"]);
}

#[tokio::test]
async fn test_profile_reports_following_and_guest() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "reader").await.unwrap();
    h.db.insert_user("u2", "writer").await.unwrap();

    let resp = h.get("/profile/writer/", None).await;
    assert_eq!(resp.body["guest"], true);
    assert_eq!(resp.body["following"], false);

    let resp = h.get("/profile/writer/", Some("reader")).await;
    assert_eq!(resp.body["guest"], false);
    assert_eq!(resp.body["following"], false);

    h.get("/profile/writer/follow/", Some("reader")).await;
    h.get("/profile/writer/follow/", Some("reader")).await;

    let resp = h.get("/profile/writer/", Some("reader")).await;
    assert_eq!(resp.body["following"], true);
    assert_eq!(
        h.state.following_service.follower_count("u2").await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_self_follow_is_ignored() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "leo").await.unwrap();

    let resp = h.get("/profile/leo/follow/", Some("leo")).await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/follow/");

    assert_eq!(
        h.state.following_service.follower_count("u1").await.unwrap(),
        0
    );

    let resp = h.get("/profile/nobody/follow/", Some("leo")).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unfollow_leaves_other_followers() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "writer").await.unwrap();
    h.db.insert_user("u2", "first").await.unwrap();
    h.db.insert_user("u3", "second").await.unwrap();

    h.get("/profile/writer/follow/", Some("first")).await;
    h.get("/profile/writer/follow/", Some("second")).await;
    h.get("/profile/writer/unfollow/", Some("first")).await;
    h.get("/profile/writer/unfollow/", Some("first")).await;

    let followers = h.state.following_service.follower_count("u1").await.unwrap();
    assert_eq!(followers, 1);

    let resp = h.get("/profile/writer/", Some("second")).await;
    assert_eq!(resp.body["following"], true);
}

#[tokio::test]
async fn test_comments_land_on_post_page() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "author").await.unwrap();
    h.db.insert_user("u2", "reader").await.unwrap();
    h.seed_post("p1", "u1", None, "hello").await;

    let resp = h
        .post_form("/posts/p1/comment/", Some("reader"), "text=Nice+post")
        .await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/posts/p1/");

    let resp = h
        .post_form("/posts/p1/comment/", Some("reader"), "text=")
        .await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/posts/p1/");

    let resp = h.get("/posts/p1/", None).await;
    let comments = resp.body["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["text"], "Nice post");
    assert_eq!(comments[0]["author"]["username"], "reader");

    let resp = h
        .post_form("/posts/missing/comment/", Some("reader"), "text=Hi")
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_by_non_author_keeps_post() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "author").await.unwrap();
    h.db.insert_user("u2", "intruder").await.unwrap();
    h.seed_post("p1", "u1", None, "keep me").await;

    let resp = h.post_form("/posts/p1/delete/", Some("intruder"), "").await;
    assert_eq!(resp.status, StatusCode::FOUND);
    assert_eq!(resp.location(), "/posts/p1/");

    let resp = h.get("/posts/p1/", None).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn test_group_page_lists_only_its_posts() {
    let h = Harness::new().await;
    h.db.insert_user("u1", "leo").await.unwrap();
    h.db.insert_group("g1", "cats").await.unwrap();
    h.db.insert_group("g2", "dogs").await.unwrap();
    h.seed_post("p1", "u1", Some("g1"), "meow").await;
    h.seed_post("p2", "u1", Some("g2"), "woof").await;
    h.seed_post("p3", "u1", None, "plain").await;

    let resp = h.get("/group/cats/", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body["group"]["slug"], "cats");
    assert_eq!(texts(&resp.body["page"]), vec!["meow"]);
    assert_eq!(resp.body["page"]["items"][0]["group"]["slug"], "cats");
}
