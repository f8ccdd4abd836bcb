//! API middleware.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use sea_orm::DatabaseConnection;
use yatube_common::{Clock, Config, ResponseCache};
use yatube_core::{
    CommentService, FeedService, FollowingService, GroupService, PostService, UserService,
};
use yatube_db::{
    entities::user,
    repositories::{
        CommentRepository, FollowRepository, GroupRepository, PostRepository, UserRepository,
    },
};

use crate::response;

/// Knobs the handlers read on every request.
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub page_size: u64,
    pub index_ttl: Duration,
    pub login_url: String,
}

impl AppSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.feed.page_size,
            index_ttl: Duration::from_secs(config.cache.index_ttl_secs),
            login_url: config.auth.login_url.clone(),
        }
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            page_size: yatube_common::DEFAULT_PAGE_SIZE,
            index_ttl: Duration::from_secs(20),
            login_url: "/auth/login/".to_string(),
        }
    }
}

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub user_service: UserService,
    pub post_service: PostService,
    pub comment_service: CommentService,
    pub group_service: GroupService,
    pub following_service: FollowingService,
    pub feed_service: FeedService,
    pub cache: ResponseCache,
    pub settings: AppSettings,
}

impl AppState {
    /// Wire repositories and services over one connection pool.
    ///
    /// Every service stamps timestamps through `clock`.
    #[must_use]
    pub fn new(
        db: Arc<DatabaseConnection>,
        cache: ResponseCache,
        settings: AppSettings,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let user_repo = UserRepository::new(Arc::clone(&db));
        let group_repo = GroupRepository::new(Arc::clone(&db));
        let post_repo = PostRepository::new(Arc::clone(&db));
        let comment_repo = CommentRepository::new(Arc::clone(&db));
        let follow_repo = FollowRepository::new(db);

        let following_service =
            FollowingService::new(follow_repo, user_repo.clone()).with_clock(clock.clone());

        Self {
            user_service: UserService::new(user_repo.clone()).with_clock(clock.clone()),
            post_service: PostService::new(
                post_repo.clone(),
                user_repo.clone(),
                group_repo.clone(),
            )
            .with_clock(clock.clone()),
            comment_service: CommentService::new(comment_repo, post_repo.clone(), user_repo.clone())
                .with_clock(clock.clone()),
            group_service: GroupService::new(group_repo.clone()).with_clock(clock),
            feed_service: FeedService::new(
                post_repo,
                user_repo,
                group_repo,
                following_service.clone(),
            ),
            following_service,
            cache,
            settings,
        }
    }
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` against the user directory and
/// stores the user in request extensions. Unknown tokens leave the request
/// anonymous.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get("Authorization")
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.user_service.authenticate_by_token(token.trim()).await {
            Ok(user) => {
                req.extensions_mut().insert(user);
            }
            Err(e) => tracing::debug!(error = %e, "Ignoring unknown bearer token"),
        }
    }

    next.run(req).await
}

/// Login guard for pages that need a signed-in user.
///
/// Anonymous requests are redirected to the login page with the original
/// path and query in `next`.
pub async fn require_login(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if req.extensions().get::<user::Model>().is_some() {
        return next.run(req).await;
    }

    let target = req
        .uri()
        .path_and_query()
        .map_or_else(|| req.uri().path().to_string(), |pq| pq.as_str().to_string());

    tracing::debug!(path = %target, "Redirecting anonymous request to login");
    response::found(&login_redirect(&state.settings.login_url, &target))
}

/// `{login_url}?next={target}` with `target` form-urlencoded.
#[must_use]
pub fn login_redirect(login_url: &str, target: &str) -> String {
    let next: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{login_url}?next={next}")
}
