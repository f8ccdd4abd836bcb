//! Following endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    middleware::from_fn_with_state,
    response::Response,
    routing::get,
};
use yatube_common::{AppError, AppResult};

use crate::{
    extractors::{AuthUser, PageQuery},
    middleware::{AppState, require_login},
    response::{FOLLOW_INDEX_URL, IndexView, found, render_page},
};

/// Posts by every author the viewer follows.
async fn follow_index(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<IndexView>> {
    let request = query.request(state.settings.page_size)?;
    let page = state.feed_service.follow_feed(&user.id, request).await?;

    Ok(Json(IndexView {
        page: render_page(page),
    }))
}

/// Follow an author.
async fn profile_follow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Response> {
    match state
        .following_service
        .follow_by_username(&user.id, &username)
        .await
    {
        Ok(outcome) => {
            tracing::debug!(follower = %user.username, followee = %username, ?outcome, "Follow handled");
        }
        Err(AppError::SelfFollow) => {
            tracing::debug!(user = %user.username, "Ignoring self-follow");
        }
        Err(e) => return Err(e),
    }

    Ok(found(FOLLOW_INDEX_URL))
}

/// Stop following an author.
async fn profile_unfollow(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Response> {
    let removed = state
        .following_service
        .unfollow_by_username(&user.id, &username)
        .await?;
    tracing::debug!(follower = %user.username, followee = %username, removed, "Unfollow handled");

    Ok(found(FOLLOW_INDEX_URL))
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/follow/", get(follow_index))
        .route("/profile/{username}/follow/", get(profile_follow))
        .route("/profile/{username}/unfollow/", get(profile_unfollow))
        .route_layer(from_fn_with_state(state.clone(), require_login))
}
