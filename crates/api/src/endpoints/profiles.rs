//! Author profile endpoint.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use yatube_common::AppResult;

use crate::{
    extractors::{MaybeAuthUser, PageQuery},
    middleware::AppState,
    response::{AuthorView, ProfileView, render_page},
};

/// An author's posts, post count and whether the viewer follows them.
async fn profile(
    MaybeAuthUser(viewer): MaybeAuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ProfileView>> {
    let request = query.request(state.settings.page_size)?;
    let feed = state.feed_service.author_feed(&username, request).await?;

    let following = match &viewer {
        Some(viewer) => {
            state
                .following_service
                .is_following(&viewer.id, &feed.author.id)
                .await?
        }
        None => false,
    };

    Ok(Json(ProfileView {
        author: AuthorView::from(&feed.author),
        page: render_page(feed.page),
        num_posts: feed.post_count,
        following,
        guest: viewer.is_none(),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/profile/{username}/", get(profile))
}
