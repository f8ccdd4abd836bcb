//! Group endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use yatube_common::AppResult;

use crate::{
    extractors::PageQuery,
    middleware::AppState,
    response::{GroupPageView, GroupView, render_page},
};

/// A group and one page of its posts.
async fn group_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<GroupPageView>> {
    let request = query.request(state.settings.page_size)?;
    let (group, page) = state.feed_service.group_feed(&slug, request).await?;

    Ok(Json(GroupPageView {
        group: GroupView::from(&group),
        page: render_page(page),
    }))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/group/{slug}/", get(group_posts))
}
