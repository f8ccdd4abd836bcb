//! Post endpoints: the global feed, post pages and the post forms.

use axum::{
    Json, Router,
    extract::{Form, Path, Query, State, rejection::FormRejection},
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use validator::Validate;
use yatube_common::{AppError, AppResult};
use yatube_core::FeedFilter;

use crate::{
    extractors::{AuthUser, PageQuery, index_cache_key},
    forms::{
        CommentForm, FormView, INVALID_GROUP_MESSAGE, PostForm, PostFormPage, field_errors,
        single_error,
    },
    middleware::{AppState, require_login},
    response::{GroupView, IndexView, PostDetailView, found, post_url, profile_url, render_page},
};

/// Global feed, served from the response cache.
async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<IndexView>> {
    let request = query.request(state.settings.page_size)?;
    let key = index_cache_key(&request);

    let view = state
        .cache
        .get_or_compute(&key, state.settings.index_ttl, || async {
            let page = state.feed_service.list_posts(&FeedFilter::All, request).await?;
            Ok::<_, AppError>(IndexView {
                page: render_page(page),
            })
        })
        .await?;

    Ok(Json(view))
}

/// A post with its comments and the author's post count.
async fn post_detail(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<PostDetailView>> {
    let post = state.post_service.get_with_refs(&post_id).await?;
    let num_posts = state.post_service.count_by_author(&post.author.id).await?;
    let comments = state.comment_service.list_for_post(&post.post.id).await?;

    Ok(Json(PostDetailView::new(
        &post,
        num_posts,
        &comments,
        FormView::comment(),
    )))
}

/// Empty post form.
async fn create_form(State(state): State<AppState>) -> AppResult<Response> {
    render_form(&state, PostForm::default().view(), false).await
}

/// Publish a post, then go to the author's profile.
async fn create(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    form: Result<Form<PostForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let view = form.view();
    let input = form.into_input();

    if let Err(errors) = input.validate() {
        return render_form(&state, view.with_errors(field_errors(&errors)), false).await;
    }

    match state.post_service.create(&user.id, input).await {
        Ok(_) => Ok(found(&profile_url(&user.username))),
        Err(AppError::GroupNotFound(_)) => {
            let view = view.with_errors(single_error("group", INVALID_GROUP_MESSAGE));
            render_form(&state, view, false).await
        }
        Err(e) => Err(e),
    }
}

/// Edit form prefilled from the post. Non-authors are sent to the post.
async fn edit_form(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Response> {
    let post = state.post_service.get(&post_id).await?;
    if post.author_id != user.id {
        return Ok(found(&post_url(&post.id)));
    }

    render_form(&state, PostForm::from_post(&post).view(), true).await
}

/// Save an edit. Non-authors are sent to the post and nothing changes.
async fn edit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    form: Result<Form<PostForm>, FormRejection>,
) -> AppResult<Response> {
    let post = state.post_service.get(&post_id).await?;
    let detail = post_url(&post.id);
    if post.author_id != user.id {
        tracing::debug!(post_id = %post.id, user_id = %user.id, "Refusing edit by non-author");
        return Ok(found(&detail));
    }

    let Form(form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let view = form.view();
    let input = form.into_input();

    if let Err(errors) = input.validate() {
        return render_form(&state, view.with_errors(field_errors(&errors)), true).await;
    }

    match state.post_service.update(&post.id, &user.id, input).await {
        Ok(_) | Err(AppError::Forbidden(_)) => Ok(found(&detail)),
        Err(AppError::GroupNotFound(_)) => {
            let view = view.with_errors(single_error("group", INVALID_GROUP_MESSAGE));
            render_form(&state, view, true).await
        }
        Err(e) => Err(e),
    }
}

/// Delete a post, then go to the author's profile.
async fn delete(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Response> {
    match state.post_service.delete(&post_id, &user.id).await {
        Ok(()) => Ok(found(&profile_url(&user.username))),
        Err(AppError::Forbidden(_)) => Ok(found(&post_url(&post_id))),
        Err(e) => Err(e),
    }
}

/// Comment on a post. Always lands back on the post.
async fn add_comment(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    form: Result<Form<CommentForm>, FormRejection>,
) -> AppResult<Response> {
    let Form(form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;

    match state
        .comment_service
        .add(&post_id, &user.id, form.into_input())
        .await
    {
        Ok(_) => {}
        Err(AppError::Validation(reason)) => {
            tracing::debug!(post_id = %post_id, reason = %reason, "Discarding invalid comment");
        }
        Err(e) => return Err(e),
    }

    Ok(found(&post_url(&post_id)))
}

async fn render_form(state: &AppState, form: FormView, is_edit: bool) -> AppResult<Response> {
    let groups = state
        .group_service
        .list()
        .await?
        .iter()
        .map(GroupView::from)
        .collect();

    Ok(Json(PostFormPage {
        form,
        is_edit,
        groups,
    })
    .into_response())
}

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/create/", get(create_form).post(create))
        .route("/posts/{post_id}/edit/", get(edit_form).post(edit))
        .route("/posts/{post_id}/delete/", post(delete))
        .route("/posts/{post_id}/comment/", post(add_comment))
        .route_layer(from_fn_with_state(state.clone(), require_login))
        .route("/", get(index))
        .route("/posts/{post_id}/", get(post_detail))
}
