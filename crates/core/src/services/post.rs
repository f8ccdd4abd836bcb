//! Post service.

use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;
use yatube_common::{AppError, AppResult, Clock, IdGenerator, SystemClock};
use yatube_db::{
    entities::{group, post, user},
    repositories::{GroupRepository, PostRepository, UserRepository},
};

use crate::validation;

/// Characters of post text shown in listings.
pub const PREVIEW_CHARS: usize = 15;

/// Characters of post text used as the detail page title.
pub const TITLE_CHARS: usize = 30;

/// First `n` characters of `text`, counted in chars rather than bytes.
#[must_use]
pub fn truncate_chars(text: &str, n: usize) -> &str {
    match text.char_indices().nth(n) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Short preview of a post body.
#[must_use]
pub fn preview(text: &str) -> &str {
    truncate_chars(text, PREVIEW_CHARS)
}

/// Page title for a post's detail view.
#[must_use]
pub fn detail_title(text: &str) -> &str {
    truncate_chars(text, TITLE_CHARS)
}

/// Input for creating or editing a post.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PostInput {
    /// Post body. Must not be blank.
    #[validate(custom(function = "validation::not_blank"))]
    #[serde(default)]
    pub text: String,

    /// ID of the group to file the post under.
    pub group: Option<String>,

    /// Blob-store key of an already uploaded image.
    #[validate(length(max = 512))]
    pub image: Option<String>,
}

/// A post with its author and group loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostWithRefs {
    /// The stored post.
    pub post: post::Model,
    /// Its author.
    pub author: user::Model,
    /// The group it is filed under, if any.
    pub group: Option<group::Model>,
}

impl PostWithRefs {
    /// Short preview of the body.
    #[must_use]
    pub fn preview(&self) -> &str {
        preview(&self.post.text)
    }
}

/// Attach authors and groups to posts with one lookup per table.
///
/// Posts whose author row vanished between queries are dropped with a
/// warning, so such a page holds fewer items than its counts suggest.
pub(crate) async fn hydrate(
    user_repo: &UserRepository,
    group_repo: &GroupRepository,
    posts: Vec<post::Model>,
) -> AppResult<Vec<PostWithRefs>> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let mut author_ids: Vec<String> = posts.iter().map(|p| p.author_id.clone()).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let mut group_ids: Vec<String> = posts.iter().filter_map(|p| p.group_id.clone()).collect();
    group_ids.sort_unstable();
    group_ids.dedup();

    let authors: HashMap<String, user::Model> = user_repo
        .find_by_ids(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect();

    let groups: HashMap<String, group::Model> = group_repo
        .find_by_ids(&group_ids)
        .await?
        .into_iter()
        .map(|g| (g.id.clone(), g))
        .collect();

    Ok(posts
        .into_iter()
        .filter_map(|post| {
            let Some(author) = authors.get(&post.author_id).cloned() else {
                tracing::warn!(
                    post_id = %post.id,
                    author_id = %post.author_id,
                    "Dropping post whose author no longer exists"
                );
                return None;
            };
            let group = post.group_id.as_ref().and_then(|id| groups.get(id)).cloned();
            Some(PostWithRefs {
                post,
                author,
                group,
            })
        })
        .collect())
}

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    group_repo: GroupRepository,
    id_gen: IdGenerator,
    clock: Arc<dyn Clock>,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        group_repo: GroupRepository,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            group_repo,
            id_gen: IdGenerator::new(),
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publish a new post.
    pub async fn create(&self, author_id: &str, input: PostInput) -> AppResult<post::Model> {
        input.validate()?;

        let group_id = self.resolve_group(input.group.as_deref()).await?;

        let model = post::ActiveModel {
            id: Set(self.id_gen.generate()),
            text: Set(input.text.trim().to_string()),
            author_id: Set(author_id.to_string()),
            group_id: Set(group_id),
            image: Set(input.image.filter(|i| !i.is_empty())),
            created_at: Set(self.clock.now().into()),
            updated_at: Set(None),
        };

        let post = self.post_repo.create(model).await?;
        tracing::info!(post_id = %post.id, author_id = %author_id, "Created post");
        Ok(post)
    }

    /// Get a post by ID.
    pub async fn get(&self, id: &str) -> AppResult<post::Model> {
        self.post_repo.get_by_id(id).await
    }

    /// Get a post with its author and group.
    pub async fn get_with_refs(&self, id: &str) -> AppResult<PostWithRefs> {
        let post = self.post_repo.get_by_id(id).await?;
        let author = self.user_repo.get_by_id(&post.author_id).await?;
        let group = match post.group_id.as_deref() {
            Some(group_id) => self.group_repo.find_by_id(group_id).await?,
            None => None,
        };

        Ok(PostWithRefs {
            post,
            author,
            group,
        })
    }

    /// Edit a post. Only its author may do so.
    pub async fn update(
        &self,
        post_id: &str,
        editor_id: &str,
        input: PostInput,
    ) -> AppResult<post::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.author_id != editor_id {
            return Err(AppError::Forbidden(
                "only the author can edit a post".to_string(),
            ));
        }

        input.validate()?;
        let group_id = self.resolve_group(input.group.as_deref()).await?;

        let mut model: post::ActiveModel = post.into();
        model.text = Set(input.text.trim().to_string());
        model.group_id = Set(group_id);
        model.image = Set(input.image.filter(|i| !i.is_empty()));
        model.updated_at = Set(Some(self.clock.now().into()));

        let post = self.post_repo.update(model).await?;
        tracing::info!(post_id = %post.id, "Updated post");
        Ok(post)
    }

    /// Delete a post. Only its author may do so.
    pub async fn delete(&self, post_id: &str, user_id: &str) -> AppResult<()> {
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.author_id != user_id {
            return Err(AppError::Forbidden(
                "only the author can delete a post".to_string(),
            ));
        }

        self.post_repo.delete(post_id).await?;
        tracing::info!(post_id = %post_id, "Deleted post");
        Ok(())
    }

    /// Number of posts a user has written.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        self.post_repo.count_by_author(author_id).await
    }

    async fn resolve_group(&self, group: Option<&str>) -> AppResult<Option<String>> {
        match group.map(str::trim).filter(|g| !g.is_empty()) {
            Some(group_id) => Ok(Some(self.group_repo.get_by_id(group_id).await?.id)),
            None => Ok(None),
        }
    }
}
