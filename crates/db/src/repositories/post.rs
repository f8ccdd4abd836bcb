//! Post repository.

use std::sync::Arc;

use crate::entities::{Post, post};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use yatube_common::{AppError, AppResult, Page, PageRequest};

/// Which posts a feed query selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    /// Every post.
    All,
    /// Posts filed under one group.
    Group(String),
    /// Posts by one author.
    Author(String),
    /// Posts by any of these authors.
    Authors(Vec<String>),
}

impl PostFilter {
    fn condition(&self) -> Condition {
        match self {
            Self::All => Condition::all(),
            Self::Group(group_id) => Condition::all().add(post::Column::GroupId.eq(group_id.as_str())),
            Self::Author(author_id) => {
                Condition::all().add(post::Column::AuthorId.eq(author_id.as_str()))
            }
            Self::Authors(author_ids) => {
                Condition::all().add(post::Column::AuthorId.is_in(author_ids.iter().cloned()))
            }
        }
    }

    /// Whether the filter cannot match anything without asking the store.
    #[must_use]
    pub fn is_trivially_empty(&self) -> bool {
        matches!(self, Self::Authors(ids) if ids.is_empty())
    }
}

/// Post repository for database operations.
#[derive(Clone)]
pub struct PostRepository {
    db: Arc<DatabaseConnection>,
}

impl PostRepository {
    /// Create a new post repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a post by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<post::Model>> {
        Post::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a post by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<post::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::PostNotFound(id.to_string()))
    }

    /// Create a new post.
    pub async fn create(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a post.
    pub async fn update(&self, model: post::ActiveModel) -> AppResult<post::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Delete a post and its comments.
    ///
    /// Returns whether a row was removed.
    pub async fn delete(&self, id: &str) -> AppResult<bool> {
        let result = Post::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected > 0)
    }

    /// Count posts written by a user.
    pub async fn count_by_author(&self, author_id: &str) -> AppResult<u64> {
        Post::find()
            .filter(post::Column::AuthorId.eq(author_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count posts matching a filter.
    pub async fn count(&self, filter: &PostFilter) -> AppResult<u64> {
        if filter.is_trivially_empty() {
            return Ok(0);
        }

        Post::find()
            .filter(filter.condition())
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Fetch one page of posts, newest first.
    ///
    /// Ties on `created_at` are broken by id so pages never overlap. The
    /// requested page is clamped into the available range, and an empty
    /// result set yields a single empty page.
    pub async fn find_page(
        &self,
        filter: &PostFilter,
        request: PageRequest,
    ) -> AppResult<Page<post::Model>> {
        if filter.is_trivially_empty() {
            return Ok(Page::empty(request.page_size()));
        }

        let paginator = Post::find()
            .filter(filter.condition())
            .order_by_desc(post::Column::CreatedAt)
            .order_by_desc(post::Column::Id)
            .paginate(self.db.as_ref(), request.page_size());

        let total_items = paginator
            .num_items()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let number = request.clamped_number(total_items);
        let items = if total_items == 0 {
            Vec::new()
        } else {
            paginator
                .fetch_page(number - 1)
                .await
                .map_err(|e| AppError::Database(e.to_string()))?
        };

        Ok(Page::new(items, number, request.page_size(), total_items))
    }
}
