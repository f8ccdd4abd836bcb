//! Comment service.

use std::collections::HashMap;
use std::sync::Arc;

use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::Validate;
use yatube_common::{AppResult, Clock, IdGenerator, SystemClock};
use yatube_db::{
    entities::{comment, user},
    repositories::{CommentRepository, PostRepository, UserRepository},
};

use crate::validation;

/// Input for commenting on a post.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CommentInput {
    /// Comment body. Must not be blank.
    #[validate(custom(function = "validation::not_blank"))]
    #[serde(default)]
    pub text: String,
}

/// A comment with its author loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentWithAuthor {
    /// The stored comment.
    pub comment: comment::Model,
    /// Who wrote it.
    pub author: user::Model,
}

/// Comment service for business logic.
#[derive(Clone)]
pub struct CommentService {
    comment_repo: CommentRepository,
    post_repo: PostRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
    clock: Arc<dyn Clock>,
}

impl CommentService {
    /// Create a new comment service.
    #[must_use]
    pub fn new(
        comment_repo: CommentRepository,
        post_repo: PostRepository,
        user_repo: UserRepository,
    ) -> Self {
        Self {
            comment_repo,
            post_repo,
            user_repo,
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

    /// Comment on an existing post.
    pub async fn add(
        &self,
        post_id: &str,
        author_id: &str,
        input: CommentInput,
    ) -> AppResult<comment::Model> {
        let post = self.post_repo.get_by_id(post_id).await?;
        input.validate()?;

        let model = comment::ActiveModel {
            id: Set(self.id_gen.generate()),
            post_id: Set(post.id),
            author_id: Set(author_id.to_string()),
            text: Set(input.text.trim().to_string()),
            created_at: Set(self.clock.now().into()),
        };

        let comment = self.comment_repo.create(model).await?;
        tracing::info!(comment_id = %comment.id, post_id = %post_id, "Added comment");
        Ok(comment)
    }

    /// Comments under a post, newest first, with authors.
    pub async fn list_for_post(&self, post_id: &str) -> AppResult<Vec<CommentWithAuthor>> {
        let comments = self.comment_repo.find_by_post(post_id).await?;
        if comments.is_empty() {
            return Ok(Vec::new());
        }

        let mut author_ids: Vec<String> = comments.iter().map(|c| c.author_id.clone()).collect();
        author_ids.sort_unstable();
        author_ids.dedup();

        let authors: HashMap<String, user::Model> = self
            .user_repo
            .find_by_ids(&author_ids)
            .await?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        Ok(comments
            .into_iter()
            .filter_map(|comment| {
                let author = authors.get(&comment.author_id)?.clone();
                Some(CommentWithAuthor { comment, author })
            })
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use yatube_common::AppError;
    use yatube_db::entities::post;

    fn service(db: DatabaseConnection) -> CommentService {
        let db = Arc::new(db);
        CommentService::new(
            CommentRepository::new(db.clone()),
            PostRepository::new(db.clone()),
            UserRepository::new(db),
        )
    }

    fn create_test_post(id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            text: "hello".to_string(),
            author_id: "u1".to_string(),
            group_id: None,
            image: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_user(id: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: format!("user-{id}"),
            name: None,
            token: None,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_comment(id: &str, author_id: &str) -> comment::Model {
        comment::Model {
            id: id.to_string(),
            post_id: "p1".to_string(),
            author_id: author_id.to_string(),
            text: "nice".to_string(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_add_to_missing_post() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<post::Model>::new()])
            .into_connection();

        let result = service(db)
            .add(
                "missing",
                "u1",
                CommentInput {
                    text: "hi".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::PostNotFound(_))));
    }

    #[tokio::test]
    async fn test_add_blank_comment() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_post("p1")]])
            .into_connection();

        let result = service(db).add("p1", "u1", CommentInput::default()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_for_post_attaches_authors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[
                create_test_comment("c2", "u2"),
                create_test_comment("c1", "u1"),
            ]])
            .append_query_results([[create_test_user("u1"), create_test_user("u2")]])
            .into_connection();

        let comments = service(db).list_for_post("p1").await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].comment.id, "c2");
        assert_eq!(comments[0].author.id, "u2");
    }
}
