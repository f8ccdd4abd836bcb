//! Following service.
//!
//! Maintains the directed follow graph. Edges are unique per
//! `(follower, followee)` pair and never point from a user to themselves.

use std::collections::BTreeSet;
use std::sync::Arc;

use sea_orm::Set;
use yatube_common::{AppError, AppResult, Clock, IdGenerator, SystemClock};
use yatube_db::{
    entities::follow,
    repositories::{FollowRepository, UserRepository},
};

/// What a follow request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// A new edge was stored.
    Created,
    /// The edge already existed.
    AlreadyFollowing,
}

/// Following service for business logic.
#[derive(Clone)]
pub struct FollowingService {
    follow_repo: FollowRepository,
    user_repo: UserRepository,
    id_gen: IdGenerator,
    clock: Arc<dyn Clock>,
}

impl FollowingService {
    /// Create a new following service.
    #[must_use]
    pub fn new(follow_repo: FollowRepository, user_repo: UserRepository) -> Self {
        Self {
            follow_repo,
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

    /// Follow an author.
    ///
    /// Idempotent: following someone twice leaves a single edge.
    pub async fn follow(&self, follower_id: &str, followee_id: &str) -> AppResult<FollowOutcome> {
        if follower_id == followee_id {
            return Err(AppError::SelfFollow);
        }

        // Surfaces UserNotFound instead of a foreign key violation.
        self.user_repo.get_by_id(followee_id).await?;

        let model = follow::ActiveModel {
            id: Set(self.id_gen.generate()),
            follower_id: Set(follower_id.to_string()),
            followee_id: Set(followee_id.to_string()),
            created_at: Set(self.clock.now().into()),
        };

        if self.follow_repo.insert_if_absent(model).await? {
            tracing::info!(follower_id = %follower_id, followee_id = %followee_id, "Followed user");
            Ok(FollowOutcome::Created)
        } else {
            tracing::debug!(follower_id = %follower_id, followee_id = %followee_id, "Already following");
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    /// Stop following an author.
    ///
    /// Only the `(follower, followee)` edge is touched. Returns whether an
    /// edge existed.
    pub async fn unfollow(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        let removed = self
            .follow_repo
            .delete_by_pair(follower_id, followee_id)
            .await?;

        if removed {
            tracing::info!(follower_id = %follower_id, followee_id = %followee_id, "Unfollowed user");
        }
        Ok(removed)
    }

    /// Follow an author identified by username.
    pub async fn follow_by_username(
        &self,
        follower_id: &str,
        username: &str,
    ) -> AppResult<FollowOutcome> {
        let followee = self.user_repo.get_by_username(username).await?;
        self.follow(follower_id, &followee.id).await
    }

    /// Unfollow an author identified by username.
    pub async fn unfollow_by_username(&self, follower_id: &str, username: &str) -> AppResult<bool> {
        let followee = self.user_repo.get_by_username(username).await?;
        self.unfollow(follower_id, &followee.id).await
    }

    /// Whether `follower_id` follows `followee_id`.
    pub async fn is_following(&self, follower_id: &str, followee_id: &str) -> AppResult<bool> {
        if follower_id == followee_id {
            return Ok(false);
        }
        self.follow_repo.is_following(follower_id, followee_id).await
    }

    /// IDs of every author `user_id` follows.
    pub async fn feed_for(&self, user_id: &str) -> AppResult<BTreeSet<String>> {
        Ok(self
            .follow_repo
            .find_following(user_id)
            .await?
            .into_iter()
            .map(|edge| edge.followee_id)
            .collect())
    }

    /// Number of users following `user_id`.
    pub async fn follower_count(&self, user_id: &str) -> AppResult<u64> {
        self.follow_repo.count_followers(user_id).await
    }

    /// Number of users `user_id` follows.
    pub async fn following_count(&self, user_id: &str) -> AppResult<u64> {
        self.follow_repo.count_following(user_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use yatube_db::entities::user;

    fn service(db: DatabaseConnection) -> FollowingService {
        let db = Arc::new(db);
        FollowingService::new(FollowRepository::new(db.clone()), UserRepository::new(db))
    }

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            name: None,
            token: None,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_follow(follower_id: &str, followee_id: &str) -> follow::Model {
        follow::Model {
            id: format!("{follower_id}-{followee_id}"),
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn exec_result(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_follow_yourself_returns_error() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let result = service.follow("u1", "u1").await;
        assert!(matches!(result, Err(AppError::SelfFollow)));
    }

    #[tokio::test]
    async fn test_follow_unknown_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let result = service(db).follow("u1", "ghost").await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_follow_created() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("u2", "tolstoy")]])
            .append_exec_results([exec_result(1)])
            .into_connection();

        let outcome = service(db).follow("u1", "u2").await.unwrap();
        assert_eq!(outcome, FollowOutcome::Created);
    }

    #[tokio::test]
    async fn test_follow_twice_is_idempotent() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_user("u2", "tolstoy")]])
            .append_exec_results([exec_result(0)])
            .into_connection();

        let outcome = service(db).follow("u1", "u2").await.unwrap();
        assert_eq!(outcome, FollowOutcome::AlreadyFollowing);
    }

    #[tokio::test]
    async fn test_unfollow_missing_edge_is_noop() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec_result(0)])
            .into_connection();

        assert!(!service(db).unfollow("u1", "u2").await.unwrap());
    }

    #[tokio::test]
    async fn test_feed_for_collects_followees() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[create_test_follow("u1", "u3"), create_test_follow("u1", "u2")]])
            .into_connection();

        let authors = service(db).feed_for("u1").await.unwrap();
        assert_eq!(
            authors.into_iter().collect::<Vec<_>>(),
            vec!["u2".to_string(), "u3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_is_following_self_is_false() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        assert!(!service.is_following("u1", "u1").await.unwrap());
    }
}
