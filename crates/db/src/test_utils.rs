//! Test utilities for database operations.
//!
//! Provides an in-memory SQLite store with every migration applied, plus
//! small builders for seeding rows with explicit timestamps.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection, DbErr, Set};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::entities::{comment, follow, group, post, user};
use crate::migrations::Migrator;

/// URL of a private in-memory SQLite database.
pub const SQLITE_MEMORY_URL: &str = "sqlite::memory:";

/// A migrated throwaway database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: Arc<DatabaseConnection>,
}

impl TestDatabase {
    /// Open a fresh in-memory database and run all migrations.
    pub async fn new() -> Result<Self, DbErr> {
        let conn = Database::connect(SQLITE_MEMORY_URL).await?;
        Migrator::up(&conn, None).await?;

        info!("Created in-memory test database");

        Ok(Self {
            conn: Arc::new(conn),
        })
    }

    /// Get the database connection.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        Arc::clone(&self.conn)
    }

    /// Insert a user with a bearer token of `token-{username}`.
    pub async fn insert_user(&self, id: &str, username: &str) -> Result<user::Model, DbErr> {
        user::ActiveModel {
            id: Set(id.to_string()),
            username: Set(username.to_string()),
            name: Set(None),
            token: Set(Some(format!("token-{username}"))),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert a group.
    pub async fn insert_group(&self, id: &str, slug: &str) -> Result<group::Model, DbErr> {
        group::ActiveModel {
            id: Set(id.to_string()),
            title: Set(format!("Group {slug}")),
            slug: Set(slug.to_string()),
            description: Set(String::new()),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert a post created at `created_at`.
    pub async fn insert_post(
        &self,
        id: &str,
        author_id: &str,
        group_id: Option<&str>,
        text: &str,
        created_at: DateTime<Utc>,
    ) -> Result<post::Model, DbErr> {
        post::ActiveModel {
            id: Set(id.to_string()),
            text: Set(text.to_string()),
            author_id: Set(author_id.to_string()),
            group_id: Set(group_id.map(str::to_string)),
            image: Set(None),
            created_at: Set(created_at.into()),
            updated_at: Set(None),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert a comment.
    pub async fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        author_id: &str,
        text: &str,
    ) -> Result<comment::Model, DbErr> {
        comment::ActiveModel {
            id: Set(id.to_string()),
            post_id: Set(post_id.to_string()),
            author_id: Set(author_id.to_string()),
            text: Set(text.to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await
    }

    /// Insert a follow edge.
    pub async fn insert_follow(
        &self,
        id: &str,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<follow::Model, DbErr> {
        follow::ActiveModel {
            id: Set(id.to_string()),
            follower_id: Set(follower_id.to_string()),
            followee_id: Set(followee_id.to_string()),
            created_at: Set(Utc::now().into()),
        }
        .insert(self.conn.as_ref())
        .await
    }
}
