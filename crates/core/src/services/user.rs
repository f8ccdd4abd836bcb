//! User service.
//!
//! Accounts are provisioned by an external user directory; this service
//! mirrors them locally and resolves bearer tokens to users.

use std::sync::Arc;

use sea_orm::Set;
use serde::Deserialize;
use validator::Validate;
use yatube_common::{AppError, AppResult, Clock, IdGenerator, SystemClock};
use yatube_db::{entities::user, repositories::UserRepository};

use crate::validation;

/// Input for provisioning a user.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserInput {
    /// Unique login name.
    #[validate(length(max = 150), custom(function = "validation::username"))]
    pub username: String,

    /// Display name.
    #[validate(length(max = 256))]
    pub name: Option<String>,

    /// Token issued by the directory. One is generated when absent.
    pub token: Option<String>,
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    id_gen: IdGenerator,
    clock: Arc<dyn Clock>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(user_repo: UserRepository) -> Self {
        Self {
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

    /// Resolve a bearer token to its user.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Get a user by username.
    pub async fn get_by_username(&self, username: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_username(username).await
    }

    /// Provision a user mirrored from the directory.
    pub async fn create(&self, input: CreateUserInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "username {} is already taken",
                input.username
            )));
        }

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(input.username),
            name: Set(input.name.filter(|n| !n.trim().is_empty())),
            token: Set(Some(
                input
                    .token
                    .unwrap_or_else(|| self.id_gen.generate_token()),
            )),
            created_at: Set(self.clock.now().into()),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "Provisioned user");
        Ok(user)
    }

    /// Remove a user together with their posts, comments and follow edges.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        if !self.user_repo.delete(id).await? {
            return Err(AppError::UserNotFound(id.to_string()));
        }
        tracing::info!(user_id = %id, "Deleted user");
        Ok(())
    }
}
