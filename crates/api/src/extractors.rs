//! Request extractors.

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Deserialize;
use yatube_common::{AppError, AppResult, PageRequest};
use yatube_db::entities::user;

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by auth middleware
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Optional authenticated user extractor.
#[derive(Debug, Clone)]
pub struct MaybeAuthUser(pub Option<user::Model>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<user::Model>().cloned()))
    }
}

/// The `?page=` query parameter, kept raw.
///
/// Anything that is not a positive integer means the first page.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// Page request for feeds of `page_size` posts.
    pub fn request(&self, page_size: u64) -> AppResult<PageRequest> {
        PageRequest::from_query(page_size, self.page.as_deref())
    }
}

/// Cache key of the global feed page `request` selects.
///
/// Keyed by the parsed page number, so every unparseable `?page=` value
/// shares the first page's entry.
#[must_use]
pub fn index_cache_key(request: &PageRequest) -> String {
    format!("index_page:{}", request.page_number())
}
