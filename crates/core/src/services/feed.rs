//! Feed service.
//!
//! Every listing page (the global index, a group, an author profile and the
//! personal follow feed) goes through [`FeedService::list_posts`]. Posts come
//! back newest first with ties broken by id, hydrated with their author and
//! group.
//!
//! Follow feeds are not materialized: the set of followed authors is read on
//! every request and used as a filter.

use yatube_common::{AppResult, Page, PageRequest};
use yatube_db::{
    entities::{group, user},
    repositories::{GroupRepository, PostFilter, PostRepository, UserRepository},
};

use super::following::FollowingService;
use super::post::{PostWithRefs, hydrate};

/// Which posts a feed shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedFilter {
    /// Every post.
    All,
    /// Posts in the group with this slug.
    GroupSlug(String),
    /// Posts by the user with this username.
    AuthorUsername(String),
    /// Posts by authors the user with this ID follows.
    FollowedBy(String),
}

/// An author's profile feed.
#[derive(Debug, Clone)]
pub struct AuthorFeed {
    /// The profile owner.
    pub author: user::Model,
    /// The requested page of their posts.
    pub page: Page<PostWithRefs>,
    /// Their total number of posts.
    pub post_count: u64,
}

/// Feed service for business logic.
#[derive(Clone)]
pub struct FeedService {
    post_repo: PostRepository,
    user_repo: UserRepository,
    group_repo: GroupRepository,
    following: FollowingService,
}

impl FeedService {
    /// Create a new feed service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        user_repo: UserRepository,
        group_repo: GroupRepository,
        following: FollowingService,
    ) -> Self {
        Self {
            post_repo,
            user_repo,
            group_repo,
            following,
        }
    }

    /// One page of the feed selected by `filter`.
    ///
    /// Unknown group slugs and usernames are errors; a user who follows
    /// nobody gets a single empty page.
    pub async fn list_posts(
        &self,
        filter: &FeedFilter,
        request: PageRequest,
    ) -> AppResult<Page<PostWithRefs>> {
        let post_filter = match filter {
            FeedFilter::All => PostFilter::All,
            FeedFilter::GroupSlug(slug) => {
                PostFilter::Group(self.group_repo.get_by_slug(slug).await?.id)
            }
            FeedFilter::AuthorUsername(username) => {
                PostFilter::Author(self.user_repo.get_by_username(username).await?.id)
            }
            FeedFilter::FollowedBy(user_id) => {
                let authors = self.following.feed_for(user_id).await?;
                PostFilter::Authors(authors.into_iter().collect())
            }
        };

        self.page(&post_filter, request).await
    }

    /// A group together with one page of its posts.
    pub async fn group_feed(
        &self,
        slug: &str,
        request: PageRequest,
    ) -> AppResult<(group::Model, Page<PostWithRefs>)> {
        let group = self.group_repo.get_by_slug(slug).await?;
        let page = self
            .page(&PostFilter::Group(group.id.clone()), request)
            .await?;
        Ok((group, page))
    }

    /// An author, one page of their posts and their total post count.
    pub async fn author_feed(&self, username: &str, request: PageRequest) -> AppResult<AuthorFeed> {
        let author = self.user_repo.get_by_username(username).await?;
        let page = self
            .page(&PostFilter::Author(author.id.clone()), request)
            .await?;

        Ok(AuthorFeed {
            author,
            post_count: page.total_items,
            page,
        })
    }

    /// Posts by everyone `user_id` follows.
    pub async fn follow_feed(
        &self,
        user_id: &str,
        request: PageRequest,
    ) -> AppResult<Page<PostWithRefs>> {
        self.list_posts(&FeedFilter::FollowedBy(user_id.to_string()), request)
            .await
    }

    async fn page(
        &self,
        filter: &PostFilter,
        request: PageRequest,
    ) -> AppResult<Page<PostWithRefs>> {
        let page = self.post_repo.find_page(filter, request).await?;
        tracing::debug!(
            filter = ?filter,
            page = page.number,
            total = page.total_items,
            "Loaded feed page"
        );

        let Page {
            items,
            number,
            page_size,
            total_items,
            ..
        } = page;
        let items = hydrate(&self.user_repo, &self.group_repo, items).await?;
        Ok(Page::new(items, number, page_size, total_items))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maplit::btreemap;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
    use std::sync::Arc;
    use yatube_common::AppError;
    use yatube_db::entities::{follow, post};
    use yatube_db::repositories::FollowRepository;

    fn service(db: DatabaseConnection) -> FeedService {
        let db = Arc::new(db);
        let following = FollowingService::new(
            FollowRepository::new(db.clone()),
            UserRepository::new(db.clone()),
        );
        FeedService::new(
            PostRepository::new(db.clone()),
            UserRepository::new(db.clone()),
            GroupRepository::new(db),
            following,
        )
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

    fn create_test_post(id: &str, author_id: &str) -> post::Model {
        post::Model {
            id: id.to_string(),
            text: format!("text of {id}"),
            author_id: author_id.to_string(),
            group_id: None,
            image: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn count_row(n: i64) -> std::collections::BTreeMap<&'static str, Value> {
        btreemap! { "num_items" => Value::BigInt(Some(n)) }
    }

    #[tokio::test]
    async fn test_unknown_group_slug() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<group::Model>::new()])
            .into_connection();

        let result = service(db)
            .list_posts(
                &FeedFilter::GroupSlug("nope".to_string()),
                PageRequest::first(10).unwrap(),
            )
            .await;
        assert!(matches!(result, Err(AppError::GroupNotFound(_))));
    }

    #[tokio::test]
    async fn test_unknown_author() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<user::Model>::new()])
            .into_connection();

        let result = service(db)
            .author_feed("ghost", PageRequest::first(10).unwrap())
            .await;
        assert!(matches!(result, Err(AppError::UserNotFound(_))));
    }

    #[tokio::test]
    async fn test_follow_feed_without_follows_is_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<follow::Model>::new()])
            .into_connection();

        let page = service(db)
            .follow_feed("u1", PageRequest::new(10, 4).unwrap())
            .await
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.number, 1);
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn test_all_hydrates_authors() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[count_row(2)]])
            .append_query_results([[create_test_post("p2", "u1"), create_test_post("p1", "u1")]])
            .append_query_results([[create_test_user("u1", "leo")]])
            .into_connection();

        let page = service(db)
            .list_posts(&FeedFilter::All, PageRequest::first(10).unwrap())
            .await
            .unwrap();

        assert_eq!(page.len(), 2);
        assert!(page.items.iter().all(|p| p.author.username == "leo"));
        assert!(page.items.iter().all(|p| p.group.is_none()));
    }
}
