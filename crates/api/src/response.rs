//! View contexts and redirects.
//!
//! Every page renders a JSON view context. Contexts for cacheable pages
//! also deserialize so they can round-trip through the response cache.

#![allow(missing_docs)]

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use yatube_common::Page;
use yatube_core::{CommentWithAuthor, PostWithRefs, detail_title};
use yatube_db::entities::{group, user};

use crate::forms::FormView;

/// `302 Found` to `location`.
#[must_use]
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// Path of a post's detail page.
#[must_use]
pub fn post_url(post_id: &str) -> String {
    format!("/posts/{post_id}/")
}

/// Path of a user's profile page.
#[must_use]
pub fn profile_url(username: &str) -> String {
    format!("/profile/{username}/")
}

/// Path of the follow feed.
pub const FOLLOW_INDEX_URL: &str = "/follow/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: String,
    pub username: String,
    pub display_name: String,
}

impl From<&user::Model> for AuthorView {
    fn from(u: &user::Model) -> Self {
        Self {
            id: u.id.clone(),
            username: u.username.clone(),
            display_name: u.display_name().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupView {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<&group::Model> for GroupView {
    fn from(g: &group::Model) -> Self {
        Self {
            id: g.id.clone(),
            title: g.title.clone(),
            slug: g.slug.clone(),
            description: g.description.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: String,
    pub text: String,
    pub preview: String,
    pub author: AuthorView,
    pub group: Option<GroupView>,
    pub image: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl From<&PostWithRefs> for PostView {
    fn from(p: &PostWithRefs) -> Self {
        Self {
            id: p.post.id.clone(),
            text: p.post.text.clone(),
            preview: p.preview().to_string(),
            author: AuthorView::from(&p.author),
            group: p.group.as_ref().map(GroupView::from),
            image: p.post.image.clone(),
            created_at: p.post.created_at.to_rfc3339(),
            updated_at: p.post.updated_at.map(|t| t.to_rfc3339()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: String,
    pub text: String,
    pub author: AuthorView,
    pub created_at: String,
}

impl From<&CommentWithAuthor> for CommentView {
    fn from(c: &CommentWithAuthor) -> Self {
        Self {
            id: c.comment.id.clone(),
            text: c.comment.text.clone(),
            author: AuthorView::from(&c.author),
            created_at: c.comment.created_at.to_rfc3339(),
        }
    }
}

/// Page of posts as rendered in listings.
pub type PostPage = Page<PostView>;

/// Convert a hydrated page into its rendered form.
#[must_use]
pub fn render_page(page: Page<PostWithRefs>) -> PostPage {
    page.map(|p| PostView::from(&p))
}

/// Global and follow feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexView {
    pub page: PostPage,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupPageView {
    pub group: GroupView,
    pub page: PostPage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileView {
    pub author: AuthorView,
    pub page: PostPage,
    pub num_posts: u64,
    /// Whether the viewer follows this author.
    pub following: bool,
    /// Whether the viewer is anonymous.
    pub guest: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetailView {
    pub post: PostView,
    pub title: String,
    pub author: AuthorView,
    /// Posts written by the author.
    pub num_posts: u64,
    pub comments: Vec<CommentView>,
    pub form: FormView,
}

impl PostDetailView {
    #[must_use]
    pub fn new(
        post: &PostWithRefs,
        num_posts: u64,
        comments: &[CommentWithAuthor],
        form: FormView,
    ) -> Self {
        Self {
            post: PostView::from(post),
            title: detail_title(&post.post.text).to_string(),
            author: AuthorView::from(&post.author),
            num_posts,
            comments: comments.iter().map(CommentView::from).collect(),
            form,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use yatube_db::entities::post;

    fn sample() -> PostWithRefs {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        PostWithRefs {
            post: post::Model {
                id: "p1".to_string(),
                text: "A rather long post body that keeps going".to_string(),
                author_id: "u1".to_string(),
                group_id: None,
                image: None,
                created_at: at.into(),
                updated_at: None,
            },
            author: user::Model {
                id: "u1".to_string(),
                username: "leo".to_string(),
                name: Some("Leo Tolstoy".to_string()),
                token: Some("secret".to_string()),
                created_at: at.into(),
            },
            group: None,
        }
    }

    #[test]
    fn test_found_sets_location() {
        let resp = found("/posts/p1/");
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(resp.headers()[header::LOCATION], "/posts/p1/");
    }

    #[test]
    fn test_post_view_truncates_preview() {
        let view = PostView::from(&sample());
        assert_eq!(view.preview, "A rather long p");
        assert_eq!(view.author.display_name, "Leo Tolstoy");
        assert_eq!(view.created_at, "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_detail_title_is_thirty_chars() {
        let view = PostDetailView::new(&sample(), 1, &[], FormView::comment());
        assert_eq!(view.title, "A rather long post body that k");
        assert_eq!(view.title.chars().count(), 30);
    }

    #[test]
    fn test_author_view_never_exposes_token() {
        let json = serde_json::to_value(AuthorView::from(&sample().author)).unwrap();
        assert!(json.get("token").is_none());
    }
}
