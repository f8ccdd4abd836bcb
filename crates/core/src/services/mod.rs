//! Business logic services.

pub mod comment;
pub mod feed;
pub mod following;
pub mod group;
pub mod post;
pub mod user;

pub use comment::{CommentInput, CommentService, CommentWithAuthor};
pub use feed::{AuthorFeed, FeedFilter, FeedService};
pub use following::{FollowOutcome, FollowingService};
pub use group::{CreateGroupInput, GroupService};
pub use post::{PostInput, PostService, PostWithRefs, detail_title, preview};
pub use user::{CreateUserInput, UserService};
