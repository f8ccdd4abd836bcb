//! Core business logic for yatube-rs.
//!
//! Services sit between the HTTP layer and the repositories. The two that
//! carry most of the weight are [`FeedService`], which filters, orders and
//! paginates posts, and [`FollowingService`], which maintains the follow
//! graph those feeds are computed from.

pub mod services;
pub mod validation;

pub use services::*;
