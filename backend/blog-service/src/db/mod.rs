/// Database access layer
///
/// This module provides:
/// - The `BlogStore` trait every handler talks to
/// - `PgStore`: PostgreSQL implementation (sqlx)
/// - `MemoryStore`: process-local implementation with the same constraints
/// - Connection pool creation and migrations
pub mod memory;
pub mod pool;
pub mod postgres;

pub use memory::MemoryStore;
pub use pool::{create_pool, run_migrations, DbConfig};
pub use postgres::PgStore;

use crate::error::Result;
use crate::models::{
    Comment, CommentView, Group, NewComment, NewGroup, NewPost, NewUser, Post, PostChanges,
    PostView, User,
};

/// Which posts a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    /// Every post
    All,
    /// Posts in a group
    Group(i64),
    /// Posts written by an author
    Author(i64),
    /// Posts whose author is followed by the given user
    FollowedBy(i64),
}

/// Storage operations for accounts, groups, posts, comments and follows.
///
/// Listings are ordered newest-first (`pub_date` desc, `id` desc).
/// Deleting a user removes their posts, comments and follow edges; deleting
/// a group detaches its posts; deleting a post removes its comments.
#[async_trait::async_trait]
pub trait BlogStore: Send + Sync {
    // ----- users -----

    /// Fails with `AppError::Conflict` when the username is taken
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn find_user(&self, user_id: i64) -> Result<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>>;

    async fn delete_user(&self, user_id: i64) -> Result<bool>;

    // ----- groups -----

    /// Fails with `AppError::Conflict` when the slug is taken
    async fn create_group(&self, group: NewGroup) -> Result<Group>;

    async fn find_group(&self, group_id: i64) -> Result<Option<Group>>;

    async fn find_group_by_slug(&self, slug: &str) -> Result<Option<Group>>;

    /// All groups ordered by title
    async fn list_groups(&self) -> Result<Vec<Group>>;

    async fn delete_group(&self, group_id: i64) -> Result<bool>;

    // ----- posts -----

    async fn create_post(&self, post: NewPost) -> Result<Post>;

    async fn find_post(&self, post_id: i64) -> Result<Option<PostView>>;

    /// Returns `None` when the post does not exist
    async fn update_post(&self, post_id: i64, changes: PostChanges) -> Result<Option<Post>>;

    async fn delete_post(&self, post_id: i64) -> Result<bool>;

    async fn count_posts(&self, filter: PostFilter) -> Result<i64>;

    async fn list_posts(&self, filter: PostFilter, offset: i64, limit: i64)
        -> Result<Vec<PostView>>;

    // ----- comments -----

    async fn create_comment(&self, comment: NewComment) -> Result<Comment>;

    /// Comments of a post, newest first
    async fn list_comments(&self, post_id: i64) -> Result<Vec<CommentView>>;

    // ----- follows -----

    /// Idempotent; returns true if a new edge was created
    async fn create_follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    /// Idempotent; returns true if an edge was removed
    async fn delete_follow(&self, user_id: i64, author_id: i64) -> Result<bool>;

    async fn is_following(&self, user_id: i64, author_id: i64) -> Result<bool>;

    async fn count_follows(&self) -> Result<i64>;

    /// Health check (optional)
    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}
