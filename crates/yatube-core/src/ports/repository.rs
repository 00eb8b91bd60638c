use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Comment, Group, Post, PostFeed, User};
use crate::error::RepoError;
use crate::pagination::PageWindow;

/// Generic repository trait defining standard CRUD operations.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Insert a new entity.
    async fn create(&self, entity: T) -> Result<T, RepoError>;

    /// Overwrite an existing entity. Fails with `NotFound` if it is gone.
    async fn update(&self, entity: T) -> Result<T, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;
}

/// User repository with account lookups.
///
/// Deleting a user removes their posts, comments and follow edges.
#[async_trait]
pub trait UserRepository: BaseRepository<User, Uuid> {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError>;
}

/// Group repository.
///
/// Deleting a group clears the group of its posts, never the posts.
#[async_trait]
pub trait GroupRepository: BaseRepository<Group, Uuid> {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError>;

    /// Every group ordered by title.
    async fn list(&self) -> Result<Vec<Group>, RepoError>;
}

/// Post repository. Deleting a post removes its comments.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, Uuid> {
    /// Number of posts in the feed.
    async fn count(&self, feed: PostFeed) -> Result<u64, RepoError>;

    /// One newest-first slice of the feed.
    async fn list(&self, feed: PostFeed, window: PageWindow) -> Result<Vec<Post>, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, Uuid> {
    /// Comments on a post, oldest first.
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError>;
}

/// Follow edges between users.
#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Store the edge. Returns `false` when it already existed.
    async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    /// Remove the edge. Returns `false` when there was none.
    async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError>;

    /// Total number of follow edges.
    async fn count(&self) -> Result<u64, RepoError>;
}
