//! In-memory repositories - used when no database is configured, and by tests.
//!
//! All repositories handed out by one [`InMemoryDatabase`] share the same
//! tables, so the cascade rules of the SQL schema hold here too: deleting a
//! user drops their posts, comments and follow edges; deleting a post drops
//! its comments; deleting a group only clears it from its posts.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use yatube_core::domain::{Comment, Follow, Group, Post, PostFeed, User};
use yatube_core::error::RepoError;
use yatube_core::pagination::PageWindow;
use yatube_core::ports::{
    BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostRepository,
    UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    groups: HashMap<Uuid, Group>,
    /// Insertion order; feeds sort by `pub_date` on top of it.
    posts: Vec<Post>,
    comments: Vec<Comment>,
    follows: Vec<Follow>,
}

impl Tables {
    fn following(&self, user_id: Uuid) -> Vec<Uuid> {
        self.follows
            .iter()
            .filter(|f| f.user_id == user_id)
            .map(|f| f.author_id)
            .collect()
    }

    /// Feed posts, newest first. Equal timestamps keep the later insert first.
    fn feed(&self, feed: PostFeed) -> Vec<&Post> {
        let followed = match feed {
            PostFeed::FollowedBy(user_id) => self.following(user_id),
            _ => Vec::new(),
        };
        let mut posts: Vec<&Post> = self
            .posts
            .iter()
            .rev()
            .filter(|p| feed.admits(p, &followed))
            .collect();
        posts.sort_by(|a, b| b.pub_date.cmp(&a.pub_date));
        posts
    }

    fn check_post_refs(&self, post: &Post) -> Result<(), RepoError> {
        if !self.users.contains_key(&post.author_id) {
            return Err(RepoError::Constraint("Post author does not exist".to_string()));
        }
        match post.group_id {
            Some(group_id) if !self.groups.contains_key(&group_id) => Err(RepoError::Constraint(
                "Post group does not exist".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

/// Shared in-memory tables.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository { db: self.clone() }
    }

    pub fn groups(&self) -> InMemoryGroupRepository {
        InMemoryGroupRepository { db: self.clone() }
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository { db: self.clone() }
    }

    pub fn comments(&self) -> InMemoryCommentRepository {
        InMemoryCommentRepository { db: self.clone() }
    }

    pub fn follows(&self) -> InMemoryFollowRepository {
        InMemoryFollowRepository { db: self.clone() }
    }
}

pub struct InMemoryUserRepository {
    db: InMemoryDatabase,
}

pub struct InMemoryGroupRepository {
    db: InMemoryDatabase,
}

pub struct InMemoryPostRepository {
    db: InMemoryDatabase,
}

pub struct InMemoryCommentRepository {
    db: InMemoryDatabase,
}

pub struct InMemoryFollowRepository {
    db: InMemoryDatabase,
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.db.tables.read().await.users.get(&id).cloned())
    }

    async fn create(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.db.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepoError::Constraint("Username already taken".to_string()));
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.db.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.username == user.username && u.id != user.id)
        {
            return Err(RepoError::Constraint("Username already taken".to_string()));
        }
        let slot = tables.users.get_mut(&user.id).ok_or(RepoError::NotFound)?;
        *slot = user.clone();
        Ok(user)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.db.tables.write().await;
        tables.users.remove(&id).ok_or(RepoError::NotFound)?;

        let removed_posts: Vec<Uuid> = tables
            .posts
            .iter()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        tables.posts.retain(|p| p.author_id != id);
        tables
            .comments
            .retain(|c| c.author_id != id && !removed_posts.contains(&c.post_id));
        tables
            .follows
            .retain(|f| f.user_id != id && f.author_id != id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<User>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Group, Uuid> for InMemoryGroupRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, RepoError> {
        Ok(self.db.tables.read().await.groups.get(&id).cloned())
    }

    async fn create(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.db.tables.write().await;
        if tables.groups.values().any(|g| g.slug == group.slug) {
            return Err(RepoError::Constraint("Slug already taken".to_string()));
        }
        tables.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn update(&self, group: Group) -> Result<Group, RepoError> {
        let mut tables = self.db.tables.write().await;
        if tables
            .groups
            .values()
            .any(|g| g.slug == group.slug && g.id != group.id)
        {
            return Err(RepoError::Constraint("Slug already taken".to_string()));
        }
        let slot = tables.groups.get_mut(&group.id).ok_or(RepoError::NotFound)?;
        *slot = group.clone();
        Ok(group)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.db.tables.write().await;
        tables.groups.remove(&id).ok_or(RepoError::NotFound)?;
        for post in tables.posts.iter_mut().filter(|p| p.group_id == Some(id)) {
            post.group_id = None;
        }
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<Group>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.groups.get(id))
            .cloned()
            .collect())
    }

    async fn list(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.db.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(groups)
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryPostRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables.posts.iter().find(|p| p.id == id).cloned())
    }

    async fn create(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.db.tables.write().await;
        tables.check_post_refs(&post)?;
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut tables = self.db.tables.write().await;
        tables.check_post_refs(&post)?;
        let slot = tables
            .posts
            .iter_mut()
            .find(|p| p.id == post.id)
            .ok_or(RepoError::NotFound)?;
        *slot = post.clone();
        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.db.tables.write().await;
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        if tables.posts.len() == before {
            return Err(RepoError::NotFound);
        }
        tables.comments.retain(|c| c.post_id != id);
        Ok(())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count(&self, feed: PostFeed) -> Result<u64, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables.feed(feed).len() as u64)
    }

    async fn list(&self, feed: PostFeed, window: PageWindow) -> Result<Vec<Post>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables
            .feed(feed)
            .into_iter()
            .skip(window.offset() as usize)
            .take(window.limit() as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.db.tables.write().await;
        if !tables.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(RepoError::Constraint("Commented post does not exist".to_string()));
        }
        if !tables.users.contains_key(&comment.author_id) {
            return Err(RepoError::Constraint("Comment author does not exist".to_string()));
        }
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn update(&self, comment: Comment) -> Result<Comment, RepoError> {
        let mut tables = self.db.tables.write().await;
        let slot = tables
            .comments
            .iter_mut()
            .find(|c| c.id == comment.id)
            .ok_or(RepoError::NotFound)?;
        *slot = comment.clone();
        Ok(comment)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.db.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|c| c.id != id);
        if tables.comments.len() == before {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let tables = self.db.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created.cmp(&b.created));
        Ok(comments)
    }
}

#[async_trait]
impl FollowRepository for InMemoryFollowRepository {
    async fn follow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.db.tables.write().await;
        if !tables.users.contains_key(&user_id) || !tables.users.contains_key(&author_id) {
            return Err(RepoError::Constraint("Follow endpoint does not exist".to_string()));
        }
        if tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id)
        {
            return Ok(false);
        }
        tables.follows.push(Follow::new(user_id, author_id));
        Ok(true)
    }

    async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let mut tables = self.db.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(tables.follows.len() < before)
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, RepoError> {
        let tables = self.db.tables.read().await;
        Ok(tables
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn count(&self) -> Result<u64, RepoError> {
        Ok(self.db.tables.read().await.follows.len() as u64)
    }
}
