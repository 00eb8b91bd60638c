//! Feed pages - posts joined with their author and group for rendering.

use std::collections::HashMap;

use serde::Serialize;
use uuid::Uuid;

use yatube_core::domain::{Comment, Group, Post, PostFeed, User};
use yatube_core::error::DomainError;
use yatube_core::{Page, PageWindow};

use crate::middleware::error::AppResult;
use crate::state::AppState;

/// A post with everything its card shows.
#[derive(Debug, Clone, Serialize)]
pub struct PostCard {
    #[serde(flatten)]
    pub post: Post,
    pub excerpt: String,
    pub author: User,
    pub group: Option<Group>,
}

impl PostCard {
    pub fn new(post: Post, author: User, group: Option<Group>) -> Self {
        Self {
            excerpt: post.excerpt(),
            post,
            author,
            group,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentCard {
    #[serde(flatten)]
    pub comment: Comment,
    pub author: User,
}

/// Load page `requested` of `feed`.
pub async fn load_page(
    state: &AppState,
    feed: PostFeed,
    requested: Option<&str>,
) -> AppResult<Page<PostCard>> {
    let window = resolve_window(state, feed, requested).await?;
    load_window(state, feed, window).await
}

/// Clamp the raw `?page=` value against the current size of `feed`.
pub async fn resolve_window(
    state: &AppState,
    feed: PostFeed,
    requested: Option<&str>,
) -> AppResult<PageWindow> {
    let count = state.posts.count(feed).await?;
    Ok(PageWindow::resolve(
        count,
        state.settings.posts_per_page,
        requested,
    ))
}

/// Load the posts inside an already resolved `window`.
pub async fn load_window(
    state: &AppState,
    feed: PostFeed,
    window: PageWindow,
) -> AppResult<Page<PostCard>> {
    let posts = state.posts.list(feed, window).await?;

    tracing::debug!(
        ?feed,
        page = window.number,
        num_pages = window.num_pages,
        "Loaded {} of {} posts",
        posts.len(),
        window.count
    );

    Ok(Page::new(hydrate(state, posts).await?, window))
}

fn distinct(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut ids: Vec<Uuid> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

/// Attach authors and groups, two lookups per batch.
pub async fn hydrate(state: &AppState, posts: Vec<Post>) -> AppResult<Vec<PostCard>> {
    let author_ids = distinct(posts.iter().map(|p| p.author_id));
    let group_ids = distinct(posts.iter().filter_map(|p| p.group_id));

    let (authors, groups) = futures::try_join!(
        state.users.find_many(&author_ids),
        state.groups.find_many(&group_ids),
    )?;

    let authors: HashMap<Uuid, User> = authors.into_iter().map(|u| (u.id, u)).collect();
    let groups: HashMap<Uuid, Group> = groups.into_iter().map(|g| (g.id, g)).collect();

    posts
        .into_iter()
        .map(|post| -> AppResult<PostCard> {
            let author = authors.get(&post.author_id).cloned().ok_or_else(|| {
                DomainError::Internal(format!(
                    "author {} of post {} is missing",
                    post.author_id, post.id
                ))
            })?;
            let group = post.group_id.and_then(|id| groups.get(&id).cloned());
            Ok(PostCard::new(post, author, group))
        })
        .collect()
}

/// Comments on a post with their authors, oldest first.
pub async fn load_comments(state: &AppState, post_id: Uuid) -> AppResult<Vec<CommentCard>> {
    let comments = state.comments.find_by_post(post_id).await?;
    let author_ids = distinct(comments.iter().map(|c| c.author_id));
    let authors: HashMap<Uuid, User> = state
        .users
        .find_many(&author_ids)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    Ok(comments
        .into_iter()
        .filter_map(|comment| {
            let author = authors.get(&comment.author_id).cloned()?;
            Some(CommentCard { comment, author })
        })
        .collect())
}
