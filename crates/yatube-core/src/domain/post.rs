use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of characters a post shows when rendered as a one-liner.
pub const POST_EXCERPT_CHARS: usize = 15;

/// Post entity - a text entry written by one author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

impl Post {
    /// Create a new post stamped with the current time.
    pub fn new(
        author_id: Uuid,
        text: String,
        group_id: Option<Uuid>,
        image: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            pub_date: Utc::now(),
            author_id,
            group_id,
            image,
        }
    }

    /// Replace the editable fields. Author and publication date never change.
    pub fn revise(&mut self, text: String, group_id: Option<Uuid>, image: Option<String>) {
        self.text = text;
        self.group_id = group_id;
        self.image = image;
    }

    pub fn is_authored_by(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// The first few characters of the text.
    pub fn excerpt(&self) -> String {
        self.text.chars().take(POST_EXCERPT_CHARS).collect()
    }
}

/// Which posts a feed shows. Every feed is ordered newest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFeed {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts by every author the given user follows.
    FollowedBy(Uuid),
}

impl PostFeed {
    /// In-memory filter matching the feed's SQL condition.
    ///
    /// `followed` must hold the authors followed by the `FollowedBy` user.
    pub fn admits(&self, post: &Post, followed: &[Uuid]) -> bool {
        match self {
            PostFeed::All => true,
            PostFeed::Group(group_id) => post.group_id == Some(*group_id),
            PostFeed::Author(author_id) => post.author_id == *author_id,
            PostFeed::FollowedBy(_) => followed.contains(&post.author_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_truncates_on_characters() {
        let post = Post::new(
            Uuid::new_v4(),
            "Тестовый пост с длинным текстом".to_string(),
            None,
            None,
        );
        assert_eq!(post.excerpt(), "Тестовый пост с");
        assert_eq!(post.excerpt().chars().count(), POST_EXCERPT_CHARS);
    }

    #[test]
    fn test_revise_keeps_author_and_date() {
        let author = Uuid::new_v4();
        let mut post = Post::new(author, "old".to_string(), None, None);
        let published = post.pub_date;

        post.revise("new".to_string(), Some(Uuid::new_v4()), None);

        assert_eq!(post.text, "new");
        assert_eq!(post.author_id, author);
        assert_eq!(post.pub_date, published);
        assert!(post.group_id.is_some());
    }

    #[test]
    fn test_feed_admits() {
        let group = Uuid::new_v4();
        let author = Uuid::new_v4();
        let post = Post::new(author, "text".to_string(), Some(group), None);

        assert!(PostFeed::All.admits(&post, &[]));
        assert!(PostFeed::Group(group).admits(&post, &[]));
        assert!(!PostFeed::Group(Uuid::new_v4()).admits(&post, &[]));
        assert!(PostFeed::Author(author).admits(&post, &[]));
        assert!(PostFeed::FollowedBy(Uuid::new_v4()).admits(&post, &[author]));
        assert!(!PostFeed::FollowedBy(Uuid::new_v4()).admits(&post, &[]));
    }
}
