use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Follow edge - `user` subscribes to posts written by `author`.
///
/// A pair is stored at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub author_id: Uuid,
}

impl Follow {
    pub fn new(user_id: Uuid, author_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            author_id,
        }
    }

    pub fn is_self_follow(&self) -> bool {
        self.user_id == self.author_id
    }
}
