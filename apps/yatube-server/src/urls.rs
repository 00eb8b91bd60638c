//! Paths the handlers redirect to.

use uuid::Uuid;

pub const INDEX: &str = "/";
pub const LOGIN: &str = "/auth/login/";

pub fn profile(username: &str) -> String {
    format!("/profile/{}/", username)
}

pub fn post_detail(post_id: Uuid) -> String {
    format!("/posts/{}/", post_id)
}

/// Login page that sends the visitor back to `next` afterwards.
pub fn login(next: &str) -> String {
    let next: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{}?next={}", LOGIN, next)
}
