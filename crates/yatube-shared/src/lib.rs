//! # Yatube Shared
//!
//! Types shared by the views and the templates: submitted form payloads
//! with their validation rules, and the problem-details shape rendered by
//! error pages.

pub mod dto;
pub mod response;

pub use dto::{
    CommentForm, FormErrors, LoginForm, PostForm, SignupForm, form_errors, safe_next,
};
pub use response::ErrorResponse;
