//! # Yatube Core
//!
//! The domain layer of Yatube: posts, groups, comments and follow edges,
//! the page division helper, and the ports the infrastructure implements.
//! This crate has no infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod pagination;
pub mod ports;

pub use error::DomainError;
pub use pagination::{Page, PageWindow};
