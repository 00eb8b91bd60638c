//! Subscriptions between users and the feed they produce.

use actix_web::{HttpRequest, HttpResponse, web};
use tera::Context;

use yatube_core::domain::{PostFeed, User};
use yatube_core::error::DomainError;

use super::{query_param, redirect};
use crate::feed;
use crate::middleware::auth::{Identity, Viewer};
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::urls;

/// GET /follow/
pub async fn follow_index(
    state: web::Data<AppState>,
    req: HttpRequest,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let page = query_param(&req, "page");
    let page_obj = feed::load_page(
        &state,
        PostFeed::FollowedBy(identity.user_id),
        page.as_deref(),
    )
    .await?;

    let mut context = Context::new();
    context.insert("page_obj", &page_obj);
    state
        .templates
        .page("posts/follow.html", context, &Viewer::from(&identity))
}

/// POST /profile/{username}/follow/
///
/// Following yourself is ignored.
pub async fn profile_follow(
    state: web::Data<AppState>,
    identity: Identity,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = find_author(&state, &username).await?;

    if author.id != identity.user_id {
        let created = state.follows.follow(identity.user_id, author.id).await?;
        tracing::info!(user = %identity.username, author = %author.username, created, "Follow");
    }

    Ok(redirect(urls::profile(&author.username)))
}

/// POST /profile/{username}/unfollow/
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    identity: Identity,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    let author = find_author(&state, &username).await?;

    let removed = state.follows.unfollow(identity.user_id, author.id).await?;
    tracing::info!(user = %identity.username, author = %author.username, removed, "Unfollow");

    Ok(redirect(urls::profile(&author.username)))
}

async fn find_author(state: &AppState, username: &str) -> AppResult<User> {
    Ok(state
        .users
        .find_by_username(username)
        .await?
        .ok_or_else(|| DomainError::not_found("User", username))?)
}
