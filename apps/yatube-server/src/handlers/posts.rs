//! Feed, detail and authoring pages.

use actix_web::{HttpRequest, HttpResponse, web};
use tera::Context;
use uuid::Uuid;
use validator::Validate;

use yatube_core::domain::{Comment, Post, PostFeed};
use yatube_core::error::DomainError;
use yatube_shared::{CommentForm, FormErrors, PostForm, form_errors};

use super::{parse_post_id, query_param, redirect};
use crate::feed;
use crate::middleware::auth::{Identity, OptionalIdentity, Viewer};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;
use crate::templates::html;
use crate::urls;

const INVALID_GROUP: &str = "Select a valid choice.";

/// Cache key of one rendered index page as seen by one visitor.
///
/// `page` is the resolved page number, so every raw `?page=` value that lands
/// on the same page shares one entry.
pub(crate) fn index_cache_key(viewer: Option<Uuid>, page: u64) -> String {
    let viewer = viewer.map_or_else(|| "anonymous".to_string(), |id| id.to_string());
    format!("index_page:{}:{}", viewer, page)
}

/// GET /
pub async fn index(
    state: web::Data<AppState>,
    req: HttpRequest,
    identity: OptionalIdentity,
) -> AppResult<HttpResponse> {
    let page = query_param(&req, "page");
    let window = feed::resolve_window(&state, PostFeed::All, page.as_deref()).await?;
    let key = index_cache_key(identity.user_id(), window.number);

    if let Some(body) = state.cache.get(&key).await {
        tracing::debug!(%key, "Index page served from cache");
        return Ok(html(body));
    }

    let page_obj = feed::load_window(&state, PostFeed::All, window).await?;

    let mut context = Context::new();
    context.insert("page_obj", &page_obj);
    let body = state
        .templates
        .render("posts/index.html", context, &identity.viewer())?;

    if let Err(e) = state
        .cache
        .set(&key, &body, Some(state.settings.index_cache_ttl))
        .await
    {
        tracing::warn!(%key, "Failed to cache index page: {}", e);
    }

    Ok(html(body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    req: HttpRequest,
    identity: OptionalIdentity,
    slug: web::Path<String>,
) -> AppResult<HttpResponse> {
    let slug = slug.into_inner();
    let group = state
        .groups
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| DomainError::not_found("Group", &slug))?;

    let page = query_param(&req, "page");
    let page_obj = feed::load_page(&state, PostFeed::Group(group.id), page.as_deref()).await?;

    let mut context = Context::new();
    context.insert("group", &group);
    context.insert("page_obj", &page_obj);
    state
        .templates
        .page("posts/group_list.html", context, &identity.viewer())
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    req: HttpRequest,
    identity: OptionalIdentity,
    username: web::Path<String>,
) -> AppResult<HttpResponse> {
    let username = username.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("User", &username))?;

    let page = query_param(&req, "page");
    let page_obj = feed::load_page(&state, PostFeed::Author(author.id), page.as_deref()).await?;

    let following = match identity.user_id() {
        Some(user_id) if user_id != author.id => {
            state.follows.is_following(user_id, author.id).await?
        }
        _ => false,
    };

    let mut context = Context::new();
    context.insert("author", &author);
    context.insert("page_obj", &page_obj);
    context.insert("posts_count", &page_obj.count);
    context.insert("following", &following);
    context.insert("is_own_profile", &(identity.user_id() == Some(author.id)));
    state
        .templates
        .page("posts/profile.html", context, &identity.viewer())
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    post_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, &post_id).await?;
    let posts_count = state.posts.count(PostFeed::Author(post.author_id)).await?;
    let comments = feed::load_comments(&state, post.id).await?;
    let is_author = identity.user_id() == Some(post.author_id);

    let card = feed::hydrate(&state, vec![post])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal("post card missing".to_string()))?;

    let mut context = Context::new();
    context.insert("post", &card);
    context.insert("posts_count", &posts_count);
    context.insert("comments", &comments);
    context.insert("form", &CommentForm::default());
    context.insert("is_author", &is_author);
    state
        .templates
        .page("posts/post_detail.html", context, &identity.viewer())
}

/// GET /create/
pub async fn post_create_form(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    render_post_form(&state, &identity, &PostForm::default(), &FormErrors::new(), None).await
}

/// POST /create/
pub async fn post_create(
    state: web::Data<AppState>,
    identity: Identity,
    form: web::Form<PostForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    let cleaned = match clean_post_form(&state, &form).await? {
        Ok(cleaned) => cleaned,
        Err(errors) => return render_post_form(&state, &identity, &form, &errors, None).await,
    };

    let post = Post::new(identity.user_id, cleaned.text, cleaned.group_id, cleaned.image);
    let post = state.posts.create(post).await?;
    tracing::info!(post_id = %post.id, author = %identity.username, "Post created");

    Ok(redirect(urls::profile(&identity.username)))
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_form(
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, &post_id).await?;
    if !post.is_authored_by(identity.user_id) {
        return Ok(redirect(urls::post_detail(post.id)));
    }

    let form = PostForm::with_values(&post.text, post.group_id, post.image.as_deref());
    render_post_form(&state, &identity, &form, &FormErrors::new(), Some(&post)).await
}

/// POST /posts/{post_id}/edit/
///
/// Only the author may save; anyone else is sent back to the post unchanged.
pub async fn post_edit(
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<String>,
    form: web::Form<PostForm>,
) -> AppResult<HttpResponse> {
    let mut post = find_post(&state, &post_id).await?;
    if !post.is_authored_by(identity.user_id) {
        tracing::debug!(post_id = %post.id, user = %identity.username, "Edit by non-author ignored");
        return Ok(redirect(urls::post_detail(post.id)));
    }

    let form = form.into_inner();
    let cleaned = match clean_post_form(&state, &form).await? {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            return render_post_form(&state, &identity, &form, &errors, Some(&post)).await;
        }
    };

    post.revise(cleaned.text, cleaned.group_id, cleaned.image);
    let post = state.posts.update(post).await?;
    tracing::info!(post_id = %post.id, "Post updated");

    Ok(redirect(urls::post_detail(post.id)))
}

/// POST /posts/{post_id}/comment/
///
/// Blank comments are dropped without a message.
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    post_id: web::Path<String>,
    form: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, &post_id).await?;
    let form = form.into_inner();

    if form.validate().is_ok() {
        let comment = Comment::new(post.id, identity.user_id, form.text.trim().to_string());
        state.comments.create(comment).await?;
        tracing::info!(post_id = %post.id, author = %identity.username, "Comment added");
    }

    Ok(redirect(urls::post_detail(post.id)))
}

async fn find_post(state: &AppState, raw_id: &str) -> AppResult<Post> {
    let id = parse_post_id(raw_id)?;
    state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", id).into())
}

/// Post fields that passed validation.
struct CleanedPost {
    text: String,
    group_id: Option<Uuid>,
    image: Option<String>,
}

/// Validate a submitted post form; the group must exist.
async fn clean_post_form(
    state: &AppState,
    form: &PostForm,
) -> AppResult<Result<CleanedPost, FormErrors>> {
    let mut errors = form
        .validate()
        .err()
        .map(|e| form_errors(&e))
        .unwrap_or_default();

    let group_id = match form.group_id() {
        Ok(Some(id)) => {
            if state.groups.find_by_id(id).await?.is_some() {
                Some(id)
            } else {
                errors
                    .entry("group".to_string())
                    .or_default()
                    .push(INVALID_GROUP.to_string());
                None
            }
        }
        Ok(None) => None,
        Err(message) => {
            errors.entry("group".to_string()).or_default().push(message);
            None
        }
    };

    if !errors.is_empty() {
        return Ok(Err(errors));
    }

    Ok(Ok(CleanedPost {
        text: form.text.trim().to_string(),
        group_id,
        image: form.image_path(),
    }))
}

async fn render_post_form(
    state: &AppState,
    identity: &Identity,
    form: &PostForm,
    errors: &FormErrors,
    post: Option<&Post>,
) -> AppResult<HttpResponse> {
    let groups = state.groups.list().await?;

    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    context.insert("groups", &groups);
    context.insert("is_edit", &post.is_some());
    if let Some(post) = post {
        context.insert("post", post);
    }
    state
        .templates
        .page("posts/create_post.html", context, &Viewer::from(identity))
}
