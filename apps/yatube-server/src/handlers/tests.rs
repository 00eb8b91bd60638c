use std::sync::OnceLock;

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use uuid::Uuid;

use yatube_core::domain::{Comment, Group, Post, PostFeed, User};
use yatube_infra::JwtConfig;

use super::configure_routes;
use super::posts::index_cache_key;
use crate::config::ViewSettings;
use crate::middleware::auth::{SESSION_COOKIE, session_cookie};
use crate::middleware::error_pages::error_pages;
use crate::state::AppState;

macro_rules! init_app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .wrap(error_pages())
                .app_data(web::Data::new($state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

fn test_state() -> AppState {
    AppState::in_memory(JwtConfig::default(), ViewSettings::default()).unwrap()
}

/// Hashing is slow in debug builds; every test user shares one password.
fn password_hash(state: &AppState) -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| state.passwords.hash("correct-horse").unwrap())
        .clone()
}

async fn create_user(state: &AppState, username: &str) -> User {
    let hash = password_hash(state);
    let user = User::new(
        username.to_string(),
        format!("{username}@example.com"),
        hash,
    );
    state.users.create(user).await.unwrap()
}

async fn create_group(state: &AppState, slug: &str) -> Group {
    let group = Group::new("Test group", slug, "Test description");
    state.groups.create(group).await.unwrap()
}

async fn create_post(state: &AppState, author: &User, text: &str, group: Option<&Group>) -> Post {
    let post = Post::new(author.id, text.to_string(), group.map(|g| g.id), None);
    state.posts.create(post).await.unwrap()
}

fn session(state: &AppState, user: &User) -> Cookie<'static> {
    let token = state.tokens.generate_token(user.id, &user.username).unwrap();
    session_cookie(token, 3600, false)
}

fn location<B>(resp: &ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

fn count_cards(body: &str) -> usize {
    body.matches("class=\"post-card\"").count()
}

async fn body_of<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

#[actix_web::test]
async fn test_public_pages_are_available() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let group = create_group(&state, "test-slug").await;
    let post = create_post(&state, &author, "Public post", Some(&group)).await;
    let app = init_app!(state);

    for uri in [
        "/".to_string(),
        "/group/test-slug/".to_string(),
        "/profile/leo/".to_string(),
        format!("/posts/{}/", post.id),
        "/auth/login/".to_string(),
        "/auth/signup/".to_string(),
    ] {
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {uri}");
    }
}

#[actix_web::test]
async fn test_missing_pages_render_404_template() {
    let state = test_state();
    let app = init_app!(state);

    for uri in [
        "/unexisting_page/".to_string(),
        "/group/missing/".to_string(),
        "/profile/nobody/".to_string(),
        "/posts/not-a-uuid/".to_string(),
        format!("/posts/{}/", Uuid::new_v4()),
    ] {
        let req = test::TestRequest::get().uri(&uri).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET {uri}");
        let body = body_of(resp).await;
        assert!(body.contains("Page Not Found"), "GET {uri}");
    }
}

#[actix_web::test]
async fn test_login_only_pages_redirect_anonymous() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let post = create_post(&state, &author, "Some post", None).await;
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/create/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=%2Fcreate%2F");

    let edit = format!("/posts/{}/edit/", post.id);
    let req = test::TestRequest::get().uri(&edit).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert!(location(&resp).starts_with("/auth/login/?next=%2Fposts%2F"));

    let req = test::TestRequest::get().uri("/follow/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/auth/login/?next=%2Ffollow%2F");
}

#[actix_web::test]
async fn test_feeds_paginate_ten_then_three() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let follower = create_user(&state, "reader").await;
    let group = create_group(&state, "test-slug").await;
    for i in 0..13 {
        create_post(&state, &author, &format!("Post number {i}"), Some(&group)).await;
    }
    state.follows.follow(follower.id, author.id).await.unwrap();
    let app = init_app!(state);

    for base in ["/", "/group/test-slug/", "/profile/leo/", "/follow/"] {
        for (page, expected) in [("1", 10), ("2", 3)] {
            let req = test::TestRequest::get()
                .uri(&format!("{base}?page={page}"))
                .cookie(session(&state, &follower))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body = body_of(resp).await;
            assert_eq!(count_cards(&body), expected, "{base} page {page}");
        }
    }
}

#[actix_web::test]
async fn test_invalid_page_numbers_fall_back() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    for i in 0..13 {
        create_post(&state, &author, &format!("Post number {i}"), None).await;
    }
    let app = init_app!(state);

    for (page, expected) in [("abc", 10), ("0", 10), ("99", 3)] {
        let req = test::TestRequest::get()
            .uri(&format!("/profile/leo/?page={page}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(count_cards(&body_of(resp).await), expected, "page {page}");
    }
}

#[actix_web::test]
async fn test_post_appears_in_its_group_only() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let group = create_group(&state, "test-slug").await;
    create_group(&state, "other-slug").await;
    create_post(&state, &author, "Grouped post", Some(&group)).await;
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/group/test-slug/").to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(body.contains("Grouped post"));

    let req = test::TestRequest::get().uri("/group/other-slug/").to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(!body.contains("Grouped post"));
    assert_eq!(count_cards(&body), 0);
}

#[actix_web::test]
async fn test_create_post_adds_one_record() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let group = create_group(&state, "test-slug").await;
    let app = init_app!(state);

    let before = state.posts.count(PostFeed::All).await.unwrap();
    let group_id = group.id.to_string();
    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(session(&state, &author))
        .set_form(&[("text", "  Brand new post  "), ("group", group_id.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/profile/leo/");
    assert_eq!(state.posts.count(PostFeed::All).await.unwrap(), before + 1);

    let window = yatube_core::PageWindow::resolve(1, 10, None);
    let created = state.posts.list(PostFeed::Group(group.id), window).await.unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].text, "Brand new post");
    assert_eq!(created[0].author_id, author.id);
}

#[actix_web::test]
async fn test_invalid_post_form_is_redisplayed() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let app = init_app!(state);

    let missing_group = Uuid::new_v4().to_string();
    let req = test::TestRequest::post()
        .uri("/create/")
        .cookie(session(&state, &author))
        .set_form(&[("text", "   "), ("group", missing_group.as_str())])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_of(resp).await;
    assert!(body.contains("Enter the text of the post."));
    assert!(body.contains("Select a valid choice."));
    assert_eq!(state.posts.count(PostFeed::All).await.unwrap(), 0);
}

#[actix_web::test]
async fn test_author_edit_updates_in_place() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let post = create_post(&state, &author, "Original text", None).await;
    let app = init_app!(state);

    let uri = format!("/posts/{}/edit/", post.id);
    let req = test::TestRequest::get()
        .uri(&uri)
        .cookie(session(&state, &author))
        .to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(body.contains("Original text"));

    let req = test::TestRequest::post()
        .uri(&uri)
        .cookie(session(&state, &author))
        .set_form(&[("text", "Edited text")])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    assert_eq!(state.posts.count(PostFeed::All).await.unwrap(), 1);

    let saved = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(saved.text, "Edited text");
    assert_eq!(saved.pub_date, post.pub_date);
}

#[actix_web::test]
async fn test_non_author_edit_redirects_to_detail() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let intruder = create_user(&state, "intruder").await;
    let post = create_post(&state, &author, "Original text", None).await;
    let app = init_app!(state);

    let uri = format!("/posts/{}/edit/", post.id);
    for req in [
        test::TestRequest::get()
            .uri(&uri)
            .cookie(session(&state, &intruder))
            .to_request(),
        test::TestRequest::post()
            .uri(&uri)
            .cookie(session(&state, &intruder))
            .set_form(&[("text", "Hijacked")])
            .to_request(),
    ] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    }

    let saved = state.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(saved.text, "Original text");
}

#[actix_web::test]
async fn test_comments_require_login_and_text() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let reader = create_user(&state, "reader").await;
    let post = create_post(&state, &author, "Commented post", None).await;
    let app = init_app!(state);
    let uri = format!("/posts/{}/comment/", post.id);

    let req = test::TestRequest::post()
        .uri(&uri)
        .set_form(&[("text", "Anonymous comment")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(location(&resp).starts_with("/auth/login/"));

    let req = test::TestRequest::post()
        .uri(&uri)
        .cookie(session(&state, &reader))
        .set_form(&[("text", "   ")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
    assert!(state.comments.find_by_post(post.id).await.unwrap().is_empty());

    let req = test::TestRequest::post()
        .uri(&uri)
        .cookie(session(&state, &reader))
        .set_form(&[("text", "Nice post")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);

    let comments: Vec<Comment> = state.comments.find_by_post(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].author_id, reader.id);

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/", post.id))
        .to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(body.contains("Nice post"));

    let req = test::TestRequest::post()
        .uri(&format!("/posts/{}/comment/", Uuid::new_v4()))
        .cookie(session(&state, &reader))
        .set_form(&[("text", "Lost comment")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_follow_and_unfollow_are_inverse() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let reader = create_user(&state, "reader").await;
    let app = init_app!(state);

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/profile/leo/follow/")
            .cookie(session(&state, &reader))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(location(&resp), "/profile/leo/");
    }
    assert_eq!(state.follows.count().await.unwrap(), 1);
    assert!(state.follows.is_following(reader.id, author.id).await.unwrap());

    let req = test::TestRequest::post()
        .uri("/profile/leo/unfollow/")
        .cookie(session(&state, &reader))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/profile/leo/");
    assert_eq!(state.follows.count().await.unwrap(), 0);
}

#[actix_web::test]
async fn test_profile_button_tracks_follow_state() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let reader = create_user(&state, "reader").await;
    let app = init_app!(state);

    let profile_request = |user: &User, uri: &'static str| {
        test::TestRequest::get()
            .uri(uri)
            .cookie(session(&state, user))
            .to_request()
    };

    let body = body_of(test::call_service(&app, profile_request(&reader, "/profile/leo/")).await).await;
    assert!(body.contains("class=\"follow\""));
    assert!(!body.contains("class=\"unfollow\""));

    state.follows.follow(reader.id, author.id).await.unwrap();
    let body = body_of(test::call_service(&app, profile_request(&reader, "/profile/leo/")).await).await;
    assert!(!body.contains("class=\"follow\""));
    assert!(body.contains("class=\"unfollow\""));

    let body = body_of(test::call_service(&app, profile_request(&author, "/profile/leo/")).await).await;
    assert!(!body.contains("class=\"follow\""));
    assert!(!body.contains("class=\"unfollow\""));
}

#[actix_web::test]
async fn test_self_follow_is_ignored() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/profile/leo/follow/")
        .cookie(session(&state, &author))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(state.follows.count().await.unwrap(), 0);
}

#[actix_web::test]
async fn test_follow_feed_shows_followed_authors_only() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    let follower = create_user(&state, "follower").await;
    let stranger = create_user(&state, "stranger").await;
    create_post(&state, &author, "Followed post", None).await;
    state.follows.follow(follower.id, author.id).await.unwrap();
    let app = init_app!(state);

    let req = test::TestRequest::get()
        .uri("/follow/")
        .cookie(session(&state, &follower))
        .to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(body.contains("Followed post"));

    let req = test::TestRequest::get()
        .uri("/follow/")
        .cookie(session(&state, &stranger))
        .to_request();
    let body = body_of(test::call_service(&app, req).await).await;
    assert!(!body.contains("Followed post"));
}

#[actix_web::test]
async fn test_index_page_is_cached() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    create_post(&state, &author, "First post", None).await;
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/").to_request();
    let first = body_of(test::call_service(&app, req).await).await;

    create_post(&state, &author, "Cached away", None).await;
    let req = test::TestRequest::get().uri("/").to_request();
    let second = body_of(test::call_service(&app, req).await).await;
    assert_eq!(first, second);
    assert!(!second.contains("Cached away"));

    state.cache.clear().await.unwrap();
    let req = test::TestRequest::get().uri("/").to_request();
    let third = body_of(test::call_service(&app, req).await).await;
    assert!(third.contains("Cached away"));
}

#[actix_web::test]
async fn test_index_pages_that_resolve_alike_share_a_cache_entry() {
    let state = test_state();
    let author = create_user(&state, "leo").await;
    create_post(&state, &author, "Only post", None).await;
    let app = init_app!(state);

    for page in ["1", "abc", "0", "-1", "999", "x1"] {
        let req = test::TestRequest::get()
            .uri(&format!("/?page={page}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "page {page}");
    }

    assert!(state.cache.exists(&index_cache_key(None, 1)).await);
    for raw in ["abc", "0", "-1", "999", "x1"] {
        let key = format!("index_page:anonymous:{raw}");
        assert!(!state.cache.exists(&key).await, "{key}");
    }
}

#[actix_web::test]
async fn test_signup_logs_the_user_in() {
    let state = test_state();
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form(&[
            ("username", "new.author"),
            ("email", "new@example.com"),
            ("password1", "long-enough"),
            ("password2", "long-enough"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/");
    assert!(
        resp.response()
            .cookies()
            .any(|c| c.name() == SESSION_COOKIE && !c.value().is_empty())
    );
    assert!(state.users.find_by_username("new.author").await.unwrap().is_some());

    let req = test::TestRequest::post()
        .uri("/auth/signup/")
        .set_form(&[
            ("username", "new.author"),
            ("email", "other@example.com"),
            ("password1", "long-enough"),
            ("password2", "long-enough"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_of(resp).await.contains("already exists"));
}

#[actix_web::test]
async fn test_login_follows_local_next_only() {
    let state = test_state();
    create_user(&state, "leo").await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form(&[("username", "leo"), ("password", "wrong-password")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_of(resp).await.contains("Please enter a correct username and password."));

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form(&[
            ("username", "leo"),
            ("password", "correct-horse"),
            ("next", "/create/"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/create/");

    let req = test::TestRequest::post()
        .uri("/auth/login/")
        .set_form(&[
            ("username", "leo"),
            ("password", "correct-horse"),
            ("next", "https://evil.example/"),
        ])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(location(&resp), "/");
}

#[actix_web::test]
async fn test_logout_clears_session() {
    let state = test_state();
    let user = create_user(&state, "leo").await;
    let app = init_app!(state);

    let req = test::TestRequest::post()
        .uri("/auth/logout/")
        .cookie(session(&state, &user))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::OK);
    let cleared = resp
        .response()
        .cookies()
        .find(|c| c.name() == SESSION_COOKIE)
        .unwrap();
    assert!(cleared.value().is_empty());
}

#[actix_web::test]
async fn test_health_check() {
    let state = test_state();
    let app = init_app!(state);

    let req = test::TestRequest::get().uri("/health/").to_request();
    let resp: serde_json::Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(resp["status"], "ok");
}
