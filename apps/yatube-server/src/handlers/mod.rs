//! HTTP handlers and route configuration.

mod auth;
mod follow;
mod health;
mod posts;

#[cfg(test)]
mod tests;

use actix_web::{HttpRequest, HttpResponse, http::header, web};
use uuid::Uuid;

use crate::middleware::error::{AppError, AppResult};

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(posts::index))
        .route("/group/{slug}/", web::get().to(posts::group_posts))
        .route("/follow/", web::get().to(follow::follow_index))
        .service(
            web::resource("/create/")
                .route(web::get().to(posts::post_create_form))
                .route(web::post().to(posts::post_create)),
        )
        .service(
            web::scope("/profile/{username}")
                .route("/", web::get().to(posts::profile))
                .route("/follow/", web::post().to(follow::profile_follow))
                .route("/unfollow/", web::post().to(follow::profile_unfollow)),
        )
        .service(
            web::scope("/posts/{post_id}")
                .route("/", web::get().to(posts::post_detail))
                .service(
                    web::resource("/edit/")
                        .route(web::get().to(posts::post_edit_form))
                        .route(web::post().to(posts::post_edit)),
                )
                .route("/comment/", web::post().to(posts::add_comment)),
        )
        .service(
            web::scope("/auth")
                .service(
                    web::resource("/signup/")
                        .route(web::get().to(auth::signup_form))
                        .route(web::post().to(auth::signup)),
                )
                .service(
                    web::resource("/login/")
                        .route(web::get().to(auth::login_form))
                        .route(web::post().to(auth::login)),
                )
                .service(
                    web::resource("/logout/")
                        .route(web::get().to(auth::logout))
                        .route(web::post().to(auth::logout)),
                ),
        )
        .route("/health/", web::get().to(health::health_check));
}

/// `302 Found` to `location`.
fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

/// First value of a query string parameter. Never fails.
fn query_param(req: &HttpRequest, name: &str) -> Option<String> {
    url::form_urlencoded::parse(req.query_string().as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Post ids in paths; anything unparseable is a missing page.
fn parse_post_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("Post {} not found", raw)))
}
