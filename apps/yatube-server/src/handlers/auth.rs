//! Account handlers: signup, login and logout.

use actix_web::{HttpRequest, HttpResponse, http::header, web};
use tera::Context;
use validator::Validate;

use yatube_core::domain::User;
use yatube_core::error::RepoError;
use yatube_shared::{FormErrors, LoginForm, SignupForm, form_errors, safe_next};

use super::query_param;
use crate::middleware::auth::{Identity, Viewer, removal_cookie, session_cookie};
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::urls;

const USERNAME_TAKEN: &str = "A user with that username already exists.";
const BAD_CREDENTIALS: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Redirect carrying a fresh session for `user`.
fn start_session(state: &AppState, user: &User, location: &str) -> AppResult<HttpResponse> {
    let token = state.tokens.generate_token(user.id, &user.username)?;
    let cookie = session_cookie(
        token,
        state.tokens.expiration_seconds(),
        state.settings.secure_cookies,
    );

    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .cookie(cookie)
        .finish())
}

fn push_error(errors: &mut FormErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

/// GET /auth/signup/
pub async fn signup_form(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    render_signup(&state, &SignupForm::default(), &FormErrors::new())
}

/// POST /auth/signup/
pub async fn signup(
    state: web::Data<AppState>,
    form: web::Form<SignupForm>,
) -> AppResult<HttpResponse> {
    let form = form.into_inner();

    let mut errors = form
        .validate()
        .err()
        .map(|e| form_errors(&e))
        .unwrap_or_default();
    if !errors.contains_key("username")
        && state.users.find_by_username(&form.username).await?.is_some()
    {
        push_error(&mut errors, "username", USERNAME_TAKEN);
    }
    if !errors.is_empty() {
        return render_signup(&state, &form, &errors);
    }

    let password_hash = state.passwords.hash(&form.password1)?;
    let user = User::new(form.username.clone(), form.email.clone(), password_hash);

    let user = match state.users.create(user).await {
        Ok(user) => user,
        // Lost a race with another signup for the same name.
        Err(RepoError::Constraint(_)) => {
            push_error(&mut errors, "username", USERNAME_TAKEN);
            return render_signup(&state, &form, &errors);
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");
    start_session(&state, &user, urls::INDEX)
}

fn render_signup(state: &AppState, form: &SignupForm, errors: &FormErrors) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    state
        .templates
        .page("users/signup.html", context, &Viewer::default())
}

/// GET /auth/login/
pub async fn login_form(state: web::Data<AppState>, req: HttpRequest) -> AppResult<HttpResponse> {
    let form = LoginForm {
        next: query_param(&req, "next"),
        ..Default::default()
    };
    render_login(&state, &form, &FormErrors::new())
}

/// POST /auth/login/
pub async fn login(
    state: web::Data<AppState>,
    req: HttpRequest,
    form: web::Form<LoginForm>,
) -> AppResult<HttpResponse> {
    let mut form = form.into_inner();
    if form.next.is_none() {
        form.next = query_param(&req, "next");
    }

    if let Err(e) = form.validate() {
        return render_login(&state, &form, &form_errors(&e));
    }

    let user = match state.users.find_by_username(form.username.trim()).await? {
        Some(user) if state.passwords.verify(&form.password, &user.password_hash)? => user,
        _ => {
            tracing::debug!(username = %form.username, "Failed login");
            let mut errors = FormErrors::new();
            push_error(&mut errors, "non_field_errors", BAD_CREDENTIALS);
            return render_login(&state, &form, &errors);
        }
    };

    tracing::info!(user_id = %user.id, "User logged in");
    let location = safe_next(form.next.as_deref()).unwrap_or(urls::INDEX);
    start_session(&state, &user, location)
}

fn render_login(state: &AppState, form: &LoginForm, errors: &FormErrors) -> AppResult<HttpResponse> {
    let mut context = Context::new();
    context.insert("form", form);
    context.insert("errors", errors);
    state
        .templates
        .page("users/login.html", context, &Viewer::default())
}

/// GET|POST /auth/logout/
pub async fn logout(state: web::Data<AppState>, identity: Option<Identity>) -> AppResult<HttpResponse> {
    if let Some(identity) = identity {
        tracing::info!(user_id = %identity.user_id, "User logged out");
    }

    let body = state
        .templates
        .render("users/logged_out.html", Context::new(), &Viewer::default())?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .cookie(removal_cookie())
        .body(body))
}
