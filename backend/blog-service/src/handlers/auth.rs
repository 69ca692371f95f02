/// Account handlers - signup, login, logout
use actix_web::{
    cookie::{time::Duration as CookieDuration, Cookie, SameSite},
    http::header,
    web, HttpResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::render;
use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::forms::{
    self, safe_next, FormErrors, FormPayload, LoginForm, SignupForm, NON_FIELD_ERRORS,
};
use crate::models::{NewUser, User};
use crate::services::{hash_password, verify_password, SESSION_COOKIE};

const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, token)
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.secure_cookies)
        .max_age(CookieDuration::seconds(state.sessions.ttl_secs()))
        .finish()
}

/// Redirect to `location` with a fresh session for `user`
fn start_session(state: &AppState, user: &User, location: &str) -> Result<HttpResponse> {
    let token = state.sessions.issue(user)?;
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .cookie(session_cookie(state, token))
        .finish())
}

fn render_signup(form: &SignupForm, errors: &FormErrors) -> HttpResponse {
    render("users/signup", json!({ "form": forms::render(form, errors) }))
}

fn render_login(form: &LoginForm, errors: &FormErrors) -> HttpResponse {
    render(
        "users/login",
        json!({ "form": forms::render(form, errors), "next": form.next }),
    )
}

pub async fn signup_form() -> HttpResponse {
    render_signup(&SignupForm::default(), &FormErrors::new())
}

/// Create an account and sign it in
pub async fn signup(state: web::Data<AppState>, payload: FormPayload) -> Result<HttpResponse> {
    let form = SignupForm::bind(&payload);
    let mut errors = form.errors();

    if !errors.contains("username")
        && state
            .store
            .find_user_by_username(&form.username)
            .await?
            .is_some()
    {
        errors.add("username", DUPLICATE_USERNAME);
    }
    if !errors.is_empty() {
        return Ok(render_signup(&form, &errors));
    }

    let created = state
        .store
        .create_user(NewUser {
            username: form.username.clone(),
            password_hash: hash_password(&form.password1)?,
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            email: form.email(),
        })
        .await;

    let user = match created {
        Ok(user) => user,
        // lost a race with a concurrent signup
        Err(AppError::Conflict(_)) => {
            errors.add("username", DUPLICATE_USERNAME);
            return Ok(render_signup(&form, &errors));
        }
        Err(e) => return Err(e),
    };

    info!(user_id = user.id, username = %user.username, "user signed up");
    start_session(&state, &user, "/")
}

pub async fn login_form(query: web::Query<LoginQuery>) -> HttpResponse {
    let form = LoginForm {
        next: query.into_inner().next.unwrap_or_default(),
        ..LoginForm::default()
    };
    render_login(&form, &FormErrors::new())
}

/// Check credentials and continue to `next` when it is a local path
pub async fn login(state: web::Data<AppState>, payload: FormPayload) -> Result<HttpResponse> {
    let form = LoginForm::bind(&payload);
    let mut errors = form.errors();
    if !errors.is_empty() {
        return Ok(render_login(&form, &errors));
    }

    let user = match state.store.find_user_by_username(&form.username).await? {
        Some(user) if verify_password(&form.password, &user.password_hash)? => user,
        _ => {
            warn!(username = %form.username, "failed login attempt");
            errors.add(NON_FIELD_ERRORS, INVALID_LOGIN);
            return Ok(render_login(&form, &errors));
        }
    };

    info!(user_id = user.id, "user logged in");
    start_session(&state, &user, safe_next(&form.next).unwrap_or("/"))
}

/// Drop the session cookie
pub async fn logout(state: web::Data<AppState>) -> HttpResponse {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.secure_cookies)
        .finish();
    cookie.make_removal();

    HttpResponse::Ok()
        .cookie(cookie)
        .json(super::page_context("users/logged_out", json!({})))
}
