/// Follow handlers - feed, follow and unfollow
use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::info;

use super::{profile_url, redirect, render, PageQuery, PostEntry};
use crate::app_state::AppState;
use crate::db::PostFilter;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::middleware::Viewer;
use crate::models::User;
use crate::services::load_posts_page;

async fn find_author(state: &AppState, username: &str) -> Result<User> {
    state
        .store
        .find_user_by_username(username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))
}

/// Posts by authors the viewer follows
pub async fn follow_index(
    state: web::Data<AppState>,
    viewer: Viewer,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = load_posts_page(
        state.store.as_ref(),
        PostFilter::FollowedBy(viewer.id),
        query.page.as_deref(),
    )
    .await?
    .map(|post| PostEntry::new(&state, post));

    Ok(render("posts/follow", json!({ "page_obj": page })))
}

/// Follow an author. Following oneself or an already followed author
/// changes nothing.
pub async fn profile_follow(
    state: web::Data<AppState>,
    username: web::Path<String>,
    viewer: Viewer,
) -> Result<HttpResponse> {
    let author = find_author(&state, &username).await?;

    if author.id != viewer.id && state.store.create_follow(viewer.id, author.id).await? {
        metrics::FOLLOWS_CREATED_TOTAL.inc();
        info!(user_id = viewer.id, author_id = author.id, "follow created");
    }

    Ok(redirect(profile_url(&author.username)))
}

/// Stop following an author; a missing edge is ignored
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    username: web::Path<String>,
    viewer: Viewer,
) -> Result<HttpResponse> {
    let author = find_author(&state, &username).await?;

    if state.store.delete_follow(viewer.id, author.id).await? {
        info!(user_id = viewer.id, author_id = author.id, "follow removed");
    }

    Ok(redirect(profile_url(&author.username)))
}
