/// Comment handlers
use actix_web::{web, HttpResponse};
use tracing::{debug, info};

use super::{post_detail_url, redirect};
use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::forms::{CommentForm, FormPayload};
use crate::metrics;
use crate::middleware::Viewer;
use crate::models::NewComment;

/// Add a comment by the viewer; always returns to the post.
///
/// An invalid comment is dropped without feedback.
pub async fn add_comment(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
    viewer: Viewer,
    payload: FormPayload,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    if state.store.find_post(post_id).await?.is_none() {
        return Err(AppError::NotFound(format!("post {}", post_id)));
    }

    let form = CommentForm::bind(&payload);
    if form.errors().is_empty() {
        let comment = state
            .store
            .create_comment(NewComment {
                post_id,
                author_id: viewer.id,
                text: form.text.trim().to_string(),
            })
            .await?;

        metrics::COMMENTS_CREATED_TOTAL.inc();
        info!(comment_id = comment.id, post_id, author_id = viewer.id, "comment added");
    } else {
        debug!(post_id, "discarding invalid comment");
    }

    Ok(redirect(post_detail_url(post_id)))
}
