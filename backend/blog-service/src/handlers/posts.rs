/// Post handlers - listings, detail, create and edit
use actix_web::{web, HttpResponse};
use page_cache::CacheKey;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{page_context, post_detail_url, profile_url, redirect, render, PageQuery, PostEntry};
use crate::app_state::AppState;
use crate::db::PostFilter;
use crate::error::{AppError, Result};
use crate::forms::{self, CommentForm, FormErrors, FormPayload, PostForm};
use crate::metrics;
use crate::middleware::Viewer;
use crate::models::{AuthorView, GroupRef, NewPost, PostChanges, PostView};
use crate::services::{load_posts_page, requested_page_number};

/// Cache key prefix of the home listing
pub const INDEX_CACHE_PREFIX: &str = "index_page";

fn json_body(body: Vec<u8>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/json")
        .body(body)
}

/// Cache key of one home page; other query parameters never reach the key
pub fn index_cache_key(requested: Option<&str>) -> String {
    CacheKey::page(
        INDEX_CACHE_PREFIX,
        &format!("/?page={}", requested_page_number(requested)),
    )
}

/// Home listing of every post.
///
/// The rendered body is cached per requested page number for `index_ttl`;
/// writes do not invalidate it.
pub async fn index(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let key = index_cache_key(query.page.as_deref());

    match state.page_cache.get(&key).await {
        Ok(Some(body)) => {
            metrics::record_index_cache("hit");
            return Ok(json_body(body));
        }
        Ok(None) => metrics::record_index_cache("miss"),
        Err(e) => {
            metrics::record_index_cache("error");
            warn!(error = %e, key = %key, "index cache read failed; rendering from store");
        }
    }

    let page = load_posts_page(state.store.as_ref(), PostFilter::All, query.page.as_deref())
        .await?
        .map(|post| PostEntry::new(&state, post));
    let body = serde_json::to_vec(&page_context("posts/index", json!({ "page_obj": page })))?;

    if let Err(e) = state.page_cache.set(&key, &body, state.index_ttl).await {
        warn!(error = %e, key = %key, "index cache write failed");
    }

    Ok(json_body(body))
}

/// Posts of one group
pub async fn group_posts(
    state: web::Data<AppState>,
    slug: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let slug = slug.into_inner();
    let group = state
        .store
        .find_group_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("group '{}'", slug)))?;

    let page = load_posts_page(
        state.store.as_ref(),
        PostFilter::Group(group.id),
        query.page.as_deref(),
    )
    .await?
    .map(|post| PostEntry::new(&state, post));

    debug!(slug = %group.slug, count = page.count, "group listing");
    Ok(render(
        "posts/group_list",
        json!({ "group": group, "page_obj": page }),
    ))
}

/// Posts of one author plus the viewer's follow state
pub async fn profile(
    state: web::Data<AppState>,
    username: web::Path<String>,
    query: web::Query<PageQuery>,
    viewer: Option<Viewer>,
) -> Result<HttpResponse> {
    let username = username.into_inner();
    let author = state
        .store
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user '{}'", username)))?;

    let page = load_posts_page(
        state.store.as_ref(),
        PostFilter::Author(author.id),
        query.page.as_deref(),
    )
    .await?
    .map(|post| PostEntry::new(&state, post));

    let following = match &viewer {
        Some(viewer) => state.store.is_following(viewer.id, author.id).await?,
        None => false,
    };

    Ok(render(
        "posts/profile",
        json!({
            "author": AuthorView::from(&author),
            "post_count": page.count,
            "following": following,
            "page_obj": page,
        }),
    ))
}

/// One post with its comments, newest first
pub async fn post_detail(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = find_post(&state, post_id).await?;

    let post_count = state
        .store
        .count_posts(PostFilter::Author(post.author.id))
        .await?;
    let comments = state.store.list_comments(post_id).await?;

    Ok(render(
        "posts/post_detail",
        json!({
            "post": PostEntry::new(&state, post),
            "post_count": post_count,
            "comments": comments,
            "form": forms::render(&CommentForm::default(), &FormErrors::new()),
        }),
    ))
}

async fn find_post(state: &AppState, post_id: i64) -> Result<PostView> {
    state
        .store
        .find_post(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))
}

async fn render_post_form(
    state: &AppState,
    form: &PostForm,
    errors: &FormErrors,
    edit_of: Option<i64>,
) -> Result<HttpResponse> {
    let groups: Vec<GroupRef> = state
        .store
        .list_groups()
        .await?
        .iter()
        .map(GroupRef::from)
        .collect();

    Ok(render(
        "posts/create_post",
        json!({
            "form": forms::render(form, errors),
            "groups": groups,
            "is_edit": edit_of.is_some(),
            "post_id": edit_of,
        }),
    ))
}

/// Empty post form
pub async fn post_create_form(
    state: web::Data<AppState>,
    _viewer: Viewer,
) -> Result<HttpResponse> {
    render_post_form(&state, &PostForm::default(), &FormErrors::new(), None).await
}

/// Store a new post by the viewer and go to their profile
pub async fn post_create(
    state: web::Data<AppState>,
    viewer: Viewer,
    payload: FormPayload,
) -> Result<HttpResponse> {
    let form = PostForm::bind(payload);
    let cleaned = match form.clean(state.store.as_ref()).await? {
        Ok(cleaned) => cleaned,
        Err(errors) => return render_post_form(&state, &form, &errors, None).await,
    };

    let image = match &cleaned.image {
        Some(upload) => Some(state.media.save_post_image(upload).await?),
        None => None,
    };

    let post = state
        .store
        .create_post(NewPost {
            author_id: viewer.id,
            text: cleaned.text,
            group_id: cleaned.group_id,
            image,
        })
        .await?;

    metrics::POSTS_CREATED_TOTAL.inc();
    info!(post_id = post.id, author_id = viewer.id, "post created");

    Ok(redirect(profile_url(&viewer.username)))
}

/// Post form prefilled for its author
pub async fn post_edit_form(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
    viewer: Viewer,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = find_post(&state, post_id).await?;
    if post.author.id != viewer.id {
        return Ok(redirect(post_detail_url(post_id)));
    }

    let image_url = post.image.as_deref().map(|path| state.media_url(path));
    let form = PostForm::initial(&post, image_url);
    render_post_form(&state, &form, &FormErrors::new(), Some(post_id)).await
}

/// Apply an edit by the post's author
pub async fn post_edit(
    state: web::Data<AppState>,
    post_id: web::Path<i64>,
    viewer: Viewer,
    payload: FormPayload,
) -> Result<HttpResponse> {
    let post_id = post_id.into_inner();
    let post = find_post(&state, post_id).await?;
    if post.author.id != viewer.id {
        warn!(post_id, viewer_id = viewer.id, "edit attempt by non-author");
        return Ok(redirect(post_detail_url(post_id)));
    }

    let mut form = PostForm::bind(payload);
    form.image = post.image.as_deref().map(|path| state.media_url(path));
    let cleaned = match form.clean(state.store.as_ref()).await? {
        Ok(cleaned) => cleaned,
        Err(errors) => return render_post_form(&state, &form, &errors, Some(post_id)).await,
    };

    let image = match &cleaned.image {
        Some(upload) => Some(Some(state.media.save_post_image(upload).await?)),
        None if cleaned.clear_image => Some(None),
        None => None,
    };

    state
        .store
        .update_post(
            post_id,
            PostChanges {
                text: cleaned.text,
                group_id: cleaned.group_id,
                image,
            },
        )
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {}", post_id)))?;

    info!(post_id, author_id = viewer.id, "post updated");
    Ok(redirect(post_detail_url(post_id)))
}
