//! Shared setup for blog-service integration tests
//!
//! Every test gets its own in-memory store, in-process page cache and
//! temporary media directory, wired through the same `build_app` the
//! binary serves.
#![allow(dead_code)]

use actix_web::{
    body::MessageBody,
    cookie::Cookie,
    dev::{Service, ServiceResponse},
    test, web,
};
use blog_service::db::{BlogStore, MemoryStore, PostFilter};
use blog_service::models::{Group, NewGroup, NewPost, NewUser, Post, User};
use blog_service::services::{MediaStorage, SessionKeys, SESSION_COOKIE};
use blog_service::{build_app, AppState};
use page_cache::{MemoryPageCache, PageCache};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const TEST_SECRET: &str = "integration-test-session-secret-0123456789";

pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub cache: MemoryPageCache,
    pub state: web::Data<AppState>,
    pub media_dir: TempDir,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_index_ttl(Duration::from_secs(20))
    }

    pub fn with_index_ttl(ttl: Duration) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = MemoryPageCache::new();
        let media_dir = tempfile::tempdir().expect("failed to create media dir");

        let state = AppState::new(
            store.clone(),
            Arc::new(cache.clone()),
            MediaStorage::new(media_dir.path(), "/media/"),
            SessionKeys::new(TEST_SECRET, 3600),
        )
        .with_index_ttl(ttl);

        Self {
            store,
            cache,
            state: web::Data::new(state),
            media_dir,
        }
    }

    pub async fn app(
        &self,
    ) -> impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
    > {
        test::init_service(build_app(self.state.clone())).await
    }

    /// User with an unusable password hash; sign in through `session_for`
    pub async fn create_user(&self, username: &str) -> User {
        self.store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: "!".to_string(),
                first_name: String::new(),
                last_name: String::new(),
                email: None,
            })
            .await
            .expect("failed to create user")
    }

    pub async fn create_group(&self, slug: &str, title: &str) -> Group {
        self.store
            .create_group(NewGroup {
                title: title.to_string(),
                slug: slug.to_string(),
                description: "Тестовое описание".to_string(),
            })
            .await
            .expect("failed to create group")
    }

    pub async fn create_post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        self.store
            .create_post(NewPost {
                author_id: author.id,
                text: text.to_string(),
                group_id: group.map(|g| g.id),
                image: None,
            })
            .await
            .expect("failed to create post")
    }

    pub async fn post_count(&self) -> i64 {
        self.store
            .count_posts(PostFilter::All)
            .await
            .expect("failed to count posts")
    }

    /// Session cookie signing in `user`
    pub fn session_for(&self, user: &User) -> Cookie<'static> {
        let token = self.state.sessions.issue(user).expect("failed to sign session");
        Cookie::new(SESSION_COOKIE, token)
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await.expect("failed to clear cache");
    }
}

/// Small valid PNG
pub fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(2, 2, image::Rgb([10, 120, 200]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .expect("failed to encode png");
    out.into_inner()
}

pub const BOUNDARY: &str = "----QuillTestBoundary";

/// `multipart/form-data` body with text fields and one optional file
pub fn multipart_body(fields: &[(&str, &str)], file: Option<(&str, &str, &[u8])>) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    if let Some((name, filename, bytes)) = file {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                name, filename
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
