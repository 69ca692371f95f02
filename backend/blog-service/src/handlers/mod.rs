/// HTTP handlers for blog-service
///
/// Every page is a JSON document whose `page` field names the page and whose
/// other fields are the data the page shows. Successful form submissions
/// answer with a 302 redirect.
pub mod about;
pub mod auth;
pub mod comments;
pub mod fallback;
pub mod follows;
pub mod health;
pub mod posts;

use actix_web::{http::header, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::models::PostView;

pub use about::{about_author, about_tech};
pub use auth::{login, login_form, logout, signup, signup_form};
pub use comments::add_comment;
pub use fallback::not_found;
pub use follows::{follow_index, profile_follow, profile_unfollow};
pub use health::{health_check, liveness_check, readiness_check};
pub use posts::{
    group_posts, index, post_create, post_create_form, post_detail, post_edit, post_edit_form,
    profile,
};

/// `?page=` of listing pages; kept raw so malformed values fall back to page 1
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

/// Post as shown in listings, with the public URL of its image
#[derive(Debug, Clone, Serialize)]
pub struct PostEntry {
    #[serde(flatten)]
    pub post: PostView,
    pub image_url: Option<String>,
}

impl PostEntry {
    pub fn new(state: &AppState, post: PostView) -> Self {
        let image_url = post.image.as_deref().map(|path| state.media_url(path));
        Self { post, image_url }
    }
}

/// Attach the page name to a context object
pub fn page_context(page: &str, context: serde_json::Value) -> serde_json::Value {
    let mut document = serde_json::Map::new();
    document.insert("page".to_string(), serde_json::Value::from(page));
    if let serde_json::Value::Object(fields) = context {
        document.extend(fields);
    }
    serde_json::Value::Object(document)
}

/// 200 response carrying a rendered page
pub fn render(page: &str, context: serde_json::Value) -> HttpResponse {
    HttpResponse::Ok().json(page_context(page, context))
}

/// 302 to `location`
pub fn redirect(location: impl AsRef<str>) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location.as_ref()))
        .finish()
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub fn post_detail_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_context_names_the_page() {
        let doc = page_context("posts/index", serde_json::json!({ "count": 3 }));
        assert_eq!(doc["page"], "posts/index");
        assert_eq!(doc["count"], 3);
    }

    #[test]
    fn redirect_sets_location() {
        let resp = redirect("/posts/4/");
        assert_eq!(resp.status(), 302);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/posts/4/");
    }

    #[test]
    fn urls_follow_route_table() {
        assert_eq!(profile_url("leo"), "/profile/leo/");
        assert_eq!(post_detail_url(12), "/posts/12/");
    }
}
