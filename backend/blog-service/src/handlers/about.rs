use actix_web::HttpResponse;
use serde_json::json;

use super::render;

pub async fn about_author() -> HttpResponse {
    render(
        "about/author",
        json!({
            "title": "About the author",
            "text": "Quill is written and maintained by a small team of developers who enjoy reading other people's stories.",
        }),
    )
}

pub async fn about_tech() -> HttpResponse {
    render(
        "about/tech",
        json!({
            "title": "Technologies",
            "stack": ["Rust", "actix-web", "sqlx", "PostgreSQL", "Redis"],
        }),
    )
}
