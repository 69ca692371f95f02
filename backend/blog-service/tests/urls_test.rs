/// URL access: public pages, login redirects and unknown resources
mod common;

use actix_web::{http::header, http::StatusCode, test};
use common::fixtures::TestContext;

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

#[actix_web::test]
async fn public_pages_are_open_to_anonymous_users() {
    let ctx = TestContext::new();
    let author = ctx.create_user("auth").await;
    let group = ctx.create_group("test-slug", "Тестовая группа").await;
    let post = ctx.create_post(&author, "Тестовый пост", Some(&group)).await;
    let app = ctx.app().await;

    let urls = [
        "/".to_string(),
        "/group/test-slug/".to_string(),
        "/profile/auth/".to_string(),
        format!("/posts/{}/", post.id),
        "/about/author/".to_string(),
        "/about/tech/".to_string(),
        "/auth/signup/".to_string(),
        "/auth/login/".to_string(),
    ];

    for url in urls {
        let req = test::TestRequest::get().uri(&url).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", url);
    }
}

#[actix_web::test]
async fn unknown_page_renders_not_found() {
    let ctx = TestContext::new();
    let app = ctx.app().await;

    let req = test::TestRequest::get().uri("/unexisting_page/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["page"], "core/404");
}

#[actix_web::test]
async fn missing_entities_are_not_found() {
    let ctx = TestContext::new();
    let app = ctx.app().await;

    for url in [
        "/group/no-such-group/",
        "/profile/nobody/",
        "/posts/999/",
        "/posts/not-a-number/",
    ] {
        let req = test::TestRequest::get().uri(url).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "GET {}", url);
    }
}

#[actix_web::test]
async fn protected_pages_redirect_anonymous_users_to_login() {
    let ctx = TestContext::new();
    let author = ctx.create_user("auth").await;
    let post = ctx.create_post(&author, "Тестовый пост", None).await;
    let app = ctx.app().await;

    let edit = format!("/posts/{}/edit/", post.id);
    for url in ["/create/", edit.as_str(), "/follow/", "/profile/auth/follow/"] {
        let req = test::TestRequest::get().uri(url).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FOUND, "GET {}", url);
        assert_eq!(location(&resp), format!("/auth/login/?next={}", url));
    }

    let comment = format!("/posts/{}/comment/", post.id);
    let req = test::TestRequest::post()
        .uri(&comment)
        .set_form([("text", "Аноним")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/auth/login/?next={}", comment));
}

#[actix_web::test]
async fn signed_in_user_reaches_protected_pages() {
    let ctx = TestContext::new();
    let author = ctx.create_user("auth").await;
    let post = ctx.create_post(&author, "Тестовый пост", None).await;
    let cookie = ctx.session_for(&author);
    let app = ctx.app().await;

    let edit = format!("/posts/{}/edit/", post.id);
    for url in ["/create/", edit.as_str(), "/follow/"] {
        let req = test::TestRequest::get()
            .uri(url)
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", url);
    }
}

#[actix_web::test]
async fn bearer_token_signs_in_like_the_cookie() {
    let ctx = TestContext::new();
    let user = ctx.create_user("auth").await;
    let token = ctx.session_for(&user).value().to_string();
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri("/create/")
        .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn invalid_session_is_treated_as_anonymous() {
    let ctx = TestContext::new();
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri("/create/")
        .cookie(actix_web::cookie::Cookie::new("session", "not-a-token"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), "/auth/login/?next=/create/");
}

#[actix_web::test]
async fn non_author_edit_redirects_to_post() {
    let ctx = TestContext::new();
    let author = ctx.create_user("auth").await;
    let other = ctx.create_user("other").await;
    let post = ctx.create_post(&author, "Тестовый пост", None).await;
    let app = ctx.app().await;

    let req = test::TestRequest::get()
        .uri(&format!("/posts/{}/edit/", post.id))
        .cookie(ctx.session_for(&other))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FOUND);
    assert_eq!(location(&resp), format!("/posts/{}/", post.id));
}

#[actix_web::test]
async fn health_endpoints_respond() {
    let ctx = TestContext::new();
    let app = ctx.app().await;

    for url in ["/health", "/health/ready", "/health/live", "/metrics"] {
        let req = test::TestRequest::get().uri(url).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {}", url);
    }
}
