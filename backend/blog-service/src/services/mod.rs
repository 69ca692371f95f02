/// Business logic helpers for blog-service
///
/// - Paginator: page slicing for every post listing
/// - Auth: password hashing and signed session tokens
/// - Media: validated image uploads on the file system
pub mod auth;
pub mod media;
pub mod paginator;

pub use auth::{hash_password, verify_password, SessionClaims, SessionKeys, SESSION_COOKIE};
pub use media::{MediaStorage, UploadedImage};
pub use paginator::{
    load_posts_page, requested_page_number, Page, PageWindow, Paginator, POSTS_PER_PAGE,
};
