/// Page slicing for post listings
///
/// The requested page number is taken from the `page` query parameter.
/// Anything that is not an integer selects the first page; numbers outside
/// `1..=num_pages` clamp to the nearest valid page. An empty listing still
/// has one (empty) page.
use serde::Serialize;

use crate::db::{BlogStore, PostFilter};
use crate::error::Result;
use crate::models::PostView;

/// Items shown on every listing page
pub const POSTS_PER_PAGE: i64 = 10;

/// Offset and limit of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    count: i64,
    per_page: i64,
}

impl Paginator {
    pub fn new(count: i64, per_page: i64) -> Self {
        Self {
            count: count.max(0),
            per_page: per_page.max(1),
        }
    }

    pub fn count(&self) -> i64 {
        self.count
    }

    pub fn num_pages(&self) -> i64 {
        if self.count == 0 {
            1
        } else {
            (self.count + self.per_page - 1) / self.per_page
        }
    }

    /// Resolve a raw `page` parameter to a valid page
    pub fn window(&self, requested: Option<&str>) -> PageWindow {
        let number = requested_page_number(requested).min(self.num_pages());
        PageWindow {
            number,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }

    pub fn page<T>(&self, window: PageWindow, items: Vec<T>) -> Page<T> {
        let num_pages = self.num_pages();
        let has_next = window.number < num_pages;
        let has_previous = window.number > 1;

        Page {
            items,
            number: window.number,
            num_pages,
            count: self.count,
            has_next,
            has_previous,
            next_page_number: has_next.then_some(window.number + 1),
            previous_page_number: has_previous.then_some(window.number - 1),
        }
    }
}

/// Requested page number before clamping to the listing; malformed values read as 1
pub fn requested_page_number(requested: Option<&str>) -> i64 {
    requested
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .unwrap_or(1)
        .max(1)
}

/// One page of a listing with one-based metadata
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<i64>,
    pub previous_page_number: Option<i64>,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_next: self.has_next,
            has_previous: self.has_previous,
            next_page_number: self.next_page_number,
            previous_page_number: self.previous_page_number,
        }
    }
}

/// Count, then read only the requested page of posts
pub async fn load_posts_page(
    store: &dyn BlogStore,
    filter: PostFilter,
    requested: Option<&str>,
) -> Result<Page<PostView>> {
    let paginator = Paginator::new(store.count_posts(filter).await?, POSTS_PER_PAGE);
    let window = paginator.window(requested);
    let items = store
        .list_posts(filter, window.offset, window.limit)
        .await?;
    Ok(paginator.page(window, items))
}
