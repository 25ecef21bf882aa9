//! Pagination of list payloads.
//!
//! Pages are requested 1-based with the `page` query parameter and handled
//! 0-based internally. The page size comes from, in order: the `page_size`
//! query parameter, the size passed to the response builder, and the
//! request context default.

use indexmap::IndexMap;
use restbind_core::{FrameworkAdapter, PageSize, QueryArgs, RestError, RestResult};
use restbind_jsonapi::Link;
use serde_json::{Map, Value};

/// Query parameter selecting the page (1-based).
pub const PAGE_PARAM: &str = "page";
/// Query parameter overriding the page size.
pub const PAGE_SIZE_PARAM: &str = "page_size";

/// The slice of a list that makes up one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 0-based page index.
    pub page: usize,
    /// Items per page.
    pub page_size: usize,
    /// First index of the page.
    pub start: usize,
    /// One past the last index of the page.
    pub end: usize,
    /// Length of the whole list.
    pub len: usize,
}

impl PageWindow {
    /// Computes the window of `page` (0-based) over a list of `len` items.
    /// A zero page size is treated as one.
    #[must_use]
    pub fn new(len: usize, page: usize, page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let start = page.saturating_mul(page_size).min(len);
        let end = start.saturating_add(page_size).min(len);
        Self {
            page,
            page_size,
            start,
            end,
            len,
        }
    }

    /// `ceil(len / page_size)`.
    #[must_use]
    pub const fn total_pages(&self) -> usize {
        self.len.div_ceil(self.page_size)
    }

    /// Whether a following page exists.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.end != self.len
    }

    /// Whether a preceding page exists.
    #[must_use]
    pub const fn has_previous(&self) -> bool {
        self.page != 0
    }
}

fn first<'a>(args: &'a QueryArgs, name: &str) -> Option<&'a str> {
    args.get(name).and_then(|v| v.first()).map(String::as_str)
}

fn positive(name: &str, raw: &str) -> RestResult<u32> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| {
            RestError::invalid_data(format!(
                "The value of the field {name} is not valid: expected a positive integer, found '{raw}'."
            ))
        })
}

/// Resolves the page size, or `None` when the list should not be paginated.
///
/// # Errors
///
/// `InvalidData` when the `page_size` query parameter is not a positive
/// integer, or when the resolved size is zero.
pub fn resolve_page_size(
    args: &QueryArgs,
    explicit: Option<u32>,
    context: Option<&PageSize>,
) -> RestResult<Option<u32>> {
    if let Some(raw) = first(args, PAGE_SIZE_PARAM) {
        return positive(PAGE_SIZE_PARAM, raw).map(Some);
    }
    match explicit.or_else(|| context.map(PageSize::resolve)) {
        Some(0) => Err(RestError::invalid_data(
            "The value of the field page_size is not valid: expected a positive integer, found '0'.",
        )),
        other => Ok(other),
    }
}

/// Returns the requested 0-based page index (page 1 when absent).
///
/// # Errors
///
/// `InvalidData` when `page` is not a positive integer.
pub fn requested_page(args: &QueryArgs) -> RestResult<usize> {
    match first(args, PAGE_PARAM) {
        Some(raw) => positive(PAGE_PARAM, raw).map(|p| p as usize - 1),
        None => Ok(0),
    }
}

/// Builds the link to `page` (1-based), keeping every other query
/// parameter in place.
///
/// ```
/// use restbind_response::page_link;
///
/// assert_eq!(page_link("/items", "page=2&x=3", 3).url(), "/items?page=3&x=3");
/// assert_eq!(page_link("/items", "x=3", 2).url(), "/items?x=3&page=2");
/// assert_eq!(page_link("/items", "", 2).url(), "/items?page=2");
/// ```
#[must_use]
pub fn page_link(path: &str, query: &str, page: usize) -> Link {
    let mut tokens: Vec<String> = query
        .split('&')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    let mut replaced = false;
    for token in &mut tokens {
        if token == "page" || token.starts_with("page=") {
            *token = format!("page={page}");
            replaced = true;
        }
    }
    if !replaced {
        tokens.push(format!("page={page}"));
    }
    Link::new(format!("{path}?{}", tokens.join("&")))
}

/// Paginates `items` for the current request.
///
/// Adds `total_pages` to `meta` (unless already set) and `next`/`last`
/// links to `links`, then returns the requested page.
///
/// # Errors
///
/// `InvalidData` for invalid `page` or `page_size` parameters.
pub fn paginate<T>(
    adapter: &dyn FrameworkAdapter,
    items: Vec<T>,
    explicit: Option<u32>,
    meta: &mut Map<String, Value>,
    links: &mut IndexMap<String, Link>,
) -> RestResult<Vec<T>> {
    let args = adapter.query_string_args();
    let context = adapter.request_context();
    let page_size = resolve_page_size(&args, explicit, context.as_ref().and_then(|c| c.page_size()))?;
    let Some(page_size) = page_size else {
        return Ok(items);
    };

    let window = PageWindow::new(items.len(), requested_page(&args)?, page_size as usize);
    meta.entry("total_pages")
        .or_insert_with(|| Value::from(window.total_pages()));

    let path = adapter.path();
    let query = adapter.query_string();
    if window.has_previous() {
        links.insert("last".to_string(), page_link(&path, &query, window.page));
    }
    if window.has_next() {
        links.insert("next".to_string(), page_link(&path, &query, window.page + 2));
    }

    Ok(items
        .into_iter()
        .skip(window.start)
        .take(window.end - window.start)
        .collect())
}
