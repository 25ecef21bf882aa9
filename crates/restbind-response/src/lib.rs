//! # Restbind Response
//!
//! JSON:API response builders.
//!
//! - [`Success`] and the [`ok`]/[`created`]/[`accepted`] shortcuts build
//!   success documents, paginating list payloads and projecting the result
//!   with the `json_path` query parameter.
//! - [`error`] and its shortcuts build error documents with a correlation
//!   id and an optional `Retry-After` header.
//! - [`base_exception_handler`] turns a [`RestError`](restbind_core::RestError)
//!   into the matching error response.
//!
//! ## Query parameters
//!
//! | Parameter | Effect |
//! |-----------|--------|
//! | `page` | 1-based page number (default 1) |
//! | `page_size` | overrides every other page size |
//! | `json_path` | `/`-separated projection; see [`project`] |

#![doc(html_root_url = "https://docs.rs/restbind-response/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod handler;
mod json_path;
mod pagination;
mod response;

pub use handler::{base_exception_handler, default_exception_handler, ExceptionHandler};
pub use restbind_core::{ErrorPolicy, UNIQUE_ID_HEADER};
pub use json_path::{filter, project, Filter, FilterOp, JsonPathError};
pub use pagination::{
    page_link, paginate, requested_page, resolve_page_size, PageWindow, PAGE_PARAM,
    PAGE_SIZE_PARAM,
};
pub use response::{
    accepted, bad_request, created, error, error_id, error_with_policy, internal_server_error,
    not_found, ok, success, Payload, Success, JSON_PATH_PARAM,
};
