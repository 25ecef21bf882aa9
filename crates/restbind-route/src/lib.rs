//! Route glue for restbind.
//!
//! A [`Route`] ties an ordered list of binders to a handler. Dispatching a
//! request:
//!
//! 1. creates the request context (version, page size) and attaches it,
//! 2. resolves every binder, unless the adapter is in test mode,
//! 3. calls the handler and applies the version's response hook,
//! 4. turns any failure into an error response through the exception
//!    handler, logging it.
//!
//! Routes can also mirror requests to a trusted server with
//! [`ShadowTraffic`].

#![doc(html_root_url = "https://docs.rs/restbind-route/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod route;
mod shadow;

pub use error::RouteError;
pub use route::{Route, RouteBuilder};
pub use shadow::{MirroredResponse, ResponseComparator, ShadowTraffic, StatusComparator};
