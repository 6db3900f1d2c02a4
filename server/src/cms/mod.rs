//! Target store (CMS) access.
//!
//! Layered bottom-up: a [`Transport`] sends one request, the
//! [`RateLimitedClient`] paces and retries, [`CmsApi`] speaks the collection
//! endpoints, and the reader and resolver build on that.

mod api;
mod client;
mod error;
mod reader;
mod resolver;
mod transport;

pub use api::*;
pub use client::*;
pub use error::*;
pub use reader::*;
pub use resolver::*;
pub use transport::*;

pub(crate) use transport::classify;
