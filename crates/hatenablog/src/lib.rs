//! AtomPub client for the Hatena Blog publishing API.
//!
//! This crate speaks the blog's publishing protocol: service-document
//! discovery, entry creation and update, and lazy enumeration of the
//! whole collection, with request pacing for bulk jobs.
//!
//! ## Features
//!
//! - **Client**: [`AtomPubClient`] implements [`BlogClient`] over HTTP
//!   with WSSE or Basic authentication
//! - **Model**: [`Entry`] for authored content, [`PostedEntry`] for
//!   entries carrying service-assigned identity
//! - **Wire**: the [`atom`] module maps model types to and from
//!   namespace-aware [`xml::Element`] documents
//! - **Throttle**: [`Throttle`] paces bulk writes and honors Retry-After
//!   hints
//! - **Testing**: [`testing::InMemoryClient`] is a network-free
//!   [`BlogClient`] for exercising higher-level logic

pub mod atom;
mod auth;
mod client;
mod entry;
mod error;
pub mod testing;
mod throttle;
mod transport;
pub mod xml;

pub use atom::{FeedPage, ServiceDocument};
pub use auth::{Auth, Credentials};
pub use client::{AtomPubClient, BlogClient, EntryResponse};
pub use entry::{Entry, EntryId, PostedEntry};
pub use error::Error;
pub use throttle::Throttle;
