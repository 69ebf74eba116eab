//! Bulk operations over a Hatena Blog.
//!
//! Everything here drives a [`hatenablog::BlogClient`], so the same
//! code runs against the live AtomPub service and against
//! [`hatenablog::testing::InMemoryClient`] in tests. Operations:
//!
//! - [`edit_entries`]: enumerate the blog and write back whatever a
//!   caller-supplied editor rewrites
//! - [`replace_in_entries`]: literal find-and-replace over bodies and
//!   optionally titles, with a dry-run mode
//! - [`rewrite_image_urls`]: move hotlinked image URLs from one host
//!   to another
//!
//! Runs abort on the first client fault, reporting how many updates
//! had already been applied.

mod edit;
mod error;
mod images;
mod replace;

pub use edit::{EditReport, edit_entries};
pub use error::OpsError;
pub use images::{rewrite_body, rewrite_image_urls};
pub use replace::{ReplaceOptions, replace_in_entries};
