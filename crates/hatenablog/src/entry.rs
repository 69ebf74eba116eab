//! Blog entry model.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Opaque identifier the service assigns to a posted entry.
///
/// Compared only for equality; the internal structure of the id string
/// is not interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        EntryId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content of a blog entry as the author writes it.
///
/// Carries no identity; the service assigns one at creation, producing a
/// [`PostedEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub title: String,
    pub body: String,
    pub categories: Vec<String>,
    pub draft: bool,
    /// Caller-chosen updated timestamp; the service picks one when absent.
    pub updated: Option<DateTime<FixedOffset>>,
}

impl Entry {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Entry {
            title: title.into(),
            body: body.into(),
            categories: Vec::new(),
            draft: false,
            updated: None,
        }
    }

    /// Adds a category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Marks the entry as a draft (or not).
    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = draft;
        self
    }

    /// Sets an explicit updated timestamp.
    pub fn with_updated(mut self, updated: DateTime<FixedOffset>) -> Self {
        self.updated = Some(updated);
        self
    }

    /// Checks that the entry is acceptable to the publishing endpoint.
    ///
    /// The service rejects title-less entries outright, so catching that
    /// locally saves a round trip. An empty body is allowed.
    pub fn validate(&self) -> Result<(), Error> {
        if self.title.is_empty() {
            return Err(Error::Validation("entry title must not be empty".into()));
        }
        Ok(())
    }
}

/// An entry as it exists on the service: the authored content plus the
/// identity and timestamps the service assigned.
///
/// Values are snapshots; the client never mutates them. To change a
/// posted entry, build a new value (see [`PostedEntry::with_entry`]) and
/// send it with `update_entry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedEntry {
    pub id: EntryId,
    pub entry: Entry,
    /// Member URI: the address updates are sent to.
    pub edit_url: String,
    /// Public permalink, when the service reported one.
    pub alternate_url: Option<String>,
    pub published: Option<DateTime<FixedOffset>>,
    /// Server-side last-edit timestamp (`app:edited`).
    pub edited: Option<DateTime<FixedOffset>>,
}

impl PostedEntry {
    /// Returns this posted entry with its content replaced, keeping the
    /// identity. The usual way to prepare an update.
    pub fn with_entry(mut self, entry: Entry) -> Self {
        self.entry = entry;
        self
    }
}
