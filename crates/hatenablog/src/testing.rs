//! In-memory [`BlogClient`] for testing code that drives a blog.
//!
//! Backed by a plain entry store instead of HTTP. Raw documents are
//! rendered through the same Atom serializer the wire types use, so
//! anything parsing them sees service-shaped XML.

use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::StatusCode;
use tokio::sync::Mutex;

use crate::atom::{self, ServiceDocument};
use crate::client::{BlogClient, EntryResponse};
use crate::entry::{Entry, EntryId, PostedEntry};
use crate::error::Error;
use crate::xml::Element;

/// A [`BlogClient`] over an in-memory entry store.
///
/// Ids are assigned sequentially; member and public URIs are
/// synthesized. [`fail_next`](InMemoryClient::fail_next) injects a fault
/// into the next operation for testing abort paths.
#[derive(Default)]
pub struct InMemoryClient {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    posted: Vec<PostedEntry>,
    next_id: u64,
    update_count: u64,
    fail_next: Option<Error>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next operation (login, post, update, or the start of an
    /// enumeration) fail with `err`. One shot; later operations succeed.
    pub async fn fail_next(&self, err: Error) {
        self.state.lock().await.fail_next = Some(err);
    }

    /// Snapshot of the stored entries in insertion order.
    pub async fn posted(&self) -> Vec<PostedEntry> {
        self.state.lock().await.posted.clone()
    }

    /// Number of updates applied so far.
    pub async fn update_count(&self) -> u64 {
        self.state.lock().await.update_count
    }

    async fn take_fault(&self) -> Result<(), Error> {
        match self.state.lock().await.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl BlogClient for InMemoryClient {
    async fn login(&self) -> Result<ServiceDocument, Error> {
        self.take_fault().await?;
        Ok(ServiceDocument {
            blog_title: "in-memory blog".to_string(),
            collection_url: "https://blog.example.test/memory/atom/entry".to_string(),
        })
    }

    async fn post_entry(&self, entry: &Entry) -> Result<EntryResponse, Error> {
        self.take_fault().await?;
        entry.validate()?;

        let mut state = self.state.lock().await;
        state.next_id += 1;
        let n = state.next_id;
        // Rendered documents carry whole seconds, so store at that
        // precision or the raw pair would disagree with the entry.
        let now = Utc::now().trunc_subsecs(0).fixed_offset();

        let mut entry = entry.clone();
        entry.updated = Some(match entry.updated {
            Some(supplied) => supplied.trunc_subsecs(0),
            None => now,
        });
        let posted = PostedEntry {
            id: EntryId::new(format!("tag:blog.example.test,2024:blog-memory-{n}")),
            entry,
            edit_url: format!("https://blog.example.test/memory/atom/entry/{n}"),
            alternate_url: Some(format!("https://blog.example.test/memory/entry/{n}")),
            published: Some(now),
            edited: Some(now),
        };
        state.posted.push(posted.clone());

        Ok(EntryResponse {
            status: StatusCode::CREATED,
            document: atom::member_document(&posted),
            entry: posted,
        })
    }

    async fn update_entry(&self, posted: &PostedEntry) -> Result<EntryResponse, Error> {
        self.take_fault().await?;
        posted.entry.validate()?;

        let mut state = self.state.lock().await;
        let stored = {
            let slot = state
                .posted
                .iter_mut()
                .find(|existing| existing.id == posted.id)
                .ok_or_else(|| Error::Protocol(format!("no entry with id {}", posted.id)))?;
            slot.entry = posted.entry.clone();
            if let Some(supplied) = slot.entry.updated {
                slot.entry.updated = Some(supplied.trunc_subsecs(0));
            }
            slot.edited = Some(Utc::now().trunc_subsecs(0).fixed_offset());
            slot.clone()
        };
        state.update_count += 1;

        Ok(EntryResponse {
            status: StatusCode::OK,
            document: atom::member_document(&stored),
            entry: stored,
        })
    }

    fn entries(&self) -> BoxStream<'_, Result<(PostedEntry, Element), Error>> {
        stream::once(async move {
            self.take_fault().await?;
            let state = self.state.lock().await;
            let pairs: Vec<Result<(PostedEntry, Element), Error>> = state
                .posted
                .iter()
                .map(|posted| Ok((posted.clone(), atom::member_document(posted))))
                .collect();
            Ok::<_, Error>(stream::iter(pairs))
        })
        .try_flatten()
        .boxed()
    }

    async fn wait_for_throttle(&self) {}
}
