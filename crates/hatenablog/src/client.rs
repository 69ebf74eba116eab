//! AtomPub blog client.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::StatusCode;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::atom::{self, FeedPage, ServiceDocument};
use crate::auth::{Auth, Credentials};
use crate::entry::{Entry, PostedEntry};
use crate::error::Error;
use crate::throttle::Throttle;
use crate::transport::{DEFAULT_USER_AGENT, Transport};
use crate::xml::Element;

/// Outcome of a successful create or update call.
#[derive(Debug, Clone)]
pub struct EntryResponse {
    pub status: StatusCode,
    /// The raw response document as the service returned it.
    pub document: Element,
    /// The entry parsed out of `document`.
    pub entry: PostedEntry,
}

/// The operations a blog publishing client offers.
///
/// Both the HTTP-backed [`AtomPubClient`] and the in-memory test double
/// implement this, so orchestration code can be written against
/// `&dyn BlogClient` and tested without a network.
#[async_trait]
pub trait BlogClient: Send + Sync {
    /// Fetches the service document and caches the collection address
    /// for the client's lifetime.
    async fn login(&self) -> Result<ServiceDocument, Error>;

    /// Creates a new entry in the blog's collection. Requires a prior
    /// [`login`](BlogClient::login).
    async fn post_entry(&self, entry: &Entry) -> Result<EntryResponse, Error>;

    /// Replaces a posted entry at its member URI. Last write wins; no
    /// precondition is sent.
    async fn update_entry(&self, posted: &PostedEntry) -> Result<EntryResponse, Error>;

    /// All entries in the collection, in the order the service returns
    /// them, each paired with the raw document it was parsed from.
    ///
    /// Pages are fetched lazily as the stream is polled. A page failure
    /// surfaces as an `Err` item and ends the stream; entries already
    /// yielded stay valid. Dropping the stream abandons the enumeration.
    fn entries(&self) -> BoxStream<'_, Result<(PostedEntry, Element), Error>>;

    /// Pacing checkpoint for bulk operations; sleeps when requests come
    /// faster than the configured interval allows.
    async fn wait_for_throttle(&self);
}

/// HTTP-backed [`BlogClient`] for a Hatena-style AtomPub endpoint.
pub struct AtomPubClient {
    transport: Transport,
    root_url: String,
    throttle: Throttle,
    service: RwLock<Option<ServiceDocument>>,
}

enum PageState {
    First,
    Next(String),
    Done,
}

impl AtomPubClient {
    /// Creates a client for the blog the credentials name, with WSSE
    /// authentication and no throttling.
    pub fn new(credentials: Credentials) -> Self {
        let root_url = format!(
            "https://blog.hatena.ne.jp/{}/{}/atom",
            credentials.hatena_id, credentials.blog_id
        );
        AtomPubClient {
            transport: Transport::new(credentials, Auth::default(), DEFAULT_USER_AGENT),
            root_url,
            throttle: Throttle::disabled(),
            service: RwLock::new(None),
        }
    }

    /// Overrides the AtomPub root endpoint.
    pub fn with_root_url(mut self, root_url: impl Into<String>) -> Self {
        self.root_url = root_url.into();
        self
    }

    /// Switches the authentication scheme.
    pub fn with_auth(mut self, auth: Auth) -> Self {
        self.transport = self.transport.with_auth(auth);
        self
    }

    /// Sets the user-agent header sent with every request.
    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.transport = self.transport.with_user_agent(user_agent);
        self
    }

    /// Enables throttling with the given minimum interval between
    /// [`wait_for_throttle`](BlogClient::wait_for_throttle) calls.
    pub fn with_throttle_interval(mut self, interval: Duration) -> Self {
        self.throttle = Throttle::new(interval);
        self
    }

    pub fn root_url(&self) -> &str {
        &self.root_url
    }

    /// The pacing gate. Exposed so callers can feed in their own hints.
    pub fn throttle(&self) -> &Throttle {
        &self.throttle
    }

    /// The cached collection address, or an auth error before login.
    async fn collection_url(&self) -> Result<String, Error> {
        self.service
            .read()
            .await
            .as_ref()
            .map(|service| service.collection_url.clone())
            .ok_or_else(|| Error::Auth("not logged in".to_string()))
    }

    /// Feeds a Retry-After hint from a failed exchange into the
    /// throttle, then hands the result back. The error still propagates;
    /// retrying is the caller's decision.
    async fn record_rate_limit(
        &self,
        result: Result<(StatusCode, Element), Error>,
    ) -> Result<(StatusCode, Element), Error> {
        if let Err(err) = &result {
            if let Some(secs) = err.retry_after_secs() {
                warn!(secs, "rate limited; deferring the next request");
                self.throttle.note_retry_after(secs).await;
            }
        }
        result
    }

    async fn fetch_page(&self, url: &str) -> Result<FeedPage, Error> {
        debug!(url = %url, "fetching collection page");
        let (_, doc) = self.record_rate_limit(self.transport.get(url).await).await?;
        let page = atom::parse_feed(&doc)?;
        debug!(
            entries = page.entries.len(),
            has_next = page.next_url.is_some(),
            "parsed collection page"
        );
        Ok(page)
    }
}

#[async_trait]
impl BlogClient for AtomPubClient {
    async fn login(&self) -> Result<ServiceDocument, Error> {
        let (_, doc) = self
            .record_rate_limit(self.transport.get(&self.root_url).await)
            .await?;
        let service = atom::parse_service_document(&doc)?;
        debug!(
            blog = %service.blog_title,
            collection = %service.collection_url,
            "discovered service document"
        );

        *self.service.write().await = Some(service.clone());
        Ok(service)
    }

    async fn post_entry(&self, entry: &Entry) -> Result<EntryResponse, Error> {
        entry.validate()?;
        let collection_url = self.collection_url().await?;

        let doc = atom::entry_document(entry);
        let (status, document) = self
            .record_rate_limit(self.transport.post(&collection_url, &doc).await)
            .await?;
        let posted = atom::parse_entry(&document)?;
        debug!(id = %posted.id, status = %status, "created entry");

        Ok(EntryResponse {
            status,
            document,
            entry: posted,
        })
    }

    async fn update_entry(&self, posted: &PostedEntry) -> Result<EntryResponse, Error> {
        posted.entry.validate()?;

        let doc = atom::posted_entry_document(posted);
        let (status, document) = self
            .record_rate_limit(self.transport.put(&posted.edit_url, &doc).await)
            .await?;
        let updated = atom::parse_entry(&document)?;
        debug!(id = %updated.id, status = %status, "updated entry");

        Ok(EntryResponse {
            status,
            document,
            entry: updated,
        })
    }

    fn entries(&self) -> BoxStream<'_, Result<(PostedEntry, Element), Error>> {
        stream::try_unfold(PageState::First, move |state| async move {
            let url = match state {
                PageState::First => self.collection_url().await?,
                PageState::Next(url) => url,
                PageState::Done => return Ok::<_, Error>(None),
            };

            let page = self.fetch_page(&url).await?;
            let next_state = match page.next_url {
                Some(next) => PageState::Next(next),
                None => PageState::Done,
            };
            Ok(Some((page.entries, next_state)))
        })
        .map_ok(|entries| stream::iter(entries.into_iter().map(Ok::<_, Error>)))
        .try_flatten()
        .boxed()
    }

    async fn wait_for_throttle(&self) {
        self.throttle.wait().await;
    }
}
