//! Mapping between the entry model and AtomPub documents.
//!
//! Pure functions in both directions: the transport layer hands parsed
//! [`Element`] trees in, and gets serializable trees back out. Parsing is
//! lenient about fields this crate does not need (unknown elements stay
//! in the raw tree) but strict about identity: an entry without an
//! `atom:id` and an edit link is unusable and rejected.

use chrono::{DateTime, FixedOffset, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::entry::{Entry, EntryId, PostedEntry};
use crate::error::Error;
use crate::xml::Element;

/// Atom syndication namespace.
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
/// Atom publishing protocol namespace.
pub const APP_NS: &str = "http://www.w3.org/2007/app";

/// One page of the entry collection feed.
#[derive(Debug, Clone)]
pub struct FeedPage {
    /// Entries in server order, each with the raw document subtree it
    /// was parsed from.
    pub entries: Vec<(PostedEntry, Element)>,
    /// Address of the next page, absent on the last page.
    pub next_url: Option<String>,
}

/// The parts of an AtomPub service document this client uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDocument {
    pub blog_title: String,
    /// Address entry creation requests are posted to.
    pub collection_url: String,
}

fn atom_text(name: &str, value: &str) -> Element {
    Element::new(name).with_ns(ATOM_NS).with_text(value)
}

fn format_timestamp(timestamp: DateTime<FixedOffset>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Builds the entry document sent when creating an entry.
pub fn entry_document(entry: &Entry) -> Element {
    let mut doc = Element::new("entry")
        .with_ns(ATOM_NS)
        .with_attr("xmlns", ATOM_NS)
        .with_attr("xmlns:app", APP_NS)
        .with_child(atom_text("title", &entry.title))
        .with_child(
            Element::new("content")
                .with_ns(ATOM_NS)
                .with_attr("type", "text/plain")
                .with_text(&entry.body),
        );

    if let Some(updated) = entry.updated {
        doc = doc.with_child(atom_text("updated", &format_timestamp(updated)));
    }
    for category in &entry.categories {
        doc = doc.with_child(
            Element::new("category")
                .with_ns(ATOM_NS)
                .with_attr("term", category),
        );
    }

    doc.with_child(
        Element::new("app:control").with_ns(APP_NS).with_child(
            Element::new("app:draft")
                .with_ns(APP_NS)
                .with_text(if entry.draft { "yes" } else { "no" }),
        ),
    )
}

/// Builds the entry document sent when updating a posted entry.
///
/// Identity travels in the request URI, so the payload is the content
/// document alone. A posted entry parsed off the wire carries the
/// service's `updated` timestamp in its content, which keeps the entry's
/// date stable across updates unless the caller changes it.
pub fn posted_entry_document(posted: &PostedEntry) -> Element {
    entry_document(&posted.entry)
}

/// Renders a posted entry as a complete member document, identity
/// included, the way the service serves one. [`parse_entry`] inverts it.
pub fn member_document(posted: &PostedEntry) -> Element {
    let mut doc = entry_document(&posted.entry)
        .with_child(atom_text("id", posted.id.as_str()))
        .with_child(
            Element::new("link")
                .with_ns(ATOM_NS)
                .with_attr("rel", "edit")
                .with_attr("href", &posted.edit_url),
        );

    if let Some(alternate) = &posted.alternate_url {
        doc = doc.with_child(
            Element::new("link")
                .with_ns(ATOM_NS)
                .with_attr("rel", "alternate")
                .with_attr("type", "text/html")
                .with_attr("href", alternate),
        );
    }
    if let Some(published) = posted.published {
        doc = doc.with_child(atom_text("published", &format_timestamp(published)));
    }
    if let Some(edited) = posted.edited {
        doc = doc.with_child(
            Element::new("app:edited")
                .with_ns(APP_NS)
                .with_text(format_timestamp(edited)),
        );
    }
    doc
}

fn optional_timestamp(
    parent: &Element,
    namespace: &str,
    local: &str,
) -> Result<Option<DateTime<FixedOffset>>, Error> {
    let Some(child) = parent.child(namespace, local) else {
        return Ok(None);
    };
    let raw = child.text();
    let parsed = DateTime::parse_from_rfc3339(raw.trim())
        .map_err(|e| Error::Protocol(format!("invalid {local} timestamp {raw:?}: {e}")))?;
    Ok(Some(parsed))
}

fn link_href<'a>(parent: &'a Element, rel: &str) -> Option<&'a str> {
    parent
        .children(ATOM_NS, "link")
        .find(|link| link.attr("rel") == Some(rel))
        .and_then(|link| link.attr("href"))
}

/// Parses a member entry document into a [`PostedEntry`].
pub fn parse_entry(doc: &Element) -> Result<PostedEntry, Error> {
    if !doc.is(ATOM_NS, "entry") {
        return Err(Error::Protocol(format!(
            "expected an atom:entry document, got <{}>",
            doc.name
        )));
    }

    let id = doc
        .child(ATOM_NS, "id")
        .map(|id| id.text())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Protocol("entry document has no atom:id".into()))?;

    let edit_url = link_href(doc, "edit")
        .ok_or_else(|| Error::Protocol(format!("entry {id} has no edit link")))?
        .to_owned();
    let alternate_url = link_href(doc, "alternate").map(str::to_owned);

    let title = doc
        .child(ATOM_NS, "title")
        .map(|title| title.text())
        .unwrap_or_default();
    let body = doc
        .child(ATOM_NS, "content")
        .map(|content| content.text())
        .unwrap_or_default();
    let categories = doc
        .children(ATOM_NS, "category")
        .filter_map(|category| category.attr("term"))
        .map(str::to_owned)
        .collect();
    let draft = doc
        .child(APP_NS, "control")
        .and_then(|control| control.child(APP_NS, "draft"))
        .is_some_and(|draft| draft.text().trim() == "yes");

    let entry = Entry {
        title,
        body,
        categories,
        draft,
        updated: optional_timestamp(doc, ATOM_NS, "updated")?,
    };

    Ok(PostedEntry {
        id: EntryId::new(id),
        entry,
        edit_url,
        alternate_url,
        published: optional_timestamp(doc, ATOM_NS, "published")?,
        edited: optional_timestamp(doc, APP_NS, "edited")?,
    })
}

/// Parses one collection feed page, keeping each entry's raw subtree.
pub fn parse_feed(doc: &Element) -> Result<FeedPage, Error> {
    if !doc.is(ATOM_NS, "feed") {
        return Err(Error::Protocol(format!(
            "expected an atom:feed document, got <{}>",
            doc.name
        )));
    }

    let next_url = link_href(doc, "next").map(str::to_owned);
    let mut entries = Vec::new();
    for raw in doc.children(ATOM_NS, "entry") {
        entries.push((parse_entry(raw)?, raw.clone()));
    }

    Ok(FeedPage { entries, next_url })
}

/// Parses the service document and locates the entry collection.
///
/// Prefers the collection that accepts `application/atom+xml;type=entry`
/// and falls back to the first collection in the workspace.
pub fn parse_service_document(doc: &Element) -> Result<ServiceDocument, Error> {
    if !doc.is(APP_NS, "service") {
        return Err(Error::Protocol(format!(
            "expected an app:service document, got <{}>",
            doc.name
        )));
    }

    let workspace = doc
        .child(APP_NS, "workspace")
        .ok_or_else(|| Error::Protocol("service document has no workspace".into()))?;
    let blog_title = workspace
        .child(ATOM_NS, "title")
        .map(|title| title.text())
        .unwrap_or_default();

    let collections: Vec<&Element> = workspace.children(APP_NS, "collection").collect();
    let entry_collection = collections
        .iter()
        .find(|collection| {
            collection
                .child(APP_NS, "accept")
                .is_some_and(|accept| accept.text().contains("type=entry"))
        })
        .or_else(|| collections.first())
        .ok_or_else(|| Error::Protocol("service document has no collection".into()))?;

    let collection_url = entry_collection
        .attr("href")
        .ok_or_else(|| Error::Protocol("entry collection has no href".into()))?
        .to_owned();

    Ok(ServiceDocument {
        blog_title,
        collection_url,
    })
}
