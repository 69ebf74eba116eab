//! Enumerate-and-update driver shared by the concrete operations.

use futures_util::TryStreamExt;
use hatenablog::{BlogClient, PostedEntry};
use tracing::{debug, info};

use crate::error::OpsError;

/// Counts from one bulk-edit run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EditReport {
    /// Entries enumerated.
    pub examined: usize,
    /// Entries rewritten and written back.
    pub updated: usize,
    /// Entries the editor left alone.
    pub skipped: usize,
}

/// Applies `edit` to every entry in the blog.
///
/// The whole collection is enumerated first and updates are sent
/// afterwards, so our own writes cannot disturb the pagination being
/// read. Each write waits for the client's throttle.
///
/// The first client fault aborts the run. The error carries the number
/// of updates already applied; the remaining entries are untouched.
pub async fn edit_entries<F>(
    client: &dyn BlogClient,
    op: &'static str,
    mut edit: F,
) -> Result<EditReport, OpsError>
where
    F: FnMut(&PostedEntry) -> Option<PostedEntry>,
{
    let entries: Vec<PostedEntry> = client
        .entries()
        .map_ok(|(posted, _)| posted)
        .try_collect()
        .await
        .map_err(|source| OpsError::Aborted { op, updated: 0, source })?;

    let mut report = EditReport { examined: entries.len(), ..EditReport::default() };

    for posted in &entries {
        let Some(replacement) = edit(posted) else {
            report.skipped += 1;
            continue;
        };

        client.wait_for_throttle().await;
        client
            .update_entry(&replacement)
            .await
            .map_err(|source| OpsError::Aborted { op, updated: report.updated, source })?;
        report.updated += 1;
        debug!(op, id = %replacement.id, "updated entry");
    }

    info!(
        op,
        examined = report.examined,
        updated = report.updated,
        skipped = report.skipped,
        "bulk edit finished"
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use hatenablog::testing::InMemoryClient;
    use hatenablog::{Entry, EntryId, Error};
    use pretty_assertions::assert_eq;

    use super::*;

    async fn seeded_client(titles: &[&str]) -> InMemoryClient {
        let client = InMemoryClient::new();
        for title in titles {
            client
                .post_entry(&Entry::new(*title, format!("body of {title}")))
                .await
                .expect("seeding should succeed");
        }
        client
    }

    #[tokio::test]
    async fn test_edit_rewrites_selected_entries() {
        let client = seeded_client(&["one", "two", "three"]).await;

        let report = edit_entries(&client, "uppercase", |posted| {
            if posted.entry.title == "two" {
                let mut entry = posted.entry.clone();
                entry.title = entry.title.to_uppercase();
                Some(posted.clone().with_entry(entry))
            } else {
                None
            }
        })
        .await
        .expect("edit should succeed");

        assert_eq!(report, EditReport { examined: 3, updated: 1, skipped: 2 });
        assert_eq!(client.update_count().await, 1);

        let titles: Vec<String> =
            client.posted().await.into_iter().map(|posted| posted.entry.title).collect();
        assert_eq!(titles, vec!["one", "TWO", "three"]);
    }

    #[tokio::test]
    async fn test_edit_with_no_matches_writes_nothing() {
        let client = seeded_client(&["one", "two"]).await;

        let report = edit_entries(&client, "noop", |_| None).await.expect("edit should succeed");

        assert_eq!(report, EditReport { examined: 2, updated: 0, skipped: 2 });
        assert_eq!(client.update_count().await, 0);
    }

    #[tokio::test]
    async fn test_edit_on_an_empty_blog_reports_zeroes() {
        let client = InMemoryClient::new();

        let report = edit_entries(&client, "noop", |posted| Some(posted.clone()))
            .await
            .expect("edit should succeed");

        assert_eq!(report, EditReport::default());
    }

    #[tokio::test]
    async fn test_abort_reports_updates_already_applied() {
        let client = seeded_client(&["one", "two", "three"]).await;

        // The second replacement carries an id the service does not
        // know, so its update fails after the first one landed.
        let result = edit_entries(&client, "mangle", |posted| {
            let mut replacement = posted.clone();
            if posted.entry.title == "two" {
                replacement.id = EntryId::new("tag:blog.example.test,2024:no-such-entry");
            }
            Some(replacement)
        })
        .await;

        match result {
            Err(OpsError::Aborted { op, updated, source }) => {
                assert_eq!(op, "mangle");
                assert_eq!(updated, 1);
                assert!(matches!(source, Error::Protocol(_)));
            }
            other => panic!("expected an aborted run, got {other:?}"),
        }
        assert_eq!(client.update_count().await, 1);
    }

    #[tokio::test]
    async fn test_enumeration_fault_aborts_before_any_update() {
        let client = seeded_client(&["one"]).await;
        client.fail_next(Error::Protocol("listing broke".to_string())).await;

        let result = edit_entries(&client, "noop", |posted| Some(posted.clone())).await;

        match result {
            Err(OpsError::Aborted { updated, .. }) => assert_eq!(updated, 0),
            other => panic!("expected an aborted run, got {other:?}"),
        }
        assert_eq!(client.update_count().await, 0);
    }
}
