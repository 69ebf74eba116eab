//! Literal text replacement across all entries.

use futures_util::TryStreamExt;
use hatenablog::{BlogClient, Entry, PostedEntry};
use tracing::debug;

use crate::edit::{EditReport, edit_entries};
use crate::error::OpsError;

/// Knobs for [`replace_in_entries`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceOptions {
    /// Also replace in titles, not just bodies.
    pub include_title: bool,
    /// Report matching entries as `updated` without writing anything
    /// back.
    pub dry_run: bool,
}

/// Replaces every occurrence of `find` with `replacement` in entry
/// bodies, and in titles when [`ReplaceOptions::include_title`] is set.
///
/// Entries without a match are skipped. An empty `find` matches
/// nothing. A dry run enumerates and counts but never writes.
pub async fn replace_in_entries(
    client: &dyn BlogClient,
    find: &str,
    replacement: &str,
    opts: ReplaceOptions,
) -> Result<EditReport, OpsError> {
    let op = "replace_in_entries";

    if opts.dry_run {
        let entries: Vec<PostedEntry> = client
            .entries()
            .map_ok(|(posted, _)| posted)
            .try_collect()
            .await
            .map_err(|source| OpsError::Aborted { op, updated: 0, source })?;

        let mut report = EditReport { examined: entries.len(), ..EditReport::default() };
        for posted in &entries {
            if matches(&posted.entry, find, opts) {
                debug!(id = %posted.id, "entry matches (dry run)");
                report.updated += 1;
            } else {
                report.skipped += 1;
            }
        }
        return Ok(report);
    }

    edit_entries(client, op, |posted| {
        if !matches(&posted.entry, find, opts) {
            return None;
        }

        let mut entry = posted.entry.clone();
        entry.body = entry.body.replace(find, replacement);
        if opts.include_title {
            entry.title = entry.title.replace(find, replacement);
        }
        Some(posted.clone().with_entry(entry))
    })
    .await
}

fn matches(entry: &Entry, find: &str, opts: ReplaceOptions) -> bool {
    if find.is_empty() {
        return false;
    }
    entry.body.contains(find) || (opts.include_title && entry.title.contains(find))
}
