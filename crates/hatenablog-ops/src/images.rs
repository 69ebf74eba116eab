//! Hotlinked-image URL rewriting.

use hatenablog::BlogClient;
use regex::{Captures, Regex};

use crate::edit::{EditReport, edit_entries};
use crate::error::OpsError;

/// Rewrites every URL in `body` whose host is exactly `from_host` to
/// the same path under `to_base`.
///
/// Works on plain text, Markdown image syntax, and HTML attributes
/// alike, because URLs are recognized by their delimiters rather than
/// the surrounding markup. Hosts that merely start with `from_host`
/// (say, `from_host.evil.example`) are left alone.
pub fn rewrite_body(body: &str, from_host: &str, to_base: &str) -> Result<String, OpsError> {
    let pattern = host_pattern(from_host)?;
    Ok(rewrite_with(&pattern, body, to_base))
}

/// Rewrites hotlinked URLs in every entry body, writing back the
/// entries that changed.
pub async fn rewrite_image_urls(
    client: &dyn BlogClient,
    from_host: &str,
    to_base: &str,
) -> Result<EditReport, OpsError> {
    let pattern = host_pattern(from_host)?;

    edit_entries(client, "rewrite_image_urls", |posted| {
        let rewritten = rewrite_with(&pattern, &posted.entry.body, to_base);
        if rewritten == posted.entry.body {
            return None;
        }

        let mut entry = posted.entry.clone();
        entry.body = rewritten;
        Some(posted.clone().with_entry(entry))
    })
    .await
}

// Matches http(s) URLs on the given host: the scheme and host, an
// optional path, then a delimiter or end of text. Requiring the
// delimiter keeps longer hostnames from matching on a prefix.
fn host_pattern(from_host: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"https?://{}(/[^\s"'()<>\[\]]*)?([\s"'()<>\[\]]|$)"#,
        regex::escape(from_host)
    ))
}

fn rewrite_with(pattern: &Regex, body: &str, to_base: &str) -> String {
    let to_base = to_base.trim_end_matches('/');
    pattern
        .replace_all(body, |caps: &Captures<'_>| {
            let path = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let tail = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            format!("{to_base}{path}{tail}")
        })
        .into_owned()
}
