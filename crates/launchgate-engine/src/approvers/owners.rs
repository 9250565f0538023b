use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use launchgate_core::config::log_excerpt;
use launchgate_core::errors::StoreError;
use launchgate_core::records::OwnersFile;
use launchgate_core::traits::{GateStore, HttpFetcher};

/// Extract approver emails from a base64-encoded OWNERS document.
///
/// Text after `#` is a comment. A line counts as an email when it contains
/// both `@` and `.`; directives like `per-file` or `set noparent` do not.
/// Content that does not decode yields no owners.
pub fn decode_owners_content(raw: &[u8]) -> Vec<String> {
    let compact: Vec<u8> = raw
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let decoded = match STANDARD.decode(&compact) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(error = %e, "OWNERS content is not valid base64");
            return Vec::new();
        }
    };
    parse_owners_text(&String::from_utf8_lossy(&decoded))
}

/// Extract approver emails from decoded OWNERS text.
pub fn parse_owners_text(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| match line.find('#') {
            Some(idx) => &line[..idx],
            None => line,
        })
        .map(str::trim)
        .filter(|line| line.contains('@') && line.contains('.'))
        .map(str::to_string)
        .collect()
}

/// Owners listed in the document at `url`.
///
/// A stored copy younger than `freshness` is used without a request. When
/// the fetch fails, the last stored copy is kept and re-saved as fresh so the
/// next hour does not retry; with no stored copy the result is empty.
pub fn fetch_owners(
    store: &dyn GateStore,
    fetcher: &dyn HttpFetcher,
    url: &str,
    now: DateTime<Utc>,
    freshness: Duration,
    max_log_line: usize,
) -> Result<Vec<String>, StoreError> {
    let stored = store.get_owners_file(url)?;
    if let Some(file) = &stored {
        if file.is_fresh(now, freshness) {
            info!(url, "using fresh OWNERS file");
            return Ok(decode_owners_content(&file.raw_content));
        }
    }

    let fetched = match fetcher.get(url) {
        Ok(resp) if resp.is_ok() => Ok(resp.body),
        Ok(resp) => Err(format!(
            "status {}: {}",
            resp.status,
            log_excerpt(&String::from_utf8_lossy(&resp.body), max_log_line)
        )),
        Err(e) => Err(e.to_string()),
    };

    let content = match (fetched, stored) {
        (Ok(body), _) => body,
        (Err(reason), Some(file)) => {
            error!(url, %reason, "could not fetch OWNERS file");
            info!(url, "marking stale OWNERS file as fresh");
            file.raw_content
        }
        (Err(reason), None) => {
            error!(url, %reason, "could not fetch OWNERS file");
            info!(url, "no stored OWNERS file available, using []");
            return Ok(Vec::new());
        }
    };

    store.put_owners_file(&OwnersFile {
        url: url.to_string(),
        raw_content: content.clone(),
        created_on: now,
    })?;
    Ok(decode_owners_content(&content))
}
