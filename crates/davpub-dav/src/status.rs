//! Final-status extraction from a verbose protocol trace.
//!
//! `curl -v` writes the response headers it receives to stderr, each prefixed
//! with `< `. The final status of the exchange is the last status line in that
//! trace. An interim `100 Continue` is never final: if it is the last status
//! line the exchange died before the server answered, and the result is the
//! `500 Unknown` sentinel so the request is retried.

use crate::DavResponse;

/// Split `< HTTP/1.x NNN reason` into its code and reason phrase.
pub fn parse_status_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_end_matches('\r').strip_prefix("< HTTP/1.")?;
    let rest = rest.strip_prefix(['0', '1'])?;
    let rest = rest.strip_prefix(' ')?;

    let code = rest.get(..3)?;
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let reason = &rest[3..];
    if !reason.is_empty() && !reason.starts_with(' ') {
        return None;
    }
    Some((code, reason.trim()))
}

/// Final status of the exchange recorded in `trace`.
pub fn final_status(trace: &str) -> DavResponse {
    match trace.lines().rev().find_map(parse_status_line) {
        Some(("100", _)) | None => DavResponse::unknown(),
        Some((code, reason)) => DavResponse::new(code, reason),
    }
}
