//! Ticket id normalization for noisy scanner input

/// Canonical lookup form of a ticket id: trimmed and uppercased.
///
/// This is the fast path tried against the index before falling back to
/// the full [`parse_scanned_text`] heuristic.
pub fn clean_id(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Turn raw scanned text into a canonical ticket key.
///
/// Wristband QR codes in the field carry all sorts of noise around the id:
/// the event prefix, a registration URL, a JSON payload, or a `key=value`
/// tail. The pipeline runs in strict order and never fails; the worst case
/// is an empty or garbage key that simply misses the index.
pub fn parse_scanned_text(raw: &str, event_prefix: &str) -> String {
    let mut clean = raw.trim().to_string();

    // Event prefix plus an optional separator, case-insensitive
    if !event_prefix.is_empty()
        && let Some(head) = clean.get(..event_prefix.len())
        && head.eq_ignore_ascii_case(event_prefix)
    {
        let mut rest = &clean[event_prefix.len()..];
        if let Some(stripped) = rest.strip_prefix('-').or_else(|| rest.strip_prefix('_')) {
            rest = stripped;
        }
        clean = rest.to_string();
    }

    // URL or path: keep the last non-empty segment, scanning from the end
    if (clean.contains("http") || clean.contains('/'))
        && let Some(segment) = clean.rsplit('/').find(|s| !s.trim().is_empty())
    {
        clean = segment.to_string();
    }

    // JSON payloads prefer a ticketId field, then id; parse failures fall
    // through with the text unchanged
    if clean.starts_with('{')
        && clean.ends_with('}')
        && let Ok(value) = serde_json::from_str::<serde_json::Value>(&clean)
    {
        if let Some(tid) = value.get("ticketId").and_then(|v| v.as_str()) {
            clean = tid.to_string();
        } else if let Some(id) = value.get("id").and_then(|v| v.as_str()) {
            clean = id.to_string();
        }
    }

    // Last hyphen segment wins, then last equals segment
    if let Some((_, tail)) = clean.rsplit_once('-') {
        clean = tail.to_string();
    }
    if let Some((_, tail)) = clean.rsplit_once('=') {
        clean = tail.to_string();
    }

    clean
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
        .collect()
}
