//! Filename extraction from `Content-Disposition` headers.

use percent_encoding::percent_decode_str;

/// Extract the download filename from a `Content-Disposition` value.
///
/// `filename*` (RFC 5987, percent-encoded) wins over a plain `filename`.
/// Directory components are stripped. Returns `None` when neither parameter
/// yields a usable name.
pub fn filename(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;

    for param in split_params(header).into_iter().skip(1) {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => extended = decode_extended(value.trim()),
            "filename" => plain = Some(unquote(value.trim())),
            _ => {}
        }
    }

    extended
        .or(plain)
        .map(|name| base_name(&name).to_owned())
        .filter(|name| !name.is_empty())
}

/// Name to use when the server did not send one.
pub fn fallback_filename(attachment_event_id: impl std::fmt::Display) -> String {
    format!("attachment-{attachment_event_id}")
}

/// Split on `;` outside double quotes.
fn split_params(header: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;
    for (idx, ch) in header.char_indices() {
        match ch {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(header[start..idx].trim());
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(header[start..].trim());
    parts
}

fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_owned();
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Decode `charset'language'percent-encoded`. Only UTF-8 and ISO-8859-1 are
/// accepted.
fn decode_extended(value: &str) -> Option<String> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?.to_ascii_lowercase();
    let _language = parts.next()?;
    let encoded = parts.next()?;
    let bytes: Vec<u8> = percent_decode_str(encoded).collect();
    match charset.as_str() {
        "utf-8" => String::from_utf8(bytes).ok(),
        "iso-8859-1" => Some(bytes.into_iter().map(char::from).collect()),
        _ => None,
    }
}

fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name).trim()
}
