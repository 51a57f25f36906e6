//! Path/params/header negotiation (design §4.1).
//!
//! This module is deliberately transport-agnostic: it takes already-parsed
//! HTTP primitives (method is not needed here — mode validity per method
//! is the dispatcher's concern) and headers/params as plain maps, so it
//! can be unit-tested without axum and reused unchanged if the bridge ever
//! grows a second HTTP front end.

use std::collections::{BTreeMap, HashMap};

use base64::Engine;
use qbridge_wire::{Compression, Format};

use crate::mode::Mode;
use crate::request::NegotiatedRequest;

#[derive(Debug, thiserror::Error)]
pub enum NegotiationError {
    #[error("path does not start with the configured context prefix {context:?}")]
    BadContext { context: String },

    #[error("unrecognized mode tag {tag:?}")]
    UnknownModeTag { tag: String },
}

/// Case-insensitive header lookup — callers build this once per request
/// from whatever header map their HTTP framework hands them.
#[derive(Debug, Default, Clone)]
pub struct Headers(HashMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0.insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Everything Negotiation needs from one HTTP call, already decoded from
/// whatever transport carried it.
pub struct RawRequest<'a> {
    pub path: &'a str,
    pub params: &'a HashMap<String, String>,
    pub headers: &'a Headers,
    /// The request body, if the client sent a `q=` query in it (POST) and
    /// it was not already folded into `params`. `None` for GET/HEAD.
    pub body_query: Option<&'a str>,
    pub default_format: Format,
    pub default_compression: Compression,
}

/// Strips `context` off `path`, consumes a leading mode-tag segment, splits
/// the trailing segment into qid/format/compression, applies param and
/// header overrides, and extracts the remaining scalar fields (design
/// §4.1 steps 1–8). Step 9 — merging in a cached `QueryInfo` on an empty
/// body query — is the dispatcher's job, since it requires the query
/// cache this module intentionally doesn't depend on.
pub fn negotiate(context: &str, raw: &RawRequest<'_>) -> Result<NegotiatedRequest, NegotiationError> {
    let rest = raw
        .path
        .strip_prefix(context)
        .ok_or_else(|| NegotiationError::BadContext { context: context.to_string() })?;

    let mut segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    let mut mode = None;
    let mut mode_was_explicit = false;
    if let Some(first) = segments.first() {
        // A single-letter first segment that matches a tag is consumed as a
        // mode override (design §4.1 step 2); one that doesn't match is
        // left alone and falls through to being treated as (part of) the
        // qid — per §9's open question, the tag reading takes precedence
        // over a same-letter qid, but a non-tag letter is just a qid.
        if first.len() == 1 {
            if let Some(m) = Mode::from_tag(first) {
                mode = Some(m);
                mode_was_explicit = true;
                segments.remove(0);
            }
        }
    }

    let trailing = segments.last().copied().unwrap_or("");
    let (path_qid, path_format, path_compression) = split_trailing_segment(trailing);

    if path_qid.chars().next().is_some_and(|c| Mode::from_tag(&c.to_string()).is_some()) {
        tracing::debug!(qid = %path_qid, "qid begins with a reserved mode-tag letter; path parsing favors the tag reading per design open question");
    }

    let format = pick_format(raw, path_format);
    let compression = pick_compression(raw, path_compression);

    let qid_param = raw.params.get("qid").cloned();
    let qid_header = raw.headers.get("qid").map(str::to_string);
    let qid = qid_header.or(qid_param).unwrap_or(path_qid).clone();
    let has_explicit_qid = !qid.is_empty();

    let mode = match mode {
        Some(m) => m,
        None => match raw.params.get("m") {
            Some(tag) => Mode::from_tag(tag).ok_or_else(|| NegotiationError::UnknownModeTag { tag: tag.clone() })?,
            None => NegotiatedRequest::default_mode_for(has_explicit_qid),
        },
    };

    let query = raw
        .body_query
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .or_else(|| raw.params.get("q").cloned())
        .unwrap_or_default();

    let txid = raw.headers.get("txid").map(str::to_string).or_else(|| raw.params.get("txid").cloned());
    let tenant = raw.headers.get("tenant").map(str::to_string).or_else(|| raw.params.get("tenant").cloned());
    let user = raw.headers.get("u").map(str::to_string).or_else(|| raw.params.get("u").cloned());
    let client = raw.headers.get("user-agent").map(str::to_string);

    let token = decode_authorization(raw.headers.get("authorization"));
    let serde_config = jdbcx_properties(raw.headers);

    Ok(NegotiatedRequest {
        qid,
        has_explicit_qid,
        mode,
        mode_was_explicit,
        format,
        compression,
        query,
        txid,
        tenant,
        user,
        client,
        token,
        serde_config,
    })
}

/// Any header prefixed `jdbcx_` is forwarded to the Serde config: the
/// prefix is stripped and `_` mapped to `.` (design §6.1), e.g.
/// `jdbcx_csv_delimiter` becomes the config key `csv.delimiter`.
fn jdbcx_properties(headers: &Headers) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            name.strip_prefix("jdbcx_").map(|rest| (rest.replace('_', "."), value.to_string()))
        })
        .collect()
}

fn split_trailing_segment(segment: &str) -> (String, Option<String>, Option<String>) {
    let parts: Vec<&str> = segment.split('.').collect();
    match parts.as_slice() {
        [] | [""] => (String::new(), None, None),
        [qid] => (qid.to_string(), None, None),
        [qid, ext] => {
            if Compression::by_extension(ext).is_some() {
                (qid.to_string(), None, Some((*ext).to_string()))
            } else {
                (qid.to_string(), Some((*ext).to_string()), None)
            }
        }
        [qid, fmt, comp, ..] => (qid.to_string(), Some((*fmt).to_string()), Some((*comp).to_string())),
    }
}

fn pick_format(raw: &RawRequest<'_>, path_ext: Option<String>) -> Format {
    if let Some(fmt) = raw.headers.get("accept").and_then(Format::from_accept_header) {
        return fmt;
    }
    if let Some(fmt) = raw.params.get("f").and_then(|f| Format::from_extension(f)) {
        return fmt;
    }
    if let Some(fmt) = path_ext.and_then(|ext| Format::from_extension(&ext)) {
        return fmt;
    }
    raw.default_format
}

fn pick_compression(raw: &RawRequest<'_>, path_ext: Option<String>) -> Compression {
    if let Some(header) = raw.headers.get("accept-encoding") {
        return Compression::from_accept_encoding(header);
    }
    if let Some(comp) = raw.params.get("c").and_then(|c| Compression::by_extension(c)) {
        return comp;
    }
    if let Some(comp) = path_ext.and_then(|ext| Compression::by_extension(&ext)) {
        return comp;
    }
    raw.default_compression
}

/// Decodes `Authorization: Bearer <base64>` into the raw token. A missing
/// header yields an empty (unauthenticated) token. A malformed base64
/// payload is logged and the post-prefix text is kept verbatim as an
/// opaque token — deliberately non-fatal per design §4.1, so a garbled
/// token fails ACL lookup downstream instead of leaking a decode error to
/// the client.
pub fn decode_authorization(header: Option<&str>) -> String {
    let Some(header) = header else { return String::new() };
    let raw = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    match base64::engine::general_purpose::STANDARD.decode(raw) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| raw.to_string()),
        Err(e) => {
            tracing::debug!(error = %e, "authorization header is not valid base64; keeping token opaque");
            raw.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw<'a>(
        path: &'a str,
        params: &'a HashMap<String, String>,
        headers: &'a Headers,
        body_query: Option<&'a str>,
    ) -> RawRequest<'a> {
        RawRequest { path, params, headers, body_query, default_format: Format::Csv, default_compression: Compression::None }
    }

    #[test]
    fn bad_context_is_rejected() {
        let params = HashMap::new();
        let headers = Headers::new();
        let r = raw("/other/", &params, &headers, None);
        assert!(matches!(negotiate("/ctx/", &r), Err(NegotiationError::BadContext { .. })));
    }

    #[test]
    fn empty_path_defaults_to_submit_with_generated_qid_slot() {
        let params = HashMap::new();
        let headers = Headers::new();
        let r = raw("/ctx/", &params, &headers, Some("SELECT 1"));
        let req = negotiate("/ctx/", &r).unwrap();
        assert_eq!(req.mode, Mode::Submit);
        assert!(!req.has_explicit_qid);
        assert_eq!(req.query, "SELECT 1");
    }

    #[test]
    fn qid_present_defaults_to_direct() {
        let params = HashMap::new();
        let headers = Headers::new();
        let r = raw("/ctx/abc123.csv", &params, &headers, None);
        let req = negotiate("/ctx/", &r).unwrap();
        assert_eq!(req.mode, Mode::Direct);
        assert_eq!(req.qid, "abc123");
        assert_eq!(req.format, Format::Csv);
    }

    #[test]
    fn explicit_mode_tag_takes_precedence() {
        let params = HashMap::new();
        let headers = Headers::new();
        let r = raw("/ctx/a/qid1", &params, &headers, None);
        let req = negotiate("/ctx/", &r).unwrap();
        assert_eq!(req.mode, Mode::Async);
        assert!(req.mode_was_explicit);
        assert_eq!(req.qid, "qid1");
    }

    #[test]
    fn three_dotted_parts_give_qid_format_and_compression() {
        let params = HashMap::new();
        let headers = Headers::new();
        let r = raw("/ctx/q1.csv.gz", &params, &headers, None);
        let req = negotiate("/ctx/", &r).unwrap();
        assert_eq!(req.qid, "q1");
        assert_eq!(req.format, Format::Csv);
        assert_eq!(req.compression, Compression::Gzip);
    }

    #[test]
    fn header_beats_param_beats_path_extension() {
        let mut params = HashMap::new();
        params.insert("f".to_string(), "tsv".to_string());
        let mut headers = Headers::new();
        headers.insert("Accept", "application/jsonl");
        let r = raw("/ctx/q1.csv", &params, &headers, None);
        let req = negotiate("/ctx/", &r).unwrap();
        assert_eq!(req.format, Format::Jsonl);
    }

    #[test]
    fn param_beats_path_extension_when_no_header() {
        let mut params = HashMap::new();
        params.insert("f".to_string(), "tsv".to_string());
        let headers = Headers::new();
        let r = raw("/ctx/q1.csv", &params, &headers, None);
        let req = negotiate("/ctx/", &r).unwrap();
        assert_eq!(req.format, Format::Tsv);
    }

    #[test]
    fn authorization_header_base64_round_trips() {
        let token = "tok-12345";
        let encoded = base64::engine::general_purpose::STANDARD.encode(token);
        let mut headers = Headers::new();
        headers.insert("Authorization", format!("Bearer {encoded}"));
        let params = HashMap::new();
        let r = raw("/ctx/", &params, &headers, None);
        let req = negotiate("/ctx/", &r).unwrap();
        assert_eq!(req.token, token);
    }

    #[test]
    fn malformed_base64_token_is_kept_opaque_not_fatal() {
        let mut headers = Headers::new();
        headers.insert("Authorization", "Bearer not!!valid_base64!!");
        let params = HashMap::new();
        let r = raw("/ctx/", &params, &headers, None);
        let req = negotiate("/ctx/", &r);
        assert!(req.is_ok());
    }

    #[test]
    fn jdbcx_headers_are_forwarded_to_serde_config_with_dotted_keys() {
        let mut headers = Headers::new();
        headers.insert("jdbcx_csv_delimiter", ";");
        headers.insert("X-Other", "ignored");
        let params = HashMap::new();
        let r = raw("/ctx/", &params, &headers, None);
        let req = negotiate("/ctx/", &r).unwrap();
        assert_eq!(req.serde_config.get("csv.delimiter"), Some(&";".to_string()));
        assert_eq!(req.serde_config.len(), 1);
    }

    #[test]
    fn unrecognized_mode_param_is_rejected() {
        let mut params = HashMap::new();
        params.insert("m".to_string(), "z".to_string());
        let headers = Headers::new();
        let r = raw("/ctx/", &params, &headers, None);
        assert!(matches!(negotiate("/ctx/", &r), Err(NegotiationError::UnknownModeTag { .. })));
    }

    #[test]
    fn unknown_single_letter_mode_tag_falls_through_as_qid() {
        let params = HashMap::new();
        let headers = Headers::new();
        let r = raw("/ctx/x", &params, &headers, None);
        let req = negotiate("/ctx/", &r).unwrap();
        assert_eq!(req.qid, "x");
        assert!(!req.mode_was_explicit);
    }
}
