/// Wire formats the bridge can produce, each with a one-to-one mapping to a
/// MIME type and a file extension (design §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Csv,
    Tsv,
    Jsonl,
    Ndjson,
    JsonSeq,
    Arrow,
    Parquet,
    Bson,
    Avro,
    Values,
    Xml,
}

impl Format {
    pub const ALL: &'static [Format] = &[
        Format::Csv,
        Format::Tsv,
        Format::Jsonl,
        Format::Ndjson,
        Format::JsonSeq,
        Format::Arrow,
        Format::Parquet,
        Format::Bson,
        Format::Avro,
        Format::Values,
        Format::Xml,
    ];

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Tsv => "text/tab-separated-values",
            Self::Jsonl => "application/jsonl",
            Self::Ndjson => "application/x-ndjson",
            Self::JsonSeq => "application/json-seq",
            Self::Arrow => "application/vnd.apache.arrow.stream",
            Self::Parquet => "application/vnd.apache.parquet",
            Self::Bson => "application/bson",
            Self::Avro => "application/avro",
            Self::Values => "text/plain",
            Self::Xml => "application/xml",
        }
    }

    pub const fn file_extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Tsv => "tsv",
            Self::Jsonl => "jsonl",
            Self::Ndjson => "ndjson",
            Self::JsonSeq => "json-seq",
            Self::Arrow => "arrow",
            Self::Parquet => "parquet",
            Self::Bson => "bson",
            Self::Avro => "avro",
            Self::Values => "values",
            Self::Xml => "xml",
        }
    }

    /// Look up by file extension (path-suffix negotiation, no leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.file_extension().eq_ignore_ascii_case(ext))
    }

    /// Look up by MIME type, honoring the `*/*` and `type/*` wildcards an
    /// `Accept` header may carry.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim();
        if mime == "*/*" {
            return None;
        }
        if let Some(prefix) = mime.strip_suffix("/*") {
            return Self::ALL.iter().copied().find(|f| f.mime_type().starts_with(prefix));
        }
        Self::ALL.iter().copied().find(|f| f.mime_type().eq_ignore_ascii_case(mime))
    }

    /// Parse an `Accept` header's comma-separated, `;q=`-weighted media
    /// range list and return the highest-quality format this bridge
    /// supports. Ties keep the first-listed candidate (RFC 7231 order).
    pub fn from_accept_header(header: &str) -> Option<Self> {
        best_by_quality(header, Self::from_mime)
    }
}

/// Shared quality-list parser used by both `Accept` and `Accept-Encoding`:
/// splits on commas, strips `;q=` parameters, and returns the candidate
/// with the highest quality value (ties favor the earlier entry).
pub(crate) fn best_by_quality<T>(header: &str, resolve: impl Fn(&str) -> Option<T>) -> Option<T> {
    let mut best: Option<(T, f32)> = None;
    for (index, part) in header.split(',').enumerate() {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let mut segments = part.split(';');
        let token = segments.next().unwrap_or("").trim();
        let quality = segments
            .find_map(|p| p.trim().strip_prefix("q="))
            .and_then(|q| q.trim().parse::<f32>().ok())
            .unwrap_or(1.0);
        if quality <= 0.0 {
            continue;
        }
        let Some(candidate) = resolve(token) else { continue };
        // earlier index wins ties: only replace on strictly greater quality
        let replace = match &best {
            None => true,
            Some((_, best_q)) => quality > *best_q,
        };
        if replace {
            best = Some((candidate, quality));
        }
        let _ = index;
    }
    best.map(|(candidate, _)| candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_round_trips() {
        for format in Format::ALL {
            assert_eq!(Format::from_extension(format.file_extension()), Some(*format));
        }
    }

    #[test]
    fn mime_round_trips() {
        for format in Format::ALL {
            assert_eq!(Format::from_mime(format.mime_type()), Some(*format));
        }
    }

    #[test]
    fn wildcard_mime_resolves_to_first_matching_family() {
        assert_eq!(Format::from_mime("application/*"), Some(Format::Jsonl));
    }

    #[test]
    fn accept_header_picks_highest_quality() {
        let header = "text/tab-separated-values;q=0.2, text/csv;q=0.9";
        assert_eq!(Format::from_accept_header(header), Some(Format::Csv));
    }

    #[test]
    fn accept_header_ties_favor_first_listed() {
        let header = "text/csv, text/tab-separated-values";
        assert_eq!(Format::from_accept_header(header), Some(Format::Csv));
    }
}
