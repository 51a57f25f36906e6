//! Response Writer (design §4.7): wraps the raw output stream in the
//! negotiated compression codec, invokes `Serde::encode`, and implements
//! the partial-failure policy from design §4.7/§7.

use std::collections::BTreeMap;

use tokio::io::AsyncWrite;

use qbridge_wire::{CodecRegistry, Compression, CompressWriter, Format, ResultSet};

/// What the caller (an axum handler in `qbridge-server`) needs to set on
/// the HTTP response before the body starts.
#[derive(Debug, Clone)]
pub struct ResponseHeaders {
    pub content_type: &'static str,
    pub content_encoding: Option<&'static str>,
}

impl ResponseHeaders {
    pub fn for_format(format: Format, compression: Compression) -> Self {
        Self { content_type: format.mime_type(), content_encoding: compression.encoding_token() }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The failure happened before any byte reached the client: the
    /// caller should still emit `500` with a plain-text body (design
    /// §4.7) rather than a truncated stream.
    #[error("{0}")]
    BeforeOpen(String),
    /// The failure happened after the stream had already been opened: the
    /// connection is truncated, per design §4.7's partial-failure policy.
    #[error("{0}")]
    AfterOpen(String),
}

/// Encodes `rows` through `format`'s codec into `out`, wrapped in
/// `compression`. Callers open the HTTP response (status + headers)
/// *before* calling this, matching design §4.7's "if the wrapped stream
/// has already been opened... the connection is truncated" distinction:
/// by the time this function can fail, the stream is always open, so
/// every error here is [`WriteError::AfterOpen`]. A caller that wants the
/// `BeforeOpen` branch (executor failures) never reaches this function at
/// all — it renders `500` directly from the `BridgeError`.
pub async fn write_response<W: AsyncWrite + Unpin + Send>(
    registry: &CodecRegistry,
    format: Format,
    compression: Compression,
    rows: &ResultSet,
    serde_config: &BTreeMap<String, String>,
    out: W,
) -> Result<(), WriteError> {
    let codec = registry.get(format).map_err(|e| WriteError::AfterOpen(e.to_string()))?;
    let mut writer = CompressWriter::wrap(compression, out);
    let mut buf = Vec::new();
    codec.encode(rows, serde_config, &mut buf).map_err(|e| WriteError::AfterOpen(e.to_string()))?;
    writer.write_all(&buf).await.map_err(|e| WriteError::AfterOpen(e.to_string()))?;
    writer.shutdown().await.map_err(|e| WriteError::AfterOpen(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbridge_wire::{ColumnMeta, TypeInfo, Value};

    #[tokio::test]
    async fn writes_csv_through_gzip() {
        let registry = CodecRegistry::default();
        let mut rows = ResultSet::new(vec![ColumnMeta { name: "x".into(), type_info: TypeInfo::default() }]);
        rows.push_row(vec![Value::Int32(1)]);
        let mut out = Vec::new();
        write_response(&registry, Format::Csv, Compression::Gzip, &rows, &BTreeMap::new(), &mut out).await.unwrap();
        assert!(out.starts_with(&[0x1f, 0x8b]));
    }

    #[tokio::test]
    async fn unsupported_format_is_after_open_error() {
        let registry = CodecRegistry::default();
        let rows = ResultSet::default();
        let mut out = Vec::new();
        let result = write_response(&registry, Format::Arrow, Compression::None, &rows, &BTreeMap::new(), &mut out).await;
        assert!(matches!(result, Err(WriteError::AfterOpen(_))));
    }
}
