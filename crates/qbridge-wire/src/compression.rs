use std::pin::Pin;

use async_compression::tokio::write::{
    BrotliEncoder, BzEncoder, DeflateEncoder, GzipEncoder, XzEncoder, ZstdEncoder,
};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::format::best_by_quality;

/// Response/transfer compression, each carrying its MIME type, its
/// `Content-Encoding` token, its file extension, and — where the format
/// defines one — a magic-byte prefix usable for sniffing (design §6.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    None,
    Gzip,
    Deflate,
    Bzip2,
    Xz,
    Lz4,
    Zstd,
    Snappy,
    Brotli,
}

impl Compression {
    pub const ALL: &'static [Compression] = &[
        Compression::None,
        Compression::Gzip,
        Compression::Deflate,
        Compression::Bzip2,
        Compression::Xz,
        Compression::Lz4,
        Compression::Zstd,
        Compression::Snappy,
        Compression::Brotli,
    ];

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::None => "application/octet-stream",
            Self::Gzip => "application/gzip",
            Self::Deflate => "application/zlib",
            Self::Bzip2 => "application/x-bzip2",
            Self::Xz => "application/x-xz",
            Self::Lz4 => "application/x-lz4",
            Self::Zstd => "application/zstd",
            Self::Snappy => "application/x-snappy-framed",
            Self::Brotli => "application/x-brotli",
        }
    }

    /// `Content-Encoding` / `Accept-Encoding` token. `None` has no token:
    /// the header is simply omitted (design §4.7).
    pub const fn encoding_token(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Gzip => Some("gzip"),
            Self::Deflate => Some("deflate"),
            Self::Bzip2 => Some("bzip2"),
            Self::Xz => Some("xz"),
            Self::Lz4 => Some("lz4"),
            Self::Zstd => Some("zstd"),
            Self::Snappy => Some("snappy"),
            Self::Brotli => Some("br"),
        }
    }

    pub const fn file_extension(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Gzip => Some("gz"),
            Self::Deflate => Some("zz"),
            Self::Bzip2 => Some("bz2"),
            Self::Xz => Some("xz"),
            Self::Lz4 => Some("lz4"),
            Self::Zstd => Some("zst"),
            Self::Snappy => Some("snappy"),
            Self::Brotli => Some("br"),
        }
    }

    /// Leading magic bytes used for content-sniffing, where the format
    /// defines a fixed one.
    pub const fn magic_bytes(self) -> Option<&'static [u8]> {
        match self {
            Self::None | Self::Snappy => None,
            Self::Gzip => Some(&[0x1f, 0x8b]),
            Self::Deflate => None,
            Self::Bzip2 => Some(b"BZh"),
            Self::Xz => Some(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]),
            Self::Lz4 => Some(&[0x04, 0x22, 0x4d, 0x18]),
            Self::Zstd => Some(&[0x28, 0xb5, 0x2f, 0xfd]),
            Self::Brotli => None,
        }
    }

    pub fn by_mime(mime: &str) -> Option<Self> {
        let mime = mime.trim();
        if mime == "*/*" {
            return None;
        }
        Self::ALL.iter().copied().find(|c| c.mime_type().eq_ignore_ascii_case(mime))
    }

    pub fn by_extension(ext: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.file_extension().is_some_and(|e| e.eq_ignore_ascii_case(ext)))
    }

    pub fn by_magic_bytes(bytes: &[u8]) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.magic_bytes().is_some_and(|magic| bytes.starts_with(magic)))
    }

    /// Parse an `Accept-Encoding` quality list. `identity` maps to `None`
    /// (no compression). A bare `*` with no more specific match defaults to
    /// `Gzip`, matching the design's stated default-on-wildcard behavior.
    pub fn from_accept_encoding(header: &str) -> Self {
        let resolve = |token: &str| -> Option<Compression> {
            if token.eq_ignore_ascii_case("identity") {
                Some(Compression::None)
            } else if token == "*" {
                Some(Compression::Gzip)
            } else {
                Self::ALL.iter().copied().find(|c| c.encoding_token().is_some_and(|t| t.eq_ignore_ascii_case(token)))
            }
        };
        best_by_quality(header, resolve).unwrap_or(Compression::None)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompressionStreamError {
    #[error("compression codec for {0:?} is not wired into this writer")]
    Unimplemented(Compression),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Wrap a raw output stream in the chosen compression codec, the way the
/// response writer needs before handing the stream to a [`crate::Serde`]
/// impl (design §4.7). Lz4 and Snappy are block/frame codecs without an
/// `AsyncWrite` adapter in `async-compression`, so they buffer and flush a
/// single frame on `shutdown`.
pub enum CompressWriter<W: AsyncWrite + Unpin + Send> {
    None(W),
    Gzip(Box<GzipEncoder<W>>),
    Deflate(Box<DeflateEncoder<W>>),
    Bzip2(Box<BzEncoder<W>>),
    Xz(Box<XzEncoder<W>>),
    Zstd(Box<ZstdEncoder<W>>),
    Brotli(Box<BrotliEncoder<W>>),
    Lz4 { inner: W, buffer: Vec<u8> },
    Snappy { inner: W, buffer: Vec<u8> },
}

impl<W: AsyncWrite + Unpin + Send> CompressWriter<W> {
    pub fn wrap(compression: Compression, inner: W) -> Self {
        match compression {
            Compression::None => Self::None(inner),
            Compression::Gzip => Self::Gzip(Box::new(GzipEncoder::new(inner))),
            Compression::Deflate => Self::Deflate(Box::new(DeflateEncoder::new(inner))),
            Compression::Bzip2 => Self::Bzip2(Box::new(BzEncoder::new(inner))),
            Compression::Xz => Self::Xz(Box::new(XzEncoder::new(inner))),
            Compression::Zstd => Self::Zstd(Box::new(ZstdEncoder::new(inner))),
            Compression::Brotli => Self::Brotli(Box::new(BrotliEncoder::new(inner))),
            Compression::Lz4 => Self::Lz4 { inner, buffer: Vec::new() },
            Compression::Snappy => Self::Snappy { inner, buffer: Vec::new() },
        }
    }

    pub async fn write_all(&mut self, data: &[u8]) -> Result<(), CompressionStreamError> {
        match self {
            Self::None(w) => w.write_all(data).await?,
            Self::Gzip(w) => w.write_all(data).await?,
            Self::Deflate(w) => w.write_all(data).await?,
            Self::Bzip2(w) => w.write_all(data).await?,
            Self::Xz(w) => w.write_all(data).await?,
            Self::Zstd(w) => w.write_all(data).await?,
            Self::Brotli(w) => w.write_all(data).await?,
            Self::Lz4 { buffer, .. } | Self::Snappy { buffer, .. } => buffer.extend_from_slice(data),
        }
        Ok(())
    }

    /// Flush and close the underlying writer. Must be called exactly once,
    /// after the last `write_all`, for the framing to be valid.
    pub async fn shutdown(mut self) -> Result<(), CompressionStreamError> {
        match &mut self {
            Self::None(w) => {
                w.shutdown().await?;
            }
            Self::Gzip(w) => Pin::new(w.as_mut()).shutdown().await?,
            Self::Deflate(w) => Pin::new(w.as_mut()).shutdown().await?,
            Self::Bzip2(w) => Pin::new(w.as_mut()).shutdown().await?,
            Self::Xz(w) => Pin::new(w.as_mut()).shutdown().await?,
            Self::Zstd(w) => Pin::new(w.as_mut()).shutdown().await?,
            Self::Brotli(w) => Pin::new(w.as_mut()).shutdown().await?,
            Self::Lz4 { inner, buffer } => {
                let frame = lz4_flex::compress_prepend_size(buffer);
                inner.write_all(&frame).await?;
                inner.shutdown().await?;
            }
            Self::Snappy { inner, buffer } => {
                let mut encoder = snap::write::FrameEncoder::new(Vec::new());
                std::io::Write::write_all(&mut encoder, buffer)
                    .map_err(CompressionStreamError::Io)?;
                let frame = encoder.into_inner().map_err(|e| CompressionStreamError::Io(e.into_error()))?;
                inner.write_all(&frame).await?;
                inner.shutdown().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_encoding_quality_picks_gzip_over_wildcard() {
        let header = "*;q=0.1, gzip;q=0.8";
        assert_eq!(Compression::from_accept_encoding(header), Compression::Gzip);
    }

    #[test]
    fn identity_disables_compression() {
        assert_eq!(Compression::from_accept_encoding("identity"), Compression::None);
    }

    #[test]
    fn bare_wildcard_defaults_to_gzip() {
        assert_eq!(Compression::from_accept_encoding("*"), Compression::Gzip);
    }

    #[tokio::test]
    async fn gzip_round_trips_through_write_all_and_shutdown() {
        let mut out = Vec::new();
        {
            let mut writer = CompressWriter::wrap(Compression::Gzip, &mut out);
            writer.write_all(b"hello").await.unwrap();
            writer.shutdown().await.unwrap();
        }
        assert!(out.starts_with(&[0x1f, 0x8b]));
    }
}
