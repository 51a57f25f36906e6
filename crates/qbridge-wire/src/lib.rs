//! Wire-level contracts for the query bridge: the [`Format`] and
//! [`Compression`] enums used during negotiation, a small finite [`Value`]
//! type used to describe rows without committing to any one backend's type
//! system, and the [`Serde`] encode/decode contract.
//!
//! The concrete codecs (CSV/TSV/JSON/Arrow/Parquet/…) are, per the design,
//! an external collaborator's concern. This crate ships reference
//! implementations for the formats cheap enough to implement without a
//! dedicated codec crate (CSV/TSV/JSONL/NDJSON/Values) so the response
//! writer and the end-to-end scenarios in the design have something real to
//! drive; the remaining formats register a [`Serde`] that reports
//! `Unsupported` until a real codec crate is wired in.

mod codec;
mod compression;
mod format;
mod result;
mod value;

pub use codec::{CodecError, CodecRegistry, Serde};
pub use compression::{Compression, CompressionStreamError, CompressWriter};
pub use format::Format;
pub use result::{ColumnMeta, ResultSet};
pub use value::{TypeInfo, Value};
