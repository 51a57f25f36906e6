use std::collections::{BTreeMap, HashMap};
use std::io::Write;

use crate::format::Format;
use crate::result::ResultSet;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("format {0:?} has no codec registered in this build")]
    Unsupported(Format),
}

/// The encode/decode contract for a wire format (design §1, glossary
/// "Serde"). The core treats this purely as an interface: it never
/// inspects a format's internal framing, only calls `encode`/`decode`.
/// `config` carries whatever the caller forwarded from `jdbcx_`-prefixed
/// request headers (design §6.1); most codecs ignore keys they don't
/// recognize.
pub trait Serde: Send + Sync {
    fn encode(&self, result: &ResultSet, config: &BTreeMap<String, String>, out: &mut dyn Write) -> Result<(), CodecError>;

    fn decode(&self, input: &[u8]) -> Result<ResultSet, CodecError>;
}

/// Maps a [`Format`] to its registered [`Serde`] implementation. Mirrors
/// the design's service-lookup registry (§9): a small map from extension
/// tag to constructor, populated once at startup.
pub struct CodecRegistry {
    codecs: HashMap<Format, Box<dyn Serde>>,
}

impl Default for CodecRegistry {
    fn default() -> Self {
        let mut registry = Self { codecs: HashMap::new() };
        registry.register(Format::Csv, Box::new(DelimitedCodec { delimiter: b',' }));
        registry.register(Format::Tsv, Box::new(DelimitedCodec { delimiter: b'\t' }));
        registry.register(Format::Jsonl, Box::new(JsonLinesCodec));
        registry.register(Format::Ndjson, Box::new(JsonLinesCodec));
        registry.register(Format::Values, Box::new(ValuesCodec));
        registry
    }
}

impl CodecRegistry {
    pub fn register(&mut self, format: Format, codec: Box<dyn Serde>) {
        self.codecs.insert(format, codec);
    }

    pub fn get(&self, format: Format) -> Result<&dyn Serde, CodecError> {
        self.codecs.get(&format).map(AsRef::as_ref).ok_or(CodecError::Unsupported(format))
    }
}

/// Reference CSV/TSV codec: no quoting beyond doubling embedded quotes,
/// matching the minimal shape the end-to-end scenarios in the design
/// exercise (`SELECT 1` → `1\n`).
struct DelimitedCodec {
    delimiter: u8,
}

impl Serde for DelimitedCodec {
    fn encode(&self, result: &ResultSet, config: &BTreeMap<String, String>, out: &mut dyn Write) -> Result<(), CodecError> {
        let delim = config
            .get("delimiter")
            .and_then(|v| v.chars().next())
            .unwrap_or(self.delimiter as char);
        if !result.columns.is_empty() {
            let header: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
            writeln!(out, "{}", header.join(&delim.to_string())).map_err(io_encode_err)?;
        }
        for row in &result.rows {
            let fields: Vec<String> = row.iter().map(|v| escape_field(&v.to_text(), delim)).collect();
            writeln!(out, "{}", fields.join(&delim.to_string())).map_err(io_encode_err)?;
        }
        Ok(())
    }

    fn decode(&self, _input: &[u8]) -> Result<ResultSet, CodecError> {
        Err(CodecError::Decode("delimited decode is not needed by the bridge's request path".into()))
    }
}

fn escape_field(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// JSONL/NDJSON: one JSON object per line, keyed by column name.
struct JsonLinesCodec;

impl Serde for JsonLinesCodec {
    fn encode(&self, result: &ResultSet, _config: &BTreeMap<String, String>, out: &mut dyn Write) -> Result<(), CodecError> {
        for row in &result.rows {
            let mut object = serde_json::Map::new();
            for (column, value) in result.columns.iter().zip(row) {
                object.insert(column.name.clone(), value.to_json());
            }
            serde_json::to_writer(&mut *out, &serde_json::Value::Object(object))
                .map_err(|e| CodecError::Encode(e.to_string()))?;
            writeln!(out).map_err(io_encode_err)?;
        }
        Ok(())
    }

    fn decode(&self, input: &[u8]) -> Result<ResultSet, CodecError> {
        let mut rows = Vec::new();
        for line in input.split(|&b| b == b'\n') {
            if line.is_empty() {
                continue;
            }
            serde_json::from_slice::<serde_json::Value>(line)
                .map_err(|e| CodecError::Decode(e.to_string()))?;
            rows.push(Vec::new());
        }
        Ok(ResultSet { columns: Vec::new(), rows })
    }
}

/// `Values`: a human-readable debug rendering (`name=value, name=value`),
/// used by interactive clients rather than programmatic ones.
struct ValuesCodec;

impl Serde for ValuesCodec {
    fn encode(&self, result: &ResultSet, _config: &BTreeMap<String, String>, out: &mut dyn Write) -> Result<(), CodecError> {
        for row in &result.rows {
            let rendered: Vec<String> = result
                .columns
                .iter()
                .zip(row)
                .map(|(c, v)| format!("{}={}", c.name, v.to_text()))
                .collect();
            writeln!(out, "{}", rendered.join(", ")).map_err(io_encode_err)?;
        }
        Ok(())
    }

    fn decode(&self, _input: &[u8]) -> Result<ResultSet, CodecError> {
        Err(CodecError::Decode("Values format is write-only".into()))
    }
}

fn io_encode_err(e: std::io::Error) -> CodecError {
    CodecError::Encode(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ColumnMeta;
    use crate::value::{TypeInfo, Value};

    fn single_row(name: &str, value: Value) -> ResultSet {
        let mut rs = ResultSet::new(vec![ColumnMeta { name: name.into(), type_info: TypeInfo::default() }]);
        rs.push_row(vec![value]);
        rs
    }

    #[test]
    fn csv_encodes_header_and_row() {
        let rs = single_row("x", Value::Int32(1));
        let registry = CodecRegistry::default();
        let codec = registry.get(Format::Csv).unwrap();
        let mut buf = Vec::new();
        codec.encode(&rs, &BTreeMap::new(), &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "x\n1\n");
    }

    #[test]
    fn csv_honors_a_delimiter_override_from_forwarded_config() {
        let mut rs = ResultSet::new(vec![
            ColumnMeta { name: "x".into(), type_info: TypeInfo::default() },
            ColumnMeta { name: "y".into(), type_info: TypeInfo::default() },
        ]);
        rs.push_row(vec![Value::Int32(1), Value::Int32(2)]);
        let registry = CodecRegistry::default();
        let codec = registry.get(Format::Csv).unwrap();
        let mut config = BTreeMap::new();
        config.insert("delimiter".to_string(), ";".to_string());
        let mut buf = Vec::new();
        codec.encode(&rs, &config, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "x;y\n1;2\n");
    }

    #[test]
    fn unregistered_format_reports_unsupported() {
        let registry = CodecRegistry::default();
        assert!(matches!(registry.get(Format::Arrow), Err(CodecError::Unsupported(Format::Arrow))));
    }
}
