use serde::{Deserialize, Serialize};

/// Tagged sum over a fixed, finite set of value shapes. Backend drivers map
/// their native types down into this enum rather than the core ever
/// reflecting on a driver-specific value hierarchy (design notes, §9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    /// Arbitrary-precision integer, carried as its decimal string form.
    BigInt(String),
    /// Arbitrary-precision decimal, carried as its string form.
    BigDecimal(String),
    /// ISO-8601 date (`YYYY-MM-DD`).
    Date(String),
    /// ISO-8601 time (`HH:MM:SS[.ffffff]`).
    Time(String),
    /// ISO-8601 timestamp, offset included when known.
    Timestamp(String),
    Text(String),
    Binary(Vec<u8>),
}

impl Value {
    /// Render the value the way a line-oriented text format (CSV/TSV/Values)
    /// would: nulls become empty, everything else its natural string form.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(b) => b.to_string(),
            Self::Int8(v) => v.to_string(),
            Self::Int16(v) => v.to_string(),
            Self::Int32(v) => v.to_string(),
            Self::Int64(v) => v.to_string(),
            Self::Float32(v) => v.to_string(),
            Self::Float64(v) => v.to_string(),
            Self::BigInt(v) | Self::BigDecimal(v) | Self::Date(v) | Self::Time(v) | Self::Timestamp(v) => {
                v.clone()
            }
            Self::Text(v) => v.clone(),
            Self::Binary(b) => format!("\\x{}", hex_encode(b)),
        }
    }

    /// Render as a `serde_json::Value` for the JSON family of formats.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Self::Null => J::Null,
            Self::Bool(b) => J::Bool(*b),
            Self::Int8(v) => J::from(*v),
            Self::Int16(v) => J::from(*v),
            Self::Int32(v) => J::from(*v),
            Self::Int64(v) => J::from(*v),
            Self::Float32(v) => serde_json::Number::from_f64(f64::from(*v))
                .map(J::Number)
                .unwrap_or(J::Null),
            Self::Float64(v) => serde_json::Number::from_f64(*v).map(J::Number).unwrap_or(J::Null),
            Self::BigInt(v) | Self::BigDecimal(v) | Self::Date(v) | Self::Time(v) | Self::Timestamp(v) => {
                J::String(v.clone())
            }
            Self::Text(v) => J::String(v.clone()),
            Self::Binary(b) => J::String(format!("\\x{}", hex_encode(b))),
        }
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Precision/scale/signedness/nullability descriptor, the `JDBCType`
/// equivalent called for in the design notes (§9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeInfo {
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub signed: bool,
    pub nullable: bool,
}

impl Default for TypeInfo {
    fn default() -> Self {
        Self { precision: None, scale: None, signed: true, nullable: true }
    }
}
