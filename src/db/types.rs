//! Database-agnostic type mappings.
//!
//! This module turns driver rows into plain cell values ready to be written out.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders handle the actual value extraction
//!
//! SQLite is the exception: its columns have no enforced type, so the decoder
//! looks at the storage class of each individual value instead.
//!
//! A non-NULL value no typed decode accepts is written from its wire bytes,
//! never as an empty cell.

use crate::models::DatabaseType;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::{PgHasArrayType, PgRow, PgTypeInfo, PgValueFormat, PgValueRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Text,
    Binary,
    Json,
    Uuid,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    /// PostgreSQL array of any element type.
    Array,
    Unknown,
}

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();

    if lower.ends_with("[]") {
        return TypeCategory::Array;
    }

    // Decimal/Numeric - check first as it overlaps with "numeric" in float checks
    if lower.contains("decimal") || lower.contains("numeric") {
        // SQLite's NUMERIC is actually a float
        if db == DatabaseType::SQLite && lower == "numeric" {
            return TypeCategory::Float;
        }
        return TypeCategory::Decimal;
    }

    // Date/time - before integers since "interval" and "point" contain "int"
    if lower.contains("timestamp") {
        if lower.contains("tz") || lower.contains("with time zone") {
            return TypeCategory::TimestampTz;
        }
        return TypeCategory::Timestamp;
    }
    if lower == "datetime" {
        return TypeCategory::Timestamp;
    }
    if lower == "date" {
        return TypeCategory::Date;
    }
    if lower == "time" || lower == "time without time zone" {
        return TypeCategory::Time;
    }
    if lower == "interval" || lower.contains("point") {
        return TypeCategory::Unknown;
    }

    // Binary and text - before integers since "tinyblob" and "tinytext" contain "tiny"
    if lower.contains("blob") || lower.contains("binary") || lower == "bytea" {
        return TypeCategory::Binary;
    }

    if lower.contains("char") || lower.contains("text") || lower == "name" {
        return TypeCategory::Text;
    }

    // Integer types
    if lower.contains("int") || lower.contains("serial") || lower.contains("tiny") {
        return TypeCategory::Integer;
    }

    // Boolean
    if lower == "bool" || lower == "boolean" {
        return TypeCategory::Boolean;
    }

    // Float types
    if lower.contains("float")
        || lower.contains("double")
        || lower == "real"
        || lower == "float4"
        || lower == "float8"
    {
        return TypeCategory::Float;
    }

    // JSON types
    if lower == "json" || lower == "jsonb" {
        return TypeCategory::Json;
    }

    // UUID (PostgreSQL)
    if lower == "uuid" {
        return TypeCategory::Uuid;
    }

    TypeCategory::Unknown
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw DECIMAL/NUMERIC values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

impl Type<sqlx::Postgres> for RawDecimal {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("NUMERIC")
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("numeric") || name.contains("decimal")
    }
}

impl PgHasArrayType for RawDecimal {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_numeric")
    }

    fn array_compatible(ty: &PgTypeInfo) -> bool {
        ty.name().eq_ignore_ascii_case("NUMERIC[]")
    }
}

impl<'r> Decode<'r, sqlx::Postgres> for RawDecimal {
    fn decode(value: PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        match value.format() {
            PgValueFormat::Text => Ok(RawDecimal(value.as_str()?.to_string())),
            PgValueFormat::Binary => Ok(RawDecimal(pg_numeric_text(value.as_bytes()?)?)),
        }
    }
}

const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Render PostgreSQL's binary NUMERIC (base-10000 digit groups) as exact decimal text.
pub fn pg_numeric_text(bytes: &[u8]) -> Result<String, sqlx::error::BoxDynError> {
    let word = |at: usize| -> Result<[u8; 2], sqlx::error::BoxDynError> {
        bytes
            .get(at..at + 2)
            .map(|b| [b[0], b[1]])
            .ok_or_else(|| "truncated NUMERIC value".into())
    };

    let ndigits = i16::from_be_bytes(word(0)?).max(0) as usize;
    let weight = i16::from_be_bytes(word(2)?) as i64;
    let sign = u16::from_be_bytes(word(4)?);
    let dscale = u16::from_be_bytes(word(6)?) as usize;
    let digits = (0..ndigits)
        .map(|i| word(8 + i * 2).map(i16::from_be_bytes))
        .collect::<Result<Vec<_>, _>>()?;

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        _ => {}
    }

    let group = |idx: i64| -> i16 {
        usize::try_from(idx)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }
    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&group(0).to_string());
        for idx in 1..=weight {
            out.push_str(&format!("{:04}", group(idx)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut idx = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", group(idx)));
            idx += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }
    Ok(out)
}

// =============================================================================
// Binary Encoding
// =============================================================================

/// Decode binary data to a cell value.
///
/// If `decode_binary` is true, attempts to decode as UTF-8 text first.
/// Falls back to base64 encoding if not valid UTF-8 or if `decode_binary` is false.
pub fn decode_binary_value(bytes: &[u8], decode_binary: bool) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    if decode_binary {
        match std::str::from_utf8(bytes) {
            Ok(s) => JsonValue::String(s.to_string()),
            Err(_) => JsonValue::String(STANDARD.encode(bytes)),
        }
    } else {
        JsonValue::String(STANDARD.encode(bytes))
    }
}

fn float_value(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn text<T: ToString>(value: Option<T>) -> JsonValue {
    value
        .map(|v| JsonValue::String(v.to_string()))
        .unwrap_or(JsonValue::Null)
}

// =============================================================================
// Row Conversion Trait
// =============================================================================

/// Trait for converting database rows to ordered cell values.
pub trait RowToValues {
    fn to_values(&self, decode_binary: bool) -> Vec<JsonValue>;
}

impl RowToValues for MySqlRow {
    fn to_values(&self, decode_binary: bool) -> Vec<JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::MySQL);
                mysql::decode_column(self, idx, type_name, category, decode_binary)
            })
            .collect()
    }
}

impl RowToValues for PgRow {
    fn to_values(&self, decode_binary: bool) -> Vec<JsonValue> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| {
                let type_name = col.type_info().name();
                let category = categorize_type(type_name, DatabaseType::PostgreSQL);
                postgres::decode_column(self, idx, type_name, category, decode_binary)
            })
            .collect()
    }
}

impl RowToValues for SqliteRow {
    fn to_values(&self, decode_binary: bool) -> Vec<JsonValue> {
        (0..self.columns().len())
            .map(|idx| sqlite::decode_column(self, idx, decode_binary))
            .collect()
    }
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    pub fn decode_column(
        row: &MySqlRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
        decode_binary: bool,
    ) -> JsonValue {
        let value = match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary_col(row, idx, decode_binary),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Date => text(row.try_get::<Option<NaiveDate>, _>(idx).ok().flatten()),
            TypeCategory::Time => text(row.try_get::<Option<NaiveTime>, _>(idx).ok().flatten()),
            TypeCategory::Timestamp | TypeCategory::TimestampTz => decode_timestamp(row, idx),
            _ => text(row.try_get::<Option<String>, _>(idx).ok().flatten()),
        };
        // a JSON `null` document decodes to Null too
        if value.is_null() && category != TypeCategory::Json {
            return decode_raw(row, idx, type_name);
        }
        value
    }

    fn decode_decimal(row: &MySqlRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v.0),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::error!("Failed to decode DECIMAL: {:?}", e);
                JsonValue::Null
            }
        }
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> JsonValue {
        // Check NULL first
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Null;
        }
        // Try signed types
        if let Ok(Some(v)) = row.try_get::<Option<i8>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        // Try unsigned types
        if let Ok(Some(v)) = row.try_get::<Option<u8>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<u64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        JsonValue::Null
    }

    fn decode_boolean(row: &MySqlRow, idx: usize) -> JsonValue {
        row.try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null)
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return float_value(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return float_value(v as f64);
        }
        JsonValue::Null
    }

    fn decode_binary_col(row: &MySqlRow, idx: usize, decode_binary: bool) -> JsonValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| decode_binary_value(&v, decode_binary))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_json(row: &MySqlRow, idx: usize) -> JsonValue {
        row.try_get::<Option<serde_json::Value>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(JsonValue::Null)
    }

    fn decode_timestamp(row: &MySqlRow, idx: usize) -> JsonValue {
        if let Ok(v) = row.try_get::<Option<NaiveDateTime>, _>(idx) {
            return text(v);
        }
        text(
            row.try_get::<Option<DateTime<Utc>>, _>(idx)
                .ok()
                .flatten()
                .map(|v| v.to_rfc3339()),
        )
    }

    /// Last resort for values no typed decode accepted: the bytes on the wire.
    fn decode_raw(row: &MySqlRow, idx: usize, type_name: &str) -> JsonValue {
        let Ok(value) = row.try_get_raw(idx) else {
            return JsonValue::Null;
        };
        if value.is_null() {
            return JsonValue::Null;
        }
        match <&[u8] as Decode<sqlx::MySql>>::decode(value) {
            Ok(bytes) => {
                if std::str::from_utf8(bytes).is_err() {
                    tracing::warn!(column = idx, type_name, "Writing raw column bytes as base64");
                }
                decode_binary_value(bytes, true)
            }
            Err(e) => {
                tracing::error!(column = idx, type_name, error = %e, "Failed to read column value");
                JsonValue::Null
            }
        }
    }
}

mod postgres {
    use super::*;
    use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Utc};
    use sqlx::postgres::types::{PgInterval, PgMoney, PgTimeTz};
    use sqlx::types::Uuid;
    use sqlx::types::ipnetwork::IpNetwork;

    pub fn decode_column(
        row: &PgRow,
        idx: usize,
        type_name: &str,
        category: TypeCategory,
        decode_binary: bool,
    ) -> JsonValue {
        let value = match category {
            TypeCategory::Decimal => decode_decimal(row, idx),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => decode_boolean(row, idx),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => decode_binary_col(row, idx, decode_binary),
            TypeCategory::Json => decode_json(row, idx),
            TypeCategory::Uuid => text(row.try_get::<Option<Uuid>, _>(idx).ok().flatten()),
            TypeCategory::Date => text(row.try_get::<Option<NaiveDate>, _>(idx).ok().flatten()),
            TypeCategory::Time => text(row.try_get::<Option<NaiveTime>, _>(idx).ok().flatten()),
            TypeCategory::Timestamp => {
                text(row.try_get::<Option<NaiveDateTime>, _>(idx).ok().flatten())
            }
            TypeCategory::TimestampTz => text(
                row.try_get::<Option<DateTime<Utc>>, _>(idx)
                    .ok()
                    .flatten()
                    .map(|v| v.to_rfc3339()),
            ),
            TypeCategory::Array => decode_array(row, idx),
            TypeCategory::Text => text(row.try_get::<Option<String>, _>(idx).ok().flatten()),
            TypeCategory::Unknown => decode_named(row, idx, type_name),
        };
        // a JSON `null` document decodes to Null too
        if value.is_null() && category != TypeCategory::Json {
            return decode_raw(row, idx, type_name);
        }
        value
    }

    fn decode_decimal(row: &PgRow, idx: usize) -> JsonValue {
        match row.try_get::<Option<RawDecimal>, _>(idx) {
            Ok(Some(v)) => JsonValue::String(v.0),
            Ok(None) => JsonValue::Null,
            Err(e) => {
                tracing::error!("Failed to decode NUMERIC: {:?}", e);
                JsonValue::Null
            }
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(None) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Null;
        }
        if let Ok(Some(v)) = row.try_get::<Option<i16>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i32>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        if let Ok(Some(v)) = row.try_get::<Option<i64>, _>(idx) {
            return JsonValue::Number(v.into());
        }
        JsonValue::Null
    }

    fn decode_boolean(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(JsonValue::Bool)
            .unwrap_or(JsonValue::Null)
    }

    fn decode_float(row: &PgRow, idx: usize) -> JsonValue {
        if let Ok(Some(v)) = row.try_get::<Option<f64>, _>(idx) {
            return float_value(v);
        }
        if let Ok(Some(v)) = row.try_get::<Option<f32>, _>(idx) {
            return float_value(v as f64);
        }
        JsonValue::Null
    }

    fn decode_binary_col(row: &PgRow, idx: usize, decode_binary: bool) -> JsonValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| decode_binary_value(&v, decode_binary))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_json(row: &PgRow, idx: usize) -> JsonValue {
        row.try_get::<Option<serde_json::Value>, _>(idx)
            .ok()
            .flatten()
            .unwrap_or(JsonValue::Null)
    }

    /// Types that only PostgreSQL has, matched by name.
    fn decode_named(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
        match type_name.to_uppercase().as_str() {
            "INTERVAL" => text(
                row.try_get::<Option<PgInterval>, _>(idx)
                    .ok()
                    .flatten()
                    .map(|v| format_interval(&v)),
            ),
            "MONEY" => text(
                row.try_get::<Option<PgMoney>, _>(idx)
                    .ok()
                    .flatten()
                    .map(|v| format_money(v.0)),
            ),
            "TIMETZ" => text(
                row.try_get::<Option<PgTimeTz<NaiveTime, FixedOffset>>, _>(idx)
                    .ok()
                    .flatten()
                    .map(|v| format!("{}{}", v.time, v.offset)),
            ),
            name @ ("INET" | "CIDR") => text(
                row.try_get::<Option<IpNetwork>, _>(idx)
                    .ok()
                    .flatten()
                    .map(|v| format_network(v, name == "CIDR")),
            ),
            _ => text(row.try_get::<Option<String>, _>(idx).ok().flatten()),
        }
    }

    fn decode_array(row: &PgRow, idx: usize) -> JsonValue {
        macro_rules! try_array {
            ($ty:ty, $map:expr) => {
                if let Ok(v) = row.try_get::<Option<Vec<Option<$ty>>>, _>(idx) {
                    return match v {
                        Some(items) => JsonValue::Array(
                            items
                                .into_iter()
                                .map(|item| item.map($map).unwrap_or(JsonValue::Null))
                                .collect(),
                        ),
                        None => JsonValue::Null,
                    };
                }
            };
        }

        try_array!(bool, JsonValue::Bool);
        try_array!(i16, |v: i16| JsonValue::Number(v.into()));
        try_array!(i32, |v: i32| JsonValue::Number(v.into()));
        try_array!(i64, |v: i64| JsonValue::Number(v.into()));
        try_array!(f32, |v: f32| float_value(v as f64));
        try_array!(f64, float_value);
        try_array!(RawDecimal, |v: RawDecimal| JsonValue::String(v.0));
        try_array!(String, JsonValue::String);
        try_array!(Uuid, |v: Uuid| JsonValue::String(v.to_string()));
        try_array!(NaiveDate, |v: NaiveDate| JsonValue::String(v.to_string()));
        try_array!(NaiveTime, |v: NaiveTime| JsonValue::String(v.to_string()));
        try_array!(NaiveDateTime, |v: NaiveDateTime| JsonValue::String(v.to_string()));
        try_array!(DateTime<Utc>, |v: DateTime<Utc>| JsonValue::String(v.to_rfc3339()));
        JsonValue::Null
    }

    /// Last resort for values no typed decode accepted: the bytes on the wire.
    fn decode_raw(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
        let Ok(value) = row.try_get_raw(idx) else {
            return JsonValue::Null;
        };
        if value.is_null() {
            return JsonValue::Null;
        }
        let decoded = match value.format() {
            PgValueFormat::Text => value.as_str().map(|s| JsonValue::String(s.to_string())),
            PgValueFormat::Binary => value.as_bytes().map(|bytes| {
                if std::str::from_utf8(bytes).is_err() {
                    tracing::warn!(column = idx, type_name, "Writing raw column bytes as base64");
                }
                decode_binary_value(bytes, true)
            }),
        };
        decoded.unwrap_or_else(|e| {
            tracing::error!(column = idx, type_name, error = %e, "Failed to read column value");
            JsonValue::Null
        })
    }

    fn plural(n: i64, unit: &str) -> String {
        if n == 1 || n == -1 {
            format!("{} {}", n, unit)
        } else {
            format!("{} {}s", n, unit)
        }
    }

    /// Interval text the way PostgreSQL prints it: `1 year 2 mons 3 days 04:05:06`.
    pub(super) fn format_interval(interval: &PgInterval) -> String {
        let mut parts = Vec::new();
        let years = i64::from(interval.months / 12);
        let months = i64::from(interval.months % 12);
        if years != 0 {
            parts.push(plural(years, "year"));
        }
        if months != 0 {
            parts.push(plural(months, "mon"));
        }
        if interval.days != 0 {
            parts.push(plural(i64::from(interval.days), "day"));
        }

        let micros = interval.microseconds;
        if micros != 0 || parts.is_empty() {
            let sign = if micros < 0 { "-" } else { "" };
            let micros = micros.unsigned_abs();
            let secs = micros / 1_000_000;
            let mut clock = format!(
                "{}{:02}:{:02}:{:02}",
                sign,
                secs / 3600,
                secs / 60 % 60,
                secs % 60
            );
            let fraction = micros % 1_000_000;
            if fraction != 0 {
                let digits = format!("{:06}", fraction);
                clock.push('.');
                clock.push_str(digits.trim_end_matches('0'));
            }
            parts.push(clock);
        }
        parts.join(" ")
    }

    /// Money amount in cents, without a currency symbol.
    pub(super) fn format_money(cents: i64) -> String {
        let sign = if cents < 0 { "-" } else { "" };
        let cents = cents.unsigned_abs();
        format!("{}{}.{:02}", sign, cents / 100, cents % 100)
    }

    /// INET hosts print without a prefix length; CIDR always carries one.
    pub(super) fn format_network(network: IpNetwork, cidr: bool) -> String {
        let host_prefix = match network {
            IpNetwork::V4(_) => 32,
            IpNetwork::V6(_) => 128,
        };
        if !cidr && network.prefix() == host_prefix {
            network.ip().to_string()
        } else {
            network.to_string()
        }
    }
}

mod sqlite {
    use super::*;

    /// Decode by the storage class of the value itself (INTEGER, REAL, TEXT, BLOB).
    pub fn decode_column(row: &SqliteRow, idx: usize, decode_binary: bool) -> JsonValue {
        let storage = match row.try_get_raw(idx) {
            Ok(raw) if raw.is_null() => return JsonValue::Null,
            Ok(raw) => raw.type_info().name().to_uppercase(),
            Err(e) => {
                tracing::error!("Failed to read column {}: {:?}", idx, e);
                return JsonValue::Null;
            }
        };

        match storage.as_str() {
            "INTEGER" | "BOOLEAN" => decode_integer(row, idx),
            "REAL" | "NUMERIC" => decode_float(row, idx),
            "BLOB" => decode_binary_col(row, idx, decode_binary),
            _ => decode_text(row, idx),
        }
    }

    fn decode_integer(row: &SqliteRow, idx: usize) -> JsonValue {
        row.try_get::<Option<i64>, _>(idx)
            .ok()
            .flatten()
            .map(|v| JsonValue::Number(v.into()))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_float(row: &SqliteRow, idx: usize) -> JsonValue {
        row.try_get::<Option<f64>, _>(idx)
            .ok()
            .flatten()
            .map(float_value)
            .unwrap_or(JsonValue::Null)
    }

    fn decode_binary_col(row: &SqliteRow, idx: usize, decode_binary: bool) -> JsonValue {
        row.try_get::<Option<Vec<u8>>, _>(idx)
            .ok()
            .flatten()
            .map(|v| decode_binary_value(&v, decode_binary))
            .unwrap_or(JsonValue::Null)
    }

    fn decode_text(row: &SqliteRow, idx: usize) -> JsonValue {
        text(row.try_get::<Option<String>, _>(idx).ok().flatten())
    }
}
