//! Conversion between core values and PostgreSQL wire types

use bytes::BytesMut;
use chrono::{DateTime, NaiveDate, Utc};
use pulse_core::{Row, Value};
use tokio_postgres::types::{FromSql, IsNull, ToSql, Type};
use tokio_postgres::{Row as PgRow, Statement};

/// Wrapper enum carrying owned values that implement `ToSql`.
///
/// tokio-postgres encodes parameters against the statement's declared types,
/// so integers are re-widthed and strings re-typed before binding.
#[derive(Debug)]
pub(crate) enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    String(String),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    Date(NaiveDate),
    DateTimeUtc(DateTime<Utc>),
}

impl PgValue {
    /// Convert a value against the declared type of its parameter slot
    fn for_type(value: &Value, target: &Type) -> Self {
        match value {
            Value::Int16(v) => Self::coerce_int(*v as i64, target),
            Value::Int32(v) => Self::coerce_int(*v as i64, target),
            Value::Int64(v) => Self::coerce_int(*v, target),
            Value::String(v) => Self::coerce_string(v, target),
            other => Self::from_value(other),
        }
    }

    /// Pick the integer width that matches the target column type so
    /// tokio-postgres writes the correct number of bytes
    fn coerce_int(value: i64, target: &Type) -> Self {
        if *target == Type::INT2 {
            PgValue::Int16(value as i16)
        } else if *target == Type::INT4 {
            PgValue::Int32(value as i32)
        } else {
            PgValue::Int64(value)
        }
    }

    /// Re-type string literals when the statement declares a concrete
    /// non-text parameter type
    fn coerce_string(value: &str, target: &Type) -> Self {
        if *target == Type::JSON || *target == Type::JSONB {
            serde_json::from_str(value)
                .map(PgValue::Json)
                .unwrap_or_else(|_| PgValue::String(value.to_string()))
        } else if *target == Type::DATE {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(PgValue::Date)
                .unwrap_or_else(|_| PgValue::String(value.to_string()))
        } else if *target == Type::TIMESTAMPTZ {
            DateTime::parse_from_rfc3339(value)
                .map(|t| PgValue::DateTimeUtc(t.with_timezone(&Utc)))
                .unwrap_or_else(|_| PgValue::String(value.to_string()))
        } else {
            PgValue::String(value.to_string())
        }
    }

    /// Fallback used when the statement declares no type for the slot
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int16(v) => PgValue::Int16(*v),
            Value::Int32(v) => PgValue::Int32(*v),
            Value::Int64(v) => PgValue::Int64(*v),
            Value::Float64(v) => PgValue::Float64(*v),
            Value::Decimal(v) => PgValue::String(v.clone()),
            Value::String(v) => PgValue::String(v.clone()),
            Value::Uuid(v) => PgValue::Uuid(*v),
            Value::Json(v) => PgValue::Json(v.clone()),
            Value::Date(v) => PgValue::Date(*v),
            Value::DateTimeUtc(v) => PgValue::DateTimeUtc(*v),
        }
    }
}

impl ToSql for PgValue {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            PgValue::Null => Ok(IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int16(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::String(v) => v.to_sql(ty, out),
            PgValue::Uuid(v) => v.to_sql(ty, out),
            PgValue::Json(v) => v.to_sql(ty, out),
            PgValue::Date(v) => v.to_sql(ty, out),
            PgValue::DateTimeUtc(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

/// Bind parameters against the prepared statement's declared types
pub(crate) fn bind_params(prepared: &Statement, params: &[Value]) -> Vec<PgValue> {
    let declared = prepared.params();
    params
        .iter()
        .enumerate()
        .map(|(idx, value)| match declared.get(idx) {
            Some(target) => PgValue::for_type(value, target),
            None => PgValue::from_value(value),
        })
        .collect()
}

/// Decode one result row into the core row type
pub(crate) fn decode_row(pg_row: &PgRow, column_names: &[String]) -> Row {
    let values = (0..column_names.len())
        .map(|idx| decode_value(pg_row, idx))
        .collect();
    Row::new(column_names.to_vec(), values)
}

/// Decode a single column by its type name, falling back to text, then NULL
fn decode_value(pg_row: &PgRow, idx: usize) -> Value {
    let type_name = pg_row.columns()[idx].type_().name();

    match type_name {
        "bool" => pg_row
            .try_get::<_, Option<bool>>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "int2" => pg_row
            .try_get::<_, Option<i16>>(idx)
            .ok()
            .flatten()
            .map(Value::Int16)
            .unwrap_or(Value::Null),
        "int4" => pg_row
            .try_get::<_, Option<i32>>(idx)
            .ok()
            .flatten()
            .map(Value::Int32)
            .unwrap_or(Value::Null),
        "int8" => pg_row
            .try_get::<_, Option<i64>>(idx)
            .ok()
            .flatten()
            .map(Value::Int64)
            .unwrap_or(Value::Null),
        "float4" => pg_row
            .try_get::<_, Option<f32>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::Float64(v as f64))
            .unwrap_or(Value::Null),
        "float8" => pg_row
            .try_get::<_, Option<f64>>(idx)
            .ok()
            .flatten()
            .map(Value::Float64)
            .unwrap_or(Value::Null),
        "numeric" => pg_row
            .try_get::<_, Option<NumericText>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::Decimal(v.0))
            .unwrap_or(Value::Null),
        "text" | "varchar" | "bpchar" | "char" | "name" => pg_row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
        "uuid" => pg_row
            .try_get::<_, Option<uuid::Uuid>>(idx)
            .ok()
            .flatten()
            .map(Value::Uuid)
            .unwrap_or(Value::Null),
        "json" | "jsonb" => pg_row
            .try_get::<_, Option<serde_json::Value>>(idx)
            .ok()
            .flatten()
            .map(Value::Json)
            .unwrap_or(Value::Null),
        "date" => pg_row
            .try_get::<_, Option<NaiveDate>>(idx)
            .ok()
            .flatten()
            .map(Value::Date)
            .unwrap_or(Value::Null),
        "timestamptz" => pg_row
            .try_get::<_, Option<DateTime<Utc>>>(idx)
            .ok()
            .flatten()
            .map(Value::DateTimeUtc)
            .unwrap_or(Value::Null),
        // Naive timestamps are treated as UTC.
        "timestamp" => pg_row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::DateTimeUtc(DateTime::from_naive_utc_and_offset(v, Utc)))
            .unwrap_or(Value::Null),
        _ => pg_row
            .try_get::<_, Option<String>>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

/// Textual decode of the binary NUMERIC wire format
struct NumericText(String);

impl<'a> FromSql<'a> for NumericText {
    fn from_sql(
        _: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self(parse_numeric(raw)?))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Decode the PostgreSQL binary NUMERIC payload into its text form.
///
/// Layout: ndigits, weight, sign, dscale as big-endian i16, followed by
/// `ndigits` base-10000 digit groups, most significant first. `weight` is
/// the power of 10000 of the first group; groups past the decimal point are
/// rendered to exactly `dscale` digits.
fn parse_numeric(raw: &[u8]) -> std::result::Result<String, Box<dyn std::error::Error + Sync + Send>> {
    if raw.len() < 8 {
        return Err("invalid NUMERIC payload: too short".into());
    }

    let ndigits = i16::from_be_bytes([raw[0], raw[1]]) as usize;
    let weight = i16::from_be_bytes([raw[2], raw[3]]) as i32;
    let sign = u16::from_be_bytes([raw[4], raw[5]]);
    let dscale = i16::from_be_bytes([raw[6], raw[7]]) as usize;

    if raw.len() < 8 + ndigits * 2 {
        return Err("invalid NUMERIC payload: truncated digits".into());
    }
    if sign == 0xC000 {
        return Ok("NaN".to_string());
    }

    let mut groups = Vec::with_capacity(ndigits);
    for i in 0..ndigits {
        let offset = 8 + i * 2;
        groups.push(u16::from_be_bytes([raw[offset], raw[offset + 1]]));
    }

    // Integer part: groups 0..=weight; weight < 0 means none.
    let mut integer = String::new();
    if weight >= 0 {
        for i in 0..=(weight as usize) {
            let group = groups.get(i).copied().unwrap_or(0);
            if integer.is_empty() {
                integer.push_str(&group.to_string());
            } else {
                integer.push_str(&format!("{group:04}"));
            }
        }
    }
    if integer.is_empty() {
        integer.push('0');
    }

    // Fractional part, rendered to exactly dscale digits.
    let mut fraction = String::new();
    if dscale > 0 {
        // Zero groups between the decimal point and the first stored group
        // when the magnitude is small (weight < -1).
        for _ in 0..(-1 - weight).max(0) {
            fraction.push_str("0000");
        }
        let skip = if weight >= 0 { weight as usize + 1 } else { 0 };
        for group in groups.iter().skip(skip) {
            fraction.push_str(&format!("{group:04}"));
        }
        if fraction.len() < dscale {
            fraction.push_str(&"0".repeat(dscale - fraction.len()));
        } else {
            fraction.truncate(dscale);
        }
    }

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }
    out.push_str(&integer);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(&fraction);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric_bytes(groups: &[u16], weight: i16, sign: u16, dscale: u16) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(groups.len() as i16).to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&(dscale as i16).to_be_bytes());
        for group in groups {
            raw.extend_from_slice(&group.to_be_bytes());
        }
        raw
    }

    #[test]
    fn numeric_zero() {
        let raw = numeric_bytes(&[], 0, 0, 0);
        assert_eq!(parse_numeric(&raw).unwrap(), "0");
    }

    #[test]
    fn numeric_integer() {
        // 2500000 = 250 * 10000^1
        let raw = numeric_bytes(&[250, 0], 1, 0, 0);
        assert_eq!(parse_numeric(&raw).unwrap(), "2500000");
    }

    #[test]
    fn numeric_with_scale() {
        // 12345.67 = [1, 2345, 6700], weight 1, dscale 2
        let raw = numeric_bytes(&[1, 2345, 6700], 1, 0, 2);
        assert_eq!(parse_numeric(&raw).unwrap(), "12345.67");
    }

    #[test]
    fn numeric_negative() {
        let raw = numeric_bytes(&[1, 2345, 6700], 1, 0x4000, 2);
        assert_eq!(parse_numeric(&raw).unwrap(), "-12345.67");
    }

    #[test]
    fn numeric_small_magnitude() {
        // 0.0001: single group 1 at weight -1, dscale 4
        let raw = numeric_bytes(&[1], -1, 0, 4);
        assert_eq!(parse_numeric(&raw).unwrap(), "0.0001");

        // 0.00000001: single group 1 at weight -2, dscale 8
        let raw = numeric_bytes(&[1], -2, 0, 8);
        assert_eq!(parse_numeric(&raw).unwrap(), "0.00000001");
    }

    #[test]
    fn numeric_keeps_declared_scale() {
        // 12.50 stays "12.50", not "12.5"
        let raw = numeric_bytes(&[12, 5000], 0, 0, 2);
        assert_eq!(parse_numeric(&raw).unwrap(), "12.50");
    }

    #[test]
    fn numeric_nan() {
        let raw = numeric_bytes(&[], 0, 0xC000, 0);
        assert_eq!(parse_numeric(&raw).unwrap(), "NaN");
    }

    #[test]
    fn numeric_rejects_short_payload() {
        assert!(parse_numeric(&[0, 0, 0]).is_err());
    }

    #[test]
    fn int_coercion_follows_target_width() {
        assert!(matches!(
            PgValue::coerce_int(7, &Type::INT2),
            PgValue::Int16(7)
        ));
        assert!(matches!(
            PgValue::coerce_int(7, &Type::INT4),
            PgValue::Int32(7)
        ));
        assert!(matches!(
            PgValue::coerce_int(7, &Type::INT8),
            PgValue::Int64(7)
        ));
    }

    #[test]
    fn string_coercion_follows_target_type() {
        assert!(matches!(
            PgValue::coerce_string(r#"{"a":1}"#, &Type::JSONB),
            PgValue::Json(_)
        ));
        assert!(matches!(
            PgValue::coerce_string("2026-08-01", &Type::DATE),
            PgValue::Date(_)
        ));
        assert!(matches!(
            PgValue::coerce_string("2026-08-01T00:00:00Z", &Type::TIMESTAMPTZ),
            PgValue::DateTimeUtc(_)
        ));
        // Unparseable values fall back to text and let the server complain.
        assert!(matches!(
            PgValue::coerce_string("not json", &Type::JSONB),
            PgValue::String(_)
        ));
    }

    #[test]
    fn null_binds_as_null() {
        assert!(matches!(
            PgValue::from_value(&Value::Null),
            PgValue::Null
        ));
    }
}
