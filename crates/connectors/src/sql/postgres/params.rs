use crate::sql::base::error::DbError;
use bigdecimal::{BigDecimal, ToPrimitive};
use bytes::BytesMut;
use model::core::value::Value;
use rust_decimal::{Decimal as RustDecimal, prelude::FromPrimitive as DecimalFromPrimitive};
use std::error::Error;
use tokio_postgres::types::{IsNull, Json as PgJson, ToSql, Type, to_sql_checked};

/// A typed SQL NULL that binds to a parameter of any type.
#[derive(Debug)]
struct PgNull;

impl ToSql for PgNull {
    fn to_sql(&self, _: &Type, _: &mut BytesMut) -> Result<IsNull, Box<dyn Error + Sync + Send>> {
        Ok(IsNull::Yes)
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    to_sql_checked!();
}

pub struct PgParam(Box<dyn ToSql + Sync + Send>);

impl PgParam {
    /// Fails only for decimals that do not fit a Postgres binary numeric
    /// without losing digits.
    pub fn from_value(value: Value) -> Result<Self, DbError> {
        let param = match value {
            Value::Int(v) => PgParam(Box::new(v)),
            Value::Float(v) => PgParam(Box::new(v)),
            Value::Decimal(v) => PgParam(Box::new(to_rust_decimal(&v)?)),
            Value::String(v) => PgParam(Box::new(v)),
            Value::Boolean(v) => PgParam(Box::new(v)),
            Value::Json(v) => PgParam(Box::new(PgJson(v))),
            Value::Uuid(v) => PgParam(Box::new(v)),
            Value::Bytes(v) => PgParam(Box::new(v)),
            Value::Date(v) => PgParam(Box::new(v)),
            Value::Timestamp(v) => PgParam(Box::new(v)),
            Value::TimestampNaive(v) => PgParam(Box::new(v)),
            Value::Null => PgParam(Box::new(PgNull)),
        };
        Ok(param)
    }

    /// Binds `value` for a parameter the server declared as `ty`.
    ///
    /// Values read from a different store rarely carry the exact wire type
    /// the target column expects (a MySQL `INT` arrives as i64, a Postgres
    /// `int4` wants i32). Lossless narrowings are applied here; anything else
    /// falls back to [`PgParam::from_value`] and lets the driver decide.
    pub fn for_type(value: Value, ty: &Type) -> Result<Self, DbError> {
        let param = match (value, ty) {
            (Value::Null, _) => PgParam(Box::new(PgNull)),

            (Value::Int(v), &Type::INT2) if i16::try_from(v).is_ok() => {
                PgParam(Box::new(v as i16))
            }
            (Value::Int(v), &Type::INT4) if i32::try_from(v).is_ok() => {
                PgParam(Box::new(v as i32))
            }
            (Value::Int(v), &Type::FLOAT4) => PgParam(Box::new(v as f32)),
            (Value::Int(v), &Type::FLOAT8) => PgParam(Box::new(v as f64)),
            (Value::Int(v), &Type::NUMERIC) => PgParam(Box::new(RustDecimal::from(v))),
            (Value::Int(v), &Type::BOOL) => PgParam(Box::new(v != 0)),

            (Value::Float(v), &Type::FLOAT4) => PgParam(Box::new(v as f32)),
            (Value::Float(v), &Type::NUMERIC) => match RustDecimal::from_f64(v) {
                Some(decimal) => PgParam(Box::new(decimal)),
                None => PgParam(Box::new(v)),
            },

            (Value::Decimal(v), &Type::FLOAT8) => match v.to_f64() {
                Some(f) => PgParam(Box::new(f)),
                None => PgParam::from_value(Value::Decimal(v))?,
            },
            (Value::Decimal(v), &Type::INT8) if v.is_integer() => match v.to_i64() {
                Some(i) => PgParam(Box::new(i)),
                None => PgParam::from_value(Value::Decimal(v))?,
            },

            (Value::TimestampNaive(v), &Type::TIMESTAMPTZ) => PgParam(Box::new(v.and_utc())),
            (Value::TimestampNaive(v), &Type::DATE) => PgParam(Box::new(v.date())),
            (Value::Timestamp(v), &Type::TIMESTAMP) => PgParam(Box::new(v.naive_utc())),
            (Value::Date(v), &Type::TIMESTAMP) => match v.and_hms_opt(0, 0, 0) {
                Some(ts) => PgParam(Box::new(ts)),
                None => PgParam(Box::new(v)),
            },

            (Value::String(v), &Type::UUID) => match uuid::Uuid::parse_str(&v) {
                Ok(id) => PgParam(Box::new(id)),
                Err(_) => PgParam(Box::new(v)),
            },
            (Value::String(v), &Type::JSON | &Type::JSONB) => {
                match serde_json::from_str::<serde_json::Value>(&v) {
                    Ok(json) => PgParam(Box::new(PgJson(json))),
                    Err(_) => PgParam(Box::new(v)),
                }
            }
            (
                value @ (Value::Int(_)
                | Value::Float(_)
                | Value::Decimal(_)
                | Value::Boolean(_)
                | Value::Uuid(_)
                | Value::Date(_)
                | Value::Timestamp(_)
                | Value::TimestampNaive(_)),
                &Type::TEXT | &Type::VARCHAR | &Type::BPCHAR,
            ) => PgParam(Box::new(value.to_string())),

            (value, _) => PgParam::from_value(value)?,
        };
        Ok(param)
    }
}

/// Exact conversion only: values beyond 28 significant digits or outside
/// the representable range are rejected instead of rounded.
fn to_rust_decimal(value: &BigDecimal) -> Result<RustDecimal, DbError> {
    let plain = value.to_plain_string();
    RustDecimal::from_str_exact(&plain).map_err(|err| DbError::UnsupportedValue {
        value: plain,
        reason: err.to_string(),
    })
}

impl AsRef<dyn ToSql + Sync> for PgParam {
    fn as_ref(&self) -> &(dyn ToSql + Sync + 'static) {
        &*self.0
    }
}

pub struct PgParamStore {
    pub params: Vec<PgParam>,
}

impl PgParamStore {
    /// Binds against the parameter types of a prepared statement. Extra
    /// values beyond the declared types use the untyped conversion.
    pub fn for_types(values: &[Value], types: &[Type]) -> Result<Self, DbError> {
        let params = values
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, value)| match types.get(i) {
                Some(ty) => PgParam::for_type(value, ty),
                None => PgParam::from_value(value),
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { params })
    }

    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|param| param.as_ref())
            .collect::<Vec<_>>()
    }
}
