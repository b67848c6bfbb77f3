use crate::sql::base::error::DbError;
use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use model::{
    core::value::Value,
    records::row::{FieldValue, SourceRow},
};
use mysql_async::{Column as MySqlColumn, Row as MySqlRow, Value as MySqlValue, consts::ColumnType};
use std::str::FromStr;
use tokio_postgres::{
    Row as PgRow,
    types::{FromSql, Json as PgJson, Type},
};
use uuid::Uuid;

/// Character set id MySQL reports for binary strings and blobs.
const MYSQL_BINARY_CHARSET: u16 = 63;

pub enum DbRow<'a> {
    MySqlRow(&'a MySqlRow),
    PostgresRow(&'a PgRow),
}

impl DbRow<'_> {
    /// Decodes every column, keeping the result set's column order.
    pub fn to_source_row(&self) -> Result<SourceRow, DbError> {
        match self {
            DbRow::PostgresRow(row) => pg_row(row),
            DbRow::MySqlRow(row) => Ok(mysql_row(row)),
        }
    }
}

fn pg_row(row: &PgRow) -> Result<SourceRow, DbError> {
    let fields = row
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, column)| {
            let value = pg_value(row, idx, column.name(), column.type_())?;
            Ok(FieldValue {
                name: column.name().to_string(),
                value,
            })
        })
        .collect::<Result<Vec<_>, DbError>>()?;
    Ok(SourceRow::new(fields))
}

fn pg_get<'a, T: FromSql<'a>>(row: &'a PgRow, idx: usize, name: &str) -> Result<Option<T>, DbError> {
    row.try_get::<_, Option<T>>(idx).map_err(|e| DbError::Decode {
        column: name.to_string(),
        reason: e.to_string(),
    })
}

fn pg_value(row: &PgRow, idx: usize, name: &str, ty: &Type) -> Result<Value, DbError> {
    let value = match *ty {
        Type::BOOL => pg_get::<bool>(row, idx, name)?.map(Value::Boolean),
        Type::INT2 => pg_get::<i16>(row, idx, name)?.map(|v| Value::Int(v.into())),
        Type::INT4 => pg_get::<i32>(row, idx, name)?.map(|v| Value::Int(v.into())),
        Type::INT8 => pg_get::<i64>(row, idx, name)?.map(Value::Int),
        Type::FLOAT4 => pg_get::<f32>(row, idx, name)?.map(|v| Value::Float(v.into())),
        Type::FLOAT8 => pg_get::<f64>(row, idx, name)?.map(Value::Float),
        Type::NUMERIC => match pg_get::<rust_decimal::Decimal>(row, idx, name)? {
            Some(d) => Some(Value::Decimal(BigDecimal::from_str(&d.to_string()).map_err(
                |e| DbError::Decode {
                    column: name.to_string(),
                    reason: e.to_string(),
                },
            )?)),
            None => None,
        },
        Type::TEXT | Type::VARCHAR | Type::BPCHAR | Type::NAME => {
            pg_get::<String>(row, idx, name)?.map(Value::String)
        }
        Type::TIMESTAMP => pg_get::<NaiveDateTime>(row, idx, name)?.map(Value::TimestampNaive),
        Type::TIMESTAMPTZ => pg_get::<DateTime<Utc>>(row, idx, name)?.map(Value::Timestamp),
        Type::DATE => pg_get::<NaiveDate>(row, idx, name)?.map(Value::Date),
        Type::JSON | Type::JSONB => {
            pg_get::<PgJson<serde_json::Value>>(row, idx, name)?.map(|j| Value::Json(j.0))
        }
        Type::UUID => pg_get::<Uuid>(row, idx, name)?.map(Value::Uuid),
        Type::BYTEA => pg_get::<Vec<u8>>(row, idx, name)?.map(Value::Bytes),
        _ => {
            return Err(DbError::UnsupportedColumnType {
                column: name.to_string(),
                type_name: ty.name().to_string(),
            });
        }
    };
    Ok(value.unwrap_or(Value::Null))
}

fn mysql_row(row: &MySqlRow) -> SourceRow {
    let fields = row
        .columns_ref()
        .iter()
        .enumerate()
        .map(|(idx, column)| FieldValue {
            name: column.name_str().into_owned(),
            value: row
                .as_ref(idx)
                .map(|value| mysql_value(value, column))
                .unwrap_or(Value::Null),
        })
        .collect();
    SourceRow::new(fields)
}

fn mysql_value(value: &MySqlValue, column: &MySqlColumn) -> Value {
    match value {
        MySqlValue::NULL => Value::Null,
        MySqlValue::Int(i) => Value::Int(*i),
        MySqlValue::UInt(u) => i64::try_from(*u)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Decimal(BigDecimal::from(*u))),
        MySqlValue::Float(f) => Value::Float(f64::from(*f)),
        MySqlValue::Double(d) => Value::Float(*d),
        MySqlValue::Bytes(bytes) => mysql_bytes(bytes, column),
        MySqlValue::Date(y, m, d, h, mi, s, us) => {
            let date = NaiveDate::from_ymd_opt(i32::from(*y), u32::from(*m), u32::from(*d));
            match (column.column_type(), date) {
                (ColumnType::MYSQL_TYPE_DATE, Some(date)) => Value::Date(date),
                (_, Some(date)) => date
                    .and_hms_micro_opt(u32::from(*h), u32::from(*mi), u32::from(*s), *us)
                    .map(Value::TimestampNaive)
                    .unwrap_or(Value::Null),
                // Zero dates ('0000-00-00') have no calendar equivalent.
                (_, None) => Value::Null,
            }
        }
        MySqlValue::Time(neg, days, h, m, s, us) => {
            let hours = u32::from(*h) + days * 24;
            let sign = if *neg { "-" } else { "" };
            Value::String(format!("{sign}{hours:02}:{m:02}:{s:02}.{us:06}"))
        }
    }
}

fn mysql_bytes(bytes: &[u8], column: &MySqlColumn) -> Value {
    match column.column_type() {
        ColumnType::MYSQL_TYPE_DECIMAL | ColumnType::MYSQL_TYPE_NEWDECIMAL => {
            let text = String::from_utf8_lossy(bytes);
            BigDecimal::from_str(&text)
                .map(Value::Decimal)
                .unwrap_or_else(|_| Value::String(text.into_owned()))
        }
        ColumnType::MYSQL_TYPE_JSON => serde_json::from_slice(bytes)
            .map(Value::Json)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned())),
        _ if column.character_set() == MYSQL_BINARY_CHARSET => Value::Bytes(bytes.to_vec()),
        _ => Value::String(String::from_utf8_lossy(bytes).into_owned()),
    }
}
