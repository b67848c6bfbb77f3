use crate::core::value::Value;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub name: String,
    pub value: Value,
}

/// One record fetched from the source store, columns in result order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceRow {
    pub field_values: Vec<FieldValue>,
}

impl SourceRow {
    pub fn new(field_values: Vec<FieldValue>) -> Self {
        SourceRow { field_values }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        SourceRow {
            field_values: pairs
                .into_iter()
                .map(|(name, value)| FieldValue {
                    name: name.into(),
                    value: value.into(),
                })
                .collect(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.field_values
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
    }

    /// Value of `field`, or `Null` when the row does not carry it.
    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .map(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.field_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_values.is_empty()
    }

    pub fn size_bytes(&self) -> usize {
        self.field_values.iter().map(|f| f.value.size_bytes()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let row = SourceRow::from_pairs([("ID", Value::Int(1)), ("Name", Value::from("a"))]);
        assert_eq!(row.get_value("id"), Value::Int(1));
        assert_eq!(row.get_value("NAME"), Value::from("a"));
    }

    #[test]
    fn missing_column_reads_as_null() {
        let row = SourceRow::from_pairs([("id", Value::Int(1))]);
        assert_eq!(row.get_value("value1"), Value::Null);
    }
}
