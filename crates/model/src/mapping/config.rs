//! Declarative description of a synchronization run, as sent by the manager.

use crate::execution::errors::ConfigurationError;
use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// Everything one run needs to know about what to copy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MappingConfig {
    pub module_id: Option<String>,
    pub module_name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub table_mappings: Vec<TableMapping>,
    pub sync_start_dt: Option<NaiveDateTime>,
    pub sync_end_dt: Option<NaiveDateTime>,
}

/// Half-open `[start_inclusive, end_exclusive)` range on a source date column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    pub start_inclusive: NaiveDateTime,
    pub end_exclusive: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableMapping {
    pub table_mapping_id: Option<i64>,
    pub mapping_name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub source_table: String,
    #[serde(deserialize_with = "null_as_default")]
    pub target_table: String,
    #[serde(alias = "pkColumn")]
    pub source_pk_column: Option<String>,
    pub target_pk_column: Option<String>,
    pub source_date_column: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub column_mappings: Vec<ColumnMapping>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ColumnMapping {
    pub mapping_id: Option<i64>,
    #[serde(deserialize_with = "null_as_default")]
    pub source_column: String,
    #[serde(deserialize_with = "null_as_default")]
    pub target_column: String,
    /// `Y`/`N` marker kept for the manager's bookkeeping; the engine
    /// identifies the key pair through the table mapping's PK columns.
    pub is_primary_key: Option<String>,
}

impl MappingConfig {
    pub fn new(table_mappings: Vec<TableMapping>, window: Option<SyncWindow>) -> Self {
        MappingConfig {
            table_mappings,
            sync_start_dt: window.map(|w| w.start_inclusive),
            sync_end_dt: window.map(|w| w.end_exclusive),
            ..Default::default()
        }
    }

    /// The run-wide window; present only when both bounds are configured.
    pub fn sync_window(&self) -> Option<SyncWindow> {
        match (self.sync_start_dt, self.sync_end_dt) {
            (Some(start_inclusive), Some(end_exclusive)) => Some(SyncWindow {
                start_inclusive,
                end_exclusive,
            }),
            _ => None,
        }
    }

    /// Run-level check, done once before any connection is opened.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.table_mappings.is_empty() {
            return Err(ConfigurationError::NoTableMappings);
        }
        Ok(())
    }
}

impl TableMapping {
    pub fn new(
        source_table: &str,
        target_table: &str,
        source_pk_column: &str,
        target_pk_column: &str,
    ) -> Self {
        TableMapping {
            source_table: source_table.to_string(),
            target_table: target_table.to_string(),
            source_pk_column: Some(source_pk_column.to_string()),
            target_pk_column: Some(target_pk_column.to_string()),
            ..Default::default()
        }
    }

    pub fn with_date_column(mut self, column: &str) -> Self {
        self.source_date_column = Some(column.to_string());
        self
    }

    pub fn with_column(mut self, source: &str, target: &str) -> Self {
        self.column_mappings.push(ColumnMapping {
            source_column: source.to_string(),
            target_column: target.to_string(),
            ..Default::default()
        });
        self
    }

    /// `source_table -> target_table`, used as the table's label in logs and reports.
    pub fn label(&self) -> String {
        format!("{} -> {}", self.source_table, self.target_table)
    }

    /// Returns the (source, target) key columns, failing when either is
    /// absent or blank.
    pub fn pk_columns(&self) -> Result<(&str, &str), ConfigurationError> {
        let source = non_blank(self.source_pk_column.as_deref()).ok_or_else(|| {
            ConfigurationError::MissingPkColumn {
                side: "source",
                table: self.source_table.clone(),
            }
        })?;
        let target = non_blank(self.target_pk_column.as_deref()).ok_or_else(|| {
            ConfigurationError::MissingPkColumn {
                side: "target",
                table: self.target_table.clone(),
            }
        })?;
        Ok((source, target))
    }

    pub fn date_column(&self) -> Option<&str> {
        non_blank(self.source_date_column.as_deref())
    }
}

/// Reads an explicit `null` the same way as an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
