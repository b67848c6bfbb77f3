use crate::error::CliError;
use model::mapping::{config::MappingConfig, correspondence::ColumnCorrespondence};
use planner::{
    plan::TablePlan,
    query::dialect::{DialectKind, for_kind},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePreview {
    pub mapping: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub columns: Vec<ColumnPreview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<TablePlan>,
}

#[derive(Debug, Serialize)]
pub struct ColumnPreview {
    pub source: String,
    pub target: String,
}

/// What each table mapping of `config` would execute, without touching a
/// store. Mappings that cannot run carry their error instead of a plan.
pub fn preview(
    config: &MappingConfig,
    source: DialectKind,
    target: DialectKind,
) -> Vec<TablePreview> {
    let window = config.sync_window().is_some();

    config
        .table_mappings
        .iter()
        .map(|mapping| match ColumnCorrespondence::resolve(mapping) {
            Ok(columns) => TablePreview {
                mapping: mapping.label(),
                error: None,
                columns: columns
                    .pairs()
                    .iter()
                    .map(|p| ColumnPreview {
                        source: p.source.clone(),
                        target: p.target.clone(),
                    })
                    .collect(),
                plan: Some(TablePlan::new(
                    mapping,
                    &columns,
                    window,
                    for_kind(source),
                    for_kind(target),
                )),
            },
            Err(err) => TablePreview {
                mapping: mapping.label(),
                error: Some(err.to_string()),
                columns: Vec::new(),
                plan: None,
            },
        })
        .collect()
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(CliError::JsonSerialize)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::mapping::config::TableMapping;

    #[test]
    fn invalid_mappings_carry_their_error() {
        let config = MappingConfig::new(
            vec![
                TableMapping::new("a", "b", "id", " "),
                TableMapping::new("src", "dst", "id", "id").with_column("name", "label"),
            ],
            None,
        );
        let previews = preview(&config, DialectKind::MySql, DialectKind::Postgres);

        assert!(previews[0].error.as_deref().unwrap().contains("target primary key"));
        assert!(previews[0].plan.is_none());

        let plan = previews[1].plan.as_ref().unwrap();
        assert_eq!(plan.select, "SELECT id, name FROM src");
        assert_eq!(plan.insert, "INSERT INTO dst (id, label) VALUES ($1, $2)");
        assert_eq!(previews[1].columns[1].target, "label");
    }
}
