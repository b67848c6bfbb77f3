use crate::mapping::config::MappingConfig;
use serde::{Deserialize, Serialize};

/// A request to start a synchronization run.
///
/// When `exec_id` is absent the dispatcher registers the run with the
/// manager first and uses the identifier it hands back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunRequest {
    pub exec_id: Option<i64>,
    pub module_id: Option<String>,
    /// Overrides the configured manager base URL for this run only.
    pub callback_url: Option<String>,
    pub mapping_config: Option<MappingConfig>,
}

impl RunRequest {
    pub fn new(mapping_config: MappingConfig) -> Self {
        RunRequest {
            mapping_config: Some(mapping_config),
            ..Default::default()
        }
    }

    pub fn with_exec_id(mut self, exec_id: i64) -> Self {
        self.exec_id = Some(exec_id);
        self
    }

    pub fn callback_url(&self) -> Option<&str> {
        self.callback_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numeric_exec_id_and_blank_callback() {
        let req: RunRequest = serde_json::from_str(
            r#"{"execId": 12, "callbackUrl": "  ", "mappingConfig": {"tableMappings": []}}"#,
        )
        .unwrap();
        assert_eq!(req.exec_id, Some(12));
        assert_eq!(req.callback_url(), None);
        assert!(req.mapping_config.is_some());
    }

    #[test]
    fn tolerates_nulls_from_the_manager() {
        let req: RunRequest = serde_json::from_str(
            r#"{"execId": null, "moduleId": null, "callbackUrl": null,
                "mappingConfig": {"tableMappings": null, "syncStartDt": null}}"#,
        )
        .unwrap();
        assert_eq!(req.exec_id, None);
        let config = req.mapping_config.unwrap();
        assert!(config.table_mappings.is_empty());
        assert!(config.validate().is_err());
    }
}
