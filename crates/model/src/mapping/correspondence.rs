use crate::{execution::errors::ConfigurationError, mapping::config::TableMapping};

/// One source column and the target column it is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPair {
    pub source: String,
    pub target: String,
}

/// The effective, ordered source → target column association for one table
/// mapping. The key pair is always first; the remaining pairs follow in
/// configured order, deduplicated by case-insensitive source column.
///
/// Built once per table sync and shared by the SELECT, INSERT and UPDATE
/// statements of that table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnCorrespondence {
    pairs: Vec<ColumnPair>,
}

impl ColumnCorrespondence {
    pub fn resolve(mapping: &TableMapping) -> Result<Self, ConfigurationError> {
        let (source_pk, target_pk) = mapping.pk_columns()?;

        let mut pairs = vec![ColumnPair {
            source: source_pk.to_string(),
            target: target_pk.to_string(),
        }];

        for column in &mapping.column_mappings {
            let source = column.source_column.trim();
            let target = column.target_column.trim();
            if source.is_empty() || target.is_empty() {
                continue;
            }
            if pairs.iter().any(|p| p.source.eq_ignore_ascii_case(source)) {
                continue;
            }
            pairs.push(ColumnPair {
                source: source.to_string(),
                target: target.to_string(),
            });
        }

        Ok(ColumnCorrespondence { pairs })
    }

    pub fn pairs(&self) -> &[ColumnPair] {
        &self.pairs
    }

    pub fn key(&self) -> &ColumnPair {
        &self.pairs[0]
    }

    /// Pairs other than the key pair, in order.
    pub fn non_key(&self) -> &[ColumnPair] {
        &self.pairs[1..]
    }

    /// Non-key pairs whose target is not the key's target column; the
    /// columns an existing target row has rewritten.
    pub fn updatable(&self) -> impl Iterator<Item = &ColumnPair> {
        let key_target = &self.key().target;
        self.non_key()
            .iter()
            .filter(move |p| !p.target.eq_ignore_ascii_case(key_target))
    }

    pub fn source_columns(&self) -> Vec<String> {
        self.pairs.iter().map(|p| p.source.clone()).collect()
    }

    pub fn target_columns(&self) -> Vec<String> {
        self.pairs.iter().map(|p| p.target.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
