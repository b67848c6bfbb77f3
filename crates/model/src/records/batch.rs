use crate::records::row::SourceRow;

/// A slice of fetched rows written under one target transaction.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// Zero-based position of this batch within the table.
    pub index: usize,
    pub rows: &'a [SourceRow],
}

impl Batch<'_> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Approximate payload size, summed over the values of every row.
    pub fn size_bytes(&self) -> usize {
        self.rows.iter().map(|r| r.size_bytes()).sum()
    }
}

/// Splits `rows` into consecutive batches of at most `size` rows, in order.
/// The last batch may be shorter. `size` must be greater than zero.
pub fn partition(rows: &[SourceRow], size: usize) -> impl Iterator<Item = Batch<'_>> {
    debug_assert!(size > 0, "batch size must be positive");
    rows.chunks(size.max(1))
        .enumerate()
        .map(|(index, rows)| Batch { index, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::Value;

    fn rows(n: i64) -> Vec<SourceRow> {
        (0..n)
            .map(|i| SourceRow::from_pairs([("id", Value::Int(i))]))
            .collect()
    }

    #[test]
    fn last_batch_is_shorter() {
        let rows = rows(250);
        let sizes: Vec<usize> = partition(&rows, 100).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![100, 100, 50]);
    }

    #[test]
    fn empty_input_yields_no_batches() {
        assert_eq!(partition(&[], 100).count(), 0);
    }

    #[test]
    fn batches_keep_row_order() {
        let rows = rows(5);
        let ids: Vec<Value> = partition(&rows, 2)
            .flat_map(|b| b.rows.iter().map(|r| r.get_value("id")))
            .collect();
        assert_eq!(ids, (0..5).map(Value::Int).collect::<Vec<_>>());
    }

    #[test]
    fn size_counts_the_values_of_every_row() {
        let rows = vec![
            SourceRow::from_pairs([("id", Value::Int(1)), ("name", Value::String("abc".into()))]),
            SourceRow::from_pairs([("id", Value::Int(2)), ("name", Value::Null)]),
        ];
        let sizes: Vec<usize> = partition(&rows, 1).map(|b| b.size_bytes()).collect();
        assert_eq!(sizes, vec![8 + 3, 8]);
    }
}
