//! Record merging across files

use twbgraph_core::FieldRecord;

/// Concatenate per-file record tables in the order given, stamping each
/// record with the name of the file it came from
///
/// Counters are left untouched, so they repeat across sources.
pub fn merge<I, S>(tables: I) -> Vec<FieldRecord>
where
    I: IntoIterator<Item = (S, Vec<FieldRecord>)>,
    S: Into<String>,
{
    let mut combined = Vec::new();

    for (source, records) in tables {
        let source = source.into();
        combined.extend(records.into_iter().map(|record| record.with_source(source.clone())));
    }

    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use twbgraph_core::{Datasource, Field, Workbook};
    use crate::extractor::FieldExtractor;

    fn records(ids: &[&str]) -> Vec<FieldRecord> {
        let mut ds = Datasource::new("ds");
        for id in ids {
            ds.insert_field(Field::new(*id));
        }
        FieldExtractor::extract(&Workbook::new(vec![ds]))
    }

    #[test]
    fn stamps_source_and_keeps_order() {
        let combined = merge(vec![
            ("a.twbx", records(&["[X]", "[Y]"])),
            ("b.twbx", records(&["[X]"])),
        ]);

        let rows: Vec<(usize, &str, &str)> = combined
            .iter()
            .map(|r| (r.counter, r.field_id.as_str(), r.source.as_deref().unwrap()))
            .collect();

        assert_eq!(
            rows,
            vec![(0, "[X]", "a.twbx"), (1, "[Y]", "a.twbx"), (0, "[X]", "b.twbx")]
        );
    }

    #[test]
    fn empty_input() {
        let combined = merge(Vec::<(String, Vec<FieldRecord>)>::new());
        assert!(combined.is_empty());
    }

    #[test]
    fn empty_table_contributes_nothing() {
        let combined = merge(vec![("a.twb", Vec::new()), ("b.twb", records(&["[Z]"]))]);
        assert_eq!(combined.len(), 1);
        assert_eq!(combined[0].source.as_deref(), Some("b.twb"));
    }
}
