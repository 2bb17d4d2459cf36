//! Match records and their TSV rendering

/// Header row of the rendered table
pub const TSV_HEADER: &str = "Index\tDocument\tPage\tMatch";

/// One match of the pattern in one document page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    /// 1-based, contiguous within a document across all of its pages
    pub index: u32,
    /// Upload name without its extension
    pub document: String,
    /// 1-based page number
    pub page: u32,
    /// Matched text (group values joined by a space when the pattern has groups)
    pub text: String,
}

impl MatchRecord {
    fn to_tsv_row(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}",
            self.index,
            tsv_field(&self.document),
            self.page,
            tsv_field(&self.text)
        )
    }
}

/// Match records in encounter order: document, then page, then scan order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultTable {
    records: Vec<MatchRecord>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: MatchRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[MatchRecord] {
        &self.records
    }

    /// Number of match rows (the header is not counted)
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Render as tab-separated text with a header row.
    ///
    /// An empty table renders as the empty string, without a header.
    pub fn to_tsv(&self) -> String {
        if self.records.is_empty() {
            return String::new();
        }

        let mut lines = Vec::with_capacity(self.records.len() + 1);
        lines.push(TSV_HEADER.to_string());
        lines.extend(self.records.iter().map(MatchRecord::to_tsv_row));
        lines.join("\n")
    }
}

/// Keep a field on one spreadsheet cell
fn tsv_field(value: &str) -> String {
    value.replace(['\t', '\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn record(index: u32, document: &str, page: u32, text: &str) -> MatchRecord {
        MatchRecord {
            index,
            document: document.to_string(),
            page,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_empty_table_has_no_header() {
        assert_eq!(ResultTable::new().to_tsv(), "");
    }

    #[test]
    fn test_tsv_rendering() {
        let mut table = ResultTable::new();
        table.push(record(1, "invoice", 1, "1234-5678-9012"));
        table.push(record(2, "invoice", 3, "9999-0000-1111"));

        assert_eq!(
            table.to_tsv(),
            "Index\tDocument\tPage\tMatch\n1\tinvoice\t1\t1234-5678-9012\n2\tinvoice\t3\t9999-0000-1111"
        );
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_control_characters_flattened() {
        let mut table = ResultTable::new();
        table.push(record(1, "a\tb", 2, "line one\r\nline two"));

        assert_eq!(
            table.to_tsv(),
            "Index\tDocument\tPage\tMatch\n1\ta b\t2\tline one  line two"
        );
    }
}
