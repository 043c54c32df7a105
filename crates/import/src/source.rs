use crate::header::ColumnMap;
use serde::{Deserialize, Serialize};

/// One transaction already structured by an upstream OCR extractor.
/// Dates and amounts arrive as text and go through the same parsing
/// rules as tabular cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRow {
    pub date: String,
    pub description: String,
    #[serde(default)]
    pub reference: Option<String>,
    pub amount: String,
    /// "CR" or "DB" when the extractor could tell the side.
    #[serde(default)]
    pub indicator: Option<String>,
}

/// Where the statement came from, with its payload.
#[derive(Debug, Clone)]
pub enum StatementSource {
    /// Raw bytes of a delimited-text export.
    Delimited(Vec<u8>),
    /// Rows of cells from a spreadsheet reader, formatting already
    /// resolved by the producer.
    Spreadsheet(Vec<Vec<String>>),
    /// Rows of cells recovered from a scanned table.
    OcrRows(Vec<Vec<String>>),
    /// Per-transaction records from a free-form OCR extractor.
    OcrExtracted(Vec<ExtractedRow>),
}

impl StatementSource {
    /// Spreadsheet cells carry their own year; every other source may
    /// produce day/month-only dates and needs a working year up front.
    pub fn requires_year(&self) -> bool {
        !matches!(self, StatementSource::Spreadsheet(_))
    }
}

/// Lay extracted records out as rows so the normalizer can treat all
/// sources alike. The indicator lands in the cell after the amount,
/// exactly where the adjacent-cell rule looks for it.
pub(crate) fn rows_from_extracted(items: Vec<ExtractedRow>) -> Vec<Vec<String>> {
    items
        .into_iter()
        .map(|item| {
            vec![
                item.date,
                item.description,
                item.reference.unwrap_or_default(),
                item.amount,
                item.indicator.unwrap_or_default(),
            ]
        })
        .collect()
}

pub(crate) fn extracted_columns() -> ColumnMap {
    ColumnMap {
        date: Some(0),
        description: Some(1),
        reference: Some(2),
        amount: Some(3),
        ..ColumnMap::default()
    }
}
