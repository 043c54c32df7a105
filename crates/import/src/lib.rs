pub mod dedup;
pub mod header;
pub mod match_engine;
pub mod metadata;
pub mod normalize;
pub mod source;
pub mod tokenize;
pub(crate) mod value;

pub use dedup::{partition_duplicates, DedupOutcome, DuplicatePolicy, LineKey};
pub use header::{locate_header, ColumnMap, HeaderLocation, HEADER_SCAN_ROWS};
pub use match_engine::{
    CandidateSnapshot, LineSnapshot, MatchAssignment, MatchEngine, MatchReport, MatchTier,
};
pub use metadata::{extract_metadata, StatementMetadata};
pub use normalize::{normalize_rows, ParseStats, ParsedLine};
pub use source::{ExtractedRow, StatementSource};
pub use tokenize::{detect_delimiter, tokenize};

use thiserror::Error;

/// File-level failures. Everything here aborts the batch before a
/// single line is produced; row-level trouble is only ever counted in
/// [`ParseStats`].
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unreadable statement file: {0}")]
    InputFormat(#[from] csv::Error),
    #[error("statement file contains no rows")]
    EmptyDocument,
    #[error("no header row found in the first 20 rows")]
    HeaderNotFound,
    #[error("statement has day/month-only dates; pass the statement year")]
    YearRequired,
}

/// Everything the importer got out of one statement document.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    pub lines: Vec<ParsedLine>,
    pub metadata: StatementMetadata,
    pub stats: ParseStats,
}

/// Run the full parse pipeline over one statement document.
///
/// Metadata is scanned before the rows are normalized, so a "Periode"
/// marker in the file can supply the working year when the caller
/// passes none. Sources that can produce day/month-only dates abort
/// with [`ParseError::YearRequired`] if no year can be resolved at all.
pub fn parse_statement(
    source: StatementSource,
    statement_year: Option<i32>,
) -> Result<ParsedStatement, ParseError> {
    let needs_year = source.requires_year();
    let (rows, synthetic) = match source {
        StatementSource::Delimited(bytes) => (tokenize::tokenize(&bytes)?, None),
        StatementSource::Spreadsheet(rows) | StatementSource::OcrRows(rows) => {
            if rows.is_empty() {
                return Err(ParseError::EmptyDocument);
            }
            (rows, None)
        }
        StatementSource::OcrExtracted(items) => {
            if items.is_empty() {
                return Err(ParseError::EmptyDocument);
            }
            (source::rows_from_extracted(items), Some(source::extracted_columns()))
        }
    };

    let metadata = extract_metadata(&rows);
    let year = statement_year.or_else(|| metadata.working_year());
    if needs_year && year.is_none() {
        return Err(ParseError::YearRequired);
    }

    let (columns, start) = match synthetic {
        Some(columns) => (columns, 0),
        None => {
            let located = locate_header(&rows)?;
            (located.columns, located.row + 1)
        }
    };

    let (lines, stats) = normalize_rows(&rows, &columns, start, year);
    Ok(ParsedStatement {
        lines,
        metadata,
        stats,
    })
}
