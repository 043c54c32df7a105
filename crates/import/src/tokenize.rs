use crate::ParseError;

/// How many leading lines vote on the delimiter.
const PROBE_LINES: usize = 5;

/// Pick `,` or `;` by majority count over the first few raw lines.
/// A tie (including an empty probe) falls back to comma.
pub fn detect_delimiter(text: &str) -> u8 {
    let mut commas = 0usize;
    let mut semis = 0usize;
    for line in text.lines().take(PROBE_LINES) {
        commas += line.matches(',').count();
        semis += line.matches(';').count();
    }
    if semis > commas {
        b';'
    } else {
        b','
    }
}

/// Split raw statement bytes into rows of trimmed cells.
///
/// Quoting follows CSV rules, so delimiters and even newlines inside
/// quoted cells stay part of the cell. Rows are allowed to have
/// different widths; banks pad and truncate freely.
pub fn tokenize(bytes: &[u8]) -> Result<Vec<Vec<String>>, ParseError> {
    let text = String::from_utf8_lossy(bytes);
    let delimiter = detect_delimiter(&text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|cell| cell.trim().to_string()).collect());
    }
    if rows.is_empty() {
        return Err(ParseError::EmptyDocument);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comma_majority() {
        assert_eq!(detect_delimiter("a,b,c\nd,e,f\n"), b',');
    }

    #[test]
    fn semicolon_majority() {
        assert_eq!(detect_delimiter("a;b;c\nd;e,f\n"), b';');
    }

    #[test]
    fn tie_falls_back_to_comma() {
        assert_eq!(detect_delimiter("a;b,c\n"), b',');
        assert_eq!(detect_delimiter("plain text\n"), b',');
    }

    #[test]
    fn only_the_first_five_lines_vote() {
        let text = "a,b\na,b\na,b\na,b\na,b\nx;y;z;w;v;u;t;s\nx;y;z;w;v;u;t;s\n";
        assert_eq!(detect_delimiter(text), b',');
    }

    #[test]
    fn splits_and_trims_cells() {
        let rows = tokenize(b"a ; b ;c\n1;2;3\n").unwrap();
        assert_eq!(rows, vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]);
    }

    #[test]
    fn quoted_cells_keep_delimiters_and_newlines() {
        let rows = tokenize(b"\"TRF, BULK\",100\n\"LINE\nWRAP\",200\n").unwrap();
        assert_eq!(rows[0][0], "TRF, BULK");
        assert_eq!(rows[1][0], "LINE\nWRAP");
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn ragged_rows_are_allowed() {
        let rows = tokenize(b"a;b;c;d\ne;f\n").unwrap();
        assert_eq!(rows[0].len(), 4);
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(tokenize(b""), Err(ParseError::EmptyDocument)));
    }
}
