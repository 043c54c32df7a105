use crate::ParseError;
use serde::{Deserialize, Serialize};

/// How deep into the document the header may sit. Bank exports put
/// account metadata above the table, never more than a screenful.
pub const HEADER_SCAN_ROWS: usize = 20;

const DATE_KEYWORDS: &[&str] = &["tanggal", "tgl", "date"];
const MONEY_KEYWORDS: &[&str] = &[
    "keterangan",
    "description",
    "mutasi",
    "amount",
    "saldo",
    "balance",
];

/// Column positions discovered from the header row. `None` means the
/// layout simply does not carry that column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub description: Option<usize>,
    /// Second description-like column; its text is appended to the
    /// description, as with BCA's transaction type plus detail pair.
    pub detail: Option<usize>,
    pub reference: Option<usize>,
    pub amount: Option<usize>,
    pub debit: Option<usize>,
    pub credit: Option<usize>,
    pub balance: Option<usize>,
}

impl ColumnMap {
    pub fn has_split_sides(&self) -> bool {
        self.debit.is_some() && self.credit.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderLocation {
    /// Zero-based index of the header row; data starts on the next row.
    pub row: usize,
    pub columns: ColumnMap,
}

/// Find the header row within the first [`HEADER_SCAN_ROWS`] rows and
/// map its columns. A row qualifies when it names a date column and at
/// least one monetary or description column.
pub fn locate_header(rows: &[Vec<String>]) -> Result<HeaderLocation, ParseError> {
    for (idx, row) in rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        if !is_header_row(row) {
            continue;
        }
        return Ok(HeaderLocation {
            row: idx,
            columns: map_columns(row),
        });
    }
    Err(ParseError::HeaderNotFound)
}

fn is_header_row(row: &[String]) -> bool {
    let has_date = row.iter().any(|cell| {
        let lc = cell.to_lowercase();
        DATE_KEYWORDS.iter().any(|k| lc.contains(k))
    });
    let has_money = row.iter().any(|cell| {
        let lc = cell.to_lowercase();
        MONEY_KEYWORDS.iter().any(|k| lc.contains(k))
    });
    has_date && has_money
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Date,
    Description,
    Reference,
    Amount,
    Debit,
    Credit,
    Balance,
}

/// Classify one header cell. The ordering matters: "Mutasi Debet" must
/// read as a debit column, not an amount column, and "Tanggal Mutasi"
/// as a date column.
fn role_of(cell: &str) -> Option<Role> {
    let lc = cell.to_lowercase();
    if lc.is_empty() {
        return None;
    }
    if lc.contains("debit") || lc.contains("debet") {
        return Some(Role::Debit);
    }
    if lc.contains("credit") || lc.contains("kredit") {
        return Some(Role::Credit);
    }
    if lc.contains("saldo") || lc.contains("balance") {
        return Some(Role::Balance);
    }
    if DATE_KEYWORDS.iter().any(|k| lc.contains(k)) {
        return Some(Role::Date);
    }
    if lc.contains("mutasi") || lc.contains("amount") || lc.contains("jumlah") || lc.contains("nominal") {
        return Some(Role::Amount);
    }
    if lc.contains("cabang") || lc.contains("branch") || lc.contains("ref") {
        return Some(Role::Reference);
    }
    if lc.contains("keterangan")
        || lc.contains("description")
        || lc.contains("uraian")
        || lc.contains("remark")
    {
        return Some(Role::Description);
    }
    None
}

fn map_columns(row: &[String]) -> ColumnMap {
    let mut map = ColumnMap::default();
    for (idx, cell) in row.iter().enumerate() {
        match role_of(cell) {
            Some(Role::Date) => {
                if map.date.is_none() {
                    map.date = Some(idx);
                }
            }
            Some(Role::Description) => {
                if map.description.is_none() {
                    map.description = Some(idx);
                } else if map.detail.is_none() {
                    map.detail = Some(idx);
                }
            }
            Some(Role::Reference) => {
                if map.reference.is_none() {
                    map.reference = Some(idx);
                }
            }
            Some(Role::Amount) => {
                if map.amount.is_none() {
                    map.amount = Some(idx);
                }
            }
            Some(Role::Debit) => {
                if map.debit.is_none() {
                    map.debit = Some(idx);
                }
            }
            Some(Role::Credit) => {
                if map.credit.is_none() {
                    map.credit = Some(idx);
                }
            }
            Some(Role::Balance) => {
                if map.balance.is_none() {
                    map.balance = Some(idx);
                }
            }
            None => {}
        }
    }
    // split debit/credit columns are authoritative over a combined one
    if map.has_split_sides() {
        map.amount = None;
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(lines: &[&[&str]]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn bca_style_header() {
        let rows = rows(&[
            &["Nama :", "BUDI SANTOSO"],
            &["Periode :", "01/02/2025 - 28/02/2025"],
            &["Tanggal", "Keterangan", "Cabang", "Mutasi", "Saldo"],
        ]);
        let loc = locate_header(&rows).unwrap();
        assert_eq!(loc.row, 2);
        assert_eq!(loc.columns.date, Some(0));
        assert_eq!(loc.columns.description, Some(1));
        assert_eq!(loc.columns.reference, Some(2));
        assert_eq!(loc.columns.amount, Some(3));
        assert_eq!(loc.columns.balance, Some(4));
        assert!(!loc.columns.has_split_sides());
    }

    #[test]
    fn split_debit_credit_header_drops_the_combined_column() {
        let rows = rows(&[&["Date", "Description", "Ref No.", "Amount", "Debit", "Credit", "Balance"]]);
        let loc = locate_header(&rows).unwrap();
        assert_eq!(loc.columns.debit, Some(4));
        assert_eq!(loc.columns.credit, Some(5));
        assert_eq!(loc.columns.amount, None);
        assert_eq!(loc.columns.reference, Some(2));
    }

    #[test]
    fn second_description_column_becomes_the_detail() {
        let rows = rows(&[&["Tanggal", "Keterangan 1", "Keterangan 2", "Mutasi", "Saldo"]]);
        let loc = locate_header(&rows).unwrap();
        assert_eq!(loc.columns.description, Some(1));
        assert_eq!(loc.columns.detail, Some(2));
    }

    #[test]
    fn compound_headings_resolve_by_priority() {
        assert_eq!(role_of("Mutasi Debet"), Some(Role::Debit));
        assert_eq!(role_of("Mutasi Kredit"), Some(Role::Credit));
        assert_eq!(role_of("Tanggal Mutasi"), Some(Role::Date));
        assert_eq!(role_of("Tgl. Transaksi"), Some(Role::Date));
        assert_eq!(role_of("Saldo Akhir"), Some(Role::Balance));
        assert_eq!(role_of("DB/CR"), None);
    }

    #[test]
    fn first_matching_column_wins() {
        let rows = rows(&[&["Tanggal", "Tanggal Valuta", "Keterangan", "Jumlah"]]);
        let loc = locate_header(&rows).unwrap();
        assert_eq!(loc.columns.date, Some(0));
    }

    #[test]
    fn header_must_pair_a_date_with_a_money_column() {
        // date keyword alone is not enough
        let only_date = rows(&[&["Tanggal", "Jam", "Lokasi"]]);
        assert!(matches!(locate_header(&only_date), Err(ParseError::HeaderNotFound)));
        let only_money = rows(&[&["Keterangan", "Mutasi", "Saldo"]]);
        assert!(matches!(locate_header(&only_money), Err(ParseError::HeaderNotFound)));
    }

    #[test]
    fn header_beyond_the_scan_depth_is_not_found() {
        let mut preamble: Vec<Vec<String>> = (0..HEADER_SCAN_ROWS)
            .map(|i| vec![format!("catatan {i}")])
            .collect();
        preamble.push(vec!["Tanggal".into(), "Keterangan".into(), "Saldo".into()]);
        assert!(matches!(locate_header(&preamble), Err(ParseError::HeaderNotFound)));
    }
}
