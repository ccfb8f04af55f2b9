use std::path::Path;

use calamine::Reader;

use crate::error::{CashupError, Result};
use crate::models::{ParsedTransaction, RowWarning};

/// Raw 2-D cell grid as handed over by the spreadsheet reader.
pub type CellGrid = Vec<Vec<String>>;

// ---------------------------------------------------------------------------
// Cell-level helpers
// ---------------------------------------------------------------------------

pub fn parse_amount(raw: &str) -> f64 {
    parse_amount_opt(raw).unwrap_or(0.0)
}

fn parse_amount_opt(raw: &str) -> Option<f64> {
    let s = raw.replace(',', "").replace('"', "").replace('$', "");
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(inner) = s.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return inner.trim().parse::<f64>().ok().map(|v| -v);
    }
    s.parse().ok()
}

/// Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug).
pub fn excel_serial_to_date(serial: f64) -> String {
    let base = chrono::NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    let date = base + chrono::Duration::days(serial as i64);
    date.format("%Y-%m-%d").to_string()
}

/// Normalize a date cell into canonical YYYY-MM-DD, or None if it does not
/// look like a date in any supported layout.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d.%m.%Y"] {
        if let Ok(d) = chrono::NaiveDate::parse_from_str(raw, fmt) {
            return Some(d.format("%Y-%m-%d").to_string());
        }
    }
    // XLSX readers hand date cells over as serial numbers.
    if let Ok(serial) = raw.parse::<f64>() {
        if (20000.0..80000.0).contains(&serial) && serial.fract() == 0.0 {
            return Some(excel_serial_to_date(serial));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMapping {
    pub date: usize,
    pub description: Option<usize>,
    pub withdrawal: Option<usize>,
    pub deposit: Option<usize>,
    /// Single signed-amount column; negative is a withdrawal.
    pub amount: Option<usize>,
    pub balance: Option<usize>,
    pub channel: Option<usize>,
    pub reference: Option<usize>,
}

impl ColumnMapping {
    /// Parse a CLI mapping spec like `date=0,description=1,withdrawal=2,deposit=3`.
    pub fn parse_spec(spec: &str) -> Result<Self> {
        let mut mapping = ColumnMapping::default();
        let mut saw_date = false;
        for part in spec.split(',') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let (name, idx) = part
                .split_once('=')
                .ok_or_else(|| CashupError::BadMapping(format!("expected name=index, got '{part}'")))?;
            let idx: usize = idx
                .trim()
                .parse()
                .map_err(|_| CashupError::BadMapping(format!("bad column index in '{part}'")))?;
            match name.trim() {
                "date" => {
                    mapping.date = idx;
                    saw_date = true;
                }
                "description" => mapping.description = Some(idx),
                "withdrawal" => mapping.withdrawal = Some(idx),
                "deposit" => mapping.deposit = Some(idx),
                "amount" => mapping.amount = Some(idx),
                "balance" => mapping.balance = Some(idx),
                "channel" => mapping.channel = Some(idx),
                "reference" => mapping.reference = Some(idx),
                other => {
                    return Err(CashupError::BadMapping(format!("unknown column '{other}'")));
                }
            }
        }
        if !saw_date {
            return Err(CashupError::BadMapping("a date column is required".to_string()));
        }
        if !mapping.has_amount_source() {
            return Err(CashupError::BadMapping(
                "a withdrawal, deposit or amount column is required".to_string(),
            ));
        }
        Ok(mapping)
    }

    pub fn to_spec(&self) -> String {
        let mut parts = vec![format!("date={}", self.date)];
        let named = [
            ("description", self.description),
            ("withdrawal", self.withdrawal),
            ("deposit", self.deposit),
            ("amount", self.amount),
            ("balance", self.balance),
            ("channel", self.channel),
            ("reference", self.reference),
        ];
        for (name, idx) in named {
            if let Some(i) = idx {
                parts.push(format!("{name}={i}"));
            }
        }
        parts.join(",")
    }

    fn has_amount_source(&self) -> bool {
        self.withdrawal.is_some() || self.deposit.is_some() || self.amount.is_some()
    }
}

// ---------------------------------------------------------------------------
// Layout detection
// ---------------------------------------------------------------------------

/// How many leading rows are scanned for a recognizable header. Statement
/// exports often carry preamble lines (account name, date range) first.
const HEADER_SCAN_ROWS: usize = 10;

fn header_matches(cell: &str, needles: &[&str]) -> bool {
    let lower = cell.trim().to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

/// Try to interpret one row as a statement header. Detection is confident
/// only when a date column, a description column and at least one amount
/// column are all present.
fn detect_header(row: &[String]) -> Option<(String, ColumnMapping)> {
    let mut mapping = ColumnMapping::default();
    let mut saw_date = false;
    let mut saw_description = false;
    let mut debit_credit = false;

    for (i, cell) in row.iter().enumerate() {
        let lower = cell.trim().to_lowercase();
        if !saw_date && header_matches(cell, &["date"]) && !lower.contains("update") {
            mapping.date = i;
            saw_date = true;
        } else if !saw_description
            && header_matches(cell, &["description", "details", "payee", "narrative", "memo"])
        {
            mapping.description = Some(i);
            saw_description = true;
        } else if mapping.withdrawal.is_none()
            && header_matches(cell, &["withdrawal", "debit", "cash out", "paid out", "money out"])
        {
            mapping.withdrawal = Some(i);
            debit_credit = debit_credit || lower.contains("debit");
        } else if mapping.deposit.is_none()
            && header_matches(cell, &["deposit", "credit", "cash in", "paid in", "money in"])
        {
            mapping.deposit = Some(i);
            debit_credit = debit_credit || lower.contains("credit");
        } else if mapping.balance.is_none() && header_matches(cell, &["balance", "running bal"]) {
            mapping.balance = Some(i);
        } else if mapping.amount.is_none() && lower == "amount" {
            mapping.amount = Some(i);
        } else if mapping.channel.is_none() && header_matches(cell, &["channel", "method"]) {
            mapping.channel = Some(i);
        } else if mapping.reference.is_none() && header_matches(cell, &["reference", "ref id", "ref."]) {
            mapping.reference = Some(i);
        }
    }

    if !(saw_date && saw_description && mapping.has_amount_source()) {
        return None;
    }
    let format_type = if mapping.withdrawal.is_some() || mapping.deposit.is_some() {
        if debit_credit {
            "debit_credit"
        } else {
            "standard"
        }
    } else {
        "single_amount"
    };
    Some((format_type.to_string(), mapping))
}

// ---------------------------------------------------------------------------
// Grid reading
// ---------------------------------------------------------------------------

/// Load a statement file into a cell grid. CSV and XLSX only; cell-level
/// extraction is the spreadsheet library's job, not ours.
pub fn read_grid(path: &Path) -> Result<CellGrid> {
    let is_excel = path
        .extension()
        .map(|e| {
            e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xls") || e.eq_ignore_ascii_case("ods")
        })
        .unwrap_or(false);
    if is_excel {
        read_excel_grid(path)
    } else {
        read_csv_grid(path)
    }
}

fn read_csv_grid(path: &Path) -> Result<CellGrid> {
    let file = std::fs::File::open(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut grid = Vec::new();
    for result in rdr.records() {
        let record = result?;
        grid.push(record.iter().map(|c| c.to_string()).collect());
    }
    Ok(grid)
}

fn read_excel_grid(path: &Path) -> Result<CellGrid> {
    use calamine::Data;

    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| CashupError::Spreadsheet(format!("failed to open workbook: {e}")))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| CashupError::Spreadsheet("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| CashupError::Spreadsheet(format!("failed to read sheet '{sheet}': {e}")))?;

    let mut grid = Vec::new();
    for row in range.rows() {
        let cells = row
            .iter()
            .map(|cell| match cell {
                Data::Empty => String::new(),
                Data::String(s) => s.clone(),
                Data::Float(f) => f.to_string(),
                Data::Int(i) => i.to_string(),
                Data::Bool(b) => b.to_string(),
                Data::DateTime(dt) => dt.as_f64().to_string(),
                other => other.to_string(),
            })
            .collect();
        grid.push(cells);
    }
    Ok(grid)
}

// ---------------------------------------------------------------------------
// parse_statement
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct ParsedStatement {
    pub format_type: String,
    pub mapping: ColumnMapping,
    pub rows: Vec<ParsedTransaction>,
    pub warnings: Vec<RowWarning>,
}

/// Turn a cell grid into normalized candidate transactions.
///
/// Without an explicit mapping the first rows are scanned for a known bank
/// header layout; if none is confidently recognized the caller gets
/// `ManualMappingRequired` carrying the raw header row so it can solicit an
/// explicit mapping. Malformed rows never abort the parse: rows with no
/// date and no amounts are dropped silently, anything else questionable
/// becomes a row-indexed warning.
pub fn parse_statement(grid: &CellGrid, mapping: Option<&ColumnMapping>) -> Result<ParsedStatement> {
    let (format_type, mapping, data_start) = match mapping {
        Some(m) => ("manual".to_string(), m.clone(), 0),
        None => {
            let mut detected = None;
            for (i, row) in grid.iter().take(HEADER_SCAN_ROWS).enumerate() {
                if let Some((format_type, m)) = detect_header(row) {
                    detected = Some((format_type, m, i + 1));
                    break;
                }
            }
            detected.ok_or_else(|| CashupError::ManualMappingRequired {
                headers: grid
                    .iter()
                    .find(|r| r.iter().any(|c| !c.trim().is_empty()))
                    .map(|r| r.join(", "))
                    .unwrap_or_default(),
            })?
        }
    };

    let mut rows = Vec::new();
    let mut warnings = Vec::new();

    for (i, raw_row) in grid.iter().enumerate().skip(data_start) {
        let cell = |idx: Option<usize>| -> &str {
            idx.and_then(|i| raw_row.get(i)).map(|c| c.trim()).unwrap_or("")
        };

        let date_raw = cell(Some(mapping.date));
        let date = normalize_date(date_raw);

        let (withdrawal, deposit) = if let Some(amount_idx) = mapping.amount {
            match parse_amount_opt(cell(Some(amount_idx))) {
                Some(a) if a < 0.0 => (-a, 0.0),
                Some(a) => (0.0, a),
                None => (0.0, 0.0),
            }
        } else {
            // Some banks emit signed withdrawals; the column is magnitude-only.
            (
                parse_amount(cell(mapping.withdrawal)).abs(),
                parse_amount(cell(mapping.deposit)).abs(),
            )
        };

        let Some(date) = date else {
            if withdrawal == 0.0 && deposit == 0.0 {
                // No date, no amounts: preamble, blank or total line.
                continue;
            }
            warnings.push(RowWarning {
                row_index: i,
                message: format!("unparseable date '{date_raw}'; row skipped"),
            });
            continue;
        };

        let balance = parse_amount_opt(cell(mapping.balance));
        if mapping.balance.is_some() && balance.is_none() && !cell(mapping.balance).is_empty() {
            warnings.push(RowWarning {
                row_index: i,
                message: format!("unparseable balance '{}'", cell(mapping.balance)),
            });
        }

        let non_empty = |idx: Option<usize>| -> Option<String> {
            let v = cell(idx);
            if v.is_empty() {
                None
            } else {
                Some(v.to_string())
            }
        };

        rows.push(ParsedTransaction {
            date,
            description: cell(mapping.description).to_string(),
            withdrawal,
            deposit,
            balance,
            channel: non_empty(mapping.channel),
            reference: non_empty(mapping.reference),
            raw: raw_row.clone(),
        });
    }

    Ok(ParsedStatement {
        format_type,
        mapping,
        rows,
        warnings,
    })
}
