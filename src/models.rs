use serde::{Deserialize, Serialize};

use crate::error::{CashupError, Result};

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub name: String,
    pub owner: String,
    pub currency: String,
    pub is_active: bool,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct BankTransaction {
    pub id: Option<i64>,
    pub account_id: i64,
    pub date: String,
    pub description: String,
    pub withdrawal: f64,
    pub deposit: f64,
    pub balance: Option<f64>,
    pub channel: Option<String>,
    pub reference: Option<String>,
    pub content_hash: String,
    pub import_batch_id: Option<i64>,
    pub created_by: Option<String>,
}

/// What existing data is deleted before new rows are inserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportMode {
    /// Insert only; a re-upload of an identical file is rejected.
    Append,
    /// Delete transactions inside the file's date span, then insert.
    #[value(name = "replace_range")]
    ReplaceRange,
    /// Delete every transaction for the account, then insert.
    #[value(name = "replace_all")]
    ReplaceAll,
}

impl ImportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Append => "append",
            Self::ReplaceRange => "replace_range",
            Self::ReplaceAll => "replace_all",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "append" => Ok(Self::Append),
            "replace_range" => Ok(Self::ReplaceRange),
            "replace_all" => Ok(Self::ReplaceAll),
            other => Err(CashupError::Other(format!("unknown import mode: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Pending,
    Completed,
    Failed,
    RolledBack,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "rolled_back" => Ok(Self::RolledBack),
            other => Err(CashupError::Other(format!("unknown batch status: {other}"))),
        }
    }
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct ImportBatch {
    pub id: i64,
    pub account_id: i64,
    pub file_name: String,
    pub file_hash: String,
    pub mode: ImportMode,
    pub declared_rows: i64,
    pub inserted_rows: i64,
    pub status: BatchStatus,
    pub metadata: Option<BatchMetadata>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Audit blob persisted on each batch row.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchMetadata {
    pub format_type: String,
    pub column_mapping: String,
    pub date_range: Option<DateRange>,
    pub deleted_before_import: i64,
    pub duplicate_count: i64,
    pub total_rows: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_error: Option<String>,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct OpeningBalance {
    pub account_id: i64,
    pub owner: String,
    pub amount: f64,
    pub effective_date: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct ReportedBalance {
    pub account_id: i64,
    pub owner: String,
    pub amount: f64,
    pub reported_date: String,
}

/// One normalized candidate transaction out of the parser, before hashing
/// and insert. Amount fields are never null; unparseable numerics are 0.
#[derive(Debug, Clone)]
pub struct ParsedTransaction {
    pub date: String,
    pub description: String,
    pub withdrawal: f64,
    pub deposit: f64,
    pub balance: Option<f64>,
    pub channel: Option<String>,
    pub reference: Option<String>,
    /// Original cells, kept for the audit payload.
    pub raw: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RowWarning {
    pub row_index: usize,
    pub message: String,
}
