use thiserror::Error;

#[derive(Error, Debug)]
pub enum CashupError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    #[error("Account '{account}' is not owned by '{user}'")]
    NotAuthorized { account: String, user: String },

    #[error("No identity configured; run `cashup init --user <name>` first")]
    NoIdentity,

    #[error("Could not detect the statement layout; re-run with --map (headers: {headers})")]
    ManualMappingRequired { headers: String },

    #[error("Invalid column mapping: {0}")]
    BadMapping(String),

    #[error("File already imported on {imported_on} (batch {batch_id}); roll it back first to re-import")]
    DuplicateFile { batch_id: i64, imported_on: String },

    #[error("Unknown import batch: {0}")]
    UnknownBatch(i64),

    #[error("Import failed: {0}")]
    ImportFailed(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, CashupError>;
