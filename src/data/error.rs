use std::path::PathBuf;

use thiserror::Error;

/// Fatal problems with a source sheet. Row-level problems are not errors: bad
/// rows are skipped and counted instead.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("{path}: required column '{column}' not found")]
    MissingColumn { column: String, path: PathBuf },

    #[error("{path}: unsupported file extension '.{extension}'")]
    UnsupportedFormat { extension: String, path: PathBuf },

    #[error("{path}: the sheet has no header row")]
    EmptySheet { path: PathBuf },

    #[error("{path}: no worksheet found")]
    NoWorksheet { path: PathBuf },
}
