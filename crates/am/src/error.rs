use thiserror::Error;

use pf::PfError;

/// Closed enumeration of everything the access-method layer can fail
/// with. `AmError::Pf` widens every paged-file error the B+-tree sees
/// while walking pages rather than reinterpreting it, since none of it is
/// truly internal to AM.
#[derive(Debug, Error)]
pub enum AmError {
    #[error("attribute length {0} is invalid for this type")]
    InvalidAttrLength(i32),
    #[error("key not found")]
    NotFound,
    #[error(transparent)]
    Pf(#[from] PfError),
    #[error("internal error: {0}")]
    Internal(&'static str),
    #[error("invalid scan descriptor")]
    InvalidScanDescriptor,
    #[error("operator not valid for this scan")]
    InvalidOpToScan,
    #[error("scan is over")]
    Eof,
    #[error("scan table is full")]
    ScanTabFull,
    #[error("invalid attribute type")]
    InvalidAttrType,
    #[error("invalid file descriptor")]
    InvalidFd,
    #[error("invalid value")]
    InvalidValue,
    #[error("page header codec error: {0}")]
    Codec(String),
}

pub type AmResult<T> = Result<T, AmError>;
