use thiserror::Error;

use pf::PfError;

/// Closed enumeration of everything the record-manager layer can fail with.
///
/// `RmError::Pf` widens every paged-file error into the RM layer rather
/// than reinterpreting it — a layer only translates an error when it is
/// truly internal to that layer, and PF errors never are from RM's point
/// of view.
#[derive(Debug, Error)]
pub enum RmError {
    #[error(transparent)]
    Pf(#[from] PfError),
    #[error("rid {0:?} has an invalid slot number")]
    InvalidRid(common::Rid),
    #[error("record at {0:?} has already been deleted")]
    RecordDeleted(common::Rid),
    #[error("end of scan")]
    Eof,
    #[error("page layout codec error: {0}")]
    Codec(String),
}

pub type RmResult<T> = Result<T, RmError>;
