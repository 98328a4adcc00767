use thiserror::Error;

/// Closed enumeration of everything the paged-file layer can fail with:
/// I/O failures, pin/unfix protocol violations, structural errors,
/// resource exhaustion, and a couple of internal-invariant errors that a
/// pointer-based implementation would otherwise leave as asserts.
#[derive(Debug, Error)]
pub enum PfError {
    #[error("no memory")]
    NoMem,
    #[error("no buffer space: all {0} frames are pinned")]
    NoBuf(usize),
    #[error("page {1} of fd {0} is already fixed in the buffer")]
    PageFixed(i32, i32),
    #[error("page {1} of fd {0} is not fixed")]
    PageUnfixed(i32, i32),
    #[error("incomplete read of page from file")]
    IncompleteRead,
    #[error("incomplete write of page to file")]
    IncompleteWrite,
    #[error("invalid page number {1} for fd {0}")]
    InvalidPage(i32, i32),
    #[error("file already open")]
    FileOpen,
    #[error("file table is full")]
    FtabFull,
    #[error("invalid file descriptor {0}")]
    InvalidFd(i32),
    #[error("end of file")]
    Eof,
    #[error("page {1} of fd {0} is already free")]
    PageFree(i32, i32),
    #[error("internal error: page already resident in buffer")]
    PageInBuf,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type PfResult<T> = Result<T, PfError>;
