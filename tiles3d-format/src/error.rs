use std::io;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("expected magic {expected:?}, found {found:?}")]
    InvalidMagic { expected: [u8; 4], found: [u8; 4] },
    #[error("unsupported {magic} version {version}")]
    UnsupportedVersion { magic: &'static str, version: u32 },
    #[error("{magic} tile declares {declared} bytes but only {actual} are present")]
    Truncated {
        magic: &'static str,
        declared: usize,
        actual: usize,
    },
    #[error("at most one legacy b3dm header variant may be requested")]
    ConflictingLegacyHeaders,
    #[error("composite inner tile {index} is too short to carry a tile header")]
    InnerTileTooShort { index: usize },
}
