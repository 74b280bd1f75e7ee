use thiserror::Error;

/// Errors that can occur during CSV parsing, image generation, or image
/// parsing.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse CSV: {0}")]
    CsvError(#[from] csv::Error),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("invalid encoding: {0}")]
    InvalidEncoding(String),

    #[error("invalid value: {0}")]
    InvalidValue(String),

    #[error("hex decoding error: {0}")]
    HexError(#[from] hex::FromHexError),

    #[error("base64 decoding error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("invalid name: {0}")]
    InvalidName(String),

    #[error("duplicate name: {0}")]
    DuplicateName(String),

    #[error("region size {0} is too small")]
    RegionTooSmall(usize),

    #[error("invalid region size {0}: must be a multiple of 4 bytes")]
    InvalidRegionSize(usize),

    #[error("image size {0} does not hold two regions of {1} bytes")]
    InvalidImageSize(usize, usize),

    #[error("image holds no valid region marker")]
    MissingRegionMarker,

    #[error("store error: {0}")]
    StoreError(#[from] rom_kv::error::Error),
}
