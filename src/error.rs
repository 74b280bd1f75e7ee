use thiserror::Error;

/// Errors that can occur during store operations. Marked as non-exhaustive to allow for future
/// additions without breaking the API. A caller would likely only need to handle KeyNotFound,
/// ChecksumMismatch and StoreFull as the other errors are static or point at broken hardware.
#[derive(Error, Debug, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    /// The start address has to be aligned to the erase size of the flash
    #[error("invalid region offset")]
    InvalidRegionOffset,

    /// The region size has to be a multiple of the erase size, hold at least two records and
    /// both regions have to fit into the flash
    #[error("invalid region size")]
    InvalidRegionSize,

    /// Status words are programmed one word at a time, so the read and write granularity of
    /// the flash has to divide 4 bytes.
    #[error("unsupported flash geometry")]
    UnsupportedFlash,

    /// The internal error value is returned from the provided `impl NorFlash`
    #[error("internal flash error")]
    FlashError,

    /// The max name length is 22 bytes plus null terminator.
    #[error("name too long")]
    NameTooLong,

    /// Names are C strings on flash and must not contain a null byte.
    #[error("name malformed")]
    NameMalformed,

    /// The name is used by the store to remember the active region.
    #[error("reserved name")]
    ReservedName,

    /// Values are limited to `MAX_VALUE_SIZE` bytes.
    #[error("value too long")]
    ValueTooLong,

    /// No live record with this name exists in the active region.
    #[error("key not found")]
    KeyNotFound,

    /// A record with this name exists but its checksum does not match its content.
    #[error("checksum mismatch")]
    ChecksumMismatch,

    /// The active region has no free slot left. Space is only reclaimed by the compaction
    /// that runs on `init`.
    #[error("store full")]
    StoreFull,

    /// The record read back after writing differs from what was written.
    #[error("write verification failed")]
    WriteVerifyFailed,
}

impl Error {
    /// Returns true for errors caused by the arguments of the call rather than the state of
    /// the flash.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            Error::NameTooLong | Error::NameMalformed | Error::ValueTooLong | Error::ReservedName
        )
    }
}
