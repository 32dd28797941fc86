//! Error types for PS 2000 communications.

use strum_macros::EnumIter;
use thiserror::Error;

pub type Result<T, I> = core::result::Result<T, Error<I>>;

/// Errors reported by the device itself, carried in a response whose
/// object byte is the `0xFF` error marker.
///
/// The protocol offers no recovery path once one of these is reported,
/// so they abort the operation that triggered them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, EnumIter)]
pub enum DeviceError {
    #[error("device reports incorrect checksum")]
    ChecksumIncorrect,
    #[error("device reports incorrect start delimiter")]
    StartDelimiterIncorrect,
    #[error("wrong address for this output")]
    WrongOutputAddress,
    #[error("object not defined")]
    ObjectNotDefined,
    #[error("object length incorrect")]
    ObjectLengthIncorrect,
    #[error("access denied")]
    AccessDenied,
    #[error("device is locked")]
    DeviceLocked,
    #[error("upper limit exceeded")]
    UpperLimitExceeded,
    #[error("lower limit exceeded")]
    LowerLimitExceeded,
    #[error("unknown device error 0x{0:02x}")]
    Unknown(u8),
}

impl DeviceError {
    /// Map a response error code to its variant. `0x00` is an
    /// acknowledge, not an error, and must be filtered out before
    /// reaching this.
    pub fn from_code(code: u8) -> Self {
        match code {
            0x03 => Self::ChecksumIncorrect,
            0x04 => Self::StartDelimiterIncorrect,
            0x05 => Self::WrongOutputAddress,
            0x07 => Self::ObjectNotDefined,
            0x08 => Self::ObjectLengthIncorrect,
            0x09 => Self::AccessDenied,
            0x0F => Self::DeviceLocked,
            0x30 => Self::UpperLimitExceeded,
            0x31 => Self::LowerLimitExceeded,
            other => Self::Unknown(other),
        }
    }

    /// The wire code for this error.
    pub fn code(&self) -> u8 {
        match self {
            Self::ChecksumIncorrect => 0x03,
            Self::StartDelimiterIncorrect => 0x04,
            Self::WrongOutputAddress => 0x05,
            Self::ObjectNotDefined => 0x07,
            Self::ObjectLengthIncorrect => 0x08,
            Self::AccessDenied => 0x09,
            Self::DeviceLocked => 0x0F,
            Self::UpperLimitExceeded => 0x30,
            Self::LowerLimitExceeded => 0x31,
            Self::Unknown(code) => *code,
        }
    }
}

/// Custom error type for PS 2000 communications.
#[derive(Error, Debug)]
pub enum Error<I: embedded_io::Error> {
    /// Transport failure while writing or reading.
    #[error("serial communication error")]
    Serial(I),
    /// Fewer than the minimum 5 bytes were received; there is nothing to
    /// validate a checksum against.
    #[error("short answer ({received} bytes received)")]
    ShortResponse { received: usize },
    /// The response checksum did not match. The link may be
    /// desynchronised; no automatic retry is attempted.
    #[error("response checksum mismatch")]
    ChecksumMismatch,
    /// The device reported a protocol-level error.
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
    /// A set operation was attempted while the session is in local mode.
    #[error("device is not in remote mode")]
    NotRemote,
    /// The nominal voltage or current read from the device is zero or
    /// not finite, which makes all scaled operations undefined.
    #[error("invalid nominal value")]
    InvalidNominal,
    /// A frame or response did not fit the session buffer.
    #[error("buffer capacity exceeded")]
    Buffer,
    /// The response payload had an unexpected size or was not ASCII.
    #[error("malformed response payload")]
    InvalidPayload,
}
