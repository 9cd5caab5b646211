//! Error types for this crate.

use std::fmt::Display;

use blegatt::GattStatus;
use futures_channel::oneshot;

/// A convenience type alias for a `Result` with an `Error` type.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur in this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
}

/// The kind of error that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required identifier or value was absent or empty.
    MissingParameter(&'static str),
    /// The radio is switched off.
    RadioDisabled,
    /// The platform has no usable BLE radio.
    RadioNotSupported,
    /// The user refused a runtime permission required for scanning.
    PermissionDenied,
    /// No peripheral is known under the given identifier.
    PeripheralNotFound,
    /// The operation requires a connected peripheral.
    PeripheralNotConnected,
    /// A connect attempt is already in progress for this peripheral.
    AlreadyConnecting,
    /// The peripheral is already connected.
    AlreadyConnected,
    /// The service UUID is not part of the discovered topology.
    ServiceNotFound,
    /// No characteristic with the required properties was found.
    CharacteristicNotFound,
    /// The characteristic supports neither notify nor indicate.
    CharacteristicNotNotifiable,
    /// The native call failed; carries the raw status code.
    OperationFailed(GattStatus),
    /// A disconnect cancelled the operation while it was in flight.
    PeripheralDisconnected,
    /// The value could not be encoded to bytes.
    InvalidValue,
    /// The operation did not complete within its deadline.
    Timeout,
    /// The result sink was dropped without a settlement.
    Canceled,
}

impl Error {
    /// Returns the kind of error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.kind.fmt(f)
    }
}

impl std::error::Error for Error {}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error { kind }
    }
}

impl From<oneshot::Canceled> for Error {
    fn from(_value: oneshot::Canceled) -> Self {
        ErrorKind::Canceled.into()
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::MissingParameter(name) => write!(f, "missing parameter: {name}"),
            ErrorKind::RadioDisabled => f.write_str("bluetooth is not enabled"),
            ErrorKind::RadioNotSupported => f.write_str("bluetooth is not supported"),
            ErrorKind::PermissionDenied => f.write_str("scan permission denied"),
            ErrorKind::PeripheralNotFound => f.write_str("peripheral not found"),
            ErrorKind::PeripheralNotConnected => f.write_str("peripheral not connected"),
            ErrorKind::AlreadyConnecting => f.write_str("already connecting to peripheral"),
            ErrorKind::AlreadyConnected => f.write_str("already connected to peripheral"),
            ErrorKind::ServiceNotFound => f.write_str("service not found"),
            ErrorKind::CharacteristicNotFound => f.write_str("characteristic not found"),
            ErrorKind::CharacteristicNotNotifiable => {
                f.write_str("characteristic does not support notifications")
            }
            ErrorKind::OperationFailed(status) => write!(f, "operation failed (status {status})"),
            ErrorKind::PeripheralDisconnected => f.write_str("peripheral disconnected"),
            ErrorKind::InvalidValue => f.write_str("invalid value"),
            ErrorKind::Timeout => f.write_str("operation timed out"),
            ErrorKind::Canceled => f.write_str("canceled"),
        }
    }
}
