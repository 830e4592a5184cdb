//! Error types for the alluris crate.
//!
//! Every device operation either succeeds or fails with exactly one
//! [`ErrorKind`]. Transport failures keep their underlying cause in
//! [`TransportError`].

/// A failure of the underlying USB transfer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transfer did not complete within its timeout.
    #[error("transfer timed out")]
    Timeout,

    /// The endpoint stalled.
    #[error("endpoint stalled")]
    Stall,

    /// The device is gone.
    #[error("device disconnected")]
    Disconnected,

    /// Fewer bytes than the frame length were written.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite {
        /// Bytes accepted by the device.
        written: usize,
        /// Bytes in the frame.
        expected: usize,
    },

    /// Any other USB transfer error.
    #[error("USB transfer error: {0}")]
    Transfer(nusb::transfer::TransferError),

    /// An error from the nusb USB layer (open, claim, endpoint setup).
    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),
}

impl From<nusb::transfer::TransferError> for TransportError {
    fn from(err: nusb::transfer::TransferError) -> Self {
        use nusb::transfer::TransferError;

        match err {
            // Blocking transfers are cancelled when their timeout elapses
            TransferError::Cancelled => Self::Timeout,
            TransferError::Stall => Self::Stall,
            TransferError::Disconnected => Self::Disconnected,
            other => Self::Transfer(other),
        }
    }
}

/// The error type for gauge operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The USB transfer failed or timed out.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The reply does not match the command that was sent. This should never
    /// happen, check EMI and the physical connection.
    #[error("malformed reply to opcode {opcode:#04x}: {reason}")]
    MalformedReply {
        /// Opcode of the command that was issued.
        opcode: u8,
        /// Which structural check failed.
        reason: &'static str,
    },

    /// The device is in a state where it cannot process the request.
    #[error("device busy, rejected opcode {opcode:#04x}")]
    DeviceBusy {
        /// Opcode of the rejected command.
        opcode: u8,
    },

    /// A parameter does not fit its wire field.
    #[error("parameter out of range: {0}")]
    OutOfRange(&'static str),

    /// No matching device was found.
    #[error("device not found")]
    DeviceNotFound,

    /// More candidate devices are connected than the directory can hold.
    #[error("{found} devices connected, directory capacity is {capacity}")]
    TooManyDevices {
        /// Number of candidates on the bus.
        found: usize,
        /// Configured directory capacity.
        capacity: usize,
    },
}

impl From<nusb::Error> for Error {
    fn from(err: nusb::Error) -> Self {
        Self::Transport(TransportError::Usb(err))
    }
}

/// Classification of an [`Error`], for callers that branch or log by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::Transport`].
    Transport,
    /// See [`Error::MalformedReply`].
    MalformedReply,
    /// See [`Error::DeviceBusy`].
    DeviceBusy,
    /// See [`Error::OutOfRange`].
    OutOfRange,
    /// See [`Error::DeviceNotFound`].
    NotFound,
    /// See [`Error::TooManyDevices`].
    TooManyDevices,
}

impl Error {
    /// The classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) => ErrorKind::Transport,
            Self::MalformedReply { .. } => ErrorKind::MalformedReply,
            Self::DeviceBusy { .. } => ErrorKind::DeviceBusy,
            Self::OutOfRange(_) => ErrorKind::OutOfRange,
            Self::DeviceNotFound => ErrorKind::NotFound,
            Self::TooManyDevices { .. } => ErrorKind::TooManyDevices,
        }
    }

    /// Stable name of this error's classification.
    pub fn name(&self) -> &'static str {
        error_name(self.kind())
    }

    /// Whether the underlying transfer timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Timeout))
    }
}

/// Stable, human-readable name of an error classification.
pub fn error_name(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Transport => "TRANSPORT_ERROR",
        ErrorKind::MalformedReply => "MALFORMED_REPLY",
        ErrorKind::DeviceBusy => "DEVICE_BUSY",
        ErrorKind::OutOfRange => "OUT_OF_RANGE",
        ErrorKind::NotFound => "NOT_FOUND",
        ErrorKind::TooManyDevices => "TOO_MANY_DEVICES",
    }
}

/// A specialized `Result` type for gauge operations.
pub type Result<T> = std::result::Result<T, Error>;
