//! Error types for the DMA transfer engine
//!
//! Errors are organized by domain for better diagnostics:
//! - [`ConfigError`]: Channel, device and adapter configuration failures
//! - [`DmaError`]: Ring bookkeeping and transfer validation issues
//! - [`IoError`]: Runtime failures (connection state, aborts, timeouts)
//!
//! The unified [`Error`] enum wraps all domain errors and is returned
//! by most driver methods. [`Error::kind`] collapses every error onto the
//! transport-level taxonomy reported across the driver boundary.

// =============================================================================
// Error Kinds
// =============================================================================

/// Transport-level error taxonomy.
///
/// Every domain error maps onto exactly one kind. The numeric codes are
/// stable and are what a transport boundary reports next to `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ErrorKind {
    /// Misaligned buffer, oversized transfer, out-of-range ring request
    InvalidArgument = 1,
    /// No channel or descriptor slots available
    ResourceExhausted = 2,
    /// Exclusive channel already bound
    Conflict = 3,
    /// Operation attempted before connect or after disconnect
    NotConnected = 4,
    /// Transfer cancelled mid-flight
    Aborted = 5,
    /// Optional capability not implemented by the engine
    Unsupported = 6,
    /// Engine reported a hardware fault
    Hardware = 7,
    /// Bounded wait expired
    Timeout = 8,
}

impl ErrorKind {
    /// Stable numeric code of this kind
    #[must_use]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable description of the kind
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::ResourceExhausted => "resource exhausted",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotConnected => "not connected",
            ErrorKind::Aborted => "aborted",
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::Hardware => "hardware error",
            ErrorKind::Timeout => "timed out",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Configuration errors
///
/// These errors occur while configuring channels, binding them to a
/// device, maintaining the device registry or preparing an adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Descriptor depth is zero, not a power of two, or above the engine limit
    InvalidDescriptorDepth,
    /// Memory window does not exist or does not match the direction
    InvalidMemoryWindow,
    /// Every channel slot of the connection is in use
    NoChannelSlot,
    /// The channel identity is already bound exclusively
    ChannelBound,
    /// No configured channel has this id
    UnknownChannel,
    /// Device registry has no free slot
    RegistryFull,
    /// A device with the same id is already registered
    DuplicateDevice,
    /// No registered device has this id
    UnknownDevice,
    /// Connection is already attached to a device
    AlreadyConnected,
    /// Adapter capabilities are inconsistent
    InvalidCapabilities,
    /// Device lacks the resources its personality requires
    MissingResources,
    /// Configuration space does not match the expected PCI function
    IdentityMismatch,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConfigError::InvalidDescriptorDepth => "invalid descriptor depth",
            ConfigError::InvalidMemoryWindow => "invalid memory window",
            ConfigError::NoChannelSlot => "no channel slot available",
            ConfigError::ChannelBound => "channel already bound",
            ConfigError::UnknownChannel => "unknown channel",
            ConfigError::RegistryFull => "device registry full",
            ConfigError::DuplicateDevice => "duplicate device",
            ConfigError::UnknownDevice => "unknown device",
            ConfigError::AlreadyConnected => "already connected",
            ConfigError::InvalidCapabilities => "invalid adapter capabilities",
            ConfigError::MissingResources => "missing device resources",
            ConfigError::IdentityMismatch => "PCI identity mismatch",
        }
    }

    /// Transport-level kind of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::InvalidDescriptorDepth
            | ConfigError::InvalidMemoryWindow
            | ConfigError::NoChannelSlot
            | ConfigError::RegistryFull
            | ConfigError::MissingResources => ErrorKind::ResourceExhausted,
            ConfigError::ChannelBound
            | ConfigError::DuplicateDevice
            | ConfigError::AlreadyConnected => ErrorKind::Conflict,
            ConfigError::UnknownChannel
            | ConfigError::UnknownDevice
            | ConfigError::InvalidCapabilities
            | ConfigError::IdentityMismatch => ErrorKind::InvalidArgument,
        }
    }
}

// =============================================================================
// DMA Errors
// =============================================================================

/// Ring bookkeeping and transfer validation errors
///
/// These errors relate to cursor movement and to the shape of a
/// submitted transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DmaError {
    /// Requested cursor advance exceeds the available region
    OutOfRange,
    /// No descriptors available for a new transfer or packet
    NoDescriptorsAvailable,
    /// Host buffer does not meet the engine alignment
    Misaligned,
    /// Transfer exceeds the engine single-transfer ceiling
    TransferTooLarge,
    /// Invalid transfer length (zero, or past the end of the buffer)
    InvalidLength,
    /// Fatal bus error reported by the engine
    FatalBusError,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DmaError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            DmaError::OutOfRange => "ring advance out of range",
            DmaError::NoDescriptorsAvailable => "no descriptors available",
            DmaError::Misaligned => "buffer misaligned for engine",
            DmaError::TransferTooLarge => "transfer too large",
            DmaError::InvalidLength => "invalid transfer length",
            DmaError::FatalBusError => "fatal DMA bus error",
        }
    }

    /// Transport-level kind of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            DmaError::OutOfRange
            | DmaError::Misaligned
            | DmaError::TransferTooLarge
            | DmaError::InvalidLength => ErrorKind::InvalidArgument,
            DmaError::NoDescriptorsAvailable => ErrorKind::ResourceExhausted,
            DmaError::FatalBusError => ErrorKind::Hardware,
        }
    }
}

// =============================================================================
// I/O Errors
// =============================================================================

/// Runtime errors
///
/// These errors occur while transfers are submitted, awaited or torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IoError {
    /// Operation attempted before connect or after disconnect
    NotConnected,
    /// Transfer was cancelled before it completed
    Aborted,
    /// Engine does not implement the requested capability
    Unsupported,
    /// Invalid state for operation (e.g., queue not started)
    InvalidState,
    /// Operation timed out
    Timeout,
}

impl core::fmt::Display for IoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IoError {
    /// Returns a human-readable description of the error
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            IoError::NotConnected => "not connected",
            IoError::Aborted => "transfer aborted",
            IoError::Unsupported => "operation unsupported",
            IoError::InvalidState => "invalid state for operation",
            IoError::Timeout => "operation timed out",
        }
    }

    /// Transport-level kind of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            IoError::NotConnected => ErrorKind::NotConnected,
            IoError::Aborted => ErrorKind::Aborted,
            IoError::Unsupported => ErrorKind::Unsupported,
            IoError::InvalidState => ErrorKind::InvalidArgument,
            IoError::Timeout => ErrorKind::Timeout,
        }
    }
}

// =============================================================================
// Unified Error Type
// =============================================================================

/// This enum wraps all domain-specific errors for unified error handling.
///
/// Match on the inner domain error for specific handling:
/// ```ignore
/// match result {
///     Err(Error::Config(ConfigError::ChannelBound)) => { /* ... */ }
///     Err(Error::Dma(DmaError::TransferTooLarge)) => { /* ... */ }
///     Err(Error::Io(IoError::Aborted)) => { /* ... */ }
///     _ => {}
/// }
/// ```
///
/// Or on the transport-level kind:
/// ```ignore
/// if err.kind() == ErrorKind::InvalidArgument { /* ... */ }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration error
    Config(ConfigError),
    /// DMA error
    Dma(DmaError),
    /// I/O error
    Io(IoError),
}

impl Error {
    /// Transport-level kind of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(e) => e.kind(),
            Error::Dma(e) => e.kind(),
            Error::Io(e) => e.kind(),
        }
    }

    /// Stable numeric code reported across the driver boundary
    #[must_use]
    pub const fn code(&self) -> u8 {
        self.kind().code()
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::Config(e) => write!(f, "config: {}", e.as_str()),
            Error::Dma(e) => write!(f, "dma: {}", e.as_str()),
            Error::Io(e) => write!(f, "io: {}", e.as_str()),
        }
    }
}

// From impls for automatic conversion
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<DmaError> for Error {
    fn from(e: DmaError) -> Self {
        Error::Dma(e)
    }
}

impl From<IoError> for Error {
    fn from(e: IoError) -> Self {
        Error::Io(e)
    }
}

/// Result type alias for DMA engine operations
pub type Result<T> = core::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Result type alias for ring and descriptor operations
pub type DmaResult<T> = core::result::Result<T, DmaError>;

/// Result type alias for I/O operations
pub type IoResult<T> = core::result::Result<T, IoError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    extern crate std;
    use std::format;

    use super::*;

    // =========================================================================
    // ErrorKind Tests
    // =========================================================================

    #[test]
    fn error_kind_codes_are_stable() {
        assert_eq!(ErrorKind::InvalidArgument.code(), 1);
        assert_eq!(ErrorKind::ResourceExhausted.code(), 2);
        assert_eq!(ErrorKind::Conflict.code(), 3);
        assert_eq!(ErrorKind::NotConnected.code(), 4);
        assert_eq!(ErrorKind::Aborted.code(), 5);
        assert_eq!(ErrorKind::Unsupported.code(), 6);
        assert_eq!(ErrorKind::Hardware.code(), 7);
        assert_eq!(ErrorKind::Timeout.code(), 8);
    }

    #[test]
    fn error_kind_display() {
        assert_eq!(format!("{}", ErrorKind::Conflict), "conflict");
    }

    // =========================================================================
    // ConfigError Tests
    // =========================================================================

    #[test]
    fn config_error_as_str_non_empty() {
        let variants = [
            ConfigError::InvalidDescriptorDepth,
            ConfigError::InvalidMemoryWindow,
            ConfigError::NoChannelSlot,
            ConfigError::ChannelBound,
            ConfigError::UnknownChannel,
            ConfigError::RegistryFull,
            ConfigError::DuplicateDevice,
            ConfigError::UnknownDevice,
            ConfigError::AlreadyConnected,
            ConfigError::InvalidCapabilities,
            ConfigError::MissingResources,
            ConfigError::IdentityMismatch,
        ];

        for variant in variants {
            let s = variant.as_str();
            assert!(!s.is_empty(), "ConfigError::{:?} has empty string", variant);
        }
    }

    #[test]
    fn config_error_kinds() {
        assert_eq!(
            ConfigError::InvalidDescriptorDepth.kind(),
            ErrorKind::ResourceExhausted
        );
        assert_eq!(
            ConfigError::InvalidMemoryWindow.kind(),
            ErrorKind::ResourceExhausted
        );
        assert_eq!(ConfigError::ChannelBound.kind(), ErrorKind::Conflict);
        assert_eq!(ConfigError::UnknownChannel.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn config_error_display() {
        let err = ConfigError::ChannelBound;
        let display = format!("{}", err);
        assert_eq!(display, "channel already bound");
    }

    // =========================================================================
    // DmaError Tests
    // =========================================================================

    #[test]
    fn dma_error_as_str_non_empty() {
        let variants = [
            DmaError::OutOfRange,
            DmaError::NoDescriptorsAvailable,
            DmaError::Misaligned,
            DmaError::TransferTooLarge,
            DmaError::InvalidLength,
            DmaError::FatalBusError,
        ];

        for variant in variants {
            let s = variant.as_str();
            assert!(!s.is_empty(), "DmaError::{:?} has empty string", variant);
        }
    }

    #[test]
    fn dma_error_kinds() {
        assert_eq!(DmaError::OutOfRange.kind(), ErrorKind::InvalidArgument);
        assert_eq!(DmaError::Misaligned.kind(), ErrorKind::InvalidArgument);
        assert_eq!(DmaError::TransferTooLarge.kind(), ErrorKind::InvalidArgument);
        assert_eq!(
            DmaError::NoDescriptorsAvailable.kind(),
            ErrorKind::ResourceExhausted
        );
        assert_eq!(DmaError::FatalBusError.kind(), ErrorKind::Hardware);
    }

    #[test]
    fn dma_error_display() {
        let err = DmaError::NoDescriptorsAvailable;
        let display = format!("{}", err);
        assert_eq!(display, "no descriptors available");
    }

    // =========================================================================
    // IoError Tests
    // =========================================================================

    #[test]
    fn io_error_kinds() {
        assert_eq!(IoError::NotConnected.kind(), ErrorKind::NotConnected);
        assert_eq!(IoError::Aborted.kind(), ErrorKind::Aborted);
        assert_eq!(IoError::Unsupported.kind(), ErrorKind::Unsupported);
        assert_eq!(IoError::Timeout.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn io_error_display() {
        let err = IoError::Timeout;
        let display = format!("{}", err);
        assert_eq!(display, "operation timed out");
    }

    // =========================================================================
    // Unified Error Tests
    // =========================================================================

    #[test]
    fn error_from_domain_errors() {
        let err: Error = ConfigError::ChannelBound.into();
        assert_eq!(err, Error::Config(ConfigError::ChannelBound));

        let err: Error = DmaError::OutOfRange.into();
        assert_eq!(err, Error::Dma(DmaError::OutOfRange));

        let err: Error = IoError::Aborted.into();
        assert_eq!(err, Error::Io(IoError::Aborted));
    }

    #[test]
    fn error_kind_and_code_follow_inner_error() {
        let err = Error::Dma(DmaError::TransferTooLarge);
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.code(), 1);

        let err = Error::Io(IoError::Aborted);
        assert_eq!(err.kind(), ErrorKind::Aborted);
        assert_eq!(err.code(), 5);
    }

    #[test]
    fn error_display_prefixes_domain() {
        let display = format!("{}", Error::Config(ConfigError::NoChannelSlot));
        assert!(display.starts_with("config"));

        let display = format!("{}", Error::Dma(DmaError::FatalBusError));
        assert!(display.contains("bus error"));

        let display = format!("{}", Error::Io(IoError::NotConnected));
        assert!(display.starts_with("io"));
    }
}
