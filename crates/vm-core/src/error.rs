use thiserror::Error;

/// Error taxonomy for engine operations.
///
/// Every variant is fatal to the operation that raised it; there are no
/// retries anywhere in the engine. The host decides whether to halt or
/// continue after an error is reported.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum VmError {
    /// A memory access touched a byte outside the backing store.
    #[error("memory access at {addr:#06x} outside 0..{len:#06x}")]
    OutOfBounds {
        /// First touched byte address of the failed access.
        addr: u16,
        /// Size of the backing store in bytes.
        len: usize,
    },
    /// A register name did not match any architectural register.
    #[error("no such register '{name}'")]
    InvalidRegister {
        /// The unrecognized name as supplied by the caller.
        name: String,
    },
}
