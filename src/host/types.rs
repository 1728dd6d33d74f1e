//! Core types for the host binding layer
//!
//! Defines the fundamental types shared by the capability registry and the
//! property accessor:
//! - Opaque host resource handles
//! - The resolver handshake handed over at plugin load
//! - Binding lifecycle state and error types

use libc::{c_char, c_int, c_void};
use std::fmt;

/// The host's string-keyed capability resolver.
///
/// Returns an untyped function pointer for a known capability name, or null
/// when the running host version does not provide it.
pub type HostLookup = unsafe extern "C" fn(*const c_char) -> *mut c_void;

/// Version token expected from the host at handshake time. A resolver handed
/// over with a different token is not trusted.
pub const HOST_API_VERSION: c_int = 0x20E;

/// Handshake record the host passes to the plugin entry point.
///
/// Mirrors the host's C layout; only the fields this layer consumes are
/// declared.
#[repr(C)]
pub struct HostPluginInfo {
    /// Host-declared API version; must equal [`HOST_API_VERSION`].
    pub caller_version: c_int,
    /// The capability resolver, or `None` on a malformed handshake.
    pub get_func: Option<HostLookup>,
}

/// Opaque host-owned project handle. Never dereferenced by this layer.
#[repr(C)]
pub struct RawProject {
    _private: [u8; 0],
}

/// Opaque host-owned track handle. Never dereferenced by this layer.
#[repr(C)]
pub struct RawMediaTrack {
    _private: [u8; 0],
}

/// Opaque host-owned media item handle. Never dereferenced by this layer.
#[repr(C)]
pub struct RawMediaItem {
    _private: [u8; 0],
}

/// Opaque host-owned take handle. Never dereferenced by this layer.
#[repr(C)]
pub struct RawMediaTake {
    _private: [u8; 0],
}

/// Lifecycle state of the capability registry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HostState {
    /// No initialization attempt has happened yet.
    #[default]
    Uninitialized,
    /// Resolver accepted and every essential capability resolved.
    Ready,
    /// The last initialization attempt was rejected. Terminal until the host
    /// re-handshakes.
    Failed,
}

/// Which of a track's two effect-chain namespaces an effect lives in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FxChain {
    /// The ordinary post-input effect chain.
    Normal,
    /// The input-stage (record path) effect chain.
    Input,
}

/// Index offset the host uses to address the input-stage chain through the
/// shared track-effect capabilities.
pub const INPUT_FX_OFFSET: c_int = 0x0100_0000;

impl FxChain {
    /// Translate a 0-based chain-local index into the index the host expects.
    pub fn host_index(self, index: c_int) -> c_int {
        match self {
            FxChain::Normal => index,
            FxChain::Input => index + INPUT_FX_OFFSET,
        }
    }
}

/// Default capacity for string property reads; host-side strings are copied
/// out bounded by this many bytes.
pub const STR_BUF_LEN: usize = 256;

/// Host binding error types
#[derive(Debug)]
pub enum HostError {
    /// The handshake carried no resolver.
    NoResolver,
    /// The host's version token did not match ours.
    VersionMismatch { host: c_int, expected: c_int },
    /// An essential capability was absent from the running host.
    MissingEssential(&'static str),
    /// IO error (capability report persistence)
    IoError(std::io::Error),
    /// Serialization error
    SerdeError(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::NoResolver => write!(f, "host handshake carried no capability resolver"),
            HostError::VersionMismatch { host, expected } => {
                write!(
                    f,
                    "host API version {:#x} does not match expected {:#x}",
                    host, expected
                )
            }
            HostError::MissingEssential(name) => {
                write!(f, "essential capability not provided by host: {}", name)
            }
            HostError::IoError(e) => write!(f, "IO error: {}", e),
            HostError::SerdeError(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for HostError {}

impl From<std::io::Error> for HostError {
    fn from(e: std::io::Error) -> Self {
        HostError::IoError(e)
    }
}

/// Result type for host binding operations
pub type HostResult<T> = Result<T, HostError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = HostError::VersionMismatch {
            host: 0x20D,
            expected: 0x20E,
        };
        assert_eq!(
            format!("{}", e),
            "host API version 0x20d does not match expected 0x20e"
        );
        let e = HostError::MissingEssential("GetTrack");
        assert_eq!(
            format!("{}", e),
            "essential capability not provided by host: GetTrack"
        );
    }

    #[test]
    fn test_fx_chain_host_index() {
        assert_eq!(FxChain::Normal.host_index(3), 3);
        assert_eq!(FxChain::Input.host_index(0), INPUT_FX_OFFSET);
        assert_eq!(FxChain::Input.host_index(2), INPUT_FX_OFFSET + 2);
    }

    #[test]
    fn test_state_default() {
        assert_eq!(HostState::default(), HostState::Uninitialized);
    }
}
