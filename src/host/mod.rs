//! Host binding layer.
//!
//! Everything that touches the embedding host's C surface lives here: the
//! capability registry ([`api`]), the typed property accessor ([`prop`]),
//! the raw handshake and handle types ([`types`]), and a deterministic
//! in-process host ([`mock`]) the tests run against.

pub mod api;
pub mod mock;
pub mod prop;
pub mod types;

pub use api::{CapabilityReport, HostApi, MeasureInfo};
pub use prop::{take_prop, track_prop, PropAccessor, PropDesc, PropKind};
pub use types::{FxChain, HostError, HostPluginInfo, HostResult, HostState};
