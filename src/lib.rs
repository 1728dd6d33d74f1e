//! # hostbind - Typed bindings over a string-keyed DAW host API
//!
//! An embedding host hands plugins a single untyped resolver: capability
//! name in, function pointer (or null) out. This crate turns that surface
//! into something safe to build on:
//!
//! - [`host::api::HostApi`] resolves every capability once at handshake
//!   time into a cached table of typed call sites, gates readiness on a
//!   small essential set, and fails closed per call for everything optional
//! - [`host::prop`] wraps the host's multiplexed get-or-set-by-name
//!   property call with per-kind decode and encode
//! - [`Track`], [`MediaItem`], [`Take`], [`TrackFx`] and [`TakeFx`] are
//!   `Copy` value handles with chaining mutators over those calls
//! - [`Project`] adds project metadata and bar/time arithmetic through the
//!   host tempo map
//!
//! ## Quick Start
//!
//! ```ignore
//! use hostbind::{HostApi, Track};
//!
//! // `info` is the handshake record the host passes at plugin load.
//! HostApi::initialize(info)?;
//!
//! let track = Track::create("Bass").expect("host rejected track insert");
//! track.set_volume_db(-6.0).set_pan(-0.2);
//! track.add_clip_at_bar(3, 4);
//! ```

pub mod fx;
pub mod gain;
pub mod host;
pub mod item;
pub mod project;
pub mod take;
pub mod track;

pub use fx::{FxParam, TakeFx, TrackFx};
pub use host::{FxChain, HostApi, HostError, HostResult, HostState};
pub use item::MediaItem;
pub use project::Project;
pub use take::Take;
pub use track::Track;
