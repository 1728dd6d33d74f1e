//! Capability registry
//!
//! Converts the host's untyped, string-keyed, possibly-partial resolver into
//! a cached table of strongly typed call sites. Every capability this layer
//! will ever use is declared here at compile time with its fixed signature;
//! the resolver is consulted exactly once per capability, at initialization.
//! Absences are recorded, not fatal: an older host simply yields per-call
//! unavailability, except for the small essential set without which the
//! binding reports `Failed`.
//!
//! No capability is ever invoked while the registry is not `Ready`; every
//! wrapper fails closed with its documented default (`false`/`0`/`0.0`/
//! null/`None`) instead.

use lazy_static::lazy_static;
use libc::{c_char, c_int, c_void};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::ptr;
use std::sync::RwLock;

use super::prop::{InfoMux, PropAccessor};
use super::types::*;

/// Capabilities whose absence makes the whole binding unusable.
const ESSENTIAL: &[&str] = &["InsertTrackInProject", "GetTrack", "GetSetMediaTrackInfo"];

/// Tempo and meter of one measure, as reported by the host tempo map.
#[derive(Clone, Copy, Debug)]
pub struct MeasureInfo {
    /// Beat (quarter-note) position where the measure starts.
    pub qn_start: f64,
    /// Beat position where the measure ends.
    pub qn_end: f64,
    pub timesig_num: c_int,
    pub timesig_denom: c_int,
    pub tempo: f64,
}

/// Resolve one capability name to its typed signature, or `None` when the
/// running host does not provide it.
macro_rules! resolve {
    ($lookup:expr, $name:literal) => {{
        let raw = unsafe { ($lookup)(concat!($name, "\0").as_ptr() as *const c_char) };
        if raw.is_null() {
            None
        } else {
            Some(unsafe { std::mem::transmute(raw) })
        }
    }};
}

/// The cached, typed view of the host API.
///
/// All slots are function pointers, so the struct is `Copy`; readers take a
/// snapshot of the process-wide instance with [`HostApi::get`] and call
/// through it without holding any lock.
#[derive(Clone, Copy, Default)]
pub struct HostApi {
    state: HostState,

    // Tracks
    insert_track: Option<unsafe extern "C" fn(*mut RawProject, c_int, c_int)>,
    get_track: Option<unsafe extern "C" fn(*mut RawProject, c_int) -> *mut RawMediaTrack>,
    get_num_tracks: Option<unsafe extern "C" fn(*mut RawProject) -> c_int>,
    get_set_track_info: Option<InfoMux>,
    get_selected_track:
        Option<unsafe extern "C" fn(*mut RawProject, c_int, bool) -> *mut RawMediaTrack>,
    count_selected_tracks: Option<unsafe extern "C" fn(*mut RawProject, bool) -> c_int>,

    // Items
    add_item_to_track: Option<unsafe extern "C" fn(*mut RawMediaTrack) -> *mut RawMediaItem>,
    get_track_item: Option<unsafe extern "C" fn(*mut RawMediaTrack, c_int) -> *mut RawMediaItem>,
    count_track_items: Option<unsafe extern "C" fn(*mut RawMediaTrack) -> c_int>,
    get_selected_item: Option<unsafe extern "C" fn(*mut RawProject, c_int) -> *mut RawMediaItem>,
    count_selected_items: Option<unsafe extern "C" fn(*mut RawProject) -> c_int>,
    set_item_position: Option<unsafe extern "C" fn(*mut RawMediaItem, f64, bool) -> bool>,
    set_item_length: Option<unsafe extern "C" fn(*mut RawMediaItem, f64, bool) -> bool>,
    get_item_position: Option<unsafe extern "C" fn(*mut RawMediaItem) -> f64>,
    get_item_length: Option<unsafe extern "C" fn(*mut RawMediaItem) -> f64>,

    // Takes
    add_take_to_item: Option<unsafe extern "C" fn(*mut RawMediaItem) -> *mut RawMediaTake>,
    get_active_take: Option<unsafe extern "C" fn(*mut RawMediaItem) -> *mut RawMediaTake>,
    count_takes: Option<unsafe extern "C" fn(*mut RawMediaItem) -> c_int>,
    get_set_take_info: Option<InfoMux>,

    // Track effects (both chain namespaces share these, addressed by index)
    track_fx_add_by_name:
        Option<unsafe extern "C" fn(*mut RawMediaTrack, *const c_char, bool, c_int) -> c_int>,
    track_fx_get_name:
        Option<unsafe extern "C" fn(*mut RawMediaTrack, c_int, *mut c_char, c_int) -> bool>,
    track_fx_count: Option<unsafe extern "C" fn(*mut RawMediaTrack) -> c_int>,
    track_fx_rec_count: Option<unsafe extern "C" fn(*mut RawMediaTrack) -> c_int>,
    track_fx_num_params: Option<unsafe extern "C" fn(*mut RawMediaTrack, c_int) -> c_int>,
    track_fx_param_name:
        Option<unsafe extern "C" fn(*mut RawMediaTrack, c_int, c_int, *mut c_char, c_int) -> bool>,
    track_fx_get_param:
        Option<unsafe extern "C" fn(*mut RawMediaTrack, c_int, c_int, *mut f64, *mut f64) -> f64>,
    track_fx_set_param:
        Option<unsafe extern "C" fn(*mut RawMediaTrack, c_int, c_int, f64) -> bool>,
    track_fx_get_param_norm:
        Option<unsafe extern "C" fn(*mut RawMediaTrack, c_int, c_int) -> f64>,
    track_fx_set_param_norm:
        Option<unsafe extern "C" fn(*mut RawMediaTrack, c_int, c_int, f64) -> bool>,
    track_fx_format_param: Option<
        unsafe extern "C" fn(*mut RawMediaTrack, c_int, c_int, f64, *mut c_char, c_int) -> bool,
    >,
    track_fx_get_enabled: Option<unsafe extern "C" fn(*mut RawMediaTrack, c_int) -> bool>,
    track_fx_set_enabled: Option<unsafe extern "C" fn(*mut RawMediaTrack, c_int, bool) -> bool>,
    track_fx_delete: Option<unsafe extern "C" fn(*mut RawMediaTrack, c_int) -> bool>,

    // Take effects
    take_fx_add_by_name:
        Option<unsafe extern "C" fn(*mut RawMediaTake, *const c_char, c_int) -> c_int>,
    take_fx_get_name:
        Option<unsafe extern "C" fn(*mut RawMediaTake, c_int, *mut c_char, c_int) -> bool>,
    take_fx_count: Option<unsafe extern "C" fn(*mut RawMediaTake) -> c_int>,
    take_fx_num_params: Option<unsafe extern "C" fn(*mut RawMediaTake, c_int) -> c_int>,
    take_fx_param_name:
        Option<unsafe extern "C" fn(*mut RawMediaTake, c_int, c_int, *mut c_char, c_int) -> bool>,
    take_fx_get_param:
        Option<unsafe extern "C" fn(*mut RawMediaTake, c_int, c_int, *mut f64, *mut f64) -> f64>,
    take_fx_set_param: Option<unsafe extern "C" fn(*mut RawMediaTake, c_int, c_int, f64) -> bool>,
    take_fx_get_param_norm: Option<unsafe extern "C" fn(*mut RawMediaTake, c_int, c_int) -> f64>,
    take_fx_set_param_norm:
        Option<unsafe extern "C" fn(*mut RawMediaTake, c_int, c_int, f64) -> bool>,
    take_fx_format_param: Option<
        unsafe extern "C" fn(*mut RawMediaTake, c_int, c_int, f64, *mut c_char, c_int) -> bool,
    >,
    take_fx_get_enabled: Option<unsafe extern "C" fn(*mut RawMediaTake, c_int) -> bool>,
    take_fx_set_enabled: Option<unsafe extern "C" fn(*mut RawMediaTake, c_int, bool) -> bool>,
    take_fx_delete: Option<unsafe extern "C" fn(*mut RawMediaTake, c_int) -> bool>,

    // Tempo map
    time_map_measure_info: Option<
        unsafe extern "C" fn(
            *mut RawProject,
            c_int,
            *mut f64,
            *mut f64,
            *mut c_int,
            *mut c_int,
            *mut f64,
        ) -> f64,
    >,
    qn_to_time: Option<unsafe extern "C" fn(*mut RawProject, f64) -> f64>,
    time_to_qn: Option<unsafe extern "C" fn(*mut RawProject, f64) -> f64>,

    // Project
    update_arrange: Option<unsafe extern "C" fn()>,
    get_project_name: Option<unsafe extern "C" fn(*mut RawProject, *mut c_char, c_int)>,
    get_project_length: Option<unsafe extern "C" fn(*mut RawProject) -> f64>,
}

lazy_static! {
    static ref HOST: RwLock<HostApi> = RwLock::new(HostApi::default());
}

fn read_global() -> HostApi {
    *HOST.read().unwrap_or_else(|e| e.into_inner())
}

/// Decode a NUL-terminated out-buffer filled by the host.
fn decode_buf(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl HostApi {
    /// Perform the handshake and resolve every declared capability.
    ///
    /// Fully re-entrant: any prior cache is discarded before re-resolving,
    /// so a host re-handshake replaces the binding wholesale. Returns `Err`
    /// (and records `Failed`) on a version mismatch, a missing resolver, or
    /// a missing essential capability; non-essential absences are tolerated
    /// and surface later as per-call unavailability.
    pub fn initialize(rec: &HostPluginInfo) -> HostResult<()> {
        let mut slot = HOST.write().unwrap_or_else(|e| e.into_inner());
        *slot = HostApi::default();

        if rec.caller_version != HOST_API_VERSION {
            slot.state = HostState::Failed;
            tracing::warn!(
                host_version = rec.caller_version,
                expected = HOST_API_VERSION,
                "rejecting host resolver: version token mismatch"
            );
            return Err(HostError::VersionMismatch {
                host: rec.caller_version,
                expected: HOST_API_VERSION,
            });
        }
        let lookup = match rec.get_func {
            Some(f) => f,
            None => {
                slot.state = HostState::Failed;
                return Err(HostError::NoResolver);
            }
        };

        let mut api = HostApi::resolve_all(lookup);
        if let Some(name) = api.first_missing_essential() {
            api.state = HostState::Failed;
            *slot = api;
            tracing::warn!(capability = name, "essential capability missing from host");
            return Err(HostError::MissingEssential(name));
        }
        api.state = HostState::Ready;
        let report = api.capability_report();
        *slot = api;
        tracing::info!(
            resolved = report.resolved.len(),
            missing = report.missing.len(),
            "host binding ready"
        );
        Ok(())
    }

    fn resolve_all(lookup: HostLookup) -> HostApi {
        HostApi {
            state: HostState::Uninitialized,

            insert_track: resolve!(lookup, "InsertTrackInProject"),
            get_track: resolve!(lookup, "GetTrack"),
            get_num_tracks: resolve!(lookup, "GetNumTracks"),
            get_set_track_info: resolve!(lookup, "GetSetMediaTrackInfo"),
            get_selected_track: resolve!(lookup, "GetSelectedTrack2"),
            count_selected_tracks: resolve!(lookup, "CountSelectedTracks2"),

            add_item_to_track: resolve!(lookup, "AddMediaItemToTrack"),
            get_track_item: resolve!(lookup, "GetTrackMediaItem"),
            count_track_items: resolve!(lookup, "CountTrackMediaItems"),
            get_selected_item: resolve!(lookup, "GetSelectedMediaItem"),
            count_selected_items: resolve!(lookup, "CountSelectedMediaItems"),
            set_item_position: resolve!(lookup, "SetMediaItemPosition"),
            set_item_length: resolve!(lookup, "SetMediaItemLength"),
            get_item_position: resolve!(lookup, "GetMediaItemPosition"),
            get_item_length: resolve!(lookup, "GetMediaItemLength"),

            add_take_to_item: resolve!(lookup, "AddTakeToMediaItem"),
            get_active_take: resolve!(lookup, "GetActiveTake"),
            count_takes: resolve!(lookup, "CountTakes"),
            get_set_take_info: resolve!(lookup, "GetSetMediaItemTakeInfo"),

            track_fx_add_by_name: resolve!(lookup, "TrackFX_AddByName"),
            track_fx_get_name: resolve!(lookup, "TrackFX_GetFXName"),
            track_fx_count: resolve!(lookup, "TrackFX_GetCount"),
            track_fx_rec_count: resolve!(lookup, "TrackFX_GetRecCount"),
            track_fx_num_params: resolve!(lookup, "TrackFX_GetNumParams"),
            track_fx_param_name: resolve!(lookup, "TrackFX_GetParamName"),
            track_fx_get_param: resolve!(lookup, "TrackFX_GetParam"),
            track_fx_set_param: resolve!(lookup, "TrackFX_SetParam"),
            track_fx_get_param_norm: resolve!(lookup, "TrackFX_GetParamNormalized"),
            track_fx_set_param_norm: resolve!(lookup, "TrackFX_SetParamNormalized"),
            track_fx_format_param: resolve!(lookup, "TrackFX_FormatParamValue"),
            track_fx_get_enabled: resolve!(lookup, "TrackFX_GetEnabled"),
            track_fx_set_enabled: resolve!(lookup, "TrackFX_SetEnabled"),
            track_fx_delete: resolve!(lookup, "TrackFX_Delete"),

            take_fx_add_by_name: resolve!(lookup, "TakeFX_AddByName"),
            take_fx_get_name: resolve!(lookup, "TakeFX_GetFXName"),
            take_fx_count: resolve!(lookup, "TakeFX_GetCount"),
            take_fx_num_params: resolve!(lookup, "TakeFX_GetNumParams"),
            take_fx_param_name: resolve!(lookup, "TakeFX_GetParamName"),
            take_fx_get_param: resolve!(lookup, "TakeFX_GetParam"),
            take_fx_set_param: resolve!(lookup, "TakeFX_SetParam"),
            take_fx_get_param_norm: resolve!(lookup, "TakeFX_GetParamNormalized"),
            take_fx_set_param_norm: resolve!(lookup, "TakeFX_SetParamNormalized"),
            take_fx_format_param: resolve!(lookup, "TakeFX_FormatParamValue"),
            take_fx_get_enabled: resolve!(lookup, "TakeFX_GetEnabled"),
            take_fx_set_enabled: resolve!(lookup, "TakeFX_SetEnabled"),
            take_fx_delete: resolve!(lookup, "TakeFX_Delete"),

            time_map_measure_info: resolve!(lookup, "TimeMap_GetMeasureInfo"),
            qn_to_time: resolve!(lookup, "TimeMap2_QNToTime"),
            time_to_qn: resolve!(lookup, "TimeMap2_timeToQN"),

            update_arrange: resolve!(lookup, "UpdateArrange"),
            get_project_name: resolve!(lookup, "GetProjectName"),
            get_project_length: resolve!(lookup, "GetProjectLength"),
        }
    }

    /// Snapshot of the process-wide binding.
    pub fn get() -> HostApi {
        read_global()
    }

    /// True iff the last initialization reached `Ready`.
    pub fn is_available() -> bool {
        read_global().available()
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    pub fn available(&self) -> bool {
        self.state == HostState::Ready
    }

    fn first_missing_essential(&self) -> Option<&'static str> {
        let present = self.slot_table();
        for &name in ESSENTIAL {
            if let Some(&(_, resolved)) = present.iter().find(|(n, _)| *n == name) {
                if !resolved {
                    return Some(name);
                }
            }
        }
        None
    }

    /// Every declared capability name paired with its resolution status.
    fn slot_table(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("InsertTrackInProject", self.insert_track.is_some()),
            ("GetTrack", self.get_track.is_some()),
            ("GetNumTracks", self.get_num_tracks.is_some()),
            ("GetSetMediaTrackInfo", self.get_set_track_info.is_some()),
            ("GetSelectedTrack2", self.get_selected_track.is_some()),
            ("CountSelectedTracks2", self.count_selected_tracks.is_some()),
            ("AddMediaItemToTrack", self.add_item_to_track.is_some()),
            ("GetTrackMediaItem", self.get_track_item.is_some()),
            ("CountTrackMediaItems", self.count_track_items.is_some()),
            ("GetSelectedMediaItem", self.get_selected_item.is_some()),
            ("CountSelectedMediaItems", self.count_selected_items.is_some()),
            ("SetMediaItemPosition", self.set_item_position.is_some()),
            ("SetMediaItemLength", self.set_item_length.is_some()),
            ("GetMediaItemPosition", self.get_item_position.is_some()),
            ("GetMediaItemLength", self.get_item_length.is_some()),
            ("AddTakeToMediaItem", self.add_take_to_item.is_some()),
            ("GetActiveTake", self.get_active_take.is_some()),
            ("CountTakes", self.count_takes.is_some()),
            ("GetSetMediaItemTakeInfo", self.get_set_take_info.is_some()),
            ("TrackFX_AddByName", self.track_fx_add_by_name.is_some()),
            ("TrackFX_GetFXName", self.track_fx_get_name.is_some()),
            ("TrackFX_GetCount", self.track_fx_count.is_some()),
            ("TrackFX_GetRecCount", self.track_fx_rec_count.is_some()),
            ("TrackFX_GetNumParams", self.track_fx_num_params.is_some()),
            ("TrackFX_GetParamName", self.track_fx_param_name.is_some()),
            ("TrackFX_GetParam", self.track_fx_get_param.is_some()),
            ("TrackFX_SetParam", self.track_fx_set_param.is_some()),
            (
                "TrackFX_GetParamNormalized",
                self.track_fx_get_param_norm.is_some(),
            ),
            (
                "TrackFX_SetParamNormalized",
                self.track_fx_set_param_norm.is_some(),
            ),
            (
                "TrackFX_FormatParamValue",
                self.track_fx_format_param.is_some(),
            ),
            ("TrackFX_GetEnabled", self.track_fx_get_enabled.is_some()),
            ("TrackFX_SetEnabled", self.track_fx_set_enabled.is_some()),
            ("TrackFX_Delete", self.track_fx_delete.is_some()),
            ("TakeFX_AddByName", self.take_fx_add_by_name.is_some()),
            ("TakeFX_GetFXName", self.take_fx_get_name.is_some()),
            ("TakeFX_GetCount", self.take_fx_count.is_some()),
            ("TakeFX_GetNumParams", self.take_fx_num_params.is_some()),
            ("TakeFX_GetParamName", self.take_fx_param_name.is_some()),
            ("TakeFX_GetParam", self.take_fx_get_param.is_some()),
            ("TakeFX_SetParam", self.take_fx_set_param.is_some()),
            (
                "TakeFX_GetParamNormalized",
                self.take_fx_get_param_norm.is_some(),
            ),
            (
                "TakeFX_SetParamNormalized",
                self.take_fx_set_param_norm.is_some(),
            ),
            (
                "TakeFX_FormatParamValue",
                self.take_fx_format_param.is_some(),
            ),
            ("TakeFX_GetEnabled", self.take_fx_get_enabled.is_some()),
            ("TakeFX_SetEnabled", self.take_fx_set_enabled.is_some()),
            ("TakeFX_Delete", self.take_fx_delete.is_some()),
            (
                "TimeMap_GetMeasureInfo",
                self.time_map_measure_info.is_some(),
            ),
            ("TimeMap2_QNToTime", self.qn_to_time.is_some()),
            ("TimeMap2_timeToQN", self.time_to_qn.is_some()),
            ("UpdateArrange", self.update_arrange.is_some()),
            ("GetProjectName", self.get_project_name.is_some()),
            ("GetProjectLength", self.get_project_length.is_some()),
        ]
    }

    /// Whether one named capability resolved, regardless of overall state.
    pub fn has_capability(&self, name: &str) -> bool {
        self.slot_table()
            .iter()
            .any(|(n, resolved)| *n == name && *resolved)
    }

    /// The audit point for "what does this host version support".
    pub fn capability_report(&self) -> CapabilityReport {
        let mut report = CapabilityReport::default();
        for (name, resolved) in self.slot_table() {
            if resolved {
                report.resolved.push(name.to_string());
            } else {
                report.missing.push(name.to_string());
            }
        }
        report
    }

    // ---- Track capabilities -------------------------------------------------

    /// Insert a track at `index` and return its handle, or null. A negative
    /// index appends, as the host's insert call defines it; the appended slot
    /// is resolved up front so the new handle can be fetched back.
    pub fn insert_track(&self, index: c_int, flags: c_int) -> *mut RawMediaTrack {
        if !self.available() {
            return ptr::null_mut();
        }
        let (Some(insert), Some(get)) = (self.insert_track, self.get_track) else {
            return ptr::null_mut();
        };
        let index = if index < 0 { self.num_tracks() } else { index };
        unsafe {
            insert(ptr::null_mut(), index, flags);
            get(ptr::null_mut(), index)
        }
    }

    pub fn get_track(&self, index: c_int) -> *mut RawMediaTrack {
        if !self.available() {
            return ptr::null_mut();
        }
        match self.get_track {
            Some(f) => unsafe { f(ptr::null_mut(), index) },
            None => ptr::null_mut(),
        }
    }

    pub fn num_tracks(&self) -> c_int {
        if !self.available() {
            return 0;
        }
        match self.get_num_tracks {
            Some(f) => unsafe { f(ptr::null_mut()) },
            None => 0,
        }
    }

    pub fn selected_track(&self, sel_index: c_int, want_master: bool) -> *mut RawMediaTrack {
        if !self.available() {
            return ptr::null_mut();
        }
        match self.get_selected_track {
            Some(f) => unsafe { f(ptr::null_mut(), sel_index, want_master) },
            None => ptr::null_mut(),
        }
    }

    pub fn num_selected_tracks(&self, want_master: bool) -> c_int {
        if !self.available() {
            return 0;
        }
        match self.count_selected_tracks {
            Some(f) => unsafe { f(ptr::null_mut(), want_master) },
            None => 0,
        }
    }

    /// Property accessor for a track handle, availability already folded in.
    pub fn track_props(&self, track: *mut RawMediaTrack) -> PropAccessor {
        let mux = if self.available() {
            self.get_set_track_info
        } else {
            None
        };
        PropAccessor::new(mux, track as *mut c_void)
    }

    // ---- Item capabilities --------------------------------------------------

    pub fn add_item(&self, track: *mut RawMediaTrack) -> *mut RawMediaItem {
        if !self.available() || track.is_null() {
            return ptr::null_mut();
        }
        match self.add_item_to_track {
            Some(f) => unsafe { f(track) },
            None => ptr::null_mut(),
        }
    }

    pub fn track_item(&self, track: *mut RawMediaTrack, index: c_int) -> *mut RawMediaItem {
        if !self.available() || track.is_null() {
            return ptr::null_mut();
        }
        match self.get_track_item {
            Some(f) => unsafe { f(track, index) },
            None => ptr::null_mut(),
        }
    }

    pub fn num_track_items(&self, track: *mut RawMediaTrack) -> c_int {
        if !self.available() || track.is_null() {
            return 0;
        }
        match self.count_track_items {
            Some(f) => unsafe { f(track) },
            None => 0,
        }
    }

    pub fn selected_item(&self, sel_index: c_int) -> *mut RawMediaItem {
        if !self.available() {
            return ptr::null_mut();
        }
        match self.get_selected_item {
            Some(f) => unsafe { f(ptr::null_mut(), sel_index) },
            None => ptr::null_mut(),
        }
    }

    pub fn num_selected_items(&self) -> c_int {
        if !self.available() {
            return 0;
        }
        match self.count_selected_items {
            Some(f) => unsafe { f(ptr::null_mut()) },
            None => 0,
        }
    }

    pub fn set_item_position(&self, item: *mut RawMediaItem, position: f64) -> bool {
        if !self.available() || item.is_null() {
            return false;
        }
        match self.set_item_position {
            Some(f) => unsafe { f(item, position, false) },
            None => false,
        }
    }

    pub fn set_item_length(&self, item: *mut RawMediaItem, length: f64) -> bool {
        if !self.available() || item.is_null() {
            return false;
        }
        match self.set_item_length {
            Some(f) => unsafe { f(item, length, false) },
            None => false,
        }
    }

    pub fn item_position(&self, item: *mut RawMediaItem) -> Option<f64> {
        if !self.available() || item.is_null() {
            return None;
        }
        self.get_item_position.map(|f| unsafe { f(item) })
    }

    pub fn item_length(&self, item: *mut RawMediaItem) -> Option<f64> {
        if !self.available() || item.is_null() {
            return None;
        }
        self.get_item_length.map(|f| unsafe { f(item) })
    }

    // ---- Take capabilities --------------------------------------------------

    pub fn add_take(&self, item: *mut RawMediaItem) -> *mut RawMediaTake {
        if !self.available() || item.is_null() {
            return ptr::null_mut();
        }
        match self.add_take_to_item {
            Some(f) => unsafe { f(item) },
            None => ptr::null_mut(),
        }
    }

    pub fn active_take(&self, item: *mut RawMediaItem) -> *mut RawMediaTake {
        if !self.available() || item.is_null() {
            return ptr::null_mut();
        }
        match self.get_active_take {
            Some(f) => unsafe { f(item) },
            None => ptr::null_mut(),
        }
    }

    pub fn num_takes(&self, item: *mut RawMediaItem) -> c_int {
        if !self.available() || item.is_null() {
            return 0;
        }
        match self.count_takes {
            Some(f) => unsafe { f(item) },
            None => 0,
        }
    }

    /// Property accessor for a take handle.
    pub fn take_props(&self, take: *mut RawMediaTake) -> PropAccessor {
        let mux = if self.available() {
            self.get_set_take_info
        } else {
            None
        };
        PropAccessor::new(mux, take as *mut c_void)
    }

    // ---- Track effect capabilities ------------------------------------------

    /// Add an effect by name; `input_chain` selects the record-path chain.
    /// Returns the new chain-local index, or -1.
    pub fn track_fx_add(&self, track: *mut RawMediaTrack, name: &str, input_chain: bool) -> c_int {
        if !self.available() || track.is_null() || name.is_empty() {
            return -1;
        }
        let Some(f) = self.track_fx_add_by_name else {
            return -1;
        };
        let Ok(cname) = std::ffi::CString::new(name) else {
            return -1;
        };
        // instantiate = -1: always create a new instance
        unsafe { f(track, cname.as_ptr(), input_chain, -1) }
    }

    pub fn track_fx_name(&self, track: *mut RawMediaTrack, fx: c_int) -> Option<String> {
        if !self.available() || track.is_null() {
            return None;
        }
        let f = self.track_fx_get_name?;
        let mut buf = [0u8; STR_BUF_LEN];
        let ok = unsafe { f(track, fx, buf.as_mut_ptr() as *mut c_char, buf.len() as c_int) };
        ok.then(|| decode_buf(&buf))
    }

    pub fn track_fx_count(&self, track: *mut RawMediaTrack) -> c_int {
        if !self.available() || track.is_null() {
            return 0;
        }
        match self.track_fx_count {
            Some(f) => unsafe { f(track) },
            None => 0,
        }
    }

    /// Count of the input-stage (record path) chain.
    pub fn track_fx_rec_count(&self, track: *mut RawMediaTrack) -> c_int {
        if !self.available() || track.is_null() {
            return 0;
        }
        match self.track_fx_rec_count {
            Some(f) => unsafe { f(track) },
            None => 0,
        }
    }

    pub fn track_fx_num_params(&self, track: *mut RawMediaTrack, fx: c_int) -> c_int {
        if !self.available() || track.is_null() {
            return 0;
        }
        match self.track_fx_num_params {
            Some(f) => unsafe { f(track, fx) },
            None => 0,
        }
    }

    pub fn track_fx_param_name(
        &self,
        track: *mut RawMediaTrack,
        fx: c_int,
        param: c_int,
    ) -> Option<String> {
        if !self.available() || track.is_null() {
            return None;
        }
        let f = self.track_fx_param_name?;
        let mut buf = [0u8; STR_BUF_LEN];
        let ok =
            unsafe { f(track, fx, param, buf.as_mut_ptr() as *mut c_char, buf.len() as c_int) };
        ok.then(|| decode_buf(&buf))
    }

    /// Current value plus host-reported (min, max) range.
    pub fn track_fx_param(
        &self,
        track: *mut RawMediaTrack,
        fx: c_int,
        param: c_int,
    ) -> Option<(f64, f64, f64)> {
        if !self.available() || track.is_null() {
            return None;
        }
        let f = self.track_fx_get_param?;
        let mut min = 0.0f64;
        let mut max = 0.0f64;
        let value = unsafe { f(track, fx, param, &mut min, &mut max) };
        Some((value, min, max))
    }

    pub fn track_fx_set_param(
        &self,
        track: *mut RawMediaTrack,
        fx: c_int,
        param: c_int,
        value: f64,
    ) -> bool {
        if !self.available() || track.is_null() {
            return false;
        }
        match self.track_fx_set_param {
            Some(f) => unsafe { f(track, fx, param, value) },
            None => false,
        }
    }

    pub fn track_fx_param_normalized(
        &self,
        track: *mut RawMediaTrack,
        fx: c_int,
        param: c_int,
    ) -> Option<f64> {
        if !self.available() || track.is_null() {
            return None;
        }
        self.track_fx_get_param_norm
            .map(|f| unsafe { f(track, fx, param) })
    }

    pub fn track_fx_set_param_normalized(
        &self,
        track: *mut RawMediaTrack,
        fx: c_int,
        param: c_int,
        value: f64,
    ) -> bool {
        if !self.available() || track.is_null() {
            return false;
        }
        match self.track_fx_set_param_norm {
            Some(f) => unsafe { f(track, fx, param, value) },
            None => false,
        }
    }

    pub fn track_fx_format_param(
        &self,
        track: *mut RawMediaTrack,
        fx: c_int,
        param: c_int,
        value: f64,
    ) -> Option<String> {
        if !self.available() || track.is_null() {
            return None;
        }
        let f = self.track_fx_format_param?;
        let mut buf = [0u8; STR_BUF_LEN];
        let ok = unsafe {
            f(
                track,
                fx,
                param,
                value,
                buf.as_mut_ptr() as *mut c_char,
                buf.len() as c_int,
            )
        };
        ok.then(|| decode_buf(&buf))
    }

    pub fn track_fx_enabled(&self, track: *mut RawMediaTrack, fx: c_int) -> bool {
        if !self.available() || track.is_null() {
            return false;
        }
        match self.track_fx_get_enabled {
            Some(f) => unsafe { f(track, fx) },
            None => false,
        }
    }

    pub fn track_fx_set_enabled(&self, track: *mut RawMediaTrack, fx: c_int, enabled: bool) -> bool {
        if !self.available() || track.is_null() {
            return false;
        }
        match self.track_fx_set_enabled {
            Some(f) => unsafe { f(track, fx, enabled) },
            None => false,
        }
    }

    pub fn track_fx_delete(&self, track: *mut RawMediaTrack, fx: c_int) -> bool {
        if !self.available() || track.is_null() {
            return false;
        }
        match self.track_fx_delete {
            Some(f) => unsafe { f(track, fx) },
            None => false,
        }
    }

    // ---- Take effect capabilities -------------------------------------------

    pub fn take_fx_add(&self, take: *mut RawMediaTake, name: &str) -> c_int {
        if !self.available() || take.is_null() || name.is_empty() {
            return -1;
        }
        let Some(f) = self.take_fx_add_by_name else {
            return -1;
        };
        let Ok(cname) = std::ffi::CString::new(name) else {
            return -1;
        };
        unsafe { f(take, cname.as_ptr(), -1) }
    }

    pub fn take_fx_name(&self, take: *mut RawMediaTake, fx: c_int) -> Option<String> {
        if !self.available() || take.is_null() {
            return None;
        }
        let f = self.take_fx_get_name?;
        let mut buf = [0u8; STR_BUF_LEN];
        let ok = unsafe { f(take, fx, buf.as_mut_ptr() as *mut c_char, buf.len() as c_int) };
        ok.then(|| decode_buf(&buf))
    }

    pub fn take_fx_count(&self, take: *mut RawMediaTake) -> c_int {
        if !self.available() || take.is_null() {
            return 0;
        }
        match self.take_fx_count {
            Some(f) => unsafe { f(take) },
            None => 0,
        }
    }

    pub fn take_fx_num_params(&self, take: *mut RawMediaTake, fx: c_int) -> c_int {
        if !self.available() || take.is_null() {
            return 0;
        }
        match self.take_fx_num_params {
            Some(f) => unsafe { f(take, fx) },
            None => 0,
        }
    }

    pub fn take_fx_param_name(
        &self,
        take: *mut RawMediaTake,
        fx: c_int,
        param: c_int,
    ) -> Option<String> {
        if !self.available() || take.is_null() {
            return None;
        }
        let f = self.take_fx_param_name?;
        let mut buf = [0u8; STR_BUF_LEN];
        let ok = unsafe { f(take, fx, param, buf.as_mut_ptr() as *mut c_char, buf.len() as c_int) };
        ok.then(|| decode_buf(&buf))
    }

    pub fn take_fx_param(
        &self,
        take: *mut RawMediaTake,
        fx: c_int,
        param: c_int,
    ) -> Option<(f64, f64, f64)> {
        if !self.available() || take.is_null() {
            return None;
        }
        let f = self.take_fx_get_param?;
        let mut min = 0.0f64;
        let mut max = 0.0f64;
        let value = unsafe { f(take, fx, param, &mut min, &mut max) };
        Some((value, min, max))
    }

    pub fn take_fx_set_param(
        &self,
        take: *mut RawMediaTake,
        fx: c_int,
        param: c_int,
        value: f64,
    ) -> bool {
        if !self.available() || take.is_null() {
            return false;
        }
        match self.take_fx_set_param {
            Some(f) => unsafe { f(take, fx, param, value) },
            None => false,
        }
    }

    pub fn take_fx_param_normalized(
        &self,
        take: *mut RawMediaTake,
        fx: c_int,
        param: c_int,
    ) -> Option<f64> {
        if !self.available() || take.is_null() {
            return None;
        }
        self.take_fx_get_param_norm
            .map(|f| unsafe { f(take, fx, param) })
    }

    pub fn take_fx_set_param_normalized(
        &self,
        take: *mut RawMediaTake,
        fx: c_int,
        param: c_int,
        value: f64,
    ) -> bool {
        if !self.available() || take.is_null() {
            return false;
        }
        match self.take_fx_set_param_norm {
            Some(f) => unsafe { f(take, fx, param, value) },
            None => false,
        }
    }

    pub fn take_fx_format_param(
        &self,
        take: *mut RawMediaTake,
        fx: c_int,
        param: c_int,
        value: f64,
    ) -> Option<String> {
        if !self.available() || take.is_null() {
            return None;
        }
        let f = self.take_fx_format_param?;
        let mut buf = [0u8; STR_BUF_LEN];
        let ok = unsafe {
            f(
                take,
                fx,
                param,
                value,
                buf.as_mut_ptr() as *mut c_char,
                buf.len() as c_int,
            )
        };
        ok.then(|| decode_buf(&buf))
    }

    pub fn take_fx_enabled(&self, take: *mut RawMediaTake, fx: c_int) -> bool {
        if !self.available() || take.is_null() {
            return false;
        }
        match self.take_fx_get_enabled {
            Some(f) => unsafe { f(take, fx) },
            None => false,
        }
    }

    pub fn take_fx_set_enabled(&self, take: *mut RawMediaTake, fx: c_int, enabled: bool) -> bool {
        if !self.available() || take.is_null() {
            return false;
        }
        match self.take_fx_set_enabled {
            Some(f) => unsafe { f(take, fx, enabled) },
            None => false,
        }
    }

    pub fn take_fx_delete(&self, take: *mut RawMediaTake, fx: c_int) -> bool {
        if !self.available() || take.is_null() {
            return false;
        }
        match self.take_fx_delete {
            Some(f) => unsafe { f(take, fx) },
            None => false,
        }
    }

    // ---- Tempo map ----------------------------------------------------------

    /// Tempo-map data for a 0-based measure index.
    pub fn measure_info(&self, measure: c_int) -> Option<MeasureInfo> {
        if !self.available() {
            return None;
        }
        let f = self.time_map_measure_info?;
        let mut info = MeasureInfo {
            qn_start: 0.0,
            qn_end: 0.0,
            timesig_num: 4,
            timesig_denom: 4,
            tempo: 120.0,
        };
        unsafe {
            f(
                ptr::null_mut(),
                measure,
                &mut info.qn_start,
                &mut info.qn_end,
                &mut info.timesig_num,
                &mut info.timesig_denom,
                &mut info.tempo,
            );
        }
        Some(info)
    }

    pub fn qn_to_time(&self, qn: f64) -> Option<f64> {
        if !self.available() {
            return None;
        }
        self.qn_to_time.map(|f| unsafe { f(ptr::null_mut(), qn) })
    }

    pub fn time_to_qn(&self, time: f64) -> Option<f64> {
        if !self.available() {
            return None;
        }
        self.time_to_qn.map(|f| unsafe { f(ptr::null_mut(), time) })
    }

    // ---- Project ------------------------------------------------------------

    /// Ask the host to refresh its arrangement view. Silently a no-op when
    /// the capability is absent.
    pub fn update_arrange(&self) {
        if !self.available() {
            return;
        }
        if let Some(f) = self.update_arrange {
            unsafe { f() }
        }
    }

    pub fn project_name(&self) -> Option<String> {
        if !self.available() {
            return None;
        }
        let f = self.get_project_name?;
        let mut buf = [0u8; STR_BUF_LEN];
        unsafe { f(ptr::null_mut(), buf.as_mut_ptr() as *mut c_char, buf.len() as c_int) };
        Some(decode_buf(&buf))
    }

    pub fn project_length(&self) -> Option<f64> {
        if !self.available() {
            return None;
        }
        self.get_project_length
            .map(|f| unsafe { f(ptr::null_mut()) })
    }
}

/// What the running host supports, by capability name.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub resolved: Vec<String>,
    pub missing: Vec<String>,
}

impl CapabilityReport {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        format!(
            "{} capabilities resolved, {} missing",
            self.resolved.len(),
            self.missing.len()
        )
    }

    /// Persist the report as pretty JSON.
    pub fn save(&self, path: &Path) -> HostResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| HostError::SerdeError(e.to_string()))?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockHost, MockProject};

    #[test]
    fn test_initialize_ready() {
        let host = MockHost::install(MockProject::new());
        assert!(host.init.is_ok());
        assert!(HostApi::is_available());
        assert_eq!(HostApi::get().state(), HostState::Ready);
        let report = HostApi::get().capability_report();
        assert!(report.missing.is_empty());
        assert_eq!(report.summary(), "52 capabilities resolved, 0 missing");
    }

    #[test]
    fn test_version_mismatch_is_rejected() {
        let host = MockHost::install_with_version(MockProject::new(), 0x100);
        assert!(matches!(
            host.init,
            Err(HostError::VersionMismatch { host: 0x100, .. })
        ));
        assert!(!HostApi::is_available());
        assert_eq!(HostApi::get().state(), HostState::Failed);
        // Nothing may reach the host while Failed.
        assert!(HostApi::get().insert_track(0, 1).is_null());
        assert_eq!(HostApi::get().num_tracks(), 0);
    }

    #[test]
    fn test_missing_essential_fails() {
        let host = MockHost::install(MockProject::new().hide("GetSetMediaTrackInfo"));
        assert!(matches!(
            host.init,
            Err(HostError::MissingEssential("GetSetMediaTrackInfo"))
        ));
        assert!(!HostApi::is_available());
    }

    #[test]
    fn test_missing_optional_is_tolerated() {
        let host = MockHost::install(MockProject::new().hide("UpdateArrange"));
        assert!(host.init.is_ok());
        assert!(HostApi::is_available());

        let report = HostApi::get().capability_report();
        assert_eq!(report.missing, vec!["UpdateArrange".to_string()]);
        assert!(!HostApi::get().has_capability("UpdateArrange"));
        assert!(HostApi::get().has_capability("GetTrack"));

        // The dependent call is a no-op, not an error.
        HostApi::get().update_arrange();
        assert_eq!(host.update_arrange_calls(), 0);
    }

    #[test]
    fn test_reinitialize_replaces_cache() {
        {
            let host = MockHost::install(MockProject::new().hide("TrackFX_AddByName"));
            assert!(host.init.is_ok());
            let api = HostApi::get();
            let tr = api.insert_track(0, 1);
            assert_eq!(api.track_fx_add(tr, "Comp", false), -1);
        }
        {
            let host = MockHost::install(MockProject::new());
            assert!(host.init.is_ok());
            // No stale absence survives the re-handshake.
            let api = HostApi::get();
            let tr = api.insert_track(0, 1);
            assert_eq!(api.track_fx_add(tr, "Comp", false), 0);
        }
        {
            let host = MockHost::install(MockProject::new().hide("TrackFX_AddByName"));
            assert!(host.init.is_ok());
            // Nor does a stale resolution.
            let api = HostApi::get();
            let tr = api.insert_track(0, 1);
            assert_eq!(api.track_fx_add(tr, "Comp", false), -1);
        }
    }

    #[test]
    fn test_null_handles_fail_closed() {
        let _host = MockHost::install(MockProject::new());
        let api = HostApi::get();
        assert!(api.add_item(ptr::null_mut()).is_null());
        assert_eq!(api.num_track_items(ptr::null_mut()), 0);
        assert!(!api.set_item_position(ptr::null_mut(), 1.0));
        assert_eq!(api.item_position(ptr::null_mut()), None);
        assert_eq!(api.track_fx_add(ptr::null_mut(), "Comp", false), -1);
    }

    #[test]
    fn test_insert_track_negative_appends() {
        let _host = MockHost::install(MockProject::with_tracks(&["A", "B"]));
        let api = HostApi::get();
        let raw = api.insert_track(-1, 1);
        assert!(!raw.is_null());
        assert_eq!(api.num_tracks(), 3);
        assert_eq!(raw, api.get_track(2));
    }

    #[test]
    fn test_report_save() {
        let host = MockHost::install(MockProject::new().hide("GetProjectLength"));
        assert!(host.init.is_ok());
        let report = HostApi::get().capability_report();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capabilities.json");
        report.save(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let parsed: CapabilityReport = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.missing, vec!["GetProjectLength".to_string()]);
        assert!(parsed.resolved.contains(&"GetTrack".to_string()));
    }
}
