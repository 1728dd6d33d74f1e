//! Deterministic in-process host for tests.
//!
//! Implements the full capability surface over a plain data model held in
//! thread-local storage, plus a resolver that can be told to pretend any
//! capability does not exist. Tests drive the real registry and entity
//! wrappers end to end against it; nothing here talks to an actual host.
//!
//! Registry state is process-wide, so [`MockHost::install`] holds a global
//! lock for the fixture's lifetime. The data model itself is thread-local,
//! which keeps a test's host callbacks on the thread that issued the call.

use lazy_static::lazy_static;
use libc::{c_char, c_int, c_void};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::ffi::{CStr, CString};
use std::ptr;
use std::sync::{Mutex, MutexGuard};

use super::api::HostApi;
use super::types::{HostPluginInfo, HostResult, HOST_API_VERSION, INPUT_FX_OFFSET};

const TRACK_BASE: usize = 0x1000_0000;
const ITEM_BASE: usize = 0x2000_0000;
const TAKE_BASE: usize = 0x3000_0000;

#[derive(Clone, Debug)]
pub struct MockParam {
    pub name: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Clone, Debug)]
pub struct MockFx {
    pub name: String,
    pub enabled: bool,
    pub params: Vec<MockParam>,
}

impl MockFx {
    /// Every mock effect ships the same two parameters so parameter tests
    /// have a known shape to assert against.
    pub fn new(name: &str) -> Self {
        MockFx {
            name: name.to_string(),
            enabled: true,
            params: vec![
                MockParam { name: "Gain".into(), value: 0.5, min: 0.0, max: 1.0 },
                MockParam { name: "Frequency".into(), value: 1000.0, min: 20.0, max: 20000.0 },
            ],
        }
    }
}

#[derive(Clone, Debug)]
pub struct MockTrack {
    pub id: usize,
    pub name: String,
    pub volume: f64,
    pub pan: f64,
    pub mute: bool,
    pub solo: i32,
    pub items: Vec<usize>,
    pub fx: Vec<MockFx>,
    pub input_fx: Vec<MockFx>,
}

impl MockTrack {
    fn new(id: usize, name: &str) -> Self {
        MockTrack {
            id,
            name: name.to_string(),
            volume: 1.0,
            pan: 0.0,
            mute: false,
            solo: 0,
            items: Vec::new(),
            fx: Vec::new(),
            input_fx: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockItem {
    pub track: usize,
    pub position: f64,
    pub length: f64,
    pub takes: Vec<usize>,
    pub active_take: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct MockTake {
    pub item: usize,
    pub name: String,
    pub volume: f64,
    pub pan: f64,
    /// Opaque media-source tag; 0 means no source attached.
    pub source: usize,
    pub fx: Vec<MockFx>,
}

/// Fixture data model. Tracks keep project order; items and takes live in
/// append-only arenas so their handles stay stable.
#[derive(Clone, Debug)]
pub struct MockProject {
    pub name: String,
    pub bpm: f64,
    pub tracks: Vec<MockTrack>,
    pub items: Vec<MockItem>,
    pub takes: Vec<MockTake>,
    pub selected_tracks: Vec<usize>,
    pub selected_items: Vec<usize>,
    pub update_arrange_calls: usize,
    hidden: HashSet<String>,
    next_track_id: usize,
}

impl Default for MockProject {
    fn default() -> Self {
        MockProject {
            name: "untitled".to_string(),
            bpm: 120.0,
            tracks: Vec::new(),
            items: Vec::new(),
            takes: Vec::new(),
            selected_tracks: Vec::new(),
            selected_items: Vec::new(),
            update_arrange_calls: 0,
            hidden: HashSet::new(),
            next_track_id: 0,
        }
    }
}

impl MockProject {
    pub fn new() -> Self {
        MockProject::default()
    }

    pub fn with_tracks(names: &[&str]) -> Self {
        let mut p = MockProject::new();
        for name in names {
            p.add_track(name);
        }
        p
    }

    /// Pretend the host does not provide `capability`.
    pub fn hide(mut self, capability: &str) -> Self {
        self.hidden.insert(capability.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = bpm;
        self
    }

    /// Append a track, returning its project position.
    pub fn add_track(&mut self, name: &str) -> usize {
        let id = self.next_track_id;
        self.next_track_id += 1;
        self.tracks.push(MockTrack::new(id, name));
        self.tracks.len() - 1
    }

    /// Mark the track at `position` selected.
    pub fn select_track(&mut self, position: usize) {
        if let Some(t) = self.tracks.get(position) {
            self.selected_tracks.push(t.id);
        }
    }

    /// Mark an item selected by track position and item ordinal.
    pub fn select_item(&mut self, track_position: usize, item_ordinal: usize) {
        if let Some(t) = self.tracks.get(track_position) {
            if let Some(&item_id) = t.items.get(item_ordinal) {
                self.selected_items.push(item_id);
            }
        }
    }

    fn track_by_id_mut(&mut self, id: usize) -> Option<&mut MockTrack> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }
}

thread_local! {
    static STATE: RefCell<MockProject> = RefCell::new(MockProject::default());
    static SCRATCH_F64: Cell<f64> = const { Cell::new(0.0) };
    static SCRATCH_I32: Cell<c_int> = const { Cell::new(0) };
    static SCRATCH_STR: RefCell<CString> = RefCell::new(CString::default());
}

lazy_static! {
    static ref GUARD: Mutex<()> = Mutex::new(());
}

fn with_state<R>(f: impl FnOnce(&mut MockProject) -> R) -> R {
    STATE.with(|s| f(&mut s.borrow_mut()))
}

/// Installed fixture. Holds the registry lock; dropping it clears the
/// thread's data model so the next test starts clean.
pub struct MockHost {
    /// Result of the handshake performed at install time.
    pub init: HostResult<()>,
    _guard: MutexGuard<'static, ()>,
}

impl MockHost {
    pub fn install(project: MockProject) -> MockHost {
        MockHost::install_with_version(project, HOST_API_VERSION)
    }

    /// Install with an arbitrary caller version token, for handshake tests.
    pub fn install_with_version(project: MockProject, version: c_int) -> MockHost {
        let guard = GUARD.lock().unwrap_or_else(|e| e.into_inner());
        STATE.with(|s| *s.borrow_mut() = project);
        let rec = HostPluginInfo { caller_version: version, get_func: Some(mock_get_func) };
        let init = HostApi::initialize(&rec);
        MockHost { init, _guard: guard }
    }

    /// Inspect or mutate the fixture mid-test.
    pub fn with<R>(&self, f: impl FnOnce(&mut MockProject) -> R) -> R {
        with_state(f)
    }

    pub fn update_arrange_calls(&self) -> usize {
        with_state(|p| p.update_arrange_calls)
    }
}

impl Drop for MockHost {
    fn drop(&mut self) {
        STATE.with(|s| *s.borrow_mut() = MockProject::default());
    }
}

// ---- handle mapping ---------------------------------------------------------

fn track_handle(id: usize) -> *mut c_void {
    (TRACK_BASE + id) as *mut c_void
}

fn item_handle(arena_idx: usize) -> *mut c_void {
    (ITEM_BASE + arena_idx) as *mut c_void
}

fn take_handle(arena_idx: usize) -> *mut c_void {
    (TAKE_BASE + arena_idx) as *mut c_void
}

fn track_id_of(h: *mut c_void) -> Option<usize> {
    let v = h as usize;
    if (TRACK_BASE..ITEM_BASE).contains(&v) {
        Some(v - TRACK_BASE)
    } else {
        None
    }
}

fn item_id_of(h: *mut c_void) -> Option<usize> {
    let v = h as usize;
    if (ITEM_BASE..TAKE_BASE).contains(&v) {
        Some(v - ITEM_BASE)
    } else {
        None
    }
}

fn take_id_of(h: *mut c_void) -> Option<usize> {
    let v = h as usize;
    if v >= TAKE_BASE {
        Some(v - TAKE_BASE)
    } else {
        None
    }
}

// ---- helpers ----------------------------------------------------------------

unsafe fn cstr_arg(p: *const c_char) -> Option<String> {
    if p.is_null() {
        return None;
    }
    Some(CStr::from_ptr(p).to_string_lossy().into_owned())
}

/// Copy `s` into a caller-provided NUL-terminated buffer.
unsafe fn copy_out(s: &str, buf: *mut c_char, sz: c_int) -> bool {
    if buf.is_null() || sz <= 0 {
        return false;
    }
    let n = (sz as usize - 1).min(s.len());
    ptr::copy_nonoverlapping(s.as_ptr(), buf as *mut u8, n);
    *buf.add(n) = 0;
    true
}

/// Park a string in thread-local scratch and hand out its pointer, mimicking
/// a host returning host-owned memory.
fn scratch_str(s: &str) -> *mut c_void {
    SCRATCH_STR.with(|c| {
        let owned = CString::new(s).unwrap_or_default();
        *c.borrow_mut() = owned;
        c.borrow().as_ptr() as *mut c_void
    })
}

unsafe fn f64_prop(slot: &mut f64, set: *mut c_void) -> *mut c_void {
    if set.is_null() {
        SCRATCH_F64.with(|c| {
            c.set(*slot);
            c.as_ptr() as *mut c_void
        })
    } else {
        *slot = *(set as *const f64);
        set
    }
}

unsafe fn i32_prop(slot: &mut i32, set: *mut c_void) -> *mut c_void {
    if set.is_null() {
        SCRATCH_I32.with(|c| {
            c.set(*slot);
            c.as_ptr() as *mut c_void
        })
    } else {
        *slot = *(set as *const i32);
        set
    }
}

unsafe fn bool_prop(slot: &mut bool, set: *mut c_void) -> *mut c_void {
    if set.is_null() {
        SCRATCH_I32.with(|c| {
            c.set(*slot as c_int);
            c.as_ptr() as *mut c_void
        })
    } else {
        *slot = *(set as *const i32) != 0;
        set
    }
}

fn fx_slot(track: &mut MockTrack, host_idx: c_int) -> Option<&mut MockFx> {
    if host_idx < 0 {
        return None;
    }
    if host_idx >= INPUT_FX_OFFSET {
        track.input_fx.get_mut((host_idx - INPUT_FX_OFFSET) as usize)
    } else {
        track.fx.get_mut(host_idx as usize)
    }
}

// ---- resolver ---------------------------------------------------------------

unsafe extern "C" fn mock_get_func(name: *const c_char) -> *mut c_void {
    let Some(name) = cstr_arg(name) else {
        return ptr::null_mut();
    };
    if with_state(|p| p.hidden.contains(&name)) {
        return ptr::null_mut();
    }
    capability_ptr(&name)
}

fn capability_ptr(name: &str) -> *mut c_void {
    match name {
        "InsertTrackInProject" => mock_insert_track as *mut c_void,
        "GetTrack" => mock_get_track as *mut c_void,
        "GetNumTracks" => mock_get_num_tracks as *mut c_void,
        "GetSetMediaTrackInfo" => mock_track_info as *mut c_void,
        "GetSelectedTrack2" => mock_get_selected_track as *mut c_void,
        "CountSelectedTracks2" => mock_count_selected_tracks as *mut c_void,
        "AddMediaItemToTrack" => mock_add_item as *mut c_void,
        "GetTrackMediaItem" => mock_get_track_item as *mut c_void,
        "CountTrackMediaItems" => mock_count_track_items as *mut c_void,
        "GetSelectedMediaItem" => mock_get_selected_item as *mut c_void,
        "CountSelectedMediaItems" => mock_count_selected_items as *mut c_void,
        "SetMediaItemPosition" => mock_set_item_position as *mut c_void,
        "SetMediaItemLength" => mock_set_item_length as *mut c_void,
        "GetMediaItemPosition" => mock_get_item_position as *mut c_void,
        "GetMediaItemLength" => mock_get_item_length as *mut c_void,
        "AddTakeToMediaItem" => mock_add_take as *mut c_void,
        "GetActiveTake" => mock_get_active_take as *mut c_void,
        "CountTakes" => mock_count_takes as *mut c_void,
        "GetSetMediaItemTakeInfo" => mock_take_info as *mut c_void,
        "TrackFX_AddByName" => mock_track_fx_add as *mut c_void,
        "TrackFX_GetFXName" => mock_track_fx_get_name as *mut c_void,
        "TrackFX_GetCount" => mock_track_fx_count as *mut c_void,
        "TrackFX_GetRecCount" => mock_track_fx_rec_count as *mut c_void,
        "TrackFX_GetNumParams" => mock_track_fx_num_params as *mut c_void,
        "TrackFX_GetParamName" => mock_track_fx_param_name as *mut c_void,
        "TrackFX_GetParam" => mock_track_fx_get_param as *mut c_void,
        "TrackFX_SetParam" => mock_track_fx_set_param as *mut c_void,
        "TrackFX_GetParamNormalized" => mock_track_fx_get_param_norm as *mut c_void,
        "TrackFX_SetParamNormalized" => mock_track_fx_set_param_norm as *mut c_void,
        "TrackFX_FormatParamValue" => mock_track_fx_format_param as *mut c_void,
        "TrackFX_GetEnabled" => mock_track_fx_get_enabled as *mut c_void,
        "TrackFX_SetEnabled" => mock_track_fx_set_enabled as *mut c_void,
        "TrackFX_Delete" => mock_track_fx_delete as *mut c_void,
        "TakeFX_AddByName" => mock_take_fx_add as *mut c_void,
        "TakeFX_GetFXName" => mock_take_fx_get_name as *mut c_void,
        "TakeFX_GetCount" => mock_take_fx_count as *mut c_void,
        "TakeFX_GetNumParams" => mock_take_fx_num_params as *mut c_void,
        "TakeFX_GetParamName" => mock_take_fx_param_name as *mut c_void,
        "TakeFX_GetParam" => mock_take_fx_get_param as *mut c_void,
        "TakeFX_SetParam" => mock_take_fx_set_param as *mut c_void,
        "TakeFX_GetParamNormalized" => mock_take_fx_get_param_norm as *mut c_void,
        "TakeFX_SetParamNormalized" => mock_take_fx_set_param_norm as *mut c_void,
        "TakeFX_FormatParamValue" => mock_take_fx_format_param as *mut c_void,
        "TakeFX_GetEnabled" => mock_take_fx_get_enabled as *mut c_void,
        "TakeFX_SetEnabled" => mock_take_fx_set_enabled as *mut c_void,
        "TakeFX_Delete" => mock_take_fx_delete as *mut c_void,
        "TimeMap_GetMeasureInfo" => mock_measure_info as *mut c_void,
        "TimeMap2_QNToTime" => mock_qn_to_time as *mut c_void,
        "TimeMap2_timeToQN" => mock_time_to_qn as *mut c_void,
        "UpdateArrange" => mock_update_arrange as *mut c_void,
        "GetProjectName" => mock_get_project_name as *mut c_void,
        "GetProjectLength" => mock_get_project_length as *mut c_void,
        _ => ptr::null_mut(),
    }
}

// ---- track capabilities -----------------------------------------------------

unsafe extern "C" fn mock_insert_track(_proj: *mut c_void, index: c_int, _flags: c_int) {
    with_state(|p| {
        let id = p.next_track_id;
        p.next_track_id += 1;
        let at = (index.max(0) as usize).min(p.tracks.len());
        p.tracks.insert(at, MockTrack::new(id, ""));
    })
}

unsafe extern "C" fn mock_get_track(_proj: *mut c_void, index: c_int) -> *mut c_void {
    if index < 0 {
        return ptr::null_mut();
    }
    with_state(|p| {
        p.tracks
            .get(index as usize)
            .map(|t| track_handle(t.id))
            .unwrap_or(ptr::null_mut())
    })
}

unsafe extern "C" fn mock_get_num_tracks(_proj: *mut c_void) -> c_int {
    with_state(|p| p.tracks.len() as c_int)
}

unsafe extern "C" fn mock_track_info(
    tr: *mut c_void,
    key: *const c_char,
    set: *mut c_void,
    _extra: *mut c_void,
) -> *mut c_void {
    let Some(key) = cstr_arg(key) else {
        return ptr::null_mut();
    };
    let Some(id) = track_id_of(tr) else {
        return ptr::null_mut();
    };
    with_state(|p| {
        let Some(t) = p.track_by_id_mut(id) else {
            return ptr::null_mut();
        };
        match key.as_str() {
            "P_NAME" => {
                if set.is_null() {
                    scratch_str(&t.name)
                } else {
                    if let Some(new) = cstr_arg(set as *const c_char) {
                        t.name = new;
                    }
                    set
                }
            }
            "D_VOL" => f64_prop(&mut t.volume, set),
            "D_PAN" => f64_prop(&mut t.pan, set),
            "B_MUTE" => bool_prop(&mut t.mute, set),
            "I_SOLO" => i32_prop(&mut t.solo, set),
            _ => ptr::null_mut(),
        }
    })
}

unsafe extern "C" fn mock_get_selected_track(
    _proj: *mut c_void,
    sel_index: c_int,
    _want_master: bool,
) -> *mut c_void {
    if sel_index < 0 {
        return ptr::null_mut();
    }
    with_state(|p| {
        p.selected_tracks
            .get(sel_index as usize)
            .map(|&id| track_handle(id))
            .unwrap_or(ptr::null_mut())
    })
}

unsafe extern "C" fn mock_count_selected_tracks(_proj: *mut c_void, _want_master: bool) -> c_int {
    with_state(|p| p.selected_tracks.len() as c_int)
}

// ---- item capabilities ------------------------------------------------------

unsafe extern "C" fn mock_add_item(tr: *mut c_void) -> *mut c_void {
    let Some(id) = track_id_of(tr) else {
        return ptr::null_mut();
    };
    with_state(|p| {
        let arena_idx = p.items.len();
        let Some(t) = p.track_by_id_mut(id) else {
            return ptr::null_mut();
        };
        t.items.push(arena_idx);
        p.items.push(MockItem { track: id, ..MockItem::default() });
        item_handle(arena_idx)
    })
}

unsafe extern "C" fn mock_get_track_item(tr: *mut c_void, index: c_int) -> *mut c_void {
    if index < 0 {
        return ptr::null_mut();
    }
    let Some(id) = track_id_of(tr) else {
        return ptr::null_mut();
    };
    with_state(|p| {
        p.track_by_id_mut(id)
            .and_then(|t| t.items.get(index as usize).copied())
            .map(item_handle)
            .unwrap_or(ptr::null_mut())
    })
}

unsafe extern "C" fn mock_count_track_items(tr: *mut c_void) -> c_int {
    let Some(id) = track_id_of(tr) else {
        return 0;
    };
    with_state(|p| {
        p.track_by_id_mut(id)
            .map(|t| t.items.len() as c_int)
            .unwrap_or(0)
    })
}

unsafe extern "C" fn mock_get_selected_item(_proj: *mut c_void, sel_index: c_int) -> *mut c_void {
    if sel_index < 0 {
        return ptr::null_mut();
    }
    with_state(|p| {
        p.selected_items
            .get(sel_index as usize)
            .map(|&i| item_handle(i))
            .unwrap_or(ptr::null_mut())
    })
}

unsafe extern "C" fn mock_count_selected_items(_proj: *mut c_void) -> c_int {
    with_state(|p| p.selected_items.len() as c_int)
}

unsafe extern "C" fn mock_set_item_position(
    item: *mut c_void,
    position: f64,
    _refresh: bool,
) -> bool {
    let Some(i) = item_id_of(item) else {
        return false;
    };
    with_state(|p| match p.items.get_mut(i) {
        Some(it) => {
            it.position = position;
            true
        }
        None => false,
    })
}

unsafe extern "C" fn mock_set_item_length(item: *mut c_void, length: f64, _refresh: bool) -> bool {
    let Some(i) = item_id_of(item) else {
        return false;
    };
    with_state(|p| match p.items.get_mut(i) {
        Some(it) => {
            it.length = length;
            true
        }
        None => false,
    })
}

unsafe extern "C" fn mock_get_item_position(item: *mut c_void) -> f64 {
    let Some(i) = item_id_of(item) else {
        return 0.0;
    };
    with_state(|p| p.items.get(i).map(|it| it.position).unwrap_or(0.0))
}

unsafe extern "C" fn mock_get_item_length(item: *mut c_void) -> f64 {
    let Some(i) = item_id_of(item) else {
        return 0.0;
    };
    with_state(|p| p.items.get(i).map(|it| it.length).unwrap_or(0.0))
}

// ---- take capabilities ------------------------------------------------------

unsafe extern "C" fn mock_add_take(item: *mut c_void) -> *mut c_void {
    let Some(i) = item_id_of(item) else {
        return ptr::null_mut();
    };
    with_state(|p| {
        let arena_idx = p.takes.len();
        let Some(it) = p.items.get_mut(i) else {
            return ptr::null_mut();
        };
        it.takes.push(arena_idx);
        if it.active_take.is_none() {
            it.active_take = Some(arena_idx);
        }
        p.takes.push(MockTake {
            item: i,
            name: String::new(),
            volume: 1.0,
            pan: 0.0,
            source: 0,
            fx: Vec::new(),
        });
        take_handle(arena_idx)
    })
}

unsafe extern "C" fn mock_get_active_take(item: *mut c_void) -> *mut c_void {
    let Some(i) = item_id_of(item) else {
        return ptr::null_mut();
    };
    with_state(|p| {
        p.items
            .get(i)
            .and_then(|it| it.active_take)
            .map(take_handle)
            .unwrap_or(ptr::null_mut())
    })
}

unsafe extern "C" fn mock_count_takes(item: *mut c_void) -> c_int {
    let Some(i) = item_id_of(item) else {
        return 0;
    };
    with_state(|p| p.items.get(i).map(|it| it.takes.len() as c_int).unwrap_or(0))
}

unsafe extern "C" fn mock_take_info(
    take: *mut c_void,
    key: *const c_char,
    set: *mut c_void,
    _extra: *mut c_void,
) -> *mut c_void {
    let Some(key) = cstr_arg(key) else {
        return ptr::null_mut();
    };
    let Some(i) = take_id_of(take) else {
        return ptr::null_mut();
    };
    with_state(|p| {
        let Some(t) = p.takes.get_mut(i) else {
            return ptr::null_mut();
        };
        match key.as_str() {
            "P_NAME" => {
                if set.is_null() {
                    scratch_str(&t.name)
                } else {
                    if let Some(new) = cstr_arg(set as *const c_char) {
                        t.name = new;
                    }
                    set
                }
            }
            "D_VOL" => f64_prop(&mut t.volume, set),
            "D_PAN" => f64_prop(&mut t.pan, set),
            "P_SOURCE" => {
                if set.is_null() {
                    t.source as *mut c_void
                } else {
                    t.source = set as usize;
                    set
                }
            }
            _ => ptr::null_mut(),
        }
    })
}

// ---- track effect capabilities ----------------------------------------------

unsafe extern "C" fn mock_track_fx_add(
    tr: *mut c_void,
    name: *const c_char,
    rec_fx: bool,
    instantiate: c_int,
) -> c_int {
    let Some(id) = track_id_of(tr) else {
        return -1;
    };
    let Some(name) = cstr_arg(name) else {
        return -1;
    };
    with_state(|p| {
        let Some(t) = p.track_by_id_mut(id) else {
            return -1;
        };
        let chain = if rec_fx { &mut t.input_fx } else { &mut t.fx };
        if instantiate == 0 {
            return chain
                .iter()
                .position(|fx| fx.name == name)
                .map(|i| i as c_int)
                .unwrap_or(-1);
        }
        chain.push(MockFx::new(&name));
        (chain.len() - 1) as c_int
    })
}

unsafe extern "C" fn mock_track_fx_get_name(
    tr: *mut c_void,
    fx: c_int,
    buf: *mut c_char,
    sz: c_int,
) -> bool {
    let Some(id) = track_id_of(tr) else {
        return false;
    };
    let name = with_state(|p| {
        p.track_by_id_mut(id)
            .and_then(|t| fx_slot(t, fx))
            .map(|f| f.name.clone())
    });
    match name {
        Some(n) => copy_out(&n, buf, sz),
        None => false,
    }
}

unsafe extern "C" fn mock_track_fx_count(tr: *mut c_void) -> c_int {
    let Some(id) = track_id_of(tr) else {
        return 0;
    };
    with_state(|p| p.track_by_id_mut(id).map(|t| t.fx.len() as c_int).unwrap_or(0))
}

unsafe extern "C" fn mock_track_fx_rec_count(tr: *mut c_void) -> c_int {
    let Some(id) = track_id_of(tr) else {
        return 0;
    };
    with_state(|p| {
        p.track_by_id_mut(id)
            .map(|t| t.input_fx.len() as c_int)
            .unwrap_or(0)
    })
}

unsafe extern "C" fn mock_track_fx_num_params(tr: *mut c_void, fx: c_int) -> c_int {
    let Some(id) = track_id_of(tr) else {
        return 0;
    };
    with_state(|p| {
        p.track_by_id_mut(id)
            .and_then(|t| fx_slot(t, fx))
            .map(|f| f.params.len() as c_int)
            .unwrap_or(0)
    })
}

unsafe extern "C" fn mock_track_fx_param_name(
    tr: *mut c_void,
    fx: c_int,
    param: c_int,
    buf: *mut c_char,
    sz: c_int,
) -> bool {
    if param < 0 {
        return false;
    }
    let Some(id) = track_id_of(tr) else {
        return false;
    };
    let name = with_state(|p| {
        p.track_by_id_mut(id)
            .and_then(|t| fx_slot(t, fx))
            .and_then(|f| f.params.get(param as usize))
            .map(|pa| pa.name.clone())
    });
    match name {
        Some(n) => copy_out(&n, buf, sz),
        None => false,
    }
}

unsafe extern "C" fn mock_track_fx_get_param(
    tr: *mut c_void,
    fx: c_int,
    param: c_int,
    min_out: *mut f64,
    max_out: *mut f64,
) -> f64 {
    let looked = if param >= 0 {
        track_id_of(tr).and_then(|id| {
            with_state(|p| {
                p.track_by_id_mut(id)
                    .and_then(|t| fx_slot(t, fx))
                    .and_then(|f| f.params.get(param as usize))
                    .map(|pa| (pa.value, pa.min, pa.max))
            })
        })
    } else {
        None
    };
    let (value, min, max) = looked.unwrap_or((0.0, 0.0, 0.0));
    if !min_out.is_null() {
        *min_out = min;
    }
    if !max_out.is_null() {
        *max_out = max;
    }
    value
}

unsafe extern "C" fn mock_track_fx_set_param(
    tr: *mut c_void,
    fx: c_int,
    param: c_int,
    value: f64,
) -> bool {
    if param < 0 {
        return false;
    }
    let Some(id) = track_id_of(tr) else {
        return false;
    };
    with_state(|p| {
        match p
            .track_by_id_mut(id)
            .and_then(|t| fx_slot(t, fx))
            .and_then(|f| f.params.get_mut(param as usize))
        {
            Some(pa) => {
                pa.value = value;
                true
            }
            None => false,
        }
    })
}

unsafe extern "C" fn mock_track_fx_get_param_norm(
    tr: *mut c_void,
    fx: c_int,
    param: c_int,
) -> f64 {
    let mut min = 0.0;
    let mut max = 0.0;
    let value = mock_track_fx_get_param(tr, fx, param, &mut min, &mut max);
    if max > min {
        (value - min) / (max - min)
    } else {
        0.0
    }
}

unsafe extern "C" fn mock_track_fx_set_param_norm(
    tr: *mut c_void,
    fx: c_int,
    param: c_int,
    value: f64,
) -> bool {
    if param < 0 {
        return false;
    }
    let Some(id) = track_id_of(tr) else {
        return false;
    };
    with_state(|p| {
        match p
            .track_by_id_mut(id)
            .and_then(|t| fx_slot(t, fx))
            .and_then(|f| f.params.get_mut(param as usize))
        {
            Some(pa) => {
                pa.value = pa.min + value.clamp(0.0, 1.0) * (pa.max - pa.min);
                true
            }
            None => false,
        }
    })
}

unsafe extern "C" fn mock_track_fx_format_param(
    tr: *mut c_void,
    fx: c_int,
    param: c_int,
    value: f64,
    buf: *mut c_char,
    sz: c_int,
) -> bool {
    if param < 0 {
        return false;
    }
    let Some(id) = track_id_of(tr) else {
        return false;
    };
    let valid = with_state(|p| {
        p.track_by_id_mut(id)
            .and_then(|t| fx_slot(t, fx))
            .map(|f| (param as usize) < f.params.len())
            .unwrap_or(false)
    });
    if !valid {
        return false;
    }
    copy_out(&format!("{:.2}", value), buf, sz)
}

unsafe extern "C" fn mock_track_fx_get_enabled(tr: *mut c_void, fx: c_int) -> bool {
    let Some(id) = track_id_of(tr) else {
        return false;
    };
    with_state(|p| {
        p.track_by_id_mut(id)
            .and_then(|t| fx_slot(t, fx))
            .map(|f| f.enabled)
            .unwrap_or(false)
    })
}

unsafe extern "C" fn mock_track_fx_set_enabled(tr: *mut c_void, fx: c_int, enabled: bool) -> bool {
    let Some(id) = track_id_of(tr) else {
        return false;
    };
    with_state(|p| match p.track_by_id_mut(id).and_then(|t| fx_slot(t, fx)) {
        Some(f) => {
            f.enabled = enabled;
            true
        }
        None => false,
    })
}

unsafe extern "C" fn mock_track_fx_delete(tr: *mut c_void, fx: c_int) -> bool {
    if fx < 0 {
        return false;
    }
    let Some(id) = track_id_of(tr) else {
        return false;
    };
    with_state(|p| {
        let Some(t) = p.track_by_id_mut(id) else {
            return false;
        };
        if fx >= INPUT_FX_OFFSET {
            let i = (fx - INPUT_FX_OFFSET) as usize;
            if i < t.input_fx.len() {
                t.input_fx.remove(i);
                return true;
            }
        } else if (fx as usize) < t.fx.len() {
            t.fx.remove(fx as usize);
            return true;
        }
        false
    })
}

// ---- take effect capabilities -----------------------------------------------

unsafe extern "C" fn mock_take_fx_add(
    take: *mut c_void,
    name: *const c_char,
    instantiate: c_int,
) -> c_int {
    let Some(i) = take_id_of(take) else {
        return -1;
    };
    let Some(name) = cstr_arg(name) else {
        return -1;
    };
    with_state(|p| {
        let Some(t) = p.takes.get_mut(i) else {
            return -1;
        };
        let chain = &mut t.fx;
        if instantiate == 0 {
            return chain
                .iter()
                .position(|fx| fx.name == name)
                .map(|n| n as c_int)
                .unwrap_or(-1);
        }
        chain.push(MockFx::new(&name));
        (chain.len() - 1) as c_int
    })
}

unsafe extern "C" fn mock_take_fx_get_name(
    take: *mut c_void,
    fx: c_int,
    buf: *mut c_char,
    sz: c_int,
) -> bool {
    let name = take_fx_with(take, fx, |f| f.name.clone());
    match name {
        Some(n) => copy_out(&n, buf, sz),
        None => false,
    }
}

unsafe extern "C" fn mock_take_fx_count(take: *mut c_void) -> c_int {
    let Some(i) = take_id_of(take) else {
        return 0;
    };
    with_state(|p| p.takes.get(i).map(|t| t.fx.len() as c_int).unwrap_or(0))
}

unsafe extern "C" fn mock_take_fx_num_params(take: *mut c_void, fx: c_int) -> c_int {
    take_fx_with(take, fx, |f| f.params.len() as c_int).unwrap_or(0)
}

unsafe extern "C" fn mock_take_fx_param_name(
    take: *mut c_void,
    fx: c_int,
    param: c_int,
    buf: *mut c_char,
    sz: c_int,
) -> bool {
    if param < 0 {
        return false;
    }
    let name = take_fx_with(take, fx, |f| f.params.get(param as usize).map(|p| p.name.clone()))
        .flatten();
    match name {
        Some(n) => copy_out(&n, buf, sz),
        None => false,
    }
}

unsafe extern "C" fn mock_take_fx_get_param(
    take: *mut c_void,
    fx: c_int,
    param: c_int,
    min_out: *mut f64,
    max_out: *mut f64,
) -> f64 {
    let looked = if param >= 0 {
        take_fx_with(take, fx, |f| {
            f.params
                .get(param as usize)
                .map(|pa| (pa.value, pa.min, pa.max))
        })
        .flatten()
    } else {
        None
    };
    let (value, min, max) = looked.unwrap_or((0.0, 0.0, 0.0));
    if !min_out.is_null() {
        *min_out = min;
    }
    if !max_out.is_null() {
        *max_out = max;
    }
    value
}

unsafe extern "C" fn mock_take_fx_set_param(
    take: *mut c_void,
    fx: c_int,
    param: c_int,
    value: f64,
) -> bool {
    if param < 0 {
        return false;
    }
    take_fx_with(take, fx, |f| match f.params.get_mut(param as usize) {
        Some(pa) => {
            pa.value = value;
            true
        }
        None => false,
    })
    .unwrap_or(false)
}

unsafe extern "C" fn mock_take_fx_get_param_norm(take: *mut c_void, fx: c_int, param: c_int) -> f64 {
    let mut min = 0.0;
    let mut max = 0.0;
    let value = mock_take_fx_get_param(take, fx, param, &mut min, &mut max);
    if max > min {
        (value - min) / (max - min)
    } else {
        0.0
    }
}

unsafe extern "C" fn mock_take_fx_set_param_norm(
    take: *mut c_void,
    fx: c_int,
    param: c_int,
    value: f64,
) -> bool {
    if param < 0 {
        return false;
    }
    take_fx_with(take, fx, |f| match f.params.get_mut(param as usize) {
        Some(pa) => {
            pa.value = pa.min + value.clamp(0.0, 1.0) * (pa.max - pa.min);
            true
        }
        None => false,
    })
    .unwrap_or(false)
}

unsafe extern "C" fn mock_take_fx_format_param(
    take: *mut c_void,
    fx: c_int,
    param: c_int,
    value: f64,
    buf: *mut c_char,
    sz: c_int,
) -> bool {
    if param < 0 {
        return false;
    }
    let valid = take_fx_with(take, fx, |f| (param as usize) < f.params.len()).unwrap_or(false);
    if !valid {
        return false;
    }
    copy_out(&format!("{:.2}", value), buf, sz)
}

unsafe extern "C" fn mock_take_fx_get_enabled(take: *mut c_void, fx: c_int) -> bool {
    take_fx_with(take, fx, |f| f.enabled).unwrap_or(false)
}

unsafe extern "C" fn mock_take_fx_set_enabled(take: *mut c_void, fx: c_int, enabled: bool) -> bool {
    take_fx_with(take, fx, |f| {
        f.enabled = enabled;
        true
    })
    .unwrap_or(false)
}

unsafe extern "C" fn mock_take_fx_delete(take: *mut c_void, fx: c_int) -> bool {
    if fx < 0 {
        return false;
    }
    let Some(i) = take_id_of(take) else {
        return false;
    };
    with_state(|p| {
        let Some(t) = p.takes.get_mut(i) else {
            return false;
        };
        if (fx as usize) < t.fx.len() {
            t.fx.remove(fx as usize);
            true
        } else {
            false
        }
    })
}

fn take_fx_with<R>(take: *mut c_void, fx: c_int, f: impl FnOnce(&mut MockFx) -> R) -> Option<R> {
    if fx < 0 {
        return None;
    }
    let i = take_id_of(take)?;
    with_state(|p| p.takes.get_mut(i)?.fx.get_mut(fx as usize).map(f))
}

// ---- tempo map --------------------------------------------------------------

unsafe extern "C" fn mock_measure_info(
    _proj: *mut c_void,
    measure: c_int,
    qn_start: *mut f64,
    qn_end: *mut f64,
    timesig_num: *mut c_int,
    timesig_denom: *mut c_int,
    tempo: *mut f64,
) -> f64 {
    // Fixed 4/4 grid at the project tempo.
    let bpm = with_state(|p| p.bpm);
    let start_qn = measure as f64 * 4.0;
    if !qn_start.is_null() {
        *qn_start = start_qn;
    }
    if !qn_end.is_null() {
        *qn_end = start_qn + 4.0;
    }
    if !timesig_num.is_null() {
        *timesig_num = 4;
    }
    if !timesig_denom.is_null() {
        *timesig_denom = 4;
    }
    if !tempo.is_null() {
        *tempo = bpm;
    }
    start_qn * 60.0 / bpm
}

unsafe extern "C" fn mock_qn_to_time(_proj: *mut c_void, qn: f64) -> f64 {
    let bpm = with_state(|p| p.bpm);
    qn * 60.0 / bpm
}

unsafe extern "C" fn mock_time_to_qn(_proj: *mut c_void, time: f64) -> f64 {
    let bpm = with_state(|p| p.bpm);
    time * bpm / 60.0
}

// ---- project ----------------------------------------------------------------

unsafe extern "C" fn mock_update_arrange() {
    with_state(|p| p.update_arrange_calls += 1)
}

unsafe extern "C" fn mock_get_project_name(_proj: *mut c_void, buf: *mut c_char, sz: c_int) {
    let name = with_state(|p| p.name.clone());
    copy_out(&name, buf, sz);
}

unsafe extern "C" fn mock_get_project_length(_proj: *mut c_void) -> f64 {
    with_state(|p| {
        p.items
            .iter()
            .map(|it| it.position + it.length)
            .fold(0.0, f64::max)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_tracks_are_visible() {
        let _host = MockHost::install(MockProject::with_tracks(&["Drums", "Bass"]));
        let api = HostApi::get();
        assert_eq!(api.num_tracks(), 2);
        let props = api.track_props(api.get_track(1));
        assert_eq!(
            props.read_str(crate::host::prop::track_prop::NAME, 64),
            Some("Bass".to_string())
        );
    }

    #[test]
    fn test_hidden_capability_resolves_to_null() {
        let host = MockHost::install(MockProject::new().hide("GetProjectLength"));
        assert!(host.init.is_ok());
        assert_eq!(HostApi::get().project_length(), None);
    }

    #[test]
    fn test_default_effect_shape() {
        let _host = MockHost::install(MockProject::with_tracks(&["A"]));
        let api = HostApi::get();
        let tr = api.get_track(0);
        let idx = api.track_fx_add(tr, "Comp", false);
        assert_eq!(idx, 0);
        assert_eq!(api.track_fx_num_params(tr, idx), 2);
        assert_eq!(api.track_fx_param_name(tr, idx, 0), Some("Gain".to_string()));
        assert_eq!(api.track_fx_param(tr, idx, 0), Some((0.5, 0.0, 1.0)));
        assert_eq!(
            api.track_fx_param(tr, idx, 1),
            Some((1000.0, 20.0, 20000.0))
        );
    }

    #[test]
    fn test_tempo_grid() {
        let _host = MockHost::install(MockProject::new().with_bpm(120.0));
        let api = HostApi::get();
        // Quarter note at 120 BPM lasts half a second.
        assert_eq!(api.qn_to_time(4.0), Some(2.0));
        assert_eq!(api.time_to_qn(2.0), Some(4.0));
        let m = api.measure_info(1).unwrap();
        assert_eq!(m.qn_start, 4.0);
        assert_eq!(m.qn_end, 8.0);
        assert_eq!((m.timesig_num, m.timesig_denom), (4, 4));
        assert_eq!(m.tempo, 120.0);
    }
}
