//! Track handle.

use libc::c_int;

use crate::fx::TrackFx;
use crate::gain::{db_to_linear, linear_to_db};
use crate::host::api::HostApi;
use crate::host::prop::{track_prop, PropAccessor};
use crate::host::types::{FxChain, RawMediaTrack, STR_BUF_LEN};
use crate::item::MediaItem;

/// Copyable value handle over a host track. Carries no lifetime; validity
/// is the host's, checked per call. Mutators return `&Self` so setup code
/// chains naturally:
///
/// ```ignore
/// let track = Track::create("Bass")?;
/// track.set_volume_db(-6.0).set_pan(-0.25).set_mute(false);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Track {
    raw: *mut RawMediaTrack,
}

impl Track {
    /// Append a named track at the end of the project.
    pub fn create(name: &str) -> Option<Track> {
        Track::create_at(-1, name)
    }

    /// Insert a named track at `index`; negative appends.
    pub fn create_at(index: c_int, name: &str) -> Option<Track> {
        let raw = HostApi::get().insert_track(index, 1);
        if raw.is_null() {
            return None;
        }
        let track = Track { raw };
        track.set_name(name);
        Some(track)
    }

    /// Handle for the track at `index`, if the index is in range.
    pub fn find_by_index(index: c_int) -> Option<Track> {
        let api = HostApi::get();
        if index < 0 || index >= api.num_tracks() {
            return None;
        }
        let raw = api.get_track(index);
        if raw.is_null() {
            None
        } else {
            Some(Track { raw })
        }
    }

    /// First track whose name matches exactly.
    pub fn find_by_name(name: &str) -> Option<Track> {
        let api = HostApi::get();
        for index in 0..api.num_tracks() {
            let raw = api.get_track(index);
            if raw.is_null() {
                continue;
            }
            let track = Track { raw };
            if track.name().as_deref() == Some(name) {
                return Some(track);
            }
        }
        None
    }

    pub fn count() -> c_int {
        HostApi::get().num_tracks()
    }

    pub(crate) fn from_raw(raw: *mut RawMediaTrack) -> Option<Track> {
        if raw.is_null() {
            None
        } else {
            Some(Track { raw })
        }
    }

    pub fn raw(&self) -> *mut RawMediaTrack {
        self.raw
    }

    fn props(&self) -> PropAccessor {
        HostApi::get().track_props(self.raw)
    }

    // ---- properties ----

    pub fn name(&self) -> Option<String> {
        self.props().read_str(track_prop::NAME, STR_BUF_LEN)
    }

    pub fn set_name(&self, name: &str) -> &Self {
        self.props().write_str(track_prop::NAME, name);
        self
    }

    /// Volume in dB; negative infinity when the fader is at silence.
    pub fn volume_db(&self) -> Option<f64> {
        self.props().read_f64(track_prop::VOLUME).map(linear_to_db)
    }

    pub fn set_volume_db(&self, db: f64) -> &Self {
        self.props().write_f64(track_prop::VOLUME, db_to_linear(db));
        self
    }

    /// Pan position, -1.0 (left) to 1.0 (right).
    pub fn pan(&self) -> Option<f64> {
        self.props().read_f64(track_prop::PAN)
    }

    pub fn set_pan(&self, pan: f64) -> &Self {
        self.props().write_f64(track_prop::PAN, pan);
        self
    }

    pub fn is_muted(&self) -> Option<bool> {
        self.props().read_bool(track_prop::MUTE)
    }

    pub fn set_mute(&self, mute: bool) -> &Self {
        self.props().write_bool(track_prop::MUTE, mute);
        self
    }

    pub fn is_soloed(&self) -> Option<bool> {
        self.props().read_i32(track_prop::SOLO).map(|v| v != 0)
    }

    pub fn set_solo(&self, solo: bool) -> &Self {
        self.props().write_i32(track_prop::SOLO, solo.into());
        self
    }

    // ---- items ----

    /// New empty item on this track.
    pub fn add_clip(&self, position: f64, length: f64) -> Option<MediaItem> {
        MediaItem::create(*self, position, length)
    }

    /// New empty item positioned on the musical grid. `bar` is 1-based.
    pub fn add_clip_at_bar(&self, bar: c_int, length_bars: c_int) -> Option<MediaItem> {
        MediaItem::create_at_bar(*self, bar, length_bars)
    }

    pub fn item(&self, index: c_int) -> Option<MediaItem> {
        MediaItem::from_raw(HostApi::get().track_item(self.raw, index), *self)
    }

    pub fn item_count(&self) -> c_int {
        HostApi::get().num_track_items(self.raw)
    }

    pub fn items(&self) -> Vec<MediaItem> {
        (0..self.item_count()).filter_map(|i| self.item(i)).collect()
    }

    pub fn has_items(&self) -> bool {
        self.item_count() > 0
    }

    // ---- effects ----

    /// Add an effect to the output chain.
    pub fn add_fx(&self, name: &str) -> Option<TrackFx> {
        TrackFx::create(*self, name, FxChain::Normal)
    }

    /// Add an instrument by name, chaining on the track itself rather than
    /// handing back the effect slot.
    pub fn add_instrument(&self, name: &str) -> &Self {
        let _ = TrackFx::create(*self, name, FxChain::Normal);
        self
    }

    /// Add an effect to the record-path (input) chain.
    pub fn add_input_fx(&self, name: &str) -> Option<TrackFx> {
        TrackFx::create(*self, name, FxChain::Input)
    }

    pub fn fx(&self, index: c_int) -> Option<TrackFx> {
        TrackFx::get(*self, FxChain::Normal, index)
    }

    pub fn input_fx(&self, index: c_int) -> Option<TrackFx> {
        TrackFx::get(*self, FxChain::Input, index)
    }

    pub fn fx_count(&self) -> c_int {
        HostApi::get().track_fx_count(self.raw)
    }

    pub fn input_fx_count(&self) -> c_int {
        HostApi::get().track_fx_rec_count(self.raw)
    }

    /// Every effect slot on one chain, in host order.
    pub fn fx_chain(&self, chain: FxChain) -> Vec<TrackFx> {
        let count = match chain {
            FxChain::Normal => self.fx_count(),
            FxChain::Input => self.input_fx_count(),
        };
        (0..count).filter_map(|i| TrackFx::get(*self, chain, i)).collect()
    }

    pub fn has_fx(&self) -> bool {
        self.fx_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockHost, MockProject};

    #[test]
    fn test_create_appends_named_track() {
        let host = MockHost::install(MockProject::with_tracks(&["Drums"]));
        let track = Track::create("Bass").unwrap();
        assert_eq!(Track::count(), 2);
        assert_eq!(track.name().as_deref(), Some("Bass"));
        assert_eq!(host.with(|p| p.tracks[1].name.clone()), "Bass");
    }

    #[test]
    fn test_create_at_inserts_in_order() {
        let _host = MockHost::install(MockProject::with_tracks(&["A", "C"]));
        let track = Track::create_at(1, "B").unwrap();
        assert_eq!(track.name().as_deref(), Some("B"));
        assert_eq!(Track::find_by_index(1), Some(track));
        assert_eq!(
            Track::find_by_index(2).unwrap().name().as_deref(),
            Some("C")
        );
    }

    #[test]
    fn test_find_by_index_validates_range() {
        let _host = MockHost::install(MockProject::with_tracks(&["A"]));
        assert!(Track::find_by_index(0).is_some());
        assert_eq!(Track::find_by_index(1), None);
        assert_eq!(Track::find_by_index(-1), None);
    }

    #[test]
    fn test_find_by_name_returns_first_match() {
        let _host = MockHost::install(MockProject::with_tracks(&["A", "B", "B"]));
        let track = Track::find_by_name("B").unwrap();
        assert_eq!(track, Track::find_by_index(1).unwrap());
        assert_eq!(Track::find_by_name("Z"), None);
    }

    #[test]
    fn test_chaining_setters() {
        let host = MockHost::install(MockProject::with_tracks(&["A"]));
        let track = Track::find_by_index(0).unwrap();
        track
            .set_name("Lead")
            .set_volume_db(-6.0)
            .set_pan(-0.25)
            .set_mute(true)
            .set_solo(true);
        assert_eq!(track.name().as_deref(), Some("Lead"));
        assert!((track.volume_db().unwrap() + 6.0).abs() < 1e-9);
        assert_eq!(track.pan(), Some(-0.25));
        assert_eq!(track.is_muted(), Some(true));
        assert_eq!(track.is_soloed(), Some(true));
        // Exactly one dB conversion happened on the way down.
        let linear = host.with(|p| p.tracks[0].volume);
        assert!((linear - 0.501187).abs() < 1e-6);
    }

    #[test]
    fn test_items_and_fx_presence() {
        let _host = MockHost::install(MockProject::with_tracks(&["A"]));
        let track = Track::find_by_index(0).unwrap();
        assert!(!track.has_items());
        assert!(!track.has_fx());

        track.add_clip(1.0, 2.0).unwrap();
        track.add_fx("Comp").unwrap();
        track.add_fx("Limiter").unwrap();
        assert!(track.has_items());
        assert!(track.has_fx());
        assert_eq!(track.items().len(), 1);

        let chain = track.fx_chain(FxChain::Normal);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[1].name().as_deref(), Some("Limiter"));
        assert!(track.fx_chain(FxChain::Input).is_empty());
    }

    #[test]
    fn test_add_instrument_chains() {
        let _host = MockHost::install(MockProject::with_tracks(&["A"]));
        let track = Track::find_by_index(0).unwrap();
        track.add_instrument("Sampler").set_volume_db(-3.0);
        assert_eq!(track.fx(0).unwrap().name().as_deref(), Some("Sampler"));
    }

    #[test]
    fn test_handles_are_copy_and_stable() {
        let _host = MockHost::install(MockProject::with_tracks(&["A"]));
        let a = Track::find_by_index(0).unwrap();
        let b = a;
        b.set_name("renamed");
        assert_eq!(a.name().as_deref(), Some("renamed"));
    }
}
