//! Take handle.

use libc::{c_int, c_void};

use crate::fx::TakeFx;
use crate::gain::{db_to_linear, linear_to_db};
use crate::host::api::HostApi;
use crate::host::prop::{take_prop, PropAccessor};
use crate::host::types::{RawMediaTake, STR_BUF_LEN};
use crate::item::MediaItem;

/// Copyable value handle over one take inside a media item, keeping the
/// item that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Take {
    raw: *mut RawMediaTake,
    item: MediaItem,
}

impl Take {
    pub(crate) fn from_raw(raw: *mut RawMediaTake, item: MediaItem) -> Option<Take> {
        if raw.is_null() {
            None
        } else {
            Some(Take { raw, item })
        }
    }

    pub fn raw(&self) -> *mut RawMediaTake {
        self.raw
    }

    /// The item this take belongs to.
    pub fn item(&self) -> MediaItem {
        self.item
    }

    fn props(&self) -> PropAccessor {
        HostApi::get().take_props(self.raw)
    }

    pub fn name(&self) -> Option<String> {
        self.props().read_str(take_prop::NAME, STR_BUF_LEN)
    }

    pub fn set_name(&self, name: &str) -> &Self {
        self.props().write_str(take_prop::NAME, name);
        self
    }

    /// Take gain in dB, applied on top of the track fader.
    pub fn volume_db(&self) -> Option<f64> {
        self.props().read_f64(take_prop::VOLUME).map(linear_to_db)
    }

    pub fn set_volume_db(&self, db: f64) -> &Self {
        self.props().write_f64(take_prop::VOLUME, db_to_linear(db));
        self
    }

    pub fn pan(&self) -> Option<f64> {
        self.props().read_f64(take_prop::PAN)
    }

    pub fn set_pan(&self, pan: f64) -> &Self {
        self.props().write_f64(take_prop::PAN, pan);
        self
    }

    /// Opaque handle of the take's media source; only meaningful when
    /// handed back to the host.
    pub fn source(&self) -> Option<*mut c_void> {
        self.props().read_ptr(take_prop::SOURCE)
    }

    pub fn set_source(&self, source: *mut c_void) -> &Self {
        self.props().write_ptr(take_prop::SOURCE, source);
        self
    }

    // ---- effects ----

    pub fn add_fx(&self, name: &str) -> Option<TakeFx> {
        TakeFx::create(*self, name)
    }

    pub fn fx(&self, index: c_int) -> Option<TakeFx> {
        TakeFx::get(*self, index)
    }

    pub fn fx_count(&self) -> c_int {
        HostApi::get().take_fx_count(self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockHost, MockProject};
    use crate::item::MediaItem;
    use crate::track::Track;

    fn one_take() -> (MockHost, Take) {
        let host = MockHost::install(MockProject::with_tracks(&["A"]));
        let track = Track::find_by_index(0).unwrap();
        let item = MediaItem::create(track, 0.0, 1.0).unwrap();
        let take = item.add_take().unwrap();
        (host, take)
    }

    #[test]
    fn test_name_and_gain() {
        let (host, take) = one_take();
        take.set_name("vocal comp").set_volume_db(-6.0).set_pan(0.5);
        assert_eq!(take.name().as_deref(), Some("vocal comp"));
        assert!((take.volume_db().unwrap() + 6.0).abs() < 1e-9);
        assert_eq!(take.pan(), Some(0.5));
        let linear = host.with(|p| p.takes[0].volume);
        assert!((linear - 0.501187).abs() < 1e-6);
    }

    #[test]
    fn test_source_round_trip() {
        let (_host, take) = one_take();
        assert_eq!(take.source(), None);
        let fake = 0x5000_0000usize as *mut c_void;
        take.set_source(fake);
        assert_eq!(take.source(), Some(fake));
    }

    #[test]
    fn test_effects() {
        let (_host, take) = one_take();
        assert_eq!(take.fx_count(), 0);
        let fx = take.add_fx("Delay").unwrap();
        assert_eq!(take.fx_count(), 1);
        assert_eq!(fx.name().as_deref(), Some("Delay"));
        assert_eq!(take.fx(0), Some(fx));
        assert_eq!(take.fx(1), None);
    }
}
