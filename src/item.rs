//! Media item handle.

use libc::c_int;

use crate::host::api::HostApi;
use crate::host::types::RawMediaItem;
use crate::project::Project;
use crate::take::Take;
use crate::track::Track;

/// Copyable value handle over an item on a track's timeline, keeping the
/// track that produced it. Position and length are in seconds; the `_bar`
/// variants convert through the project tempo map first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MediaItem {
    raw: *mut RawMediaItem,
    track: Track,
}

impl MediaItem {
    /// New item on `track` at `position` seconds, `length` seconds long.
    pub fn create(track: Track, position: f64, length: f64) -> Option<MediaItem> {
        let item = MediaItem::from_raw(HostApi::get().add_item(track.raw()), track)?;
        item.set_position(position).set_length(length);
        Some(item)
    }

    /// New item on the musical grid: starts at 1-based `bar`, spans
    /// `length_bars` whole bars.
    pub fn create_at_bar(track: Track, bar: c_int, length_bars: c_int) -> Option<MediaItem> {
        let project = Project::current();
        let position = project.bar_to_time(bar)?;
        let length = project.bars_to_time(length_bars)?;
        MediaItem::create(track, position, length)
    }

    pub(crate) fn from_raw(raw: *mut RawMediaItem, track: Track) -> Option<MediaItem> {
        if raw.is_null() {
            None
        } else {
            Some(MediaItem { raw, track })
        }
    }

    pub fn raw(&self) -> *mut RawMediaItem {
        self.raw
    }

    /// The track this item lives on.
    pub fn track(&self) -> Track {
        self.track
    }

    pub fn position(&self) -> Option<f64> {
        HostApi::get().item_position(self.raw)
    }

    pub fn length(&self) -> Option<f64> {
        HostApi::get().item_length(self.raw)
    }

    pub fn set_position(&self, seconds: f64) -> &Self {
        HostApi::get().set_item_position(self.raw, seconds);
        self
    }

    pub fn set_length(&self, seconds: f64) -> &Self {
        HostApi::get().set_item_length(self.raw, seconds);
        self
    }

    /// Move the item to the start of a 1-based bar. Out-of-range bars leave
    /// the item where it is.
    pub fn set_position_at_bar(&self, bar: c_int) -> &Self {
        if let Some(seconds) = Project::current().bar_to_time(bar) {
            self.set_position(seconds);
        }
        self
    }

    /// Stretch the item to span a whole number of bars from the project
    /// start's grid.
    pub fn set_length_in_bars(&self, bars: c_int) -> &Self {
        if let Some(seconds) = Project::current().bars_to_time(bars) {
            self.set_length(seconds);
        }
        self
    }

    // ---- takes ----

    pub fn add_take(&self) -> Option<Take> {
        Take::from_raw(HostApi::get().add_take(self.raw), *self)
    }

    /// The take the item currently plays, if any.
    pub fn active_take(&self) -> Option<Take> {
        Take::from_raw(HostApi::get().active_take(self.raw), *self)
    }

    pub fn take_count(&self) -> c_int {
        HostApi::get().num_takes(self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockHost, MockProject};

    fn one_track() -> (MockHost, Track) {
        let host = MockHost::install(MockProject::with_tracks(&["A"]));
        let track = Track::find_by_index(0).unwrap();
        (host, track)
    }

    #[test]
    fn test_position_and_length_round_trip() {
        let (_host, track) = one_track();
        let item = MediaItem::create(track, 1.5, 4.0).unwrap();
        assert_eq!(item.position(), Some(1.5));
        assert_eq!(item.length(), Some(4.0));
        assert_eq!(item.track(), track);
    }

    #[test]
    fn test_grid_placement() {
        // 120 BPM in 4/4: each bar lasts two seconds.
        let (_host, track) = one_track();
        let item = MediaItem::create_at_bar(track, 3, 2).unwrap();
        assert_eq!(item.position(), Some(4.0));
        assert_eq!(item.length(), Some(4.0));
    }

    #[test]
    fn test_invalid_bar_leaves_item_untouched() {
        let (_host, track) = one_track();
        let item = MediaItem::create(track, 1.0, 2.0).unwrap();
        item.set_position_at_bar(0);
        assert_eq!(item.position(), Some(1.0));
    }

    #[test]
    fn test_takes() {
        let (_host, track) = one_track();
        let item = MediaItem::create(track, 0.0, 1.0).unwrap();
        assert_eq!(item.active_take(), None);
        assert_eq!(item.take_count(), 0);

        let first = item.add_take().unwrap();
        item.add_take().unwrap();
        assert_eq!(item.take_count(), 2);
        // The first take becomes active by default.
        assert_eq!(item.active_take(), Some(first));
    }
}
