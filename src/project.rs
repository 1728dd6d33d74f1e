//! Project-level operations and musical position arithmetic.
//!
//! Bars are 1-based as shown in the host UI; the tempo map underneath
//! counts 0-based measures. All conversions route time through beats
//! (quarter notes) via the host tempo map, so they follow the project's
//! actual tempo.
//!
//! `time_to_bar` assumes four beats per bar when mapping beats to a bar
//! number; it is only exact in 4/4. The time-to-beat step itself is still
//! tempo-map accurate.

use libc::c_int;

use crate::host::api::HostApi;
use crate::host::types::RawMediaItem;
use crate::item::MediaItem;
use crate::track::Track;

/// Handle over the currently open project.
#[derive(Clone, Copy, Debug, Default)]
pub struct Project;

impl Project {
    pub fn current() -> Project {
        Project
    }

    pub fn name(&self) -> Option<String> {
        HostApi::get().project_name()
    }

    /// Project length in seconds.
    pub fn length(&self) -> Option<f64> {
        HostApi::get().project_length()
    }

    /// Tempo at the project start, in BPM.
    pub fn tempo(&self) -> Option<f64> {
        Some(HostApi::get().measure_info(0)?.tempo)
    }

    /// Time signature at the project start.
    pub fn time_signature(&self) -> Option<(c_int, c_int)> {
        let m = HostApi::get().measure_info(0)?;
        Some((m.timesig_num, m.timesig_denom))
    }

    // ---- position arithmetic ----

    /// Start time in seconds of a 1-based bar. Bar 1 is the project start.
    pub fn bar_to_time(&self, bar: c_int) -> Option<f64> {
        if bar < 1 {
            return None;
        }
        let api = HostApi::get();
        let measure = api.measure_info(bar - 1)?;
        api.qn_to_time(measure.qn_start)
    }

    /// 1-based bar containing a time position. Negative times have no bar.
    pub fn time_to_bar(&self, time: f64) -> Option<c_int> {
        if time < 0.0 {
            return None;
        }
        let qn = HostApi::get().time_to_qn(time)?;
        // Four beats per bar; see the module note on non-4/4 meters.
        Some((qn / 4.0).floor() as c_int + 1)
    }

    /// Duration in seconds of the first `bars` bars: start of bar
    /// `bars + 1` minus start of bar 1.
    pub fn bars_to_time(&self, bars: c_int) -> Option<f64> {
        if bars < 0 {
            return None;
        }
        let api = HostApi::get();
        let origin = api.measure_info(0)?;
        let end = api.measure_info(bars)?;
        Some(api.qn_to_time(end.qn_start)? - api.qn_to_time(origin.qn_start)?)
    }

    // ---- contents ----

    pub fn track(&self, index: c_int) -> Option<Track> {
        Track::find_by_index(index)
    }

    pub fn track_count(&self) -> c_int {
        Track::count()
    }

    pub fn tracks(&self) -> Vec<Track> {
        (0..self.track_count()).filter_map(Track::find_by_index).collect()
    }

    pub fn has_tracks(&self) -> bool {
        self.track_count() > 0
    }

    pub fn selected_tracks(&self, include_master: bool) -> Vec<Track> {
        let api = HostApi::get();
        (0..api.num_selected_tracks(include_master))
            .filter_map(|i| Track::from_raw(api.selected_track(i, include_master)))
            .collect()
    }

    /// Selected items, each paired with its owning track. The host only
    /// reports raw item handles here, so the owner is recovered by scanning
    /// the tracks' item lists.
    pub fn selected_items(&self) -> Vec<MediaItem> {
        let api = HostApi::get();
        (0..api.num_selected_items())
            .filter_map(|i| {
                let raw = api.selected_item(i);
                let track = self.owning_track(raw)?;
                MediaItem::from_raw(raw, track)
            })
            .collect()
    }

    fn owning_track(&self, item: *mut RawMediaItem) -> Option<Track> {
        if item.is_null() {
            return None;
        }
        let api = HostApi::get();
        self.tracks().into_iter().find(|t| {
            (0..api.num_track_items(t.raw())).any(|i| api.track_item(t.raw(), i) == item)
        })
    }

    pub fn has_selected_tracks(&self, include_master: bool) -> bool {
        HostApi::get().num_selected_tracks(include_master) > 0
    }

    pub fn has_selected_items(&self) -> bool {
        HostApi::get().num_selected_items() > 0
    }

    /// Ask the host to repaint the arrangement after a batch of edits.
    pub fn update_arrange(&self) {
        HostApi::get().update_arrange()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{MockHost, MockProject};

    #[test]
    fn test_bar_to_time_grid() {
        // 120 BPM in 4/4: one bar every two seconds.
        let _host = MockHost::install(MockProject::new().with_bpm(120.0));
        let project = Project::current();
        assert_eq!(project.bar_to_time(1), Some(0.0));
        assert_eq!(project.bar_to_time(2), Some(2.0));
        assert_eq!(project.bar_to_time(5), Some(8.0));
        assert_eq!(project.bar_to_time(0), None);
        assert_eq!(project.bar_to_time(-3), None);
    }

    #[test]
    fn test_time_to_bar() {
        let _host = MockHost::install(MockProject::new().with_bpm(120.0));
        let project = Project::current();
        assert_eq!(project.time_to_bar(0.0), Some(1));
        assert_eq!(project.time_to_bar(1.9), Some(1));
        assert_eq!(project.time_to_bar(2.0), Some(2));
        assert_eq!(project.time_to_bar(-0.1), None);
    }

    #[test]
    fn test_bars_to_time_is_a_duration() {
        let _host = MockHost::install(MockProject::new().with_bpm(120.0));
        let project = Project::current();
        assert_eq!(project.bars_to_time(0), Some(0.0));
        assert_eq!(project.bars_to_time(1), Some(2.0));
        assert_eq!(project.bars_to_time(4), Some(8.0));
        assert_eq!(project.bars_to_time(-1), None);
        // Monotone and additive while the tempo is stable.
        for n in 1..4 {
            let here = project.bars_to_time(n).unwrap();
            let next = project.bars_to_time(n + 1).unwrap();
            assert!(next > here);
            assert!((next - here - 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_grid_follows_tempo() {
        let _host = MockHost::install(MockProject::new().with_bpm(60.0));
        let project = Project::current();
        assert_eq!(project.tempo(), Some(60.0));
        assert_eq!(project.bar_to_time(2), Some(4.0));
        assert_eq!(project.time_to_bar(4.0), Some(2));
    }

    #[test]
    fn test_metadata() {
        let _host = MockHost::install(MockProject::new().with_name("Demo Session"));
        let project = Project::current();
        assert_eq!(project.name().as_deref(), Some("Demo Session"));
        assert_eq!(project.time_signature(), Some((4, 4)));
        assert_eq!(project.length(), Some(0.0));
    }

    #[test]
    fn test_length_tracks_items() {
        let _host = MockHost::install(MockProject::with_tracks(&["A"]));
        let project = Project::current();
        let track = project.track(0).unwrap();
        track.add_clip(2.0, 3.0).unwrap();
        assert_eq!(project.length(), Some(5.0));
    }

    #[test]
    fn test_selections() {
        let host = MockHost::install(MockProject::with_tracks(&["A", "B"]));
        let project = Project::current();
        assert!(!project.has_selected_tracks(false));
        assert!(!project.has_selected_items());

        project.track(0).unwrap().add_clip(0.0, 1.0).unwrap();
        host.with(|p| {
            p.select_track(1);
            p.select_item(0, 0);
        });

        let tracks = project.selected_tracks(false);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].name().as_deref(), Some("B"));

        let items = project.selected_items();
        assert_eq!(items.len(), 1);
        // The owning track is recovered from the raw selection handle.
        assert_eq!(items[0].track().name().as_deref(), Some("A"));
    }

    #[test]
    fn test_update_arrange_reaches_host() {
        let host = MockHost::install(MockProject::new());
        Project::current().update_arrange();
        Project::current().update_arrange();
        assert_eq!(host.update_arrange_calls(), 2);
    }
}
