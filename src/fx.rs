//! Effect handles.
//!
//! Track effects live in one of two chains, the output chain and the
//! record-path (input) chain. The host addresses both through the same
//! capability set, with input-chain slots offset into a reserved index
//! range; [`crate::host::types::FxChain::host_index`] owns that encoding,
//! and the handles here always store the chain-local index.

use libc::c_int;

use crate::host::api::HostApi;
use crate::host::types::FxChain;
use crate::take::Take;
use crate::track::Track;

/// Value and host-reported range of one effect parameter.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FxParam {
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

/// Copyable value handle over one effect slot on a track.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackFx {
    track: Track,
    chain: FxChain,
    index: c_int,
}

impl TrackFx {
    /// Instantiate an effect by name at the end of the chain.
    pub fn create(track: Track, name: &str, chain: FxChain) -> Option<TrackFx> {
        let index = HostApi::get().track_fx_add(track.raw(), name, chain == FxChain::Input);
        if index < 0 {
            return None;
        }
        Some(TrackFx { track, chain, index })
    }

    /// Handle for an existing slot, validated against the chain's count.
    pub fn get(track: Track, chain: FxChain, index: c_int) -> Option<TrackFx> {
        let api = HostApi::get();
        let count = match chain {
            FxChain::Normal => api.track_fx_count(track.raw()),
            FxChain::Input => api.track_fx_rec_count(track.raw()),
        };
        if index < 0 || index >= count {
            return None;
        }
        Some(TrackFx { track, chain, index })
    }

    pub fn chain(&self) -> FxChain {
        self.chain
    }

    /// Chain-local slot index.
    pub fn index(&self) -> c_int {
        self.index
    }

    fn host_index(&self) -> c_int {
        self.chain.host_index(self.index)
    }

    pub fn name(&self) -> Option<String> {
        HostApi::get().track_fx_name(self.track.raw(), self.host_index())
    }

    pub fn param_count(&self) -> c_int {
        HostApi::get().track_fx_num_params(self.track.raw(), self.host_index())
    }

    pub fn param_name(&self, param: c_int) -> Option<String> {
        HostApi::get().track_fx_param_name(self.track.raw(), self.host_index(), param)
    }

    pub fn param(&self, param: c_int) -> Option<FxParam> {
        let (value, min, max) =
            HostApi::get().track_fx_param(self.track.raw(), self.host_index(), param)?;
        Some(FxParam { value, min, max })
    }

    pub fn set_param(&self, param: c_int, value: f64) -> bool {
        HostApi::get().track_fx_set_param(self.track.raw(), self.host_index(), param, value)
    }

    /// Parameter value mapped to 0..1 over its range.
    pub fn param_normalized(&self, param: c_int) -> Option<f64> {
        HostApi::get().track_fx_param_normalized(self.track.raw(), self.host_index(), param)
    }

    pub fn set_param_normalized(&self, param: c_int, value: f64) -> bool {
        HostApi::get().track_fx_set_param_normalized(
            self.track.raw(),
            self.host_index(),
            param,
            value,
        )
    }

    /// Host-formatted display text for a parameter value.
    pub fn format_param(&self, param: c_int, value: f64) -> Option<String> {
        HostApi::get().track_fx_format_param(self.track.raw(), self.host_index(), param, value)
    }

    pub fn is_enabled(&self) -> bool {
        HostApi::get().track_fx_enabled(self.track.raw(), self.host_index())
    }

    pub fn set_enabled(&self, enabled: bool) -> bool {
        HostApi::get().track_fx_set_enabled(self.track.raw(), self.host_index(), enabled)
    }

    /// Remove the effect from its chain. Consumes the handle; indices of
    /// later slots shift down, so any other handles into this chain are
    /// stale after this.
    pub fn delete(self) -> bool {
        HostApi::get().track_fx_delete(self.track.raw(), self.host_index())
    }

    pub fn param_names(&self) -> Vec<String> {
        (0..self.param_count())
            .filter_map(|i| self.param_name(i))
            .collect()
    }

    pub fn param_values(&self) -> Vec<f64> {
        (0..self.param_count())
            .filter_map(|i| self.param(i).map(|p| p.value))
            .collect()
    }
}

/// Copyable value handle over one effect slot on a take. Takes have a
/// single chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TakeFx {
    take: Take,
    index: c_int,
}

impl TakeFx {
    pub fn create(take: Take, name: &str) -> Option<TakeFx> {
        let index = HostApi::get().take_fx_add(take.raw(), name);
        if index < 0 {
            return None;
        }
        Some(TakeFx { take, index })
    }

    pub fn get(take: Take, index: c_int) -> Option<TakeFx> {
        let count = HostApi::get().take_fx_count(take.raw());
        if index < 0 || index >= count {
            return None;
        }
        Some(TakeFx { take, index })
    }

    pub fn index(&self) -> c_int {
        self.index
    }

    pub fn name(&self) -> Option<String> {
        HostApi::get().take_fx_name(self.take.raw(), self.index)
    }

    pub fn param_count(&self) -> c_int {
        HostApi::get().take_fx_num_params(self.take.raw(), self.index)
    }

    pub fn param_name(&self, param: c_int) -> Option<String> {
        HostApi::get().take_fx_param_name(self.take.raw(), self.index, param)
    }

    pub fn param(&self, param: c_int) -> Option<FxParam> {
        let (value, min, max) = HostApi::get().take_fx_param(self.take.raw(), self.index, param)?;
        Some(FxParam { value, min, max })
    }

    pub fn set_param(&self, param: c_int, value: f64) -> bool {
        HostApi::get().take_fx_set_param(self.take.raw(), self.index, param, value)
    }

    pub fn param_normalized(&self, param: c_int) -> Option<f64> {
        HostApi::get().take_fx_param_normalized(self.take.raw(), self.index, param)
    }

    pub fn set_param_normalized(&self, param: c_int, value: f64) -> bool {
        HostApi::get().take_fx_set_param_normalized(self.take.raw(), self.index, param, value)
    }

    pub fn format_param(&self, param: c_int, value: f64) -> Option<String> {
        HostApi::get().take_fx_format_param(self.take.raw(), self.index, param, value)
    }

    pub fn is_enabled(&self) -> bool {
        HostApi::get().take_fx_enabled(self.take.raw(), self.index)
    }

    pub fn set_enabled(&self, enabled: bool) -> bool {
        HostApi::get().take_fx_set_enabled(self.take.raw(), self.index, enabled)
    }

    pub fn delete(self) -> bool {
        HostApi::get().take_fx_delete(self.take.raw(), self.index)
    }

    pub fn param_names(&self) -> Vec<String> {
        (0..self.param_count())
            .filter_map(|i| self.param_name(i))
            .collect()
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
    fn test_create_and_inspect() {
        let (_host, track) = one_track();
        let fx = track.add_fx("Comp").unwrap();
        assert_eq!(fx.name().as_deref(), Some("Comp"));
        assert_eq!(fx.param_count(), 2);
        assert_eq!(fx.param_names(), vec!["Gain", "Frequency"]);
        assert_eq!(fx.param_values(), vec![0.5, 1000.0]);
    }

    #[test]
    fn test_get_validates_index() {
        let (_host, track) = one_track();
        track.add_fx("Comp").unwrap();
        assert!(TrackFx::get(track, FxChain::Normal, 0).is_some());
        assert_eq!(TrackFx::get(track, FxChain::Normal, 1), None);
        assert_eq!(TrackFx::get(track, FxChain::Normal, -1), None);
        // The input chain is empty, its counts are independent.
        assert_eq!(TrackFx::get(track, FxChain::Input, 0), None);
    }

    #[test]
    fn test_param_round_trip() {
        let (host, track) = one_track();
        let fx = track.add_fx("Filter").unwrap();
        assert!(fx.set_param(1, 440.0));
        assert_eq!(
            fx.param(1),
            Some(FxParam { value: 440.0, min: 20.0, max: 20000.0 })
        );
        assert_eq!(host.with(|p| p.tracks[0].fx[0].params[1].value), 440.0);
        assert!(!fx.set_param(7, 1.0));
        assert_eq!(fx.param(7), None);
    }

    #[test]
    fn test_normalized_params() {
        let (_host, track) = one_track();
        let fx = track.add_fx("Comp").unwrap();
        assert!(fx.set_param_normalized(0, 0.75));
        assert_eq!(fx.param(0).unwrap().value, 0.75);
        assert_eq!(fx.param_normalized(0), Some(0.75));
        // Out-of-range input clamps to the parameter range.
        assert!(fx.set_param_normalized(0, 2.0));
        assert_eq!(fx.param(0).unwrap().value, 1.0);
    }

    #[test]
    fn test_format_param() {
        let (_host, track) = one_track();
        let fx = track.add_fx("Comp").unwrap();
        assert_eq!(fx.format_param(0, 0.5).as_deref(), Some("0.50"));
        assert_eq!(fx.format_param(9, 0.5), None);
    }

    #[test]
    fn test_enable_and_delete() {
        let (host, track) = one_track();
        let fx = track.add_fx("Comp").unwrap();
        assert!(fx.is_enabled());
        assert!(fx.set_enabled(false));
        assert!(!fx.is_enabled());

        assert!(fx.delete());
        assert_eq!(track.fx_count(), 0);
        assert!(host.with(|p| p.tracks[0].fx.is_empty()));
    }

    #[test]
    fn test_input_chain_is_separate() {
        let (host, track) = one_track();
        let out = track.add_fx("Comp").unwrap();
        let input = track.add_input_fx("Gate").unwrap();
        assert_eq!(out.index(), 0);
        assert_eq!(input.index(), 0);
        assert_eq!(track.fx_count(), 1);
        assert_eq!(track.input_fx_count(), 1);
        assert_eq!(input.name().as_deref(), Some("Gate"));
        assert_eq!(out.name().as_deref(), Some("Comp"));

        // Operations land on the right chain.
        assert!(input.set_param(0, 0.9));
        assert_eq!(host.with(|p| p.tracks[0].input_fx[0].params[0].value), 0.9);
        assert_eq!(host.with(|p| p.tracks[0].fx[0].params[0].value), 0.5);

        assert!(input.delete());
        assert_eq!(track.input_fx_count(), 0);
        assert_eq!(track.fx_count(), 1);
    }

    #[test]
    fn test_take_fx_mirrors_track_fx() {
        let (_host, track) = one_track();
        let item = crate::item::MediaItem::create(track, 0.0, 1.0).unwrap();
        let take = item.add_take().unwrap();
        let fx = take.add_fx("Chorus").unwrap();
        assert_eq!(fx.name().as_deref(), Some("Chorus"));
        assert_eq!(fx.param_names(), vec!["Gain", "Frequency"]);
        assert!(fx.set_param_normalized(1, 0.0));
        assert_eq!(fx.param(1).unwrap().value, 20.0);
        assert_eq!(fx.format_param(0, 0.25).as_deref(), Some("0.25"));
        assert!(fx.delete());
        assert_eq!(take.fx_count(), 0);
    }
}
