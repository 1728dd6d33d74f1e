//! End-to-end session construction against the mock host.

use hostbind::host::mock::{MockHost, MockProject};
use hostbind::{FxChain, HostApi, Project, Track};

#[test]
fn test_build_a_session() {
    let host = MockHost::install(MockProject::new().with_name("Demo").with_bpm(120.0));
    assert!(host.init.is_ok());
    assert!(HostApi::is_available());

    let project = Project::current();
    assert_eq!(project.name().as_deref(), Some("Demo"));
    assert!(!project.has_tracks());

    // Two tracks with basic mix settings.
    let drums = Track::create("Drums").unwrap();
    let bass = Track::create("Bass").unwrap();
    drums.set_volume_db(0.0).set_pan(0.0);
    bass.set_volume_db(-6.0).set_pan(-0.3).set_mute(false);
    assert_eq!(project.track_count(), 2);
    assert_eq!(Track::find_by_name("Bass"), Some(bass));

    // A four-bar clip starting at bar 3: bars are two seconds at 120 BPM.
    let clip = bass.add_clip_at_bar(3, 4).unwrap();
    assert_eq!(clip.position(), Some(4.0));
    assert_eq!(clip.length(), Some(8.0));
    assert_eq!(project.time_to_bar(clip.position().unwrap()), Some(3));

    // A named take with gain trim.
    let take = clip.add_take().unwrap();
    take.set_name("di").set_volume_db(-3.0);
    assert_eq!(clip.active_take(), Some(take));
    assert_eq!(take.name().as_deref(), Some("di"));

    // Effects on both chains plus one on the take.
    let comp = bass.add_fx("Compressor").unwrap();
    let gate = bass.add_input_fx("Gate").unwrap();
    let chorus = take.add_fx("Chorus").unwrap();
    assert_eq!(comp.chain(), FxChain::Normal);
    assert_eq!(gate.chain(), FxChain::Input);
    assert!(comp.set_param_normalized(0, 0.25));
    assert_eq!(comp.param(0).unwrap().value, 0.25);
    assert_eq!(chorus.name().as_deref(), Some("Chorus"));
    assert_eq!(bass.fx_count(), 1);
    assert_eq!(bass.input_fx_count(), 1);

    // Project length follows the clip.
    assert_eq!(project.length(), Some(12.0));

    project.update_arrange();
    assert_eq!(host.update_arrange_calls(), 1);
}

#[test]
fn test_degraded_host_still_usable() {
    // A host missing the item capabilities: tracks still work, items
    // uniformly come back empty instead of erroring.
    let host = MockHost::install(
        MockProject::with_tracks(&["A"])
            .hide("AddMediaItemToTrack")
            .hide("CountTrackMediaItems"),
    );
    assert!(host.init.is_ok());

    let track = Track::find_by_index(0).unwrap();
    assert_eq!(track.name().as_deref(), Some("A"));
    assert_eq!(track.add_clip(0.0, 1.0), None);
    assert!(!track.has_items());

    let report = HostApi::get().capability_report();
    assert_eq!(report.missing.len(), 2);
    assert!(report.missing.contains(&"AddMediaItemToTrack".to_string()));
}

#[test]
fn test_capability_report_persists() {
    let host = MockHost::install(MockProject::new().hide("TakeFX_Delete"));
    assert!(host.init.is_ok());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("host_capabilities.json");
    let report = HostApi::get().capability_report();
    report.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"TakeFX_Delete\""));
    assert!(report.summary().ends_with("1 missing"));
}
