use cgmath::Vector3;
use flow_ar::{
    config::{ArConfig, EmulationConfig},
    placement::{ActiveSession, FrameOutcome, PlacementController},
    xr::{
        ReferenceSpaceType, SessionInit, SessionMode, XrError, XrFrame, XrHitTestResult,
        XrSession, XrSystem,
        emulated::{EmulatedSession, EmulatedXr},
    },
};
use futures::executor::block_on;

use crate::common::test_utils::{RecordingRenderer, assert_near, two_box_model};

mod common;

fn session() -> EmulatedSession {
    let xr = EmulatedXr::new(EmulationConfig::default());
    let init = ArConfig::default().session.to_session_init();
    block_on(xr.request_session(SessionMode::ImmersiveAr, &init)).unwrap()
}

/// Where the default rig (1.6 m eye height, 30° down) looks at the floor.
fn default_hit() -> Vector3<f32> {
    Vector3::new(0.0, 0.0, -1.6 / 30.0_f32.to_radians().tan())
}

#[test]
fn sessions_need_every_required_feature() {
    let xr = EmulatedXr::new(EmulationConfig::default()).with_supported_features(&["dom-overlay"]);
    let init = SessionInit {
        required_features: vec!["hit-test".to_string()],
        ..Default::default()
    };

    let result = block_on(xr.request_session(SessionMode::ImmersiveAr, &init));

    assert_eq!(result.err(), Some(XrError::MissingFeature("hit-test".to_string())));
}

#[test]
fn unavailable_optional_features_are_skipped() {
    let xr = EmulatedXr::new(EmulationConfig::default()).with_supported_features(&["hit-test"]);
    let init = ArConfig::default().session.to_session_init();

    let session = block_on(xr.request_session(SessionMode::ImmersiveAr, &init)).unwrap();

    assert_eq!(session.enabled_features(), ["hit-test".to_string()]);
}

#[test]
fn vr_sessions_are_not_supported() {
    let xr = EmulatedXr::new(EmulationConfig::default());
    assert!(!block_on(xr.is_session_supported(SessionMode::ImmersiveVr)));
    assert!(block_on(xr.is_session_supported(SessionMode::ImmersiveAr)));
}

#[test]
fn looking_down_hits_the_floor() {
    let mut session = session();
    let viewer = block_on(session.request_reference_space(ReferenceSpaceType::Viewer)).unwrap();
    let floor = block_on(session.request_reference_space(ReferenceSpaceType::LocalFloor)).unwrap();
    let source = block_on(session.request_hit_test_source(&viewer)).unwrap();

    let frame = session.frame().unwrap();
    let hits = frame.hit_test_results(&source);

    assert_eq!(hits.len(), 1);
    let pose = hits[0].pose(&floor).unwrap();
    assert_near(pose.position(), default_hit());
}

#[test]
fn hits_are_relative_to_the_requested_space() {
    let mut session = session();
    let viewer = block_on(session.request_reference_space(ReferenceSpaceType::Viewer)).unwrap();
    let local = block_on(session.request_reference_space(ReferenceSpaceType::Local)).unwrap();
    let source = block_on(session.request_hit_test_source(&viewer)).unwrap();

    let frame = session.frame().unwrap();
    let pose = frame.hit_test_results(&source)[0].pose(&local).unwrap();

    // `local` starts at eye height
    assert_near(pose.position(), default_hit() - Vector3::new(0.0, 1.6, 0.0));
}

#[test]
fn looking_up_misses() {
    let mut session = session();
    session.viewer_mut().pitch = 20.0_f32.to_radians();
    let viewer = block_on(session.request_reference_space(ReferenceSpaceType::Viewer)).unwrap();
    let source = block_on(session.request_hit_test_source(&viewer)).unwrap();

    let frame = session.frame().unwrap();

    assert!(frame.hit_test_results(&source).is_empty());
}

#[test]
fn cancelled_sources_report_nothing() {
    let mut session = session();
    let viewer = block_on(session.request_reference_space(ReferenceSpaceType::Viewer)).unwrap();
    let source = block_on(session.request_hit_test_source(&viewer)).unwrap();
    assert_eq!(session.active_hit_test_sources(), 1);

    session.cancel_hit_test_source(&source);

    assert_eq!(session.active_hit_test_sources(), 0);
    assert!(session.frame().unwrap().hit_test_results(&source).is_empty());
}

#[test]
fn bounded_spaces_are_unavailable() {
    let mut session = session();
    let result = block_on(session.request_reference_space(ReferenceSpaceType::BoundedFloor));
    assert_eq!(
        result.err(),
        Some(XrError::ReferenceSpaceUnavailable(ReferenceSpaceType::BoundedFloor))
    );
}

#[test]
fn ended_sessions_have_no_frames() {
    let mut session = session();
    session.end();

    assert!(session.is_ended());
    assert!(session.frame().is_none());
    assert_eq!(
        block_on(session.request_reference_space(ReferenceSpaceType::Viewer)).err(),
        Some(XrError::SessionEnded)
    );
}

#[test]
fn viewer_pose_in_local_floor_is_the_rig_pose() {
    let mut session = session();
    let floor = block_on(session.request_reference_space(ReferenceSpaceType::LocalFloor)).unwrap();

    let pose = session.frame().unwrap().viewer_pose(&floor).unwrap();

    assert_eq!(pose.transform, session.viewer().pose());
    assert_near(pose.position(), Vector3::new(0.0, 1.6, 0.0));
}

#[test]
fn selected_model_lands_where_the_viewer_looks() {
    let mut controller =
        PlacementController::from_model(&ArConfig::default(), two_box_model(), 640, 480).unwrap();
    let item = controller.item();
    controller.select(item);
    let active = block_on(ActiveSession::start(session(), ReferenceSpaceType::LocalFloor)).unwrap();
    let mut renderer = RecordingRenderer::watching(item);

    let frame = active.session().frame();
    let outcome = active
        .on_frame(&mut controller, 0.0, frame.as_ref(), &mut renderer)
        .unwrap();

    let FrameOutcome::Placed(position) = outcome else {
        panic!("expected a placement, got {:?}", outcome);
    };
    assert_near(position, default_hit());
    assert_eq!(controller.camera().pose, active.session().viewer().pose());
    assert_eq!(renderer.watched_visible, vec![true]);
    assert_eq!(active.session().active_hit_test_sources(), 1);
}
