use std::cell::Cell;

use cgmath::{Matrix4, Vector3};
use flow_ar::{
    config::ArConfig,
    placement::{ActiveSession, FrameOutcome, PlacementController},
    xr::{Pose, ReferenceSpaceType, XrError},
};
use futures::{FutureExt, executor::block_on};

use crate::common::test_utils::{MockFrame, MockSession, RecordingRenderer, two_box_model};

mod common;

fn controller() -> PlacementController {
    PlacementController::from_model(&ArConfig::default(), two_box_model(), 800, 600).unwrap()
}

fn started(session: MockSession) -> ActiveSession<MockSession> {
    block_on(ActiveSession::start(session, ReferenceSpaceType::LocalFloor)).unwrap()
}

#[test]
fn asset_is_hidden_until_selected() {
    let mut controller = controller();
    let item = controller.item();

    assert_eq!(controller.selected(), None);
    assert!(!controller.scene().get(item).unwrap().visible);

    controller.select(item);
    assert_eq!(controller.selected(), Some(item));
    assert!(!controller.scene().get(item).unwrap().visible);
}

#[test]
fn scene_has_light_and_camera_from_config() {
    let controller = controller();
    assert!(controller.scene().light().is_some());
    assert_eq!(controller.camera().near, 0.01);
    assert_eq!(controller.camera().far, 20.0);
    assert!((controller.camera().aspect - 800.0 / 600.0).abs() < 1e-6);
}

#[test]
fn start_acquires_viewer_then_reference_space() {
    let session = MockSession::new();
    let calls = session.calls();
    let active = started(session);

    assert_eq!(
        calls.borrow().reference_spaces,
        vec![ReferenceSpaceType::Viewer, ReferenceSpaceType::LocalFloor]
    );
    assert_eq!(calls.borrow().sources_requested, 1);
    assert_eq!(active.reference_space().0, ReferenceSpaceType::LocalFloor);
}

#[test]
fn frame_without_data_is_skipped() {
    let mut controller = controller();
    let item = controller.item();
    controller.select(item);
    let active = started(MockSession::new());
    let mut renderer = RecordingRenderer::default();

    let outcome = active
        .on_frame(&mut controller, 0.0, None, &mut renderer)
        .unwrap();

    assert_eq!(outcome, FrameOutcome::Skipped);
    assert_eq!(renderer.renders, 0);
}

#[test]
fn hit_moves_and_shows_the_selection() {
    let mut controller = controller();
    let item = controller.item();
    controller.select(item);
    let active = started(MockSession::new());
    let mut renderer = RecordingRenderer::watching(item);
    let hit = Vector3::new(0.5, 0.0, -2.0);
    let frame = MockFrame::with_hit(hit);

    let outcome = active
        .on_frame(&mut controller, 16.0, Some(&frame), &mut renderer)
        .unwrap();

    assert_eq!(outcome, FrameOutcome::Placed(hit));
    assert_eq!(frame.queries.get(), 1);
    let node = controller.scene().get(item).unwrap();
    assert!(node.visible);
    assert_eq!(node.transform.position, hit);
    assert_eq!(renderer.renders, 1);
    assert_eq!(renderer.watched_visible, vec![true]);
}

#[test]
fn placement_uses_the_translation_column_of_a_rotated_pose() {
    let mut controller = controller();
    let item = controller.item();
    controller.select(item);
    let active = started(MockSession::new());
    let mut renderer = RecordingRenderer::watching(item);
    // Quarter turn about +Y, then a translation, stored column by column
    #[rustfmt::skip]
    let m: [f32; 16] = [
        0.0, 0.0, -1.0, 0.0,
        0.0, 1.0, 0.0, 0.0,
        1.0, 0.0, 0.0, 0.0,
        0.3, 0.1, -1.7, 1.0,
    ];
    let frame = MockFrame {
        hits: vec![Pose::from_column_major(&m)],
        viewer: None,
        queries: Cell::new(0),
    };

    let outcome = active
        .on_frame(&mut controller, 16.0, Some(&frame), &mut renderer)
        .unwrap();

    let expected = Vector3::new(m[12], m[13], m[14]);
    assert_eq!(outcome, FrameOutcome::Placed(expected));
    assert_eq!(controller.scene().get(item).unwrap().transform.position, expected);
}

#[test]
fn missing_hit_hides_the_selection() {
    let mut controller = controller();
    let item = controller.item();
    controller.select(item);
    let active = started(MockSession::new());
    let mut renderer = RecordingRenderer::watching(item);

    let hit = MockFrame::with_hit(Vector3::new(1.0, 0.0, 1.0));
    active
        .on_frame(&mut controller, 0.0, Some(&hit), &mut renderer)
        .unwrap();
    let outcome = active
        .on_frame(&mut controller, 16.0, Some(&MockFrame::without_hits()), &mut renderer)
        .unwrap();

    assert_eq!(outcome, FrameOutcome::Hidden);
    assert!(!controller.scene().get(item).unwrap().visible);
    assert_eq!(renderer.watched_visible, vec![true, false]);
}

#[test]
fn nothing_is_placed_without_a_selection() {
    let mut controller = controller();
    let item = controller.item();
    let active = started(MockSession::new());
    let mut renderer = RecordingRenderer::watching(item);
    let frame = MockFrame::with_hit(Vector3::new(1.0, 0.0, 1.0));

    let outcome = active
        .on_frame(&mut controller, 0.0, Some(&frame), &mut renderer)
        .unwrap();

    assert_eq!(outcome, FrameOutcome::Idle);
    assert_eq!(frame.queries.get(), 0);
    assert_eq!(renderer.watched_visible, vec![false]);
}

#[test]
fn camera_follows_the_viewer_pose() {
    let mut controller = controller();
    let active = started(MockSession::new());
    let mut renderer = RecordingRenderer::default();
    let viewer = Matrix4::from_translation(Vector3::new(0.0, 1.6, 0.0));
    let mut frame = MockFrame::without_hits();
    frame.viewer = Some(Pose::from_matrix(viewer));

    active
        .on_frame(&mut controller, 0.0, Some(&frame), &mut renderer)
        .unwrap();

    assert_eq!(controller.camera().pose, viewer);
    assert_eq!(renderer.camera_pose, Some(viewer));
}

#[test]
fn failed_start_releases_the_hit_test_source() {
    let mut session = MockSession::new();
    session.fail_space = Some(ReferenceSpaceType::LocalFloor);
    let calls = session.calls();

    let result = block_on(ActiveSession::start(session, ReferenceSpaceType::LocalFloor));

    assert_eq!(
        result.err(),
        Some(XrError::ReferenceSpaceUnavailable(ReferenceSpaceType::LocalFloor))
    );
    let calls = calls.borrow();
    assert_eq!(calls.sources_requested, 1);
    assert_eq!(calls.sources_cancelled, 1);
    assert_eq!(calls.ended, 1);
}

#[test]
fn failed_hit_test_source_ends_the_session() {
    let mut session = MockSession::new();
    session.fail_hit_test_source = true;
    let calls = session.calls();

    let result = block_on(ActiveSession::start(session, ReferenceSpaceType::LocalFloor));

    assert!(matches!(result, Err(XrError::HitTestSource(_))));
    assert_eq!(calls.borrow().sources_cancelled, 0);
    assert_eq!(calls.borrow().ended, 1);
}

#[test]
fn abandoned_start_releases_everything() {
    let mut session = MockSession::new();
    session.hang_on_space = Some(ReferenceSpaceType::LocalFloor);
    let calls = session.calls();

    let pending = ActiveSession::start(session, ReferenceSpaceType::LocalFloor).now_or_never();

    assert!(pending.is_none());
    let calls = calls.borrow();
    assert_eq!(calls.sources_requested, 1);
    assert_eq!(calls.sources_cancelled, 1);
    assert_eq!(calls.ended, 1);
}

#[test]
fn ending_a_session_releases_it_once() {
    let session = MockSession::new();
    let calls = session.calls();
    let active = started(session);
    assert_eq!(calls.borrow().ended, 0);

    active.end();

    assert_eq!(calls.borrow().sources_cancelled, 1);
    assert_eq!(calls.borrow().ended, 1);
}
