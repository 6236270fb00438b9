use crate::error::RecorderError;
use crate::events::ProcessorEvent;
use crate::ports::{AudioPorts, ControlPorts};
use crate::processor::{RecordedAudio, StreamProcessor};
use crate::test_utils::{config_with_duration, generate_ramp, generate_stereo_sine, run_block};
use crate::tests::active_processor;

// ===========================================================================
// Passthrough
// ===========================================================================

#[test]
fn test_passthrough_when_not_recording() {
    let (mut processor, _events) = active_processor(48000.0, 1);
    let inputs = [
        generate_stereo_sine(256, 48000.0),
        generate_ramp(-3.5, 64),
        (vec![f32::MAX, f32::MIN, 0.0, -0.0], vec![1e-30, -1e30, 0.5, -0.5]),
    ];

    for (left, right) in &inputs {
        let mut controls = ControlPorts::idle();
        let (out_l, out_r) = run_block(&mut processor, left, right, &mut controls);
        assert_eq!(&out_l, left);
        assert_eq!(&out_r, right);
        assert_eq!(processor.store().write_cursor(), 0);
        assert_eq!(processor.store().read_cursor(), 0);
        assert!(processor.store().is_empty());
    }
}

#[test]
fn test_idle_blocks_leave_a_wrapped_ring_alone() {
    let (mut processor, _events) = active_processor(4.0, 1);
    // Six frames into four slots: wrapped and overrun
    let (left, right) = generate_ramp(1.0, 6);
    run_block(&mut processor, &left, &right, &mut ControlPorts::recording());

    let cursors = |p: &crate::processor::ActiveProcessor| {
        let store = p.store();
        (store.write_cursor(), store.read_cursor(), store.unread())
    };
    let before = cursors(&processor);
    let contents = processor.store().left().to_vec();
    assert_eq!(before, (2, 2, 4));

    for frames in [1, 3, 4, 9] {
        let (idle_l, idle_r) = generate_ramp(100.0, frames);
        let (out_l, out_r) = run_block(&mut processor, &idle_l, &idle_r, &mut ControlPorts::idle());
        assert_eq!(out_l, idle_l);
        assert_eq!(out_r, idle_r);
        assert_eq!(cursors(&processor), before, "after {} idle frames", frames);
    }
    assert_eq!(processor.store().left(), contents.as_slice());
    assert_eq!(processor.state().overrun_frames(), 2);
}

#[test]
fn test_passthrough_while_recording() {
    let (mut processor, _events) = active_processor(48000.0, 1);
    let (left, right) = generate_stereo_sine(512, 48000.0);
    let mut controls = ControlPorts::recording();

    let (out_l, out_r) = run_block(&mut processor, &left, &right, &mut controls);

    assert_eq!(out_l, left);
    assert_eq!(out_r, right);
    assert_eq!(processor.store().unread(), 512);
}

#[test]
fn test_record_values_other_than_one_do_not_record() {
    let (mut processor, _events) = active_processor(100.0, 1);
    for record in [0, 2, -1, i32::MAX] {
        let mut controls = ControlPorts {
            record,
            ..ControlPorts::default()
        };
        run_block(&mut processor, &[0.5; 8], &[0.5; 8], &mut controls);
    }
    assert!(processor.store().is_empty());
}

#[test]
fn test_frame_count_clamped_to_buffers() {
    let (mut processor, _events) = active_processor(100.0, 1);
    let left = [1.0_f32, 2.0, 3.0];
    let right = [4.0_f32, 5.0, 6.0];
    let mut out_l = [0.0_f32; 3];
    let mut out_r = [0.0_f32; 3];
    let mut audio = AudioPorts {
        input_l: &left,
        input_r: &right,
        output_l: &mut out_l,
        output_r: &mut out_r,
    };
    let mut controls = ControlPorts::recording();

    processor.process_block(64, &mut audio, &mut controls);

    assert_eq!(out_l, left);
    assert_eq!(out_r, right);
    assert_eq!(processor.store().unread(), 3);
}

#[test]
fn test_partial_block_leaves_rest_of_output_alone() {
    let (mut processor, _events) = active_processor(100.0, 1);
    let left = [1.0_f32, 2.0, 3.0, 4.0];
    let right = [1.0_f32, 2.0, 3.0, 4.0];
    let mut out_l = [9.0_f32; 4];
    let mut out_r = [9.0_f32; 4];
    let mut audio = AudioPorts {
        input_l: &left,
        input_r: &right,
        output_l: &mut out_l,
        output_r: &mut out_r,
    };

    processor.process_block(2, &mut audio, &mut ControlPorts::recording());

    assert_eq!(out_l, [1.0, 2.0, 9.0, 9.0]);
    assert_eq!(out_r, [1.0, 2.0, 9.0, 9.0]);
    assert_eq!(processor.store().unread(), 2);
}

#[test]
fn test_in_place_processing_records_without_touching_audio() {
    let (mut processor, _events) = active_processor(4.0, 2);
    let (mut left, mut right) = generate_ramp(1.0, 5);
    let (orig_l, orig_r) = (left.clone(), right.clone());

    processor.process_block_in_place(5, &mut left, &mut right, &mut ControlPorts::recording());
    processor.process_block_in_place(0, &mut [], &mut [], &mut ControlPorts::idle());

    assert_eq!(left, orig_l);
    assert_eq!(right, orig_r);
    let (drained_l, drained_r) = processor.drain(8).unwrap();
    assert_eq!(drained_l, orig_l);
    assert_eq!(drained_r, orig_r);
}

// ===========================================================================
// Draining rules
// ===========================================================================

#[test]
fn test_drain_refused_while_recording() {
    let (mut processor, _events) = active_processor(4.0, 1);
    run_block(&mut processor, &[1.0], &[1.0], &mut ControlPorts::recording());

    assert!(matches!(
        processor.drain(4),
        Err(RecorderError::RecordingActive)
    ));
    // Nothing was consumed by the refused drain
    assert_eq!(processor.store().unread(), 1);
}

#[test]
fn test_deactivated_processor_keeps_recording_for_inspection() {
    let (mut processor, _events) = active_processor(4.0, 1);
    run_block(&mut processor, &[1.0, 2.0], &[3.0, 4.0], &mut ControlPorts::recording());

    // Deactivated straight out of a recording block
    let mut inactive = processor.deactivate();
    assert_eq!(inactive.store().map(|s| s.unread()), Some(2));
    assert!(inactive.state().is_recording());

    let (left, right) = inactive.drain(4).unwrap();
    assert_eq!(left, vec![1.0, 2.0]);
    assert_eq!(right, vec![3.0, 4.0]);
    inactive.teardown();
}

// ===========================================================================
// Lifecycle
// ===========================================================================

#[test]
fn test_reactivation_resets_cursors_and_clip() {
    let (mut processor, _events) = active_processor(4.0, 1);
    let (left, right) = generate_ramp(1.0, 6);
    let mut controls = ControlPorts::recording();
    run_block(&mut processor, &left, &right, &mut controls);
    assert!(processor.clip());

    let mut processor = processor.deactivate().activate().unwrap();

    assert_eq!(processor.store().write_cursor(), 0);
    assert_eq!(processor.store().read_cursor(), 0);
    assert!(processor.store().is_empty());
    assert!(!processor.clip());
    assert_eq!(processor.state().overrun_frames(), 0);
    // Storage is reused, not cleared
    assert_eq!(processor.store().left(), &[5.0, 6.0, 3.0, 4.0]);

    let mut controls = ControlPorts::idle();
    run_block(&mut processor, &[], &[], &mut controls);
    assert_eq!(controls.clip, crate::CLIP_OFF);
}

#[test]
fn test_setup_rejects_invalid_config() {
    let mut config = config_with_duration(1);
    config.event_queue_capacity = Some(0);
    assert!(matches!(
        StreamProcessor::setup(48000.0, &config),
        Err(RecorderError::Config(_))
    ));
}

#[test]
fn test_activation_with_oversized_ring_fails() {
    // 4e18 frames fits in usize but not in an allocation
    let (processor, _events) = StreamProcessor::setup(4.0e18, &config_with_duration(1)).unwrap();
    assert!(matches!(
        processor.activate(),
        Err(RecorderError::Allocation { .. })
    ));

    // Same with debug logging live, which evaluates the size message
    log::set_max_level(log::LevelFilter::Debug);
    let (processor, _events) = StreamProcessor::setup(3.0e18, &config_with_duration(1)).unwrap();
    let result = processor.activate();
    log::set_max_level(log::LevelFilter::Off);
    assert!(matches!(result, Err(RecorderError::Allocation { .. })));

    // Past usize, setup itself refuses
    assert!(matches!(
        StreamProcessor::setup(1.0e300, &config_with_duration(1)),
        Err(RecorderError::Allocation { .. })
    ));
}

// ===========================================================================
// Events
// ===========================================================================

#[test]
fn test_events_for_a_recording_session() {
    let (mut processor, mut events) = active_processor(4.0, 1);
    let (left, right) = generate_ramp(1.0, 3);

    run_block(&mut processor, &left, &right, &mut ControlPorts::recording());
    // Three overruns in this block, reported once
    let (more_l, more_r) = generate_ramp(4.0, 4);
    run_block(&mut processor, &more_l, &more_r, &mut ControlPorts::recording());

    let mut stop_and_save = ControlPorts {
        format: 3,
        save: 1,
        ..ControlPorts::idle()
    };
    run_block(&mut processor, &[], &[], &mut stop_and_save);
    // Save held high is not a new request
    run_block(&mut processor, &[], &[], &mut stop_and_save);

    assert_eq!(
        events.drain(),
        vec![
            ProcessorEvent::RecordingStarted,
            ProcessorEvent::Overrun,
            ProcessorEvent::RecordingStopped,
            ProcessorEvent::SaveRequested {
                format: 3,
                frames: 4
            },
        ]
    );
    assert_eq!(processor.state().dropped_events(), 0);
}

#[test]
fn test_save_edge_fires_again_after_release() {
    let (mut processor, mut events) = active_processor(4.0, 1);
    let save_on = ControlPorts {
        save: 1,
        ..ControlPorts::idle()
    };

    let (mut first, mut second) = (save_on, save_on);

    run_block(&mut processor, &[], &[], &mut first);
    run_block(&mut processor, &[], &[], &mut ControlPorts::idle());
    run_block(&mut processor, &[], &[], &mut second);

    let saves = events
        .drain()
        .into_iter()
        .filter(|e| matches!(e, ProcessorEvent::SaveRequested { .. }))
        .count();
    assert_eq!(saves, 2);
}

#[test]
fn test_full_event_queue_counts_drops() {
    let mut config = config_with_duration(1);
    config.event_queue_capacity = Some(1);
    let (processor, mut events) = StreamProcessor::setup(4.0, &config).unwrap();
    let mut processor = processor.activate().unwrap();

    run_block(&mut processor, &[1.0], &[1.0], &mut ControlPorts::recording());
    run_block(&mut processor, &[], &[], &mut ControlPorts::idle());
    run_block(&mut processor, &[1.0], &[1.0], &mut ControlPorts::recording());

    assert_eq!(processor.state().dropped_events(), 2);
    assert_eq!(events.drain(), vec![ProcessorEvent::RecordingStarted]);
}

#[test]
fn test_save_request_survives_a_full_event_queue() {
    let mut config = config_with_duration(1);
    config.event_queue_capacity = Some(2);
    let (processor, mut events) = StreamProcessor::setup(4.0, &config).unwrap();
    let mut processor = processor.activate().unwrap();

    for _ in 0..3 {
        run_block(&mut processor, &[1.0], &[1.0], &mut ControlPorts::recording());
        run_block(&mut processor, &[], &[], &mut ControlPorts::idle());
    }
    let mut save = ControlPorts {
        format: 5,
        save: 1,
        ..ControlPorts::idle()
    };
    run_block(&mut processor, &[], &[], &mut save);

    assert!(processor.state().dropped_events() > 0);
    assert!(
        !events
            .drain()
            .iter()
            .any(|e| matches!(e, ProcessorEvent::SaveRequested { .. }))
    );
    assert_eq!(
        processor.state_mut().take_save_request(),
        Some(crate::SaveRequest { format: 5 })
    );
    assert_eq!(processor.state_mut().take_save_request(), None);
}

#[test]
fn test_pending_save_kept_across_deactivation_and_cleared_on_activation() {
    let (mut processor, _events) = active_processor(4.0, 1);
    let mut save = ControlPorts {
        format: 1,
        save: 1,
        ..ControlPorts::idle()
    };
    run_block(&mut processor, &[], &[], &mut save);

    let inactive = processor.deactivate();
    assert_eq!(
        inactive.state().pending_save(),
        Some(crate::SaveRequest { format: 1 })
    );

    let processor = inactive.activate().unwrap();
    assert_eq!(processor.state().pending_save(), None);
}
