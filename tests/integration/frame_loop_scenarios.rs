use std::cell::Cell;
use std::rc::Rc;

use frame_pacer::scheduler::HISTORY_LEN;
use frame_pacer::{LoopState, PacerConfig, Priority};

use crate::helpers::{
    FRAME_MS, advance_and_tick, approx_eq, costly_task, counting_task, manual_scheduler,
};

#[test]
fn critical_task_runs_once_per_frame() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    let count = Rc::new(Cell::new(0));
    scheduler.schedule_task("counter", counting_task(&count), Priority::Critical, None);
    scheduler.start();

    for _ in 0..5 {
        assert!(advance_and_tick(&mut scheduler, &clock, 16.67).is_some());
    }

    assert_eq!(count.get(), 5);
    assert_eq!(scheduler.metrics().total_frames, 5);
    assert_eq!(scheduler.metrics().task_executions, 5);
}

#[test]
fn set_target_fps_is_clamped() {
    let (mut scheduler, _clock) = manual_scheduler(PacerConfig::default());
    scheduler.set_target_fps(200.0);
    assert!(scheduler.config().target_fps <= 120.0);

    let (mut scheduler, _clock) = manual_scheduler(PacerConfig {
        min_fps: 24.0,
        ..PacerConfig::default()
    });
    scheduler.set_target_fps(10.0);
    assert!(scheduler.config().target_fps >= 24.0);
}

#[test]
fn low_task_is_forced_through_budget_pressure() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    scheduler.schedule_task("heavy", costly_task(&clock, 20.0), Priority::Critical, None);
    let count = Rc::new(Cell::new(0));
    scheduler.schedule_task("ambient", counting_task(&count), Priority::Low, Some(5));
    scheduler.start();

    for _ in 0..6 {
        advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();
    }

    let info = scheduler.task_info("ambient").unwrap();
    assert!(count.get() >= 1);
    assert_eq!(info.frames_since_run, 0);
    assert_eq!(info.last_run_frame, Some(6));
}

#[test]
fn resume_after_long_pause_is_not_a_dropped_frame() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    scheduler.start();
    advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();

    scheduler.pause();
    clock.advance(60_000.0);
    scheduler.resume();

    let frame = advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();
    assert!(!frame.is_dropped_frame);
    assert_eq!(scheduler.metrics().dropped_frames, 0);
}

#[test]
fn histories_stay_bounded() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    scheduler.schedule_task("work", costly_task(&clock, 4.0), Priority::Normal, None);
    scheduler.start();

    for _ in 0..61 {
        advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();
    }

    let metrics = scheduler.metrics();
    assert_eq!(metrics.total_frames, 61);
    assert_eq!(metrics.fps_samples, HISTORY_LEN);
    assert_eq!(metrics.budget_samples, HISTORY_LEN);
    assert!(metrics.average_fps.is_finite() && metrics.average_fps > 0.0);
    assert!(metrics.average_budget_usage.is_finite());
    assert!(metrics.min_fps <= metrics.average_fps && metrics.average_fps <= metrics.max_fps);
}

#[test]
fn start_while_running_keeps_counters() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    scheduler.start();
    for _ in 0..3 {
        advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();
    }
    let before = scheduler.state();

    scheduler.start();
    scheduler.start();

    assert_eq!(scheduler.state(), before);
    assert_eq!(scheduler.frame_info().unwrap().frame_number, 3);
    let next = advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();
    assert_eq!(next.frame_number, 4);
}

#[test]
fn lifecycle_transitions() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    assert_eq!(scheduler.loop_state(), LoopState::Stopped);

    // Pause and resume are no-ops from Stopped.
    scheduler.pause();
    scheduler.resume();
    assert_eq!(scheduler.loop_state(), LoopState::Stopped);

    scheduler.start();
    assert!(scheduler.state().is_running);
    scheduler.pause();
    assert!(scheduler.state().is_paused);
    assert!(clock.pending().is_none());
    assert!(advance_and_tick(&mut scheduler, &clock, FRAME_MS).is_none());

    scheduler.resume();
    assert!(clock.pending().is_some());
    scheduler.stop();
    assert_eq!(scheduler.loop_state(), LoopState::Stopped);
    assert!(clock.pending().is_none());
}

#[test]
fn ticks_faster_than_target_are_skipped() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    let count = Rc::new(Cell::new(0));
    scheduler.schedule_task("counter", counting_task(&count), Priority::Critical, None);
    scheduler.start();

    // A 240 Hz display against a 60 fps target: roughly one tick in four
    // is accepted.
    for _ in 0..240 {
        advance_and_tick(&mut scheduler, &clock, 1000.0 / 240.0);
    }

    let metrics = scheduler.metrics();
    assert_eq!(u64::from(count.get()), metrics.total_frames);
    assert!((58..=62).contains(&metrics.total_frames), "{}", metrics.total_frames);
    assert_eq!(metrics.total_frames + metrics.skipped_ticks, 240);
    assert!(approx_eq(scheduler.state().target_fps, 60.0));
}
