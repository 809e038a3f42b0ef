use frame_pacer::scheduler::SimulatedBattery;
use frame_pacer::{BatteryStatus, ConfigPatch, FrameScheduler, ManualTickSource, PacerConfig};

use crate::helpers::{advance_and_tick, approx_eq, costly_task, manual_scheduler};

fn low_battery() -> BatteryStatus {
    BatteryStatus {
        level: 0.05,
        charging: false,
    }
}

#[test]
fn effective_rate_stays_in_bounds_for_every_throttle_combination() {
    for battery_saver in [false, true] {
        for thermal_throttling in [false, true] {
            for adaptive_frame_rate in [false, true] {
                let config = PacerConfig {
                    battery_saver,
                    thermal_throttling,
                    adaptive_frame_rate,
                    battery_saver_fps: 20.0,
                    thermal_throttle_fps: 28.0,
                    min_fps: 25.0,
                    adaptive_interval_frames: 5,
                    ..PacerConfig::default()
                };
                let clock = ManualTickSource::new(0.0);
                let mut scheduler = FrameScheduler::new(config, clock.clone())
                    .with_battery_monitor(Box::new(SimulatedBattery::new(low_battery())));
                scheduler.schedule_task(
                    "overload",
                    costly_task(&clock, 50.0),
                    frame_pacer::Priority::Critical,
                    None,
                );
                scheduler.set_thermal_state(true);
                scheduler.start();

                for _ in 0..60 {
                    advance_and_tick(&mut scheduler, &clock, 10.0);
                    let fps = scheduler.state().target_fps;
                    let config = scheduler.config();
                    assert!(
                        fps >= config.min_fps && fps <= config.target_fps,
                        "fps {fps} outside [{}, {}]",
                        config.min_fps,
                        config.target_fps
                    );
                }
            }
        }
    }
}

#[test]
fn throttle_fps_below_min_is_raised_to_floor() {
    let (mut scheduler, _clock) = manual_scheduler(PacerConfig {
        thermal_throttling: true,
        thermal_throttle_fps: 10.0,
        min_fps: 24.0,
        ..PacerConfig::default()
    });
    scheduler.set_thermal_state(true);
    assert!(approx_eq(scheduler.state().target_fps, 24.0));
}

#[test]
fn thermal_report_from_another_thread_applies_on_next_tick() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig {
        thermal_throttling: true,
        ..PacerConfig::default()
    });
    scheduler.start();

    let handle = scheduler.handle();
    std::thread::spawn(move || handle.report_thermal(true))
        .join()
        .expect("listener thread")
        .expect("send thermal report");

    // Not applied until the scheduler drains its control queue.
    assert!(approx_eq(scheduler.state().target_fps, 60.0));
    let frame = advance_and_tick(&mut scheduler, &clock, 1000.0 / 30.0).unwrap();
    assert!(approx_eq(scheduler.state().target_fps, 30.0));
    assert!(approx_eq(frame.budget_ms, 1000.0 / 30.0));
}

#[test]
fn battery_recovery_lifts_the_clamp() {
    let battery = SimulatedBattery::new(low_battery());
    let clock = ManualTickSource::new(0.0);
    let mut scheduler = FrameScheduler::new(
        PacerConfig {
            battery_saver: true,
            ..PacerConfig::default()
        },
        clock.clone(),
    )
    .with_battery_monitor(Box::new(battery.clone()));
    scheduler.start();
    assert!(approx_eq(scheduler.state().target_fps, 30.0));

    // Above the threshold while discharging: no longer low.
    battery.set(BatteryStatus {
        level: 0.5,
        charging: false,
    });
    advance_and_tick(&mut scheduler, &clock, 1000.0 / 30.0).unwrap();
    assert!(approx_eq(scheduler.state().target_fps, 60.0));

    scheduler.stop();
    assert!(!battery.is_subscribed());
}

#[test]
fn battery_readings_can_be_pushed_without_a_monitor() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig {
        battery_saver: true,
        ..PacerConfig::default()
    });
    scheduler.start();
    scheduler
        .handle()
        .report_battery(low_battery())
        .expect("queue battery reading");
    advance_and_tick(&mut scheduler, &clock, 1000.0 / 30.0).unwrap();
    assert!(approx_eq(scheduler.state().target_fps, 30.0));

    scheduler.update_config(ConfigPatch {
        battery_saver: Some(false),
        ..ConfigPatch::default()
    });
    assert!(approx_eq(scheduler.state().target_fps, 60.0));
}
