use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use frame_pacer::{PacerConfig, Priority, TaskError};

use crate::helpers::{FRAME_MS, advance_and_tick, costly_task, counting_task, manual_scheduler};

#[test]
fn critical_and_high_run_every_frame_under_overload() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    scheduler.schedule_task("overload", costly_task(&clock, 40.0), Priority::Critical, None);
    let high = Rc::new(Cell::new(0));
    scheduler.schedule_task("lip_sync", counting_task(&high), Priority::High, None);
    let critical = Rc::new(Cell::new(0));
    scheduler.schedule_task("pose", counting_task(&critical), Priority::Critical, None);
    scheduler.start();

    for _ in 0..100 {
        advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();
    }

    assert_eq!(critical.get(), 100);
    assert_eq!(high.get(), 100);
    // Adaptive control never pushes the rate under the floor.
    assert!(scheduler.state().target_fps >= scheduler.config().min_fps);
}

#[test]
fn skip_budget_bounds_consecutive_misses() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    scheduler.schedule_task("overload", costly_task(&clock, 30.0), Priority::Critical, None);
    for priority in [Priority::Normal, Priority::Low, Priority::Idle] {
        scheduler.schedule_task(format!("{priority}"), Box::new(|_, _| Ok(())), priority, None);
    }
    scheduler.schedule_task("tight", Box::new(|_, _| Ok(())), Priority::Idle, Some(1));
    scheduler.start();

    let mut streaks: HashMap<String, (u64, u32)> = HashMap::new();
    for _ in 0..120 {
        let frame = advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();
        for info in scheduler.task_infos() {
            assert!(info.frames_since_run <= info.max_skip_frames, "{info:?}");
            let entry = streaks.entry(info.id.clone()).or_default();
            if info.last_run_frame == Some(frame.frame_number) {
                entry.0 = 0;
            } else {
                entry.0 += 1;
                entry.1 = entry.1.max(entry.0 as u32);
            }
        }
    }

    for info in scheduler.task_infos() {
        let (_, worst) = streaks[&info.id];
        assert!(worst <= info.max_skip_frames, "{} missed {worst}", info.id);
        assert!(info.run_count > 0, "{} starved", info.id);
    }
    assert_eq!(scheduler.task_info("tight").unwrap().max_skip_frames, 1);
}

#[test]
fn equal_priorities_run_in_registration_order() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    let order = Rc::new(RefCell::new(Vec::new()));
    for (id, priority) in [
        ("idle", Priority::Idle),
        ("normal_a", Priority::Normal),
        ("critical", Priority::Critical),
        ("normal_b", Priority::Normal),
        ("high", Priority::High),
    ] {
        let order = Rc::clone(&order);
        scheduler.schedule_task(
            id,
            Box::new(move |_, _| {
                order.borrow_mut().push(id);
                Ok(())
            }),
            priority,
            None,
        );
    }
    scheduler.start();
    advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();

    assert_eq!(
        *order.borrow(),
        vec!["critical", "high", "normal_a", "normal_b", "idle"]
    );
}

#[test]
fn replacing_a_task_keeps_its_slot() {
    let (mut scheduler, _clock) = manual_scheduler(PacerConfig::default());
    scheduler.schedule_task("a", Box::new(|_, _| Ok(())), Priority::Normal, None);
    scheduler.schedule_task("b", Box::new(|_, _| Ok(())), Priority::Normal, None);
    scheduler.schedule_task("a", Box::new(|_, _| Ok(())), Priority::Low, Some(7));

    let infos = scheduler.task_infos();
    assert_eq!(infos.len(), 2);
    assert_eq!(infos[0].id, "a");
    assert_eq!(infos[0].priority, Priority::Low);
    assert_eq!(infos[0].max_skip_frames, 7);
    assert_eq!(scheduler.state().active_task_count, 2);
}

#[test]
fn failures_are_isolated() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    scheduler.schedule_task(
        "panics",
        Box::new(|_, frame| {
            if frame.frame_number % 2 == 0 {
                panic!("blend shape out of range");
            }
            Ok(())
        }),
        Priority::Critical,
        None,
    );
    scheduler.schedule_task(
        "errors",
        Box::new(|_, _| Err(TaskError::failed("viseme missing"))),
        Priority::High,
        None,
    );
    let healthy = Rc::new(Cell::new(0));
    scheduler.schedule_task("healthy", counting_task(&healthy), Priority::Normal, None);
    scheduler.start();

    for _ in 0..10 {
        advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();
    }

    assert_eq!(healthy.get(), 10);
    assert_eq!(scheduler.metrics().task_failures, 15);

    let panics = scheduler.task_info("panics").unwrap();
    assert_eq!(panics.run_count, 10);
    assert_eq!(panics.failure_count, 5);
    assert!(panics.last_error.unwrap().contains("blend shape out of range"));

    let errors = scheduler.task_info("errors").unwrap();
    assert_eq!(errors.failure_count, 10);
    assert_eq!(errors.frames_since_run, 0);
}

#[test]
fn disabled_tasks_keep_their_counters() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    let count = Rc::new(Cell::new(0));
    scheduler.schedule_task("blink", counting_task(&count), Priority::Idle, None);
    scheduler.start();

    advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();
    scheduler.disable_task("blink");
    for _ in 0..5 {
        advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();
    }
    let info = scheduler.task_info("blink").unwrap();
    assert_eq!(count.get(), 1);
    assert_eq!(info.frames_since_run, 0);
    assert!(!info.enabled);

    scheduler.enable_task("blink");
    advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();
    assert_eq!(count.get(), 2);

    scheduler.unschedule_task("blink");
    assert!(scheduler.task_info("blink").is_none());
}

#[test]
fn measured_cost_drives_utilization() {
    let (mut scheduler, clock) = manual_scheduler(PacerConfig::default());
    scheduler.schedule_task("half", costly_task(&clock, FRAME_MS / 2.0), Priority::Normal, None);
    scheduler.start();
    advance_and_tick(&mut scheduler, &clock, FRAME_MS).unwrap();

    let state = scheduler.state();
    assert!((state.budget_utilization - 0.5).abs() < 1e-9);
    let average = scheduler.task_info("half").unwrap().average_run_time_ms;
    assert!((average - FRAME_MS / 2.0).abs() < 1e-9);
}
