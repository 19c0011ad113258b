//! Script lifecycle: stepping, waking, cancellation.

use std::sync::{Arc, Mutex};

use test_utils::{build_app, run_ticks, CapturedFinishes};

use tandem::components::Health;
use tandem::systems::timer::TimerCommand;
use tandem::{attach_script, Script, ScriptCx, ScriptError, ScriptHost, Step, Wake};

type StepLog = Arc<Mutex<Vec<String>>>;

fn wake_name(wake: &Wake) -> String {
    match wake {
        Wake::Start => "start".to_owned(),
        Wake::Command(Ok(())) => "command-ok".to_owned(),
        Wake::Command(Err(failure)) => format!("command-err({failure})"),
        Wake::ComponentSet => "set".to_owned(),
        Wake::ComponentRemoved => "removed".to_owned(),
    }
}

/// Waits out a fixed number of one-tick timers, logging every wake.
struct CountdownScript {
    log: StepLog,
    legs: u32,
}

impl Script for CountdownScript {
    fn resume(&mut self, cx: &mut ScriptCx<'_>, wake: Wake) -> Result<Step, ScriptError> {
        self.log.lock().expect("log lock").push(wake_name(&wake));
        if let Wake::Command(Err(failure)) = wake {
            return Err(failure.into());
        }
        if self.legs == 0 {
            return Ok(Step::Done);
        }
        self.legs -= 1;
        let ticket = cx.issue(|ticket| TimerCommand::for_ticks(ticket, 1));
        Ok(Step::AwaitCommand(ticket))
    }
}

/// Parks on a component watch, logging every wake.
struct WatchScript {
    log: StepLog,
    watch_removal: bool,
}

impl Script for WatchScript {
    fn resume(&mut self, _cx: &mut ScriptCx<'_>, wake: Wake) -> Result<Step, ScriptError> {
        self.log.lock().expect("log lock").push(wake_name(&wake));
        match wake {
            Wake::Start => Ok(if self.watch_removal {
                Step::await_removed::<Health>()
            } else {
                Step::await_set::<Health>()
            }),
            _ => Ok(Step::Done),
        }
    }
}

#[test]
fn a_script_steps_once_per_wake_and_finishes_cleanly() {
    let mut app = build_app();
    let log: StepLog = StepLog::default();
    let entity = app.world_mut().spawn_empty().id();
    let id = attach_script(
        app.world_mut(),
        entity,
        CountdownScript {
            log: Arc::clone(&log),
            legs: 2,
        },
    );

    // Flush 1: start (issues leg 1). Tick 2: timer fires, flush wakes
    // (issues leg 2). Tick 3: timer fires, flush wakes, script is done.
    run_ticks(&mut app, 3);

    assert_eq!(
        *log.lock().expect("log lock"),
        vec!["start", "command-ok", "command-ok"]
    );
    let finishes = &app.world().resource::<CapturedFinishes>().0;
    assert_eq!(finishes.len(), 1);
    assert_eq!(finishes[0].id, id);
    assert_eq!(finishes[0].outcome, Ok(()));
    // The host marker was detached at finish.
    assert!(app.world().get::<ScriptHost>(entity).is_none());
}

#[test]
fn despawning_the_entity_cancels_with_entity_dead() {
    let mut app = build_app();
    let log: StepLog = StepLog::default();
    let entity = app.world_mut().spawn_empty().id();
    attach_script(
        app.world_mut(),
        entity,
        CountdownScript {
            log: Arc::clone(&log),
            legs: 100,
        },
    );
    app.update();
    assert_eq!(log.lock().expect("log lock").len(), 1);

    app.world_mut().despawn(entity);
    run_ticks(&mut app, 3);

    // No step ran after the despawn.
    assert_eq!(log.lock().expect("log lock").len(), 1);
    let finishes = &app.world().resource::<CapturedFinishes>().0;
    assert_eq!(finishes.len(), 1);
    assert_eq!(finishes[0].outcome, Err(ScriptError::EntityDead));
}

#[test]
fn detaching_the_host_cancels_with_script_removed() {
    let mut app = build_app();
    let log: StepLog = StepLog::default();
    let entity = app.world_mut().spawn_empty().id();
    attach_script(
        app.world_mut(),
        entity,
        CountdownScript {
            log: Arc::clone(&log),
            legs: 100,
        },
    );
    app.update();

    app.world_mut().entity_mut(entity).remove::<ScriptHost>();
    run_ticks(&mut app, 3);

    assert_eq!(log.lock().expect("log lock").len(), 1);
    let finishes = &app.world().resource::<CapturedFinishes>().0;
    assert_eq!(finishes.len(), 1);
    assert_eq!(finishes[0].outcome, Err(ScriptError::ScriptRemoved));
}

#[test]
fn attaching_a_second_script_replaces_the_first() {
    let mut app = build_app();
    let first_log: StepLog = StepLog::default();
    let second_log: StepLog = StepLog::default();
    let entity = app.world_mut().spawn_empty().id();

    let first = attach_script(
        app.world_mut(),
        entity,
        CountdownScript {
            log: Arc::clone(&first_log),
            legs: 100,
        },
    );
    app.update();

    let second = attach_script(
        app.world_mut(),
        entity,
        CountdownScript {
            log: Arc::clone(&second_log),
            legs: 1,
        },
    );
    run_ticks(&mut app, 3);

    assert_ne!(first, second);
    // The first script took exactly its start step; the replacement ran.
    assert_eq!(first_log.lock().expect("log lock").len(), 1);
    assert_eq!(
        *second_log.lock().expect("log lock"),
        vec!["start", "command-ok"]
    );
    let finishes = &app.world().resource::<CapturedFinishes>().0;
    assert_eq!(finishes.len(), 2);
    assert_eq!(finishes[0].id, first);
    assert_eq!(finishes[0].outcome, Err(ScriptError::ScriptRemoved));
    assert_eq!(finishes[1].id, second);
    assert_eq!(finishes[1].outcome, Ok(()));
}

#[test]
fn a_watching_script_wakes_when_the_component_is_set() {
    let mut app = build_app();
    let log: StepLog = StepLog::default();
    let entity = app.world_mut().spawn_empty().id();
    attach_script(
        app.world_mut(),
        entity,
        WatchScript {
            log: Arc::clone(&log),
            watch_removal: false,
        },
    );
    run_ticks(&mut app, 2);
    assert_eq!(*log.lock().expect("log lock"), vec!["start"]);

    app.world_mut().entity_mut(entity).insert(Health::full(5));
    app.update();

    assert_eq!(*log.lock().expect("log lock"), vec!["start", "set"]);
    assert_eq!(
        app.world().resource::<CapturedFinishes>().0[0].outcome,
        Ok(())
    );
}

#[test]
fn a_watching_script_wakes_when_the_component_is_removed() {
    let mut app = build_app();
    let log: StepLog = StepLog::default();
    let entity = app.world_mut().spawn(Health::full(5)).id();
    attach_script(
        app.world_mut(),
        entity,
        WatchScript {
            log: Arc::clone(&log),
            watch_removal: true,
        },
    );
    run_ticks(&mut app, 2);

    app.world_mut().entity_mut(entity).remove::<Health>();
    app.update();

    assert_eq!(*log.lock().expect("log lock"), vec!["start", "removed"]);
}
