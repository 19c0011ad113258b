//! Script instance book-keeping and the flush-time driver.

use std::any::TypeId;

use bevy::prelude::{Entity, Mut, Resource, World};
use hashbrown::HashMap;
use log::warn;

use super::context::ScriptCx;
use super::watch::{WatchEvents, WatchKind, WatchRegistry};
use super::{Script, ScriptError, ScriptFinished, ScriptHost, ScriptId, Step, Wake};
use crate::command::{CommandOutcome, Ticket};

enum Waiting {
    /// Attached this tick; takes its first step at the next flush.
    Fresh,
    Command(Ticket),
    Watch(TypeId, WatchKind),
}

struct Instance {
    id: ScriptId,
    entity: Entity,
    behaviour: Box<dyn Script>,
    waiting: Waiting,
}

/// All live script instances and their wake routing.
#[derive(Resource, Default)]
pub struct ScriptRunner {
    next: u64,
    instances: HashMap<ScriptId, Instance>,
    by_entity: HashMap<Entity, ScriptId>,
    awaiting_command: HashMap<Ticket, ScriptId>,
    awaiting_watch: HashMap<(Entity, TypeId, WatchKind), ScriptId>,
    pending_start: Vec<ScriptId>,
    finished: Vec<(Instance, Result<(), ScriptError>)>,
}

impl ScriptRunner {
    /// Whether the instance is still live (attached, not yet finished).
    #[must_use]
    pub fn is_live(&self, id: ScriptId) -> bool {
        self.instances.contains_key(&id)
    }

    /// The script currently attached to `entity`, if any.
    #[must_use]
    pub fn script_for(&self, entity: Entity) -> Option<ScriptId> {
        self.by_entity.get(&entity).copied()
    }

    fn alloc(&mut self) -> ScriptId {
        self.next += 1;
        ScriptId(self.next)
    }

    /// Moves the instance to the finished list and clears its wake routing.
    fn retire(&mut self, id: ScriptId, outcome: Result<(), ScriptError>) {
        if let Some(instance) = self.instances.remove(&id) {
            match instance.waiting {
                Waiting::Fresh => {}
                Waiting::Command(ticket) => {
                    self.awaiting_command.remove(&ticket);
                }
                Waiting::Watch(type_id, kind) => {
                    self.awaiting_watch.remove(&(instance.entity, type_id, kind));
                }
            }
            self.finished.push((instance, outcome));
        }
    }
}

pub(crate) fn attach(world: &mut World, entity: Entity, behaviour: Box<dyn Script>) -> ScriptId {
    let mut runner = world.resource_mut::<ScriptRunner>();
    let id = runner.alloc();
    if let Some(previous) = runner.by_entity.insert(entity, id) {
        runner.retire(previous, Err(ScriptError::ScriptRemoved));
    }
    runner.instances.insert(
        id,
        Instance {
            id,
            entity,
            behaviour,
            waiting: Waiting::Fresh,
        },
    );
    runner.pending_start.push(id);
    id
}

fn check_liveness(world: &World, instance: &Instance) -> Result<(), ScriptError> {
    let Ok(entry) = world.get_entity(instance.entity) else {
        return Err(ScriptError::EntityDead);
    };
    match entry.get::<ScriptHost>() {
        Some(host) if host.id() == instance.id => Ok(()),
        _ => Err(ScriptError::ScriptRemoved),
    }
}

fn resume(world: &mut World, runner: &mut ScriptRunner, id: ScriptId, wake: Wake) {
    let Some(mut instance) = runner.instances.remove(&id) else {
        return;
    };
    if let Err(err) = check_liveness(world, &instance) {
        runner.finished.push((instance, Err(err)));
        return;
    }
    let mut cx = ScriptCx::new(world, instance.entity);
    match instance.behaviour.resume(&mut cx, wake) {
        Ok(Step::Done) => runner.finished.push((instance, Ok(()))),
        Ok(Step::AwaitCommand(ticket)) => {
            instance.waiting = Waiting::Command(ticket);
            runner.awaiting_command.insert(ticket, id);
            runner.instances.insert(id, instance);
        }
        Ok(Step::AwaitSet(type_id)) => {
            park_watch(world, runner, instance, type_id, WatchKind::Set);
        }
        Ok(Step::AwaitRemoved(type_id)) => {
            park_watch(world, runner, instance, type_id, WatchKind::Removed);
        }
        Err(err) => runner.finished.push((instance, Err(err))),
    }
}

fn park_watch(
    world: &World,
    runner: &mut ScriptRunner,
    mut instance: Instance,
    type_id: TypeId,
    kind: WatchKind,
) {
    let watchable = world
        .get_resource::<WatchRegistry>()
        .is_some_and(|registry| registry.is_watchable(type_id));
    if !watchable {
        // The wait would never resolve.
        warn!(
            "script {:?} on {:?} awaits a component type that is not registered watchable",
            instance.id, instance.entity
        );
    }
    let id = instance.id;
    instance.waiting = Waiting::Watch(type_id, kind);
    runner.awaiting_watch.insert((instance.entity, type_id, kind), id);
    runner.instances.insert(id, instance);
}

/// Cancels instances whose entity died or whose host marker no longer
/// points at them. Runs first in the flush, before any wake is delivered.
pub(crate) fn cancel_stale(world: &mut World) {
    if !world.contains_resource::<ScriptRunner>() {
        return;
    }
    world.resource_scope(|world, mut runner: Mut<ScriptRunner>| {
        let stale: Vec<(ScriptId, ScriptError)> = runner
            .instances
            .values()
            .filter_map(|instance| {
                check_liveness(world, instance)
                    .err()
                    .map(|err| (instance.id, err))
            })
            .collect();
        for (id, err) in stale {
            runner.retire(id, Err(err));
        }
    });
}

/// Takes the first step of every script attached since the last flush.
pub(crate) fn start_pending(world: &mut World) {
    if !world.contains_resource::<ScriptRunner>() {
        return;
    }
    world.resource_scope(|world, mut runner: Mut<ScriptRunner>| {
        let pending = std::mem::take(&mut runner.pending_start);
        for id in pending {
            resume(world, &mut runner, id, Wake::Start);
        }
    });
}

/// Wakes the script waiting on `ticket`, if any.
pub(crate) fn wake_command(world: &mut World, ticket: Ticket, outcome: CommandOutcome) {
    if !world.contains_resource::<ScriptRunner>() {
        return;
    }
    world.resource_scope(|world, mut runner: Mut<ScriptRunner>| {
        if let Some(id) = runner.awaiting_command.remove(&ticket) {
            resume(world, &mut runner, id, Wake::Command(outcome));
        }
    });
}

/// Delivers this tick's component-watch notices to waiting scripts.
pub(crate) fn wake_watches(world: &mut World) {
    let Some(mut log) = world.get_resource_mut::<WatchEvents>() else {
        return;
    };
    let events = log.take();
    if events.is_empty() || !world.contains_resource::<ScriptRunner>() {
        return;
    }
    world.resource_scope(|world, mut runner: Mut<ScriptRunner>| {
        for event in events {
            let key = (event.entity, event.type_id, event.kind);
            if let Some(id) = runner.awaiting_watch.remove(&key) {
                let wake = match event.kind {
                    WatchKind::Set => Wake::ComponentSet,
                    WatchKind::Removed => Wake::ComponentRemoved,
                };
                resume(world, &mut runner, id, wake);
            }
        }
    });
}

/// Detaches finished scripts and raises [`ScriptFinished`] for each.
pub(crate) fn finalize(world: &mut World) {
    if !world.contains_resource::<ScriptRunner>() {
        return;
    }
    world.resource_scope(|world, mut runner: Mut<ScriptRunner>| {
        let finished = std::mem::take(&mut runner.finished);
        for (instance, outcome) in finished {
            if runner.by_entity.get(&instance.entity).copied() == Some(instance.id) {
                runner.by_entity.remove(&instance.entity);
            }
            if let Ok(mut entry) = world.get_entity_mut(instance.entity) {
                let owned = entry
                    .get::<ScriptHost>()
                    .is_some_and(|host| host.id() == instance.id);
                if owned {
                    entry.remove::<ScriptHost>();
                }
            }
            world.trigger(ScriptFinished {
                entity: instance.entity,
                id: instance.id,
                outcome,
            });
        }
    });
}
