//! Per-tick extension points.
//!
//! The loop calls `update` and then `resolve_collisions` after input has been
//! applied and before the snapshot is built. Both default to no-ops; real
//! physics plugs in here.

use crate::entities::EntityStore;

/// Simulation stepper invoked once per tick with elapsed seconds.
pub trait TickHooks: Send {
    fn update(&mut self, _entities: &mut EntityStore, _dt_sec: f32) {}

    fn resolve_collisions(&mut self, _entities: &mut EntityStore, _dt_sec: f32) {}
}

/// No-op hooks.
#[derive(Debug, Default)]
pub struct NullHooks;

impl TickHooks for NullHooks {}

/// Adapts a plain per-tick callback into hooks.
pub struct UpdateFn<F>(pub F);

impl<F> TickHooks for UpdateFn<F>
where
    F: FnMut(&mut EntityStore, f32) + Send,
{
    fn update(&mut self, entities: &mut EntityStore, dt_sec: f32) {
        (self.0)(entities, dt_sec)
    }
}
