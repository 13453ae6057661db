//! Per-entity update coordination.
//!
//! Several controllers on the same model usually need to run in a fixed order after
//! animation has been evaluated. Adding an [`UpdateController`] to an entity hands the
//! late update of every [`Updatable`] component on that entity over to
//! [`run_update_controllers`], which runs them sorted by [`Updatable::execution_order`].
//! Components on entities without an [`UpdateController`] schedule themselves.

use std::any::TypeId;

use bevy::{
    app::App,
    ecs::{component::Component, entity::Entity, query::With, resource::Resource, world::World},
    log::debug,
    prelude::{ReflectComponent, ReflectResource},
    reflect::{Reflect, std_traits::ReflectDefault},
};

/// Takes over the late update of all [`Updatable`] components on its entity.
#[derive(Component, Reflect, Debug, Default, Clone, Copy)]
#[reflect(Component, Default)]
pub struct UpdateController;

/// Whether the app is playing or being edited.
///
/// While editing, only [`Updatable`]s that report
/// [`needs_update_on_editing`](Updatable::needs_update_on_editing) are updated.
#[derive(Resource, Reflect, Debug, Default, Clone, Copy, PartialEq, Eq)]
#[reflect(Resource, Default)]
pub enum UpdateMode {
    #[default]
    Playing,
    Editing,
}

/// A component whose late update can be driven by an [`UpdateController`].
pub trait Updatable: Component {
    /// Relative priority, higher runs later.
    fn execution_order(&self) -> i32;

    fn needs_update_on_editing(&self) -> bool;

    /// Runs the late update of the `Self` component on `entity`.
    fn on_late_update(world: &mut World, entity: Entity);
}

#[derive(Clone)]
struct UpdatableEntry {
    type_id: TypeId,
    probe: fn(&World, Entity) -> Option<(i32, bool)>,
    update: fn(&mut World, Entity),
}

fn probe<T: Updatable>(world: &World, entity: Entity) -> Option<(i32, bool)> {
    world
        .get::<T>(entity)
        .map(|updatable| (updatable.execution_order(), updatable.needs_update_on_editing()))
}

/// Component types that [`UpdateController`]s know how to drive.
#[derive(Resource, Default, Clone)]
pub struct UpdatableRegistry {
    entries: Vec<UpdatableEntry>,
}

impl UpdatableRegistry {
    /// Registers `T`, returning `false` if it was already registered.
    pub fn register<T: Updatable>(&mut self) -> bool {
        let type_id = TypeId::of::<T>();
        if self.entries.iter().any(|entry| entry.type_id == type_id) {
            return false;
        }

        self.entries.push(UpdatableEntry {
            type_id,
            probe: probe::<T>,
            update: T::on_late_update,
        });
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Update functions of the registered components present on `entity`, ordered by
    /// execution order. Ties keep registration order.
    fn scheduled_for(
        &self,
        world: &World,
        entity: Entity,
        mode: UpdateMode,
    ) -> Vec<fn(&mut World, Entity)> {
        let mut scheduled: Vec<(i32, fn(&mut World, Entity))> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let (order, needs_update_on_editing) = (entry.probe)(world, entity)?;
                if mode == UpdateMode::Editing && !needs_update_on_editing {
                    return None;
                }
                Some((order, entry.update))
            })
            .collect();

        scheduled.sort_by_key(|(order, _)| *order);
        scheduled.into_iter().map(|(_, update)| update).collect()
    }
}

pub trait UpdatableAppExt {
    /// Lets [`UpdateController`]s drive the late update of `T`.
    fn register_updatable<T: Updatable>(&mut self) -> &mut Self;
}

impl UpdatableAppExt for App {
    fn register_updatable<T: Updatable>(&mut self) -> &mut Self {
        self.init_resource::<UpdatableRegistry>();
        let newly_registered = self
            .world_mut()
            .resource_mut::<UpdatableRegistry>()
            .register::<T>();
        if newly_registered {
            debug!(
                "Registered updatable component {}",
                std::any::type_name::<T>()
            );
        }
        self
    }
}

/// Runs the late update of every entity carrying an [`UpdateController`].
pub fn run_update_controllers(world: &mut World) {
    let Some(registry) = world.get_resource::<UpdatableRegistry>().cloned() else {
        return;
    };
    let mode = world
        .get_resource::<UpdateMode>()
        .copied()
        .unwrap_or_default();

    let mut query = world.query_filtered::<Entity, With<UpdateController>>();
    let entities: Vec<Entity> = query.iter(world).collect();

    for entity in entities {
        for update in registry.scheduled_for(world, entity, mode) {
            update(world, entity);
        }
    }
}
