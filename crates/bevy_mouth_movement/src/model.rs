use std::marker::PhantomData;

use bevy::{
    ecs::{
        component::Component,
        entity::Entity,
        hierarchy::{ChildOf, Children},
        query::With,
        system::{Query, SystemParam},
    },
    prelude::ReflectComponent,
    reflect::{Reflect, std_traits::ReflectDefault},
};

use crate::{blend::ParameterBlendMode, update::UpdateController};

/// Root of a parameter-driven character model.
///
/// Controllers attached to the model root or to any of its descendants belong to it.
#[derive(Component, Reflect, Debug, Default, Clone, Copy)]
#[reflect(Component, Default)]
pub struct Model;

/// A scalar control slot of a [`Model`].
///
/// The range is informative: blending never clamps, enforcing it is up to the model.
#[derive(Component, Reflect, Debug, Clone, PartialEq)]
#[reflect(Component, Default)]
pub struct Parameter {
    pub id: String,
    pub value: f32,
    pub minimum: f32,
    pub maximum: f32,
    pub default: f32,
}

impl Default for Parameter {
    fn default() -> Self {
        Self::new("", 0.)
    }
}

impl Parameter {
    /// A parameter in the `[0, 1]` range whose default is its initial value.
    pub fn new(id: impl Into<String>, value: f32) -> Self {
        Self {
            id: id.into(),
            value,
            minimum: 0.,
            maximum: 1.,
            default: value,
        }
    }

    pub fn with_range(mut self, minimum: f32, maximum: f32) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn blend_to_value(&mut self, mode: ParameterBlendMode, value: f32) {
        self.value = mode.blend(self.value, value);
    }
}

/// Tags a [`Parameter`] as driven by a [`MouthController`](crate::controller::MouthController).
#[derive(Component, Reflect, Debug, Default, Clone, Copy)]
#[reflect(Component, Default)]
pub struct MouthParameter;

/// What a refresh found on the model owning a controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelParameters {
    pub model: Entity,
    /// Parameters carrying the requested tag, in discovery order.
    pub parameters: Vec<Entity>,
    /// Whether an [`UpdateController`] sits on the controller's own entity.
    pub has_update_controller: bool,
}

/// Resolves the model a controller entity belongs to, and the parameters on that model
/// tagged with `Tag`.
#[derive(SystemParam)]
pub struct ModelLookup<'w, 's, Tag: Component> {
    models: Query<'w, 's, (), With<Model>>,
    parents: Query<'w, 's, &'static ChildOf>,
    children: Query<'w, 's, &'static Children>,
    tagged: Query<'w, 's, (), (With<Tag>, With<Parameter>)>,
    update_controllers: Query<'w, 's, (), With<UpdateController>>,
    _tag: PhantomData<Tag>,
}

impl<Tag: Component> ModelLookup<'_, '_, Tag> {
    /// The first entity carrying [`Model`] among `entity` and its ancestors.
    pub fn find_model(&self, entity: Entity) -> Option<Entity> {
        let mut current = entity;
        loop {
            if self.models.contains(current) {
                return Some(current);
            }
            current = self.parents.get(current).ok()?.parent();
        }
    }

    /// Tagged parameters below `model` (inclusive), depth-first, children in order.
    ///
    /// Models nested below `model` own their parameters and are not descended into.
    pub fn tagged_parameters(&self, model: Entity) -> Vec<Entity> {
        let mut found = Vec::new();
        let mut stack = vec![model];

        while let Some(entity) = stack.pop() {
            if entity != model && self.models.contains(entity) {
                continue;
            }
            if self.tagged.contains(entity) {
                found.push(entity);
            }
            if let Ok(children) = self.children.get(entity) {
                stack.extend(children.iter().rev());
            }
        }

        found
    }

    /// Everything a controller on `entity` needs to refresh, or `None` if it is not part of
    /// any model.
    pub fn discover(&self, entity: Entity) -> Option<ModelParameters> {
        let model = self.find_model(entity)?;

        Some(ModelParameters {
            model,
            parameters: self.tagged_parameters(model),
            has_update_controller: self.update_controllers.contains(entity),
        })
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::{system::RunSystemOnce, world::World};

    use super::*;

    fn discover(world: &mut World, entity: Entity) -> Option<ModelParameters> {
        world
            .run_system_once(move |lookup: ModelLookup<MouthParameter>| lookup.discover(entity))
            .unwrap()
    }

    #[test]
    fn finds_model_on_ancestor() {
        let mut world = World::new();
        let model = world.spawn(Model).id();
        let group = world.spawn(ChildOf(model)).id();
        let controller = world.spawn(ChildOf(group)).id();

        let found = discover(&mut world, controller).unwrap();
        assert_eq!(found.model, model);
        assert!(found.parameters.is_empty());
        assert!(!found.has_update_controller);
    }

    #[test]
    fn no_model_in_hierarchy() {
        let mut world = World::new();
        let root = world.spawn_empty().id();
        let controller = world.spawn(ChildOf(root)).id();

        assert_eq!(discover(&mut world, controller), None);
    }

    #[test]
    fn collects_tagged_parameters_in_discovery_order() {
        let mut world = World::new();
        let model = world.spawn(Model).id();
        let parameters = world.spawn(ChildOf(model)).id();
        let mouth_open = world
            .spawn((Parameter::new("ParamMouthOpenY", 0.), MouthParameter, ChildOf(parameters)))
            .id();
        world.spawn((Parameter::new("ParamEyeLOpen", 1.), ChildOf(parameters)));
        let nested_group = world.spawn(ChildOf(parameters)).id();
        let nested = world
            .spawn((Parameter::new("ParamMouthForm", 0.), MouthParameter, ChildOf(nested_group)))
            .id();
        let mouth_wide = world
            .spawn((Parameter::new("ParamMouthWide", 0.), MouthParameter, ChildOf(parameters)))
            .id();
        // Tag without a parameter is not a destination.
        world.spawn((MouthParameter, ChildOf(parameters)));

        let found = discover(&mut world, model).unwrap();
        assert_eq!(found.parameters, vec![mouth_open, nested, mouth_wide]);
    }

    #[test]
    fn nested_models_keep_their_parameters() {
        let mut world = World::new();
        let outer = world.spawn(Model).id();
        let own = world
            .spawn((Parameter::new("ParamMouthOpenY", 0.8), MouthParameter, ChildOf(outer)))
            .id();
        let inner = world.spawn((Model, ChildOf(outer))).id();
        let inner_group = world.spawn(ChildOf(inner)).id();
        let inner_parameter = world
            .spawn((Parameter::new("ParamMouthOpenY", 0.8), MouthParameter, ChildOf(inner_group)))
            .id();

        assert_eq!(discover(&mut world, outer).unwrap().parameters, vec![own]);
        assert_eq!(
            discover(&mut world, inner).unwrap().parameters,
            vec![inner_parameter]
        );
    }

    #[test]
    fn detects_update_controller_on_own_entity_only() {
        let mut world = World::new();
        let model = world.spawn((Model, UpdateController)).id();
        let controller = world.spawn(ChildOf(model)).id();

        assert!(discover(&mut world, model).unwrap().has_update_controller);
        assert!(!discover(&mut world, controller).unwrap().has_update_controller);
    }

    #[test]
    fn parameter_blend_to_value() {
        let mut parameter = Parameter::new("ParamMouthOpenY", 0.5).with_range(-1., 2.);
        parameter.blend_to_value(ParameterBlendMode::Additive, 0.25);
        assert_eq!(parameter.value, 0.75);
        assert_eq!(parameter.default, 0.5);
        assert_eq!((parameter.minimum, parameter.maximum), (-1., 2.));
    }
}
