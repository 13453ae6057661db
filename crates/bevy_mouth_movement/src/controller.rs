use bevy::{
    ecs::{
        change_detection::DetectChangesMut,
        component::Component,
        entity::Entity,
        event::EntityEvent,
        observer::On,
        query::{Added, Without},
        system::Query,
        world::World,
    },
    log::trace,
    prelude::ReflectComponent,
    reflect::{Reflect, std_traits::ReflectDefault},
};
use serde::{Deserialize, Serialize};

use crate::{
    blend::{ParameterAccess, ParameterBlendMode, blend_to_value},
    model::{ModelLookup, ModelParameters, MouthParameter, Parameter},
    update::{Updatable, UpdateController},
};

/// Position of [`MouthController`] among the components run by an
/// [`UpdateController`](crate::update::UpdateController).
pub const MOUTH_CONTROLLER_EXECUTION_ORDER: i32 = 500;

/// Drives every [`MouthParameter`] of the model it belongs to towards
/// [`mouth_opening`](Self::mouth_opening).
///
/// The model is the closest entity carrying [`Model`](crate::model::Model), starting at the
/// controller's own entity and walking up its ancestors. A controller can therefore sit on
/// the model root or on any entity below it. Parameters of models nested inside that model
/// are not driven.
///
/// On an entity with an [`UpdateController`] the late update is left to the update
/// controller; otherwise the controller schedules itself.
///
/// The controller caches the parameters it drives. The cache is filled when the
/// controller is added and can be rebuilt after adding or removing mouth parameters by
/// triggering [`RefreshMouthController`].
#[derive(Component, Reflect, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[reflect(Component, Default)]
#[serde(default)]
pub struct MouthController {
    pub blend_mode: ParameterBlendMode,
    /// Target opening, in `[0, 1]`.
    pub mouth_opening: f32,
    pub enabled: bool,
    #[reflect(ignore)]
    #[serde(skip)]
    destinations: Option<Vec<Entity>>,
    #[reflect(ignore)]
    #[serde(skip)]
    has_update_controller: bool,
}

impl Default for MouthController {
    fn default() -> Self {
        Self {
            blend_mode: ParameterBlendMode::Multiply,
            mouth_opening: 1.,
            enabled: true,
            destinations: None,
            has_update_controller: false,
        }
    }
}

impl MouthController {
    pub fn with_blend_mode(mut self, blend_mode: ParameterBlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    pub fn with_mouth_opening(mut self, mouth_opening: f32) -> Self {
        self.set_mouth_opening(mouth_opening);
        self
    }

    /// Sets the target opening, clamped to `[0, 1]`.
    pub fn set_mouth_opening(&mut self, mouth_opening: f32) {
        self.mouth_opening = mouth_opening.clamp(0., 1.);
    }

    /// Parameters currently driven, `None` until the first successful refresh.
    pub fn destinations(&self) -> Option<&[Entity]> {
        self.destinations.as_deref()
    }

    /// Whether an [`UpdateController`] was on the controller's entity at the last refresh.
    ///
    /// Scheduling does not rely on it: whoever drives the controller is decided every frame
    /// from the components present on the entity.
    pub fn has_update_controller(&self) -> bool {
        self.has_update_controller
    }

    /// Replaces the cached parameters with the ones discovered on the owning model.
    ///
    /// Without a model (`None`) the cache is kept as it is.
    pub fn refresh(&mut self, discovered: Option<ModelParameters>) {
        let Some(discovered) = discovered else {
            return;
        };

        self.destinations = Some(discovered.parameters);
        self.has_update_controller = discovered.has_update_controller;
    }

    /// Blends the mouth opening into every cached parameter.
    pub fn apply(&self, parameters: &mut impl ParameterAccess) {
        if !self.enabled {
            return;
        }
        let Some(destinations) = &self.destinations else {
            return;
        };

        blend_to_value(destinations, parameters, self.blend_mode, self.mouth_opening);
    }
}

impl Updatable for MouthController {
    fn execution_order(&self) -> i32 {
        MOUTH_CONTROLLER_EXECUTION_ORDER
    }

    fn needs_update_on_editing(&self) -> bool {
        false
    }

    fn on_late_update(world: &mut World, entity: Entity) {
        let Some(mut controller) = world.get_mut::<MouthController>(entity) else {
            return;
        };
        let controller = controller.bypass_change_detection();
        if !controller.enabled {
            return;
        }
        let (blend_mode, mouth_opening) = (controller.blend_mode, controller.mouth_opening);
        // Moved out while the parameters are written, put back afterwards.
        let Some(destinations) = controller.destinations.take() else {
            return;
        };

        blend_to_value(&destinations, world, blend_mode, mouth_opening);

        if let Some(mut controller) = world.get_mut::<MouthController>(entity) {
            controller.bypass_change_detection().destinations = Some(destinations);
        }
    }
}

/// Rebuilds the parameter cache of the [`MouthController`] on `entity`.
#[derive(EntityEvent, Debug, Clone, Copy)]
pub struct RefreshMouthController {
    pub entity: Entity,
}

impl RefreshMouthController {
    pub fn observe(
        refresh: On<RefreshMouthController>,
        mut controllers: Query<&mut MouthController>,
        lookup: ModelLookup<MouthParameter>,
    ) {
        let Ok(mut controller) = controllers.get_mut(refresh.entity) else {
            return;
        };
        refresh_mouth_controller(refresh.entity, &mut controller, &lookup);
    }
}

fn refresh_mouth_controller(
    entity: Entity,
    controller: &mut MouthController,
    lookup: &ModelLookup<MouthParameter>,
) {
    let discovered = lookup.discover(entity);
    if let Some(discovered) = &discovered {
        trace!(
            "Mouth controller {entity} drives {} parameters of model {}",
            discovered.parameters.len(),
            discovered.model
        );
    }
    controller.refresh(discovered);
}

pub(crate) fn refresh_added_mouth_controllers(
    mut controllers: Query<(Entity, &mut MouthController), Added<MouthController>>,
    lookup: ModelLookup<MouthParameter>,
) {
    for (entity, mut controller) in &mut controllers {
        refresh_mouth_controller(entity, &mut controller, &lookup);
    }
}

/// Late update of the controllers not driven by an update controller.
pub(crate) fn late_update_mouth_controllers(
    controllers: Query<&MouthController, Without<UpdateController>>,
    mut parameters: Query<&mut Parameter>,
) {
    for controller in &controllers {
        controller.apply(&mut parameters);
    }
}
