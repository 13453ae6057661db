use bevy::{
    app::{AnimationSystems, App, Plugin, PostUpdate},
    ecs::{
        intern::Interned,
        schedule::{
            IntoScheduleConfigs, ScheduleLabel, SystemSet, common_conditions::resource_equals,
        },
    },
    transform::TransformSystems,
};

use crate::{
    blend::ParameterBlendMode,
    controller::{
        MouthController, RefreshMouthController, late_update_mouth_controllers,
        refresh_added_mouth_controllers,
    },
    model::{Model, MouthParameter, Parameter},
    update::{
        UpdatableAppExt, UpdatableRegistry, UpdateController, UpdateMode, run_update_controllers,
    },
};

/// Adds mouth movement support to an app
pub struct MouthMovementPlugin {
    /// Schedule the controllers run in. Should run after animation has been applied.
    pub schedule: Interned<dyn ScheduleLabel>,
}

impl Default for MouthMovementPlugin {
    fn default() -> Self {
        Self {
            schedule: PostUpdate.intern(),
        }
    }
}

#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash, SystemSet)]
pub enum MouthMovementSystems {
    /// Fills the parameter cache of newly added controllers
    Refresh,
    /// Blends controller values into model parameters. Runs after animation is evaluated
    /// and before transforms are propagated.
    LateUpdate,
}

impl Plugin for MouthMovementPlugin {
    fn build(&self, app: &mut App) {
        self.register_types(app);

        app.init_resource::<UpdateMode>()
            .init_resource::<UpdatableRegistry>()
            .register_updatable::<MouthController>();

        app.configure_sets(
            self.schedule,
            (
                MouthMovementSystems::Refresh,
                MouthMovementSystems::LateUpdate,
            )
                .chain(),
        );

        app.configure_sets(
            self.schedule,
            MouthMovementSystems::LateUpdate
                .after(AnimationSystems)
                .before(TransformSystems::Propagate),
        );

        app.add_systems(
            self.schedule,
            refresh_added_mouth_controllers.in_set(MouthMovementSystems::Refresh),
        );

        app.add_systems(
            self.schedule,
            (
                run_update_controllers,
                late_update_mouth_controllers.run_if(resource_equals(UpdateMode::Playing)),
            )
                .chain()
                .in_set(MouthMovementSystems::LateUpdate),
        );

        app.add_observer(RefreshMouthController::observe);
    }
}

impl MouthMovementPlugin {
    fn register_types(&self, app: &mut App) {
        app //
            .register_type::<Model>()
            .register_type::<Parameter>()
            .register_type::<MouthParameter>()
            .register_type::<ParameterBlendMode>()
            .register_type::<MouthController>()
            .register_type::<UpdateController>()
            .register_type::<UpdateMode>();
    }
}
