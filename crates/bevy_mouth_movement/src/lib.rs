//! # Bevy Mouth Movement
//!
//! Drives the mouth parameters of a parameter-based character model (Live2D style) from a
//! single "mouth opening" value.
//!
//! ## Model layout
//!
//! A model is an entity hierarchy rooted at an entity with a [`Model`] component. Each
//! scalar control of the model is an entity with a [`Parameter`] component somewhere below
//! the root. Parameters that should follow the mouth opening are tagged with
//! [`MouthParameter`]:
//!
//! ```ignore
//! let model = commands.spawn((Model, MouthController::default())).id();
//! commands.spawn((
//!     Parameter::new("ParamMouthOpenY", 1.),
//!     MouthParameter,
//!     ChildOf(model),
//! ));
//! ```
//!
//! ## Controller
//!
//! A [`MouthController`] placed on the model root (or on any entity below it) looks up the
//! tagged parameters when it is added, and every frame blends
//! [`mouth_opening`](MouthController::mouth_opening) into them using its
//! [`ParameterBlendMode`]:
//!
//! - `Override`: `value = opening`
//! - `Additive`: `value = value + opening`
//! - `Multiply`: `value = value * opening` (the default)
//!
//! Values are never clamped to the parameter range. A controller that is not part of any
//! model silently does nothing. After adding or removing mouth parameters, trigger
//! [`RefreshMouthController`] to rebuild the controller's cache.
//!
//! ## Update order
//!
//! Controllers run in [`MouthMovementSystems::LateUpdate`], after animation and before
//! transform propagation. To run several controllers of a model in a fixed order, add an
//! [`UpdateController`] to their entity: it then runs every [`Updatable`] component of
//! that entity sorted by execution order, instead of letting each of them schedule itself.
//!
//! [`Model`]: crate::model::Model
//! [`Parameter`]: crate::model::Parameter
//! [`MouthParameter`]: crate::model::MouthParameter
//! [`MouthController`]: crate::controller::MouthController
//! [`RefreshMouthController`]: crate::controller::RefreshMouthController
//! [`ParameterBlendMode`]: crate::blend::ParameterBlendMode
//! [`MouthMovementSystems::LateUpdate`]: crate::plugin::MouthMovementSystems::LateUpdate
//! [`UpdateController`]: crate::update::UpdateController
//! [`Updatable`]: crate::update::Updatable

pub mod blend;
pub mod controller;
pub mod errors;
pub mod model;
pub mod plugin;
pub mod update;

pub mod prelude {
    pub use super::blend::{ParameterAccess, ParameterBlendMode, blend_to_value};
    pub use super::controller::{
        MOUTH_CONTROLLER_EXECUTION_ORDER, MouthController, RefreshMouthController,
    };
    pub use super::errors::ParseBlendModeError;
    pub use super::model::{Model, ModelLookup, ModelParameters, MouthParameter, Parameter};
    pub use super::plugin::{MouthMovementPlugin, MouthMovementSystems};
    pub use super::update::{
        Updatable, UpdatableAppExt, UpdatableRegistry, UpdateController, UpdateMode,
        run_update_controllers,
    };
}
