use std::{fmt, str::FromStr};

use bevy::{
    ecs::{entity::Entity, system::Query, world::World},
    reflect::{Reflect, std_traits::ReflectDefault},
};
use serde::{Deserialize, Serialize};

use crate::{errors::ParseBlendModeError, model::Parameter};

/// How a target value is combined with a parameter's current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
#[reflect(Default)]
pub enum ParameterBlendMode {
    /// Replaces the current value.
    #[default]
    Override,
    /// Adds the target to the current value.
    Additive,
    /// Multiplies the current value by the target.
    Multiply,
}

impl ParameterBlendMode {
    pub fn blend(self, current: f32, target: f32) -> f32 {
        match self {
            Self::Override => target,
            Self::Additive => current + target,
            Self::Multiply => current * target,
        }
    }
}

impl fmt::Display for ParameterBlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Override => "Override",
            Self::Additive => "Additive",
            Self::Multiply => "Multiply",
        };
        f.write_str(name)
    }
}

impl FromStr for ParameterBlendMode {
    type Err = ParseBlendModeError;

    /// Accepts both the variant names and the short names used by model expression files
    /// (`Add`, `Multiply`, `Overwrite`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "override" | "overwrite" => Ok(Self::Override),
            "additive" | "add" => Ok(Self::Additive),
            "multiply" => Ok(Self::Multiply),
            _ => Err(ParseBlendModeError(s.to_string())),
        }
    }
}

/// Mutable access to [`Parameter`]s by entity.
///
/// Implemented for a parameter query (regular systems) and for [`World`] (exclusive
/// systems such as the update coordinator), so the same blending code serves both.
pub trait ParameterAccess {
    /// Calls `f` with the entity's parameter. Does nothing if the entity has none.
    fn with_parameter(&mut self, entity: Entity, f: impl FnOnce(&mut Parameter));
}

impl ParameterAccess for Query<'_, '_, &mut Parameter> {
    fn with_parameter(&mut self, entity: Entity, f: impl FnOnce(&mut Parameter)) {
        if let Ok(mut parameter) = self.get_mut(entity) {
            f(&mut parameter);
        }
    }
}

impl ParameterAccess for World {
    fn with_parameter(&mut self, entity: Entity, f: impl FnOnce(&mut Parameter)) {
        if let Some(mut parameter) = self.get_mut::<Parameter>(entity) {
            f(&mut parameter);
        }
    }
}

/// Blends `value` into every destination parameter, once each.
///
/// Values are not clamped to the parameter range.
pub fn blend_to_value(
    destinations: &[Entity],
    parameters: &mut impl ParameterAccess,
    mode: ParameterBlendMode,
    value: f32,
) {
    for destination in destinations {
        parameters.with_parameter(*destination, |parameter| {
            parameter.blend_to_value(mode, value);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-6,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn blend_formulas() {
        for (current, target) in [(0.2, 0.5), (0.0, 1.0), (1.0, 0.0), (-0.5, 0.3)] {
            assert_close(ParameterBlendMode::Override.blend(current, target), target);
            assert_close(
                ParameterBlendMode::Additive.blend(current, target),
                current + target,
            );
            assert_close(
                ParameterBlendMode::Multiply.blend(current, target),
                current * target,
            );
        }
    }

    #[test]
    fn additive_does_not_clamp() {
        assert_close(ParameterBlendMode::Additive.blend(0.9, 0.5), 1.4);
    }

    #[test]
    fn parse_blend_mode_names() {
        assert_eq!(
            "Overwrite".parse::<ParameterBlendMode>(),
            Ok(ParameterBlendMode::Override)
        );
        assert_eq!(
            "add".parse::<ParameterBlendMode>(),
            Ok(ParameterBlendMode::Additive)
        );
        assert_eq!(
            " Multiply ".parse::<ParameterBlendMode>(),
            Ok(ParameterBlendMode::Multiply)
        );
        assert_eq!(
            "Screen".parse::<ParameterBlendMode>(),
            Err(ParseBlendModeError("Screen".to_string()))
        );
    }

    #[test]
    fn display_parses_back() {
        for mode in [
            ParameterBlendMode::Override,
            ParameterBlendMode::Additive,
            ParameterBlendMode::Multiply,
        ] {
            assert_eq!(mode.to_string().parse::<ParameterBlendMode>(), Ok(mode));
        }
    }

    #[test]
    fn blend_mode_from_ron() {
        let mode: ParameterBlendMode = ron::from_str("Additive").unwrap();
        assert_eq!(mode, ParameterBlendMode::Additive);
    }

    #[test]
    fn blend_to_value_through_world() {
        let mut world = World::new();
        let a = world.spawn(Parameter::new("A", 0.2)).id();
        let b = world.spawn(Parameter::new("B", 0.9)).id();
        let not_a_parameter = world.spawn_empty().id();

        blend_to_value(
            &[a, not_a_parameter, b],
            &mut world,
            ParameterBlendMode::Multiply,
            0.5,
        );

        assert_close(world.get::<Parameter>(a).unwrap().value, 0.1);
        assert_close(world.get::<Parameter>(b).unwrap().value, 0.45);
    }

    #[test]
    fn blend_to_value_with_no_destinations() {
        let mut world = World::new();
        let a = world.spawn(Parameter::new("A", 0.2)).id();

        blend_to_value(&[], &mut world, ParameterBlendMode::Override, 0.8);

        assert_close(world.get::<Parameter>(a).unwrap().value, 0.2);
    }
}
