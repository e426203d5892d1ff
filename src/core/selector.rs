//! Preset target selection
//!
//! Activating a preset does not touch the filters. It opens a blocking
//! choice of which filter the preset should land on. While that choice is
//! open, every filter mutation is refused.

use serde::Serialize;

use super::coordinator::CoordinatorError;
use super::presets::Preset;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum PresetSelection {
    #[default]
    Idle,
    AwaitingTarget(Preset),
}

impl PresetSelection {
    pub fn is_idle(&self) -> bool {
        matches!(self, PresetSelection::Idle)
    }

    pub fn pending(&self) -> Option<Preset> {
        match self {
            PresetSelection::Idle => None,
            PresetSelection::AwaitingTarget(preset) => Some(*preset),
        }
    }

    /// Idle -> AwaitingTarget
    pub fn begin(&mut self, preset: Preset) -> Result<(), CoordinatorError> {
        self.guard_edit()?;
        *self = PresetSelection::AwaitingTarget(preset);
        Ok(())
    }

    /// AwaitingTarget -> Idle, handing back the preset to apply
    pub fn choose(&mut self) -> Result<Preset, CoordinatorError> {
        match std::mem::take(self) {
            PresetSelection::AwaitingTarget(preset) => Ok(preset),
            PresetSelection::Idle => Err(CoordinatorError::NoPendingPreset),
        }
    }

    /// AwaitingTarget -> Idle without applying anything
    pub fn dismiss(&mut self) -> Option<Preset> {
        std::mem::take(self).pending()
    }

    /// Refuse filter mutations while a target choice is open
    pub fn guard_edit(&self) -> Result<(), CoordinatorError> {
        match self {
            PresetSelection::Idle => Ok(()),
            PresetSelection::AwaitingTarget(preset) => Err(CoordinatorError::SelectionPending {
                preset: preset.label(),
            }),
        }
    }
}
