use glam::Vec2;

use crate::action::{CameraAction, PointerOutcome};

/// Modifier keys held at press time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

/// What a drag does, fixed for the whole press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragMode {
    /// Default: move the look-at point.
    Pan,
    /// Ctrl or Alt: turn the camera.
    Orbit,
    /// Shift: rubber-band selection.
    BoxSelect,
}

impl DragMode {
    pub fn from_modifiers(modifiers: Modifiers) -> Self {
        if modifiers.shift {
            DragMode::BoxSelect
        } else if modifiers.ctrl || modifiers.alt {
            DragMode::Orbit
        } else {
            DragMode::Pan
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Press {
    mode: DragMode,
    modifiers: Modifiers,
    start: Vec2,
    last: Vec2,
    /// Moved beyond the click threshold at some point.
    dragged: bool,
}

/// Turns press/motion/release into camera actions and pick requests.
#[derive(Debug, Clone)]
pub struct DragController {
    click_threshold: f32,
    press: Option<Press>,
}

impl DragController {
    /// `click_threshold` is the largest pointer travel, in pixels, still treated as a click.
    pub fn new(click_threshold: f32) -> Self {
        Self {
            click_threshold,
            press: None,
        }
    }

    pub fn press(&mut self, position: Vec2, modifiers: Modifiers) -> DragMode {
        let mode = DragMode::from_modifiers(modifiers);
        tracing::trace!(?mode, ?position, "pointer pressed");
        self.press = Some(Press {
            mode,
            modifiers,
            start: position,
            last: position,
            dragged: false,
        });
        mode
    }

    /// Pointer moved. Camera drags report their delta; box selection reports nothing
    /// until release.
    pub fn motion(&mut self, position: Vec2) -> Option<CameraAction> {
        let press = self.press.as_mut()?;
        if press.start.distance(position) > self.click_threshold {
            press.dragged = true;
        }
        let delta = position - press.last;
        press.last = position;
        if delta == Vec2::ZERO {
            return None;
        }
        match press.mode {
            DragMode::Pan => Some(CameraAction::Pan(delta)),
            DragMode::Orbit => Some(CameraAction::Orbit(delta)),
            DragMode::BoxSelect => None,
        }
    }

    pub fn release(&mut self, position: Vec2) -> PointerOutcome {
        let Some(press) = self.press.take() else {
            return PointerOutcome::None;
        };
        let dragged = press.dragged || press.start.distance(position) > self.click_threshold;
        if !dragged {
            return PointerOutcome::Click {
                position: press.start,
                toggle: press.modifiers.shift,
            };
        }
        match press.mode {
            DragMode::BoxSelect => PointerOutcome::BoxSelect {
                from: press.start,
                to: position,
            },
            DragMode::Pan | DragMode::Orbit => PointerOutcome::None,
        }
    }

    /// Mouse wheel; positive `delta` moves the camera away.
    pub fn wheel(&self, delta: f32) -> Option<CameraAction> {
        (delta != 0.0).then(|| CameraAction::Zoom(delta.signum()))
    }

    /// Rectangle being dragged, for drawing the rubber band.
    pub fn rubber_band(&self) -> Option<(Vec2, Vec2)> {
        let press = self.press.as_ref()?;
        (press.mode == DragMode::BoxSelect && press.dragged).then_some((press.start, press.last))
    }

    pub fn is_pressed(&self) -> bool {
        self.press.is_some()
    }
}
