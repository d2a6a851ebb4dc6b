use glam::Vec2;

/// A camera change produced by pointer input.
///
/// The viewer applies these to its orbit camera; it never sees raw events.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraAction {
    /// Move the look-at point by a pixel delta.
    Pan(Vec2),
    /// Turn the camera by a pixel delta.
    Orbit(Vec2),
    /// Wheel steps; positive moves away.
    Zoom(f32),
}

/// What a completed press/release produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerOutcome {
    /// Nothing beyond the camera actions already emitted.
    None,
    /// Pick at a pixel; `toggle` adds or removes instead of replacing.
    Click { position: Vec2, toggle: bool },
    /// Select everything inside the rectangle spanned by the two pixels.
    BoxSelect { from: Vec2, to: Vec2 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_compare_by_value() {
        assert_eq!(CameraAction::Zoom(1.0), CameraAction::Zoom(1.0));
        assert_ne!(
            CameraAction::Pan(Vec2::X),
            CameraAction::Orbit(Vec2::X)
        );
    }

    #[test]
    fn click_carries_toggle() {
        let o = PointerOutcome::Click {
            position: Vec2::new(3.0, 4.0),
            toggle: true,
        };
        assert!(matches!(o, PointerOutcome::Click { toggle: true, .. }));
    }
}
