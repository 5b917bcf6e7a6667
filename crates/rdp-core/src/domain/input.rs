//! Pointer and keyboard events injected into the remote session.
//!
//! Coordinates are absolute desktop pixels.  Key codes are RDP keyboard
//! scan codes and are passed through to the engine untouched.

/// Mouse button attached to a [`PointerEvent`].
///
/// `None` marks a pure motion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PointerButton {
    None = 0,
    Left = 1,
    Right = 2,
    Middle = 3,
}

impl TryFrom<u32> for PointerButton {
    type Error = u32;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PointerButton::None),
            1 => Ok(PointerButton::Left),
            2 => Ok(PointerButton::Right),
            3 => Ok(PointerButton::Middle),
            other => Err(other),
        }
    }
}

/// A pointer move and/or button transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerEvent {
    /// Horizontal position in desktop pixels.
    pub x: u16,
    /// Vertical position in desktop pixels.
    pub y: u16,
    /// Button whose state changed, or [`PointerButton::None`].
    pub button: PointerButton,
    /// `true` for press, `false` for release.
    pub down: bool,
}

impl PointerEvent {
    pub fn new(x: u16, y: u16, button: PointerButton, down: bool) -> Self {
        Self { x, y, button, down }
    }
}

/// A single key press or release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyboardEvent {
    /// RDP scan code.
    pub code: u16,
    /// `true` for press, `false` for release.
    pub down: bool,
}

impl KeyboardEvent {
    pub fn new(code: u16, down: bool) -> Self {
        Self { code, down }
    }
}
