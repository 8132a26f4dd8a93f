use listkit::Vec2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PointerButton {
    /// Left mouse button, pen contact or touch.
    #[default]
    Primary,
    Secondary,
    Middle,
    Other(u16),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// The platform command key (⌘ on macOS).
    pub command: bool,
}

impl Modifiers {
    pub const NONE: Self = Self {
        shift: false,
        ctrl: false,
        alt: false,
        command: false,
    };

    pub const SHIFT: Self = Self {
        shift: true,
        ..Self::NONE
    };

    pub const CTRL: Self = Self {
        ctrl: true,
        ..Self::NONE
    };

    pub const COMMAND: Self = Self {
        command: true,
        ..Self::NONE
    };

    /// Ctrl or command: toggles single-item membership.
    pub fn is_toggle(&self) -> bool {
        self.ctrl || self.command
    }
}

/// One sample of the pointer/touch event stream.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PointerEvent {
    /// Viewport-local position.
    pub position: Vec2,
    pub button: PointerButton,
    pub modifiers: Modifiers,
    pub timestamp_ms: u64,
    pub pointer_id: u64,
    /// False for the extra fingers of a multi-touch gesture.
    pub is_primary: bool,
}

impl PointerEvent {
    /// A primary-button event from pointer 0 with no modifiers.
    pub fn new(position: Vec2, timestamp_ms: u64) -> Self {
        Self {
            position,
            button: PointerButton::Primary,
            modifiers: Modifiers::NONE,
            timestamp_ms,
            pointer_id: 0,
            is_primary: true,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_button(mut self, button: PointerButton) -> Self {
        self.button = button;
        self
    }

    pub fn with_pointer(mut self, pointer_id: u64, is_primary: bool) -> Self {
        self.pointer_id = pointer_id;
        self.is_primary = is_primary;
        self
    }
}

/// Keyboard navigation, already decoded from key events by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NavigationCommand {
    Previous,
    Next,
    Home,
    End,
    PageUp,
    PageDown,
    SelectAll,
    Cancel,
}
