// SPDX-License-Identifier: LGPL-3.0-only
use bitflags::bitflags;

/// DOM virtual key codes the accelerator logic understands.
pub mod key_code {
    /// Shift.
    pub const SHIFT: u32 = 16;
    /// Control.
    pub const CONTROL: u32 = 17;
    /// Alt.
    pub const ALT: u32 = 18;
    /// F10, opens the first menu.
    pub const F10: u32 = 121;
    /// Meta.
    pub const META: u32 = 224;
}

bitflags! {
    /// Modifier state of a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        /// Shift held.
        const SHIFT = 1;
        /// Control held.
        const CONTROL = 2;
        /// Alt held.
        const ALT = 4;
        /// Meta held.
        const META = 8;
    }
}

impl Modifiers {
    /// Mask for the modifier produced by `key_code`, Alt for anything else.
    pub fn for_access_key(key_code: u32) -> Modifiers {
        match key_code {
            key_code::SHIFT => Modifiers::SHIFT,
            key_code::CONTROL => Modifiers::CONTROL,
            key_code::ALT => Modifiers::ALT,
            key_code::META => Modifiers::META,
            other => {
                log::warn!("Unsupported menu access key {other}, falling back to Alt");
                Modifiers::ALT
            },
        }
    }
}

/// A keyboard event delivered by the host window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    /// DOM key code.
    pub key_code: u32,
    /// Typed character for key presses.
    pub char_code: Option<char>,
    /// Modifiers held.
    pub modifiers: Modifiers,
    /// Generated by the user rather than script.
    pub trusted: bool,
    /// A listener already prevented the default action.
    pub default_prevented: bool,
}

impl KeyEvent {
    /// A trusted event for `key_code` with no modifiers.
    pub fn new(key_code: u32) -> Self {
        Self {
            key_code,
            char_code: None,
            modifiers: Modifiers::empty(),
            trusted: true,
            default_prevented: false,
        }
    }

    /// A trusted key press typing `c`.
    pub fn typed(c: char) -> Self {
        Self {
            char_code: Some(c),
            ..Self::new(0)
        }
    }

    /// Set the modifier state.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Mark the event as script generated.
    pub fn untrusted(mut self) -> Self {
        self.trusted = false;
        self
    }

    /// Mark the event as already handled.
    pub fn prevented(mut self) -> Self {
        self.default_prevented = true;
        self
    }

    pub(crate) fn should_handle(&self) -> bool {
        self.trusted && !self.default_prevented
    }
}

/// What the host should do with a key event after the bar saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Let the event continue.
    Ignored,
    /// Stop propagation and prevent the default action.
    Consumed,
}

impl KeyOutcome {
    /// `true` for [KeyOutcome::Consumed].
    pub fn is_consumed(self) -> bool {
        self == KeyOutcome::Consumed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_key_masks() {
        assert_eq!(Modifiers::for_access_key(key_code::ALT), Modifiers::ALT);
        assert_eq!(Modifiers::for_access_key(key_code::META).bits(), 8);
        assert_eq!(Modifiers::for_access_key(65), Modifiers::ALT);
    }

    #[test]
    fn test_should_handle() {
        assert!(KeyEvent::new(key_code::F10).should_handle());
        assert!(!KeyEvent::new(key_code::F10).untrusted().should_handle());
        assert!(!KeyEvent::typed('f').prevented().should_handle());
    }
}
