// SPDX-License-Identifier: LGPL-3.0-only

/// Re-entrancy guards around reflected attribute writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    /// Held while the label is written back to the content node.
    Label,
    /// Held while `disabled` is written back to the content node.
    Sensitivity,
}

/// Per-node synchronization state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeState {
    pub(crate) dirty: bool,
    pub(crate) content_visible: bool,
    pub(crate) on_screen: bool,
    pub(crate) open_or_opening: bool,
    pub(crate) needs_rebuild: bool,
    pub(crate) ready: bool,
    pub(crate) label_guard: bool,
    pub(crate) sensitivity_guard: bool,
    pub(crate) show_only_for_keyboard: bool,
    pub(crate) with_favicon: bool,
    pub(crate) toggle_active: bool,
    pub(crate) is_checkbox: bool,
    pub(crate) is_radio: bool,
    pub(crate) registered: bool,
}

impl NodeState {
    /// Stale; must be fully resynchronized before it is shown again.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Neither hidden nor collapsed in content.
    pub fn is_content_visible(&self) -> bool {
        self.content_visible
    }

    /// Part of an open menu chain.
    pub fn is_on_screen(&self) -> bool {
        self.on_screen
    }

    /// A container that is open or in the middle of opening.
    pub fn is_open_or_opening(&self) -> bool {
        self.open_or_opening
    }

    /// A container whose children must be rebuilt before showing.
    pub fn needs_rebuild(&self) -> bool {
        self.needs_rebuild
    }

    /// A container that already absorbed its spurious first about-to-open.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// A reflected write is in progress.
    pub fn events_blocked(&self) -> bool {
        self.label_guard || self.sensitivity_guard
    }

    /// Carries the `show-only-for-keyboard` class.
    pub fn show_only_for_keyboard(&self) -> bool {
        self.show_only_for_keyboard
    }

    /// Carries the `menuitem-with-favicon` class.
    pub fn with_favicon(&self) -> bool {
        self.with_favicon
    }

    /// A checked checkbox or radio item.
    pub fn is_toggle_active(&self) -> bool {
        self.toggle_active
    }

    /// A checkbox item.
    pub fn is_checkbox(&self) -> bool {
        self.is_checkbox
    }

    /// A radio item.
    pub fn is_radio(&self) -> bool {
        self.is_radio
    }

    /// A bar acknowledged by the shell.
    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub(crate) fn guard_held(&self, guard: Guard) -> bool {
        match guard {
            Guard::Label => self.label_guard,
            Guard::Sensitivity => self.sensitivity_guard,
        }
    }

    pub(crate) fn set_guard(&mut self, guard: Guard, held: bool) {
        match guard {
            Guard::Label => self.label_guard = held,
            Guard::Sensitivity => self.sensitivity_guard = held,
        }
    }
}
