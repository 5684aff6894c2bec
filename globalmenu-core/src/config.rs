// SPDX-License-Identifier: LGPL-3.0-only
use std::time::Duration;

use crate::icon::MAX_ICON_SIZE;
use crate::keys::key_code;
use crate::label::MAX_LABEL_CHARS;

/// Runtime preferences consulted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuPreferences {
    /// Show icons in menus. Items with the favicon class always show theirs.
    pub menus_have_icons: bool,
    /// DOM key code of the menu access key (`ui.key.menuAccessKey`).
    pub menu_access_key: u32,
    /// Delay before presenting a menu opened from the keyboard.
    pub open_delay: Duration,
    /// Largest icon dimension sent to the shell.
    pub max_icon_size: u32,
    /// Longest label sent to the shell, in characters.
    pub max_label_chars: usize,
}

impl Default for MenuPreferences {
    fn default() -> Self {
        Self {
            menus_have_icons: true,
            menu_access_key: key_code::ALT,
            open_delay: Duration::from_millis(100),
            max_icon_size: MAX_ICON_SIZE,
            max_label_chars: MAX_LABEL_CHARS,
        }
    }
}
