// SPDX-License-Identifier: LGPL-3.0-only
use crate::config::MenuPreferences;
use crate::icon::IconSource;
use crate::label::{CaseConverter, UnicodeCase};

/// Service handles handed to the engine at construction.
///
/// Both handles are optional. Without a case converter access keys fold as
/// ASCII; without an icon source icons are skipped.
pub struct Services {
    /// Case conversion for access-key matching.
    pub case: Option<Box<dyn CaseConverter>>,
    /// Icon fetching.
    pub icons: Option<Box<dyn IconSource>>,
    /// Preferences.
    pub prefs: MenuPreferences,
}

impl Services {
    /// Unicode case conversion, no icon source.
    pub fn new(prefs: MenuPreferences) -> Self {
        Self {
            case: Some(Box::new(UnicodeCase)),
            icons: None,
            prefs,
        }
    }

    /// Use `source` to fetch icons.
    pub fn with_icon_source(mut self, source: impl IconSource + 'static) -> Self {
        self.icons = Some(Box::new(source));
        self
    }

    /// Drop the case converter.
    pub fn without_case_converter(mut self) -> Self {
        self.case = None;
        self
    }

    pub(crate) fn case(&self) -> Option<&dyn CaseConverter> {
        self.case.as_deref()
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::new(MenuPreferences::default())
    }
}
