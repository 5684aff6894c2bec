// SPDX-License-Identifier: LGPL-3.0-only
//! Settings and icon loading services for globalmenu.

/// Filesystem backed icon source.
pub mod icon_source;
/// Layered TOML settings.
pub mod settings;

pub use icon_source::FileIconSource;
pub use settings::{Config, SettingsRegistry};
