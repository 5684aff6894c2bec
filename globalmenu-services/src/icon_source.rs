// SPDX-License-Identifier: LGPL-3.0-only
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use globalmenu_core::icon::{IconError, IconSource};

/// Icon source reading `file://` URIs and absolute paths.
///
/// Other schemes (`chrome://` and friends) can be mapped onto directories
/// with [FileIconSource::with_root].
#[derive(Debug, Clone, Default)]
pub struct FileIconSource {
    roots: Vec<(String, PathBuf)>,
}

impl FileIconSource {
    /// Create a source that only understands local files.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve URIs starting with `prefix` below `dir`.
    pub fn with_root(mut self, prefix: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        self.roots.push((prefix.into(), dir.into()));
        self
    }

    /// Local path behind `uri`, if it has one.
    pub fn resolve(&self, uri: &str) -> Option<PathBuf> {
        if let Some(rest) = uri.strip_prefix("file://") {
            let decoded = urlencoding::decode(rest).ok()?;
            let path = PathBuf::from(decoded.as_ref());
            return path.is_absolute().then_some(path);
        }
        if Path::new(uri).is_absolute() {
            return Some(PathBuf::from(uri));
        }
        self.roots
            .iter()
            .filter_map(|(prefix, dir)| Some((prefix.len(), dir, uri.strip_prefix(prefix.as_str())?)))
            .max_by_key(|(len, _, _)| *len)
            .and_then(|(_, dir, rest)| {
                let rest = urlencoding::decode(rest).ok()?;
                // no escaping the root
                if rest.split('/').any(|part| part == "..") {
                    return None;
                }
                Some(dir.join(rest.as_ref()))
            })
    }
}

impl IconSource for FileIconSource {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, IconError> {
        let path = self
            .resolve(uri)
            .ok_or_else(|| IconError::UnsupportedUri(uri.to_string()))?;
        log::trace!("Reading icon {uri} from {path:?}");
        std::fs::read(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => IconError::NotFound(uri.to_string()),
            _ => IconError::IoError(err),
        })
    }
}
