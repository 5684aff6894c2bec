// SPDX-License-Identifier: LGPL-3.0-only
use std::fmt::Debug;

use indexmap::IndexMap;
use thiserror::Error;

use crate::content::ContentId;

/// Inconsistent observer bookkeeping.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// The observer already listens to this content node.
    #[error("Observer already registered for content {0:?}")]
    AlreadyRegistered(ContentId),

    /// The observer never registered for this content node.
    #[error("Observer not registered for content {0:?}")]
    NotRegistered(ContentId),

    /// The observer is already a fallback observer.
    #[error("Fallback observer already registered")]
    FallbackAlreadyRegistered,

    /// The observer is not a fallback observer.
    #[error("Fallback observer not registered")]
    FallbackNotRegistered,
}

/// Routes content change notifications to the observers interested in a
/// content node, or to the fallback observers when nobody registered for it.
///
/// Observers are plain handles; the owner of the router resolves and invokes
/// them. Observers of one node are returned in registration order.
#[derive(Debug)]
pub struct ChangeRouter<O> {
    table: IndexMap<ContentId, Vec<O>>,
    fallback: Vec<O>,
}

impl<O: Copy + Eq + Debug> ChangeRouter<O> {
    /// Create an empty router.
    pub fn new() -> Self {
        Self {
            table: IndexMap::new(),
            fallback: Vec::new(),
        }
    }

    /// Attach `observer` to `content`.
    pub fn register(&mut self, content: ContentId, observer: O) -> Result<(), RouterError> {
        let list = self.table.entry(content).or_default();
        if list.contains(&observer) {
            return Err(RouterError::AlreadyRegistered(content));
        }
        list.push(observer);
        Ok(())
    }

    /// Detach `observer` from `content`. The table entry goes away with its
    /// last observer.
    pub fn unregister(&mut self, content: ContentId, observer: O) -> Result<(), RouterError> {
        let Some(list) = self.table.get_mut(&content) else {
            return Err(RouterError::NotRegistered(content));
        };
        let Some(position) = list.iter().position(|o| *o == observer) else {
            return Err(RouterError::NotRegistered(content));
        };
        list.remove(position);
        if list.is_empty() {
            self.table.shift_remove(&content);
        }
        Ok(())
    }

    /// Attach a catch-all observer.
    pub fn register_fallback(&mut self, observer: O) -> Result<(), RouterError> {
        if self.fallback.contains(&observer) {
            return Err(RouterError::FallbackAlreadyRegistered);
        }
        self.fallback.push(observer);
        Ok(())
    }

    /// Detach a catch-all observer.
    pub fn unregister_fallback(&mut self, observer: O) -> Result<(), RouterError> {
        let Some(position) = self.fallback.iter().position(|o| *o == observer) else {
            return Err(RouterError::FallbackNotRegistered);
        };
        self.fallback.remove(position);
        Ok(())
    }

    /// Observers that should receive a notification about `content`.
    ///
    /// Returns a snapshot so observers may (un)register while it is being
    /// delivered.
    pub fn observers_for(&self, content: ContentId) -> Vec<O> {
        match self.table.get(&content) {
            Some(list) if !list.is_empty() => list.clone(),
            _ => self.fallback.clone(),
        }
    }

    /// Whether `observer` listens to `content` specifically.
    pub fn is_registered(&self, content: ContentId, observer: O) -> bool {
        self.table
            .get(&content)
            .map(|list| list.contains(&observer))
            .unwrap_or(false)
    }

    /// Whether `observer` is a fallback observer.
    pub fn has_fallback(&self, observer: O) -> bool {
        self.fallback.contains(&observer)
    }

    /// Number of content nodes with a specific observer.
    pub fn watched(&self) -> usize {
        self.table.len()
    }
}

impl<O: Copy + Eq + Debug> Default for ChangeRouter<O> {
    fn default() -> Self {
        Self::new()
    }
}
