//! The social engine: friendship graph, post queries, feed assembly, account
//! views and every mutating action, all running against a [`SocialStore`].

pub mod account;
pub mod auth;
pub mod error;
pub mod feed;
pub mod friendships;
pub mod graph;
pub mod memory;
pub mod policy;
pub mod posts;
pub mod social;
pub mod store;
pub mod users;

use crate::{graph::FriendshipGraph, posts::PostRepository, store::SocialStore};
use std::{
    fmt::{Debug, Formatter},
    sync::Arc,
};
use warble_common::util::PositiveDuration;

pub const DEFAULT_FEED_WINDOW_DAYS: u32 = 30;

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
pub struct EngineConfig {
    /// How far back the feed looks.
    pub feed_window: PositiveDuration,
    /// `None` issues tokens that never expire.
    pub token_lifetime: Option<PositiveDuration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            feed_window: PositiveDuration::new_unchecked(time::Duration::days(
                DEFAULT_FEED_WINDOW_DAYS.into(),
            )),
            token_lifetime: None,
        }
    }
}

/// Cheap to clone; all clones share the same store.
#[derive(Clone)]
pub struct Engine {
    store: Arc<dyn SocialStore>,
    config: EngineConfig,
}

impl Engine {
    pub fn new(store: Arc<dyn SocialStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    #[must_use]
    pub fn config(&self) -> EngineConfig {
        self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn SocialStore {
        &*self.store
    }

    #[must_use]
    pub fn graph(&self) -> FriendshipGraph<'_> {
        FriendshipGraph::new(self.store())
    }

    #[must_use]
    pub fn posts(&self) -> PostRepository<'_> {
        PostRepository::new(self.store())
    }
}

impl Debug for Engine {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
