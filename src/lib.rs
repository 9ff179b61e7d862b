//! # Spiriter
//!
//! Core game logic for a group-chat picture game. Players join a game in a
//! group chat, get split into teams and are privately asked for photos
//! matching short prompts. Each team's photos are pasted into a scenario
//! template and the finished pictures are revealed in the group chat at the
//! end of every round.
//!
//! The crate is platform agnostic: chat delivery goes through
//! [`session::Transport`] and picture rendering through
//! [`compose::Composer`].

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![warn(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use derive_where::derive_where;
use itertools::Itertools;
use serde::Serialize;

pub mod catalog;
pub mod compose;
pub mod constants;
pub mod game;
pub mod game_id;
pub mod names;
pub mod registry;
pub mod reveal;
pub mod scenario;
pub mod session;
pub mod teams;

#[cfg(test)]
mod testing;

/// A truncated vector that maintains the exact count while limiting displayed items
///
/// Used by the lobby board, which shows how many players joined but only
/// lists the first few names.
#[derive(Debug, Clone, Serialize)]
#[derive_where(Default)]
pub struct TruncatedVec<T> {
    /// The exact total count of items
    exact_count: usize,
    /// The truncated list of items (up to the limit)
    items: Vec<T>,
}

impl<T: Clone> TruncatedVec<T> {
    /// Creates a new truncated vector from an iterator
    ///
    /// # Arguments
    ///
    /// * `list` - An iterator over items to include
    /// * `limit` - Maximum number of items to include in the truncated vector
    /// * `exact_count` - The exact total count of items (may be larger than limit)
    ///
    /// # Returns
    ///
    /// A new `TruncatedVec` containing up to `limit` items from the iterator
    pub fn new<I: Iterator<Item = T>>(list: I, limit: usize, exact_count: usize) -> Self {
        let items = list.take(limit).collect_vec();
        Self { exact_count, items }
    }

    /// Returns the exact count of items
    pub fn exact_count(&self) -> usize {
        self.exact_count
    }

    /// Returns the truncated items
    pub fn items(&self) -> &[T] {
        &self.items
    }
}
