// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cached workspace directory with lock-free snapshot swaps.
//!
//! The engine refreshes the directory on lifecycle events (connect, channel
//! joined, DM created) and every other component reads the latest snapshot
//! without coordination.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwap;

use colloquy_core::{ChannelId, DirectorySnapshot, UserId};

#[derive(Debug, Default)]
struct Directory {
    bot: Option<UserId>,
    users_by_id: HashMap<String, String>,
    user_ids_by_name: HashMap<String, UserId>,
    channels_by_id: HashMap<String, String>,
    dm_user_by_channel: HashMap<String, UserId>,
    dm_channel_by_user: HashMap<String, ChannelId>,
}

impl Directory {
    fn index(snapshot: DirectorySnapshot) -> Self {
        let mut users_by_id = HashMap::new();
        let mut user_ids_by_name = HashMap::new();
        for user in &snapshot.users {
            users_by_id.insert(user.id.0.clone(), user.name.clone());
            user_ids_by_name.insert(user.name.clone(), user.id.clone());
        }

        let channels_by_id = snapshot
            .channels
            .iter()
            .map(|c| (c.id.0.clone(), c.name.clone()))
            .collect();

        let mut dm_user_by_channel = HashMap::new();
        let mut dm_channel_by_user = HashMap::new();
        for dm in &snapshot.dms {
            dm_user_by_channel.insert(dm.channel.0.clone(), dm.user.clone());
            dm_channel_by_user.insert(dm.user.0.clone(), dm.channel.clone());
        }

        Self {
            bot: snapshot.bot,
            users_by_id,
            user_ids_by_name,
            channels_by_id,
            dm_user_by_channel,
            dm_channel_by_user,
        }
    }
}

/// Shared, swappable view of workspace membership.
#[derive(Debug, Default)]
pub struct DirectoryHandle {
    inner: ArcSwap<Directory>,
}

impl DirectoryHandle {
    pub fn new() -> Self {
        Self {
            inner: ArcSwap::from_pointee(Directory::default()),
        }
    }

    /// Replace the cached directory with a fresh snapshot.
    pub fn replace(&self, snapshot: DirectorySnapshot) {
        self.inner.store(Arc::new(Directory::index(snapshot)));
    }

    /// Whether `user` is the bot's own identity.
    pub fn is_bot(&self, user: &UserId) -> bool {
        self.inner.load().bot.as_ref() == Some(user)
    }

    /// Display name for a user id.
    pub fn user_name(&self, user: &UserId) -> Option<String> {
        self.inner.load().users_by_id.get(&user.0).cloned()
    }

    /// User id for a display name.
    pub fn user_id(&self, name: &str) -> Option<UserId> {
        self.inner.load().user_ids_by_name.get(name).cloned()
    }

    /// Display name for a channel id.
    pub fn channel_name(&self, channel: &ChannelId) -> Option<String> {
        self.inner.load().channels_by_id.get(&channel.0).cloned()
    }

    /// The user on the far end of a DM conversation.
    pub fn user_for_dm(&self, channel: &ChannelId) -> Option<UserId> {
        self.inner.load().dm_user_by_channel.get(&channel.0).cloned()
    }

    /// The DM conversation for a user id.
    pub fn dm_for_user(&self, user: &UserId) -> Option<ChannelId> {
        self.inner.load().dm_channel_by_user.get(&user.0).cloned()
    }

    /// The DM conversation for a user display name.
    pub fn dm_for_name(&self, name: &str) -> Option<ChannelId> {
        let dir = self.inner.load();
        let user = dir.user_ids_by_name.get(name)?;
        dir.dm_channel_by_user.get(&user.0).cloned()
    }
}
