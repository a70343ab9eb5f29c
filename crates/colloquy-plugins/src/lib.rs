// SPDX-FileCopyrightText: 2026 Colloquy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builtin plugins for the Colloquy bot.
//!
//! These ship with the binary and double as worked examples of the plugin
//! API: a conversation topic with interactive elements, a cron job, channel
//! matchers, and reactions.

pub mod helptext;
pub mod reactions;
pub mod sysadmin;

pub use helptext::HelptextPlugin;
pub use reactions::ReactionsPlugin;
pub use sysadmin::SysadminPlugin;
