//! External collaborators injected into the lobby
//!
//! The core never talks to a chat network, a points database or a timer
//! wheel directly. It calls these traits, and the host (or a test) decides
//! what stands behind them.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use crate::id::{ChannelId, User};

/// Messaging transport for the channels sessions are bound to.
pub trait Transport {
    /// Send a line of text to a channel.
    fn say(&mut self, channel: &ChannelId, text: &str);

    /// Every channel the user is currently present in.
    ///
    /// Used for direct-message fan-out. No ordering is promised.
    fn channels_of(&self, user: &User) -> Vec<ChannelId>;
}

/// Points/currency ledger, keyed by user id and channel.
pub trait PointsLedger {
    /// Add points and return the new balance.
    fn add_points(&mut self, amount: u64, user: &str, channel: &ChannelId) -> u64;

    /// Remove points (saturating at zero) and return the new balance.
    fn remove_points(&mut self, amount: u64, user: &str, channel: &ChannelId) -> u64;

    fn get_points(&self, user: &str, channel: &ChannelId) -> u64;
}

/// In-memory ledger used by the console host and by tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    balances: HashMap<(ChannelId, String), u64>,
}

impl PointsLedger for MemoryLedger {
    fn add_points(&mut self, amount: u64, user: &str, channel: &ChannelId) -> u64 {
        let balance = self
            .balances
            .entry((channel.clone(), user.to_string()))
            .or_default();
        *balance = balance.saturating_add(amount);
        *balance
    }

    fn remove_points(&mut self, amount: u64, user: &str, channel: &ChannelId) -> u64 {
        let balance = self
            .balances
            .entry((channel.clone(), user.to_string()))
            .or_default();
        *balance = balance.saturating_sub(amount);
        *balance
    }

    fn get_points(&self, user: &str, channel: &ChannelId) -> u64 {
        self.balances
            .get(&(channel.clone(), user.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

/// Token identifying one armed timer of one session.
///
/// Expiries carrying a token other than the session's current one are stale.
pub type TimerToken = u64;

/// Handle to a scheduled single-shot timer.
pub trait TimerHandle: fmt::Debug {
    fn cancel(self: Box<Self>);
}

/// Single-shot timer service.
///
/// When the delay elapses the host must call
/// [`Lobby::fire_timer`](crate::Lobby::fire_timer) with the same channel
/// and token.
pub trait Scheduler {
    fn schedule(
        &mut self,
        channel: &ChannelId,
        token: TimerToken,
        delay: Duration,
    ) -> Box<dyn TimerHandle>;
}

/// The collaborator bundle a lobby owns.
pub struct Services {
    pub transport: Box<dyn Transport>,
    pub ledger: Box<dyn PointsLedger>,
    pub scheduler: Box<dyn Scheduler>,
}

impl Services {
    pub fn new(
        transport: Box<dyn Transport>,
        ledger: Box<dyn PointsLedger>,
        scheduler: Box<dyn Scheduler>,
    ) -> Self {
        Self {
            transport,
            ledger,
            scheduler,
        }
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
