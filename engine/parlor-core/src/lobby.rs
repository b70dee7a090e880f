//! Lobby: channel slots, session factory and command dispatch
//!
//! The lobby owns the injected services and at most one active session per
//! channel. A parent session waiting on a child is not in a slot; it rides
//! inside the child and comes back when the child ends.
//!
//! Every operation finishes with `settle`, which applies what the sessions
//! asked for (spawning a child, ending) until the channel is stable.

use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::behavior::{Behavior, CreateError};
use crate::format::FormatDescriptor;
use crate::id::{ChannelId, User};
use crate::layer::Invocation;
use crate::player::{Roster, SharedRoster};
use crate::registry::FormatRegistry;
use crate::router::CommandRouter;
use crate::services::{PointsLedger, Services, TimerToken};
use crate::session::{Env, GameState, Session};

pub use crate::session::JoinOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyOptions {
    /// Prefix the host expects before commands, used in announcements
    pub command_prefix: String,
    /// Signup announcement; `{name}` and `{join}` are filled in
    pub signup_announcement: String,
    /// Fixed seed for session RNGs (each session gets `seed + n`)
    pub rng_seed: Option<u64>,
}

impl Default for LobbyOptions {
    fn default() -> Self {
        Self {
            command_prefix: ".".to_string(),
            signup_announcement: "A new game of {name} is starting! Type {join} to sign up."
                .to_string(),
            rng_seed: None,
        }
    }
}

/// Result of a request to start a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Started,
    /// The channel already has an active session; nothing was created
    AlreadyActive,
    /// The target names no startable format
    UnknownFormat,
}

/// Result of routing one command invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Delivered to this many sessions
    Delivered(usize),
    /// No game declares this command
    UnknownCommand,
    /// No eligible session exposes the command's hook
    NoSession,
}

pub struct Lobby {
    registry: Arc<FormatRegistry>,
    router: CommandRouter,
    services: Services,
    options: LobbyOptions,
    sessions: BTreeMap<ChannelId, Session>,
    tokens: TimerToken,
    created: u64,
}

impl Lobby {
    pub fn new(registry: Arc<FormatRegistry>, services: Services, options: LobbyOptions) -> Self {
        let router = CommandRouter::new(registry.commands());
        info!(
            formats = registry.len(),
            commands = router.len(),
            "Lobby ready"
        );
        Self {
            registry,
            router,
            services,
            options,
            sessions: BTreeMap::new(),
            tokens: 0,
            created: 0,
        }
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn router(&self) -> &CommandRouter {
        &self.router
    }

    pub fn options(&self) -> &LobbyOptions {
        &self.options
    }

    pub fn ledger(&self) -> &dyn PointsLedger {
        self.services.ledger.as_ref()
    }

    /// The channel's active session, if any.
    pub fn session(&self, channel: &ChannelId) -> Option<&Session> {
        self.sessions.get(channel)
    }

    pub fn active_channels(&self) -> Vec<ChannelId> {
        self.sessions.keys().cloned().collect()
    }

    /// Resolve `target` and start its signups in `channel`.
    ///
    /// `Err` only for catalog defects found while composing behavior.
    pub fn create(&mut self, target: &str, channel: &ChannelId) -> Result<CreateOutcome, CreateError> {
        if let Some(active) = self.sessions.get(channel) {
            let text = format!(
                "A game of {} is already running here.",
                active.state().name()
            );
            self.services.transport.say(channel, &text);
            return Ok(CreateOutcome::AlreadyActive);
        }
        let Some(format) = self.registry.resolve(target) else {
            debug!(request = target, channel = %channel, "No format for target");
            return Ok(CreateOutcome::UnknownFormat);
        };

        let session = self.instantiate(format, channel, Roster::shared())?;
        let announcement = self.announcement(session.state().name());
        self.sessions.insert(channel.clone(), session);
        self.with_session(channel, |session, env| session.signups(env, Some(&announcement)));
        self.settle(channel);
        Ok(CreateOutcome::Started)
    }

    /// Start a child session on top of the channel's active session.
    ///
    /// The child shares the parent's roster and skips signups. Without an
    /// active session this is a plain `create`.
    pub fn create_child(&mut self, target: &str, channel: &ChannelId) -> Result<CreateOutcome, CreateError> {
        if !self.sessions.contains_key(channel) {
            return self.create(target, channel);
        }
        let outcome = self.spawn_child(target, channel)?;
        self.settle(channel);
        Ok(outcome)
    }

    fn spawn_child(&mut self, target: &str, channel: &ChannelId) -> Result<CreateOutcome, CreateError> {
        let Some(format) = self.registry.resolve(target) else {
            warn!(request = target, channel = %channel, "Child format not found");
            return Ok(CreateOutcome::UnknownFormat);
        };
        let Some(mut parent) = self.sessions.remove(channel) else {
            return Ok(CreateOutcome::UnknownFormat);
        };

        let roster = parent.state().roster_handle();
        let mut child = match self.instantiate(format, channel, roster) {
            Ok(child) => child,
            Err(e) => {
                self.sessions.insert(channel.clone(), parent);
                return Err(e);
            }
        };
        info!(
            channel = %channel,
            parent = %parent.state().id(),
            child = %child.state().id(),
            "Handing channel to child session"
        );
        parent.detach_for_child(child.state().id().to_string());
        child.attach_parent(parent);
        self.sessions.insert(channel.clone(), child);

        self.with_session(channel, |session, env| {
            session.signups(env, None);
            session.start(env);
        });
        Ok(CreateOutcome::Started)
    }

    fn instantiate(
        &mut self,
        format: FormatDescriptor,
        channel: &ChannelId,
        roster: SharedRoster,
    ) -> Result<Session, CreateError> {
        let behavior = Behavior::compose(&self.registry, &format)?;
        let min_players = format
            .mode_id
            .as_deref()
            .and_then(|mode| self.registry.mode(mode))
            .map_or(0, |mode| mode.min_players);

        self.created += 1;
        let rng = match self.options.rng_seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed.wrapping_add(self.created)),
            None => ChaCha20Rng::from_entropy(),
        };

        info!(
            channel = %channel,
            format = %format.id,
            mode = format.mode_id.as_deref().unwrap_or("-"),
            variation = format.variation_id.as_deref().unwrap_or("-"),
            "Creating session"
        );
        let state = GameState::new(format, roster, min_players, rng);
        Ok(Session::new(channel.clone(), behavior, state))
    }

    fn announcement(&self, name: &str) -> String {
        self.options
            .signup_announcement
            .replace("{name}", name)
            .replace("{join}", &format!("{}join", self.options.command_prefix))
    }

    /// Route a game command.
    ///
    /// The invocation's own channel wins when its session exposes the hook.
    /// Otherwise a direct message fans out to every channel the invoker is
    /// in whose session accepts the command privately.
    pub fn dispatch(&mut self, invocation: &Invocation) -> DispatchOutcome {
        let Some(entry) = self.router.route(&invocation.command) else {
            return DispatchOutcome::UnknownCommand;
        };
        let hook = entry.hook.clone();
        let channel = invocation.channel.clone();

        if self.sessions.get(&channel).is_some_and(|s| s.exposes(&hook)) {
            self.with_session(&channel, |session, env| session.command(env, &hook, invocation));
            self.settle(&channel);
            return DispatchOutcome::Delivered(1);
        }

        if !invocation.is_private() {
            return DispatchOutcome::NoSession;
        }

        let mut delivered = 0;
        for target in self.services.transport.channels_of(&invocation.invoker) {
            let eligible = self
                .sessions
                .get(&target)
                .is_some_and(|s| s.allows_private(&invocation.command) && s.exposes(&hook));
            if !eligible {
                continue;
            }
            debug!(channel = %target, command = %invocation.command, "Private command fan-out");
            self.with_session(&target, |session, env| session.command(env, &hook, invocation));
            self.settle(&target);
            delivered += 1;
        }

        if delivered > 0 {
            DispatchOutcome::Delivered(delivered)
        } else {
            DispatchOutcome::NoSession
        }
    }

    pub fn join(&mut self, channel: &ChannelId, user: &User) -> Option<JoinOutcome> {
        let outcome = self.with_session(channel, |session, env| session.join(env, user));
        self.settle(channel);
        outcome
    }

    pub fn leave(&mut self, channel: &ChannelId, user: &User) -> bool {
        let left = self
            .with_session(channel, |session, env| session.leave(env, user))
            .unwrap_or(false);
        self.settle(channel);
        left
    }

    /// Follow a display-name change in every channel. Returns how many
    /// sessions re-keyed the player.
    pub fn rename(&mut self, user: &User, old_name: &str) -> usize {
        let mut renamed = 0;
        for channel in self.active_channels() {
            if self
                .with_session(&channel, |session, env| session.rename(env, user, old_name))
                .unwrap_or(false)
            {
                renamed += 1;
            }
            self.settle(&channel);
        }
        renamed
    }

    pub fn start(&mut self, channel: &ChannelId) -> bool {
        let started = self
            .with_session(channel, |session, env| session.start(env))
            .unwrap_or(false);
        self.settle(channel);
        started
    }

    pub fn end(&mut self, channel: &ChannelId) -> bool {
        let ended = self
            .with_session(channel, |session, env| session.end(env))
            .unwrap_or(false);
        self.settle(channel);
        ended
    }

    pub fn force_end(&mut self, channel: &ChannelId) -> bool {
        let ended = self
            .with_session(channel, |session, env| session.force_end(env))
            .unwrap_or(false);
        self.settle(channel);
        ended
    }

    /// A scheduled timer expired. Stale tokens are ignored.
    pub fn fire_timer(&mut self, channel: &ChannelId, token: TimerToken) -> bool {
        let fired = self
            .with_session(channel, |session, env| session.fire_timer(env, token))
            .unwrap_or(false);
        self.settle(channel);
        fired
    }

    fn with_session<R>(
        &mut self,
        channel: &ChannelId,
        run: impl FnOnce(&mut Session, &mut Env<'_>) -> R,
    ) -> Option<R> {
        let session = self.sessions.get_mut(channel)?;
        let mut env = Env::new(&mut self.services, &mut self.tokens);
        Some(run(session, &mut env))
    }

    /// Apply pending spawns and endings until the channel is stable.
    fn settle(&mut self, channel: &ChannelId) {
        loop {
            let Some(session) = self.sessions.get_mut(channel) else {
                return;
            };
            let spawn = session.take_spawn_request();
            let ended = session.is_ended();

            if let Some(target) = spawn {
                if !ended {
                    if let Err(e) = self.spawn_child(&target, channel) {
                        error!(channel = %channel, request = %target, error = %e, "Failed to start child session");
                    }
                }
                continue;
            }
            if !ended {
                return;
            }

            let Some(mut finished) = self.sessions.remove(channel) else {
                return;
            };
            let Some(mut parent) = finished.take_parent() else {
                debug!(channel = %channel, format = %finished.state().id(), "Channel slot cleared");
                return;
            };
            if finished.force_ended() {
                debug!(channel = %channel, "Forced end reached the root, clearing channel");
                return;
            }

            info!(
                channel = %channel,
                child = %finished.state().id(),
                parent = %parent.state().id(),
                "Child session ended, returning to parent"
            );
            let winners = finished.state().winners.clone();
            let mut env = Env::new(&mut self.services, &mut self.tokens);
            parent.child_ended(&mut env, &winners);
            self.sessions.insert(channel.clone(), parent);
        }
    }
}

#[cfg(test)]
mod tests;
