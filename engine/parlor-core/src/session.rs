//! The session state machine: signups -> started -> ended
//!
//! A [`Session`] is a channel-bound running game. It owns the lifecycle
//! bookkeeping (flags, round counter, the single pending timer, the
//! parent/child link) and hands every hook to its composed [`Behavior`].
//!
//! The channel's active-session slot is not managed here; the lobby clears it
//! once a session reports `is_ended()` and hands control back to a parent.

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;
use std::cell::{Ref, RefMut};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

use crate::behavior::Behavior;
use crate::format::FormatDescriptor;
use crate::id::{to_id, ChannelId, User};
use crate::layer::{Flow, HookCtx, HookResult, Invocation, Layer, Request};
use crate::player::{Player, Roster, SharedRoster};
use crate::services::{Services, TimerHandle, TimerToken};

/// Game data every layer reads and writes.
///
/// The format travels with the session as plain configuration; layers keep
/// their own private state inside themselves and share anything else through
/// `vars`.
#[derive(Debug)]
pub struct GameState {
    pub format: FormatDescriptor,
    roster: SharedRoster,
    pub round: u32,
    started: bool,
    ended: bool,
    /// `start()` is a no-op below this many players
    pub min_players: usize,
    /// Player id -> result, reported to a parent session on end
    pub winners: IndexMap<String, u32>,
    pub points: IndexMap<String, u32>,
    pub lives: IndexMap<String, u32>,
    pub vars: BTreeMap<String, String>,
    rng: ChaCha20Rng,
}

impl GameState {
    pub fn new(
        format: FormatDescriptor,
        roster: SharedRoster,
        min_players: usize,
        rng: ChaCha20Rng,
    ) -> Self {
        Self {
            format,
            roster,
            round: 0,
            started: false,
            ended: false,
            min_players,
            winners: IndexMap::new(),
            points: IndexMap::new(),
            lives: IndexMap::new(),
            vars: BTreeMap::new(),
            rng,
        }
    }

    #[cfg(any(test, feature = "testing"))]
    pub fn for_tests() -> Self {
        use rand::SeedableRng;

        Self::new(
            FormatDescriptor::new("Test"),
            Roster::shared(),
            0,
            ChaCha20Rng::seed_from_u64(7),
        )
    }

    pub fn id(&self) -> &str {
        &self.format.id
    }

    pub fn name(&self) -> &str {
        &self.format.name
    }

    pub fn mode_id(&self) -> Option<&str> {
        self.format.mode_id.as_deref()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn roster(&self) -> Ref<'_, Roster> {
        self.roster.borrow()
    }

    pub fn roster_mut(&self) -> RefMut<'_, Roster> {
        self.roster.borrow_mut()
    }

    /// Another handle to the same roster, for a child session.
    pub fn roster_handle(&self) -> SharedRoster {
        Rc::clone(&self.roster)
    }

    pub fn player_count(&self) -> usize {
        self.roster.borrow().len()
    }

    pub fn player(&self, id: &str) -> Option<Player> {
        self.roster.borrow().get(&to_id(id)).cloned()
    }

    /// Every player in join order, eliminated ones included.
    pub fn players(&self) -> Vec<Player> {
        self.roster.borrow().iter().cloned().collect()
    }

    /// Add a player for `name`; `None` if that id already plays.
    pub fn add_player(&mut self, name: &str) -> Option<Player> {
        let player = Player::new(name);
        self.roster
            .borrow_mut()
            .insert(player.clone())
            .then_some(player)
    }

    /// Remove a player: deleted before the start, eliminated after it.
    ///
    /// Returns `false` if the id is absent or the player is already out.
    pub fn remove_player(&mut self, id: &str) -> bool {
        let id = to_id(id);
        let mut roster = self.roster.borrow_mut();
        match roster.get(&id).map(|p| p.eliminated) {
            None | Some(true) => false,
            Some(false) if self.started => {
                if let Some(player) = roster.get_mut(&id) {
                    player.eliminated = true;
                }
                true
            }
            Some(false) => roster.remove(&id).is_some(),
        }
    }

    /// Mark a player eliminated without removing them.
    pub fn eliminate(&mut self, id: &str) -> bool {
        match self.roster.borrow_mut().get_mut(&to_id(id)) {
            Some(player) if !player.eliminated => {
                player.eliminated = true;
                true
            }
            _ => false,
        }
    }

    pub fn player_names(&self) -> String {
        self.roster
            .borrow()
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `"Alice (3), Bob"`: a zero or missing total shows the name alone.
    pub fn points_listing(&self) -> String {
        self.roster
            .borrow()
            .iter()
            .map(|p| match self.points.get(&p.id) {
                Some(&points) if points > 0 => format!("{} ({points})", p.name),
                _ => p.name.clone(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// `"Alice (2), Bob (0)"`: lives are always shown.
    pub fn lives_listing(&self) -> String {
        self.roster
            .borrow()
            .iter()
            .map(|p| format!("{} ({})", p.name, self.lives.get(&p.id).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn remaining_players(&self) -> Vec<Player> {
        self.roster
            .borrow()
            .iter()
            .filter(|p| !p.eliminated)
            .cloned()
            .collect()
    }

    pub fn remaining_count(&self) -> usize {
        self.roster.borrow().iter().filter(|p| !p.eliminated).count()
    }

    /// Uniformly shuffled copy of `players`, or of the whole roster.
    pub fn shuffled(&mut self, players: Option<Vec<Player>>) -> Vec<Player> {
        let mut players = players.unwrap_or_else(|| self.players());
        players.shuffle(&mut self.rng);
        players
    }

    pub fn rng_mut(&mut self) -> &mut ChaCha20Rng {
        &mut self.rng
    }
}

/// What a session borrows from its lobby while a method runs.
pub struct Env<'a> {
    pub services: &'a mut Services,
    tokens: &'a mut TimerToken,
}

impl<'a> Env<'a> {
    pub fn new(services: &'a mut Services, tokens: &'a mut TimerToken) -> Self {
        Self { services, tokens }
    }

    fn next_token(&mut self) -> TimerToken {
        *self.tokens += 1;
        *self.tokens
    }

    fn say(&mut self, channel: &ChannelId, text: &str) {
        self.services.transport.say(channel, text);
    }
}

/// Result of a join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined(Player),
    AlreadyJoined,
    AlreadyStarted,
    /// Free-join games have no join step
    FreeJoin,
}

#[derive(Debug)]
struct ArmedTimer {
    token: TimerToken,
    tag: String,
    handle: Box<dyn TimerHandle>,
}

/// A live, channel-bound game.
#[derive(Debug)]
pub struct Session {
    channel: ChannelId,
    behavior: Behavior,
    state: GameState,
    parent: Option<Box<Session>>,
    /// Id of the child format currently running on top of this session
    child: Option<String>,
    timer: Option<ArmedTimer>,
    spawn: Option<String>,
    force_ended: bool,
}

impl Session {
    pub fn new(channel: ChannelId, behavior: Behavior, state: GameState) -> Self {
        Self {
            channel,
            behavior,
            state,
            parent: None,
            child: None,
            timer: None,
            spawn: None,
            force_ended: false,
        }
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn is_started(&self) -> bool {
        self.state.started
    }

    pub fn is_ended(&self) -> bool {
        self.state.ended
    }

    pub fn force_ended(&self) -> bool {
        self.force_ended
    }

    pub fn parent(&self) -> Option<&Session> {
        self.parent.as_deref()
    }

    pub fn child(&self) -> Option<&str> {
        self.child.as_deref()
    }

    pub fn has_timer(&self) -> bool {
        self.timer.is_some()
    }

    /// Whether the composed behavior implements a command hook.
    pub fn exposes(&self, hook: &str) -> bool {
        self.behavior.exposes(hook)
    }

    /// Whether `command` may reach this session from a direct message.
    pub fn allows_private(&self, command: &str) -> bool {
        self.state.format.private_commands.allows(command)
    }

    /// Enter the signup phase.
    ///
    /// Free-join games skip the announcement and try to start right away;
    /// a mode's player minimum still applies to them.
    pub fn signups(&mut self, env: &mut Env<'_>, announcement: Option<&str>) {
        if self.state.started || self.state.ended {
            return;
        }
        if !self.state.format.free_join {
            if let Some(text) = announcement {
                env.say(&self.channel, text);
            }
        }
        self.hook(env, "on_signups", |l, g, c| l.on_signups(g, c));
        if self.state.format.free_join {
            self.start(env);
        }
    }

    /// Start the game. Returns `false` if nothing happened.
    pub fn start(&mut self, env: &mut Env<'_>) -> bool {
        if self.state.started || self.state.ended {
            return false;
        }
        let needed = self.state.min_players;
        if self.state.player_count() < needed {
            let text = format!(
                "{} needs at least {needed} players to start.",
                self.state.name()
            );
            env.say(&self.channel, &text);
            return false;
        }

        self.state.started = true;
        info!(
            channel = %self.channel,
            format = %self.state.format.id,
            players = self.state.player_count(),
            "Session started"
        );
        self.hook(env, "on_start", |l, g, c| l.on_start(g, c));
        true
    }

    /// End the game normally.
    ///
    /// `on_end` runs before the session is marked ended; whatever it queues
    /// is dropped since nothing may run after the end.
    pub fn end(&mut self, env: &mut Env<'_>) -> bool {
        if self.state.ended {
            return false;
        }
        self.cancel_timer();
        let (_, dropped) = self.hook_deferred(env, "on_end", |l, g, c| l.on_end(g, c));
        self.state.ended = true;
        if !dropped.is_empty() {
            debug!(channel = %self.channel, dropped = ?dropped, "Ignoring requests queued by on_end");
        }
        info!(channel = %self.channel, format = %self.state.format.id, "Session ended");
        true
    }

    /// End the game without running any `on_end`, all the way to the root.
    pub fn force_end(&mut self, env: &mut Env<'_>) -> bool {
        if self.state.ended {
            return false;
        }
        self.cancel_timer();
        self.state.ended = true;
        self.force_ended = true;
        match self.parent.as_mut() {
            Some(parent) => {
                parent.force_end(env);
            }
            None => {
                let text = format!("The game of {} was forcibly ended.", self.state.name());
                env.say(&self.channel, &text);
            }
        }
        info!(channel = %self.channel, format = %self.state.format.id, "Session force-ended");
        true
    }

    pub fn next_round(&mut self, env: &mut Env<'_>) {
        if self.state.ended {
            return;
        }
        self.cancel_timer();
        self.state.round += 1;
        debug!(channel = %self.channel, round = self.state.round, "Next round");
        self.hook(env, "on_next_round", |l, g, c| l.on_next_round(g, c));
    }

    pub fn join(&mut self, env: &mut Env<'_>, user: &User) -> JoinOutcome {
        if self.state.format.free_join {
            let text = format!(
                "{} has no signups. Just start playing!",
                self.state.name()
            );
            env.say(&self.channel, &text);
            return JoinOutcome::FreeJoin;
        }
        if self.state.started {
            let text = format!("{}: the game has already started.", user.name);
            env.say(&self.channel, &text);
            return JoinOutcome::AlreadyStarted;
        }
        let Some(player) = self.state.add_player(&user.name) else {
            return JoinOutcome::AlreadyJoined;
        };

        let text = format!("{} joined the game.", player.name);
        env.say(&self.channel, &text);
        self.hook(env, "on_join", |l, g, c| l.on_join(g, c, &player));
        JoinOutcome::Joined(player)
    }

    /// Leave the game; membership belongs to the parent once nested.
    pub fn leave(&mut self, env: &mut Env<'_>, user: &User) -> bool {
        if let Some(parent) = self.parent.as_mut() {
            return parent.leave(env, user);
        }
        if self.state.ended {
            return false;
        }
        let Some(player) = self.state.player(&user.name) else {
            return false;
        };
        if !self.state.remove_player(&player.id) {
            return false;
        }

        let text = format!("{} left the game.", player.name);
        env.say(&self.channel, &text);
        self.hook(env, "on_leave", |l, g, c| l.on_leave(g, c, &player));
        true
    }

    /// Follow a display-name change from `old_name` to `user.name`.
    ///
    /// Returns `true` when the player was re-keyed under a new id.
    pub fn rename(&mut self, env: &mut Env<'_>, user: &User, old_name: &str) -> bool {
        let old_id = to_id(old_name);
        let new_id = user.id();
        let renamed = {
            let mut roster = self.state.roster_mut();
            let Some(player) = roster.get_mut(&old_id) else {
                return false;
            };
            player.name = user.name.clone();
            if new_id == old_id || roster.contains(&new_id) || !roster.rekey(&old_id, &new_id) {
                None
            } else {
                roster.get(&new_id).cloned()
            }
        };
        let Some(player) = renamed else {
            return false;
        };

        debug!(channel = %self.channel, from = %old_id, to = %new_id, "Player re-keyed");
        self.notify_rename(env, &player, &old_id);
        true
    }

    /// Run `on_rename` here and on the direct parent, once each.
    fn notify_rename(&mut self, env: &mut Env<'_>, player: &Player, old_id: &str) {
        self.hook(env, "on_rename", |l, g, c| l.on_rename(g, c, player, old_id));
        if let Some(parent) = self.parent.as_mut() {
            parent.hook(env, "on_rename", |l, g, c| l.on_rename(g, c, player, old_id));
        }
    }

    /// A child session ended normally and this session is active again.
    pub fn child_ended(&mut self, env: &mut Env<'_>, winners: &IndexMap<String, u32>) {
        self.child = None;
        if self.state.ended {
            return;
        }
        self.hook(env, "on_child_end", |l, g, c| l.on_child_end(g, c, winners));
    }

    /// Deliver a routed command. Returns `false` if no layer implements it.
    pub fn command(&mut self, env: &mut Env<'_>, hook: &str, invocation: &Invocation) -> bool {
        if self.state.ended || !self.behavior.exposes(hook) {
            return false;
        }
        self.hook(env, hook, |l, g, c| {
            if l.handles(hook) {
                l.on_command(hook, g, c, invocation)
            } else {
                Ok(Flow::Pass)
            }
        });
        true
    }

    /// Arm the single timer, replacing any pending one.
    pub fn arm_timer(&mut self, env: &mut Env<'_>, delay: Duration, tag: String) {
        if self.state.ended {
            return;
        }
        self.cancel_timer();
        let token = env.next_token();
        let handle = env.services.scheduler.schedule(&self.channel, token, delay);
        debug!(channel = %self.channel, token, tag = %tag, ?delay, "Timer armed");
        self.timer = Some(ArmedTimer { token, tag, handle });
    }

    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            debug!(channel = %self.channel, token = timer.token, "Timer cancelled");
            timer.handle.cancel();
        }
    }

    /// A timer expired. Tokens other than the pending one are stale.
    pub fn fire_timer(&mut self, env: &mut Env<'_>, token: TimerToken) -> bool {
        let Some(timer) = self.timer.take_if(|t| t.token == token) else {
            debug!(channel = %self.channel, token, "Ignoring stale timer");
            return false;
        };
        if self.state.ended {
            return false;
        }
        let tag = timer.tag;
        self.hook(env, "on_timer", |l, g, c| l.on_timer(g, c, &tag));
        true
    }

    /// Stop being the active session because a child takes over the channel.
    pub(crate) fn detach_for_child(&mut self, child: String) {
        self.cancel_timer();
        self.child = Some(child);
    }

    pub(crate) fn attach_parent(&mut self, parent: Session) {
        self.parent = Some(Box::new(parent));
    }

    pub(crate) fn take_parent(&mut self) -> Option<Session> {
        self.parent.take().map(|p| *p)
    }

    pub(crate) fn take_spawn_request(&mut self) -> Option<String> {
        self.spawn.take()
    }

    /// Run a hook through the behavior and apply what it queued.
    fn hook<F>(&mut self, env: &mut Env<'_>, name: &str, run: F) -> Flow
    where
        F: FnMut(&mut dyn Layer, &mut GameState, &mut HookCtx<'_>) -> HookResult,
    {
        let (flow, requests) = self.hook_deferred(env, name, run);
        self.apply(env, requests);
        flow
    }

    fn hook_deferred<F>(&mut self, env: &mut Env<'_>, name: &str, run: F) -> (Flow, Vec<Request>)
    where
        F: FnMut(&mut dyn Layer, &mut GameState, &mut HookCtx<'_>) -> HookResult,
    {
        let services = &mut *env.services;
        let mut ctx = HookCtx::new(
            &self.channel,
            services.transport.as_mut(),
            services.ledger.as_mut(),
        );
        let flow = self.behavior.walk(name, &mut self.state, &mut ctx, run);
        (flow, ctx.into_requests())
    }

    fn apply(&mut self, env: &mut Env<'_>, requests: Vec<Request>) {
        for request in requests {
            if self.state.ended {
                debug!(channel = %self.channel, ?request, "Session ended, ignoring request");
                continue;
            }
            match request {
                Request::Start => {
                    self.start(env);
                }
                Request::NextRound => self.next_round(env),
                Request::End => {
                    self.end(env);
                }
                Request::ForceEnd => {
                    self.force_end(env);
                }
                Request::ArmTimer { delay, tag } => self.arm_timer(env, delay, tag),
                Request::CancelTimer => self.cancel_timer(),
                Request::SpawnChild { target } => self.spawn = Some(target),
            }
        }
    }
}
