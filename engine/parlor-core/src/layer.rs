//! Behavior layers: the hook surface formats and modes implement
//!
//! A session's behavior is a stack of layers. The base session supplies the
//! lifecycle bookkeeping; every format in an inheritance chain contributes
//! one layer on top, and a selected mode contributes the topmost one.
//!
//! Hooks run from the top of the stack down. A layer returns
//! [`Flow::Handled`] to stop the walk or [`Flow::Pass`] to let the layer
//! underneath run too, which is how a derived format extends its parent.
//!
//! Hooks never call lifecycle methods directly. They queue [`Request`]s on
//! the [`HookCtx`], and the session applies them once the hook returns.

use indexmap::IndexMap;
use std::fmt;
use std::time::Duration;

use crate::id::{ChannelId, User};
use crate::player::Player;
use crate::services::{PointsLedger, Transport};
use crate::session::GameState;

/// Outcome of one layer's hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Stop here; layers underneath do not see this hook
    Handled,
    /// Continue with the layer underneath
    Pass,
}

/// A layer's own failure.
///
/// The session logs it and carries on; bookkeeping already committed (timer
/// cancellation, round counter) is never rolled back.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Missing state: {0}")]
    MissingState(String),
    #[error("Hook failed: {0}")]
    Failed(String),
}

pub type HookResult = Result<Flow, HookError>;

/// Lifecycle transitions a hook can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Start,
    NextRound,
    End,
    ForceEnd,
    /// Arm the session's single timer, replacing any pending one
    ArmTimer { delay: Duration, tag: String },
    CancelTimer,
    /// Start a child session in the same channel that shares this roster
    SpawnChild { target: String },
}

/// One command invocation, in the shape every dispatcher receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub argument: String,
    pub channel: ChannelId,
    pub invoker: User,
    pub command: String,
    pub timestamp: u64,
}

impl Invocation {
    pub fn new(
        command: impl Into<String>,
        argument: impl Into<String>,
        channel: ChannelId,
        invoker: User,
        timestamp: u64,
    ) -> Self {
        Self {
            argument: argument.into(),
            channel,
            invoker,
            command: command.into(),
            timestamp,
        }
    }

    /// Direct-message context: the channel is the invoker.
    pub fn is_private(&self) -> bool {
        self.channel.as_str() == self.invoker.id()
    }
}

/// Context handed to every hook.
pub struct HookCtx<'a> {
    channel: &'a ChannelId,
    transport: &'a mut dyn Transport,
    ledger: &'a mut dyn PointsLedger,
    requests: Vec<Request>,
}

impl<'a> HookCtx<'a> {
    pub fn new(
        channel: &'a ChannelId,
        transport: &'a mut dyn Transport,
        ledger: &'a mut dyn PointsLedger,
    ) -> Self {
        Self {
            channel,
            transport,
            ledger,
            requests: Vec::new(),
        }
    }

    pub fn channel(&self) -> &ChannelId {
        self.channel
    }

    /// Send a message to the session's channel.
    pub fn say(&mut self, text: impl AsRef<str>) {
        self.transport.say(self.channel, text.as_ref());
    }

    pub fn add_points(&mut self, amount: u64, user: &str) -> u64 {
        self.ledger.add_points(amount, user, self.channel)
    }

    pub fn remove_points(&mut self, amount: u64, user: &str) -> u64 {
        self.ledger.remove_points(amount, user, self.channel)
    }

    pub fn get_points(&self, user: &str) -> u64 {
        self.ledger.get_points(user, self.channel)
    }

    pub fn request(&mut self, request: Request) {
        self.requests.push(request);
    }

    pub fn start(&mut self) {
        self.request(Request::Start);
    }

    pub fn next_round(&mut self) {
        self.request(Request::NextRound);
    }

    pub fn end(&mut self) {
        self.request(Request::End);
    }

    pub fn force_end(&mut self) {
        self.request(Request::ForceEnd);
    }

    pub fn arm_timer(&mut self, delay: Duration, tag: impl Into<String>) {
        self.request(Request::ArmTimer {
            delay,
            tag: tag.into(),
        });
    }

    pub fn cancel_timer(&mut self) {
        self.request(Request::CancelTimer);
    }

    pub fn spawn_child(&mut self, target: impl Into<String>) {
        self.request(Request::SpawnChild {
            target: target.into(),
        });
    }

    pub fn requests(&self) -> &[Request] {
        &self.requests
    }

    pub fn into_requests(self) -> Vec<Request> {
        self.requests
    }
}

/// One level of session behavior.
///
/// Every hook defaults to [`Flow::Pass`], so a layer only implements what it
/// cares about. Command hooks are opt-in through [`Layer::handles`].
#[allow(unused_variables)]
pub trait Layer: fmt::Debug {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn on_signups(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        Ok(Flow::Pass)
    }

    fn on_start(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        Ok(Flow::Pass)
    }

    fn on_next_round(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        Ok(Flow::Pass)
    }

    /// Runs before the session is marked ended.
    fn on_end(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        Ok(Flow::Pass)
    }

    fn on_join(
        &mut self,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        player: &Player,
    ) -> HookResult {
        Ok(Flow::Pass)
    }

    fn on_leave(
        &mut self,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        player: &Player,
    ) -> HookResult {
        Ok(Flow::Pass)
    }

    fn on_rename(
        &mut self,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        player: &Player,
        old_id: &str,
    ) -> HookResult {
        Ok(Flow::Pass)
    }

    /// A child session ended; `winners` is its winners mapping.
    fn on_child_end(
        &mut self,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        winners: &IndexMap<String, u32>,
    ) -> HookResult {
        Ok(Flow::Pass)
    }

    /// The session's timer fired; `tag` is the one given when it was armed.
    fn on_timer(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>, tag: &str) -> HookResult {
        Ok(Flow::Pass)
    }

    /// Whether this layer implements the command hook `hook`.
    fn handles(&self, hook: &str) -> bool {
        false
    }

    fn on_command(
        &mut self,
        hook: &str,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        invocation: &Invocation,
    ) -> HookResult {
        Ok(Flow::Pass)
    }
}

/// Constructor for one layer; the form both `install` and `game` take.
#[derive(Clone, Copy)]
pub struct LayerFactory(fn() -> Box<dyn Layer>);

impl LayerFactory {
    pub const fn new(build: fn() -> Box<dyn Layer>) -> Self {
        Self(build)
    }

    pub fn build(&self) -> Box<dyn Layer> {
        (self.0)()
    }
}

impl PartialEq for LayerFactory {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::fn_addr_eq(self.0, other.0)
    }
}

impl fmt::Debug for LayerFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LayerFactory(..)")
    }
}
