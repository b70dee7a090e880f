//! Core types for the Parlor game host
//!
//! This crate provides the pieces that turn a catalog of independently
//! authored game formats into running, channel-bound sessions:
//! - `FormatRegistry`: one-time catalog load with alias, variation, mode and
//!   command-ownership validation
//! - `FormatRegistry::resolve`: turns `"trivia,reverse,team"` into one merged
//!   `FormatDescriptor`
//! - `Behavior`: the inheritance-composed stack of `Layer`s a session runs
//! - `Session`: the signup -> play -> end state machine, including parent and
//!   child sessions sharing one roster
//! - `Lobby`: channel slots, session factory and command router entry point

pub mod behavior;
pub mod catalog;
pub mod format;
pub mod id;
pub mod layer;
pub mod lobby;
pub mod player;
pub mod registry;
pub mod resolver;
pub mod router;
pub mod services;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types for convenience
pub use behavior::{Behavior, CreateError};
pub use catalog::{BehaviorTable, Catalog, CatalogError, CatalogSource, StaticCatalog, TomlCatalog};
pub use format::{FormatDescriptor, ModeDescriptor, ModeNaming, PrivateCommands, VariationDescriptor};
pub use id::{to_id, ChannelId, User};
pub use layer::{Flow, HookCtx, HookError, HookResult, Invocation, Layer, LayerFactory, Request};
pub use lobby::{CreateOutcome, DispatchOutcome, JoinOutcome, Lobby, LobbyOptions};
pub use player::{Player, Roster, SharedRoster};
pub use registry::{CommandOwner, CommandTable, FormatRegistry, LoadError, Route};
pub use router::CommandRouter;
pub use services::{MemoryLedger, PointsLedger, Scheduler, Services, TimerHandle, TimerToken, Transport};
pub use session::{GameState, Session};
