use super::*;
use crate::format::{ModeDescriptor, ModeNaming, PrivateCommands};
use crate::layer::{Flow, HookCtx, HookError, HookResult, Layer, LayerFactory};
use crate::testing::Probe;
use indexmap::IndexMap;
use std::time::Duration;

#[derive(Debug)]
struct Relay;

impl Layer for Relay {
    fn name(&self) -> &'static str {
        "relay"
    }

    fn on_start(&mut self, _: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        ctx.spawn_child("stage");
        Ok(Flow::Handled)
    }

    fn on_child_end(
        &mut self,
        _: &mut GameState,
        ctx: &mut HookCtx<'_>,
        winners: &IndexMap<String, u32>,
    ) -> HookResult {
        let ids: Vec<&str> = winners.keys().map(String::as_str).collect();
        ctx.say(format!("stage winners: {}", ids.join(",")));
        ctx.next_round();
        Ok(Flow::Handled)
    }

    fn on_end(&mut self, _: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        ctx.say("relay over");
        Ok(Flow::Handled)
    }
}

#[derive(Debug)]
struct Stage;

impl Layer for Stage {
    fn name(&self) -> &'static str {
        "stage"
    }

    fn handles(&self, hook: &str) -> bool {
        hook == "win"
    }

    fn on_command(
        &mut self,
        _: &str,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        invocation: &Invocation,
    ) -> HookResult {
        game.winners.insert(invocation.invoker.id(), 1);
        ctx.end();
        Ok(Flow::Handled)
    }

    fn on_end(&mut self, _: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        ctx.say("stage over");
        Ok(Flow::Handled)
    }
}

#[derive(Debug)]
struct Guess;

impl Layer for Guess {
    fn name(&self) -> &'static str {
        "guess"
    }

    fn handles(&self, hook: &str) -> bool {
        hook == "guess"
    }

    fn on_command(
        &mut self,
        _: &str,
        _: &mut GameState,
        ctx: &mut HookCtx<'_>,
        invocation: &Invocation,
    ) -> HookResult {
        if ctx.channel().as_str() == "broken" {
            return Err(HookError::InvalidArgument(invocation.argument.clone()));
        }
        ctx.say(format!("{} guessed {}", invocation.invoker.name, invocation.argument));
        Ok(Flow::Handled)
    }
}

#[derive(Debug)]
struct Ticker;

impl Layer for Ticker {
    fn name(&self) -> &'static str {
        "ticker"
    }

    fn on_start(&mut self, _: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        ctx.arm_timer(Duration::from_secs(5), "tick");
        Ok(Flow::Handled)
    }

    fn on_next_round(&mut self, _: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        ctx.arm_timer(Duration::from_secs(5), "tick");
        Ok(Flow::Handled)
    }

    fn on_timer(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>, tag: &str) -> HookResult {
        ctx.say(format!("{tag} {}", game.round));
        ctx.next_round();
        Ok(Flow::Handled)
    }
}

fn relay() -> Box<dyn Layer> {
    Box::new(Relay)
}

fn stage() -> Box<dyn Layer> {
    Box::new(Stage)
}

fn guess() -> Box<dyn Layer> {
    Box::new(Guess)
}

fn ticker() -> Box<dyn Layer> {
    Box::new(Ticker)
}

fn registry() -> FormatRegistry {
    let formats = vec![
        FormatDescriptor::new("Relay").with_game(LayerFactory::new(relay)),
        FormatDescriptor::new("Stage")
            .internal()
            .with_install(LayerFactory::new(stage))
            .with_command("win", "win"),
        FormatDescriptor::new("Anagrams")
            .with_install(LayerFactory::new(guess))
            .with_free_join(true)
            .with_private_commands(PrivateCommands::Only(vec!["guess".into()]))
            .with_command("guess", "guess"),
        FormatDescriptor::new("Trivia")
            .with_install(LayerFactory::new(guess))
            .with_command("guess", "guess")
            .with_mode("team"),
        FormatDescriptor::new("Ticker").with_install(LayerFactory::new(ticker)),
    ];
    let modes = vec![ModeDescriptor::new("Team", ModeNaming::Suffix).with_min_players(2)];
    FormatRegistry::from_descriptors(formats, modes, &["start", "join"]).unwrap()
}

fn lobby() -> (Lobby, Probe) {
    let probe = Probe::default();
    let options = LobbyOptions {
        rng_seed: Some(1),
        ..LobbyOptions::default()
    };
    let lobby = Lobby::new(Arc::new(registry()), probe.services(), options);
    (lobby, probe)
}

fn channel(name: &str) -> ChannelId {
    ChannelId::new(name)
}

fn count(probe: &Probe, channel: &ChannelId, needle: &str) -> usize {
    probe
        .messages(channel)
        .iter()
        .filter(|m| m.contains(needle))
        .count()
}

#[test]
fn test_create_announces_signups() {
    let (mut lobby, probe) = lobby();
    let room = channel("room");

    assert_eq!(lobby.create("trivia", &room).unwrap(), CreateOutcome::Started);
    assert_eq!(
        probe.messages(&room),
        vec!["A new game of Trivia is starting! Type .join to sign up.".to_string()]
    );
    assert!(!lobby.session(&room).unwrap().is_started());
}

#[test]
fn test_create_refused_when_channel_is_busy() {
    let (mut lobby, probe) = lobby();
    let room = channel("room");
    lobby.create("trivia", &room).unwrap();

    assert_eq!(lobby.create("anagrams", &room).unwrap(), CreateOutcome::AlreadyActive);
    assert!(probe.said(&room, "already running"));
    assert_eq!(lobby.session(&room).unwrap().state().id(), "trivia");
    assert_eq!(lobby.active_channels(), vec![room]);
}

#[test]
fn test_create_unknown_format() {
    let (mut lobby, probe) = lobby();
    let room = channel("room");
    assert_eq!(lobby.create("chess", &room).unwrap(), CreateOutcome::UnknownFormat);
    assert!(lobby.session(&room).is_none());
    assert!(probe.messages(&room).is_empty());
}

#[test]
fn test_team_mode_needs_two_players() {
    let (mut lobby, probe) = lobby();
    let room = channel("room");
    lobby.create("triviateam", &room).unwrap();
    assert_eq!(lobby.session(&room).unwrap().state().mode_id(), Some("team"));

    lobby.join(&room, &User::new("Alice"));
    assert!(!lobby.start(&room));
    assert!(probe.said(&room, "at least 2 players"));

    lobby.join(&room, &User::new("Bob"));
    assert!(lobby.start(&room));
    assert!(lobby.session(&room).unwrap().is_started());
}

#[test]
fn test_child_end_restores_parent_and_reports_winners_once() {
    let (mut lobby, probe) = lobby();
    let room = channel("room");
    lobby.create("relay", &room).unwrap();
    lobby.join(&room, &User::new("Alice"));
    lobby.join(&room, &User::new("Bob"));
    lobby.start(&room);

    let active = lobby.session(&room).unwrap();
    assert_eq!(active.state().id(), "stage");
    assert_eq!(active.parent().unwrap().child(), Some("stage"));
    assert_eq!(active.state().player_count(), 2);

    let win = Invocation::new("win", "", room.clone(), User::new("Alice"), 1);
    assert_eq!(lobby.dispatch(&win), DispatchOutcome::Delivered(1));

    let active = lobby.session(&room).unwrap();
    assert_eq!(active.state().id(), "relay");
    assert_eq!(active.child(), None);
    assert_eq!(active.state().round, 1);
    assert_eq!(count(&probe, &room, "stage over"), 1);
    assert_eq!(count(&probe, &room, "stage winners: alice"), 1);
    assert_eq!(count(&probe, &room, "stage winners"), 1);
}

#[test]
fn test_force_end_on_child_ends_the_chain() {
    let (mut lobby, probe) = lobby();
    let room = channel("room");
    lobby.create("relay", &room).unwrap();
    lobby.join(&room, &User::new("Alice"));
    lobby.start(&room);
    assert_eq!(lobby.session(&room).unwrap().state().id(), "stage");

    assert!(lobby.force_end(&room));

    assert!(lobby.session(&room).is_none());
    assert_eq!(count(&probe, &room, "forcibly ended"), 1);
    assert_eq!(count(&probe, &room, "stage over"), 0);
    assert_eq!(count(&probe, &room, "relay over"), 0);

    // channel is free again
    assert_eq!(lobby.create("trivia", &room).unwrap(), CreateOutcome::Started);
}

#[test]
fn test_create_child_directly() {
    let (mut lobby, _probe) = lobby();
    let room = channel("room");
    lobby.create("trivia", &room).unwrap();
    lobby.join(&room, &User::new("Alice"));

    assert_eq!(lobby.create_child("anagrams", &room).unwrap(), CreateOutcome::Started);
    let child = lobby.session(&room).unwrap();
    assert_eq!(child.state().id(), "anagrams");
    assert!(child.is_started());
    assert!(child.state().player("alice").is_some());

    assert!(lobby.end(&room));
    assert_eq!(lobby.session(&room).unwrap().state().id(), "trivia");
}

#[test]
fn test_dispatch_in_channel() {
    let (mut lobby, probe) = lobby();
    let room = channel("room");
    lobby.create("anagrams", &room).unwrap();

    let invocation = Invocation::new("guess", "stone", room.clone(), User::new("Bob"), 1);
    assert_eq!(lobby.dispatch(&invocation), DispatchOutcome::Delivered(1));
    assert!(probe.said(&room, "Bob guessed stone"));

    let unknown = Invocation::new("dance", "", room.clone(), User::new("Bob"), 2);
    assert_eq!(lobby.dispatch(&unknown), DispatchOutcome::UnknownCommand);

    let elsewhere = Invocation::new("guess", "x", channel("empty"), User::new("Bob"), 3);
    assert_eq!(lobby.dispatch(&elsewhere), DispatchOutcome::NoSession);
}

#[test]
fn test_private_fan_out_reaches_each_eligible_channel_once() {
    let (mut lobby, probe) = lobby();
    let (a, b, c) = (channel("a"), channel("b"), channel("c"));
    lobby.create("anagrams", &a).unwrap();
    lobby.create("anagrams", &b).unwrap();
    lobby.create("trivia", &c).unwrap();
    probe.set_channels("Bob", &["a", "b", "c", "nowhere"]);

    let dm = Invocation::new("guess", "stone", ChannelId::new("Bob"), User::new("Bob"), 1);
    assert_eq!(lobby.dispatch(&dm), DispatchOutcome::Delivered(2));

    assert_eq!(count(&probe, &a, "Bob guessed stone"), 1);
    assert_eq!(count(&probe, &b, "Bob guessed stone"), 1);
    assert_eq!(count(&probe, &c, "guessed"), 0);
}

#[test]
fn test_failing_hook_does_not_stop_fan_out() {
    let (mut lobby, probe) = lobby();
    let (broken, b) = (channel("broken"), channel("b"));
    lobby.create("anagrams", &broken).unwrap();
    lobby.create("anagrams", &b).unwrap();
    probe.set_channels("Bob", &["broken", "b"]);

    let dm = Invocation::new("guess", "stone", ChannelId::new("Bob"), User::new("Bob"), 1);
    assert_eq!(lobby.dispatch(&dm), DispatchOutcome::Delivered(2));
    assert_eq!(count(&probe, &broken, "guessed"), 0);
    assert_eq!(count(&probe, &b, "Bob guessed stone"), 1);
    assert_eq!(lobby.active_channels().len(), 2);
}

#[test]
fn test_timer_expiry_and_stale_tokens() {
    let (mut lobby, probe) = lobby();
    let room = channel("room");
    lobby.create("ticker", &room).unwrap();
    lobby.start(&room);

    let first = probe.expire_latest().unwrap();
    assert!(lobby.fire_timer(&room, first.token));
    assert!(probe.said(&room, "tick 0"));
    assert_eq!(lobby.session(&room).unwrap().state().round, 1);

    // the expired token is gone; the new one is live
    assert!(!lobby.fire_timer(&room, first.token));
    assert_eq!(probe.live_timers().len(), 1);

    assert!(lobby.end(&room));
    assert!(probe.live_timers().is_empty());
    assert!(lobby.session(&room).is_none());
}

#[test]
fn test_rename_follows_user_in_every_channel() {
    let (mut lobby, _probe) = lobby();
    let (a, b) = (channel("a"), channel("b"));
    lobby.create("trivia", &a).unwrap();
    lobby.create("trivia", &b).unwrap();
    lobby.join(&a, &User::new("Bob"));
    lobby.join(&b, &User::new("Bob"));

    assert_eq!(lobby.rename(&User::new("Robert"), "Bob"), 2);
    assert!(lobby.session(&a).unwrap().state().player("robert").is_some());
    assert!(lobby.session(&b).unwrap().state().player("bob").is_none());
}

#[test]
fn test_join_and_leave() {
    let (mut lobby, _probe) = lobby();
    let room = channel("room");
    assert_eq!(lobby.join(&room, &User::new("Bob")), None);

    lobby.create("trivia", &room).unwrap();
    assert!(matches!(
        lobby.join(&room, &User::new("Bob")),
        Some(JoinOutcome::Joined(_))
    ));
    assert!(lobby.leave(&room, &User::new("Bob")));
    assert!(!lobby.leave(&room, &User::new("Bob")));
    assert_eq!(lobby.session(&room).unwrap().state().player_count(), 0);
}

#[test]
fn test_cycle_surfaces_as_create_error() {
    let formats = vec![
        FormatDescriptor::new("A").with_inherits("b").with_install(LayerFactory::new(guess)),
        FormatDescriptor::new("B").with_inherits("a").with_install(LayerFactory::new(guess)),
    ];
    let registry = FormatRegistry::from_descriptors(formats, Vec::new(), &[]).unwrap();
    let probe = Probe::default();
    let mut lobby = Lobby::new(Arc::new(registry), probe.services(), LobbyOptions::default());

    let room = channel("room");
    assert!(matches!(
        lobby.create("a", &room),
        Err(CreateError::InheritanceCycle { .. })
    ));
    assert!(lobby.session(&room).is_none());
}
