use super::*;
use parlor_core::testing::Probe;
use parlor_core::{LobbyOptions, MemoryLedger, Services};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

const RESERVED: &[&str] = &[
    "start", "end", "forceend", "join", "leave", "nick", "games", "players", "help",
];

fn host() -> (Host, Rc<RefCell<Vec<String>>>) {
    let (console, lines) = Console::buffered();
    let probe = Probe::default();
    let services = Services::new(
        Box::new(console.clone()),
        Box::new(MemoryLedger::default()),
        Box::new(probe.scheduler()),
    );
    let registry = parlor_games::builtin_registry(RESERVED).unwrap();
    let options = LobbyOptions {
        rng_seed: Some(3),
        ..LobbyOptions::default()
    };
    let lobby = Lobby::new(Arc::new(registry), services, options);
    (Host::new(lobby, console, ".", "player", "lobby"), lines)
}

fn printed(lines: &Rc<RefCell<Vec<String>>>, needle: &str) -> bool {
    lines.borrow().iter().any(|l| l.contains(needle))
}

fn answer(host: &Host, channel: &str) -> String {
    host.lobby()
        .session(&ChannelId::new(channel))
        .unwrap()
        .state()
        .vars["answer"]
        .clone()
}

#[test]
fn test_parse_channel_and_speaker() {
    let line = Line::parse("#Room alice: .guess paris", "player", "lobby").unwrap();
    assert_eq!(line.channel, ChannelId::new("room"));
    assert_eq!(line.user, User::new("alice"));
    assert_eq!(line.text, ".guess paris");
    assert!(!line.is_private());
}

#[test]
fn test_parse_defaults() {
    let line = Line::parse("  hello there ", "player", "lobby").unwrap();
    assert_eq!(line.channel, ChannelId::new("lobby"));
    assert_eq!(line.user, User::new("player"));
    assert_eq!(line.text, "hello there");

    // a colon after a multi-word prefix is not a speaker
    let line = Line::parse("time is: now", "player", "lobby").unwrap();
    assert_eq!(line.user, User::new("player"));
    assert_eq!(line.text, "time is: now");
}

#[test]
fn test_parse_direct_message() {
    let line = Line::parse("@Dave: .g planet", "player", "lobby").unwrap();
    assert_eq!(line.channel, ChannelId::new("dave"));
    assert!(line.is_private());

    assert!(Line::parse("@dave", "player", "lobby").is_none());
    assert!(Line::parse("   ", "player", "lobby").is_none());
    assert!(Line::parse("#room", "player", "lobby").is_none());
}

#[test]
fn test_game_played_through_the_console() {
    let (mut host, lines) = host();
    host.handle_line("#room alice: .start trivia");
    assert!(printed(&lines, "[#room] A new game of Trivia is starting! Type .join to sign up."));

    host.handle_line("#room alice: .join");
    host.handle_line("#room bob: .join");
    host.handle_line("#room bob: .join");
    assert!(printed(&lines, "bob: you are already signed up."));

    host.handle_line("#room alice: .players");
    assert!(printed(&lines, "Players (2): alice, bob"));

    host.handle_line("#room alice: .start");
    assert!(printed(&lines, "Question 1:"));

    let correct = answer(&host, "room");
    host.handle_line(&format!("#room bob: .guess {correct}"));
    assert!(printed(&lines, &format!("Correct! bob got {correct}")));

    host.handle_line("#room alice: .forceend");
    assert!(printed(&lines, "The game of Trivia was forcibly ended."));
    assert!(host.lobby().session(&ChannelId::new("room")).is_none());
}

#[test]
fn test_unknown_game_and_command() {
    let (mut host, lines) = host();
    host.handle_line(".start chess");
    assert!(printed(&lines, "There is no game called chess. Type .games for the list."));

    host.handle_line(".dance");
    assert!(printed(&lines, "Unknown command .dance. Type .help."));

    host.handle_line(".end");
    assert!(printed(&lines, "[#lobby] No game is running here."));

    host.handle_line(".start");
    assert!(printed(&lines, "Usage: .start <game>"));
}

#[test]
fn test_games_listing() {
    let (mut host, lines) = host();
    host.handle_line(".games");
    assert!(printed(&lines, "Games: Trivia (quiz), Lightning Trivia (lightning), Anagrams, Gauntlet"));
    assert!(printed(&lines, "Modes: Team, Survival"));
}

#[test]
fn test_private_guess_reaches_the_channel_game() {
    let (mut host, lines) = host();
    host.handle_line("#room dave: .start anagrams");
    let correct = answer(&host, "room");

    host.handle_line(&format!("@dave: .g {correct}"));
    assert!(printed(&lines, &format!("[#room] Correct! dave got {correct}")));
}

#[test]
fn test_nick_renames_player_and_presence() {
    let (mut host, lines) = host();
    host.handle_line("#room bob: .start trivia");
    host.handle_line("#room bob: .join");
    host.handle_line("#room bob: .nick Robert");
    assert!(printed(&lines, "bob is now known as Robert."));

    let state = host.lobby().session(&ChannelId::new("room")).unwrap().state();
    assert!(state.player("robert").is_some());
    assert!(state.player("bob").is_none());

    host.handle_line("#room Robert: .leave");
    assert!(printed(&lines, "Robert left the game."));
}
