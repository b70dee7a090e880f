use super::*;
use parlor_core::testing::Probe;
use parlor_core::{
    ChannelId, CreateOutcome, DispatchOutcome, Invocation, JoinOutcome, Lobby, LobbyOptions, User,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

const RESERVED: &[&str] = &["start", "end", "forceend", "join", "leave"];

fn lobby() -> (Lobby, Probe) {
    let probe = Probe::default();
    let registry = builtin_registry(RESERVED).unwrap();
    let options = LobbyOptions {
        rng_seed: Some(11),
        ..LobbyOptions::default()
    };
    (Lobby::new(Arc::new(registry), probe.services(), options), probe)
}

fn room() -> ChannelId {
    ChannelId::new("room")
}

fn answer(lobby: &Lobby, channel: &ChannelId) -> String {
    lobby.session(channel).unwrap().state().vars[guessing::ANSWER_VAR].clone()
}

fn guess(lobby: &mut Lobby, channel: &ChannelId, user: &str, text: &str) -> DispatchOutcome {
    let invocation = Invocation::new("guess", text, channel.clone(), User::new(user), 0);
    lobby.dispatch(&invocation)
}

fn signed_up(target: &str, players: &[&str]) -> (Lobby, Probe) {
    let (mut lobby, probe) = lobby();
    assert_eq!(lobby.create(target, &room()).unwrap(), CreateOutcome::Started);
    for player in players {
        lobby.join(&room(), &User::new(*player));
    }
    (lobby, probe)
}

fn expire(lobby: &mut Lobby, probe: &Probe) {
    let timer = probe.expire_latest().unwrap();
    assert!(lobby.fire_timer(&timer.channel, timer.token));
}

#[test]
fn test_builtin_catalog_loads() {
    let registry = builtin_registry(RESERVED).unwrap();

    let listed: Vec<&str> = registry.listed_formats().map(|f| f.id.as_str()).collect();
    assert_eq!(listed, vec!["trivia", "lightningtrivia", "anagrams", "gauntlet"]);
    for target in [
        "quiz",
        "quizteams",
        "triviateam",
        "survivaltrivia",
        "survquiz",
        "backwardstrivia",
        "trivia,rev",
        "lightningteam",
        "gauntletstage",
    ] {
        assert!(registry.resolve(target).is_some(), "{target} should resolve");
    }
    assert!(registry.resolve("guessing").is_none());
    assert_eq!(registry.commands().route("g").unwrap().hook, "guess");
}

#[test]
fn test_behavior_table_names() {
    let table = behavior_table();
    let names: Vec<&str> = table.names().collect();
    assert_eq!(
        names,
        vec!["guessing", "trivia", "lightning", "anagrams", "gauntlet", "team", "survival"]
    );
}

#[test]
fn test_trivia_played_to_the_goal() {
    let (mut lobby, probe) = signed_up("trivia", &["Alice", "Bob"]);
    assert!(lobby.start(&room()));
    assert!(probe.said(&room(), "Question 1:"));
    assert_eq!(probe.live_timers().len(), 1);
    assert_eq!(probe.live_timers()[0].delay, Duration::from_secs(20));

    assert_eq!(guess(&mut lobby, &room(), "Bob", "definitely wrong"), DispatchOutcome::Delivered(1));
    assert!(lobby.session(&room()).unwrap().state().points.is_empty());

    for round in 1..=3 {
        let correct = answer(&lobby, &room());
        guess(&mut lobby, &room(), "Alice", &correct);
        assert!(probe.said(&room(), &format!("has {round} point")));
    }

    assert!(probe.said(&room(), "Alice wins the game of Trivia!"));
    assert!(probe.said(&room(), "Final scores: Alice (3), Bob"));
    assert!(lobby.session(&room()).is_none());
    assert!(probe.live_timers().is_empty());
    assert_eq!(lobby.ledger().get_points("alice", &room()), 3);
}

#[test]
fn test_guesses_from_non_players_are_ignored() {
    let (mut lobby, probe) = signed_up("trivia", &["Alice"]);
    lobby.start(&room());
    let correct = answer(&lobby, &room());

    guess(&mut lobby, &room(), "Mallory", &correct);
    assert!(!probe.said(&room(), "Correct!"));
}

#[test]
fn test_timeout_reveals_answer_and_moves_on() {
    let (mut lobby, probe) = signed_up("trivia", &["Alice"]);
    lobby.start(&room());
    let correct = answer(&lobby, &room());

    expire(&mut lobby, &probe);
    assert!(probe.said(&room(), &format!("Time's up! The answer was {correct}.")));
    assert!(probe.said(&room(), "Question 2:"));
    assert_eq!(lobby.session(&room()).unwrap().state().round, 2);
}

#[test]
fn test_reverse_variation_prints_questions_backwards() {
    let (mut lobby, probe) = signed_up("trivia,rev", &["Alice"]);
    assert!(probe.said(&room(), "A new game of Reverse Trivia is starting!"));
    lobby.start(&room());
    assert!(probe.said(&room(), "Question 1: ?"));
}

#[test]
fn test_stage_runs_out_of_rounds() {
    let (mut lobby, probe) = signed_up("gauntletstage", &["Alice"]);
    lobby.start(&room());
    for _ in 0..5 {
        expire(&mut lobby, &probe);
    }

    assert!(probe.said(&room(), "Out of rounds!"));
    assert!(lobby.session(&room()).is_none());
}

#[test]
fn test_lightning_inherits_the_trivia_stack() {
    let (mut lobby, probe) = signed_up("lightning", &["Alice"]);
    let names = lobby.session(&room()).unwrap().behavior().names();
    assert_eq!(names, vec!["guessing", "trivia", "lightning"]);

    lobby.start(&room());
    assert!(probe.said(&room(), "Lightning round! 8 seconds per question, first to 5 wins."));
    assert_eq!(probe.live_timers()[0].delay, Duration::from_secs(8));
}

#[test]
fn test_team_mode_needs_two_players() {
    let (mut lobby, probe) = signed_up("quizteams", &["Alice"]);
    assert!(!lobby.start(&room()));
    assert!(probe.said(&room(), "Trivia needs at least 2 players to start."));

    lobby.join(&room(), &User::new("Bob"));
    lobby.join(&room(), &User::new("Carol"));
    assert!(lobby.start(&room()));
    assert!(probe.said(&room(), "Team 1: "));
    assert!(probe.said(&room(), "Team 2: "));

    let myteam = Invocation::new("myteam", "", room(), User::new("Alice"), 0);
    assert_eq!(lobby.dispatch(&myteam), DispatchOutcome::Delivered(1));
    assert!(probe.said(&room(), "Alice, you are on Team"));
}

#[test]
fn test_team_mode_names_the_winning_team() {
    let (mut lobby, probe) = signed_up("triviateam", &["Alice", "Bob"]);
    lobby.start(&room());
    for _ in 0..3 {
        let correct = answer(&lobby, &room());
        guess(&mut lobby, &room(), "Alice", &correct);
    }

    assert!(probe.said(&room(), "wins with 3 points!"));
    assert!(lobby.session(&room()).is_none());
}

#[test]
fn test_survival_wrong_guesses_cost_lives() {
    let (mut lobby, probe) = signed_up("survtrivia", &["Alice", "Bob"]);
    lobby.start(&room());
    assert!(probe.said(&room(), "Everyone starts with 3 lives."));

    for _ in 0..2 {
        guess(&mut lobby, &room(), "Bob", "not it");
    }
    assert_eq!(lobby.session(&room()).unwrap().state().lives["bob"], 1);

    let lives = Invocation::new("lives", "", room(), User::new("Alice"), 0);
    lobby.dispatch(&lives);
    assert!(probe.said(&room(), "Lives: Alice (3), Bob (1)"));

    guess(&mut lobby, &room(), "Bob", "still not it");
    assert!(probe.said(&room(), "Bob is out!"));
    assert!(probe.said(&room(), "Alice survives!"));
    assert!(lobby.session(&room()).is_none());
}

#[test]
fn test_survival_timeouts_cost_everyone() {
    let (mut lobby, probe) = signed_up("survivaltrivia", &["Alice", "Bob"]);
    lobby.start(&room());
    guess(&mut lobby, &room(), "Bob", "nope");

    expire(&mut lobby, &probe);
    assert!(probe.said(&room(), "Lives: Alice (2), Bob (1)"));
    expire(&mut lobby, &probe);
    assert!(probe.said(&room(), "Bob is out!"));
    assert!(probe.said(&room(), "Alice survives!"));
}

#[test]
fn test_anagrams_free_join_and_private_guesses() {
    let (mut lobby, probe) = lobby();
    lobby.create("anagrams", &room()).unwrap();
    assert!(!probe.said(&room(), "is starting"));
    assert!(lobby.session(&room()).unwrap().is_started());
    assert!(probe.said(&room(), "Round 1: unscramble"));

    assert_eq!(lobby.join(&room(), &User::new("Dave")), Some(JoinOutcome::FreeJoin));
    assert!(probe.said(&room(), "Anagrams has no signups. Just start playing!"));

    probe.set_channels("Dave", &["room"]);
    let correct = answer(&lobby, &room());
    let dm = ChannelId::new("Dave");
    assert_eq!(guess(&mut lobby, &dm, "Dave", &correct), DispatchOutcome::Delivered(1));
    assert!(probe.said(&room(), &format!("Correct! Dave got {correct}")));
    assert!(lobby.session(&room()).unwrap().state().player("dave").is_some());
}

#[test]
fn test_gauntlet_plays_stages_as_children() {
    let (mut lobby, probe) = signed_up("gauntlet", &["Alice", "Bob"]);
    lobby.start(&room());
    assert!(probe.said(&room(), "The gauntlet begins: 3 stages. Players: Alice, Bob"));

    for (stage, winner) in [(1, "Alice"), (2, "Bob"), (3, "Alice")] {
        let session = lobby.session(&room()).unwrap();
        assert_eq!(session.state().id(), gauntlet::STAGE_FORMAT);
        assert_eq!(session.parent().unwrap().state().id(), "gauntlet");

        let correct = answer(&lobby, &room());
        guess(&mut lobby, &room(), winner, &correct);
        assert!(probe.said(&room(), &format!("Stage {stage} goes to {winner}.")));
    }

    assert!(probe.said(&room(), "Stage 2 of 3!"));
    assert!(probe.said(&room(), "The gauntlet is over. Stage wins: Alice (2), Bob (1)"));
    assert!(probe.said(&room(), "Champion: Alice"));
    assert!(lobby.session(&room()).is_none());
}

#[test]
fn test_gauntlet_without_players_ends_at_once() {
    let (mut lobby, probe) = signed_up("gauntlet", &[]);
    lobby.start(&room());
    assert!(probe.said(&room(), "Nobody signed up for the gauntlet."));
    assert!(lobby.session(&room()).is_none());
}

#[test]
fn test_rename_moves_points() {
    let (mut lobby, _probe) = signed_up("trivia", &["Alice", "Bob"]);
    lobby.start(&room());
    let correct = answer(&lobby, &room());
    guess(&mut lobby, &room(), "Alice", &correct);

    assert_eq!(lobby.rename(&User::new("Alicia"), "Alice"), 1);
    let state = lobby.session(&room()).unwrap().state();
    assert_eq!(state.points.get("alicia"), Some(&1));
    assert!(!state.points.contains_key("alice"));
}

#[test]
fn test_load_registry_reads_data_files() {
    let dir = tempfile::tempdir().unwrap();
    let mut file = std::fs::File::create(dir.path().join("capitals.toml")).unwrap();
    writeln!(
        file,
        r#"
[[format]]
name = "Capitals"
inherits = "guessing"
install = "trivia"
aliases = ["caps"]
modes = ["team"]

[format.settings]
category = "capitals"
"#
    )
    .unwrap();

    let registry = load_registry(dir.path(), RESERVED).unwrap();
    let capitals = registry.resolve("capsteam").unwrap();
    assert_eq!(capitals.id, "capitals");
    assert_eq!(capitals.mode_id.as_deref(), Some("team"));
    assert_eq!(capitals.setting::<String>("category").as_deref(), Some("capitals"));
    assert!(registry.resolve("trivia").is_some());
}

#[test]
fn test_load_registry_without_data_dir() {
    let dir = tempfile::tempdir().unwrap();
    let registry = load_registry(&dir.path().join("absent"), RESERVED).unwrap();
    assert_eq!(registry.len(), builtin_registry(RESERVED).unwrap().len());
}

#[test]
fn test_shipped_data_files_load() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/formats");
    let registry = load_registry(&dir, RESERVED).unwrap();
    assert!(registry.resolve("caps,rev").is_some());
    assert!(registry.resolve("survcapitals").is_some());
}
