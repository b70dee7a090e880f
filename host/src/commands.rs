//! Line parsing and the host's own commands
//!
//! The host owns the platform commands (`start`, `end`, `join`, ...) and
//! passes everything else to the lobby's command router.

use parlor_core::{
    to_id, ChannelId, CreateOutcome, DispatchOutcome, Invocation, JoinOutcome, Lobby, TimerToken,
    User,
};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error};

use crate::console::Console;

/// One chat line after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub channel: ChannelId,
    pub user: User,
    pub text: String,
}

impl Line {
    /// Parse `#channel user: text`, `@user: text` or bare `text`.
    ///
    /// Missing parts fall back to the defaults. Returns `None` for blank
    /// lines and for a direct message without a speaker.
    pub fn parse(raw: &str, default_user: &str, default_channel: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Some(rest) = raw.strip_prefix('@') {
            let (user, text) = split_speaker(rest)?;
            if text.is_empty() {
                return None;
            }
            let user = User::new(user);
            return Some(Self {
                channel: ChannelId::new(&user.name),
                user,
                text: text.to_string(),
            });
        }

        let (channel, rest) = match raw.strip_prefix('#') {
            Some(rest) => match rest.split_once(char::is_whitespace) {
                Some((channel, rest)) => (channel, rest.trim_start()),
                None => (rest, ""),
            },
            None => (default_channel, raw),
        };
        let (user, text) = split_speaker(rest).unwrap_or((default_user, rest));
        if text.is_empty() {
            return None;
        }
        Some(Self {
            channel: ChannelId::new(channel),
            user: User::new(user),
            text: text.to_string(),
        })
    }

    pub fn is_private(&self) -> bool {
        self.channel.as_str() == self.user.id()
    }
}

/// `name: text` with a single-word name.
fn split_speaker(text: &str) -> Option<(&str, &str)> {
    let (name, rest) = text.split_once(':')?;
    if name.is_empty() || name.contains(char::is_whitespace) {
        return None;
    }
    Some((name, rest.trim()))
}

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

pub struct Host {
    lobby: Lobby,
    console: Console,
    prefix: String,
    default_user: String,
    default_channel: String,
}

impl Host {
    pub fn new(
        lobby: Lobby,
        console: Console,
        prefix: impl Into<String>,
        default_user: impl Into<String>,
        default_channel: impl Into<String>,
    ) -> Self {
        Self {
            lobby,
            console,
            prefix: prefix.into(),
            default_user: default_user.into(),
            default_channel: default_channel.into(),
        }
    }

    #[cfg(test)]
    pub fn lobby(&self) -> &Lobby {
        &self.lobby
    }

    pub fn fire_timer(&mut self, channel: &ChannelId, token: TimerToken) {
        self.lobby.fire_timer(channel, token);
    }

    /// Handle one raw input line.
    pub fn handle_line(&mut self, raw: &str) {
        let Some(line) = Line::parse(raw, &self.default_user, &self.default_channel) else {
            return;
        };
        if !line.is_private() {
            self.console.enter(&line.user, &line.channel);
        }
        let Some(command_line) = line.text.strip_prefix(self.prefix.as_str()) else {
            return;
        };
        let (command, argument) = match command_line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, argument.trim()),
            None => (command_line, ""),
        };
        let command = to_id(command);
        if command.is_empty() {
            return;
        }
        self.command(&line, &command, argument);
    }

    fn reply(&self, channel: &ChannelId, text: &str) {
        self.console.print(channel, text);
    }

    fn command(&mut self, line: &Line, command: &str, argument: &str) {
        let channel = &line.channel;
        match command {
            "start" => self.start(channel, argument),
            "end" => {
                if !self.lobby.end(channel) {
                    self.reply(channel, "No game is running here.");
                }
            }
            "forceend" => {
                if !self.lobby.force_end(channel) {
                    self.reply(channel, "No game is running here.");
                }
            }
            "join" => match self.lobby.join(channel, &line.user) {
                None => self.reply(channel, "No game is running here."),
                Some(JoinOutcome::AlreadyJoined) => {
                    let text = format!("{}: you are already signed up.", line.user.name);
                    self.reply(channel, &text);
                }
                Some(_) => {}
            },
            "leave" => {
                if !self.lobby.leave(channel, &line.user) {
                    let text = format!("{}: you are not in a game here.", line.user.name);
                    self.reply(channel, &text);
                }
            }
            "nick" => self.nick(line, argument),
            "games" => self.games(channel),
            "players" => {
                let text = match self.lobby.session(channel) {
                    Some(session) if session.state().player_count() > 0 => format!(
                        "Players ({}): {}",
                        session.state().player_count(),
                        session.state().player_names()
                    ),
                    Some(_) => "Nobody has joined yet.".to_string(),
                    None => "No game is running here.".to_string(),
                };
                self.reply(channel, &text);
            }
            "help" => {
                let p = &self.prefix;
                let text = format!(
                    "Commands: {p}start <game>, {p}start, {p}join, {p}leave, {p}end, {p}forceend, \
                     {p}players, {p}games, {p}nick <name>"
                );
                self.reply(channel, &text);
            }
            _ => self.dispatch(line, command, argument),
        }
    }

    fn start(&mut self, channel: &ChannelId, target: &str) {
        if target.is_empty() {
            if self.lobby.session(channel).is_none() {
                let text = format!("Usage: {}start <game>", self.prefix);
                self.reply(channel, &text);
            } else {
                self.lobby.start(channel);
            }
            return;
        }
        match self.lobby.create(target, channel) {
            Ok(CreateOutcome::Started) | Ok(CreateOutcome::AlreadyActive) => {}
            Ok(CreateOutcome::UnknownFormat) => {
                let text = format!(
                    "There is no game called {target}. Type {}games for the list.",
                    self.prefix
                );
                self.reply(channel, &text);
            }
            Err(e) => {
                error!(channel = %channel, request = target, error = %e, "Game could not be created");
                let text = format!("{target} could not be started.");
                self.reply(channel, &text);
            }
        }
    }

    fn nick(&mut self, line: &Line, new_name: &str) {
        if to_id(new_name).is_empty() {
            let text = format!("Usage: {}nick <name>", self.prefix);
            self.reply(&line.channel, &text);
            return;
        }
        let renamed = User::new(new_name);
        self.console.rename(&line.user, &renamed);
        let sessions = self.lobby.rename(&renamed, &line.user.name);
        debug!(from = %line.user.name, to = new_name, sessions, "Nick change");
        let text = format!("{} is now known as {new_name}.", line.user.name);
        self.reply(&line.channel, &text);
    }

    fn games(&self, channel: &ChannelId) {
        let registry = self.lobby.registry();
        let games: Vec<String> = registry
            .listed_formats()
            .map(|f| match f.aliases.first() {
                Some(alias) => format!("{} ({alias})", f.name),
                None => f.name.clone(),
            })
            .collect();
        self.reply(channel, &format!("Games: {}", games.join(", ")));

        let modes: Vec<&str> = registry.modes().map(|m| m.name.as_str()).collect();
        if !modes.is_empty() {
            self.reply(channel, &format!("Modes: {}", modes.join(", ")));
        }
    }

    fn dispatch(&mut self, line: &Line, command: &str, argument: &str) {
        let invocation = Invocation::new(
            command,
            argument,
            line.channel.clone(),
            line.user.clone(),
            timestamp(),
        );
        match self.lobby.dispatch(&invocation) {
            DispatchOutcome::Delivered(n) => debug!(command, sessions = n, "Command delivered"),
            DispatchOutcome::UnknownCommand => {
                let text = format!(
                    "Unknown command {}{command}. Type {}help.",
                    self.prefix, self.prefix
                );
                self.reply(&line.channel, &text);
            }
            DispatchOutcome::NoSession => {
                debug!(command, channel = %line.channel, "No session takes this command")
            }
        }
    }
}

#[cfg(test)]
mod tests;
