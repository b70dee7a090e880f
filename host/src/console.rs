//! Console transport: channel messages go to stdout, and a user counts as
//! present in every channel they have spoken in.

use parlor_core::{ChannelId, Transport, User};
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

#[derive(Debug, Clone)]
enum Sink {
    Stdout,
    #[cfg(test)]
    Buffer(Rc<RefCell<Vec<String>>>),
}

#[derive(Debug, Clone)]
pub struct Console {
    sink: Sink,
    presence: Rc<RefCell<HashMap<String, BTreeSet<ChannelId>>>>,
}

impl Console {
    pub fn stdout() -> Self {
        Self {
            sink: Sink::Stdout,
            presence: Rc::default(),
        }
    }

    /// A console that collects lines instead of printing them.
    #[cfg(test)]
    pub fn buffered() -> (Self, Rc<RefCell<Vec<String>>>) {
        let lines = Rc::new(RefCell::new(Vec::new()));
        let console = Self {
            sink: Sink::Buffer(Rc::clone(&lines)),
            presence: Rc::default(),
        };
        (console, lines)
    }

    pub fn print(&self, channel: &ChannelId, text: &str) {
        let line = format!("[#{channel}] {text}");
        match &self.sink {
            Sink::Stdout => println!("{line}"),
            #[cfg(test)]
            Sink::Buffer(lines) => lines.borrow_mut().push(line),
        }
    }

    /// Record that `user` is in `channel`.
    pub fn enter(&self, user: &User, channel: &ChannelId) {
        self.presence
            .borrow_mut()
            .entry(user.id())
            .or_default()
            .insert(channel.clone());
    }

    /// Carry presence over to a new display name.
    pub fn rename(&self, old: &User, new: &User) {
        let mut presence = self.presence.borrow_mut();
        if let Some(channels) = presence.remove(&old.id()) {
            presence.entry(new.id()).or_default().extend(channels);
        }
    }
}

impl Transport for Console {
    fn say(&mut self, channel: &ChannelId, text: &str) {
        self.print(channel, text);
    }

    fn channels_of(&self, user: &User) -> Vec<ChannelId> {
        self.presence
            .borrow()
            .get(&user.id())
            .map(|channels| channels.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_say_formats_channel() {
        let (mut console, lines) = Console::buffered();
        console.say(&ChannelId::new("Lobby"), "hello");
        assert_eq!(*lines.borrow(), vec!["[#lobby] hello".to_string()]);
    }

    #[test]
    fn test_presence_follows_rename() {
        let console = Console::stdout();
        let bob = User::new("Bob");
        console.enter(&bob, &ChannelId::new("a"));
        console.enter(&bob, &ChannelId::new("b"));
        console.enter(&bob, &ChannelId::new("a"));
        assert_eq!(console.channels_of(&bob).len(), 2);

        let robert = User::new("Robert");
        console.rename(&bob, &robert);
        assert!(console.channels_of(&bob).is_empty());
        assert_eq!(
            console.channels_of(&robert),
            vec![ChannelId::new("a"), ChannelId::new("b")]
        );
    }
}
