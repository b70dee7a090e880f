//! Players and the roster a session (or a parent/child pair) plays with

use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

use crate::id::to_id;

/// One participant within a single session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Display name, updated on rename
    pub name: String,
    /// Normalized id, always equal to the roster key
    pub id: String,
    /// Eliminated players stay in the roster for final standings
    pub eliminated: bool,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let id = to_id(&name);
        Self {
            name,
            id,
            eliminated: false,
        }
    }
}

/// Roster handle shared by reference between a parent session and its child.
///
/// Sessions of one channel are driven from a single thread of control and
/// only the active session of a pair receives dispatch, so a `RefCell` is
/// enough.
pub type SharedRoster = Rc<RefCell<Roster>>;

/// Ordered mapping from player id to player.
///
/// Insertion order is kept so listings read in join order.
#[derive(Debug, Default, Clone)]
pub struct Roster {
    players: IndexMap<String, Player>,
}

impl Roster {
    pub fn shared() -> SharedRoster {
        Rc::new(RefCell::new(Self::default()))
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.players.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    /// Insert a player under its own id. Returns `false` if the id is taken.
    pub fn insert(&mut self, player: Player) -> bool {
        if self.players.contains_key(&player.id) {
            return false;
        }
        self.players.insert(player.id.clone(), player);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<Player> {
        self.players.shift_remove(id)
    }

    /// Move a player from `old_id` to `new_id`, keeping its position.
    ///
    /// Returns `false` when `old_id` is absent or `new_id` is already taken.
    pub fn rekey(&mut self, old_id: &str, new_id: &str) -> bool {
        if self.players.contains_key(new_id) {
            return false;
        }
        let Some((index, _, mut player)) = self.players.shift_remove_full(old_id) else {
            return false;
        };
        player.id = new_id.to_string();
        self.players.shift_insert(index, new_id.to_string(), player);
        true
    }
}
