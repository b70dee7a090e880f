//! Command router: command name -> hook, fixed after load
//!
//! One generic dispatch path serves every game command. The router only
//! answers "which hook does this name reach"; whether a session exposes that
//! hook, and whether it accepts it from a direct message, is asked of the
//! session at dispatch time.

use std::collections::HashMap;

use crate::id::to_id;
use crate::registry::{CommandOwner, CommandTable};

/// One routable command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub hook: String,
    pub owner: CommandOwner,
}

#[derive(Debug, Clone, Default)]
pub struct CommandRouter {
    entries: HashMap<String, RouteEntry>,
}

impl CommandRouter {
    pub fn new(table: &CommandTable) -> Self {
        let entries = table
            .iter()
            .map(|(name, route)| {
                (
                    name.clone(),
                    RouteEntry {
                        hook: route.hook.clone(),
                        owner: route.owner.clone(),
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn route(&self, command: &str) -> Option<&RouteEntry> {
        self.entries.get(&to_id(command))
    }

    pub fn is_command(&self, command: &str) -> bool {
        self.route(command).is_some()
    }

    /// Routable names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{FormatDescriptor, ModeDescriptor, ModeNaming};
    use crate::layer::{Layer, LayerFactory};
    use crate::registry::FormatRegistry;

    #[derive(Debug)]
    struct Plain;

    impl Layer for Plain {
        fn name(&self) -> &'static str {
            "plain"
        }
    }

    fn plain() -> Box<dyn Layer> {
        Box::new(Plain)
    }

    #[test]
    fn test_synonyms_reach_the_same_hook() {
        let formats = vec![FormatDescriptor::new("Trivia")
            .with_install(LayerFactory::new(plain))
            .with_command("g", "guess")
            .with_command("guess", "guess")];
        let modes = vec![ModeDescriptor::new("Team", ModeNaming::Suffix).with_command("myteam", "team_info")];
        let registry = FormatRegistry::from_descriptors(formats, modes, &["start"]).unwrap();
        let router = CommandRouter::new(registry.commands());

        assert_eq!(router.route("G").unwrap().hook, "guess");
        assert_eq!(router.route("guess").unwrap().hook, "guess");
        assert_eq!(router.route("myteam").unwrap().hook, "teaminfo");
        assert_eq!(
            router.route("teaminfo").unwrap().owner,
            CommandOwner::Mode("team".into())
        );
        assert!(!router.is_command("start"));
        assert_eq!(router.names(), vec!["g", "guess", "myteam", "teaminfo"]);
    }
}
