//! Behavior composition: turning a resolved format into a layer stack
//!
//! `compose` walks the `inherits` chain up from the format, folds the
//! ancestors' `install` layers in from the most distant one down, puts the
//! format's own layer on top and finally the selected mode's layer.

use tracing::{debug, error};

use crate::format::FormatDescriptor;
use crate::layer::{Flow, HookCtx, HookResult, Layer};
use crate::registry::FormatRegistry;
use crate::session::GameState;

/// Errors building a session's behavior.
///
/// These are catalog defects that load-time validation cannot see (an
/// inheritance cycle is only found by walking the chain).
#[derive(Debug, thiserror::Error)]
pub enum CreateError {
    #[error("Inheritance cycle: {}", chain.join(" -> "))]
    InheritanceCycle { chain: Vec<String> },
    #[error("Format '{format}' inherits from unknown format '{parent}'")]
    UnknownParent { format: String, parent: String },
    #[error("Format '{format}' has no behavior to compose")]
    MissingBehavior { format: String },
    #[error("Format '{format}' selects unknown mode '{mode}'")]
    UnknownMode { format: String, mode: String },
}

/// A session's composed behavior, base-most layer first.
#[derive(Debug, Default)]
pub struct Behavior {
    layers: Vec<Box<dyn Layer>>,
}

impl Behavior {
    /// Build the layer stack for a resolved format.
    pub fn compose(
        registry: &FormatRegistry,
        format: &FormatDescriptor,
    ) -> Result<Self, CreateError> {
        let mut layers = Vec::new();

        if format.inherits.is_some() {
            let mut chain = vec![format.id.clone()];
            let mut ancestors = Vec::new();
            let mut current = format;
            while let Some(parent_id) = &current.inherits {
                if chain.contains(parent_id) {
                    chain.push(parent_id.clone());
                    return Err(CreateError::InheritanceCycle { chain });
                }
                chain.push(parent_id.clone());
                let parent = registry
                    .format(parent_id)
                    .ok_or_else(|| CreateError::UnknownParent {
                        format: current.id.clone(),
                        parent: parent_id.clone(),
                    })?;
                ancestors.push(parent);
                current = parent;
            }

            for ancestor in ancestors.iter().rev() {
                let install = ancestor.install.ok_or_else(|| CreateError::MissingBehavior {
                    format: ancestor.id.clone(),
                })?;
                layers.push(install.build());
            }
        }

        let own = format
            .install
            .or(format.game)
            .ok_or_else(|| CreateError::MissingBehavior {
                format: format.id.clone(),
            })?;
        layers.push(own.build());

        if let Some(mode_id) = &format.mode_id {
            let mode = registry.mode(mode_id).ok_or_else(|| CreateError::UnknownMode {
                format: format.id.clone(),
                mode: mode_id.clone(),
            })?;
            if let Some(install) = mode.install {
                layers.push(install.build());
            }
        }

        let behavior = Self { layers };
        debug!(format = %format.id, layers = ?behavior.names(), "Composed behavior");
        Ok(behavior)
    }

    pub fn from_layers(layers: Vec<Box<dyn Layer>>) -> Self {
        Self { layers }
    }

    /// Layer names, base-most first.
    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    /// Whether any layer implements the command hook.
    pub fn exposes(&self, hook: &str) -> bool {
        self.layers.iter().any(|l| l.handles(hook))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run one hook from the top of the stack down.
    ///
    /// A failing layer stops the walk; the failure is logged and reported as
    /// handled so nothing underneath acts on a half-applied hook.
    pub(crate) fn walk<F>(
        &mut self,
        hook: &str,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        mut run: F,
    ) -> Flow
    where
        F: FnMut(&mut dyn Layer, &mut GameState, &mut HookCtx<'_>) -> HookResult,
    {
        for layer in self.layers.iter_mut().rev() {
            match run(layer.as_mut(), game, ctx) {
                Ok(Flow::Pass) => continue,
                Ok(Flow::Handled) => return Flow::Handled,
                Err(e) => {
                    error!(
                        channel = %ctx.channel(),
                        layer = layer.name(),
                        hook,
                        error = %e,
                        "Hook failed"
                    );
                    return Flow::Handled;
                }
            }
        }
        Flow::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{ModeDescriptor, ModeNaming};
    use crate::layer::{HookError, LayerFactory};
    use crate::testing::Probe;
    use crate::id::ChannelId;
    use crate::services::MemoryLedger;

    macro_rules! layer {
        ($ty:ident, $name:literal, $factory:ident) => {
            #[derive(Debug)]
            struct $ty;

            impl Layer for $ty {
                fn name(&self) -> &'static str {
                    $name
                }

                fn on_start(&mut self, game: &mut GameState, _: &mut HookCtx<'_>) -> HookResult {
                    game.vars.entry("order".into()).or_default().push_str($name);
                    Ok(Flow::Pass)
                }
            }

            fn $factory() -> Box<dyn Layer> {
                Box::new($ty)
            }
        };
    }

    layer!(Base, "a", base);
    layer!(Middle, "b", middle);
    layer!(Top, "c", top);
    layer!(Team, "t", team);

    #[derive(Debug)]
    struct Stopper;

    impl Layer for Stopper {
        fn name(&self) -> &'static str {
            "stop"
        }

        fn on_start(&mut self, _: &mut GameState, _: &mut HookCtx<'_>) -> HookResult {
            Ok(Flow::Handled)
        }

        fn on_end(&mut self, _: &mut GameState, _: &mut HookCtx<'_>) -> HookResult {
            Err(HookError::Failed("boom".into()))
        }
    }

    fn registry(formats: Vec<FormatDescriptor>) -> FormatRegistry {
        let modes = vec![ModeDescriptor::new("Team", ModeNaming::Suffix)
            .with_install(LayerFactory::new(team))];
        FormatRegistry::from_descriptors(formats, modes, &[]).unwrap()
    }

    fn order(behavior: &mut Behavior) -> String {
        let probe = Probe::default();
        let mut transport = probe.transport();
        let mut ledger = MemoryLedger::default();
        let channel = ChannelId::new("lobby");
        let mut ctx = HookCtx::new(&channel, &mut transport, &mut ledger);
        let mut game = GameState::for_tests();
        behavior.walk("on_start", &mut game, &mut ctx, |l, g, c| l.on_start(g, c));
        game.vars.get("order").cloned().unwrap_or_default()
    }

    #[test]
    fn test_compose_folds_chain_ancestor_first() {
        let registry = registry(vec![
            FormatDescriptor::new("A").inherit_only().with_install(LayerFactory::new(base)),
            FormatDescriptor::new("B").with_inherits("a").with_install(LayerFactory::new(middle)),
            FormatDescriptor::new("C").with_inherits("b").with_install(LayerFactory::new(top)).with_mode("team"),
        ]);
        let format = registry.resolve("c,team").unwrap();
        let mut behavior = Behavior::compose(&registry, &format).unwrap();

        assert_eq!(behavior.names(), vec!["a", "b", "c", "t"]);
        // hooks run from the most derived layer down
        assert_eq!(order(&mut behavior), "tcba");
    }

    #[test]
    fn test_compose_standalone_game() {
        let registry = registry(vec![FormatDescriptor::new("Solo").with_game(LayerFactory::new(top))]);
        let format = registry.resolve("solo").unwrap();
        let behavior = Behavior::compose(&registry, &format).unwrap();
        assert_eq!(behavior.names(), vec!["c"]);
    }

    #[test]
    fn test_inheritance_cycle_is_rejected_at_creation() {
        let registry = registry(vec![
            FormatDescriptor::new("A").with_inherits("c").with_install(LayerFactory::new(base)),
            FormatDescriptor::new("B").with_inherits("a").with_install(LayerFactory::new(middle)),
            FormatDescriptor::new("C").with_inherits("b").with_install(LayerFactory::new(top)),
        ]);
        let format = registry.resolve("a").unwrap();

        match Behavior::compose(&registry, &format) {
            Err(CreateError::InheritanceCycle { chain }) => {
                assert_eq!(chain, vec!["a", "c", "b", "a"]);
            }
            other => panic!("expected a cycle error, got {other:?}"),
        }
    }

    #[test]
    fn test_walk_stops_on_handled_and_on_error() {
        let mut behavior = Behavior::from_layers(vec![base(), Box::new(Stopper)]);
        assert_eq!(order(&mut behavior), "");

        let probe = Probe::default();
        let mut transport = probe.transport();
        let mut ledger = MemoryLedger::default();
        let channel = ChannelId::new("lobby");
        let mut ctx = HookCtx::new(&channel, &mut transport, &mut ledger);
        let mut game = GameState::for_tests();
        let flow = behavior.walk("on_end", &mut game, &mut ctx, |l, g, c| l.on_end(g, c));
        assert_eq!(flow, Flow::Handled);
    }

    #[test]
    fn test_exposes_checks_every_layer() {
        #[derive(Debug)]
        struct Guesser;
        impl Layer for Guesser {
            fn name(&self) -> &'static str {
                "guesser"
            }
            fn handles(&self, hook: &str) -> bool {
                hook == "guess"
            }
        }

        let behavior = Behavior::from_layers(vec![Box::new(Guesser), top()]);
        assert!(behavior.exposes("guess"));
        assert!(!behavior.exposes("hint"));
    }
}
