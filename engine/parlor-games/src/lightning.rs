//! Lightning Trivia: trivia with a short clock and a higher goal.

use parlor_core::{Flow, GameState, HookCtx, HookResult, Layer};

use crate::guessing;

#[derive(Debug, Default)]
pub struct Lightning;

pub fn install() -> Box<dyn Layer> {
    Box::new(Lightning)
}

impl Layer for Lightning {
    fn name(&self) -> &'static str {
        "lightning"
    }

    fn on_start(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        ctx.say(format!(
            "Lightning round! {} seconds per question, first to {} wins.",
            guessing::round_secs(game),
            guessing::goal(game)
        ));
        Ok(Flow::Pass)
    }
}
