//! Gauntlet: a series of quick trivia stages played as child sessions.
//!
//! Each stage runs in the same channel with the gauntlet's roster. The
//! gauntlet counts stage wins in its own `points` and crowns whoever won
//! the most once `stages` (default 3) have been played.

use indexmap::IndexMap;
use parlor_core::{Flow, GameState, HookCtx, HookResult, Layer, Player};

use crate::guessing;

pub const STAGE_FORMAT: &str = "gauntletstage";
const DEFAULT_STAGES: u32 = 3;

#[derive(Debug, Default)]
pub struct Gauntlet;

pub fn game() -> Box<dyn Layer> {
    Box::new(Gauntlet)
}

fn stages(game: &GameState) -> u32 {
    game.format.setting_or("stages", DEFAULT_STAGES)
}

impl Layer for Gauntlet {
    fn name(&self) -> &'static str {
        "gauntlet"
    }

    fn on_start(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        if game.player_count() == 0 {
            ctx.say("Nobody signed up for the gauntlet.");
            ctx.end();
            return Ok(Flow::Handled);
        }
        ctx.say(format!(
            "The gauntlet begins: {} stages. Players: {}",
            stages(game),
            game.player_names()
        ));
        ctx.spawn_child(STAGE_FORMAT);
        Ok(Flow::Handled)
    }

    fn on_next_round(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        ctx.say(format!("Stage {} of {}!", game.round + 1, stages(game)));
        ctx.spawn_child(STAGE_FORMAT);
        Ok(Flow::Handled)
    }

    fn on_child_end(
        &mut self,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        winners: &IndexMap<String, u32>,
    ) -> HookResult {
        let stage = game.round + 1;
        if winners.is_empty() {
            ctx.say(format!("Stage {stage} had no winner."));
        }
        for id in winners.keys() {
            *game.points.entry(id.clone()).or_insert(0) += 1;
            let name = game.player(id).map_or_else(|| id.clone(), |p| p.name);
            ctx.say(format!("Stage {stage} goes to {name}."));
        }

        if stage >= stages(game) {
            guessing::settle_winners(game);
            ctx.end();
        } else {
            ctx.next_round();
        }
        Ok(Flow::Handled)
    }

    fn on_end(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        if !game.is_started() || game.player_count() == 0 {
            return Ok(Flow::Handled);
        }
        ctx.say(format!("The gauntlet is over. Stage wins: {}", game.points_listing()));
        let names: Vec<String> = game
            .winners
            .keys()
            .filter_map(|id| game.player(id).map(|p| p.name))
            .collect();
        if !names.is_empty() {
            ctx.say(format!("Champion: {}", names.join(" and ")));
        }
        Ok(Flow::Handled)
    }

    fn on_rename(
        &mut self,
        game: &mut GameState,
        _ctx: &mut HookCtx<'_>,
        player: &Player,
        old_id: &str,
    ) -> HookResult {
        if let Some(wins) = game.points.shift_remove(old_id) {
            game.points.insert(player.id.clone(), wins);
        }
        Ok(Flow::Handled)
    }
}
