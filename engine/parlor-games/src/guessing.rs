//! Guessing: the inherit-only base of every question-and-answer format
//!
//! The layer owns the round loop. Each round the layer above it publishes
//! the expected answer in `vars["answer"]` and announces the prompt; this
//! layer arms the round timer, scores guesses and decides when the game is
//! over. Settings:
//! - `goal`: points needed to win (default 3)
//! - `round_secs`: seconds per round (default 20)
//! - `max_rounds`: rounds before the top scorer wins (default 10)

use indexmap::IndexMap;
use parlor_core::{
    to_id, Flow, GameState, HookCtx, HookResult, Invocation, Layer, Player,
};
use std::time::Duration;
use tracing::debug;

pub const ANSWER_VAR: &str = "answer";
pub const ROUND_TAG: &str = "round";

const DEFAULT_GOAL: u32 = 3;
const DEFAULT_ROUND_SECS: u64 = 20;
const DEFAULT_MAX_ROUNDS: u32 = 10;

pub fn goal(game: &GameState) -> u32 {
    game.format.setting_or("goal", DEFAULT_GOAL)
}

pub fn round_secs(game: &GameState) -> u64 {
    game.format.setting_or("round_secs", DEFAULT_ROUND_SECS)
}

/// Whether the current round is past the round limit, in which case the
/// prompt layers stay quiet and the base ends the game.
pub fn rounds_exhausted(game: &GameState) -> bool {
    game.round > game.format.setting_or("max_rounds", DEFAULT_MAX_ROUNDS)
}

/// Publish the answer for the current round.
pub fn set_answer(game: &mut GameState, answer: &str) {
    game.vars.insert(ANSWER_VAR.to_string(), answer.to_string());
}

/// Record the top scorers as winners (nobody if nobody scored).
pub fn settle_winners(game: &mut GameState) {
    let Some(best) = game.points.values().copied().max().filter(|&p| p > 0) else {
        return;
    };
    let leaders: IndexMap<String, u32> = game
        .points
        .iter()
        .filter(|(_, &p)| p == best)
        .map(|(id, &p)| (id.clone(), p))
        .collect();
    game.winners = leaders;
}

#[derive(Debug, Default)]
pub struct Guessing;

pub fn install() -> Box<dyn Layer> {
    Box::new(Guessing)
}

impl Guessing {
    fn guess(
        &mut self,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        invocation: &Invocation,
    ) -> HookResult {
        if !game.is_started() {
            return Ok(Flow::Handled);
        }
        let Some(answer) = game.vars.get(ANSWER_VAR).cloned() else {
            return Ok(Flow::Handled);
        };

        let player = match game.player(&invocation.invoker.name) {
            Some(player) if !player.eliminated => player,
            Some(_) => return Ok(Flow::Handled),
            None if game.format.free_join => {
                match game.add_player(&invocation.invoker.name) {
                    Some(player) => player,
                    None => return Ok(Flow::Handled),
                }
            }
            None => return Ok(Flow::Handled),
        };

        if to_id(&invocation.argument) != to_id(&answer) {
            return Ok(Flow::Handled);
        }

        game.vars.remove(ANSWER_VAR);
        let points = game.points.entry(player.id.clone()).or_insert(0);
        *points += 1;
        let points = *points;
        ctx.add_points(1, &player.id);
        ctx.say(format!(
            "Correct! {} got {answer} and has {points} point{}.",
            player.name,
            if points == 1 { "" } else { "s" }
        ));

        if points >= goal(game) {
            game.winners = IndexMap::from([(player.id.clone(), points)]);
            ctx.say(format!("{} wins the game of {}!", player.name, game.name()));
            ctx.end();
        } else {
            ctx.next_round();
        }
        Ok(Flow::Handled)
    }
}

impl Layer for Guessing {
    fn name(&self) -> &'static str {
        "guessing"
    }

    fn on_start(&mut self, _game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        ctx.next_round();
        Ok(Flow::Handled)
    }

    fn on_next_round(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        if rounds_exhausted(game) {
            settle_winners(game);
            ctx.say("Out of rounds!");
            ctx.end();
            return Ok(Flow::Handled);
        }
        if game.vars.contains_key(ANSWER_VAR) {
            ctx.arm_timer(Duration::from_secs(round_secs(game)), ROUND_TAG);
        }
        Ok(Flow::Handled)
    }

    fn on_timer(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>, tag: &str) -> HookResult {
        if tag != ROUND_TAG {
            return Ok(Flow::Pass);
        }
        if let Some(answer) = game.vars.remove(ANSWER_VAR) {
            ctx.say(format!("Time's up! The answer was {answer}."));
        }
        ctx.next_round();
        Ok(Flow::Handled)
    }

    fn on_end(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        if game.is_started() {
            ctx.say(format!("Final scores: {}", game.points_listing()));
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
        if let Some(points) = game.points.shift_remove(old_id) {
            debug!(from = old_id, to = %player.id, "Moving points to renamed player");
            game.points.insert(player.id.clone(), points);
        }
        Ok(Flow::Handled)
    }

    fn handles(&self, hook: &str) -> bool {
        hook == "guess"
    }

    fn on_command(
        &mut self,
        hook: &str,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        invocation: &Invocation,
    ) -> HookResult {
        match hook {
            "guess" => self.guess(game, ctx, invocation),
            _ => Ok(Flow::Pass),
        }
    }
}
