//! Cross-cutting modes: Team and Survival
//!
//! Mode layers sit on top of the format's layers and almost always pass, so
//! the format keeps running its own game underneath.

use indexmap::IndexMap;
use parlor_core::{
    to_id, Flow, GameState, HookCtx, HookResult, Invocation, Layer, LayerFactory, ModeDescriptor,
    ModeNaming, Player,
};

use crate::guessing;

const TEAM_COUNT: usize = 2;
const DEFAULT_LIVES: u32 = 3;

pub fn team_mode() -> ModeDescriptor {
    ModeDescriptor::new("Team", ModeNaming::Suffix)
        .with_aliases(&["teams"])
        .with_min_players(2)
        .with_description("Players are split into two teams that score together.")
        .with_command("myteam", "myteam")
        .with_install(LayerFactory::new(team))
}

pub fn survival_mode() -> ModeDescriptor {
    ModeDescriptor::new("Survival", ModeNaming::Prefix)
        .with_aliases(&["surv"])
        .with_description("Wrong guesses and unanswered rounds cost lives. Last one standing wins.")
        .with_command("lives", "lives")
        .with_install(LayerFactory::new(survival))
}

/// Player id -> team index
#[derive(Debug, Default)]
pub struct Team {
    teams: IndexMap<String, usize>,
}

pub fn team() -> Box<dyn Layer> {
    Box::new(Team::default())
}

impl Team {
    fn members(&self, game: &GameState, team: usize) -> Vec<Player> {
        self.teams
            .iter()
            .filter(|(_, &t)| t == team)
            .filter_map(|(id, _)| game.player(id))
            .collect()
    }

    fn score(&self, game: &GameState, team: usize) -> u32 {
        self.teams
            .iter()
            .filter(|(_, &t)| t == team)
            .map(|(id, _)| game.points.get(id).copied().unwrap_or(0))
            .sum()
    }
}

impl Layer for Team {
    fn name(&self) -> &'static str {
        "team"
    }

    fn on_start(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        self.teams = game
            .shuffled(None)
            .into_iter()
            .enumerate()
            .map(|(i, p)| (p.id, i % TEAM_COUNT))
            .collect();
        let lines: Vec<String> = (0..TEAM_COUNT)
            .map(|t| {
                let names: Vec<String> = self.members(game, t).into_iter().map(|p| p.name).collect();
                format!("Team {}: {}", t + 1, names.join(", "))
            })
            .collect();
        ctx.say(lines.join(". "));
        Ok(Flow::Pass)
    }

    fn on_end(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        if self.teams.is_empty() {
            return Ok(Flow::Pass);
        }
        let scores: Vec<u32> = (0..TEAM_COUNT).map(|t| self.score(game, t)).collect();
        let best = scores.iter().copied().max().unwrap_or(0);
        let leaders: Vec<usize> = (0..TEAM_COUNT).filter(|&t| scores[t] == best).collect();

        if leaders.len() > 1 {
            ctx.say(format!("The teams tied with {best} points each."));
        } else if let Some(&winner) = leaders.first() {
            ctx.say(format!("Team {} wins with {best} points!", winner + 1));
            game.winners = self
                .members(game, winner)
                .into_iter()
                .map(|p| {
                    let points = game.points.get(&p.id).copied().unwrap_or(0);
                    (p.id, points)
                })
                .collect();
        }
        Ok(Flow::Pass)
    }

    fn on_rename(
        &mut self,
        _game: &mut GameState,
        _ctx: &mut HookCtx<'_>,
        player: &Player,
        old_id: &str,
    ) -> HookResult {
        if let Some(team) = self.teams.shift_remove(old_id) {
            self.teams.insert(player.id.clone(), team);
        }
        Ok(Flow::Pass)
    }

    fn handles(&self, hook: &str) -> bool {
        hook == "myteam"
    }

    fn on_command(
        &mut self,
        _hook: &str,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        invocation: &Invocation,
    ) -> HookResult {
        let name = &invocation.invoker.name;
        match self.teams.get(&invocation.invoker.id()) {
            Some(&team) => {
                let mates: Vec<String> = self
                    .members(game, team)
                    .into_iter()
                    .map(|p| p.name)
                    .collect();
                ctx.say(format!("{name}, you are on Team {}: {}", team + 1, mates.join(", ")));
            }
            None => ctx.say(format!("{name}, you are not on a team.")),
        }
        Ok(Flow::Handled)
    }
}

#[derive(Debug, Default)]
pub struct Survival;

pub fn survival() -> Box<dyn Layer> {
    Box::new(Survival)
}

impl Survival {
    /// Take a life from `player`, eliminating them at zero.
    fn lose_life(game: &mut GameState, ctx: &mut HookCtx<'_>, player: &Player) {
        let lives = game.lives.entry(player.id.clone()).or_insert(0);
        *lives = lives.saturating_sub(1);
        if *lives == 0 {
            game.eliminate(&player.id);
            ctx.say(format!("{} is out!", player.name));
        }
    }

    /// End the game once at most one player is left. Returns whether it did.
    fn finish_if_decided(game: &mut GameState, ctx: &mut HookCtx<'_>) -> bool {
        if game.remaining_count() > 1 {
            return false;
        }
        let survivors = game.remaining_players();
        game.winners = survivors
            .iter()
            .map(|p| (p.id.clone(), game.lives.get(&p.id).copied().unwrap_or(0)))
            .collect();
        match survivors.first() {
            Some(p) => ctx.say(format!("{} survives!", p.name)),
            None => ctx.say("Nobody survived."),
        }
        ctx.end();
        true
    }
}

impl Layer for Survival {
    fn name(&self) -> &'static str {
        "survival"
    }

    fn on_start(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        let lives = game.format.setting_or("lives", DEFAULT_LIVES);
        for player in game.remaining_players() {
            game.lives.insert(player.id, lives);
        }
        ctx.say(format!("Everyone starts with {lives} lives."));
        Ok(Flow::Pass)
    }

    /// An unanswered round costs every remaining player a life.
    fn on_timer(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>, tag: &str) -> HookResult {
        if tag != guessing::ROUND_TAG || !game.vars.contains_key(guessing::ANSWER_VAR) {
            return Ok(Flow::Pass);
        }
        for player in game.remaining_players() {
            Self::lose_life(game, ctx, &player);
        }
        ctx.say(format!("Lives: {}", game.lives_listing()));
        if Self::finish_if_decided(game, ctx) {
            return Ok(Flow::Handled);
        }
        Ok(Flow::Pass)
    }

    fn on_rename(
        &mut self,
        game: &mut GameState,
        _ctx: &mut HookCtx<'_>,
        player: &Player,
        old_id: &str,
    ) -> HookResult {
        if let Some(lives) = game.lives.shift_remove(old_id) {
            game.lives.insert(player.id.clone(), lives);
        }
        Ok(Flow::Pass)
    }

    fn handles(&self, hook: &str) -> bool {
        matches!(hook, "lives" | "guess")
    }

    /// `lives` lists the lives left; a wrong `guess` costs the guesser one.
    fn on_command(
        &mut self,
        hook: &str,
        game: &mut GameState,
        ctx: &mut HookCtx<'_>,
        invocation: &Invocation,
    ) -> HookResult {
        if hook == "lives" {
            ctx.say(format!("Lives: {}", game.lives_listing()));
            return Ok(Flow::Handled);
        }

        if !game.is_started() {
            return Ok(Flow::Pass);
        }
        let Some(answer) = game.vars.get(guessing::ANSWER_VAR) else {
            return Ok(Flow::Pass);
        };
        if to_id(answer) == to_id(&invocation.argument) {
            return Ok(Flow::Pass);
        }
        let Some(player) = game.player(&invocation.invoker.name).filter(|p| !p.eliminated) else {
            return Ok(Flow::Pass);
        };

        Self::lose_life(game, ctx, &player);
        if Self::finish_if_decided(game, ctx) {
            return Ok(Flow::Handled);
        }
        Ok(Flow::Pass)
    }
}
