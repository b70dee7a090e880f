//! Trivia: questions from a small built-in bank
//!
//! The `category` setting picks the bank; the `reverse` setting (set by the
//! Reverse Trivia variation) prints each question back to front.

use parlor_core::{Flow, GameState, HookCtx, HookResult, Layer};
use rand::seq::SliceRandom;

use crate::guessing;

pub struct Question {
    pub prompt: &'static str,
    pub answer: &'static str,
}

const fn q(prompt: &'static str, answer: &'static str) -> Question {
    Question { prompt, answer }
}

const GENERAL: &[Question] = &[
    q("How many sides does a hexagon have?", "6"),
    q("What is the largest planet in the solar system?", "Jupiter"),
    q("Which element has the chemical symbol O?", "Oxygen"),
    q("How many continents are there?", "7"),
    q("What color do you get by mixing blue and yellow?", "Green"),
    q("Which animal is known as the king of the jungle?", "Lion"),
    q("How many minutes are in an hour?", "60"),
    q("What is the freezing point of water in Celsius?", "0"),
    q("Which instrument has 88 keys?", "Piano"),
    q("What is the opposite of north?", "South"),
    q("How many legs does a spider have?", "8"),
    q("Which planet is known as the red planet?", "Mars"),
];

const CAPITALS: &[Question] = &[
    q("What is the capital of France?", "Paris"),
    q("What is the capital of Japan?", "Tokyo"),
    q("What is the capital of Canada?", "Ottawa"),
    q("What is the capital of Australia?", "Canberra"),
    q("What is the capital of Italy?", "Rome"),
    q("What is the capital of Egypt?", "Cairo"),
    q("What is the capital of Kenya?", "Nairobi"),
    q("What is the capital of Peru?", "Lima"),
    q("What is the capital of Norway?", "Oslo"),
    q("What is the capital of Spain?", "Madrid"),
];

/// Question bank for a `category` setting; unknown categories get the
/// general bank.
pub fn bank(category: &str) -> &'static [Question] {
    match category {
        "capitals" => CAPITALS,
        _ => GENERAL,
    }
}

#[derive(Debug, Default)]
pub struct Trivia {
    order: Vec<usize>,
    next: usize,
}

pub fn install() -> Box<dyn Layer> {
    Box::new(Trivia::default())
}

impl Layer for Trivia {
    fn name(&self) -> &'static str {
        "trivia"
    }

    fn on_start(&mut self, game: &mut GameState, _ctx: &mut HookCtx<'_>) -> HookResult {
        let questions = bank(&game.format.setting_or("category", String::new()));
        self.order = (0..questions.len()).collect();
        self.order.shuffle(game.rng_mut());
        self.next = 0;
        Ok(Flow::Pass)
    }

    fn on_next_round(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        if guessing::rounds_exhausted(game) || self.order.is_empty() {
            return Ok(Flow::Pass);
        }
        let questions = bank(&game.format.setting_or("category", String::new()));
        let question = &questions[self.order[self.next % self.order.len()]];
        self.next += 1;

        let prompt = if game.format.setting_or("reverse", false) {
            question.prompt.chars().rev().collect()
        } else {
            question.prompt.to_string()
        };
        guessing::set_answer(game, question.answer);
        ctx.say(format!("Question {}: {prompt}", game.round));
        Ok(Flow::Pass)
    }
}
