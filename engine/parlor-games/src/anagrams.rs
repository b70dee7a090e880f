//! Anagrams: unscramble a word. Free join, and guesses may be sent privately.

use parlor_core::{Flow, GameState, HookCtx, HookResult, Layer};
use rand::seq::SliceRandom;

use crate::guessing;

const WORDS: &[&str] = &[
    "planet", "garden", "silver", "window", "castle", "pepper", "orange", "rocket", "bridge",
    "candle", "forest", "marble", "pillow", "ticket", "violin",
];

/// Shuffle the letters of `word` so the result differs from it whenever
/// the word has two distinct letters.
pub fn scramble<R: rand::Rng + ?Sized>(word: &str, rng: &mut R) -> String {
    let mut letters: Vec<char> = word.chars().collect();
    let distinct = letters.windows(2).any(|w| w[0] != w[1]);
    loop {
        letters.shuffle(rng);
        let scrambled: String = letters.iter().collect();
        if !distinct || scrambled != word {
            return scrambled;
        }
    }
}

#[derive(Debug, Default)]
pub struct Anagrams;

pub fn install() -> Box<dyn Layer> {
    Box::new(Anagrams)
}

impl Layer for Anagrams {
    fn name(&self) -> &'static str {
        "anagrams"
    }

    fn on_next_round(&mut self, game: &mut GameState, ctx: &mut HookCtx<'_>) -> HookResult {
        if guessing::rounds_exhausted(game) {
            return Ok(Flow::Pass);
        }
        let Some(&word) = WORDS.choose(game.rng_mut()) else {
            return Ok(Flow::Pass);
        };
        let scrambled = scramble(word, game.rng_mut());
        guessing::set_answer(game, word);
        ctx.say(format!("Round {}: unscramble {}", game.round, scrambled.to_uppercase()));
        Ok(Flow::Pass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_scramble_keeps_letters_and_differs() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        for word in WORDS {
            let scrambled = scramble(word, &mut rng);
            assert_ne!(&scrambled, word);
            let mut a: Vec<char> = scrambled.chars().collect();
            let mut b: Vec<char> = word.chars().collect();
            a.sort_unstable();
            b.sort_unstable();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_scramble_single_letter_word() {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        assert_eq!(scramble("aaa", &mut rng), "aaa");
    }
}
