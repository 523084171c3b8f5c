//! Word pool management.
//!
//! Each round draws a word/hint pair from a shuffled pool. The pool
//! works like a deck: a draw cursor walks a shuffled order, and only
//! once every pair has been dealt does the pool reshuffle, so no pair
//! repeats until the whole pool has been seen.

use once_cell::sync::Lazy;
use rand::{Rng, seq::SliceRandom};

use super::entities::WordPair;

static WORDS_DATA: &str = include_str!("../../data/words.json");

static BUILTIN: Lazy<Vec<WordPair>> = Lazy::new(|| {
    serde_json::from_str(WORDS_DATA).expect("bundled word list is valid JSON")
});

/// Shuffled pool of word/hint pairs with a draw cursor.
#[derive(Clone, Debug)]
pub struct WordPool {
    pairs: Vec<WordPair>,
    draw_idx: usize,
}

impl WordPool {
    /// Pool over a custom pair list. An empty list falls back to the
    /// bundled words so a lobby can always start a game.
    #[must_use]
    pub fn new(pairs: Vec<WordPair>) -> Self {
        if pairs.is_empty() {
            Self::builtin()
        } else {
            let draw_idx = pairs.len();
            Self { pairs, draw_idx }
        }
    }

    /// Pool over the bundled word list.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(BUILTIN.clone())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Reshuffle and restart the draw cursor.
    pub fn shuffle(&mut self, rng: &mut impl Rng) {
        self.pairs.shuffle(rng);
        self.draw_idx = 0;
    }

    /// Deal the next pair, reshuffling once the pool is exhausted. The
    /// reshuffle guards the seam: the first pair of the new order is
    /// never the last pair of the old one, so back-to-back games get
    /// distinct words even across a reshuffle.
    pub fn draw(&mut self, rng: &mut impl Rng) -> WordPair {
        if self.draw_idx >= self.pairs.len() {
            let previous = self.pairs.last().cloned();
            self.shuffle(rng);
            if let Some(previous) = previous
                && self.pairs.len() > 1
                && self.pairs[0].word == previous.word
            {
                let other = rng.random_range(1..self.pairs.len());
                self.pairs.swap(0, other);
            }
        }
        let pair = self.pairs[self.draw_idx].clone();
        self.draw_idx += 1;
        pair
    }
}

impl Default for WordPool {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn tiny_pool() -> WordPool {
        WordPool::new(vec![
            WordPair {
                word: "Pizza".to_string(),
                hint: "Italian food".to_string(),
            },
            WordPair {
                word: "Sushi".to_string(),
                hint: "Japanese food".to_string(),
            },
            WordPair {
                word: "Taco".to_string(),
                hint: "Mexican food".to_string(),
            },
        ])
    }

    #[test]
    fn test_builtin_pool_is_nonempty() {
        assert!(!WordPool::builtin().is_empty());
    }

    #[test]
    fn test_empty_list_falls_back_to_builtin() {
        let pool = WordPool::new(Vec::new());
        assert_eq!(pool.len(), WordPool::builtin().len());
    }

    #[test]
    fn test_draws_cover_pool_before_repeating() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut pool = tiny_pool();
        for _ in 0..4 {
            let mut seen: Vec<String> = (0..pool.len()).map(|_| pool.draw(&mut rng).word).collect();
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), pool.len());
        }
    }

    #[test]
    fn test_no_repeat_across_reshuffle() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut pool = tiny_pool();
        let mut previous = pool.draw(&mut rng).word;
        for _ in 0..50 {
            let next = pool.draw(&mut rng).word;
            assert_ne!(next, previous);
            previous = next;
        }
    }
}
