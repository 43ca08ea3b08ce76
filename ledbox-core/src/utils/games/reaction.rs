//! Two-player reaction game.
//!
//! The strip shows red for a random 2-5 s, then turns green. Whoever presses
//! first wins. The green frame holds for two seconds, goes red, and the next
//! round starts a second later. Presses before green are ignored.
//!
//! Time is passed in as milliseconds so the machine stays pure.

use rand_core::RngCore;
use serde::Serialize;
use smart_leds_trait::RGB8;

pub const MIN_WAIT_MS: u64 = 2000;
pub const WAIT_SPREAD_MS: u64 = 3000;
pub const HOLD_MS: u64 = 2000;
pub const PAUSE_MS: u64 = 1000;
pub const POLL_MS: u64 = 10;

pub const WAIT_COLOR: RGB8 = RGB8 { r: 64, g: 0, b: 0 };
pub const GO_COLOR: RGB8 = RGB8 { r: 0, g: 64, b: 0 };

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Player {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Red; turns green at `go_at`.
    Waiting { go_at: u64 },
    /// Green; waiting for the first press.
    Go,
    /// Someone won; red from `red_at`, next round at `next_at`.
    Finished {
        winner: Player,
        red_at: u64,
        next_at: u64,
    },
}

pub struct ReactionGame {
    phase: Phase,
    wins: [u32; 2],
}

impl ReactionGame {
    /// Start the first round at `now`.
    pub fn new<R: RngCore>(
        now: u64,
        rng: &mut R,
    ) -> Self {
        Self {
            phase: Self::new_round(now, rng),
            wins: [0; 2],
        }
    }

    fn new_round<R: RngCore>(
        now: u64,
        rng: &mut R,
    ) -> Phase {
        let delay = MIN_WAIT_MS + rng.next_u32() as u64 % WAIT_SPREAD_MS;
        tracing::info!(delay_ms = delay, "starting reaction round");
        Phase::Waiting { go_at: now + delay }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Rounds won by each player.
    pub fn wins(
        &self,
        player: Player,
    ) -> u32 {
        self.wins[player as usize]
    }

    /// Advance with the current button levels (`true` = held). Returns the
    /// winner on the tick the round is decided.
    pub fn tick<R: RngCore>(
        &mut self,
        now: u64,
        p1: bool,
        p2: bool,
        rng: &mut R,
    ) -> Option<Player> {
        match self.phase {
            Phase::Waiting { go_at } if now >= go_at => {
                self.phase = Phase::Go;
                None
            }
            Phase::Waiting { .. } => None,
            Phase::Go => {
                let winner = if p1 {
                    Player::One
                } else if p2 {
                    Player::Two
                } else {
                    return None;
                };
                self.wins[winner as usize] += 1;
                tracing::info!(?winner, "player wins");
                self.phase = Phase::Finished {
                    winner,
                    red_at: now + HOLD_MS,
                    next_at: now + HOLD_MS + PAUSE_MS,
                };
                Some(winner)
            }
            Phase::Finished { next_at, .. } if now >= next_at => {
                self.phase = Self::new_round(now, rng);
                None
            }
            Phase::Finished { .. } => None,
        }
    }

    /// Color for the whole strip.
    pub fn color(
        &self,
        now: u64,
    ) -> RGB8 {
        match self.phase {
            Phase::Waiting { .. } => WAIT_COLOR,
            Phase::Go => GO_COLOR,
            Phase::Finished { red_at, .. } if now < red_at => GO_COLOR,
            Phase::Finished { .. } => WAIT_COLOR,
        }
    }
}
