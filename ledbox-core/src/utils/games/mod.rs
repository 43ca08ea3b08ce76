//! Button-and-matrix demos.
//!
//! The game logic in the submodules is pure; [`Board`] owns the strip and the
//! two buttons and runs each demo as one cooperative loop.

pub mod dice;
pub mod egg_timer;
pub mod reaction;
pub mod snake;

use core::{convert::Infallible, fmt::Debug};

use embassy_time::{Instant, Timer};
use embedded_hal::digital::InputPin;
use rand_core::RngCore;
use smart_leds_trait::{SmartLedsWrite, RGB8};

use self::{
    egg_timer::EggTimer,
    reaction::ReactionGame,
    snake::{GameStatus, Palette, SnakeError, SnakeGame, Turn},
};
use crate::utils::{
    config::GameConfig,
    controllers::{
        leds::{Frame, GREEN, MATRIX_LEDS},
        Button, LEDCommand, LedModule, LED_CHANNEL,
    },
    math::grid::Grid,
};

/// Button poll period of the dice demo.
const DICE_POLL_MS: u64 = 100;
/// Idle poll period of the egg timer while setting.
const TIMER_IDLE_MS: u64 = 50;

/// The LED matrix and its two buttons.
pub struct Board<Driver, B1, B2> {
    pub leds: LedModule<Driver>,
    pub btn1: Button<B1>,
    pub btn2: Button<B2>,
}

fn read<P: InputPin>(result: Result<bool, P::Error>) -> bool {
    result.unwrap_or_else(|e| {
        tracing::error!(?e, "button read failed");
        false
    })
}

impl<Driver, E, B1, B2> Board<Driver, B1, B2>
where
    Driver: SmartLedsWrite<Color = RGB8, Error = E>,
    E: Debug,
    B1: InputPin,
    B2: InputPin,
{
    pub fn new(
        leds: LedModule<Driver>,
        btn1: B1,
        btn2: B2,
    ) -> Self {
        Self {
            leds,
            btn1: Button::new(btn1),
            btn2: Button::new(btn2),
        }
    }

    fn show(
        &mut self,
        frame: &Frame<MATRIX_LEDS>,
    ) {
        if let Err(e) = self.leds.show(frame) {
            tracing::error!(?e, "LED write failed");
        }
    }

    fn fill(
        &mut self,
        color: RGB8,
    ) {
        if let Err(e) = self.leds.set_all(color) {
            tracing::error!(?e, "LED write failed");
        }
    }

    fn command(
        &mut self,
        cmd: LEDCommand,
    ) {
        if let Err(e) = self.leds.ex_command(cmd) {
            tracing::error!(?e, ?cmd, "LED command failed");
        }
    }

    /// Show the static picture and keep it there.
    pub async fn run_blink(&mut self) -> ! {
        self.command(LEDCommand::Pattern);
        loop {
            Timer::after_secs(60).await;
        }
    }

    /// Button 1 toggles the strip red, button 2 paints it green. Commands
    /// queued on [`LED_CHANNEL`] are applied between polls.
    pub async fn run_toggle(
        &mut self,
        config: &GameConfig,
    ) -> ! {
        loop {
            while let Ok(cmd) = LED_CHANNEL.try_receive() {
                self.command(cmd);
            }
            if read::<B1>(self.btn1.poll_pressed()) {
                tracing::info!("button 1 pressed");
                self.command(LEDCommand::Toggle);
            }
            if read::<B2>(self.btn2.poll_pressed()) {
                tracing::info!("button 2 pressed");
                self.command(LEDCommand::Fill {
                    r: GREEN.r,
                    g: GREEN.g,
                    b: GREEN.b,
                });
            }
            Timer::after_millis(config.poll_ms).await;
        }
    }

    /// Button 2 rolls; the face is revealed one pixel at a time.
    pub async fn run_dice<R: RngCore>(
        &mut self,
        rng: &mut R,
    ) -> ! {
        self.show(&dice::render(0, usize::MAX));
        loop {
            tracing::info!("waiting for button press");
            while !read::<B2>(self.btn2.confirm_pressed().await) {
                Timer::after_millis(DICE_POLL_MS).await;
            }
            let value = dice::roll(rng);
            tracing::info!(value, "rolled");
            let lit = dice::lit_cells(value).count();
            for shown in 0..=lit {
                self.show(&dice::render(value, shown));
                Timer::after_millis(dice::REVEAL_STEP_MS).await;
            }
            Timer::after_millis(DICE_POLL_MS).await;
        }
    }

    pub async fn run_egg_timer(&mut self) -> ! {
        let mut timer = EggTimer::default();
        loop {
            if let EggTimer::Setting { .. } = timer {
                if read::<B1>(self.btn1.confirm_pressed().await) {
                    timer.cycle_minutes();
                }
                if read::<B2>(self.btn2.confirm_pressed().await) {
                    timer.start();
                }
            }
            self.show(&timer.render());
            match timer {
                EggTimer::Setting { .. } => Timer::after_millis(TIMER_IDLE_MS).await,
                _ => {
                    Timer::after_millis(egg_timer::TICK_MS).await;
                    timer.tick();
                }
            }
        }
    }

    pub async fn run_reaction<R: RngCore>(
        &mut self,
        rng: &mut R,
    ) -> ! {
        let mut game = ReactionGame::new(Instant::now().as_millis(), rng);
        let mut shown = None;
        loop {
            let now = Instant::now().as_millis();
            let p1 = read::<B1>(self.btn1.is_pressed());
            let p2 = read::<B2>(self.btn2.is_pressed());
            game.tick(now, p1, p2, rng);
            let color = game.color(now);
            if shown != Some(color) {
                self.fill(color);
                shown = Some(color);
            }
            Timer::after_millis(reaction::POLL_MS).await;
        }
    }

    /// Button 1 turns left, button 2 right. After a crash either button
    /// starts a new game.
    pub async fn run_snake<R: RngCore>(
        &mut self,
        rng: &mut R,
        config: &GameConfig,
    ) -> Result<Infallible, SnakeError> {
        let palette = Palette::default();
        let mut game = SnakeGame::<MATRIX_LEDS>::new(Grid::MATRIX_5X5, rng)?;
        let mut polls = 0;
        self.show(&game.render(&palette));

        loop {
            Timer::after_millis(config.poll_ms).await;
            let left = read::<B1>(self.btn1.poll_pressed());
            let right = read::<B2>(self.btn2.poll_pressed());

            match game.status() {
                GameStatus::Running => {
                    if left {
                        game.queue_turn(Turn::Left);
                    }
                    if right {
                        game.queue_turn(Turn::Right);
                    }
                    polls += 1;
                    if polls >= config.snake_step_polls {
                        polls = 0;
                        game.tick(rng);
                        self.show(&game.render(&palette));
                    }
                }
                GameStatus::GameOver if left || right => {
                    tracing::info!("new game");
                    game.reset(rng)?;
                    polls = 0;
                    self.show(&game.render(&palette));
                }
                GameStatus::GameOver => {}
            }
        }
    }
}
