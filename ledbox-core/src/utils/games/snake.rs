//! Snake on the LED matrix.
//!
//! [`SnakeState`] is a plain value: [`step`] takes the current state and a
//! random source and returns either the next state or [`Outcome::GameOver`].
//! [`SnakeGame`] wraps it for the polling loop, queuing turns between ticks and
//! freezing the losing frame once the game is over.
//!
//! Movement is shift-based: every tick each body cell takes the position of
//! the one in front of it and the head moves one cell along the heading.

use heapless::Vec;
use rand_core::RngCore;
use serde::{Deserialize, Serialize};
use smart_leds_trait::RGB8;

use crate::utils::math::grid::{CellIndex, Grid, GridError};

/// Length of a freshly spawned snake.
pub const INITIAL_LENGTH: usize = 2;

/// Direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heading {
    Up,
    Down,
    Left,
    Right,
}

/// Relative turn issued by one of the two buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Turn {
    Left,
    Right,
}

impl Heading {
    /// Rotate the heading by 90 degrees.
    pub fn turn(
        self,
        turn: Turn,
    ) -> Heading {
        match (self, turn) {
            (Heading::Up, Turn::Left) => Heading::Left,
            (Heading::Left, Turn::Left) => Heading::Down,
            (Heading::Down, Turn::Left) => Heading::Right,
            (Heading::Right, Turn::Left) => Heading::Up,
            (Heading::Up, Turn::Right) => Heading::Right,
            (Heading::Right, Turn::Right) => Heading::Down,
            (Heading::Down, Turn::Right) => Heading::Left,
            (Heading::Left, Turn::Right) => Heading::Up,
        }
    }

    /// Unit `(d_row, d_col)` delta; row 0 is the top of the matrix.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Heading::Up => (-1, 0),
            Heading::Down => (1, 0),
            Heading::Left => (0, -1),
            Heading::Right => (0, 1),
        }
    }
}

/// Free-function form of [`Heading::turn`].
pub fn turn(
    heading: Heading,
    turn: Turn,
) -> Heading {
    heading.turn(turn)
}

/// Reasons a snake state cannot be built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnakeError {
    Grid(GridError),
    /// Fewer than [`INITIAL_LENGTH`] cells, or more than the grid holds.
    BadLength(usize),
    /// A body cell lies outside the grid.
    OutOfGrid(CellIndex),
    /// Two body cells coincide.
    Overlap(CellIndex),
    /// Consecutive body cells are not neighbours.
    Disconnected(CellIndex),
    /// The food cell is outside the grid or under the snake.
    BadFood(CellIndex),
}

impl From<GridError> for SnakeError {
    fn from(e: GridError) -> Self {
        SnakeError::Grid(e)
    }
}

/// Complete game state for a grid of at most `N` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnakeState<const N: usize> {
    grid: Grid,
    body: Vec<CellIndex, N>,
    heading: Heading,
    food: Option<CellIndex>,
}

impl<const N: usize> SnakeState<N> {
    /// Build a state from explicit parts, checking every invariant.
    ///
    /// `body` is head first; it must be contiguous, distinct and inside the grid.
    pub fn new(
        grid: Grid,
        body: &[CellIndex],
        heading: Heading,
        food: Option<CellIndex>,
    ) -> Result<Self, SnakeError> {
        grid.fits(N)?;
        if body.len() < INITIAL_LENGTH || body.len() > grid.cells() {
            return Err(SnakeError::BadLength(body.len()));
        }

        let mut cells: Vec<CellIndex, N> = Vec::new();
        for &cell in body {
            if !grid.contains(cell) {
                return Err(SnakeError::OutOfGrid(cell));
            }
            if cells.contains(&cell) {
                return Err(SnakeError::Overlap(cell));
            }
            if let Some(&prev) = cells.last() {
                if !adjacent(grid, prev, cell) {
                    return Err(SnakeError::Disconnected(cell));
                }
            }
            cells
                .push(cell)
                .map_err(|_| SnakeError::BadLength(body.len()))?;
        }

        if let Some(f) = food {
            if !grid.contains(f) || cells.contains(&f) {
                return Err(SnakeError::BadFood(f));
            }
        }

        Ok(Self {
            grid,
            body: cells,
            heading,
            food,
        })
    }

    /// Standard opening: two cells in the middle column, head at the centre
    /// pointing up, food on a random free cell.
    pub fn spawn<R: RngCore>(
        grid: Grid,
        rng: &mut R,
    ) -> Result<Self, SnakeError> {
        grid.fits(N)?;
        let head = grid.rowcol_to_index(grid.rows() / 2, grid.cols() / 2);
        let tail = grid
            .offset(head, 1, 0)
            .or_else(|| grid.offset(head, 0, 1))
            .ok_or(SnakeError::BadLength(1))?;

        let mut state = Self::new(grid, &[head, tail], Heading::Up, None)?;
        state.food = place_food(&state.grid, &state.body, rng);
        Ok(state)
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    /// Occupied cells, head first.
    pub fn body(&self) -> &[CellIndex] {
        &self.body
    }

    pub fn head(&self) -> CellIndex {
        self.body[0]
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn food(&self) -> Option<CellIndex> {
        self.food
    }

    pub fn occupies(
        &self,
        cell: CellIndex,
    ) -> bool {
        self.body.contains(&cell)
    }

    /// Apply a relative turn. A second turn in the same direction before the
    /// next step reverses the snake into itself.
    pub fn turn(
        &mut self,
        turn: Turn,
    ) {
        self.heading = self.heading.turn(turn);
    }

    pub fn set_heading(
        &mut self,
        heading: Heading,
    ) {
        self.heading = heading;
    }
}

fn adjacent(
    grid: Grid,
    a: CellIndex,
    b: CellIndex,
) -> bool {
    [Heading::Up, Heading::Down, Heading::Left, Heading::Right]
        .iter()
        .any(|h| {
            let (dr, dc) = h.delta();
            grid.offset(a, dr, dc) == Some(b)
        })
}

/// Result of advancing the snake by one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<const N: usize> {
    /// The move was legal. `consumed` is set when the head landed on the food;
    /// the returned state then carries the relocated food.
    Continue {
        state: SnakeState<N>,
        consumed: bool,
    },
    /// The head left the grid or hit the body.
    GameOver,
}

/// Pick a uniformly random cell not covered by `body`.
///
/// Returns `None` once the snake fills the whole grid.
pub fn place_food<R: RngCore>(
    grid: &Grid,
    body: &[CellIndex],
    rng: &mut R,
) -> Option<CellIndex> {
    let free = grid.cells().checked_sub(body.len())?;
    if free == 0 {
        return None;
    }
    let pick = rng.next_u32() as usize % free;
    (0..grid.cells())
        .filter(|cell| !body.contains(cell))
        .nth(pick)
}

/// Advance `state` by one cell along its heading.
pub fn step<const N: usize, R: RngCore>(
    state: &SnakeState<N>,
    rng: &mut R,
) -> Outcome<N> {
    let (d_row, d_col) = state.heading.delta();
    let Some(new_head) = state.grid.offset(state.head(), d_row, d_col) else {
        return Outcome::GameOver;
    };
    if state.occupies(new_head) {
        return Outcome::GameOver;
    }

    let mut next = state.clone();
    let len = next.body.len();
    let old_tail = next.body[len - 1];
    for i in (1..len).rev() {
        next.body[i] = next.body[i - 1];
    }
    next.body[0] = new_head;

    let consumed = state.food == Some(new_head);
    if consumed {
        // The body never exceeds the grid, and the grid fits in N.
        if next.body.push(old_tail).is_err() {
            return Outcome::GameOver;
        }
        next.food = place_food(&next.grid, &next.body, rng);
    }

    Outcome::Continue {
        state: next,
        consumed,
    }
}

/// Whether the game is still advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    Running,
    GameOver,
}

/// Colors used to draw a snake frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub body: RGB8,
    pub food: RGB8,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            body: RGB8 { r: 0, g: 32, b: 0 },
            food: RGB8 { r: 48, g: 0, b: 0 },
        }
    }
}

/// Snake state plus the bookkeeping the polling loop needs.
pub struct SnakeGame<const N: usize> {
    state: SnakeState<N>,
    status: GameStatus,
    pending: Vec<Turn, 4>,
    score: usize,
}

impl<const N: usize> SnakeGame<N> {
    pub fn new<R: RngCore>(
        grid: Grid,
        rng: &mut R,
    ) -> Result<Self, SnakeError> {
        Ok(Self::from_state(SnakeState::spawn(grid, rng)?))
    }

    pub fn from_state(state: SnakeState<N>) -> Self {
        Self {
            state,
            status: GameStatus::Running,
            pending: Vec::new(),
            score: 0,
        }
    }

    pub fn state(&self) -> &SnakeState<N> {
        &self.state
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    /// Number of food cells eaten since the last reset.
    pub fn score(&self) -> usize {
        self.score
    }

    /// Queue a turn for the next tick. Ignored once the game is over; turns
    /// beyond the queue depth are dropped.
    pub fn queue_turn(
        &mut self,
        turn: Turn,
    ) {
        if self.status == GameStatus::Running && self.pending.push(turn).is_err() {
            tracing::debug!(?turn, "turn queue full, dropping");
        }
    }

    /// Apply queued turns and advance one cell.
    pub fn tick<R: RngCore>(
        &mut self,
        rng: &mut R,
    ) -> GameStatus {
        if self.status == GameStatus::GameOver {
            return self.status;
        }

        for turn in self.pending.iter() {
            self.state.turn(*turn);
        }
        self.pending.clear();

        match step(&self.state, rng) {
            Outcome::Continue { state, consumed } => {
                if consumed {
                    self.score += 1;
                    tracing::info!(score = self.score, len = state.len(), "food eaten");
                }
                self.state = state;
            }
            Outcome::GameOver => {
                tracing::info!(score = self.score, head = self.state.head(), "game over");
                self.status = GameStatus::GameOver;
            }
        }
        self.status
    }

    /// Start over on the same grid.
    pub fn reset<R: RngCore>(
        &mut self,
        rng: &mut R,
    ) -> Result<(), SnakeError> {
        *self = Self::new(self.state.grid, rng)?;
        Ok(())
    }

    /// Draw body and food; every other pixel is off.
    pub fn render(
        &self,
        palette: &Palette,
    ) -> [RGB8; N] {
        let mut frame = [RGB8::default(); N];
        for &cell in self.state.body() {
            frame[cell] = palette.body;
        }
        if let Some(food) = self.state.food() {
            frame[food] = palette.food;
        }
        frame
    }
}
