//! Gameboard simulation: timer bank, movement, falling, spawning, game over.
//!
//! Everything is driven by `update(delta_ms)` in a fixed order: timers →
//! auto-fall → active-block freeze → overflow check → colour cycling →
//! match scan and resolution → fragment update → gravity → clear-pause
//! countdown → visibility sweep → spawn check. Each timer is advanced
//! exactly once per tick and firing one never re-enters another.

use crate::grid::{
    to_state_col, BlockState, Grid, KIND_MULTI, NUM_DOWN, NUM_KINDS, PLAY_AREA_END, PLAY_WIDTH,
};
use crate::timer::Timer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const MAX_LEVEL: u32 = 10;
pub const MAX_SCORE: u32 = 9_999_999;
/// Points awarded per cleared block, to both score and level progress.
pub const BLOCK_POINT_VALUE: u32 = 10;
/// Level progress needed to advance a level.
pub const LEVEL_PROGRESS_GOAL: u32 = 100;
/// De-gray counter start value; a committed match decrements it.
pub const DE_GRAY_START: i32 = 10;

/// Base auto-fall period; the elapsed delta is scaled up with level.
const AUTO_FALL_MS: f64 = 1000.0;
/// One-row gravity pacing.
pub(crate) const BLOCK_FALL_MS: f64 = 75.0;
/// Freeze after a committed clear, long enough for a full-column settle.
const CLEAR_PAUSE_MS: f64 = BLOCK_FALL_MS * NUM_DOWN as f64;
/// Dwell between column overflow and the automatic session reset.
const GAME_OVER_DWELL_MS: f64 = 1000.0;
/// Multi-kind colour cycle cadence.
const MULTI_CYCLE_MS: f64 = 50.0;

/// Pool of break cues; one is chosen at random per committed clear.
pub const BREAK_SOUNDS: [&str; 5] = ["break1", "break2", "break3", "break4", "break5"];

/// Delta multiplier for the auto-fall timer: 1x at level 1 rising linearly
/// to 2x at `MAX_LEVEL`.
fn fall_multiplier(level: u32) -> f64 {
    1.0 + (level - 1) as f64 / (MAX_LEVEL - 1) as f64
}

/// Post-fall grace period: 100 ms at level 1 shrinking to 10 ms at
/// `MAX_LEVEL`.
fn grace_period(level: u32) -> f64 {
    (10 * (MAX_LEVEL - level) + 10) as f64
}

/// Player movement intent. Up is reserved and a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Play-area position in state coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub col: usize,
    pub row: usize,
}

/// Side effects the core emits for the surrounding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Play a named sound cue.
    Sound(&'static str),
    /// Switch the music to the given tune index.
    Music(usize),
    /// Session ended; the state machine should return to the title screen.
    ReturnToTitle,
}

/// One explosion fragment, in fractional play-area cell coordinates.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub x: f32,
    pub y: f32,
    /// Velocity in cells per millisecond.
    pub vx: f32,
    pub vy: f32,
    pub life: f64,
    pub lifespan: f64,
    pub kind: u8,
}

impl Fragment {
    /// Remaining-life fraction in 0..=1, used for fade-out.
    pub fn fade(&self) -> f64 {
        ((self.lifespan - self.life) / self.lifespan).clamp(0.0, 1.0)
    }
}

/// The authoritative game state for one play session.
#[derive(Debug)]
pub struct GameBoard {
    pub grid: Grid,
    pub(crate) active: Option<Pos>,
    initial_level: u32,

    pub(crate) level: u32,
    pub(crate) score: u32,
    pub(crate) level_progress: u32,
    pub(crate) de_gray: i32,

    /// Kind shown in the "next" preview slot; consumed on spawn.
    pub(crate) preview_kind: u8,
    /// Shared colour of every multi-kind cell, re-randomized on a timer.
    pub(crate) multi_rgb: (u8, u8, u8),

    auto_fall: Timer,
    /// True between an auto-fall step and the end of its grace period.
    falling: bool,
    post_fall: Timer,
    pub(crate) block_fall: Timer,
    pub(crate) clear_pause: Timer,
    pub(crate) clear_pausing: bool,
    game_over_dwell: Timer,
    pub(crate) game_over_pausing: bool,
    color_cycle: Timer,

    pub(crate) fragments: Vec<Fragment>,
    /// Cells cleared by the most recent commit, for the clear flash.
    pub(crate) recent_cleared: Vec<Pos>,
    pub(crate) events: Vec<GameEvent>,
    pub(crate) rng: StdRng,
}

impl GameBoard {
    pub fn new(initial_level: u32, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let level = initial_level.clamp(1, MAX_LEVEL);
        let preview_kind = rng.gen_range(0..NUM_KINDS);
        let multi_rgb = (
            rng.gen_range(0..=u8::MAX),
            rng.gen_range(0..=u8::MAX),
            rng.gen_range(0..=u8::MAX),
        );
        Self {
            grid: Grid::new(),
            active: None,
            initial_level: level,
            level,
            score: 0,
            level_progress: 0,
            de_gray: DE_GRAY_START,
            preview_kind,
            multi_rgb,
            auto_fall: Timer::new(AUTO_FALL_MS),
            falling: false,
            post_fall: Timer::new(grace_period(level)),
            block_fall: Timer::new(BLOCK_FALL_MS),
            clear_pause: Timer::new(CLEAR_PAUSE_MS),
            clear_pausing: false,
            game_over_dwell: Timer::new(GAME_OVER_DWELL_MS),
            game_over_pausing: false,
            color_cycle: Timer::new(MULTI_CYCLE_MS),
            fragments: Vec::new(),
            recent_cleared: Vec::new(),
            events: Vec::new(),
            rng,
        }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn de_gray(&self) -> i32 {
        self.de_gray
    }

    pub fn preview_kind(&self) -> u8 {
        self.preview_kind
    }

    pub fn multi_rgb(&self) -> (u8, u8, u8) {
        self.multi_rgb
    }

    pub fn active(&self) -> Option<Pos> {
        self.active
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn clear_pausing(&self) -> bool {
        self.clear_pausing
    }

    pub fn game_over_pausing(&self) -> bool {
        self.game_over_pausing
    }

    pub fn recent_cleared(&self) -> &[Pos] {
        &self.recent_cleared
    }

    /// Take all events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Feed one directional input. Ignored entirely while the game-over
    /// dwell is pausing play. A manual drop also rewinds the auto-fall
    /// timer so the next automatic step starts a fresh period.
    pub fn handle_input(&mut self, dir: Direction) {
        if self.game_over_pausing {
            return;
        }
        if dir == Direction::Down {
            self.auto_fall.reset();
        }
        self.step_active(dir);
    }

    /// Advance the simulation by one tick of `delta` milliseconds.
    pub fn update(&mut self, delta: f64) {
        // Auto-fall, or the grace period after a fall step.
        if !self.falling {
            if self.auto_fall.advance(delta * fall_multiplier(self.level)) {
                self.step_active(Direction::Down);
                self.falling = true;
            }
        } else if self.post_fall.advance(delta) {
            self.falling = false;
        }

        // Freeze the active block once it rests on the floor or a settled
        // cell.
        if let Some(p) = self.active {
            let blocked = p.row == NUM_DOWN - 1
                || self.grid.state(p.row + 1, p.col) == BlockState::Inactive;
            if blocked {
                self.grid.set_state(p.row, p.col, BlockState::Inactive);
                self.active = None;
            }
        }

        // Column overflow: dwell, then reset the whole session. The reset
        // ends the tick so callers observe the fully cleared board.
        if self
            .grid
            .column_fill_counts()
            .iter()
            .any(|&c| c >= NUM_DOWN)
        {
            self.game_over_pausing = true;
            if self.game_over_dwell.advance(delta) {
                self.reset_session();
                self.events.push(GameEvent::ReturnToTitle);
                return;
            }
        } else if self.game_over_pausing {
            // A match in the overflow tick can un-fill the column; play
            // resumes and a later overflow needs a full dwell again.
            self.game_over_pausing = false;
            self.game_over_dwell.reset();
        }

        if self.color_cycle.advance(delta) {
            self.cycle_multi_color();
        }

        // Wildcard settling, match scan and resolution (score.rs).
        self.scan_matches();

        self.fragments.retain_mut(|f| {
            f.x += f.vx * delta as f32;
            f.y += f.vy * delta as f32;
            f.life += delta;
            f.life < f.lifespan
        });

        let any_falling = self.gravity_step(delta);

        if self.clear_pausing && self.clear_pause.advance(delta) {
            self.clear_pausing = false;
            self.recent_cleared.clear();
        }

        self.grid.sweep_invisible();

        if !any_falling && !self.clear_pausing && self.active.is_none() {
            self.try_spawn();
        }
    }

    /// Move the active block one cell if the target is in bounds and Empty.
    /// Blocked or out-of-bounds moves are silent no-ops; Up is reserved.
    fn step_active(&mut self, dir: Direction) {
        let Some(prev) = self.active else { return };
        let target = match dir {
            Direction::Up => return,
            Direction::Down => {
                if prev.row + 1 >= NUM_DOWN
                    || self.grid.state(prev.row + 1, prev.col) != BlockState::Empty
                {
                    return;
                }
                Pos {
                    col: prev.col,
                    row: prev.row + 1,
                }
            }
            Direction::Left => {
                if prev.col == 0 || self.grid.state(prev.row, prev.col - 1) != BlockState::Empty {
                    return;
                }
                Pos {
                    col: prev.col - 1,
                    row: prev.row,
                }
            }
            Direction::Right => {
                if (prev.col as i32) >= to_state_col(PLAY_AREA_END as i32)
                    || self.grid.state(prev.row, prev.col + 1) != BlockState::Empty
                {
                    return;
                }
                Pos {
                    col: prev.col + 1,
                    row: prev.row,
                }
            }
        };

        let kind = self.grid.kind(prev.row, prev.col);
        self.grid.clear_cell(prev.row, prev.col);
        self.grid.set_cell(target.row, target.col, kind, BlockState::Active);
        self.active = Some(target);
    }

    /// One gravity pass. Returns whether any cell was eligible to fall this
    /// tick; the actual swap happens only when the pacing timer fires, and
    /// bottom-up iteration guarantees one row per period.
    fn gravity_step(&mut self, delta: f64) -> bool {
        let mut any = false;
        for row in 0..NUM_DOWN - 1 {
            for col in 0..PLAY_WIDTH {
                if self.fall_eligible(row, col) {
                    any = true;
                }
            }
        }
        if any && self.block_fall.advance(delta) {
            for row in (0..NUM_DOWN - 1).rev() {
                for col in 0..PLAY_WIDTH {
                    if self.fall_eligible(row, col) {
                        let kind = self.grid.kind(row, col);
                        self.grid.clear_cell(row, col);
                        self.grid.set_cell(row + 1, col, kind, BlockState::Inactive);
                    }
                }
            }
        }
        any
    }

    fn fall_eligible(&self, row: usize, col: usize) -> bool {
        row + 1 < NUM_DOWN
            && self.grid.state(row, col) == BlockState::Inactive
            && self.grid.visible(row, col)
            && self.grid.state(row + 1, col) == BlockState::Empty
            && !self.grid.visible(row + 1, col)
    }

    /// Introduce the next block at the top-centre slot, consuming the
    /// preview kind and re-rolling the preview.
    fn try_spawn(&mut self) {
        let spawn_col = PLAY_WIDTH / 2;
        if self.grid.visible(0, spawn_col) {
            return;
        }

        let mut kind = self.preview_kind;
        self.preview_kind = self.rng.gen_range(0..NUM_KINDS);

        // Spawning onto a nearly full column: re-roll away from the
        // wildcard and from the kind directly below, so the final block
        // before overflow cannot form a degenerate instant match.
        if self.grid.visible(1, spawn_col) {
            let below = self.grid.kind(1, spawn_col);
            while kind == KIND_MULTI || kind == below {
                kind = self.rng.gen_range(0..KIND_MULTI);
            }
        }

        self.grid.set_cell(0, spawn_col, kind, BlockState::Active);
        self.active = Some(Pos {
            col: spawn_col,
            row: 0,
        });
    }

    /// Random walk of the shared multi colour, one hop per cycle period.
    fn cycle_multi_color(&mut self) {
        let (r, g, b) = self.multi_rgb;
        self.multi_rgb = (
            r.wrapping_add(self.rng.gen_range(0..64)),
            g.wrapping_add(self.rng.gen_range(0..64)),
            b.wrapping_add(self.rng.gen_range(0..64)),
        );
    }

    /// Full in-place session reset after the game-over dwell.
    fn reset_session(&mut self) {
        self.grid.clear_all();
        self.active = None;
        self.level = self.initial_level;
        self.score = 0;
        self.level_progress = 0;
        self.de_gray = DE_GRAY_START;
        self.auto_fall.reset();
        self.falling = false;
        self.post_fall.reset();
        self.post_fall.set_period(grace_period(self.level));
        self.block_fall.reset();
        self.clear_pause.reset();
        self.clear_pausing = false;
        self.game_over_dwell.reset();
        self.game_over_pausing = false;
        self.fragments.clear();
        self.recent_cleared.clear();
    }

    /// Called from scoring on level-up: speed up and shorten the grace.
    pub(crate) fn apply_level_up(&mut self) {
        if self.level < MAX_LEVEL {
            self.level += 1;
            self.post_fall.set_period(grace_period(self.level));
            self.events
                .push(GameEvent::Music(self.level as usize % crate::audio::NUM_TUNES));
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::grid::KIND_GRAY;

    /// Board with a deterministic rng and nothing on the grid.
    pub(crate) fn test_board() -> GameBoard {
        GameBoard::new(1, Some(0xC0FFEE))
    }

    /// Place a settled, visible block.
    pub(crate) fn place(b: &mut GameBoard, row: usize, col: usize, kind: u8) {
        b.grid.set_cell(row, col, kind, BlockState::Inactive);
    }

    /// Invariant checks from the data model, asserted after ticks.
    pub(crate) fn assert_invariants(b: &GameBoard) {
        let mut actives = 0;
        for row in 0..NUM_DOWN {
            for col in 0..PLAY_WIDTH {
                let s = b.grid.state(row, col);
                if !b.grid.visible(row, col) {
                    assert_eq!(s, BlockState::Empty, "invisible cell not Empty");
                }
                assert_ne!(s, BlockState::Exploding, "Exploding survived the tick");
                if s == BlockState::Active {
                    actives += 1;
                }
            }
        }
        assert!(actives <= 1, "more than one active cell");
        match b.active {
            Some(p) => assert_eq!(b.grid.state(p.row, p.col), BlockState::Active),
            None => assert_eq!(actives, 0),
        }
    }

    #[test]
    fn first_tick_spawns_at_top_centre() {
        let mut b = test_board();
        b.update(0.0);
        let p = b.active().expect("no spawn");
        assert_eq!((p.col, p.row), (PLAY_WIDTH / 2, 0));
        assert_eq!(b.grid.state(0, PLAY_WIDTH / 2), BlockState::Active);
        assert!(b.grid.visible(0, PLAY_WIDTH / 2));
        assert_invariants(&b);
    }

    #[test]
    fn soft_drop_rests_on_floor_as_inactive() {
        let mut b = test_board();
        b.update(0.0);
        let col = b.active().unwrap().col;
        for _ in 0..NUM_DOWN {
            b.handle_input(Direction::Down);
        }
        // The block can descend at most to the last row; the next tick
        // freezes it in place.
        assert_eq!(b.active().unwrap().row, NUM_DOWN - 1);
        b.update(0.0);
        assert_eq!(b.grid.state(NUM_DOWN - 1, col), BlockState::Inactive);
        assert_invariants(&b);
    }

    #[test]
    fn up_input_is_a_no_op() {
        let mut b = test_board();
        b.update(0.0);
        let before = b.active().unwrap();
        b.handle_input(Direction::Up);
        assert_eq!(b.active().unwrap(), before);
    }

    #[test]
    fn lateral_moves_respect_play_width() {
        let mut b = test_board();
        b.update(0.0);
        for _ in 0..PLAY_WIDTH {
            b.handle_input(Direction::Left);
        }
        assert_eq!(b.active().unwrap().col, 0);
        for _ in 0..PLAY_WIDTH + 2 {
            b.handle_input(Direction::Right);
        }
        assert_eq!(b.active().unwrap().col, PLAY_WIDTH - 1);
        assert_invariants(&b);
    }

    #[test]
    fn lateral_move_blocked_by_occupied_cell() {
        let mut b = test_board();
        b.update(0.0);
        let p = b.active().unwrap();
        place(&mut b, p.row, p.col + 1, 0);
        b.handle_input(Direction::Right);
        assert_eq!(b.active().unwrap().col, p.col);
    }

    #[test]
    fn auto_fall_advances_one_row_per_period() {
        let mut b = test_board();
        b.update(0.0);
        assert_eq!(b.active().unwrap().row, 0);
        // 1000 ms at level 1 fires exactly one step; the grace period then
        // holds the next one off.
        b.update(1000.0);
        assert_eq!(b.active().unwrap().row, 1);
        b.update(50.0);
        assert_eq!(b.active().unwrap().row, 1);
        assert_invariants(&b);
    }

    #[test]
    fn gravity_moves_one_row_per_pacing_period() {
        let mut b = test_board();
        place(&mut b, 2, 0, 3);
        b.update(BLOCK_FALL_MS);
        assert_eq!(b.grid.state(3, 0), BlockState::Inactive);
        assert_eq!(b.grid.state(2, 0), BlockState::Empty);
        // Never more than one row per period, even over a long drop.
        b.update(BLOCK_FALL_MS);
        assert_eq!(b.grid.state(4, 0), BlockState::Inactive);
        assert_eq!(b.grid.state(5, 0), BlockState::Empty);
        assert_invariants(&b);
    }

    #[test]
    fn gravity_descends_n_rows_in_n_periods() {
        let mut b = test_board();
        place(&mut b, 0, 4, 2);
        for _ in 0..NUM_DOWN - 1 {
            b.update(BLOCK_FALL_MS);
        }
        assert_eq!(b.grid.state(NUM_DOWN - 1, 4), BlockState::Inactive);
        for row in 0..NUM_DOWN - 1 {
            assert_eq!(b.grid.state(row, 4), BlockState::Empty);
        }
    }

    #[test]
    fn full_column_resets_session_after_dwell() {
        let mut b = test_board();
        b.score = 1234;
        b.level = 3;
        b.de_gray = 2;
        for row in 0..NUM_DOWN {
            place(&mut b, row, 0, (row % 2) as u8);
        }
        b.update(1000.0);
        assert!(b.grid.is_all_empty());
        assert_eq!(b.active(), None);
        assert_eq!(b.level(), 1);
        assert_eq!(b.score(), 0);
        assert_eq!(b.de_gray(), DE_GRAY_START);
        assert!(b.drain_events().contains(&GameEvent::ReturnToTitle));
    }

    #[test]
    fn game_over_dwell_requires_full_period() {
        let mut b = test_board();
        for row in 0..NUM_DOWN {
            place(&mut b, row, 1, (row % 2) as u8);
        }
        b.update(400.0);
        assert!(b.game_over_pausing());
        assert!(!b.grid.is_all_empty());
        b.update(600.0);
        assert!(b.grid.is_all_empty());
        assert!(!b.game_over_pausing());
    }

    #[test]
    fn game_over_pause_lifts_when_overflow_clears() {
        let mut b = test_board();
        for row in 0..7 {
            place(&mut b, row, 0, (row % 2) as u8);
        }
        for row in 7..NUM_DOWN {
            place(&mut b, row, 0, 2);
        }
        // The overflow check sees the full column, but the bottom run of
        // three clears in the same tick.
        b.update(400.0);
        assert!(b.game_over_pausing());
        b.update(1.0);
        assert!(!b.game_over_pausing());
        assert!(!b.grid.is_all_empty());
        // The dwell was rearmed: a fresh overflow needs its full period.
        for row in 0..NUM_DOWN {
            place(&mut b, row, 1, (row % 2) as u8);
        }
        b.update(900.0);
        assert!(b.game_over_pausing());
        assert!(!b.grid.is_all_empty());
    }

    #[test]
    fn input_ignored_while_game_over_pausing() {
        let mut b = test_board();
        b.update(0.0);
        let before = b.active().unwrap();
        for row in 0..NUM_DOWN {
            place(&mut b, row, 4, (row % 2 + 2) as u8);
        }
        b.update(1.0);
        assert!(b.game_over_pausing());
        b.handle_input(Direction::Left);
        assert_eq!(b.active().unwrap(), before);
    }

    #[test]
    fn spawn_reroll_avoids_wildcard_and_kind_below() {
        let mut b = test_board();
        // Fill the spawn column up to the second row so the guard applies.
        for row in 1..NUM_DOWN {
            place(&mut b, row, PLAY_WIDTH / 2, KIND_GRAY);
        }
        b.preview_kind = KIND_MULTI;
        b.update(0.0);
        let p = b.active().expect("spawn blocked");
        let kind = b.grid.kind(p.row, p.col);
        assert_ne!(kind, KIND_MULTI);
        assert_ne!(kind, KIND_GRAY);
    }

    #[test]
    fn invariants_hold_over_a_long_run() {
        let mut b = test_board();
        for i in 0..600 {
            b.update(17.0);
            match i % 7 {
                0 => b.handle_input(Direction::Left),
                3 => b.handle_input(Direction::Right),
                5 => b.handle_input(Direction::Down),
                _ => {}
            }
            assert_invariants(&b);
        }
    }
}
