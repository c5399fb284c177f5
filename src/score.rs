//! Match detection, clearing, and scoring.
//!
//! Every settled visible cell is treated as a run origin and scanned along
//! seven straight directions (down, left, right and the four diagonals —
//! straight up is covered by the cell below scanning down). A run commits
//! when it extends the origin by at least two cells; committing awards
//! points per cleared cell, spawns fragments, ticks the de-gray counter
//! and may level up. Runs are resolved one at a time in scan order, so a
//! cell cleared by one run can never score again in the same tick.

use crate::board::{
    Fragment, GameBoard, GameEvent, BLOCK_POINT_VALUE, BREAK_SOUNDS, DE_GRAY_START,
    LEVEL_PROGRESS_GOAL, MAX_SCORE,
};
use crate::grid::{
    to_state_col, BlockState, KIND_GRAY, KIND_MULTI, NUM_DOWN, PLAY_AREA_END, PLAY_AREA_START,
    PLAY_WIDTH,
};
use rand::Rng;

/// `(col, row)` steps for the seven scan directions.
const MATCH_DIRECTIONS: [(i32, i32); 7] = [
    (0, 1),   // down
    (-1, 0),  // left
    (1, 0),   // right
    (-1, -1), // up-left
    (1, -1),  // up-right
    (-1, 1),  // down-left
    (1, 1),   // down-right
];

const FRAGMENTS_PER_CELL: usize = 6;

impl GameBoard {
    /// Settle wildcards, then scan every settled cell along each direction
    /// and resolve each run immediately.
    pub(crate) fn scan_matches(&mut self) {
        for row in 0..NUM_DOWN {
            for col in 0..PLAY_WIDTH {
                if self.grid.state(row, col) != BlockState::Inactive
                    || !self.grid.visible(row, col)
                {
                    continue;
                }
                if self.grid.kind(row, col) == KIND_MULTI {
                    self.settle_wildcard(row, col);
                }
                for dir in MATCH_DIRECTIONS {
                    // An earlier run this tick may have cleared the origin.
                    if self.grid.state(row, col) != BlockState::Inactive
                        || !self.grid.visible(row, col)
                    {
                        break;
                    }
                    self.resolve_run(row, col, dir);
                }
            }
        }
    }

    /// A settled wildcard adopts the kind of the cell beneath it; on the
    /// bottom row it re-rolls into a concrete kind instead.
    fn settle_wildcard(&mut self, row: usize, col: usize) {
        if row + 1 < NUM_DOWN {
            if self.grid.visible(row + 1, col) {
                let below = self.grid.kind(row + 1, col);
                self.grid.set_kind(row, col, below);
            }
        } else {
            let mut kind = self.grid.kind(row, col);
            while kind == KIND_MULTI {
                kind = self.rng.gen_range(0..KIND_MULTI);
            }
            self.grid.set_kind(row, col, kind);
        }
    }

    /// Walk one straight run from the origin, then commit it if long
    /// enough or roll the marks back.
    fn resolve_run(&mut self, row: usize, col: usize, dir: (i32, i32)) {
        let origin_kind = self.grid.kind(row, col);
        let mut targets = Vec::new();
        self.run_targets(origin_kind, col as i32, row as i32, dir, &mut targets);
        if targets.len() >= 2 {
            self.grid.set_state(row, col, BlockState::Exploding);
            for &(r, c) in &targets {
                self.grid.set_state(r, c, BlockState::Exploding);
            }
            self.commit_run(row, col, &targets);
        }
    }

    /// Recursive straight-line walk, accumulating matching cells.
    fn run_targets(
        &self,
        origin_kind: u8,
        col: i32,
        row: i32,
        dir: (i32, i32),
        acc: &mut Vec<(usize, usize)>,
    ) {
        let next_col = col + dir.0;
        let next_row = row + dir.1;
        if !self.run_step_matches(origin_kind, next_col, next_row) {
            return;
        }
        acc.push((next_row as usize, next_col as usize));
        self.run_targets(origin_kind, next_col, next_row, dir, acc);
    }

    /// Whether the run may extend onto `(col, row)`: in bounds, settled,
    /// visible, same kind, and neither end is unmatchable. A wildcard
    /// origin never matches outward (it settles into a concrete kind
    /// first), and gray cells only leave the board via de-gray.
    fn run_step_matches(&self, origin_kind: u8, col: i32, row: i32) -> bool {
        if col < 0 || col >= PLAY_WIDTH as i32 || row < 0 || row >= NUM_DOWN as i32 {
            return false;
        }
        let (row, col) = (row as usize, col as usize);
        origin_kind != KIND_MULTI
            && self.grid.kind(row, col) != KIND_GRAY
            && self.grid.kind(row, col) == origin_kind
            && self.grid.state(row, col) == BlockState::Inactive
            && self.grid.visible(row, col)
    }

    /// Clear every Exploding cell of the committed run, award points,
    /// start the clear pause and advance de-gray.
    fn commit_run(&mut self, origin_row: usize, origin_col: usize, targets: &[(usize, usize)]) {
        self.clear_pausing = true;
        self.clear_pause.reset();
        self.block_fall.reset();

        let cue = BREAK_SOUNDS[self.rng.gen_range(0..BREAK_SOUNDS.len())];
        self.events.push(GameEvent::Sound(cue));

        let mut cells = vec![(origin_row, origin_col)];
        cells.extend_from_slice(targets);
        for (row, col) in cells {
            let kind = self.grid.kind(row, col);
            self.grid.clear_cell(row, col);
            self.recent_cleared.push(crate::board::Pos { col, row });
            self.spawn_fragments(row, col, kind);
            self.award_points(BLOCK_POINT_VALUE);
        }

        self.de_gray -= 1;
        if self.de_gray <= 0 {
            self.de_gray_convert();
        }
        self.check_level_up();
    }

    fn award_points(&mut self, points: u32) {
        self.score = (self.score + points).min(MAX_SCORE);
        self.level_progress += points;
    }

    /// Convert the first visible gray block (scanning top-down, left to
    /// right across the play area) into a random concrete kind, then rearm
    /// the counter. The counter rearms even when no gray is left.
    fn de_gray_convert(&mut self) {
        'search: for row in 0..NUM_DOWN {
            for board_col in PLAY_AREA_START + 1..=PLAY_AREA_END {
                let col = to_state_col(board_col as i32) as usize;
                if self.grid.visible(row, col) && self.grid.kind(row, col) == KIND_GRAY {
                    let kind = self.rng.gen_range(0..KIND_GRAY);
                    self.grid.set_kind(row, col, kind);
                    break 'search;
                }
            }
        }
        self.de_gray = DE_GRAY_START;
    }

    fn check_level_up(&mut self) {
        if self.level_progress >= LEVEL_PROGRESS_GOAL {
            self.level_progress = 0;
            self.apply_level_up();
        }
    }

    fn spawn_fragments(&mut self, row: usize, col: usize, kind: u8) {
        for _ in 0..FRAGMENTS_PER_CELL {
            let vx = self.rng.gen_range(-0.01..0.01);
            let vy = self.rng.gen_range(-0.015..0.005);
            let lifespan = self.rng.gen_range(150.0..250.0);
            self.fragments.push(Fragment {
                x: col as f32 + 0.5,
                y: row as f32 + 0.5,
                vx,
                vy,
                life: 0.0,
                lifespan,
                kind,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::tests::{assert_invariants, place, test_board};
    use crate::board::MAX_LEVEL;

    #[test]
    fn run_of_two_does_not_clear() {
        let mut b = test_board();
        place(&mut b, NUM_DOWN - 1, 0, 2);
        place(&mut b, NUM_DOWN - 1, 1, 2);
        b.scan_matches();
        assert_eq!(b.grid.state(NUM_DOWN - 1, 0), BlockState::Inactive);
        assert_eq!(b.grid.state(NUM_DOWN - 1, 1), BlockState::Inactive);
        assert_eq!(b.score(), 0);
    }

    #[test]
    fn run_of_three_clears_and_scores_per_cell() {
        let mut b = test_board();
        for col in 0..3 {
            place(&mut b, NUM_DOWN - 1, col, 2);
        }
        b.scan_matches();
        for col in 0..3 {
            assert_eq!(b.grid.state(NUM_DOWN - 1, col), BlockState::Empty);
            assert!(!b.grid.visible(NUM_DOWN - 1, col));
        }
        assert_eq!(b.score(), 3 * BLOCK_POINT_VALUE);
        assert!(b.clear_pausing());
        assert!(b
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::Sound(_))));
        assert_invariants(&b);
    }

    #[test]
    fn vertical_and_diagonal_runs_clear() {
        let mut b = test_board();
        for row in 5..8 {
            place(&mut b, row, 0, 1);
        }
        b.scan_matches();
        for row in 5..8 {
            assert_eq!(b.grid.state(row, 0), BlockState::Empty);
        }

        let mut b = test_board();
        place(&mut b, 7, 1, 4);
        place(&mut b, 8, 2, 4);
        place(&mut b, 9, 3, 4);
        b.scan_matches();
        assert_eq!(b.grid.state(7, 1), BlockState::Empty);
        assert_eq!(b.grid.state(8, 2), BlockState::Empty);
        assert_eq!(b.grid.state(9, 3), BlockState::Empty);
    }

    #[test]
    fn gray_blocks_never_match() {
        let mut b = test_board();
        for col in 0..3 {
            place(&mut b, NUM_DOWN - 1, col, KIND_GRAY);
        }
        b.scan_matches();
        for col in 0..3 {
            assert_eq!(b.grid.state(NUM_DOWN - 1, col), BlockState::Inactive);
        }
        assert_eq!(b.score(), 0);
    }

    #[test]
    fn settled_wildcard_adopts_kind_below_and_joins_runs() {
        let mut b = test_board();
        place(&mut b, NUM_DOWN - 2, 0, KIND_MULTI);
        place(&mut b, NUM_DOWN - 1, 0, 3);
        place(&mut b, NUM_DOWN - 2, 1, 3);
        place(&mut b, NUM_DOWN - 2, 2, 3);
        b.scan_matches();
        // The wildcard became kind 3 and completed the horizontal run.
        assert_eq!(b.grid.state(NUM_DOWN - 2, 0), BlockState::Empty);
        assert_eq!(b.grid.state(NUM_DOWN - 2, 1), BlockState::Empty);
        assert_eq!(b.grid.state(NUM_DOWN - 2, 2), BlockState::Empty);
        assert_eq!(b.score(), 3 * BLOCK_POINT_VALUE);
    }

    #[test]
    fn adjacent_wildcards_never_match_each_other() {
        let mut b = test_board();
        // Floating wildcards (nothing visible beneath) keep their kind, so
        // this is a straight run of three identical multi cells.
        for col in 1..4 {
            place(&mut b, 4, col, KIND_MULTI);
        }
        b.scan_matches();
        for col in 1..4 {
            assert_eq!(b.grid.state(4, col), BlockState::Inactive);
            assert_eq!(b.grid.kind(4, col), KIND_MULTI);
        }
        assert_eq!(b.score(), 0);
    }

    #[test]
    fn bottom_row_wildcard_rerolls_concrete() {
        let mut b = test_board();
        place(&mut b, NUM_DOWN - 1, 2, KIND_MULTI);
        b.scan_matches();
        let kind = b.grid.kind(NUM_DOWN - 1, 2);
        assert_ne!(kind, KIND_MULTI);
        assert!(kind < KIND_MULTI);
    }

    #[test]
    fn crossing_runs_score_each_cell_once() {
        let mut b = test_board();
        // A plus of kind 3: horizontal arm on row 5, vertical arm on col 2.
        place(&mut b, 5, 1, 3);
        place(&mut b, 5, 2, 3);
        place(&mut b, 5, 3, 3);
        place(&mut b, 6, 2, 3);
        place(&mut b, 7, 2, 3);
        b.scan_matches();
        // Scan order reaches (5,1) first; its rightward run commits and
        // consumes the shared centre, so the vertical remnant is too short
        // to clear and no cell scores twice.
        assert_eq!(b.score(), 3 * BLOCK_POINT_VALUE);
        assert_eq!(b.grid.state(5, 1), BlockState::Empty);
        assert_eq!(b.grid.state(5, 2), BlockState::Empty);
        assert_eq!(b.grid.state(5, 3), BlockState::Empty);
        assert_eq!(b.grid.state(6, 2), BlockState::Inactive);
        assert_eq!(b.grid.state(7, 2), BlockState::Inactive);
        assert_invariants(&b);
    }

    #[test]
    fn score_saturates_at_cap() {
        let mut b = test_board();
        b.score = MAX_SCORE - 5;
        for col in 0..3 {
            place(&mut b, NUM_DOWN - 1, col, 0);
        }
        b.scan_matches();
        assert_eq!(b.score(), MAX_SCORE);
    }

    #[test]
    fn de_gray_counter_converts_a_gray_block() {
        let mut b = test_board();
        b.de_gray = 1;
        place(&mut b, 3, 4, KIND_GRAY);
        for col in 0..3 {
            place(&mut b, NUM_DOWN - 1, col, 1);
        }
        b.scan_matches();
        let kind = b.grid.kind(3, 4);
        assert_ne!(kind, KIND_GRAY);
        assert!(kind < KIND_GRAY);
        assert_eq!(b.de_gray(), DE_GRAY_START);
    }

    #[test]
    fn de_gray_rearms_with_no_gray_on_board() {
        let mut b = test_board();
        b.de_gray = 1;
        for col in 0..3 {
            place(&mut b, NUM_DOWN - 1, col, 4);
        }
        b.scan_matches();
        assert_eq!(b.de_gray(), DE_GRAY_START);
    }

    #[test]
    fn level_up_at_progress_goal() {
        let mut b = test_board();
        b.level_progress = LEVEL_PROGRESS_GOAL - 2 * BLOCK_POINT_VALUE;
        for col in 0..3 {
            place(&mut b, NUM_DOWN - 1, col, 0);
        }
        b.scan_matches();
        assert_eq!(b.level(), 2);
        assert_eq!(b.level_progress, 0);
        assert!(b
            .drain_events()
            .iter()
            .any(|e| matches!(e, GameEvent::Music(_))));
    }

    #[test]
    fn level_caps_at_max() {
        let mut b = test_board();
        b.level = MAX_LEVEL;
        b.level_progress = LEVEL_PROGRESS_GOAL;
        for col in 0..3 {
            place(&mut b, NUM_DOWN - 1, col, 0);
        }
        b.scan_matches();
        assert_eq!(b.level(), MAX_LEVEL);
    }

    #[test]
    fn clears_leave_fragments_behind() {
        let mut b = test_board();
        for col in 0..3 {
            place(&mut b, NUM_DOWN - 1, col, 2);
        }
        b.scan_matches();
        assert_eq!(b.fragments().len(), 3 * 6);
        assert!(b.fragments().iter().all(|f| f.kind == 2));
    }
}
