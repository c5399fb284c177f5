//! Grid state model: per-cell lifecycle state, kind tag, visibility.

/// Full board width in cells, including the decorative gray side columns.
pub const NUM_ACROSS: usize = 19;
/// Board height in cells.
pub const NUM_DOWN: usize = 10;
/// First board column of the play area.
pub const PLAY_AREA_START: usize = 7;
/// One past the last board column of the play area.
pub const PLAY_AREA_END: usize = 12;
/// Play-area width in state columns.
pub const PLAY_WIDTH: usize = PLAY_AREA_END - PLAY_AREA_START;

/// Gray blocker kind: decorative outside the play area, an unmatched
/// obstacle inside it (converted away by the de-gray mechanic).
pub const KIND_GRAY: u8 = 5;
/// Wildcard "multi" kind: never matches, colour cycles continuously.
pub const KIND_MULTI: u8 = 6;
/// Number of block kinds (0..=4 playable colours, 5 gray, 6 multi).
pub const NUM_KINDS: u8 = 7;

/// Translate a board column to a play-area state column. The extra `- 1`
/// (relative to the inverse below) defines where the playable columns begin
/// and is part of the board layout contract.
pub fn to_state_col(board_col: i32) -> i32 {
    board_col - PLAY_AREA_START as i32 - 1
}

/// Translate a play-area state column to a board column.
pub fn to_board_col(state_col: usize) -> usize {
    state_col + PLAY_AREA_START
}

/// Lifecycle state of one play-area cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockState {
    /// Not drawn, not occupied.
    #[default]
    Empty,
    /// The single player-controlled falling block.
    Active,
    /// Settled, matchable.
    Inactive,
    /// Transient mark between match scan and resolution within one tick.
    Exploding,
}

/// Authoritative play-area storage: parallel state / kind / visible arrays
/// addressed by (row, state column). Storage only; the board drives it.
#[derive(Debug, Clone)]
pub struct Grid {
    states: [[BlockState; PLAY_WIDTH]; NUM_DOWN],
    kinds: [[u8; PLAY_WIDTH]; NUM_DOWN],
    visible: [[bool; PLAY_WIDTH]; NUM_DOWN],
}

impl Grid {
    pub fn new() -> Self {
        Self {
            states: [[BlockState::Empty; PLAY_WIDTH]; NUM_DOWN],
            kinds: [[0; PLAY_WIDTH]; NUM_DOWN],
            visible: [[false; PLAY_WIDTH]; NUM_DOWN],
        }
    }

    #[inline]
    pub fn state(&self, row: usize, col: usize) -> BlockState {
        self.states[row][col]
    }

    #[inline]
    pub fn set_state(&mut self, row: usize, col: usize, state: BlockState) {
        self.states[row][col] = state;
    }

    #[inline]
    pub fn kind(&self, row: usize, col: usize) -> u8 {
        self.kinds[row][col]
    }

    #[inline]
    pub fn set_kind(&mut self, row: usize, col: usize, kind: u8) {
        self.kinds[row][col] = kind;
    }

    #[inline]
    pub fn visible(&self, row: usize, col: usize) -> bool {
        self.visible[row][col]
    }

    /// Occupy a cell: kind + state + visible in one step.
    pub fn set_cell(&mut self, row: usize, col: usize, kind: u8, state: BlockState) {
        self.kinds[row][col] = kind;
        self.states[row][col] = state;
        self.visible[row][col] = true;
    }

    /// Vacate a cell. Clearing visibility forces the state to Empty, which
    /// keeps the "invisible implies Empty" invariant at the point of change.
    pub fn clear_cell(&mut self, row: usize, col: usize) {
        self.states[row][col] = BlockState::Empty;
        self.visible[row][col] = false;
    }

    /// Invariant sweep: any invisible cell is Empty.
    pub fn sweep_invisible(&mut self) {
        for row in 0..NUM_DOWN {
            for col in 0..PLAY_WIDTH {
                if !self.visible[row][col] {
                    self.states[row][col] = BlockState::Empty;
                }
            }
        }
    }

    /// Number of settled cells per column, used for the overflow check.
    pub fn column_fill_counts(&self) -> [usize; PLAY_WIDTH] {
        let mut counts = [0; PLAY_WIDTH];
        for row in 0..NUM_DOWN {
            for col in 0..PLAY_WIDTH {
                if self.states[row][col] == BlockState::Inactive {
                    counts[col] += 1;
                }
            }
        }
        counts
    }

    /// Full clear for the game-over reset (storage reused, not reallocated).
    pub fn clear_all(&mut self) {
        for row in 0..NUM_DOWN {
            for col in 0..PLAY_WIDTH {
                self.clear_cell(row, col);
            }
        }
    }

    pub fn is_all_empty(&self) -> bool {
        self.states
            .iter()
            .all(|row| row.iter().all(|&s| s == BlockState::Empty))
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_translation_round_trip_is_offset_by_one() {
        // The two translations are deliberately not inverses: to_state_col
        // skips the border column.
        assert_eq!(to_board_col(0), PLAY_AREA_START);
        assert_eq!(to_state_col(PLAY_AREA_START as i32), -1);
        assert_eq!(to_state_col(PLAY_AREA_END as i32), PLAY_WIDTH as i32 - 1);
    }

    #[test]
    fn clear_cell_enforces_invisible_empty() {
        let mut g = Grid::new();
        g.set_cell(3, 2, 4, BlockState::Inactive);
        assert!(g.visible(3, 2));
        g.clear_cell(3, 2);
        assert!(!g.visible(3, 2));
        assert_eq!(g.state(3, 2), BlockState::Empty);
    }

    #[test]
    fn sweep_forces_invisible_cells_empty() {
        let mut g = Grid::new();
        // Violate the invariant directly, then sweep.
        g.set_state(1, 1, BlockState::Inactive);
        g.sweep_invisible();
        assert_eq!(g.state(1, 1), BlockState::Empty);
    }

    #[test]
    fn fill_counts_see_only_inactive() {
        let mut g = Grid::new();
        g.set_cell(0, 0, 1, BlockState::Active);
        g.set_cell(1, 0, 1, BlockState::Inactive);
        g.set_cell(2, 0, 1, BlockState::Inactive);
        assert_eq!(g.column_fill_counts()[0], 2);
    }
}
