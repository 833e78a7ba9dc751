use crate::error::Error;
use bit_set::BitSet;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::VecDeque;
use tracing::{debug, trace};

/// A `(row, column)` position on the board.
pub type Coordinate = (usize, usize);

/// Snapshot of a single cell.
///
/// Tiles are only ever mutated through the [`Board`] that owns them; callers
/// receive copies.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Tile {
    mine: bool,
    revealed: bool,
    flagged: bool,
    adjacent_mines: u8,
}

impl Tile {
    pub fn is_mine(&self) -> bool {
        self.mine
    }

    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn is_flagged(&self) -> bool {
        self.flagged
    }

    /// Number of mines among the (up to eight) in-bounds neighbors.
    pub fn adjacent_mines(&self) -> u8 {
        self.adjacent_mines
    }

    pub fn is_hidden(&self) -> bool {
        !self.revealed
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
enum Increment {
    One,
    NegOne,
    Zero,
}

impl Increment {
    fn offset(&self, value: usize, bound: usize) -> Option<usize> {
        let offset = match *self {
            Self::One => value.checked_add(1)?,
            Self::NegOne => value.checked_sub(1)?,
            Self::Zero => value,
        };
        (offset < bound).then_some(offset)
    }
}

fn adjacent(
    (row, column): Coordinate,
    rows: usize,
    columns: usize,
) -> impl Iterator<Item = Coordinate> {
    const INCREMENTS: [Increment; 3] = [Increment::NegOne, Increment::Zero, Increment::One];

    INCREMENTS
        .iter()
        .copied()
        .flat_map(|row_incr| std::iter::repeat(row_incr).zip(INCREMENTS))
        .filter(|&incrs| incrs != (Increment::Zero, Increment::Zero))
        .filter_map(move |(row_incr, column_incr)| {
            Some((
                row_incr.offset(row, rows)?,
                column_incr.offset(column, columns)?,
            ))
        })
}

fn index_from_coord((r, c): Coordinate, columns: usize) -> usize {
    r * columns + c
}

fn coord_from_index(index: usize, columns: usize) -> Coordinate {
    (index / columns, index % columns)
}

/// Draws uniformly random cells until `mines` distinct ones are marked.
fn sample_mines(rng: &mut impl Rng, rows: usize, columns: usize, mines: usize) -> BitSet {
    let mut samples = BitSet::with_capacity(rows * columns);
    // BitSet::len scans every block, so count insertions instead
    let mut placed = 0;
    while placed < mines {
        let row = rng.gen_range(0..rows);
        let column = rng.gen_range(0..columns);
        if samples.insert(index_from_coord((row, column), columns)) {
            placed += 1;
        }
    }
    samples
}

/// Dimensions and mine layout used to build a [`Board`].
#[derive(Debug, Clone, PartialEq, Eq, typed_builder::TypedBuilder)]
pub struct BoardConfig {
    rows: usize,
    columns: usize,
    mines: usize,
    /// Fixed mine coordinates. When absent, mines are placed at random.
    #[builder(default, setter(strip_option))]
    layout: Option<Vec<Coordinate>>,
}

#[derive(Debug, Clone)]
enum Placement {
    Random,
    Fixed(BitSet),
}

/// Result of a single call to [`Board::reveal`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Reveal {
    /// The cell was already revealed or is flagged.
    Unchanged,
    /// This many safe cells were opened, including any flood.
    Opened(usize),
    /// The cell was a mine.
    Detonated,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    Playing,
    Lost,
    Won,
}

impl Status {
    pub fn is_over(self) -> bool {
        !matches!(self, Self::Playing)
    }
}

#[derive(Debug)]
pub struct Board<R = StdRng> {
    tiles: Vec<Tile>,
    rows: usize,
    columns: usize,
    // the total number of mines, fixed for the board's lifetime
    mines: usize,
    placement: Placement,
    rng: R,
    flagged_cells: usize,
    // revealed tiles that are not mines, allows checking a clear in O(1)
    revealed_safe: usize,
    detonated: Option<Coordinate>,
}

impl Board<StdRng> {
    /// Builds a board whose random placement draws from OS entropy.
    pub fn new(config: BoardConfig) -> Result<Self, Error> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Builds a board whose random placement is reproducible from `seed`.
    pub fn seeded(config: BoardConfig, seed: u64) -> Result<Self, Error> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Board<R> {
    pub fn with_rng(config: BoardConfig, rng: R) -> Result<Self, Error> {
        let BoardConfig {
            rows,
            columns,
            mines,
            layout,
        } = config;

        let cells = rows
            .checked_mul(columns)
            .filter(|&cells| cells > 0)
            .ok_or(Error::InvalidDimensions { rows, columns })?;

        if mines > cells {
            return Err(Error::TooManyMines { mines, cells });
        }

        let placement = match layout {
            None => Placement::Random,
            Some(coords) => {
                let set = coords
                    .into_iter()
                    .map(|coord @ (r, c)| {
                        if r < rows && c < columns {
                            Ok(index_from_coord(coord, columns))
                        } else {
                            Err(Error::MineOutOfBounds(coord))
                        }
                    })
                    .collect::<Result<BitSet, _>>()?;
                if set.len() != mines {
                    return Err(Error::MineCountMismatch {
                        expected: mines,
                        actual: set.len(),
                    });
                }
                Placement::Fixed(set)
            }
        };

        let mut board = Self {
            tiles: Vec::with_capacity(cells),
            rows,
            columns,
            mines,
            placement,
            rng,
            flagged_cells: 0,
            revealed_safe: 0,
            detonated: None,
        };
        board.reset();
        Ok(board)
    }

    /// Throws away every tile and regenerates the grid.
    ///
    /// A fixed layout is reused as is; otherwise a fresh random placement is
    /// drawn from the board's random source.
    pub fn reset(&mut self) {
        let (rows, columns, mines) = (self.rows, self.columns, self.mines);
        let samples = match &self.placement {
            Placement::Fixed(set) => set.clone(),
            Placement::Random => sample_mines(&mut self.rng, rows, columns, mines),
        };

        self.tiles = (0..rows * columns)
            .map(|i| {
                let point = coord_from_index(i, columns);

                // sum the number of adjacent tiles that are in the mine set
                let adjacent_mines = adjacent(point, rows, columns).fold(0, |total, coord| {
                    total + u8::from(samples.contains(index_from_coord(coord, columns)))
                });
                debug_assert!(adjacent_mines <= 8);

                Tile {
                    mine: samples.contains(i),
                    adjacent_mines,
                    ..Tile::default()
                }
            })
            .collect();

        self.flagged_cells = 0;
        self.revealed_safe = 0;
        self.detonated = None;

        debug!(
            rows,
            columns,
            mines,
            fixed = matches!(self.placement, Placement::Fixed(_)),
            "generated board"
        );
    }
}

impl<R> Board<R> {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn mines(&self) -> usize {
        self.mines
    }

    pub fn flag_count(&self) -> usize {
        self.flagged_cells
    }

    /// Where the game was lost, if a mine has been revealed.
    pub fn detonated(&self) -> Option<Coordinate> {
        self.detonated
    }

    /// True once every non-mine tile is revealed. Flags play no part.
    pub fn is_cleared(&self) -> bool {
        self.revealed_safe == self.tiles.len() - self.mines
    }

    pub fn status(&self) -> Status {
        if self.detonated.is_some() {
            Status::Lost
        } else if self.is_cleared() {
            Status::Won
        } else {
            Status::Playing
        }
    }

    fn index_from_coord(&self, (r, c): Coordinate) -> Result<usize, Error> {
        if r < self.rows && c < self.columns {
            Ok(index_from_coord((r, c), self.columns))
        } else {
            Err(Error::GetTile((r, c)))
        }
    }

    pub fn tile(&self, coord: Coordinate) -> Result<Tile, Error> {
        Ok(self.tiles[self.index_from_coord(coord)?])
    }

    pub fn is_mine(&self, coord: Coordinate) -> Result<bool, Error> {
        Ok(self.tile(coord)?.mine)
    }

    pub fn adjacent_mines(&self, coord: Coordinate) -> Result<u8, Error> {
        Ok(self.tile(coord)?.adjacent_mines)
    }

    /// Every tile in row-major order alongside its coordinate.
    pub fn tiles(&self) -> impl Iterator<Item = (Coordinate, Tile)> + '_ {
        let columns = self.columns;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, &tile)| (coord_from_index(i, columns), tile))
    }

    /// Opens a tile, flooding outward through tiles with no adjacent mines.
    ///
    /// Revealed and flagged tiles are left alone, both as the target and
    /// while flooding, so flags stop the flood.
    pub fn reveal(&mut self, coord: Coordinate) -> Result<Reveal, Error> {
        let index = self.index_from_coord(coord)?;
        let tile = &mut self.tiles[index];

        if tile.revealed || tile.flagged {
            trace!(?coord, "reveal ignored");
            return Ok(Reveal::Unchanged);
        }

        tile.revealed = true;

        if tile.mine {
            self.detonated = Some(coord);
            debug!(?coord, "mine revealed");
            return Ok(Reveal::Detonated);
        }

        let mut opened = 1;
        let mut frontier = VecDeque::new();
        if tile.adjacent_mines == 0 {
            frontier.push_back(coord);
        }

        let (rows, columns) = (self.rows, self.columns);
        while let Some(current) = frontier.pop_front() {
            for neighbor in adjacent(current, rows, columns) {
                let tile = &mut self.tiles[index_from_coord(neighbor, columns)];
                if tile.revealed || tile.flagged {
                    continue;
                }
                debug_assert!(!tile.mine);

                tile.revealed = true;
                opened += 1;

                if tile.adjacent_mines == 0 {
                    frontier.push_back(neighbor);
                }
            }
        }

        self.revealed_safe += opened;
        trace!(?coord, opened, "revealed");
        if self.is_cleared() {
            debug!("board cleared");
        }

        Ok(Reveal::Opened(opened))
    }

    /// Flips the flag on a hidden tile and returns the new flag state.
    ///
    /// Revealed tiles cannot be flagged; they report `false`.
    pub fn toggle_flag(&mut self, coord: Coordinate) -> Result<bool, Error> {
        let index = self.index_from_coord(coord)?;
        let tile = &mut self.tiles[index];

        if tile.revealed {
            trace!(?coord, "flag ignored on revealed tile");
            return Ok(false);
        }

        tile.flagged = !tile.flagged;
        let flagged = tile.flagged;
        if flagged {
            self.flagged_cells += 1;
        } else {
            self.flagged_cells -= 1;
        }
        Ok(flagged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn board(rows: usize, columns: usize, mines: &[Coordinate]) -> Board {
        let config = BoardConfig::builder()
            .rows(rows)
            .columns(columns)
            .mines(mines.len())
            .layout(mines.to_vec())
            .build();
        Board::seeded(config, 0).unwrap()
    }

    fn live_flags<R>(board: &Board<R>) -> usize {
        board.tiles().filter(|(_, tile)| tile.is_flagged()).count()
    }

    #[test]
    fn adjacent_clips_to_bounds() {
        let mut corner = adjacent((0, 0), 3, 3).collect::<Vec<_>>();
        corner.sort_unstable();
        assert_eq!(corner, vec![(0, 1), (1, 0), (1, 1)]);

        assert_eq!(adjacent((1, 1), 3, 3).count(), 8);
        assert_eq!(adjacent((0, 1), 3, 3).count(), 5);
        assert_eq!(adjacent((0, 0), 1, 1).count(), 0);
        assert!(adjacent((1, 1), 3, 3).all(|coord| coord != (1, 1)));
    }

    #[test]
    fn fixed_layout_sets_adjacent_counts() {
        let board = board(2, 2, &[(0, 0)]);

        assert!(board.is_mine((0, 0)).unwrap());
        assert_eq!(board.adjacent_mines((0, 0)).unwrap(), 0);
        assert_eq!(board.adjacent_mines((0, 1)).unwrap(), 1);
        assert_eq!(board.adjacent_mines((1, 0)).unwrap(), 1);
        assert_eq!(board.adjacent_mines((1, 1)).unwrap(), 1);
    }

    #[test]
    fn surrounded_tile_counts_eight() {
        let mines = (0..3)
            .flat_map(|r| (0..3).map(move |c| (r, c)))
            .collect::<Vec<_>>();
        let board = board(3, 3, &mines);

        assert_eq!(board.adjacent_mines((1, 1)).unwrap(), 8);
        assert_eq!(board.adjacent_mines((0, 0)).unwrap(), 3);
    }

    #[test]
    fn fresh_board_is_hidden_and_unflagged() {
        let config = BoardConfig::builder().rows(8).columns(8).mines(10).build();
        let board = Board::seeded(config, 42).unwrap();

        assert_eq!(board.tiles().filter(|(_, t)| t.is_mine()).count(), 10);
        assert!(board.tiles().all(|(_, t)| t.is_hidden() && !t.is_flagged()));
        assert_eq!(board.flag_count(), 0);
        assert_eq!(board.status(), Status::Playing);
    }

    #[test]
    fn flood_fill_opens_everything_but_the_mine() {
        let mut board = board(3, 3, &[(0, 0)]);

        assert_eq!(board.reveal((2, 2)).unwrap(), Reveal::Opened(8));
        assert!(!board.tile((0, 0)).unwrap().is_revealed());
        assert!(board
            .tiles()
            .filter(|&(coord, _)| coord != (0, 0))
            .all(|(_, t)| t.is_revealed()));
        assert!(board.is_cleared());
        assert_eq!(board.status(), Status::Won);
    }

    #[test]
    fn revealing_a_mine_opens_only_that_tile() {
        let mut board = board(2, 2, &[(0, 0)]);

        assert_eq!(board.reveal((0, 0)).unwrap(), Reveal::Detonated);
        assert!(board.tile((0, 0)).unwrap().is_revealed());
        for coord in [(0, 1), (1, 0), (1, 1)] {
            assert!(board.tile(coord).unwrap().is_hidden());
        }
        assert_eq!(board.detonated(), Some((0, 0)));
        assert_eq!(board.status(), Status::Lost);
    }

    #[test]
    fn numbered_tile_does_not_flood() {
        let mut board = board(2, 2, &[(0, 0)]);

        assert_eq!(board.reveal((1, 1)).unwrap(), Reveal::Opened(1));
        assert_eq!(board.tiles().filter(|(_, t)| t.is_revealed()).count(), 1);
    }

    #[test]
    fn flagged_tile_cannot_be_revealed() {
        let mut board = board(2, 2, &[]);

        assert!(board.toggle_flag((0, 0)).unwrap());
        assert_eq!(board.reveal((0, 0)).unwrap(), Reveal::Unchanged);

        let tile = board.tile((0, 0)).unwrap();
        assert!(tile.is_flagged());
        assert!(!tile.is_revealed());
    }

    #[test]
    fn revealed_tile_cannot_be_flagged() {
        let mut board = board(2, 2, &[(0, 0)]);
        board.reveal((1, 1)).unwrap();

        assert!(!board.toggle_flag((1, 1)).unwrap());
        assert!(!board.tile((1, 1)).unwrap().is_flagged());
        assert_eq!(board.flag_count(), 0);
    }

    #[test]
    fn toggling_twice_restores_state() {
        let mut board = board(3, 3, &[(1, 1)]);
        board.toggle_flag((2, 2)).unwrap();
        let before = board.flag_count();

        assert!(board.toggle_flag((0, 0)).unwrap());
        assert_eq!(board.flag_count(), before + 1);
        assert!(!board.toggle_flag((0, 0)).unwrap());

        assert_eq!(board.flag_count(), before);
        assert_eq!(board.flag_count(), live_flags(&board));
        assert!(!board.tile((0, 0)).unwrap().is_flagged());
    }

    #[test]
    fn flags_are_flood_barriers() {
        // a single row with no mines: the flag splits it in two
        let mut board = board(1, 5, &[]);
        board.toggle_flag((0, 2)).unwrap();

        assert_eq!(board.reveal((0, 0)).unwrap(), Reveal::Opened(2));
        assert!(board.tile((0, 1)).unwrap().is_revealed());
        assert!(!board.tile((0, 2)).unwrap().is_revealed());
        assert!(board.tile((0, 3)).unwrap().is_hidden());
        assert!(board.tile((0, 4)).unwrap().is_hidden());
        assert!(!board.is_cleared());
    }

    #[test]
    fn revealing_twice_is_a_no_op() {
        let mut board = board(2, 2, &[(0, 0)]);

        assert_eq!(board.reveal((1, 1)).unwrap(), Reveal::Opened(1));
        assert_eq!(board.reveal((1, 1)).unwrap(), Reveal::Unchanged);
        assert_eq!(board.tiles().filter(|(_, t)| t.is_revealed()).count(), 1);
    }

    #[test]
    fn zero_mine_board_clears_in_one_reveal() {
        let mut board = board(2, 2, &[]);

        assert!(!board.is_cleared());
        assert_eq!(board.reveal((0, 0)).unwrap(), Reveal::Opened(4));
        assert!(board.is_cleared());
    }

    #[test]
    fn clearing_ignores_flags_on_mines() {
        let mut board = board(2, 2, &[(0, 0), (1, 1)]);

        board.toggle_flag((0, 0)).unwrap();
        board.toggle_flag((1, 1)).unwrap();
        assert!(!board.is_cleared());

        board.reveal((0, 1)).unwrap();
        assert!(!board.is_cleared());
        board.reveal((1, 0)).unwrap();
        assert!(board.is_cleared());
        assert_eq!(board.status(), Status::Won);
    }

    #[test]
    fn full_board_is_cleared_from_the_start() {
        let board = board(1, 2, &[(0, 0), (0, 1)]);
        assert!(board.is_cleared());
    }

    #[test]
    fn out_of_range_coordinates_are_rejected() {
        let mut board = board(2, 3, &[]);

        assert_eq!(board.tile((2, 0)), Err(Error::GetTile((2, 0))));
        assert_eq!(board.tile((0, 3)), Err(Error::GetTile((0, 3))));
        assert_eq!(board.reveal((5, 5)), Err(Error::GetTile((5, 5))));
        assert_eq!(board.toggle_flag((0, 3)), Err(Error::GetTile((0, 3))));
        assert!(board.tiles().all(|(_, t)| t.is_hidden() && !t.is_flagged()));
    }

    #[test]
    fn construction_rejects_bad_config() {
        let too_many = BoardConfig::builder().rows(2).columns(2).mines(5).build();
        assert_eq!(
            Board::new(too_many).unwrap_err(),
            Error::TooManyMines { mines: 5, cells: 4 }
        );

        let empty = BoardConfig::builder().rows(0).columns(4).mines(0).build();
        assert_eq!(
            Board::new(empty).unwrap_err(),
            Error::InvalidDimensions {
                rows: 0,
                columns: 4
            }
        );

        let outside = BoardConfig::builder()
            .rows(2)
            .columns(2)
            .mines(1)
            .layout(vec![(2, 0)])
            .build();
        assert_eq!(
            Board::new(outside).unwrap_err(),
            Error::MineOutOfBounds((2, 0))
        );

        let mismatch = BoardConfig::builder()
            .rows(2)
            .columns(2)
            .mines(2)
            .layout(vec![(0, 0), (0, 0)])
            .build();
        assert_eq!(
            Board::new(mismatch).unwrap_err(),
            Error::MineCountMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn reset_clears_reveals_and_flags_for_fixed_layout() {
        let mut board = board(3, 3, &[(0, 0)]);
        board.toggle_flag((0, 0)).unwrap();
        board.reveal((2, 2)).unwrap();

        board.reset();

        assert_eq!(board.flag_count(), 0);
        assert_eq!(board.status(), Status::Playing);
        assert!(board.tiles().all(|(_, t)| t.is_hidden() && !t.is_flagged()));
        assert!(board.is_mine((0, 0)).unwrap());
        assert_eq!(board.tiles().filter(|(_, t)| t.is_mine()).count(), 1);
    }
}
