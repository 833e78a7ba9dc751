use crate::sweep::Coordinate;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("failed to get tile at coordinate: {0:?}")]
    GetTile(Coordinate),

    #[error("invalid board dimensions: {rows}x{columns}")]
    InvalidDimensions { rows: usize, columns: usize },

    #[error("number of mines ({mines}) is greater than the number of cells: {cells}")]
    TooManyMines { mines: usize, cells: usize },

    #[error("mine coordinate is outside the board: {0:?}")]
    MineOutOfBounds(Coordinate),

    #[error("mine layout has {actual} distinct mines, expected {expected}")]
    MineCountMismatch { expected: usize, actual: usize },
}
