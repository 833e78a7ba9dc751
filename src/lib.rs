//! Game-state engine for a grid-reveal mine puzzle.
//!
//! A [`Board`] owns the grid, places mines, computes adjacency counts and
//! applies the reveal and flag rules. Presentation layers drive it through
//! [`Board::reveal`] and [`Board::toggle_flag`] and re-render from
//! [`Board::tiles`] after every call.

pub mod error;
pub mod sweep;

pub use error::Error;
pub use sweep::{Board, BoardConfig, Coordinate, Reveal, Status, Tile};
