//! Board model.
//!
//! A board is a plain value: 25 cells in row-major order plus a fixed free
//! cell. Every mutating operation returns a fresh `Board`, so any board value
//! held by a state snapshot is safe to diff, serialize, or roll back without
//! aliasing concerns.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Board dimensions (5x5).
pub const BOARD_SIZE: usize = 5;

/// Total cell count.
pub const BOARD_CELL_COUNT: usize = BOARD_SIZE * BOARD_SIZE;

/// The fixed center free cell.
pub const FREE_COORDINATE: Coordinate = Coordinate { row: 2, col: 2 };

/// Text shown on the free cell.
pub const FREE_TEXT: &str = "Free";

/// Grid coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub row: usize,
    pub col: usize,
}

impl Coordinate {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Check if this is the free cell coordinate.
    pub fn is_free(&self) -> bool {
        *self == FREE_COORDINATE
    }

    /// Check if the coordinate is within grid bounds.
    pub fn is_valid(&self) -> bool {
        self.row < BOARD_SIZE && self.col < BOARD_SIZE
    }
}

/// A single board cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub row: usize,
    pub col: usize,
    pub text: String,
    pub marked: bool,
}

impl Cell {
    /// Check if this cell is the free cell.
    pub fn is_free(&self) -> bool {
        self.row == FREE_COORDINATE.row && self.col == FREE_COORDINATE.col
    }
}

/// The bingo board.
///
/// Invariants: `cells.len() == size * size`, cells are stored row-major with
/// unique coordinates, and the free cell is always marked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub size: usize,
    pub free: Coordinate,
    pub cells: Vec<Cell>,
}

impl Board {
    /// Create an empty board: all non-free cells blank and unmarked, the free
    /// cell marked with its fixed text.
    pub fn empty() -> Self {
        let mut cells = Vec::with_capacity(BOARD_CELL_COUNT);
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                let is_free = Coordinate::new(row, col).is_free();
                cells.push(Cell {
                    row,
                    col,
                    text: if is_free { FREE_TEXT.to_string() } else { String::new() },
                    marked: is_free,
                });
            }
        }

        Self {
            size: BOARD_SIZE,
            free: FREE_COORDINATE,
            cells,
        }
    }

    /// Generate a board from a word list.
    ///
    /// Deduplicates the list case-insensitively, shuffles the pool with a
    /// Fisher-Yates pass driven by `rng`, and assigns the first 24 entries to
    /// the non-free cells in row-major order.
    pub fn from_words<R: Rng + ?Sized>(words: &[String], rng: &mut R) -> Result<Self, BoardError> {
        let mut pool = unique_word_pool(words);
        let required = BOARD_CELL_COUNT - 1;

        if pool.len() < required {
            return Err(BoardError::InsufficientWords {
                required,
                unique_count: pool.len(),
            });
        }

        shuffle_in_place(&mut pool, rng);

        let mut board = Self::empty();
        let mut selected = pool.into_iter();
        for cell in board.cells.iter_mut() {
            if cell.is_free() {
                continue;
            }
            if let Some(word) = selected.next() {
                cell.text = word;
            }
        }

        Ok(board)
    }

    /// Regenerate a board from a word list. Alias of [`Board::from_words`].
    pub fn regenerate<R: Rng + ?Sized>(words: &[String], rng: &mut R) -> Result<Self, BoardError> {
        Self::from_words(words, rng)
    }

    /// Return a new board with the target cell's mark flipped.
    ///
    /// The free cell is immutable to toggling: targeting it returns an
    /// unchanged clone.
    pub fn toggle_cell(&self, row: usize, col: usize) -> Result<Self, BoardError> {
        if Coordinate::new(row, col).is_free() {
            return Ok(self.clone());
        }

        if row >= self.size || col >= self.size {
            return Err(BoardError::OutOfBounds { row, col });
        }

        let mut next = self.clone();
        let index = row * self.size + col;

        match next.cells.get(index) {
            Some(cell) if cell.row == row && cell.col == col => {
                next.cells[index].marked = !next.cells[index].marked;
                Ok(next)
            }
            _ => {
                // Guard against malformed cell ordering.
                let mut toggled = false;
                for cell in next.cells.iter_mut() {
                    if cell.row == row && cell.col == col {
                        cell.marked = !cell.marked;
                        toggled = true;
                    }
                }
                if toggled {
                    Ok(next)
                } else {
                    Err(BoardError::OutOfBounds { row, col })
                }
            }
        }
    }

    /// Return a new board with every non-free cell unmarked and the free cell
    /// force-marked.
    pub fn clear_marks(&self) -> Self {
        let mut next = self.clone();
        for cell in next.cells.iter_mut() {
            cell.marked = cell.is_free();
        }
        next
    }

    /// Check whether the board needs a fresh generation pass: a malformed
    /// cell count or any non-free cell with empty text. A caller holding no
    /// board at all should treat that as needing bootstrap too.
    pub fn needs_bootstrap(&self) -> bool {
        if self.cells.len() != BOARD_CELL_COUNT {
            return true;
        }
        self.cells
            .iter()
            .any(|cell| !cell.is_free() && cell.text.is_empty())
    }

    /// Get the cell at a coordinate, if present.
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.cells.iter().find(|c| c.row == row && c.col == col)
    }
}

/// Deduplicate a word list case-insensitively, preserving first-seen casing
/// and order. Blank entries are dropped.
fn unique_word_pool(words: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut pool = Vec::new();

    for word in words {
        let trimmed = word.trim();
        if trimmed.is_empty() {
            continue;
        }

        let signature = trimmed.to_lowercase();
        if seen.insert(signature) {
            pool.push(trimmed.to_string());
        }
    }

    pool
}

/// Fisher-Yates shuffle, swapping from the top index down to 1.
fn shuffle_in_place<T, R: Rng + ?Sized>(values: &mut [T], rng: &mut R) {
    for i in (1..values.len()).rev() {
        let j = rng.gen_range(0..=i);
        values.swap(i, j);
    }
}

/// Board errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// Not enough unique words to fill the non-free cells.
    InsufficientWords { required: usize, unique_count: usize },
    /// Coordinates address no cell on the board.
    OutOfBounds { row: usize, col: usize },
}

impl BoardError {
    /// Stable error code for user-facing message lookup.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientWords { .. } => "INSUFFICIENT_WORDS",
            Self::OutOfBounds { .. } => "OUT_OF_BOUNDS",
        }
    }
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientWords {
                required,
                unique_count,
            } => write!(
                f,
                "At least {} unique words are required to generate a board (got {})",
                required, unique_count
            ),
            Self::OutOfBounds { row, col } => {
                write!(f, "Cell coordinates ({}, {}) are out of bounds", row, col)
            }
        }
    }
}

impl std::error::Error for BoardError {}
