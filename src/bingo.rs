//! Bingo evaluator.
//!
//! Checks a board snapshot against the 12 scoring lines (5 rows, 5 columns,
//! 2 diagonals). Results are derived values with no lifecycle of their own:
//! they must be recomputed after every board change, never cached.

use std::sync::OnceLock;

use serde::Serialize;

use crate::board::{Board, Coordinate, BOARD_SIZE};

/// Scoring line kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    Row,
    Column,
    Diagonal,
}

impl LineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Column => "column",
            Self::Diagonal => "diagonal",
        }
    }
}

/// A static scoring line definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub id: String,
    pub line_type: LineType,
    pub index: usize,
    pub cells: Vec<Coordinate>,
}

/// A line found complete during evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedLine {
    pub id: String,
    #[serde(rename = "type")]
    pub line_type: LineType,
    pub index: usize,
    pub cells: Vec<Coordinate>,
}

/// Result of evaluating a board for bingo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoResult {
    pub has_bingo: bool,
    pub line_count: usize,
    pub lines: Vec<CompletedLine>,
}

/// The 12 scoring lines, in definition order: rows top-to-bottom, columns
/// left-to-right, then the two diagonals.
pub fn line_definitions() -> &'static [Line] {
    static LINES: OnceLock<Vec<Line>> = OnceLock::new();
    LINES.get_or_init(|| {
        let mut lines = Vec::with_capacity(2 * BOARD_SIZE + 2);

        for row in 0..BOARD_SIZE {
            lines.push(Line {
                id: format!("row-{}", row),
                line_type: LineType::Row,
                index: row,
                cells: (0..BOARD_SIZE).map(|col| Coordinate::new(row, col)).collect(),
            });
        }

        for col in 0..BOARD_SIZE {
            lines.push(Line {
                id: format!("column-{}", col),
                line_type: LineType::Column,
                index: col,
                cells: (0..BOARD_SIZE).map(|row| Coordinate::new(row, col)).collect(),
            });
        }

        lines.push(Line {
            id: "diagonal-0".to_string(),
            line_type: LineType::Diagonal,
            index: 0,
            cells: (0..BOARD_SIZE).map(|i| Coordinate::new(i, i)).collect(),
        });

        lines.push(Line {
            id: "diagonal-1".to_string(),
            line_type: LineType::Diagonal,
            index: 1,
            cells: (0..BOARD_SIZE)
                .map(|i| Coordinate::new(i, BOARD_SIZE - 1 - i))
                .collect(),
        });

        lines
    })
}

/// Build the marked matrix for a board. Cells with out-of-range coordinates
/// are skipped rather than treated as fatal.
fn marked_matrix(board: &Board) -> [[bool; BOARD_SIZE]; BOARD_SIZE] {
    let mut matrix = [[false; BOARD_SIZE]; BOARD_SIZE];

    for cell in &board.cells {
        if cell.row < BOARD_SIZE && cell.col < BOARD_SIZE {
            matrix[cell.row][cell.col] = cell.marked;
        }
    }

    matrix
}

/// Evaluate a board snapshot for completed lines.
pub fn evaluate_board_for_bingo(board: &Board) -> BingoResult {
    let matrix = marked_matrix(board);
    let mut completed = Vec::new();

    for line in line_definitions() {
        let complete = line
            .cells
            .iter()
            .all(|coord| matrix[coord.row][coord.col]);

        if complete {
            completed.push(CompletedLine {
                id: line.id.clone(),
                line_type: line.line_type,
                index: line.index,
                cells: line.cells.clone(),
            });
        }
    }

    BingoResult {
        has_bingo: !completed.is_empty(),
        line_count: completed.len(),
        lines: completed,
    }
}

/// Convenience check for any completed line.
pub fn has_bingo(board: &Board) -> bool {
    evaluate_board_for_bingo(board).has_bingo
}
