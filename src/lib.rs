//! Bingo State Library
//!
//! This crate provides the state core for a browser bingo game.
//!
//! # Overview
//!
//! The crate provides:
//!
//! - **Board Model** - Pure value-level 5x5 board with a fixed free cell;
//!   generation from word pools, mark toggling, clearing.
//!
//! - **Bingo Evaluator** - Line-completion detection over a board snapshot
//!   (rows, columns, diagonals).
//!
//! - **Word List Parsing** - Validation and normalization of raw text into a
//!   deduplicated word pool, plus file loading with content hashing.
//!
//! - **State Store** - Schema-validated persistence with corruption recovery
//!   and synchronous change/corruption events.
//!
//! - **Runtime Config** - Seed resolution for reproducible board shuffles and
//!   explicit snapshot publication for debugging hosts.
//!
//! # Design Principles
//!
//! 1. **Boards are immutable values** - Every mutator returns a new board, so
//!    state snapshots can be diffed, serialized, and rolled back freely.
//!
//! 2. **Loads self-heal, saves fail loudly** - Corrupt persisted data resets
//!    to defaults with a corruption event; persisting invalid state is a
//!    programmer error and returns an error.
//!
//! 3. **No UI** - This crate is pure state. Rendering, dialogs, and theme
//!    asset loading are host collaborators consuming its events.
//!
//! 4. **Capabilities are injected** - Storage backends, clocks, and random
//!    sources are passed in, never reached for implicitly.
//!
//! # Example
//!
//! ```rust
//! use bingo_state::{evaluate_board_for_bingo, LoadStatus, StateStore};
//!
//! let mut store = StateStore::in_memory();
//!
//! // First load writes and returns the default state
//! let outcome = store.load();
//! assert_eq!(outcome.status, LoadStatus::Fresh);
//!
//! // Mark a cell, re-derive the bingo flag, persist the full snapshot
//! let mut state = outcome.state;
//! state.board = state.board.toggle_cell(0, 0).unwrap();
//! state.bingo.has_bingo = evaluate_board_for_bingo(&state.board).has_bingo;
//! store.save(&state).unwrap();
//! ```

pub mod bingo;
pub mod board;
pub mod events;
pub mod runtime;
pub mod storage;
pub mod store;
pub mod wordlist;

// Re-export commonly used types at the crate root
pub use bingo::{
    evaluate_board_for_bingo, has_bingo, line_definitions, BingoResult, CompletedLine, Line,
    LineType,
};
pub use board::{
    Board, BoardError, Cell, Coordinate, BOARD_CELL_COUNT, BOARD_SIZE, FREE_COORDINATE, FREE_TEXT,
};
pub use events::{CorruptionReason, EventRegistry, StoreEvent, StoreEventKind, SubscriptionId};
pub use runtime::{
    runtime_config, RuntimeConfig, RuntimeSnapshot, SnapshotPublisher, SEED_ENV_VAR,
    SNAPSHOT_VERSION,
};
pub use storage::{resolve_storage, FileStorage, MemoryStorage, StorageBackend, StorageError};
pub use store::{
    validate_state, BingoSummary, LoadOutcome, LoadStatus, PersistedState, StateMeta, StateStore,
    StoreError, ThemeSelection, WordListRef, STATE_SCHEMA, STATE_STORAGE_KEY,
};
pub use wordlist::{
    load_word_list_from_bytes, load_word_list_from_path, parse_word_list_text,
    parse_word_list_text_with_min, WordListError, WordListFile, WordListMetadata,
    MIN_UNIQUE_ENTRIES,
};
