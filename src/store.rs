//! Persistent state store.
//!
//! Owns the full persisted snapshot: load with corruption recovery, save
//! with normalize-then-validate, manual clear/reset, and synchronous change
//! and corruption events. Every save replaces the whole stored value; no
//! partial updates are persisted.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::{Board, BOARD_CELL_COUNT, BOARD_SIZE, FREE_COORDINATE};
use crate::events::{CorruptionReason, EventRegistry, StoreEvent, StoreEventKind, SubscriptionId};
use crate::storage::{MemoryStorage, StorageBackend};

/// Schema identifier embedded in every persisted snapshot.
pub const STATE_SCHEMA: &str = "bingo.state.v1";

/// Storage key under which the snapshot is persisted.
pub const STATE_STORAGE_KEY: &str = "bingo/state/v1";

/// Derived bingo flag persisted alongside the board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BingoSummary {
    pub has_bingo: bool,
}

/// The active theme reference. Only id and version are persisted; the full
/// theme metadata lives with the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeSelection {
    pub id: String,
    pub version: String,
}

/// Provenance of the word list the current board was generated from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordListRef {
    pub filename: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMeta {
    /// Last-save timestamp, epoch milliseconds.
    pub ts: f64,
}

/// The unit of persistence and validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    pub schema: String,
    pub board: Board,
    pub bingo: BingoSummary,
    pub theme: ThemeSelection,
    pub word_list: WordListRef,
    pub meta: StateMeta,
}

/// How `load` obtained its state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    /// Nothing was stored; defaults were written and returned.
    Fresh,
    /// A valid snapshot was found and returned as-is.
    Loaded,
    /// Stored data was corrupt; defaults were restored.
    Reset,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Loaded => "loaded",
            Self::Reset => "reset",
        }
    }
}

/// Result of a `load` call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome {
    pub state: PersistedState,
    pub status: LoadStatus,
}

/// Store errors. Only `save` surfaces errors; `load` is self-healing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The state failed validation after normalization.
    InvalidState { errors: Vec<String> },
    /// The backing store rejected the write.
    Persist { message: String },
}

impl StoreError {
    /// Stable error code for user-facing message lookup.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::Persist { .. } => "PERSIST_FAILED",
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidState { errors } => {
                write!(f, "Attempted to persist invalid state: {}", errors.join("; "))
            }
            Self::Persist { message } => write!(f, "Failed to persist state: {}", message),
        }
    }
}

impl std::error::Error for StoreError {}

fn now_millis() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64
}

/// Validate a candidate state against the schema rules. Returns the full
/// list of violations; an empty list means the state is valid.
pub fn validate_state(candidate: &PersistedState) -> Vec<String> {
    let mut errors = Vec::new();

    if candidate.schema != STATE_SCHEMA {
        errors.push(format!(
            "Invalid schema identifier (expected {})",
            STATE_SCHEMA
        ));
    }

    validate_board(&candidate.board, &mut errors);

    if candidate.theme.id.trim().is_empty() {
        errors.push("theme.id must be a non-empty string".to_string());
    }
    if candidate.theme.version.trim().is_empty() {
        errors.push("theme.version must be a non-empty string".to_string());
    }

    if !candidate.meta.ts.is_finite() {
        errors.push("meta.ts must be a finite number timestamp".to_string());
    }

    errors
}

fn validate_board(board: &Board, errors: &mut Vec<String>) {
    if board.size != BOARD_SIZE {
        errors.push(format!("board.size must be {}", BOARD_SIZE));
    }

    if board.free != FREE_COORDINATE {
        errors.push("board.free must match the Free cell coordinates".to_string());
    }

    if board.cells.len() != BOARD_CELL_COUNT {
        errors.push(format!(
            "board.cells must contain {} entries",
            BOARD_CELL_COUNT
        ));
    }

    for cell in &board.cells {
        if cell.row >= BOARD_SIZE || cell.col >= BOARD_SIZE {
            errors.push("Cell row/col out of bounds".to_string());
            break;
        }
    }

    match board
        .cells
        .iter()
        .find(|cell| cell.row == FREE_COORDINATE.row && cell.col == FREE_COORDINATE.col)
    {
        None => errors.push("Free cell missing from board.cells".to_string()),
        Some(free) if !free.marked => {
            errors.push("Free cell must always be marked".to_string())
        }
        Some(_) => {}
    }
}

/// The state store.
pub struct StateStore {
    storage: Box<dyn StorageBackend>,
    storage_key: String,
    events: EventRegistry,
    clock: Box<dyn Fn() -> f64>,
}

impl StateStore {
    /// Create a store over an injected storage backend, using the default
    /// storage key and wall clock.
    pub fn new(storage: Box<dyn StorageBackend>) -> Self {
        Self {
            storage,
            storage_key: STATE_STORAGE_KEY.to_string(),
            events: EventRegistry::new(),
            clock: Box::new(now_millis),
        }
    }

    /// Create a store backed by process-lifetime memory.
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryStorage::new()))
    }

    /// Override the storage key.
    pub fn with_key(mut self, key: &str) -> Self {
        self.storage_key = key.to_string();
        self
    }

    /// Override the clock used for `meta.ts` (for tests).
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> f64 + 'static,
    {
        self.clock = Box::new(clock);
        self
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// The default state written on first run and after corruption resets.
    pub fn default_state(&self) -> PersistedState {
        PersistedState {
            schema: STATE_SCHEMA.to_string(),
            board: Board::empty(),
            bingo: BingoSummary { has_bingo: false },
            theme: ThemeSelection {
                id: "default".to_string(),
                version: "1.0.0".to_string(),
            },
            word_list: WordListRef {
                filename: String::new(),
                hash: String::new(),
            },
            meta: StateMeta { ts: (self.clock)() },
        }
    }

    /// Subscribe to store events. Delivery is synchronous and per-handler
    /// isolated; see [`EventRegistry`].
    pub fn subscribe<F>(&mut self, kind: StoreEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&StoreEvent) + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Load the persisted snapshot.
    ///
    /// Never fails: missing data produces a fresh default, unparseable or
    /// invalid data resets to defaults and emits a corruption event.
    pub fn load(&mut self) -> LoadOutcome {
        let raw = match self.storage.get(&self.storage_key) {
            Some(raw) => raw,
            None => {
                let state = self.default_state();
                self.persist_raw(&state);
                return LoadOutcome {
                    state,
                    status: LoadStatus::Fresh,
                };
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(error) => {
                let state = self.reset_internal(
                    CorruptionReason::ParseError,
                    Some(vec![error.to_string()]),
                );
                return LoadOutcome {
                    state,
                    status: LoadStatus::Reset,
                };
            }
        };

        let candidate = match serde_json::from_value::<PersistedState>(value) {
            Ok(candidate) => candidate,
            Err(error) => {
                let state = self.reset_internal(
                    CorruptionReason::SchemaInvalid,
                    Some(vec![error.to_string()]),
                );
                return LoadOutcome {
                    state,
                    status: LoadStatus::Reset,
                };
            }
        };

        let errors = validate_state(&candidate);
        if !errors.is_empty() {
            let state = self.reset_internal(CorruptionReason::SchemaInvalid, Some(errors));
            return LoadOutcome {
                state,
                status: LoadStatus::Reset,
            };
        }

        LoadOutcome {
            state: candidate,
            status: LoadStatus::Loaded,
        }
    }

    /// Normalize, validate, and persist a full state snapshot.
    ///
    /// Normalization forces the schema constant and refreshes `meta.ts`, so
    /// a save only fails when the board itself is structurally invalid or
    /// the backing store rejects the write. Emits `Change` on success.
    pub fn save(&mut self, state: &PersistedState) -> Result<PersistedState, StoreError> {
        let normalized = self.normalize(state);

        let errors = validate_state(&normalized);
        if !errors.is_empty() {
            return Err(StoreError::InvalidState { errors });
        }

        let serialized =
            serde_json::to_string(&normalized).map_err(|error| StoreError::Persist {
                message: error.to_string(),
            })?;
        self.storage
            .set(&self.storage_key, &serialized)
            .map_err(|error| StoreError::Persist {
                message: error.message,
            })?;

        self.events.emit(&StoreEvent::Change {
            state: normalized.clone(),
        });

        Ok(normalized)
    }

    /// Remove the persisted snapshot and notify corruption subscribers.
    pub fn clear(&mut self, reason: CorruptionReason) {
        self.storage.remove(&self.storage_key);
        self.events.emit(&StoreEvent::Corruption {
            reason,
            detail: None,
            state: self.default_state(),
        });
    }

    /// Replace the persisted snapshot with defaults.
    pub fn reset_to_defaults(&mut self, reason: CorruptionReason) -> PersistedState {
        self.reset_internal(reason, None)
    }

    fn normalize(&self, state: &PersistedState) -> PersistedState {
        let mut normalized = state.clone();
        normalized.schema = STATE_SCHEMA.to_string();
        normalized.meta.ts = (self.clock)();
        normalized
    }

    fn reset_internal(
        &mut self,
        reason: CorruptionReason,
        detail: Option<Vec<String>>,
    ) -> PersistedState {
        let fallback = self.default_state();
        self.persist_raw(&fallback);
        self.events.emit(&StoreEvent::Corruption {
            reason,
            detail,
            state: fallback.clone(),
        });
        fallback
    }

    /// Best-effort write used on the recovery paths, where a storage failure
    /// must not mask the state being handed back to the caller.
    fn persist_raw(&mut self, state: &PersistedState) {
        let serialized = match serde_json::to_string(state) {
            Ok(serialized) => serialized,
            Err(error) => {
                tracing::warn!(%error, "failed to serialize default state");
                return;
            }
        };
        if let Err(error) = self.storage.set(&self.storage_key, &serialized) {
            tracing::warn!(error = %error.message, "failed to persist default state");
        }
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("storage_key", &self.storage_key)
            .field("events", &self.events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn store_with_fixed_clock(ts: f64) -> StateStore {
        StateStore::in_memory().with_clock(move || ts)
    }

    fn seeded_store(raw: &str) -> StateStore {
        let mut storage = MemoryStorage::new();
        storage.set(STATE_STORAGE_KEY, raw).unwrap();
        StateStore::new(Box::new(storage))
    }

    fn recorded_corruptions(
        store: &mut StateStore,
    ) -> Rc<RefCell<Vec<(CorruptionReason, Option<Vec<String>>)>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let seen_clone = Rc::clone(&seen);
        store.subscribe(StoreEventKind::Corruption, move |event| {
            if let StoreEvent::Corruption { reason, detail, .. } = event {
                seen_clone.borrow_mut().push((*reason, detail.clone()));
            }
        });
        seen
    }

    #[test]
    fn test_default_state_is_valid() {
        let store = StateStore::in_memory();
        let state = store.default_state();

        assert!(validate_state(&state).is_empty());
        assert_eq!(state.schema, STATE_SCHEMA);
        assert!(!state.bingo.has_bingo);
        assert_eq!(state.theme.id, "default");
        assert!(state.word_list.filename.is_empty());
    }

    #[test]
    fn test_first_load_is_fresh_then_loaded() {
        let mut store = store_with_fixed_clock(1000.0);

        let first = store.load();
        assert_eq!(first.status, LoadStatus::Fresh);

        let second = store.load();
        assert_eq!(second.status, LoadStatus::Loaded);
        assert_eq!(second.state, first.state);
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut store = store_with_fixed_clock(2000.0);
        let mut state = store.default_state();
        state.board = state.board.toggle_cell(0, 0).unwrap();
        state.bingo.has_bingo = false;
        state.word_list.filename = "animals.txt".to_string();

        let persisted = store.save(&state).unwrap();
        let loaded = store.load();

        assert_eq!(loaded.status, LoadStatus::Loaded);
        assert_eq!(loaded.state, persisted);
        assert!(loaded.state.board.cell(0, 0).unwrap().marked);
    }

    #[test]
    fn test_save_normalizes_schema_and_timestamp() {
        let mut store = store_with_fixed_clock(42.0);
        let mut state = store.default_state();
        state.schema = "something.else".to_string();
        state.meta.ts = -1.0;

        let persisted = store.save(&state).unwrap();

        assert_eq!(persisted.schema, STATE_SCHEMA);
        assert_eq!(persisted.meta.ts, 42.0);
    }

    #[test]
    fn test_save_rejects_invalid_board() {
        let mut store = StateStore::in_memory();
        let mut state = store.default_state();
        state.board.cells.pop();

        let err = store.save(&state).unwrap_err();
        match err {
            StoreError::InvalidState { errors } => {
                assert!(errors.iter().any(|e| e.contains("board.cells")));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_save_rejects_unmarked_free_cell() {
        let mut store = StateStore::in_memory();
        let mut state = store.default_state();
        for cell in state.board.cells.iter_mut() {
            if cell.is_free() {
                cell.marked = false;
            }
        }

        let err = store.save(&state).unwrap_err();
        assert_eq!(err.code(), "INVALID_STATE");
    }

    #[test]
    fn test_save_rejects_empty_theme() {
        let mut store = StateStore::in_memory();
        let mut state = store.default_state();
        state.theme.id = "  ".to_string();

        let err = store.save(&state).unwrap_err();
        match err {
            StoreError::InvalidState { errors } => {
                assert!(errors.iter().any(|e| e.contains("theme.id")));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_save_emits_change_event() {
        let mut store = StateStore::in_memory();
        let seen = Rc::new(RefCell::new(Vec::new()));

        let seen_clone = Rc::clone(&seen);
        store.subscribe(StoreEventKind::Change, move |event| {
            if let StoreEvent::Change { state } = event {
                seen_clone.borrow_mut().push(state.clone());
            }
        });

        let state = store.default_state();
        let persisted = store.save(&state).unwrap();

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0], persisted);
    }

    #[test]
    fn test_corrupt_json_resets_and_emits_parse_error() {
        let mut store = seeded_store("{not json at all");
        let corruptions = recorded_corruptions(&mut store);

        let outcome = store.load();
        assert_eq!(outcome.status, LoadStatus::Reset);
        assert!(validate_state(&outcome.state).is_empty());

        assert_eq!(corruptions.borrow().len(), 1);
        assert_eq!(corruptions.borrow()[0].0, CorruptionReason::ParseError);

        // A valid default state is persisted afterwards
        let next = store.load();
        assert_eq!(next.status, LoadStatus::Loaded);
        assert_eq!(next.state, outcome.state);
    }

    #[test]
    fn test_wrong_schema_resets_with_detail() {
        let mut state = StateStore::in_memory().default_state();
        state.schema = "bingo.state.v0".to_string();
        // Bypass save's normalization by writing the raw value directly
        let raw = serde_json::to_string(&state).unwrap();
        let mut store = seeded_store(&raw);
        let corruptions = recorded_corruptions(&mut store);

        let outcome = store.load();
        assert_eq!(outcome.status, LoadStatus::Reset);

        let recorded = corruptions.borrow();
        assert_eq!(recorded[0].0, CorruptionReason::SchemaInvalid);
        let detail = recorded[0].1.as_ref().unwrap();
        assert!(detail.iter().any(|e| e.contains("schema identifier")));
    }

    #[test]
    fn test_structurally_wrong_json_resets_as_schema_invalid() {
        let mut store = seeded_store("{\"schema\":\"bingo.state.v1\",\"board\":42}");
        let corruptions = recorded_corruptions(&mut store);

        let outcome = store.load();
        assert_eq!(outcome.status, LoadStatus::Reset);
        assert_eq!(corruptions.borrow()[0].0, CorruptionReason::SchemaInvalid);
    }

    #[test]
    fn test_clear_removes_state_and_emits_corruption() {
        let mut store = StateStore::in_memory();
        store.load(); // persist defaults
        let corruptions = recorded_corruptions(&mut store);

        store.clear(CorruptionReason::ManualClear);

        assert_eq!(corruptions.borrow().len(), 1);
        assert_eq!(corruptions.borrow()[0].0, CorruptionReason::ManualClear);

        // Key is gone, so the next load starts fresh
        let outcome = store.load();
        assert_eq!(outcome.status, LoadStatus::Fresh);
    }

    #[test]
    fn test_reset_to_defaults_persists_defaults() {
        let mut store = StateStore::in_memory();
        let mut state = store.default_state();
        state.word_list.filename = "custom.txt".to_string();
        store.save(&state).unwrap();

        let reset = store.reset_to_defaults(CorruptionReason::ManualReset);
        assert!(reset.word_list.filename.is_empty());

        let outcome = store.load();
        assert_eq!(outcome.status, LoadStatus::Loaded);
        assert_eq!(outcome.state, reset);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut store = StateStore::in_memory();
        let seen = Rc::new(RefCell::new(0));

        let seen_clone = Rc::clone(&seen);
        let id = store.subscribe(StoreEventKind::Change, move |_| {
            *seen_clone.borrow_mut() += 1;
        });
        assert!(store.unsubscribe(id));

        let state = store.default_state();
        store.save(&state).unwrap();
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn test_persisted_layout_uses_camel_case() {
        let store = store_with_fixed_clock(7.0);
        let json = serde_json::to_value(store.default_state()).unwrap();

        assert_eq!(json["schema"], serde_json::json!(STATE_SCHEMA));
        assert_eq!(json["bingo"]["hasBingo"], serde_json::json!(false));
        assert!(json["wordList"]["filename"].is_string());
        assert_eq!(json["meta"]["ts"], serde_json::json!(7.0));
    }

    #[test]
    fn test_file_backed_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = crate::storage::FileStorage::open(dir.path()).unwrap();
        let mut store = StateStore::new(Box::new(storage));

        let mut state = store.default_state();
        state.board = state.board.toggle_cell(1, 1).unwrap();
        store.save(&state).unwrap();

        // A second store over the same directory sees the saved snapshot
        let storage = crate::storage::FileStorage::open(dir.path()).unwrap();
        let mut reopened = StateStore::new(Box::new(storage));
        let outcome = reopened.load();

        assert_eq!(outcome.status, LoadStatus::Loaded);
        assert!(outcome.state.board.cell(1, 1).unwrap().marked);
    }
}
