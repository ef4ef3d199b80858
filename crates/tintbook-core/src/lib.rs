//! Tintbook Core Library
//!
//! Renderer-agnostic drawing actions, undo history, flood fill and
//! local-first progress sync for Tintbook coloring pages.

pub mod action;
pub mod autocolor;
pub mod config;
pub mod fill;
pub mod history;
pub mod normalize;
pub mod preview;
pub mod progress;
pub mod session;
pub mod storage;
pub mod sync;

pub use action::{Action, ActionError, ActionKind, ActionRecord, Color, Fill, MagicFill, Sticker, Stroke};
pub use autocolor::{ColorMap, FillPoint, RegionClassifier, assign_colors, magic_fill_action};
pub use config::SyncConfig;
pub use fill::{BoundaryRule, FillEngine, FillOptions, Region, RegionOptions, enumerate_regions};
pub use history::History;
pub use normalize::{normalize_action, normalize_actions};
pub use progress::{ProgressRecord, SaveRejected, SaveRequest, apply_save};
pub use session::{ColoringSession, SaveJob};
pub use storage::{LocalProgress, LocalStore, MemoryStore, ProgressKey, StorageError};
pub use sync::{ApiError, ProgressApi, SyncClient, SyncOutcome, SyncState};

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStore;
#[cfg(not(target_arch = "wasm32"))]
pub use sync::HttpProgressApi;
