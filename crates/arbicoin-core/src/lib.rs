//! ArbiCoin - a tap-to-earn clicker game engine
//!
//! This crate provides the core game logic for ArbiCoin, including:
//! - Tap economy with energy and leveling
//! - Upgrade economy with growing costs
//! - Snapshots and save-slot persistence
//! - A read model for front-ends and a wallet display model
//!
//! # Architecture
//!
//! The engine is platform-agnostic and owns no timers. It can be compiled to:
//! - Native Rust for the session server
//! - WebAssembly for the browser, persisting to `localStorage`
//!
//! # Modules
//!
//! - [`game`]: Game state and transition rules
//! - [`engine`]: State bound to a save slot
//! - [`upgrades`]: Upgrade kinds and cost growth
//! - [`snapshot`]: Serializable snapshots and restore merging
//! - [`storage`]: Persistence adapters
//! - [`view`]: Presentation read model
//! - [`wallet`]: Wallet display model

pub mod actions;
pub mod engine;
pub mod game;
pub mod snapshot;
pub mod storage;
pub mod upgrades;
pub mod view;
pub mod wallet;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent};
pub use engine::GameEngine;
pub use game::{level_for_taps, GameError, GameState, PurchaseOutcome, RegenOutcome, TapOutcome};
pub use snapshot::{Snapshot, SnapshotError, UpgradeSnapshot};
#[cfg(feature = "wasm")]
pub use storage::LocalStorage;
pub use storage::{FileStorage, MemoryStorage, SaveSlot, Storage, StorageError, DEFAULT_SLOT};
pub use upgrades::{Upgrade, UpgradeKind, Upgrades};
pub use view::{GameView, UpgradeView};
pub use wallet::{parse_wei, Network, WalletStatus, WalletView, ARBITRUM_ONE_CHAIN_ID};
