//! # needlemap
//!
//! Recoverable compact index for an append-only needle store:
//! - Maps a 64-bit needle key to (offset, size) in a separate data file
//! - Persists every mutation as a 16-byte record in an append-only log
//! - Rebuilds the index and its counters after restart by replaying the log
//! - Tolerates a torn final record left by a crash mid-append
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        NeedleMap                             │
//! │        put / get / delete / close / destroy + counters       │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Index Log  │          │ CompactMap  │
//!   │  (Append)   │          │ (sharded    │
//!   │  (Replay)   │          │  open addr) │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use needlemap::{Config, NeedleMap};
//!
//! let mut nm = NeedleMap::open("/tmp/1.idx", Config::default())?;
//! nm.put(1, 5, 100)?;
//! assert_eq!(nm.get(1).map(|v| v.size), Some(100));
//! nm.delete(1)?;
//! # Ok::<(), needlemap::NeedleMapError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod index;
pub mod compact;
pub mod needle_map;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{NeedleMapError, Result};
pub use config::{Config, SyncStrategy};
pub use compact::{CompactMap, NeedleValue};
pub use needle_map::{MapMetrics, NeedleMap};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of needlemap
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
