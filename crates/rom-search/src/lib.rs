//! ROM Search Engine
//!
//! This crate enumerates every device sharing a wired-AND line, learning
//! their ids purely from how their answers collide.
//!
//! # Architecture
//!
//! The search is an iterative walk of the binary trie of possible ids:
//!
//! - **Frontier**: every branch discovered so far, in discovery order. Forks
//!   append to it; nothing is removed.
//! - **SearchEngine**: repeatedly takes the first incomplete branch, resets
//!   the bus, replays the branch's prefix and extends it until the bus reports
//!   the branch exhausted.
//! - **BusLink**: the half-duplex byte link the engine drives the bus through.
//!
//! The engine never sees device ids directly, only the two-bit digit each
//! read pair produces.
//!
//! # Example
//!
//! ```rust,no_run
//! use rom_search::SearchEngine;
//!
//! # async fn demo(stream: tokio::io::DuplexStream) -> Result<(), rom_search::SearchError> {
//! let mut engine = SearchEngine::new(stream);
//! let frontier = engine.run().await?;
//!
//! for id in frontier.discovered() {
//!     println!("found {} ({} bits)", id.value, id.width);
//! }
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod error;
pub mod frontier;
pub mod link;

pub use engine::{SearchConfig, SearchEngine, SearchStats};
pub use error::{FaultKind, SearchError};
pub use frontier::{BranchHandle, DiscoveredId, Frontier, SearchBranch};
pub use link::BusLink;
