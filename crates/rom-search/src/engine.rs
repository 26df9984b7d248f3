//! Search engine
//!
//! Walks the trie of possible ids one branch at a time. For each branch the
//! bus is reset and the branch's stored prefix is replayed so every device is
//! back in the state it was in when the branch was last extended. After that
//! each read pair decides the next bit:
//!
//! - forced 0 / forced 1: take that bit
//! - contested: defer the 1-path as a new branch, take 0 here
//! - exhausted: the branch is a complete id
//!
//! The outer loop keeps picking the first incomplete branch from the
//! [`Frontier`] until there is none left.

use rom_protocol::{Command, Digit, MAX_ROM_BITS};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

use crate::error::SearchError;
use crate::frontier::{BranchHandle, Frontier, SearchBranch};
use crate::link::BusLink;

/// Search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Longest prefix a branch may grow to
    pub max_bits: u8,
    /// Ask the bus to turn on verbose tracing before searching
    pub request_trace: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_bits: MAX_ROM_BITS,
            request_trace: false,
        }
    }
}

/// Counters collected over a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Branches driven (one reset each)
    pub drives: u64,
    /// Read pairs issued, replays included
    pub read_pairs: u64,
    /// Read pairs spent replaying stored prefixes
    pub replay_pairs: u64,
    /// Read pairs that resolved a new bit
    pub resolving_pairs: u64,
    /// Contested positions that spawned a new branch
    pub forks: u64,
}

/// Drives the ROM search protocol over a bus link
pub struct SearchEngine<T> {
    link: BusLink<T>,
    config: SearchConfig,
    stats: SearchStats,
}

impl<T> SearchEngine<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create an engine with default configuration
    pub fn new(io: T) -> Self {
        Self::with_config(io, SearchConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(io: T, mut config: SearchConfig) -> Self {
        if config.max_bits > MAX_ROM_BITS {
            warn!(
                "max_bits {} exceeds the widest id, clamping to {}",
                config.max_bits, MAX_ROM_BITS
            );
            config.max_bits = MAX_ROM_BITS;
        }
        Self {
            link: BusLink::new(io),
            config,
            stats: SearchStats::default(),
        }
    }

    /// Get the current configuration
    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Counters from the last run
    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    /// Recover the underlying stream
    pub fn into_inner(self) -> T {
        self.link.into_inner()
    }

    /// Enumerate every device on the bus
    ///
    /// The bus is told to quit when the run ends, whether it succeeded or not.
    pub async fn run(&mut self) -> Result<Frontier, SearchError> {
        self.stats = SearchStats::default();
        let pairs_before = self.link.read_pairs();
        let result = self.search().await;
        self.stats.read_pairs = self.link.read_pairs() - pairs_before;

        match &result {
            Ok(frontier) => info!(
                "Search complete: {} devices, {} read pairs ({} replayed), {} forks",
                frontier.completed().count(),
                self.stats.read_pairs,
                self.stats.replay_pairs,
                self.stats.forks
            ),
            Err(e) => error!("Search aborted: {}", e),
        }
        if let Err(e) = self.quit().await {
            warn!("Failed to send quit to bus: {}", e);
        }

        result
    }

    /// Tell the bus to terminate
    ///
    /// [`run`](Self::run) does this itself on the way out. Call it after a run
    /// was cancelled before it could finish.
    pub async fn quit(&mut self) -> Result<(), SearchError> {
        debug!("Sending quit to bus");
        self.link.send(Command::Quit).await
    }

    async fn search(&mut self) -> Result<Frontier, SearchError> {
        if self.config.request_trace {
            self.link.send(Command::Verbose).await?;
        }

        let mut frontier = Frontier::new();
        while let Some(handle) = frontier.first_incomplete() {
            self.drive_branch(&mut frontier, handle).await?;

            if let Some(id) = frontier.get(handle).and_then(SearchBranch::rom_id) {
                info!("Found device {}", id);
            } else {
                warn!("Branch {} completed without any device", handle.index());
            }
        }

        Ok(frontier)
    }

    /// Drive one branch from a fresh reset until the bus reports it exhausted
    async fn drive_branch(
        &mut self,
        frontier: &mut Frontier,
        handle: BranchHandle,
    ) -> Result<(), SearchError> {
        let Some(branch) = frontier.get(handle) else {
            return Err(SearchError::UnknownBranch(handle.index()));
        };
        let bits = branch.bits().to_vec();
        let digits = branch.digits().to_vec();
        let max_bits = self.config.max_bits;

        debug!(
            "Driving branch {} from {} resolved bits",
            handle.index(),
            bits.len()
        );
        self.stats.drives += 1;
        self.link.send(Command::Reset).await?;
        self.link.send(Command::Search).await?;

        for (position, (&bit, &expected)) in bits.iter().zip(&digits).enumerate() {
            let observed = self.link.read_digit().await?;
            self.stats.replay_pairs += 1;
            if observed != expected {
                return Err(SearchError::ReplayDiverged {
                    position,
                    expected,
                    observed,
                });
            }
            self.link.send(Command::WriteBit(bit)).await?;
        }

        loop {
            let digit = self.link.read_digit().await?;
            let position = frontier.get(handle).map_or(0, SearchBranch::len);
            debug!("bit {}: {}", position, digit);

            let bit = match digit {
                Digit::ForcedZero => false,
                Digit::ForcedOne => true,
                Digit::Contested => {
                    if let Some(mut fork) = frontier.get(handle).cloned() {
                        fork.push_bit(true, Digit::Contested, max_bits)?;
                        let forked = frontier.push(fork);
                        self.stats.forks += 1;
                        debug!("Forked branch {} at bit {}", forked.index(), position);
                    }
                    false
                }
                Digit::Exhausted => {
                    if let Some(branch) = frontier.get_mut(handle) {
                        branch.mark_complete();
                    }
                    return Ok(());
                }
            };

            if let Some(branch) = frontier.get_mut(handle) {
                branch.push_bit(bit, digit, max_bits)?;
            }
            self.stats.resolving_pairs += 1;
            self.link.send(Command::WriteBit(bit)).await?;
        }
    }
}
