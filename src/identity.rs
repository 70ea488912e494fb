//! Tracking of channels that hold bit-identical data.
//!
//! The graph is only ever replaced by a recomputed value; it stays reflexive and
//! symmetric after every operation.

use crate::foundation::{
    core::{Channel, ChannelSet},
    error::{ChanError, ChanResult},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IdentityGraph {
    // linked[a][b]: channel slot a is known to equal channel slot b.
    linked: [[bool; 3]; 3],
}

impl Default for IdentityGraph {
    fn default() -> Self {
        Self::trivial()
    }
}

impl IdentityGraph {
    /// Every channel identical only to itself.
    pub fn trivial() -> Self {
        let mut linked = [[false; 3]; 3];
        for (i, row) in linked.iter_mut().enumerate() {
            row[i] = true;
        }
        Self { linked }
    }

    /// Build a graph from explicit pairs; the closure is made reflexive and symmetric.
    pub fn from_pairs(pairs: &[(Channel, Channel)]) -> Self {
        let mut g = Self::trivial();
        for &(a, b) in pairs {
            g.link(a, b);
        }
        g
    }

    /// Build a graph from raw rows without repairing it. Used by callers handing
    /// over a graph they computed elsewhere; see [`ChannelIdentityTracker::set`].
    pub fn from_rows(rows: [(Channel, ChannelSet); 3]) -> Self {
        let mut linked = [[false; 3]; 3];
        for (channel, set) in rows {
            for other in set.iter() {
                linked[channel.slot()][other.slot()] = true;
            }
        }
        Self { linked }
    }

    pub fn query(&self, channel: Channel) -> ChannelSet {
        Channel::ALL
            .into_iter()
            .filter(|other| self.linked[channel.slot()][other.slot()])
            .collect()
    }

    pub fn is_identical(&self, a: Channel, b: Channel) -> bool {
        self.linked[a.slot()][b.slot()]
    }

    pub fn is_symmetric(&self) -> bool {
        (0..3).all(|a| (0..3).all(|b| self.linked[a][b] == self.linked[b][a]))
    }

    pub fn is_reflexive(&self) -> bool {
        (0..3).all(|a| self.linked[a][a])
    }

    /// `true` when every pair inside `set` is known identical.
    pub fn all_identical(&self, set: &ChannelSet) -> bool {
        set.iter()
            .all(|a| set.iter().all(|b| self.is_identical(a, b)))
    }

    /// Channels sharing data with at least one other channel.
    pub fn linked_channels(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|&c| self.query(c).len() > 1)
            .collect()
    }

    /// Graph after convolving `convolved` with one kernel.
    ///
    /// Channels convolved together keep their mutual identity (same input, same
    /// kernel). A convolved channel loses identity with every untouched channel.
    pub fn after_convolve(&self, convolved: &ChannelSet) -> Self {
        let mut next = self.clone();
        for c in convolved.iter() {
            for other in Channel::ALL {
                if other != c && !convolved.contains(other) && self.is_identical(c, other) {
                    next.unlink(c, other);
                }
            }
        }
        next
    }

    /// Graph after writing one merged plane into every channel of `flattened`.
    pub fn after_flatten(&self, flattened: &ChannelSet) -> Self {
        let mut next = self.clone();
        for c in flattened.iter() {
            for other in Channel::ALL {
                if other != c {
                    next.unlink(c, other);
                }
            }
        }
        for a in flattened.iter() {
            for b in flattened.iter() {
                next.link(a, b);
            }
        }
        next
    }

    fn link(&mut self, a: Channel, b: Channel) {
        self.linked[a.slot()][b.slot()] = true;
        self.linked[b.slot()][a.slot()] = true;
    }

    fn unlink(&mut self, a: Channel, b: Channel) {
        self.linked[a.slot()][b.slot()] = false;
        self.linked[b.slot()][a.slot()] = false;
    }
}

/// Holder of the current [`IdentityGraph`] for hosts that want an owned tracker.
#[derive(Clone, Debug, Default)]
pub struct ChannelIdentityTracker {
    graph: IdentityGraph,
}

impl ChannelIdentityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.graph = IdentityGraph::trivial();
    }

    pub fn set(&mut self, graph: IdentityGraph) -> ChanResult<()> {
        if !graph.is_reflexive() || !graph.is_symmetric() {
            return Err(ChanError::parameter(
                "identity graph must be reflexive and symmetric",
            ));
        }
        self.graph = graph;
        Ok(())
    }

    pub fn query(&self, channel: Channel) -> ChannelSet {
        self.graph.query(channel)
    }

    pub fn graph(&self) -> &IdentityGraph {
        &self.graph
    }
}
