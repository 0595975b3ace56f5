//! Linked breakend pairs forming the edges of the breakend graph
//!

use serde::Serialize;

use crate::config::LinkConfig;
use crate::sv::{Breakend, BreakendDirection};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, strum::Display, strum::EnumCount)]
pub enum LinkType {
    #[strum(serialize = "TI")]
    TemplatedInsertion,
    #[strum(serialize = "DB")]
    DeletionBridge,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, strum::Display, strum::EnumCount)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LinkSource {
    Assembled,
    Inferred,
}

#[derive(Clone, Debug)]
pub struct LinkedPair {
    pub link_type: LinkType,
    pub source: LinkSource,

    /// Breakend indices ordered by position
    pub lower_breakend: usize,
    pub upper_breakend: usize,

    pub length: i64,

    /// A facing pair closer than the min templated insertion length, stored as a bridge
    pub is_short_overlap: bool,

    /// Cleared when the link has been displaced by a better candidate
    pub is_active: bool,
}

impl LinkedPair {
    pub fn breakends(&self) -> [usize; 2] {
        [self.lower_breakend, self.upper_breakend]
    }

    /// Get the breakend index on the other side of the link
    pub fn other_breakend(&self, breakend_index: usize) -> usize {
        if breakend_index == self.lower_breakend {
            self.upper_breakend
        } else {
            self.lower_breakend
        }
    }

    pub fn has_breakend(&self, breakend_index: usize) -> bool {
        self.lower_breakend == breakend_index || self.upper_breakend == breakend_index
    }
}

/// Min templated insertion length for a link between the two breakends
pub fn min_templated_insertion_length(be1: &Breakend, be2: &Breakend, config: &LinkConfig) -> i64 {
    config
        .min_templated_insertion_length
        .max(be1.anchor_distance)
        .max(be2.anchor_distance)
}

/// Order two breakends by position, returning None if they are on different chromosomes
pub fn order_breakends<'a>(
    be1: &'a Breakend,
    be2: &'a Breakend,
) -> Option<(&'a Breakend, &'a Breakend)> {
    if be1.chrom_index != be2.chrom_index {
        None
    } else if be1.pos <= be2.pos {
        Some((be1, be2))
    } else {
        Some((be2, be1))
    }
}

/// Return the templated insertion length if the two breakends face each other
///
/// The lower breakend must be right-anchored and the upper breakend left-anchored.
///
pub fn facing_distance(be1: &Breakend, be2: &Breakend) -> Option<i64> {
    let (lower, upper) = order_breakends(be1, be2)?;
    if lower.dir == BreakendDirection::RightAnchor && upper.dir == BreakendDirection::LeftAnchor {
        Some(upper.pos - lower.pos)
    } else {
        None
    }
}

/// Return the deletion bridge length if the two breakends face away from each other
///
pub fn bridge_distance(be1: &Breakend, be2: &Breakend) -> Option<i64> {
    let (lower, upper) = order_breakends(be1, be2)?;
    if lower.dir == BreakendDirection::LeftAnchor && upper.dir == BreakendDirection::RightAnchor {
        Some((upper.pos - lower.pos - 1).max(0))
    } else {
        None
    }
}
