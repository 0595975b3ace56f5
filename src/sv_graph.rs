//! Arena holding every SV, breakend, link and copy number event of one sample
//!
//! All cross references between these entities are indices into the arena vectors.
//!

use crate::chrom_list::ChromList;
use crate::copy_number::{CnEvent, CopyNumberData};
use crate::links::LinkedPair;
use crate::sv::{Breakend, StructuralVariant};

#[derive(Clone, Debug, Default)]
pub struct SvGraph {
    pub chrom_list: ChromList,
    pub svs: Vec<StructuralVariant>,
    pub breakends: Vec<Breakend>,
    pub links: Vec<LinkedPair>,
    pub cn_events: Vec<CnEvent>,
    pub copy_number: CopyNumberData,
}

impl SvGraph {
    pub fn sv_of(&self, breakend_index: usize) -> &StructuralVariant {
        &self.svs[self.breakends[breakend_index].sv_index]
    }

    /// Get the breakend on the other side of the same SV, if there is one
    pub fn other_breakend(&self, breakend_index: usize) -> Option<usize> {
        let be = &self.breakends[breakend_index];
        let sv = &self.svs[be.sv_index];
        let other_side = if be.is_start { 1 } else { 0 };
        sv.breakends[other_side]
    }

    /// Append a link to the arena and return its index
    pub fn add_link(&mut self, link: LinkedPair) -> usize {
        self.links.push(link);
        self.links.len() - 1
    }

    pub fn jcn_of(&self, breakend_index: usize) -> f64 {
        self.sv_of(breakend_index).jcn.point
    }
}
