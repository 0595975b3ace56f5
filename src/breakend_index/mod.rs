//! Chromosome ordered breakend index for one sample
//!
//! Every chromosome holds a list of breakend indices sorted by position. Each indexed breakend
//! stores its rank in this list, and the ranks are rebuilt after any removal.
//!

mod cn_events;
mod length_cutoffs;
mod nearest_sv;

use std::collections::BTreeSet;

use log::error;
use simple_error::{SimpleResult, bail};

pub use self::cn_events::{CnEventMatchStats, associate_cn_events};
pub use self::length_cutoffs::{LengthCutoffs, compute_length_cutoffs};
pub use self::nearest_sv::annotate_nearest_svs;
use crate::config::LengthCutoffConfig;
use crate::sv_graph::SvGraph;

#[derive(Default)]
pub struct ClusteringState {
    /// Position sorted breakend indices for each chromosome
    pub chrom_breakends: Vec<Vec<usize>>,

    pub length_cutoffs: LengthCutoffs,
}

impl ClusteringState {
    /// Build the index from every breakend of every SV not yet excluded
    ///
    /// Breakends at the same position are ordered by SV index, then start before end.
    ///
    pub fn populate(graph: &mut SvGraph) -> Self {
        let mut chrom_breakends = vec![Vec::new(); graph.chrom_list.len()];
        for sv in graph.svs.iter().filter(|x| x.exclusion.is_none()) {
            for breakend_index in sv.breakend_indices() {
                let chrom_index = graph.breakends[breakend_index].chrom_index;
                chrom_breakends[chrom_index].push(breakend_index);
            }
        }

        let mut state = Self {
            chrom_breakends,
            length_cutoffs: LengthCutoffs::default(),
        };
        for chrom_index in 0..state.chrom_breakends.len() {
            let breakends = &graph.breakends;
            state.chrom_breakends[chrom_index].sort_by_key(|&x| {
                let be = &breakends[x];
                (be.pos, be.sv_index, !be.is_start)
            });
            state.reindex_chrom(graph, chrom_index);
        }
        state
    }

    /// Assign each breakend of the chromosome its current list rank
    fn reindex_chrom(&self, graph: &mut SvGraph, chrom_index: usize) {
        for (rank, &breakend_index) in self.chrom_breakends[chrom_index].iter().enumerate() {
            graph.breakends[breakend_index].chrom_list_index = Some(rank);
        }
    }

    pub fn breakend_count(&self) -> usize {
        self.chrom_breakends.iter().map(|x| x.len()).sum()
    }

    /// Get the breakend index adjacent to the given breakend in its chromosome list
    ///
    /// # Arguments
    /// * `forward` - If true get the next higher breakend, otherwise the next lower
    ///
    pub fn adjacent(&self, graph: &SvGraph, breakend_index: usize, forward: bool) -> Option<usize> {
        let be = &graph.breakends[breakend_index];
        let rank = be.chrom_list_index?;
        let list = &self.chrom_breakends[be.chrom_index];
        if forward {
            list.get(rank + 1).copied()
        } else if rank > 0 {
            list.get(rank - 1).copied()
        } else {
            None
        }
    }

    /// Remove a set of breakends from all chromosome lists, and reindex every modified list
    ///
    pub fn remove_breakends(&mut self, graph: &mut SvGraph, remove: &BTreeSet<usize>) {
        if remove.is_empty() {
            return;
        }
        for chrom_index in 0..self.chrom_breakends.len() {
            let list = &mut self.chrom_breakends[chrom_index];
            let before = list.len();
            list.retain(|x| !remove.contains(x));
            if list.len() != before {
                self.reindex_chrom(graph, chrom_index);
            }
        }
        for &breakend_index in remove.iter() {
            graph.breakends[breakend_index].chrom_list_index = None;
        }
    }

    /// Verify ordering and rank consistency of every chromosome list
    ///
    pub fn check_order(&self, graph: &SvGraph) -> SimpleResult<()> {
        for (chrom_index, list) in self.chrom_breakends.iter().enumerate() {
            for (rank, &breakend_index) in list.iter().enumerate() {
                let be = &graph.breakends[breakend_index];
                if be.chrom_list_index != Some(rank) {
                    bail!(
                        "Stale breakend index on {} at rank {rank}: {:?}",
                        graph.chrom_list.label(chrom_index),
                        be
                    );
                }
                if rank > 0 && graph.breakends[list[rank - 1]].pos > be.pos {
                    bail!(
                        "Breakend list out of order on {} at rank {rank}",
                        graph.chrom_list.label(chrom_index)
                    );
                }
            }
        }
        Ok(())
    }

    /// Log and return false if the index is inconsistent
    pub fn is_valid(&self, graph: &SvGraph) -> bool {
        match self.check_order(graph) {
            Ok(_) => true,
            Err(msg) => {
                error!("Breakend index check failed: {msg}");
                false
            }
        }
    }

    /// Clear the index and all index-derived annotations from the graph
    pub fn reset(&mut self, graph: &mut SvGraph) {
        for list in self.chrom_breakends.iter() {
            for &breakend_index in list.iter() {
                graph.breakends[breakend_index].chrom_list_index = None;
            }
        }
        for be in graph.breakends.iter_mut() {
            be.cn_events.clear();
        }
        for event in graph.cn_events.iter_mut() {
            event.breakends = [None, None];
        }
        self.chrom_breakends.clear();
        self.length_cutoffs = LengthCutoffs::default();
    }

    /// Run all index annotation steps that follow noise filtering
    pub fn prepare(&mut self, graph: &mut SvGraph, config: &LengthCutoffConfig) -> CnEventMatchStats {
        self.length_cutoffs = compute_length_cutoffs(graph, self, config);
        annotate_nearest_svs(graph, self);
        associate_cn_events(graph, self)
    }
}
