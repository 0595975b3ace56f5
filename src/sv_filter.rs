//! Removal of artifact breakends from the breakend index prior to linking
//!
//! Filtering is a single pass over each chromosome's breakend list. SVs found to be artifacts are
//! queued with an exclusion reason, and all of their breakends are removed together once the full
//! pass is complete, so that list ranks stay valid during the scan.
//!

use std::collections::{BTreeMap, BTreeSet};

use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thousands::Separable;

use crate::breakend_index::ClusteringState;
use crate::config::LinkerConfig;
use crate::sv::SvType;
use crate::sv_graph::SvGraph;
use crate::utils::copy_numbers_equal;

#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    strum::Display,
    strum::EnumCount,
    strum::EnumIter,
    strum::EnumString,
)]
pub enum ExclusionReason {
    #[strum(serialize = "INF")]
    #[serde(rename = "INF")]
    MergedInferred,
    #[strum(serialize = "DUP_BE")]
    #[serde(rename = "DUP_BE")]
    DuplicateBreakend,
    #[strum(serialize = "LOW_VAF")]
    #[serde(rename = "LOW_VAF")]
    LowVaf,
    #[strum(serialize = "PAIR_INF")]
    #[serde(rename = "PAIR_INF")]
    PairedInferred,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct FilterStats {
    pub excluded_svs: BTreeMap<ExclusionReason, usize>,
    pub removed_breakends: usize,
}

struct SvFilter<'a> {
    graph: &'a SvGraph,
    state: &'a ClusteringState,
    config: &'a LinkerConfig,
    poly_a: Regex,

    /// SVs queued for exclusion
    pending: BTreeMap<usize, ExclusionReason>,
}

/// Pattern matching an A or T homopolymer of at least the given length
pub fn get_poly_a_regex(poly_a_length: usize) -> Result<Regex, regex::Error> {
    let n = poly_a_length;
    Regex::new(&format!("A{{{n},}}|T{{{n},}}"))
}

impl<'a> SvFilter<'a> {
    fn new(
        graph: &'a SvGraph,
        state: &'a ClusteringState,
        config: &'a LinkerConfig,
    ) -> Result<Self, regex::Error> {
        let poly_a = get_poly_a_regex(config.filter.poly_a_length)?;
        Ok(Self {
            graph,
            state,
            config,
            poly_a,
            pending: BTreeMap::new(),
        })
    }

    fn queue(&mut self, sv_index: usize, reason: ExclusionReason) {
        self.pending.entry(sv_index).or_insert(reason);
    }

    /// True if no breakend of another SV is within the isolation distance
    fn is_isolated(&self, breakend_index: usize) -> bool {
        let be = &self.graph.breakends[breakend_index];
        for forward in [false, true] {
            let mut current = breakend_index;
            while let Some(next) = self.state.adjacent(self.graph, current, forward) {
                let next_be = &self.graph.breakends[next];
                if (next_be.pos - be.pos).abs() < self.config.filter.isolated_breakend_distance {
                    if next_be.sv_index != be.sv_index {
                        return false;
                    }
                } else {
                    break;
                }
                current = next;
            }
        }
        true
    }

    /// Poly-A/T insert sequence or LINE repeat, indicating retrotransposition
    fn has_line_signature(&self, sv_index: usize) -> bool {
        let sv = &self.graph.svs[sv_index];
        sv.repeat_class.starts_with("LINE") || self.poly_a.is_match(&sv.insert_seq)
    }

    fn has_low_support(&self, sv_index: usize) -> bool {
        let filter = &self.config.filter;
        self.graph.svs[sv_index].has_low_support(filter.min_supporting_fragments, filter.low_vaf)
    }

    /// Rules applied to a single breakend in priority order
    fn check_breakend(&self, breakend_index: usize) -> Option<ExclusionReason> {
        let sv_index = self.graph.breakends[breakend_index].sv_index;
        let sv = &self.graph.svs[sv_index];
        match sv.sv_type {
            SvType::Sgl if sv.merged_inferred => Some(ExclusionReason::MergedInferred),
            SvType::Sgl if sv.is_equivalent => Some(ExclusionReason::DuplicateBreakend),
            SvType::Sgl | SvType::Bnd => {
                if self.has_low_support(sv_index)
                    && sv.breakend_indices().all(|x| self.is_isolated(x))
                    && !self.has_line_signature(sv_index)
                {
                    Some(ExclusionReason::LowVaf)
                } else {
                    None
                }
            }
            SvType::Inv => {
                let [Some(be1), Some(be2)] = sv.breakends else {
                    return None;
                };
                let (be1, be2) = (&self.graph.breakends[be1], &self.graph.breakends[be2]);
                if be1.chrom_index == be2.chrom_index
                    && (be2.pos - be1.pos).abs() < self.config.filter.short_inversion_length
                    && self.has_low_support(sv_index)
                {
                    Some(ExclusionReason::LowVaf)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Two inferred breakends with opposite orientation and matching JCN cancel out
    fn is_paired_inferred(&self, be1: usize, be2: usize) -> bool {
        let (sv1, sv2) = (self.graph.sv_of(be1), self.graph.sv_of(be2));
        sv1.sv_type == SvType::Inf
            && sv2.sv_type == SvType::Inf
            && self.graph.breakends[be1].dir != self.graph.breakends[be2].dir
            && copy_numbers_equal(sv1.jcn.point, sv2.jcn.point, &self.config.links)
    }

    fn has_assembly_support(&self, sv_index: usize) -> bool {
        self.graph.svs[sv_index]
            .breakend_indices()
            .any(|x| !self.graph.breakends[x].assembly_ids.is_empty())
    }

    /// Check adjacent same-orientation breakends for duplicates
    ///
    /// Returns the SV to drop if one is found.
    ///
    fn check_duplicate_pair(&self, be1: usize, be2: usize) -> Option<usize> {
        let filter = &self.config.filter;
        let (b1, b2) = (&self.graph.breakends[be1], &self.graph.breakends[be2]);
        if b1.dir != b2.dir {
            return None;
        }
        let (sv1, sv2) = (&self.graph.svs[b1.sv_index], &self.graph.svs[b2.sv_index]);
        let distance = (b2.pos - b1.pos).abs();

        if distance <= filter.duplicate_sgl_distance {
            if sv2.sv_type == SvType::Sgl {
                return Some(b2.sv_index);
            } else if sv1.sv_type == SvType::Sgl {
                return Some(b1.sv_index);
            }
        }

        if distance > filter.duplicate_breakend_distance
            || sv1.sv_type != sv2.sv_type
            || sv1.is_single_ended()
            || !(sv1.is_equivalent && sv2.is_equivalent)
        {
            return None;
        }

        let (Some(o1), Some(o2)) = (
            self.graph.other_breakend(be1),
            self.graph.other_breakend(be2),
        ) else {
            return None;
        };
        let (o1, o2) = (&self.graph.breakends[o1], &self.graph.breakends[o2]);
        if o1.chrom_index != o2.chrom_index
            || o1.dir != o2.dir
            || (o1.pos - o2.pos).abs() > filter.duplicate_breakend_distance
        {
            return None;
        }

        if self.has_assembly_support(b2.sv_index) && !self.has_assembly_support(b1.sv_index) {
            Some(b1.sv_index)
        } else {
            Some(b2.sv_index)
        }
    }

    fn filter_chrom(&mut self, chrom_index: usize) {
        let state = self.state;
        let list = &state.chrom_breakends[chrom_index];
        for rank in 0..list.len() {
            let breakend_index = list[rank];
            let sv_index = self.graph.breakends[breakend_index].sv_index;
            if self.pending.contains_key(&sv_index) {
                continue;
            }

            if let Some(reason) = self.check_breakend(breakend_index) {
                self.queue(sv_index, reason);
                continue;
            }

            let Some(&next_index) = list.get(rank + 1) else {
                continue;
            };
            let next_sv_index = self.graph.breakends[next_index].sv_index;
            if next_sv_index == sv_index || self.pending.contains_key(&next_sv_index) {
                continue;
            }

            if self.is_paired_inferred(breakend_index, next_index) {
                self.queue(sv_index, ExclusionReason::PairedInferred);
                self.queue(next_sv_index, ExclusionReason::PairedInferred);
            } else if let Some(drop_sv) = self.check_duplicate_pair(breakend_index, next_index) {
                self.queue(drop_sv, ExclusionReason::DuplicateBreakend);
            }
        }
    }

    /// Same orientation breakends of other SVs within the spanning distance
    fn spanning_partners(&self, breakend_index: usize) -> Vec<usize> {
        let be = &self.graph.breakends[breakend_index];
        let mut partners = Vec::new();
        for forward in [false, true] {
            let mut current = breakend_index;
            while let Some(next) = self.state.adjacent(self.graph, current, forward) {
                let next_be = &self.graph.breakends[next];
                if (next_be.pos - be.pos).abs() > self.config.filter.spanning_breakend_distance {
                    break;
                }
                if next_be.sv_index != be.sv_index
                    && next_be.dir == be.dir
                    && !self.graph.svs[next_be.sv_index].is_single_ended()
                    && !self.pending.contains_key(&next_be.sv_index)
                {
                    partners.push(next);
                }
                current = next;
            }
        }
        partners
    }

    /// Check whether an SV with a long insert sequence spans an assembled templated insertion
    ///
    /// This is the case when each of its breakends coincides with a breakend of a different SV,
    /// and the other ends of these two SVs are joined by assembly.
    ///
    fn is_spanning_sv(&self, sv_index: usize) -> bool {
        let sv = &self.graph.svs[sv_index];
        if sv.is_single_ended()
            || sv.insert_seq.len() < self.config.filter.min_spanning_insert_length
        {
            return false;
        }
        let [Some(start), Some(end)] = sv.breakends else {
            return false;
        };
        let start_partners = self.spanning_partners(start);
        let end_partners = self.spanning_partners(end);
        for &p1 in start_partners.iter() {
            for &p2 in end_partners.iter() {
                let (sv1, sv2) = (
                    self.graph.breakends[p1].sv_index,
                    self.graph.breakends[p2].sv_index,
                );
                if sv1 == sv2 {
                    continue;
                }
                let (Some(o1), Some(o2)) =
                    (self.graph.other_breakend(p1), self.graph.other_breakend(p2))
                else {
                    continue;
                };
                if self.graph.breakends[o1].shares_assembly_id(&self.graph.breakends[o2]) {
                    return true;
                }
            }
        }
        false
    }

    fn run(mut self) -> BTreeMap<usize, ExclusionReason> {
        for chrom_index in 0..self.state.chrom_breakends.len() {
            self.filter_chrom(chrom_index);
        }
        for sv_index in 0..self.graph.svs.len() {
            let sv = &self.graph.svs[sv_index];
            if sv.exclusion.is_some()
                || self.pending.contains_key(&sv_index)
                || sv.breakends[0].and_then(|x| self.graph.breakends[x].chrom_list_index).is_none()
            {
                continue;
            }
            if self.is_spanning_sv(sv_index) {
                self.queue(sv_index, ExclusionReason::DuplicateBreakend);
            }
        }
        self.pending
    }
}

/// Remove artifact SVs from the breakend index
///
/// Each excluded SV is marked with its exclusion reason, and all of its breakends are removed from
/// the index, including any breakend on a remote chromosome.
///
pub fn filter_breakends(
    graph: &mut SvGraph,
    state: &mut ClusteringState,
    config: &LinkerConfig,
) -> Result<FilterStats, regex::Error> {
    let pending = SvFilter::new(graph, state, config)?.run();

    let mut stats = FilterStats::default();
    let mut remove = BTreeSet::new();
    for (&sv_index, &reason) in pending.iter() {
        let sv = &mut graph.svs[sv_index];
        sv.exclusion = Some(reason);
        remove.extend(sv.breakend_indices());
        *stats.excluded_svs.entry(reason).or_insert(0) += 1;
    }
    stats.removed_breakends = remove.len();
    state.remove_breakends(graph, &remove);

    info!(
        "Filtered {} SVs, removing {} breakends",
        pending.len().separate_with_commas(),
        stats.removed_breakends.separate_with_commas()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sv::BreakendDirection;
    use crate::test_utils::*;

    fn run_filter(graph: &mut SvGraph) -> (ClusteringState, FilterStats) {
        let mut state = ClusteringState::populate(graph);
        let stats = filter_breakends(graph, &mut state, &LinkerConfig::default()).unwrap();
        assert!(state.check_order(graph).is_ok());
        (state, stats)
    }

    fn add_bnd(
        graph: &mut SvGraph,
        pos1: i64,
        dir1: BreakendDirection,
        pos2: i64,
        dir2: BreakendDirection,
    ) -> usize {
        add_test_sv(graph, SvType::Bnd, 1.0, &[(0, pos1, dir1), (1, pos2, dir2)])
    }

    #[test]
    fn test_duplicate_breakend_pair() {
        let mut graph = get_test_graph();
        add_test_sv(
            &mut graph,
            SvType::Del,
            1.0,
            &[(0, 100, LeftAnchor), (0, 900, RightAnchor)],
        );
        let bnd1 = add_bnd(&mut graph, 500, LeftAnchor, 1000, RightAnchor);
        let bnd2 = add_bnd(&mut graph, 500, LeftAnchor, 1010, RightAnchor);
        for sv_index in [bnd1, bnd2] {
            graph.svs[sv_index].is_equivalent = true;
        }
        let start = graph.svs[bnd1].breakends[0].unwrap();
        graph.breakends[start].assembly_ids.push("asm1".to_string());

        let (state, stats) = run_filter(&mut graph);
        assert_eq!(state.chrom_breakends[0].len(), 3);
        assert_eq!(state.chrom_breakends[1].len(), 1);
        assert_eq!(graph.svs[bnd2].exclusion, Some(ExclusionReason::DuplicateBreakend));
        assert_eq!(graph.svs[bnd1].exclusion, None);
        assert_eq!(stats.removed_breakends, 2);
    }

    #[test]
    fn test_duplicate_requires_matching_far_ends() {
        let mut graph = get_test_graph();
        let bnd1 = add_bnd(&mut graph, 500, LeftAnchor, 1000, RightAnchor);
        let bnd2 = add_bnd(&mut graph, 500, LeftAnchor, 9000, RightAnchor);
        for sv_index in [bnd1, bnd2] {
            graph.svs[sv_index].is_equivalent = true;
        }
        let (state, _) = run_filter(&mut graph);
        assert_eq!(state.chrom_breakends[0].len(), 2);
    }

    #[test]
    fn test_single_breakend_rules() {
        let mut graph = get_test_graph();
        add_test_sv(
            &mut graph,
            SvType::Del,
            1.0,
            &[(0, 1000, LeftAnchor), (0, 3000, RightAnchor)],
        );
        let merged = add_test_sv(&mut graph, SvType::Sgl, 1.0, &[(0, 1500, LeftAnchor)]);
        graph.svs[merged].merged_inferred = true;
        let equiv = add_test_sv(&mut graph, SvType::Sgl, 1.0, &[(0, 1600, LeftAnchor)]);
        graph.svs[equiv].is_equivalent = true;
        let dup_sgl = add_test_sv(&mut graph, SvType::Sgl, 1.0, &[(0, 3001, RightAnchor)]);

        let (state, stats) = run_filter(&mut graph);
        assert_eq!(graph.svs[merged].exclusion, Some(ExclusionReason::MergedInferred));
        assert_eq!(graph.svs[equiv].exclusion, Some(ExclusionReason::DuplicateBreakend));
        assert_eq!(graph.svs[dup_sgl].exclusion, Some(ExclusionReason::DuplicateBreakend));
        assert_eq!(state.chrom_breakends[0].len(), 2);
        assert_eq!(stats.excluded_svs[&ExclusionReason::DuplicateBreakend], 2);
    }

    #[test]
    fn test_isolated_low_support_translocation() {
        let mut graph = get_test_graph();
        let isolated = add_bnd(&mut graph, 50_000, LeftAnchor, 50_000, RightAnchor);
        graph.svs[isolated].supporting_fragments = 2;
        let line = add_bnd(&mut graph, 500_000, LeftAnchor, 500_000, RightAnchor);
        graph.svs[line].supporting_fragments = 2;
        graph.svs[line].insert_seq = "CGTAAAAAAAAAAAAAG".to_string();
        let near = add_bnd(&mut graph, 900_000, LeftAnchor, 900_000, RightAnchor);
        graph.svs[near].vaf = [0.5, 0.01];
        add_test_sv(&mut graph, SvType::Sgl, 1.0, &[(1, 903_000, LeftAnchor)]);

        run_filter(&mut graph);
        assert_eq!(graph.svs[isolated].exclusion, Some(ExclusionReason::LowVaf));
        assert_eq!(graph.svs[line].exclusion, None);
        assert_eq!(graph.svs[near].exclusion, None);
    }

    #[test]
    fn test_short_inversion() {
        let mut graph = get_test_graph();
        let inv = add_test_sv(
            &mut graph,
            SvType::Inv,
            1.0,
            &[(0, 1000, LeftAnchor), (0, 1050, LeftAnchor)],
        );
        graph.svs[inv].vaf = [0.02, 0.3];
        let long_inv = add_test_sv(
            &mut graph,
            SvType::Inv,
            1.0,
            &[(0, 5000, RightAnchor), (0, 5500, RightAnchor)],
        );
        graph.svs[long_inv].vaf = [0.02, 0.3];
        run_filter(&mut graph);
        assert_eq!(graph.svs[inv].exclusion, Some(ExclusionReason::LowVaf));
        assert_eq!(graph.svs[long_inv].exclusion, None);
    }

    #[test]
    fn test_paired_inferred() {
        let mut graph = get_test_graph();
        let inf1 = add_test_sv(&mut graph, SvType::Inf, 2.0, &[(0, 1000, LeftAnchor)]);
        let inf2 = add_test_sv(&mut graph, SvType::Inf, 2.2, &[(0, 1200, RightAnchor)]);
        let inf3 = add_test_sv(&mut graph, SvType::Inf, 6.0, &[(0, 5000, LeftAnchor)]);
        let inf4 = add_test_sv(&mut graph, SvType::Inf, 1.0, &[(0, 5200, RightAnchor)]);
        let (state, stats) = run_filter(&mut graph);
        assert_eq!(graph.svs[inf1].exclusion, Some(ExclusionReason::PairedInferred));
        assert_eq!(graph.svs[inf2].exclusion, Some(ExclusionReason::PairedInferred));
        assert_eq!(graph.svs[inf3].exclusion, None);
        assert_eq!(graph.svs[inf4].exclusion, None);
        assert_eq!(state.chrom_breakends[0].len(), 2);
        assert_eq!(stats.excluded_svs[&ExclusionReason::PairedInferred], 2);
    }

    #[test]
    fn test_spanning_sv() {
        let mut graph = get_test_graph();
        // Direct junction from chr1:10000 to chr1:20000 carrying the templated insertion sequence
        let spanning = add_test_sv(
            &mut graph,
            SvType::Del,
            1.0,
            &[(0, 10_000, LeftAnchor), (0, 20_000, RightAnchor)],
        );
        graph.svs[spanning].insert_seq = "ACGT".repeat(20);
        // Two BNDs routing the same junction through a templated insertion on chr2
        let bnd1 = add_bnd(&mut graph, 10_001, LeftAnchor, 5000, RightAnchor);
        let bnd2 = add_test_sv(
            &mut graph,
            SvType::Bnd,
            1.0,
            &[(1, 5400, LeftAnchor), (0, 20_000, RightAnchor)],
        );
        for (sv_index, side) in [(bnd1, 1), (bnd2, 0)] {
            let be = graph.svs[sv_index].breakends[side].unwrap();
            graph.breakends[be].assembly_ids.push("asm7".to_string());
        }

        let (state, _) = run_filter(&mut graph);
        assert_eq!(graph.svs[spanning].exclusion, Some(ExclusionReason::DuplicateBreakend));
        assert_eq!(graph.svs[bnd1].exclusion, None);
        assert_eq!(graph.svs[bnd2].exclusion, None);
        assert_eq!(state.chrom_breakends[0].len(), 2);
    }

    #[test]
    fn test_poly_a_regex() {
        let poly_a = get_poly_a_regex(4).unwrap();
        assert!(poly_a.is_match("CGTTTTG"));
        assert!(!poly_a.is_match("CAAAGTTT"));

        // Repetition counts beyond the regex limit are reported as errors
        assert!(get_poly_a_regex(usize::MAX).is_err());
        let mut config = LinkerConfig::default();
        config.filter.poly_a_length = usize::MAX;
        let mut graph = get_test_graph();
        let mut state = ClusteringState::populate(&mut graph);
        assert!(filter_breakends(&mut graph, &mut state, &config).is_err());
    }
}
