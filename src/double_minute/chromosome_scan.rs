use std::collections::BTreeSet;

use log::{debug, info};

use super::DmCandidate;
use crate::breakend_index::ClusteringState;
use crate::config::DoubleMinuteConfig;
use crate::sv::BreakendDirection;
use crate::sv_graph::SvGraph;

/// Find the breakend closing a templated insertion loop from the remote side of a breakend's SV
///
/// The remote breakend must be linked by a templated insertion to another SV whose far side
/// returns to the arm of the starting breakend, with JCN consistent with the starting breakend.
///
fn get_remote_return_breakend(
    graph: &SvGraph,
    breakend_index: usize,
    config: &DoubleMinuteConfig,
) -> Option<usize> {
    let be = &graph.breakends[breakend_index];
    let remote_index = graph.other_breakend(breakend_index)?;
    let remote = &graph.breakends[remote_index];
    if remote.chrom_index == be.chrom_index {
        return None;
    }
    let min_return_jcn = graph.jcn_of(breakend_index) / config.jcn_ratio;
    remote.ti_links.iter().find_map(|&link_index| {
        let link = &graph.links[link_index];
        if !link.is_active {
            return None;
        }
        let partner = link.other_breakend(remote_index);
        let return_index = graph.other_breakend(partner)?;
        let return_be = &graph.breakends[return_index];
        (return_be.chrom_index == be.chrom_index
            && return_be.arm == be.arm
            && graph.jcn_of(return_index) >= min_return_jcn)
            .then_some(return_index)
    })
}

fn is_local_sv_breakend(graph: &SvGraph, breakend_index: usize) -> bool {
    graph
        .other_breakend(breakend_index)
        .is_some_and(|x| graph.breakends[x].chrom_index == graph.breakends[breakend_index].chrom_index)
}

fn is_valid_dm_breakend(graph: &SvGraph, breakend_index: usize, config: &DoubleMinuteConfig) -> bool {
    is_local_sv_breakend(graph, breakend_index)
        || get_remote_return_breakend(graph, breakend_index, config).is_some()
}

#[derive(Default)]
struct PotentialDmGroup {
    breakends: Vec<usize>,
    sv_indices: BTreeSet<usize>,
}

impl PotentialDmGroup {
    fn add(&mut self, graph: &SvGraph, breakend_index: usize) {
        self.breakends.push(breakend_index);
        self.sv_indices.insert(graph.breakends[breakend_index].sv_index);
    }

    /// True if every SV of the group is fully represented and orientations balance
    ///
    fn is_resolved(&self, graph: &SvGraph, config: &DoubleMinuteConfig) -> bool {
        let orientation_sum = self
            .breakends
            .iter()
            .map(|&x| graph.breakends[x].orientation() as i32)
            .sum::<i32>();
        if orientation_sum != 0 {
            return false;
        }

        self.breakends.iter().all(|&breakend_index| {
            if is_local_sv_breakend(graph, breakend_index) {
                graph
                    .other_breakend(breakend_index)
                    .is_some_and(|x| self.breakends.contains(&x))
            } else {
                get_remote_return_breakend(graph, breakend_index, config)
                    .is_some_and(|x| self.breakends.contains(&x))
            }
        })
    }

    /// Total span of the group on its chromosome
    fn span(&self, graph: &SvGraph) -> i64 {
        let positions = self.breakends.iter().map(|&x| graph.breakends[x].pos);
        match (positions.clone().min(), positions.max()) {
            (Some(min), Some(max)) => max - min,
            _ => 0,
        }
    }
}

fn telomere_map(graph: &SvGraph, breakend_index: usize) -> f64 {
    let be = &graph.breakends[breakend_index];
    graph
        .copy_number
        .telomere_major_allele_ploidy(be.chrom_index, be.arm)
        .unwrap_or(0.0)
}

/// Check if a right-anchored breakend can open a new double minute group
///
fn is_group_start(
    graph: &SvGraph,
    list: &[usize],
    rank: usize,
    config: &DoubleMinuteConfig,
) -> bool {
    let breakend_index = list[rank];
    if graph.breakends[breakend_index].dir != BreakendDirection::RightAnchor {
        return false;
    }
    let jcn = graph.jcn_of(breakend_index);
    if jcn < config.min_breakend_jcn || jcn < config.jcn_ratio * telomere_map(graph, breakend_index)
    {
        return false;
    }
    if rank > 0 && jcn < config.jcn_ratio * graph.jcn_of(list[rank - 1]) {
        return false;
    }
    is_valid_dm_breakend(graph, breakend_index, config)
}

/// Check that copy number drops back down after a left-anchored closing breakend
///
fn is_group_end(graph: &SvGraph, list: &[usize], rank: usize, config: &DoubleMinuteConfig) -> bool {
    let breakend_index = list[rank];
    if graph.breakends[breakend_index].dir != BreakendDirection::LeftAnchor {
        return false;
    }
    let next_jcn = match list.get(rank + 1) {
        Some(&next) => graph.jcn_of(next),
        None => telomere_map(graph, breakend_index),
    };
    graph.jcn_of(breakend_index) >= config.jcn_ratio * next_jcn
}

fn is_high_jcn_breakend(graph: &SvGraph, breakend_index: usize, config: &DoubleMinuteConfig) -> bool {
    let jcn = graph.jcn_of(breakend_index);
    if jcn < config.high_jcn {
        return false;
    }
    let map = graph
        .copy_number
        .outer_major_allele_ploidy(&graph.breakends[breakend_index])
        .unwrap_or(0.0);
    jcn >= config.high_jcn_map_ratio * map
}

/// Merge SVs into groups wherever their chromosome sets overlap
///
fn merge_by_chromosome(graph: &SvGraph, sv_indices: &BTreeSet<usize>) -> Vec<BTreeSet<usize>> {
    let mut groups: Vec<(BTreeSet<usize>, BTreeSet<usize>)> = Vec::new();
    for &sv_index in sv_indices.iter() {
        let mut chroms = graph.svs[sv_index]
            .breakend_indices()
            .map(|x| graph.breakends[x].chrom_index)
            .collect::<BTreeSet<_>>();
        let mut svs = BTreeSet::from([sv_index]);

        let (overlapping, rest): (Vec<_>, Vec<_>) = groups
            .into_iter()
            .partition(|(group_chroms, _)| !group_chroms.is_disjoint(&chroms));
        for (group_chroms, group_svs) in overlapping {
            chroms.extend(group_chroms);
            svs.extend(group_svs);
        }
        groups = rest;
        groups.push((chroms, svs));
    }
    groups.into_iter().map(|(_, svs)| svs).collect()
}

/// Scan each chromosome for double minute segment groups
///
/// Returns complete candidates for every resolved group, followed by incomplete candidates built
/// from high JCN breakends outside of any resolved group.
///
pub fn scan_chromosomes(
    graph: &SvGraph,
    state: &ClusteringState,
    config: &DoubleMinuteConfig,
) -> Vec<DmCandidate> {
    let mut candidates = Vec::new();
    let mut high_jcn_svs = BTreeSet::new();
    let mut resolved_svs = BTreeSet::new();

    for (chrom_index, list) in state.chrom_breakends.iter().enumerate() {
        let mut group: Option<PotentialDmGroup> = None;
        for (rank, &breakend_index) in list.iter().enumerate() {
            if is_high_jcn_breakend(graph, breakend_index, config) {
                high_jcn_svs.insert(graph.breakends[breakend_index].sv_index);
            }

            let mut is_consumed = false;
            if let Some(current) = group.as_mut() {
                if !is_valid_dm_breakend(graph, breakend_index, config) {
                    debug!(
                        "Chrom {chrom_index} DM group cancelled at invalid breakend {:?}",
                        graph.breakends[breakend_index]
                    );
                    group = None;
                } else {
                    current.add(graph, breakend_index);
                    if current.sv_indices.len() > config.max_group_sv_count {
                        debug!("Chrom {chrom_index} DM group cancelled at maximum SV count");
                        group = None;
                    } else {
                        is_consumed = true;
                        if is_group_end(graph, list, rank, config)
                            && current.is_resolved(graph, config)
                        {
                            debug!(
                                "Chrom {chrom_index} DM group resolved with {} SVs",
                                current.sv_indices.len()
                            );
                            resolved_svs.extend(current.sv_indices.iter().copied());
                            candidates.push(DmCandidate {
                                sv_indices: current.sv_indices.iter().copied().collect(),
                                is_complete: true,
                                chain_length: current.span(graph),
                            });
                            group = None;
                        }
                    }
                }
            }

            // A breakend which cancelled the previous group may still open a new one
            if !is_consumed && group.is_none() && is_group_start(graph, list, rank, config) {
                let mut new_group = PotentialDmGroup::default();
                new_group.add(graph, breakend_index);
                group = Some(new_group);
            }
        }
    }

    let complete_count = candidates.len();
    let unresolved = high_jcn_svs
        .difference(&resolved_svs)
        .copied()
        .collect::<BTreeSet<_>>();
    for sv_indices in merge_by_chromosome(graph, &unresolved) {
        candidates.push(DmCandidate {
            sv_indices: sv_indices.into_iter().collect(),
            is_complete: false,
            chain_length: 0,
        });
    }

    info!(
        "Chromosome double minute scan found {} complete and {} incomplete candidates",
        complete_count,
        candidates.len() - complete_count
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sv::SvType;
    use crate::test_utils::*;

    fn run_scan(graph: &mut SvGraph) -> Vec<DmCandidate> {
        let state = ClusteringState::populate(graph);
        scan_chromosomes(graph, &state, &DoubleMinuteConfig::default())
    }

    #[test]
    fn test_amplified_dup() {
        let mut graph = get_test_graph();
        set_flat_copy_number(&mut graph, 0, 2.0);
        add_test_sv(
            &mut graph,
            SvType::Del,
            1.0,
            &[(0, 1000, LeftAnchor), (0, 3000, RightAnchor)],
        );
        let dup = add_test_sv(
            &mut graph,
            SvType::Dup,
            12.0,
            &[(0, 10_000, RightAnchor), (0, 50_000, LeftAnchor)],
        );
        let candidates = run_scan(&mut graph);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_complete);
        assert_eq!(candidates[0].sv_indices, vec![dup]);
        assert_eq!(candidates[0].chain_length, 40_000);
    }

    #[test]
    fn test_no_copy_number_drop() {
        let mut graph = get_test_graph();
        set_flat_copy_number(&mut graph, 0, 2.0);
        add_test_sv(
            &mut graph,
            SvType::Dup,
            6.0,
            &[(0, 10_000, RightAnchor), (0, 50_000, LeftAnchor)],
        );
        // Neither left-anchored breakend is followed by a large enough drop in copy number
        add_test_sv(
            &mut graph,
            SvType::Dup,
            4.0,
            &[(0, 60_000, RightAnchor), (0, 90_000, LeftAnchor)],
        );
        let candidates = run_scan(&mut graph);
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_group_restart_after_cancel() {
        let mut graph = get_test_graph();
        set_flat_copy_number(&mut graph, 0, 1.0);
        add_test_sv(
            &mut graph,
            SvType::Dup,
            3.0,
            &[(0, 10_000, RightAnchor), (0, 200_000, LeftAnchor)],
        );
        let dup = add_test_sv(
            &mut graph,
            SvType::Dup,
            12.0,
            &[(0, 20_000, RightAnchor), (0, 50_000, LeftAnchor)],
        );

        // The group opened by the first DUP is cancelled at the second DUP, which opens its own
        let config = DoubleMinuteConfig {
            max_group_sv_count: 1,
            ..Default::default()
        };
        let state = ClusteringState::populate(&mut graph);
        let candidates = scan_chromosomes(&graph, &state, &config);
        assert_eq!(candidates.len(), 1);
        assert!(candidates[0].is_complete);
        assert_eq!(candidates[0].sv_indices, vec![dup]);
        assert_eq!(candidates[0].chain_length, 30_000);
    }

    #[test]
    fn test_incomplete_candidates() {
        let mut graph = get_test_graph();
        for chrom_index in 0..3 {
            set_flat_copy_number(&mut graph, chrom_index, 1.0);
        }
        // Two high JCN translocations sharing chr2, without templated insertions to resolve them
        let bnd1 = add_test_sv(
            &mut graph,
            SvType::Bnd,
            20.0,
            &[(0, 10_000, RightAnchor), (1, 10_000, LeftAnchor)],
        );
        let bnd2 = add_test_sv(
            &mut graph,
            SvType::Bnd,
            20.0,
            &[(1, 50_000, RightAnchor), (2, 10_000, LeftAnchor)],
        );
        let candidates = run_scan(&mut graph);
        assert_eq!(candidates.len(), 1);
        assert!(!candidates[0].is_complete);
        assert_eq!(candidates[0].sv_indices, vec![bnd1, bnd2]);
    }

    #[test]
    fn test_merge_by_chromosome() {
        let mut graph = get_test_graph();
        let sv1 = add_test_sv(&mut graph, SvType::Sgl, 20.0, &[(0, 100, LeftAnchor)]);
        let sv2 = add_test_sv(&mut graph, SvType::Sgl, 20.0, &[(2, 100, LeftAnchor)]);
        let sv3 = add_test_sv(
            &mut graph,
            SvType::Bnd,
            20.0,
            &[(0, 500, LeftAnchor), (2, 500, LeftAnchor)],
        );
        let groups = merge_by_chromosome(&graph, &BTreeSet::from([sv1, sv2]));
        assert_eq!(groups.len(), 2);
        let groups = merge_by_chromosome(&graph, &BTreeSet::from([sv1, sv2, sv3]));
        assert_eq!(groups, vec![BTreeSet::from([sv1, sv2, sv3])]);
    }
}
