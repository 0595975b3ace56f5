use std::collections::BTreeSet;

use super::LinkStats;
use crate::breakend_index::ClusteringState;
use crate::cluster::Cluster;
use crate::links::{LinkSource, LinkType, LinkedPair};
use crate::sv::{BreakendDirection, SvType};
use crate::sv_graph::SvGraph;

/// True if the breakend can take part in an assembled templated insertion
fn is_assembly_candidate(graph: &SvGraph, breakend_index: usize, dir: BreakendDirection) -> bool {
    let be = &graph.breakends[breakend_index];
    let sv = &graph.svs[be.sv_index];
    be.dir == dir
        && !be.assembly_ids.is_empty()
        && sv.sv_type != SvType::Ins
        && !sv.is_single_ended()
}

/// Record an assembled link on both breakends, both SVs and the clusters holding them
fn add_assembled_link(
    graph: &mut SvGraph,
    clusters: &mut [Cluster],
    lower: usize,
    upper: usize,
    stats: &mut LinkStats,
) {
    let length = graph.breakends[upper].pos - graph.breakends[lower].pos;
    let link_index = graph.add_link(LinkedPair {
        link_type: LinkType::TemplatedInsertion,
        source: LinkSource::Assembled,
        lower_breakend: lower,
        upper_breakend: upper,
        length,
        is_short_overlap: false,
        is_active: true,
    });
    stats.assembled_links += 1;

    let is_replicated =
        graph.breakends[lower].is_assembly_matched || graph.breakends[upper].is_assembly_matched;

    let mut cluster_indices = BTreeSet::new();
    for breakend_index in [lower, upper] {
        let be = &mut graph.breakends[breakend_index];
        if be.is_assembly_matched {
            stats.replicated_assembly_breakends += 1;
        }
        be.is_assembly_matched = true;
        be.ti_links.push(link_index);
        let sv = &mut graph.svs[be.sv_index];
        sv.assembled_links.push(link_index);
        if is_replicated {
            sv.assembly_replicated = true;
        }
        cluster_indices.extend(sv.cluster_index);
    }

    for cluster_index in cluster_indices {
        let cluster = &mut clusters[cluster_index];
        cluster.assembled_links.push(link_index);
        if is_replicated {
            cluster.requires_replication = true;
        }
    }
}

/// Link right-anchored breakends to higher left-anchored breakends of other SVs sharing an
/// assembly
///
pub fn find_assembled_links(
    graph: &mut SvGraph,
    state: &ClusteringState,
    clusters: &mut [Cluster],
    stats: &mut LinkStats,
) {
    for list in state.chrom_breakends.iter() {
        let lower_candidates = list
            .iter()
            .copied()
            .filter(|&x| is_assembly_candidate(graph, x, BreakendDirection::RightAnchor))
            .collect::<Vec<_>>();
        let upper_candidates = list
            .iter()
            .copied()
            .filter(|&x| is_assembly_candidate(graph, x, BreakendDirection::LeftAnchor))
            .collect::<Vec<_>>();

        for &lower in lower_candidates.iter() {
            for &upper in upper_candidates.iter() {
                let (lower_be, upper_be) = (&graph.breakends[lower], &graph.breakends[upper]);
                if upper_be.chrom_list_index <= lower_be.chrom_list_index
                    || upper_be.sv_index == lower_be.sv_index
                    || !lower_be.shares_assembly_id(upper_be)
                {
                    continue;
                }
                add_assembled_link(graph, clusters, lower, upper, stats);
            }
        }
    }
}
