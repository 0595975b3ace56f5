use log::debug;

use super::LinkStats;
use crate::breakend_index::ClusteringState;
use crate::config::LinkConfig;
use crate::links::{
    LinkSource, LinkType, LinkedPair, bridge_distance, facing_distance,
    min_templated_insertion_length,
};
use crate::sv_graph::SvGraph;

/// Build the bridge candidate for two adjacent breakends, if they form one
///
/// Breakends facing away from each other form a deletion bridge. Breakends facing each other but
/// too close to form a templated insertion are kept as a short overlapping bridge, unless an
/// assembled link already joins them.
///
fn get_bridge_candidate(
    graph: &SvGraph,
    lower: usize,
    upper: usize,
    config: &LinkConfig,
) -> Option<LinkedPair> {
    let (be1, be2) = (&graph.breakends[lower], &graph.breakends[upper]);
    if be1.sv_index == be2.sv_index || be1.arm != be2.arm || be1.dir == be2.dir {
        return None;
    }

    let candidate = |link_type, length, is_short_overlap| LinkedPair {
        link_type,
        source: LinkSource::Inferred,
        lower_breakend: lower,
        upper_breakend: upper,
        length,
        is_short_overlap,
        is_active: true,
    };

    if let Some(length) = bridge_distance(be1, be2) {
        return Some(candidate(LinkType::DeletionBridge, length, false));
    }

    let length = facing_distance(be1, be2)?;
    if length >= min_templated_insertion_length(be1, be2, config) {
        return None;
    }
    let is_assembled = be1.ti_links.iter().any(|&x| {
        let link = &graph.links[x];
        link.source == LinkSource::Assembled && link.has_breakend(upper)
    });
    if is_assembled {
        return None;
    }
    Some(candidate(LinkType::TemplatedInsertion, length, true))
}

/// Detach a displaced bridge from both of its breakends
fn detach_bridge(graph: &mut SvGraph, link_index: usize) {
    graph.links[link_index].is_active = false;
    for breakend_index in graph.links[link_index].breakends() {
        let be = &mut graph.breakends[breakend_index];
        if be.bridge_link == Some(link_index) {
            be.bridge_link = None;
        }
    }
}

/// Find deletion bridges between adjacent breakends of each chromosome
///
/// A breakend holds at most one bridge. A new bridge displaces an existing bridge on either of
/// its breakends only if it is strictly shorter, otherwise the new bridge is discarded.
///
pub fn find_deletion_bridges(
    graph: &mut SvGraph,
    state: &ClusteringState,
    config: &LinkConfig,
    stats: &mut LinkStats,
) {
    for list in state.chrom_breakends.iter() {
        for pair in list.windows(2) {
            let (lower, upper) = (pair[0], pair[1]);
            let Some(candidate) = get_bridge_candidate(graph, lower, upper, config) else {
                continue;
            };

            let existing = [lower, upper]
                .iter()
                .filter_map(|&x| graph.breakends[x].bridge_link)
                .collect::<Vec<_>>();
            if existing
                .iter()
                .any(|&x| graph.links[x].length <= candidate.length)
            {
                continue;
            }

            for link_index in existing {
                debug!(
                    "Replacing bridge of length {} with length {}",
                    graph.links[link_index].length, candidate.length
                );
                detach_bridge(graph, link_index);
                stats.replaced_bridges += 1;
            }

            if candidate.is_short_overlap {
                stats.short_overlap_bridges += 1;
            } else {
                stats.deletion_bridges += 1;
            }
            let link_index = graph.add_link(candidate);
            graph.breakends[lower].bridge_link = Some(link_index);
            graph.breakends[upper].bridge_link = Some(link_index);
        }
    }
}
