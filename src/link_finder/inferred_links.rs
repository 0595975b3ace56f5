use log::debug;

use super::LinkStats;
use crate::cluster::Cluster;
use crate::config::LinkConfig;
use crate::links::{
    LinkSource, LinkType, LinkedPair, facing_distance, min_templated_insertion_length,
};
use crate::sv_graph::SvGraph;
use crate::utils::copy_numbers_equal;

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InferredLinkCandidate {
    pub lower_breakend: usize,
    pub upper_breakend: usize,
    pub length: i64,
}

impl InferredLinkCandidate {
    fn shares_breakend(&self, other: &Self) -> bool {
        self.lower_breakend == other.lower_breakend
            || self.lower_breakend == other.upper_breakend
            || self.upper_breakend == other.lower_breakend
            || self.upper_breakend == other.upper_breakend
    }
}

/// Test whether two breakends can form an inferred templated insertion
///
fn get_candidate(
    graph: &SvGraph,
    be1: usize,
    be2: usize,
    check_copy_number: bool,
    config: &LinkConfig,
) -> Option<InferredLinkCandidate> {
    let (b1, b2) = (&graph.breakends[be1], &graph.breakends[be2]);
    if b1.sv_index == b2.sv_index {
        return None;
    }
    let length = facing_distance(b1, b2)?;
    if length < min_templated_insertion_length(b1, b2, config) {
        return None;
    }

    if check_copy_number {
        let is_replicated = graph.svs[b1.sv_index].replication_count > 1
            || graph.svs[b2.sv_index].replication_count > 1;
        if !is_replicated
            && !copy_numbers_equal(b1.copy_number_change, b2.copy_number_change, config)
        {
            return None;
        }
    }

    let (lower_breakend, upper_breakend) = if b1.pos <= b2.pos { (be1, be2) } else { (be2, be1) };
    Some(InferredLinkCandidate {
        lower_breakend,
        upper_breakend,
        length,
    })
}

/// Admit candidates shortest first, resolving clashes on shared breakends
///
/// A candidate is rejected if a strictly shorter admitted link already uses either of its
/// breakends. Clashing links of equal length are both kept. Candidates of equal length keep their
/// input order.
///
/// Returns the admitted links and the number of clashes found.
///
pub fn admit_inferred_candidates(
    mut candidates: Vec<InferredLinkCandidate>,
) -> (Vec<InferredLinkCandidate>, usize) {
    candidates.sort_by_key(|x| x.length);

    let mut admitted: Vec<InferredLinkCandidate> = Vec::new();
    let mut clash_count = 0;
    for candidate in candidates {
        let mut is_rejected = false;
        for link in admitted.iter().filter(|x| x.shares_breakend(&candidate)) {
            clash_count += 1;
            if link.length < candidate.length {
                is_rejected = true;
            }
        }
        if !is_rejected {
            admitted.push(candidate);
        }
    }
    (admitted, clash_count)
}

/// Find inferred templated insertions between the unassembled breakends of a cluster
///
/// Copy number change must match across both breakends unless the cluster requires replication.
///
pub fn find_inferred_links(
    graph: &mut SvGraph,
    cluster: &mut Cluster,
    config: &LinkConfig,
    stats: &mut LinkStats,
) {
    let breakends = cluster
        .indexed_breakends(graph)
        .into_iter()
        .filter(|&x| !graph.breakends[x].is_assembly_matched)
        .collect::<Vec<_>>();

    let check_copy_number = !cluster.requires_replication;
    let mut candidates = Vec::new();
    for (i, &be1) in breakends.iter().enumerate() {
        for &be2 in breakends.iter().skip(i + 1) {
            if let Some(candidate) = get_candidate(graph, be1, be2, check_copy_number, config) {
                candidates.push(candidate);
            }
        }
    }

    let (candidates, clash_count) = admit_inferred_candidates(candidates);
    stats.inferred_link_clashes += clash_count;

    for candidate in candidates {
        debug!(
            "Cluster {} inferred link length {}",
            cluster.id, candidate.length
        );
        let link_index = graph.add_link(LinkedPair {
            link_type: LinkType::TemplatedInsertion,
            source: LinkSource::Inferred,
            lower_breakend: candidate.lower_breakend,
            upper_breakend: candidate.upper_breakend,
            length: candidate.length,
            is_short_overlap: false,
            is_active: true,
        });
        graph.breakends[candidate.lower_breakend].ti_links.push(link_index);
        graph.breakends[candidate.upper_breakend].ti_links.push(link_index);
        cluster.inferred_links.push(link_index);
        stats.inferred_links += 1;
    }
}
