//! Construction of the links between breakends
//!
//! Links are found in three stages: assembled templated insertions across each chromosome,
//! deletion bridges between adjacent breakends, and inferred templated insertions within each
//! cluster.
//!

mod assembled_links;
mod deletion_bridges;
mod inferred_links;

use log::info;
use serde::Serialize;
use thousands::Separable;

pub use self::assembled_links::find_assembled_links;
pub use self::deletion_bridges::find_deletion_bridges;
pub use self::inferred_links::{InferredLinkCandidate, find_inferred_links};
use crate::breakend_index::ClusteringState;
use crate::cluster::Cluster;
use crate::config::LinkConfig;
use crate::sv_graph::SvGraph;

#[derive(Clone, Debug, Default, Serialize)]
pub struct LinkStats {
    pub assembled_links: usize,
    pub replicated_assembly_breakends: usize,
    pub deletion_bridges: usize,
    pub short_overlap_bridges: usize,
    pub replaced_bridges: usize,
    pub inferred_links: usize,
    pub inferred_link_clashes: usize,
}

/// Run every link construction stage on the sample
///
pub fn find_links(
    graph: &mut SvGraph,
    state: &ClusteringState,
    clusters: &mut [Cluster],
    config: &LinkConfig,
) -> LinkStats {
    let mut stats = LinkStats::default();
    find_assembled_links(graph, state, clusters, &mut stats);
    find_deletion_bridges(graph, state, config, &mut stats);
    for cluster in clusters.iter_mut().filter(|x| x.exclusion.is_none()) {
        find_inferred_links(graph, cluster, config, &mut stats);
    }

    info!(
        "Found {} assembled links, {} inferred links and {} deletion bridges",
        stats.assembled_links.separate_with_commas(),
        stats.inferred_links.separate_with_commas(),
        stats.deletion_bridges.separate_with_commas(),
    );
    stats
}
