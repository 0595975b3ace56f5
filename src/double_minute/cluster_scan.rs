use std::collections::{BTreeMap, BTreeSet};

use crate::cluster::Cluster;
use crate::config::DoubleMinuteConfig;
use crate::sv_graph::SvGraph;

/// Cluster whose JCN distribution is consistent with a double minute
///
#[derive(Clone, Debug)]
pub struct ClusterDmScan {
    pub cluster_id: usize,

    /// High JCN SVs, in descending JCN order
    pub sv_indices: Vec<usize>,

    /// Chromosomes touched by the high JCN SVs
    pub chromosomes: BTreeSet<usize>,

    /// True if another cluster has SVs of comparable JCN on the same chromosomes
    pub is_ambiguous: bool,
}

/// Look for a sharp drop between the high JCN SVs of a cluster and the rest
///
/// `chrom_cluster_svs` holds the SVs of each cluster on each chromosome, used to test whether
/// comparable JCN SVs were left in other clusters.
///
pub fn scan_cluster(
    graph: &SvGraph,
    cluster: &Cluster,
    chrom_cluster_svs: &[BTreeMap<usize, Vec<usize>>],
    config: &DoubleMinuteConfig,
) -> Option<ClusterDmScan> {
    let jcn = |sv_index: usize| graph.svs[sv_index].jcn.point;

    let mut sorted_svs = cluster.sv_indices.clone();
    sorted_svs.sort_by(|&a, &b| jcn(b).total_cmp(&jcn(a)));

    let high_count = sorted_svs
        .iter()
        .take_while(|&&x| jcn(x) >= config.min_cluster_jcn)
        .count();
    if high_count == 0 {
        return None;
    }

    let min_high_jcn = jcn(sorted_svs[high_count - 1]);
    if let Some(&next) = sorted_svs.get(high_count) {
        if min_high_jcn < config.cluster_jcn_drop_ratio * jcn(next) {
            return None;
        }
    }

    sorted_svs.truncate(high_count);
    let chromosomes = sorted_svs
        .iter()
        .flat_map(|&x| graph.svs[x].breakend_indices())
        .map(|x| graph.breakends[x].chrom_index)
        .collect::<BTreeSet<_>>();

    let min_comparable_jcn = min_high_jcn / config.ambiguous_jcn_ratio;
    let is_ambiguous = chromosomes.iter().any(|&chrom_index| {
        chrom_cluster_svs[chrom_index]
            .iter()
            .filter(|&(&cluster_index, _)| cluster_index != cluster.id)
            .flat_map(|(_, svs)| svs.iter())
            .any(|&x| jcn(x) >= min_comparable_jcn)
    });

    Some(ClusterDmScan {
        cluster_id: cluster.id,
        sv_indices: sorted_svs,
        chromosomes,
        is_ambiguous,
    })
}
