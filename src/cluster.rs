//! Clusters of SVs and their annotations
//!

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::sv::SvType;
use crate::sv_filter::ExclusionReason;
use crate::sv_graph::SvGraph;

#[derive(
    Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize, strum::Display, strum::EnumCount,
)]
pub enum ClusterAnnotation {
    #[strum(serialize = "BFB")]
    Bfb,
    #[strum(serialize = "DM")]
    DoubleMinute,
    #[strum(serialize = "DM_Unclear")]
    DoubleMinuteUnclear,
}

#[derive(Clone, Debug)]
pub struct Cluster {
    pub id: usize,
    pub sv_indices: Vec<usize>,

    /// Assembled templated insertions with at least one breakend in this cluster
    pub assembled_links: Vec<usize>,

    pub inferred_links: Vec<usize>,

    /// SVs annotated as foldbacks
    pub foldbacks: Vec<usize>,

    /// Set when a breakend is shared by more than one assembled link, so that some SVs must be
    /// represented multiple times
    pub requires_replication: bool,

    pub annotations: BTreeSet<ClusterAnnotation>,

    /// Set for the singleton clusters of filtered SVs
    pub exclusion: Option<ExclusionReason>,
}

impl Cluster {
    pub fn new(id: usize, sv_indices: Vec<usize>) -> Self {
        Self {
            id,
            sv_indices,
            assembled_links: Vec::new(),
            inferred_links: Vec::new(),
            foldbacks: Vec::new(),
            requires_replication: false,
            annotations: BTreeSet::new(),
            exclusion: None,
        }
    }

    pub fn sv_count(&self) -> usize {
        self.sv_indices.len()
    }

    /// All breakends of the cluster that are present in the breakend index
    pub fn indexed_breakends(&self, graph: &SvGraph) -> Vec<usize> {
        self.sv_indices
            .iter()
            .flat_map(|&x| graph.svs[x].breakend_indices())
            .filter(|&x| graph.breakends[x].chrom_list_index.is_some())
            .collect()
    }

    pub fn max_jcn(&self, graph: &SvGraph) -> f64 {
        self.sv_indices
            .iter()
            .map(|&x| graph.svs[x].jcn.point)
            .fold(0.0, f64::max)
    }

    /// Text form of the annotation set, joined by ';'
    pub fn annotation_text(&self) -> String {
        self.annotations
            .iter()
            .map(|x| x.to_string())
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Simple classification of the cluster's rearrangement type
    pub fn resolved_type(&self, graph: &SvGraph) -> String {
        if self.annotations.contains(&ClusterAnnotation::DoubleMinute)
            || self.annotations.contains(&ClusterAnnotation::DoubleMinuteUnclear)
        {
            "DOUBLE_MINUTE".to_string()
        } else if self.sv_indices.len() == 1 {
            let sv_type: SvType = graph.svs[self.sv_indices[0]].sv_type;
            format!("SIMPLE_{sv_type}")
        } else {
            "COMPLEX".to_string()
        }
    }
}

/// Create the sample's clusters from upstream SV groupings
///
/// SVs excluded by filtering are each moved to their own singleton cluster, as are SVs missing
/// from every upstream cluster. Each SV is assigned to at most one cluster, with the first upstream
/// cluster taking precedence.
///
pub fn build_clusters(graph: &mut SvGraph, upstream_clusters: &[Vec<usize>]) -> Vec<Cluster> {
    let mut assigned = vec![false; graph.svs.len()];
    let mut cluster_svs = Vec::new();
    for sv_indices in upstream_clusters {
        let members = sv_indices
            .iter()
            .copied()
            .filter(|&x| graph.svs[x].exclusion.is_none() && !assigned[x])
            .collect::<Vec<_>>();
        if members.is_empty() {
            continue;
        }
        for &sv_index in members.iter() {
            assigned[sv_index] = true;
        }
        cluster_svs.push(members);
    }
    for sv_index in 0..graph.svs.len() {
        if !assigned[sv_index] {
            cluster_svs.push(vec![sv_index]);
        }
    }

    let mut clusters = Vec::new();
    for (cluster_index, sv_indices) in cluster_svs.into_iter().enumerate() {
        let mut cluster = Cluster::new(cluster_index, sv_indices);
        for &sv_index in cluster.sv_indices.iter() {
            let sv = &mut graph.svs[sv_index];
            sv.cluster_index = Some(cluster_index);
            if sv.exclusion.is_some() {
                cluster.exclusion = sv.exclusion;
            }
            if sv.is_foldback() {
                cluster.foldbacks.push(sv_index);
            }
        }
        clusters.push(cluster);
    }
    clusters
}

/// Index of the SVs of each chromosome by cluster, used for cross-cluster comparisons
///
pub fn get_chrom_cluster_svs(graph: &SvGraph) -> Vec<BTreeMap<usize, Vec<usize>>> {
    let mut chrom_cluster_svs = vec![BTreeMap::new(); graph.chrom_list.len()];
    for (sv_index, sv) in graph.svs.iter().enumerate() {
        let Some(cluster_index) = sv.cluster_index else {
            continue;
        };
        if sv.exclusion.is_some() {
            continue;
        }
        let chroms = sv
            .breakend_indices()
            .map(|x| graph.breakends[x].chrom_index)
            .collect::<BTreeSet<_>>();
        for chrom_index in chroms {
            chrom_cluster_svs[chrom_index]
                .entry(cluster_index)
                .or_insert_with(Vec::new)
                .push(sv_index);
        }
    }
    chrom_cluster_svs
}
