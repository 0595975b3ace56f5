//! Per-cluster annotation table
//!

use camino::Utf8Path;
use log::info;
use serde::Serialize;
use unwrap::unwrap;

use crate::cluster::Cluster;
use crate::sv_graph::SvGraph;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ClusterRecord {
    pub cluster_id: usize,
    pub sv_count: usize,
    pub resolved_type: String,
    pub annotations: String,
    pub foldbacks: usize,
    pub max_jcn: f64,
    pub requires_replication: bool,
    pub exclusion_reason: String,
}

impl ClusterRecord {
    pub fn new(graph: &SvGraph, cluster: &Cluster) -> Self {
        Self {
            cluster_id: cluster.id,
            sv_count: cluster.sv_count(),
            resolved_type: cluster.resolved_type(graph),
            annotations: cluster.annotation_text(),
            foldbacks: cluster.foldbacks.len(),
            max_jcn: cluster.max_jcn(graph),
            requires_replication: cluster.requires_replication,
            exclusion_reason: cluster
                .exclusion
                .map(|x| x.to_string())
                .unwrap_or_default(),
        }
    }
}

/// Write the annotation table for all clusters in cluster id order
///
pub fn write_cluster_table(filename: &Utf8Path, graph: &SvGraph, clusters: &[Cluster]) {
    info!("Writing cluster annotations to file: '{filename}'");

    let mut writer = unwrap!(
        csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(filename),
        "Unable to create cluster annotation file: '{filename}'"
    );
    for cluster in clusters.iter() {
        unwrap!(
            writer.serialize(ClusterRecord::new(graph, cluster)),
            "Failed to write cluster annotation file: '{filename}'"
        );
    }
    unwrap!(
        writer.flush(),
        "Failed to write cluster annotation file: '{filename}'"
    );
}
