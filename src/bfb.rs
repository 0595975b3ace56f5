//! Breakage-fusion-bridge plausibility from foldback and copy number arithmetic
//!

use std::collections::BTreeSet;

use log::debug;
use serde::Serialize;

use crate::chrom_list::ChromArm;
use crate::cluster::Cluster;
use crate::config::BfbConfig;
use crate::sv_graph::SvGraph;

/// Cluster summary values used to bound the JCN reachable through BFB cycles
///
#[derive(Clone, Debug, Default)]
pub struct BfbInputs {
    /// Sum of foldback JCN, with chained foldbacks counted at half weight
    pub foldback_jcn_sum: f64,
    pub max_foldback_jcn: f64,
    pub max_single_breakend_jcn: f64,

    /// Highest telomere or centromere copy number over the cluster's arms, if known
    pub max_arm_end_copy_number: Option<f64>,

    pub foldback_count: usize,
    pub cluster_max_jcn: f64,
}

impl BfbInputs {
    pub fn from_cluster(graph: &SvGraph, cluster: &Cluster) -> Self {
        let mut inputs = Self::default();
        for &sv_index in cluster.sv_indices.iter() {
            let sv = &graph.svs[sv_index];
            let jcn = sv.jcn.point;
            inputs.cluster_max_jcn = inputs.cluster_max_jcn.max(jcn);
            if sv.is_single_ended() {
                inputs.max_single_breakend_jcn = inputs.max_single_breakend_jcn.max(jcn);
            }
            if let Some(foldback) = &sv.foldback {
                inputs.foldback_count += 1;
                inputs.max_foldback_jcn = inputs.max_foldback_jcn.max(jcn);
                inputs.foldback_jcn_sum += if foldback.is_chained { jcn / 2.0 } else { jcn };
            }
        }

        let arms = cluster
            .indexed_breakends(graph)
            .into_iter()
            .map(|x| &graph.breakends[x])
            .filter(|x| x.arm != ChromArm::Centromeric)
            .map(|x| (x.chrom_index, x.arm))
            .collect::<BTreeSet<_>>();
        inputs.max_arm_end_copy_number = arms
            .into_iter()
            .filter_map(|(chrom_index, arm)| {
                graph.copy_number.arm_end_copy_number(chrom_index, arm)
            })
            .reduce(f64::max);
        inputs
    }
}

/// Minimum of the three independent estimates of the highest JCN a BFB process could reach
///
/// An unknown arm-end copy number places no bound from that estimate.
///
pub fn max_plausible_jcn(inputs: &BfbInputs, config: &BfbConfig) -> f64 {
    let foldback_estimate = config.foldback_jcn_multiplier * inputs.foldback_jcn_sum
        + inputs.max_single_breakend_jcn;
    let max_foldback_estimate = config.max_foldback_jcn_multiplier * inputs.max_foldback_jcn;

    let arm_estimate = match inputs.max_arm_end_copy_number {
        Some(arm_end_cn) => {
            let mut cycles = inputs.foldback_count as i32;
            if inputs.max_single_breakend_jcn
                > config.single_breakend_jcn_fraction * inputs.cluster_max_jcn
            {
                cycles += 1;
            }
            arm_end_cn * 2.0_f64.powi(cycles)
        }
        None => f64::INFINITY,
    };

    foldback_estimate
        .min(max_foldback_estimate)
        .min(arm_estimate)
}

/// True if the cluster's highest JCN is reachable through the BFB process
///
pub fn is_bfb_plausible(inputs: &BfbInputs, sv_count: usize, config: &BfbConfig) -> bool {
    if inputs.foldback_count == 0 || sv_count <= 1 {
        return false;
    }
    max_plausible_jcn(inputs, config) > inputs.cluster_max_jcn
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BfbStats {
    pub clusters_with_foldbacks: usize,
    pub bfb_clusters: usize,
}

/// Test a cluster for the BFB annotation
///
pub fn check_bfb(graph: &SvGraph, cluster: &Cluster, config: &BfbConfig) -> bool {
    if cluster.foldbacks.is_empty() || cluster.sv_count() <= 1 {
        return false;
    }
    let inputs = BfbInputs::from_cluster(graph, cluster);
    let is_bfb = is_bfb_plausible(&inputs, cluster.sv_count(), config);
    debug!(
        "Cluster {} BFB check max plausible JCN {:.2} observed max JCN {:.2} result {is_bfb}",
        cluster.id,
        max_plausible_jcn(&inputs, config),
        inputs.cluster_max_jcn
    );
    is_bfb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakend_index::ClusteringState;
    use crate::cluster::build_clusters;
    use crate::sv::{FoldbackInfo, SvType};
    use crate::test_utils::*;
    use approx::assert_ulps_eq;

    #[test]
    fn test_max_plausible_jcn() {
        let inputs = BfbInputs {
            foldback_jcn_sum: 5.0,
            max_foldback_jcn: 4.0,
            max_single_breakend_jcn: 0.0,
            max_arm_end_copy_number: Some(3.0),
            foldback_count: 1,
            cluster_max_jcn: 4.0,
        };
        let config = BfbConfig::default();
        assert_ulps_eq!(max_plausible_jcn(&inputs, &config), 6.0);
        assert!(is_bfb_plausible(&inputs, 3, &config));
        assert!(!is_bfb_plausible(&inputs, 1, &config));

        let inputs = BfbInputs {
            cluster_max_jcn: 7.0,
            ..inputs
        };
        assert!(!is_bfb_plausible(&inputs, 3, &config));
    }

    #[test]
    fn test_single_breakend_cycle() {
        // A high JCN single breakend adds one more cycle to the arm-end estimate
        let inputs = BfbInputs {
            foldback_jcn_sum: 10.0,
            max_foldback_jcn: 10.0,
            max_single_breakend_jcn: 2.0,
            max_arm_end_copy_number: Some(3.0),
            foldback_count: 1,
            cluster_max_jcn: 10.0,
        };
        let config = BfbConfig::default();
        assert_ulps_eq!(max_plausible_jcn(&inputs, &config), 12.0);

        let inputs = BfbInputs {
            max_arm_end_copy_number: None,
            ..inputs
        };
        assert_ulps_eq!(max_plausible_jcn(&inputs, &config), 22.0);
    }

    #[test]
    fn test_check_bfb() {
        let mut graph = get_test_graph();
        graph
            .copy_number
            .arm_ends
            .insert((0, ChromArm::Q), (3.0, 2.0));
        let foldback = add_test_sv(
            &mut graph,
            SvType::Inv,
            4.0,
            &[(0, 2_000_000, LeftAnchor), (0, 2_001_000, LeftAnchor)],
        );
        graph.svs[foldback].foldback = Some(FoldbackInfo {
            partner_sv: foldback,
            is_chained: false,
        });
        add_test_sv(
            &mut graph,
            SvType::Del,
            2.0,
            &[(0, 3_000_000, LeftAnchor), (0, 3_500_000, RightAnchor)],
        );
        let _state = ClusteringState::populate(&mut graph);
        let clusters = build_clusters(&mut graph, &[vec![0, 1]]);

        let inputs = BfbInputs::from_cluster(&graph, &clusters[0]);
        assert_eq!(inputs.foldback_count, 1);
        assert_eq!(inputs.max_arm_end_copy_number, Some(3.0));
        assert!(check_bfb(&graph, &clusters[0], &BfbConfig::default()));
    }
}
