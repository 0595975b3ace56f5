use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::breakend_index::ClusteringState;
use crate::chain::Chain;
use crate::cluster::Cluster;
use crate::config::DoubleMinuteConfig;
use crate::sv::SvType;
use crate::sv_graph::SvGraph;

/// First double minute criterion failed by a candidate
///
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DmCriterion {
    ClosedLength,
    ClosedFraction,
    SingleSvType,
    SingleSvJcn,
    OpposingJcn,
}

/// Same-chromosome region spanned by a pair of breakends
///
struct AmplifiedSegment {
    chrom_index: usize,
    start: i64,
    end: i64,
}

fn get_segment(graph: &SvGraph, breakends: [usize; 2]) -> Option<AmplifiedSegment> {
    let [be1, be2] = breakends.map(|x| &graph.breakends[x]);
    (be1.chrom_index == be2.chrom_index).then(|| AmplifiedSegment {
        chrom_index: be1.chrom_index,
        start: be1.pos.min(be2.pos),
        end: be1.pos.max(be2.pos),
    })
}

/// Segments closed by the templated links of a chain
fn get_chain_segments(graph: &SvGraph, chain: &Chain) -> Vec<AmplifiedSegment> {
    chain
        .links
        .iter()
        .filter_map(|x| get_segment(graph, x.breakends))
        .collect()
}

/// Segments spanned by SVs with both breakends on one chromosome
fn get_sv_segments(graph: &SvGraph, sv_indices: &[usize]) -> Vec<AmplifiedSegment> {
    sv_indices
        .iter()
        .filter_map(|&x| match graph.svs[x].breakends {
            [Some(a), Some(b)] => get_segment(graph, [a, b]),
            _ => None,
        })
        .collect()
}

/// Chain characteristics of a double minute candidate
///
#[derive(Clone, Debug)]
pub struct DoubleMinuteData {
    pub cluster_id: usize,

    pub sv_indices: Vec<usize>,

    /// Total length of chain links through the candidate SVs
    pub closed_length: i64,

    pub closed_breakend_count: usize,

    /// Open chain ends plus both breakends of each unchained candidate SV
    pub open_breakend_count: usize,

    /// Best margin of a chain's JCN over the JCN opposing it
    pub max_jcn_margin: Option<f64>,

    pub failed_criterion: Option<DmCriterion>,
}

/// Highest JCN over a set of SVs, taken from foldbacks alone if any are present
fn foldback_preferred_max_jcn(graph: &SvGraph, sv_indices: impl Iterator<Item = usize>) -> f64 {
    let (foldback_max, max) = sv_indices.fold((None, 0.0_f64), |(foldback_max, max), x| {
        let sv = &graph.svs[x];
        let foldback_max = if sv.is_foldback() {
            Some(foldback_max.unwrap_or(0.0_f64).max(sv.jcn.point))
        } else {
            foldback_max
        };
        (foldback_max, max.max(sv.jcn.point))
    });
    foldback_max.unwrap_or(max)
}

impl DoubleMinuteData {
    pub fn new(cluster_id: usize, sv_indices: Vec<usize>) -> Self {
        Self {
            cluster_id,
            sv_indices,
            closed_length: 0,
            closed_breakend_count: 0,
            open_breakend_count: 0,
            max_jcn_margin: None,
            failed_criterion: None,
        }
    }

    pub fn is_double_minute(&self) -> bool {
        self.failed_criterion.is_none() && self.max_jcn_margin.is_some()
    }

    pub fn closed_fraction(&self) -> f64 {
        let total = self.closed_breakend_count + self.open_breakend_count;
        if total == 0 {
            0.0
        } else {
            self.closed_breakend_count as f64 / total as f64
        }
    }

    /// JCN of the SVs outside of the candidate set which oppose amplification within the given
    /// segments
    ///
    /// This sums the JCN of SVs crossing from inside to outside the segments, skipping short
    /// assembled insertions, then adds the highest JCN single breakend inside the segments and the
    /// cluster's foldback JCN outside the candidate set.
    ///
    fn opposing_jcn(
        &self,
        graph: &SvGraph,
        state: &ClusteringState,
        segments: &[AmplifiedSegment],
        outside_foldback_jcn: f64,
        config: &DoubleMinuteConfig,
    ) -> f64 {
        let candidate_svs = self.sv_indices.iter().copied().collect::<BTreeSet<_>>();
        let mut inside_counts = BTreeMap::new();
        for segment in segments.iter() {
            let list = &state.chrom_breakends[segment.chrom_index];
            let first = list.partition_point(|&x| graph.breakends[x].pos <= segment.start);
            for &breakend_index in list[first..]
                .iter()
                .take_while(|&&x| graph.breakends[x].pos < segment.end)
            {
                let sv_index = graph.breakends[breakend_index].sv_index;
                if !candidate_svs.contains(&sv_index) {
                    *inside_counts.entry(sv_index).or_insert(0) += 1;
                }
            }
        }

        let mut crossing_jcn = 0.0;
        let mut max_single_jcn = 0.0_f64;
        for (&sv_index, &count) in inside_counts.iter() {
            let sv = &graph.svs[sv_index];
            if sv.is_single_ended() {
                max_single_jcn = max_single_jcn.max(sv.jcn.point);
                continue;
            }
            if count != 1 {
                continue;
            }
            let is_short_assembled = !sv.assembled_links.is_empty()
                && match sv.breakends {
                    [Some(a), Some(b)] => {
                        let (a, b) = (&graph.breakends[a], &graph.breakends[b]);
                        a.chrom_index == b.chrom_index
                            && (b.pos - a.pos).abs() < config.short_assembled_length
                    }
                    _ => false,
                };
            if !is_short_assembled {
                crossing_jcn += sv.jcn.point;
            }
        }
        crossing_jcn + max_single_jcn + outside_foldback_jcn
    }

    /// Evaluate the double minute criteria from scratch against the cluster's chains
    ///
    /// Returns the updated double minute status.
    ///
    pub fn check_criteria(
        &mut self,
        graph: &SvGraph,
        state: &ClusteringState,
        cluster: &Cluster,
        chains: &[Chain],
        config: &DoubleMinuteConfig,
    ) -> bool {
        self.closed_length = 0;
        self.closed_breakend_count = 0;
        self.open_breakend_count = 0;
        self.max_jcn_margin = None;
        self.failed_criterion = None;

        let candidate_svs = self.sv_indices.iter().copied().collect::<BTreeSet<_>>();
        let dm_chains = chains
            .iter()
            .filter(|x| x.sv_indices.iter().any(|sv| candidate_svs.contains(sv)))
            .collect::<Vec<_>>();
        let chained_svs = dm_chains
            .iter()
            .flat_map(|x| x.sv_indices.iter().copied())
            .collect::<BTreeSet<_>>();
        let unchained_svs = self
            .sv_indices
            .iter()
            .copied()
            .filter(|x| !chained_svs.contains(x))
            .collect::<Vec<_>>();

        for chain in dm_chains.iter() {
            self.closed_length += chain.length();
            self.closed_breakend_count += 2 * chain.links.len();
            if !chain.is_closed {
                self.open_breakend_count += 2;
            }
        }
        self.open_breakend_count += 2 * unchained_svs.len();

        if self.closed_length < config.min_closed_segment_length {
            self.failed_criterion = Some(DmCriterion::ClosedLength);
        } else if self.closed_fraction() < config.min_closed_fraction {
            self.failed_criterion = Some(DmCriterion::ClosedFraction);
        } else if let [sv_index] = self.sv_indices[..] {
            let sv = &graph.svs[sv_index];
            if sv.sv_type != SvType::Dup {
                self.failed_criterion = Some(DmCriterion::SingleSvType);
            } else {
                let is_amplified = sv.breakend_indices().all(|x| {
                    let map = graph
                        .copy_number
                        .outer_major_allele_ploidy(&graph.breakends[x])
                        .unwrap_or(0.0);
                    sv.jcn.point >= config.jcn_ratio * map
                });
                if !is_amplified {
                    self.failed_criterion = Some(DmCriterion::SingleSvJcn);
                }
            }
        }
        if let Some(criterion) = self.failed_criterion {
            debug!("Cluster {} DM candidate failed {criterion}", self.cluster_id);
            return false;
        }

        let outside_foldback_jcn = cluster
            .foldbacks
            .iter()
            .filter(|x| !candidate_svs.contains(x))
            .map(|&x| graph.svs[x].jcn.point)
            .sum::<f64>();

        let mut margins = dm_chains
            .iter()
            .map(|chain| {
                let chain_jcn =
                    foldback_preferred_max_jcn(graph, chain.sv_indices.iter().copied());
                let segments = get_chain_segments(graph, chain);
                chain_jcn
                    - self.opposing_jcn(graph, state, &segments, outside_foldback_jcn, config)
            })
            .collect::<Vec<_>>();
        if !unchained_svs.is_empty() {
            let pool_jcn = foldback_preferred_max_jcn(graph, unchained_svs.iter().copied());
            let segments = get_sv_segments(graph, &unchained_svs);
            let pool_opposing_jcn =
                self.opposing_jcn(graph, state, &segments, outside_foldback_jcn, config);
            margins.push(pool_jcn - pool_opposing_jcn);
        }

        self.max_jcn_margin = margins.into_iter().reduce(f64::max);
        if self
            .max_jcn_margin
            .is_none_or(|x| x < config.min_opposing_jcn_margin)
        {
            self.failed_criterion = Some(DmCriterion::OpposingJcn);
        }
        self.is_double_minute()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainLink;
    use crate::cluster::build_clusters;
    use crate::test_utils::*;

    fn get_dup_chain(graph: &SvGraph, sv_index: usize, is_closed: bool) -> Chain {
        let [Some(start), Some(end)] = graph.svs[sv_index].breakends else {
            panic!("Missing DUP breakends");
        };
        Chain {
            id: 0,
            sv_indices: vec![sv_index],
            links: vec![ChainLink {
                breakends: [start, end],
                length: graph.breakends[end].pos - graph.breakends[start].pos,
            }],
            is_closed,
        }
    }

    fn get_dup_graph(dup_jcn: f64, length: i64) -> (SvGraph, ClusteringState, Vec<Cluster>) {
        let mut graph = get_test_graph();
        set_flat_copy_number(&mut graph, 0, 2.0);
        add_test_sv(
            &mut graph,
            SvType::Dup,
            dup_jcn,
            &[(0, 10_000, RightAnchor), (0, 10_000 + length, LeftAnchor)],
        );
        let state = ClusteringState::populate(&mut graph);
        let clusters = build_clusters(&mut graph, &[vec![0]]);
        (graph, state, clusters)
    }

    #[test]
    fn test_single_dup_double_minute() {
        let (graph, state, clusters) = get_dup_graph(12.0, 2000);
        let chains = vec![get_dup_chain(&graph, 0, true)];
        let config = DoubleMinuteConfig::default();
        let mut dm_data = DoubleMinuteData::new(0, vec![0]);
        assert!(dm_data.check_criteria(&graph, &state, &clusters[0], &chains, &config));
        assert_eq!(dm_data.closed_length, 2000);
        approx::assert_ulps_eq!(dm_data.closed_fraction(), 1.0);
        assert!(dm_data.is_double_minute());

        // Re-checking unchanged data gives the same result
        assert!(dm_data.check_criteria(&graph, &state, &clusters[0], &chains, &config));
        assert!(dm_data.is_double_minute());
    }

    #[test]
    fn test_short_closed_segment() {
        let (graph, state, clusters) = get_dup_graph(12.0, 1000);
        let chains = vec![get_dup_chain(&graph, 0, true)];
        let mut dm_data = DoubleMinuteData::new(0, vec![0]);
        let config = DoubleMinuteConfig::default();
        assert!(!dm_data.check_criteria(&graph, &state, &clusters[0], &chains, &config));
        assert_eq!(dm_data.failed_criterion, Some(DmCriterion::ClosedLength));
    }

    #[test]
    fn test_low_jcn_single_dup() {
        let (graph, state, clusters) = get_dup_graph(4.0, 2000);
        let chains = vec![get_dup_chain(&graph, 0, true)];
        let mut dm_data = DoubleMinuteData::new(0, vec![0]);
        let config = DoubleMinuteConfig::default();
        assert!(!dm_data.check_criteria(&graph, &state, &clusters[0], &chains, &config));
        assert_eq!(dm_data.failed_criterion, Some(DmCriterion::SingleSvJcn));
    }

    #[test]
    fn test_opposing_jcn() {
        let mut graph = get_test_graph();
        set_flat_copy_number(&mut graph, 0, 2.0);
        set_flat_copy_number(&mut graph, 1, 2.0);
        let dup = add_test_sv(
            &mut graph,
            SvType::Dup,
            12.0,
            &[(0, 10_000, RightAnchor), (0, 20_000, LeftAnchor)],
        );
        // Translocation out of the amplified segment
        let bnd = add_test_sv(
            &mut graph,
            SvType::Bnd,
            9.0,
            &[(0, 15_000, LeftAnchor), (1, 5000, RightAnchor)],
        );
        let state = ClusteringState::populate(&mut graph);
        let clusters = build_clusters(&mut graph, &[vec![dup, bnd]]);
        let chains = vec![get_dup_chain(&graph, dup, true)];
        let config = DoubleMinuteConfig::default();

        let mut dm_data = DoubleMinuteData::new(0, vec![dup]);
        assert!(!dm_data.check_criteria(&graph, &state, &clusters[0], &chains, &config));
        assert_eq!(dm_data.failed_criterion, Some(DmCriterion::OpposingJcn));
        approx::assert_ulps_eq!(dm_data.max_jcn_margin.unwrap(), 3.0);
    }

    #[test]
    fn test_open_fraction() {
        let mut graph = get_test_graph();
        set_flat_copy_number(&mut graph, 0, 2.0);
        let dup = add_test_sv(
            &mut graph,
            SvType::Dup,
            12.0,
            &[(0, 10_000, RightAnchor), (0, 20_000, LeftAnchor)],
        );
        let unchained = add_test_sv(
            &mut graph,
            SvType::Dup,
            12.0,
            &[(0, 50_000, RightAnchor), (0, 60_000, LeftAnchor)],
        );
        let state = ClusteringState::populate(&mut graph);
        let clusters = build_clusters(&mut graph, &[vec![dup, unchained]]);
        let chains = vec![get_dup_chain(&graph, dup, false)];
        let config = DoubleMinuteConfig::default();

        let mut dm_data = DoubleMinuteData::new(0, vec![dup, unchained]);
        assert!(!dm_data.check_criteria(&graph, &state, &clusters[0], &chains, &config));
        assert_eq!(dm_data.closed_breakend_count, 2);
        assert_eq!(dm_data.open_breakend_count, 4);
        assert_eq!(dm_data.failed_criterion, Some(DmCriterion::ClosedFraction));
    }

    #[test]
    fn test_unchained_pool_opposing_jcn() {
        let mut graph = get_test_graph();
        set_flat_copy_number(&mut graph, 0, 2.0);
        set_flat_copy_number(&mut graph, 1, 2.0);

        // Four amplified DUPs, each crossed by a translocation out of the amplified segment
        let mut dups = Vec::new();
        let mut cluster_svs = Vec::new();
        for i in 0..4 {
            let start = 100_000 * (i + 1);
            let dup = add_test_sv(
                &mut graph,
                SvType::Dup,
                12.0,
                &[(0, start, RightAnchor), (0, start + 10_000, LeftAnchor)],
            );
            let bnd = add_test_sv(
                &mut graph,
                SvType::Bnd,
                9.0,
                &[(0, start + 5000, LeftAnchor), (1, start, RightAnchor)],
            );
            dups.push(dup);
            cluster_svs.extend([dup, bnd]);
        }
        let state = ClusteringState::populate(&mut graph);
        let clusters = build_clusters(&mut graph, &[cluster_svs]);

        // The last DUP is left out of the chains
        let chains = dups[..3]
            .iter()
            .map(|&x| get_dup_chain(&graph, x, true))
            .collect::<Vec<_>>();
        let config = DoubleMinuteConfig::default();

        let mut dm_data = DoubleMinuteData::new(0, dups.clone());
        assert!(!dm_data.check_criteria(&graph, &state, &clusters[0], &chains, &config));
        assert_eq!(dm_data.open_breakend_count, 2);
        assert_eq!(dm_data.failed_criterion, Some(DmCriterion::OpposingJcn));
        approx::assert_ulps_eq!(dm_data.max_jcn_margin.unwrap(), 3.0);
    }
}
