use std::collections::{BTreeMap, BTreeSet};

use log::info;
use serde::Serialize;

use super::ClusteringState;
use crate::chrom_list::ChromArm;
use crate::config::LengthCutoffConfig;
use crate::sv::SvType;
use crate::sv_graph::SvGraph;

/// Per-sample length cutoffs separating simple from long deletions and duplications
///
#[derive(Clone, Debug, Default, Serialize)]
pub struct LengthCutoffs {
    pub del_cutoff: i64,
    pub dup_cutoff: i64,
    pub simple_arm_count: usize,
    pub trim_count: usize,
}

/// Get the cutoff from a length list after discarding the longest `trim_count` values
///
/// The list does not need to be sorted.
///
pub fn get_trimmed_cutoff(
    mut lengths: Vec<i64>,
    trim_count: usize,
    config: &LengthCutoffConfig,
) -> i64 {
    if lengths.len() <= trim_count {
        return config.min_cutoff;
    }
    lengths.sort_unstable();
    let cutoff = lengths[lengths.len() - 1 - trim_count];
    cutoff.clamp(config.min_cutoff, config.max_cutoff)
}

/// Number of the longest simple events trimmed before selecting a cutoff
pub fn get_trim_count(simple_arm_count: usize, config: &LengthCutoffConfig) -> usize {
    let arm_count = simple_arm_count.min(config.max_simple_arm_count);
    let fraction = arm_count as f64 / config.max_simple_arm_count as f64;
    (fraction * config.max_trim_count as f64).round() as usize
}

/// Derive simple DEL and DUP length cutoffs from the indexed breakends
///
/// Any chromosome arm holding an inversion breakend is excluded from the length statistics.
/// Acrocentric short arms are never counted as simple arms.
///
pub fn compute_length_cutoffs(
    graph: &SvGraph,
    state: &ClusteringState,
    config: &LengthCutoffConfig,
) -> LengthCutoffs {
    let mut complex_arms = BTreeSet::new();
    let mut arm_lengths: BTreeMap<(usize, ChromArm), (Vec<i64>, Vec<i64>)> = BTreeMap::new();
    for list in state.chrom_breakends.iter() {
        for &breakend_index in list.iter() {
            let be = &graph.breakends[breakend_index];
            let sv = &graph.svs[be.sv_index];
            let arm_key = (be.chrom_index, be.arm);
            match sv.sv_type {
                SvType::Inv => {
                    complex_arms.insert(arm_key);
                }
                SvType::Del | SvType::Dup if be.is_start => {
                    let Some(other) = graph.other_breakend(breakend_index) else {
                        continue;
                    };
                    let length = graph.breakends[other].pos - be.pos;
                    let (dels, dups) = arm_lengths.entry(arm_key).or_default();
                    if sv.sv_type == SvType::Del {
                        dels.push(length);
                    } else {
                        dups.push(length);
                    }
                }
                _ => {}
            }
        }
    }

    let mut simple_arm_count = 0;
    for chrom_index in 0..graph.chrom_list.len() {
        for arm in [ChromArm::P, ChromArm::Q] {
            if !graph.chrom_list.is_acrocentric_arm(chrom_index, arm)
                && !complex_arms.contains(&(chrom_index, arm))
            {
                simple_arm_count += 1;
            }
        }
    }

    let mut del_lengths = Vec::new();
    let mut dup_lengths = Vec::new();
    for (arm_key, (dels, dups)) in arm_lengths {
        if complex_arms.contains(&arm_key) {
            continue;
        }
        del_lengths.extend(dels);
        dup_lengths.extend(dups);
    }

    let trim_count = get_trim_count(simple_arm_count, config);
    let cutoffs = LengthCutoffs {
        del_cutoff: get_trimmed_cutoff(del_lengths, trim_count, config),
        dup_cutoff: get_trimmed_cutoff(dup_lengths, trim_count, config),
        simple_arm_count,
        trim_count,
    };

    info!(
        "Simple length cutoffs DEL: {} DUP: {} from {} simple arms",
        cutoffs.del_cutoff, cutoffs.dup_cutoff, cutoffs.simple_arm_count
    );
    cutoffs
}
