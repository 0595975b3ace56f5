//! All thresholds used by the linking and classification stages
//!
//! Values are injected into each component rather than read from globals, so that tests and the
//! command line can override any of them.
//!

use serde::Serialize;

#[derive(Clone, Debug, Default, Serialize)]
pub struct LinkerConfig {
    pub filter: FilterConfig,
    pub links: LinkConfig,
    pub length_cutoffs: LengthCutoffConfig,
    pub diagnostics: DiagnosticsConfig,
    pub double_minute: DoubleMinuteConfig,
    pub bfb: BfbConfig,
}

#[derive(Clone, Debug, Serialize)]
pub struct FilterConfig {
    /// Min distance from any neighboring breakend for a translocation or single breakend to be
    /// considered isolated
    pub isolated_breakend_distance: i64,

    /// SVs with fewer supporting fragments than this are treated as low support
    pub min_supporting_fragments: u32,

    /// SVs with a VAF below this on either side are treated as low support
    pub low_vaf: f64,

    /// Inversions shorter than this are candidates for the low-VAF short inversion filter
    pub short_inversion_length: i64,

    /// Max distance between same orientation breakends of two SVs to be treated as duplicates
    pub duplicate_breakend_distance: i64,

    /// Max distance between a single breakend and another breakend to be treated as a duplicate
    pub duplicate_sgl_distance: i64,

    /// Min insert sequence length for an SV to be checked as spanning an assembled TI
    pub min_spanning_insert_length: usize,

    /// Max distance between a spanning SV breakend and the breakend it spans
    pub spanning_breakend_distance: i64,

    /// Min homopolymer length of A or T in the insert sequence indicating a retrotransposition
    pub poly_a_length: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            isolated_breakend_distance: 5_000,
            min_supporting_fragments: 5,
            low_vaf: 0.05,
            short_inversion_length: 100,
            duplicate_breakend_distance: 35,
            duplicate_sgl_distance: 1,
            min_spanning_insert_length: 30,
            spanning_breakend_distance: 1,
            poly_a_length: 11,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct LinkConfig {
    /// Floor for the min templated insertion length of any breakend pair
    pub min_templated_insertion_length: i64,

    /// Copy numbers within this absolute difference are considered equal
    pub copy_number_abs_margin: f64,

    /// Copy numbers within this fraction of the larger value are considered equal
    pub copy_number_rel_margin: f64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            min_templated_insertion_length: 30,
            copy_number_abs_margin: 0.5,
            copy_number_rel_margin: 0.1,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct LengthCutoffConfig {
    pub min_cutoff: i64,
    pub max_cutoff: i64,

    /// Arm count of a genome without any excluded arms
    pub max_simple_arm_count: usize,

    /// Number of long events trimmed when every arm is simple
    pub max_trim_count: usize,
}

impl Default for LengthCutoffConfig {
    fn default() -> Self {
        Self {
            min_cutoff: 100_000,
            max_cutoff: 5_000_000,
            max_simple_arm_count: 41,
            max_trim_count: 5,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DiagnosticsConfig {
    /// Clusters with fewer SVs than this are not checked
    pub min_cluster_size: usize,

    /// Clusters with more SVs than this are not checked
    pub max_cluster_size: usize,

    /// The multi-connection check only runs for clusters producing at most this many chains
    pub max_chains_for_connection_check: usize,

    /// Progress is logged once replication is in effect and the cluster has at least this many SVs
    pub progress_min_sv_count: usize,

    /// Search iterations between progress log lines
    pub progress_iteration_interval: usize,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            min_cluster_size: 2,
            max_cluster_size: 200,
            max_chains_for_connection_check: 2,
            progress_min_sv_count: 100,
            progress_iteration_interval: 1_000,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct DoubleMinuteConfig {
    /// Min JCN for a breakend to open a potential DM group in the chromosome scan
    pub min_breakend_jcn: f64,

    /// Min ratio of a DM breakend JCN over the neighboring or telomeric JCN
    pub jcn_ratio: f64,

    /// Potential DM groups are cancelled once they exceed this many SVs
    pub max_group_sv_count: usize,

    /// Breakends with JCN at least this high are tracked as incomplete DM candidates
    pub high_jcn: f64,

    /// Min ratio of a high JCN breakend over the local major allele ploidy
    pub high_jcn_map_ratio: f64,

    /// Min max-SV JCN for a cluster to be considered a DM in the cluster scan
    pub min_cluster_jcn: f64,

    /// Min JCN drop from the lowest candidate SV to the next SV in the cluster scan
    pub cluster_jcn_drop_ratio: f64,

    /// Other-cluster SVs within this ratio of the candidate JCN make a DM ambiguous
    pub ambiguous_jcn_ratio: f64,

    /// Min total length of closed segments in a confirmed DM
    pub min_closed_segment_length: i64,

    /// Min fraction of closed breakends in a confirmed DM
    pub min_closed_fraction: f64,

    /// Required margin between the chain JCN and the max opposing JCN
    pub min_opposing_jcn_margin: f64,

    /// Crossing SVs this short with assembled links are not counted as opposing JCN
    pub short_assembled_length: i64,
}

impl Default for DoubleMinuteConfig {
    fn default() -> Self {
        Self {
            min_breakend_jcn: 3.0,
            jcn_ratio: 2.3,
            max_group_sv_count: 16,
            high_jcn: 10.0,
            high_jcn_map_ratio: 4.0,
            min_cluster_jcn: 8.0,
            cluster_jcn_drop_ratio: 3.0,
            ambiguous_jcn_ratio: 3.0,
            min_closed_segment_length: 1_500,
            min_closed_fraction: 2.0 / 3.0,
            min_opposing_jcn_margin: 4.0,
            short_assembled_length: 1_000,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct BfbConfig {
    pub foldback_jcn_multiplier: f64,
    pub max_foldback_jcn_multiplier: f64,

    /// A single breakend with JCN above this fraction of the cluster max JCN adds one replication
    /// round to the arm-end estimate
    pub single_breakend_jcn_fraction: f64,
}

impl Default for BfbConfig {
    fn default() -> Self {
        Self {
            foldback_jcn_multiplier: 2.0,
            max_foldback_jcn_multiplier: 6.0,
            single_breakend_jcn_fraction: 0.1,
        }
    }
}
