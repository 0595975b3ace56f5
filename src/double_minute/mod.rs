//! Double minute amplicon detection
//!
//! Two independent signals are produced. The chromosome scan walks each chromosome's breakends
//! looking for resolved groups of high copy SVs. The cluster scan looks for a sharp drop in the
//! JCN distribution of each cluster, then confirms it against the cluster's chains.
//!

mod chromosome_scan;
mod cluster_scan;
mod dm_data;
mod report;

use serde::Serialize;

pub use self::chromosome_scan::scan_chromosomes;
pub use self::cluster_scan::{ClusterDmScan, scan_cluster};
pub use self::dm_data::{DmCriterion, DoubleMinuteData};
pub use self::report::{DmReportRecord, DmReportWriter, get_dm_report_record};

/// Set of SVs reported as a putative double minute
///
#[derive(Clone, Debug)]
pub struct DmCandidate {
    /// Sorted SV indices
    pub sv_indices: Vec<usize>,

    /// False for groups of high JCN breakends which never resolved into a closed segment set
    pub is_complete: bool,

    pub chain_length: i64,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct DoubleMinuteStats {
    pub complete_chromosome_candidates: usize,
    pub incomplete_chromosome_candidates: usize,
    pub plausible_clusters: usize,
    pub ambiguous_clusters: usize,
    pub confirmed_clusters: usize,
}
