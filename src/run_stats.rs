//! Track stats for the whole annotation run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::Serialize;
use unwrap::unwrap;

use crate::bfb::BfbStats;
use crate::breakend_index::{CnEventMatchStats, LengthCutoffs};
use crate::chain_diagnostics::DiagnosticStats;
use crate::double_minute::DoubleMinuteStats;
use crate::link_finder::LinkStats;
use crate::sv_filter::FilterStats;

pub const RUN_STATS_FILENAME: &str = "run.stats.json";

#[derive(Default, Serialize)]
pub struct SampleStats {
    pub sv_count: usize,
    pub breakend_count: usize,
    pub indexed_breakend_count: usize,
    pub cluster_count: usize,
    pub chain_count: usize,
}

#[derive(Default, Serialize)]
pub struct AnnotateRunStats {
    pub sample_id: String,
    pub sample: SampleStats,
    pub filter: FilterStats,
    pub length_cutoffs: LengthCutoffs,
    pub cn_events: CnEventMatchStats,
    pub links: LinkStats,
    pub chain_diagnostics: DiagnosticStats,
    pub double_minutes: DoubleMinuteStats,
    pub bfb: BfbStats,
    pub total_runtime_secs: f64,
}

/// Write run_stats structure out in json format
pub fn write_annotate_run_stats(output_dir: &Utf8Path, run_stats: &AnnotateRunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{filename}'"
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &run_stats),
        "Unable to write run statistics json file: '{filename}'"
    );
}
