use std::fs::File;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail, map_err_with};
use unwrap::unwrap;

use super::utils::{check_optional_filename, check_required_filename};
use crate::config::{
    BfbConfig, DiagnosticsConfig, DoubleMinuteConfig, FilterConfig, LengthCutoffConfig,
    LinkConfig, LinkerConfig,
};
use crate::sv_filter::get_poly_a_regex;

pub const SETTINGS_FILENAME: &str = "annotate.settings.json";

#[derive(Args, Default, Deserialize, Serialize)]
pub struct AnnotateSettings {
    /// Directory for all annotate command output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_annotate_output"))]
    pub output_dir: Utf8PathBuf,

    /// Sample SV, copy number and cluster input in JSON format
    #[arg(long = "sample-input", value_name = "FILE")]
    pub sample_input_filename: String,

    /// Gene regions used to annotate double minute amplicons, in BED format (optionally gzipped)
    ///
    /// Gene names are read from column 4 of the input BED file.
    ///
    #[arg(long = "gene-regions", value_name = "FILE")]
    pub gene_regions_filename: Option<String>,

    /// Override the sample id given in the sample input file
    #[arg(long)]
    pub sample_id: Option<String>,

    /// Write the chain diagnostics table for every checked cluster
    #[arg(long)]
    pub write_diagnostics: bool,

    /// Turn on extra debug output for the chain and double minute checks of the given cluster id
    #[arg(hide = true, long)]
    pub target_cluster_id: Option<usize>,

    #[arg(hide = true, long, default_value_t = FilterConfig::default().isolated_breakend_distance)]
    pub isolated_breakend_distance: i64,

    #[arg(hide = true, long, default_value_t = FilterConfig::default().min_supporting_fragments)]
    pub min_supporting_fragments: u32,

    #[arg(hide = true, long, default_value_t = FilterConfig::default().low_vaf)]
    pub low_vaf: f64,

    #[arg(hide = true, long, default_value_t = FilterConfig::default().short_inversion_length)]
    pub short_inversion_length: i64,

    #[arg(hide = true, long, default_value_t = FilterConfig::default().duplicate_breakend_distance)]
    pub duplicate_breakend_distance: i64,

    #[arg(hide = true, long, default_value_t = FilterConfig::default().duplicate_sgl_distance)]
    pub duplicate_sgl_distance: i64,

    #[arg(hide = true, long, default_value_t = FilterConfig::default().min_spanning_insert_length)]
    pub min_spanning_insert_length: usize,

    #[arg(hide = true, long, default_value_t = FilterConfig::default().spanning_breakend_distance)]
    pub spanning_breakend_distance: i64,

    #[arg(hide = true, long, default_value_t = FilterConfig::default().poly_a_length)]
    pub poly_a_length: usize,

    #[arg(hide = true, long, default_value_t = LinkConfig::default().min_templated_insertion_length)]
    pub min_templated_insertion_length: i64,

    #[arg(hide = true, long, default_value_t = LinkConfig::default().copy_number_abs_margin)]
    pub copy_number_abs_margin: f64,

    #[arg(hide = true, long, default_value_t = LinkConfig::default().copy_number_rel_margin)]
    pub copy_number_rel_margin: f64,

    #[arg(hide = true, long, default_value_t = LengthCutoffConfig::default().min_cutoff)]
    pub min_length_cutoff: i64,

    #[arg(hide = true, long, default_value_t = LengthCutoffConfig::default().max_cutoff)]
    pub max_length_cutoff: i64,

    #[arg(hide = true, long, default_value_t = LengthCutoffConfig::default().max_simple_arm_count)]
    pub max_simple_arm_count: usize,

    #[arg(hide = true, long, default_value_t = LengthCutoffConfig::default().max_trim_count)]
    pub max_trim_count: usize,

    /// Smallest cluster checked by chain diagnostics
    #[arg(hide = true, long, default_value_t = DiagnosticsConfig::default().min_cluster_size)]
    pub min_diagnostic_cluster_size: usize,

    /// Largest cluster checked by chain diagnostics
    #[arg(hide = true, long, default_value_t = DiagnosticsConfig::default().max_cluster_size)]
    pub max_diagnostic_cluster_size: usize,

    #[arg(hide = true, long, default_value_t = DiagnosticsConfig::default().max_chains_for_connection_check)]
    pub max_chains_for_connection_check: usize,

    #[arg(hide = true, long, default_value_t = DiagnosticsConfig::default().progress_min_sv_count)]
    pub progress_min_sv_count: usize,

    #[arg(hide = true, long, default_value_t = DiagnosticsConfig::default().progress_iteration_interval)]
    pub progress_iteration_interval: usize,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().min_breakend_jcn)]
    pub dm_min_breakend_jcn: f64,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().jcn_ratio)]
    pub dm_jcn_ratio: f64,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().max_group_sv_count)]
    pub dm_max_group_sv_count: usize,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().high_jcn)]
    pub dm_high_jcn: f64,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().high_jcn_map_ratio)]
    pub dm_high_jcn_map_ratio: f64,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().min_cluster_jcn)]
    pub dm_min_cluster_jcn: f64,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().cluster_jcn_drop_ratio)]
    pub dm_cluster_jcn_drop_ratio: f64,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().ambiguous_jcn_ratio)]
    pub dm_ambiguous_jcn_ratio: f64,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().min_closed_segment_length)]
    pub dm_min_closed_segment_length: i64,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().min_closed_fraction)]
    pub dm_min_closed_fraction: f64,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().min_opposing_jcn_margin)]
    pub dm_min_opposing_jcn_margin: f64,

    #[arg(hide = true, long, default_value_t = DoubleMinuteConfig::default().short_assembled_length)]
    pub dm_short_assembled_length: i64,

    #[arg(hide = true, long, default_value_t = BfbConfig::default().foldback_jcn_multiplier)]
    pub bfb_foldback_jcn_multiplier: f64,

    #[arg(hide = true, long, default_value_t = BfbConfig::default().max_foldback_jcn_multiplier)]
    pub bfb_max_foldback_jcn_multiplier: f64,

    #[arg(hide = true, long, default_value_t = BfbConfig::default().single_breakend_jcn_fraction)]
    pub bfb_single_breakend_jcn_fraction: f64,
}

impl AnnotateSettings {
    /// Gather all algorithm thresholds from the command line
    pub fn get_linker_config(&self) -> LinkerConfig {
        LinkerConfig {
            filter: FilterConfig {
                isolated_breakend_distance: self.isolated_breakend_distance,
                min_supporting_fragments: self.min_supporting_fragments,
                low_vaf: self.low_vaf,
                short_inversion_length: self.short_inversion_length,
                duplicate_breakend_distance: self.duplicate_breakend_distance,
                duplicate_sgl_distance: self.duplicate_sgl_distance,
                min_spanning_insert_length: self.min_spanning_insert_length,
                spanning_breakend_distance: self.spanning_breakend_distance,
                poly_a_length: self.poly_a_length,
            },
            links: LinkConfig {
                min_templated_insertion_length: self.min_templated_insertion_length,
                copy_number_abs_margin: self.copy_number_abs_margin,
                copy_number_rel_margin: self.copy_number_rel_margin,
            },
            length_cutoffs: LengthCutoffConfig {
                min_cutoff: self.min_length_cutoff,
                max_cutoff: self.max_length_cutoff,
                max_simple_arm_count: self.max_simple_arm_count,
                max_trim_count: self.max_trim_count,
            },
            diagnostics: DiagnosticsConfig {
                min_cluster_size: self.min_diagnostic_cluster_size,
                max_cluster_size: self.max_diagnostic_cluster_size,
                max_chains_for_connection_check: self.max_chains_for_connection_check,
                progress_min_sv_count: self.progress_min_sv_count,
                progress_iteration_interval: self.progress_iteration_interval,
            },
            double_minute: DoubleMinuteConfig {
                min_breakend_jcn: self.dm_min_breakend_jcn,
                jcn_ratio: self.dm_jcn_ratio,
                max_group_sv_count: self.dm_max_group_sv_count,
                high_jcn: self.dm_high_jcn,
                high_jcn_map_ratio: self.dm_high_jcn_map_ratio,
                min_cluster_jcn: self.dm_min_cluster_jcn,
                cluster_jcn_drop_ratio: self.dm_cluster_jcn_drop_ratio,
                ambiguous_jcn_ratio: self.dm_ambiguous_jcn_ratio,
                min_closed_segment_length: self.dm_min_closed_segment_length,
                min_closed_fraction: self.dm_min_closed_fraction,
                min_opposing_jcn_margin: self.dm_min_opposing_jcn_margin,
                short_assembled_length: self.dm_short_assembled_length,
            },
            bfb: BfbConfig {
                foldback_jcn_multiplier: self.bfb_foldback_jcn_multiplier,
                max_foldback_jcn_multiplier: self.bfb_max_foldback_jcn_multiplier,
                single_breakend_jcn_fraction: self.bfb_single_breakend_jcn_fraction,
            },
        }
    }
}

fn check_poly_a_length(poly_a_length: usize) -> SimpleResult<()> {
    if poly_a_length == 0 {
        bail!("--poly-a-length argument must be greater than 0");
    }

    // Check that the poly-A pattern can be built
    let _ = map_err_with!(
        get_poly_a_regex(poly_a_length),
        "Invalid poly-A pattern for --poly-a-length {poly_a_length}"
    )?;
    Ok(())
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_annotate_settings(
    settings: AnnotateSettings,
) -> SimpleResult<AnnotateSettings> {
    check_required_filename(&settings.sample_input_filename, "sample input")?;

    check_optional_filename(settings.gene_regions_filename.as_ref(), "gene regions")?;

    if let Some(sample_id) = &settings.sample_id {
        if sample_id.is_empty() {
            bail!("--sample-id argument must not be empty");
        }
    }

    if settings.min_diagnostic_cluster_size > settings.max_diagnostic_cluster_size {
        bail!(
            "--min-diagnostic-cluster-size is set above the max diagnostic cluster size of {}",
            settings.max_diagnostic_cluster_size
        );
    }

    check_poly_a_length(settings.poly_a_length)?;

    if settings.progress_iteration_interval == 0 {
        bail!("--progress-iteration-interval argument must be greater than 0");
    }

    if settings.min_length_cutoff > settings.max_length_cutoff {
        bail!(
            "--min-length-cutoff is set above the max length cutoff of {}",
            settings.max_length_cutoff
        );
    }

    if !(0.0..=1.0).contains(&settings.dm_min_closed_fraction) {
        bail!("--dm-min-closed-fraction argument must be in [0,1]");
    }

    for (ratio, label) in [
        (settings.dm_jcn_ratio, "dm-jcn-ratio"),
        (settings.dm_cluster_jcn_drop_ratio, "dm-cluster-jcn-drop-ratio"),
        (settings.dm_ambiguous_jcn_ratio, "dm-ambiguous-jcn-ratio"),
    ] {
        if ratio <= 0.0 {
            bail!("--{label} argument must be greater than 0");
        }
    }

    Ok(settings)
}

/// Write the effective settings to the output directory
pub fn write_annotate_settings(output_dir: &Utf8Path, settings: &AnnotateSettings) {
    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing annotate settings to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create annotate settings json file: '{filename}'"
    );

    unwrap!(
        serde_json::to_writer_pretty(&f, &settings),
        "Unable to write annotate settings json file: '{filename}'"
    );
}
