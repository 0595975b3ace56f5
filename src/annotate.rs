//! Annotate the SV clusters of one sample
//!
//! The breakend index, noise filter, link finder and chromosome DM scan run on the whole sample
//! first. Chains, diagnostics, BFB and the cluster DM checks then run independently per cluster
//! on the worker pool.
//!

use std::collections::{BTreeMap, BTreeSet};
use std::error;
use std::sync::mpsc::channel;

use camino::Utf8Path;
use log::{info, warn};
use thousands::Separable;

use crate::bfb::check_bfb;
use crate::breakend_index::ClusteringState;
use crate::chain::ChainBuilder;
use crate::chain_diagnostics::{ChainDiagnosticRecord, ChainDiagnosticWriter, ChainDiagnostics};
use crate::cli::{AnnotateSettings, SharedSettings, write_annotate_settings};
use crate::cluster::{Cluster, ClusterAnnotation, build_clusters, get_chrom_cluster_svs};
use crate::cluster_output::write_cluster_table;
use crate::config::LinkerConfig;
use crate::double_minute::{
    ClusterDmScan, DmCandidate, DmReportRecord, DmReportWriter, DoubleMinuteData,
    get_dm_report_record, scan_chromosomes, scan_cluster,
};
use crate::gene_regions::GeneRegions;
use crate::link_finder::find_links;
use crate::log_utils::debug_msg;
use crate::run_stats::{AnnotateRunStats, write_annotate_run_stats};
use crate::sample_input::{SampleData, read_sample_input};
use crate::sv_filter::filter_breakends;
use crate::sv_graph::SvGraph;

pub const CLUSTER_TABLE_FILENAME: &str = "clusters.tsv";
pub const DM_REPORT_FILENAME: &str = "double_minutes.tsv";
pub const CHAIN_DIAGNOSTICS_FILENAME: &str = "chain_diagnostics.csv";

/// Everything produced by annotating one sample
///
pub struct SampleAnnotation {
    pub clusters: Vec<Cluster>,
    pub dm_records: Vec<DmReportRecord>,
    pub diagnostic_records: Vec<ChainDiagnosticRecord>,
    pub stats: AnnotateRunStats,
}

/// Output of the per-cluster stage
///
struct ClusterResult {
    cluster_id: usize,
    chain_count: usize,
    diagnostic_record: Option<ChainDiagnosticRecord>,
    is_valid: bool,
    is_bfb: bool,
    dm_scan: Option<ClusterDmScan>,
    dm_data: Option<DoubleMinuteData>,
}

/// Shared read-only inputs to the per-cluster stage
///
struct ClusterContext<'a> {
    graph: &'a SvGraph,
    state: &'a ClusteringState,
    chain_builder: &'a dyn ChainBuilder,
    chrom_cluster_svs: &'a [BTreeMap<usize, Vec<usize>>],
    dm_svs: &'a BTreeSet<usize>,
    sample_id: &'a str,
    config: &'a LinkerConfig,
    target_cluster_id: Option<usize>,
}

fn process_cluster(context: &ClusterContext, cluster: &Cluster) -> ClusterResult {
    let graph = context.graph;
    let debug = context.target_cluster_id == Some(cluster.id);

    let mut diagnostics = ChainDiagnostics::new(
        &context.config.diagnostics,
        context.sample_id,
        cluster,
        context.dm_svs,
    );
    let (chains, is_valid) = match context
        .chain_builder
        .build_chains(graph, cluster, &mut diagnostics)
    {
        Ok(chains) => (chains, true),
        Err(msg) => {
            warn!("Chain search failed for cluster {}: {msg}", cluster.id);
            (Vec::new(), false)
        }
    };
    debug_msg!(
        debug,
        "Cluster {} sv_count: {} chains: {} diagnostics active: {}",
        cluster.id,
        cluster.sv_count(),
        chains.len(),
        diagnostics.is_active()
    );

    let is_bfb = check_bfb(graph, cluster, &context.config.bfb);

    let dm_scan = scan_cluster(
        graph,
        cluster,
        context.chrom_cluster_svs,
        &context.config.double_minute,
    );
    let dm_data = dm_scan.as_ref().map(|scan| {
        let mut dm_data = DoubleMinuteData::new(cluster.id, scan.sv_indices.clone());
        dm_data.check_criteria(
            graph,
            context.state,
            cluster,
            &chains,
            &context.config.double_minute,
        );
        debug_msg!(debug, "Cluster {} DM data: {:?}", cluster.id, dm_data);
        dm_data
    });

    ClusterResult {
        cluster_id: cluster.id,
        chain_count: chains.len(),
        diagnostic_record: diagnostics.record,
        is_valid,
        is_bfb,
        dm_scan,
        dm_data,
    }
}

/// Run the per-cluster stage over all clusters not excluded by filtering
///
/// Results are returned in cluster id order.
///
fn process_clusters(
    context: &ClusterContext,
    clusters: &[Cluster],
    thread_count: usize,
) -> Vec<ClusterResult> {
    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .unwrap();

    let (tx, rx) = channel();

    worker_pool.scope(move |scope| {
        for cluster in clusters.iter().filter(|x| x.exclusion.is_none()) {
            let tx = tx.clone();
            scope.spawn(move |_| {
                let result = process_cluster(context, cluster);
                tx.send(result).unwrap();
            });
        }
    });

    let mut results = rx.into_iter().collect::<Vec<_>>();
    results.sort_by_key(|x| x.cluster_id);
    results
}

/// Convert a confirmed or plausible cluster DM into a report candidate
fn get_cluster_dm_candidate(dm_data: &DoubleMinuteData) -> DmCandidate {
    let mut sv_indices = dm_data.sv_indices.clone();
    sv_indices.sort();
    DmCandidate {
        sv_indices,
        is_complete: dm_data.is_double_minute(),
        chain_length: dm_data.closed_length,
    }
}

/// Run all annotation stages on one sample
///
/// The sample graph is updated in place with exclusions, links and cluster assignments.
///
pub fn annotate_sample(
    sample: &mut SampleData,
    gene_regions: &GeneRegions,
    config: &LinkerConfig,
    thread_count: usize,
    target_cluster_id: Option<usize>,
) -> Result<SampleAnnotation, regex::Error> {
    let mut stats = AnnotateRunStats {
        sample_id: sample.info.sample_id.clone(),
        ..Default::default()
    };
    let graph = &mut sample.graph;
    stats.sample.sv_count = graph.svs.len();
    stats.sample.breakend_count = graph.breakends.len();

    let mut state = ClusteringState::populate(graph);
    for (chrom_index, breakends) in state.chrom_breakends.iter().enumerate() {
        if !breakends.is_empty() && !graph.copy_number.has_chrom_data(chrom_index) {
            warn!(
                "No copy number segments for chromosome '{}' with {} breakends",
                graph.chrom_list.label(chrom_index),
                breakends.len()
            );
        }
    }

    stats.filter = filter_breakends(graph, &mut state, config)?;
    stats.cn_events = state.prepare(graph, &config.length_cutoffs);
    stats.length_cutoffs = state.length_cutoffs.clone();
    stats.sample.indexed_breakend_count = state.breakend_count();

    let mut clusters = build_clusters(graph, &sample.upstream_clusters);
    stats.sample.cluster_count = clusters.len();
    info!(
        "Built {} clusters from {} SVs",
        clusters.len().separate_with_commas(),
        stats.sample.sv_count.separate_with_commas()
    );

    stats.links = find_links(graph, &state, &mut clusters, &config.links);

    let graph = &sample.graph;
    let chrom_candidates = scan_chromosomes(graph, &state, &config.double_minute);
    let dm_svs = chrom_candidates
        .iter()
        .filter(|x| x.is_complete)
        .flat_map(|x| x.sv_indices.iter().copied())
        .collect::<BTreeSet<_>>();
    for candidate in chrom_candidates.iter() {
        if candidate.is_complete {
            stats.double_minutes.complete_chromosome_candidates += 1;
        } else {
            stats.double_minutes.incomplete_chromosome_candidates += 1;
        }
    }

    let chrom_cluster_svs = get_chrom_cluster_svs(graph);
    let context = ClusterContext {
        graph,
        state: &state,
        chain_builder: &sample.chain_builder,
        chrom_cluster_svs: &chrom_cluster_svs,
        dm_svs: &dm_svs,
        sample_id: &sample.info.sample_id,
        config,
        target_cluster_id,
    };
    let results = process_clusters(&context, &clusters, thread_count);

    let mut dm_records = chrom_candidates
        .iter()
        .map(|x| get_dm_report_record(graph, &sample.info, x, gene_regions))
        .collect::<Vec<_>>();
    let mut diagnostic_records = Vec::new();

    stats.bfb.clusters_with_foldbacks = clusters
        .iter()
        .filter(|x| x.exclusion.is_none() && !x.foldbacks.is_empty())
        .count();

    for result in results {
        let cluster = &mut clusters[result.cluster_id];
        stats.sample.chain_count += result.chain_count;
        stats
            .chain_diagnostics
            .add_cluster(result.diagnostic_record.as_ref(), result.is_valid);
        if let Some(record) = result.diagnostic_record {
            diagnostic_records.push(record);
        }

        if result.is_bfb {
            cluster.annotations.insert(ClusterAnnotation::Bfb);
            stats.bfb.bfb_clusters += 1;
        }

        let (Some(dm_scan), Some(dm_data)) = (result.dm_scan, result.dm_data) else {
            continue;
        };
        stats.double_minutes.plausible_clusters += 1;
        if dm_scan.is_ambiguous {
            stats.double_minutes.ambiguous_clusters += 1;
        }
        if dm_data.is_double_minute() {
            stats.double_minutes.confirmed_clusters += 1;
            cluster.annotations.insert(if dm_scan.is_ambiguous {
                ClusterAnnotation::DoubleMinuteUnclear
            } else {
                ClusterAnnotation::DoubleMinute
            });
        }
        let candidate = get_cluster_dm_candidate(&dm_data);
        dm_records.push(get_dm_report_record(
            graph,
            &sample.info,
            &candidate,
            gene_regions,
        ));
    }

    // The index is not needed once all report rows are built
    state.reset(&mut sample.graph);

    info!(
        "Annotated {} BFB clusters and {} double minute clusters, with {} chromosome scan DM candidates",
        stats.bfb.bfb_clusters.separate_with_commas(),
        stats.double_minutes.confirmed_clusters.separate_with_commas(),
        chrom_candidates.len().separate_with_commas()
    );

    Ok(SampleAnnotation {
        clusters,
        dm_records,
        diagnostic_records,
        stats,
    })
}

/// Read one sample, annotate it and write all results to the output directory
///
pub fn run_annotate(
    shared_settings: &SharedSettings,
    settings: &AnnotateSettings,
) -> Result<(), Box<dyn error::Error>> {
    let start = std::time::Instant::now();
    let output_dir = settings.output_dir.as_path();

    write_annotate_settings(output_dir, settings);

    let config = settings.get_linker_config();

    info!(
        "Reading sample input from file: '{}'",
        settings.sample_input_filename
    );
    let mut sample = read_sample_input(Utf8Path::new(&settings.sample_input_filename));
    if let Some(sample_id) = &settings.sample_id {
        sample.info.sample_id = sample_id.clone();
    }
    info!(
        "Annotating sample '{}' with {} SVs in {} upstream clusters",
        sample.info.sample_id,
        sample.graph.svs.len().separate_with_commas(),
        sample.upstream_clusters.len().separate_with_commas()
    );

    let gene_regions = match &settings.gene_regions_filename {
        Some(filename) => GeneRegions::from_bed(Utf8Path::new(filename), &sample.graph.chrom_list),
        None => GeneRegions::new(sample.graph.chrom_list.len()),
    };

    let mut annotation = annotate_sample(
        &mut sample,
        &gene_regions,
        &config,
        shared_settings.thread_count,
        settings.target_cluster_id,
    )?;

    write_cluster_table(
        &output_dir.join(CLUSTER_TABLE_FILENAME),
        &sample.graph,
        &annotation.clusters,
    );

    let mut dm_writer = DmReportWriter::new(&output_dir.join(DM_REPORT_FILENAME));
    dm_writer.write_records(annotation.dm_records.iter());

    if settings.write_diagnostics {
        let filename = output_dir.join(CHAIN_DIAGNOSTICS_FILENAME);
        info!("Writing chain diagnostics to file: '{filename}'");
        let mut diagnostic_writer = ChainDiagnosticWriter::new(&filename);
        diagnostic_writer.write_records(annotation.diagnostic_records.iter());
        if diagnostic_writer.is_enabled() {
            info!(
                "Wrote chain diagnostics for {} clusters",
                annotation.diagnostic_records.len().separate_with_commas()
            );
        }
    }

    annotation.stats.total_runtime_secs = start.elapsed().as_secs_f64();
    write_annotate_run_stats(output_dir, &annotation.stats);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainTemplate, PrecomputedChains};
    use crate::sample_input::SampleInfo;
    use crate::sv::SvType;
    use crate::test_utils::*;

    /// Sample with a highly amplified circular duplication and one unrelated deletion
    fn get_dm_sample() -> SampleData {
        let mut graph = get_test_graph();
        set_flat_copy_number(&mut graph, 0, 2.0);
        let del = add_test_sv(
            &mut graph,
            SvType::Del,
            1.0,
            &[(0, 1000, LeftAnchor), (0, 3000, RightAnchor)],
        );
        let dup = add_test_sv(
            &mut graph,
            SvType::Dup,
            12.0,
            &[(0, 10_000, RightAnchor), (0, 50_000, LeftAnchor)],
        );
        let [Some(start), Some(end)] = graph.svs[dup].breakends else {
            panic!("Missing DUP breakends");
        };
        SampleData {
            info: SampleInfo {
                sample_id: "tumor1".to_string(),
                purity: 0.7,
                ploidy: 2.0,
            },
            graph,
            upstream_clusters: vec![vec![del], vec![dup]],
            chain_builder: PrecomputedChains {
                templates: vec![ChainTemplate {
                    sv_indices: vec![dup],
                    links: vec![[start, end]],
                    is_closed: true,
                }],
            },
        }
    }

    #[test]
    fn test_annotate_double_minute_sample() {
        let mut sample = get_dm_sample();
        let gene_regions = GeneRegions::new(sample.graph.chrom_list.len());
        let annotation = annotate_sample(
            &mut sample,
            &gene_regions,
            &LinkerConfig::default(),
            2,
            None,
        )
        .unwrap();

        assert_eq!(annotation.clusters.len(), 2);
        let dm_cluster = &annotation.clusters[1];
        assert!(dm_cluster.annotations.contains(&ClusterAnnotation::DoubleMinute));
        assert_eq!(dm_cluster.resolved_type(&sample.graph), "DOUBLE_MINUTE");
        assert!(annotation.clusters[0].annotations.is_empty());

        // One row from the chromosome scan and one from the cluster scan
        assert_eq!(annotation.dm_records.len(), 2);
        assert!(annotation.dm_records.iter().all(|x| x.is_complete));
        assert!(annotation.dm_records.iter().all(|x| x.sv_ids == "sv1"));
        assert!(annotation.dm_records.iter().all(|x| x.sample_id == "tumor1"));

        let stats = &annotation.stats;
        assert_eq!(stats.sample.cluster_count, 2);
        assert_eq!(stats.sample.chain_count, 1);
        assert_eq!(stats.double_minutes.complete_chromosome_candidates, 1);
        assert_eq!(stats.double_minutes.plausible_clusters, 1);
        assert_eq!(stats.double_minutes.confirmed_clusters, 1);

        // The single SV cluster is too small and the DM cluster is already resolved
        assert!(annotation.diagnostic_records.is_empty());
        assert_eq!(stats.chain_diagnostics.clusters_skipped, 2);
        assert_eq!(stats.chain_diagnostics.clusters_invalid, 0);
    }

    #[test]
    fn test_cluster_dm_candidate() {
        let mut dm_data = DoubleMinuteData::new(3, vec![5, 2]);
        dm_data.closed_length = 1200;
        let candidate = get_cluster_dm_candidate(&dm_data);
        assert_eq!(candidate.sv_indices, vec![2, 5]);
        assert!(!candidate.is_complete);
        assert_eq!(candidate.chain_length, 1200);
    }
}
