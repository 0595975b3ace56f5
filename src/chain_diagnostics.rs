//! Structural checks and reporting wrapped around the chain search of each cluster
//!

use std::collections::BTreeSet;
use std::fs::File;

use camino::Utf8Path;
use log::{error, info, warn};
use serde::Serialize;
use simple_error::SimpleResult;

use crate::chain::{Chain, ChainSearchState, SearchMonitor};
use crate::cluster::Cluster;
use crate::config::DiagnosticsConfig;
use crate::links::LinkSource;
use crate::sv::{StructuralVariant, SvType};
use crate::sv_graph::SvGraph;

/// One row of the chain diagnostics table
///
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChainDiagnosticRecord {
    pub sample_id: String,
    pub cluster_id: usize,
    pub sv_count: usize,
    pub rep_sv_count: u32,
    pub chains: usize,
    #[serde(rename = "SGLs")]
    pub sgls: usize,
    pub warnings: usize,
    pub max_rep: u32,
    #[serde(rename = "UnlinkedSVs")]
    pub unlinked_svs: usize,
    #[serde(rename = "UnlinkedBEs")]
    pub unlinked_bes: usize,
    #[serde(rename = "InvalidBEs")]
    pub invalid_bes: usize,
    pub foldbacks: usize,
    pub comp_dups: usize,
}

/// A duplication represented more than once in the cluster's chains
pub fn is_complex_dup(sv: &StructuralVariant) -> bool {
    sv.sv_type == SvType::Dup && sv.replication_count >= 2
}

/// True if the cluster qualifies for diagnostics
///
/// Clusters outside of the configured size range are skipped for cost reasons, as are clusters
/// holding SVs already resolved as part of a double minute.
///
pub fn should_run_diagnostics(
    config: &DiagnosticsConfig,
    cluster: &Cluster,
    dm_svs: &BTreeSet<usize>,
) -> bool {
    let sv_count = cluster.sv_count();
    sv_count >= config.min_cluster_size
        && sv_count <= config.max_cluster_size
        && !cluster.sv_indices.iter().any(|x| dm_svs.contains(x))
}

/// Count breakends with more candidate links than foldbacks, complex duplications and assembly can
/// explain
///
pub fn check_multi_connections(graph: &SvGraph, cluster_id: usize, state: &ChainSearchState) -> usize {
    let mut invalid_count = 0;
    for (&breakend_index, links) in state.candidate_links.iter() {
        if links.len() <= 1 {
            continue;
        }
        let mut explained = 0;
        let mut assembled = 0;
        for &link_index in links.iter() {
            let link = &graph.links[link_index];
            if link.source == LinkSource::Assembled {
                assembled += 1;
            }
            let other_sv = graph.sv_of(link.other_breakend(breakend_index));
            if other_sv.is_foldback() || is_complex_dup(other_sv) {
                explained += 1;
            }
        }
        let unexplained = links.len() - explained;
        if unexplained > 1 && unexplained != assembled {
            warn!(
                "Cluster {cluster_id} breakend {:?} has {} connections, {unexplained} unexplained",
                graph.breakends[breakend_index],
                links.len()
            );
            invalid_count += 1;
        }
    }
    invalid_count
}

/// Search monitor checking and summarizing the chain search of one cluster
///
pub struct ChainDiagnostics<'a> {
    config: &'a DiagnosticsConfig,
    sample_id: &'a str,
    is_active: bool,
    log_progress: bool,
    cluster_id: usize,
    warnings: usize,
    initial_state: Option<ChainSearchState>,
    pub record: Option<ChainDiagnosticRecord>,
}

impl<'a> ChainDiagnostics<'a> {
    pub fn new(
        config: &'a DiagnosticsConfig,
        sample_id: &'a str,
        cluster: &Cluster,
        dm_svs: &BTreeSet<usize>,
    ) -> Self {
        Self {
            config,
            sample_id,
            is_active: should_run_diagnostics(config, cluster, dm_svs),
            log_progress: false,
            cluster_id: cluster.id,
            warnings: 0,
            initial_state: None,
            record: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

impl SearchMonitor for ChainDiagnostics<'_> {
    fn on_search_start(&mut self, _graph: &SvGraph, cluster: &Cluster, state: &ChainSearchState) {
        if !self.is_active {
            return;
        }
        self.log_progress = cluster.requires_replication
            && cluster.sv_count() >= self.config.progress_min_sv_count;
        self.initial_state = Some(state.clone());
    }

    fn on_iteration(&mut self, iteration: usize, state: &ChainSearchState) -> SimpleResult<()> {
        if !self.is_active {
            return Ok(());
        }
        if self.log_progress && iteration % self.config.progress_iteration_interval == 0 {
            info!(
                "Cluster {} chain search iteration {iteration}, {} links applied, {} breakends unlinked",
                self.cluster_id,
                state.applied_links,
                state.unlinked_breakend_count()
            );
        }
        if let Err(msg) = state.check_validity() {
            error!(
                "Cluster {} invalid chain search state at iteration {iteration}: {msg}",
                self.cluster_id
            );
            self.warnings += 1;
            return Err(msg);
        }
        Ok(())
    }

    fn on_search_complete(
        &mut self,
        graph: &SvGraph,
        cluster: &Cluster,
        chains: &[Chain],
        state: &ChainSearchState,
    ) {
        if !self.is_active {
            return;
        }

        let invalid_bes = match &self.initial_state {
            Some(initial_state) if chains.len() <= self.config.max_chains_for_connection_check => {
                check_multi_connections(graph, cluster.id, initial_state)
            }
            _ => 0,
        };

        let chained_svs = chains
            .iter()
            .flat_map(|x| x.sv_indices.iter().copied())
            .collect::<BTreeSet<_>>();
        let svs = cluster
            .sv_indices
            .iter()
            .map(|&x| &graph.svs[x])
            .collect::<Vec<_>>();

        self.record = Some(ChainDiagnosticRecord {
            sample_id: self.sample_id.to_string(),
            cluster_id: cluster.id,
            sv_count: svs.len(),
            rep_sv_count: svs.iter().map(|x| x.replication_count.max(1)).sum(),
            chains: chains.len(),
            sgls: svs.iter().filter(|x| x.is_single_ended()).count(),
            warnings: self.warnings,
            max_rep: svs
                .iter()
                .map(|x| x.replication_count)
                .max()
                .unwrap_or(0),
            unlinked_svs: cluster
                .sv_indices
                .iter()
                .filter(|x| !chained_svs.contains(x))
                .count(),
            unlinked_bes: state.unlinked_breakend_count(),
            invalid_bes,
            foldbacks: cluster.foldbacks.len(),
            comp_dups: svs.iter().filter(|x| is_complex_dup(x)).count(),
        });
    }
}

/// Writer for the chain diagnostics table
///
/// The header is written with the first record. Any write failure is logged and disables further
/// output, without interrupting the run.
///
pub struct ChainDiagnosticWriter {
    writer: Option<csv::Writer<File>>,
}

impl ChainDiagnosticWriter {
    pub fn new(filename: &Utf8Path) -> Self {
        let writer = match csv::Writer::from_path(filename) {
            Ok(x) => Some(x),
            Err(e) => {
                error!("Unable to create chain diagnostics file '{filename}': {e}");
                None
            }
        };
        Self { writer }
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn write_records<'a>(&mut self, records: impl IntoIterator<Item = &'a ChainDiagnosticRecord>) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let result = records
            .into_iter()
            .try_for_each(|x| writer.serialize(x))
            .and_then(|_| writer.flush().map_err(csv::Error::from));
        if let Err(e) = result {
            error!("Failed to write chain diagnostics, disabling output: {e}");
            self.writer = None;
        }
    }
}

/// Totals over all clusters for the run statistics
///
#[derive(Clone, Debug, Default, Serialize)]
pub struct DiagnosticStats {
    pub clusters_checked: usize,
    pub clusters_skipped: usize,
    pub clusters_invalid: usize,
    pub invalid_breakends: usize,
}

impl DiagnosticStats {
    pub fn add_cluster(&mut self, record: Option<&ChainDiagnosticRecord>, is_valid: bool) {
        match record {
            Some(record) => {
                self.clusters_checked += 1;
                self.invalid_breakends += record.invalid_bes;
            }
            None => self.clusters_skipped += 1,
        }
        if !is_valid {
            self.clusters_invalid += 1;
        }
    }
}
