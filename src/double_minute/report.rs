use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;

use camino::Utf8Path;
use itertools::Itertools;
use log::{error, info};
use serde::Serialize;

use super::DmCandidate;
use crate::gene_regions::GeneRegions;
use crate::sample_input::SampleInfo;
use crate::sv_graph::SvGraph;
use crate::utils::format_label_counts;

/// One row of the double minute report
///
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DmReportRecord {
    pub sample_id: String,
    pub purity: f64,
    pub ploidy: f64,
    pub is_complete: bool,
    pub sv_count: usize,
    pub cluster_info: String,
    pub sv_types: String,
    pub sv_ids: String,
    pub chromosomes: String,
    pub pos_start: String,
    pub pos_end: String,
    pub max_copy_number: f64,
    pub min_ploidy: f64,
    pub overlap_count: usize,
    pub chain_length: i64,
    pub amplified_genes: String,
}

/// Build the report row for a candidate
///
/// Per-chromosome fields are listed in chromosome order, where each chromosome's span runs from the
/// lowest to the highest candidate breakend. The overlap count is the number of SVs outside of the
/// candidate with a breakend inside any of these spans.
///
pub fn get_dm_report_record(
    graph: &SvGraph,
    sample: &SampleInfo,
    candidate: &DmCandidate,
    gene_regions: &GeneRegions,
) -> DmReportRecord {
    let svs = candidate
        .sv_indices
        .iter()
        .map(|&x| &graph.svs[x])
        .collect::<Vec<_>>();
    let breakends = svs
        .iter()
        .flat_map(|x| x.breakend_indices())
        .map(|x| &graph.breakends[x])
        .collect::<Vec<_>>();

    let mut chrom_spans = BTreeMap::new();
    for be in breakends.iter() {
        let span = chrom_spans
            .entry(be.chrom_index)
            .or_insert((be.pos, be.pos));
        span.0 = span.0.min(be.pos);
        span.1 = span.1.max(be.pos);
    }

    let candidate_svs = candidate.sv_indices.iter().copied().collect::<BTreeSet<_>>();
    let overlap_count = graph
        .breakends
        .iter()
        .filter(|be| {
            be.chrom_list_index.is_some()
                && !candidate_svs.contains(&be.sv_index)
                && chrom_spans
                    .get(&be.chrom_index)
                    .is_some_and(|&(start, end)| be.pos >= start && be.pos <= end)
        })
        .map(|be| be.sv_index)
        .collect::<BTreeSet<_>>()
        .len();

    let mut genes = chrom_spans
        .iter()
        .flat_map(|(&chrom_index, &(start, end))| {
            gene_regions.find_genes(chrom_index, start, end + 1)
        })
        .collect::<Vec<_>>();
    genes.sort();
    genes.dedup();

    let cluster_labels = svs
        .iter()
        .map(|x| x.cluster_index.map_or("NONE".to_string(), |c| c.to_string()))
        .collect::<Vec<_>>();

    DmReportRecord {
        sample_id: sample.sample_id.clone(),
        purity: sample.purity,
        ploidy: sample.ploidy,
        is_complete: candidate.is_complete,
        sv_count: svs.len(),
        cluster_info: format_label_counts(cluster_labels.iter().map(|x| x.as_str())),
        sv_types: format_label_counts(svs.iter().map(|x| <&str>::from(x.sv_type))),
        sv_ids: svs.iter().map(|x| x.id.as_str()).join(";"),
        chromosomes: chrom_spans
            .keys()
            .map(|&x| graph.chrom_list.label(x))
            .join(";"),
        pos_start: chrom_spans.values().map(|x| x.0).join(";"),
        pos_end: chrom_spans.values().map(|x| x.1).join(";"),
        max_copy_number: breakends
            .iter()
            .map(|x| x.copy_number)
            .fold(0.0, f64::max),
        min_ploidy: svs
            .iter()
            .map(|x| x.jcn.point)
            .reduce(f64::min)
            .unwrap_or(0.0),
        overlap_count,
        chain_length: candidate.chain_length,
        amplified_genes: genes.join(";"),
    }
}

/// Tab-delimited writer for the double minute report
///
pub struct DmReportWriter {
    writer: Option<csv::Writer<File>>,
}

impl DmReportWriter {
    pub fn new(filename: &Utf8Path) -> Self {
        info!("Writing double minute report to file: '{filename}'");
        let writer = match csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(filename)
        {
            Ok(x) => Some(x),
            Err(e) => {
                error!("Unable to create double minute report '{filename}': {e}");
                None
            }
        };
        Self { writer }
    }

    pub fn write_records<'a>(&mut self, records: impl IntoIterator<Item = &'a DmReportRecord>) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let result = records
            .into_iter()
            .try_for_each(|x| writer.serialize(x))
            .and_then(|_| writer.flush().map_err(csv::Error::from));
        if let Err(e) = result {
            error!("Failed to write double minute report, disabling output: {e}");
            self.writer = None;
        }
    }
}
