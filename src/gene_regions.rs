//! Gene region lookup used to annotate amplified regions
//!

use std::fs::File;
use std::io::{BufRead, BufReader, Read};

use bio::data_structures::interval_tree::IntervalTree;
use camino::Utf8Path;
use flate2::read::MultiGzDecoder;
use log::{info, warn};
use unwrap::unwrap;

use crate::chrom_list::ChromList;

/// Gene names indexed by region for one chromosome
///
#[derive(Clone)]
pub struct ChromGeneRegions {
    regions: IntervalTree<i64, String>,
}

impl ChromGeneRegions {
    pub fn new() -> Self {
        Self {
            regions: IntervalTree::new(),
        }
    }

    pub fn add_gene(&mut self, start: i64, end: i64, gene: &str) {
        self.regions.insert(start..end, gene.to_string());
    }

    /// Names of all genes intersecting [start,end)
    pub fn find_genes(&self, start: i64, end: i64) -> impl Iterator<Item = &str> {
        self.regions.find(start..end).map(|x| x.data().as_str())
    }
}

/// Gene regions for every chromosome of the sample
///
/// An empty object is used when no gene annotation is provided, in which case every query returns
/// no genes.
///
#[derive(Clone, Default)]
pub struct GeneRegions {
    chroms: Vec<ChromGeneRegions>,
}

impl GeneRegions {
    pub fn new(chrom_count: usize) -> Self {
        Self {
            chroms: vec![ChromGeneRegions::new(); chrom_count],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chroms.is_empty()
    }

    pub fn add_gene(&mut self, chrom_index: usize, start: i64, end: i64, gene: &str) {
        self.chroms[chrom_index].add_gene(start, end, gene);
    }

    /// Sorted, unique gene names intersecting [start,end) on the given chromosome
    pub fn find_genes(&self, chrom_index: usize, start: i64, end: i64) -> Vec<String> {
        let Some(chrom_regions) = self.chroms.get(chrom_index) else {
            return Vec::new();
        };
        let mut genes = chrom_regions
            .find_genes(start, end)
            .map(|x| x.to_string())
            .collect::<Vec<_>>();
        genes.sort();
        genes.dedup();
        genes
    }

    /// Parse bed records of the form 'chrom start end gene_name'
    ///
    /// Records on chromosomes missing from chrom_list are counted and skipped.
    ///
    pub fn from_reader(reader: impl BufRead, chrom_list: &ChromList) -> Result<Self, String> {
        let mut gene_regions = Self::new(chrom_list.len());
        let mut unknown_chrom_count = 0;
        for (line_index, line) in reader.lines().enumerate() {
            let line = line.map_err(|e| e.to_string())?;
            if line.is_empty() || line.starts_with('#') || line.starts_with("track") {
                continue;
            }
            let words = line.split('\t').collect::<Vec<_>>();
            if words.len() < 4 {
                return Err(format!(
                    "Expected at least 4 columns on line {}",
                    line_index + 1
                ));
            }
            let Some(chrom_index) = chrom_list.get_index(words[0]) else {
                unknown_chrom_count += 1;
                continue;
            };
            let parse_pos = |x: &str| {
                x.parse::<i64>()
                    .map_err(|_| format!("Invalid position '{x}' on line {}", line_index + 1))
            };
            let start = parse_pos(words[1])?;
            let end = parse_pos(words[2])?;
            if start < 0 || end < start {
                return Err(format!(
                    "Invalid interval {start}-{end} on line {}",
                    line_index + 1
                ));
            }
            gene_regions.add_gene(chrom_index, start, end, words[3]);
        }
        if unknown_chrom_count > 0 {
            warn!("Skipped {unknown_chrom_count} gene regions on unknown chromosomes");
        }
        Ok(gene_regions)
    }

    /// Read gene regions from a bed file, which may be gzip compressed
    ///
    pub fn from_bed(filename: &Utf8Path, chrom_list: &ChromList) -> Self {
        info!("Reading gene regions from bed file: '{filename}'");

        let f = unwrap!(
            File::open(filename),
            "Unable to open gene regions file: '{filename}'"
        );
        let reader: Box<dyn Read> = if filename.extension() == Some("gz") {
            Box::new(MultiGzDecoder::new(f))
        } else {
            Box::new(f)
        };
        unwrap!(
            Self::from_reader(BufReader::new(reader), chrom_list),
            "Can't parse gene regions file: '{filename}'"
        )
    }
}
