//! Chromosome table with centromere positions used to assign breakends to chromosome arms
//!

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Chromosome arm relative to the centromere
///
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    strum::Display,
    strum::EnumCount,
    strum::EnumString,
)]
pub enum ChromArm {
    P,
    Q,
    #[strum(serialize = "C")]
    #[serde(rename = "C")]
    Centromeric,
}

#[derive(Clone, Debug)]
pub struct ChromInfo {
    pub label: String,
    pub length: i64,

    /// Position of the centromere, breakends at exactly this position are centromeric
    pub centromere: i64,
}

/// Short arms of the acrocentric chromosomes carry no unique sequence and are excluded from
/// arm level statistics
const ACROCENTRIC_CHROMS: [&str; 5] = ["13", "14", "15", "21", "22"];

/// Approximate GRCh38 chromosome lengths and centromere midpoints
const GRCH38_CHROMS: [(&str, i64, i64); 24] = [
    ("1", 248_956_422, 123_400_000),
    ("2", 242_193_529, 93_900_000),
    ("3", 198_295_559, 90_900_000),
    ("4", 190_214_555, 50_000_000),
    ("5", 181_538_259, 48_800_000),
    ("6", 170_805_979, 59_800_000),
    ("7", 159_345_973, 60_100_000),
    ("8", 145_138_636, 45_200_000),
    ("9", 138_394_717, 43_000_000),
    ("10", 133_797_422, 39_800_000),
    ("11", 135_086_622, 53_400_000),
    ("12", 133_275_309, 35_500_000),
    ("13", 114_364_328, 17_700_000),
    ("14", 107_043_718, 17_200_000),
    ("15", 101_991_189, 19_000_000),
    ("16", 90_338_345, 36_800_000),
    ("17", 83_257_441, 25_100_000),
    ("18", 80_373_285, 18_500_000),
    ("19", 58_617_616, 26_200_000),
    ("20", 64_444_167, 28_100_000),
    ("21", 46_709_983, 12_000_000),
    ("22", 50_818_468, 15_000_000),
    ("X", 156_040_895, 60_600_000),
    ("Y", 57_227_415, 10_400_000),
];

fn strip_chr_prefix(label: &str) -> &str {
    label.strip_prefix("chr").unwrap_or(label)
}

#[derive(Clone, Debug, Default)]
pub struct ChromList {
    pub data: Vec<ChromInfo>,

    /// Chromosome labels are registered both with and without any 'chr' prefix
    pub label_to_index: HashMap<String, usize>,
}

impl ChromList {
    /// Default chromosome table for GRCh38, using 'chr' prefixed labels
    pub fn grch38() -> Self {
        let mut chrom_list = Self::default();
        for (label, length, centromere) in GRCH38_CHROMS {
            chrom_list.add_chrom(&format!("chr{label}"), length, centromere);
        }
        chrom_list
    }

    pub fn add_chrom(&mut self, label: &str, length: i64, centromere: i64) {
        let chrom_index = self.data.len();
        self.data.push(ChromInfo {
            label: label.to_string(),
            length,
            centromere,
        });
        self.label_to_index.insert(label.to_string(), chrom_index);
        let short_label = strip_chr_prefix(label);
        if short_label != label {
            self.label_to_index
                .entry(short_label.to_string())
                .or_insert(chrom_index);
        } else {
            self.label_to_index
                .entry(format!("chr{label}"))
                .or_insert(chrom_index);
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn get_index(&self, label: &str) -> Option<usize> {
        self.label_to_index.get(label).copied()
    }

    pub fn label(&self, chrom_index: usize) -> &str {
        self.data[chrom_index].label.as_str()
    }

    pub fn get_arm(&self, chrom_index: usize, pos: i64) -> ChromArm {
        let centromere = self.data[chrom_index].centromere;
        match pos.cmp(&centromere) {
            std::cmp::Ordering::Less => ChromArm::P,
            std::cmp::Ordering::Greater => ChromArm::Q,
            std::cmp::Ordering::Equal => ChromArm::Centromeric,
        }
    }

    pub fn is_acrocentric_arm(&self, chrom_index: usize, arm: ChromArm) -> bool {
        arm == ChromArm::P
            && ACROCENTRIC_CHROMS.contains(&strip_chr_prefix(self.label(chrom_index)))
    }
}
