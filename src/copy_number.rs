//! Copy number segments, arm-end copy number and LOH/homozygous loss events
//!

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chrom_list::ChromArm;
use crate::sv::{Breakend, BreakendDirection};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CopyNumberSegment {
    pub start: i64,
    pub end: i64,
    pub copy_number: f64,
    pub major_allele_ploidy: f64,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize, strum::Display)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CnEventKind {
    Loh,
    HomLoss,
}

/// An LOH or homozygous loss region, bounded by SVs at either end where known
///
#[derive(Clone, Debug)]
pub struct CnEvent {
    pub kind: CnEventKind,
    pub chrom_index: usize,
    pub start: i64,
    pub end: i64,
    pub start_sv: Option<usize>,
    pub end_sv: Option<usize>,

    /// Breakends matched to the start and end of the event
    pub breakends: [Option<usize>; 2],
}

/// Per-sample copy number data, indexed by chromosome
///
#[derive(Clone, Debug, Default)]
pub struct CopyNumberData {
    /// Position sorted, non-overlapping segments for each chromosome
    pub chrom_segments: Vec<Vec<CopyNumberSegment>>,

    /// Copy number at the (telomere, centromere) ends of each chromosome arm
    pub arm_ends: BTreeMap<(usize, ChromArm), (f64, f64)>,
}

impl CopyNumberData {
    pub fn new(chrom_count: usize) -> Self {
        Self {
            chrom_segments: vec![Vec::new(); chrom_count],
            arm_ends: BTreeMap::new(),
        }
    }

    pub fn has_chrom_data(&self, chrom_index: usize) -> bool {
        self.chrom_segments
            .get(chrom_index)
            .is_some_and(|x| !x.is_empty())
    }

    /// Sort each chromosome's segments by position
    pub fn sort_segments(&mut self) {
        for segments in self.chrom_segments.iter_mut() {
            segments.sort_by_key(|x| x.start);
        }
    }

    fn get_segment(&self, chrom_index: usize, pos: i64) -> Option<&CopyNumberSegment> {
        let segments = self.chrom_segments.get(chrom_index)?;
        let index = segments.partition_point(|x| x.end <= pos);
        segments.get(index).filter(|x| x.start <= pos)
    }

    /// Major allele ploidy of the segment containing pos
    pub fn major_allele_ploidy_at(&self, chrom_index: usize, pos: i64) -> Option<f64> {
        self.get_segment(chrom_index, pos)
            .map(|x| x.major_allele_ploidy)
    }

    /// Major allele ploidy of the segment on the lost side of a breakend
    ///
    /// For a left-anchored breakend this is the segment starting immediately after the breakend.
    ///
    pub fn outer_major_allele_ploidy(&self, breakend: &Breakend) -> Option<f64> {
        let pos = match breakend.dir {
            BreakendDirection::LeftAnchor => breakend.pos + 1,
            BreakendDirection::RightAnchor => breakend.pos - 1,
        };
        self.major_allele_ploidy_at(breakend.chrom_index, pos)
    }

    /// Major allele ploidy at the telomere end of the given arm
    pub fn telomere_major_allele_ploidy(&self, chrom_index: usize, arm: ChromArm) -> Option<f64> {
        let segments = self.chrom_segments.get(chrom_index)?;
        let segment = match arm {
            ChromArm::Q => segments.last(),
            _ => segments.first(),
        };
        segment.map(|x| x.major_allele_ploidy)
    }

    /// Highest of the telomere and centromere end copy numbers of the given arm
    pub fn arm_end_copy_number(&self, chrom_index: usize, arm: ChromArm) -> Option<f64> {
        self.arm_ends
            .get(&(chrom_index, arm))
            .map(|(telomere, centromere)| telomere.max(*centromere))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::get_test_breakend;

    fn get_test_cn_data() -> CopyNumberData {
        let mut cn_data = CopyNumberData::new(2);
        cn_data.chrom_segments[0] = vec![
            CopyNumberSegment {
                start: 0,
                end: 1000,
                copy_number: 2.0,
                major_allele_ploidy: 1.0,
            },
            CopyNumberSegment {
                start: 1000,
                end: 2000,
                copy_number: 8.0,
                major_allele_ploidy: 6.0,
            },
            CopyNumberSegment {
                start: 2000,
                end: 5000,
                copy_number: 3.0,
                major_allele_ploidy: 2.0,
            },
        ];
        cn_data.arm_ends.insert((0, ChromArm::P), (2.0, 3.5));
        cn_data
    }

    #[test]
    fn test_segment_lookup() {
        let cn_data = get_test_cn_data();
        assert_eq!(cn_data.major_allele_ploidy_at(0, 999), Some(1.0));
        assert_eq!(cn_data.major_allele_ploidy_at(0, 1000), Some(6.0));
        assert_eq!(cn_data.major_allele_ploidy_at(0, 5000), None);
        assert_eq!(cn_data.major_allele_ploidy_at(1, 10), None);
        assert!(!cn_data.has_chrom_data(1));
    }

    #[test]
    fn test_outer_major_allele_ploidy() {
        let cn_data = get_test_cn_data();
        let be = get_test_breakend(0, 1000, BreakendDirection::RightAnchor);
        assert_eq!(cn_data.outer_major_allele_ploidy(&be), Some(1.0));
        let be = get_test_breakend(0, 1999, BreakendDirection::LeftAnchor);
        assert_eq!(cn_data.outer_major_allele_ploidy(&be), Some(2.0));
    }

    #[test]
    fn test_arm_ends() {
        let cn_data = get_test_cn_data();
        assert_eq!(cn_data.telomere_major_allele_ploidy(0, ChromArm::P), Some(1.0));
        assert_eq!(cn_data.telomere_major_allele_ploidy(0, ChromArm::Q), Some(2.0));
        assert_eq!(cn_data.arm_end_copy_number(0, ChromArm::P), Some(3.5));
        assert_eq!(cn_data.arm_end_copy_number(0, ChromArm::Q), None);
    }
}
