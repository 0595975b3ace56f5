use std::fmt;

use serde::{Deserialize, Serialize};
pub use strum::EnumCount;

use crate::chrom_list::ChromArm;
use crate::sv_filter::ExclusionReason;

/// Direction of a breakend
///
/// 'LeftAnchor' means that the sequence to the left side of the breakend is retained on the
/// derivative molecule, as for the left side of a simple deletion. This corresponds to the +1
/// orientation convention, and 'RightAnchor' to -1.
///
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, PartialOrd, Ord, Serialize, EnumCount)]
pub enum BreakendDirection {
    LeftAnchor,
    RightAnchor,
}

impl BreakendDirection {
    pub fn orientation(&self) -> i8 {
        match self {
            Self::LeftAnchor => 1,
            Self::RightAnchor => -1,
        }
    }

    pub fn from_orientation(orientation: i8) -> Option<Self> {
        match orientation {
            1 => Some(Self::LeftAnchor),
            -1 => Some(Self::RightAnchor),
            _ => None,
        }
    }
}

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
    strum::IntoStaticStr,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum SvType {
    Del,
    Dup,
    Inv,
    Ins,
    Bnd,
    Sgl,
    Inf,
}

impl SvType {
    /// True for the types with only one real breakend
    pub fn is_single_ended(&self) -> bool {
        matches!(self, Self::Sgl | Self::Inf)
    }
}

/// Junction copy number estimate
///
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Jcn {
    pub point: f64,
    pub min: f64,
    pub max: f64,
}

impl Jcn {
    #[cfg(test)]
    pub fn from_point(point: f64) -> Self {
        Self {
            point,
            min: point,
            max: point,
        }
    }
}

/// Foldback annotation supplied by upstream clustering
///
#[derive(Clone, Debug)]
pub struct FoldbackInfo {
    /// Index of the other SV forming the foldback, equal to the owning SV for a single inversion
    pub partner_sv: usize,

    /// True if the foldback is formed by two distinct SVs joined by a short link
    pub is_chained: bool,
}

/// Relation of an SV to its closest neighboring SV
///
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum NearestRelation {
    Neighbour,
    Overlap,
}

#[derive(Clone, Debug)]
pub struct NearestSv {
    pub distance: i64,
    pub relation: NearestRelation,
}

/// One end of an SV
///
#[derive(Clone)]
pub struct Breakend {
    pub sv_index: usize,
    pub is_start: bool,
    pub chrom_index: usize,
    pub pos: i64,
    pub dir: BreakendDirection,
    pub arm: ChromArm,

    /// Copy number of the segment on the retained side of the breakend
    pub copy_number: f64,

    /// Copy number change across the breakend
    pub copy_number_change: f64,

    /// Extent of local alignment supporting the breakend, used to set the min templated insertion
    /// length of any link using this breakend
    pub anchor_distance: i64,

    pub assembly_ids: Vec<String>,

    /// Rank of this breakend in its chromosome's position-sorted list, or None if it is not
    /// indexed
    pub chrom_list_index: Option<usize>,

    pub is_assembly_matched: bool,

    /// Templated insertion links using this breakend
    pub ti_links: Vec<usize>,

    /// Deletion bridge (or short overlapping bridge) using this breakend
    pub bridge_link: Option<usize>,

    /// LOH and homozygous loss events bounded by this breakend
    pub cn_events: Vec<usize>,
}

impl Breakend {
    pub fn orientation(&self) -> i8 {
        self.dir.orientation()
    }

    pub fn shares_assembly_id(&self, other: &Breakend) -> bool {
        self.assembly_ids
            .iter()
            .any(|x| other.assembly_ids.iter().any(|y| x == y))
    }
}

impl fmt::Debug for Breakend {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Breakend: sv: {} {} chrom: {} pos: {} dir: {:?}",
            self.sv_index,
            if self.is_start { "start" } else { "end" },
            self.chrom_index,
            self.pos,
            self.dir
        )
    }
}

#[derive(Clone, Debug)]
pub struct StructuralVariant {
    pub id: String,
    pub sv_type: SvType,
    pub jcn: Jcn,

    /// Variant allele frequency at the start and end breakends
    pub vaf: [f64; 2],

    pub supporting_fragments: u32,
    pub insert_seq: String,
    pub repeat_class: String,

    /// Single breakend already merged into an inferred pair upstream
    pub merged_inferred: bool,

    /// Breakend-equivalent status assigned upstream
    pub is_equivalent: bool,

    pub foldback: Option<FoldbackInfo>,

    /// Number of times this SV is represented in a chain, at least 1
    pub replication_count: u32,

    pub cluster_index: Option<usize>,

    /// Start and end breakend indices, the end is None for single-ended types
    pub breakends: [Option<usize>; 2],

    pub nearest: Option<NearestSv>,
    pub exclusion: Option<ExclusionReason>,

    /// Assembled templated insertion links recorded on this SV
    pub assembled_links: Vec<usize>,

    /// Set when any breakend of this SV is matched by more than one assembled link
    pub assembly_replicated: bool,
}

impl StructuralVariant {
    pub fn is_single_ended(&self) -> bool {
        self.sv_type.is_single_ended()
    }

    pub fn is_foldback(&self) -> bool {
        self.foldback.is_some()
    }

    pub fn breakend_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.breakends.iter().flatten().copied()
    }

    /// True if either side has low allele support
    pub fn has_low_support(&self, min_fragments: u32, low_vaf: f64) -> bool {
        let vaf_count = if self.is_single_ended() { 1 } else { 2 };
        self.supporting_fragments < min_fragments
            || self.vaf.iter().take(vaf_count).any(|&x| x < low_vaf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_orientation() {
        assert_eq!(BreakendDirection::LeftAnchor.orientation(), 1);
        assert_eq!(
            BreakendDirection::from_orientation(-1),
            Some(BreakendDirection::RightAnchor)
        );
        assert_eq!(BreakendDirection::from_orientation(0), None);
    }

    #[test]
    fn test_sv_type_text() {
        assert_eq!(SvType::Bnd.to_string(), "BND");
        assert_eq!(SvType::from_str("INF").unwrap(), SvType::Inf);
        assert!(SvType::Sgl.is_single_ended());
        assert!(!SvType::Ins.is_single_ended());
    }
}
