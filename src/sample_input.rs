//! JSON sample input holding the SVs, copy number, upstream clusters and chains of one sample
//!

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use crate::chain::{ChainTemplate, PrecomputedChains};
use crate::chrom_list::{ChromArm, ChromList};
use crate::copy_number::{CnEvent, CnEventKind, CopyNumberData, CopyNumberSegment};
use crate::sv::{Breakend, BreakendDirection, FoldbackInfo, Jcn, StructuralVariant, SvType};
use crate::sv_graph::SvGraph;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SampleInfo {
    pub sample_id: String,
    pub purity: f64,
    pub ploidy: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChromInput {
    pub label: String,
    pub length: i64,
    pub centromere: i64,
}

fn default_vaf() -> [f64; 2] {
    [1.0, 1.0]
}

fn default_replication_count() -> u32 {
    1
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BreakendInput {
    pub chrom: String,
    pub pos: i64,

    /// +1 for a left-anchored breakend, -1 for right-anchored
    pub orientation: i8,

    #[serde(default)]
    pub copy_number: f64,

    #[serde(default)]
    pub copy_number_change: f64,

    #[serde(default)]
    pub anchor_distance: i64,

    #[serde(default)]
    pub assembly_ids: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SvInput {
    pub id: String,
    pub sv_type: SvType,
    pub jcn: Jcn,
    pub start: BreakendInput,
    pub end: Option<BreakendInput>,

    #[serde(default = "default_vaf")]
    pub vaf: [f64; 2],

    #[serde(default)]
    pub supporting_fragments: u32,

    #[serde(default)]
    pub insert_seq: String,

    #[serde(default)]
    pub repeat_class: String,

    #[serde(default)]
    pub merged_inferred: bool,

    #[serde(default)]
    pub is_equivalent: bool,

    /// Id of the SV forming a foldback with this one, which may be this SV's own id
    pub foldback_partner: Option<String>,

    #[serde(default)]
    pub foldback_is_chained: bool,

    #[serde(default = "default_replication_count")]
    pub replication_count: u32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CopyNumberSegmentInput {
    pub chrom: String,
    #[serde(flatten)]
    pub segment: CopyNumberSegment,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ArmEndInput {
    pub chrom: String,
    pub arm: ChromArm,
    pub telomere_copy_number: f64,
    pub centromere_copy_number: f64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CnEventInput {
    pub kind: CnEventKind,
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub start_sv_id: Option<String>,
    pub end_sv_id: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct BreakendRef {
    pub sv_id: String,
    pub is_start: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ChainInput {
    pub sv_ids: Vec<String>,
    pub links: Vec<[BreakendRef; 2]>,

    #[serde(default)]
    pub is_closed: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SampleInput {
    #[serde(flatten)]
    pub info: SampleInfo,

    /// Chromosome table, GRCh38 is used if this is not provided
    pub chromosomes: Option<Vec<ChromInput>>,

    pub svs: Vec<SvInput>,

    #[serde(default)]
    pub copy_number_segments: Vec<CopyNumberSegmentInput>,

    #[serde(default)]
    pub arm_ends: Vec<ArmEndInput>,

    #[serde(default)]
    pub cn_events: Vec<CnEventInput>,

    /// SV ids of each upstream cluster
    #[serde(default)]
    pub clusters: Vec<Vec<String>>,

    #[serde(default)]
    pub chains: Vec<ChainInput>,
}

/// Everything the annotation pipeline needs for one sample
///
pub struct SampleData {
    pub info: SampleInfo,
    pub graph: SvGraph,
    pub upstream_clusters: Vec<Vec<usize>>,
    pub chain_builder: PrecomputedChains,
}

struct SampleIndex<'a> {
    chrom_list: &'a ChromList,
    sv_ids: HashMap<String, usize>,
}

impl SampleIndex<'_> {
    fn chrom(&self, label: &str) -> SimpleResult<usize> {
        match self.chrom_list.get_index(label) {
            Some(x) => Ok(x),
            None => bail!("Unknown chromosome '{label}' in sample input"),
        }
    }

    fn sv(&self, id: &str) -> SimpleResult<usize> {
        match self.sv_ids.get(id) {
            Some(&x) => Ok(x),
            None => bail!("Unknown SV id '{id}' in sample input"),
        }
    }
}

fn get_breakend(
    index: &SampleIndex,
    input: &BreakendInput,
    sv_index: usize,
    is_start: bool,
) -> SimpleResult<Breakend> {
    let chrom_index = index.chrom(&input.chrom)?;
    let Some(dir) = BreakendDirection::from_orientation(input.orientation) else {
        bail!(
            "Invalid breakend orientation '{}' for SV index {sv_index}",
            input.orientation
        );
    };
    Ok(Breakend {
        sv_index,
        is_start,
        chrom_index,
        pos: input.pos,
        dir,
        arm: index.chrom_list.get_arm(chrom_index, input.pos),
        copy_number: input.copy_number,
        copy_number_change: input.copy_number_change,
        anchor_distance: input.anchor_distance,
        assembly_ids: input.assembly_ids.clone(),
        chrom_list_index: None,
        is_assembly_matched: false,
        ti_links: Vec::new(),
        bridge_link: None,
        cn_events: Vec::new(),
    })
}

impl SampleInput {
    /// Build the SV graph, upstream clusters and precomputed chains from the input records
    ///
    pub fn into_sample_data(self) -> SimpleResult<SampleData> {
        let chrom_list = match &self.chromosomes {
            Some(chroms) => {
                let mut chrom_list = ChromList::default();
                for chrom in chroms {
                    chrom_list.add_chrom(&chrom.label, chrom.length, chrom.centromere);
                }
                chrom_list
            }
            None => ChromList::grch38(),
        };

        let mut sv_ids = HashMap::new();
        for (sv_index, sv) in self.svs.iter().enumerate() {
            if sv_ids.insert(sv.id.clone(), sv_index).is_some() {
                bail!("Duplicate SV id '{}' in sample input", sv.id);
            }
        }
        let index = SampleIndex {
            chrom_list: &chrom_list,
            sv_ids,
        };

        let mut svs = Vec::new();
        let mut breakends = Vec::new();
        for (sv_index, input) in self.svs.iter().enumerate() {
            if input.sv_type.is_single_ended() != input.end.is_none() {
                bail!(
                    "SV '{}' of type {} has an inconsistent end breakend",
                    input.id,
                    input.sv_type
                );
            }
            let foldback = match &input.foldback_partner {
                Some(partner_id) => Some(FoldbackInfo {
                    partner_sv: index.sv(partner_id)?,
                    is_chained: input.foldback_is_chained,
                }),
                None => None,
            };

            let mut sv_breakends = [None, None];
            for (side, be_input) in [Some(&input.start), input.end.as_ref()]
                .into_iter()
                .enumerate()
            {
                if let Some(be_input) = be_input {
                    sv_breakends[side] = Some(breakends.len());
                    breakends.push(get_breakend(&index, be_input, sv_index, side == 0)?);
                }
            }

            svs.push(StructuralVariant {
                id: input.id.clone(),
                sv_type: input.sv_type,
                jcn: input.jcn,
                vaf: input.vaf,
                supporting_fragments: input.supporting_fragments,
                insert_seq: input.insert_seq.clone(),
                repeat_class: input.repeat_class.clone(),
                merged_inferred: input.merged_inferred,
                is_equivalent: input.is_equivalent,
                foldback,
                replication_count: input.replication_count.max(1),
                cluster_index: None,
                breakends: sv_breakends,
                nearest: None,
                exclusion: None,
                assembled_links: Vec::new(),
                assembly_replicated: false,
            });
        }

        let mut copy_number = CopyNumberData::new(chrom_list.len());
        for input in self.copy_number_segments.iter() {
            let chrom_index = index.chrom(&input.chrom)?;
            copy_number.chrom_segments[chrom_index].push(input.segment.clone());
        }
        copy_number.sort_segments();
        for input in self.arm_ends.iter() {
            let chrom_index = index.chrom(&input.chrom)?;
            copy_number.arm_ends.insert(
                (chrom_index, input.arm),
                (input.telomere_copy_number, input.centromere_copy_number),
            );
        }

        let mut cn_events = Vec::new();
        for input in self.cn_events.iter() {
            cn_events.push(CnEvent {
                kind: input.kind,
                chrom_index: index.chrom(&input.chrom)?,
                start: input.start,
                end: input.end,
                start_sv: input.start_sv_id.as_deref().map(|x| index.sv(x)).transpose()?,
                end_sv: input.end_sv_id.as_deref().map(|x| index.sv(x)).transpose()?,
                breakends: [None, None],
            });
        }

        let upstream_clusters = self
            .clusters
            .iter()
            .map(|ids| ids.iter().map(|x| index.sv(x)).collect::<SimpleResult<Vec<_>>>())
            .collect::<SimpleResult<Vec<_>>>()?;

        let mut templates = Vec::new();
        for chain in self.chains.iter() {
            let sv_indices = chain
                .sv_ids
                .iter()
                .map(|x| index.sv(x))
                .collect::<SimpleResult<Vec<_>>>()?;
            let mut links = Vec::new();
            for link in chain.links.iter() {
                let mut link_breakends = [0; 2];
                for (i, be_ref) in link.iter().enumerate() {
                    let side = if be_ref.is_start { 0 } else { 1 };
                    let Some(breakend_index) = svs[index.sv(&be_ref.sv_id)?].breakends[side] else {
                        bail!("Chain link uses missing end breakend of SV '{}'", be_ref.sv_id);
                    };
                    link_breakends[i] = breakend_index;
                }
                links.push(link_breakends);
            }
            templates.push(ChainTemplate {
                sv_indices,
                links,
                is_closed: chain.is_closed,
            });
        }

        let graph = SvGraph {
            chrom_list,
            svs,
            breakends,
            links: Vec::new(),
            cn_events,
            copy_number,
        };

        Ok(SampleData {
            info: self.info,
            graph,
            upstream_clusters,
            chain_builder: PrecomputedChains { templates },
        })
    }
}

/// Read and convert the sample input file
///
/// Any failure to read or interpret the input is fatal.
///
pub fn read_sample_input(filename: &Utf8Path) -> SampleData {
    let file = unwrap!(
        File::open(filename),
        "Unable to open sample input json file: '{}'",
        filename
    );
    let input: SampleInput = unwrap!(
        serde_json::from_reader(BufReader::new(file)),
        "Unable to parse sample input json file: '{}'",
        filename
    );
    unwrap!(
        input.into_sample_data(),
        "Invalid sample input in file: '{}'",
        filename
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_INPUT: &str = r#"{
        "sample_id": "sample1",
        "purity": 0.7,
        "ploidy": 2.5,
        "chromosomes": [
            {"label": "chr1", "length": 10000000, "centromere": 1000000},
            {"label": "chr2", "length": 10000000, "centromere": 1000000}
        ],
        "svs": [
            {
                "id": "dup1",
                "sv_type": "DUP",
                "jcn": {"point": 12.0, "min": 11.0, "max": 13.0},
                "start": {"chrom": "chr1", "pos": 10000, "orientation": -1},
                "end": {"chrom": "chr1", "pos": 12000, "orientation": 1},
                "supporting_fragments": 30
            },
            {
                "id": "sgl1",
                "sv_type": "SGL",
                "jcn": {"point": 2.0, "min": 2.0, "max": 2.0},
                "start": {"chrom": "2", "pos": 5000000, "orientation": 1},
                "end": null,
                "foldback_partner": "sgl1"
            }
        ],
        "copy_number_segments": [
            {"chrom": "chr1", "start": 5000000, "end": 10000000, "copy_number": 2.0, "major_allele_ploidy": 1.0},
            {"chrom": "chr1", "start": 0, "end": 5000000, "copy_number": 4.0, "major_allele_ploidy": 2.0}
        ],
        "arm_ends": [
            {"chrom": "chr2", "arm": "Q", "telomere_copy_number": 3.0, "centromere_copy_number": 2.0}
        ],
        "cn_events": [
            {"kind": "LOH", "chrom": "chr1", "start": 12000, "end": 50000, "start_sv_id": "dup1", "end_sv_id": null}
        ],
        "clusters": [["dup1", "sgl1"]],
        "chains": [
            {
                "sv_ids": ["dup1"],
                "links": [[{"sv_id": "dup1", "is_start": true}, {"sv_id": "dup1", "is_start": false}]],
                "is_closed": true
            }
        ]
    }"#;

    #[test]
    fn test_sample_input() {
        let input: SampleInput = serde_json::from_str(TEST_INPUT).unwrap();
        let data = input.into_sample_data().unwrap();
        assert_eq!(data.info.sample_id, "sample1");
        let graph = &data.graph;
        assert_eq!(graph.svs.len(), 2);
        assert_eq!(graph.breakends.len(), 3);
        assert_eq!(graph.breakends[0].dir, BreakendDirection::RightAnchor);
        assert_eq!(graph.breakends[2].chrom_index, 1);
        assert_eq!(graph.breakends[2].arm, ChromArm::Q);
        assert_eq!(graph.svs[1].breakends, [Some(2), None]);
        assert!(graph.svs[1].is_foldback());
        assert_eq!(graph.svs[1].replication_count, 1);
        assert_eq!(graph.copy_number.chrom_segments[0][0].start, 0);
        assert_eq!(graph.copy_number.arm_end_copy_number(1, ChromArm::Q), Some(3.0));
        assert_eq!(graph.cn_events[0].start_sv, Some(0));
        assert_eq!(data.upstream_clusters, vec![vec![0, 1]]);
        assert_eq!(data.chain_builder.templates[0].links, vec![[0, 1]]);
    }

    #[test]
    fn test_invalid_sample_input() {
        let mut input: SampleInput = serde_json::from_str(TEST_INPUT).unwrap();
        input.clusters.push(vec!["missing".to_string()]);
        assert!(input.into_sample_data().is_err());

        let mut input: SampleInput = serde_json::from_str(TEST_INPUT).unwrap();
        input.svs[0].start.orientation = 0;
        assert!(input.into_sample_data().is_err());

        let mut input: SampleInput = serde_json::from_str(TEST_INPUT).unwrap();
        input.svs[0].start.chrom = "chr9".to_string();
        assert!(input.into_sample_data().is_err());
    }
}
