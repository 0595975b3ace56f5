//! Helpers to build small synthetic samples for unit tests
//!

use crate::chrom_list::{ChromArm, ChromList};
use crate::copy_number::{CopyNumberData, CopyNumberSegment};
use crate::sv::{Breakend, BreakendDirection, Jcn, StructuralVariant, SvType};
use crate::sv_graph::SvGraph;

pub use BreakendDirection::{LeftAnchor, RightAnchor};

pub fn get_test_breakend(chrom_index: usize, pos: i64, dir: BreakendDirection) -> Breakend {
    Breakend {
        sv_index: 0,
        is_start: true,
        chrom_index,
        pos,
        dir,
        arm: ChromArm::Q,
        copy_number: 2.0,
        copy_number_change: 1.0,
        anchor_distance: 0,
        assembly_ids: Vec::new(),
        chrom_list_index: None,
        is_assembly_matched: false,
        ti_links: Vec::new(),
        bridge_link: None,
        cn_events: Vec::new(),
    }
}

pub fn get_test_sv(id: &str, sv_type: SvType, jcn: f64) -> StructuralVariant {
    StructuralVariant {
        id: id.to_string(),
        sv_type,
        jcn: Jcn::from_point(jcn),
        vaf: [0.5, 0.5],
        supporting_fragments: 20,
        insert_seq: String::new(),
        repeat_class: String::new(),
        merged_inferred: false,
        is_equivalent: false,
        foldback: None,
        replication_count: 1,
        cluster_index: None,
        breakends: [None, None],
        nearest: None,
        exclusion: None,
        assembled_links: Vec::new(),
        assembly_replicated: false,
    }
}

/// Build a graph on three test chromosomes, each 10Mb with the centromere at 1Mb
///
pub fn get_test_graph() -> SvGraph {
    let mut chrom_list = ChromList::default();
    for label in ["chr1", "chr2", "chr3"] {
        chrom_list.add_chrom(label, 10_000_000, 1_000_000);
    }
    let copy_number = CopyNumberData::new(chrom_list.len());
    SvGraph {
        chrom_list,
        copy_number,
        ..Default::default()
    }
}

/// Add an SV to the test graph, with one (chrom, pos, dir) entry per breakend
///
/// Returns the new SV index
///
pub fn add_test_sv(
    graph: &mut SvGraph,
    sv_type: SvType,
    jcn: f64,
    breakends: &[(usize, i64, BreakendDirection)],
) -> usize {
    let sv_index = graph.svs.len();
    let mut sv = get_test_sv(&format!("sv{sv_index}"), sv_type, jcn);
    for (side, &(chrom_index, pos, dir)) in breakends.iter().enumerate().take(2) {
        let mut be = get_test_breakend(chrom_index, pos, dir);
        be.sv_index = sv_index;
        be.is_start = side == 0;
        be.arm = graph.chrom_list.get_arm(chrom_index, pos);
        be.copy_number_change = jcn;
        sv.breakends[side] = Some(graph.breakends.len());
        graph.breakends.push(be);
    }
    graph.svs.push(sv);
    sv_index
}

/// Set a uniform major allele ploidy across the given chromosome
pub fn set_flat_copy_number(graph: &mut SvGraph, chrom_index: usize, major_allele_ploidy: f64) {
    let length = graph.chrom_list.data[chrom_index].length;
    graph.copy_number.chrom_segments[chrom_index] = vec![CopyNumberSegment {
        start: 0,
        end: length,
        copy_number: major_allele_ploidy * 2.0,
        major_allele_ploidy,
    }];
}
