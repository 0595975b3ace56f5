use super::ClusteringState;
use crate::sv::{NearestRelation, NearestSv};
use crate::sv_graph::SvGraph;

/// Distance from a breakend to the closest breakend of any other SV on the same chromosome
fn nearest_other_sv_distance(
    graph: &SvGraph,
    state: &ClusteringState,
    breakend_index: usize,
) -> Option<i64> {
    let be = &graph.breakends[breakend_index];
    let rank = be.chrom_list_index?;
    let list = &state.chrom_breakends[be.chrom_index];

    let is_other = |x: &&usize| graph.breakends[**x].sv_index != be.sv_index;
    let lower = list[..rank].iter().rev().find(is_other);
    let upper = list[rank + 1..].iter().find(is_other);
    [lower, upper]
        .into_iter()
        .flatten()
        .map(|&x| (graph.breakends[x].pos - be.pos).abs())
        .min()
}

/// Annotate every indexed SV with the distance and relation to its closest other SV
///
/// The relation is overlap when another SV's breakend falls between the two breakends of the SV,
/// and neighbour otherwise.
///
pub fn annotate_nearest_svs(graph: &mut SvGraph, state: &ClusteringState) {
    for sv_index in 0..graph.svs.len() {
        let sv = &graph.svs[sv_index];
        if sv.exclusion.is_some() {
            continue;
        }

        let distance = sv
            .breakend_indices()
            .filter_map(|x| nearest_other_sv_distance(graph, state, x))
            .min();

        let is_overlap = match sv.breakends {
            [Some(start), Some(end)] => {
                let (be1, be2) = (&graph.breakends[start], &graph.breakends[end]);
                match (be1.chrom_list_index, be2.chrom_list_index) {
                    (Some(r1), Some(r2)) if be1.chrom_index == be2.chrom_index => r1.abs_diff(r2) > 1,
                    _ => false,
                }
            }
            _ => false,
        };

        graph.svs[sv_index].nearest = distance.map(|distance| NearestSv {
            distance,
            relation: if is_overlap {
                NearestRelation::Overlap
            } else {
                NearestRelation::Neighbour
            },
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sv::SvType;
    use crate::test_utils::*;

    #[test]
    fn test_nearest_sv() {
        let mut graph = get_test_graph();
        let del = add_test_sv(
            &mut graph,
            SvType::Del,
            1.0,
            &[(0, 1000, LeftAnchor), (0, 5000, RightAnchor)],
        );
        let dup = add_test_sv(
            &mut graph,
            SvType::Dup,
            1.0,
            &[(0, 4000, RightAnchor), (0, 9000, LeftAnchor)],
        );
        let sgl = add_test_sv(&mut graph, SvType::Sgl, 1.0, &[(0, 9300, LeftAnchor)]);
        let lone = add_test_sv(
            &mut graph,
            SvType::Del,
            1.0,
            &[(1, 1000, LeftAnchor), (1, 2000, RightAnchor)],
        );

        let state = ClusteringState::populate(&mut graph);
        annotate_nearest_svs(&mut graph, &state);

        let nearest = graph.svs[del].nearest.as_ref().unwrap();
        assert_eq!(nearest.distance, 1000);
        assert_eq!(nearest.relation, NearestRelation::Overlap);

        let nearest = graph.svs[dup].nearest.as_ref().unwrap();
        assert_eq!(nearest.distance, 300);
        assert_eq!(nearest.relation, NearestRelation::Overlap);

        let nearest = graph.svs[sgl].nearest.as_ref().unwrap();
        assert_eq!(nearest.distance, 300);
        assert_eq!(nearest.relation, NearestRelation::Neighbour);

        assert!(graph.svs[lone].nearest.is_none());
    }
}
