use log::{debug, warn};
use serde::Serialize;

use super::ClusteringState;
use crate::sv::BreakendDirection;
use crate::sv_graph::SvGraph;

#[derive(Clone, Debug, Default, Serialize)]
pub struct CnEventMatchStats {
    pub matched: usize,
    pub unmatched: usize,
}

/// Find the indexed breakend of an SV bounding a copy number event
///
/// The event start must be bounded by a left-anchored breakend and the event end by a
/// right-anchored breakend. When both breakends of the SV qualify, as for an inversion, a
/// breakend is rejected if the event position is closer to the SV's other breakend.
///
fn find_event_breakend(
    graph: &SvGraph,
    sv_index: usize,
    chrom_index: usize,
    event_pos: i64,
    dir: BreakendDirection,
) -> Option<usize> {
    let sv = &graph.svs[sv_index];
    sv.breakend_indices().find(|&breakend_index| {
        let be = &graph.breakends[breakend_index];
        if be.chrom_index != chrom_index || be.dir != dir || be.chrom_list_index.is_none() {
            return false;
        }
        if let Some(other) = graph.other_breakend(breakend_index) {
            let other_be = &graph.breakends[other];
            if other_be.chrom_index == chrom_index
                && (other_be.pos - event_pos).abs() < (be.pos - event_pos).abs()
            {
                return false;
            }
        }
        true
    })
}

/// Match each LOH and homozygous loss event to the breakends at its boundaries
///
/// Events without a matching breakend are counted and reported, they are not an error.
///
pub fn associate_cn_events(graph: &mut SvGraph, _state: &ClusteringState) -> CnEventMatchStats {
    let mut stats = CnEventMatchStats::default();
    for event_index in 0..graph.cn_events.len() {
        let event = &graph.cn_events[event_index];
        let expected = [
            (event.start_sv, event.start, BreakendDirection::LeftAnchor),
            (event.end_sv, event.end, BreakendDirection::RightAnchor),
        ];
        let chrom_index = event.chrom_index;

        let mut matches = [None, None];
        for (side, (sv_index, event_pos, dir)) in expected.into_iter().enumerate() {
            let Some(sv_index) = sv_index else {
                continue;
            };
            match find_event_breakend(graph, sv_index, chrom_index, event_pos, dir) {
                Some(breakend_index) => {
                    matches[side] = Some(breakend_index);
                    stats.matched += 1;
                }
                None => {
                    debug!(
                        "No breakend for {} event at {}:{event_pos} from SV {}",
                        graph.cn_events[event_index].kind,
                        graph.chrom_list.label(chrom_index),
                        graph.svs[sv_index].id
                    );
                    stats.unmatched += 1;
                }
            }
        }

        for breakend_index in matches.iter().flatten() {
            graph.breakends[*breakend_index].cn_events.push(event_index);
        }
        graph.cn_events[event_index].breakends = matches;
    }

    if stats.unmatched > 0 {
        warn!(
            "Unable to match {} of {} expected copy number event breakends",
            stats.unmatched,
            stats.matched + stats.unmatched
        );
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::copy_number::{CnEvent, CnEventKind};
    use crate::sv::SvType;
    use crate::test_utils::*;

    fn get_event(start: i64, end: i64, start_sv: Option<usize>, end_sv: Option<usize>) -> CnEvent {
        CnEvent {
            kind: CnEventKind::Loh,
            chrom_index: 0,
            start,
            end,
            start_sv,
            end_sv,
            breakends: [None, None],
        }
    }

    #[test]
    fn test_deletion_event() {
        let mut graph = get_test_graph();
        let del = add_test_sv(
            &mut graph,
            SvType::Del,
            1.0,
            &[(0, 1000, LeftAnchor), (0, 5000, RightAnchor)],
        );
        graph.cn_events.push(get_event(1001, 4999, Some(del), Some(del)));
        graph.cn_events.push(get_event(6000, 7000, None, Some(del)));

        let state = ClusteringState::populate(&mut graph);
        let stats = associate_cn_events(&mut graph, &state);
        assert_eq!(stats.matched, 3);
        assert_eq!(stats.unmatched, 0);
        let [start, end] = graph.svs[del].breakends;
        assert_eq!(graph.cn_events[0].breakends, [start, end]);
        assert_eq!(graph.breakends[end.unwrap()].cn_events, vec![0, 1]);
    }

    #[test]
    fn test_inversion_event_side() {
        let mut graph = get_test_graph();
        let inv = add_test_sv(
            &mut graph,
            SvType::Inv,
            1.0,
            &[(0, 1000, LeftAnchor), (0, 8000, LeftAnchor)],
        );
        let dup = add_test_sv(
            &mut graph,
            SvType::Dup,
            1.0,
            &[(0, 3000, RightAnchor), (0, 4000, LeftAnchor)],
        );
        // Event starting next to the upper inversion breakend
        graph.cn_events.push(get_event(8001, 9000, Some(inv), None));
        // The dup has no left-anchored breakend at an event start on chr2
        let mut event = get_event(4001, 9000, Some(dup), None);
        event.chrom_index = 1;
        graph.cn_events.push(event);

        let state = ClusteringState::populate(&mut graph);
        let stats = associate_cn_events(&mut graph, &state);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(graph.cn_events[0].breakends[0], graph.svs[inv].breakends[1]);
        assert_eq!(graph.cn_events[1].breakends, [None, None]);
    }
}
