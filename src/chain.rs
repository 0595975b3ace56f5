//! Chains of linked SVs and the contract with the chain search
//!
//! Chain building itself happens outside of this crate. A [`ChainBuilder`] returns the chains for
//! one cluster, reporting each applied link to a [`SearchMonitor`] through the shared
//! [`ChainSearchState`].
//!

use std::collections::{BTreeMap, BTreeSet};

use simple_error::{SimpleResult, bail};

use crate::cluster::Cluster;
use crate::sv_graph::SvGraph;

#[derive(Clone, Debug)]
pub struct ChainLink {
    pub breakends: [usize; 2],
    pub length: i64,
}

/// One putative derivative molecule path through a cluster
///
#[derive(Clone, Debug)]
pub struct Chain {
    pub id: usize,

    /// SVs in chain order
    pub sv_indices: Vec<usize>,

    pub links: Vec<ChainLink>,

    /// True if the last link reconnects to the start of the chain
    pub is_closed: bool,
}

impl Chain {
    pub fn length(&self) -> i64 {
        self.links.iter().map(|x| x.length).sum()
    }
}

/// Availability of breakends and candidate links during a chain search
///
#[derive(Clone, Debug, Default)]
pub struct ChainSearchState {
    /// Remaining uses of each breakend, starting from the replication count of its SV
    pub available: BTreeMap<usize, u32>,

    /// Candidate link indices for each breakend which still has candidate links
    pub candidate_links: BTreeMap<usize, Vec<usize>>,

    /// Breakends of each candidate link
    pub link_breakends: BTreeMap<usize, [usize; 2]>,

    pub applied_links: usize,
}

impl ChainSearchState {
    pub fn new(graph: &SvGraph, cluster: &Cluster) -> Self {
        let mut state = Self::default();
        for &sv_index in cluster.sv_indices.iter() {
            let sv = &graph.svs[sv_index];
            for breakend_index in sv.breakend_indices() {
                if graph.breakends[breakend_index].chrom_list_index.is_some() {
                    state
                        .available
                        .insert(breakend_index, sv.replication_count.max(1));
                }
            }
        }

        for &link_index in cluster
            .assembled_links
            .iter()
            .chain(cluster.inferred_links.iter())
        {
            let link = &graph.links[link_index];
            let breakends = link.breakends();
            if !link.is_active
                || !breakends.iter().all(|x| state.available.contains_key(x))
                || state.link_breakends.contains_key(&link_index)
            {
                continue;
            }
            state.link_breakends.insert(link_index, breakends);
            for breakend_index in breakends {
                state
                    .candidate_links
                    .entry(breakend_index)
                    .or_default()
                    .push(link_index);
            }
        }
        state
    }

    pub fn is_available(&self, breakend_index: usize) -> bool {
        self.available.get(&breakend_index).is_some_and(|&x| x > 0)
    }

    /// Number of breakends with uses remaining
    pub fn unlinked_breakend_count(&self) -> usize {
        self.available.values().filter(|&&x| x > 0).count()
    }

    /// Remove all candidate links of an exhausted breakend, including from its partners' lists
    fn purge_breakend(&mut self, breakend_index: usize) {
        let Some(links) = self.candidate_links.remove(&breakend_index) else {
            return;
        };
        for link_index in links {
            let Some(breakends) = self.link_breakends.remove(&link_index) else {
                continue;
            };
            for other in breakends.into_iter().filter(|&x| x != breakend_index) {
                if let Some(other_links) = self.candidate_links.get_mut(&other) {
                    other_links.retain(|&x| x != link_index);
                    if other_links.is_empty() {
                        self.candidate_links.remove(&other);
                    }
                }
            }
        }
    }

    /// Use one copy of each breakend to form a link
    ///
    pub fn apply_link(&mut self, be1: usize, be2: usize) -> SimpleResult<()> {
        if be1 == be2 {
            bail!("Breakend {be1} can't be linked to itself");
        }
        for breakend_index in [be1, be2] {
            if !self.is_available(breakend_index) {
                bail!("Breakend {breakend_index} is not available to link");
            }
        }
        for breakend_index in [be1, be2] {
            if let Some(count) = self.available.get_mut(&breakend_index) {
                *count -= 1;
                if *count == 0 {
                    self.purge_breakend(breakend_index);
                }
            }
        }
        self.applied_links += 1;
        Ok(())
    }

    /// Verify that every breakend with remaining candidate links can still be linked
    ///
    pub fn check_validity(&self) -> SimpleResult<()> {
        for (&breakend_index, links) in self.candidate_links.iter() {
            if !self.is_available(breakend_index) {
                bail!("Breakend {breakend_index} has candidate links but no remaining uses");
            }
            let has_partner = links.iter().any(|link_index| {
                self.link_breakends.get(link_index).is_some_and(|breakends| {
                    breakends
                        .iter()
                        .filter(|&&x| x != breakend_index)
                        .all(|&x| self.is_available(x))
                })
            });
            if !has_partner {
                bail!(
                    "Breakend {breakend_index} has candidate links but no available partner breakend"
                );
            }
        }
        Ok(())
    }
}

/// Observer of a chain search
///
pub trait SearchMonitor {
    fn on_search_start(&mut self, graph: &SvGraph, cluster: &Cluster, state: &ChainSearchState);

    /// Called after each link is applied, an error ends the search for this cluster
    fn on_iteration(&mut self, iteration: usize, state: &ChainSearchState) -> SimpleResult<()>;

    fn on_search_complete(
        &mut self,
        graph: &SvGraph,
        cluster: &Cluster,
        chains: &[Chain],
        state: &ChainSearchState,
    );
}

/// Chain search collaborator, building the chains of a single cluster
///
pub trait ChainBuilder: Sync {
    fn build_chains(
        &self,
        graph: &SvGraph,
        cluster: &Cluster,
        monitor: &mut dyn SearchMonitor,
    ) -> SimpleResult<Vec<Chain>>;
}

/// Chain described by SV indices and breakend pairs, as supplied with the sample input
///
#[derive(Clone, Debug)]
pub struct ChainTemplate {
    pub sv_indices: Vec<usize>,
    pub links: Vec<[usize; 2]>,
    pub is_closed: bool,
}

/// Chain builder returning chains computed ahead of time
///
/// A template is used for a cluster if every one of its SVs is a member of the cluster, so chains
/// through SVs removed by filtering are dropped.
///
#[derive(Clone, Debug, Default)]
pub struct PrecomputedChains {
    pub templates: Vec<ChainTemplate>,
}

impl ChainBuilder for PrecomputedChains {
    fn build_chains(
        &self,
        graph: &SvGraph,
        cluster: &Cluster,
        monitor: &mut dyn SearchMonitor,
    ) -> SimpleResult<Vec<Chain>> {
        let members = cluster.sv_indices.iter().copied().collect::<BTreeSet<_>>();
        let mut state = ChainSearchState::new(graph, cluster);
        monitor.on_search_start(graph, cluster, &state);

        let mut chains = Vec::new();
        let mut iteration = 0;
        let is_member_chain = |x: &&ChainTemplate| {
            !x.sv_indices.is_empty() && x.sv_indices.iter().all(|sv| members.contains(sv))
        };
        for template in self.templates.iter().filter(is_member_chain) {
            let mut links = Vec::new();
            for &[be1, be2] in template.links.iter() {
                let (chrom1, chrom2) = (
                    graph.breakends[be1].chrom_index,
                    graph.breakends[be2].chrom_index,
                );
                if chrom1 != chrom2 {
                    bail!(
                        "Chain link between breakends {be1} and {be2} crosses from chromosome {chrom1} to {chrom2}"
                    );
                }
                state.apply_link(be1, be2)?;
                iteration += 1;
                monitor.on_iteration(iteration, &state)?;
                links.push(ChainLink {
                    breakends: [be1, be2],
                    length: (graph.breakends[be2].pos - graph.breakends[be1].pos).abs(),
                });
            }
            chains.push(Chain {
                id: chains.len(),
                sv_indices: template.sv_indices.clone(),
                links,
                is_closed: template.is_closed,
            });
        }

        monitor.on_search_complete(graph, cluster, &chains, &state);
        Ok(chains)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breakend_index::ClusteringState;
    use crate::cluster::build_clusters;
    use crate::config::LinkConfig;
    use crate::link_finder::find_links;
    use crate::sv::SvType;
    use crate::test_utils::*;

    #[derive(Default)]
    struct CountingMonitor {
        iterations: usize,
        completed: bool,
    }

    impl SearchMonitor for CountingMonitor {
        fn on_search_start(&mut self, _: &SvGraph, _: &Cluster, _: &ChainSearchState) {}

        fn on_iteration(&mut self, iteration: usize, state: &ChainSearchState) -> SimpleResult<()> {
            self.iterations = iteration;
            state.check_validity()
        }

        fn on_search_complete(
            &mut self,
            _: &SvGraph,
            _: &Cluster,
            _: &[Chain],
            _: &ChainSearchState,
        ) {
            self.completed = true;
        }
    }

    /// Two BNDs joined by an inferred templated insertion on chr1
    fn get_linked_graph() -> (SvGraph, Vec<Cluster>) {
        let mut graph = get_test_graph();
        add_test_sv(
            &mut graph,
            SvType::Bnd,
            2.0,
            &[(0, 10_000, RightAnchor), (1, 500, LeftAnchor)],
        );
        add_test_sv(
            &mut graph,
            SvType::Bnd,
            2.0,
            &[(0, 12_000, LeftAnchor), (2, 500, RightAnchor)],
        );
        let state = ClusteringState::populate(&mut graph);
        let mut clusters = build_clusters(&mut graph, &[vec![0, 1]]);
        find_links(&mut graph, &state, &mut clusters, &LinkConfig::default());
        (graph, clusters)
    }

    #[test]
    fn test_search_state() {
        let (graph, clusters) = get_linked_graph();
        let mut state = ChainSearchState::new(&graph, &clusters[0]);
        assert_eq!(state.available.len(), 4);
        assert_eq!(state.candidate_links.len(), 2);
        assert!(state.check_validity().is_ok());

        let [lower, upper] = graph.links[clusters[0].inferred_links[0]].breakends();
        state.apply_link(lower, upper).unwrap();
        assert!(state.candidate_links.is_empty());
        assert_eq!(state.unlinked_breakend_count(), 2);
        assert!(state.check_validity().is_ok());
        assert!(state.apply_link(lower, upper).is_err());
    }

    #[test]
    fn test_stale_state_detected() {
        let (graph, clusters) = get_linked_graph();
        let mut state = ChainSearchState::new(&graph, &clusters[0]);
        let [lower, _] = graph.links[clusters[0].inferred_links[0]].breakends();
        // Exhaust a breakend without purging its links
        state.available.insert(lower, 0);
        assert!(state.check_validity().is_err());
    }

    #[test]
    fn test_precomputed_chains() {
        let (graph, clusters) = get_linked_graph();
        let [lower, upper] = graph.links[clusters[0].inferred_links[0]].breakends();
        let builder = PrecomputedChains {
            templates: vec![
                ChainTemplate {
                    sv_indices: vec![0, 1],
                    links: vec![[lower, upper]],
                    is_closed: false,
                },
                ChainTemplate {
                    sv_indices: vec![0, 5],
                    links: vec![],
                    is_closed: false,
                },
            ],
        };
        let mut monitor = CountingMonitor::default();
        let chains = builder
            .build_chains(&graph, &clusters[0], &mut monitor)
            .unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].length(), 2000);
        assert!(!chains[0].is_closed);
        assert_eq!(monitor.iterations, 1);
        assert!(monitor.completed);
    }

    #[test]
    fn test_cross_chromosome_template() {
        let (graph, clusters) = get_linked_graph();
        let remote1 = graph.svs[0].breakends[1].unwrap();
        let remote2 = graph.svs[1].breakends[1].unwrap();
        let builder = PrecomputedChains {
            templates: vec![ChainTemplate {
                sv_indices: vec![0, 1],
                links: vec![[remote1, remote2]],
                is_closed: false,
            }],
        };
        let mut monitor = CountingMonitor::default();
        assert!(
            builder
                .build_chains(&graph, &clusters[0], &mut monitor)
                .is_err()
        );
        assert_eq!(monitor.iterations, 0);
    }
}
