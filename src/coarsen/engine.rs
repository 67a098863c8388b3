//! Greedy contraction engine shared by CoCoNUT and CoarseNet
//!
//! Clusters are identified by their representative, the lowest original node
//! index they contain, so every per-cluster array below is indexed by
//! original node index and only the entries of live representatives matter.

use crate::coarsen::candidates::{Candidate, CandidateQueue};
use crate::coarsen::{
    Cluster, CoarsenOptions, Coarsening, CoarseningStats, Deadline, Method, Partition,
    UpdateStrategy,
};
use crate::error::{CoarsenError, Result};
use crate::graph::algorithms::{component_count, DisjointSets};
use crate::graph::Graph;
use crate::scoring::embedding::similarity;
use crate::scoring::{pair_score, quantize, ScoreNormalization, SpectralEmbedding};
use ndarray::Array2;
use std::collections::BTreeMap;

/// Cluster-level score state, one variant per method
enum ScoreState {
    /// table[[a, b]] = sum of prepared communicability over member pairs;
    /// after a full recompute it holds the quotient graph's prepared values
    /// directly and `aggregated` is false
    Communicability {
        table: Array2<f64>,
        normalization: ScoreNormalization,
        aggregated: bool,
    },
    /// sums.row(a) = sum of member coordinates; centroid = sum / size
    Embedding { sums: Array2<f64> },
}

pub(crate) struct Engine<'g> {
    graph: &'g Graph,
    method: Method,
    options: &'g CoarsenOptions,

    /// Original node -> representative
    sets: DisjointSets,
    live: Vec<bool>,
    live_count: usize,
    sizes: Vec<usize>,
    versions: Vec<u32>,

    /// Working graph: representative -> (neighbor representative -> weight)
    adjacency: Vec<BTreeMap<u32, f64>>,

    /// Original edge weight swallowed inside each cluster
    internal: Vec<f64>,

    /// Component count of the input, which every merge must preserve
    components: usize,

    scores: ScoreState,
    queue: CandidateQueue,
    stats: CoarseningStats,
}

impl<'g> Engine<'g> {
    /// Validate the input and take the initial scores
    pub(crate) fn new(
        graph: &'g Graph,
        method: Method,
        options: &'g CoarsenOptions,
        deadline: &Deadline,
    ) -> Result<Self> {
        let n = graph.node_count;
        if n == 0 {
            return Err(CoarsenError::MalformedGraph("graph has no nodes".to_string()));
        }
        let components = component_count(graph);
        if components != 1 {
            return Err(CoarsenError::MalformedGraph(format!(
                "coarsening requires a connected graph, found {components} components"
            )));
        }

        let adjacency = (0..n)
            .map(|u| {
                graph
                    .weighted_neighbors(u)
                    .map(|(v, w)| (v as u32, w))
                    .collect::<BTreeMap<_, _>>()
            })
            .collect();

        deadline.check()?;
        let scores = initial_scores(graph, method, options)?;
        deadline.check()?;

        let mut engine = Self {
            graph,
            method,
            options,
            sets: DisjointSets::new(n),
            live: vec![true; n],
            live_count: n,
            sizes: vec![1; n],
            versions: vec![0; n],
            adjacency,
            internal: vec![0.0; n],
            components,
            scores,
            queue: CandidateQueue::with_capacity(graph.edge_count()),
            stats: CoarseningStats {
                rescoring_passes: 1,
                ..CoarseningStats::default()
            },
        };
        engine.seed_queue();

        log::debug!(
            "{}: initialized {} candidates over {} nodes",
            method,
            engine.queue.len(),
            n
        );
        Ok(engine)
    }

    /// Contract until each target in turn is reached, snapshotting at each.
    ///
    /// `targets` are taken in the given order and must be non-increasing
    /// (they come from ascending alphas).
    pub(crate) fn run(&mut self, targets: &[usize], deadline: &Deadline) -> Result<Vec<Coarsening>> {
        let mut snapshots = Vec::with_capacity(targets.len());

        for &target in targets {
            if target < self.components {
                return Err(CoarsenError::ReductionInfeasible {
                    target,
                    reached: self.live_count.min(self.components),
                });
            }

            while self.live_count > target {
                deadline.check()?;

                let candidate = match self.queue.pop() {
                    Some(candidate) => candidate,
                    None => {
                        return Err(CoarsenError::ReductionInfeasible {
                            target,
                            reached: self.live_count,
                        })
                    }
                };

                if !self.is_current(&candidate) {
                    self.stats.stale_candidates += 1;
                    continue;
                }

                if !self.preserves_components(candidate.lo, candidate.hi) {
                    self.stats.guard_rejections += 1;
                    continue;
                }

                let keep = self.merge(candidate.lo as usize, candidate.hi as usize);
                match self.options.update {
                    UpdateStrategy::Aggregated => self.push_neighbors(keep),
                    UpdateStrategy::FullRecompute => {
                        self.recompute_scores()?;
                        self.queue.clear();
                        self.seed_queue();
                    }
                }
            }

            snapshots.push(self.snapshot(target)?);
        }

        log::debug!(
            "{}: {} merges, {} stale candidates, {} guard rejections",
            self.method,
            self.stats.merges,
            self.stats.stale_candidates,
            self.stats.guard_rejections
        );
        Ok(snapshots)
    }

    /// Both clusters still live, unchanged since scoring, and still adjacent
    fn is_current(&self, candidate: &Candidate) -> bool {
        let lo = candidate.lo as usize;
        let hi = candidate.hi as usize;
        self.live[lo]
            && self.live[hi]
            && self.versions[lo] == candidate.lo_version
            && self.versions[hi] == candidate.hi_version
    }

    /// Connectivity guard.
    ///
    /// Contracting an edge of the working graph never changes its component
    /// count; merging two clusters with no edge between them could join two
    /// components. Only the former is allowed.
    fn preserves_components(&self, lo: u32, hi: u32) -> bool {
        self.adjacency[lo as usize].contains_key(&hi)
    }

    fn score(&self, a: usize, b: usize) -> f64 {
        match self.scores {
            ScoreState::Communicability {
                ref table,
                normalization,
                aggregated,
            } => {
                if aggregated {
                    pair_score(normalization, table[[a, b]], self.sizes[a], self.sizes[b])
                } else {
                    table[[a, b]]
                }
            }
            ScoreState::Embedding { ref sums } => {
                let ca = &sums.row(a) / self.sizes[a] as f64;
                let cb = &sums.row(b) / self.sizes[b] as f64;
                similarity(ca.view(), cb.view())
            }
        }
    }

    fn push_candidate(&mut self, a: usize, b: usize) {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        let candidate = Candidate {
            score: quantize(self.score(lo, hi)),
            combined_size: self.sizes[lo] + self.sizes[hi],
            lo: lo as u32,
            hi: hi as u32,
            lo_version: self.versions[lo],
            hi_version: self.versions[hi],
        };
        self.queue.push(candidate);
    }

    /// Enqueue every adjacent live pair once
    fn seed_queue(&mut self) {
        let pairs: Vec<(usize, usize)> = (0..self.live.len())
            .filter(|&a| self.live[a])
            .flat_map(|a| {
                self.adjacency[a]
                    .keys()
                    .map(|&b| b as usize)
                    .filter(move |&b| a < b)
                    .map(move |b| (a, b))
            })
            .collect();
        for (a, b) in pairs {
            self.push_candidate(a, b);
        }
    }

    fn push_neighbors(&mut self, cluster: usize) {
        let neighbors: Vec<usize> = self.adjacency[cluster].keys().map(|&b| b as usize).collect();
        for neighbor in neighbors {
            self.push_candidate(cluster, neighbor);
        }
    }

    /// Merge `hi` into `lo`, returning the surviving representative
    fn merge(&mut self, lo: usize, hi: usize) -> usize {
        let keep = self.sets.union(lo as u32, hi as u32) as usize;
        debug_assert_eq!(keep, lo);

        // Re-route hi's edges to lo, summing parallels and dropping the
        // self-loop the lo-hi edge would become
        let absorbed = std::mem::take(&mut self.adjacency[hi]);
        let link = self.adjacency[lo].remove(&(hi as u32)).unwrap_or(0.0);
        for (x, w) in absorbed {
            if x as usize == lo {
                continue;
            }
            let neighbor = &mut self.adjacency[x as usize];
            neighbor.remove(&(hi as u32));
            *neighbor.entry(lo as u32).or_insert(0.0) += w;
            *self.adjacency[lo].entry(x).or_insert(0.0) += w;
        }

        self.internal[lo] += self.internal[hi] + link;
        self.sizes[lo] += self.sizes[hi];
        self.live[hi] = false;
        self.live_count -= 1;
        self.versions[lo] += 1;
        self.versions[hi] += 1;
        self.stats.merges += 1;

        match self.scores {
            ScoreState::Communicability { ref mut table, .. } => {
                let row = table.row(hi).to_owned();
                let mut target_row = table.row_mut(lo);
                target_row += &row;
                let column = table.column(hi).to_owned();
                let mut target_column = table.column_mut(lo);
                target_column += &column;
            }
            ScoreState::Embedding { ref mut sums } => {
                let row = sums.row(hi).to_owned();
                let mut target_row = sums.row_mut(lo);
                target_row += &row;
            }
        }

        log::trace!("merged {} into {} (size {})", hi, lo, self.sizes[lo]);
        keep
    }

    /// Live representatives, ascending
    fn live_representatives(&self) -> Vec<usize> {
        (0..self.live.len()).filter(|&r| self.live[r]).collect()
    }

    /// Current working graph with one node per live cluster, in
    /// representative order
    fn quotient_graph(&self, representatives: &[usize]) -> Result<Graph> {
        let mut index_of = vec![usize::MAX; self.live.len()];
        for (i, &r) in representatives.iter().enumerate() {
            index_of[r] = i;
        }

        let edges: Vec<(usize, usize, f64)> = representatives
            .iter()
            .flat_map(|&a| {
                self.adjacency[a]
                    .iter()
                    .filter(move |(&b, _)| a < b as usize)
                    .map(move |(&b, &w)| (a, b as usize, w))
            })
            .map(|(a, b, w)| (index_of[a], index_of[b], w))
            .collect();

        Graph::from_edges(representatives.len(), &edges)
    }

    /// Rebuild the score state from the quotient graph
    fn recompute_scores(&mut self) -> Result<()> {
        let representatives = self.live_representatives();
        let quotient = self.quotient_graph(&representatives)?;
        self.stats.rescoring_passes += 1;

        match self.scores {
            ScoreState::Communicability {
                ref mut table,
                normalization,
                ref mut aggregated,
            } => {
                let mut s = self.options.scorer.score_matrix(&quotient)?.matrix;
                normalization.prepare(&mut s);
                for (i, &a) in representatives.iter().enumerate() {
                    for (j, &b) in representatives.iter().enumerate() {
                        table[[a, b]] = s[[i, j]];
                    }
                }
                *aggregated = false;
            }
            ScoreState::Embedding { ref mut sums } => {
                let coords = SpectralEmbedding::new(self.options.embedding_dim).embed(&quotient)?;
                sums.fill(0.0);
                for (i, &a) in representatives.iter().enumerate() {
                    let size = self.sizes[a] as f64;
                    for (k, &x) in coords.row(i).iter().enumerate() {
                        sums[[a, k]] = x * size;
                    }
                }
            }
        }
        Ok(())
    }

    /// Materialize the current state as a reduced graph plus mapping
    fn snapshot(&mut self, target: usize) -> Result<Coarsening> {
        let representatives = self.live_representatives();
        let mut cluster_of_rep = vec![usize::MAX; self.live.len()];
        for (id, &r) in representatives.iter().enumerate() {
            cluster_of_rep[r] = id;
        }

        let assignment: Vec<usize> = (0..self.graph.node_count)
            .map(|node| cluster_of_rep[self.sets.find(node as u32) as usize])
            .collect();
        let partition = Partition::from_assignment(assignment)?;

        let mut reduced = self.quotient_graph(&representatives)?;
        let labels = representatives.iter().map(|&r| self.graph.label(r)).collect();
        reduced = reduced.with_node_ids(labels)?;

        let clusters = partition
            .members()
            .into_iter()
            .enumerate()
            .map(|(id, members)| {
                let representative = representatives[id];
                Cluster {
                    id,
                    representative,
                    size: members.len(),
                    members,
                    internal_weight: self.internal[representative],
                    external_weight: self.adjacency[representative].values().sum(),
                }
            })
            .collect();

        Ok(Coarsening {
            method: self.method,
            alpha: 0.0,
            target,
            reduced,
            partition,
            clusters,
            stats: self.stats.clone(),
        })
    }
}

fn initial_scores(graph: &Graph, method: Method, options: &CoarsenOptions) -> Result<ScoreState> {
    match method {
        Method::Coconut => {
            let s = options.scorer.score_matrix(graph)?;
            log::debug!(
                "Communicability computed via {:?} (scale {:.4})",
                s.backend,
                s.scale
            );
            let mut table = s.matrix;
            options.score_normalization.prepare(&mut table);
            Ok(ScoreState::Communicability {
                table,
                normalization: options.score_normalization,
                aggregated: true,
            })
        }
        Method::CoarseNet => {
            let sums = SpectralEmbedding::new(options.embedding_dim).embed(graph)?;
            Ok(ScoreState::Embedding { sums })
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::coarsen::{coarsen, CoarsenOptions, Method, UpdateStrategy};
    use crate::graph::generators::{barbell, complete, cycle, grid_2d, path};
    use crate::graph::Graph;

    #[test]
    fn barbell_keeps_cliques_apart() {
        // Two 5-cliques joined by a single edge; four clusters should never
        // mix the two cliques
        let graph = barbell(5, 0);
        let result = coarsen(&graph, 0.6, Method::Coconut, &CoarsenOptions::default()).unwrap();
        assert_eq!(result.partition.cluster_count(), 4);
        for members in result.partition.members() {
            let left = members.iter().filter(|&&m| m < 5).count();
            assert!(left == 0 || left == members.len(), "{members:?} spans both cliques");
        }
    }

    #[test]
    fn full_recompute_produces_valid_partitions() {
        let options = CoarsenOptions {
            update: UpdateStrategy::FullRecompute,
            ..CoarsenOptions::default()
        };
        for method in Method::ALL {
            let graph = grid_2d(3, 3);
            let result = coarsen(&graph, 0.5, method, &options).unwrap();
            assert_eq!(result.reduced.node_count, 4);
            assert!(result.stats.rescoring_passes > 1);
            assert!(crate::graph::algorithms::is_connected(&result.reduced));
        }
    }

    fn with_update(update: UpdateStrategy) -> CoarsenOptions {
        CoarsenOptions {
            update,
            ..CoarsenOptions::default()
        }
    }

    #[test]
    fn update_strategies_agree_on_the_first_merge() {
        // round(7 * 0.85) = 6 and round(16 * 0.94) = 15: one merge each
        for method in Method::ALL {
            for (graph, alpha) in [(complete(7), 0.15), (grid_2d(4, 4), 0.06), (cycle(9), 0.1)] {
                let aggregated = coarsen(&graph, alpha, method, &with_update(UpdateStrategy::Aggregated)).unwrap();
                let full = coarsen(&graph, alpha, method, &with_update(UpdateStrategy::FullRecompute)).unwrap();
                assert_eq!(aggregated.stats.merges, 1);
                assert_eq!(aggregated.partition, full.partition, "{method}");
            }
        }
    }

    #[test]
    fn update_strategies_diverge_after_the_first_merge() {
        // The quotient graph weights a merged pair's edges double, so full
        // recompute keeps growing one cluster where the fixed node-level
        // matrix pairs singletons up
        let graph = complete(7);
        let aggregated = coarsen(&graph, 0.5, Method::Coconut, &with_update(UpdateStrategy::Aggregated)).unwrap();
        let full = coarsen(&graph, 0.5, Method::Coconut, &with_update(UpdateStrategy::FullRecompute)).unwrap();
        assert_eq!(aggregated.partition.members(), vec![vec![0, 1], vec![2, 3], vec![4, 5], vec![6]]);
        assert_eq!(full.partition.members(), vec![vec![0, 1, 2, 3], vec![4], vec![5], vec![6]]);
    }

    #[test]
    fn internal_and_external_weight_account_for_everything() {
        let graph = cycle(8);
        let result = coarsen(&graph, 0.5, Method::Coconut, &CoarsenOptions::default()).unwrap();
        let internal: f64 = result.clusters.iter().map(|c| c.internal_weight).sum();
        let external: f64 = result.clusters.iter().map(|c| c.external_weight).sum();
        assert!((internal + external / 2.0 - graph.total_weight()).abs() < 1e-12);
    }

    #[test]
    fn rejects_disconnected_input() {
        let graph = Graph::from_edges(4, &[(0, 1, 1.0), (2, 3, 1.0)]).unwrap();
        let err = coarsen(&graph, 0.5, Method::Coconut, &CoarsenOptions::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedGraph);
    }

    #[test]
    fn zero_target_is_infeasible() {
        // round(3 * 0.1) = 0 clusters
        let err = coarsen(&path(3), 0.9, Method::Coconut, &CoarsenOptions::default()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::ReductionInfeasible);
    }

    #[test]
    fn complete_graph_merges_into_balanced_pairs_first() {
        // All scores tie initially; once a pair forms, the remaining
        // singletons win on combined size
        let graph = complete(6);
        let result = coarsen(&graph, 0.5, Method::Coconut, &CoarsenOptions::default()).unwrap();
        assert_eq!(result.partition.sizes(), vec![2, 2, 2]);
    }
}
