use graph_coarsener::coarsen::{coarsen_checkpoints, Deadline};
use graph_coarsener::graph::algorithms::is_connected;
use graph_coarsener::graph::generators::{barbell, complete, cycle, grid_2d, path, sample_networks, star};
use graph_coarsener::{
    coarsen, evaluate, target_clusters, CoarsenOptions, ErrorKind, Graph, Method, Partition,
    UpdateStrategy,
};

fn test_graphs() -> Vec<(&'static str, Graph)> {
    vec![
        ("path_9", path(9)),
        ("cycle_12", cycle(12)),
        ("star_10", star(10)),
        ("grid_4x4", grid_2d(4, 4)),
        ("barbell_4_2", barbell(4, 2)),
        ("complete_7", complete(7)),
    ]
}

fn weighted_graph() -> Graph {
    Graph::from_edges(
        6,
        &[
            (0, 1, 3.0),
            (1, 2, 0.5),
            (2, 3, 2.0),
            (3, 4, 1.0),
            (4, 5, 4.0),
            (5, 0, 0.25),
            (1, 4, 1.5),
        ],
    )
    .unwrap()
}

fn assert_valid_partition(graph: &Graph, partition: &Partition, target: usize) {
    assert_eq!(partition.len(), graph.node_count);
    assert_eq!(partition.cluster_count(), target);
    let sizes = partition.sizes();
    assert!(sizes.iter().all(|&s| s > 0), "empty cluster in {sizes:?}");
    assert_eq!(sizes.iter().sum::<usize>(), graph.node_count);
}

#[test]
fn partitions_are_total_and_hit_the_target() {
    for method in Method::ALL {
        for (name, graph) in test_graphs() {
            for alpha in [0.2, 0.5, 0.8] {
                let target = target_clusters(graph.node_count, alpha).unwrap();
                let result = coarsen(&graph, alpha, method, &CoarsenOptions::default())
                    .unwrap_or_else(|e| panic!("{name} / {method} / {alpha}: {e}"));
                assert_valid_partition(&graph, &result.partition, target);
                assert_eq!(result.reduced.node_count, target);
                assert_eq!(result.clusters.len(), target);
            }
        }
    }
}

#[test]
fn reduced_graph_stays_connected() {
    for method in Method::ALL {
        for (name, graph) in test_graphs() {
            let result = coarsen(&graph, 0.6, method, &CoarsenOptions::default()).unwrap();
            assert!(is_connected(&result.reduced), "{name} / {method}");
        }
    }
}

#[test]
fn clusters_are_connected_subgraphs() {
    for method in Method::ALL {
        for (name, graph) in test_graphs() {
            let result = coarsen(&graph, 0.7, method, &CoarsenOptions::default()).unwrap();
            for members in result.partition.members() {
                let keep: Vec<bool> = (0..graph.node_count).map(|n| members.contains(&n)).collect();
                let induced = graph_coarsener::data::preprocessing::induced_subgraph(&graph, &keep).unwrap();
                assert!(is_connected(&induced), "{name} / {method}: cluster {members:?} is split");
            }
        }
    }
}

#[test]
fn edge_weight_is_conserved() {
    let graph = weighted_graph();
    for method in Method::ALL {
        for alpha in [0.3, 0.5, 0.7] {
            let result = coarsen(&graph, alpha, method, &CoarsenOptions::default()).unwrap();
            let internal: f64 = result.clusters.iter().map(|c| c.internal_weight).sum();
            let total = result.reduced.total_weight() + internal;
            assert!(
                (total - graph.total_weight()).abs() < 1e-12,
                "{method} / {alpha}: {total} vs {}",
                graph.total_weight()
            );

            // Every reduced edge aggregates the original edges between its clusters
            for (a, b, w) in result.reduced.edges() {
                let expected: f64 = graph
                    .edges()
                    .filter(|&(u, v, _)| {
                        let (cu, cv) = (result.partition.cluster_of(u), result.partition.cluster_of(v));
                        (cu, cv) == (a, b) || (cu, cv) == (b, a)
                    })
                    .map(|(_, _, w)| w)
                    .sum();
                assert!((w - expected).abs() < 1e-12);
            }
        }
    }
}

#[test]
fn runs_are_deterministic() {
    for method in Method::ALL {
        for (_, graph) in test_graphs() {
            let a = coarsen(&graph, 0.5, method, &CoarsenOptions::default()).unwrap();
            let b = coarsen(&graph, 0.5, method, &CoarsenOptions::default()).unwrap();
            assert_eq!(a.partition, b.partition);
            assert_eq!(
                a.reduced.edges().collect::<Vec<_>>(),
                b.reduced.edges().collect::<Vec<_>>()
            );
            assert_eq!(a.reduced.node_ids, b.reduced.node_ids);
        }
    }
}

#[test]
fn checkpoints_nest_as_alpha_grows() {
    let graph = grid_2d(5, 5);
    let alphas = [0.8, 0.2, 0.5, 0.35];
    for method in Method::ALL {
        let results = coarsen_checkpoints(
            &graph,
            &alphas,
            method,
            &CoarsenOptions::default(),
            &Deadline::unlimited(),
        )
        .unwrap();

        let got: Vec<f64> = results.iter().map(|r| r.alpha).collect();
        assert_eq!(got, vec![0.2, 0.35, 0.5, 0.8]);

        for pair in results.windows(2) {
            let (fine, coarse) = (&pair[0].partition, &pair[1].partition);
            assert!(coarse.cluster_count() <= fine.cluster_count());
            for u in 0..graph.node_count {
                for v in 0..graph.node_count {
                    if fine.cluster_of(u) == fine.cluster_of(v) {
                        assert_eq!(coarse.cluster_of(u), coarse.cluster_of(v));
                    }
                }
            }
        }

        // A checkpoint matches the equivalent single run
        let single = coarsen(&graph, 0.5, method, &CoarsenOptions::default()).unwrap();
        assert_eq!(single.partition, results[2].partition);
    }
}

#[test]
fn full_recompute_satisfies_the_same_contract() {
    let options = CoarsenOptions {
        update: UpdateStrategy::FullRecompute,
        ..CoarsenOptions::default()
    };
    for method in Method::ALL {
        for (name, graph) in test_graphs() {
            let target = target_clusters(graph.node_count, 0.5).unwrap();
            let result = coarsen(&graph, 0.5, method, &options).unwrap();
            assert_valid_partition(&graph, &result.partition, target);
            assert!(is_connected(&result.reduced), "{name} / {method}");
        }
    }
}

#[test]
fn sample_catalogue_coarsens_and_evaluates() {
    for (name, graph) in sample_networks() {
        let result = coarsen(&graph, 0.5, Method::Coconut, &CoarsenOptions::default()).unwrap();
        let metrics = evaluate(&graph, &result.reduced, &result.partition, 10).unwrap();
        assert!(metrics.connectivity_preserved, "{name}");
        assert!(metrics.reduction_ratio > 0.0, "{name}");
        assert!(metrics.eigenvalue_error.is_finite(), "{name}");
    }
}

// Scenario A
#[test]
fn triangle_merges_lowest_pair() {
    let graph = complete(3);
    let result = coarsen(&graph, 0.34, Method::Coconut, &CoarsenOptions::default()).unwrap();
    assert_eq!(result.partition.members(), vec![vec![0, 1], vec![2]]);
    assert_eq!(result.reduced.edge_count(), 1);
    assert_eq!(result.reduced.edge_weight(0, 1), Some(2.0));
}

// Scenario B
#[test]
fn path_splits_into_two_runs() {
    let graph = path(5);
    for method in Method::ALL {
        let result = coarsen(&graph, 0.6, method, &CoarsenOptions::default()).unwrap();
        let members = result.partition.members();
        assert_eq!(members.len(), 2);
        for cluster in &members {
            let span = cluster[cluster.len() - 1] - cluster[0] + 1;
            assert_eq!(span, cluster.len(), "{method}: {cluster:?} is not contiguous");
        }
        assert_eq!(result.reduced.edge_count(), 1);
        assert!(is_connected(&result.reduced));
    }
}

// Scenario C
#[test]
fn evaluator_rejects_disconnected_original() {
    let graph = Graph::from_edges(4, &[(0, 1, 1.0), (2, 3, 1.0)]).unwrap();
    let reduced = Graph::from_edges(2, &[]).unwrap();
    let partition = Partition::from_assignment(vec![0, 0, 1, 1]).unwrap();
    let err = evaluate(&graph, &reduced, &partition, 2).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DisconnectedInput);
}

// Scenario D
#[test]
fn alpha_must_be_strictly_inside_the_unit_interval() {
    for alpha in [0.0, 1.0] {
        for method in Method::ALL {
            let err = coarsen(&path(5), alpha, method, &CoarsenOptions::default()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidParameter);
        }
    }
}

#[test]
fn path_metrics_match_known_spectrum() {
    // Laplacian of P3: {0, 1, 3}; adjacency: {-sqrt 2, 0, sqrt 2}
    let graph = path(3);
    let metrics = evaluate(&graph, &graph, &Partition::identity(3), 3).unwrap();
    assert!((metrics.original.algebraic_connectivity - 1.0).abs() < 1e-9);
    assert!((metrics.original.spectral_ratio - 3.0).abs() < 1e-9);
    assert!((metrics.original.spectral_radius - 2f64.sqrt()).abs() < 1e-9);
    assert!((metrics.original.spectral_gap - 2f64.sqrt()).abs() < 1e-9);
    assert!((metrics.original.eigenratio - 1.0 / 3.0).abs() < 1e-9);
}
