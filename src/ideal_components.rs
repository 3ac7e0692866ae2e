//! Component F: the ideal-component extractor (§4.F).
//!
//! Grounded on `filtered_distance.py`'s `is_complete`/`get_ideal_components`
//! (original_source): find connected components of the gene-matches graph,
//! then keep only those that are complete K_n on exactly one vertex per
//! sample. Connectivity reuses the teacher's own `src/union_find.rs`
//! `UnionFind` over a dense vertex index; completeness is checked by
//! comparing each group's edge count (read back from the `petgraph` graph)
//! against K·(K−1)/2.

use crate::graph::{GeneMatchesGraph, Vertex};
use crate::union_find::UnionFind;
use indexmap::IndexMap;
use std::collections::HashSet;

/// An ideal component: the full set of vertices in a connected component
/// that is complete on exactly one vertex per sample (§3, §4.F).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdealComponent {
    pub vertices: Vec<Vertex>,
}

/// The result of running the extractor over one graph: every ideal
/// component found, and the flattened set of valid `(sample, gene)`
/// vertices (V* in §4.G) they induce.
#[derive(Debug, Clone, Default)]
pub struct IdealComponents {
    pub components: Vec<IdealComponent>,
    pub valid_vertices: HashSet<Vertex>,
}

impl IdealComponents {
    pub fn is_valid(&self, v: Vertex) -> bool {
        self.valid_vertices.contains(&v)
    }
}

/// Enumerate ideal components of `graph` for a sample count of `k`.
///
/// `k` is either user-provided or inferred as the number of distinct
/// sample ids appearing among the graph's vertices (§4.F); callers that
/// already maintain a `SampleRegistry` should generally pass
/// `registry.len()`.
pub fn find_ideal_components(graph: &GeneMatchesGraph, k: usize) -> IdealComponents {
    if k == 0 {
        return IdealComponents::default();
    }

    // Dense index for every vertex, in a deterministic (insertion) order
    // so union-find results never depend on petgraph's internal hashing.
    let mut index: IndexMap<Vertex, usize> = IndexMap::new();
    for v in graph.nodes() {
        let next = index.len();
        index.entry(v).or_insert(next);
    }

    let mut uf = UnionFind::new(index.len());
    for v in graph.nodes() {
        let vi = index[&v];
        for n in graph.neighbors(v) {
            let ni = index[&n];
            uf.union(vi, ni);
        }
    }

    let target_edges = k * (k.saturating_sub(1)) / 2;
    let mut components = Vec::new();
    let mut valid_vertices = HashSet::new();

    for group in uf.get_sets() {
        if group.len() != k {
            continue;
        }
        let vertices: Vec<Vertex> = group
            .iter()
            .map(|&idx| *index.get_index(idx).unwrap().0)
            .collect();

        let samples: HashSet<u32> = vertices.iter().map(|(s, _)| *s).collect();
        if samples.len() != k {
            continue;
        }

        let edge_count = count_edges_within(graph, &vertices);
        if edge_count != target_edges {
            continue;
        }

        valid_vertices.extend(vertices.iter().copied());
        components.push(IdealComponent { vertices });
    }

    IdealComponents {
        components,
        valid_vertices,
    }
}

fn count_edges_within(graph: &GeneMatchesGraph, vertices: &[Vertex]) -> usize {
    let set: HashSet<Vertex> = vertices.iter().copied().collect();
    let mut count = 0;
    for &v in vertices {
        for n in graph.neighbors(v) {
            if set.contains(&n) {
                count += 1;
            }
        }
    }
    count / 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hit::{GeneMatchTable, Hit};
    use crate::sample_registry::SampleRegistry;

    fn hit(qgene: i64, sgene: i64) -> Hit {
        Hit {
            qseqid: String::new(),
            sseqid: String::new(),
            qgene,
            qiso: 1,
            sgene,
            siso: 1,
            length: 100,
            gaps: 0,
            nident: 100,
            bitscore: 200.0,
            sstrand: None,
        }
    }

    fn table(a: &str, b: &str, pairs: &[(i64, i64)]) -> GeneMatchTable {
        let mut t = GeneMatchTable::new(a, b);
        for &(qg, sg) in pairs {
            t.hits.push(hit(qg, sg));
        }
        t
    }

    /// Scenario 1 (§8): K=3, gene ids {1,2,3} perfectly shared pairwise.
    #[test]
    fn scenario_1_three_ideal_components_for_k3_fully_shared_genes() {
        let mut reg = SampleRegistry::new();
        let mut graph = GeneMatchesGraph::new();
        graph.ingest(&mut reg, &table("A", "B", &[(1, 1), (2, 2), (3, 3)]));
        graph.ingest(&mut reg, &table("B", "C", &[(1, 1), (2, 2), (3, 3)]));
        graph.ingest(&mut reg, &table("A", "C", &[(1, 1), (2, 2), (3, 3)]));

        let ideal = find_ideal_components(&graph, reg.len());
        assert_eq!(ideal.components.len(), 3);
        for c in &ideal.components {
            assert_eq!(c.vertices.len(), 3);
        }
        assert_eq!(ideal.valid_vertices.len(), 9);
    }

    /// Scenario 2 (§8): K=2, F2 has an extra unmatched gene.
    #[test]
    fn scenario_2_only_shared_genes_are_ideal_with_k2() {
        let mut reg = SampleRegistry::new();
        let mut graph = GeneMatchesGraph::new();
        graph.ingest(&mut reg, &table("A", "B", &[(1, 1), (2, 2)]));
        // Gene 3 in B has no reciprocal match so never appears as an edge.

        let ideal = find_ideal_components(&graph, reg.len());
        assert_eq!(ideal.components.len(), 2);
        let a = reg.get_id("A").unwrap();
        let b = reg.get_id("B").unwrap();
        assert!(!ideal.is_valid((b, 3)));
        assert!(ideal.is_valid((a, 1)));
        assert!(ideal.is_valid((b, 1)));
    }

    /// Scenario 4 (§8): K=4, one sample entirely missing -> no ideal components.
    #[test]
    fn scenario_4_missing_sample_yields_no_ideal_components() {
        let mut reg = SampleRegistry::new();
        let mut graph = GeneMatchesGraph::new();
        graph.ingest(&mut reg, &table("A", "B", &[(1, 1)]));
        graph.ingest(&mut reg, &table("A", "C", &[(1, 1)]));
        graph.ingest(&mut reg, &table("B", "C", &[(1, 1)]));
        // D never appears in any table but is part of the nominal sample set.
        reg.get_or_insert("D");

        let ideal = find_ideal_components(&graph, reg.len());
        assert!(ideal.components.is_empty());
        assert!(ideal.valid_vertices.is_empty());
    }

    #[test]
    fn complete_but_wrong_size_component_is_excluded() {
        // A triangle among A,B,C but K is declared as 4: size mismatch.
        let mut reg = SampleRegistry::new();
        let mut graph = GeneMatchesGraph::new();
        graph.ingest(&mut reg, &table("A", "B", &[(1, 1)]));
        graph.ingest(&mut reg, &table("A", "C", &[(1, 1)]));
        graph.ingest(&mut reg, &table("B", "C", &[(1, 1)]));

        let ideal = find_ideal_components(&graph, 4);
        assert!(ideal.components.is_empty());
    }

    #[test]
    fn non_complete_component_spanning_all_samples_is_excluded() {
        // A-B-C path (2 edges) without the A-C edge: spans K=3 samples but
        // is not complete, so it's deliberately excluded (§9).
        let mut reg = SampleRegistry::new();
        let mut graph = GeneMatchesGraph::new();
        graph.ingest(&mut reg, &table("A", "B", &[(1, 1)]));
        graph.ingest(&mut reg, &table("B", "C", &[(1, 2)]));

        let ideal = find_ideal_components(&graph, 3);
        assert!(ideal.components.is_empty());
    }

    #[test]
    fn empty_graph_has_no_ideal_components() {
        let graph = GeneMatchesGraph::new();
        let ideal = find_ideal_components(&graph, 2);
        assert!(ideal.components.is_empty());
    }
}
