//! Component E: the gene-matches graph builder (§4.E).
//!
//! Grounded on `build_graph.py` (original_source): a `networkx.Graph` union
//! of edges drawn from every pairwise `GeneMatchTable`. Here the graph is a
//! `petgraph::graphmap::UnGraphMap` keyed directly on `(sample_id, gene)`
//! pairs, which petgraph supports natively since the key type is hashable —
//! no auxiliary node-index table is needed, unlike `petgraph::Graph`.

use crate::hit::GeneMatchTable;
use crate::sample_registry::SampleRegistry;
use petgraph::graphmap::UnGraphMap;

/// A vertex of the gene-matches graph: a sample (by registry id) and a
/// gene id within that sample.
pub type Vertex = (u32, i64);

/// The undirected gene-matches graph (§3). Streaming and single-pass: call
/// `ingest` once per `GeneMatchTable` as it becomes available, in any
/// order — ingestion is commutative and idempotent (§8).
#[derive(Debug, Clone, Default)]
pub struct GeneMatchesGraph {
    graph: UnGraphMap<Vertex, ()>,
}

impl GeneMatchesGraph {
    pub fn new() -> Self {
        Self {
            graph: UnGraphMap::new(),
        }
    }

    /// Ensure a single vertex exists, with no implied edge. Used when
    /// restoring a persisted graph blob, whose vertex list may include
    /// isolated vertices that no edge references (§3: "vertices with no
    /// incident edge may exist").
    pub fn ensure_vertex(&mut self, v: Vertex) {
        self.graph.add_node(v);
    }

    /// Add every edge implied by one table's rows. Self-loops (a hit whose
    /// query and subject vertex coincide) are skipped — the graph model
    /// forbids them (§3).
    pub fn ingest(&mut self, registry: &mut SampleRegistry, table: &GeneMatchTable) {
        for hit in &table.hits {
            let qv = (registry.get_or_insert(&table.sample_a), hit.qgene);
            let sv = (registry.get_or_insert(&table.sample_b), hit.sgene);
            if qv == sv {
                continue;
            }
            self.graph.add_node(qv);
            self.graph.add_node(sv);
            self.graph.add_edge(qv, sv, ());
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn nodes(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.graph.nodes()
    }

    pub fn contains_edge(&self, a: Vertex, b: Vertex) -> bool {
        self.graph.contains_edge(a, b)
    }

    pub fn neighbors(&self, v: Vertex) -> impl Iterator<Item = Vertex> + '_ {
        self.graph.neighbors(v)
    }
}
