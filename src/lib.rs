//! Library entry point for `rna-clique-core`: reciprocal-best-match
//! ortholog graphs and exact-rational distance matrices for de novo
//! assembled transcriptomes.
//!
//! Components, leaves first: [`aligner`] (A) drives the external
//! local-alignment tool; [`top_genes`] (B) reduces a sample to its most
//! informative genes; [`reciprocal`] (C) finds reciprocal best matches for
//! one pair; [`orchestrator`] (D) schedules every pair in parallel;
//! [`graph`] (E) unions all pairwise matches into one graph;
//! [`ideal_components`] (F) extracts the orthologs every sample agrees on;
//! [`similarity`] (G) computes the exact-rational distance matrix
//! restricted to those orthologs. [`config`] and [`run`] wire B-G into the
//! single pipeline the CLI in `src/main.rs` drives.

pub mod aligner;
pub mod config;
pub mod error;
pub mod fasta;
pub mod graph;
pub mod hit;
pub mod ideal_components;
pub mod orchestrator;
pub mod persist;
pub mod reciprocal;
pub mod run;
pub mod sample_registry;
pub mod similarity;
pub mod top_genes;
pub mod transcript_id;
pub mod union_find;
