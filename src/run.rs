//! The `run` pipeline driver (§4.H): wires components B through G into a
//! single invocation, mirroring the way the teacher's `main.rs` sequences
//! its own pipeline stages (detect -> align -> filter -> write) behind one
//! `run`-shaped function that the thin `main` in `src/main.rs` calls.

use crate::aligner::{AlignerDriver, BlastnDriver};
use crate::config::RunConfig;
use crate::error::{EngineError, PairError};
use crate::fasta;
use crate::graph::GeneMatchesGraph;
use crate::hit::GeneMatchTable;
use crate::ideal_components::{find_ideal_components, IdealComponents};
use crate::orchestrator::{run_all_pairs, ReducedSample};
use crate::persist;
use crate::reciprocal::ReciprocalMatchParams;
use crate::sample_registry::SampleRegistry;
use crate::similarity::{build_matrix, pair_similarity, DistanceMatrix, PairSimilarities, SamplePair};
use crate::top_genes::select_top_genes;
use std::path::PathBuf;

/// Everything the CLI needs to report back to the user after a run.
pub struct RunReport {
    pub matrix: DistanceMatrix,
    pub failures: Vec<PairError>,
    pub ideal_component_count: usize,
}

/// Run the full pipeline using the production `blastn`-backed driver.
pub fn run(config: &RunConfig) -> Result<RunReport, EngineError> {
    let db_cache_dir = config.output_dir.join("dbcache");
    let driver = BlastnDriver::new(db_cache_dir);
    run_with_driver(config, &driver)
}

/// Run the full pipeline against an arbitrary `AlignerDriver`, so
/// integration tests can exercise B through G without `blastn` installed
/// (§4.A: the trait exists exactly so the rest of the core is testable
/// without the external tool).
pub fn run_with_driver(config: &RunConfig, driver: &dyn AlignerDriver) -> Result<RunReport, EngineError> {
    let reduced_dir = config.output_dir.join("reduced");
    let pairs_dir = config.output_dir.join("pairs");
    std::fs::create_dir_all(&reduced_dir).map_err(|e| EngineError::io(&reduced_dir, e))?;
    std::fs::create_dir_all(&pairs_dir).map_err(|e| EngineError::io(&pairs_dir, e))?;

    log::info!("reducing {} samples to top {} genes", config.samples.len(), config.top_genes);
    let reduced_samples = reduce_samples(config, &reduced_dir)?;

    log::info!(
        "running reciprocal matches for {} pairs across {} workers",
        reduced_samples.len() * reduced_samples.len().saturating_sub(1) / 2,
        config.jobs
    );
    let params = ReciprocalMatchParams {
        evalue: config.evalue,
        top_matches: config.top_matches,
        keep_all: config.keep_all,
    };
    // Each completed pair is ingested into the graph and persisted to disk
    // as it arrives, rather than collected into a `Vec<GeneMatchTable>`
    // first (§4.D, §9 "Streaming over collecting"). Only the lightweight
    // persisted path is kept in memory per pair; the similarity engine (G)
    // re-reads tables from disk in a second pass below, once ideal
    // components are known.
    let mut registry = SampleRegistry::new();
    let mut graph = GeneMatchesGraph::new();
    let mut table_paths: Vec<PathBuf> = Vec::new();
    let mut on_table = |table: GeneMatchTable| -> Result<(), EngineError> {
        graph.ingest(&mut registry, &table);
        table_paths.push(persist_table(&pairs_dir, &table)?);
        Ok(())
    };
    let failures = run_all_pairs(
        &reduced_samples,
        &config.id_parser,
        &params,
        driver,
        config.jobs,
        &mut on_table,
    )?;

    for failure in &failures {
        log::warn!("{failure}");
    }

    persist::write_graph(&config.output_dir.join("graph.bin"), &graph, &registry)?;

    // K defaults to the declared sample count, not the number of distinct
    // samples actually seen as graph vertices: a sample with zero hits
    // anywhere is still a real sample for completeness purposes (§4.F, §8
    // scenario 4), and inferring K from the graph alone would undercount it.
    let k = config
        .sample_count_override
        .unwrap_or(config.samples.len());
    let ideal = find_ideal_components(&graph, k);
    if ideal.components.is_empty() && k >= 2 {
        log::warn!(
            "no ideal components found across {k} samples; distance matrix will have 1 on the \
             diagonal and undefined (NaN) elsewhere"
        );
    } else {
        log::info!("found {} ideal components", ideal.components.len());
    }

    let mut pair_similarities = PairSimilarities::new();
    for path in &table_paths {
        let table = persist::read_gene_match_table(path)?;
        let key = SamplePair::new(&table.sample_a, &table.sample_b);
        let sim = pair_similarity(&table, &ideal, &registry);
        pair_similarities.insert(key, sim);
    }

    let sample_names: Vec<String> = config.samples.iter().map(|s| s.name.clone()).collect();
    let matrix = build_matrix(&sample_names, &pair_similarities);

    let matrix_path = config.output_dir.join(matrix_file_name(config));
    persist::write_matrix(&matrix_path, &matrix, config.format, config.dissimilarity)?;
    log::info!("wrote distance matrix to {}", matrix_path.display());

    Ok(RunReport {
        matrix,
        failures,
        ideal_component_count: ideal.components.len(),
    })
}

fn matrix_file_name(config: &RunConfig) -> &'static str {
    match config.format {
        crate::persist::MatrixFormat::Whitespace => "distance_matrix.txt",
        crate::persist::MatrixFormat::Tsv => "distance_matrix.tsv",
        crate::persist::MatrixFormat::Csv => "distance_matrix.csv",
    }
}

fn reduce_samples(config: &RunConfig, reduced_dir: &std::path::Path) -> Result<Vec<ReducedSample>, EngineError> {
    let mut out = Vec::with_capacity(config.samples.len());
    for sample in &config.samples {
        let transcripts = fasta::read_transcripts(&sample.fasta_path)?;
        let kept = select_top_genes(&sample.name, &transcripts, &config.id_parser, config.top_genes)?;
        let reduced_path: PathBuf = reduced_dir.join(format!("{}.fasta", sample.name));
        fasta::write_transcripts(&reduced_path, kept.iter())?;
        out.push(ReducedSample {
            name: sample.name.clone(),
            fasta_path: reduced_path,
        });
    }
    Ok(out)
}

fn persist_table(pairs_dir: &std::path::Path, table: &GeneMatchTable) -> Result<PathBuf, EngineError> {
    let stem = persist::pair_path_stem(&table.sample_a, &table.sample_b);
    let path = pairs_dir.join(format!("{stem}.tsv"));
    persist::write_gene_match_table(&path, table)?;
    Ok(path)
}

fn build_graph(tables: &[GeneMatchTable]) -> (GeneMatchesGraph, SampleRegistry) {
    let mut registry = SampleRegistry::new();
    let mut graph = GeneMatchesGraph::new();
    for table in tables {
        graph.ingest(&mut registry, table);
    }
    (graph, registry)
}

/// Ideal components are re-exposed for callers (e.g. an ortholog exporter
/// built on top of this core) that need the component structure, not just
/// the final matrix.
pub fn ideal_components_for(tables: &[GeneMatchTable], sample_count: usize) -> IdealComponents {
    let (graph, _registry) = build_graph(tables);
    find_ideal_components(&graph, sample_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::{MockAligner, RawHit};
    use crate::config::NamedSample;
    use crate::transcript_id::TranscriptIdParser;

    fn write_fasta(dir: &std::path::Path, name: &str, records: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(format!("{name}.fasta"));
        let mut content = String::new();
        for (id, seq) in records {
            content.push_str(&format!(">{id}\n{seq}\n"));
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Scenario 1 (§8): three samples sharing three genes, perfect matches
    /// in both directions for every pair -> three ideal components and an
    /// all-zero dissimilarity matrix.
    #[test]
    fn end_to_end_three_samples_three_shared_genes_is_all_zero_dissimilarity() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_fasta(
            dir.path(),
            "A",
            &[
                ("t_cov_10.0_g1_i1", "ACGTACGTAC"),
                ("t_cov_10.0_g2_i1", "ACGTACGTAC"),
                ("t_cov_10.0_g3_i1", "ACGTACGTAC"),
            ],
        );
        let b = write_fasta(
            dir.path(),
            "B",
            &[
                ("t_cov_10.0_g1_i1", "ACGTACGTAC"),
                ("t_cov_10.0_g2_i1", "ACGTACGTAC"),
                ("t_cov_10.0_g3_i1", "ACGTACGTAC"),
            ],
        );
        let c = write_fasta(
            dir.path(),
            "C",
            &[
                ("t_cov_10.0_g1_i1", "ACGTACGTAC"),
                ("t_cov_10.0_g2_i1", "ACGTACGTAC"),
                ("t_cov_10.0_g3_i1", "ACGTACGTAC"),
            ],
        );

        let id_parser =
            TranscriptIdParser::from_pattern(TranscriptIdParser::default_pattern()).unwrap();
        let config = RunConfig {
            samples: vec![
                NamedSample { name: "A".into(), fasta_path: a.clone() },
                NamedSample { name: "B".into(), fasta_path: b.clone() },
                NamedSample { name: "C".into(), fasta_path: c.clone() },
            ],
            top_genes: 10,
            top_matches: 1,
            keep_all: true,
            evalue: 1e-50,
            id_parser,
            jobs: 1,
            sample_count_override: None,
            output_dir: dir.path().join("out"),
            format: crate::persist::MatrixFormat::Tsv,
            dissimilarity: true,
        };

        let mock = MockAligner::new();
        let perfect_hit = |gene: i64| RawHit {
            qseqid: format!("t_cov_10.0_g{gene}_i1"),
            sseqid: format!("t_cov_10.0_g{gene}_i1"),
            length: 10,
            gaps: 0,
            nident: 10,
            bitscore: 200.0,
            sstrand: None,
        };
        let reduced_dir = config.output_dir.join("reduced");
        std::fs::create_dir_all(&reduced_dir).unwrap();
        for (x, y) in [("A", "B"), ("B", "A"), ("A", "C"), ("C", "A"), ("B", "C"), ("C", "B")] {
            let qpath = reduced_dir.join(format!("{x}.fasta"));
            let spath = reduced_dir.join(format!("{y}.fasta"));
            mock.set_response(&qpath, &spath, vec![perfect_hit(1), perfect_hit(2), perfect_hit(3)]);
        }

        let report = run_with_driver(&config, &mock).unwrap();
        assert_eq!(report.ideal_component_count, 3);
        assert!(report.failures.is_empty());

        for i in 0..report.matrix.samples.len() {
            for j in 0..report.matrix.samples.len() {
                assert_eq!(report.matrix.dissimilarity[i][j], 0.0);
            }
        }
    }

    /// Scenario 6 (§8): both FASTAs empty -> empty graph, no ideal
    /// components, run still succeeds.
    #[test]
    fn end_to_end_two_empty_samples_succeeds_with_undefined_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_fasta(dir.path(), "A", &[]);
        let b = write_fasta(dir.path(), "B", &[]);

        let id_parser =
            TranscriptIdParser::from_pattern(TranscriptIdParser::default_pattern()).unwrap();
        let config = RunConfig {
            samples: vec![
                NamedSample { name: "A".into(), fasta_path: a },
                NamedSample { name: "B".into(), fasta_path: b },
            ],
            top_genes: 10,
            top_matches: 1,
            keep_all: true,
            evalue: 1e-50,
            id_parser,
            jobs: 1,
            sample_count_override: None,
            output_dir: dir.path().join("out"),
            format: crate::persist::MatrixFormat::Whitespace,
            dissimilarity: false,
        };

        let mock = MockAligner::new();
        let report = run_with_driver(&config, &mock).unwrap();
        assert_eq!(report.ideal_component_count, 0);
        assert_eq!(report.matrix.similarity[0][0], 1.0);
        assert!(report.matrix.similarity[0][1].is_nan());
    }
}
