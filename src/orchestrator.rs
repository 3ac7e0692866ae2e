//! Component D: the all-pairs orchestrator (§4.D).
//!
//! Grounded on `find_all_pairs.py` (original_source, parallel dispatch over
//! `itertools.combinations`), re-expressed with a single `rayon` thread
//! pool the way the teacher dispatches its own batch alignment work in
//! `batch_align.rs` (`rayon::ThreadPoolBuilder` built once per run, then
//! `par_iter` over the work list) rather than a pool spun up per pair.

use crate::aligner::AlignerDriver;
use crate::error::{EngineError, PairError};
use crate::hit::GeneMatchTable;
use crate::reciprocal::{find_reciprocal_matches, ReciprocalMatchParams};
use crate::transcript_id::TranscriptIdParser;
use rayon::prelude::*;
use std::path::PathBuf;

/// One sample as seen by the orchestrator: its name and the path to its
/// already-reduced FASTA (component B's output).
#[derive(Debug, Clone)]
pub struct ReducedSample {
    pub name: String,
    pub fasta_path: PathBuf,
}

/// Build the `(n choose 2)` unordered pairs over `samples`, preserving no
/// particular order guarantee downstream (§4.D: "ordering ... is
/// unspecified").
fn unordered_pairs(samples: &[ReducedSample]) -> Vec<(&ReducedSample, &ReducedSample)> {
    let mut pairs = Vec::new();
    for i in 0..samples.len() {
        for j in (i + 1)..samples.len() {
            pairs.push((&samples[i], &samples[j]));
        }
    }
    pairs
}

/// Run component C over every unordered pair of `samples`, using a single
/// `rayon` thread pool sized to `jobs` (§4.D, §9 "Parallelism as a
/// parameter": never nest pools). Each successful table is handed to
/// `on_table` as soon as it completes, inside the pool itself, rather than
/// collected into a `Vec` first (§9 "Streaming over collecting") — the
/// caller's graph-ingestion/persistence work therefore runs interleaved
/// with the remaining alignments instead of after all of them finish. A
/// failure in one pair does not cancel the others; failures are aggregated
/// into the returned list rather than aborting the run (§5, §7). If
/// `on_table` itself errors, dispatch of further pairs is skipped and that
/// error is returned.
pub fn run_all_pairs(
    samples: &[ReducedSample],
    id_parser: &TranscriptIdParser,
    params: &ReciprocalMatchParams,
    driver: &dyn AlignerDriver,
    jobs: usize,
    on_table: &mut (dyn FnMut(GeneMatchTable) -> Result<(), EngineError> + Send),
) -> Result<Vec<PairError>, EngineError> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs.max(1))
        .build()
        .map_err(|e| EngineError::Config(format!("failed to build worker pool: {e}")))?;

    let pairs = unordered_pairs(samples);
    let failures = std::sync::Mutex::new(Vec::new());
    let on_table = std::sync::Mutex::new(on_table);
    let callback_err: std::sync::Mutex<Option<EngineError>> = std::sync::Mutex::new(None);

    pool.install(|| {
        pairs.par_iter().for_each(|(a, b)| {
            if callback_err.lock().unwrap().is_some() {
                return;
            }
            let result = find_reciprocal_matches(
                &a.name,
                &a.fasta_path,
                &b.name,
                &b.fasta_path,
                id_parser,
                params,
                driver,
            )
            .map_err(|source| PairError {
                sample_a: a.name.clone(),
                sample_b: b.name.clone(),
                source,
            });

            match result {
                Ok(table) => {
                    let mut callback = on_table.lock().unwrap();
                    if let Err(e) = (callback)(table) {
                        *callback_err.lock().unwrap() = Some(e);
                    }
                }
                Err(e) => failures.lock().unwrap().push(e),
            }
        });
    });

    if let Some(e) = callback_err.into_inner().unwrap() {
        return Err(e);
    }
    Ok(failures.into_inner().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::{MockAligner, RawHit};
    use std::path::Path;

    fn reduced(name: &str, path: &str) -> ReducedSample {
        ReducedSample {
            name: name.to_string(),
            fasta_path: PathBuf::from(path),
        }
    }

    fn parser() -> TranscriptIdParser {
        TranscriptIdParser::from_pattern(r"^.*g([0-9]+)_i([0-9]+)$").unwrap()
    }

    #[test]
    fn unordered_pairs_covers_every_combination_once() {
        let samples = vec![reduced("A", "/a"), reduced("B", "/b"), reduced("C", "/c")];
        let pairs = unordered_pairs(&samples);
        assert_eq!(pairs.len(), 3);
        let names: Vec<(String, String)> = pairs
            .iter()
            .map(|(a, b)| (a.name.clone(), b.name.clone()))
            .collect();
        assert!(names.contains(&("A".to_string(), "B".to_string())));
        assert!(names.contains(&("A".to_string(), "C".to_string())));
        assert!(names.contains(&("B".to_string(), "C".to_string())));
    }

    #[test]
    fn runs_every_pair_and_aggregates_no_failures_on_success() {
        let samples = vec![reduced("A", "/a"), reduced("B", "/b")];
        let mock = MockAligner::new();
        mock.set_response(
            Path::new("/a"),
            Path::new("/b"),
            vec![RawHit {
                qseqid: "g1_i1".into(),
                sseqid: "g1_i1".into(),
                length: 100,
                gaps: 0,
                nident: 100,
                bitscore: 200.0,
                sstrand: None,
            }],
        );
        mock.set_response(
            Path::new("/b"),
            Path::new("/a"),
            vec![RawHit {
                qseqid: "g1_i1".into(),
                sseqid: "g1_i1".into(),
                length: 100,
                gaps: 0,
                nident: 100,
                bitscore: 200.0,
                sstrand: None,
            }],
        );

        let params = ReciprocalMatchParams {
            evalue: 1e-50,
            top_matches: 1,
            keep_all: true,
        };
        let mut tables = Vec::new();
        let mut on_table = |table: GeneMatchTable| -> Result<(), EngineError> {
            tables.push(table);
            Ok(())
        };
        let failures = run_all_pairs(&samples, &parser(), &params, &mock, 2, &mut on_table).unwrap();
        assert_eq!(tables.len(), 1);
        assert!(failures.is_empty());
    }

    #[test]
    fn callback_error_is_propagated_and_stops_further_ingestion() {
        let samples = vec![reduced("A", "/a"), reduced("B", "/b")];
        let mock = MockAligner::new();
        mock.set_response(
            Path::new("/a"),
            Path::new("/b"),
            vec![RawHit {
                qseqid: "g1_i1".into(),
                sseqid: "g1_i1".into(),
                length: 100,
                gaps: 0,
                nident: 100,
                bitscore: 200.0,
                sstrand: None,
            }],
        );
        mock.set_response(
            Path::new("/b"),
            Path::new("/a"),
            vec![RawHit {
                qseqid: "g1_i1".into(),
                sseqid: "g1_i1".into(),
                length: 100,
                gaps: 0,
                nident: 100,
                bitscore: 200.0,
                sstrand: None,
            }],
        );

        let params = ReciprocalMatchParams {
            evalue: 1e-50,
            top_matches: 1,
            keep_all: true,
        };
        let mut on_table = |_table: GeneMatchTable| -> Result<(), EngineError> {
            Err(EngineError::Config("boom".into()))
        };
        let err = run_all_pairs(&samples, &parser(), &params, &mock, 2, &mut on_table).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }
}
