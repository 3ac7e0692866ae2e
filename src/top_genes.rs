//! Component B: reduce a sample's transcripts to its top N genes by
//! per-gene maximum isoform coverage.
//!
//! Grounded on `select_top_genes.py` (original_source): a
//! `defaultdict(float)` of per-gene maximum coverage, then `heapq.nlargest`
//! over `(coverage, gene)` pairs to pick the top N genes.

use crate::error::EngineError;
use crate::fasta::Transcript;
use crate::transcript_id::TranscriptIdParser;
use ordered_float::OrderedFloat;
use std::collections::HashMap;

/// Select the transcripts belonging to the `top` genes with highest
/// per-gene maximum isoform coverage. Ties at the Nth position are broken
/// by gene id ascending, then by first-appearance order (§4.B, resolved
/// Open Question in SPEC_FULL.md/DESIGN.md) — a pure function of
/// `(transcripts, top)`, independent of hash-map iteration order.
///
/// `top == 0` yields no transcripts; `top` at or beyond the distinct-gene
/// count yields every transcript, preserving input order (§4.B edge cases).
pub fn select_top_genes(
    sample: &str,
    transcripts: &[Transcript],
    parser: &TranscriptIdParser,
    top: usize,
) -> Result<Vec<Transcript>, EngineError> {
    if top == 0 {
        return Ok(Vec::new());
    }

    let mut max_coverage: HashMap<i64, (OrderedFloat<f64>, usize)> = HashMap::new();
    let mut ids = Vec::with_capacity(transcripts.len());
    for (order, t) in transcripts.iter().enumerate() {
        let id = parser.parse(sample, &t.id)?;
        ids.push(id);
        let cov = OrderedFloat(id.coverage);
        max_coverage
            .entry(id.gene)
            .and_modify(|(best, first_seen)| {
                if cov > *best {
                    *best = cov;
                }
                let _ = first_seen;
            })
            .or_insert((cov, order));
    }

    let mut genes: Vec<(i64, OrderedFloat<f64>, usize)> = max_coverage
        .into_iter()
        .map(|(gene, (cov, first_seen))| (gene, cov, first_seen))
        .collect();

    // Highest coverage first; ties broken by gene id ascending, then by
    // first appearance, so selection never depends on hashmap order.
    genes.sort_by(|a, b| {
        b.1.cmp(&a.1).then(a.0.cmp(&b.0)).then(a.2.cmp(&b.2))
    });
    genes.truncate(top);

    let kept: std::collections::HashSet<i64> = genes.into_iter().map(|(gene, _, _)| gene).collect();

    Ok(transcripts
        .iter()
        .zip(ids.iter())
        .filter(|(_, id)| kept.contains(&id.gene))
        .map(|(t, _)| t.clone())
        .collect())
}
