//! Component C: the reciprocal-best-match finder (§4.C).
//!
//! Grounded on `find_homologs.py` (original_source): a forward search, a
//! reverse search with query/subject columns swapped back to sample-1/
//! sample-2 orientation, a reciprocal intersection on `(qgene, sgene)`,
//! then two `nlargest`-by-bitscore reductions (per `(qgene, sgene)` group,
//! then per `qgene` group).

use crate::aligner::{AlignerDriver, RawHit};
use crate::error::EngineError;
use crate::hit::{GeneMatchTable, Hit};
use crate::transcript_id::TranscriptIdParser;
use ordered_float::OrderedFloat;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Parameters for one reciprocal-match comparison, factored out of
/// `RunConfig` so `find_reciprocal_matches` can be called directly in
/// tests without building a full config.
#[derive(Debug, Clone)]
pub struct ReciprocalMatchParams {
    pub evalue: f64,
    /// N_top: the "top-matches" parameter (§4.C), counted as distinct
    /// subject genes per query gene (resolved Open Question, DESIGN.md).
    pub top_matches: usize,
    /// Step 5 tie policy: keep every row tied for best per query gene
    /// (`true`), or deterministically keep only the first (`false`).
    pub keep_all: bool,
}

fn parsed_hit(
    sample: &str,
    raw: &RawHit,
    id_parser: &TranscriptIdParser,
    swap_q_s: bool,
) -> Result<Hit, EngineError> {
    let (q_header, s_header) = if swap_q_s {
        (&raw.sseqid, &raw.qseqid)
    } else {
        (&raw.qseqid, &raw.sseqid)
    };
    let qid = id_parser.parse(sample, q_header)?;
    let sid = id_parser.parse(sample, s_header)?;
    Ok(Hit {
        qseqid: q_header.clone(),
        sseqid: s_header.clone(),
        qgene: qid.gene,
        qiso: qid.isoform,
        sgene: sid.gene,
        siso: sid.isoform,
        length: raw.length,
        gaps: raw.gaps,
        nident: raw.nident,
        bitscore: raw.bitscore,
        sstrand: raw.sstrand,
    })
}

/// Step 1/2: keep, for each query gene, the rows whose bitscore is among
/// the top `top_matches` distinct subject-gene-max-bitscore values for
/// that query gene. Ties at the threshold always keep every candidate
/// gene (keep-all semantics are unconditional here; `keep_all` in
/// `ReciprocalMatchParams` only governs step 5).
fn top_n_by_distinct_subject_gene(hits: Vec<Hit>, top_matches: usize) -> Vec<Hit> {
    if top_matches == 0 {
        return Vec::new();
    }
    let mut by_qgene: HashMap<i64, Vec<Hit>> = HashMap::new();
    for h in hits {
        by_qgene.entry(h.qgene).or_default().push(h);
    }

    let mut out = Vec::new();
    for (_, rows) in by_qgene {
        let mut max_by_sgene: HashMap<i64, OrderedFloat<f64>> = HashMap::new();
        for h in &rows {
            let score = OrderedFloat(h.bitscore);
            max_by_sgene
                .entry(h.sgene)
                .and_modify(|best| {
                    if score > *best {
                        *best = score;
                    }
                })
                .or_insert(score);
        }
        let mut scores: Vec<OrderedFloat<f64>> = max_by_sgene.values().copied().collect();
        scores.sort_unstable_by(|a, b| b.cmp(a));
        scores.dedup();
        if scores.is_empty() {
            continue;
        }
        let threshold = scores[top_matches.saturating_sub(1).min(scores.len() - 1)];
        let keep_genes: HashSet<i64> = max_by_sgene
            .into_iter()
            .filter(|(_, score)| *score >= threshold)
            .map(|(gene, _)| gene)
            .collect();
        out.extend(rows.into_iter().filter(|h| keep_genes.contains(&h.sgene)));
    }
    out
}

/// Step 4: within each `(qgene, sgene)` group, keep rows at the maximum
/// bitscore (ties always kept).
fn best_per_gene_pair(hits: Vec<Hit>) -> Vec<Hit> {
    let mut by_pair: HashMap<(i64, i64), Vec<Hit>> = HashMap::new();
    for h in hits {
        by_pair.entry((h.qgene, h.sgene)).or_default().push(h);
    }
    let mut out = Vec::new();
    for (_, rows) in by_pair {
        let max = rows
            .iter()
            .map(|h| OrderedFloat(h.bitscore))
            .max()
            .unwrap();
        out.extend(rows.into_iter().filter(|h| OrderedFloat(h.bitscore) == max));
    }
    out
}

/// Step 5: within each `qgene` group, keep rows at the maximum bitscore;
/// if `keep_all` is false, keep only the first by the deterministic
/// tie-break resolved in DESIGN.md (lowest sgene, then lowest siso, then
/// input row order).
fn best_per_query_gene(hits: Vec<Hit>, keep_all: bool) -> Vec<Hit> {
    let mut by_qgene: HashMap<i64, Vec<(usize, Hit)>> = HashMap::new();
    for (order, h) in hits.into_iter().enumerate() {
        by_qgene.entry(h.qgene).or_default().push((order, h));
    }
    let mut out = Vec::new();
    for (_, mut rows) in by_qgene {
        let max = rows
            .iter()
            .map(|(_, h)| OrderedFloat(h.bitscore))
            .max()
            .unwrap();
        rows.retain(|(_, h)| OrderedFloat(h.bitscore) == max);
        if keep_all {
            out.extend(rows.into_iter().map(|(_, h)| h));
        } else {
            rows.sort_by(|(oa, a), (ob, b)| {
                a.sgene.cmp(&b.sgene).then(a.siso.cmp(&b.siso)).then(oa.cmp(ob))
            });
            if let Some((_, first)) = rows.into_iter().next() {
                out.push(first);
            }
        }
    }
    out
}

/// Run the full reciprocal-match pipeline (§4.C) for the unordered pair
/// {sample_a, sample_b}, given their reduced FASTA paths.
pub fn find_reciprocal_matches(
    sample_a: &str,
    fasta_a: &Path,
    sample_b: &str,
    fasta_b: &Path,
    id_parser: &TranscriptIdParser,
    params: &ReciprocalMatchParams,
    driver: &dyn AlignerDriver,
) -> Result<GeneMatchTable, EngineError> {
    // Forward: a (query) vs b (subject) — qgene/sgene already in a/b order.
    let forward_raw = driver.search(fasta_a, fasta_b, params.evalue)?;
    let forward: Vec<Hit> = forward_raw
        .iter()
        .map(|r| parsed_hit(sample_a, r, id_parser, false))
        .collect::<Result<_, _>>()?;
    let forward = top_n_by_distinct_subject_gene(forward, params.top_matches);

    // Reverse: b (query) vs a (subject), then relabeled so q=a, s=b.
    let reverse_raw = driver.search(fasta_b, fasta_a, params.evalue)?;
    let reverse: Vec<Hit> = reverse_raw
        .iter()
        .map(|r| parsed_hit(sample_a, r, id_parser, true))
        .collect::<Result<_, _>>()?;
    let reverse = top_n_by_distinct_subject_gene(reverse, params.top_matches);

    let forward_pairs: HashSet<(i64, i64)> = forward.iter().map(|h| (h.qgene, h.sgene)).collect();
    let reverse_pairs: HashSet<(i64, i64)> = reverse.iter().map(|h| (h.qgene, h.sgene)).collect();

    let mut combined: Vec<Hit> = forward
        .into_iter()
        .filter(|h| reverse_pairs.contains(&(h.qgene, h.sgene)))
        .collect();
    combined.extend(
        reverse
            .into_iter()
            .filter(|h| forward_pairs.contains(&(h.qgene, h.sgene))),
    );

    let combined = best_per_gene_pair(combined);
    let combined = best_per_query_gene(combined, params.keep_all);

    let mut table = GeneMatchTable::new(sample_a, sample_b);
    table.hits = combined;
    Ok(table)
}
