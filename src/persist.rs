//! Persistent artifacts (§6): reduced FASTAs, per-pair `GeneMatchTable`s,
//! the gene-matches graph blob, and distance-matrix emission.
//!
//! Grounded on the teacher's own plain-text vs. binary dual encodings for
//! mapping tables (`paf.rs` for text, `compact_mapping.rs` for a packed
//! binary form): this crate stores `GeneMatchTable`s as TSV (`.tsv`) or via
//! `bincode` (`.bin`), auto-dispatching readers on extension, and persists
//! the gene-matches graph and writes matrices via the same
//! atomic-temp-file-then-rename discipline the teacher uses for its own
//! output files (§5 cancellation: a cancelled pair leaves no partial file).

use crate::error::EngineError;
use crate::graph::GeneMatchesGraph;
use crate::hit::{GeneMatchTable, Hit, Strand};
use crate::sample_registry::SampleRegistry;
use crate::similarity::DistanceMatrix;
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Content-addressed filename stem for an unordered sample pair: the two
/// sample names sorted lexicographically and joined, so the path is
/// independent of dispatch order (§4.D, §9 "Pairs-as-keys").
pub fn pair_path_stem(sample_a: &str, sample_b: &str) -> String {
    let (a, b) = if sample_a <= sample_b {
        (sample_a, sample_b)
    } else {
        (sample_b, sample_a)
    };
    format!("{a}__{b}")
}

/// Write `bytes` to `path` via a temp file in the same directory followed
/// by a rename, so a cancelled or crashed write never leaves a partial
/// file at `path` (§5 cancellation semantics).
fn atomic_write(path: &Path, write: impl FnOnce(&mut dyn Write) -> std::io::Result<()>) -> Result<(), EngineError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| EngineError::io(dir, e))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| EngineError::io(dir, e))?;
    {
        let mut w = BufWriter::new(tmp.as_file_mut());
        write(&mut w).map_err(|e| EngineError::io(path, e))?;
        w.flush().map_err(|e| EngineError::io(path, e))?;
    }
    tmp.persist(path)
        .map_err(|e| EngineError::io(path, e.error))?;
    Ok(())
}

/// TSV column order for a persisted `GeneMatchTable`'s data rows. The pair
/// identity (`sample_a`/`sample_b`) is not a data-row column: it is written
/// once as a pair of metadata lines ahead of the header, so it survives a
/// round trip even for a table with zero hits (§4.C: empty output is not an
/// error, and scenario 6 exercises exactly this case end-to-end).
const TSV_HEADER: &str = "qseqid\tsseqid\tqgene\tqiso\tsgene\tsiso\tlength\tgaps\tnident\tbitscore\tsstrand";

pub fn write_gene_match_table(path: &Path, table: &GeneMatchTable) -> Result<(), EngineError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => atomic_write(path, |w| {
            let bytes = bincode::serde::encode_to_vec(table, bincode::config::standard())
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            w.write_all(&bytes)
        }),
        _ => atomic_write(path, |w| {
            writeln!(w, "#sample_a\t{}", table.sample_a)?;
            writeln!(w, "#sample_b\t{}", table.sample_b)?;
            writeln!(w, "{TSV_HEADER}")?;
            for h in &table.hits {
                writeln!(
                    w,
                    "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                    h.qseqid,
                    h.sseqid,
                    h.qgene,
                    h.qiso,
                    h.sgene,
                    h.siso,
                    h.length,
                    h.gaps,
                    h.nident,
                    h.bitscore,
                    h.sstrand.map(|s| s.as_str()).unwrap_or("")
                )?;
            }
            Ok(())
        }),
    }
}

pub fn read_gene_match_table(path: &Path) -> Result<GeneMatchTable, EngineError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("bin") => {
            let bytes = std::fs::read(path).map_err(|e| EngineError::io(path, e))?;
            let (table, _): (GeneMatchTable, usize) =
                bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                    .map_err(|e| EngineError::serialization(path, e.to_string()))?;
            Ok(table)
        }
        _ => read_tsv(path),
    }
}

/// Read one `#field\t<value>` metadata line, failing if it is missing or
/// doesn't carry the expected field name.
fn read_meta_line(line: Option<&str>, path: &Path, field: &str) -> Result<String, EngineError> {
    let prefix = format!("#{field}\t");
    line.and_then(|l| l.strip_prefix(prefix.as_str()))
        .map(|s| s.to_string())
        .ok_or_else(|| {
            EngineError::serialization(path, format!("missing or malformed {field:?} metadata line"))
        })
}

fn read_tsv(path: &Path) -> Result<GeneMatchTable, EngineError> {
    let content = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    let mut lines = content.lines();

    let sample_a = read_meta_line(lines.next(), path, "sample_a")?;
    let sample_b = read_meta_line(lines.next(), path, "sample_b")?;
    lines.next(); // column header

    let mut table = GeneMatchTable::new(sample_a, sample_b);
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let f: Vec<&str> = line.split('\t').collect();
        if f.len() != 11 {
            return Err(EngineError::serialization(
                path,
                format!("expected 11 TSV columns, got {}", f.len()),
            ));
        }
        let parse = |s: &str, what: &str| {
            s.parse().map_err(|_| EngineError::serialization(path, format!("bad {what} field {s:?}")))
        };
        table.hits.push(Hit {
            qseqid: f[0].to_string(),
            sseqid: f[1].to_string(),
            qgene: parse(f[2], "qgene")?,
            qiso: parse(f[3], "qiso")?,
            sgene: parse(f[4], "sgene")?,
            siso: parse(f[5], "siso")?,
            length: parse(f[6], "length")?,
            gaps: parse(f[7], "gaps")?,
            nident: parse(f[8], "nident")?,
            bitscore: parse(f[9], "bitscore")?,
            sstrand: Strand::parse(f[10]),
        });
    }
    Ok(table)
}

/// Serialized form of the gene-matches graph blob (§6): vertices named by
/// sample string rather than registry id, so the blob is self-contained
/// and independent of any particular in-process `SampleRegistry`.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedGraph {
    vertices: Vec<(String, i64)>,
    edges: Vec<(u32, u32)>,
}

pub fn write_graph(path: &Path, graph: &GeneMatchesGraph, registry: &SampleRegistry) -> Result<(), EngineError> {
    let vertices: Vec<(String, i64)> = graph
        .nodes()
        .map(|(sid, gene)| (registry.name(sid).to_string(), gene))
        .collect();
    let index: std::collections::HashMap<(u32, i64), u32> = graph
        .nodes()
        .enumerate()
        .map(|(i, v)| (v, i as u32))
        .collect();
    let mut edges = Vec::new();
    for a in graph.nodes() {
        for b in graph.neighbors(a) {
            let (ia, ib) = (index[&a], index[&b]);
            if ia < ib {
                edges.push((ia, ib));
            }
        }
    }
    let persisted = PersistedGraph { vertices, edges };

    atomic_write(path, |w| {
        let bytes = bincode::serde::encode_to_vec(&persisted, bincode::config::standard())
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        w.write_all(&bytes)
    })
}

/// Regenerate a graph plus its sample registry from a persisted blob
/// (§9 "Graph ownership": the owning graph is serialized; views such as
/// ideal components are regenerated on load, never persisted themselves).
pub fn read_graph(path: &Path) -> Result<(GeneMatchesGraph, SampleRegistry), EngineError> {
    let bytes = std::fs::read(path).map_err(|e| EngineError::io(path, e))?;
    let (persisted, _): (PersistedGraph, usize) =
        bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
            .map_err(|e| EngineError::serialization(path, e.to_string()))?;

    let mut registry = SampleRegistry::new();
    let mut ids = Vec::with_capacity(persisted.vertices.len());
    for (name, _) in &persisted.vertices {
        ids.push(registry.get_or_insert(name));
    }

    let mut graph = GeneMatchesGraph::new();
    for &(ia, ib) in &persisted.edges {
        let (sa, ga) = &persisted.vertices[ia as usize];
        let (sb, gb) = &persisted.vertices[ib as usize];
        let mut table = GeneMatchTable::new(sa.clone(), sb.clone());
        table.hits.push(Hit {
            qseqid: String::new(),
            sseqid: String::new(),
            qgene: *ga,
            qiso: 0,
            sgene: *gb,
            siso: 0,
            length: 0,
            gaps: 0,
            nident: 0,
            bitscore: 0.0,
            sstrand: None,
        });
        graph.ingest(&mut registry, &table);
    }
    // Vertices with no incident edge are never touched by `ingest` above
    // (§3: "vertices with no incident edge may exist"); restore them
    // explicitly so a round trip preserves isolated vertices too.
    for (&id, (_, gene)) in ids.iter().zip(persisted.vertices.iter()) {
        graph.ensure_vertex((id, *gene));
    }
    Ok((graph, registry))
}

/// Output format for the final distance matrix (§4.H `--format`, §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixFormat {
    Whitespace,
    Tsv,
    Csv,
}

impl MatrixFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "whitespace" => Some(MatrixFormat::Whitespace),
            "tsv" => Some(MatrixFormat::Tsv),
            "csv" => Some(MatrixFormat::Csv),
            _ => None,
        }
    }
}

pub fn write_matrix(path: &Path, matrix: &DistanceMatrix, format: MatrixFormat, dissimilarity: bool) -> Result<(), EngineError> {
    let values = if dissimilarity {
        &matrix.dissimilarity
    } else {
        &matrix.similarity
    };
    match format {
        MatrixFormat::Whitespace => atomic_write(path, |w| {
            for row in values {
                let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                writeln!(w, "{}", line.join(" "))?;
            }
            Ok(())
        }),
        MatrixFormat::Tsv => atomic_write(path, |w| {
            writeln!(w, "\t{}", matrix.samples.join("\t"))?;
            for (label, row) in matrix.samples.iter().zip(values) {
                let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                writeln!(w, "{label}\t{}", line.join("\t"))?;
            }
            Ok(())
        }),
        MatrixFormat::Csv => {
            // csv::Writer needs a concrete writer; build into an in-memory
            // buffer first, then persist it through the same atomic path
            // as the other formats.
            let mut buf = Vec::new();
            {
                let mut wtr = csv::Writer::from_writer(&mut buf);
                let mut header = vec![String::new()];
                header.extend(matrix.samples.iter().cloned());
                wtr.write_record(&header)
                    .map_err(|e| EngineError::serialization(path, e.to_string()))?;
                for (label, row) in matrix.samples.iter().zip(values) {
                    let mut record = vec![label.clone()];
                    record.extend(row.iter().map(|v| v.to_string()));
                    wtr.write_record(&record)
                        .map_err(|e| EngineError::serialization(path, e.to_string()))?;
                }
                wtr.flush().map_err(|e| EngineError::io(path, e))?;
            }
            atomic_write(path, |w| w.write_all(&buf))
        }
    }
}
