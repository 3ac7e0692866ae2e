//! Minimal gzip-aware FASTA reading and writing on top of `bio::io::fasta`.
//!
//! The teacher has no FASTA-sequence IO of its own (it consumes tabular
//! alignment output); this module is grounded in `bgruening-nextclade`'s
//! `bio` dependency, the pack's only bioinformatics-sequence-IO crate.

use crate::error::EngineError;
use bio::io::fasta;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// One FASTA record: header id plus raw sequence bytes.
#[derive(Debug, Clone)]
pub struct Transcript {
    pub id: String,
    pub seq: Vec<u8>,
}

fn open_maybe_gz(path: &Path) -> Result<Box<dyn Read>, EngineError> {
    let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    let is_gz = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("gz"))
        .unwrap_or(false);
    if is_gz {
        Ok(Box::new(flate2::read::MultiGzDecoder::new(file)))
    } else {
        Ok(Box::new(file))
    }
}

/// Read every transcript record from a FASTA file, auto-detecting `.gz`.
pub fn read_transcripts(path: &Path) -> Result<Vec<Transcript>, EngineError> {
    let reader = fasta::Reader::new(BufReader::new(open_maybe_gz(path)?));
    let mut out = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            EngineError::serialization(path, format!("malformed FASTA record: {e}"))
        })?;
        out.push(Transcript {
            id: record.id().to_string(),
            seq: record.seq().to_vec(),
        });
    }
    Ok(out)
}

/// Write transcripts to a FASTA file, preserving the given order.
pub fn write_transcripts<'a, I>(path: &Path, transcripts: I) -> Result<(), EngineError>
where
    I: IntoIterator<Item = &'a Transcript>,
{
    let file = File::create(path).map_err(|e| EngineError::io(path, e))?;
    let mut writer = fasta::Writer::new(BufWriter::new(file));
    for t in transcripts {
        writer
            .write(&t.id, None, &t.seq)
            .map_err(|e| EngineError::io(path, e))?;
    }
    writer.flush().map_err(|e| EngineError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn round_trips_a_small_fasta() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.fasta");
        {
            let mut f = File::create(&path).unwrap();
            writeln!(f, ">s1_cov_10.0_g1_i1\nACGT\n>s1_cov_5.0_g2_i1\nTTTT").unwrap();
        }
        let transcripts = read_transcripts(&path).unwrap();
        assert_eq!(transcripts.len(), 2);
        assert_eq!(transcripts[0].id, "s1_cov_10.0_g1_i1");
        assert_eq!(transcripts[0].seq, b"ACGT");

        let out_path = dir.path().join("out.fasta");
        write_transcripts(&out_path, transcripts.iter()).unwrap();
        let roundtripped = read_transcripts(&out_path).unwrap();
        assert_eq!(roundtripped.len(), 2);
        assert_eq!(roundtripped[1].seq, b"TTTT");
    }

    #[test]
    fn reads_gzipped_fasta() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.fasta.gz");
        {
            let file = File::create(&path).unwrap();
            let mut enc = GzEncoder::new(file, Compression::default());
            enc.write_all(b">s1_cov_1.0_g1_i1\nACGT\n").unwrap();
            enc.finish().unwrap();
        }
        let transcripts = read_transcripts(&path).unwrap();
        assert_eq!(transcripts.len(), 1);
        assert_eq!(transcripts[0].seq, b"ACGT");
    }
}
