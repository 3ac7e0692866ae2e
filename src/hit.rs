//! The `Hit` and `GeneMatchTable` types from the data model (§3).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Strand {
    Plus,
    Minus,
}

impl Strand {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plus" | "+" => Some(Strand::Plus),
            "minus" | "-" => Some(Strand::Minus),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Plus => "plus",
            Strand::Minus => "minus",
        }
    }
}

/// One row of an alignment result (§3). Invariants: all integer counts are
/// non-negative, `length >= gaps + nident`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hit {
    pub qseqid: String,
    pub sseqid: String,
    pub qgene: i64,
    pub qiso: i64,
    pub sgene: i64,
    pub siso: i64,
    pub length: u64,
    pub gaps: u64,
    pub nident: u64,
    pub bitscore: f64,
    pub sstrand: Option<Strand>,
}

impl Hit {
    pub fn is_valid(&self) -> bool {
        self.gaps + self.nident <= self.length
    }
}

/// A set of Hits for one unordered pair of samples, plus the two sample
/// identifiers. The "q"/"s" role of a row is whichever direction produced
/// it; `sample_a`/`sample_b` name the pair itself, not a row's direction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneMatchTable {
    pub sample_a: String,
    pub sample_b: String,
    pub hits: Vec<Hit>,
}

impl GeneMatchTable {
    pub fn new(sample_a: impl Into<String>, sample_b: impl Into<String>) -> Self {
        Self {
            sample_a: sample_a.into(),
            sample_b: sample_b.into(),
            hits: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(length: u64, gaps: u64, nident: u64) -> Hit {
        Hit {
            qseqid: String::new(),
            sseqid: String::new(),
            qgene: 1,
            qiso: 1,
            sgene: 1,
            siso: 1,
            length,
            gaps,
            nident,
            bitscore: 0.0,
            sstrand: None,
        }
    }

    /// §8: for all hits, `gaps + nident <= length`.
    #[test]
    fn is_valid_holds_when_gaps_plus_nident_fits_in_length() {
        assert!(hit(100, 1, 98).is_valid());
        assert!(hit(100, 0, 100).is_valid());
    }

    #[test]
    fn is_valid_fails_when_gaps_plus_nident_exceeds_length() {
        assert!(!hit(100, 1, 100).is_valid());
    }

    #[test]
    fn strand_parse_round_trips_through_as_str() {
        assert_eq!(Strand::parse(Strand::Plus.as_str()), Some(Strand::Plus));
        assert_eq!(Strand::parse(Strand::Minus.as_str()), Some(Strand::Minus));
        assert_eq!(Strand::parse("sideways"), None);
    }
}
