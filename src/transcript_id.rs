//! FASTA header parsing for transcript identity (§3, §6).
//!
//! Transcript identifiers are extracted by a user-supplied regex with (at
//! most) three named capture groups: `coverage`, `gene`, `isoform`. Fields
//! with no matching named group fall back to the next unclaimed positional
//! group, in that order — mirroring `transcripts.py`'s
//! `re_parse_transcript_id` in the original implementation.

use crate::error::EngineError;
use regex::Regex;

/// The parsed identity of one transcript, as described in §3.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscriptId {
    pub coverage: f64,
    pub gene: i64,
    pub isoform: i64,
}

const FIELDS: [&str; 3] = ["coverage", "gene", "isoform"];

/// Parses transcript identifiers out of FASTA headers using a single
/// compiled regex, resolving named-vs-positional capture groups once at
/// construction time so each header parse is a simple lookup.
#[derive(Debug, Clone)]
pub struct TranscriptIdParser {
    regex: Regex,
    // For each field in FIELDS, either a named group or a 1-based
    // positional group index to use instead.
    slots: [GroupSlot; 3],
}

#[derive(Debug, Clone, Copy)]
enum GroupSlot {
    Named,
    Positional(usize),
}

impl TranscriptIdParser {
    /// The default pattern used throughout the original tool:
    /// `cov_<float>_g<int>_i<int>`, with unnamed positional groups.
    pub fn default_pattern() -> &'static str {
        r"^.*cov_([0-9]+(?:\.[0-9]+)?)_g([0-9]+)_i([0-9]+)"
    }

    pub fn new(regex: Regex) -> Result<Self, EngineError> {
        let named: std::collections::HashSet<&str> = regex
            .capture_names()
            .flatten()
            .collect();

        // Positional group indices already claimed by a named group.
        let mut claimed: std::collections::HashSet<usize> = std::collections::HashSet::new();
        for name in regex.capture_names().flatten() {
            if let Some(idx) = group_index_for_name(&regex, name) {
                claimed.insert(idx);
            }
        }

        let mut next_positional = 1usize;
        let total_groups = regex.captures_len() - 1;
        let mut slots = [GroupSlot::Positional(0); 3];
        for (i, field) in FIELDS.iter().enumerate() {
            if named.contains(field) {
                slots[i] = GroupSlot::Named;
            } else {
                while claimed.contains(&next_positional) {
                    next_positional += 1;
                }
                if next_positional > total_groups {
                    return Err(EngineError::Config(format!(
                        "pattern {:?} has no group (named or positional) for field {:?}",
                        regex.as_str(),
                        field
                    )));
                }
                slots[i] = GroupSlot::Positional(next_positional);
                claimed.insert(next_positional);
                next_positional += 1;
            }
        }

        Ok(Self { regex, slots })
    }

    pub fn from_pattern(pattern: &str) -> Result<Self, EngineError> {
        let regex = Regex::new(pattern)
            .map_err(|e| EngineError::Config(format!("invalid transcript-id pattern: {e}")))?;
        Self::new(regex)
    }

    /// Parse one FASTA header (the sequence id, not including `>`).
    pub fn parse(&self, sample: &str, header: &str) -> Result<TranscriptId, EngineError> {
        let caps = self.regex.captures(header).ok_or_else(|| EngineError::InputParse {
            sample: sample.to_string(),
            header: header.to_string(),
            reason: "pattern did not match".to_string(),
        })?;

        let get = |field: &str, slot: GroupSlot| -> Result<String, EngineError> {
            let m = match slot {
                GroupSlot::Named => caps.name(field),
                GroupSlot::Positional(i) => caps.get(i),
            };
            m.map(|m| m.as_str().to_string()).ok_or_else(|| EngineError::InputParse {
                sample: sample.to_string(),
                header: header.to_string(),
                reason: format!("missing required field {field:?}"),
            })
        };

        let coverage_s = get("coverage", self.slots[0])?;
        let gene_s = get("gene", self.slots[1])?;
        let isoform_s = get("isoform", self.slots[2])?;

        let parse_f64 = |s: &str, field: &str| {
            s.parse::<f64>().map_err(|_| EngineError::InputParse {
                sample: sample.to_string(),
                header: header.to_string(),
                reason: format!("field {field:?} is not a number: {s:?}"),
            })
        };
        let parse_i64 = |s: &str, field: &str| {
            s.parse::<i64>().map_err(|_| EngineError::InputParse {
                sample: sample.to_string(),
                header: header.to_string(),
                reason: format!("field {field:?} is not an integer: {s:?}"),
            })
        };

        Ok(TranscriptId {
            coverage: parse_f64(&coverage_s, "coverage")?,
            gene: parse_i64(&gene_s, "gene")?,
            isoform: parse_i64(&isoform_s, "isoform")?,
        })
    }
}

/// Resolve the 1-based group index for a named group, since `regex` does
/// not expose this directly.
fn group_index_for_name(regex: &Regex, name: &str) -> Option<usize> {
    regex
        .capture_names()
        .enumerate()
        .find(|(_, n)| *n == Some(name))
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_default_pattern() {
        let parser = TranscriptIdParser::from_pattern(TranscriptIdParser::default_pattern()).unwrap();
        let id = parser.parse("s1", "TRINITY_cov_12.5_g3_i1").unwrap();
        assert_eq!(id.coverage, 12.5);
        assert_eq!(id.gene, 3);
        assert_eq!(id.isoform, 1);
    }

    #[test]
    fn named_groups_take_priority_over_position() {
        let parser = TranscriptIdParser::from_pattern(
            r"^.*g(?P<gene>[0-9]+)_i(?P<isoform>[0-9]+)_cov_(?P<coverage>[0-9.]+)$",
        )
        .unwrap();
        let id = parser.parse("s1", "seq_g7_i2_cov_3.0").unwrap();
        assert_eq!(id.gene, 7);
        assert_eq!(id.isoform, 2);
        assert_eq!(id.coverage, 3.0);
    }

    #[test]
    fn mixed_named_and_positional_skips_claimed_index() {
        // "gene" is named explicitly; coverage/isoform fall back to the
        // remaining positional groups in order (1 then 3, skipping 2).
        let parser = TranscriptIdParser::from_pattern(
            r"^.*_([0-9.]+)_g(?P<gene>[0-9]+)_([0-9]+)$",
        )
        .unwrap();
        let id = parser.parse("s1", "seq_9.5_g4_2").unwrap();
        assert_eq!(id.coverage, 9.5);
        assert_eq!(id.gene, 4);
        assert_eq!(id.isoform, 2);
    }

    #[test]
    fn pattern_missing_a_required_group_is_a_config_error() {
        // Only one capture group available, but three fields are required.
        let err = TranscriptIdParser::from_pattern(r"^.*g([0-9]+)$").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn non_matching_header_is_input_parse_error() {
        let parser = TranscriptIdParser::from_pattern(TranscriptIdParser::default_pattern()).unwrap();
        let err = parser.parse("s1", "not a valid header").unwrap_err();
        assert!(matches!(err, EngineError::InputParse { .. }));
    }
}
