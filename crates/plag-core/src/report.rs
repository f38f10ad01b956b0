//! Report model and canonical serialization
//!
//! The canonical form is the exact byte string a signature covers: the JSON
//! object with keys sorted lexicographically at every level and no
//! insignificant whitespace. Signer and verifier share [`canonical_json`].

use crate::error::PlagError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Similarity against one corpus document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub corpus_path: String,
    /// Jaccard score rounded to 4 decimals
    pub score: f64,
}

/// Result of analyzing one document against the corpus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub file: String,
    /// Hex SHA-256 of the extracted text
    pub sha256: String,
    pub word_count: usize,
    pub unique_words: usize,
    pub matches: Vec<MatchResult>,
    pub similarity_percent: f64,
    pub matching_ngram_count: usize,
    pub plagiarism_percentage: f64,
    pub total_sentences: usize,
    pub matching_sentences: usize,
    pub non_matching_sentences: usize,
}

impl Report {
    /// Bytes covered by the report signature
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, PlagError> {
        let value = serde_json::to_value(self)?;
        Ok(canonical_json(&value).into_bytes())
    }
}

/// A report with its detached signature and signer public key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedReport {
    #[serde(flatten)]
    pub report: Report,
    /// Lower-case hex of the 64-byte Ed25519 signature
    pub signature: String,
    /// PEM-encoded SubjectPublicKeyInfo
    pub public_key: String,
}

/// Compact JSON with object keys sorted at every level.
///
/// Keys are sorted here rather than relying on `serde_json::Map` ordering,
/// which becomes insertion order when any crate in the build enables
/// serde_json's `preserve_order` feature.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(key, out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}

fn write_string(s: &str, out: &mut String) {
    // Display of a JSON string value is its escaped, quoted form
    out.push_str(&Value::String(s.to_string()).to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn sample_report() -> Report {
        Report {
            file: "uploads/essay.pdf".to_string(),
            sha256: "ab".repeat(32),
            word_count: 9,
            unique_words: 9,
            matches: vec![MatchResult {
                corpus_path: "corpus/source.pdf".to_string(),
                score: 0.5714,
            }],
            similarity_percent: 57.14,
            matching_ngram_count: 5,
            plagiarism_percentage: 71.43,
            total_sentences: 1,
            matching_sentences: 1,
            non_matching_sentences: 0,
        }
    }

    #[test]
    fn test_camel_case_keys() {
        let value = serde_json::to_value(sample_report()).unwrap();
        let obj = value.as_object().unwrap();
        for key in [
            "file",
            "sha256",
            "wordCount",
            "uniqueWords",
            "matches",
            "similarityPercent",
            "matchingNgramCount",
            "plagiarismPercentage",
            "totalSentences",
            "matchingSentences",
            "nonMatchingSentences",
        ] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert!(value["matches"][0].get("corpusPath").is_some());
    }

    #[test]
    fn test_canonical_sorts_nested_keys() {
        let value = json!({"b": 1, "a": {"z": [3, {"y": true, "x": null}], "c": "q\"uote"}});
        assert_eq!(
            canonical_json(&value),
            r#"{"a":{"c":"q\"uote","z":[3,{"x":null,"y":true}]},"b":1}"#
        );
    }

    #[test]
    fn test_canonical_report_is_stable() {
        let report = sample_report();
        let bytes = report.canonical_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(text.starts_with(
            r#"{"file":"uploads/essay.pdf","matches":[{"corpusPath":"corpus/source.pdf","score":0.5714}],"matchingNgramCount":5,"#
        ));
        assert!(!text.contains(' '));

        // Through a JSON round trip the canonical form is unchanged
        let reparsed: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(canonical_json(&reparsed).into_bytes(), bytes);
    }

    #[test]
    fn test_signed_report_flattens_fields() {
        let signed = SignedReport {
            report: sample_report(),
            signature: "00".repeat(64),
            public_key: "-----BEGIN PUBLIC KEY-----\n...".to_string(),
        };
        let value = serde_json::to_value(&signed).unwrap();
        assert_eq!(value["wordCount"], json!(9));
        assert_eq!(value["signature"], json!("00".repeat(64)));
        assert!(value.get("report").is_none());

        let back: SignedReport = serde_json::from_value(value).unwrap();
        assert_eq!(back, signed);
    }
}
