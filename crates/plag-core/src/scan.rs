//! Scan artifacts in the upload directory
//!
//! A scan leaves two files behind: `scan_<id>.pdf`, the annotated copy of
//! the upload sealed with the master key, and `scan_<id>.json`, a short
//! summary for listings.

use crate::error::PlagError;
use crate::pipeline::PlagChecker;
use crate::report::SignedReport;
use chrono::{DateTime, Utc};
use plag_crypto::{decrypt_to_temp, encrypt_file_in_place};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, info, instrument, warn};

const SCAN_PREFIX: &str = "scan_";
const SCAN_ID_BYTES: usize = 8;

/// Listing entry written next to each sealed scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub scan_id: String,
    /// Name the upload was submitted under
    pub file: String,
    pub created_at: DateTime<Utc>,
    pub matching_sentences: usize,
    pub total_sentences: usize,
    pub plagiarism_percentage: f64,
}

/// Everything one scan produced
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub summary: ScanSummary,
    pub report: SignedReport,
    /// Sealed annotated PDF
    pub pdf_path: PathBuf,
}

/// A stored scan as found on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ScanEntry {
    pub scan_id: String,
    pub pdf_path: PathBuf,
    /// `None` when the summary is missing or unreadable
    pub summary: Option<ScanSummary>,
}

/// Runs scans and serves their artifacts from the configured upload directory
pub struct ScanStore<'a> {
    checker: &'a PlagChecker,
}

impl<'a> ScanStore<'a> {
    pub fn new(checker: &'a PlagChecker) -> Self {
        Self { checker }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.checker.config().upload_dir
    }

    fn pdf_path(&self, scan_id: &str) -> PathBuf {
        self.upload_dir()
            .join(format!("{}{}.pdf", SCAN_PREFIX, scan_id))
    }

    fn summary_path(&self, scan_id: &str) -> PathBuf {
        self.upload_dir()
            .join(format!("{}{}.json", SCAN_PREFIX, scan_id))
    }

    /// Analyze, sign, annotate and seal one upload.
    ///
    /// The upload itself is left in place. If any step before the summary
    /// fails, the annotated artifact is removed.
    #[instrument(skip_all, fields(upload = %upload_path.display()))]
    pub fn run_scan(
        &self,
        upload_path: &Path,
        original_name: &str,
    ) -> Result<ScanOutcome, PlagError> {
        std::fs::create_dir_all(self.upload_dir())?;

        let scan_id = new_scan_id();
        let pdf_path = self.pdf_path(&scan_id);

        let report = match self.seal(upload_path, &pdf_path) {
            Ok(report) => report,
            Err(e) => {
                discard(&pdf_path);
                return Err(e);
            }
        };

        let summary = ScanSummary {
            scan_id: scan_id.clone(),
            file: original_name.to_string(),
            created_at: Utc::now(),
            matching_sentences: report.report.matching_sentences,
            total_sentences: report.report.total_sentences,
            plagiarism_percentage: report.report.plagiarism_percentage,
        };
        if let Err(e) = self.write_summary(&summary) {
            warn!(scan_id = %scan_id, error = %e, "failed to write scan summary");
        }

        info!(scan_id = %scan_id, plagiarism = summary.plagiarism_percentage, "scan stored");
        Ok(ScanOutcome {
            summary,
            report,
            pdf_path,
        })
    }

    fn seal(&self, upload_path: &Path, pdf_path: &Path) -> Result<SignedReport, PlagError> {
        let report = self.checker.analyze_and_sign(upload_path, Some(pdf_path))?;
        encrypt_file_in_place(self.checker.keys(), pdf_path)?;
        Ok(report)
    }

    fn write_summary(&self, summary: &ScanSummary) -> Result<(), PlagError> {
        let json = serde_json::to_vec_pretty(summary)?;
        std::fs::write(self.summary_path(&summary.scan_id), json)?;
        Ok(())
    }

    /// Stored scans ordered by file name
    pub fn list_scans(&self) -> Result<Vec<ScanEntry>, PlagError> {
        let entries = match std::fs::read_dir(self.upload_dir()) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut scans = Vec::new();
        for entry in entries {
            let pdf_path = entry?.path();
            let Some(scan_id) = scan_id_of(&pdf_path) else {
                continue;
            };
            let summary = self.read_summary(&scan_id);
            scans.push(ScanEntry {
                scan_id,
                pdf_path,
                summary,
            });
        }
        scans.sort_by(|a, b| a.pdf_path.cmp(&b.pdf_path));
        Ok(scans)
    }

    fn read_summary(&self, scan_id: &str) -> Option<ScanSummary> {
        let path = self.summary_path(scan_id);
        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(summary) => Some(summary),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "ignoring unreadable summary");
                None
            }
        }
    }

    /// Decrypt a stored scan into a temp file owned by the caller
    pub fn open_scan_pdf(&self, scan_id: &str) -> Result<TempPath, PlagError> {
        if !is_scan_id(scan_id) {
            return Err(PlagError::ScanNotFound(scan_id.to_string()));
        }
        let path = self.pdf_path(scan_id);
        if !path.is_file() {
            return Err(PlagError::ScanNotFound(scan_id.to_string()));
        }
        Ok(decrypt_to_temp(self.checker.keys(), &path)?)
    }
}

fn new_scan_id() -> String {
    let mut bytes = [0u8; SCAN_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_scan_id(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

fn scan_id_of(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let id = name.strip_prefix(SCAN_PREFIX)?.strip_suffix(".pdf")?;
    is_scan_id(id).then(|| id.to_string())
}

fn discard(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed partial scan artifact"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "failed to remove partial scan artifact"),
    }
}
