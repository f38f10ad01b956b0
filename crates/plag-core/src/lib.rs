//! Plagiarism checking for PDF documents
//!
//! A submitted PDF is compared against a directory of reference PDFs by word
//! n-gram overlap. The result is a [`Report`] signed with the host's Ed25519
//! key, optionally with a highlighted copy of the submission that is sealed
//! at rest by [`ScanStore`].
//!
//! ```ignore
//! use plag_core::{PlagChecker, PlagConfig};
//!
//! let checker = PlagChecker::new(PlagConfig::from_env()?);
//! let signed = checker.analyze_and_sign("essay.pdf".as_ref(), None)?;
//! plag_core::verify_report(&signed)?;
//! ```

pub mod analyzer;
pub mod annotate;
pub mod config;
pub mod corpus;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod scan;
pub mod signer;
pub mod similarity;

pub use analyzer::{Analysis, AnalysisOptions, Analyzer};
pub use annotate::AnnotationRenderer;
pub use config::PlagConfig;
pub use corpus::CorpusSnapshot;
pub use error::{ErrorKind, PlagError};
pub use pipeline::{analyze_and_sign, analyze_file, annotate_pdf, PlagChecker};
pub use report::{MatchResult, Report, SignedReport};
pub use scan::{ScanEntry, ScanOutcome, ScanStore, ScanSummary};
pub use signer::{verify_json, verify_report, ReportSigner};
pub use similarity::{jaccard, NgramSet};
