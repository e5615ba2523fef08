//! Engine capability contract.
//!
//! One trait covers the four workbench capabilities (embed, extract, analyze,
//! neutralize). Implementations are selected at composition time - the
//! application currently wires in [`MockEngine`], and a production engine
//! replaces it without touching the execution core or the UI.
//!
//! Engines must be re-entrant: the execution pool will happily run several
//! instances of the same capability concurrently on different inputs. Each
//! capability receives the task's input paths, its typed parameters, the
//! [`CancelToken`](crate::exec::CancelToken) it must poll between sub-steps,
//! and a [`ProgressSink`](crate::exec::ProgressSink) for progress reports.

pub mod mock;

pub use mock::MockEngine;

use crate::exec::{
    AnalyzeParams, CancelToken, EmbedParams, ExtractParams, NeutralizeParams, ProgressSink,
};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use thiserror::Error;

/// Result of an analysis scan.
#[derive(Clone, Debug)]
pub struct AnalysisReport {
    /// Overall risk estimate, 0-100.
    pub risk_score: u8,
    /// Per-technique detector scores in [0, 1), in scan order.
    pub flags: IndexMap<String, f64>,
    pub file_size: u64,
}

/// Payload returned by a completed operation.
#[derive(Clone, Debug)]
pub enum OperationOutput {
    Embedded { output: Utf8PathBuf },
    Extracted { payload: Vec<u8> },
    Analyzed(AnalysisReport),
    Neutralized { output: Utf8PathBuf },
}

impl OperationOutput {
    /// File the operation produced, when there is one.
    pub fn target(&self) -> Option<&Utf8Path> {
        match self {
            OperationOutput::Embedded { output } | OperationOutput::Neutralized { output } => {
                Some(output.as_path())
            }
            OperationOutput::Extracted { .. } | OperationOutput::Analyzed(_) => None,
        }
    }

    pub fn risk_score(&self) -> Option<u8> {
        match self {
            OperationOutput::Analyzed(report) => Some(report.risk_score),
            _ => None,
        }
    }

    /// One-line summary for the status bar and history log.
    pub fn summary(&self) -> String {
        match self {
            OperationOutput::Embedded { output } => format!("Wrote {}", output),
            OperationOutput::Extracted { payload } => {
                format!("Extracted {} bytes", payload.len())
            }
            OperationOutput::Analyzed(report) => {
                format!("Risk score {}/100", report.risk_score)
            }
            OperationOutput::Neutralized { output } => format!("Sanitized copy at {}", output),
        }
    }
}

/// Errors an engine capability can report.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("operation cancelled")]
    Cancelled,

    #[error("carrier not found: {0}")]
    CarrierNotFound(Utf8PathBuf),

    #[error("no input file was provided")]
    MissingInput,

    #[error("{0}")]
    Failed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The steganography capability contract.
#[async_trait]
pub trait StegoEngine: Send + Sync {
    /// Conservative payload capacity estimate for a carrier, in bytes.
    async fn estimate_capacity(&self, carrier: &Utf8Path) -> Result<u64, EngineError>;

    async fn embed(
        &self,
        inputs: &[Utf8PathBuf],
        params: &EmbedParams,
        cancel: &CancelToken,
        progress: &ProgressSink,
    ) -> Result<OperationOutput, EngineError>;

    async fn extract(
        &self,
        inputs: &[Utf8PathBuf],
        params: &ExtractParams,
        cancel: &CancelToken,
        progress: &ProgressSink,
    ) -> Result<OperationOutput, EngineError>;

    async fn analyze(
        &self,
        inputs: &[Utf8PathBuf],
        params: &AnalyzeParams,
        cancel: &CancelToken,
        progress: &ProgressSink,
    ) -> Result<OperationOutput, EngineError>;

    async fn neutralize(
        &self,
        inputs: &[Utf8PathBuf],
        params: &NeutralizeParams,
        cancel: &CancelToken,
        progress: &ProgressSink,
    ) -> Result<OperationOutput, EngineError>;
}
