// Task descriptions submitted to the execution pool.
//
// A TaskSpec is an immutable value: operation kind, ordered input paths, and
// an operation-specific parameter bundle. View controllers build one at
// submission time; after that nothing mutates it.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// The four workbench operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Embed,
    Extract,
    Analyze,
    Neutralize,
}

impl OperationKind {
    pub fn label(&self) -> &'static str {
        match self {
            OperationKind::Embed => "embed",
            OperationKind::Extract => "extract",
            OperationKind::Analyze => "analyze",
            OperationKind::Neutralize => "neutralize",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Where the embed payload comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadSource {
    Text(String),
    File(Utf8PathBuf),
}

/// Argon2id key-derivation settings carried with embed requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KdfParams {
    pub memory_mib: u32,
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            memory_mib: 64,
            time_cost: 3,
            parallelism: 2,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbedMethod {
    Adaptive,
    Manual,
    Integrated,
}

impl EmbedMethod {
    pub fn from_index(index: usize) -> Self {
        match index {
            1 => EmbedMethod::Manual,
            2 => EmbedMethod::Integrated,
            _ => EmbedMethod::Adaptive,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EmbedParams {
    pub payload: PayloadSource,
    pub password: Option<String>,
    pub encryption: bool,
    pub kdf: KdfParams,
    pub method: EmbedMethod,
    pub techniques: Vec<String>,
    pub output_dir: Utf8PathBuf,
    pub filename_template: String,
}

#[derive(Clone, Debug, Default)]
pub struct ExtractParams {
    pub password: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct AnalyzeParams {
    /// Restrict the scan to a subset of techniques; `None` runs all of them.
    pub techniques: Option<Vec<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NeutralizeTier {
    Light,
    Standard,
    Aggressive,
}

impl NeutralizeTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            NeutralizeTier::Light => "light",
            NeutralizeTier::Standard => "standard",
            NeutralizeTier::Aggressive => "aggressive",
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            0 => NeutralizeTier::Light,
            2 => NeutralizeTier::Aggressive,
            _ => NeutralizeTier::Standard,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NeutralizeParams {
    pub tier: NeutralizeTier,
    /// Sanitized copies land next to the input when no directory is given.
    pub output_dir: Option<Utf8PathBuf>,
}

/// Operation-specific parameter bundle. The variant determines the operation
/// kind, so a spec can never carry mismatched parameters.
#[derive(Clone, Debug)]
pub enum TaskParams {
    Embed(EmbedParams),
    Extract(ExtractParams),
    Analyze(AnalyzeParams),
    Neutralize(NeutralizeParams),
}

impl TaskParams {
    pub fn operation(&self) -> OperationKind {
        match self {
            TaskParams::Embed(_) => OperationKind::Embed,
            TaskParams::Extract(_) => OperationKind::Extract,
            TaskParams::Analyze(_) => OperationKind::Analyze,
            TaskParams::Neutralize(_) => OperationKind::Neutralize,
        }
    }
}

/// One unit of background work: what to do and on which files.
#[derive(Clone, Debug)]
pub struct TaskSpec {
    inputs: Vec<Utf8PathBuf>,
    params: TaskParams,
}

impl TaskSpec {
    pub fn new(inputs: Vec<Utf8PathBuf>, params: TaskParams) -> Self {
        Self { inputs, params }
    }

    pub fn operation(&self) -> OperationKind {
        self.params.operation()
    }

    pub fn inputs(&self) -> &[Utf8PathBuf] {
        &self.inputs
    }

    pub fn params(&self) -> &TaskParams {
        &self.params
    }

    /// First input path, which every current operation treats as its subject.
    pub fn primary_input(&self) -> Option<&Utf8Path> {
        self.inputs.first().map(Utf8PathBuf::as_path)
    }
}
