// Mock engine: sleeps in polled steps and returns canned results.
//
// This is the stand-in wired into the application until production engines
// exist. It honors the full capability contract - cooperative cancellation
// between steps, progress reports, deterministic outputs - so the execution
// core and the UI can be exercised end to end.

use crate::engine::{AnalysisReport, EngineError, OperationOutput, StegoEngine};
use crate::exec::{
    AnalyzeParams, CancelToken, EmbedParams, ExtractParams, NeutralizeParams, PayloadSource,
    ProgressSink,
};
use crate::validation::{self, ValidationError};
use async_trait::async_trait;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::time::Duration;
use tokio::time::sleep;

const DEFAULT_TECHNIQUES: &[&str] = &["chi_square", "histogram", "ela"];

/// Simulated engine with configurable duration and failure behavior.
#[derive(Clone, Debug)]
pub struct MockEngine {
    steps: u32,
    step_delay: Duration,
    fail_message: Option<String>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            steps: 8,
            step_delay: Duration::from_millis(150),
            fail_message: None,
        }
    }

    /// Engine that simulates work as `steps` polled sub-steps of `step_delay`
    /// each. The cancellation token is checked before every sub-step.
    pub fn with_timing(steps: u32, step_delay: Duration) -> Self {
        Self {
            steps: steps.max(1),
            step_delay,
            fail_message: None,
        }
    }

    /// Engine whose every capability fails with `message` after starting.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            steps: 1,
            step_delay: Duration::from_millis(10),
            fail_message: Some(message.into()),
        }
    }

    /// Total simulated duration of one operation.
    pub fn simulated_duration(&self) -> Duration {
        self.step_delay * self.steps
    }

    fn primary_input<'a>(&self, inputs: &'a [Utf8PathBuf]) -> Result<&'a Utf8Path, EngineError> {
        inputs
            .first()
            .map(Utf8PathBuf::as_path)
            .ok_or(EngineError::MissingInput)
    }

    /// The simulated work loop shared by all four capabilities.
    async fn simulate(
        &self,
        label: &str,
        subject: &Utf8Path,
        cancel: &CancelToken,
        progress: &ProgressSink,
    ) -> Result<(), EngineError> {
        if let Some(message) = &self.fail_message {
            progress.report_indeterminate(format!("{label} {subject}"));
            return Err(EngineError::Failed(message.clone()));
        }

        for step in 0..self.steps {
            cancel.bail_if_cancelled()?;
            let percent = (step * 100 / self.steps) as u8;
            progress.report(percent, format!("{label} {subject}"));
            sleep(self.step_delay).await;
        }
        cancel.bail_if_cancelled()?;
        progress.report(100, format!("{label} {subject}: finishing"));
        Ok(())
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StegoEngine for MockEngine {
    async fn estimate_capacity(&self, carrier: &Utf8Path) -> Result<u64, EngineError> {
        validation::estimate_capacity(carrier).map_err(|err| match err {
            ValidationError::Missing(path) => EngineError::CarrierNotFound(path),
            ValidationError::Unsupported(ext) => {
                EngineError::Failed(format!("unsupported carrier type: {ext}"))
            }
            ValidationError::Io(io) => EngineError::Io(io),
        })
    }

    async fn embed(
        &self,
        inputs: &[Utf8PathBuf],
        params: &EmbedParams,
        cancel: &CancelToken,
        progress: &ProgressSink,
    ) -> Result<OperationOutput, EngineError> {
        let carrier = self.primary_input(inputs)?;
        self.simulate("Embedding into", carrier, cancel, progress)
            .await?;

        let payload = match &params.payload {
            PayloadSource::Text(text) if !text.is_empty() => text.clone().into_bytes(),
            PayloadSource::File(path) if path.exists() => fs::read(path)?,
            _ => b"mock".to_vec(),
        };

        fs::create_dir_all(&params.output_dir)?;
        let extension = carrier.extension().unwrap_or("bin");
        let name = render_filename(&params.filename_template);
        let output = params.output_dir.join(format!("{name}.{extension}"));
        fs::write(&output, &payload)?;

        Ok(OperationOutput::Embedded { output })
    }

    async fn extract(
        &self,
        inputs: &[Utf8PathBuf],
        _params: &ExtractParams,
        cancel: &CancelToken,
        progress: &ProgressSink,
    ) -> Result<OperationOutput, EngineError> {
        let stego = self.primary_input(inputs)?;
        self.simulate("Extracting from", stego, cancel, progress)
            .await?;

        let payload = if stego.exists() {
            fs::read(stego)?
        } else {
            b"mock-payload".to_vec()
        };

        Ok(OperationOutput::Extracted { payload })
    }

    async fn analyze(
        &self,
        inputs: &[Utf8PathBuf],
        params: &AnalyzeParams,
        cancel: &CancelToken,
        progress: &ProgressSink,
    ) -> Result<OperationOutput, EngineError> {
        let file = self.primary_input(inputs)?;
        self.simulate("Scanning", file, cancel, progress).await?;

        // Deterministic pseudo-random report seeded from the file name, so
        // repeat scans of the same file agree.
        let name = file.file_name().unwrap_or("unknown");
        let risk_score = (5 + hash_of(name) % 91) as u8;

        let techniques: Vec<String> = match &params.techniques {
            Some(list) => list.clone(),
            None => DEFAULT_TECHNIQUES.iter().map(|t| t.to_string()).collect(),
        };
        let mut flags = IndexMap::new();
        for technique in techniques {
            let score = (hash_of(&format!("{name}/{technique}")) % 1000) as f64 / 1000.0;
            flags.insert(technique, score);
        }

        let file_size = fs::metadata(file).map(|m| m.len()).unwrap_or(0);

        Ok(OperationOutput::Analyzed(AnalysisReport {
            risk_score,
            flags,
            file_size,
        }))
    }

    async fn neutralize(
        &self,
        inputs: &[Utf8PathBuf],
        params: &NeutralizeParams,
        cancel: &CancelToken,
        progress: &ProgressSink,
    ) -> Result<OperationOutput, EngineError> {
        let file = self.primary_input(inputs)?;
        self.simulate("Sanitizing", file, cancel, progress).await?;

        let stem = file.file_stem().unwrap_or("output");
        let extension = file.extension().unwrap_or("bin");
        let file_name = format!("{stem}.neutralized.{}.{extension}", params.tier.as_str());

        let parent = params
            .output_dir
            .clone()
            .or_else(|| file.parent().map(Utf8Path::to_path_buf))
            .unwrap_or_else(|| Utf8PathBuf::from("."));
        fs::create_dir_all(&parent)?;
        let output = parent.join(file_name);

        if file.exists() {
            fs::copy(file, &output)?;
        } else {
            fs::write(&output, b"neutralized")?;
        }

        Ok(OperationOutput::Neutralized { output })
    }
}

fn hash_of(value: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

fn render_filename(template: &str) -> String {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S").to_string();
    let rendered = template.replace("{timestamp}", &stamp);
    if rendered.is_empty() {
        format!("stego_{stamp}")
    } else {
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::{KdfParams, NeutralizeTier, TaskEvent};
    use tokio::sync::mpsc;

    fn sink() -> (ProgressSink, mpsc::UnboundedReceiver<TaskEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ProgressSink::new(tx), rx)
    }

    fn quick_engine() -> MockEngine {
        MockEngine::with_timing(2, Duration::from_millis(5))
    }

    fn embed_params(output_dir: Utf8PathBuf) -> EmbedParams {
        EmbedParams {
            payload: PayloadSource::Text("secret".to_string()),
            password: None,
            encryption: true,
            kdf: KdfParams::default(),
            method: crate::exec::EmbedMethod::Adaptive,
            techniques: vec!["lsb_match".to_string()],
            output_dir,
            filename_template: "out_{timestamp}".to_string(),
        }
    }

    #[tokio::test]
    async fn test_embed_writes_payload_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out_dir = Utf8PathBuf::from_path_buf(dir.path().join("out")).unwrap();
        let (progress, _rx) = sink();

        let output = quick_engine()
            .embed(
                &[Utf8PathBuf::from("carrier.png")],
                &embed_params(out_dir.clone()),
                &CancelToken::new(),
                &progress,
            )
            .await
            .unwrap();

        match output {
            OperationOutput::Embedded { output } => {
                assert!(output.as_str().starts_with(out_dir.as_str()));
                assert_eq!(fs::read(&output).unwrap(), b"secret");
            }
            other => panic!("expected embedded output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_extract_returns_canned_payload_for_missing_file() {
        let (progress, _rx) = sink();
        let output = quick_engine()
            .extract(
                &[Utf8PathBuf::from("/no/such/stego.png")],
                &ExtractParams::default(),
                &CancelToken::new(),
                &progress,
            )
            .await
            .unwrap();

        match output {
            OperationOutput::Extracted { payload } => assert_eq!(payload, b"mock-payload"),
            other => panic!("expected extracted output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_analyze_is_deterministic_per_file_name() {
        let (progress, _rx) = sink();
        let engine = quick_engine();
        let token = CancelToken::new();
        let inputs = [Utf8PathBuf::from("suspect.jpg")];

        let first = engine
            .analyze(&inputs, &AnalyzeParams::default(), &token, &progress)
            .await
            .unwrap();
        let second = engine
            .analyze(&inputs, &AnalyzeParams::default(), &token, &progress)
            .await
            .unwrap();

        match (first, second) {
            (OperationOutput::Analyzed(a), OperationOutput::Analyzed(b)) => {
                assert_eq!(a.risk_score, b.risk_score);
                assert!((5..=95).contains(&a.risk_score));
                assert_eq!(a.flags.len(), DEFAULT_TECHNIQUES.len());
                assert_eq!(a.flags, b.flags);
            }
            other => panic!("expected analysis reports, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_neutralize_copies_next_to_input() {
        let dir = tempfile::tempdir().unwrap();
        let input = Utf8PathBuf::from_path_buf(dir.path().join("photo.png")).unwrap();
        fs::write(&input, b"pixels").unwrap();
        let (progress, _rx) = sink();

        let output = quick_engine()
            .neutralize(
                &[input],
                &NeutralizeParams {
                    tier: NeutralizeTier::Standard,
                    output_dir: None,
                },
                &CancelToken::new(),
                &progress,
            )
            .await
            .unwrap();

        match output {
            OperationOutput::Neutralized { output } => {
                assert!(output.as_str().contains("photo.neutralized.standard.png"));
                assert_eq!(fs::read(&output).unwrap(), b"pixels");
            }
            other => panic!("expected neutralized output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_first_step() {
        let (progress, _rx) = sink();
        let token = CancelToken::new();
        token.cancel();

        let result = MockEngine::new()
            .analyze(
                &[Utf8PathBuf::from("a.png")],
                &AnalyzeParams::default(),
                &token,
                &progress,
            )
            .await;

        assert!(matches!(result, Err(EngineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_failing_engine_reports_configured_message() {
        let (progress, _rx) = sink();
        let result = MockEngine::failing("simulated breakage")
            .analyze(
                &[Utf8PathBuf::from("a.png")],
                &AnalyzeParams::default(),
                &CancelToken::new(),
                &progress,
            )
            .await;

        match result {
            Err(EngineError::Failed(message)) => assert_eq!(message, "simulated breakage"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_simulated_duration() {
        let engine = MockEngine::with_timing(20, Duration::from_millis(100));
        assert_eq!(engine.simulated_duration(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_missing_input_is_rejected() {
        let (progress, _rx) = sink();
        let result = quick_engine()
            .analyze(&[], &AnalyzeParams::default(), &CancelToken::new(), &progress)
            .await;
        assert!(matches!(result, Err(EngineError::MissingInput)));
    }
}
