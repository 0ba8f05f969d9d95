//! The regeneration loop.
//!
//! One request runs attempts strictly in sequence:
//!
//! ```text
//! Pending -> Generating -> Evaluating -> Gating -> decide()
//!                 ^                                  |
//!                 +------------ Retry <--------------+
//! ```
//!
//! `decide()` from `brandgate-core` owns the policy; this module only drives
//! collaborators and moves between states. Nothing outside the controller is
//! mutated until the loop terminates.

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use brandgate_core::{
    build_prompt, decide, AttemptPhase, AttemptRecord, BrandSafetyConfig, BrandVoice, Candidate,
    Decision, GenerationOutcome, GenerationRequest, GenerationUsage, ParseDefaults, Prompt,
    QualityVerdict,
};

use crate::cancel::CancelSignal;
use crate::compliance::{ComplianceGate, ComplianceLinter, GateResult, LinterError};
use crate::config::PipelineConfig;
use crate::evaluator::{BrandScorer, QualityEvaluator, ScorerError};
use crate::generator::{GeneratedCandidate, Generator, GeneratorAdapter, GeneratorError};
use crate::usage::RequestUsage;

/// Terminal failures that produce no outcome.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    #[error(transparent)]
    Scorer(#[from] ScorerError),

    #[error(transparent)]
    Linter(#[from] LinterError),

    #[error("Failed to load safety configuration: {0}")]
    SafetyConfig(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl GenerationError {
    /// Whether another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Generator(e) => e.is_transient(),
            GenerationError::Scorer(_) | GenerationError::Linter(_) => true,
            GenerationError::SafetyConfig(_) | GenerationError::Cancelled => false,
        }
    }
}

/// Everything the loop produced for one request.
#[derive(Debug)]
pub struct ControllerReport {
    pub result: Result<GenerationOutcome, GenerationError>,
    pub attempts_used: u32,
    pub duration: Duration,
    pub usage: RequestUsage,
    pub warnings: Vec<String>,
}

enum LoopState {
    Pending,
    Generating {
        attempt: u32,
    },
    Evaluating {
        attempt: u32,
        generated: GeneratedCandidate,
    },
    Gating {
        attempt: u32,
        candidate: Candidate,
        usage: GenerationUsage,
        quality: QualityVerdict,
    },
    Done(Result<GenerationOutcome, GenerationError>),
}

impl LoopState {
    fn phase(&self) -> AttemptPhase {
        match self {
            LoopState::Pending => AttemptPhase::Pending,
            LoopState::Generating { .. } => AttemptPhase::Generating,
            LoopState::Evaluating { .. } => AttemptPhase::Evaluating,
            LoopState::Gating { .. } => AttemptPhase::Gating,
            LoopState::Done(Ok(outcome)) => match outcome {
                GenerationOutcome::Accepted { .. } => AttemptPhase::Accepted,
                GenerationOutcome::NeedsReview { .. } => AttemptPhase::NeedsReview,
                GenerationOutcome::Blocked { .. } => AttemptPhase::Blocked,
                GenerationOutcome::Exhausted { .. } => AttemptPhase::Exhausted,
            },
            LoopState::Done(Err(_)) => AttemptPhase::Failed,
        }
    }
}

/// Per-request inputs fixed for every attempt.
struct AttemptInputs<'a> {
    prompt: Prompt,
    defaults: ParseDefaults,
    voice: BrandVoice,
    safety: &'a BrandSafetyConfig,
}

/// Drives generate, evaluate and gate under a bounded attempt budget.
pub struct RegenerationController {
    adapter: GeneratorAdapter,
    evaluator: QualityEvaluator,
    gate: ComplianceGate,
    max_attempts: u32,
}

impl RegenerationController {
    pub fn new(
        generator: Arc<dyn Generator>,
        scorer: Arc<dyn BrandScorer>,
        linter: Arc<dyn ComplianceLinter>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            adapter: GeneratorAdapter::new(generator, config.attempt_timeout),
            evaluator: QualityEvaluator::new(scorer),
            gate: ComplianceGate::new(linter),
            max_attempts: config.max_attempts.max(1),
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run the loop to a terminal state.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        safety: &BrandSafetyConfig,
        cancel: &CancelSignal,
    ) -> ControllerReport {
        let started = Instant::now();
        let inputs = AttemptInputs {
            prompt: build_prompt(request, safety),
            defaults: ParseDefaults::from_input(&request.input),
            voice: BrandVoice::from_request(request),
            safety,
        };

        let mut usage = RequestUsage::default();
        let mut warnings = Vec::new();
        let mut attempts_used = 0;
        let mut last_record: Option<AttemptRecord> = None;
        let mut state = LoopState::Pending;

        let result = loop {
            state = match state {
                LoopState::Pending => LoopState::Generating { attempt: 1 },

                LoopState::Generating { .. } if cancel.is_cancelled() => {
                    LoopState::Done(Err(GenerationError::Cancelled))
                }

                LoopState::Generating { attempt } => {
                    attempts_used = attempt;
                    tracing::debug!(brand_id = %request.brand_id, attempt, "Generating candidate");

                    match cancel.run(self.adapter.produce(&inputs.prompt, &inputs.defaults)).await {
                        None => LoopState::Done(Err(GenerationError::Cancelled)),
                        Some(Ok(generated)) => {
                            usage.record_call(Some(&generated.usage));
                            LoopState::Evaluating { attempt, generated }
                        }
                        Some(Err(e)) => {
                            usage.record_call(e.usage());
                            self.after_failure(attempt, e.into(), &last_record, &mut warnings)
                        }
                    }
                }

                LoopState::Evaluating { attempt, generated } => {
                    match cancel
                        .run(self.evaluator.evaluate(&generated.candidate, &inputs.voice))
                        .await
                    {
                        None => LoopState::Done(Err(GenerationError::Cancelled)),
                        Some(Ok(quality)) => LoopState::Gating {
                            attempt,
                            candidate: generated.candidate,
                            usage: generated.usage,
                            quality,
                        },
                        Some(Err(e)) => {
                            self.after_failure(attempt, e.into(), &last_record, &mut warnings)
                        }
                    }
                }

                LoopState::Gating {
                    attempt,
                    candidate,
                    usage: call_usage,
                    quality,
                } => {
                    match cancel
                        .run(self.gate.check(candidate.clone(), inputs.safety))
                        .await
                    {
                        None => LoopState::Done(Err(GenerationError::Cancelled)),
                        Some(Err(e)) => {
                            self.after_failure(attempt, e.into(), &last_record, &mut warnings)
                        }
                        Some(Ok(gated)) => {
                            let (candidate, compliance) = match gated {
                                GateResult::Blocked(compliance) => (candidate, compliance),
                                GateResult::Cleared {
                                    candidate,
                                    compliance,
                                    warning,
                                } => {
                                    warnings.extend(warning);
                                    (candidate, compliance)
                                }
                            };

                            let record = AttemptRecord {
                                attempt,
                                candidate,
                                quality,
                                compliance,
                                usage: call_usage,
                            };
                            self.apply_decision(record, &mut last_record)
                        }
                    }
                }

                LoopState::Done(result) => break result,
            };

            let phase = state.phase();
            tracing::debug!(
                attempt = attempts_used,
                phase = %phase,
                terminal = phase.is_terminal(),
                "Loop transition"
            );
        };

        ControllerReport {
            result,
            attempts_used,
            duration: started.elapsed(),
            usage,
            warnings,
        }
    }

    fn apply_decision(
        &self,
        record: AttemptRecord,
        last_record: &mut Option<AttemptRecord>,
    ) -> LoopState {
        let remaining = self.max_attempts.saturating_sub(record.attempt);
        let decision = decide(&record.quality, &record.compliance, remaining);

        tracing::debug!(
            attempt = record.attempt,
            score = record.quality.score,
            quality_passed = record.quality.passed,
            compliance_passed = record.compliance.passed,
            fixes = record.compliance.fixes_applied.len(),
            decision = ?decision,
            "Attempt decided"
        );

        match decision {
            Decision::Block => LoopState::Done(Ok(GenerationOutcome::blocked(record))),
            Decision::Accept => LoopState::Done(Ok(GenerationOutcome::accepted(record))),
            Decision::Review => LoopState::Done(Ok(GenerationOutcome::needs_review(record))),
            Decision::Exhaust => LoopState::Done(Ok(GenerationOutcome::exhausted(Some(&record)))),
            Decision::Retry => {
                let next = record.attempt + 1;
                *last_record = Some(record);
                LoopState::Generating { attempt: next }
            }
        }
    }

    /// A failed attempt consumes budget. Once the budget is spent the run is
    /// exhausted if any attempt was evaluated, otherwise the error is terminal.
    /// A non-retryable error ends the run at once.
    fn after_failure(
        &self,
        attempt: u32,
        error: GenerationError,
        last_record: &Option<AttemptRecord>,
        warnings: &mut Vec<String>,
    ) -> LoopState {
        tracing::warn!(attempt, error = %error, "Attempt failed");
        warnings.push(format!("attempt {} failed: {}", attempt, error));

        if !error.is_retryable() {
            LoopState::Done(Err(error))
        } else if attempt < self.max_attempts {
            LoopState::Generating {
                attempt: attempt + 1,
            }
        } else if last_record.is_some() {
            LoopState::Done(Ok(GenerationOutcome::exhausted(last_record.as_ref())))
        } else {
            LoopState::Done(Err(error))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::AutoFixResult;
    use crate::generator::GeneratorOutput;
    use crate::providers::ProviderError;
    use async_trait::async_trait;
    use brandgate_core::{ComplianceVerdict, ContentInput, OutcomeStatus, Platform};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingGenerator {
        calls: AtomicU32,
        fail_first: u32,
        fail_after: u32,
    }

    #[async_trait]
    impl Generator for CountingGenerator {
        async fn generate(&self, _prompt: &Prompt) -> Result<GeneratorOutput, GeneratorError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.fail_first {
                return Err(GeneratorError::Transient("provider outage".to_string()));
            }
            if call > self.fail_after {
                return Err(GeneratorError::Timeout(Duration::from_secs(30)));
            }
            Ok(GeneratorOutput {
                text: format!("HEADLINE: Draft {}\nBODY: Body {}\nCTA: Go", call, call),
                tokens_in: 10,
                tokens_out: 5,
                provider: "test".to_string(),
                model: "test-model".to_string(),
            })
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct QueueScorer(Mutex<VecDeque<bool>>);

    #[async_trait]
    impl BrandScorer for QueueScorer {
        async fn score(
            &self,
            _candidate: &Candidate,
            _voice: &BrandVoice,
        ) -> Result<QualityVerdict, ScorerError> {
            let passed = self.0.lock().pop_front().unwrap_or(false);
            Ok(QualityVerdict::uniform(if passed { 0.9 } else { 0.3 }, passed))
        }
    }

    struct QueueLinter(Mutex<VecDeque<ComplianceVerdict>>);

    #[async_trait]
    impl ComplianceLinter for QueueLinter {
        async fn lint(
            &self,
            _candidate: &Candidate,
            _safety: &BrandSafetyConfig,
        ) -> Result<ComplianceVerdict, LinterError> {
            Ok(self.0.lock().pop_front().unwrap_or_else(ComplianceVerdict::clean))
        }

        async fn auto_fix(
            &self,
            candidate: &Candidate,
            _verdict: &ComplianceVerdict,
            _safety: &BrandSafetyConfig,
        ) -> Result<AutoFixResult, LinterError> {
            Err(LinterError::AutoFix(format!("cannot fix '{}'", candidate.headline)))
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            brand_id: "acme".to_string(),
            input: ContentInput {
                topic: "Spring sale".to_string(),
                platform: Platform::Twitter,
                tone: "upbeat".to_string(),
                format: "post".to_string(),
                max_length: None,
                include_cta: true,
                cta_type: None,
            },
            safety_mode: None,
        }
    }

    fn controller(
        fail_first: u32,
        scores: Vec<bool>,
        verdicts: Vec<ComplianceVerdict>,
    ) -> (RegenerationController, Arc<CountingGenerator>) {
        let generator = Arc::new(CountingGenerator {
            calls: AtomicU32::new(0),
            fail_first,
            fail_after: u32::MAX,
        });
        let controller = RegenerationController::new(
            generator.clone(),
            Arc::new(QueueScorer(Mutex::new(scores.into()))),
            Arc::new(QueueLinter(Mutex::new(verdicts.into()))),
            &PipelineConfig::default(),
        );
        (controller, generator)
    }

    async fn run(controller: &RegenerationController) -> ControllerReport {
        controller
            .run(
                &request(),
                &BrandSafetyConfig::system_default(),
                &CancelSignal::never(),
            )
            .await
    }

    #[tokio::test]
    async fn test_transient_failure_then_accept() {
        let (controller, generator) = controller(1, vec![true], vec![]);
        let report = run(&controller).await;

        let outcome = report.result.unwrap();
        assert_eq!(outcome.status(), OutcomeStatus::Accepted);
        assert_eq!(outcome.candidate().unwrap().headline, "Draft 2");
        assert_eq!(report.attempts_used, 2);
        assert_eq!(report.usage.llm_calls, 2);
        assert_eq!(report.usage.tokens_in, 10);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_generator_failing_every_attempt_is_terminal_error() {
        let (controller, _) = controller(10, vec![], vec![]);
        let report = run(&controller).await;

        assert!(matches!(
            report.result,
            Err(GenerationError::Generator(GeneratorError::Transient(_)))
        ));
        assert_eq!(report.attempts_used, 3);
        assert_eq!(report.usage.llm_calls, 3);
    }

    #[tokio::test]
    async fn test_failure_on_last_attempt_after_evaluated_one_is_exhausted() {
        let generator = Arc::new(CountingGenerator {
            calls: AtomicU32::new(0),
            fail_first: 0,
            fail_after: 1,
        });
        let controller = RegenerationController::new(
            generator,
            Arc::new(QueueScorer(Mutex::new(VecDeque::new()))),
            Arc::new(QueueLinter(Mutex::new(VecDeque::new()))),
            &PipelineConfig::default().with_max_attempts(2),
        );

        let report = run(&controller).await;
        let outcome = report.result.unwrap();
        assert_eq!(outcome.status(), OutcomeStatus::Exhausted);
        assert!(outcome.quality().is_some());
        assert_eq!(report.attempts_used, 2);
    }

    #[tokio::test]
    async fn test_auto_fix_failure_keeps_going() {
        let fixable = ComplianceVerdict {
            fixable: true,
            ..ComplianceVerdict::default()
        };
        let (controller, _) = controller(0, vec![true, true], vec![fixable]);
        let report = run(&controller).await;

        let outcome = report.result.unwrap();
        assert_eq!(outcome.status(), OutcomeStatus::Accepted);
        assert_eq!(report.attempts_used, 2);
        assert!(report.warnings[0].contains("auto-fix failed"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let (controller, generator) = controller(0, vec![true], vec![]);
        let (handle, signal) = crate::cancel::cancel_pair();
        handle.cancel();

        let report = controller
            .run(&request(), &BrandSafetyConfig::system_default(), &signal)
            .await;

        assert!(matches!(report.result, Err(GenerationError::Cancelled)));
        assert_eq!(report.attempts_used, 0);
        assert_eq!(report.usage.llm_calls, 0);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    struct RefusedGenerator(AtomicU32);

    #[async_trait]
    impl Generator for RefusedGenerator {
        async fn generate(&self, _prompt: &Prompt) -> Result<GeneratorOutput, GeneratorError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Unauthorized.into())
        }

        fn name(&self) -> &str {
            "refused"
        }
    }

    #[tokio::test]
    async fn test_refused_credentials_stop_after_one_call() {
        let generator = Arc::new(RefusedGenerator(AtomicU32::new(0)));
        let controller = RegenerationController::new(
            generator.clone(),
            Arc::new(QueueScorer(Mutex::new(VecDeque::new()))),
            Arc::new(QueueLinter(Mutex::new(VecDeque::new()))),
            &PipelineConfig::default(),
        );

        let report = run(&controller).await;
        assert!(matches!(
            report.result,
            Err(GenerationError::Generator(GeneratorError::Fatal(_)))
        ));
        assert_eq!(report.attempts_used, 1);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(generator.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fatal_error_after_evaluated_attempt_is_not_exhausted() {
        struct FlakyThenRefused(AtomicU32);

        #[async_trait]
        impl Generator for FlakyThenRefused {
            async fn generate(&self, _prompt: &Prompt) -> Result<GeneratorOutput, GeneratorError> {
                if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                    return Ok(GeneratorOutput {
                        text: "HEADLINE: Draft\nBODY: Body\nCTA: Go".to_string(),
                        tokens_in: 10,
                        tokens_out: 5,
                        provider: "test".to_string(),
                        model: "test-model".to_string(),
                    });
                }
                Err(GeneratorError::Fatal("key revoked".to_string()))
            }

            fn name(&self) -> &str {
                "flaky"
            }
        }

        let generator = Arc::new(FlakyThenRefused(AtomicU32::new(0)));
        let controller = RegenerationController::new(
            generator.clone(),
            Arc::new(QueueScorer(Mutex::new(vec![false].into()))),
            Arc::new(QueueLinter(Mutex::new(VecDeque::new()))),
            &PipelineConfig::default(),
        );

        let report = run(&controller).await;
        assert!(matches!(report.result, Err(GenerationError::Generator(_))));
        assert_eq!(report.attempts_used, 2);
        assert_eq!(generator.0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_zero_budget_is_raised_to_one() {
        let (_, generator) = controller(0, vec![], vec![]);
        let controller = RegenerationController::new(
            generator,
            Arc::new(QueueScorer(Mutex::new(VecDeque::new()))),
            Arc::new(QueueLinter(Mutex::new(VecDeque::new()))),
            &PipelineConfig::default().with_max_attempts(0),
        );
        assert_eq!(controller.max_attempts(), 1);
    }
}
