//! Pipeline orchestrator
//!
//! The top-level state machine. `advance` idempotently progresses one run
//! by at most one step per call; the polling scheduler re-invokes it, so a
//! lost external signal (approval webhook, scanner callback) is eventually
//! reconciled by re-reading collaborator state.
//!
//! The orchestrator is the only writer of run and stage state. Gate,
//! approval, and rollout logic return structured results; every state
//! transition is decided here, and every persistence write lands before
//! the external side effect it authorizes.

use std::sync::Arc;
use std::time::Duration;

use convoy_core::domain::approval::ApprovalDecision;
use convoy_core::domain::artifact::ArtifactRef;
use convoy_core::domain::gate::{FindingsReport, Verdict};
use convoy_core::domain::rollout::RolloutState;
use convoy_core::domain::run::{PipelineRun, RunStatus};
use convoy_core::domain::spec::{PipelineSpec, StageSpec};
use convoy_core::domain::stage::{StageExecution, StageStatus};
use convoy_core::dto::run::RunDetails;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::collab::notifier::notify_best_effort;
use crate::collab::{
    ArtifactStore, CollabError, Deployer, NotificationEvent, Notifier, ScannerHub, with_retry,
};
use crate::repository::{lkg_repository, run_repository, stage_repository};
use crate::scheduler::EnvironmentLeases;
use crate::service::rollback::{RollbackOutcome, rollback};
use crate::service::rollout::StepDecisionOutcome;
use crate::service::{approval, gate, rollout, transition};

/// Collaborator call retry budget per poll cycle
const CALL_ATTEMPTS: u32 = 3;

/// Orchestrator error type
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("run {0} not found")]
    RunNotFound(Uuid),

    #[error("stage {0} not found")]
    StageNotFound(Uuid),

    #[error("artifact `{0}` not found in the artifact store")]
    UnknownArtifact(String),

    #[error("run {0} is already terminal")]
    AlreadyTerminal(Uuid),

    #[error("stage {0} is not awaiting approval")]
    NotAwaitingApproval(Uuid),

    #[error(transparent)]
    Approval(#[from] approval::ApprovalError),

    /// Programming or data-corruption bug. The affected run is frozen in
    /// Quarantined rather than guessed forward.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollabError),
}

/// The pipeline orchestration engine
pub struct Orchestrator {
    pool: PgPool,
    spec: Arc<PipelineSpec>,
    artifacts: Arc<dyn ArtifactStore>,
    scanners: Arc<dyn ScannerHub>,
    deployer: Arc<dyn Deployer>,
    notifier: Arc<dyn Notifier>,
    leases: EnvironmentLeases,
    metrics_window: Duration,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: PgPool,
        spec: Arc<PipelineSpec>,
        artifacts: Arc<dyn ArtifactStore>,
        scanners: Arc<dyn ScannerHub>,
        deployer: Arc<dyn Deployer>,
        notifier: Arc<dyn Notifier>,
        metrics_window: Duration,
    ) -> Self {
        Self {
            pool,
            spec,
            artifacts,
            scanners,
            deployer,
            notifier,
            leases: EnvironmentLeases::new(),
            metrics_window,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // =========================================================================
    // API surface
    // =========================================================================

    /// Accept a new artifact into the pipeline
    ///
    /// The reference is resolved against the artifact store; unknown
    /// references are rejected. The stored reference is the content
    /// digest, so two submissions of the same content deploy identically.
    pub async fn submit(&self, artifact_ref: &str) -> Result<PipelineRun, OrchestratorError> {
        if artifact_ref.trim().is_empty() {
            return Err(OrchestratorError::UnknownArtifact(artifact_ref.to_string()));
        }

        let info = with_retry("artifact lookup", CALL_ATTEMPTS, || {
            self.artifacts.get_artifact(artifact_ref)
        })
        .await?;

        if !info.exists {
            return Err(OrchestratorError::UnknownArtifact(artifact_ref.to_string()));
        }

        let canonical = info.digest.unwrap_or_else(|| artifact_ref.to_string());
        let run = run_repository::create(&self.pool, &ArtifactRef::new(canonical)).await?;

        tracing::info!("Run {} submitted for artifact {}", run.id, run.artifact);
        Ok(run)
    }

    /// Fetch a run and its stages
    pub async fn run_details(&self, run_id: Uuid) -> Result<RunDetails, OrchestratorError> {
        let run = run_repository::find_by_id(&self.pool, run_id)
            .await?
            .ok_or(OrchestratorError::RunNotFound(run_id))?;
        let stages = stage_repository::find_by_run(&self.pool, run_id).await?;

        Ok(RunDetails { run, stages })
    }

    /// List all runs, newest first
    pub async fn list_runs(&self) -> Result<Vec<PipelineRun>, OrchestratorError> {
        Ok(run_repository::list_all(&self.pool).await?)
    }

    /// Request operator cancellation of a run
    ///
    /// The flag is honored between stage transitions; a run mid-rollout is
    /// taken down through the same path as an Abort rollout decision.
    pub async fn abort(&self, run_id: Uuid) -> Result<(), OrchestratorError> {
        let run = run_repository::find_by_id(&self.pool, run_id)
            .await?
            .ok_or(OrchestratorError::RunNotFound(run_id))?;

        if run.status.is_terminal() {
            return Err(OrchestratorError::AlreadyTerminal(run_id));
        }

        run_repository::set_abort_requested(&self.pool, run_id).await?;
        tracing::info!("Run {} abort requested", run_id);
        Ok(())
    }

    /// Resolve a stage's pending approval
    ///
    /// The stage itself transitions on the next poll; this only writes the
    /// approval record. Expiry is applied first so a decision arriving
    /// after the deadline loses to it.
    pub async fn decide_stage(
        &self,
        stage_id: Uuid,
        actor: &str,
        decision: ApprovalDecision,
    ) -> Result<StageExecution, OrchestratorError> {
        let now = chrono::Utc::now();
        let mut stage = stage_repository::find_by_id(&self.pool, stage_id)
            .await?
            .ok_or(OrchestratorError::StageNotFound(stage_id))?;

        let record = stage
            .approval
            .clone()
            .ok_or(OrchestratorError::NotAwaitingApproval(stage_id))?;

        let record = match approval::expire_if_due(&record, now) {
            Some(expired) => {
                stage.approval = Some(expired.clone());
                stage_repository::update(&self.pool, &stage).await?;
                expired
            }
            None => record,
        };

        let resolved = approval::decide(&record, actor, decision, now)?;
        stage.approval = Some(resolved);
        stage_repository::update(&self.pool, &stage).await?;

        tracing::info!("Stage {} approval decided: {} by {}", stage_id, decision, actor);
        Ok(stage)
    }

    // =========================================================================
    // State machine
    // =========================================================================

    /// Progress a run by at most one step
    ///
    /// Safe to call on terminal runs (no-op) and safe to re-call after a
    /// crash: every externally visible action is preceded by a durable
    /// record of the state that authorized it.
    pub async fn advance(&self, run_id: Uuid) -> Result<(), OrchestratorError> {
        let run = run_repository::find_by_id(&self.pool, run_id)
            .await?
            .ok_or(OrchestratorError::RunNotFound(run_id))?;

        if run.status.is_terminal() {
            return Ok(());
        }

        let stages = stage_repository::find_by_run(&self.pool, run_id).await?;

        let mut active = stages.iter().filter(|s| !s.status.is_terminal());
        let current = active.next().cloned();
        if active.next().is_some() {
            return self
                .quarantine(&run, "multiple stages active concurrently".to_string())
                .await;
        }

        let result = match current {
            Some(stage) => self.advance_stage(&run, stage).await,
            None => self.advance_between_stages(&run, &stages).await,
        };

        // An invariant violation freezes the run instead of propagating.
        match result {
            Err(OrchestratorError::InvariantViolation(reason)) => {
                self.quarantine(&run, reason).await
            }
            other => other,
        }
    }

    /// Handle a run whose stages are all terminal (or not yet created)
    async fn advance_between_stages(
        &self,
        run: &PipelineRun,
        stages: &[StageExecution],
    ) -> Result<(), OrchestratorError> {
        let Some(last) = stages.last() else {
            // Freshly submitted run: abort is honored before any work starts.
            if run.abort_requested {
                return self.finish_run(run, RunStatus::Failed).await;
            }
            if run.status == RunStatus::Pending {
                run_repository::update_status(&self.pool, run.id, RunStatus::Running).await?;
            }
            return self.create_stage(run, 0).await;
        };

        match last.status {
            StageStatus::Succeeded => {
                let next = last.sequence + 1;
                if self.spec.stage(next).is_none() {
                    self.finish_run(run, RunStatus::Succeeded).await
                } else if run.abort_requested {
                    self.finish_run(run, RunStatus::Failed).await
                } else {
                    self.create_stage(run, next).await
                }
            }
            StageStatus::Failed => self.finalize_failed_stage(run, last.clone()).await,
            StageStatus::RolledBack => self.finish_run(run, RunStatus::RolledBack).await,
            // Unreachable: the caller only routes terminal stages here.
            _ => Ok(()),
        }
    }

    /// Create the stage execution at a sequence position
    ///
    /// `requires_approval` is snapshotted from the spec at creation; it
    /// gates the state machine and must not drift under a spec reload.
    async fn create_stage(&self, run: &PipelineRun, sequence: u32) -> Result<(), OrchestratorError> {
        let spec = self.spec.stage(sequence).ok_or_else(|| {
            OrchestratorError::InvariantViolation(format!(
                "run {} has no spec entry for stage sequence {}",
                run.id, sequence
            ))
        })?;

        let stage = StageExecution {
            id: Uuid::new_v4(),
            run_id: run.id,
            name: spec.name.clone(),
            environment: spec.environment.clone(),
            sequence,
            requires_approval: spec.requires_approval,
            status: StageStatus::Pending,
            deploy_attempted: false,
            gate_verdict: None,
            approval: None,
            rollout: None,
            failure_reason: None,
            started_at: None,
            ended_at: None,
        };
        stage_repository::create(&self.pool, &stage).await?;

        tracing::info!(
            "Run {}: stage {} created for environment {}",
            run.id,
            stage.name,
            stage.environment
        );
        Ok(())
    }

    /// Progress the single non-terminal stage of a run
    async fn advance_stage(
        &self,
        run: &PipelineRun,
        mut stage: StageExecution,
    ) -> Result<(), OrchestratorError> {
        let now = chrono::Utc::now();

        // Operator cancellation, honored between transitions. A stage
        // mid-canary goes down the rollout-abort path so rollback always
        // runs through one code path.
        if run.abort_requested {
            return match stage.status {
                StageStatus::Canarying => {
                    self.abort_rollout(run, stage, "aborted by operator".to_string())
                        .await
                }
                _ => {
                    self.fail_stage(&mut stage, "aborted by operator".to_string())
                        .await
                }
            };
        }

        match stage.status {
            StageStatus::Pending => {
                self.transition(&mut stage, StageStatus::AwaitingGate)?;
                stage.started_at = Some(now);
                stage_repository::update(&self.pool, &stage).await?;
                tracing::info!("Run {}: stage {} awaiting gate", run.id, stage.name);
                Ok(())
            }
            StageStatus::AwaitingGate => self.evaluate_gate(run, stage, now).await,
            StageStatus::AwaitingApproval => self.check_approval(run, stage, now).await,
            StageStatus::Deploying => self.deploy(run, stage, now).await,
            StageStatus::Canarying => self.canary_tick(run, stage).await,
            // Terminal stages are handled by advance_between_stages.
            _ => Ok(()),
        }
    }

    // =========================================================================
    // Per-state handlers
    // =========================================================================

    async fn evaluate_gate(
        &self,
        run: &PipelineRun,
        mut stage: StageExecution,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), OrchestratorError> {
        let spec = self.stage_spec(&stage)?;

        // A verdict recorded on an earlier poll means the stage is only
        // waiting for a busy environment; verdicts are created once per
        // stage, never re-evaluated.
        if let Some(existing) = stage.gate_verdict.clone() {
            return match existing.verdict {
                Verdict::Pass => self.enter_deploying(run, stage).await,
                Verdict::Fail => {
                    let reason = gate::failure_reason(&existing);
                    self.fail_stage(&mut stage, reason).await
                }
            };
        }

        let deadline_passed = gate_deadline_passed(stage.started_at, spec.gate_timeout_secs, now);

        let report = match self.scanners.get_findings(&run.artifact).await {
            Ok(report) => report,
            Err(e) if !deadline_passed => {
                // Transient scanner outage: stay in AwaitingGate, the next
                // poll reconciles.
                tracing::warn!("Run {}: scanner unavailable: {}", run.id, e);
                return Ok(());
            }
            Err(e) => {
                tracing::warn!(
                    "Run {}: scanner unavailable past gate deadline, treating report as missing: {}",
                    run.id,
                    e
                );
                FindingsReport::Missing
            }
        };

        if matches!(report, FindingsReport::Missing) && !deadline_passed {
            tracing::debug!("Run {}: no scan report yet for {}", run.id, run.artifact);
            return Ok(());
        }

        let verdict = gate::evaluate(&spec.gate_policy, &report, now);
        stage.gate_verdict = Some(verdict.clone());

        match verdict.verdict {
            Verdict::Fail => {
                let reason = gate::failure_reason(&verdict);
                self.fail_stage(&mut stage, reason).await
            }
            Verdict::Pass => {
                if stage.requires_approval {
                    let record = approval::request(spec.approval_deadline_secs, now);
                    let deadline = record.deadline;
                    stage.approval = Some(record);
                    self.transition(&mut stage, StageStatus::AwaitingApproval)?;
                    stage_repository::update(&self.pool, &stage).await?;

                    notify_best_effort(
                        Arc::clone(&self.notifier),
                        NotificationEvent::ApprovalRequested {
                            stage_id: stage.id,
                            stage_name: stage.name.clone(),
                            artifact: run.artifact.to_string(),
                            deadline,
                        },
                    );
                    tracing::info!("Run {}: stage {} awaiting approval", run.id, stage.name);
                    Ok(())
                } else {
                    // No approval required: the state is skipped entirely.
                    // The verdict is persisted first so a busy-environment
                    // wait never re-evaluates the gate.
                    stage_repository::update(&self.pool, &stage).await?;
                    self.enter_deploying(run, stage).await
                }
            }
        }
    }

    async fn check_approval(
        &self,
        run: &PipelineRun,
        mut stage: StageExecution,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), OrchestratorError> {
        let record = stage.approval.clone().ok_or_else(|| {
            OrchestratorError::InvariantViolation(format!(
                "stage {} awaiting approval without an approval record",
                stage.id
            ))
        })?;

        match record.decision {
            ApprovalDecision::Approved => self.enter_deploying(run, stage).await,
            ApprovalDecision::Rejected => {
                let actor = record.actor.as_deref().unwrap_or("unknown").to_string();
                self.fail_stage(&mut stage, format!("approval rejected by {}", actor))
                    .await
            }
            ApprovalDecision::Expired => {
                self.fail_stage(&mut stage, "approval deadline expired".to_string())
                    .await
            }
            ApprovalDecision::Pending => match approval::expire_if_due(&record, now) {
                Some(expired) => {
                    stage.approval = Some(expired);
                    self.fail_stage(&mut stage, "approval deadline expired".to_string())
                        .await
                }
                None => Ok(()),
            },
        }
    }

    /// Move an approved (or approval-free) stage into Deploying
    ///
    /// Waits for the target environment to be free of other runs' deploys
    /// first; the stage simply stays put until the next poll otherwise.
    async fn enter_deploying(
        &self,
        run: &PipelineRun,
        mut stage: StageExecution,
    ) -> Result<(), OrchestratorError> {
        let busy =
            stage_repository::count_active_in_environment(&self.pool, &stage.environment, run.id)
                .await?;
        if busy > 0 {
            tracing::info!(
                "Run {}: environment {} busy with another deploy, waiting",
                run.id,
                stage.environment
            );
            return Ok(());
        }

        self.transition(&mut stage, StageStatus::Deploying)?;
        stage.deploy_attempted = true;
        stage_repository::update(&self.pool, &stage).await?;
        tracing::info!(
            "Run {}: stage {} deploying to {}",
            run.id,
            stage.name,
            stage.environment
        );
        Ok(())
    }

    async fn deploy(
        &self,
        run: &PipelineRun,
        mut stage: StageExecution,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<(), OrchestratorError> {
        let spec = self.stage_spec(&stage)?.clone();
        let _lease = self.leases.acquire(&stage.environment).await;

        if spec.is_canary() {
            // Capture the pre-rollout baseline before the first shift.
            let baseline = match with_retry("baseline metrics", CALL_ATTEMPTS, || {
                self.deployer
                    .get_health_metrics(&stage.environment, self.metrics_window)
            })
            .await
            {
                Ok(sample) => sample.error_rate,
                Err(e) => {
                    tracing::warn!(
                        "Run {}: baseline metrics unavailable, retrying next poll: {}",
                        run.id,
                        e
                    );
                    return Ok(());
                }
            };

            let state = RolloutState::new(&spec.canary_steps, baseline, now);
            stage.rollout = Some(state);
            self.transition(&mut stage, StageStatus::Canarying)?;
            stage_repository::update(&self.pool, &stage).await?;
            tracing::info!(
                "Run {}: stage {} canarying with steps {:?} (baseline error rate {:.4})",
                run.id,
                stage.name,
                spec.canary_steps,
                baseline
            );
            Ok(())
        } else {
            let result = with_retry("deploy", CALL_ATTEMPTS, || {
                self.deployer
                    .set_traffic_weight(&stage.environment, &run.artifact, 100)
            })
            .await;

            match result {
                Ok(()) => self.succeed_stage(run, stage).await,
                Err(e) => {
                    self.fail_stage(&mut stage, format!("deploy failed: {}", e))
                        .await
                }
            }
        }
    }

    async fn canary_tick(
        &self,
        run: &PipelineRun,
        mut stage: StageExecution,
    ) -> Result<(), OrchestratorError> {
        let spec = self.stage_spec(&stage)?.clone();
        let mut state = stage.rollout.clone().ok_or_else(|| {
            OrchestratorError::InvariantViolation(format!(
                "stage {} canarying without rollout state",
                stage.id
            ))
        })?;

        let _lease = self.leases.acquire(&stage.environment).await;

        let Some(weight) = state.current_weight() else {
            return Err(OrchestratorError::InvariantViolation(format!(
                "stage {} rollout has no current step",
                stage.id
            )));
        };

        // Idempotent reconcile: re-assert the current step's weight, so a
        // crash between a persisted step advance and the traffic call
        // converges here.
        if let Err(e) = with_retry("traffic shift", CALL_ATTEMPTS, || {
            self.deployer
                .set_traffic_weight(&stage.environment, &run.artifact, weight)
        })
        .await
        {
            stage.rollout = Some(state);
            return self
                .fail_stage(&mut stage, format!("traffic shift failed: {}", e))
                .await;
        }

        let sample = match with_retry("health metrics", CALL_ATTEMPTS, || {
            self.deployer
                .get_health_metrics(&stage.environment, self.metrics_window)
        })
        .await
        {
            Ok(sample) => sample,
            Err(e) => {
                tracing::warn!(
                    "Run {}: health sampling failed at weight {}%, holding: {}",
                    run.id,
                    weight,
                    e
                );
                return Ok(());
            }
        };

        let decision = rollout::tick(&mut state, sample, &spec.observation, &spec.thresholds);
        tracing::debug!(
            "Run {}: canary weight {}% decision {:?}",
            run.id,
            weight,
            decision
        );

        match rollout::outcome(&state, decision) {
            StepDecisionOutcome::Continue => {
                stage.rollout = Some(state);
                stage_repository::update(&self.pool, &stage).await?;
                Ok(())
            }
            StepDecisionOutcome::Complete => {
                stage.rollout = Some(state);
                self.succeed_stage(run, stage).await
            }
            StepDecisionOutcome::Aborted => {
                let reason = rollout::abort_reason(&state, &spec.thresholds);
                stage.rollout = Some(state);
                self.abort_rollout(run, stage, reason).await
            }
        }
    }

    // =========================================================================
    // Terminal handling
    // =========================================================================

    /// Fail the stage, revert canary traffic to zero, and report the abort
    ///
    /// The failure is persisted before traffic is touched; rollback to the
    /// last known good happens on the next poll via the Failed stage.
    async fn abort_rollout(
        &self,
        run: &PipelineRun,
        mut stage: StageExecution,
        reason: String,
    ) -> Result<(), OrchestratorError> {
        if let Some(state) = stage.rollout.as_mut() {
            rollout::force_abort(state);
        }
        self.fail_stage(&mut stage, reason.clone()).await?;

        // Straight to zero, not a gradual step-down.
        if let Err(e) = with_retry("traffic revert", CALL_ATTEMPTS, || {
            self.deployer
                .set_traffic_weight(&stage.environment, &run.artifact, 0)
        })
        .await
        {
            // Rollback will re-point traffic at the last known good; the
            // failed revert is logged, not fatal.
            tracing::error!(
                "Run {}: failed to revert traffic in {}: {}",
                run.id,
                stage.environment,
                e
            );
        }

        notify_best_effort(
            Arc::clone(&self.notifier),
            NotificationEvent::RolloutAborted {
                environment: stage.environment.clone(),
                artifact: run.artifact.to_string(),
                reason,
            },
        );
        Ok(())
    }

    /// Resolve a Failed stage into the run's terminal status
    ///
    /// A stage that never touched the cluster fails the run outright; a
    /// stage that did is rolled back to the last known good first.
    async fn finalize_failed_stage(
        &self,
        run: &PipelineRun,
        mut stage: StageExecution,
    ) -> Result<(), OrchestratorError> {
        if !stage.deploy_attempted {
            return self.finish_run(run, RunStatus::Failed).await;
        }

        let _lease = self.leases.acquire(&stage.environment).await;
        let outcome = rollback(
            &self.pool,
            self.deployer.as_ref(),
            Arc::clone(&self.notifier),
            &stage.environment,
        )
        .await;

        match outcome {
            Ok(RollbackOutcome::Restored(artifact)) => {
                self.transition(&mut stage, StageStatus::RolledBack)?;
                stage_repository::update(&self.pool, &stage).await?;
                tracing::info!(
                    "Run {}: environment {} rolled back to {}",
                    run.id,
                    stage.environment,
                    artifact
                );
                self.finish_run(run, RunStatus::RolledBack).await
            }
            Ok(RollbackOutcome::NoKnownGood) => self.finish_run(run, RunStatus::Failed).await,
            Err(e) => {
                // The rollback manager has already raised the fatal alert.
                tracing::error!(
                    "Run {}: rollback of {} failed: {}",
                    run.id,
                    stage.environment,
                    e
                );
                self.finish_run(run, RunStatus::Failed).await
            }
        }
    }

    async fn succeed_stage(
        &self,
        run: &PipelineRun,
        mut stage: StageExecution,
    ) -> Result<(), OrchestratorError> {
        self.transition(&mut stage, StageStatus::Succeeded)?;
        stage.ended_at = Some(chrono::Utc::now());
        stage_repository::update(&self.pool, &stage).await?;

        // Only a fully succeeded stage may move the pointer; callers hold
        // the environment lease across the deploy that got us here.
        lkg_repository::record(&self.pool, &stage.environment, &run.artifact).await?;

        tracing::info!(
            "Run {}: stage {} succeeded, {} now at {}",
            run.id,
            stage.name,
            stage.environment,
            run.artifact
        );
        Ok(())
    }

    async fn fail_stage(
        &self,
        stage: &mut StageExecution,
        reason: String,
    ) -> Result<(), OrchestratorError> {
        self.transition(stage, StageStatus::Failed)?;
        stage.failure_reason = Some(reason.clone());
        stage.ended_at = Some(chrono::Utc::now());
        stage_repository::update(&self.pool, stage).await?;

        tracing::warn!("Stage {} ({}) failed: {}", stage.name, stage.id, reason);
        Ok(())
    }

    async fn finish_run(
        &self,
        run: &PipelineRun,
        status: RunStatus,
    ) -> Result<(), OrchestratorError> {
        run_repository::update_status(&self.pool, run.id, status).await?;
        tracing::info!("Run {} finished: {:?}", run.id, status);
        Ok(())
    }

    /// Freeze a run after a detected invariant violation
    async fn quarantine(
        &self,
        run: &PipelineRun,
        reason: String,
    ) -> Result<(), OrchestratorError> {
        tracing::error!("Run {} quarantined: {}", run.id, reason);
        run_repository::update_status(&self.pool, run.id, RunStatus::Quarantined).await?;

        notify_best_effort(
            Arc::clone(&self.notifier),
            NotificationEvent::RunQuarantined {
                run_id: run.id,
                reason,
            },
        );
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn transition(
        &self,
        stage: &mut StageExecution,
        to: StageStatus,
    ) -> Result<(), OrchestratorError> {
        if !transition::is_legal(stage.status, to) {
            return Err(OrchestratorError::InvariantViolation(format!(
                "illegal stage transition {} -> {} for stage {}",
                stage.status, to, stage.id
            )));
        }
        stage.status = to;
        Ok(())
    }

    fn stage_spec(&self, stage: &StageExecution) -> Result<&StageSpec, OrchestratorError> {
        self.spec.stage(stage.sequence).ok_or_else(|| {
            OrchestratorError::InvariantViolation(format!(
                "stage {} sequence {} has no spec entry",
                stage.id, stage.sequence
            ))
        })
    }
}

/// Whether a stage has been waiting on its gate past the configured timeout
fn gate_deadline_passed(
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    timeout_secs: u64,
    now: chrono::DateTime<chrono::Utc>,
) -> bool {
    match started_at {
        Some(started) => now > started + chrono::Duration::seconds(timeout_secs as i64),
        // A stage in AwaitingGate always has started_at; treat a missing
        // one as expired rather than waiting forever.
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> chrono::DateTime<chrono::Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_gate_deadline() {
        let started = Some(at("2024-01-01T00:00:00Z"));
        assert!(!gate_deadline_passed(started, 900, at("2024-01-01T00:14:59Z")));
        assert!(!gate_deadline_passed(started, 900, at("2024-01-01T00:15:00Z")));
        assert!(gate_deadline_passed(started, 900, at("2024-01-01T00:15:01Z")));
        assert!(gate_deadline_passed(None, 900, at("2024-01-01T00:00:00Z")));
    }
}
