//! Submission, polling, cancellation and result materialization.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use atelier_provider::ProviderApi;
use atelier_session::{PendingJob, SessionStore};
use atelier_types::catalog::CatalogEntry;
use atelier_types::job::{GenerationJob, GenerationParams, JobStatus};

use crate::config::OrchestratorConfig;
use crate::validate;
use crate::visibility::Visibility;
use crate::{JobError, Result};

/// Where the polling chain currently stands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobPhase {
    Queued,
    Running,
    Done,
    Error,
    Cancelled,
}

impl From<JobStatus> for JobPhase {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Queued => JobPhase::Queued,
            JobStatus::Running => JobPhase::Running,
            JobStatus::Done => JobPhase::Done,
            JobStatus::Error => JobPhase::Error,
        }
    }
}

/// Progress snapshot published on the handle's watch channel.
#[derive(Clone, Debug)]
pub struct JobSnapshot {
    pub job_id: String,
    pub phase: JobPhase,
    /// Latest accepted projection; `None` until the first poll lands.
    pub job: Option<GenerationJob>,
    pub error: Option<String>,
}

/// A finished job with its materialized artifact.
#[derive(Clone, Debug)]
pub struct JobOutcome {
    pub job: GenerationJob,
    pub artifact: Vec<u8>,
}

/// A live polling chain for one job.
///
/// Dropping the handle (leaving the job view) cancels the chain: timers
/// stop and any in-flight poll's result is discarded without mutating
/// state.
pub struct JobHandle {
    job_id: String,
    snapshots: watch::Receiver<JobSnapshot>,
    cancel: watch::Sender<bool>,
    task: Option<JoinHandle<Result<JobOutcome>>>,
}

impl JobHandle {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> JobSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Subscribe to progress updates.
    pub fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.snapshots.clone()
    }

    /// Cancel the polling chain.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// Wait for the chain to finish and take its outcome.
    pub async fn outcome(mut self) -> Result<JobOutcome> {
        match self.task.take() {
            Some(task) => task
                .await
                .unwrap_or_else(|e| Err(JobError::Task(e.to_string()))),
            None => Err(JobError::Task("outcome already taken".to_string())),
        }
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

/// The job orchestrator: validates, submits, and drives polling chains
/// over a provider boundary.
pub struct JobOrchestrator<P: ProviderApi> {
    api: Arc<P>,
    session: Arc<SessionStore>,
    config: OrchestratorConfig,
    visibility: watch::Receiver<Visibility>,
}

impl<P: ProviderApi + 'static> JobOrchestrator<P> {
    pub fn new(
        api: Arc<P>,
        session: Arc<SessionStore>,
        config: OrchestratorConfig,
        visibility: watch::Receiver<Visibility>,
    ) -> Self {
        Self {
            api,
            session,
            config,
            visibility,
        }
    }

    /// Validate and submit a generation job.
    ///
    /// Validation is synchronous: invalid parameters fail here without
    /// consuming a network round-trip. The plaintext key rides the one
    /// submission request and is not retained.
    pub async fn submit(
        &self,
        params: &GenerationParams,
        catalog: &CatalogEntry,
        plaintext_key: &str,
    ) -> Result<String> {
        let resolved = validate::validate(params, catalog, self.config.max_prompt_len)?;

        let response = self
            .api
            .submit_generation(&resolved, plaintext_key, self.session.token())
            .await?;
        tracing::info!(job_id = %response.job_id, provider = %resolved.provider, model = %resolved.model, "generation submitted");

        self.session.set_pending_job(PendingJob {
            job_id: response.job_id.clone(),
            provider: resolved.provider,
            model: resolved.model,
            prompt: resolved.prompt,
            width: resolved.width.unwrap_or_default(),
            height: resolved.height.unwrap_or_default(),
            steps: resolved.steps.unwrap_or_default(),
            cfg: resolved.cfg,
            seed: resolved.seed,
            mode: resolved.mode,
            result_url: None,
        });

        Ok(response.job_id)
    }

    /// Start a polling chain for a submitted job. The first status fetch
    /// happens immediately; subsequent ones at the fixed interval.
    pub fn watch_job(&self, job_id: &str) -> JobHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(JobSnapshot {
            job_id: job_id.to_string(),
            phase: JobPhase::Queued,
            job: None,
            error: None,
        });
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let task = tokio::spawn(poll_loop(
            self.api.clone(),
            self.session.clone(),
            job_id.to_string(),
            Duration::from_millis(self.config.poll_interval_ms),
            self.visibility.clone(),
            cancel_rx,
            snapshot_tx,
        ));

        JobHandle {
            job_id: job_id.to_string(),
            snapshots: snapshot_rx,
            cancel: cancel_tx,
            task: Some(task),
        }
    }

    /// Submit and immediately start watching.
    pub async fn start(
        &self,
        params: &GenerationParams,
        catalog: &CatalogEntry,
        plaintext_key: &str,
    ) -> Result<JobHandle> {
        let job_id = self.submit(params, catalog, plaintext_key).await?;
        Ok(self.watch_job(&job_id))
    }

    /// Resume polling the session's pending job, if a reload interrupted
    /// one.
    pub fn resume(&self) -> Option<JobHandle> {
        let pending = self.session.pending_job()?;
        tracing::info!(job_id = %pending.job_id, "resuming job polling after reload");
        Some(self.watch_job(&pending.job_id))
    }
}

enum Race<T> {
    Cancelled,
    Output(T),
}

/// Run a fetch, abandoning it if the chain is cancelled first. An
/// abandoned fetch's result is dropped with the future, so it can never
/// mutate state.
async fn race_cancel<T>(
    cancel: &mut watch::Receiver<bool>,
    fut: impl Future<Output = T>,
) -> Race<T> {
    if *cancel.borrow_and_update() {
        return Race::Cancelled;
    }
    tokio::select! {
        _ = cancel.changed() => Race::Cancelled,
        output = fut => Race::Output(output),
    }
}

enum WaitOutcome {
    Tick,
    Cancelled,
}

/// Sleep one poll interval, coupled to tab visibility. Going hidden
/// cancels the pending tick and arms a resume marker; becoming visible
/// again returns immediately so exactly one poll fires, after which the
/// fixed interval takes over.
async fn wait_for_next_poll(
    interval: Duration,
    visibility: &mut watch::Receiver<Visibility>,
    cancel: &mut watch::Receiver<bool>,
) -> WaitOutcome {
    if *cancel.borrow_and_update() {
        return WaitOutcome::Cancelled;
    }

    // Already hidden: nothing is scheduled until the tab comes back.
    if *visibility.borrow_and_update() == Visibility::Hidden {
        return if wait_until_visible(visibility, cancel).await {
            WaitOutcome::Tick
        } else {
            WaitOutcome::Cancelled
        };
    }

    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = cancel.changed() => return WaitOutcome::Cancelled,
            _ = &mut sleep => return WaitOutcome::Tick,
            changed = visibility.changed() => {
                if changed.is_err() {
                    // Gate dropped; finish the plain interval.
                    tokio::select! {
                        _ = cancel.changed() => return WaitOutcome::Cancelled,
                        _ = &mut sleep => return WaitOutcome::Tick,
                    }
                }
                if *visibility.borrow() == Visibility::Hidden {
                    // Pending tick cancelled; one poll fires on resume.
                    return if wait_until_visible(visibility, cancel).await {
                        WaitOutcome::Tick
                    } else {
                        WaitOutcome::Cancelled
                    };
                }
            }
        }
    }
}

/// Returns false if cancelled while waiting.
async fn wait_until_visible(
    visibility: &mut watch::Receiver<Visibility>,
    cancel: &mut watch::Receiver<bool>,
) -> bool {
    loop {
        if *visibility.borrow_and_update() == Visibility::Visible {
            return true;
        }
        tokio::select! {
            _ = cancel.changed() => return false,
            changed = visibility.changed() => {
                if changed.is_err() {
                    return true;
                }
            }
        }
    }
}

async fn poll_loop<P: ProviderApi>(
    api: Arc<P>,
    session: Arc<SessionStore>,
    job_id: String,
    interval: Duration,
    mut visibility: watch::Receiver<Visibility>,
    mut cancel: watch::Receiver<bool>,
    snapshots: watch::Sender<JobSnapshot>,
) -> Result<JobOutcome> {
    // Highest status rank accepted so far; regressions from stale
    // responses are dropped so the projection never moves backward.
    let mut last_rank = 0u8;

    loop {
        let job = match race_cancel(&mut cancel, api.fetch_job(&job_id, session.token())).await {
            Race::Cancelled => return cancelled(&snapshots, &job_id),
            Race::Output(Ok(job)) => job,
            Race::Output(Err(e)) => {
                return fail(&snapshots, &session, &job_id, JobError::from(e));
            }
        };

        if job.status.rank() < last_rank {
            tracing::warn!(job_id = %job_id, status = ?job.status, "discarding stale status regression");
        } else {
            last_rank = job.status.rank();
            snapshots.send_replace(JobSnapshot {
                job_id: job_id.clone(),
                phase: job.status.into(),
                job: Some(job.clone()),
                error: job.error_message.clone(),
            });

            match job.status {
                JobStatus::Done => {
                    let url = match job.result_url.clone() {
                        Some(url) => url,
                        None => {
                            return fail(&snapshots, &session, &job_id, JobError::MissingResultUrl)
                        }
                    };

                    // Mirror the URL so a reload lands on the artifact.
                    if let Some(mut pending) = session.pending_job() {
                        pending.result_url = Some(url.clone());
                        session.set_pending_job(pending);
                    }

                    let artifact =
                        match race_cancel(&mut cancel, api.fetch_result(&url, session.token()))
                            .await
                        {
                            Race::Cancelled => return cancelled(&snapshots, &job_id),
                            Race::Output(Ok(bytes)) => bytes,
                            Race::Output(Err(e)) => {
                                // The job itself succeeded; this is a
                                // post-hoc retrieval failure.
                                return fail(
                                    &snapshots,
                                    &session,
                                    &job_id,
                                    JobError::ResultFetch(e),
                                );
                            }
                        };

                    session.clear_pending_job();
                    tracing::info!(job_id = %job_id, bytes = artifact.len(), "job done, artifact fetched");
                    return Ok(JobOutcome { job, artifact });
                }
                JobStatus::Error => {
                    let err = JobError::Job {
                        code: job.error_code.clone(),
                        message: job
                            .error_message
                            .clone()
                            .unwrap_or_else(|| "generation failed".to_string()),
                    };
                    return fail(&snapshots, &session, &job_id, err);
                }
                JobStatus::Queued | JobStatus::Running => {}
            }
        }

        match wait_for_next_poll(interval, &mut visibility, &mut cancel).await {
            WaitOutcome::Tick => {}
            WaitOutcome::Cancelled => return cancelled(&snapshots, &job_id),
        }
    }
}

/// Publish a terminal failure and stop. Transient transport errors are not
/// retried here; the natural retry was the next scheduled poll, and that
/// chain is now over.
fn fail(
    snapshots: &watch::Sender<JobSnapshot>,
    session: &SessionStore,
    job_id: &str,
    err: JobError,
) -> Result<JobOutcome> {
    let last_job = snapshots.borrow().job.clone();
    snapshots.send_replace(JobSnapshot {
        job_id: job_id.to_string(),
        phase: JobPhase::Error,
        job: last_job,
        error: Some(err.to_string()),
    });
    session.clear_pending_job();
    Err(err)
}

/// Publish cancellation and stop. The session's job mirror is left intact
/// so a reload can still resume the (still server-side) job.
fn cancelled(snapshots: &watch::Sender<JobSnapshot>, job_id: &str) -> Result<JobOutcome> {
    tracing::debug!(job_id, "poll chain cancelled");
    let last_job = snapshots.borrow().job.clone();
    snapshots.send_replace(JobSnapshot {
        job_id: job_id.to_string(),
        phase: JobPhase::Cancelled,
        job: last_job,
        error: None,
    });
    Err(JobError::Cancelled)
}
