//! Fixed-interval polling for server-side asynchronous jobs.
//!
//! Analyze actions return as soon as the server has queued the work; the result shows up
//! later on the subject's detail resource. [`JobPoller`] owns the status checks from that
//! point on: it waits one interval, queries a [`JobStatusSource`], and repeats until the job
//! completes, fails, or the attempt budget runs out. [`JobPoller::spawn`] runs the same loop
//! on a background task and returns a [`PollHandle`] whose cancellation drops the pending
//! timer before another query can be issued.

// crates.io
use tokio::{sync::watch, task::JoinHandle};
// self
use crate::{
	_prelude::*,
	auth::JobId,
	error::ConfigError,
	obs::{self, PipelineSpan, Stage, StageOutcome},
};

/// Boxed future returned by [`JobStatusSource::status`].
pub type StatusFuture<'a, T> = Pin<Box<dyn Future<Output = Result<JobStatus<T>>> + 'a + Send>>;

/// Source of job status snapshots.
pub trait JobStatusSource<T>
where
	Self: Send + Sync,
{
	/// Queries the current status of `job` once.
	fn status<'a>(&'a self, job: &'a JobId) -> StatusFuture<'a, T>;
}

/// Status snapshot of a server-side job.
#[derive(Clone, Debug, PartialEq)]
pub enum JobStatus<T> {
	/// Work is queued or running.
	Pending,
	/// Work finished with a result payload.
	Complete(T),
	/// Work finished without a result.
	Failed {
		/// Server-supplied reason.
		reason: String,
	},
}

/// Cadence and budget for a polling cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
	/// Delay before each status query.
	pub interval: Duration,
	/// Number of status queries issued before giving up.
	pub max_attempts: u32,
	/// Treat network, timeout, rate-limit, and 5xx query failures as a spent attempt
	/// instead of a terminal error.
	pub tolerate_transient: bool,
}
impl PollConfig {
	/// Creates a config with the given cadence and budget.
	pub fn new(interval: Duration, max_attempts: u32) -> Self {
		Self { interval, max_attempts, ..Self::default() }
	}

	/// Overrides whether transient query failures are tolerated.
	pub fn with_tolerate_transient(mut self, tolerate: bool) -> Self {
		self.tolerate_transient = tolerate;

		self
	}

	/// Checks that the interval is positive and at least one attempt is allowed.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if !self.interval.is_positive() || self.max_attempts == 0 {
			return Err(ConfigError::InvalidPollConfig);
		}

		Ok(())
	}
}
impl Default for PollConfig {
	fn default() -> Self {
		Self { interval: Duration::seconds(2), max_attempts: 15, tolerate_transient: true }
	}
}

/// Drives status queries for jobs exposed by a [`JobStatusSource`].
pub struct JobPoller<S>
where
	S: ?Sized,
{
	source: Arc<S>,
}
impl<S> JobPoller<S>
where
	S: ?Sized,
{
	/// Creates a poller backed by `source`.
	pub fn new(source: Arc<S>) -> Self {
		Self { source }
	}

	/// Polls `job` until it completes, fails, or `config.max_attempts` queries were issued.
	///
	/// Dropping the returned future stops the cycle and releases its timer.
	pub async fn poll_until_done<T>(&self, job: &JobId, config: &PollConfig) -> Result<T>
	where
		S: JobStatusSource<T>,
	{
		config.validate()?;

		run_cycle(self.source.as_ref(), job, config, None).await
	}

	/// Starts polling `job` on a background task.
	pub fn spawn<T>(&self, job: JobId, config: PollConfig) -> PollHandle<T>
	where
		S: 'static + JobStatusSource<T>,
		T: 'static + Send,
	{
		let (cancel, cancelled) = watch::channel(false);
		let source = self.source.clone();
		let task_job = job.clone();
		let task = tokio::spawn(async move {
			config.validate()?;

			run_cycle(source.as_ref(), &task_job, &config, Some(cancelled)).await
		});

		PollHandle { job, cancel, task }
	}
}
impl<S> Clone for JobPoller<S>
where
	S: ?Sized,
{
	fn clone(&self) -> Self {
		Self { source: self.source.clone() }
	}
}
impl<S> Debug for JobPoller<S>
where
	S: ?Sized,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("JobPoller(..)")
	}
}

/// Owner handle for a spawned polling cycle.
///
/// Dropping the handle cancels the cycle.
#[derive(Debug)]
pub struct PollHandle<T> {
	job: JobId,
	cancel: watch::Sender<bool>,
	task: JoinHandle<Result<T>>,
}
impl<T> PollHandle<T> {
	/// Job being polled.
	pub fn job(&self) -> &JobId {
		&self.job
	}

	/// Stops the cycle; no status query starts after this call returns.
	pub fn cancel(&self) {
		self.cancel.send_replace(true);
	}

	/// Returns `true` once the cycle has resolved.
	pub fn is_finished(&self) -> bool {
		self.task.is_finished()
	}

	/// Waits for the cycle's terminal outcome.
	pub async fn join(self) -> Result<T> {
		let Self { job, cancel, task } = self;
		let outcome = task.await;

		drop(cancel);

		outcome.unwrap_or_else(|_| Err(Error::PollCancelled { job: job.to_string() }))
	}
}

async fn run_cycle<S, T>(
	source: &S,
	job: &JobId,
	config: &PollConfig,
	mut cancelled: Option<watch::Receiver<bool>>,
) -> Result<T>
where
	S: ?Sized + JobStatusSource<T>,
{
	const STAGE: Stage = Stage::Poll;

	let span = PipelineSpan::new(STAGE, "poll_until_done");

	obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

	let result = span
		.instrument(async move {
			let interval = config.interval.unsigned_abs();

			for _ in 0..config.max_attempts {
				if !tick(interval, cancelled.as_mut()).await {
					return Err(Error::PollCancelled { job: job.to_string() });
				}

				match source.status(job).await {
					Ok(JobStatus::Complete(result)) => return Ok(result),
					Ok(JobStatus::Failed { reason }) =>
						return Err(Error::JobFailed { job: job.to_string(), reason }),
					Ok(JobStatus::Pending) => {},
					Err(err) if config.tolerate_transient && err.is_transient() =>
						obs::poll_query_failed(job, &err),
					Err(err) => return Err(err),
				}
			}

			Err(Error::PollBudgetExhausted { job: job.to_string(), attempts: config.max_attempts })
		})
		.await;

	match &result {
		Ok(_) => obs::record_stage_outcome(STAGE, StageOutcome::Success),
		Err(_) => obs::record_stage_outcome(STAGE, StageOutcome::Failure),
	}

	result
}

/// Sleeps for one interval; returns `false` if the cycle was cancelled first.
async fn tick(interval: std::time::Duration, cancelled: Option<&mut watch::Receiver<bool>>) -> bool {
	let Some(cancelled) = cancelled else {
		tokio::time::sleep(interval).await;

		return true;
	};

	if *cancelled.borrow() {
		return false;
	}

	let interrupted = tokio::select! {
		biased;
		// Either an explicit cancel or the handle was dropped.
		_ = cancelled.changed() => true,
		_ = tokio::time::sleep(interval) => false,
	};

	!interrupted && !*cancelled.borrow()
}
