//! Sentiment analysis jobs: trigger, status mapping, and polling until a result lands.

// self
use crate::{
	_prelude::*,
	auth::JobId,
	client::ApiClient,
	error::DecodeError,
	poll::{JobPoller, JobStatus, JobStatusSource, PollHandle, StatusFuture},
	transport::{ApiRequest, ApiTransport},
};

/// Collection an analysis subject belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
	/// News item, addressed by uuid.
	News,
	/// Article, addressed by primary key.
	Article,
}
impl AnalysisKind {
	const fn collection(self) -> &'static str {
		match self {
			Self::News => "news",
			Self::Article => "articles",
		}
	}
}

/// Subject whose sentiment analysis is requested and polled.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnalysisTarget {
	/// Collection.
	pub kind: AnalysisKind,
	/// Subject identifier.
	pub id: JobId,
}
impl AnalysisTarget {
	/// Targets a news item.
	pub fn news(id: JobId) -> Self {
		Self { kind: AnalysisKind::News, id }
	}

	/// Targets an article.
	pub fn article(id: JobId) -> Self {
		Self { kind: AnalysisKind::Article, id }
	}

	/// Path of the action that queues the analysis.
	pub fn analyze_path(&self) -> String {
		format!("/{}/{}/analyze/", self.kind.collection(), self.id)
	}

	/// Path of the subject's detail resource.
	pub fn detail_path(&self) -> String {
		format!("/{}/{}/", self.kind.collection(), self.id)
	}
}

/// Sentiment analysis attached to a news item or article.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
	/// Model sentiment score.
	pub sentiment_score: f64,
	/// `positive`, `neutral`, or `negative`.
	pub sentiment_label: String,
	/// Sentiment blended with the keyword score.
	pub combined_score: f64,
	/// `high`, `medium`, or `low`.
	pub relevance: String,
	/// Score from financial keyword matches.
	pub keyword_score: f64,
	/// Tickers mentioned in the text.
	#[serde(default)]
	pub ticker_count: u32,
	/// Numeric figures mentioned in the text.
	#[serde(default)]
	pub figures_count: u32,
}

impl<T> ApiClient<T>
where
	T: ?Sized + ApiTransport,
{
	/// Queues analysis of `target`; the server acknowledges before the work runs.
	pub async fn trigger_analysis(&self, target: &AnalysisTarget) -> Result<()> {
		self.execute(ApiRequest::post(target.analyze_path())).await?;

		Ok(())
	}

	/// Reads the current analysis state of `target` once.
	pub async fn analysis_status(&self, target: &AnalysisTarget) -> Result<JobStatus<AnalysisResult>> {
		let response = self.execute(ApiRequest::get(target.detail_path())).await?;
		let status = response.status.as_u16();
		let body = response.json::<serde_json::Value>()?;

		match body.get("analysis") {
			Some(analysis @ serde_json::Value::Object(_)) => {
				let result = serde_path_to_error::deserialize(analysis.clone())
					.map_err(|e| DecodeError::json(e, status))?;

				Ok(JobStatus::Complete(result))
			},
			_ if body.get("status").and_then(serde_json::Value::as_str) == Some("failed") => {
				let reason = ["error", "detail"]
					.iter()
					.find_map(|key| body.get(*key).and_then(serde_json::Value::as_str))
					.unwrap_or("analysis failed")
					.to_owned();

				Ok(JobStatus::Failed { reason })
			},
			_ => Ok(JobStatus::Pending),
		}
	}

	/// Status source polling subjects of `kind` through this client.
	pub fn analysis_jobs(&self, kind: AnalysisKind) -> AnalysisJobs<T> {
		AnalysisJobs { client: self.clone(), kind }
	}

	/// Triggers analysis of `target` and polls with the configured defaults until it resolves.
	pub async fn analyze_and_wait(&self, target: &AnalysisTarget) -> Result<AnalysisResult> {
		self.trigger_analysis(target).await?;

		JobPoller::new(Arc::new(self.analysis_jobs(target.kind)))
			.poll_until_done(&target.id, &self.config.poll)
			.await
	}

	/// Polls an already triggered analysis on a background task.
	pub fn watch_analysis(&self, target: &AnalysisTarget) -> PollHandle<AnalysisResult> {
		JobPoller::new(Arc::new(self.analysis_jobs(target.kind)))
			.spawn(target.id.clone(), self.config.poll)
	}
}

/// [`JobStatusSource`] over the detail resources of one collection.
pub struct AnalysisJobs<T>
where
	T: ?Sized + ApiTransport,
{
	client: ApiClient<T>,
	kind: AnalysisKind,
}
impl<T> JobStatusSource<AnalysisResult> for AnalysisJobs<T>
where
	T: ?Sized + ApiTransport,
{
	fn status<'a>(&'a self, job: &'a JobId) -> StatusFuture<'a, AnalysisResult> {
		Box::pin(async move {
			let target = AnalysisTarget { kind: self.kind, id: job.clone() };

			self.client.analysis_status(&target).await
		})
	}
}
impl<T> Debug for AnalysisJobs<T>
where
	T: ?Sized + ApiTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AnalysisJobs").field("kind", &self.kind).finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn target_paths_follow_collections() {
		let news = AnalysisTarget::news(
			JobId::new("2f1c9a4e-7d0b-4c43-9b7e-5e3a1f0c2d11").expect("UUID should be valid."),
		);
		let article = AnalysisTarget::article(JobId::new("42").expect("Key should be valid."));

		assert_eq!(news.analyze_path(), "/news/2f1c9a4e-7d0b-4c43-9b7e-5e3a1f0c2d11/analyze/");
		assert_eq!(article.detail_path(), "/articles/42/");
	}

	#[test]
	fn analysis_result_decodes_serializer_payload() {
		let result: AnalysisResult = serde_json::from_value(serde_json::json!({
			"sentiment_score": 0.82,
			"sentiment_label": "positive",
			"combined_score": 0.7,
			"relevance": "high",
			"keyword_score": 0.4,
			"ticker_count": 2,
			"figures_count": 1,
		}))
		.expect("Serializer payload should decode.");

		assert_eq!(result.sentiment_label, "positive");
		assert_eq!(result.ticker_count, 2);
	}
}
