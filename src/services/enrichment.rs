//! Enrichment Queue
//!
//! Bounded worker pool for the best-effort background work the interview
//! flow fires off: dossier extraction, red-flag detection, and full client
//! evaluation. Jobs that fail or time out are logged and dropped; they never
//! unwind into the conversation state machine.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};
use vetting_llm::LlmProvider;

use crate::services::dossier::DossierExtractor;
use crate::services::red_flags::RedFlagDetector;
use crate::services::scoring::ScoringEngine;
use crate::storage::Database;

/// One unit of background enrichment work
#[derive(Debug, Clone)]
pub enum EnrichmentJob {
    ExtractDossier {
        client_id: i64,
        conversation_id: i64,
    },
    DetectRedFlags {
        client_id: i64,
        conversation_id: i64,
    },
    EvaluateClient {
        client_id: i64,
    },
}

impl EnrichmentJob {
    fn kind(&self) -> &'static str {
        match self {
            Self::ExtractDossier { .. } => "extract_dossier",
            Self::DetectRedFlags { .. } => "detect_red_flags",
            Self::EvaluateClient { .. } => "evaluate_client",
        }
    }
}

/// Handle to the running worker pool. Cheap to clone.
#[derive(Clone)]
pub struct EnrichmentQueue {
    tx: mpsc::Sender<EnrichmentJob>,
}

impl EnrichmentQueue {
    /// Default queue depth before enqueues start getting dropped
    pub const DEFAULT_CAPACITY: usize = 64;
    /// Default worker count
    pub const DEFAULT_WORKERS: usize = 2;
    /// Per-job deadline; a hung capability call never wedges a worker
    pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(120);

    /// Spawn the worker pool and return its handle.
    pub fn start(db: Database, provider: Arc<dyn LlmProvider>) -> Self {
        Self::start_with(
            db,
            provider,
            Self::DEFAULT_WORKERS,
            Self::DEFAULT_CAPACITY,
            Self::DEFAULT_JOB_TIMEOUT,
        )
    }

    pub fn start_with(
        db: Database,
        provider: Arc<dyn LlmProvider>,
        workers: usize,
        capacity: usize,
        job_timeout: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let rx = Arc::new(Mutex::new(rx));

        for worker_id in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let db = db.clone();
            let provider = Arc::clone(&provider);
            tokio::spawn(async move {
                worker_loop(worker_id, rx, db, provider, job_timeout).await;
            });
        }
        info!(workers, capacity, "Enrichment queue started");

        Self { tx }
    }

    /// Submit a job without blocking the caller.
    ///
    /// A full queue drops the job with a warning; enrichment is best-effort
    /// and must never stall the user-facing flow.
    pub fn enqueue(&self, job: EnrichmentJob) {
        let kind = job.kind();
        match self.tx.try_send(job) {
            Ok(()) => debug!(kind, "Enrichment job enqueued"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(kind, "Enrichment queue full, dropping job");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(kind, "Enrichment queue closed, dropping job");
            }
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<EnrichmentJob>>>,
    db: Database,
    provider: Arc<dyn LlmProvider>,
    job_timeout: Duration,
) {
    loop {
        let job = {
            let mut rx = rx.lock().await;
            rx.recv().await
        };
        let Some(job) = job else {
            debug!(worker_id, "Enrichment worker shutting down");
            return;
        };

        let kind = job.kind();
        match tokio::time::timeout(job_timeout, run_job(&db, &provider, job)).await {
            Ok(Ok(())) => debug!(worker_id, kind, "Enrichment job finished"),
            Ok(Err(e)) => error!(worker_id, kind, error = %e, "Enrichment job failed"),
            Err(_) => error!(worker_id, kind, "Enrichment job timed out"),
        }
    }
}

async fn run_job(
    db: &Database,
    provider: &Arc<dyn LlmProvider>,
    job: EnrichmentJob,
) -> crate::utils::error::AppResult<()> {
    match job {
        EnrichmentJob::ExtractDossier {
            client_id,
            conversation_id,
        } => {
            DossierExtractor::new(db.clone(), Arc::clone(provider))
                .extract_from_transcript(client_id, conversation_id)
                .await
        }
        EnrichmentJob::DetectRedFlags {
            client_id,
            conversation_id,
        } => {
            RedFlagDetector::new(db.clone(), Arc::clone(provider))
                .detect(client_id, conversation_id)
                .await
        }
        EnrichmentJob::EvaluateClient { client_id } => {
            ScoringEngine::new(db.clone(), Arc::clone(provider))
                .evaluate_client(client_id)
                .await
                .map(|_| ())
        }
    }
}
