//! Pipeline orchestration
//!
//! Contains the ValidationPipeline that wires the stages together, drives
//! the state machine and hands the ordered groups to the sink.

use crossbeam_channel::{after, bounded, select, Receiver, RecvTimeoutError, Sender};
use std::io;
use std::sync::Arc;
use std::thread::{self, Scope, ScopedJoinHandle};
use std::time::{Duration, Instant};

use crate::debug::DebugLog;
use crate::error::PipelineError;
use crate::record::{MalformedRecord, RawFields, Record};
use crate::rules::RuleEngine;
use crate::stats::CompletionReport;

use super::builder::{builder_stage, BuilderQueues, BuilderStats};
use super::cancel::{CancelReason, CancelToken};
use super::collector::collect_stream;
use super::ingest::{ingest_stage, IngestStats};
use super::orderer::{order_groups, order_malformed};
use super::sink::GroupSink;
use super::types::{
    GroupKind, MalformedPolicy, PipelineConfig, PipelineState, RawBatch, StateProbe,
};
use super::worker::{run_pool, PoolQueues, WorkerStats};

/// How long a cancelled run waits for the ingest thread to notice.
const INGEST_GRACE: Duration = Duration::from_millis(500);

/// Observer called once with the report of a completed run.
pub type CompletionHook = Box<dyn Fn(&CompletionReport) + Send>;

/// One run of the validation pipeline. Consumed by [`ValidationPipeline::run`];
/// build a new one for the next input.
pub struct ValidationPipeline {
    engine: Arc<RuleEngine>,
    config: PipelineConfig,
    cancel: CancelToken,
    probe: StateProbe,
    hook: Option<CompletionHook>,
    debug: DebugLog,
}

/// Everything the concurrent stages produced, already ordered.
struct Collected {
    ingest: IngestStats,
    built: BuilderStats,
    pool: WorkerStats,
    accepted: Vec<Record>,
    rejected: Vec<Record>,
    malformed: Vec<MalformedRecord>,
}

impl ValidationPipeline {
    pub fn new(engine: Arc<RuleEngine>, config: PipelineConfig) -> Self {
        Self {
            engine,
            config,
            cancel: CancelToken::new(),
            probe: StateProbe::new(),
            hook: None,
            debug: DebugLog::disabled(),
        }
    }

    /// Handle that stops this run from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Handle that keeps reporting the state after `run` has consumed the pipeline.
    pub fn state_probe(&self) -> StateProbe {
        self.probe.clone()
    }

    pub fn state(&self) -> PipelineState {
        self.probe.get()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn with_completion_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&CompletionReport) + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn with_debug(mut self, debug: DebugLog) -> Self {
        self.debug = debug;
        self
    }

    /// Run the pipeline over `source` and hand the ordered groups to `sink`.
    ///
    /// On any failure or cancellation nothing reaches the sink.
    pub fn run<S, K>(self, source: S, sink: &mut K) -> Result<CompletionReport, PipelineError>
    where
        S: IntoIterator<Item = io::Result<RawFields>>,
        S::IntoIter: Send + 'static,
        K: GroupSink + ?Sized,
    {
        if let Err(e) = self.config.validate() {
            self.probe.set(PipelineState::Failed);
            return Err(e);
        }

        let start = Instant::now();
        self.probe.set(PipelineState::Running);
        self.debug.log_basic(
            "pipeline",
            &format!(
                "starting with {} workers, {} rules, queue capacity {}, batch size {}",
                self.config.workers,
                self.engine.len(),
                self.config.queue_capacity,
                self.config.batch_size
            ),
        );

        let outcome = self
            .execute(source.into_iter())
            .and_then(|collected| self.dispatch(collected, sink, start));

        match outcome {
            Ok(report) => {
                self.probe.set(PipelineState::Complete);
                self.debug.log_basic("pipeline", &report.format_summary());
                if let Some(hook) = &self.hook {
                    hook(&report);
                }
                Ok(report)
            }
            Err(e) => {
                let state = if e.is_cancellation() {
                    PipelineState::Cancelled
                } else {
                    PipelineState::Failed
                };
                self.probe.set(state);
                self.debug.log_basic("pipeline", &format!("stopped: {}", e));
                Err(e)
            }
        }
    }

    fn execute<I>(&self, source: I) -> Result<Collected, PipelineError>
    where
        I: Iterator<Item = io::Result<RawFields>> + Send + 'static,
    {
        let cancel = &self.cancel;
        let debug = &self.debug;

        thread::scope(|scope| {
            // Dropping done_tx releases the watchdog once the stages are finished
            let (done_tx, done_rx) = bounded::<()>(0);
            let watchdog = self.config.deadline.map(|deadline| {
                spawn_stage(scope, "watchdog", move || {
                    watch_deadline(deadline, done_rx, cancel, debug)
                })
            });

            let outcome = self.run_stages(scope, source);
            drop(done_tx);

            let watchdog = watchdog.map(|spawned| join_stage(spawned, "watchdog", cancel));
            let collected = outcome?;
            if let Some(result) = watchdog {
                result?;
            }

            // The watchdog is joined, so a deadline can no longer fire
            // unnoticed between the last stage returning and this check
            if cancel.is_cancelled() {
                return Err(self.resolve_failure(std::iter::empty()));
            }
            Ok(collected)
        })
    }

    fn run_stages<'scope, 'env, I>(
        &'env self,
        scope: &'scope Scope<'scope, 'env>,
        source: I,
    ) -> Result<Collected, PipelineError>
    where
        I: Iterator<Item = io::Result<RawFields>> + Send + 'static,
    {
        let cancel = &self.cancel;
        let probe = &self.probe;
        let debug = &self.debug;
        let engine: &RuleEngine = &self.engine;
        let capacity = self.config.queue_capacity;
        let batch_size = self.config.batch_size;
        let workers = self.config.workers;
        let policy = self.config.malformed_policy;

        let (raw_tx, raw_rx) = bounded(capacity);
        let (record_tx, record_rx) = bounded(capacity);
        let (malformed_tx, malformed_rx) = bounded(capacity);
        let (accepted_tx, accepted_rx) = bounded(capacity);
        let (rejected_tx, rejected_rx) = bounded(capacity);

        // Each stage owns the senders it produces into; they close when it returns
        let ingest = spawn_ingest(
            source,
            raw_tx,
            batch_size,
            cancel.clone(),
            probe.clone(),
            *debug,
        );
        let builder = spawn_stage(scope, "builder", move || {
            let queues = BuilderQueues {
                raw: raw_rx,
                records: record_tx,
                malformed: malformed_tx,
            };
            builder_stage(queues, policy, cancel, debug)
        });
        let pool = spawn_stage(scope, "pool", move || {
            let queues = PoolQueues {
                records: record_rx,
                accepted: accepted_tx,
                rejected: rejected_tx,
            };
            run_pool(workers, queues, engine, cancel, debug)
        });
        let accepted = spawn_stage(scope, "accepted-collector", move || {
            collect_stream("accepted-collector", accepted_rx, cancel, debug)
        });
        let rejected = spawn_stage(scope, "rejected-collector", move || {
            collect_stream("rejected-collector", rejected_rx, cancel, debug)
        });
        let malformed = spawn_stage(scope, "malformed-collector", move || {
            collect_stream("malformed-collector", malformed_rx, cancel, debug)
        });

        let builder = join_stage(builder, "builder", cancel);
        let pool = join_stage(pool, "worker pool", cancel);
        let accepted = join_stage(accepted, "accepted collector", cancel);
        let rejected = join_stage(rejected, "rejected collector", cancel);
        let malformed = join_stage(malformed, "malformed collector", cancel);
        let ingest = await_ingest(ingest, cancel);

        let mut collected = match (ingest, builder, pool, accepted, rejected, malformed) {
            (Ok(ingest), Ok(built), Ok(pool), Ok(accepted), Ok(rejected), Ok(malformed)) => {
                Collected {
                    ingest,
                    built,
                    pool,
                    accepted,
                    rejected,
                    malformed,
                }
            }
            (ingest, builder, pool, accepted, rejected, malformed) => {
                let errors = [
                    ingest.err(),
                    builder.err(),
                    pool.err(),
                    accepted.err(),
                    rejected.err(),
                    malformed.err(),
                ];
                return Err(self.resolve_failure(errors.into_iter().flatten()));
            }
        };

        debug_assert_eq!(
            collected.built.records,
            collected.accepted.len() as u64 + collected.rejected.len() as u64
        );
        debug_assert_eq!(collected.pool.accepted, collected.accepted.len() as u64);

        order_groups(&mut collected.accepted, &mut collected.rejected)?;
        order_malformed(&mut collected.malformed);
        debug.log_basic("orderer", "groups sorted by identifier");
        Ok(collected)
    }

    /// Pick the error that explains the run best: a real stage failure
    /// first (in pipeline order), then the deadline, then plain cancellation.
    fn resolve_failure(&self, errors: impl Iterator<Item = PipelineError>) -> PipelineError {
        for e in errors {
            if !e.is_cancellation() {
                return e;
            }
        }

        match self.cancel.reason() {
            Some(CancelReason::Deadline) => {
                PipelineError::DeadlineExceeded(self.config.deadline.unwrap_or_default())
            }
            _ => PipelineError::Cancelled,
        }
    }

    fn dispatch<K>(
        &self,
        collected: Collected,
        sink: &mut K,
        start: Instant,
    ) -> Result<CompletionReport, PipelineError>
    where
        K: GroupSink + ?Sized,
    {
        let Collected {
            ingest,
            built: _,
            pool: _,
            accepted,
            rejected,
            malformed,
        } = collected;

        let accepted_count = accepted.len() as u64;
        let rejected_count = rejected.len() as u64;
        let malformed_count = malformed.len() as u64;

        sink.emit(GroupKind::Accepted, accepted)
            .map_err(PipelineError::Sink)?;
        sink.emit(GroupKind::Rejected, rejected)
            .map_err(PipelineError::Sink)?;
        if self.config.malformed_policy == MalformedPolicy::Divert {
            sink.emit_malformed(malformed)
                .map_err(PipelineError::Sink)?;
        }
        self.debug.log_basic(
            "sink",
            &format!(
                "dispatched {} accepted, {} rejected, {} malformed",
                accepted_count, rejected_count, malformed_count
            ),
        );

        Ok(CompletionReport {
            rows_read: ingest.rows_read,
            accepted: accepted_count,
            rejected: rejected_count,
            malformed: malformed_count,
            workers: self.config.workers,
            batches: ingest.batches,
            elapsed: start.elapsed(),
        })
    }
}

/// The source may block on input that never arrives (an idle stdin), so
/// ingest runs detached and reports back over a channel instead of a join.
fn spawn_ingest<I>(
    source: I,
    raw_tx: Sender<RawBatch>,
    batch_size: usize,
    cancel: CancelToken,
    probe: StateProbe,
    debug: DebugLog,
) -> io::Result<Receiver<Result<IngestStats, PipelineError>>>
where
    I: Iterator<Item = io::Result<RawFields>> + Send + 'static,
{
    let (result_tx, result_rx) = bounded(1);
    thread::Builder::new()
        .name("rulesplit-ingest".to_string())
        .spawn(move || {
            let result = ingest_stage(source, raw_tx, batch_size, &cancel, &probe, &debug);
            let _ = result_tx.send(result);
        })?;
    Ok(result_rx)
}

/// Collect the ingest result once every other stage has returned. After a
/// cancellation the source may be stuck in a read, so it only gets a grace
/// period and is then abandoned.
fn await_ingest(
    spawned: io::Result<Receiver<Result<IngestStats, PipelineError>>>,
    cancel: &CancelToken,
) -> Result<IngestStats, PipelineError> {
    let result_rx = spawned.map_err(|source| {
        cancel.cancel_with(CancelReason::StageFailed);
        PipelineError::Spawn {
            stage: "ingest",
            source,
        }
    })?;

    let received = if cancel.is_cancelled() {
        result_rx.recv_timeout(INGEST_GRACE).map_err(|e| match e {
            RecvTimeoutError::Timeout => PipelineError::Cancelled,
            RecvTimeoutError::Disconnected => PipelineError::StagePanicked("ingest"),
        })
    } else {
        result_rx
            .recv()
            .map_err(|_| PipelineError::StagePanicked("ingest"))
    };
    received?
}

fn spawn_stage<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    name: &str,
    body: F,
) -> io::Result<ScopedJoinHandle<'scope, Result<T, PipelineError>>>
where
    F: FnOnce() -> Result<T, PipelineError> + Send + 'scope,
    T: Send + 'scope,
{
    thread::Builder::new()
        .name(format!("rulesplit-{}", name))
        .spawn_scoped(scope, body)
}

/// Join a stage, turning spawn failures and panics into errors. Either one
/// cancels the rest of the run so no other stage waits on it forever.
fn join_stage<T>(
    spawned: io::Result<ScopedJoinHandle<'_, Result<T, PipelineError>>>,
    stage: &'static str,
    cancel: &CancelToken,
) -> Result<T, PipelineError> {
    let handle = spawned.map_err(|source| {
        cancel.cancel_with(CancelReason::StageFailed);
        PipelineError::Spawn { stage, source }
    })?;

    handle.join().unwrap_or_else(|_| {
        cancel.cancel_with(CancelReason::StageFailed);
        Err(PipelineError::StagePanicked(stage))
    })
}

fn watch_deadline(
    deadline: Duration,
    done: Receiver<()>,
    cancel: &CancelToken,
    debug: &DebugLog,
) -> Result<(), PipelineError> {
    select! {
        recv(after(deadline)) -> _ => {
            debug.log_basic(
                "watchdog",
                &format!("deadline of {} reached, cancelling", humantime::format_duration(deadline)),
            );
            cancel.cancel_with(CancelReason::Deadline);
        }
        recv(done) -> _ => {}
        recv(cancel.signal()) -> _ => {}
    }
    Ok(())
}
