//! Persistent matcher worker pool
//!
//! The pool owns N long-lived worker threads. A run proceeds in rounds: the
//! driver sends one command to every worker over that worker's bounded
//! channel, then waits until all N have acknowledged it before sending the
//! next. A run is the sequence
//!
//! ```text
//! Begin(task) ; for each file: NewFile, Line*, EndOfFile ; EndRun
//! ```
//!
//! where `task` carries the run's file set, the worker's partition of
//! candidate indices, the target store and the cancel flag. Because each
//! worker receives its own copy of every line and no command is sent before
//! the previous round is fully acknowledged, no worker ever sees line k+1
//! while another is still matching line k.
//!
//! A worker that panics or reports an error, a worker whose thread is gone,
//! and a round that is not acknowledged within the round timeout all abort
//! the run with a [`ConcurrencyFault`]. Every abort trips the run's own abort
//! flag before the error is returned, and workers commit only while that flag
//! is clear and the store is still at the run's generation, so a straggler
//! can never write into a reset store. Workers that did not answer an aborted
//! round are retired and replaced before the next run starts.

use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use depscan_core::GraphStore;

use crate::cancel::CancelFlag;
use crate::error::{ConcurrencyFault, MatchError, MatchResult};
use crate::lines::LossyLines;
use crate::partition::partitions;
use crate::strategy::{FileSet, Matcher, RunStats, commit, match_line};

/// Upper bound on how long a waiting driver goes without checking its
/// cancel flag.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Everything a worker needs for one run.
struct RunTask {
    files: Arc<FileSet>,
    partition: Range<usize>,
    store: Arc<GraphStore>,
    generation: u64,
    cancel: CancelFlag,
    /// Tripped by the driver when the run is abandoned.
    abort: CancelFlag,
    #[cfg(test)]
    failpoint: Option<Failpoint>,
}

impl RunTask {
    fn stopped(&self) -> bool {
        self.abort.is_cancelled() || self.cancel.is_cancelled()
    }
}

enum Command {
    Begin(RunTask),
    NewFile { file: usize },
    Line { file: usize, line: Arc<str> },
    EndOfFile,
    EndRun,
    Shutdown,
}

struct Envelope {
    round: u64,
    command: Command,
}

enum Outcome {
    Done { edges: usize },
    Failed { message: String },
}

struct Ack {
    worker: usize,
    round: u64,
    outcome: Outcome,
}

/// Fault injection for tests: worker 0 misbehaves on the given line.
#[cfg(test)]
#[derive(Clone, Debug)]
pub(crate) enum Failpoint {
    Panic(Arc<str>),
    Stall(Arc<str>, Duration),
}

/// Per-thread matcher state.
struct Worker {
    id: usize,
    task: Option<RunTask>,
    current: Option<usize>,
    candidates: Vec<usize>,
    staged: Vec<usize>,
}

impl Worker {
    fn new(id: usize) -> Self {
        Self {
            id,
            task: None,
            current: None,
            candidates: Vec::new(),
            staged: Vec::new(),
        }
    }

    fn reset(&mut self) {
        self.task = None;
        self.current = None;
        self.candidates.clear();
        self.staged.clear();
    }

    /// Handle one round. Returns the number of edges committed.
    fn handle(&mut self, command: Command) -> Result<usize, String> {
        match command {
            Command::Begin(task) => {
                self.reset();
                self.task = Some(task);
                Ok(0)
            }
            Command::NewFile { file } => {
                let Some(task) = &self.task else {
                    return Err("new file outside of a run".to_string());
                };
                self.candidates.clear();
                self.candidates.extend(task.partition.clone());
                self.current = Some(file);
                Ok(0)
            }
            Command::Line { file, line } => {
                let Some(task) = &self.task else {
                    return Err("line outside of a run".to_string());
                };
                if self.current != Some(file) {
                    return Err(format!("line for file {file} arrived outside of that file"));
                }

                #[cfg(test)]
                if self.id == 0 {
                    match &task.failpoint {
                        Some(Failpoint::Panic(at)) if **at == *line => panic!("injected worker fault"),
                        Some(Failpoint::Stall(at, pause)) if **at == *line => std::thread::sleep(*pause),
                        _ => {}
                    }
                }

                if task.stopped() || self.candidates.is_empty() {
                    return Ok(0);
                }
                self.staged.clear();
                match_line(&task.files, file, &line, &mut self.candidates, &mut self.staged);
                if task.stopped() {
                    return Ok(0);
                }
                Ok(commit(&task.files, file, &self.staged, &task.store, task.generation))
            }
            Command::EndOfFile => {
                self.current = None;
                self.candidates.clear();
                Ok(0)
            }
            Command::EndRun => {
                self.reset();
                Ok(0)
            }
            Command::Shutdown => Ok(0),
        }
    }
}

fn run_worker(mut worker: Worker, commands: Receiver<Envelope>, acks: Sender<Ack>) {
    tracing::debug!("Matcher worker {} started", worker.id);

    while let Ok(Envelope { round, command }) = commands.recv() {
        if matches!(command, Command::Shutdown) {
            break;
        }
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| worker.handle(command))) {
            Ok(Ok(edges)) => Outcome::Done { edges },
            Ok(Err(message)) => Outcome::Failed { message },
            Err(payload) => {
                worker.reset();
                Outcome::Failed {
                    message: panic_message(payload.as_ref()),
                }
            }
        };
        let ack = Ack {
            worker: worker.id,
            round,
            outcome,
        };
        if acks.send(ack).is_err() {
            break;
        }
    }

    tracing::debug!("Matcher worker {} shutting down", worker.id);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

struct WorkerHandle {
    commands: SyncSender<Envelope>,
    thread: Option<JoinHandle<()>>,
    retired: bool,
}

impl WorkerHandle {
    fn spawn(id: usize, acks: Sender<Ack>) -> MatchResult<Self> {
        let (commands, receiver) = mpsc::sync_channel(1);
        let thread = std::thread::Builder::new()
            .name(format!("depscan-matcher-{id}"))
            .spawn(move || run_worker(Worker::new(id), receiver, acks))
            .map_err(MatchError::Spawn)?;
        Ok(Self {
            commands,
            thread: Some(thread),
            retired: false,
        })
    }

    fn is_dead(&self) -> bool {
        self.retired || self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

struct PoolInner {
    workers: Vec<WorkerHandle>,
    acks: Receiver<Ack>,
    ack_sender: Sender<Ack>,
    round: u64,
    shut_down: bool,
    #[cfg(test)]
    failpoint: Option<Failpoint>,
}

impl PoolInner {
    /// Replace workers retired by an aborted run or whose thread has exited.
    fn respawn_dead(&mut self) -> MatchResult<()> {
        for slot in 0..self.workers.len() {
            if self.workers[slot].is_dead() {
                tracing::warn!("Respawning matcher worker {}", slot);
                // Dropping the old handle closes its channel and detaches the thread.
                self.workers[slot] = WorkerHandle::spawn(slot, self.ack_sender.clone())?;
            }
        }
        Ok(())
    }

    /// One lock-step round: deliver `make(slot)` to every worker, then wait
    /// until all of them acknowledge. Returns the edges committed.
    fn round<F>(&mut self, timeout: Duration, cancel: &CancelFlag, make: F) -> MatchResult<usize>
    where
        F: Fn(usize) -> Command,
    {
        if cancel.is_cancelled() {
            return Err(MatchError::Cancelled);
        }
        self.round += 1;
        let round = self.round;
        let deadline = Instant::now() + timeout;
        let mut waiting = vec![false; self.workers.len()];

        for slot in 0..self.workers.len() {
            let mut envelope = Envelope {
                round,
                command: make(slot),
            };
            loop {
                match self.workers[slot].commands.try_send(envelope) {
                    Ok(()) => break,
                    Err(TrySendError::Full(back)) => {
                        if Instant::now() >= deadline {
                            waiting[slot] = true;
                            return Err(self.timed_out(&waiting, timeout));
                        }
                        if cancel.is_cancelled() {
                            return Err(MatchError::Cancelled);
                        }
                        envelope = back;
                        std::thread::sleep(Duration::from_millis(1));
                    }
                    Err(TrySendError::Disconnected(_)) => {
                        self.workers[slot].retired = true;
                        return Err(ConcurrencyFault::WorkerLost { worker: slot }.into());
                    }
                }
            }
            waiting[slot] = true;
        }

        let mut pending = waiting.len();
        let mut edges = 0;
        while pending > 0 {
            let now = Instant::now();
            if now >= deadline {
                return Err(self.timed_out(&waiting, timeout));
            }
            if cancel.is_cancelled() {
                return Err(MatchError::Cancelled);
            }
            match self.acks.recv_timeout((deadline - now).min(POLL_INTERVAL)) {
                // Late answer to an aborted round.
                Ok(ack) if ack.round != round => continue,
                Ok(Ack {
                    worker,
                    outcome: Outcome::Done { edges: committed },
                    ..
                }) => {
                    if std::mem::replace(&mut waiting[worker], false) {
                        pending -= 1;
                        edges += committed;
                    }
                }
                Ok(Ack {
                    worker,
                    outcome: Outcome::Failed { message },
                    ..
                }) => {
                    return Err(ConcurrencyFault::WorkerFailed { worker, message }.into());
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    let worker = waiting.iter().position(|w| *w).unwrap_or(0);
                    return Err(ConcurrencyFault::WorkerLost { worker }.into());
                }
            }
        }
        Ok(edges)
    }

    fn timed_out(&mut self, waiting: &[bool], timeout: Duration) -> MatchError {
        let mut pending = 0;
        for (slot, &outstanding) in waiting.iter().enumerate() {
            if outstanding {
                self.workers[slot].retired = true;
                pending += 1;
            }
        }
        ConcurrencyFault::RoundTimeout { timeout, pending }.into()
    }
}

/// Streaming matcher backed by a fixed set of worker threads.
///
/// Runs are serialized: a second caller blocks until the first run is done.
pub struct MatcherPool {
    inner: Mutex<PoolInner>,
    size: usize,
    round_timeout: Duration,
}

impl std::fmt::Debug for MatcherPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatcherPool")
            .field("size", &self.size)
            .field("round_timeout", &self.round_timeout)
            .finish()
    }
}

impl MatcherPool {
    /// Start `threads` workers (at least one).
    pub fn new(threads: usize, round_timeout: Duration) -> MatchResult<Self> {
        let size = threads.max(1);
        let (ack_sender, acks) = mpsc::channel();
        let workers = (0..size)
            .map(|id| WorkerHandle::spawn(id, ack_sender.clone()))
            .collect::<MatchResult<Vec<_>>>()?;
        tracing::info!("Matcher pool started with {} workers", size);

        Ok(Self {
            inner: Mutex::new(PoolInner {
                workers,
                acks,
                ack_sender,
                round: 0,
                shut_down: false,
                #[cfg(test)]
                failpoint: None,
            }),
            size,
            round_timeout,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    fn lock(&self) -> MutexGuard<'_, PoolInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_shut_down(&self) -> bool {
        self.lock().shut_down
    }

    #[cfg(test)]
    pub(crate) fn set_failpoint(&self, failpoint: Option<Failpoint>) {
        self.lock().failpoint = failpoint;
    }

    /// Stop accepting runs, wait for the in-flight run (if any) to finish,
    /// then stop and join every worker. Idempotent.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        if inner.shut_down {
            return;
        }
        inner.shut_down = true;

        for (slot, worker) in std::mem::take(&mut inner.workers).into_iter().enumerate() {
            let WorkerHandle {
                commands,
                thread,
                retired,
            } = worker;
            let _ = commands.try_send(Envelope {
                round: 0,
                command: Command::Shutdown,
            });
            drop(commands);
            if retired {
                continue;
            }
            if let Some(thread) = thread {
                if thread.join().is_err() {
                    tracing::warn!("Matcher worker {} exited abnormally", slot);
                }
            }
        }
        tracing::info!("Matcher pool shut down");
    }

    fn stream(
        &self,
        inner: &mut PoolInner,
        files: &Arc<FileSet>,
        store: &Arc<GraphStore>,
        cancel: &CancelFlag,
        abort: &CancelFlag,
    ) -> MatchResult<RunStats> {
        let timeout = self.round_timeout;
        let slices = partitions(files.len(), inner.workers.len());
        let generation = store.generation();
        #[cfg(test)]
        let failpoint = inner.failpoint.clone();

        inner.round(timeout, cancel, |slot| {
            Command::Begin(RunTask {
                files: Arc::clone(files),
                partition: slices[slot].clone(),
                store: Arc::clone(store),
                generation,
                cancel: cancel.clone(),
                abort: abort.clone(),
                #[cfg(test)]
                failpoint: failpoint.clone(),
            })
        })?;

        let mut stats = RunStats::default();
        for file in 0..files.len() {
            let path = files.path(file);
            tracing::debug!("Streaming {}", path.display());
            let lines = LossyLines::open(path).map_err(|e| MatchError::file_access(path, e))?;

            inner.round(timeout, cancel, |_| Command::NewFile { file })?;
            for line in lines {
                let line: Arc<str> = line.map_err(|e| MatchError::file_access(path, e))?.into();
                stats.lines += 1;
                stats.edges += inner.round(timeout, cancel, |_| Command::Line {
                    file,
                    line: Arc::clone(&line),
                })?;
            }
            inner.round(timeout, cancel, |_| Command::EndOfFile)?;
            stats.files += 1;
        }

        inner.round(timeout, cancel, |_| Command::EndRun)?;
        Ok(stats)
    }
}

impl Matcher for MatcherPool {
    fn name(&self) -> &'static str {
        "streaming"
    }

    fn scan(
        &self,
        files: Arc<FileSet>,
        store: &Arc<GraphStore>,
        cancel: &CancelFlag,
    ) -> MatchResult<RunStats> {
        let mut inner = self.lock();
        if inner.shut_down {
            return Err(MatchError::PoolShutDown);
        }
        inner.respawn_dead()?;

        let abort = CancelFlag::new();
        let result = self.stream(&mut inner, &files, store, cancel, &abort);
        if let Err(e) = &result {
            abort.cancel();
            // Release the run's file set and store held by idle workers.
            if !e.is_concurrency_fault() {
                let _ = inner.round(self.round_timeout, &CancelFlag::new(), |_| Command::EndRun);
            }
        }
        result
    }

    fn shutdown(&self) {
        MatcherPool::shutdown(self);
    }
}

impl Drop for MatcherPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
