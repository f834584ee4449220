//! Poller - registry surface and the cycle loop
//!
//! Each cycle:
//! 1. dispatch every due item to the worker pool
//! 2. wait `settle_delay` for fast samplers, serving commands meanwhile
//! 3. drain completed items without blocking and fold them back into the registry
//! 4. hand the successful ones to the sink as one `PollBatch`
//! 5. sleep out the rest of `cycle_period` (no sleep after an overrun)
//!
//! Before `start` the registry is edited in place. Afterwards the cycle task
//! owns it and every registry call becomes a command answered over a oneshot.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{DataSink, ItemDefinition, ItemSnapshot, PollBatch};
use samplers::SamplerRegistry;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, instrument, warn};

use crate::{CycleStats, CycleStatsSnapshot, ItemRegistry, PollerConfig, PollerError, Restore, WorkerPool};

type Reply<T> = oneshot::Sender<T>;

enum Command {
    Add {
        definition: ItemDefinition,
        reply: Reply<Result<ItemSnapshot, PollerError>>,
    },
    Delete {
        name: String,
        reply: Reply<Result<ItemSnapshot, PollerError>>,
    },
    Get {
        name: String,
        reply: Reply<Result<ItemSnapshot, PollerError>>,
    },
    List {
        reply: Reply<Vec<ItemSnapshot>>,
    },
    Definitions {
        reply: Reply<Vec<ItemDefinition>>,
    },
    Shutdown,
}

impl Command {
    fn apply(self, registry: &mut ItemRegistry, config: &PollerConfig) {
        // A dropped receiver only means the caller stopped waiting
        match self {
            Command::Add { definition, reply } => {
                let now = Instant::now();
                let result = if config.stagger {
                    registry.add(definition, now)
                } else {
                    registry.add_due_at(definition, now)
                };
                let _ = reply.send(result);
            }
            Command::Delete { name, reply } => {
                let _ = reply.send(registry.remove(&name));
            }
            Command::Get { name, reply } => {
                let _ = reply.send(registry.get(&name));
            }
            Command::List { reply } => {
                let _ = reply.send(registry.list());
            }
            Command::Definitions { reply } => {
                let _ = reply.send(registry.definitions());
            }
            Command::Shutdown => {}
        }
    }
}

enum PollerState {
    Ready(ItemRegistry),
    Running(mpsc::Sender<Command>),
}

/// Periodic sampling scheduler
pub struct Poller {
    config: PollerConfig,
    samplers: Arc<SamplerRegistry>,
    stats: Arc<CycleStats>,
    state: Mutex<PollerState>,
}

impl Poller {
    pub fn new(config: PollerConfig, samplers: SamplerRegistry) -> Self {
        Self::with_shared_samplers(config, Arc::new(samplers))
    }

    pub fn with_shared_samplers(config: PollerConfig, samplers: Arc<SamplerRegistry>) -> Self {
        Self {
            config,
            samplers,
            stats: Arc::new(CycleStats::new()),
            state: Mutex::new(PollerState::Ready(ItemRegistry::new())),
        }
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    pub fn stats(&self) -> CycleStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_running(&self) -> bool {
        matches!(*self.lock_state(), PollerState::Running(_))
    }

    /// Register an item
    ///
    /// # Errors
    /// `ItemExists` if the name is taken (registry unchanged), `Contract` for
    /// an empty name or zero interval.
    #[instrument(name = "poller_add_item", skip(self, definition), fields(item = %definition.name))]
    pub async fn add_item(&self, definition: ItemDefinition) -> Result<ItemSnapshot, PollerError> {
        definition.check()?;
        self.execute(|reply| Command::Add { definition, reply }).await?
    }

    /// Remove an item; a sample already in flight is discarded on completion
    #[instrument(name = "poller_delete_item", skip(self))]
    pub async fn delete_item(&self, name: &str) -> Result<ItemSnapshot, PollerError> {
        let name = name.to_string();
        self.execute(|reply| Command::Delete { name, reply }).await?
    }

    pub async fn get_item(&self, name: &str) -> Result<ItemSnapshot, PollerError> {
        let name = name.to_string();
        self.execute(|reply| Command::Get { name, reply }).await?
    }

    /// Snapshots in registration order
    pub async fn list_items(&self) -> Result<Vec<ItemSnapshot>, PollerError> {
        self.execute(|reply| Command::List { reply }).await
    }

    /// Persistable definitions in registration order
    pub async fn item_definitions(&self) -> Result<Vec<ItemDefinition>, PollerError> {
        self.execute(|reply| Command::Definitions { reply }).await
    }

    /// Spawn the cycle task and its workers
    ///
    /// Successful samples are written to `sink` once per cycle.
    ///
    /// # Errors
    /// `AlreadyRunning` on any call after the first.
    #[instrument(name = "poller_start", skip(self, sink))]
    pub fn start<S>(&self, sink: S) -> Result<PollerHandle, PollerError>
    where
        S: DataSink + 'static,
    {
        let (commands_tx, commands_rx) = mpsc::channel(self.config.command_capacity.max(1));

        let registry = {
            let mut state = self.lock_state();
            let PollerState::Ready(registry) = &mut *state else {
                return Err(PollerError::AlreadyRunning);
            };
            let registry = std::mem::take(registry);
            *state = PollerState::Running(commands_tx.clone());
            registry
        };

        let pool = WorkerPool::spawn(
            self.config.workers,
            Arc::clone(&self.samplers),
            Arc::clone(&self.stats),
        );

        info!(
            workers = pool.size(),
            items = registry.len(),
            cycle_period_ms = self.config.cycle_period.as_millis() as u64,
            sink = sink.name(),
            "poller started"
        );

        let cycle = CycleLoop {
            config: self.config.clone(),
            registry,
            pool,
            commands: commands_rx,
            sink,
            stats: Arc::clone(&self.stats),
            cycle: 0,
        };

        Ok(PollerHandle {
            commands: commands_tx,
            stats: Arc::clone(&self.stats),
            task: tokio::spawn(cycle.run()),
        })
    }

    /// Start and wait on the cycle task
    ///
    /// Runs until the task fails; use `start` to keep a shutdown handle.
    pub async fn run<S>(&self, sink: S) -> Result<CycleStatsSnapshot, PollerError>
    where
        S: DataSink + 'static,
    {
        self.start(sink)?.wait().await
    }

    async fn execute<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T, PollerError> {
        let (reply, response) = oneshot::channel();
        let command = make(reply);

        let pending = {
            let mut state = self.lock_state();
            match &mut *state {
                PollerState::Ready(registry) => {
                    command.apply(registry, &self.config);
                    None
                }
                PollerState::Running(sender) => Some((sender.clone(), command)),
            }
        };

        if let Some((sender, command)) = pending {
            sender.send(command).await.map_err(|_| PollerError::Stopped)?;
        }
        response.await.map_err(|_| PollerError::Stopped)
    }

    fn lock_state(&self) -> MutexGuard<'_, PollerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Handle to a running poller
pub struct PollerHandle {
    commands: mpsc::Sender<Command>,
    stats: Arc<CycleStats>,
    task: JoinHandle<CycleStatsSnapshot>,
}

impl PollerHandle {
    pub fn stats(&self) -> CycleStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop after the current step and wait for workers to drain
    #[instrument(name = "poller_shutdown", skip(self))]
    pub async fn shutdown(self) -> Result<CycleStatsSnapshot, PollerError> {
        // Already gone if the send fails; the join below reports how
        let _ = self.commands.send(Command::Shutdown).await;
        self.wait().await
    }

    async fn wait(self) -> Result<CycleStatsSnapshot, PollerError> {
        self.task.await.map_err(|e| PollerError::TaskFailed {
            message: e.to_string(),
        })
    }
}

struct CycleLoop<S> {
    config: PollerConfig,
    registry: ItemRegistry,
    pool: WorkerPool,
    commands: mpsc::Receiver<Command>,
    sink: S,
    stats: Arc<CycleStats>,
    cycle: u64,
}

impl<S: DataSink> CycleLoop<S> {
    async fn run(mut self) -> CycleStatsSnapshot {
        loop {
            if self.run_cycle().await.is_break() {
                break;
            }
        }

        info!(cycles = self.cycle, "poller stopping");
        self.pool.shutdown().await;
        if let Err(e) = self.sink.flush().await {
            warn!(sink = self.sink.name(), error = %e, "flush failed on shutdown");
        }
        if let Err(e) = self.sink.close().await {
            warn!(sink = self.sink.name(), error = %e, "close failed on shutdown");
        }
        self.stats.snapshot()
    }

    async fn run_cycle(&mut self) -> ControlFlow<()> {
        let started = Instant::now();
        self.cycle = self.stats.inc_cycles();

        let dispatched = self.dispatch_due(started);

        if self.serve_until(started + self.config.settle_delay).await.is_break() {
            return ControlFlow::Break(());
        }

        let batch = self.harvest();
        if !batch.is_empty() {
            self.deliver(batch).await;
        }

        let elapsed = started.elapsed();
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        observability::record_cycle(elapsed_ms, dispatched);

        if elapsed < self.config.cycle_period {
            self.serve_until(started + self.config.cycle_period).await
        } else {
            let overrun_ms = (elapsed - self.config.cycle_period).as_secs_f64() * 1000.0;
            self.stats.inc_overruns();
            observability::record_cycle_overrun(overrun_ms);
            warn!(cycle = self.cycle, elapsed_ms, overrun_ms, "cycle overran its period");
            self.serve_pending()
        }
    }

    fn dispatch_due(&mut self, now: Instant) -> usize {
        // Backlog left over from earlier cycles
        let queue_depth = self.pool.queue_depth();
        let due = self.registry.take_due(now, self.config.due_tolerance);
        let count = due.len();

        for item in due {
            if let Err(mut item) = self.pool.dispatch(item) {
                warn!(item = %item.name(), "worker pool closed, item not dispatched");
                item.cancel_dispatch();
                self.registry.restore(item);
            }
        }

        self.stats.add_dispatched(count as u64);
        observability::record_work_queue_depth(queue_depth);
        debug!(cycle = self.cycle, dispatched = count, queue_depth, "dispatched due items");
        count
    }

    fn harvest(&mut self) -> Vec<ItemSnapshot> {
        let mut batch = Vec::new();
        for item in self.pool.try_harvest() {
            let snapshot = item.last_value().map(|_| item.snapshot());
            match self.registry.restore(item) {
                Restore::Applied => batch.extend(snapshot),
                Restore::Stale => {
                    self.stats.inc_stale();
                    observability::record_stale_result();
                }
            }
        }
        batch
    }

    async fn deliver(&mut self, items: Vec<ItemSnapshot>) {
        let batch = PollBatch::new(self.cycle, items);
        observability::record_batch(&batch);
        self.stats.inc_batches();

        if let Err(e) = self.sink.write(&batch).await {
            self.stats.inc_sink_errors();
            warn!(
                cycle = self.cycle,
                sink = self.sink.name(),
                items = batch.len(),
                error = %e,
                "result sink failed"
            );
        }
    }

    /// Apply commands until `deadline`
    async fn serve_until(&mut self, deadline: Instant) -> ControlFlow<()> {
        let sleep = sleep_until(deadline);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => return ControlFlow::Continue(()),
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) => return ControlFlow::Break(()),
                    Some(command) => command.apply(&mut self.registry, &self.config),
                    None => {
                        // Every sender dropped: keep cycling, nothing left to serve
                        sleep.as_mut().await;
                        return ControlFlow::Continue(());
                    }
                },
            }
        }
    }

    /// Apply queued commands without waiting
    fn serve_pending(&mut self) -> ControlFlow<()> {
        while let Ok(command) = self.commands.try_recv() {
            if matches!(command, Command::Shutdown) {
                return ControlFlow::Break(());
            }
            command.apply(&mut self.registry, &self.config);
        }
        ControlFlow::Continue(())
    }
}
