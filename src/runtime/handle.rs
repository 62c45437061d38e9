use std::sync::Arc;

use thiserror::Error;
use tokio::{
    sync::{Mutex, broadcast, mpsc, oneshot},
    time::{Duration, Instant},
};

use crate::{
    core::{
        state::ViewState,
        store::{StateError, ViewStore},
    },
    op::ViewOp,
    persist::{HistorySink, KeyValueStore, PersistError},
    types::Generation,
    view_state::ViewStateCodec,
};

use super::{debounce::Debouncer, events::ViewEvent};

/// Failure surfaced through [`ViewStateHandle`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The mutation was rejected.
    #[error(transparent)]
    State(#[from] StateError),
    /// Writing storage or history failed.
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// The runtime task is gone.
    #[error("view-state runtime stopped")]
    ChannelClosed,
}

/// Channel bounds and the persistence quiet window.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Quiet window before a coalesced write.
    pub debounce_ms: u64,
    /// Pending commands before `apply` waits.
    pub command_queue_bound: usize,
    /// Pending snapshots before the writer waits for the worker.
    pub persist_queue_bound: usize,
    /// Broadcast buffer for [`ViewEvent`]s.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            command_queue_bound: 256,
            persist_queue_bound: 64,
            event_capacity: 1024,
        }
    }
}

/// Cloneable handle to the view-state runtime.
#[derive(Clone)]
pub struct ViewStateHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<ViewEvent>,
}

enum Command {
    Apply {
        op: ViewOp,
        resp: oneshot::Sender<Result<Generation, RuntimeError>>,
    },
    Get {
        resp: oneshot::Sender<(Generation, ViewState)>,
    },
    Flush {
        resp: oneshot::Sender<Result<Generation, RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

enum PersistMsg {
    State {
        generation: Generation,
        state: ViewState,
    },
    Flush {
        resp: oneshot::Sender<Result<Generation, PersistError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), PersistError>>,
    },
}

type WriteOutcome = (Generation, Result<(), String>);

struct Sinks {
    store: Box<dyn KeyValueStore>,
    history: Box<dyn HistorySink>,
}

/// Starts the writer loop and its persistence worker.
///
/// Every effective mutation emits [`ViewEvent::Changed`] and hands a snapshot
/// to the worker, which writes storage and history once the quiet window has
/// passed; intermediate snapshots are superseded.
pub fn spawn_view_state(
    store: ViewStore,
    codec: ViewStateCodec,
    storage: Box<dyn KeyValueStore>,
    history: Box<dyn HistorySink>,
    config: RuntimeConfig,
) -> ViewStateHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound);
    let (events_tx, _) = broadcast::channel::<ViewEvent>(config.event_capacity);
    let (persist_tx, persist_rx) = mpsc::channel::<PersistMsg>(config.persist_queue_bound);
    let (written_tx, mut written_rx) = mpsc::unbounded_channel::<WriteOutcome>();

    let sinks = Sinks { store: storage, history };
    spawn_persistence_worker(codec, sinks, persist_rx, written_tx, config);

    let events_tx_loop = events_tx.clone();
    tokio::spawn(async move {
        let mut store = store;
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => {
                    let Some(cmd) = cmd else { break; };
                    if handle_command(cmd, &mut store, &events_tx_loop, &persist_tx).await {
                        break;
                    }
                }
                written = written_rx.recv() => {
                    if let Some(outcome) = written {
                        publish_write(&events_tx_loop, outcome);
                    }
                }
            }
        }
    });

    ViewStateHandle { cmd_tx, events_tx }
}

impl ViewStateHandle {
    /// Event stream; lagging receivers lose the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events_tx.subscribe()
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(command(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Applies one mutation and returns the resulting generation.
    pub async fn apply(&self, op: ViewOp) -> Result<Generation, RuntimeError> {
        self.request(|resp| Command::Apply { op, resp }).await?
    }

    /// Current state.
    pub async fn get(&self) -> Result<ViewState, RuntimeError> {
        Ok(self.snapshot().await?.1)
    }

    /// Current generation and state.
    pub async fn snapshot(&self) -> Result<(Generation, ViewState), RuntimeError> {
        self.request(|resp| Command::Get { resp }).await
    }

    /// Writes any pending state now; returns the highest persisted generation.
    pub async fn flush(&self) -> Result<Generation, RuntimeError> {
        self.request(|resp| Command::Flush { resp }).await?
    }

    /// Flushes and stops both tasks.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Shutdown { resp }).await?
    }
}

fn publish_write(events_tx: &broadcast::Sender<ViewEvent>, (generation, result): WriteOutcome) {
    let event = match result {
        Ok(()) => ViewEvent::Persisted { generation },
        Err(message) => ViewEvent::PersistFailed { generation, message },
    };
    let _ = events_tx.send(event);
}

async fn handle_command(
    cmd: Command,
    store: &mut ViewStore,
    events_tx: &broadcast::Sender<ViewEvent>,
    persist_tx: &mpsc::Sender<PersistMsg>,
) -> bool {
    match cmd {
        Command::Apply { op, resp } => {
            let res = match store.apply(op) {
                Ok(generation) => {
                    if store.take_dirty() {
                        tracing::debug!(generation, "view state changed");
                        let _ = events_tx.send(ViewEvent::Changed { generation });
                        let msg = PersistMsg::State {
                            generation,
                            state: store.snapshot(),
                        };
                        persist_tx.send(msg).await.map(|_| generation).map_err(|_| RuntimeError::ChannelClosed)
                    } else {
                        Ok(generation)
                    }
                }
                Err(err) => Err(RuntimeError::from(err)),
            };
            let _ = resp.send(res);
        }
        Command::Get { resp } => {
            let _ = resp.send((store.generation(), store.snapshot()));
        }
        Command::Flush { resp } => {
            let out = forward(persist_tx, |tx| PersistMsg::Flush { resp: tx }).await;
            let _ = resp.send(out);
        }
        Command::Shutdown { resp } => {
            let out = forward(persist_tx, |tx| PersistMsg::Shutdown { resp: tx }).await;
            let _ = resp.send(out);
            return true;
        }
    }
    false
}

/// Hands a request to the persistence worker and waits for its answer.
async fn forward<T>(
    persist_tx: &mpsc::Sender<PersistMsg>,
    msg: impl FnOnce(oneshot::Sender<Result<T, PersistError>>) -> PersistMsg,
) -> Result<T, RuntimeError> {
    let (tx, rx) = oneshot::channel();
    persist_tx
        .send(msg(tx))
        .await
        .map_err(|_| RuntimeError::ChannelClosed)?;
    Ok(rx.await.map_err(|_| RuntimeError::ChannelClosed)??)
}

fn spawn_persistence_worker(
    codec: ViewStateCodec,
    sinks: Sinks,
    mut rx: mpsc::Receiver<PersistMsg>,
    written_tx: mpsc::UnboundedSender<WriteOutcome>,
    config: RuntimeConfig,
) {
    let sinks = Arc::new(Mutex::new(sinks));
    tokio::spawn(async move {
        let mut debouncer = Debouncer::new(Duration::from_millis(config.debounce_ms));
        let mut pending: Option<(Generation, ViewState)> = None;
        let mut last_written: Generation = 0;

        loop {
            let deadline = debouncer
                .deadline()
                .map(Instant::from_std)
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                msg = rx.recv() => {
                    let Some(msg) = msg else {
                        let _ = write_pending(&codec, &sinks, &mut pending, &mut last_written, &written_tx).await;
                        break;
                    };
                    match msg {
                        PersistMsg::State { generation, state } => {
                            pending = Some((generation, state));
                            debouncer.touch(Instant::now().into_std());
                        }
                        PersistMsg::Flush { resp } => {
                            debouncer.take();
                            let result = write_pending(&codec, &sinks, &mut pending, &mut last_written, &written_tx).await;
                            let _ = resp.send(result.map(|_| last_written));
                        }
                        PersistMsg::Shutdown { resp } => {
                            debouncer.take();
                            let result = write_pending(&codec, &sinks, &mut pending, &mut last_written, &written_tx).await;
                            let _ = resp.send(result);
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep_until(deadline), if debouncer.is_pending() => {
                    if debouncer.poll(Instant::now().into_std()) {
                        let _ = write_pending(&codec, &sinks, &mut pending, &mut last_written, &written_tx).await;
                    }
                }
            }
        }
    });
}

async fn write_pending(
    codec: &ViewStateCodec,
    sinks: &Arc<Mutex<Sinks>>,
    pending: &mut Option<(Generation, ViewState)>,
    last_written: &mut Generation,
    written_tx: &mpsc::UnboundedSender<WriteOutcome>,
) -> Result<(), PersistError> {
    let Some((generation, state)) = pending.take() else {
        return Ok(());
    };

    let codec = codec.clone();
    let sinks_ref = Arc::clone(sinks);
    let result = tokio::task::spawn_blocking(move || {
        let mut guard = sinks_ref.blocking_lock();
        let Sinks { store, history } = &mut *guard;
        codec.persist(&state, store.as_mut(), history.as_mut())
    })
    .await
    .map_err(|e| PersistError::Message(format!("join error: {e}")))
    .and_then(|r| r);

    match &result {
        Ok(()) => {
            *last_written = (*last_written).max(generation);
            tracing::debug!(generation, "view state persisted");
            let _ = written_tx.send((generation, Ok(())));
        }
        Err(err) => {
            tracing::warn!(generation, error = %err, "dropping view state write");
            let _ = written_tx.send((generation, Err(err.to_string())));
        }
    }
    result
}
