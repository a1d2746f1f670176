// ============================================================================
// Engine Runner
// Dedicated matching thread fed by a bounded inbound queue
// ============================================================================
//
// The loop pops one command at a time and runs it to completion. An empty
// queue backs off (spin, then yield); it never parks on a lock. Stopping
// flips an AtomicBool, drains whatever was already queued, and hands the
// engine back through the join handle.
// ============================================================================

use crossbeam::utils::Backoff;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{error, info, warn};

use super::MatchingEngine;
use crate::domain::{EngineConfig, Order, OrderId};
use crate::error::{EngineError, QueueFull};
use crate::interfaces::EventSink;
use crate::pipeline::{queue, Consumer, Producer};
use crate::utils::pin_current_thread_to_core;

/// Work item for the matching thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Place(Order),
    Cancel(OrderId),
    /// Publish a book snapshot to the outbound sink
    Snapshot,
}

/// Start the matching thread.
///
/// The inbound queue is sized by `config.inbound_capacity`. With the `numa`
/// feature and `config.core_id` set, the thread pins itself to that core.
///
/// # Errors
/// Returns the OS error if the thread cannot be spawned.
pub fn spawn<S>(
    engine: MatchingEngine<S>,
    config: &EngineConfig,
) -> io::Result<(EngineHandle, RunnerHandle<S>)>
where
    S: EventSink + 'static,
{
    let (commands, inbox) = queue::bounded(config.inbound_capacity);
    let running = Arc::new(AtomicBool::new(true));
    let core_id = config.core_id;

    let thread = thread::Builder::new()
        .name(format!("matching-{}", engine.instrument()))
        .spawn({
            let running = Arc::clone(&running);
            move || run_loop(engine, inbox, running, core_id)
        })?;

    Ok((
        EngineHandle {
            commands,
            running: Arc::clone(&running),
        },
        RunnerHandle {
            running,
            thread: Some(thread),
        },
    ))
}

fn run_loop<S: EventSink>(
    mut engine: MatchingEngine<S>,
    mut inbox: Consumer<Command>,
    running: Arc<AtomicBool>,
    core_id: Option<usize>,
) -> MatchingEngine<S> {
    if let Some(core) = core_id {
        if pin_current_thread_to_core(core) {
            info!(core, "matching thread pinned");
        } else {
            warn!(core, "could not pin matching thread");
        }
    }
    info!(instrument = %engine.instrument(), "matching loop started");

    let backoff = Backoff::new();
    while running.load(Ordering::Acquire) {
        match inbox.pop() {
            Some(command) => {
                backoff.reset();
                if dispatch(&mut engine, command).is_err() {
                    running.store(false, Ordering::Release);
                    break;
                }
            }
            None => backoff.snooze(),
        }
    }

    // Accepted commands are never silently lost on a clean stop.
    if !engine.is_halted() {
        while let Some(command) = inbox.pop() {
            if dispatch(&mut engine, command).is_err() {
                break;
            }
        }
    }

    info!(
        instrument = %engine.instrument(),
        stats = ?engine.stats(),
        "matching loop stopped"
    );
    engine
}

fn dispatch<S: EventSink>(
    engine: &mut MatchingEngine<S>,
    command: Command,
) -> Result<(), EngineError> {
    let result = match command {
        Command::Place(order) => engine.process(order).map(drop),
        Command::Cancel(id) => engine.cancel(id).map(drop),
        Command::Snapshot => engine.snapshot().map(drop),
    };
    if let Err(err) = &result {
        error!(%err, "matching engine stopped accepting commands");
    }
    result
}

// ============================================================================
// Ingress Handle
// ============================================================================

/// Producer side of the inbound queue. One per engine; not `Clone`.
#[derive(Debug)]
pub struct EngineHandle {
    commands: Producer<Command>,
    running: Arc<AtomicBool>,
}

impl EngineHandle {
    /// Enqueue one order. Hands it back if the queue is full.
    pub fn submit(&mut self, order: Order) -> Result<(), QueueFull<Order>> {
        self.commands.push_with(order, Command::Place)
    }

    /// Enqueue every order, retrying full pushes with backoff. Stops early
    /// if the matching thread is no longer running. Returns how many were
    /// enqueued.
    pub fn submit_batch(&mut self, orders: impl IntoIterator<Item = Order>) -> usize {
        let backoff = Backoff::new();
        let mut submitted = 0;
        for order in orders {
            let mut pending = order;
            loop {
                match self.submit(pending) {
                    Ok(()) => break,
                    Err(QueueFull(order)) => {
                        if !self.is_running() {
                            return submitted;
                        }
                        pending = order;
                        backoff.snooze();
                    }
                }
            }
            backoff.reset();
            submitted += 1;
        }
        submitted
    }

    pub fn cancel(&mut self, id: OrderId) -> Result<(), QueueFull<OrderId>> {
        self.commands.push_with(id, Command::Cancel)
    }

    pub fn request_snapshot(&mut self) -> Result<(), QueueFull<()>> {
        self.commands.push_with((), |()| Command::Snapshot)
    }

    /// Commands queued but not yet picked up.
    pub fn pending(&self) -> usize {
        self.commands.len()
    }

    pub fn capacity(&self) -> usize {
        self.commands.capacity()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

// ============================================================================
// Runner Handle
// ============================================================================

/// Owner of the matching thread.
#[derive(Debug)]
pub struct RunnerHandle<S: EventSink> {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<MatchingEngine<S>>>,
}

impl<S: EventSink> RunnerHandle<S> {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Stop the loop, wait for it, and take the engine back.
    ///
    /// # Errors
    /// Returns the panic payload if the matching thread panicked.
    pub fn shutdown(mut self) -> thread::Result<MatchingEngine<S>> {
        self.running.store(false, Ordering::Release);
        match self.thread.take() {
            Some(thread) => thread.join(),
            None => Err(Box::new("matching thread already joined")),
        }
    }
}

impl<S: EventSink> Drop for RunnerHandle<S> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
