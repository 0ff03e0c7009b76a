use crate::error::{Result, SeqSortError};
use crate::runner::context::{EventSink, RunContext, RunEvent, RunReport, Tool};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::{self, JoinHandle};

/// Single-slot executor for one tool: at most one run in flight.
#[derive(Debug, Clone)]
pub struct ToolSlot {
    tool: Tool,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when dropped, including on worker panic.
struct SlotGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl ToolSlot {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Starts `job` on a blocking worker thread. Must be called from within a
    /// tokio runtime.
    pub fn submit<F>(&self, dry_run: bool, job: F) -> Result<RunHandle>
    where
        F: FnOnce(&mut RunContext) -> Result<()> + Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(SeqSortError::Busy {
                tool: self.tool.name().to_string(),
            });
        }

        let guard = SlotGuard {
            busy: self.busy.clone(),
        };
        let (sender, events) = mpsc::unbounded_channel();
        let tool = self.tool;

        let worker = task::spawn_blocking(move || {
            let sink = EventSink::new(sender);
            let mut ctx = RunContext::new(tool, sink.clone(), dry_run);
            tracing::debug!(tool = tool.name(), dry_run, "worker started");

            let result = job(&mut ctx).map(|()| ctx.into_report());

            // Release before announcing completion so a listener that reacts
            // to the message can resubmit straight away.
            drop(guard);
            sink.complete(result);
        });

        Ok(RunHandle {
            tool,
            events,
            worker,
        })
    }
}

/// The interactive side of a submitted run.
#[derive(Debug)]
pub struct RunHandle {
    tool: Tool,
    events: UnboundedReceiver<RunEvent>,
    worker: JoinHandle<()>,
}

impl RunHandle {
    /// Drains the channel, passing every message to `on_event` until the
    /// completion message arrives.
    pub async fn drive<F>(mut self, mut on_event: F) -> Result<RunReport>
    where
        F: FnMut(&RunEvent),
    {
        while let Some(event) = self.events.recv().await {
            if let RunEvent::Completed(result) = event {
                return *result;
            }
            on_event(&event);
        }

        // Channel closed without a completion message: the worker died.
        match self.worker.await {
            Ok(()) => Err(SeqSortError::Worker {
                message: format!("{} worker exited without reporting", self.tool.name()),
            }),
            Err(e) => Err(SeqSortError::Worker {
                message: format!("{} worker failed: {}", self.tool.name(), e),
            }),
        }
    }

    pub async fn wait(self) -> Result<RunReport> {
        self.drive(|_| {}).await
    }
}
