//! Serialized request stack.
//!
//! A single background task owns a queue of pending requests and runs them
//! one at a time, waiting `pause` before each dispatch. A failed entry that
//! the retry policy allows to run again goes back to the head of the queue,
//! ahead of entries that have not started yet, and is not dispatched before
//! its backoff has elapsed.
//!
//! A task that panics fails only its own entry with
//! [`ApiError::TaskPanicked`]; the stack keeps serving later entries.
//!
//! Entries are enqueued as soon as [`Stack::add`] is called. Dropping the
//! returned future does not remove the entry; its result is discarded.

use std::collections::VecDeque;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use log::debug;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;

use crate::config::{DEFAULT_RETRIES, DEFAULT_STACK_PAUSE_MS};
use crate::errors::{ApiError, Result};
use crate::retry::{RetryPolicy, RetryState};

// Re-runnable unit of work. Called once per attempt.
type Task = Arc<dyn Fn() -> BoxFuture<'static, Result<Value>> + Send + Sync>;

/// What a stacked entry is doing, for logs.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryMeta {
    pub method: String,
    pub params: Value,
}

impl QueryMeta {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

struct StackEntry {
    task: Task,
    meta: QueryMeta,
    retry: RetryState,
    /// Earliest dispatch time of a retried entry.
    not_before: Option<Instant>,
    reply: oneshot::Sender<Result<Value>>,
}

#[derive(Clone, Debug)]
pub struct StackOptions {
    /// Wait before each dispatch.
    pub pause: Duration,
    /// Retry ceiling for entries added without their own.
    pub retries: u32,
    pub policy: RetryPolicy,
}

impl Default for StackOptions {
    fn default() -> Self {
        Self {
            pause: Duration::from_millis(DEFAULT_STACK_PAUSE_MS),
            retries: DEFAULT_RETRIES,
            policy: RetryPolicy::default(),
        }
    }
}

/// Handle to a running stack. Clones share the same queue.
#[derive(Clone)]
pub struct Stack {
    tx: mpsc::UnboundedSender<StackEntry>,
    retries: u32,
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("retries", &self.retries)
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl Stack {
    /// Spawn the stack task on the current tokio runtime.
    pub fn spawn(options: StackOptions) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let retries = options.retries;
        tokio::spawn(run(rx, options));
        Self { tx, retries }
    }

    /// Queue `task` with the stack's retry ceiling.
    pub fn add<F, Fut>(&self, task: F, meta: QueryMeta) -> impl Future<Output = Result<Value>> + Send + 'static
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        self.add_with_retries(task, meta, self.retries)
    }

    /// Queue `task` with its own retry ceiling.
    pub fn add_with_retries<F, Fut>(
        &self,
        task: F,
        meta: QueryMeta,
        retries: u32,
    ) -> impl Future<Output = Result<Value>> + Send + 'static
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let (reply, rx) = oneshot::channel();
        let entry = StackEntry {
            task: Arc::new(move || task().boxed()),
            meta,
            retry: RetryState::new(retries),
            not_before: None,
            reply,
        };
        let sent = self.tx.send(entry).is_ok();

        async move {
            if !sent {
                return Err(ApiError::StackClosed);
            }
            rx.await.unwrap_or(Err(ApiError::StackClosed))
        }
    }
}

async fn run(mut rx: mpsc::UnboundedReceiver<StackEntry>, options: StackOptions) {
    let mut queue: VecDeque<StackEntry> = VecDeque::new();

    loop {
        if queue.is_empty() {
            match rx.recv().await {
                Some(entry) => queue.push_back(entry),
                None => break,
            }
        }

        tokio::time::sleep(options.pause).await;
        while let Ok(entry) = rx.try_recv() {
            queue.push_back(entry);
        }

        let Some(mut entry) = queue.pop_front() else {
            continue;
        };
        if let Some(at) = entry.not_before.take() {
            tokio::time::sleep_until(at).await;
        }

        let task = entry.task.clone();
        let outcome = AssertUnwindSafe(async move { task().await })
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| Err(ApiError::TaskPanicked(panic_message(payload))));

        match outcome {
            Ok(value) => {
                let _ = entry.reply.send(Ok(value));
            }
            Err(err) => {
                let next = entry.retry.attempt + 1;
                if options.policy.allows(next, entry.retry.limit, &err) {
                    let wait = options.policy.backoff(next);
                    debug!(
                        "stack: retry #{} of {} ({}) queued first in {:?} after: {}",
                        next, entry.meta.method, entry.meta.params, wait, err
                    );
                    entry.retry.attempt = next;
                    entry.not_before = Some(Instant::now() + wait);
                    queue.push_front(entry);
                } else {
                    debug!("stack: {} failed: {}", entry.meta.method, err);
                    let _ = entry.reply.send(Err(err));
                }
            }
        }
    }

    debug!("stack: all handles dropped, stopping");
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
