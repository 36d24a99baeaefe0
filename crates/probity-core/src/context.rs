//! Ambient assertion contexts.
//!
//! While a context is active, failed assertions on its flow are buffered in
//! its queue instead of being reported one by one. When it is disposed, the
//! remaining failures go to the reporting adapter as one aggregate.
//!
//! ## Flows
//!
//! - **Synchronous**: [`AssertionContext::begin`] binds the context to the
//!   current thread until the returned [`ContextGuard`] is dropped. A tokio
//!   runtime thread is shared by many tasks, so `begin` refuses to run there.
//! - **Asynchronous**: [`scope`] binds it to one future through a tokio
//!   task-local, so it survives every suspension point.
//!
//! Propagation is forward only. [`propagate`], [`spawn`] and [`bind`]
//! carry the active context into work started from inside the scope. Work
//! started before the context began never sees it.
//!
//! ## Lifecycle
//!
//! ```text
//! Idle ──begin/scope──▶ Active ──drop/dispose/scope end──▶ Idle
//! ```
//!
//! Beginning a second context on a flow that already has one is a usage
//! error, as are calling `begin` from async code and dequeuing from an
//! empty queue.

use crate::config::Configuration;
use crate::errors::{ProbityError, Result};
use crate::failure::Failure;
use crate::reporting::render_aggregate;
use crate::{log_op_end, log_op_start};
use probity_core_types::ScopeId;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::marker::PhantomData;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

tokio::task_local! {
    static TASK_CONTEXT: ContextHandle;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<Option<ContextHandle>> = const { RefCell::new(None) };
}

/// State of one active scope.
#[derive(Debug)]
pub struct AssertionContext {
    id: ScopeId,
    name: String,
    queue: VecDeque<Failure>,
    config: Configuration,
    started: Instant,
    disposed: bool,
}

impl AssertionContext {
    /// Begin a context bound to the current thread.
    ///
    /// # Errors
    ///
    /// Returns `ContextAlreadyActive` if this flow already has a context,
    /// or `ContextInsideRuntime` when called on a thread inside a tokio
    /// runtime, where tasks started earlier would share the thread slot.
    /// Use [`scope`] there.
    ///
    /// ```
    /// use probity_core::context::AssertionContext;
    ///
    /// let ctx = AssertionContext::begin("checkout").unwrap();
    /// assert!(AssertionContext::begin("nested").is_err());
    /// assert!(ctx.is_empty());
    /// ```
    pub fn begin(name: impl Into<String>) -> Result<ContextGuard> {
        let name = name.into();
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ProbityError::ContextInsideRuntime { requested: name });
        }
        let handle = open(name)?;
        THREAD_CONTEXT.with(|slot| *slot.borrow_mut() = Some(handle.clone()));
        Ok(ContextGuard {
            handle,
            _thread_bound: PhantomData,
        })
    }
}

fn open(name: String) -> Result<ContextHandle> {
    if let Some(active) = current() {
        return Err(ProbityError::ContextAlreadyActive {
            active: active.name(),
            requested: name,
        });
    }
    let id = ScopeId::new();
    log_op_start!("context_begin", scope = %name, scope_id = %id);
    Ok(ContextHandle(Arc::new(Mutex::new(AssertionContext {
        id,
        name,
        queue: VecDeque::new(),
        config: Configuration::global(),
        started: Instant::now(),
        disposed: false,
    }))))
}

/// Shared reference to an active context.
#[derive(Debug, Clone)]
pub struct ContextHandle(Arc<Mutex<AssertionContext>>);

impl ContextHandle {
    fn lock(&self) -> MutexGuard<'_, AssertionContext> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> String {
        self.lock().name.clone()
    }

    pub fn id(&self) -> ScopeId {
        self.lock().id.clone()
    }

    /// Number of buffered failures.
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    /// Buffered failures in evaluation order, without removing them.
    pub fn failures(&self) -> Vec<Failure> {
        self.lock().queue.iter().cloned().collect()
    }

    /// Remove and return the oldest buffered failure.
    ///
    /// # Errors
    ///
    /// Returns `EmptyFailureQueue` when nothing is buffered.
    pub fn dequeue(&self) -> Result<Failure> {
        let mut ctx = self.lock();
        let name = ctx.name.clone();
        ctx.queue
            .pop_front()
            .ok_or(ProbityError::EmptyFailureQueue { scope: name })
    }

    /// Copy of this context's configuration.
    pub fn configuration(&self) -> Configuration {
        self.lock().config.clone()
    }

    /// Edit this context's configuration. The global one is untouched.
    pub fn configure(&self, f: impl FnOnce(&mut Configuration)) {
        f(&mut self.lock().config);
    }

    /// Buffer a failure. Hands it back if the context was already disposed.
    pub fn enqueue(&self, failure: Failure) -> std::result::Result<(), Failure> {
        let mut ctx = self.lock();
        if ctx.disposed {
            return Err(failure);
        }
        ctx.queue.push_back(failure);
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }

    fn same_as(&self, other: &ContextHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Drain the queue and report what is left. Idempotent.
    fn dispose(&self) {
        let (name, remaining, config, duration_ms) = {
            let mut ctx = self.lock();
            if ctx.disposed {
                return;
            }
            ctx.disposed = true;
            let remaining: Vec<Failure> = ctx.queue.drain(..).collect();
            (
                ctx.name.clone(),
                remaining,
                ctx.config.clone(),
                ctx.started.elapsed().as_millis() as u64,
            )
        };

        log_op_end!(
            "context_dispose",
            duration_ms = duration_ms,
            scope = %name,
            failure_count = remaining.len()
        );

        if remaining.is_empty() {
            return;
        }
        let message = format!(
            "{} assertion failure(s) in scope '{}'",
            remaining.len(),
            name
        );
        if std::thread::panicking() {
            tracing::error!(
                component = module_path!(),
                scope = %name,
                failure_count = remaining.len(),
                "{}",
                render_aggregate(&message, &remaining, false)
            );
            return;
        }
        // The slot was cleared before disposal; rebind it so adapters that
        // read `Configuration::current()` see this context's settings.
        let previous = THREAD_CONTEXT
            .try_with(|slot| slot.replace(Some(self.clone())))
            .ok()
            .flatten();
        let _restore = RestoreSlot(previous);
        config.reporting_adapter.report_failures(&message, &remaining);
    }
}

/// Keeps a thread-bound context active. Dropping it disposes the context.
#[derive(Debug)]
pub struct ContextGuard {
    handle: ContextHandle,
    _thread_bound: PhantomData<*const ()>,
}

impl ContextGuard {
    pub fn handle(&self) -> &ContextHandle {
        &self.handle
    }

    /// Dispose now, reporting any remaining failures.
    pub fn dispose(self) {
        drop(self);
    }
}

impl Deref for ContextGuard {
    type Target = ContextHandle;

    fn deref(&self) -> &ContextHandle {
        &self.handle
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let _ = THREAD_CONTEXT.try_with(|slot| {
            let mut slot = slot.borrow_mut();
            if slot.as_ref().is_some_and(|h| h.same_as(&self.handle)) {
                *slot = None;
            }
        });
        self.handle.dispose();
    }
}

struct DisposeOnDrop(ContextHandle);

impl Drop for DisposeOnDrop {
    fn drop(&mut self) {
        self.0.dispose();
    }
}

/// The context active on this flow, if any.
///
/// The task-local slot of an enclosing [`scope`] wins over the thread slot.
pub fn current() -> Option<ContextHandle> {
    TASK_CONTEXT.try_with(ContextHandle::clone).ok().or_else(|| {
        THREAD_CONTEXT
            .try_with(|slot| slot.borrow().clone())
            .ok()
            .flatten()
    })
}

/// Dequeue the oldest failure of the context active on this flow.
///
/// # Errors
///
/// Returns `NoActiveContext` outside any context, or `EmptyFailureQueue`.
pub fn dequeue() -> Result<Failure> {
    current().ok_or(ProbityError::NoActiveContext)?.dequeue()
}

/// Run `fut` inside a new context bound to it.
///
/// The context is disposed when `fut` completes, or when the returned
/// future is dropped early.
///
/// # Errors
///
/// Returns `ContextAlreadyActive` if this flow already has a context.
pub async fn scope<F: Future>(name: impl Into<String>, fut: F) -> Result<F::Output> {
    let handle = open(name.into())?;
    let _dispose = DisposeOnDrop(handle.clone());
    Ok(TASK_CONTEXT.scope(handle, fut).await)
}

/// Wrap `fut` so it runs under the context active at the time of this call.
pub fn propagate<F: Future>(fut: F) -> impl Future<Output = F::Output> {
    let handle = current();
    async move {
        match handle {
            Some(handle) => TASK_CONTEXT.scope(handle, fut).await,
            None => fut.await,
        }
    }
}

/// `tokio::spawn` that carries the active context into the new task.
pub fn spawn<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(propagate(fut))
}

/// Wrap `f` so it runs under the context active at the time of this call,
/// whichever thread ends up running it.
pub fn bind<F, R>(f: F) -> impl FnOnce() -> R
where
    F: FnOnce() -> R,
{
    let handle = current();
    move || match handle {
        Some(handle) => {
            let previous = THREAD_CONTEXT.with(|slot| slot.replace(Some(handle)));
            let _restore = RestoreSlot(previous);
            f()
        }
        None => f(),
    }
}

struct RestoreSlot(Option<ContextHandle>);

impl Drop for RestoreSlot {
    fn drop(&mut self) {
        let previous = self.0.take();
        let _ = THREAD_CONTEXT.try_with(|slot| *slot.borrow_mut() = previous);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::{CollectingAdapter, Report};

    fn collecting(guard: &ContextGuard) -> Arc<CollectingAdapter> {
        let adapter = Arc::new(CollectingAdapter::new());
        let shared = Arc::clone(&adapter);
        guard.configure(move |c| c.reporting_adapter = shared);
        adapter
    }

    #[test]
    fn test_begin_sets_and_drop_clears() {
        assert!(current().is_none());
        let guard = AssertionContext::begin("unit").unwrap();
        assert_eq!(current().map(|h| h.name()), Some("unit".to_string()));
        drop(guard);
        assert!(current().is_none());
    }

    #[test]
    fn test_second_begin_is_usage_error() {
        let _guard = AssertionContext::begin("outer").unwrap();
        let err = AssertionContext::begin("inner").unwrap_err();
        assert!(err.kind().is_usage());
        assert!(err.to_string().contains("'outer'"));
    }

    #[test]
    fn test_fifo_dequeue_and_empty_error() {
        let guard = AssertionContext::begin("fifo").unwrap();
        guard.enqueue(Failure::new("a", "", "")).unwrap();
        guard.enqueue(Failure::new("b", "", "")).unwrap();
        assert_eq!(guard.dequeue().unwrap().message, "a");
        assert_eq!(guard.dequeue().unwrap().message, "b");
        let err = guard.dequeue().unwrap_err();
        assert_eq!(err.code(), "ERR_EMPTY_FAILURE_QUEUE");
    }

    #[test]
    fn test_dispose_reports_remaining_once() {
        let guard = AssertionContext::begin("agg").unwrap();
        let adapter = collecting(&guard);
        guard.enqueue(Failure::new("a", "", "")).unwrap();
        guard.enqueue(Failure::new("b", "", "")).unwrap();
        guard.enqueue(Failure::new("c", "", "")).unwrap();
        guard.dequeue().unwrap();
        guard.dispose();

        let reports = adapter.reports();
        assert_eq!(reports.len(), 1);
        match &reports[0] {
            Report::Aggregate { message, failures } => {
                assert_eq!(message, "2 assertion failure(s) in scope 'agg'");
                let names: Vec<&str> = failures.iter().map(|f| f.message.as_str()).collect();
                assert_eq!(names, vec!["b", "c"]);
            }
            other => panic!("unexpected report {:?}", other),
        }
    }

    #[test]
    fn test_enqueue_after_dispose_hands_back() {
        let guard = AssertionContext::begin("late").unwrap();
        let handle = guard.handle().clone();
        guard.dispose();
        assert!(handle.is_disposed());
        let back = handle.enqueue(Failure::new("x", "", "")).unwrap_err();
        assert_eq!(back.message, "x");
    }

    #[test]
    fn test_bind_carries_context_to_other_thread() {
        let guard = AssertionContext::begin("bound").unwrap();
        let job = bind(|| current().map(|h| h.name()));
        let seen = std::thread::spawn(job).join().unwrap();
        assert_eq!(seen.as_deref(), Some("bound"));

        let unbound = std::thread::spawn(|| current().is_none()).join().unwrap();
        assert!(unbound);
        drop(guard);
    }

    #[test]
    fn test_free_dequeue_requires_context() {
        let err = dequeue().unwrap_err();
        assert_eq!(err.code(), "ERR_NO_ACTIVE_CONTEXT");

        let guard = AssertionContext::begin("free").unwrap();
        guard.enqueue(Failure::new("only", "", "")).unwrap();
        assert_eq!(dequeue().unwrap().message, "only");
        drop(guard);
    }

    #[test]
    fn test_begin_refused_on_runtime_thread() {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let err = rt
            .block_on(async { AssertionContext::begin("in-runtime").map(drop) })
            .unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::ContextInsideRuntime);
        assert!(err.to_string().contains("context::scope"));
        assert!(current().is_none());
    }

    #[test]
    fn test_adapter_sees_disposing_context_configuration() {
        #[derive(Debug, Default)]
        struct SeenColorize(Mutex<Vec<bool>>);

        impl crate::reporting::ReportingAdapter for SeenColorize {
            fn report_failure(&self, _failure: &Failure) {}

            fn report_failures(&self, _message: &str, _failures: &[Failure]) {
                let colorize = Configuration::current().colorize;
                self.0.lock().unwrap().push(colorize);
            }

            fn name(&self) -> &'static str {
                "seen-colorize"
            }
        }

        let adapter = Arc::new(SeenColorize::default());
        let guard = AssertionContext::begin("colored").unwrap();
        let shared = Arc::clone(&adapter);
        let global_colorize = Configuration::global().colorize;
        guard.configure(move |c| {
            c.colorize = !global_colorize;
            c.reporting_adapter = shared;
        });
        guard.enqueue(Failure::new("x", "", "")).unwrap();
        guard.dispose();

        assert_eq!(*adapter.0.lock().unwrap(), vec![!global_colorize]);
        assert!(current().is_none());
    }

    #[test]
    fn test_configure_is_local() {
        let guard = AssertionContext::begin("local").unwrap();
        guard.configure(|c| c.max_sub_failures = 1);
        assert_eq!(Configuration::current().max_sub_failures, 1);
        assert_ne!(Configuration::global().max_sub_failures, 1);
    }
}
