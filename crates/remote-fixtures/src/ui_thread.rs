//! UI owner thread.
//!
//! Toolkit state may only be touched from the thread that owns it. `UiThread`
//! creates that thread, builds the state on it, and accepts units of work over
//! a channel. `run_sync` blocks the caller until its unit of work has fully
//! completed and hands back its result, error, or panic.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, ThreadId};
use tracing::{debug, trace, warn};

use crate::result::{FixtureError, FixtureResult};

type Job<S> = Box<dyn FnOnce(&mut S) + Send>;

/// Handle to a dedicated thread owning UI state `S`.
///
/// Cloning the handle shares the same thread. The thread exits once every
/// handle has been dropped and its queue is drained.
pub struct UiThread<S> {
    sender: Sender<Job<S>>,
    owner: ThreadId,
    name: String,
}

impl<S> Clone for UiThread<S> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            owner: self.owner,
            name: self.name.clone(),
        }
    }
}

impl<S> std::fmt::Debug for UiThread<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiThread")
            .field("name", &self.name)
            .field("owner", &self.owner)
            .finish_non_exhaustive()
    }
}

impl<S: 'static> UiThread<S> {
    /// Spawn the owner thread and build its state there.
    ///
    /// `S` never crosses threads, so it does not have to be `Send`.
    pub fn spawn<I>(name: impl Into<String>, init: I) -> FixtureResult<Self>
    where
        I: FnOnce() -> S + Send + 'static,
    {
        let name = name.into();
        let (sender, receiver) = mpsc::channel::<Job<S>>();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            let mut state = init();
            while let Ok(job) = receiver.recv() {
                job(&mut state);
            }
        })?;
        debug!(thread = %name, "UI owner thread started");
        Ok(Self {
            sender,
            owner: handle.thread().id(),
            name,
        })
    }

    /// Thread name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the calling thread is the owner thread
    #[must_use]
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.owner
    }

    /// Run `work` on the owner thread and wait for its result.
    ///
    /// Errors returned by `work` come back unchanged. A panic inside `work`
    /// is caught on the owner thread, which keeps serving, and is reported as
    /// `FixtureError::UiThread`. Calling this from the owner thread itself
    /// fails instead of deadlocking.
    pub fn run_sync<T, F>(&self, work: F) -> FixtureResult<T>
    where
        F: FnOnce(&mut S) -> FixtureResult<T> + Send + 'static,
        T: Send + 'static,
    {
        if self.is_owner_thread() {
            return Err(FixtureError::ui_thread(format!(
                "run_sync called from owner thread '{}'",
                self.name
            )));
        }

        let (reply, outcome) = mpsc::sync_channel(1);
        let job: Job<S> = Box::new(move |state: &mut S| {
            let result = panic::catch_unwind(AssertUnwindSafe(|| work(state)));
            // Caller may have gone away; nothing left to report to.
            let _ = reply.send(result);
        });

        trace!(thread = %self.name, "submitting unit of work");
        self.sender.send(job).map_err(|_| {
            FixtureError::ui_thread(format!("owner thread '{}' has shut down", self.name))
        })?;

        match outcome.recv() {
            Ok(Ok(result)) => result,
            Ok(Err(payload)) => {
                let message = panic_message(payload.as_ref());
                warn!(thread = %self.name, %message, "unit of work panicked");
                Err(FixtureError::ui_thread(format!(
                    "unit of work panicked: {message}"
                )))
            }
            Err(_) => Err(FixtureError::ui_thread(format!(
                "owner thread '{}' stopped before completing the unit of work",
                self.name
            ))),
        }
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
