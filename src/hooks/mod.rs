//! Ordered hook registry around a host lifecycle point
//!
//! Plugins register `(priority, callback)` pairs in a before or after phase.
//! `run` invokes before-hooks in ascending priority (ties keep registration
//! order). The first `ShortCircuit` suppresses the host's default
//! continuation and every remaining hook. Otherwise the continuation runs,
//! then the after-hooks.

use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Value returned by a hook callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookSignal {
    /// Let the lifecycle proceed.
    Continue,
    /// Stop here; the host must not run its default continuation.
    ShortCircuit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Before,
    After,
}

/// How one lifecycle invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    /// Default continuation ran.
    Completed,
    /// A before-hook short-circuited; names the hook.
    Suppressed { by: String },
}

impl HookOutcome {
    pub fn completed(&self) -> bool {
        matches!(self, HookOutcome::Completed)
    }
}

pub type HookCallback<E> = Arc<dyn Fn(&E) -> HookSignal + Send + Sync>;

struct RegisteredHook<E> {
    name: String,
    priority: i32,
    callback: HookCallback<E>,
}

/// Hooks for one named lifecycle point carrying an event of type `E`.
pub struct HookRegistry<E> {
    point: &'static str,
    before: Vec<RegisteredHook<E>>,
    after: Vec<RegisteredHook<E>>,
}

impl<E> HookRegistry<E> {
    pub fn new(point: &'static str) -> Self {
        Self {
            point,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn point(&self) -> &'static str {
        self.point
    }

    pub fn register<F>(
        &mut self,
        phase: HookPhase,
        priority: i32,
        name: impl Into<String>,
        callback: F,
    ) where
        F: Fn(&E) -> HookSignal + Send + Sync + 'static,
    {
        let hooks = match phase {
            HookPhase::Before => &mut self.before,
            HookPhase::After => &mut self.after,
        };
        // Insert after every hook with priority <= ours to keep ties stable.
        let at = hooks.partition_point(|h| h.priority <= priority);
        hooks.insert(
            at,
            RegisteredHook {
                name: name.into(),
                priority,
                callback: Arc::new(callback),
            },
        );
    }

    /// Names of registered hooks for `phase`, in invocation order.
    pub fn hook_names(&self, phase: HookPhase) -> Vec<&str> {
        let hooks = match phase {
            HookPhase::Before => &self.before,
            HookPhase::After => &self.after,
        };
        hooks.iter().map(|h| h.name.as_str()).collect()
    }

    /// Run the lifecycle point around the host's `continuation`.
    pub fn run<F>(&self, event: &E, continuation: F) -> HookOutcome
    where
        F: FnOnce(&E),
    {
        for hook in &self.before {
            if (hook.callback)(event) == HookSignal::ShortCircuit {
                debug!(point = self.point, hook = %hook.name, "lifecycle short-circuited");
                return HookOutcome::Suppressed {
                    by: hook.name.clone(),
                };
            }
        }

        continuation(event);

        // After-hooks cannot undo a completed continuation; their signal is ignored.
        for hook in &self.after {
            let _ = (hook.callback)(event);
        }
        HookOutcome::Completed
    }
}

impl<E> fmt::Debug for HookRegistry<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("point", &self.point)
            .field("before", &self.hook_names(HookPhase::Before))
            .field("after", &self.hook_names(HookPhase::After))
            .finish()
    }
}
