//! Lifecycle hooks
//!
//! Fire-and-forget extension points. `Ready` runs once before the server
//! starts accepting, `Before` runs at the start of every dispatch.

use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    Before,
    Ready,
}

type Callback = Box<dyn Fn() + Send + Sync>;

/// Callbacks registered per hook, run in registration order
#[derive(Default)]
pub struct Hooks {
    callbacks: HashMap<Hook, Vec<Callback>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Hook, callback: impl Fn() + Send + Sync + 'static) {
        self.callbacks
            .entry(hook)
            .or_default()
            .push(Box::new(callback));
    }

    pub fn run_hook(&self, hook: Hook) {
        if let Some(callbacks) = self.callbacks.get(&hook) {
            for callback in callbacks {
                callback();
            }
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self.callbacks.iter().map(|(k, v)| (k, v.len())).collect();
        f.debug_struct("Hooks").field("callbacks", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_runs_in_order_per_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut hooks = Hooks::new();
        for label in ["first", "second"] {
            let seen = Arc::clone(&seen);
            hooks.register(Hook::Before, move || seen.lock().unwrap().push(label));
        }
        let ready_seen = Arc::clone(&seen);
        hooks.register(Hook::Ready, move || ready_seen.lock().unwrap().push("ready"));

        hooks.run_hook(Hook::Before);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);

        hooks.run_hook(Hook::Ready);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "ready"]);
    }

    #[test]
    fn test_unregistered_hook_is_noop() {
        Hooks::new().run_hook(Hook::Ready);
    }
}
