use std::{sync::Arc, time::Duration};

use drain_core::HandlerRegistry;
use drain_model::JobKind;

use crate::DelayAction;

/// Demonstration kinds and the simulated time each one takes.
pub const BUILTIN_KINDS: [(&str, Duration); 5] = [
    ("email", Duration::from_secs(1)),
    ("file_process", Duration::from_secs(2)),
    ("fast_task", Duration::from_millis(500)),
    ("medium_task", Duration::from_secs(1)),
    ("slow_task", Duration::from_secs(2)),
];

/// Simulated time of kinds nobody registered.
pub const FALLBACK_DELAY: Duration = Duration::from_millis(500);

/// Registers a [`DelayAction`] for each of [`BUILTIN_KINDS`] and makes a
/// [`FALLBACK_DELAY`] action the fallback. Existing registrations for those
/// kinds are replaced.
pub fn register_builtin_actions(registry: &mut HandlerRegistry) {
    for (kind, delay) in BUILTIN_KINDS {
        registry.register(kind, Arc::new(DelayAction::new(kind, delay)));
    }
    registry.set_fallback(Arc::new(DelayAction::new(
        JobKind::DEFAULT,
        FALLBACK_DELAY,
    )));
}

pub fn builtin_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::default();
    register_builtin_actions(&mut registry);
    registry
}
