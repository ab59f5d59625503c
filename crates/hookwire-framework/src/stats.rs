//! Routing counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters updated by the event and command routers.
#[derive(Debug, Default)]
pub struct RouterStats {
    events_dispatched: AtomicU64,
    decode_failures: AtomicU64,
    listener_failures: AtomicU64,
    commands_matched: AtomicU64,
    commands_succeeded: AtomicU64,
    commands_failed: AtomicU64,
    arguments_rejected: AtomicU64,
    permissions_denied: AtomicU64,
}

/// Point-in-time copy of [`RouterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub events_dispatched: u64,
    pub decode_failures: u64,
    pub listener_failures: u64,
    pub commands_matched: u64,
    pub commands_succeeded: u64,
    pub commands_failed: u64,
    pub arguments_rejected: u64,
    pub permissions_denied: u64,
}

macro_rules! counters {
    ($($field:ident => $record:ident),+ $(,)?) => {
        impl RouterStats {
            $(
                pub fn $record(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )+

            pub fn snapshot(&self) -> StatsSnapshot {
                StatsSnapshot {
                    $($field: self.$field.load(Ordering::Relaxed),)+
                }
            }
        }
    };
}

counters! {
    events_dispatched => record_event,
    decode_failures => record_decode_failure,
    listener_failures => record_listener_failure,
    commands_matched => record_match,
    commands_succeeded => record_success,
    commands_failed => record_failure,
    arguments_rejected => record_arguments_rejected,
    permissions_denied => record_permission_denied,
}
