// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use std::sync::atomic::{AtomicBool, Ordering};

/// One-shot notification that the supervised child is going away.
///
/// `fire` may be called any number of times; only the first call returns
/// true, which lets the caller gate side effects that must happen once.
#[derive(Debug, Default)]
pub struct ExitSignal {
    fired: AtomicBool,
}

impl ExitSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Returns true for the call that actually raised it.
    pub fn fire(&self) -> bool {
        self.fired
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}
