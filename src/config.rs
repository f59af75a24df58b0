//! Centralized configuration and builder for yamal handles.
//!
//! Goals:
//! - Single place to collect tunables instead of scattering env lookups.
//! - YamalConfig::from_env() reads the YAMAL_* variables; the builder starts from it.
//! - The background thread CPU affinity is threaded through the config (`aux_cpu`);
//!   a process-wide default can still be set explicitly, see
//!   [`set_aux_thread_affinity`]. It is read once per background thread start.

use std::fmt;
use std::sync::Mutex;

use crate::consts::{AUX_PERIOD_MS, PREALLOC_SIZE};

/// Per-handle configuration.
#[derive(Clone, Debug)]
pub struct YamalConfig {
    /// Run the page preallocation / sync thread for read-write handles.
    /// Env: YAMAL_AUX_THREAD (default true)
    pub aux_thread: bool,

    /// Logical CPU to pin the background thread to. None: use the process default.
    /// Env: YAMAL_AUX_CPU
    pub aux_cpu: Option<usize>,

    /// Wake period of the background thread in milliseconds.
    /// Env: YAMAL_AUX_PERIOD_MS (default 10)
    pub aux_period_ms: u64,

    /// Whether the background thread kicks off an async flush of mapped pages.
    /// Env: YAMAL_AUX_SYNC (default true)
    pub aux_sync: bool,

    /// How far ahead of the reserved size pages are preallocated (bytes).
    /// Env: YAMAL_PREALLOC_SIZE (default 3 MiB)
    pub prealloc_size: u64,

    /// Closable mode requested on open. Fixed permanently by the first writer.
    /// Env: YAMAL_CLOSABLE (default false)
    pub closable: bool,
}

impl Default for YamalConfig {
    fn default() -> Self {
        Self {
            aux_thread: true,
            aux_cpu: None,
            aux_period_ms: AUX_PERIOD_MS,
            aux_sync: true,
            prealloc_size: PREALLOC_SIZE,
            closable: false,
        }
    }
}

fn env_flag(name: &str) -> Option<bool> {
    std::env::var(name).ok().map(|v| {
        let s = v.trim().to_ascii_lowercase();
        s == "1" || s == "true" || s == "yes" || s == "on"
    })
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
}

impl YamalConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Some(on) = env_flag("YAMAL_AUX_THREAD") {
            cfg.aux_thread = on;
        }
        if let Some(cpu) = env_u64("YAMAL_AUX_CPU") {
            cfg.aux_cpu = Some(cpu as usize);
        }
        if let Some(ms) = env_u64("YAMAL_AUX_PERIOD_MS") {
            if ms > 0 {
                cfg.aux_period_ms = ms;
            }
        }
        if let Some(on) = env_flag("YAMAL_AUX_SYNC") {
            cfg.aux_sync = on;
        }
        if let Some(n) = env_u64("YAMAL_PREALLOC_SIZE") {
            cfg.prealloc_size = n;
        }
        if let Some(on) = env_flag("YAMAL_CLOSABLE") {
            cfg.closable = on;
        }

        cfg
    }

    pub fn with_aux_thread(mut self, on: bool) -> Self {
        self.aux_thread = on;
        self
    }

    pub fn with_aux_cpu(mut self, cpu: Option<usize>) -> Self {
        self.aux_cpu = cpu;
        self
    }

    pub fn with_aux_period_ms(mut self, ms: u64) -> Self {
        self.aux_period_ms = ms.max(1);
        self
    }

    pub fn with_aux_sync(mut self, on: bool) -> Self {
        self.aux_sync = on;
        self
    }

    pub fn with_prealloc_size(mut self, bytes: u64) -> Self {
        self.prealloc_size = bytes;
        self
    }

    pub fn with_closable(mut self, on: bool) -> Self {
        self.closable = on;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> Self {
        self
    }

    /// CPU the background thread should be pinned to: explicit `aux_cpu`,
    /// otherwise the process-wide default.
    pub fn effective_aux_cpu(&self) -> Option<usize> {
        self.aux_cpu.or_else(aux_thread_affinity)
    }
}

impl fmt::Display for YamalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "YamalConfig {{ \
             aux_thread: {}, \
             aux_cpu: {}, \
             aux_period_ms: {}, \
             aux_sync: {}, \
             prealloc_size: {}, \
             closable: {} \
             }}",
            self.aux_thread,
            self.aux_cpu
                .map(|v| v.to_string())
                .unwrap_or_else(|| "default(process)".to_string()),
            self.aux_period_ms,
            self.aux_sync,
            self.prealloc_size,
            self.closable,
        )
    }
}

/// Lightweight builder that produces a YamalConfig.
#[derive(Clone, Debug)]
pub struct YamalBuilder {
    cfg: YamalConfig,
}

impl Default for YamalBuilder {
    fn default() -> Self {
        // Start from env, then allow overrides.
        Self {
            cfg: YamalConfig::from_env(),
        }
    }
}

impl YamalBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a clean default (without reading env).
    pub fn from_default() -> Self {
        Self {
            cfg: YamalConfig::default(),
        }
    }

    pub fn aux_thread(mut self, on: bool) -> Self {
        self.cfg.aux_thread = on;
        self
    }

    pub fn aux_cpu(mut self, cpu: Option<usize>) -> Self {
        self.cfg.aux_cpu = cpu;
        self
    }

    pub fn aux_period_ms(mut self, ms: u64) -> Self {
        self.cfg.aux_period_ms = ms.max(1);
        self
    }

    pub fn aux_sync(mut self, on: bool) -> Self {
        self.cfg.aux_sync = on;
        self
    }

    pub fn prealloc_size(mut self, bytes: u64) -> Self {
        self.cfg.prealloc_size = bytes;
        self
    }

    pub fn closable(mut self, on: bool) -> Self {
        self.cfg.closable = on;
        self
    }

    /// Finish the builder and obtain the configuration.
    pub fn build(self) -> YamalConfig {
        self.cfg
    }
}

// ---------- process-wide affinity default ----------

static AUX_AFFINITY: Mutex<Option<usize>> = Mutex::new(None);

/// Set the default CPU for background threads started after this call.
pub fn set_aux_thread_affinity(cpu: usize) {
    if let Ok(mut g) = AUX_AFFINITY.lock() {
        *g = Some(cpu);
    }
}

/// Remove the process-wide default; threads started afterwards are not pinned
/// unless their handle config asks for it.
pub fn clear_aux_thread_affinity() {
    if let Ok(mut g) = AUX_AFFINITY.lock() {
        *g = None;
    }
}

pub fn aux_thread_affinity() -> Option<usize> {
    AUX_AFFINITY.lock().ok().and_then(|g| *g)
}
