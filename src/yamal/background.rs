//! yamal/background: фоновый поток предаллокации страниц и async sync.
//!
//! Каждые `aux_period_ms`:
//! - отображает страницу с `reserved_size + prealloc_size` (и пропущенные до неё);
//! - если `aux_sync`, запускает MS_ASYNC для всех отображённых страниц.
//! Ошибки не уходят к вызывающим: только `warn!` и счётчик aux_errors.
//! Остановка: флаг под Mutex + Condvar, ожидание ограничено периодом.

use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};

use crate::error::{Result, YamalError};
use crate::metrics::{record_aux_cycle, record_aux_error, record_aux_sync};

use super::core::Shared;

struct Signal {
    stop: Mutex<bool>,
    cv: Condvar,
}

pub(crate) struct AuxThread {
    signal: Arc<Signal>,
    handle: Option<JoinHandle<()>>,
}

impl AuxThread {
    pub(crate) fn spawn(shared: Arc<Shared>) -> Result<Self> {
        let signal = Arc::new(Signal {
            stop: Mutex::new(false),
            cv: Condvar::new(),
        });
        let cpu = shared.cfg.effective_aux_cpu();
        let sig = Arc::clone(&signal);
        let handle = thread::Builder::new()
            .name("yamal-aux".to_string())
            .spawn(move || run(shared, sig, cpu))
            .map_err(|e| YamalError::io("spawn yamal-aux thread", e))?;
        Ok(Self {
            signal,
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for its current cycle to finish.
    pub(crate) fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        match self.signal.stop.lock() {
            Ok(mut stop) => *stop = true,
            Err(poisoned) => *poisoned.into_inner() = true,
        }
        self.signal.cv.notify_all();
        if handle.join().is_err() {
            warn!("yamal-aux thread panicked");
        }
    }
}

impl Drop for AuxThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(shared: Arc<Shared>, signal: Arc<Signal>, cpu: Option<usize>) {
    if let Some(cpu) = cpu {
        if let Err(e) = pin_current_thread(cpu) {
            warn!("yamal-aux: cannot pin to cpu {}: {}", cpu, e);
        }
    }
    info!(
        "yamal-aux started for {} (period {}ms, prealloc {} bytes, sync {})",
        shared.pages.label(),
        shared.cfg.aux_period_ms,
        shared.cfg.prealloc_size,
        shared.cfg.aux_sync
    );

    let period = Duration::from_millis(shared.cfg.aux_period_ms.max(1));
    loop {
        let stopped = match signal.stop.lock() {
            Ok(guard) => match signal.cv.wait_timeout_while(guard, period, |stop| !*stop) {
                Ok((guard, _)) => *guard,
                Err(_) => true,
            },
            Err(_) => true,
        };
        if stopped {
            break;
        }
        cycle(&shared);
    }

    info!("yamal-aux stopped for {}", shared.pages.label());
}

fn cycle(shared: &Shared) {
    let fresh = match shared
        .reserved_size()
        .and_then(|reserved| shared.pages.prealloc_ahead(reserved, shared.cfg.prealloc_size))
    {
        Ok(n) => n,
        Err(e) => {
            warn!("yamal-aux: prealloc for {} failed: {}", shared.pages.label(), e);
            record_aux_error();
            0
        }
    };
    record_aux_cycle(fresh);

    if shared.cfg.aux_sync {
        match shared.pages.sync() {
            Ok(_) => record_aux_sync(),
            Err(e) => {
                warn!("yamal-aux: sync of {} failed: {}", shared.pages.label(), e);
                record_aux_error();
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn pin_current_thread(cpu: usize) -> std::io::Result<()> {
    if cpu >= libc::CPU_SETSIZE as usize {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("cpu index {} exceeds CPU_SETSIZE", cpu),
        ));
    }
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(cpu, &mut set);
        if libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn pin_current_thread(_cpu: usize) -> std::io::Result<()> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "thread affinity is only supported on linux",
    ))
}
