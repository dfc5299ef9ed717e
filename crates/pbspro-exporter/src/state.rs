//! Shared application state and memory management.

#[cfg(not(target_env = "msvc"))]
use std::ptr;
use std::sync::Arc;

use pbspro_core::Collector;
use pbspro_core::sink::DEFAULT_MAX_SAMPLES;
#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

/// Returns unused memory to the operating system.
/// Purges dirty pages of all jemalloc arenas, including tokio worker arenas.
#[cfg(not(target_env = "msvc"))]
pub(crate) fn release_memory_to_os() {
    unsafe {
        // MALLCTL_ARENAS_ALL = 4096
        tikv_jemalloc_sys::mallctl(
            c"arena.4096.purge".as_ptr().cast(),
            ptr::null_mut(),
            ptr::null_mut(),
            ptr::null_mut(),
            0,
        );
    }
}

#[cfg(target_env = "msvc")]
pub(crate) fn release_memory_to_os() {}

/// Scrapes above this many samples purge allocator arenas afterwards.
pub(crate) const LARGE_SCRAPE_SAMPLES: usize = 100_000;

/// State shared by all request handlers.
///
/// Holds no per-scrape data: every scrape builds its own sink and opens its
/// own scheduler sessions.
pub(crate) struct AppState<R> {
    pub(crate) collector: Arc<Collector<R>>,
    pub(crate) namespace: Arc<str>,
    pub(crate) telemetry_path: Arc<str>,
    pub(crate) max_samples: usize,
}

impl<R> AppState<R> {
    pub(crate) fn new(collector: Collector<R>) -> Self {
        Self {
            collector: Arc::new(collector),
            namespace: Arc::from("pbspro"),
            telemetry_path: Arc::from("/metrics"),
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }

    pub(crate) fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = Arc::from(namespace);
        self
    }

    pub(crate) fn with_telemetry_path(mut self, path: &str) -> Self {
        self.telemetry_path = Arc::from(path);
        self
    }

    pub(crate) fn with_max_samples(mut self, max_samples: usize) -> Self {
        self.max_samples = max_samples;
        self
    }
}

impl<R> Clone for AppState<R> {
    fn clone(&self) -> Self {
        Self {
            collector: Arc::clone(&self.collector),
            namespace: Arc::clone(&self.namespace),
            telemetry_path: Arc::clone(&self.telemetry_path),
            max_samples: self.max_samples,
        }
    }
}
