//! Per-watcher reactor.
//!
//! Couples a file filter, an ignore overlay, a debouncer, and a shell
//! executor. A matching file event (re)arms the debouncer; when it fires,
//! the reactor runs the Action: kill the previous service, run the tasks
//! in order, relaunch the service, then optionally broadcast a browser
//! refresh through the proxy.

mod debounce;
mod shell;

pub use debounce::Debouncer;
pub use shell::{Shell, ShellError};

use rustc_hash::FxHashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{ConfigError, WatcherConfig};
use crate::log;
use crate::proxy::RefreshHandle;
use crate::watch::IgnoreMatcher;

/// Watcher runtime: filter → debounce → action.
///
/// Cheap to clone; clones share the debouncer and the shell, so at most
/// one service process exists per watcher at any time.
#[derive(Clone)]
pub struct Reactor {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    /// Watched extensions, stored without the leading dot.
    extensions: FxHashSet<String>,
    file_names: FxHashSet<String>,
    /// Watcher-local overlay, applied after the root-level rules.
    matcher: IgnoreMatcher,
    tasks: Vec<String>,
    service: Option<String>,
    shell: Shell,
    debouncer: Debouncer,
    refresh: Option<RefreshHandle>,
    trigger_refresh: bool,
}

impl Reactor {
    /// Build a reactor from its validated config entry.
    pub fn from_config(
        watcher: &WatcherConfig,
        root: &Path,
        refresh: Option<RefreshHandle>,
    ) -> Result<Self, ConfigError> {
        let matcher = watcher.exclude.compile(root)?;

        Ok(Self {
            inner: Arc::new(Inner {
                name: watcher.name.clone(),
                extensions: watcher
                    .file_types
                    .iter()
                    .map(|ext| ext.trim_start_matches('.').to_string())
                    .collect(),
                file_names: watcher.file_names.iter().cloned().collect(),
                matcher,
                tasks: watcher.tasks.clone(),
                service: (!watcher.service.is_empty()).then(|| watcher.service.clone()),
                shell: Shell::new(
                    Duration::from_millis(watcher.max_task_time),
                    Duration::from_millis(watcher.max_service_timeout),
                ),
                debouncer: Debouncer::new(Duration::from_millis(watcher.debounce_delay)),
                refresh,
                trigger_refresh: watcher.trigger_refresh,
            }),
        })
    }

    /// Handle a file change event.
    ///
    /// Non-blocking: filters the path, then (re)arms the debouncer.
    pub fn notify(&self, path: &Path) {
        if !self.inner.wants(path) {
            return;
        }

        if self.inner.matcher.should_ignore(path, false) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let path = path.to_path_buf();
        self.inner.debouncer.run(move || async move {
            log!("watch"; "{} changed", path.display());
            inner.run_action().await;
        });
    }

    /// Enqueue one Action through the debouncer (used for run-on-start).
    pub fn trigger(&self) {
        let inner = Arc::clone(&self.inner);
        self.inner.debouncer.run(move || async move {
            inner.run_action().await;
        });
    }

    /// Stop the debounce timer and kill the running service, if any.
    pub async fn close(&self) {
        self.inner.debouncer.stop();
        if let Err(err) = self.inner.shell.kill().await {
            log!("error"; "{}: {err}", self.inner.name);
        }
    }

    #[cfg(test)]
    fn wants(&self, path: &Path) -> bool {
        self.inner.wants(path)
    }
}

impl Inner {
    /// Whether the file matches this watcher's extension/name sets.
    fn wants(&self, path: &Path) -> bool {
        let ext_matched = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.extensions.contains(ext));

        let name_matched = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| self.file_names.contains(name));

        ext_matched || name_matched
    }

    /// The Action: kill → tasks → service → optional refresh.
    ///
    /// The first failing step logs and aborts; the previous service stays
    /// killed.
    async fn run_action(&self) {
        if let Err(err) = self.shell.kill().await {
            log!("error"; "{} kill error: {err}", self.name);
            return;
        }

        if let Err(err) = self.run_tasks().await {
            log!("error"; "{} task error: {err}", self.name);
            if !err.output().is_empty() {
                log!(&self.name; "{}", err.output());
            }
            return;
        }

        if let Err(err) = self.run_service().await {
            log!("error"; "{} service error: {err}", self.name);
            return;
        }

        if self.trigger_refresh
            && let Some(refresh) = &self.refresh
        {
            refresh.refresh();
        }
    }

    async fn run_tasks(&self) -> Result<(), ShellError> {
        if self.tasks.is_empty() {
            return Ok(());
        }

        log!(&self.name; "running tasks");
        for task in &self.tasks {
            let output = self.shell.exec(task).await?;
            if !output.is_empty() {
                log!(&self.name; "{output}");
            }
        }

        Ok(())
    }

    async fn run_service(&self) -> Result<(), ShellError> {
        if let Some(service) = &self.service {
            log!(&self.name; "running service");
            self.shell.run(service).await?;
        }

        Ok(())
    }
}
