//! Supervisor — wires the watch manager, reactors, and proxy together.
//!
//! Thin orchestrator: it owns no behavior of its own beyond construction
//! order and teardown. Start order matters: the watcher is armed first so
//! nothing is missed, then the proxy, then the reactors (staggered so the
//! run-on-start actions observe a stable order), and finally the event
//! loop begins dispatching.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::proxy::Proxy;
use crate::reactor::Reactor;
use crate::utils::normalize_path;
use crate::watch::WatchManager;
use crate::{debug, log};

/// Delay between reactor spawns; keeps run-on-start actions in config order.
const STARTUP_DELAY: Duration = Duration::from_millis(50);

/// Running supervisor instance.
pub struct Supervisor {
    root: PathBuf,
    cleanup_tmp: bool,
    reactors: Vec<Reactor>,
    proxy: Option<Proxy>,
    shutdown_tx: watch::Sender<bool>,
    watch_handle: JoinHandle<()>,
}

impl Supervisor {
    /// Construct and start every component from a validated config.
    pub async fn start(config: Config) -> Result<Self> {
        let root = normalize_path(Path::new(&config.root_dir));
        let matcher = config.exclude.compile(&root)?;

        if config.tmp {
            create_tmp_dir(&root)?;
        }

        // Watcher-first: events buffer while the rest is constructed
        let manager = WatchManager::new(&root, matcher).context("failed to start watch manager")?;

        let proxy = if config.proxy.enabled {
            Some(Proxy::bind(&config.proxy).await?)
        } else {
            None
        };

        let mut reactors = Vec::with_capacity(config.watchers.len());
        for watcher in &config.watchers {
            let refresh = proxy.as_ref().map(Proxy::refresh_handle);
            let reactor = Reactor::from_config(watcher, &root, refresh)?;

            if watcher.run_on_start {
                reactor.trigger();
            }

            reactors.push(reactor);
            tokio::time::sleep(STARTUP_DELAY).await;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let watch_handle = tokio::spawn(manager.run(reactors.clone(), shutdown_rx));

        Ok(Self {
            root,
            cleanup_tmp: config.cleanup_tmp,
            reactors,
            proxy,
            shutdown_tx,
            watch_handle,
        })
    }

    /// Tear everything down. Best-effort: errors are logged, never fatal.
    pub async fn stop(self) {
        for reactor in &self.reactors {
            reactor.close().await;
        }

        if let Some(proxy) = self.proxy {
            proxy.close().await;
        }

        if self.cleanup_tmp
            && let Err(err) = std::fs::remove_dir_all(self.root.join("tmp"))
            && err.kind() != std::io::ErrorKind::NotFound
        {
            log!("error"; "failed to remove tmp dir: {err}");
        }

        let _ = self.shutdown_tx.send(true);
        let _ = self.watch_handle.await;
        debug!("watch"; "supervisor stopped");
    }
}

fn create_tmp_dir(root: &Path) -> Result<()> {
    let tmp = root.join("tmp");
    std::fs::create_dir_all(&tmp).with_context(|| format!("failed to create {}", tmp.display()))?;

    #[cfg(unix)]
    {
        use std::fs::Permissions;
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp, Permissions::from_mode(0o755))?;
    }

    Ok(())
}
