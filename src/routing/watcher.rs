//! App directory watcher for development rebuilds.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc};

use crate::routing::table::RouteTable;

/// Watches the app directory and rebuilds the route table on change.
pub struct RouteWatcher {
    table: Arc<RouteTable>,
    path: PathBuf,
    debounce: Duration,
}

impl RouteWatcher {
    pub fn new(table: Arc<RouteTable>, debounce: Duration) -> Self {
        let path = table.app_dir().to_path_buf();
        Self {
            table,
            path,
            debounce,
        }
    }

    /// Start the filesystem watcher and the rebuild loop.
    ///
    /// The returned watcher must be kept alive for events to keep flowing.
    pub fn run(
        self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<RecommendedWatcher, notify::Error> {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove() {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&self.path, RecursiveMode::Recursive)?;

        tracing::info!(path = ?self.path, "Route watcher started");

        let table = self.table;
        let debounce = self.debounce;
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = rx.recv() => {
                        if changed.is_none() {
                            break;
                        }
                        // Coalesce bursts (editors write several events per save)
                        tokio::time::sleep(debounce).await;
                        while rx.try_recv().is_ok() {}

                        tracing::info!("App directory change detected, rebuilding routes...");
                        let _ = table.rebuild().await;
                    }
                    _ = shutdown.recv() => {
                        tracing::info!("Route watcher received shutdown signal, exiting loop");
                        break;
                    }
                }
            }
        });

        Ok(watcher)
    }
}
