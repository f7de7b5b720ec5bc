// Copyright (c) 2026 Tool Execution Hub maintainers
// SPDX-License-Identifier: Apache-2.0

//! Hot-reload watcher (spec §4.4): watches every discovery root
//! recursively, debounces file-system events, and signals the hub to
//! run a full re-scan. Grounded on the debounced-`notify`-watcher
//! pattern from `examples/vinhnx-VTCode/src/config_watcher.rs`, adapted
//! from "reload one config file" to "signal a tool re-scan".

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::infrastructure::config::DiscoveryRoot;

/// Owns the OS watch handles; dropping it stops watching. Re-scan
/// signals arrive debounced on the paired receiver.
pub struct RootWatcher {
    _watcher: RecommendedWatcher,
}

impl RootWatcher {
    pub fn start(roots: &[DiscoveryRoot], debounce: Duration) -> notify::Result<(Self, mpsc::UnboundedReceiver<()>)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let last_event_time = Arc::new(Mutex::new(Instant::now() - debounce - Duration::from_millis(1)));

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let Ok(event) = res else { return };
                if !matches!(event.kind, notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)) {
                    return;
                }
                let now = Instant::now();
                let mut last = last_event_time.lock().unwrap();
                if now.duration_since(*last) >= debounce {
                    *last = now;
                    let _ = tx.send(());
                }
            },
            Config::default(),
        )?;

        for root in roots {
            watcher.watch(&root.path, RecursiveMode::Recursive)?;
        }

        Ok((Self { _watcher: watcher }, rx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn watching_a_root_surfaces_a_debounced_signal_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let root = DiscoveryRoot { path: dir.path().to_path_buf(), namespace: "ns".into() };
        let (_watcher, mut rx) = RootWatcher::start(&[root], StdDuration::from_millis(50)).unwrap();

        std::fs::write(dir.path().join("tool.json"), "{}").unwrap();

        let signaled = tokio::time::timeout(StdDuration::from_secs(2), rx.recv()).await;
        assert!(signaled.is_ok());
    }
}
