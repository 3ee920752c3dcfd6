//! Termination signals delivered to a running node.
//!
//! Lives in its own test binary, as it installs the process-wide signal handlers.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;

use nodebin::prelude::*;
use signal_hook::low_level;

struct Sleeper {
    shutdowns: Arc<AtomicUsize>,
}

impl Node for Sleeper {
    fn new(mut options: Options) -> Result<Self, AnyError> {
        let shutdowns = options
            .take::<Arc<AtomicUsize>>("shutdowns")
            .ok_or("Missing shutdown counter")?;
        let ready = options
            .take::<Sender<()>>("ready")
            .ok_or("Missing ready channel")?;
        // Runs only once the loop is up, after the signal handlers are in place.
        options.reactor().spawn(async move {
            let _ = ready.send(());
            Ok::<_, AnyError>(())
        });
        Ok(Sleeper { shutdowns })
    }

    fn shutdown(&mut self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

struct Factory {
    cfg: PathBuf,
    shutdowns: Arc<AtomicUsize>,
    ready: Sender<()>,
}

impl NodeFactory for Factory {
    type Node = Sleeper;
    fn default_config_file(&self) -> PathBuf {
        self.cfg.clone()
    }
    fn additional_config(
        &self,
        options: Options,
        _: &RawConfig,
    ) -> Result<Options, PropertyError> {
        Ok(options
            .with("shutdowns", Arc::clone(&self.shutdowns))
            .with("ready", self.ready.clone()))
    }
}

#[test]
fn two_signals_one_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = dir.path().join("node.yml");
    fs::write(
        &cfg,
        format!(
            "base_dir: /tmp\nnode_id: sig\nmbus: local\nlocal_db: db\npid: {}\n",
            dir.path().join("node.pid").display()
        ),
    )
    .unwrap();
    let shutdowns = Arc::new(AtomicUsize::new(0));
    let (ready, ready_recv) = mpsc::channel();
    let app = NodeBin::new(Factory {
        cfg,
        shutdowns: Arc::clone(&shutdowns),
        ready,
    })
    .build_from(vec!["node"])
    .unwrap();

    let running = thread::spawn(move || app.run());
    ready_recv.recv().unwrap();
    low_level::raise(libc::SIGTERM).unwrap();
    low_level::raise(libc::SIGINT).unwrap();
    running.join().unwrap().unwrap();
    assert_eq!(1, shutdowns.load(Ordering::SeqCst));
}
