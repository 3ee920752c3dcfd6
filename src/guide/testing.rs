/*!
Testing

Sometimes, during tests, one might want to run an almost-full node. It can be done by executing
the compiled binary externally, but such thing is quite heavy-weight to orchestrate (making sure it
is already compiled, providing configuration, waiting for it to become ready, shutting it down
properly).

Alternatively, it is possible to get close to full node setup inside a local test function.

The bootstrap is done with [`NodeBin::build_from`], which takes the command line as a parameter
instead of using the one of the test process. The configuration file is usually prepared in a
temporary directory.

The node is then started with [`App::run_test`] instead of [`App::run`]. This runs the event loop
in a background thread and doesn't install the signal handlers, so things work as expected with
multiple tests running in parallel. It returns a [`TerminateGuard`]. Once it's dropped, the node is
terminated and the guard checks it terminated correctly.

Note that the bootstrap installs the process-wide logger, the last bootstrapped node wins.

[`NodeBin::build_from`]: crate::NodeBin::build_from
[`App::run_test`]: crate::App::run_test
[`App::run`]: crate::App::run
[`TerminateGuard`]: crate::terminate_guard::TerminateGuard

```rust
// This goes to some tests/something.rs or similar place.
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{self, Sender};

use nodebin::prelude::*;

struct Ready {
    id: String,
}

impl Node for Ready {
    fn new(mut options: Options) -> Result<Self, AnyError> {
        let ready = options
            .take::<Sender<String>>("ready")
            .ok_or("Nobody to tell we are ready")?;
        // Tell the test we are up and running.
        let _ = ready.send(options.node_id().to_owned());
        Ok(Ready {
            id: options.node_id().to_owned(),
        })
    }

    fn shutdown(&mut self) {
        log::info!("Shutting down {}", self.id);
    }
}

// The real factory would have no ready channel, the test one gets it injected.
struct TestFactory(Sender<String>);

impl NodeFactory for TestFactory {
    type Node = Ready;
    fn default_config_file(&self) -> PathBuf {
        "/etc/ready.yml".into()
    }
    fn additional_config(&self, options: Options, _: &RawConfig) -> Result<Options, PropertyError> {
        Ok(options.with("ready", self.0.clone()))
    }
}

let dir = tempfile::tempdir().unwrap();
let cfg = dir.path().join("node.yml");
fs::write(
    &cfg,
    format!(
        "base_dir: /tmp\nnode_id: test\nmbus: local\nlocal_db: db\nlog_level: WARN\npid: {}\n",
        dir.path().join("node.pid").display(),
    ),
)
.unwrap();

let (ready_send, ready_recv) = mpsc::channel();
let app = NodeBin::new(TestFactory(ready_send))
    // Ignore the arguments passed to the test binary.
    .build_from(vec!["node".into(), "-c".into(), cfg.into_os_string()])
    .expect("Failed to bootstrap the test node");

// The running is a RAII guard. Once it's dropped, it will terminate the node and check it
// terminated correctly.
let running = app.run_test();

// Wait for the node to be constructed (or dead, which would error out and the test would fail).
assert_eq!("test", ready_recv.recv().unwrap());

// Now, we can do our testing here. After we are done, the above will just shut down all the stuff.
assert!(!running.terminator().is_terminated());
```
*/
