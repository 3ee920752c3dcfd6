//! A node that only tells it is alive.
//!
//! Besides the options every node takes, it reads:
//!
//! * `heartbeat_ms`: How often to log a heartbeat, 1000 by default.
//! * `port_range`: A range of ports (`first` and `last`), only reported on startup.
//! * `crash_after_ms`: Fail on purpose this long after the start. Useful to see what a fatal
//!   error looks like.

use std::cell::Cell;
use std::error::Error;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use log::{debug, info, warn};
use nodebin::prelude::*;
use tokio::time;

const DEFAULT_HEARTBEAT_MS: i64 = 1000;

#[derive(Debug)]
struct Crashed(u64);

impl Display for Crashed {
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        write!(fmt, "Crashed on purpose after {} ms", self.0)
    }
}

impl Error for Crashed {}

struct EchoNode {
    node_id: String,
    stopped: Rc<Cell<bool>>,
}

fn millis(ms: i64) -> Duration {
    Duration::from_millis(ms.max(1) as u64)
}

impl Node for EchoNode {
    fn new(mut options: Options) -> Result<Self, AnyError> {
        let heartbeat = options
            .take::<i64>("heartbeat_ms")
            .unwrap_or(DEFAULT_HEARTBEAT_MS);
        if heartbeat <= 0 {
            warn!("Heartbeat of {} ms makes no sense, using 1 ms", heartbeat);
        }
        let node_id = options.node_id().to_owned();
        if let Some(ports) = options.take::<RangeInclusive<i64>>("port_range") {
            info!(
                "Ports {} to {} ({} in total) available",
                ports.start(),
                ports.end(),
                ports.clone().count()
            );
        }

        let stopped = Rc::new(Cell::new(false));
        let mut interval = time::interval(millis(heartbeat));
        let beat_stopped = Rc::clone(&stopped);
        let beat_id = node_id.clone();
        options.reactor().spawn(async move {
            while !beat_stopped.get() {
                interval.tick().await;
                debug!("Heartbeat from {}", beat_id);
            }
            Ok::<_, AnyError>(())
        });

        if let Some(crash) = options.take::<i64>("crash_after_ms") {
            options.reactor().spawn(async move {
                time::sleep(millis(crash)).await;
                Err::<(), AnyError>(Crashed(crash.max(1) as u64).into())
            });
        }

        info!("Echo node {} started in {}", node_id, options.base_dir());
        Ok(EchoNode { node_id, stopped })
    }

    fn shutdown(&mut self) {
        self.stopped.set(true);
        info!("Node shutdown");
        debug!("Node {} stopped", self.node_id);
    }
}

struct EchoFactory;

impl NodeFactory for EchoFactory {
    type Node = EchoNode;

    fn default_config_file(&self) -> PathBuf {
        "/etc/nodebin/echo_node.yml".into()
    }

    fn additional_config(
        &self,
        options: Options,
        cfg: &RawConfig,
    ) -> Result<Options, PropertyError> {
        let heartbeat = cfg
            .optional::<i64>("heartbeat_ms")?
            .unwrap_or(DEFAULT_HEARTBEAT_MS);
        let mut options = options.with("heartbeat_ms", heartbeat);
        if let Some(ports) = cfg.optional::<RangeInclusive<i64>>("port_range")? {
            options.insert("port_range", ports);
        }
        if let Some(crash) = cfg.optional::<i64>("crash_after_ms")? {
            options.insert("crash_after_ms", crash);
        }
        Ok(options)
    }
}

fn main() {
    NodeBin::new(EchoFactory).run()
}
