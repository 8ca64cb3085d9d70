//! # CLI - Sharded Collection Shell
//!
//! A REPL-style front end for the shard library. Reads commands from stdin,
//! assembles a collection of blobs and reconciles it into a directory-backed
//! record store. Designed for both interactive use and scripted testing
//! (pipe commands via stdin). Logs go to stderr so stdout stays scriptable.
//!
//! ## Commands
//!
//! ```text
//! PUT key value        Append a blob (value is the rest of the line)
//! PUTFILE key path     Append a blob read from a file
//! SYNC                 Run a full reconciliation pass against the store
//! NAMES                Print shard names from the last successful pass
//! PLAN                 Print the planned shards without touching the store
//! LIST [selector]      Refresh the cache from the store and list records
//! SHOW name            Print one cached record (keys and sizes)
//! RESET                Start a fresh collection
//! STATS                Print collection debug info
//! EXIT / QUIT          Shut down
//! ```
//!
//! ## Configuration
//!
//! ```text
//! SHARD_STORE_DIR          store root directory       (default: "data/records")
//! SHARD_NAMESPACE          namespace of the shards    (default: "default")
//! SHARD_BASE_NAME          shard name prefix          (default: "blobs")
//! SHARD_MAX_RECORD_SIZE    store hard limit in bytes  (default: 1048576)
//! SHARD_CAPACITY           planner packing target     (default: limit - 50000)
//! SHARD_DELETE_LIMIT        deletions per reclaim      (default: 1024, 0 = unbounded)
//! SHARD_REMOVE_UNSHARDED   delete "<base>" record     (default: false)
//! SHARD_SYNC               fsync every record write   (default: true)
//! RUST_LOG                 log filter                 (default: "warn")
//! ```
//!
//! ## Example
//!
//! ```text
//! $ cargo run -p cli
//! shard shell started (store=data/records, namespace=default, base=blobs, capacity=998576)
//! > PUT ca.crt -----BEGIN CERTIFICATE-----
//! OK (1 blobs)
//! > SYNC
//! OK shards=1 reclaimed=0 legacy_removed=false
//! > NAMES
//! blobs-0
//! (1 shards)
//! > EXIT
//! bye
//! ```

mod command;
mod session;

use anyhow::Result;
use command::Command;
use config::Config;
use session::Session;
use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::from_env()?;
    let mut session = Session::open(cfg)?;

    let cfg = session.config();
    println!(
        "shard shell started (store={}, namespace={}, base={}, capacity={})",
        cfg.store_dir.display(),
        cfg.namespace,
        cfg.base_name,
        cfg.capacity
    );
    println!("Commands: PUT key value | PUTFILE key path | SYNC | NAMES | PLAN");
    println!("          LIST [selector] | SHOW name | RESET | STATS | EXIT");
    print!("> ");
    io::stdout().flush().ok();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        match Command::parse(&line) {
            Ok(Some(Command::Exit)) => {
                println!("bye");
                break;
            }
            Ok(Some(cmd)) => {
                if let Err(e) = session.execute(cmd, &mut stdout) {
                    println!("ERR {:#}", e);
                }
            }
            Ok(None) => {}
            Err(e) => println!("ERR {}", e),
        }

        print!("> ");
        io::stdout().flush().ok();
    }

    Ok(())
}
