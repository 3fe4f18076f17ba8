// src/lib.rs

pub mod cli;
pub mod config;
pub mod coord;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fleet;
pub mod logging;
pub mod map;
pub mod tasks;
pub mod types;

use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, validate_against_map, FleetConfig};
use crate::engine::{CoreRuntime, Runtime, RuntimeEvent, RuntimeOptions};
use crate::exec::SimulatedBackend;
use crate::map::{load_map, TopoMap};
use crate::tasks::TaskRequest;
use crate::types::TaskUpdate;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config and map loading
/// - core runtime / async shell
/// - simulated execution backend
/// - task notifications on stdout
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)
        .with_context(|| format!("loading config '{}'", args.config))?;
    let map = load_map(&args.map).with_context(|| format!("loading map '{}'", args.map))?;
    validate_against_map(&cfg, &map)?;

    if args.dry_run {
        print_dry_run(&cfg, &map);
        return Ok(());
    }

    // Runtime event channel.
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(256);

    // Task notifications.
    let (updates_tx, updates_rx) = broadcast::channel::<TaskUpdate>(256);
    spawn_notification_printer(updates_rx);

    let backend = SimulatedBackend::new(map.clone(), cfg.simulation.secs_per_meter, rt_tx.clone());

    // Ctrl-C -> graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    spawn_submissions(rt_tx.clone(), args.submit);

    let options = RuntimeOptions {
        exit_when_idle: args.exit_when_idle,
    };

    // Construct the pure core runtime (single source of truth for semantics).
    let core = CoreRuntime::new(cfg, map, options, Instant::now());

    // Construct the async IO shell around the core.
    let runtime = Runtime::new(core, rt_rx, backend, updates_tx);
    runtime.run().await?;
    Ok(())
}

/// Feed start-up task submissions to the runtime from a background task, so
/// they never wait on a runtime that has not started yet.
pub fn spawn_submissions(
    tx: mpsc::Sender<RuntimeEvent>,
    submissions: Vec<TaskRequest>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        for request in submissions {
            let (reply, answer) = oneshot::channel();
            let origin = request.origin.clone();
            if tx.send(RuntimeEvent::SubmitTask { request, reply }).await.is_err() {
                debug!("runtime stopped before start-up submissions were sent");
                return;
            }
            match answer.await {
                Ok(Ok(id)) => info!(task = id, origin = %origin, "start-up task admitted"),
                Ok(Err(err)) => warn!(origin = %origin, error = %err, "start-up task rejected"),
                Err(_) => debug!("runtime stopped before answering submission"),
            }
        }
    })
}

/// Print every task notification on stdout, one per line.
fn spawn_notification_printer(mut updates: broadcast::Receiver<TaskUpdate>) {
    tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(update) => println!("{update}"),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "notification printer lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Simple dry-run output: print fleet, presence agents and map summary.
fn print_dry_run(cfg: &FleetConfig, map: &TopoMap) {
    println!("fleetcoord dry-run");
    println!("  coordinator.storage_node = {}", cfg.storage_node());
    println!("  coordinator.queue_capacity = {}", cfg.coordinator.queue_capacity);
    println!("  coordinator.tick_interval = {:?}", cfg.tick_interval());
    println!(
        "  coordinator.timeouts = load {:?}, unload {:?}",
        cfg.load_timeout(),
        cfg.unload_timeout()
    );
    println!(
        "  map = {} nodes, {} edges",
        map.node_count(),
        map.edge_count()
    );
    println!();

    println!("robots ({}):", cfg.robot.len());
    for (id, robot) in cfg.robot.iter() {
        println!("  - {id}");
        println!("      base_node: {}", robot.base_node);
        if let Some(ref wait) = robot.wait_node {
            println!("      wait_node: {wait}");
        }
        if robot.max_task_priority != u32::MAX {
            println!("      max_task_priority: {}", robot.max_task_priority);
        }
        if let Some(ref initial) = robot.initial_node {
            println!("      initial_node: {initial}");
        }
        if !map.has_path(&robot.base_node, cfg.storage_node()) {
            println!("      (storage unreachable from base)");
        }
    }

    if !cfg.presence.agents.is_empty() {
        println!("presence agents: {:?}", cfg.presence.agents);
    }

    debug!("dry-run complete (no execution)");
}
