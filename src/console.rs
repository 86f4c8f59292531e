use std::fmt::Write as _;
use std::sync::Arc;

use anyhow::Result;
use log::info;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;
use tokio::sync::watch;

use crate::protocol::messages::Message;
use crate::protocol::send_message;
use crate::{Address, SharedRouterState};

const USAGE: &str =
    "commands: add <address> <cost> | del <address> | trace <address> | routes | neighbors | quit";

/// Interactive operator command loop on stdin. Returns after `quit` or
/// end-of-input, flipping the shutdown channel so the protocol tasks wind
/// down.
pub async fn run(
    state: SharedRouterState,
    socket: Arc<UdpSocket>,
    shutdown: watch::Sender<bool>,
) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    run_with_input(state, socket, shutdown, stdin).await
}

/// Command loop over any line source. The shutdown signal fires on every
/// exit path, including a failed read, so the protocol tasks never outlive
/// the console.
async fn run_with_input<R>(
    state: SharedRouterState,
    socket: Arc<UdpSocket>,
    shutdown: watch::Sender<bool>,
    input: R,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    let result = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(e) => break Err(e),
        };
        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [] => {}
            ["add", addr, cost] => cmd_add(&state, addr, cost).await,
            ["del", addr] => cmd_del(&state, addr).await,
            ["trace", addr] => cmd_trace(&state, &socket, addr).await,
            ["routes"] => print!("{}", format_routes(&state).await),
            ["neighbors"] => print!("{}", format_neighbors(&state).await),
            ["quit"] => break Ok(()),
            _ => println!("{USAGE}"),
        }
    };

    info!("console closed, shutting down");
    let _ = shutdown.send(true);
    result.map_err(Into::into)
}

async fn cmd_add(state: &SharedRouterState, addr: &str, cost: &str) {
    let (Ok(addr), Ok(cost)) = (addr.parse::<Address>(), cost.parse::<u32>()) else {
        println!("usage: add <address> <cost>");
        return;
    };
    state.write().await.add_neighbor(addr, cost);
    info!("neighbor {addr} added with link cost {cost}");
}

async fn cmd_del(state: &SharedRouterState, addr: &str) {
    let Ok(addr) = addr.parse::<Address>() else {
        println!("usage: del <address>");
        return;
    };
    state.write().await.delete_neighbor(addr);
    info!("neighbor {addr} removed along with routes learned through it");
}

/// Originate a trace toward `addr`, seeding the visited list with ourselves.
/// The computed next hop is resolved under the lock; the send happens after.
async fn cmd_trace(state: &SharedRouterState, socket: &UdpSocket, addr: &str) {
    let Ok(destination) = addr.parse::<Address>() else {
        println!("usage: trace <address>");
        return;
    };

    let outbound = {
        let guard = state.read().await;
        guard.table.next_hop(&destination).map(|next_hop| {
            (
                next_hop,
                Message::Trace {
                    source: guard.local,
                    destination,
                    routers: vec![guard.local],
                },
            )
        })
    };

    match outbound {
        Some((next_hop, message)) => send_message(socket, next_hop, &message).await,
        None => println!("no route to {destination}, trace not sent"),
    }
}

async fn format_routes(state: &SharedRouterState) -> String {
    let guard = state.read().await;
    let mut output = String::new();
    writeln!(output, "Routing Table:").unwrap();
    writeln!(
        output,
        "{:<18} {:<18} {:<8}",
        "Destination", "Next Hop", "Distance"
    )
    .unwrap();
    writeln!(output, "{}", "-".repeat(46)).unwrap();

    let mut routes: Vec<_> = guard.table.iter().collect();
    routes.sort_by_key(|(destination, _)| **destination);
    for (destination, route) in routes {
        writeln!(
            output,
            "{:<18} {:<18} {:<8}",
            destination.to_string(),
            route.next_hop.to_string(),
            route.distance
        )
        .unwrap();
    }
    output
}

async fn format_neighbors(state: &SharedRouterState) -> String {
    let guard = state.read().await;
    let mut output = String::new();
    writeln!(output, "Neighbors: {}", guard.neighbors.len()).unwrap();

    let mut neighbors: Vec<_> = guard.neighbors.iter().collect();
    neighbors.sort();
    for neighbor in neighbors {
        let distance = guard
            .table
            .get(neighbor)
            .map(|route| route.distance.to_string())
            .unwrap_or_else(|| "?".to_string());
        writeln!(output, "  {neighbor} (link cost {distance})").unwrap();
    }

    if !guard.deleted_neighbors.is_empty() {
        let mut deleted: Vec<_> = guard.deleted_neighbors.iter().collect();
        deleted.sort();
        writeln!(output, "Deleted: {deleted:?}").unwrap();
    }
    output
}
