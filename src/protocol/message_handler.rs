use std::collections::HashMap;

use chrono::Utc;
use log::{debug, info, warn};
use serde_json::Value;

use super::messages::Message;
use crate::{Address, RouterState};

/// A datagram to put on the wire once the state lock has been released.
pub type Outbound = (Address, Message);

/// Apply one decoded message to the router state and return whatever needs to
/// be sent in response. Performs no I/O itself, so it is safe to call while
/// holding the state lock.
pub fn handle_message(state: &mut RouterState, message: Message) -> Vec<Outbound> {
    match message {
        Message::Update {
            source, distances, ..
        } => {
            apply_update(state, source, &distances);
            Vec::new()
        }
        Message::Data {
            source,
            destination,
            payload,
        } => handle_data(state, source, destination, payload),
        Message::Trace {
            source,
            destination,
            routers,
        } => handle_trace(state, source, destination, routers),
    }
}

/// Merge every advertised destination and refresh its liveness timestamp.
/// Liveness is keyed by the destination appearing in the update, not by the
/// sender, so a destination stays alive through whichever neighbor relays it.
fn apply_update(state: &mut RouterState, source: Address, distances: &HashMap<Address, u32>) {
    debug!(
        "update from {source} advertising {} destinations",
        distances.len()
    );
    let now = Utc::now();
    for (&destination, &cost) in distances {
        state.liveness.touch(destination, now);
        if destination == state.local {
            continue;
        }
        state.table.merge(source, destination, cost);
    }
}

fn handle_data(
    state: &RouterState,
    source: Address,
    destination: Address,
    payload: Value,
) -> Vec<Outbound> {
    if destination == state.local {
        deliver_payload(&payload);
        return Vec::new();
    }
    match state.table.next_hop(&destination) {
        Some(next_hop) => vec![(
            next_hop,
            Message::Data {
                source,
                destination,
                payload,
            },
        )],
        None => {
            debug!("no route to {destination}, dropping data packet from {source}");
            Vec::new()
        }
    }
}

fn handle_trace(
    state: &RouterState,
    source: Address,
    destination: Address,
    mut routers: Vec<Address>,
) -> Vec<Outbound> {
    if routers.contains(&state.local) {
        warn!("trace from {source} has already visited this router, loop detected, dropping");
        return Vec::new();
    }
    routers.push(state.local);

    if destination == state.local {
        // Reply with the completed trace serialized into an opaque payload,
        // sent straight back to the originator.
        let trace = Message::Trace {
            source,
            destination,
            routers,
        };
        let payload = match serde_json::to_string(&trace) {
            Ok(text) => Value::String(text),
            Err(e) => {
                warn!("failed to encode trace reply for {source}: {e}");
                return Vec::new();
            }
        };
        info!("trace from {source} reached us, replying with the recorded path");
        return vec![(
            source,
            Message::Data {
                source: state.local,
                destination: source,
                payload,
            },
        )];
    }

    match state.table.next_hop(&destination) {
        Some(next_hop) => vec![(
            next_hop,
            Message::Trace {
                source,
                destination,
                routers,
            },
        )],
        None => {
            warn!("destination {destination} unreachable, trace from {source} dropped");
            Vec::new()
        }
    }
}

/// Application delivery boundary: a data packet addressed to this router has
/// its payload printed for the operator.
fn deliver_payload(payload: &Value) {
    let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
    println!("payload received:\n{text}");
}
