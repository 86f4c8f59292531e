pub mod config;
pub mod console;
pub mod protocol;

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::warn;
use tokio::sync::RwLock;

use protocol::liveness::LivenessTracker;
use protocol::messages::Message;
use protocol::routing_table::RouteTable;

pub type Address = IpAddr;

/// A destination expires once it has gone this many update periods without
/// being mentioned in any inbound update.
pub const DEAD_PERIODS: u32 = 4;

#[derive(Debug)]
pub struct RouterState {
    pub local: Address,
    pub period: Duration,
    pub table: RouteTable,
    pub neighbors: HashSet<Address>,
    pub deleted_neighbors: HashSet<Address>,
    pub liveness: LivenessTracker,
}

impl RouterState {
    pub fn new(local: Address, period: Duration) -> Self {
        Self {
            local,
            period,
            table: RouteTable::new(local),
            neighbors: HashSet::new(),
            deleted_neighbors: HashSet::new(),
            liveness: LivenessTracker::new(),
        }
    }

    /// Insert or update a directly connected neighbor with its link cost.
    /// Re-adding clears any pending deleted-neighbor bookkeeping.
    pub fn add_neighbor(&mut self, addr: Address, cost: u32) {
        self.neighbors.insert(addr);
        self.deleted_neighbors.remove(&addr);
        self.table.set_direct(addr, cost);
    }

    /// Drop every route reachable through `addr`. When `addr` is a configured
    /// neighbor the whole subtree learned through it goes too; otherwise only
    /// the single destination entry is removed.
    pub fn remove_routes_via(&mut self, addr: Address) {
        if self.neighbors.remove(&addr) {
            self.table.remove_via_next_hop(addr);
        } else {
            self.table.remove_destination(addr);
        }
    }

    /// Operator-initiated neighbor removal. Cascades like
    /// [`remove_routes_via`](Self::remove_routes_via) and records the address
    /// in the deleted-neighbor set until a later `add` clears it.
    pub fn delete_neighbor(&mut self, addr: Address) {
        self.neighbors.remove(&addr);
        self.table.remove_destination(addr);
        self.table.remove_via_next_hop(addr);
        self.deleted_neighbors.insert(addr);
    }

    /// Purge every destination not reaffirmed within `DEAD_PERIODS` update
    /// periods. Runs at the start of each periodic cycle, before updates are
    /// generated.
    pub fn sweep_dead_routes(&mut self, now: DateTime<Utc>) {
        let dead = self.liveness.expire(now, self.period * DEAD_PERIODS);
        for addr in dead {
            warn!("no update has mentioned {addr} for {DEAD_PERIODS} periods, removing its routes");
            self.remove_routes_via(addr);
        }
    }

    /// Build one split-horizon update per configured neighbor. An empty
    /// distance map is still sent: it doubles as a liveness signal.
    pub fn build_updates(&self) -> Vec<(Address, Message)> {
        let mut outbound = Vec::with_capacity(self.neighbors.len());
        for &neighbor in &self.neighbors {
            let distances = self.table.advertisement_for(neighbor);
            outbound.push((
                neighbor,
                Message::Update {
                    source: self.local,
                    destination: neighbor,
                    distances,
                },
            ));
        }
        outbound
    }
}

pub type SharedRouterState = Arc<RwLock<RouterState>>;

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        s.parse().unwrap()
    }

    fn state() -> RouterState {
        RouterState::new(addr("10.0.0.1"), Duration::from_secs(5))
    }

    #[test]
    fn add_neighbor_clears_deleted_bookkeeping() {
        let mut state = state();
        let b = addr("10.0.0.2");

        state.add_neighbor(b, 3);
        state.delete_neighbor(b);
        assert!(state.deleted_neighbors.contains(&b));
        assert!(state.table.get(&b).is_none());

        state.add_neighbor(b, 3);
        assert!(!state.deleted_neighbors.contains(&b));
        assert_eq!(state.table.get(&b).unwrap().distance, 3);
    }

    #[test]
    fn delete_neighbor_cascades_learned_routes() {
        let mut state = state();
        let b = addr("10.0.0.2");
        let c = addr("10.0.0.3");

        state.add_neighbor(b, 1);
        state.table.merge(b, c, 2);
        state.delete_neighbor(b);

        assert!(!state.neighbors.contains(&b));
        assert!(state.table.get(&b).is_none());
        assert!(state.table.get(&c).is_none());
        // local entry must survive any removal
        assert_eq!(state.table.get(&state.local).unwrap().distance, 0);
    }

    #[test]
    fn remove_routes_via_non_neighbor_only_drops_that_destination() {
        let mut state = state();
        let b = addr("10.0.0.2");
        let c = addr("10.0.0.3");
        let d = addr("10.0.0.4");

        state.add_neighbor(b, 1);
        state.table.merge(b, c, 2);
        state.table.merge(b, d, 3);

        state.remove_routes_via(c);
        assert!(state.table.get(&c).is_none());
        // d still transits through b, untouched
        assert_eq!(state.table.get(&d).unwrap().next_hop, b);
        assert!(state.neighbors.contains(&b));
    }

    #[test]
    fn sweep_expires_stale_destinations() {
        let mut state = state();
        let b = addr("10.0.0.2");
        let c = addr("10.0.0.3");
        let now = Utc::now();

        state.add_neighbor(b, 1);
        state.table.merge(b, c, 2);
        state.liveness.touch(b, now);
        state.liveness.touch(c, now - chrono::Duration::seconds(60));

        state.sweep_dead_routes(now);
        assert!(state.table.get(&c).is_none());
        assert_eq!(state.table.get(&b).unwrap().distance, 1);
    }

    #[test]
    fn stale_neighbor_takes_its_subtree_with_it() {
        let mut state = state();
        let b = addr("10.0.0.2");
        let c = addr("10.0.0.3");
        let now = Utc::now();

        state.add_neighbor(b, 1);
        state.table.merge(b, c, 2);
        state.liveness.touch(b, now - chrono::Duration::seconds(300));

        state.sweep_dead_routes(now);
        assert!(!state.neighbors.contains(&b));
        assert!(state.table.get(&b).is_none());
        assert!(state.table.get(&c).is_none());
    }

    #[test]
    fn build_updates_sends_one_message_per_neighbor() {
        let mut state = state();
        let b = addr("10.0.0.2");
        let c = addr("10.0.0.3");
        state.add_neighbor(b, 1);
        state.add_neighbor(c, 4);

        let updates = state.build_updates();
        assert_eq!(updates.len(), 2);
        for (target, message) in updates {
            match message {
                Message::Update {
                    source,
                    destination,
                    ..
                } => {
                    assert_eq!(source, state.local);
                    assert_eq!(destination, target);
                }
                other => panic!("expected update, got {other:?}"),
            }
        }
    }
}
