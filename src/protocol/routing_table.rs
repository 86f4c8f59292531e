use std::collections::HashMap;

use log::debug;

use crate::Address;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub next_hop: Address,
    pub distance: u32,
}

/// Authoritative destination -> (next hop, cost) mapping. The local router's
/// own entry is seeded at construction with distance 0 and can neither be
/// merged over nor removed.
#[derive(Debug, Clone)]
pub struct RouteTable {
    local: Address,
    entries: HashMap<Address, RouteEntry>,
}

impl RouteTable {
    pub fn new(local: Address) -> Self {
        let mut entries = HashMap::new();
        entries.insert(
            local,
            RouteEntry {
                next_hop: local,
                distance: 0,
            },
        );
        Self { local, entries }
    }

    pub fn local(&self) -> Address {
        self.local
    }

    pub fn get(&self, destination: &Address) -> Option<&RouteEntry> {
        self.entries.get(destination)
    }

    pub fn next_hop(&self, destination: &Address) -> Option<Address> {
        self.entries.get(destination).map(|route| route.next_hop)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &RouteEntry)> {
        self.entries.iter()
    }

    /// Install a direct link to a configured neighbor, overwriting whatever
    /// was learned for that address before.
    pub fn set_direct(&mut self, neighbor: Address, cost: u32) {
        if neighbor == self.local {
            return;
        }
        self.entries.insert(
            neighbor,
            RouteEntry {
                next_hop: neighbor,
                distance: cost,
            },
        );
    }

    /// Bellman-Ford relaxation for a single advertised destination. The
    /// advertiser itself is inserted if unknown, so a router becomes
    /// reachable through its own advertisements. An existing route is only
    /// replaced on strict improvement; costs never increase through this
    /// path, only removal can raise or drop a route.
    pub fn merge(&mut self, learned_from: Address, destination: Address, advertised: u32) {
        if destination == self.local {
            return;
        }

        if !self.entries.contains_key(&learned_from) {
            self.entries.insert(
                learned_from,
                RouteEntry {
                    next_hop: learned_from,
                    distance: advertised,
                },
            );
        }

        match self.entries.get_mut(&destination) {
            Some(route) => {
                if advertised < route.distance {
                    debug!(
                        "better route to {destination}: {advertised} via {learned_from} (was {} via {})",
                        route.distance, route.next_hop
                    );
                    route.next_hop = learned_from;
                    route.distance = advertised;
                }
            }
            None => {
                debug!("new route to {destination}: {advertised} via {learned_from}");
                self.entries.insert(
                    destination,
                    RouteEntry {
                        next_hop: learned_from,
                        distance: advertised,
                    },
                );
            }
        }
    }

    /// Build the split-horizon distance map advertised to `neighbor`: every
    /// route learned through that neighbor is withheld, and the link cost to
    /// the neighbor (0 when it has no entry yet) is layered onto each
    /// advertised distance. The route to the neighbor itself is advertised at
    /// its bare distance.
    pub fn advertisement_for(&self, neighbor: Address) -> HashMap<Address, u32> {
        let link_cost = self
            .entries
            .get(&neighbor)
            .map(|route| route.distance)
            .unwrap_or(0);

        let mut distances = HashMap::new();
        for (&destination, route) in &self.entries {
            if route.next_hop == neighbor {
                continue;
            }
            // costs arrive unvalidated off the wire, so the sum must not wrap
            let cost = if destination == neighbor {
                route.distance
            } else {
                route.distance.saturating_add(link_cost)
            };
            distances.insert(destination, cost);
        }
        distances
    }

    /// Delete every entry reached through `next_hop`, including the entry for
    /// that address itself when it is a direct neighbor. The local entry is
    /// never deleted.
    pub fn remove_via_next_hop(&mut self, next_hop: Address) {
        let local = self.local;
        self.entries
            .retain(|destination, route| *destination == local || route.next_hop != next_hop);
    }

    /// Delete the single entry keyed by `destination`, leaving routes that
    /// merely transit through other next hops alone.
    pub fn remove_destination(&mut self, destination: Address) {
        if destination == self.local {
            return;
        }
        self.entries.remove(&destination);
    }
}
