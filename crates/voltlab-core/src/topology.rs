//! Net topology resolver.
//!
//! Collapses the wire/element graph into electrical equivalence classes
//! ("nets") via union-find. The map is rebuilt from scratch every tick, so
//! toggling a switch or cutting a wire takes effect on the very next tick
//! with no stale cached state, and it is scoped to the tick call rather
//! than shared between simulation instances.

use indexmap::IndexMap;
use tracing::debug;

use crate::snapshot::{Element, Wire};

/// Compact identifier of one equivalence class for the current tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetId(usize);

impl NetId {
    /// Construct from a raw net index. Mostly useful to the solver and in
    /// tests; real ids come out of [`NetMap::build`].
    pub fn new(index: usize) -> Self {
        NetId(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

/// Union-find over all node ids of one snapshot.
///
/// Two node ids map to the same [`NetId`] iff they are electrically
/// connected this tick: joined by a non-deleted wire (hidden wires count)
/// or by an element-internal closed path (see
/// [`Element::closed_paths`]). Two nodes of the same element are never
/// implicitly unioned.
#[derive(Debug)]
pub struct NetMap {
    /// Node id -> dense slot, in first-seen order for determinism.
    slots: IndexMap<String, usize>,
    /// Slot -> net, after full path compression.
    net_of_slot: Vec<NetId>,
    /// Net -> member slots.
    members: Vec<Vec<usize>>,
}

impl NetMap {
    /// Build the net map for one tick.
    ///
    /// Wires whose endpoints do not resolve to an existing node (stale
    /// edges left behind by an element deletion) are skipped for this tick;
    /// the rest of the graph still resolves.
    pub fn build(elements: &[Element], wires: &[Wire]) -> Self {
        let mut slots: IndexMap<String, usize> = IndexMap::new();
        for element in elements {
            for node in &element.nodes {
                let next = slots.len();
                slots.entry(node.id.clone()).or_insert(next);
            }
        }

        let mut parent: Vec<usize> = (0..slots.len()).collect();
        let mut rank: Vec<u8> = vec![0; slots.len()];

        for wire in wires {
            if wire.deleted {
                continue;
            }
            let (Some(&a), Some(&b)) = (
                slots.get(wire.from_node_id.as_str()),
                slots.get(wire.to_node_id.as_str()),
            ) else {
                debug!(wire = %wire.id, "skipping wire with dangling endpoint");
                continue;
            };
            union(&mut parent, &mut rank, a, b);
        }

        for element in elements {
            for (i, j) in element.closed_paths() {
                let (Some(na), Some(nb)) = (element.nodes.get(i), element.nodes.get(j)) else {
                    continue;
                };
                let (Some(&a), Some(&b)) =
                    (slots.get(na.id.as_str()), slots.get(nb.id.as_str()))
                else {
                    continue;
                };
                union(&mut parent, &mut rank, a, b);
            }
        }

        // Compress every slot, then number the roots in slot order so net
        // ids are stable for identical snapshots.
        let mut root_to_net: IndexMap<usize, NetId> = IndexMap::new();
        let mut net_of_slot = Vec::with_capacity(slots.len());
        let mut members: Vec<Vec<usize>> = Vec::new();
        for slot in 0..slots.len() {
            let root = find(&mut parent, slot);
            let next = NetId(root_to_net.len());
            let net = *root_to_net.entry(root).or_insert(next);
            if net.0 == members.len() {
                members.push(Vec::new());
            }
            members[net.0].push(slot);
            net_of_slot.push(net);
        }

        Self {
            slots,
            net_of_slot,
            members,
        }
    }

    /// Net of a node id, if the node exists in this snapshot.
    pub fn net_of(&self, node_id: &str) -> Option<NetId> {
        self.slots.get(node_id).map(|&slot| self.net_of_slot[slot])
    }

    /// Number of distinct nets.
    pub fn num_nets(&self) -> usize {
        self.members.len()
    }

    /// Node ids belonging to a net.
    pub fn members(&self, net: NetId) -> impl Iterator<Item = &str> {
        self.members[net.0]
            .iter()
            .map(|&slot| self.slots.get_index(slot).expect("slot in range").0.as_str())
    }

    /// Whether two node ids are electrically connected this tick.
    pub fn connected(&self, a: &str, b: &str) -> bool {
        match (self.net_of(a), self.net_of(b)) {
            (Some(na), Some(nb)) => na == nb,
            _ => false,
        }
    }
}

fn find(parent: &mut [usize], x: usize) -> usize {
    let mut root = x;
    while parent[root] != root {
        root = parent[root];
    }
    // Path compression.
    let mut cur = x;
    while parent[cur] != root {
        let next = parent[cur];
        parent[cur] = root;
        cur = next;
    }
    root
}

fn union(parent: &mut [usize], rank: &mut [u8], a: usize, b: usize) {
    let ra = find(parent, a);
    let rb = find(parent, b);
    if ra == rb {
        return;
    }
    match rank[ra].cmp(&rank[rb]) {
        std::cmp::Ordering::Less => parent[ra] = rb,
        std::cmp::Ordering::Greater => parent[rb] = ra,
        std::cmp::Ordering::Equal => {
            parent[rb] = ra;
            rank[ra] += 1;
        }
    }
}
