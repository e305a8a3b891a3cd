//! Storage cost graph and cheapest-path solver.
//!
//! Nodes are the nine `{provider} x {Hot,Cool,Archive}` storage tier
//! instances. Edges only ever run Hot→Cool→Archive (a twin never skips
//! a tier or moves backwards), weighted by the destination tier's own
//! storage cost plus the transfer cost of getting there. The "data
//! gravity" rule picks the Hot node by the combined L2+L3 cost rather
//! than L2 cost alone, then the remaining Cool/Archive choice is a
//! small enough search (3 x 3 = 9 paths) to enumerate exhaustively
//! rather than run a general shortest-path algorithm over.

use std::fmt;

use crate::providers::ProviderKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Hot,
    Cool,
    Archive,
}

impl Tier {
    const ALL: [Tier; 3] = [Tier::Hot, Tier::Cool, Tier::Archive];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageNode {
    pub provider: ProviderKind,
    pub tier: Tier,
}

impl fmt::Display for StorageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tier = match self.tier {
            Tier::Hot => "Hot",
            Tier::Cool => "Cool",
            Tier::Archive => "Archive",
        };
        write!(f, "{}_{}", self.provider, tier)
    }
}

/// Per-tier monthly storage cost for all three providers, plus the
/// cross-provider transfer cost of moving from one tier into the next.
/// `transfer_cost(from, to)` covers same-provider transitions too
/// (always zero, since no network egress is incurred).
pub struct StorageGraph {
    hot_cost: [f64; 3],
    cool_cost: [f64; 3],
    archive_cost: [f64; 3],
    hot_to_cool_transfer: [[f64; 3]; 3],
    cool_to_archive_transfer: [[f64; 3]; 3],
}

const PROVIDERS: [ProviderKind; 3] = [ProviderKind::Aws, ProviderKind::Azure, ProviderKind::Gcp];

fn index_of(p: ProviderKind) -> usize {
    PROVIDERS.iter().position(|x| *x == p).unwrap()
}

impl StorageGraph {
    /// `hot_to_cool_transfer[from][to]` and `cool_to_archive_transfer[from][to]`
    /// are indexed by provider position in [`PROVIDERS`] (AWS, Azure, GCP).
    pub fn new(
        hot_cost: [f64; 3],
        cool_cost: [f64; 3],
        archive_cost: [f64; 3],
        hot_to_cool_transfer: [[f64; 3]; 3],
        cool_to_archive_transfer: [[f64; 3]; 3],
    ) -> Self {
        Self {
            hot_cost,
            cool_cost,
            archive_cost,
            hot_to_cool_transfer,
            cool_to_archive_transfer,
        }
    }

    fn tier_cost(&self, provider: ProviderKind, tier: Tier) -> f64 {
        let i = index_of(provider);
        match tier {
            Tier::Hot => self.hot_cost[i],
            Tier::Cool => self.cool_cost[i],
            Tier::Archive => self.archive_cost[i],
        }
    }

    /// The cost of the edge `from -> to` in the given tier transition:
    /// transfer cost plus the destination tier's own storage cost.
    fn edge_cost(&self, from: ProviderKind, to: ProviderKind, from_tier: Tier) -> f64 {
        let (fi, ti) = (index_of(from), index_of(to));
        let transfer = match from_tier {
            Tier::Hot => self.hot_to_cool_transfer[fi][ti],
            Tier::Cool => self.cool_to_archive_transfer[fi][ti],
            Tier::Archive => unreachable!("archive is a terminal tier"),
        };
        let destination_tier = match from_tier {
            Tier::Hot => Tier::Cool,
            Tier::Cool => Tier::Archive,
            Tier::Archive => unreachable!("archive is a terminal tier"),
        };
        transfer + self.tier_cost(to, destination_tier)
    }
}

#[derive(Debug, Clone)]
pub struct CheapestPath {
    pub path: Vec<StorageNode>,
    pub total_cost: f64,
}

/// Finds the minimum-cost Hot→Cool→Archive path starting from
/// `hot_provider`, by exhaustively enumerating the 3x3=9 possible
/// Cool/Archive continuations — cheap enough that a general shortest-
/// path algorithm would be overkill.
pub fn find_cheapest_storage_path(graph: &StorageGraph, hot_provider: ProviderKind) -> CheapestPath {
    let hot_node = StorageNode { provider: hot_provider, tier: Tier::Hot };
    let mut best: Option<CheapestPath> = None;

    for &cool_provider in &PROVIDERS {
        let hot_to_cool = graph.edge_cost(hot_provider, cool_provider, Tier::Hot);
        for &archive_provider in &PROVIDERS {
            let cool_to_archive = graph.edge_cost(cool_provider, archive_provider, Tier::Cool);
            let total = graph.tier_cost(hot_provider, Tier::Hot) + hot_to_cool + cool_to_archive;

            let candidate = CheapestPath {
                path: vec![
                    hot_node,
                    StorageNode { provider: cool_provider, tier: Tier::Cool },
                    StorageNode { provider: archive_provider, tier: Tier::Archive },
                ],
                total_cost: total,
            };
            if best.as_ref().map(|b| candidate.total_cost < b.total_cost).unwrap_or(true) {
                best = Some(candidate);
            }
        }
    }

    best.expect("PROVIDERS is non-empty")
}

/// Combined L2+L3-Hot "data gravity" pick: the provider minimizing
/// `hot_storage_cost[p] + processing_cost[p]`, not hot storage cost
/// alone. Returns the chosen provider plus whichever providers would
/// have won each sub-objective in isolation, so a caller can build an
/// override record when they diverge.
pub struct HotPick {
    pub chosen: ProviderKind,
    pub cheapest_storage_only: ProviderKind,
    pub cheapest_processing_only: ProviderKind,
}

pub fn pick_hot_provider(hot_storage_cost: [f64; 3], processing_cost: [f64; 3]) -> HotPick {
    let combined: Vec<(ProviderKind, f64)> = PROVIDERS.iter().enumerate().map(|(i, p)| (*p, hot_storage_cost[i] + processing_cost[i])).collect();
    let chosen = combined.iter().min_by(|a, b| a.1.total_cmp(&b.1)).unwrap().0;

    let cheapest_storage_only = PROVIDERS.iter().enumerate().min_by(|(ia, _), (ib, _)| hot_storage_cost[*ia].total_cmp(&hot_storage_cost[*ib])).map(|(_, p)| *p).unwrap();
    let cheapest_processing_only = PROVIDERS.iter().enumerate().min_by(|(ia, _), (ib, _)| processing_cost[*ia].total_cmp(&processing_cost[*ib])).map(|(_, p)| *p).unwrap();

    HotPick { chosen, cheapest_storage_only, cheapest_processing_only }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_transfer(value: f64) -> [[f64; 3]; 3] {
        let mut m = [[value; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        m
    }

    #[test]
    fn cheapest_path_prefers_zero_transfer_same_provider_chain() {
        let graph = StorageGraph::new([10.0, 10.0, 10.0], [5.0, 5.0, 5.0], [1.0, 1.0, 1.0], flat_transfer(100.0), flat_transfer(100.0));
        let result = find_cheapest_storage_path(&graph, ProviderKind::Aws);
        assert_eq!(result.path[0].provider, ProviderKind::Aws);
        assert_eq!(result.path[1].provider, ProviderKind::Aws);
        assert_eq!(result.path[2].provider, ProviderKind::Aws);
    }

    #[test]
    fn cheapest_path_crosses_provider_when_worth_the_transfer_cost() {
        // Azure cool/archive are far cheaper even after paying 1.0 transfer.
        let graph = StorageGraph::new([10.0, 10.0, 10.0], [50.0, 1.0, 50.0], [50.0, 1.0, 50.0], flat_transfer(1.0), flat_transfer(1.0));
        let result = find_cheapest_storage_path(&graph, ProviderKind::Aws);
        assert_eq!(result.path[1].provider, ProviderKind::Azure);
        assert_eq!(result.path[2].provider, ProviderKind::Azure);
    }

    #[test]
    fn cheapest_path_is_optimal_over_all_nine_enumerated_subpaths() {
        let graph = StorageGraph::new([1.0, 2.0, 3.0], [4.0, 1.0, 9.0], [2.0, 3.0, 1.0], flat_transfer(0.5), flat_transfer(0.5));
        let result = find_cheapest_storage_path(&graph, ProviderKind::Gcp);

        let mut brute_force = f64::INFINITY;
        for &cool in &PROVIDERS {
            for &archive in &PROVIDERS {
                let cost = graph.tier_cost(ProviderKind::Gcp, Tier::Hot) + graph.edge_cost(ProviderKind::Gcp, cool, Tier::Hot) + graph.edge_cost(cool, archive, Tier::Cool);
                brute_force = brute_force.min(cost);
            }
        }
        assert!((result.total_cost - brute_force).abs() < 1e-9);
    }

    #[test]
    fn data_gravity_overrides_storage_only_argmin() {
        // Azure is cheapest for storage alone, but AWS wins once processing is added in.
        let pick = pick_hot_provider([10.0, 1.0, 20.0], [1.0, 50.0, 1.0]);
        assert_eq!(pick.cheapest_storage_only, ProviderKind::Azure);
        assert_eq!(pick.chosen, ProviderKind::Aws);
    }
}
