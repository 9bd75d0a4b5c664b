use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::PackingConfig;
use crate::models::item::{Bundle, UnitBoard};
use crate::models::parcel::{round2, Parcel};

use super::expander::ExpandedItems;

/// Placement policy for loose boards. Both policies share the bundle
/// handling; they only differ in how individual boards find a parcel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackingStrategy {
    /// Spread weight evenly across the minimum number of parcels that fit
    /// under the standard weight cap.
    #[default]
    WeightBalanced,
    /// Fill small-carrier parcels (girth and weight capped) first, then sweep
    /// the leftovers into oversized-carrier parcels capped by weight only.
    GirthFirst,
}

impl FromStr for PackingStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "weight-balanced" => Ok(Self::WeightBalanced),
            "girth-first" => Ok(Self::GirthFirst),
            other => Err(format!("unknown packing strategy: {other}")),
        }
    }
}

pub struct Packer {
    padding_mm: f64,
    max_weight_kg: f64,
    oversized_max_weight_kg: f64,
    girth_cap_mm: f64,
    strategy: PackingStrategy,
}

impl Packer {
    pub fn new(config: &PackingConfig) -> Self {
        Self {
            padding_mm: config.padding_mm,
            max_weight_kg: config.max_weight_kg,
            oversized_max_weight_kg: config.oversized_max_weight_kg,
            girth_cap_mm: config.girth_cap_mm,
            strategy: config.strategy,
        }
    }

    /// Assign every board and bundle to a parcel. Never fails: a board that
    /// fits nowhere gets a parcel of its own and is priced (or rejected as
    /// overweight) downstream.
    pub fn pack(&self, expanded: &ExpandedItems) -> Vec<Parcel> {
        let mut parcels = self.pack_bundles(&expanded.bundles);

        let loose = match self.strategy {
            PackingStrategy::WeightBalanced => self.pack_weight_balanced(&expanded.boards),
            PackingStrategy::GirthFirst => self.pack_girth_first(&expanded.boards),
        };
        parcels.extend(loose);

        parcels.retain(|p| !p.is_empty());
        for parcel in &mut parcels {
            parcel.update_girth();
        }

        tracing::info!(
            boards = expanded.board_count(),
            parcels = parcels.len(),
            strategy = ?self.strategy,
            "packing complete"
        );
        parcels
    }

    /// Keep-together stacks ship as their own parcels: single-board
    /// footprint, all boards stacked in height. A stack heavier than the
    /// standard cap splits into the minimum number of near-equal sub-stacks.
    fn pack_bundles(&self, bundles: &[Bundle]) -> Vec<Parcel> {
        let mut parcels = Vec::new();

        for bundle in bundles {
            let total_weight = bundle.total_weight_kg();
            let splits = if total_weight <= self.max_weight_kg {
                1
            } else {
                (total_weight / self.max_weight_kg).ceil() as u32
            };
            let boards_per_split = bundle.quantity.div_ceil(splits);

            if splits > 1 {
                tracing::info!(
                    name = %bundle.board.name,
                    total_weight_kg = round2(total_weight),
                    splits,
                    "bundle exceeds weight cap, splitting"
                );
            }

            let mut remaining = bundle.quantity;
            while remaining > 0 {
                let count = remaining.min(boards_per_split);
                parcels.push(self.bundle_parcel(&bundle.board, count));
                remaining -= count;
            }
        }

        parcels
    }

    fn bundle_parcel(&self, board: &UnitBoard, count: u32) -> Parcel {
        let mut parcel = Parcel::empty();
        parcel.length_mm = board.length_mm + 2.0 * self.padding_mm;
        parcel.width_mm = board.width_mm + 2.0 * self.padding_mm;
        parcel.height_mm = board.thickness_mm * f64::from(count) + 2.0 * self.padding_mm;
        parcel.weight_kg = round2(board.weight_kg * f64::from(count));
        parcel.items = vec![format!("{} x{}", board.name, count)];
        parcel.update_girth();
        parcel
    }

    /// Best-fit by weight: pre-allocate the minimum parcel count, then place
    /// each board where the running weight lands closest to the per-parcel
    /// target without breaching the cap. A board no parcel can take opens a
    /// new parcel rather than overloading an existing one.
    fn pack_weight_balanced(&self, boards: &[UnitBoard]) -> Vec<Parcel> {
        if boards.is_empty() {
            return Vec::new();
        }

        let mut boards: Vec<&UnitBoard> = boards.iter().collect();
        boards.sort_by(|a, b| {
            b.weight_kg
                .partial_cmp(&a.weight_kg)
                .unwrap_or(Ordering::Equal)
                .then(
                    b.length_mm
                        .partial_cmp(&a.length_mm)
                        .unwrap_or(Ordering::Equal),
                )
        });

        let total_weight: f64 = boards.iter().map(|b| b.weight_kg).sum();
        let target_count = ((total_weight / self.max_weight_kg).ceil() as usize).max(1);
        let target_per_parcel = total_weight / target_count as f64;

        let mut parcels: Vec<Parcel> = (0..target_count).map(|_| Parcel::empty()).collect();

        for board in boards {
            let mut best: Option<(usize, f64)> = None;
            for (i, parcel) in parcels.iter().enumerate() {
                let new_weight = round2(parcel.weight_kg + board.weight_kg);
                if new_weight > self.max_weight_kg {
                    continue;
                }
                let score = (new_weight - target_per_parcel).abs();
                if best.map_or(true, |(_, s)| score < s) {
                    best = Some((i, score));
                }
            }

            match best {
                Some((i, _)) => parcels[i].add_board(board, self.padding_mm),
                None => parcels.push(Parcel::for_board(board, self.padding_mm)),
            }
        }

        parcels
    }

    /// Two phases: small-carrier parcels first (girth and weight capped),
    /// then oversized-carrier parcels (weight capped only) for whatever
    /// could not fit. Smaller boards go first so they tuck into existing
    /// small parcels.
    fn pack_girth_first(&self, boards: &[UnitBoard]) -> Vec<Parcel> {
        let mut boards: Vec<&UnitBoard> = boards.iter().collect();
        boards.sort_by(|a, b| {
            let a_size = a.length_mm * a.width_mm * a.thickness_mm;
            let b_size = b.length_mm * b.width_mm * b.thickness_mm;
            a_size.partial_cmp(&b_size).unwrap_or(Ordering::Equal)
        });

        let mut small: Vec<Parcel> = Vec::new();
        let mut deferred: Vec<&UnitBoard> = Vec::new();

        for board in boards {
            let slot = small.iter_mut().find(|parcel| {
                let fit = parcel.projected_with(board, self.padding_mm);
                fit.girth_mm <= self.girth_cap_mm && fit.weight_kg <= self.max_weight_kg
            });
            if let Some(parcel) = slot {
                parcel.add_board(board, self.padding_mm);
                continue;
            }

            let candidate = Parcel::for_board(board, self.padding_mm);
            if candidate.girth_mm <= self.girth_cap_mm && candidate.weight_kg <= self.max_weight_kg
            {
                small.push(candidate);
            } else {
                deferred.push(board);
            }
        }

        let mut oversized: Vec<Parcel> = Vec::new();
        for board in deferred {
            let slot = oversized.iter_mut().find(|parcel| {
                round2(parcel.weight_kg + board.weight_kg) <= self.oversized_max_weight_kg
            });
            match slot {
                Some(parcel) => parcel.add_board(board, self.padding_mm),
                None => oversized.push(Parcel::for_board(board, self.padding_mm)),
            }
        }

        if !oversized.is_empty() {
            tracing::info!(
                small = small.len(),
                oversized = oversized.len(),
                "girth-first packing used oversized phase"
            );
        }

        small.extend(oversized);
        small
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::Item;
    use crate::services::expander::expand_items;

    fn packing_config(strategy: PackingStrategy) -> PackingConfig {
        PackingConfig {
            padding_mm: 30.0,
            density_kg_m3: 520.0,
            max_weight_kg: 30.0,
            oversized_max_weight_kg: 45.0,
            girth_cap_mm: 3000.0,
            strategy,
        }
    }

    fn board_item(name: &str, l: f64, w: f64, t: f64, weight: f64, qty: u32) -> Item {
        Item {
            sku: None,
            name: name.to_string(),
            length_mm: l,
            width_mm: w,
            thickness_mm: t,
            weight_kg: Some(weight),
            qty: Some(qty),
            keep_together: false,
        }
    }

    fn pack(items: &[Item], strategy: PackingStrategy) -> Vec<Parcel> {
        let config = packing_config(strategy);
        let expanded = expand_items(items, config.density_kg_m3);
        Packer::new(&config).pack(&expanded)
    }

    #[test]
    fn single_board_single_parcel() {
        let parcels = pack(
            &[board_item("Pine Shelf", 1000.0, 440.0, 60.0, 12.0, 1)],
            PackingStrategy::WeightBalanced,
        );

        assert_eq!(parcels.len(), 1);
        assert_eq!(parcels[0].length_mm, 1060.0);
        assert_eq!(parcels[0].width_mm, 500.0);
        assert_eq!(parcels[0].height_mm, 120.0);
        assert_eq!(parcels[0].girth_mm, 2300.0);
    }

    #[test]
    fn nine_boards_split_under_weight_cap() {
        let parcels = pack(
            &[board_item("Pine Board", 900.0, 330.0, 27.0, 4.81, 9)],
            PackingStrategy::WeightBalanced,
        );

        assert!(parcels.len() >= 2);
        for parcel in &parcels {
            assert!(parcel.weight_kg <= 30.0);
        }
        let total: f64 = parcels.iter().map(|p| p.weight_kg).sum();
        assert!((total - 43.29).abs() < 1e-9);
    }

    #[test]
    fn conservation_no_board_lost_or_duplicated() {
        let items = vec![
            board_item("A", 900.0, 330.0, 27.0, 4.81, 9),
            board_item("B", 1800.0, 600.0, 40.0, 22.0, 2),
            board_item("C", 400.0, 100.0, 18.0, 0.4, 5),
        ];

        for strategy in [PackingStrategy::WeightBalanced, PackingStrategy::GirthFirst] {
            let parcels = pack(&items, strategy);
            let mut names: Vec<String> = parcels
                .iter()
                .flat_map(|p| p.items.iter().cloned())
                .collect();
            names.sort();

            let mut expected: Vec<String> = std::iter::empty()
                .chain(std::iter::repeat("A".to_string()).take(9))
                .chain(std::iter::repeat("B".to_string()).take(2))
                .chain(std::iter::repeat("C".to_string()).take(5))
                .collect();
            expected.sort();

            assert_eq!(names, expected, "strategy {strategy:?}");
        }
    }

    #[test]
    fn weight_cap_holds_incrementally() {
        // Awkward weights that tempt a greedy packer over the cap.
        let items = vec![
            board_item("Heavy", 2000.0, 600.0, 90.0, 28.0, 2),
            board_item("Mid", 1500.0, 500.0, 50.0, 14.0, 3),
            board_item("Light", 600.0, 200.0, 20.0, 1.3, 7),
        ];

        let parcels = pack(&items, PackingStrategy::WeightBalanced);
        for parcel in &parcels {
            assert!(
                parcel.weight_kg <= 30.0,
                "parcel at {}kg breaches cap",
                parcel.weight_kg
            );
        }
    }

    #[test]
    fn unplaceable_board_opens_new_parcel() {
        // One board over the standard cap: no parcel may absorb it, so it
        // must end up alone rather than overloading parcel zero.
        let items = vec![
            board_item("Slab", 2400.0, 900.0, 150.0, 38.0, 1),
            board_item("Board", 900.0, 330.0, 27.0, 4.81, 3),
        ];

        let parcels = pack(&items, PackingStrategy::WeightBalanced);
        let slab_parcel = parcels
            .iter()
            .find(|p| p.items.contains(&"Slab".to_string()))
            .unwrap();
        assert_eq!(slab_parcel.items.len(), 1);
        for parcel in &parcels {
            if !parcel.items.contains(&"Slab".to_string()) {
                assert!(parcel.weight_kg <= 30.0);
            }
        }
    }

    #[test]
    fn girth_first_defers_oversized_boards() {
        let items = vec![
            // Girth alone (padded): 2260 + 2*(860 + 180) = 4340mm > 3000mm.
            board_item("Wide Slab", 2200.0, 800.0, 120.0, 29.0, 2),
            board_item("Small", 600.0, 200.0, 20.0, 1.3, 4),
        ];

        let parcels = pack(&items, PackingStrategy::GirthFirst);

        let (small, oversized): (Vec<_>, Vec<_>) =
            parcels.iter().partition(|p| p.girth_mm <= 3000.0);
        assert!(!small.is_empty());
        assert!(!oversized.is_empty());
        // Both slabs share one oversized parcel: 58kg exceeds the 45kg cap,
        // so they split.
        let slab_parcels: Vec<_> = oversized
            .iter()
            .filter(|p| p.items.contains(&"Wide Slab".to_string()))
            .collect();
        assert_eq!(slab_parcels.len(), 2);
        for parcel in &parcels {
            assert!(parcel.weight_kg <= 45.0);
        }
    }

    #[test]
    fn bundle_packs_as_single_stack() {
        let mut item = board_item("T&G Board", 2000.0, 90.0, 9.0, 0.5, 45);
        item.keep_together = true;

        let parcels = pack(&[item], PackingStrategy::WeightBalanced);

        assert_eq!(parcels.len(), 1);
        let parcel = &parcels[0];
        assert_eq!(parcel.height_mm, 9.0 * 45.0 + 60.0);
        assert_eq!(parcel.width_mm, 150.0);
        assert_eq!(parcel.weight_kg, 22.5);
        assert_eq!(parcel.items, vec!["T&G Board x45".to_string()]);
    }

    #[test]
    fn heavy_bundle_splits_into_equal_stacks() {
        // 60 boards x 0.9kg = 54kg: needs ceil(54/30) = 2 stacks of 30.
        let mut item = board_item("T&G Board", 2000.0, 90.0, 9.0, 0.9, 60);
        item.keep_together = true;

        let parcels = pack(&[item], PackingStrategy::WeightBalanced);

        assert_eq!(parcels.len(), 2);
        for parcel in &parcels {
            assert!(parcel.weight_kg <= 30.0);
            assert_eq!(parcel.items, vec!["T&G Board x30".to_string()]);
            assert_eq!(parcel.height_mm, 9.0 * 30.0 + 60.0);
            // Sub-stacks keep the full board footprint.
            assert_eq!(parcel.length_mm, 2060.0);
            assert_eq!(parcel.width_mm, 150.0);
        }
    }

    #[test]
    fn bundle_split_uses_ceil_division() {
        // 50 boards x 0.9kg = 45kg: ceil(45/30) = 2 stacks, 25 boards each.
        let mut item = board_item("T&G Board", 2000.0, 90.0, 9.0, 0.9, 50);
        item.keep_together = true;

        let parcels = pack(&[item], PackingStrategy::WeightBalanced);

        assert_eq!(parcels.len(), 2);
        assert!(parcels
            .iter()
            .all(|p| p.items == vec!["T&G Board x25".to_string()]));
    }

    #[test]
    fn strategy_parses_from_config_strings() {
        assert_eq!(
            "weight-balanced".parse::<PackingStrategy>().unwrap(),
            PackingStrategy::WeightBalanced
        );
        assert_eq!(
            "girth-first".parse::<PackingStrategy>().unwrap(),
            PackingStrategy::GirthFirst
        );
        assert!("best-fit".parse::<PackingStrategy>().is_err());
    }
}
