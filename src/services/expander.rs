use crate::models::item::{Bundle, Item, UnitBoard};
use crate::models::parcel::round2;

/// Result of quantity expansion: loose boards that pack independently, and
/// keep-together bundles that ship as single stacks.
#[derive(Clone, Debug, Default)]
pub struct ExpandedItems {
    pub boards: Vec<UnitBoard>,
    pub bundles: Vec<Bundle>,
}

impl ExpandedItems {
    pub fn board_count(&self) -> usize {
        self.boards.len()
            + self
                .bundles
                .iter()
                .map(|b| b.quantity as usize)
                .sum::<usize>()
    }
}

/// Turn cart lines into unit boards. Keep-together lines stay whole as
/// bundles; everything else expands to one board per unit of quantity.
/// Missing weights are derived from volume and timber density.
pub fn expand_items(items: &[Item], density_kg_m3: f64) -> ExpandedItems {
    let mut expanded = ExpandedItems::default();

    for item in items {
        let qty = item.effective_qty();
        let weight_kg = item
            .weight_kg
            .unwrap_or_else(|| derived_weight_kg(item, density_kg_m3));

        let board = UnitBoard {
            name: item.name.clone(),
            length_mm: item.length_mm,
            width_mm: item.width_mm,
            thickness_mm: item.thickness_mm,
            weight_kg,
        };

        if item.keep_together {
            tracing::info!(
                name = %item.name,
                qty,
                total_weight_kg = round2(weight_kg * f64::from(qty)),
                "keep-together bundle detected"
            );
            expanded.bundles.push(Bundle {
                board,
                quantity: qty,
            });
        } else {
            for _ in 0..qty {
                expanded.boards.push(board.clone());
            }
        }
    }

    expanded
}

/// Weight from volume x density, rounded to 2 dp.
fn derived_weight_kg(item: &Item, density_kg_m3: f64) -> f64 {
    let volume_m3 =
        (item.length_mm / 1000.0) * (item.width_mm / 1000.0) * (item.thickness_mm / 1000.0);
    round2(volume_m3 * density_kg_m3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, qty: Option<u32>) -> Item {
        Item {
            sku: None,
            name: name.to_string(),
            length_mm: 900.0,
            width_mm: 330.0,
            thickness_mm: 27.0,
            weight_kg: Some(4.81),
            qty,
            keep_together: false,
        }
    }

    #[test]
    fn quantity_expands_to_unit_boards() {
        let expanded = expand_items(&[item("Pine Board", Some(9))], 520.0);

        assert_eq!(expanded.boards.len(), 9);
        assert!(expanded.bundles.is_empty());
        assert!(expanded.boards.iter().all(|b| b.weight_kg == 4.81));
    }

    #[test]
    fn missing_qty_means_one() {
        let expanded = expand_items(&[item("Pine Board", None)], 520.0);
        assert_eq!(expanded.boards.len(), 1);
    }

    #[test]
    fn zero_qty_clamps_to_one() {
        let expanded = expand_items(&[item("Pine Board", Some(0))], 520.0);
        assert_eq!(expanded.boards.len(), 1);
    }

    #[test]
    fn missing_weight_derived_from_density() {
        let mut line = item("Pine Shelf", Some(1));
        line.weight_kg = None;
        line.length_mm = 1000.0;
        line.width_mm = 440.0;
        line.thickness_mm = 60.0;

        let expanded = expand_items(&[line], 520.0);

        // 0.0264 m3 x 520 kg/m3 = 13.728 -> 13.73
        assert_eq!(expanded.boards[0].weight_kg, 13.73);
    }

    #[test]
    fn keep_together_stays_whole() {
        let mut line = item("T&G Board", Some(45));
        line.keep_together = true;

        let expanded = expand_items(&[line], 520.0);

        assert!(expanded.boards.is_empty());
        assert_eq!(expanded.bundles.len(), 1);
        assert_eq!(expanded.bundles[0].quantity, 45);
        assert_eq!(expanded.board_count(), 45);
    }
}
