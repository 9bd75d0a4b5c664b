use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::item::UnitBoard;

/// Courier billing girth: length plus twice the width/height cross-section.
pub fn girth_mm(length_mm: f64, width_mm: f64, height_mm: f64) -> f64 {
    length_mm + 2.0 * (width_mm + height_mm)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Prospective dimensions of a parcel after adding one more board, used to
/// check caps before committing the insertion.
#[derive(Clone, Copy, Debug)]
pub struct ProjectedFit {
    pub length_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub weight_kg: f64,
    pub girth_mm: f64,
}

/// A shippable package being accumulated by the packer. Dimensions grow as
/// boards are inserted; girth is recomputed after every mutation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Parcel {
    pub length_mm: f64,
    pub width_mm: f64,
    pub height_mm: f64,
    pub weight_kg: f64,
    pub girth_mm: f64,
    pub items: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Parcel {
    pub fn empty() -> Self {
        Self {
            length_mm: 0.0,
            width_mm: 0.0,
            height_mm: 0.0,
            weight_kg: 0.0,
            girth_mm: 0.0,
            items: Vec::new(),
            service: None,
            price: None,
            error: None,
        }
    }

    /// A fresh parcel holding a single board.
    pub fn for_board(board: &UnitBoard, padding_mm: f64) -> Self {
        let mut parcel = Self::empty();
        parcel.add_board(board, padding_mm);
        parcel
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Dimensions this parcel would have after taking `board`, without
    /// mutating anything.
    pub fn projected_with(&self, board: &UnitBoard, padding_mm: f64) -> ProjectedFit {
        let length_mm = self.length_mm.max(board.length_mm + 2.0 * padding_mm);
        let width_mm = self.width_mm.max(board.width_mm + 2.0 * padding_mm);
        let height_mm = if self.is_empty() {
            board.thickness_mm + 2.0 * padding_mm
        } else {
            self.height_mm + board.thickness_mm
        };
        let weight_kg = round2(self.weight_kg + board.weight_kg);
        ProjectedFit {
            length_mm,
            width_mm,
            height_mm,
            weight_kg,
            girth_mm: girth_mm(length_mm, width_mm, height_mm),
        }
    }

    /// Insert a board: footprint grows to the padded maximum, boards stack in
    /// height, weight accumulates rounded to 2 dp.
    pub fn add_board(&mut self, board: &UnitBoard, padding_mm: f64) {
        let fit = self.projected_with(board, padding_mm);
        self.length_mm = fit.length_mm;
        self.width_mm = fit.width_mm;
        self.height_mm = fit.height_mm;
        self.weight_kg = fit.weight_kg;
        self.items.push(board.name.clone());
        self.update_girth();
    }

    pub fn update_girth(&mut self) {
        self.girth_mm = girth_mm(self.length_mm, self.width_mm, self.height_mm);
    }

    pub fn girth_cm(&self) -> f64 {
        self.girth_mm / 10.0
    }
}
