//! Recipe Model

use serde::{Deserialize, Serialize};

/// A mixing recipe extracted from a print job or spool file
///
/// Always carries at least one layer with ingredients; the parser returns
/// `None` instead of an empty document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDocument {
    pub number: String,
    pub batch_code: String,
    pub layers: Vec<Layer>,
    pub meta: RecipeMeta,
}

impl RecipeDocument {
    /// Number of ingredients across all layers
    pub fn ingredient_count(&self) -> usize {
        self.layers.iter().map(|l| l.ingredients.len()).sum()
    }

    /// Sum of every target weight, in grams
    pub fn total_target_grams(&self) -> f64 {
        self.layers
            .iter()
            .flat_map(|l| l.ingredients.iter())
            .map(|i| i.target_weight_grams)
            .sum()
    }
}

/// Free-text header fields. Absent labels stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeMeta {
    pub car_maker: Option<String>,
    pub color_code: Option<String>,
    pub sayer_code: Option<String>,
    pub coating_type: Option<String>,
    pub primer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub ingredients: Vec<Ingredient>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ingredients: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    /// Dosing order as printed
    pub order: u32,
    pub sku: String,
    pub target_weight_grams: f64,
}
