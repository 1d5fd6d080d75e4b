use regex::Regex;
use std::sync::LazyLock;

use crate::models::{Ingredient, Layer, RecipeDocument, RecipeMeta};

/// Recipe number used when the header has none. Downstream stock screens key on it.
pub const DEFAULT_NUMBER: &str = "000";
/// Batch code used when no "Historia" line is present
pub const DEFAULT_BATCH_CODE: &str = "F";

/// Ordinal layer headers, in the form stored on [`Layer::name`]
const LAYER_NAMES: [(&str, &str); 3] = [
    ("primera", "Primera capa"),
    ("segunda", "Segunda capa"),
    ("tercera", "Tercera capa"),
];

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:f[oó]rmula|receta)[ \t]*(?:n[º°o]\.?|#)?",
        r"[ \t]*:?[ \t]*([0-9A-Za-z][\w\-/.]*)",
    ))
    .expect("recipe number pattern")
});

static BATCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bhistoria[ \t]*(?:n[º°o]\.?|#)?[ \t]*:?[ \t]*([0-9A-Za-z][\w\-/.]*)")
        .expect("batch code pattern")
});

static CAR_MAKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bmarca[ \t]*:([^\r\n]*)").expect("car maker pattern"));

static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcolor[ \t]*:([^\r\n]*)").expect("color code pattern"));

static SAYER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bsayer[ \t]*:([^\r\n]*)").expect("sayer code pattern"));

static COATING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bacabado[ \t]*:([^\r\n]*)").expect("coating type pattern"));

static PRIMER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:aparejo|imprimaci[oó]n)[ \t]*:([^\r\n]*)").expect("primer pattern")
});

/// Start of any header label, used to end a value when labels share a line
static LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)\b(?:c[oó]digo[ \t]+|tipo[ \t]+de[ \t]+)?",
        r"(?:marca|color|sayer|acabado|aparejo|imprimaci[oó]n|historia|receta|f[oó]rmula)",
        r"\b[^:\r\n]{0,6}:",
    ))
    .expect("header label pattern")
});

static LAYER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(primera|segunda|tercera)[ \t]+capa\b").expect("layer header pattern")
});

static TOTAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*total\b").expect("total pattern"));

static INGREDIENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(\d+)\s*:\s*(\S+)\s+(\d+(?:[.,]\d+)?)\s*(kg|g)?")
        .expect("ingredient pattern")
});

/// Extract a recipe from print text
///
/// Returns `None` when no layer with at least one ingredient is found, so a
/// blank or garbage stream is distinguishable from a real recipe.
pub fn parse_recipe(text: &str) -> Option<RecipeDocument> {
    let layers = scan_layers(text);
    if layers.is_empty() {
        tracing::trace!("no populated layer found in {} chars", text.len());
        return None;
    }

    let meta = RecipeMeta {
        car_maker: field(&CAR_MAKER_RE, text),
        color_code: field(&COLOR_RE, text),
        sayer_code: field(&SAYER_RE, text),
        coating_type: field(&COATING_RE, text),
        primer: field(&PRIMER_RE, text),
    };

    Some(RecipeDocument {
        number: token(&NUMBER_RE, text).unwrap_or_else(|| DEFAULT_NUMBER.to_string()),
        batch_code: token(&BATCH_RE, text).unwrap_or_else(|| DEFAULT_BATCH_CODE.to_string()),
        layers,
        meta,
    })
}

/// Line-scanning state machine over layer sections
///
/// A layer header opens a layer and starts ingredient reading; a `Total` line
/// stops reading but leaves the layer open until the next header or the end
/// of input.
fn scan_layers(text: &str) -> Vec<Layer> {
    let mut layers = Vec::new();
    let mut current: Option<Layer> = None;
    let mut reading = false;

    for line in text.split(['\r', '\n']) {
        if let Some(name) = layer_header(line) {
            close_layer(&mut layers, current.take());
            current = Some(Layer::new(name));
            reading = true;
            continue;
        }

        if !reading {
            continue;
        }

        if TOTAL_RE.is_match(line) {
            reading = false;
            continue;
        }

        if let (Some(layer), Some(ingredient)) = (current.as_mut(), parse_ingredient(line)) {
            layer.ingredients.push(ingredient);
        }
    }

    close_layer(&mut layers, current);
    layers
}

fn close_layer(layers: &mut Vec<Layer>, layer: Option<Layer>) {
    if let Some(layer) = layer {
        if layer.ingredients.is_empty() {
            tracing::debug!(layer = %layer.name, "dropping layer without ingredients");
        } else {
            layers.push(layer);
        }
    }
}

fn layer_header(line: &str) -> Option<&'static str> {
    let caps = LAYER_RE.captures(line)?;
    let ordinal = caps.get(1)?.as_str().to_lowercase();
    LAYER_NAMES
        .iter()
        .find(|(key, _)| *key == ordinal)
        .map(|(_, name)| *name)
}

fn parse_ingredient(line: &str) -> Option<Ingredient> {
    let caps = INGREDIENT_RE.captures(line)?;
    let order = caps.get(1)?.as_str().parse().ok()?;
    let sku = caps.get(2)?.as_str().to_string();
    let weight = parse_decimal(caps.get(3)?.as_str())?;
    let factor = match caps.get(4).map(|m| m.as_str().to_ascii_lowercase()) {
        Some(unit) if unit == "kg" => 1000.0,
        _ => 1.0,
    };

    Some(Ingredient {
        order,
        sku,
        target_weight_grams: weight * factor,
    })
}

/// Parse a number that may use a decimal comma
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.replace(',', ".").parse().ok()
}

/// First capture of a code-like value
fn token(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Free-text field value: runs to end of line, or to the next header label
/// when several labels share a line.
fn field(re: &Regex, text: &str) -> Option<String> {
    let raw = re.captures(text)?.get(1)?.as_str();
    let value = match LABEL_RE.find(raw) {
        Some(next) => &raw[..next.start()],
        None => raw,
    };
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_RECIPE: &str = "\
Fórmula Nº: 40213          Historia: F-2291\r\n\
Marca: SEAT   Color: LS9R  Código Sayer: 7781\r\n\
Tipo de acabado: Bicapa    Aparejo: Gris claro\r\n\
\r\n\
Primera capa\r\n\
 1: KT-1400   323,0\r\n\
 2: KT-1520    41,5 g\r\n\
Total          364,5\r\n\
Segunda capa\r\n\
 1: BC-0100   0,25 kg\r\n\
Total          250,0\r\n";

    #[test]
    fn test_parse_full_recipe() {
        let doc = parse_recipe(FULL_RECIPE).expect("recipe");
        assert_eq!(doc.number, "40213");
        assert_eq!(doc.batch_code, "F-2291");
        assert_eq!(doc.layers.len(), 2);
        assert_eq!(doc.layers[0].name, "Primera capa");
        assert_eq!(doc.layers[1].name, "Segunda capa");
        assert_eq!(doc.layers[1].ingredients[0].target_weight_grams, 250.0);
        assert_eq!(doc.ingredient_count(), 3);
    }

    #[test]
    fn test_parse_metadata_fields() {
        let doc = parse_recipe(FULL_RECIPE).expect("recipe");
        assert_eq!(doc.meta.car_maker.as_deref(), Some("SEAT"));
        assert_eq!(doc.meta.color_code.as_deref(), Some("LS9R"));
        assert_eq!(doc.meta.sayer_code.as_deref(), Some("7781"));
        assert_eq!(doc.meta.coating_type.as_deref(), Some("Bicapa"));
        assert_eq!(doc.meta.primer.as_deref(), Some("Gris claro"));
    }

    #[test]
    fn test_single_spaced_labels_split_on_label() {
        let text = "Marca: SEAT Color: LS9R Código Sayer: 7781\n\
                    Tipo de acabado: Bicapa Aparejo: Gris claro\n\
                    Primera capa\n1: A 1\n";
        let doc = parse_recipe(text).expect("recipe");
        assert_eq!(doc.meta.car_maker.as_deref(), Some("SEAT"));
        assert_eq!(doc.meta.color_code.as_deref(), Some("LS9R"));
        assert_eq!(doc.meta.sayer_code.as_deref(), Some("7781"));
        assert_eq!(doc.meta.coating_type.as_deref(), Some("Bicapa"));
        assert_eq!(doc.meta.primer.as_deref(), Some("Gris claro"));
    }

    #[test]
    fn test_value_keeps_inner_spacing_to_end_of_line() {
        let text = "Aparejo:  Gris   claro  \nPrimera capa\n1: A 1\n";
        let doc = parse_recipe(text).expect("recipe");
        assert_eq!(doc.meta.primer.as_deref(), Some("Gris   claro"));
    }

    #[test]
    fn test_layer_with_trailing_garbage_after_total() {
        let text = "Primera capa\n\
                    1: KT-1400 323,0\n\
                    2: KT-1520 41,5\n\
                    3: KT-1900 12\n\
                    Total 376,5\n\
                    4: XX-0000 999\n\
                    ---- fin ----\n";
        let doc = parse_recipe(text).expect("recipe");
        assert_eq!(doc.layers.len(), 1);
        let skus: Vec<_> = doc.layers[0].ingredients.iter().map(|i| i.sku.as_str()).collect();
        assert_eq!(skus, ["KT-1400", "KT-1520", "KT-1900"]);
        let orders: Vec<_> = doc.layers[0].ingredients.iter().map(|i| i.order).collect();
        assert_eq!(orders, [1, 2, 3]);
    }

    #[test]
    fn test_no_layer_header_is_no_match() {
        assert!(parse_recipe("Fórmula: 12\n1: KT-1400 323,0\nTotal 323,0\n").is_none());
        assert!(parse_recipe("").is_none());
    }

    #[test]
    fn test_header_without_ingredients_is_no_match() {
        assert!(parse_recipe("Primera capa\nTotal 0\n").is_none());
    }

    #[test]
    fn test_decimal_comma_weight() {
        let doc = parse_recipe("Primera capa\n1: KT-1400 323,0\n").expect("recipe");
        assert_eq!(doc.layers[0].ingredients[0].target_weight_grams, 323.0);
    }

    #[test]
    fn test_missing_header_uses_fallbacks() {
        let doc = parse_recipe("Primera capa\n1: KT-1400 10\n").expect("recipe");
        assert_eq!(doc.number, DEFAULT_NUMBER);
        assert_eq!(doc.batch_code, DEFAULT_BATCH_CODE);
        assert_eq!(doc.meta, RecipeMeta::default());
    }

    #[test]
    fn test_empty_layer_dropped_between_populated_layers() {
        let text = "PRIMERA CAPA\n1: A 1\nSegunda capa\nTotal\nTercera capa\n1: B 2\n";
        let doc = parse_recipe(text).expect("recipe");
        let names: Vec<_> = doc.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["Primera capa", "Tercera capa"]);
    }

    #[test]
    fn test_layer_stays_open_until_end_of_input() {
        let doc = parse_recipe("Primera capa\n1: A 5\nTotal 5\n").expect("recipe");
        assert_eq!(doc.layers.len(), 1);
        assert_eq!(doc.total_target_grams(), 5.0);
    }

    #[test]
    fn test_cr_only_line_endings() {
        let doc = parse_recipe("Receta: R-7\rPrimera capa\r1: A 1,5\r").expect("recipe");
        assert_eq!(doc.number, "R-7");
        assert_eq!(doc.layers[0].ingredients[0].target_weight_grams, 1.5);
    }
}
