//! Spool files from the legacy "print to file" path

use std::path::Path;

use shared::{RecipeDocument, parse_recipe};
use tracing::{debug, instrument};

use crate::encoding::decode_spool;
use crate::error::PrintResult;

/// Read and decode a spool file
pub async fn read_spool_text(path: impl AsRef<Path>) -> PrintResult<String> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    Ok(decode_spool(&bytes))
}

/// Parse the recipe held in a spool file
///
/// `Ok(None)` means the file was readable but holds no recipe.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn read_recipe_file(path: impl AsRef<Path>) -> PrintResult<Option<RecipeDocument>> {
    let text = read_spool_text(path).await?;
    let recipe = parse_recipe(&text);
    debug!(found = recipe.is_some(), chars = text.len(), "Spool file parsed");
    Ok(recipe)
}
