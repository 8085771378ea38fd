use anyhow::{anyhow, Result};
use carecycle_core::error::CoreError;
use carecycle_core::models::CareItem;
use carecycle_core::repository::Repository;
use uuid::Uuid;

/// Resolves a full id or a unique id prefix of at least two characters.
pub async fn resolve_item_id(repo: &impl Repository, short_id: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(short_id) {
        return Ok(id);
    }
    if short_id.len() < 2 {
        return Err(anyhow!(CoreError::InvalidInput(
            "Short ID must be at least 2 characters long.".to_string()
        )));
    }
    let items = repo.find_items_by_short_id_prefix(short_id).await?;
    if items.len() == 1 {
        Ok(items[0].id)
    } else if items.is_empty() {
        Err(anyhow!(CoreError::NotFound(format!(
            "No item found with ID prefix '{}'",
            short_id
        ))))
    } else {
        let item_info: Vec<(String, String)> = items
            .into_iter()
            .map(|i| (i.id.to_string(), i.title))
            .collect();
        Err(anyhow!(CoreError::AmbiguousId(item_info)))
    }
}

/// Loads the item behind `short_id`, failing if it does not exist.
pub async fn load_item(repo: &impl Repository, short_id: &str) -> Result<CareItem> {
    let id = resolve_item_id(repo, short_id).await?;
    repo.find_item_by_id(id)
        .await?
        .ok_or_else(|| anyhow!(CoreError::NotFound(format!("Item with ID '{}' not found.", id))))
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
