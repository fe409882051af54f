//! Library walkthrough: search, open a recipe, rescale it and bookmark it.
//!
//! Bookmarks are kept in memory, so running this leaves nothing behind.

use forkify::{ApiClient, ForkifyConfig, MemoryStorage, RecipeStore, SearchOutcome};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let config = ForkifyConfig::load()?;
    let store = RecipeStore::with_storage(
        ApiClient::new(&config)?,
        Box::new(MemoryStorage::new()),
        config.results_per_page,
    )?;

    println!("=== Search ===");
    match store.load_search_results("pizza").await? {
        SearchOutcome::Found(count) => println!("{} results", count),
        SearchOutcome::NoMatches | SearchOutcome::Superseded => {
            println!("Nothing found");
            return Ok(());
        }
    }
    let first_page = store.search_results_page(1).await;
    for item in &first_page {
        println!("{}  {}", item.id, item.title);
    }

    println!("\n=== Recipe ===");
    let Some(first) = first_page.first() else {
        return Ok(());
    };
    store.load_recipe(&first.id).await?;
    store.update_servings(8).await?;
    if let Some(recipe) = store.recipe().await {
        println!("{} for {} people", recipe.title, recipe.servings);
        for ingredient in &recipe.ingredients {
            println!(
                "  {:?} {} {}",
                ingredient.quantity, ingredient.unit, ingredient.description
            );
        }
    }

    println!("\n=== Bookmarks ===");
    store.toggle_bookmark().await?;
    for bookmark in store.bookmarks().await {
        println!("{}  {}", bookmark.id, bookmark.title);
    }

    Ok(())
}
