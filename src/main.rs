use clap::{Parser, Subcommand};
use log::debug;
use std::path::PathBuf;

use forkify::{
    ForkifyConfig, ForkifyError, Recipe, RecipeForm, RecipeStore, SearchOutcome, SearchState,
};

#[derive(Parser)]
#[command(name = "forkify")]
#[command(about = "Search, scale, bookmark and upload recipes", long_about = None)]
struct Cli {
    /// Override the configured API key
    #[arg(long, global = true)]
    api_key: Option<String>,

    /// Override where bookmarks are stored
    #[arg(long, global = true)]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a recipe
    Show { id: String },
    /// Show a recipe scaled to a number of servings
    Servings { id: String, servings: u32 },
    /// Search recipes
    Search {
        query: String,
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// List bookmarked recipes
    Bookmarks,
    /// Bookmark a recipe
    Bookmark { id: String },
    /// Remove a bookmark
    Unbookmark { id: String },
    /// Remove all bookmarks
    ClearBookmarks,
    /// Upload your own recipe
    Upload {
        #[arg(long)]
        title: String,
        #[arg(long)]
        source_url: String,
        #[arg(long)]
        image: String,
        #[arg(long)]
        publisher: String,
        #[arg(long)]
        cooking_time: String,
        #[arg(long)]
        servings: String,
        /// "quantity,unit,description", repeatable
        #[arg(long = "ingredient")]
        ingredients: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = ForkifyConfig::load()?;
    if cli.api_key.is_some() {
        config.api_key = cli.api_key;
    }
    if cli.storage_dir.is_some() {
        config.storage_dir = cli.storage_dir;
    }
    debug!("{:?}", config);

    let store = RecipeStore::open(&config)?;

    match cli.command {
        Commands::Show { id } => {
            store.load_recipe(&id).await?;
            print_current(&store).await;
        }
        Commands::Servings { id, servings } => {
            store.load_recipe(&id).await?;
            store.update_servings(servings).await?;
            print_current(&store).await;
        }
        Commands::Search { query, page } => match store.load_search_results(&query).await? {
            SearchOutcome::NoMatches => {
                println!("No recipes found for your query! Please try again ;)");
            }
            _ => {
                let results = store.search_results_page(page).await;
                for item in &results {
                    println!("{}  {} ({})", item.id, item.title, item.publisher);
                }
                print_pagination(&store.search().await);
            }
        },
        Commands::Bookmarks => {
            let bookmarks = store.bookmarks().await;
            if bookmarks.is_empty() {
                println!("No bookmarks yet. Find a nice recipe and bookmark it :)");
            }
            for bookmark in &bookmarks {
                println!("{}  {} ({})", bookmark.id, bookmark.title, bookmark.publisher);
            }
        }
        Commands::Bookmark { id } => {
            store.load_recipe(&id).await?;
            let recipe = store.recipe().await.ok_or(ForkifyError::NoRecipeLoaded)?;
            let added = store.add_bookmark(&recipe).await?;
            println!(
                "{}",
                if added {
                    "Bookmarked."
                } else {
                    "Already bookmarked."
                }
            );
        }
        Commands::Unbookmark { id } => {
            if store.delete_bookmark(&id).await? {
                println!("Removed bookmark {id}.");
            } else {
                println!("No bookmark with id {id}.");
            }
        }
        Commands::ClearBookmarks => {
            store.clear_bookmarks().await?;
            println!("All bookmarks removed.");
        }
        Commands::Upload {
            title,
            source_url,
            image,
            publisher,
            cooking_time,
            servings,
            ingredients,
        } => {
            let mut form = RecipeForm::new();
            form.insert("title".to_string(), title);
            form.insert("sourceUrl".to_string(), source_url);
            form.insert("image".to_string(), image);
            form.insert("publisher".to_string(), publisher);
            form.insert("cookingTime".to_string(), cooking_time);
            form.insert("servings".to_string(), servings);
            for (i, ingredient) in ingredients.into_iter().enumerate() {
                form.insert(format!("ingredient-{}", i + 1), ingredient);
            }

            let recipe = store.upload_recipe(&form).await?;
            println!("Recipe was successfully uploaded :)");
            print_recipe(&recipe);
        }
    }

    Ok(())
}

async fn print_current(store: &RecipeStore) {
    if let Some(recipe) = store.recipe().await {
        print_recipe(&recipe);
    }
}

fn print_recipe(recipe: &Recipe) {
    let mark = if recipe.bookmarked { " [bookmarked]" } else { "" };
    println!("{}{}", recipe.title, mark);
    println!(
        "{} minutes, {} servings, by {}",
        recipe.cooking_time, recipe.servings, recipe.publisher
    );
    if recipe.key.is_some() {
        println!("(your recipe)");
    }
    println!();
    for ingredient in &recipe.ingredients {
        let quantity = ingredient.quantity.map(format_quantity).unwrap_or_default();
        let line = [
            quantity.as_str(),
            ingredient.unit.as_str(),
            ingredient.description.as_str(),
        ]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ");
        println!("  - {line}");
    }
    println!();
    println!("Directions: {}", recipe.source_url);
}

fn format_quantity(quantity: f64) -> String {
    let rounded = format!("{:.2}", quantity);
    rounded
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

fn print_pagination(search: &SearchState) {
    let pages = search.page_count();
    if pages > 1 {
        println!("Page {} of {}", search.page, pages);
    }
}
