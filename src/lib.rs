pub mod api;
pub mod config;
pub mod error;
pub mod model;
pub mod state;
pub mod storage;
pub mod upload;

pub use api::ApiClient;
pub use config::ForkifyConfig;
pub use error::ForkifyError;
pub use model::{Ingredient, NewRecipe, Recipe, SearchResultItem, SearchState};
pub use state::{AppState, LoadStatus, RecipeStore, SearchOutcome};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use upload::RecipeForm;

