use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use crate::api::ApiClient;
use crate::config::ForkifyConfig;
use crate::model::{Recipe, SearchResultItem, SearchState};
use crate::storage::{self, FileStorage, Storage, BOOKMARKS_KEY};
use crate::upload::{self, RecipeForm};
use crate::ForkifyError;

/// Everything the front end renders from
#[derive(Debug, Clone, PartialEq)]
pub struct AppState {
    pub recipe: Option<Recipe>,
    pub search: SearchState,
    /// Insertion-ordered, at most one entry per recipe id
    pub bookmarks: Vec<Recipe>,
}

impl AppState {
    pub fn new(results_per_page: usize, bookmarks: Vec<Recipe>) -> Self {
        Self {
            recipe: None,
            search: SearchState::new(results_per_page),
            bookmarks,
        }
    }

    pub fn is_bookmarked(&self, id: &str) -> bool {
        self.bookmarks.iter().any(|bookmark| bookmark.id == id)
    }

    /// Make `recipe` current, deriving its flag from the bookmark list.
    pub fn set_recipe(&mut self, mut recipe: Recipe) {
        recipe.bookmarked = self.is_bookmarked(&recipe.id);
        self.recipe = Some(recipe);
    }

    /// Returns false when the id was already bookmarked.
    pub fn add_bookmark(&mut self, recipe: &Recipe) -> bool {
        let added = !self.is_bookmarked(&recipe.id);
        if added {
            let mut snapshot = recipe.clone();
            snapshot.bookmarked = true;
            self.bookmarks.push(snapshot);
        }

        if let Some(current) = self.recipe.as_mut().filter(|r| r.id == recipe.id) {
            current.bookmarked = true;
        }
        added
    }

    /// Remove the first bookmark with `id`. Returns false when there was none.
    pub fn delete_bookmark(&mut self, id: &str) -> bool {
        let removed = match self.bookmarks.iter().position(|bookmark| bookmark.id == id) {
            Some(index) => {
                self.bookmarks.remove(index);
                true
            }
            None => false,
        };

        if let Some(current) = self.recipe.as_mut().filter(|r| r.id == id) {
            current.bookmarked = false;
        }
        removed
    }
}

/// Whether a load's response made it into the state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStatus {
    Applied,
    /// A newer load of the same kind started before this one finished
    Superseded,
}

/// Result of a search load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Found(usize),
    NoMatches,
    Superseded,
}

/// Hands out increasing tickets; only the newest ticket is current.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, ticket: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket
    }
}

struct Inner {
    state: AppState,
    storage: Box<dyn Storage>,
}

impl Inner {
    /// Persist `next.bookmarks` and only then commit `next`, so a failed
    /// write leaves the state untouched.
    fn commit_bookmarks(&mut self, next: AppState) -> Result<(), ForkifyError> {
        storage::save_json(self.storage.as_mut(), BOOKMARKS_KEY, &next.bookmarks)?;
        info!("Persisted {} bookmark(s)", next.bookmarks.len());
        self.state = next;
        Ok(())
    }
}

/// The application's state, the API it is filled from and the storage its
/// bookmarks live in. Construct one per session with [`RecipeStore::open`].
pub struct RecipeStore {
    api: ApiClient,
    inner: Mutex<Inner>,
    recipe_requests: RequestSequencer,
    search_requests: RequestSequencer,
}

impl RecipeStore {
    /// Build a store from configuration, hydrating bookmarks from disk.
    pub fn open(config: &ForkifyConfig) -> Result<Self, ForkifyError> {
        let api = ApiClient::new(config)?;
        let storage = FileStorage::new(config.resolved_storage_dir());
        debug!("Bookmark storage at {}", storage.dir().display());
        Self::with_storage(api, Box::new(storage), config.results_per_page)
    }

    /// Build a store over any storage backend, hydrating bookmarks from it.
    pub fn with_storage(
        api: ApiClient,
        storage: Box<dyn Storage>,
        results_per_page: usize,
    ) -> Result<Self, ForkifyError> {
        let bookmarks: Vec<Recipe> =
            storage::load_json(storage.as_ref(), BOOKMARKS_KEY)?.unwrap_or_default();
        debug!("Hydrated {} bookmark(s)", bookmarks.len());

        Ok(RecipeStore {
            api,
            inner: Mutex::new(Inner {
                state: AppState::new(results_per_page, bookmarks),
                storage,
            }),
            recipe_requests: RequestSequencer::default(),
            search_requests: RequestSequencer::default(),
        })
    }

    /// End the session and hand back the storage backend.
    pub fn into_storage(self) -> Box<dyn Storage> {
        self.inner.into_inner().storage
    }

    pub async fn snapshot(&self) -> AppState {
        self.inner.lock().await.state.clone()
    }

    pub async fn recipe(&self) -> Option<Recipe> {
        self.inner.lock().await.state.recipe.clone()
    }

    pub async fn search(&self) -> SearchState {
        self.inner.lock().await.state.search.clone()
    }

    pub async fn bookmarks(&self) -> Vec<Recipe> {
        self.inner.lock().await.state.bookmarks.clone()
    }

    /// Fetch a recipe and make it current.
    ///
    /// On error the current recipe is left as it was. A superseded load
    /// reports `Superseded` even when its own request failed.
    pub async fn load_recipe(&self, id: &str) -> Result<LoadStatus, ForkifyError> {
        let ticket = self.recipe_requests.begin();
        let result = self.api.fetch_recipe(id).await;

        let mut inner = self.inner.lock().await;
        if !self.recipe_requests.is_current(ticket) {
            match &result {
                Ok(_) => warn!("Discarding stale response for recipe {}", id),
                Err(e) => warn!("Discarding stale failure for recipe {}: {}", id, e),
            }
            return Ok(LoadStatus::Superseded);
        }
        inner.state.set_recipe(result?);
        Ok(LoadStatus::Applied)
    }

    /// Run a search and replace the results, resetting to page 1.
    pub async fn load_search_results(&self, query: &str) -> Result<SearchOutcome, ForkifyError> {
        let ticket = self.search_requests.begin();
        let result = self.api.search(query).await;

        let mut inner = self.inner.lock().await;
        if !self.search_requests.is_current(ticket) {
            match &result {
                Ok(_) => warn!("Discarding stale search results for '{}'", query),
                Err(e) => warn!("Discarding stale search failure for '{}': {}", query, e),
            }
            return Ok(SearchOutcome::Superseded);
        }
        let results = result?;

        let count = results.len();
        let search = &mut inner.state.search;
        search.query = query.to_string();
        search.results = results;
        search.page = 1;
        debug!("Search '{}' returned {} result(s)", query, count);

        Ok(if count == 0 {
            SearchOutcome::NoMatches
        } else {
            SearchOutcome::Found(count)
        })
    }

    /// Results on `page`, which becomes the current page.
    pub async fn search_results_page(&self, page: usize) -> Vec<SearchResultItem> {
        self.inner.lock().await.state.search.page(page).to_vec()
    }

    /// Rescale the current recipe.
    pub async fn update_servings(&self, new_servings: u32) -> Result<(), ForkifyError> {
        let mut inner = self.inner.lock().await;
        let recipe = inner
            .state
            .recipe
            .as_mut()
            .ok_or(ForkifyError::NoRecipeLoaded)?;
        recipe.update_servings(new_servings)
    }

    /// Bookmark `recipe` and persist. Returns false if it was already bookmarked.
    pub async fn add_bookmark(&self, recipe: &Recipe) -> Result<bool, ForkifyError> {
        let mut inner = self.inner.lock().await;
        let mut next = inner.state.clone();
        let added = next.add_bookmark(recipe);
        if added {
            inner.commit_bookmarks(next)?;
        } else {
            inner.state = next;
        }
        Ok(added)
    }

    /// Toggle the current recipe's bookmark. Returns the new flag.
    pub async fn toggle_bookmark(&self) -> Result<bool, ForkifyError> {
        let current = self.recipe().await.ok_or(ForkifyError::NoRecipeLoaded)?;
        if current.bookmarked {
            self.delete_bookmark(&current.id).await?;
            Ok(false)
        } else {
            self.add_bookmark(&current).await?;
            Ok(true)
        }
    }

    /// Remove the bookmark for `id` and persist. Unknown ids are a no-op
    /// returning false.
    pub async fn delete_bookmark(&self, id: &str) -> Result<bool, ForkifyError> {
        let mut inner = self.inner.lock().await;
        let mut next = inner.state.clone();
        let removed = next.delete_bookmark(id);
        if removed {
            inner.commit_bookmarks(next)?;
        } else {
            debug!("No bookmark with id {}", id);
            inner.state = next;
        }
        Ok(removed)
    }

    /// Drop every bookmark and persist the empty list.
    pub async fn clear_bookmarks(&self) -> Result<(), ForkifyError> {
        let mut inner = self.inner.lock().await;
        let mut next = inner.state.clone();
        next.bookmarks.clear();
        if let Some(current) = next.recipe.as_mut() {
            current.bookmarked = false;
        }
        inner.commit_bookmarks(next)
    }

    /// Validate the form, create the recipe remotely, make it current and
    /// bookmark it.
    pub async fn upload_recipe(&self, form: &RecipeForm) -> Result<Recipe, ForkifyError> {
        let new_recipe = upload::new_recipe_from_form(form)?;
        let ticket = self.recipe_requests.begin();
        let created = self.api.create_recipe(&new_recipe).await?;
        info!("Uploaded recipe {} ({})", created.title, created.id);

        let mut inner = self.inner.lock().await;
        let mut next = inner.state.clone();
        if self.recipe_requests.is_current(ticket) {
            next.set_recipe(created.clone());
        }
        next.add_bookmark(&created);
        inner.commit_bookmarks(next)?;

        let mut created = created;
        created.bookmarked = true;
        Ok(created)
    }
}
