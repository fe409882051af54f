use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ForkifyError;

/// A single ingredient line. `quantity` is absent for things like "salt to taste".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
}

/// A recipe in its internal shape; this is also the persisted bookmark format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub publisher: String,
    pub source_url: String,
    pub image: String,
    pub servings: u32,
    pub cooking_time: u32,
    pub ingredients: Vec<Ingredient>,
    /// Present only on recipes uploaded with our API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub bookmarked: bool,
}

impl Recipe {
    /// Rescale every ingredient quantity to `new_servings` and store the new count.
    pub fn update_servings(&mut self, new_servings: u32) -> Result<(), ForkifyError> {
        if new_servings == 0 {
            return Err(ForkifyError::ValidationError(
                "Servings must be at least 1".to_string(),
            ));
        }
        if self.servings == 0 {
            return Err(ForkifyError::ValidationError(format!(
                "Recipe {} has no servings count to scale from",
                self.id
            )));
        }

        let old = f64::from(self.servings);
        let new = f64::from(new_servings);
        for ingredient in &mut self.ingredients {
            if let Some(quantity) = ingredient.quantity.as_mut() {
                *quantity = *quantity * new / old;
            }
        }
        self.servings = new_servings;
        Ok(())
    }
}

/// One row of a search result list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub id: String,
    pub title: String,
    pub publisher: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// The current search and where the user is in its results
#[derive(Debug, Clone, PartialEq)]
pub struct SearchState {
    pub query: String,
    pub results: Vec<SearchResultItem>,
    /// 1-based
    pub page: usize,
    pub results_per_page: usize,
}

impl SearchState {
    pub fn new(results_per_page: usize) -> Self {
        Self {
            query: String::new(),
            results: Vec::new(),
            page: 1,
            results_per_page,
        }
    }

    /// Slice `[(page-1)*size, page*size)` of the results and make `page` current.
    ///
    /// Pages past the end, and page 0, are empty.
    pub fn page(&mut self, page: usize) -> &[SearchResultItem] {
        self.page = page;

        if page == 0 {
            return &[];
        }
        let start = (page - 1).saturating_mul(self.results_per_page);
        let end = page
            .saturating_mul(self.results_per_page)
            .min(self.results.len());
        if start >= end {
            return &[];
        }
        &self.results[start..end]
    }

    pub fn page_count(&self) -> usize {
        if self.results_per_page == 0 {
            return 0;
        }
        self.results.len().div_ceil(self.results_per_page)
    }
}

// Wire shapes. The API speaks snake_case and wraps everything in `data`.

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct RecipeData {
    recipe: RecipeDto,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    recipes: Vec<SearchItemDto>,
}

#[derive(Debug, Deserialize)]
struct RecipeDto {
    id: String,
    title: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    source_url: String,
    #[serde(default)]
    image_url: String,
    servings: u32,
    cooking_time: u32,
    #[serde(default)]
    ingredients: Vec<Ingredient>,
    key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItemDto {
    id: String,
    title: String,
    #[serde(default)]
    publisher: String,
    #[serde(default)]
    image_url: String,
    key: Option<String>,
}

impl From<RecipeDto> for Recipe {
    fn from(dto: RecipeDto) -> Self {
        Recipe {
            id: dto.id,
            title: dto.title,
            publisher: dto.publisher,
            source_url: dto.source_url,
            image: dto.image_url,
            servings: dto.servings,
            cooking_time: dto.cooking_time,
            ingredients: dto.ingredients,
            key: dto.key.filter(|key| !key.is_empty()),
            bookmarked: false,
        }
    }
}

impl From<SearchItemDto> for SearchResultItem {
    fn from(dto: SearchItemDto) -> Self {
        SearchResultItem {
            id: dto.id,
            title: dto.title,
            publisher: dto.publisher,
            image: dto.image_url,
            key: dto.key.filter(|key| !key.is_empty()),
        }
    }
}

fn unwrap_data<T: DeserializeOwned>(value: Value) -> Result<T, ForkifyError> {
    let envelope: Envelope<T> = serde_json::from_value(value)?;
    Ok(envelope.data)
}

/// Map a `{"data": {"recipe": ...}}` response into a [`Recipe`].
///
/// `bookmarked` is always false here; the caller knows the bookmark list.
pub fn recipe_from_response(value: Value) -> Result<Recipe, ForkifyError> {
    let data: RecipeData = unwrap_data(value)?;
    Ok(data.recipe.into())
}

/// Map a `{"data": {"recipes": [...]}}` response into search rows.
pub fn search_results_from_response(value: Value) -> Result<Vec<SearchResultItem>, ForkifyError> {
    let data: SearchData = unwrap_data(value)?;
    Ok(data.recipes.into_iter().map(Into::into).collect())
}

/// Body for creating a recipe, in the API's snake_case shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewRecipe {
    pub title: String,
    pub source_url: String,
    pub image_url: String,
    pub publisher: String,
    pub cooking_time: u32,
    pub servings: u32,
    pub ingredients: Vec<Ingredient>,
}
