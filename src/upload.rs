//! Turning the "add recipe" form into an API request body.
//!
//! The form is a flat map of field name to raw string, the way a browser form
//! serializes. Ingredients arrive as `ingredient-1`, `ingredient-2`, ... each
//! holding a `quantity,unit,description` triple.

use std::collections::HashMap;

use crate::model::{Ingredient, NewRecipe};
use crate::ForkifyError;

const INGREDIENT_PREFIX: &str = "ingredient";

/// Raw form fields keyed by their input name
pub type RecipeForm = HashMap<String, String>;

/// Parse one `quantity,unit,description` field.
///
/// Blank fields yield `Ok(None)`. An empty quantity means "no quantity".
pub fn parse_ingredient(raw: &str) -> Result<Option<Ingredient>, ForkifyError> {
    if raw.trim().is_empty() {
        return Ok(None);
    }

    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    let [quantity, unit, description] = parts.as_slice() else {
        return Err(ForkifyError::ValidationError(
            "Wrong ingredient format! Please use the correct format :)".to_string(),
        ));
    };

    let quantity = if quantity.is_empty() {
        None
    } else {
        Some(quantity.parse::<f64>().map_err(|_| {
            ForkifyError::ValidationError(format!("Ingredient quantity '{quantity}' is not a number"))
        })?)
    };

    Ok(Some(Ingredient {
        quantity,
        unit: unit.to_string(),
        description: description.to_string(),
    }))
}

/// Ingredient fields in form order: by numeric suffix, unnumbered ones last.
fn ingredient_fields(form: &RecipeForm) -> Vec<(&str, &str)> {
    let mut fields: Vec<(Option<u32>, &str, &str)> = form
        .iter()
        .filter(|(name, _)| name.starts_with(INGREDIENT_PREFIX))
        .map(|(name, value)| {
            let index = name[INGREDIENT_PREFIX.len()..]
                .trim_start_matches('-')
                .parse::<u32>()
                .ok();
            (index, name.as_str(), value.as_str())
        })
        .collect();

    fields.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.1.cmp(b.1),
    });

    fields
        .into_iter()
        .map(|(_, name, value)| (name, value))
        .collect()
}

fn text_field(form: &RecipeForm, name: &str) -> String {
    form.get(name).map(|v| v.trim().to_string()).unwrap_or_default()
}

fn number_field(form: &RecipeForm, name: &str) -> Result<u32, ForkifyError> {
    let raw = text_field(form, name);
    raw.parse::<u32>()
        .map_err(|_| ForkifyError::ValidationError(format!("{name} must be a whole number, got '{raw}'")))
}

/// Build the upload body from a submitted form.
pub fn new_recipe_from_form(form: &RecipeForm) -> Result<NewRecipe, ForkifyError> {
    let mut ingredients = Vec::new();
    for (name, value) in ingredient_fields(form) {
        if let Some(ingredient) = parse_ingredient(value).map_err(|e| match e {
            ForkifyError::ValidationError(msg) => {
                ForkifyError::ValidationError(format!("{msg} ({name})"))
            }
            other => other,
        })? {
            ingredients.push(ingredient);
        }
    }

    Ok(NewRecipe {
        title: text_field(form, "title"),
        source_url: text_field(form, "sourceUrl"),
        image_url: text_field(form, "image"),
        publisher: text_field(form, "publisher"),
        cooking_time: number_field(form, "cookingTime")?,
        servings: number_field(form, "servings")?,
        ingredients,
    })
}
