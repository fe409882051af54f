use forkify::{
    ApiClient, FileStorage, ForkifyError, LoadStatus, MemoryStorage, RecipeForm, RecipeStore,
    SearchOutcome, Storage,
};
use mockito::{Matcher, Server, ServerGuard};
use std::time::Duration;
use tempfile::TempDir;

const RECIPE_ID: &str = "5ed6604591c37cdc054bc886";

fn recipe_json(id: &str, title: &str, key: Option<&str>) -> String {
    let key = key
        .map(|k| format!(r#", "key": "{k}""#))
        .unwrap_or_default();
    format!(
        r#"{{
            "status": "success",
            "data": {{
                "recipe": {{
                    "publisher": "Closet Cooking",
                    "ingredients": [
                        {{"quantity": 4, "unit": "cups", "description": "flour"}},
                        {{"quantity": 1, "unit": "tsp", "description": "salt"}},
                        {{"quantity": null, "unit": "", "description": "basil"}}
                    ],
                    "source_url": "http://www.closetcooking.com/{id}.html",
                    "image_url": "http://forkify-api.herokuapp.com/images/{id}.jpg",
                    "title": "{title}",
                    "servings": 4,
                    "cooking_time": 45,
                    "id": "{id}"{key}
                }}
            }}
        }}"#
    )
}

fn search_json(n: usize) -> String {
    let recipes: Vec<String> = (0..n)
        .map(|i| {
            format!(
                r#"{{"publisher": "P", "image_url": "img{i}.jpg", "title": "Pizza {i}", "id": "pizza-{i}"}}"#
            )
        })
        .collect();
    format!(
        r#"{{"status": "success", "results": {n}, "data": {{"recipes": [{}]}}}}"#,
        recipes.join(",")
    )
}

fn api_for(server: &ServerGuard) -> ApiClient {
    ApiClient::with_base_url(
        format!("{}/api/v2/recipes/", server.url()),
        Some("test-key".to_string()),
        Duration::from_secs(5),
    )
    .unwrap()
}

fn memory_store(server: &ServerGuard) -> RecipeStore {
    RecipeStore::with_storage(api_for(server), Box::new(MemoryStorage::new()), 10).unwrap()
}

async fn mock_recipe(server: &mut ServerGuard, id: &str, title: &str) -> mockito::Mock {
    server
        .mock("GET", format!("/api/v2/recipes/{id}").as_str())
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(recipe_json(id, title, None))
        .create_async()
        .await
}

/// Serves a fixed bookmark value and refuses every write
struct ReadOnlyStorage {
    bookmarks: Option<String>,
}

impl Storage for ReadOnlyStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>, ForkifyError> {
        Ok(self.bookmarks.clone())
    }

    fn set_item(&mut self, _key: &str, _value: &str) -> Result<(), ForkifyError> {
        Err(std::io::Error::other("disk is read-only").into())
    }
}

fn read_only_store(server: &ServerGuard, bookmarks: Option<String>) -> RecipeStore {
    RecipeStore::with_storage(
        api_for(server),
        Box::new(ReadOnlyStorage { bookmarks }),
        10,
    )
    .unwrap()
}

fn upload_form() -> RecipeForm {
    let mut form = RecipeForm::new();
    for (name, value) in [
        ("title", "My Soup"),
        ("sourceUrl", "https://example.com/soup"),
        ("image", "https://example.com/soup.jpg"),
        ("publisher", "Me"),
        ("cookingTime", "20"),
        ("servings", "2"),
        ("ingredient-1", "2,cups,water"),
        ("ingredient-2", ""),
        ("ingredient-3", ",,salt"),
    ] {
        form.insert(name.to_string(), value.to_string());
    }
    form
}

#[tokio::test]
async fn test_load_recipe_sets_current() {
    let mut server = Server::new_async().await;
    let mock = mock_recipe(&mut server, RECIPE_ID, "Pizza Dip").await;

    let store = memory_store(&server);
    let status = store.load_recipe(RECIPE_ID).await.unwrap();
    assert_eq!(status, LoadStatus::Applied);

    let recipe = store.recipe().await.unwrap();
    assert_eq!(recipe.id, RECIPE_ID);
    assert_eq!(recipe.title, "Pizza Dip");
    assert_eq!(recipe.servings, 4);
    assert_eq!(recipe.cooking_time, 45);
    assert_eq!(recipe.ingredients.len(), 3);
    assert!(!recipe.bookmarked);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_load_recipe_404_keeps_previous_recipe() {
    let mut server = Server::new_async().await;
    let _ok = mock_recipe(&mut server, RECIPE_ID, "Pizza Dip").await;
    let _missing = server
        .mock("GET", "/api/v2/recipes/nope")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "fail", "message": "Invalid _id: nope"}"#)
        .create_async()
        .await;

    let store = memory_store(&server);
    store.load_recipe(RECIPE_ID).await.unwrap();
    let before = store.snapshot().await;

    let err = store.load_recipe("nope").await.unwrap_err();
    match err {
        ForkifyError::RequestError { message, status } => {
            assert_eq!(message, "Invalid _id: nope");
            assert_eq!(status, 404);
        }
        other => panic!("Expected RequestError, got {other:?}"),
    }
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn test_search_and_paginate() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/api/v2/recipes/")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("search".into(), "pizza".into()),
            Matcher::UrlEncoded("key".into(), "test-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(search_json(23))
        .create_async()
        .await;

    let store = memory_store(&server);
    let outcome = store.load_search_results("pizza").await.unwrap();
    assert_eq!(outcome, SearchOutcome::Found(23));

    let search = store.search().await;
    assert_eq!(search.query, "pizza");
    assert_eq!(search.page, 1);
    assert_eq!(search.results[0].image, "img0.jpg");

    assert_eq!(store.search_results_page(1).await.len(), 10);
    let last = store.search_results_page(3).await;
    assert_eq!(last.len(), 3);
    assert_eq!(last[2].id, "pizza-22");
    assert_eq!(store.search().await.page, 3);
    assert!(store.search_results_page(4).await.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_new_search_resets_page() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/api/v2/recipes/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(search_json(15))
        .expect(2)
        .create_async()
        .await;

    let store = memory_store(&server);
    store.load_search_results("pasta").await.unwrap();
    store.search_results_page(2).await;
    assert_eq!(store.search().await.page, 2);

    store.load_search_results("pasta").await.unwrap();
    assert_eq!(store.search().await.page, 1);
}

#[tokio::test]
async fn test_search_without_matches_is_not_an_error() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("GET", "/api/v2/recipes/")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(search_json(0))
        .create_async()
        .await;

    let store = memory_store(&server);
    let outcome = store.load_search_results("xyzzy").await.unwrap();
    assert_eq!(outcome, SearchOutcome::NoMatches);
    assert!(store.search_results_page(1).await.is_empty());
}

#[tokio::test]
async fn test_update_servings_on_current_recipe() {
    let mut server = Server::new_async().await;
    let _m = mock_recipe(&mut server, RECIPE_ID, "Pizza Dip").await;

    let store = memory_store(&server);
    store.load_recipe(RECIPE_ID).await.unwrap();
    store.update_servings(2).await.unwrap();

    let recipe = store.recipe().await.unwrap();
    assert_eq!(recipe.servings, 2);
    assert_eq!(recipe.ingredients[0].quantity, Some(2.0));
    assert_eq!(recipe.ingredients[1].quantity, Some(0.5));
    assert_eq!(recipe.ingredients[2].quantity, None);

    let err = store.update_servings(0).await.unwrap_err();
    assert!(matches!(err, ForkifyError::ValidationError(_)));
    assert_eq!(store.recipe().await.unwrap().servings, 2);
}

#[tokio::test]
async fn test_update_servings_without_recipe() {
    let server = Server::new_async().await;
    let store = memory_store(&server);

    let result = store.update_servings(3).await;
    assert!(matches!(result, Err(ForkifyError::NoRecipeLoaded)));
}

#[tokio::test]
async fn test_add_then_delete_bookmark() {
    let mut server = Server::new_async().await;
    let _m = mock_recipe(&mut server, RECIPE_ID, "Pizza Dip").await;

    let store = memory_store(&server);
    store.load_recipe(RECIPE_ID).await.unwrap();
    let before = store.snapshot().await;

    let recipe = store.recipe().await.unwrap();
    assert!(store.add_bookmark(&recipe).await.unwrap());
    assert!(store.recipe().await.unwrap().bookmarked);
    assert_eq!(store.bookmarks().await.len(), 1);

    assert!(store.delete_bookmark(RECIPE_ID).await.unwrap());
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn test_delete_unknown_bookmark_is_noop() {
    let server = Server::new_async().await;
    let store = memory_store(&server);

    assert!(!store.delete_bookmark("does-not-exist").await.unwrap());
    assert!(store.bookmarks().await.is_empty());
}

#[tokio::test]
async fn test_toggle_bookmark() {
    let mut server = Server::new_async().await;
    let _m = mock_recipe(&mut server, RECIPE_ID, "Pizza Dip").await;

    let store = memory_store(&server);
    assert!(matches!(
        store.toggle_bookmark().await,
        Err(ForkifyError::NoRecipeLoaded)
    ));

    store.load_recipe(RECIPE_ID).await.unwrap();
    assert!(store.toggle_bookmark().await.unwrap());
    assert_eq!(store.bookmarks().await.len(), 1);
    assert!(!store.toggle_bookmark().await.unwrap());
    assert!(store.bookmarks().await.is_empty());
}

#[tokio::test]
async fn test_loading_bookmarked_recipe_sets_flag() {
    let mut server = Server::new_async().await;
    let _a = mock_recipe(&mut server, "aaa", "First").await;
    let _b = mock_recipe(&mut server, "bbb", "Second").await;

    let store = memory_store(&server);
    store.load_recipe("aaa").await.unwrap();
    let first = store.recipe().await.unwrap();
    store.add_bookmark(&first).await.unwrap();

    store.load_recipe("bbb").await.unwrap();
    assert!(!store.recipe().await.unwrap().bookmarked);

    store.load_recipe("aaa").await.unwrap();
    assert!(store.recipe().await.unwrap().bookmarked);
}

#[tokio::test]
async fn test_bookmarks_survive_restart() {
    let dir = TempDir::new().unwrap();
    let mut server = Server::new_async().await;
    let _a = mock_recipe(&mut server, "aaa", "First").await;
    let _b = mock_recipe(&mut server, "bbb", "Second").await;

    let store =
        RecipeStore::with_storage(api_for(&server), Box::new(FileStorage::new(dir.path())), 10)
            .unwrap();
    for id in ["aaa", "bbb"] {
        store.load_recipe(id).await.unwrap();
        let recipe = store.recipe().await.unwrap();
        store.add_bookmark(&recipe).await.unwrap();
    }
    let saved = store.bookmarks().await;
    drop(store);

    let restarted =
        RecipeStore::with_storage(api_for(&server), Box::new(FileStorage::new(dir.path())), 10)
            .unwrap();
    assert_eq!(restarted.bookmarks().await, saved);
    assert!(restarted.recipe().await.is_none());

    let raw = std::fs::read_to_string(dir.path().join("bookmarks.json")).unwrap();
    assert!(raw.contains("\"sourceUrl\""));
    assert!(raw.contains("\"cookingTime\""));
}

#[tokio::test]
async fn test_into_storage_round_trip() {
    let mut server = Server::new_async().await;
    let _m = mock_recipe(&mut server, RECIPE_ID, "Pizza Dip").await;

    let store = memory_store(&server);
    store.load_recipe(RECIPE_ID).await.unwrap();
    let recipe = store.recipe().await.unwrap();
    store.add_bookmark(&recipe).await.unwrap();
    let saved = store.bookmarks().await;

    let storage = store.into_storage();
    let restarted = RecipeStore::with_storage(api_for(&server), storage, 10).unwrap();
    assert_eq!(restarted.bookmarks().await, saved);
}

#[tokio::test]
async fn test_clear_bookmarks() {
    let mut server = Server::new_async().await;
    let _m = mock_recipe(&mut server, RECIPE_ID, "Pizza Dip").await;

    let store = memory_store(&server);
    store.load_recipe(RECIPE_ID).await.unwrap();
    store.toggle_bookmark().await.unwrap();

    store.clear_bookmarks().await.unwrap();
    assert!(store.bookmarks().await.is_empty());
    assert!(!store.recipe().await.unwrap().bookmarked);

    let storage = store.into_storage();
    assert_eq!(storage.get_item("bookmarks").unwrap().as_deref(), Some("[]"));
}

#[tokio::test]
async fn test_corrupt_bookmarks_fail_to_hydrate() {
    let server = Server::new_async().await;
    let mut storage = MemoryStorage::new();
    storage.set_item("bookmarks", "{not a list").unwrap();

    let result = RecipeStore::with_storage(api_for(&server), Box::new(storage), 10);
    assert!(matches!(result, Err(ForkifyError::DecodeError(_))));
}

#[tokio::test]
async fn test_upload_recipe_sets_current_and_bookmarks() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v2/recipes/")
        .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
        .match_body(Matcher::PartialJson(serde_json::json!({
            "title": "My Soup",
            "source_url": "https://example.com/soup",
            "image_url": "https://example.com/soup.jpg",
            "publisher": "Me",
            "cooking_time": 20,
            "servings": 2
        })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(recipe_json("new-id", "My Soup", Some("test-key")))
        .create_async()
        .await;

    let store = memory_store(&server);
    let created = store.upload_recipe(&upload_form()).await.unwrap();

    assert_eq!(created.id, "new-id");
    assert_eq!(created.key.as_deref(), Some("test-key"));
    assert!(created.bookmarked);

    let current = store.recipe().await.unwrap();
    assert_eq!(current.id, "new-id");
    assert!(current.bookmarked);

    let bookmarks = store.bookmarks().await;
    assert_eq!(bookmarks.len(), 1);
    assert_eq!(bookmarks[0].id, "new-id");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_upload_with_bad_ingredient_never_hits_api() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/v2/recipes/")
        .match_query(Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let mut form = upload_form();
    form.insert("ingredient-2".to_string(), "invalid".to_string());

    let store = memory_store(&server);
    let result = store.upload_recipe(&form).await;

    assert!(matches!(result, Err(ForkifyError::ValidationError(_))));
    assert!(store.recipe().await.is_none());
    assert!(store.bookmarks().await.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_upload_rejected_by_api() {
    let mut server = Server::new_async().await;
    let _m = server
        .mock("POST", "/api/v2/recipes/")
        .match_query(Matcher::Any)
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status": "fail", "message": "Invalid recipe data"}"#)
        .create_async()
        .await;

    let store = memory_store(&server);
    let err = store.upload_recipe(&upload_form()).await.unwrap_err();

    assert_eq!(err.status(), Some(400));
    assert_eq!(err.to_string(), "Invalid recipe data (400)");
    assert!(store.bookmarks().await.is_empty());
}

#[tokio::test]
async fn test_failed_bookmark_write_leaves_state_unchanged() {
    let mut server = Server::new_async().await;
    let _m = mock_recipe(&mut server, RECIPE_ID, "Pizza Dip").await;

    let store = read_only_store(&server, None);
    store.load_recipe(RECIPE_ID).await.unwrap();
    let before = store.snapshot().await;

    let recipe = store.recipe().await.unwrap();
    let err = store.add_bookmark(&recipe).await.unwrap_err();
    assert!(matches!(err, ForkifyError::StorageError(_)));
    assert!(matches!(
        store.toggle_bookmark().await,
        Err(ForkifyError::StorageError(_))
    ));
    assert_eq!(store.snapshot().await, before);
    assert!(!store.recipe().await.unwrap().bookmarked);
}

#[tokio::test]
async fn test_failed_bookmark_delete_leaves_state_unchanged() {
    let mut server = Server::new_async().await;
    let _m = mock_recipe(&mut server, RECIPE_ID, "Pizza Dip").await;

    // Bookmark the recipe in a writable session, then reopen read-only
    let store = memory_store(&server);
    store.load_recipe(RECIPE_ID).await.unwrap();
    store.toggle_bookmark().await.unwrap();
    let saved = store.into_storage().get_item("bookmarks").unwrap();

    let store = read_only_store(&server, saved);
    store.load_recipe(RECIPE_ID).await.unwrap();
    assert!(store.recipe().await.unwrap().bookmarked);
    let before = store.snapshot().await;

    let err = store.delete_bookmark(RECIPE_ID).await.unwrap_err();
    assert!(matches!(err, ForkifyError::StorageError(_)));
    assert!(matches!(
        store.clear_bookmarks().await,
        Err(ForkifyError::StorageError(_))
    ));

    assert_eq!(store.snapshot().await, before);
    assert_eq!(store.bookmarks().await.len(), 1);
    assert!(store.recipe().await.unwrap().bookmarked);
}

#[tokio::test]
async fn test_upload_with_failed_bookmark_write_leaves_state_unchanged() {
    let mut server = Server::new_async().await;
    let _recipe = mock_recipe(&mut server, RECIPE_ID, "Pizza Dip").await;
    let upload = server
        .mock("POST", "/api/v2/recipes/")
        .match_query(Matcher::Any)
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(recipe_json("new-id", "My Soup", Some("test-key")))
        .create_async()
        .await;

    let store = read_only_store(&server, None);
    store.load_recipe(RECIPE_ID).await.unwrap();
    let before = store.snapshot().await;

    let err = store.upload_recipe(&upload_form()).await.unwrap_err();
    assert!(matches!(err, ForkifyError::StorageError(_)));

    assert_eq!(store.snapshot().await, before);
    assert_eq!(store.recipe().await.unwrap().id, RECIPE_ID);
    assert!(store.bookmarks().await.is_empty());
    upload.assert_async().await;
}
