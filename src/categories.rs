//! The route handlers for listing and creating categories.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use crate::{
    AppConfig, AppJson, Error,
    auth::CurrentUser,
    db::{Insert, SelectBy},
    models::{Category, CategoryName, DatabaseID, EntryType, NewCategory},
};

/// The request body for creating a category.
///
/// Both fields are taken as raw strings and validated by the handler so that
/// invalid input produces the API's error shape rather than a deserialization
/// failure.
#[derive(Debug, Deserialize)]
pub struct CreateCategory {
    /// The display name of the category.
    #[serde(default)]
    pub name: String,
    /// 'income' or 'expense'.
    #[serde(default, rename = "type")]
    pub entry_type: String,
}

/// How a category is represented in API responses.
#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    id: DatabaseID,
    name: String,
    #[serde(rename = "type")]
    entry_type: EntryType,
}

impl From<Category> for CategoryResponse {
    fn from(category: Category) -> Self {
        Self {
            id: category.id(),
            name: category.name().as_ref().to_string(),
            entry_type: category.entry_type(),
        }
    }
}

/// Handler for listing the acting user's categories.
///
/// Categories are ordered by type and then by name so that clients can group
/// them for display without sorting.
pub async fn get_categories(
    State(state): State<AppConfig>,
    user: CurrentUser,
) -> Result<Json<Vec<CategoryResponse>>, Error> {
    let connection = state.db_connection().lock().unwrap();

    let categories = Category::select(user.user_id, &connection)?;

    Ok(Json(categories.into_iter().map(Into::into).collect()))
}

/// Handler for creating a new category.
///
/// # Errors
///
/// This function will return an error if:
/// - the name is empty,
/// - the type is not 'income' or 'expense',
/// - the user already owns a category with the same name and type.
pub async fn create_category(
    State(state): State<AppConfig>,
    user: CurrentUser,
    AppJson(request): AppJson<CreateCategory>,
) -> Result<(StatusCode, Json<CategoryResponse>), Error> {
    let name = CategoryName::new(&request.name)?;
    let entry_type: EntryType = request.entry_type.parse()?;

    let connection = state.db_connection().lock().unwrap();

    let category = NewCategory {
        user_id: user.user_id,
        name,
        entry_type,
    }
    .insert(&connection)?;

    Ok((StatusCode::CREATED, Json(category.into())))
}

#[cfg(test)]
mod category_endpoint_tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppConfig, build_router, db::initialize};

    fn get_test_app_config() -> AppConfig {
        let db_connection =
            Connection::open_in_memory().expect("Could not open database in memory.");
        initialize(&db_connection).expect("Could not initialize database.");

        AppConfig::new(db_connection, "foobar".to_string())
    }

    async fn create_app_with_user() -> (TestServer, String) {
        let server =
            TestServer::new(build_router(get_test_app_config()));

        let response = server
            .post("/auth/register")
            .json(&json!({ "email": "test@test.com", "password": "hunter2" }))
            .await;

        response.assert_status(StatusCode::CREATED);

        let token = response.json::<Value>()["access_token"]
            .as_str()
            .unwrap()
            .to_string();

        (server, token)
    }

    #[tokio::test]
    async fn create_category_succeeds() {
        let (server, token) = create_app_with_user().await;

        let response = server
            .post("/categories")
            .authorization_bearer(&token)
            .json(&json!({ "name": "Food", "type": "expense" }))
            .await;

        response.assert_status(StatusCode::CREATED);

        let body = response.json::<Value>();
        assert!(body["id"].as_i64().unwrap() > 0);
        assert_eq!(body["name"], "Food");
        assert_eq!(body["type"], "expense");
    }

    #[tokio::test]
    async fn create_category_trims_the_name_and_lowercases_the_type() {
        let (server, token) = create_app_with_user().await;

        let response = server
            .post("/categories")
            .authorization_bearer(&token)
            .json(&json!({ "name": "  Food ", "type": "Expense" }))
            .await;

        response.assert_status(StatusCode::CREATED);

        let body = response.json::<Value>();
        assert_eq!(body["name"], "Food");
        assert_eq!(body["type"], "expense");
    }

    #[tokio::test]
    async fn create_category_fails_with_empty_name() {
        let (server, token) = create_app_with_user().await;

        server
            .post("/categories")
            .authorization_bearer(&token)
            .json(&json!({ "name": "  ", "type": "expense" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_category_fails_with_invalid_type() {
        let (server, token) = create_app_with_user().await;

        server
            .post("/categories")
            .authorization_bearer(&token)
            .json(&json!({ "name": "Food", "type": "transfer" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_category_fails_with_duplicate_name_and_type() {
        let (server, token) = create_app_with_user().await;

        server
            .post("/categories")
            .authorization_bearer(&token)
            .json(&json!({ "name": "Food", "type": "expense" }))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .post("/categories")
            .authorization_bearer(&token)
            .json(&json!({ "name": "Food", "type": "expense" }))
            .await
            .assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn create_category_succeeds_with_same_name_and_different_type() {
        let (server, token) = create_app_with_user().await;

        server
            .post("/categories")
            .authorization_bearer(&token)
            .json(&json!({ "name": "Other", "type": "expense" }))
            .await
            .assert_status(StatusCode::CREATED);

        server
            .post("/categories")
            .authorization_bearer(&token)
            .json(&json!({ "name": "Other", "type": "income" }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn different_users_can_reuse_a_name_and_type() {
        let (server, token) = create_app_with_user().await;

        server
            .post("/categories")
            .authorization_bearer(&token)
            .json(&json!({ "name": "Food", "type": "expense" }))
            .await
            .assert_status(StatusCode::CREATED);

        let other_token = server
            .post("/auth/register")
            .json(&json!({ "email": "other@test.com", "password": "hunter3" }))
            .await
            .json::<Value>()["access_token"]
            .as_str()
            .unwrap()
            .to_string();

        server
            .post("/categories")
            .authorization_bearer(&other_token)
            .json(&json!({ "name": "Food", "type": "expense" }))
            .await
            .assert_status(StatusCode::CREATED);
    }

    #[tokio::test]
    async fn get_categories_returns_only_the_users_categories_in_display_order() {
        let (server, token) = create_app_with_user().await;

        for (name, entry_type) in [("Wages", "income"), ("Rent", "expense"), ("Food", "expense")] {
            server
                .post("/categories")
                .authorization_bearer(&token)
                .json(&json!({ "name": name, "type": entry_type }))
                .await
                .assert_status(StatusCode::CREATED);
        }

        let other_token = server
            .post("/auth/register")
            .json(&json!({ "email": "other@test.com", "password": "hunter3" }))
            .await
            .json::<Value>()["access_token"]
            .as_str()
            .unwrap()
            .to_string();

        server
            .post("/categories")
            .authorization_bearer(&other_token)
            .json(&json!({ "name": "Travel", "type": "expense" }))
            .await
            .assert_status(StatusCode::CREATED);

        let response = server.get("/categories").authorization_bearer(&token).await;

        response.assert_status_ok();

        let body = response.json::<Value>();
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|category| category["name"].as_str().unwrap())
            .collect();

        assert_eq!(names, ["Food", "Rent", "Wages"]);
    }

    #[tokio::test]
    async fn get_categories_returns_an_empty_list_for_a_new_user() {
        let (server, token) = create_app_with_user().await;

        let response = server.get("/categories").authorization_bearer(&token).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Value>(), json!([]));
    }
}
