//! A demo application exercising every part of the pipeline.
//!
//! ```sh
//! APP_PORT=8080 cargo run --example demo
//! curl -X POST localhost:8080/request -H 'content-type: application/json' -d '{"_id": 5}'
//! curl 'localhost:8080/database?name=Peter'
//! curl -X POST localhost:8080/permissions -H 'x-user-id: ana' -H 'x-user-roles: user'
//! ```

use flongo::prelude::*;
use http::StatusCode;
use serde_json::{json, Value};

/// The routes served by the demo.
fn routes() -> RouteTable {
    RouteTable::new()
        .route(
            Route::new(
                "/request",
                RouteHandler::new()
                    .get(|_, _, _| async {
                        Ok::<_, ActionError>(ApiResponse::message("Hello from Flongo!"))
                    })
                    .post(|_, payload, _| async move {
                        let id = ensure_field(&payload, "_id")?.to_string();
                        Ok::<_, ActionError>(
                            ApiResponse::json(json!({"sample_record": id, "created": true}))
                                .with_status(StatusCode::CREATED),
                        )
                    })
                    .put(|_, payload, _| async move {
                        Ok::<_, ActionError>(json!({"payload": payload}))
                    })
                    .delete(|_, _, _| async {
                        Ok::<_, ActionError>(json!({
                            "date": chrono::Utc::now(),
                            "deleted": true
                        }))
                    }),
            )
            .request_schema(RouteSchema::new().post(json!({
                "type": "object",
                "additionalProperties": false,
                "properties": {"_id": {"type": "integer"}},
                "required": ["_id"]
            })))
            .response_schema(RouteSchema::new().put(json!({
                "type": "object",
                "properties": {"payload": {"type": "object"}},
                "required": ["payload"]
            })))
            .log_level(LogLevel::Info),
        )
        .route(Route::new(
            "/error",
            RouteHandler::new()
                .get(|_, _, _| async {
                    Err::<Value, _>(ApiError::new("Oh no! A value error!").into())
                })
                .post(|_, _, _| async {
                    Err::<Value, _>(
                        ApiError::new("This is a custom API error")
                            .with_status(StatusCode::CONFLICT)
                            .into(),
                    )
                })
                .put(|_, payload, _| async move {
                    Err::<Value, _>(
                        ApiError::new("This API error carries data")
                            .with_status(StatusCode::UNPROCESSABLE_ENTITY)
                            .with_data("received", Value::Object(payload))
                            .into(),
                    )
                }),
        ))
        .route(
            Route::new(
                "/database",
                RouteHandler::new()
                    .get(|request: Request, payload, collection| async move {
                        let collection = ensure_collection(request.path(), collection)?;
                        let found = collection.find_one(&payload).await?;
                        Ok::<_, ActionError>(json!({"found": found}))
                    })
                    .post(|request: Request, payload, collection| async move {
                        let collection = ensure_collection(request.path(), collection)?;
                        let result = collection.insert_one(payload).await?;
                        Ok::<_, ActionError>(
                            ApiResponse::json(json!({"_id": result.inserted_id}))
                                .with_status(StatusCode::CREATED),
                        )
                    }),
            )
            .collection("sample"),
        )
        .route(Route::new("/default", RouteHandler::crud()).collection("default"))
        .route(
            Route::new(
                "/permissions",
                RouteHandler::crud()
                    .get(|_, _, _| async {
                        Ok::<_, ActionError>(ApiResponse::message("Authenticated!"))
                    })
                    .delete(|_, _, _| async {
                        Ok::<_, ActionError>(ApiResponse::message("Logged out!"))
                    }),
            )
            .collection("permissions")
            .permissions(RoutePermissions::new().post("user").put("admin")),
        )
}

#[tokio::main]
async fn main() -> Result<(), flongo::Error> {
    let mut settings = ConfigLoader::new().with_dotenv()?.load()?;
    settings.server.debug_mode = true;
    settings.logging.level = LogLevel::Debug;

    let fixtures = Fixtures::from_value(json!({
        "sample": [{"_id": "652790328c73b750984aee34", "name": "Peter"}]
    }))?;

    Application::new()
        .settings(settings)
        .routes(routes())
        .indices(Indices::new().with(Index::ascending("sample", "name")))
        .fixtures(fixtures)
        .run()
        .await
}
