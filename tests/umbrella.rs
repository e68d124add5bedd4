//! The umbrella crate alone is enough to declare and invoke endpoints.

use pontoon::prelude::*;
use serde_json::json;

#[endpoint]
/// Add two numbers.
fn add(#[from_query] a: i64, #[from_query(default = 1)] b: i64) -> i64 {
    a + b
}

#[tokio::test]
async fn endpoints_work_through_the_umbrella() {
    let mut app = BridgeApp::new("umbrella");
    app.get("/add", "add", add()).unwrap();

    let request = InvokeRequest::new("add").with_query_param("a", "41");
    let envelope = app.invoker().invoke_request(request).await;

    assert_eq!(envelope.status_code, 200);
    assert_eq!(envelope.content, json!(42));
    assert_eq!(app.endpoints()[0].summary, "Add two numbers.");
}
