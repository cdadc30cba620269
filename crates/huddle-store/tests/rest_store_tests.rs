use huddle_store::{Filter, ObjectStorage, Query, RemoteStore, RestStore, StoreError};
use mockito::Matcher;
use serde_json::json;

fn store_for(server: &mockito::Server) -> RestStore {
    RestStore::new(server.url(), "anon-key", Some("user-jwt")).unwrap()
}

#[tokio::test]
async fn test_select_sends_filters_and_auth_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/rest/v1/messages")
        .match_header("apikey", "anon-key")
        .match_header("authorization", "Bearer user-jwt")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("select".into(), "*".into()),
            Matcher::UrlEncoded("channel_id".into(), "eq.c1".into()),
            Matcher::UrlEncoded("order".into(), "created_at.asc".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!([{"id": "m1", "channel_id": "c1", "content": "hi"}]).to_string())
        .create_async()
        .await;

    let rows = store_for(&server)
        .select("messages", Query::new().eq("channel_id", "c1").order_asc("created_at"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["content"], "hi");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_insert_asks_for_representation() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rest/v1/channels")
        .match_header("prefer", "return=representation")
        .match_body(Matcher::PartialJson(json!({"name": "design", "type": "group"})))
        .with_status(201)
        .with_body(json!([{"id": 9, "name": "design", "type": "group", "is_private": false}]).to_string())
        .create_async()
        .await;

    let row = store_for(&server)
        .insert("channels", json!({"name": "design", "type": "group", "is_private": false}))
        .await
        .unwrap();

    assert_eq!(row["id"], 9);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_delete_with_no_match_returns_empty() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("DELETE", "/rest/v1/ai_chats")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("id".into(), "eq.c1".into()),
            Matcher::UrlEncoded("created_by".into(), "eq.bob".into()),
        ]))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;

    let removed = store_for(&server)
        .delete("ai_chats", &[Filter::eq("id", "c1"), Filter::eq("created_by", "bob")])
        .await
        .unwrap();

    assert!(removed.is_empty());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_missing_rpc_maps_to_function_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/rest/v1/rpc/get_user_channels")
        .match_body(Matcher::Json(json!({"user_id": "u1"})))
        .with_status(404)
        .with_body(
            json!({
                "code": "PGRST202",
                "message": "Could not find the function public.get_user_channels(user_id)"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = store_for(&server)
        .rpc("get_user_channels", json!({"user_id": "u1"}))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::FunctionNotFound(_)));
}

#[tokio::test]
async fn test_row_level_denial_maps_to_permission_denied() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/rest/v1/messages")
        .with_status(403)
        .with_body(
            json!({
                "code": "42501",
                "message": "new row violates row-level security policy for table \"messages\""
            })
            .to_string(),
        )
        .create_async()
        .await;

    let err = store_for(&server)
        .insert("messages", json!({"content": "x"}))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::PermissionDenied(_)));
}

#[tokio::test]
async fn test_upload_posts_bytes_to_bucket_path() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/storage/v1/object/resources/u1/abc-notes.txt")
        .match_header("content-type", "text/plain")
        .match_body("hello")
        .with_status(200)
        .with_body(json!({"Key": "resources/u1/abc-notes.txt"}).to_string())
        .create_async()
        .await;

    let store = store_for(&server);
    let path = store
        .upload("resources", "u1/abc-notes.txt", b"hello".to_vec(), "text/plain")
        .await
        .unwrap();

    assert_eq!(path, "u1/abc-notes.txt");
    assert!(store
        .public_url("resources", &path)
        .ends_with("/storage/v1/object/public/resources/u1/abc-notes.txt"));
    mock.assert_async().await;
}
