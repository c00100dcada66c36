use std::time::Duration;

use axum::{extract::DefaultBodyLimit, http::StatusCode, Extension, Router};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{room::RoomRegistry, search::SharedSearch};

pub mod rooms;
pub mod videos;
pub mod ws;

const BODY_LIMIT: usize = 64 * 1024;

pub fn router(request_timeout: Duration) -> Router {
    // websocket 連線不套逾時
    let api = rooms::router()
        .merge(videos::router())
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, request_timeout));

    Router::new()
        .nest("/api/v1", api)
        .nest("/ws", ws::router())
}

/// Full application with shared state and middleware attached.
pub fn app(rooms: RoomRegistry, search: SharedSearch, request_timeout: Duration) -> Router {
    router(request_timeout)
        .layer(Extension(rooms))
        .layer(Extension(search))
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        response::Response,
    };
    use futures_util::{SinkExt, StreamExt};
    use serde_json::Value;
    use tokio_tungstenite::{connect_async, tungstenite::{self, Message as WsMessage}};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        search::{MediaSearch, SearchError},
        state::MediaItem,
    };

    struct FakeSearch;

    #[async_trait]
    impl MediaSearch for FakeSearch {
        async fn search(&self, query: &str) -> Result<Vec<MediaItem>, SearchError> {
            match query {
                "down" => Err(SearchError::LookupFailed("upstream 503".into())),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    Ok(Vec::new())
                }
                q => Ok(vec![MediaItem::new(format!("https://v.test/{q}"), q, 42)]),
            }
        }
    }

    fn test_app(rooms: &RoomRegistry) -> Router {
        app(rooms.clone(), Arc::new(FakeSearch), Duration::from_secs(5))
    }

    async fn call(app: Router, method: &str, uri: &str, body: Option<&str>) -> Response {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty))
            .unwrap();
        app.oneshot(req).await.unwrap()
    }

    async fn json(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn create_enqueue_play_seek() {
        let rooms = RoomRegistry::new();

        let resp = call(test_app(&rooms), "POST", "/api/v1/rooms", None).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let id = json(resp).await["id"].as_str().unwrap().to_string();

        let body = r#"{"url":"https://v.test/a","title":"a","duration":30}"#;
        let resp = call(test_app(&rooms), "POST", &format!("/api/v1/rooms/queue?id={id}"), Some(body)).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = call(test_app(&rooms), "POST", &format!("/api/v1/rooms/play?id={id}"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = call(test_app(&rooms), "POST", &format!("/api/v1/rooms/seek?id={id}&pos=500"), None).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let snap = rooms.snapshot(id.parse().unwrap()).await.unwrap();
        assert!(snap.playing);
        assert_eq!(snap.current.unwrap().title, "a");
        assert!(snap.position >= 30.0 && snap.position < 31.0);

        let resp = call(test_app(&rooms), "GET", "/api/v1/rooms/info", None).await;
        let info = json(resp).await;
        assert_eq!(info[0]["id"], id.as_str());
        assert_eq!(info[0]["current"]["duration"], 30);
        assert_eq!(info[0]["subscribers"], 0);
    }

    #[tokio::test]
    async fn error_responses_are_json() {
        let rooms = RoomRegistry::new();
        let id = rooms.create_room().await;

        let resp = call(test_app(&rooms), "POST", "/api/v1/rooms/play", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["message"], "query parameter id is required");

        let resp = call(test_app(&rooms), "POST", &format!("/api/v1/rooms/play?id={id}"), None).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = call(test_app(&rooms), "DELETE", &format!("/api/v1/rooms/delete?id={id}&idx=0"), None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = call(test_app(&rooms), "DELETE", &format!("/api/v1/rooms/delete?id={id}&idx=-1"), None).await;
        assert_eq!(json(resp).await["message"], "query parameter idx is required");

        let missing = uuid::Uuid::new_v4();
        let resp = call(test_app(&rooms), "POST", &format!("/api/v1/rooms/next?id={missing}"), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = call(test_app(&rooms), "POST", &format!("/api/v1/rooms/queue?id={id}"), Some("{}")).await;
        assert_eq!(json(resp).await["message"], "body is required");
    }

    #[tokio::test]
    async fn search_endpoint() {
        let rooms = RoomRegistry::new();

        let resp = call(test_app(&rooms), "GET", "/api/v1/videos?name=lofi", None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let items = json(resp).await;
        assert_eq!(items[0]["title"], "lofi");
        assert_eq!(items[0]["duration"], 42);

        let resp = call(test_app(&rooms), "GET", "/api/v1/videos", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = call(test_app(&rooms), "GET", "/api/v1/videos?name=down", None).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn slow_requests_time_out() {
        let rooms = RoomRegistry::new();
        let slow_app = app(rooms, Arc::new(FakeSearch), Duration::from_millis(50));
        let resp = call(slow_app, "GET", "/api/v1/videos?name=slow", None).await;
        assert_eq!(resp.status(), StatusCode::REQUEST_TIMEOUT);
    }

    async fn next_json<S>(socket: &mut S) -> Value
    where
        S: futures_util::Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
    {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), socket.next())
                .await
                .expect("no frame within 5s")
                .expect("socket ended")
                .unwrap();
            if let WsMessage::Text(text) = msg {
                return serde_json::from_str(&text).unwrap();
            }
        }
    }

    #[tokio::test]
    async fn websocket_session() {
        let rooms = RoomRegistry::new();
        let id = rooms.create_room().await;
        rooms.enqueue_video(id, MediaItem::new("https://v.test/a", "a", 30)).await.unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = test_app(&rooms);
        tokio::spawn(async move {
            axum::serve(listener, server.into_make_service()).await.unwrap();
        });

        // unknown room is refused before the upgrade
        let refused = connect_async(format!("ws://{addr}/ws/room?id={}", uuid::Uuid::new_v4()))
            .await
            .err()
            .expect("join of unknown room must fail");
        match refused {
            tungstenite::Error::Http(resp) => assert_eq!(resp.status().as_u16(), 400),
            e => panic!("unexpected error: {e}"),
        }

        let (mut socket, _) = connect_async(format!("ws://{addr}/ws/room?id={id}")).await.unwrap();

        let initial = next_json(&mut socket).await;
        assert_eq!(initial["id"], id.to_string().as_str());
        assert_eq!(initial["playing"], false);
        assert_eq!(initial["queue"][0]["title"], "a");
        assert_eq!(rooms.list_room_summaries().await[0].subscribers, 1);

        socket.send(WsMessage::Text(r#"{"type":"play"}"#.into())).await.unwrap();
        let playing = next_json(&mut socket).await;
        assert_eq!(playing["playing"], true);
        assert_eq!(playing["current"]["title"], "a");
        assert_eq!(playing["queue"].as_array().unwrap().len(), 0);

        socket.close(None).await.unwrap();

        // leaving as the last subscriber detaches and removes the room
        let mut gone = false;
        for _ in 0..200 {
            if rooms.get_room(id).await.is_err() {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(gone);
        assert!(rooms.list_room_summaries().await.is_empty());
    }
}
