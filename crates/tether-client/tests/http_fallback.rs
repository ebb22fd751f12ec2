//! HTTP fallback against a mock server.

use serde_json::json;
use tether_client::{ContextUpdateRequest, Feedback, HttpError, HttpFallback};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, method, path, query_param},
};

#[tokio::test]
async fn send_posts_message_and_decodes_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/send"))
        .and(body_json(json!({"message": "hola", "session_id": "s1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": "¡Hola!",
            "session_id": "s1",
            "confidence": 0.9,
            "context": {"topic": "greeting"},
            "timestamp": "2026-01-01T00:00:00",
            "model_info": {"model": "local"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let http = HttpFallback::new(server.uri());
    let reply = http.send("hola", Some("s1"), None).await.unwrap();

    assert_eq!(reply.response, "¡Hola!");
    assert_eq!(reply.session_id, "s1");
    assert!((reply.confidence - 0.9).abs() < f64::EPSILON);
    assert_eq!(reply.context["topic"], "greeting");
}

#[tokio::test]
async fn history_passes_limit_and_keeps_server_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/history/s1"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": "s1",
            "history": [
                {"user_message": "second", "ai_response": "b", "confidence": 0.7,
                 "context": null, "timestamp": "2026-01-01T00:01:00"},
                {"user_message": "first", "ai_response": "a", "confidence": 0.8,
                 "context": {"topic": "x"}, "timestamp": "2026-01-01T00:00:00"}
            ],
            "count": 2
        })))
        .mount(&server)
        .await;

    let page = HttpFallback::new(server.uri()).history("s1", 2).await.unwrap();

    assert_eq!(page.count, 2);
    assert_eq!(page.history[0].user_message, "second");
    assert_eq!(page.history[1].ai_response, "a");
    assert_eq!(page.history[0].context, None);
}

#[tokio::test]
async fn update_context_skips_absent_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/context"))
        .and(body_json(json!({"session_id": "s1", "topics": ["rust"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Contexto actualizado correctamente",
            "session_id": "s1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let update = ContextUpdateRequest {
        session_id: "s1".into(),
        preferences: None,
        topics: Some(vec!["rust".into()]),
        personality: None,
    };
    let ack = HttpFallback::new(server.uri()).update_context(&update).await.unwrap();
    assert_eq!(ack.session_id.as_deref(), Some("s1"));
}

#[tokio::test]
async fn stats_reads_topic_and_emotion_counts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/stats/s1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "session_id": "s1",
            "message_count": 4,
            "avg_confidence": 0.85,
            "topics": [{"topic": "weather", "count": 3}],
            "emotions": [{"emotion": "joy", "count": 2}]
        })))
        .mount(&server)
        .await;

    let stats = HttpFallback::new(server.uri()).stats("s1").await.unwrap();
    assert_eq!(stats.message_count, 4);
    assert_eq!(stats.topics[0].label, "weather");
    assert_eq!(stats.emotions[0].label, "joy");
    assert_eq!(stats.emotions[0].count, 2);
}

#[tokio::test]
async fn feedback_and_health() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/feedback"))
        .and(body_json(json!({"session_id": "s1", "rating": 5, "comment": "great"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Feedback recibido correctamente",
            "session_id": "s1",
            "rating": 5
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "message": "AI Chat Assistant is running",
            "version": "1.0.0"
        })))
        .mount(&server)
        .await;

    // Trailing slash on the base URL is tolerated.
    let http = HttpFallback::new(format!("{}/", server.uri()));
    let feedback = Feedback {
        session_id: "s1".into(),
        conversation_id: None,
        rating: 5,
        comment: "great".into(),
    };
    http.feedback(&feedback).await.unwrap();

    let health = http.health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.version.as_deref(), Some("1.0.0"));
}

#[tokio::test]
async fn error_status_surfaces_detail() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat/send"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"detail": "Error procesando mensaje: boom"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/chat/stats/s1"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let http = HttpFallback::new(server.uri());

    match http.send("hola", None, None).await {
        Err(HttpError::Status { status, detail }) => {
            assert_eq!(status, 500);
            assert_eq!(detail, "Error procesando mensaje: boom");
        },
        other => panic!("expected status error, got {other:?}"),
    }

    match http.stats("s1").await {
        Err(HttpError::Status { status, detail }) => {
            assert_eq!(status, 503);
            assert_eq!(detail, "unavailable");
        },
        other => panic!("expected status error, got {other:?}"),
    }
}
