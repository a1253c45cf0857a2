use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use sorter_engine::{
    CloseReason, ConnectionSettings, ConnectionState, DirectorySource, EngineEvent, EngineHandle,
    EngineSettings, EventRouter, FetchSettings, OutboundMessage, UploadSettings,
};
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

async fn next(engine: &mut EngineHandle) -> EngineEvent {
    timeout(Duration::from_secs(5), engine.next_event())
        .await
        .expect("no engine event in time")
        .expect("event channel closed")
}

#[tokio::test]
async fn connection_changes_arrive_as_engine_events() {
    engine_logging::initialize_for_tests();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        // Close only after the client has seen the socket open.
        while let Some(Ok(message)) = ws.next().await {
            if matches!(message, Message::Text(_)) {
                break;
            }
        }
        ws.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "done".into(),
        }))
        .await
        .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let temp = tempfile::TempDir::new().unwrap();
    let settings = EngineSettings {
        connection: ConnectionSettings::new(url),
        upload: UploadSettings::default(),
        fetch: FetchSettings::default(),
    };
    let mut engine = EngineHandle::start(
        settings,
        EventRouter::shared(),
        Arc::new(DirectorySource::new(temp.path())),
    )
    .unwrap();

    assert_eq!(
        next(&mut engine).await,
        EngineEvent::Connection(ConnectionState::Connecting)
    );
    assert_eq!(
        next(&mut engine).await,
        EngineEvent::Connection(ConnectionState::Open)
    );

    engine.send(&OutboundMessage::InitPredictions).unwrap();
    let closed = ConnectionState::Closed(CloseReason::Remote {
        code: Some(1000),
        reason: "done".into(),
    });
    assert_eq!(next(&mut engine).await, EngineEvent::Connection(closed.clone()));
    assert_eq!(engine.connection_state(), closed);

    // Forwarding stops after the close.
    assert!(
        timeout(Duration::from_millis(200), engine.next_event())
            .await
            .is_err()
    );
}
