use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use pretty_assertions::assert_eq;
use sorter_engine::protocol::{CsvFile, InitUpload, SelectMode};
use sorter_engine::{
    CloseReason, ConnectionError, ConnectionHandle, ConnectionSettings, ConnectionState,
    EventRouter, InboundKind, InboundMessage, OutboundMessage, WireMode,
};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    (listener, url)
}

async fn wait_for(
    rx: &mut watch::Receiver<ConnectionState>,
    predicate: impl Fn(&ConnectionState) -> bool,
) -> ConnectionState {
    timeout(Duration::from_secs(5), async {
        loop {
            let state = rx.borrow_and_update().clone();
            if predicate(&state) {
                return state;
            }
            rx.changed().await.expect("driver dropped the state channel");
        }
    })
    .await
    .expect("state not reached in time")
}

fn init_upload(id: u64) -> OutboundMessage {
    OutboundMessage::InitUpload(InitUpload {
        number_of_files: 2,
        root_directory_name: "shop".into(),
        correlation_id: id,
    })
}

#[tokio::test]
async fn frames_sent_while_connecting_are_flushed_in_order() {
    engine_logging::initialize_for_tests();
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut frames = Vec::new();
        while frames.len() < 4 {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => frames.push(text),
                Some(Ok(_)) => {}
                other => panic!("unexpected {other:?}"),
            }
        }
        frames
    });

    let handle =
        ConnectionHandle::connect(ConnectionSettings::new(url), EventRouter::shared()).unwrap();
    assert_eq!(handle.state(), ConnectionState::Connecting);
    handle.send(&init_upload(1)).unwrap();
    handle
        .send(&OutboundMessage::SelectMode(SelectMode {
            mode: WireMode::Manual,
        }))
        .unwrap();
    handle.send(&OutboundMessage::CancelUpload).unwrap();

    let mut states = handle.subscribe();
    wait_for(&mut states, |state| *state == ConnectionState::Open).await;
    handle.send(&OutboundMessage::InitPredictions).unwrap();

    let frames = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
    let discriminants: Vec<String> = frames
        .iter()
        .map(|text| {
            let value: serde_json::Value = serde_json::from_str(text).unwrap();
            value["type"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(
        discriminants,
        vec!["init_upload", "select_mode", "cancel_upload", "init_predictions"]
    );
}

#[tokio::test]
async fn malformed_frames_are_dropped_and_connection_stays_open() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text("{broken".into())).await.unwrap();
        ws.send(Message::Text(r#"{"type":"mystery","data":{}}"#.into()))
            .await
            .unwrap();
        ws.send(Message::Text(
            r#"{"type":"upload_progress","data":{"progress":"lots"}}"#.into(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"type":"csv_file","data":{"csvData":"productName,class\n"}}"#.into(),
        ))
        .await
        .unwrap();
        // Keep the socket open until the client is done.
        let _ = ws.next().await;
    });

    let router = EventRouter::shared();
    let (tx, mut rx) = mpsc::unbounded_channel();
    router
        .lock()
        .unwrap()
        .register(InboundKind::CsvFile, move |message| {
            let _ = tx.send(message);
        });

    let handle = ConnectionHandle::connect(ConnectionSettings::new(url), router).unwrap();
    let received = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        received,
        InboundMessage::CsvFile(CsvFile {
            content: "productName,class\n".into()
        })
    );
    assert!(rx.try_recv().is_err());
    assert_eq!(handle.state(), ConnectionState::Open);

    handle.close();
    let mut states = handle.subscribe();
    let closed = wait_for(&mut states, ConnectionState::is_closed).await;
    assert_eq!(closed, ConnectionState::Closed(CloseReason::Requested));
    let _ = timeout(Duration::from_secs(5), server).await;
}

#[tokio::test]
async fn remote_close_is_observable_and_blocks_sends() {
    let (listener, url) = bind().await;

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "run finished".into(),
        }))
        .await
        .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let handle =
        ConnectionHandle::connect(ConnectionSettings::new(url), EventRouter::shared()).unwrap();
    let mut states = handle.subscribe();
    let closed = wait_for(&mut states, ConnectionState::is_closed).await;
    assert_eq!(
        closed,
        ConnectionState::Closed(CloseReason::Remote {
            code: Some(1000),
            reason: "run finished".into()
        })
    );
    assert!(matches!(
        handle.send(&OutboundMessage::CancelUpload),
        Err(ConnectionError::Closed)
    ));
}

#[tokio::test]
async fn failed_connect_closes_with_error() {
    let (listener, url) = bind().await;
    drop(listener);

    let handle =
        ConnectionHandle::connect(ConnectionSettings::new(url), EventRouter::shared()).unwrap();
    let mut states = handle.subscribe();
    let closed = wait_for(&mut states, ConnectionState::is_closed).await;
    assert!(matches!(closed, ConnectionState::Closed(CloseReason::Error(_))));
}
