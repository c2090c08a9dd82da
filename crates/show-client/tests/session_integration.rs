//! End-to-end tests: the real WebSocket channel against an in-process
//! scripted controller.
//!
//! The controller accepts one connection, answers `listScenes`/`loadScene`
//! from its script, pushes `showMedia` events once `playScene` arrives, and
//! records every event it receives with the time it arrived.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use show_client::application::{
    ChannelError, ChannelEvent, ClientSession, EventChannel, NegotiationState, PresentationPolicy,
    SessionEnd, SessionError, SessionSettings,
};
use show_client::infrastructure::network::{WsChannelConfig, WsEventChannel};
use show_core::{decode_frame, encode_frame, EventName, Frame};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};

const INTERVAL: Duration = Duration::from_millis(100);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// What the controller does during one connection.
#[derive(Clone)]
struct Script {
    /// Args of the `listScenes` ack; `None` leaves the request unanswered.
    list_ack: Option<Vec<Value>>,
    load_ack: Vec<Value>,
    /// Pushed, in order, after `playScene`.
    pushes: Vec<Value>,
    /// Pushed right after the `listScenes` ack, whatever it said.
    pushes_on_list: Vec<Value>,
    /// Close the socket right after `playScene`.
    close_after_play: bool,
}

impl Script {
    fn happy(pushes: Vec<Value>) -> Self {
        Self {
            list_ack: Some(vec![Value::Null, json!([{"_id": "A"}, {"_id": "B"}])]),
            load_ack: vec![Value::Null, json!({"_id": "A", "name": "Opening"})],
            pushes,
            pushes_on_list: Vec::new(),
            close_after_play: false,
        }
    }
}

type Timeline = Arc<Mutex<Vec<(String, Vec<Value>, Instant)>>>;

fn show_media(id: &str) -> Value {
    json!({"mediaObject": {"_id": id, "url": format!("http://media/{id}.mp4"), "type": "video"}})
}

async fn send_frame<S>(ws: &mut S, frame: Frame)
where
    S: SinkExt<Message> + Unpin,
{
    let text = encode_frame(&frame).unwrap();
    let _ = ws.send(Message::Text(text)).await;
}

async fn send_pushes<S>(ws: &mut S, pushes: &[Value])
where
    S: SinkExt<Message> + Unpin,
{
    for push in pushes {
        send_frame(ws, Frame::event(EventName::ShowMedia, vec![push.clone()])).await;
    }
}

/// Starts the scripted controller and returns its address and timeline.
async fn spawn_controller(script: Script) -> (SocketAddr, Timeline) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let timeline: Timeline = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&timeline);

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(text) = message else { continue };
            let Ok(Frame::Event { event, args, ack_id }) = decode_frame(&text) else {
                continue;
            };
            recorded
                .lock()
                .unwrap()
                .push((event.clone(), args.clone(), Instant::now()));

            match (event.as_str(), ack_id) {
                ("listScenes", Some(id)) => {
                    if let Some(ack) = script.list_ack.clone() {
                        send_frame(&mut ws, Frame::ack(id, ack)).await;
                    }
                    send_pushes(&mut ws, &script.pushes_on_list).await;
                }
                ("loadScene", Some(id)) => {
                    send_frame(&mut ws, Frame::ack(id, script.load_ack.clone())).await;
                }
                ("playScene", None) => {
                    if script.close_after_play {
                        let _ = ws.close(None).await;
                        break;
                    }
                    send_pushes(&mut ws, &script.pushes).await;
                }
                _ => {}
            }
        }
    });

    (addr, timeline)
}

async fn connect(addr: SocketAddr) -> (WsEventChannel, mpsc::Receiver<ChannelEvent>) {
    WsEventChannel::connect(WsChannelConfig::new(format!("ws://{addr}/"), REQUEST_TIMEOUT))
        .await
        .unwrap()
}

fn settings(max_wait: Duration) -> SessionSettings {
    SessionSettings {
        max_wait,
        policy: PresentationPolicy::new(INTERVAL),
    }
}

fn events_for<'a>(timeline: &'a [(String, Vec<Value>, Instant)], id: &str) -> Vec<(&'a str, Instant)> {
    timeline
        .iter()
        .filter(|(_, args, _)| args.first().and_then(Value::as_str) == Some(id))
        .map(|(event, _, at)| (event.as_str(), *at))
        .collect()
}

#[tokio::test]
async fn test_negotiation_and_media_acknowledgment_end_to_end() {
    // Arrange
    let (addr, timeline) = spawn_controller(Script::happy(vec![show_media("m1")])).await;
    let (channel, events) = connect(addr).await;
    let session = ClientSession::new(Arc::new(channel), events, settings(Duration::from_millis(800)));

    // Act
    let outcome = session.run(std::future::pending()).await.unwrap();

    // Assert
    assert_eq!(outcome.ended_by, SessionEnd::MaxWaitElapsed);
    assert_eq!(outcome.negotiation, NegotiationState::Negotiated { scene_id: "A".into() });
    assert_eq!(outcome.media.acknowledged, 1);

    let timeline = timeline.lock().unwrap().clone();
    let names: Vec<&str> = timeline.iter().map(|(event, _, _)| event.as_str()).collect();
    assert_eq!(
        names,
        vec!["listScenes", "loadScene", "playScene", "mediaTransitioning", "mediaDone"]
    );
    assert_eq!(timeline[1].1, vec![json!("A")]);
    assert_eq!(timeline[2].1, vec![json!("A")]);

    let m1 = events_for(&timeline, "m1");
    assert_eq!(m1[0].0, "mediaTransitioning");
    assert_eq!(m1[1].0, "mediaDone");
    // Allow a little receive-side jitter.
    assert!(m1[1].1 - m1[0].1 >= INTERVAL - Duration::from_millis(10));
}

#[tokio::test]
async fn test_concurrent_pushes_each_acknowledged_once() {
    let pushes = vec![show_media("m1"), show_media("m2")];
    let (addr, timeline) = spawn_controller(Script::happy(pushes)).await;
    let (channel, events) = connect(addr).await;
    let session = ClientSession::new(Arc::new(channel), events, settings(Duration::from_millis(800)));

    let outcome = session.run(std::future::pending()).await.unwrap();

    assert_eq!(outcome.media.acknowledged, 2);
    let timeline = timeline.lock().unwrap().clone();
    for id in ["m1", "m2"] {
        let sequence: Vec<&str> = events_for(&timeline, id).iter().map(|(e, _)| *e).collect();
        assert_eq!(sequence, vec!["mediaTransitioning", "mediaDone"], "events for {id}");
    }
}

#[tokio::test]
async fn test_list_error_skips_load_but_media_still_acknowledged() {
    // Arrange: the controller rejects listScenes but still pushes media
    let script = Script {
        list_ack: Some(vec![json!({"message": "no scenes configured"})]),
        pushes_on_list: vec![show_media("m1")],
        ..Script::happy(Vec::new())
    };
    let (addr, timeline) = spawn_controller(script).await;
    let (channel, events) = connect(addr).await;
    let session = ClientSession::new(Arc::new(channel), events, settings(Duration::from_millis(600)));

    // Act
    let outcome = session.run(std::future::pending()).await.unwrap();

    // Assert
    assert!(matches!(outcome.negotiation, NegotiationState::Failed { .. }));
    assert_eq!(outcome.media.acknowledged, 1);
    let timeline = timeline.lock().unwrap().clone();
    assert!(timeline.iter().all(|(event, _, _)| event != "loadScene"));
}

#[tokio::test]
async fn test_malformed_push_is_skipped() {
    let pushes = vec![json!({"mediaObject": {"_id": "bad"}}), show_media("good")];
    let (addr, timeline) = spawn_controller(Script::happy(pushes)).await;
    let (channel, events) = connect(addr).await;
    let session = ClientSession::new(Arc::new(channel), events, settings(Duration::from_millis(600)));

    let outcome = session.run(std::future::pending()).await.unwrap();

    assert_eq!(outcome.media.malformed, 1);
    assert_eq!(outcome.media.acknowledged, 1);
    let timeline = timeline.lock().unwrap().clone();
    assert!(events_for(&timeline, "bad").is_empty());
    assert_eq!(events_for(&timeline, "good").len(), 2);
}

#[tokio::test]
async fn test_controller_close_ends_session_with_error() {
    let script = Script {
        close_after_play: true,
        ..Script::happy(Vec::new())
    };
    let (addr, _timeline) = spawn_controller(script).await;
    let (channel, events) = connect(addr).await;
    let session = ClientSession::new(Arc::new(channel), events, settings(Duration::from_secs(10)));

    let result = session.run(std::future::pending()).await;

    assert!(matches!(result, Err(SessionError::Disconnected(_))));
}

#[tokio::test]
async fn test_unanswered_request_times_out() {
    // Arrange
    let script = Script {
        list_ack: None,
        ..Script::happy(Vec::new())
    };
    let (addr, _timeline) = spawn_controller(script).await;
    let mut config = WsChannelConfig::new(format!("ws://{addr}/"), Duration::from_millis(200));
    config.queue_capacity = 8;
    let (channel, _events) = WsEventChannel::connect(config).await.unwrap();

    // Act
    let result = channel.request(EventName::ListScenes, Vec::new()).await;

    // Assert
    assert!(matches!(
        result,
        Err(ChannelError::Timeout {
            event: EventName::ListScenes,
            ..
        })
    ));
}

#[tokio::test]
async fn test_connect_to_closed_port_fails() {
    // Arrange: grab a free port, then release it
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    // Act
    let result =
        WsEventChannel::connect(WsChannelConfig::new(format!("ws://{addr}/"), REQUEST_TIMEOUT)).await;

    // Assert
    assert!(matches!(result, Err(ChannelError::ConnectFailed { .. })));
}

/// Accepts one connection, waits for two requests, then acks them in reverse
/// order with `[null, {"event": .., "ack_id": ..}]`.
async fn spawn_reversing_controller() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();
        let mut requests = Vec::new();

        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(text) = message else { continue };
            if let Ok(Frame::Event {
                event,
                ack_id: Some(id),
                ..
            }) = decode_frame(&text)
            {
                requests.push((event, id));
            }
            if requests.len() == 2 {
                for (event, id) in requests.drain(..).rev() {
                    let reply = vec![Value::Null, json!({"event": event, "ack_id": id})];
                    send_frame(&mut ws, Frame::ack(id, reply)).await;
                }
            }
        }
    });

    addr
}

#[tokio::test]
async fn test_concurrent_requests_get_distinct_ack_ids_and_their_own_replies() {
    // Arrange
    let addr = spawn_reversing_controller().await;
    let (channel, _events) = connect(addr).await;

    // Act
    let (list, load) = tokio::join!(
        channel.request(EventName::ListScenes, Vec::new()),
        channel.request(EventName::LoadScene, vec![json!("A")]),
    );

    // Assert
    let list = list.unwrap();
    let load = load.unwrap();
    assert_eq!(list[1]["event"], "listScenes");
    assert_eq!(load[1]["event"], "loadScene");
    assert_ne!(list[1]["ack_id"], load[1]["ack_id"]);
}

#[tokio::test]
async fn test_first_two_ack_ids_are_zero_and_one() {
    let addr = spawn_reversing_controller().await;
    let (channel, _events) = connect(addr).await;

    let (first, second) = tokio::join!(
        channel.request(EventName::ListScenes, Vec::new()),
        channel.request(EventName::ListScenes, Vec::new()),
    );

    let mut ids: Vec<u64> = [first.unwrap(), second.unwrap()]
        .iter()
        .map(|args| args[1]["ack_id"].as_u64().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 1]);
}
