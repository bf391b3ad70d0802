//! Insert notifications over the Realtime websocket (Phoenix channels).

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{runtime::Handle, sync::watch, time};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};

use crate::{
    domain::{
        message::Message,
        sync::{StoreError, SubscriptionEvent},
    },
    infra::secrets::redact_url,
    usecases::contracts::{InsertSubscription, SubscriptionHandler},
};

use super::wire;

const REALTIME_CHANNEL_STARTED: &str = "REALTIME_CHANNEL_STARTED";
const REALTIME_CHANNEL_STOPPED: &str = "REALTIME_CHANNEL_STOPPED";
const REALTIME_CONNECT_FAILED: &str = "REALTIME_CONNECT_FAILED";
const REALTIME_JOIN_REJECTED: &str = "REALTIME_JOIN_REJECTED";
const REALTIME_JOIN_TIMED_OUT: &str = "REALTIME_JOIN_TIMED_OUT";
const REALTIME_SOCKET_FAILED: &str = "REALTIME_SOCKET_FAILED";
const REALTIME_FRAME_INVALID: &str = "REALTIME_FRAME_INVALID";

const PHOENIX_TOPIC: &str = "phoenix";
const PROTOCOL_VERSION: &str = "1.0.0";
const JOIN_REF: &str = "1";
const JOIN_TIMED_OUT: &str = "join timed out";

/// Everything a channel task needs, cloned per subscription.
#[derive(Debug, Clone)]
pub struct RealtimeSettings {
    pub socket_url: String,
    pub access_token: String,
    pub schema: String,
    pub table: String,
    pub heartbeat_interval: Duration,
    /// Bound on connecting plus waiting for the join reply.
    pub join_timeout: Duration,
}

impl RealtimeSettings {
    pub fn topic(&self) -> String {
        format!("realtime:{}", self.table)
    }
}

/// Turns the project URL into the Realtime websocket endpoint.
pub fn websocket_url(base_url: &str, api_key: &str) -> Result<String, StoreError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    let socket_base = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(StoreError::InvalidData(format!(
            "backend url `{trimmed}` is not http(s)"
        )));
    };

    Ok(format!(
        "{socket_base}/realtime/v1/websocket?apikey={api_key}&vsn={PROTOCOL_VERSION}"
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoenixFrame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixFrame {
    pub fn join(settings: &RealtimeSettings) -> Self {
        Self {
            topic: settings.topic(),
            event: "phx_join".to_owned(),
            payload: json!({
                "config": {
                    "broadcast": { "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [{
                        "event": "INSERT",
                        "schema": settings.schema,
                        "table": settings.table,
                    }],
                },
                "access_token": settings.access_token,
            }),
            reference: Some(JOIN_REF.to_owned()),
        }
    }

    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: PHOENIX_TOPIC.to_owned(),
            event: "heartbeat".to_owned(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    pub fn leave(topic: &str, reference: u64) -> Self {
        Self {
            topic: topic.to_owned(),
            event: "phx_leave".to_owned(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    fn to_ws(&self) -> Result<WsMessage, StoreError> {
        serde_json::to_string(self)
            .map(WsMessage::Text)
            .map_err(|error| StoreError::InvalidData(format!("phoenix frame: {error}")))
    }
}

/// What one incoming frame means for the subscription.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelSignal {
    Joined,
    Rejected(String),
    Inserted(Message),
    Failed(String),
    Closed,
    Ignored,
}

pub fn interpret(frame: PhoenixFrame, topic: &str) -> Result<ChannelSignal, StoreError> {
    if frame.topic != topic {
        return Ok(ChannelSignal::Ignored);
    }

    let signal = match frame.event.as_str() {
        "phx_reply" if frame.reference.as_deref() == Some(JOIN_REF) => {
            match frame.payload.get("status").and_then(Value::as_str) {
                Some("ok") => ChannelSignal::Joined,
                _ => ChannelSignal::Rejected(reason(&frame.payload)),
            }
        }
        "postgres_changes" => {
            let data = frame.payload.get("data").cloned().unwrap_or(Value::Null);
            let is_insert = data
                .get("type")
                .or_else(|| data.get("eventType"))
                .and_then(Value::as_str)
                .map_or(true, |kind| kind == "INSERT");
            if !is_insert {
                return Ok(ChannelSignal::Ignored);
            }

            let record = data
                .get("record")
                .or_else(|| data.get("new"))
                .cloned()
                .ok_or_else(|| StoreError::InvalidData("change without record".to_owned()))?;
            ChannelSignal::Inserted(wire::decode_row(record)?)
        }
        "system" if frame.payload.get("status").and_then(Value::as_str) == Some("error") => {
            ChannelSignal::Failed(reason(&frame.payload))
        }
        "phx_error" => ChannelSignal::Failed("channel crashed on the server".to_owned()),
        "phx_close" => ChannelSignal::Closed,
        _ => ChannelSignal::Ignored,
    };

    Ok(signal)
}

fn reason(payload: &Value) -> String {
    payload
        .pointer("/response/reason")
        .or_else(|| payload.get("message"))
        .and_then(Value::as_str)
        .unwrap_or("unknown reason")
        .to_owned()
}

/// Handle of one running channel task. Dropping it leaves the channel.
#[derive(Debug)]
pub struct RealtimeSubscription {
    stop_tx: Option<watch::Sender<bool>>,
}

impl RealtimeSubscription {
    pub fn start(runtime: &Handle, settings: RealtimeSettings, handler: SubscriptionHandler) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        runtime.spawn(run_channel(settings, handler, stop_rx));

        Self {
            stop_tx: Some(stop_tx),
        }
    }
}

impl InsertSubscription for RealtimeSubscription {
    fn unsubscribe(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
            tracing::debug!("realtime channel stop signal sent");
        }
    }
}

impl Drop for RealtimeSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

async fn run_channel(
    settings: RealtimeSettings,
    handler: SubscriptionHandler,
    mut stop_rx: watch::Receiver<bool>,
) {
    let topic = settings.topic();
    let mut joined = false;

    let report_failure = |joined: bool, error: StoreError| {
        if joined {
            handler(SubscriptionEvent::Closed(Some(error)));
        } else {
            handler(SubscriptionEvent::Ready(Err(error)));
        }
    };

    let join_deadline = time::Instant::now() + settings.join_timeout;
    let join_timed_out = || {
        tracing::warn!(
            code = REALTIME_JOIN_TIMED_OUT,
            timeout_ms = settings.join_timeout.as_millis() as u64,
            "realtime join timed out"
        );
        report_failure(false, StoreError::Unavailable(JOIN_TIMED_OUT.to_owned()));
    };

    let connected = tokio::select! {
        connected = connect_async(settings.socket_url.as_str()) => connected,
        _ = time::sleep_until(join_deadline) => {
            join_timed_out();
            return;
        }
        _ = stop_rx.changed() => return,
    };
    let socket = match connected {
        Ok((socket, _response)) => socket,
        Err(error) => {
            tracing::warn!(
                code = REALTIME_CONNECT_FAILED,
                url = %redact_url(&settings.socket_url),
                error = %error,
                "realtime connection failed"
            );
            report_failure(false, StoreError::Unavailable(error.to_string()));
            return;
        }
    };
    let (mut sink, mut stream) = socket.split();

    let join = match PhoenixFrame::join(&settings).to_ws() {
        Ok(frame) => frame,
        Err(error) => {
            report_failure(false, error);
            return;
        }
    };
    if let Err(error) = sink.send(join).await {
        report_failure(false, StoreError::Unavailable(error.to_string()));
        return;
    }

    tracing::info!(code = REALTIME_CHANNEL_STARTED, topic = %topic, "realtime channel joining");

    let mut next_ref: u64 = 2;
    let mut heartbeat = time::interval_at(
        time::Instant::now() + settings.heartbeat_interval,
        settings.heartbeat_interval,
    );

    loop {
        tokio::select! {
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    if let Ok(leave) = PhoenixFrame::leave(&topic, next_ref).to_ws() {
                        let _ = sink.send(leave).await;
                    }
                    let _ = sink.close().await;
                    tracing::info!(code = REALTIME_CHANNEL_STOPPED, topic = %topic, "realtime channel left");
                    return;
                }
            }
            _ = time::sleep_until(join_deadline), if !joined => {
                join_timed_out();
                return;
            }
            _ = heartbeat.tick() => {
                let sent = match PhoenixFrame::heartbeat(next_ref).to_ws() {
                    Ok(frame) => sink.send(frame).await.map_err(|error| StoreError::Unavailable(error.to_string())),
                    Err(error) => Err(error),
                };
                next_ref += 1;

                if let Err(error) = sent {
                    tracing::warn!(code = REALTIME_SOCKET_FAILED, error = %error, "realtime heartbeat failed");
                    report_failure(joined, error);
                    return;
                }
            }
            incoming = stream.next() => {
                let text = match incoming {
                    Some(Ok(WsMessage::Text(text))) => text,
                    Some(Ok(WsMessage::Close(_))) | None => {
                        tracing::info!(code = REALTIME_CHANNEL_STOPPED, topic = %topic, "realtime socket closed by server");
                        report_failure(joined, StoreError::Unavailable("socket closed".to_owned()));
                        return;
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(error)) => {
                        tracing::warn!(code = REALTIME_SOCKET_FAILED, error = %error, "realtime socket read failed");
                        report_failure(joined, StoreError::Unavailable(error.to_string()));
                        return;
                    }
                };

                let signal = serde_json::from_str::<PhoenixFrame>(&text)
                    .map_err(|error| StoreError::InvalidData(error.to_string()))
                    .and_then(|frame| interpret(frame, &topic));

                match signal {
                    Ok(ChannelSignal::Joined) => {
                        if !joined {
                            joined = true;
                            handler(SubscriptionEvent::Ready(Ok(())));
                        }
                    }
                    Ok(ChannelSignal::Inserted(message)) => {
                        handler(SubscriptionEvent::Inserted(message));
                    }
                    Ok(ChannelSignal::Rejected(reason)) => {
                        tracing::warn!(code = REALTIME_JOIN_REJECTED, reason = %reason, "realtime join rejected");
                        report_failure(joined, StoreError::Unavailable(format!("join rejected: {reason}")));
                        return;
                    }
                    Ok(ChannelSignal::Failed(reason)) => {
                        tracing::warn!(code = REALTIME_SOCKET_FAILED, reason = %reason, "realtime channel failed");
                        report_failure(joined, StoreError::Unavailable(reason));
                        return;
                    }
                    Ok(ChannelSignal::Closed) => {
                        report_failure(joined, StoreError::Unavailable("channel closed".to_owned()));
                        return;
                    }
                    Ok(ChannelSignal::Ignored) => {}
                    Err(error) => {
                        tracing::warn!(code = REALTIME_FRAME_INVALID, error = %error, "skipping undecodable realtime frame");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> RealtimeSettings {
        RealtimeSettings {
            socket_url: "wss://demo.supabase.co/realtime/v1/websocket?apikey=k&vsn=1.0.0"
                .to_owned(),
            access_token: "anon-key".to_owned(),
            schema: "public".to_owned(),
            table: "messages".to_owned(),
            heartbeat_interval: Duration::from_secs(25),
            join_timeout: Duration::from_secs(10),
        }
    }

    fn frame(value: Value) -> PhoenixFrame {
        serde_json::from_value(value).expect("frame must decode")
    }

    #[test]
    fn builds_socket_url_from_project_url() {
        assert_eq!(
            websocket_url("https://demo.supabase.co/", "key").unwrap(),
            "wss://demo.supabase.co/realtime/v1/websocket?apikey=key&vsn=1.0.0"
        );
        assert_eq!(
            websocket_url("http://localhost:54321", "key").unwrap(),
            "ws://localhost:54321/realtime/v1/websocket?apikey=key&vsn=1.0.0"
        );
        assert!(websocket_url("localhost", "key").is_err());
    }

    #[test]
    fn join_frame_filters_inserts_on_the_table() {
        let join = serde_json::to_value(PhoenixFrame::join(&settings())).unwrap();

        assert_eq!(join["topic"], "realtime:messages");
        assert_eq!(join["event"], "phx_join");
        assert_eq!(join["ref"], JOIN_REF);
        assert_eq!(join["payload"]["access_token"], "anon-key");
        assert_eq!(
            join["payload"]["config"]["postgres_changes"],
            json!([{"event": "INSERT", "schema": "public", "table": "messages"}])
        );
    }

    #[test]
    fn heartbeat_and_leave_frames() {
        let heartbeat = serde_json::to_value(PhoenixFrame::heartbeat(7)).unwrap();
        let leave = serde_json::to_value(PhoenixFrame::leave("realtime:messages", 8)).unwrap();

        assert_eq!(
            heartbeat,
            json!({"topic": "phoenix", "event": "heartbeat", "payload": {}, "ref": "7"})
        );
        assert_eq!(
            leave,
            json!({"topic": "realtime:messages", "event": "phx_leave", "payload": {}, "ref": "8"})
        );
    }

    #[test]
    fn join_reply_is_interpreted() {
        let ok = frame(json!({
            "topic": "realtime:messages", "event": "phx_reply", "ref": "1",
            "payload": {"status": "ok", "response": {}}
        }));
        let rejected = frame(json!({
            "topic": "realtime:messages", "event": "phx_reply", "ref": "1",
            "payload": {"status": "error", "response": {"reason": "invalid token"}}
        }));
        let heartbeat_reply = frame(json!({
            "topic": "realtime:messages", "event": "phx_reply", "ref": "5",
            "payload": {"status": "ok", "response": {}}
        }));

        assert_eq!(interpret(ok, "realtime:messages"), Ok(ChannelSignal::Joined));
        assert_eq!(
            interpret(rejected, "realtime:messages"),
            Ok(ChannelSignal::Rejected("invalid token".to_owned()))
        );
        assert_eq!(
            interpret(heartbeat_reply, "realtime:messages"),
            Ok(ChannelSignal::Ignored)
        );
    }

    #[test]
    fn insert_change_carries_the_row() {
        let change = frame(json!({
            "topic": "realtime:messages",
            "event": "postgres_changes",
            "ref": null,
            "payload": {
                "ids": [1],
                "data": {
                    "type": "INSERT",
                    "schema": "public",
                    "table": "messages",
                    "record": {
                        "id": 9,
                        "username": "Bob",
                        "content": "hello",
                        "created_at": "2026-02-14T10:00:00.000000+00:00"
                    }
                }
            }
        }));

        match interpret(change, "realtime:messages") {
            Ok(ChannelSignal::Inserted(message)) => {
                assert_eq!(message.id.as_str(), "9");
                assert_eq!(message.username, "Bob");
            }
            other => panic!("unexpected signal: {other:?}"),
        }
    }

    #[test]
    fn other_topics_and_system_errors() {
        let elsewhere = frame(json!({
            "topic": "phoenix", "event": "phx_reply", "ref": "1", "payload": {"status": "ok"}
        }));
        let system = frame(json!({
            "topic": "realtime:messages", "event": "system",
            "payload": {"status": "error", "message": "publication missing", "extension": "postgres_changes"}
        }));

        assert_eq!(interpret(elsewhere, "realtime:messages"), Ok(ChannelSignal::Ignored));
        assert_eq!(
            interpret(system, "realtime:messages"),
            Ok(ChannelSignal::Failed("publication missing".to_owned()))
        );
    }

    #[test]
    fn dropping_the_handle_is_a_stop_signal() {
        let (stop_tx, stop_rx) = watch::channel(false);
        let subscription = RealtimeSubscription {
            stop_tx: Some(stop_tx),
        };

        drop(subscription);

        assert!(*stop_rx.borrow());
    }

    fn collect_events() -> (SubscriptionHandler, std::sync::mpsc::Receiver<SubscriptionEvent>) {
        let (tx, rx) = std::sync::mpsc::channel();
        let handler: SubscriptionHandler = Box::new(move |event| {
            let _ = tx.send(event);
        });
        (handler, rx)
    }

    fn local_settings(socket_url: String) -> RealtimeSettings {
        RealtimeSettings {
            socket_url,
            join_timeout: Duration::from_millis(300),
            ..settings()
        }
    }

    fn test_runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("test runtime")
    }

    fn timed_out_join() -> SubscriptionEvent {
        SubscriptionEvent::Ready(Err(StoreError::Unavailable(JOIN_TIMED_OUT.to_owned())))
    }

    #[test]
    fn silent_handshake_reports_join_timeout() {
        // Never accepted: the TCP connect succeeds, the websocket upgrade never answers.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let address = listener.local_addr().expect("local addr");
        let (handler, events) = collect_events();
        let (_stop_tx, stop_rx) = watch::channel(false);

        test_runtime().block_on(run_channel(
            local_settings(format!("ws://{address}/realtime/v1/websocket")),
            handler,
            stop_rx,
        ));

        assert_eq!(events.try_recv(), Ok(timed_out_join()));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn unanswered_join_reports_join_timeout() {
        let runtime = test_runtime();
        let (handler, events) = collect_events();
        let (_stop_tx, stop_rx) = watch::channel(false);

        runtime.block_on(async {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind");
            let address = listener.local_addr().expect("local addr");
            tokio::spawn(async move {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let Ok(mut socket) = tokio_tungstenite::accept_async(stream).await else {
                    return;
                };
                // Reads the join and heartbeats, never replies.
                while let Some(Ok(_)) = socket.next().await {}
            });

            run_channel(
                local_settings(format!("ws://{address}/realtime/v1/websocket")),
                handler,
                stop_rx,
            )
            .await;
        });

        assert_eq!(events.try_recv(), Ok(timed_out_join()));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn stop_during_connect_reports_nothing() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let address = listener.local_addr().expect("local addr");
        let (handler, events) = collect_events();
        let (stop_tx, stop_rx) = watch::channel(false);
        stop_tx.send(true).expect("stop receiver alive");

        test_runtime().block_on(run_channel(
            local_settings(format!("ws://{address}/realtime/v1/websocket")),
            handler,
            stop_rx,
        ));

        assert!(events.try_recv().is_err());
    }
}
