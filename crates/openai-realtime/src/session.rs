//! WebSocket session runtime for the OpenAI Realtime API.

use crate::{
    audio,
    conversation::Conversation,
    events::{ClientEvent, ClientItem, ServerEvent},
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use realtime_voice_core::{
    agent::RealtimeAgent,
    api_key::ApiKey,
    assembler::SessionPlan,
    options::{AudioSink, SessionMode},
    session::{EventStream, RealtimeSession, SessionError, SessionEvent, SessionFactory},
    tools::Tool,
    transport::TransportKind,
};
use std::sync::Arc;
use tokio::{
    net::TcpStream,
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{client::IntoClientRequest, http::HeaderValue, protocol::Message as WsMessage},
};
use tracing::{debug, error, info, warn};

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;

/// Builds [`WsSession`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsSessionFactory;

impl SessionFactory for WsSessionFactory {
    fn create(&self, plan: SessionPlan) -> Box<dyn RealtimeSession> {
        Box::new(WsSession::new(plan))
    }
}

pub struct WsSession {
    plan: SessionPlan,
    events_tx: Option<mpsc::UnboundedSender<SessionEvent>>,
    events_rx: Option<EventStream>,
    writer: Option<Arc<Mutex<WsWriter>>>,
    reader: Option<JoinHandle<()>>,
}

impl WsSession {
    pub fn new(plan: SessionPlan) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            plan,
            events_tx: Some(events_tx),
            events_rx: Some(events_rx),
            writer: None,
            reader: None,
        }
    }

    fn writer(&self) -> Result<&Arc<Mutex<WsWriter>>, SessionError> {
        self.writer.as_ref().ok_or(SessionError::Closed)
    }
}

async fn send_event(writer: &Mutex<WsWriter>, event: &ClientEvent<'_>) -> Result<(), SessionError> {
    let json = serde_json::to_string(event).map_err(|e| SessionError::Protocol(e.to_string()))?;
    writer
        .lock()
        .await
        .send(WsMessage::Text(json.into()))
        .await
        .map_err(|e| SessionError::Transport(e.to_string()))
}

#[async_trait]
impl RealtimeSession for WsSession {
    fn take_events(&mut self) -> Option<EventStream> {
        self.events_rx.take()
    }

    async fn connect(&mut self, api_key: &ApiKey) -> Result<(), SessionError> {
        if self.plan.transport.kind == TransportKind::WebRtc {
            return Err(SessionError::Negotiation(
                "WebRTC peer negotiation is not available in this runtime".to_string(),
            ));
        }
        let Some(events_tx) = self.events_tx.take() else {
            return Err(SessionError::Closed);
        };

        let mut request = self
            .plan
            .transport
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        let bearer = HeaderValue::from_str(&api_key.bearer())
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        request.headers_mut().insert("Authorization", bearer);

        let (ws_stream, _) = connect_async(request)
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;
        let (writer, mut reader) = ws_stream.split();
        let writer = Arc::new(Mutex::new(writer));
        info!(
            endpoint = %self.plan.transport.endpoint,
            agent = %self.plan.agent.name,
            "Connected to OpenAI Realtime API."
        );

        send_event(
            &writer,
            &ClientEvent::SessionUpdate {
                session: &self.plan.config,
            },
        )
        .await?;

        let mut router = EventRouter::new(
            events_tx,
            self.plan.transport.audio_sink.clone(),
            self.plan.agent.clone(),
        );
        let task_writer = writer.clone();
        self.reader = Some(tokio::spawn(async move {
            while let Some(msg) = reader.next().await {
                match msg {
                    Ok(WsMessage::Text(text)) => {
                        let event = match serde_json::from_str::<ServerEvent>(&text) {
                            Ok(event) => event,
                            Err(e) => {
                                debug!(error = %e, "Ignoring unparseable server event");
                                continue;
                            }
                        };
                        if let Some(call) = router.route(event) {
                            tokio::spawn(run_tool_call(call, task_writer.clone()));
                        }
                    }
                    Ok(WsMessage::Close(frame)) => {
                        info!(?frame, "Realtime socket closed by server");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "Realtime socket error");
                        router.report(e.to_string());
                        break;
                    }
                }
            }
        }));
        self.writer = Some(writer);
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), SessionError> {
        let writer = self.writer()?;
        send_event(
            writer,
            &ClientEvent::ConversationItemCreate {
                item: ClientItem::user_text(text),
            },
        )
        .await?;
        if self.plan.mode == SessionMode::Conversation {
            send_event(writer, &ClientEvent::ResponseCreate).await?;
        }
        Ok(())
    }

    async fn send_audio(&self, pcm16: &[u8]) -> Result<(), SessionError> {
        let writer = self.writer()?;
        if pcm16.len() < 2 {
            return Ok(());
        }
        send_event(
            writer,
            &ClientEvent::InputAudioBufferAppend {
                audio: audio::encode_pcm16(pcm16),
            },
        )
        .await
    }

    async fn interrupt(&self) -> Result<(), SessionError> {
        send_event(self.writer()?, &ClientEvent::ResponseCancel).await
    }

    async fn close(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        if let Some(writer) = self.writer.take() {
            let mut writer = writer.lock().await;
            if let Err(e) = writer.send(WsMessage::Close(None)).await {
                debug!(error = %e, "Close frame not delivered");
            }
        }
        self.events_tx = None;
        info!("Realtime session closed");
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
    }
}

/// A function call the model asked for.
#[derive(Clone)]
pub(crate) struct ToolCall {
    pub call_id: String,
    pub arguments: String,
    pub tool: Option<Arc<dyn Tool>>,
    pub name: String,
}

/// Runs a tool and feeds its output back so the model can continue the response.
async fn run_tool_call(call: ToolCall, writer: Arc<Mutex<WsWriter>>) {
    let output = execute_tool(&call).await;
    let item = ClientEvent::ConversationItemCreate {
        item: ClientItem::FunctionCallOutput {
            call_id: call.call_id,
            output,
        },
    };
    if let Err(e) = send_event(&writer, &item).await {
        warn!(error = %e, "Failed to send function call output");
        return;
    }
    if let Err(e) = send_event(&writer, &ClientEvent::ResponseCreate).await {
        warn!(error = %e, "Failed to request follow-up response");
    }
}

pub(crate) async fn execute_tool(call: &ToolCall) -> String {
    let Some(tool) = call.tool.as_ref() else {
        warn!(name = %call.name, "Model called an unknown tool");
        return serde_json::json!({ "error": format!("Unknown tool: {}", call.name) }).to_string();
    };
    let arguments = match serde_json::from_str(&call.arguments) {
        Ok(arguments) => arguments,
        Err(e) => {
            return serde_json::json!({ "error": format!("Invalid arguments: {e}") }).to_string();
        }
    };
    info!(name = %call.name, "Invoking tool");
    match tool.invoke(arguments).await {
        Ok(output) => output,
        Err(e) => {
            error!(name = %call.name, error = %e, "Tool invocation failed");
            serde_json::json!({ "error": e.to_string() }).to_string()
        }
    }
}

/// Applies server events to the local conversation and fans them out.
pub(crate) struct EventRouter {
    conversation: Conversation,
    events: mpsc::UnboundedSender<SessionEvent>,
    audio_sink: Option<Arc<dyn AudioSink>>,
    agent: RealtimeAgent,
}

impl EventRouter {
    pub fn new(
        events: mpsc::UnboundedSender<SessionEvent>,
        audio_sink: Option<Arc<dyn AudioSink>>,
        agent: RealtimeAgent,
    ) -> Self {
        Self {
            conversation: Conversation::default(),
            events,
            audio_sink,
            agent,
        }
    }

    fn publish(&self) {
        // receiver gone means the session was released
        let _ = self
            .events
            .send(SessionEvent::HistoryUpdated(self.conversation.snapshot()));
    }

    pub fn report(&self, message: String) {
        let _ = self.events.send(SessionEvent::Error(message));
    }

    /// Returns a tool call to run when the event asks for one.
    pub fn route(&mut self, event: ServerEvent) -> Option<ToolCall> {
        match event {
            ServerEvent::Error { error } => {
                warn!(code = ?error.code, kind = ?error.kind, "Realtime API error: {}", error.message);
                self.report(error.message);
            }
            ServerEvent::ItemAdded {
                item,
                previous_item_id,
            } => {
                self.conversation.upsert(item, previous_item_id.as_deref());
                self.publish();
            }
            ServerEvent::ItemDone { item } => {
                self.conversation.upsert(item, None);
                self.publish();
            }
            ServerEvent::ItemDeleted { item_id } => {
                if self.conversation.remove(&item_id) {
                    self.publish();
                }
            }
            ServerEvent::InputTranscriptionCompleted {
                item_id,
                content_index,
                transcript,
            }
            | ServerEvent::OutputTranscriptDone {
                item_id,
                content_index,
                transcript,
            } => {
                if self
                    .conversation
                    .set_transcript(&item_id, content_index, transcript)
                {
                    self.publish();
                } else {
                    debug!(%item_id, "Transcript for unknown item");
                }
            }
            ServerEvent::InputTranscriptionFailed { item_id, error } => {
                warn!(%item_id, "Input transcription failed: {}", error.message);
                self.report(format!("Transcription failed: {}", error.message));
            }
            ServerEvent::OutputAudioDelta { delta } => {
                if let (Some(sink), Some(pcm)) =
                    (self.audio_sink.as_ref(), audio::decode_pcm16_delta(&delta))
                {
                    sink.play(&pcm);
                }
            }
            ServerEvent::FunctionCallArgumentsDone {
                call_id,
                name,
                arguments,
            } => {
                let name = name
                    .or_else(|| self.conversation.function_name(&call_id).map(str::to_string))
                    .unwrap_or_default();
                let tool = self.agent.tool(&name);
                return Some(ToolCall {
                    call_id,
                    arguments,
                    tool,
                    name,
                });
            }
            ServerEvent::Other => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use std::sync::Mutex as StdMutex;

    struct RecordingSink(StdMutex<Vec<u8>>);

    impl AudioSink for RecordingSink {
        fn play(&self, pcm16: &[u8]) {
            self.0.lock().unwrap().extend_from_slice(pcm16);
        }
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes the query"
        }
        fn parameters(&self) -> Value {
            json!({ "type": "object" })
        }
        async fn invoke(&self, arguments: Value) -> anyhow::Result<String> {
            match arguments["query"].as_str() {
                Some(q) => Ok(q.to_string()),
                None => anyhow::bail!("missing query"),
            }
        }
    }

    fn event(value: Value) -> ServerEvent {
        serde_json::from_value(value).unwrap()
    }

    fn agent(tools: Vec<Arc<dyn Tool>>) -> RealtimeAgent {
        RealtimeAgent {
            name: "TestAgent".into(),
            instructions: None,
            voice: None,
            tools,
        }
    }

    fn router() -> (EventRouter, EventStream) {
        let (tx, rx) = mpsc::unbounded_channel();
        (EventRouter::new(tx, None, agent(vec![Arc::new(EchoTool)])), rx)
    }

    fn last_snapshot(rx: &mut EventStream) -> Vec<realtime_voice_core::history::HistoryItem> {
        let mut last = None;
        while let Ok(ev) = rx.try_recv() {
            if let SessionEvent::HistoryUpdated(items) = ev {
                last = Some(items);
            }
        }
        last.expect("no history snapshot")
    }

    #[test]
    fn test_transcript_flows_into_snapshot() {
        let (mut router, mut rx) = router();
        router.route(event(json!({
            "type": "conversation.item.added",
            "item": { "id": "item_1", "type": "message", "role": "user",
                      "content": [{ "type": "input_audio", "transcript": null }] }
        })));
        router.route(event(json!({
            "type": "conversation.item.input_audio_transcription.completed",
            "item_id": "item_1", "content_index": 0, "transcript": "こんにちは"
        })));

        let snap = last_snapshot(&mut rx);
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].parts()[0].transcript.as_deref(), Some("こんにちは"));
    }

    #[test]
    fn test_error_events_are_reported() {
        let (mut router, mut rx) = router();
        router.route(event(json!({
            "type": "error", "error": { "message": "rate limited" }
        })));
        assert_eq!(rx.try_recv().unwrap(), SessionEvent::Error("rate limited".into()));
    }

    #[test]
    fn test_audio_delta_reaches_sink() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let sink = Arc::new(RecordingSink(StdMutex::new(Vec::new())));
        let mut router = EventRouter::new(tx, Some(sink.clone()), agent(Vec::new()));
        // [0x01, 0x02, 0x03, 0x04]
        router.route(event(json!({ "type": "response.output_audio.delta", "delta": "AQIDBA==" })));
        assert_eq!(*sink.0.lock().unwrap(), vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_function_call_resolves_tool_by_item_name() {
        let (mut router, _rx) = router();
        router.route(event(json!({
            "type": "conversation.item.added",
            "item": { "id": "fc_1", "type": "function_call", "call_id": "call_1", "name": "echo" }
        })));
        let call = router
            .route(event(json!({
                "type": "response.function_call_arguments.done",
                "call_id": "call_1", "arguments": "{\"query\":\"weather\"}"
            })))
            .unwrap();
        assert_eq!(call.name, "echo");
        assert_eq!(execute_tool(&call).await, "weather");
    }

    #[tokio::test]
    async fn test_tool_failures_become_error_output() {
        let (mut router, _rx) = router();
        let unknown = router
            .route(event(json!({
                "type": "response.function_call_arguments.done",
                "call_id": "c", "name": "nope", "arguments": "{}"
            })))
            .unwrap();
        let out: Value = serde_json::from_str(&execute_tool(&unknown).await).unwrap();
        assert_eq!(out["error"], "Unknown tool: nope");

        let bad_args = router
            .route(event(json!({
                "type": "response.function_call_arguments.done",
                "call_id": "c", "name": "echo", "arguments": "not json"
            })))
            .unwrap();
        let out: Value = serde_json::from_str(&execute_tool(&bad_args).await).unwrap();
        assert!(out["error"].as_str().unwrap().starts_with("Invalid arguments"));

        let failing = router
            .route(event(json!({
                "type": "response.function_call_arguments.done",
                "call_id": "c", "name": "echo", "arguments": "{}"
            })))
            .unwrap();
        let out: Value = serde_json::from_str(&execute_tool(&failing).await).unwrap();
        assert_eq!(out["error"], "missing query");
    }

    #[tokio::test]
    async fn test_webrtc_plan_fails_negotiation() {
        use realtime_voice_core::{
            assembler::{AssemblerSettings, assemble_with_transport},
            options::ConnectionOptions,
        };

        let options = ConnectionOptions::new("sk-abcdefghijklmnopqrstuvwx", SessionMode::Transcription);
        let key = options.validated_key().unwrap();
        let plan = assemble_with_transport(
            &options,
            &key,
            TransportKind::WebRtc,
            &AssemblerSettings::default(),
        );
        let mut session = WsSessionFactory.create(plan);
        let err = session.connect(&key).await.unwrap_err();
        assert!(err.is_negotiation_failure());
        assert_eq!(session.send_text("hi").await, Err(SessionError::Closed));
        assert_eq!(session.send_audio(&[0, 0]).await, Err(SessionError::Closed));
        assert_eq!(session.interrupt().await, Err(SessionError::Closed));
    }

    #[test]
    fn test_spoken_input_becomes_chat_message() {
        use realtime_voice_core::history::{HistoryNormalizer, Role};

        let (mut router, mut rx) = router();
        let mut history = HistoryNormalizer::new();
        router.route(event(json!({
            "type": "conversation.item.added",
            "item": { "id": "item_7", "type": "message", "role": "user", "status": "in_progress",
                      "content": [{ "type": "input_audio", "transcript": null }] }
        })));
        router.route(event(json!({
            "type": "conversation.item.done",
            "item": { "id": "item_7", "type": "message", "role": "user", "status": "completed",
                      "content": [{ "type": "input_audio", "transcript": null }] }
        })));
        assert!(history.ingest(&last_snapshot(&mut rx)).is_empty());

        router.route(event(json!({
            "type": "conversation.item.input_audio_transcription.completed",
            "item_id": "item_7", "content_index": 0, "transcript": "今日は晴れです"
        })));
        let fresh = history.ingest(&last_snapshot(&mut rx));
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].role, Role::User);
        assert_eq!(fresh[0].text, "今日は晴れです");
    }

    #[tokio::test]
    async fn test_session_writes_client_events_to_socket() {
        use realtime_voice_core::{
            assembler::{AssemblerSettings, assemble},
            options::ConnectionOptions,
            transport::ApiBase,
        };
        use tokio::net::TcpListener;
        use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let seen = Arc::new(StdMutex::new(None));
            let seen_in_handshake = seen.clone();
            let mut ws = tokio_tungstenite::accept_hdr_async(stream, move |req: &Request, resp: Response| {
                let auth = req
                    .headers()
                    .get("Authorization")
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                *seen_in_handshake.lock().unwrap() = Some((req.uri().to_string(), auth));
                Ok(resp)
            })
            .await
            .unwrap();

            let mut received = Vec::new();
            while let Some(Ok(msg)) = ws.next().await {
                match msg {
                    WsMessage::Text(text) => {
                        received.push(serde_json::from_str::<Value>(&text).unwrap())
                    }
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
            let handshake = seen.lock().unwrap().take();
            (handshake, received)
        });

        let key = "sk-abcdefghijklmnopqrstuvwx";
        let options = ConnectionOptions::new(key, SessionMode::Transcription);
        let api_key = options.validated_key().unwrap();
        let settings = AssemblerSettings {
            api_base: ApiBase::parse(&format!("http://{addr}/v1")).unwrap(),
            ..AssemblerSettings::default()
        };
        let mut session = WsSessionFactory.create(assemble(&options, &api_key, &settings));
        let _events = session.take_events();

        session.connect(&api_key).await.unwrap();
        session.send_audio(&[]).await.unwrap();
        session.send_audio(&[1, 2, 3, 4, 5]).await.unwrap();
        session.send_text("hello").await.unwrap();
        session.interrupt().await.unwrap();
        session.close().await;

        let (handshake, received) = server.await.unwrap();
        let (uri, auth) = handshake.unwrap();
        assert_eq!(uri, "/v1/realtime?model=gpt-realtime");
        assert_eq!(auth.as_deref(), Some("Bearer sk-abcdefghijklmnopqrstuvwx"));

        let types: Vec<&str> = received.iter().map(|e| e["type"].as_str().unwrap()).collect();
        assert_eq!(
            types,
            vec![
                "session.update",
                "input_audio_buffer.append",
                "conversation.item.create",
                "response.cancel",
            ]
        );
        assert_eq!(received[0]["session"]["audio"]["input"]["transcription"]["language"], "ja");
        assert_eq!(received[1]["audio"], "AQIDBA==");
    }
}
