// File: tunebot-core/src/lavalink/client.rs

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::{Mutex, RwLock};
use reqwest::Response;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, trace, warn};
use twilight_model::id::Id;

use tunebot_common::models::{GuildId, PlaybackEvent, UserId};

use crate::config::LavalinkConfig;
use crate::lavalink::models::{IncomingMessage, LoadResult, NodeEvent, UpdatePlayer, UpdateSession};
use crate::Error;

type NodeSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

const READY_TIMEOUT: Duration = Duration::from_secs(10);
/// How long the node keeps our players after the websocket drops.
const RESUME_TIMEOUT_SECS: u64 = 60;
/// Discord's "session no longer valid" voice close code.
const SESSION_NO_LONGER_VALID: u16 = 4006;

/// Delay between reconnect attempts: doubles from one second up to a minute.
#[derive(Debug)]
pub(crate) struct Backoff {
    next: Duration,
}

impl Backoff {
    const INITIAL: Duration = Duration::from_secs(1);
    const MAX: Duration = Duration::from_secs(60);

    pub(crate) fn new() -> Self {
        Self { next: Self::INITIAL }
    }

    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(Self::MAX);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.next = Self::INITIAL;
    }
}

/// REST + websocket connection to a single Lavalink v4 node.
pub struct LavalinkClient {
    http: reqwest::Client,
    config: LavalinkConfig,
    session_id: RwLock<Option<String>>,
    /// Guilds we created a player for on the current node session.
    players: Mutex<HashSet<GuildId>>,
}

impl LavalinkClient {
    pub fn new(config: LavalinkConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            session_id: RwLock::new(None),
            players: Mutex::new(HashSet::new()),
        }
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}{}", self.config.uri.trim_end_matches('/'), path)
    }

    fn websocket_url(&self) -> Result<url::Url, Error> {
        let mut url = url::Url::parse(&self.config.uri)?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|_| Error::Config(format!("cannot derive websocket url from {}", self.config.uri)))?;
        url.set_path("/v4/websocket");
        Ok(url)
    }

    fn session_id(&self) -> Result<String, Error> {
        self.session_id
            .read()
            .clone()
            .ok_or_else(|| Error::Lavalink("no session with the node (websocket not ready)".to_string()))
    }

    /// Open the websocket and wait for `ready`. A failure here is returned to
    /// the caller; once connected, the background task reads player events
    /// into `events` and reconnects on its own whenever the socket drops.
    pub async fn connect(
        self: &Arc<Self>,
        user_id: UserId,
        events: UnboundedSender<PlaybackEvent>,
    ) -> Result<JoinHandle<()>, Error> {
        let (socket, _) = self.open(user_id, None).await?;
        let client = Arc::clone(self);
        Ok(tokio::spawn(async move {
            client.run(socket, user_id, events).await;
        }))
    }

    async fn run(self: Arc<Self>, mut socket: NodeSocket, user_id: UserId, events: UnboundedSender<PlaybackEvent>) {
        let mut backoff = Backoff::new();
        loop {
            if !self.read_loop(socket, &events).await {
                return;
            }
            let previous = self.session_id.write().take();

            socket = loop {
                let delay = backoff.next_delay();
                warn!("Reconnecting to Lavalink in {delay:?}");
                sleep(delay).await;
                match self.open(user_id, previous.as_deref()).await {
                    Ok((socket, resumed)) => {
                        backoff.reset();
                        if !resumed {
                            for event in self.lost_players() {
                                if events.send(event).is_err() {
                                    return;
                                }
                            }
                        }
                        break socket;
                    }
                    Err(e) => error!("Lavalink reconnect failed: {e}"),
                }
            };
        }
    }

    /// Connect, wait for `ready` and ask the node to hold our players across
    /// a dropped socket. Returns the socket and whether `resume` was honoured.
    async fn open(&self, user_id: UserId, resume: Option<&str>) -> Result<(NodeSocket, bool), Error> {
        let url = self.websocket_url()?;
        let mut request = url.as_str().into_client_request()?;
        let headers = request.headers_mut();
        headers.insert("Authorization", header_value(&self.config.password)?);
        headers.insert("User-Id", header_value(&user_id.to_string())?);
        headers.insert("Client-Name", header_value(&self.config.client_name)?);
        if let Some(previous) = resume {
            headers.insert("Session-Id", header_value(previous)?);
        }

        info!("Connecting to Lavalink at {url}");
        let (mut socket, _) = tokio_tungstenite::connect_async(request).await?;

        let (session_id, resumed) = tokio::time::timeout(READY_TIMEOUT, wait_for_ready(&mut socket)).await??;
        info!("Lavalink session ready (id={session_id}, resumed={resumed})");
        *self.session_id.write() = Some(session_id.clone());

        if let Err(e) = self.enable_resuming(&session_id).await {
            warn!("Lavalink refused to enable resuming: {e}");
        }
        Ok((socket, resumed))
    }

    async fn enable_resuming(&self, session_id: &str) -> Result<(), Error> {
        let body = UpdateSession { resuming: true, timeout: RESUME_TIMEOUT_SECS };
        let resp = self
            .http
            .patch(self.rest_url(&format!("/v4/sessions/{session_id}")))
            .header("Authorization", &self.config.password)
            .json(&body)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// Forward events until the socket ends. Returns false once nobody is
    /// listening for events any more.
    async fn read_loop(&self, mut socket: NodeSocket, events: &UnboundedSender<PlaybackEvent>) -> bool {
        while let Some(item) = socket.next().await {
            match item {
                Ok(Message::Text(text)) => match serde_json::from_str::<IncomingMessage>(text.as_str()) {
                    Ok(msg) => {
                        if let Some(event) = translate(msg) {
                            if events.send(event).is_err() {
                                debug!("Playback event receiver dropped; stopping Lavalink reader");
                                return false;
                            }
                        }
                    }
                    Err(e) => warn!("Unreadable Lavalink message: {e}"),
                },
                Ok(Message::Close(frame)) => {
                    warn!("Lavalink closed the websocket: {frame:?}");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!("Lavalink websocket error: {e}");
                    break;
                }
            }
        }
        warn!("Lavalink websocket loop ended");
        true
    }

    /// The node came back without our old session: every player we had is
    /// gone, so report each guild's voice connection as closed.
    fn lost_players(&self) -> Vec<PlaybackEvent> {
        self.players
            .lock()
            .drain()
            .map(|guild_id| PlaybackEvent::VoiceClosed {
                guild_id,
                code: SESSION_NO_LONGER_VALID,
                reason: "audio node session was not resumed".to_string(),
            })
            .collect()
    }

    pub async fn load_tracks(&self, identifier: &str) -> Result<LoadResult, Error> {
        let resp = self
            .http
            .get(self.rest_url("/v4/loadtracks"))
            .header("Authorization", &self.config.password)
            .query(&[("identifier", identifier)])
            .send()
            .await?;
        Ok(check(resp).await?.json::<LoadResult>().await?)
    }

    pub async fn update_player(&self, guild_id: GuildId, update: &UpdatePlayer) -> Result<(), Error> {
        let session_id = self.session_id()?;
        trace!("PATCH player {guild_id}: {update:?}");
        let resp = self
            .http
            .patch(self.rest_url(&format!("/v4/sessions/{session_id}/players/{guild_id}")))
            .header("Authorization", &self.config.password)
            .query(&[("noReplace", "false")])
            .json(update)
            .send()
            .await?;
        check(resp).await?;
        self.players.lock().insert(guild_id);
        Ok(())
    }

    pub async fn destroy_player(&self, guild_id: GuildId) -> Result<(), Error> {
        self.players.lock().remove(&guild_id);
        let session_id = self.session_id()?;
        let resp = self
            .http
            .delete(self.rest_url(&format!("/v4/sessions/{session_id}/players/{guild_id}")))
            .header("Authorization", &self.config.password)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

fn header_value(value: &str) -> Result<HeaderValue, Error> {
    HeaderValue::from_str(value).map_err(|e| Error::Config(format!("invalid Lavalink header value: {e}")))
}

async fn check(resp: Response) -> Result<Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(Error::Lavalink(format!("{status}: {body}")))
}

async fn wait_for_ready(socket: &mut NodeSocket) -> Result<(String, bool), Error> {
    while let Some(item) = socket.next().await {
        if let Message::Text(text) = item? {
            if let Ok(IncomingMessage::Ready { session_id, resumed }) =
                serde_json::from_str::<IncomingMessage>(text.as_str())
            {
                return Ok((session_id, resumed));
            }
        }
    }
    Err(Error::Lavalink("websocket closed before ready".to_string()))
}

fn parse_guild(raw: &str) -> Option<GuildId> {
    raw.parse::<u64>().ok().and_then(Id::new_checked)
}

/// Map a node message onto what the session layer cares about.
pub fn translate(msg: IncomingMessage) -> Option<PlaybackEvent> {
    let event = match msg {
        IncomingMessage::Event(event) => event,
        IncomingMessage::PlayerUpdate { guild_id, state } => {
            trace!("playerUpdate {guild_id}: position={} connected={}", state.position, state.connected);
            return None;
        }
        IncomingMessage::Ready { .. } | IncomingMessage::Stats {} => return None,
    };

    match event {
        NodeEvent::TrackStart { guild_id, track } => {
            debug!("Track started in {guild_id}: {}", track.info.title);
            None
        }
        NodeEvent::TrackEnd { guild_id, track, reason } => Some(PlaybackEvent::TrackEnded {
            guild_id: parse_guild(&guild_id)?,
            encoded: track.encoded,
            may_start_next: reason.may_start_next(),
        }),
        NodeEvent::TrackException { guild_id, exception, .. } => Some(PlaybackEvent::TrackFailed {
            guild_id: parse_guild(&guild_id)?,
            message: exception.message.unwrap_or(exception.cause),
        }),
        NodeEvent::TrackStuck { guild_id, threshold_ms } => Some(PlaybackEvent::TrackFailed {
            guild_id: parse_guild(&guild_id)?,
            message: format!("track stuck for {threshold_ms}ms"),
        }),
        NodeEvent::WebSocketClosed { guild_id, code, reason, by_remote } => {
            debug!("Voice socket closed in {guild_id} (by_remote={by_remote})");
            Some(PlaybackEvent::VoiceClosed {
                guild_id: parse_guild(&guild_id)?,
                code,
                reason,
            })
        }
        NodeEvent::Unknown => None,
    }
}
