// File: tunebot-core/tests/command_tests.rs

use std::sync::Arc;

use tunebot_common::models::{ChannelId, PlaybackEvent};
use tunebot_common::traits::FavoritesRepository;
use tunebot_core::config::PlaybackSettings;
use tunebot_core::player::SessionRegistry;
use tunebot_core::repositories::SqliteFavoritesRepository;
use tunebot_core::services::{CommandInvocation, CommandService, Reply};
use tunebot_core::test_utils::helpers::*;
use tunebot_core::{Database, Error};

const GUILD: u64 = 100;
const VOICE: u64 = 200;
const TEXT: u64 = 300;

struct Harness {
    engine: Arc<FakeEngine>,
    favorites: Arc<MemoryFavorites>,
    service: CommandService,
}

impl Harness {
    fn new() -> Self {
        let engine = FakeEngine::new();
        let favorites = MemoryFavorites::new();
        let sessions = Arc::new(SessionRegistry::new(engine.clone(), PlaybackSettings::default()));
        let service = CommandService::new(sessions, favorites.clone(), "!");
        Self { engine, favorites, service }
    }

    fn sessions(&self) -> &SessionRegistry {
        self.service.sessions()
    }

    /// Run `line` as user 1, sitting in the voice channel.
    async fn run(&self, line: &str) -> Option<Reply> {
        self.run_as(1, Some(channel(VOICE)), line).await
    }

    async fn run_as(&self, user_id: u64, voice: Option<ChannelId>, line: &str) -> Option<Reply> {
        let invocation = CommandInvocation {
            guild_id: guild(GUILD),
            channel_id: channel(TEXT),
            user_id: user(user_id),
            user_voice_channel: voice,
        };
        self.service.handle_chat_line(invocation, line).await
    }

    async fn text(&self, line: &str) -> String {
        match self.run(line).await {
            Some(Reply::Text(text)) => text,
            other => panic!("expected a text reply to {line:?}, got {other:?}"),
        }
    }

    async fn queue_titles(&self) -> Vec<String> {
        self.sessions()
            .list_queue(guild(GUILD))
            .await
            .into_iter()
            .map(|t| t.info.title)
            .collect()
    }
}

#[tokio::test]
async fn play_without_voice_channel_creates_no_session() {
    let h = Harness::new();

    let reply = h.run_as(1, None, "!play x").await;

    assert_eq!(reply, Some(Reply::text("🚨 Please join a voice channel first!")));
    assert!(h.sessions().is_empty());
    assert!(h.engine.calls().is_empty());
}

#[tokio::test]
async fn first_play_starts_and_later_plays_queue_in_order() {
    let h = Harness::new();

    let started = h.text("!play song1").await;
    assert_eq!(started, "▶️ Now playing **song1** by `song1 artist`.");
    assert_eq!(
        h.sessions().current_track(guild(GUILD)).await.map(|t| t.info.title),
        Some("song1".to_string())
    );
    assert!(h
        .engine
        .calls()
        .contains(&EngineCall::Play(guild(GUILD), "song1".to_string(), Some(30))));

    assert_eq!(h.text("!play song2").await, "🎵 Added **song2** to the queue.");
    assert_eq!(h.text("!play song3").await, "🎵 Added **song3** to the queue.");
    assert_eq!(h.queue_titles().await, vec!["song2", "song3"]);

    let connects = h
        .engine
        .calls()
        .iter()
        .filter(|c| matches!(c, EngineCall::Connect(..)))
        .count();
    assert_eq!(connects, 1);
}

#[tokio::test]
async fn skip_reports_the_old_track_and_moves_on() {
    let h = Harness::new();
    h.run("!play song1").await;
    h.run("!play song2").await;

    assert_eq!(h.text("!skip").await, "⏭️ Skipped **song1**.");
    assert_eq!(
        h.sessions().current_track(guild(GUILD)).await.map(|t| t.info.title),
        Some("song2".to_string())
    );
    assert!(h.queue_titles().await.is_empty());
}

#[tokio::test]
async fn skip_without_session_reports_nothing_playing() {
    let h = Harness::new();
    assert_eq!(h.text("!skip").await, "⚠️ No song is currently playing.");
}

#[tokio::test]
async fn empty_search_reports_no_results() {
    let h = Harness::new();
    h.engine.set_no_results("ytsearch:zzzz");

    assert_eq!(h.text("!play zzzz").await, "❌ No results found.");
}

#[tokio::test]
async fn volume_is_permissive_and_leaves_the_queue_alone() {
    let h = Harness::new();
    h.run("!play song1").await;
    h.run("!play song2").await;

    assert_eq!(h.text("!volume 150").await, "🔊 Volume set to 150%.");
    assert_eq!(h.queue_titles().await, vec!["song2"]);
    assert!(h.engine.calls().contains(&EngineCall::Volume(guild(GUILD), 150)));

    assert_eq!(h.text("!volume loud").await, "Usage: `!volume <number>`");
}

#[tokio::test]
async fn volume_without_session_reports_not_connected() {
    let h = Harness::new();
    assert_eq!(h.text("!volume 50").await, "I'm not connected to a voice channel.");
}

#[tokio::test]
async fn loop_toggles_back_and_forth() {
    let h = Harness::new();
    h.run("!play song1").await;

    assert_eq!(h.text("!loop").await, "🔄 Looping **song1**.");
    assert_eq!(h.text("!loop").await, "❌ Stopped looping **song1**.");
}

#[tokio::test]
async fn loop_without_current_track_uses_generic_text() {
    let h = Harness::new();
    h.run("!play song1").await;
    h.run("!skip").await;

    assert_eq!(h.text("!loop").await, "🔄 Looping enabled.");
    assert_eq!(h.text("!loop").await, "❌ Looping disabled.");
}

#[tokio::test]
async fn autoplay_toggles_and_needs_a_session() {
    let h = Harness::new();
    assert_eq!(h.run("!autoplay").await, Some(Reply::Silent));

    h.run("!play song1").await;
    assert_eq!(h.text("!autoplay").await, "⏹️ Autoplay disabled. Use skip to move on.");
    assert_eq!(h.text("!autoplay").await, "▶️ Autoplay enabled.");
}

#[tokio::test]
async fn shuffle_keeps_the_same_tracks() {
    let h = Harness::new();
    h.run("!play first").await;
    for name in ["a", "b", "c", "d", "e"] {
        h.run(&format!("!play {name}")).await;
    }

    assert_eq!(h.text("!shuffle").await, "🔀 Queue shuffled.");
    let mut titles = h.queue_titles().await;
    titles.sort();
    assert_eq!(titles, vec!["a", "b", "c", "d", "e"]);
}

#[tokio::test]
async fn clear_empties_the_queue() {
    let h = Harness::new();
    h.run("!play first").await;
    h.run("!play a").await;
    h.run("!play b").await;

    assert_eq!(h.text("!clear").await, "🗑️ Cleared the queue.");
    assert_eq!(h.text("!queue").await, "🎶 The queue is empty.");
}

#[tokio::test]
async fn queue_lists_tracks_with_authors() {
    let h = Harness::new();
    h.run("!play first").await;
    h.run("!play a").await;

    assert_eq!(h.text("!queue").await, "📜 **Queue:**\n**a** by `a artist`");
}

#[tokio::test]
async fn session_less_commands_stay_quiet() {
    let h = Harness::new();

    assert_eq!(h.run("!shuffle").await, Some(Reply::Silent));
    assert_eq!(h.run("!clear").await, Some(Reply::Silent));
    assert_eq!(h.run("!loop").await, Some(Reply::Silent));
    assert_eq!(h.run("!nightcore").await, Some(Reply::Silent));
    assert_eq!(h.run("!disconnect").await, Some(Reply::Silent));
    assert_eq!(h.text("!queue").await, "🎶 The queue is empty.");
}

#[tokio::test]
async fn disconnect_reacts_and_forgets_the_session() {
    let h = Harness::new();
    h.run("!play song1").await;

    assert_eq!(h.run("!disconnect").await, Some(Reply::React("✅")));
    assert!(!h.sessions().contains(guild(GUILD)));
    assert!(h.engine.calls().contains(&EngineCall::Disconnect(guild(GUILD))));
    assert_eq!(h.run("!disconnect").await, Some(Reply::Silent));
}

#[tokio::test]
async fn later_filter_replaces_the_earlier_one() {
    let h = Harness::new();
    h.run("!play song1").await;

    assert_eq!(h.run("!nightcore").await, Some(Reply::React("✅")));
    assert_eq!(h.run("!slowed").await, Some(Reply::React("✅")));

    let last_filters = h
        .engine
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            EngineCall::Filters(_, f) => Some(f),
            _ => None,
        })
        .last()
        .expect("filters were pushed");
    let timescale = last_filters.timescale.expect("timescale set");
    assert_eq!((timescale.speed, timescale.pitch, timescale.rate), (0.8, 0.9, 1.0));
    assert_eq!(h.queue_titles().await, Vec::<String>::new());
}

#[tokio::test]
async fn pause_and_resume_round_trip() {
    let h = Harness::new();
    assert_eq!(h.text("!pause").await, "I'm not connected to a voice channel.");

    h.run("!play song1").await;
    assert_eq!(h.text("!pause").await, "⏸️ Paused **song1**.");
    assert_eq!(
        h.text("!np").await,
        "🎧 Now playing **song1** by `song1 artist` (paused)"
    );

    // Paused still counts as playing, so this queues.
    assert_eq!(h.text("!play song2").await, "🎵 Added **song2** to the queue.");

    assert_eq!(h.text("!resume").await, "▶️ Resumed **song1**.");
    assert_eq!(
        h.text("!nowplaying").await,
        "🎧 Now playing **song1** by `song1 artist`\n1 more in the queue."
    );
}

#[tokio::test]
async fn voice_loss_tears_the_session_down() -> Result<(), Error> {
    let h = Harness::new();
    h.run("!play song1").await;
    h.run("!play song2").await;

    h.sessions()
        .handle_event(PlaybackEvent::VoiceClosed {
            guild_id: guild(GUILD),
            code: 4014,
            reason: "Disconnected".to_string(),
        })
        .await?;

    assert!(!h.sessions().contains(guild(GUILD)));
    assert_eq!(h.text("!queue").await, "🎶 The queue is empty.");
    assert_eq!(h.text("!volume 40").await, "I'm not connected to a voice channel.");
    Ok(())
}

#[tokio::test]
async fn resumable_voice_close_keeps_the_session() -> Result<(), Error> {
    let h = Harness::new();
    h.run("!play song1").await;

    h.sessions()
        .handle_event(PlaybackEvent::VoiceClosed {
            guild_id: guild(GUILD),
            code: 1006,
            reason: "abnormal".to_string(),
        })
        .await?;

    assert!(h.sessions().contains(guild(GUILD)));
    Ok(())
}

#[tokio::test]
async fn failed_connect_leaves_no_session() {
    let h = Harness::new();
    h.engine.fail_connect(true);

    assert_eq!(
        h.text("!play song1").await,
        "⚠️ Something went wrong while running that command."
    );
    assert!(h.sessions().is_empty());

    h.engine.fail_connect(false);
    assert_eq!(h.text("!play song1").await, "▶️ Now playing **song1** by `song1 artist`.");
}

#[tokio::test]
async fn parsing_ignores_case_and_unprefixed_lines() {
    let h = Harness::new();

    assert_eq!(h.run("play song1").await, None);
    assert_eq!(h.run("!unknown").await, None);
    assert_eq!(h.run("!").await, None);
    assert!(h.sessions().is_empty());

    assert_eq!(h.text("!PLAY song1").await, "▶️ Now playing **song1** by `song1 artist`.");
    assert_eq!(h.text("!play").await, "Usage: `!play <song name or URL>`");
}

#[tokio::test]
async fn help_lists_every_command_once() {
    let h = Harness::new();
    let text = h.text("!help").await;

    assert!(text.starts_with("🎛️ **Commands:**"));
    for name in ["play", "queue", "skip", "nowplaying", "favorite", "favorites", "nightcore", "slowed", "loop", "autoplay"] {
        assert!(text.contains(&format!("`!{name}`")), "help is missing {name}");
    }
    assert!(!text.contains("`!np`"));
}

#[tokio::test]
async fn favorite_requires_a_current_track() {
    let h = Harness::new();
    assert_eq!(h.text("!favorite").await, "⚠️ No song is currently playing.");
    assert!(h.favorites.rows().is_empty());
}

#[tokio::test]
async fn favorite_storage_failure_is_reported() {
    let h = Harness::new();
    h.run("!play song1").await;
    h.favorites.fail_writes(true);

    let reply = h.text("!favorite").await;
    assert!(reply.contains("Could not save **song1**"), "{reply}");
    assert!(h.favorites.rows().is_empty());
}

#[tokio::test]
async fn repeated_favorites_are_all_kept_in_order() -> Result<(), Error> {
    let db = Database::new("sqlite::memory:").await?;
    db.migrate().await?;
    let repo: Arc<dyn FavoritesRepository> = Arc::new(SqliteFavoritesRepository::new(db.pool().clone()));

    let engine = FakeEngine::new();
    let sessions = Arc::new(SessionRegistry::new(engine, PlaybackSettings::default()));
    let service = CommandService::new(sessions, repo.clone(), "!");
    let invocation = CommandInvocation {
        guild_id: guild(GUILD),
        channel_id: channel(TEXT),
        user_id: user(7),
        user_voice_channel: Some(channel(VOICE)),
    };

    assert_eq!(
        service.handle_chat_line(invocation, "!favorites").await,
        Some(Reply::text("❤️ You don't have any favorite songs yet."))
    );

    service.handle_chat_line(invocation, "!play song1").await;
    for _ in 0..3 {
        assert_eq!(
            service.handle_chat_line(invocation, "!favorite").await,
            Some(Reply::text("💾 Added **song1** by **song1 artist** to your favorites."))
        );
    }

    let rows = repo.list_favorites(user(7)).await?;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.song_title == "song1"));

    let line = "**song1** by `song1 artist` - [Link](https://example.com/watch?v=song1)";
    assert_eq!(
        service.handle_chat_line(invocation, "!favorites").await,
        Some(Reply::Text(format!("💾 **Your Favorites:**\n{line}\n{line}\n{line}")))
    );
    assert!(repo.list_favorites(user(8)).await?.is_empty());
    Ok(())
}
