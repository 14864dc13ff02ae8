// File: tunebot-core/tests/session_tests.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mockall::mock;

use tunebot_common::models::{ChannelId, Filters, GuildId, PlaybackEvent, Track};
use tunebot_common::traits::AudioEngine;
use tunebot_core::config::PlaybackSettings;
use tunebot_core::player::{EnqueueOutcome, PlaybackEventRouter, QueueMode, SessionRegistry};
use tunebot_core::test_utils::helpers::*;
use tunebot_core::{CommandError, Error};

mock! {
    Engine {}

    #[async_trait]
    impl AudioEngine for Engine {
        async fn load_tracks(&self, identifier: &str) -> Result<Vec<Track>, Error>;
        async fn connect(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<(), Error>;
        async fn play(&self, guild_id: GuildId, track: &Track, volume: Option<i32>) -> Result<(), Error>;
        async fn stop(&self, guild_id: GuildId) -> Result<(), Error>;
        async fn pause(&self, guild_id: GuildId, paused: bool) -> Result<(), Error>;
        async fn set_volume(&self, guild_id: GuildId, volume: i32) -> Result<(), Error>;
        async fn set_filters(&self, guild_id: GuildId, filters: &Filters) -> Result<(), Error>;
        async fn disconnect(&self, guild_id: GuildId) -> Result<(), Error>;
    }
}

fn registry(engine: Arc<FakeEngine>) -> SessionRegistry {
    SessionRegistry::new(engine, PlaybackSettings::default())
}

/// The node reporting that `title` ran to its end.
fn track_ended(guild_id: GuildId, title: &str) -> PlaybackEvent {
    PlaybackEvent::TrackEnded { guild_id, encoded: track(title).encoded, may_start_next: true }
}

fn last_play(engine: &FakeEngine) -> Option<EngineCall> {
    engine
        .calls()
        .into_iter()
        .filter(|c| matches!(c, EngineCall::Play(..)))
        .last()
}

#[tokio::test]
async fn refused_connect_leaves_nothing_behind() {
    let mut engine = MockEngine::new();
    engine
        .expect_connect()
        .times(1)
        .returning(|_, _| Err(Error::Lavalink("node unreachable".to_string())));
    engine.expect_load_tracks().never();
    engine.expect_play().never();

    let sessions = SessionRegistry::new(Arc::new(engine), PlaybackSettings::default());
    let result = sessions.enqueue_or_play(guild(1), Some(channel(2)), "anything").await;

    assert!(matches!(result, Err(Error::Lavalink(_))));
    assert!(sessions.is_empty());
}

#[tokio::test]
async fn url_queries_reach_the_engine_verbatim() {
    let mut engine = MockEngine::new();
    engine.expect_connect().times(1).returning(|_, _| Ok(()));
    engine
        .expect_load_tracks()
        .withf(|identifier| identifier == "https://example.com/watch?v=abc")
        .times(1)
        .returning(|_| Ok(vec![track("abc")]));
    engine
        .expect_play()
        .withf(|_, t, volume| t.info.title == "abc" && *volume == Some(30))
        .times(1)
        .returning(|_, _, _| Ok(()));

    let sessions = SessionRegistry::new(Arc::new(engine), PlaybackSettings::default());
    let outcome = sessions
        .enqueue_or_play(guild(1), Some(channel(2)), "https://example.com/watch?v=abc")
        .await
        .unwrap();

    assert_eq!(outcome, EnqueueOutcome::Started(track("abc")));
}

#[tokio::test]
async fn first_search_result_wins() -> Result<(), Error> {
    let engine = FakeEngine::new();
    engine.set_results("ytsearch:lofi", vec![track("lofi beats"), track("lofi rain")]);
    let sessions = registry(engine.clone());

    let outcome = sessions.enqueue_or_play(guild(1), Some(channel(2)), "lofi").await?;

    assert_eq!(outcome, EnqueueOutcome::Started(track("lofi beats")));
    assert!(sessions.list_queue(guild(1)).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_voice_channel_is_a_command_error() {
    let sessions = registry(FakeEngine::new());
    let result = sessions.join(guild(1), None).await;
    assert!(matches!(result, Err(Error::Command(CommandError::NotInVoiceChannel))));
}

#[tokio::test]
async fn finished_track_advances_fifo_then_idles() -> Result<(), Error> {
    let engine = FakeEngine::new();
    let sessions = registry(engine.clone());
    let g = guild(1);
    for name in ["one", "two", "three"] {
        sessions.enqueue_or_play(g, Some(channel(2)), name).await?;
    }

    sessions.handle_event(track_ended(g, "one")).await?;
    assert_eq!(sessions.current_track(g).await.map(|t| t.info.title), Some("two".into()));
    assert_eq!(last_play(&engine), Some(EngineCall::Play(g, "two".into(), None)));

    sessions.handle_event(track_ended(g, "two")).await?;
    assert_eq!(sessions.current_track(g).await.map(|t| t.info.title), Some("three".into()));

    sessions.handle_event(track_ended(g, "three")).await?;
    assert_eq!(sessions.current_track(g).await, None);
    assert!(sessions.contains(g));

    // Idle again, so the next request starts right away.
    let outcome = sessions.enqueue_or_play(g, Some(channel(2)), "four").await?;
    assert!(matches!(outcome, EnqueueOutcome::Started(_)));
    Ok(())
}

#[tokio::test]
async fn loop_one_replays_the_same_track() -> Result<(), Error> {
    let engine = FakeEngine::new();
    let sessions = registry(engine.clone());
    let g = guild(1);
    sessions.enqueue_or_play(g, Some(channel(2)), "one").await?;
    sessions.enqueue_or_play(g, Some(channel(2)), "two").await?;

    let toggle = sessions.toggle_loop(g).await.expect("session exists");
    assert_eq!(toggle.mode, QueueMode::LoopOne);

    sessions.handle_event(track_ended(g, "one")).await?;
    sessions.handle_event(track_ended(g, "one")).await?;

    assert_eq!(sessions.current_track(g).await.map(|t| t.info.title), Some("one".into()));
    assert_eq!(last_play(&engine), Some(EngineCall::Play(g, "one".into(), None)));
    assert_eq!(sessions.list_queue(g).await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn finished_track_goes_idle_with_autoplay_off() -> Result<(), Error> {
    let engine = FakeEngine::new();
    let sessions = registry(engine.clone());
    let g = guild(1);
    sessions.enqueue_or_play(g, Some(channel(2)), "one").await?;
    sessions.enqueue_or_play(g, Some(channel(2)), "two").await?;
    assert_eq!(sessions.toggle_autoplay(g).await, Some(false));

    sessions.handle_event(track_ended(g, "one")).await?;

    assert_eq!(sessions.current_track(g).await, None);
    assert_eq!(sessions.list_queue(g).await.len(), 1);
    assert_eq!(last_play(&engine), Some(EngineCall::Play(g, "one".into(), Some(30))));
    Ok(())
}

#[tokio::test]
async fn replaced_or_stopped_tracks_do_not_advance() -> Result<(), Error> {
    let engine = FakeEngine::new();
    let sessions = registry(engine.clone());
    let g = guild(1);
    sessions.enqueue_or_play(g, Some(channel(2)), "one").await?;
    sessions.enqueue_or_play(g, Some(channel(2)), "two").await?;

    sessions
        .handle_event(PlaybackEvent::TrackEnded { guild_id: g, encoded: track("one").encoded, may_start_next: false })
        .await?;

    assert_eq!(sessions.current_track(g).await.map(|t| t.info.title), Some("one".into()));
    assert_eq!(sessions.list_queue(g).await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn events_for_unknown_guilds_are_ignored() -> Result<(), Error> {
    let engine = FakeEngine::new();
    let sessions = registry(engine.clone());

    sessions.handle_event(track_ended(guild(9), "one")).await?;
    sessions
        .handle_event(PlaybackEvent::VoiceClosed { guild_id: guild(9), code: 4014, reason: String::new() })
        .await?;
    sessions
        .handle_event(PlaybackEvent::TrackFailed { guild_id: guild(9), message: "boom".into() })
        .await?;

    assert!(engine.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn every_start_from_idle_uses_the_default_volume() -> Result<(), Error> {
    let engine = FakeEngine::new();
    let sessions = registry(engine.clone());
    let g = guild(1);
    sessions.enqueue_or_play(g, Some(channel(2)), "one").await?;
    sessions.set_volume(g, 150).await?;
    assert!(engine.calls().contains(&EngineCall::Volume(g, 150)));
    sessions.skip(g).await?;

    sessions.enqueue_or_play(g, Some(channel(2)), "two").await?;
    assert_eq!(last_play(&engine), Some(EngineCall::Play(g, "two".into(), Some(30))));
    Ok(())
}

#[tokio::test]
async fn late_end_of_a_skipped_track_is_ignored() -> Result<(), Error> {
    let engine = FakeEngine::new();
    let sessions = registry(engine.clone());
    let g = guild(1);
    for name in ["a", "b", "c"] {
        sessions.enqueue_or_play(g, Some(channel(2)), name).await?;
    }

    sessions.skip(g).await?;
    // "a" finishing raced the skip; the report lands after "b" started.
    sessions.handle_event(track_ended(g, "a")).await?;

    assert_eq!(sessions.current_track(g).await.map(|t| t.info.title), Some("b".into()));
    let queued: Vec<String> = sessions.list_queue(g).await.into_iter().map(|t| t.info.title).collect();
    assert_eq!(queued, vec!["c".to_string()]);
    Ok(())
}

#[tokio::test]
async fn routed_events_for_a_guild_are_handled_in_arrival_order() -> Result<(), Error> {
    let engine = FakeEngine::new();
    let sessions = Arc::new(registry(engine.clone()));
    let g = guild(1);
    for name in ["a", "b", "c"] {
        sessions.enqueue_or_play(g, Some(channel(2)), name).await?;
    }

    let mut router = PlaybackEventRouter::new(sessions.clone());
    router.dispatch(track_ended(g, "a"));
    router.dispatch(track_ended(g, "b"));

    // Out of order, the end of "b" would be stale and playback would stop at "b".
    let reached_c = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            if sessions.current_track(g).await.map(|t| t.info.title).as_deref() == Some("c") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(reached_c.is_ok(), "playback never reached the third track");
    assert!(sessions.list_queue(g).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_plays_in_one_guild_connect_once() -> Result<(), Error> {
    let engine = FakeEngine::new();
    let sessions = Arc::new(registry(engine.clone()));
    let g = guild(1);

    let mut tasks = Vec::new();
    for name in ["a", "b", "c", "d"] {
        let sessions = sessions.clone();
        tasks.push(tokio::spawn(async move {
            sessions.enqueue_or_play(g, Some(channel(2)), name).await
        }));
    }
    let mut started = 0;
    for task in tasks {
        if let EnqueueOutcome::Started(_) = task.await.expect("task panicked")? {
            started += 1;
        }
    }

    assert_eq!(started, 1);
    assert_eq!(sessions.list_queue(g).await.len(), 3);
    let connects = engine.calls().iter().filter(|c| matches!(c, EngineCall::Connect(..))).count();
    assert_eq!(connects, 1);
    Ok(())
}
