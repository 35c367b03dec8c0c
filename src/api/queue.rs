//! Player queue API routes
//!
//! `POST /queue` applies one queue action to the caller's session, lets the
//! driver resolve whatever became current, and answers with the new player
//! snapshot. `POST /queue/events` is how the client's media element reports
//! back (time, duration, end of track, errors).

use actix_web::{get, post, web, HttpRequest, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{client_key, session_id, AppState};
use crate::core::queue::QueueStore;
use crate::core::session::{settle, Session};
use crate::core::{IgnoreReason, Outcome, Route, SessionSnapshot};
use crate::db::TrackTable;
use crate::error::{ApiError, ApiResult};
use crate::models::{QueuePosition, RepeatMode, Track};

const DEFAULT_MEDIA_ERROR: &str = "Playback failed. Try again or skip to the next track.";

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum QueueAction {
    Add {
        track: Track,
        #[serde(default)]
        position: QueuePosition,
    },
    Remove {
        index: usize,
    },
    Clear,
    Set {
        tracks: Vec<Track>,
        #[serde(default)]
        index: usize,
    },
    Reorder {
        from: usize,
        to: usize,
    },
    SetIndex {
        index: usize,
    },
    Next,
    Previous,
    Play,
    Pause,
    Stop,
    Toggle,
    Seek {
        time: f64,
    },
    Volume {
        volume: f32,
    },
    Repeat {
        mode: RepeatMode,
    },
    Shuffle {
        enabled: bool,
    },
    Autoplay {
        enabled: bool,
    },
    ShuffleQueue,
}

impl QueueAction {
    pub fn name(&self) -> &'static str {
        match self {
            QueueAction::Add { .. } => "add",
            QueueAction::Remove { .. } => "remove",
            QueueAction::Clear => "clear",
            QueueAction::Set { .. } => "set",
            QueueAction::Reorder { .. } => "reorder",
            QueueAction::SetIndex { .. } => "setIndex",
            QueueAction::Next => "next",
            QueueAction::Previous => "previous",
            QueueAction::Play => "play",
            QueueAction::Pause => "pause",
            QueueAction::Stop => "stop",
            QueueAction::Toggle => "toggle",
            QueueAction::Seek { .. } => "seek",
            QueueAction::Volume { .. } => "volume",
            QueueAction::Repeat { .. } => "repeat",
            QueueAction::Shuffle { .. } => "shuffle",
            QueueAction::Autoplay { .. } => "autoplay",
            QueueAction::ShuffleQueue => "shuffleQueue",
        }
    }

    /// Fill in fallbacks on client supplied tracks
    fn normalized(self) -> Self {
        match self {
            QueueAction::Add { track, position } => QueueAction::Add {
                track: track.normalized(),
                position,
            },
            QueueAction::Set { tracks, index } => QueueAction::Set {
                tracks: tracks.into_iter().map(Track::normalized).collect(),
                index,
            },
            other => other,
        }
    }

    fn tracks(&self) -> &[Track] {
        match self {
            QueueAction::Add { track, .. } => std::slice::from_ref(track),
            QueueAction::Set { tracks, .. } => tracks,
            _ => &[],
        }
    }

    fn apply(self, store: &mut QueueStore) -> Outcome {
        match self {
            QueueAction::Add { track, position } => store.add_to_queue(track, position),
            QueueAction::Remove { index } => store.remove_from_queue(index),
            QueueAction::Clear => store.clear_queue(),
            QueueAction::Set { tracks, index } => store.set_queue(tracks, index),
            QueueAction::Reorder { from, to } => store.reorder(from, to),
            QueueAction::SetIndex { index } => store.set_current_index(index),
            QueueAction::Next => store.next(),
            QueueAction::Previous => store.previous(),
            QueueAction::Play => store.play(),
            QueueAction::Pause => store.pause(),
            QueueAction::Stop => store.stop(),
            QueueAction::Toggle => store.toggle_play(),
            QueueAction::Seek { time } => store.seek(time),
            QueueAction::Volume { volume } => store.set_volume(volume),
            QueueAction::Repeat { mode } => store.set_repeat_mode(mode),
            QueueAction::Shuffle { enabled } => store.set_shuffle(enabled),
            QueueAction::Autoplay { enabled } => store.set_autoplay(enabled),
            QueueAction::ShuffleQueue => store.shuffle_queue(),
        }
    }
}

/// Feedback from the client's media element
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MediaEvent {
    TimeUpdate { time: f64 },
    DurationKnown { duration: f64 },
    Ended,
    Error { message: Option<String> },
}

impl MediaEvent {
    fn apply(self, session: &mut Session) -> Outcome {
        let driver = session.driver_mut();
        match self {
            MediaEvent::TimeUpdate { time } => driver.on_time_update(time),
            MediaEvent::DurationKnown { duration } => driver.on_duration_known(duration),
            MediaEvent::Ended => driver.on_ended(),
            MediaEvent::Error { message } => {
                driver.on_error(message.as_deref().unwrap_or(DEFAULT_MEDIA_ERROR))
            }
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    pub action: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignored: Option<IgnoreReason>,
}

fn respond(snapshot: SessionSnapshot, action: &'static str, outcome: Outcome) -> HttpResponse {
    let (message, ignored) = match outcome {
        Outcome::Applied => (format!("Queue {} completed", action), None),
        Outcome::Ignored(reason) => (reason.message().to_string(), Some(reason)),
    };
    HttpResponse::Ok().json(QueueResponse {
        snapshot,
        action,
        message,
        ignored,
    })
}

/// Current player state for the caller's session
#[get("")]
pub async fn get_queue(req: HttpRequest, state: web::Data<AppState>) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Queue, &client_key(&req))?;
    let session = state.sessions.get_or_create(&session_id(&req)).await;
    let snapshot = session.lock().await.snapshot();
    Ok(HttpResponse::Ok().json(snapshot))
}

/// Apply a queue action
#[post("")]
pub async fn update_queue(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<QueueAction>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Queue, &client_key(&req))?;
    let action = body.into_inner().normalized();
    let name = action.name();

    // queued tracks must stay resolvable through /play
    if !action.tracks().is_empty() {
        if let Err(e) = TrackTable::upsert_many(state.db.pool(), action.tracks()).await {
            warn!("Failed to cache queued tracks: {}", e);
        }
    }

    let session = state.sessions.get_or_create(&session_id(&req)).await;
    let outcome = action.apply(session.lock().await.store_mut());
    if outcome == Outcome::Ignored(IgnoreReason::IndexOutOfRange) {
        return Err(ApiError::field("index", IgnoreReason::IndexOutOfRange.message()));
    }

    settle(&session).await;
    let snapshot = session.lock().await.snapshot();
    Ok(respond(snapshot, name, outcome))
}

/// Media element feedback
#[post("/events")]
pub async fn media_event(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<MediaEvent>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Queue, &client_key(&req))?;
    let session = state.sessions.get_or_create(&session_id(&req)).await;
    let outcome = body.into_inner().apply(&mut *session.lock().await);

    settle(&session).await;
    let snapshot = session.lock().await.snapshot();
    Ok(respond(snapshot, "event", outcome))
}

#[derive(Debug, Deserialize)]
pub struct FindQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueueMatch {
    pub index: usize,
    pub track: Track,
}

/// Search within the queue
#[get("/find")]
pub async fn find_in_queue(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<FindQuery>,
) -> ApiResult<HttpResponse> {
    state.limiter.check(Route::Queue, &client_key(&req))?;
    let session = state.sessions.get_or_create(&session_id(&req)).await;
    let guard = session.lock().await;

    let matches: Vec<QueueMatch> = guard
        .driver()
        .store()
        .find(query.q.as_deref().unwrap_or_default())
        .into_iter()
        .map(|(index, track)| QueueMatch {
            index,
            track: track.clone(),
        })
        .collect();

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "total": matches.len(),
        "matches": matches,
    })))
}

/// Configure queue routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_queue)
        .service(update_queue)
        .service(media_event)
        .service(find_in_queue);
}

#[cfg(test)]
mod tests {
    use crate::api::testing::{test_app, test_state, test_state_with};
    use crate::api::SESSION_HEADER;
    use crate::config::{AppConfig, BucketConfig};
    use actix_web::test;
    use serde_json::{json, Value};

    fn deezer(sid: &str, title: &str) -> Value {
        json!({
            "source": "deezer",
            "sid": sid,
            "title": title,
            "artist": "Band",
            "url": format!("https://www.deezer.com/track/{}", sid),
        })
    }

    #[actix_web::test]
    async fn test_set_resolves_current_track() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/music/queue")
            .set_json(json!({
                "action": "set",
                "tracks": [
                    {"source": "youtube", "sid": "abc", "title": "Video", "artist": "Chan"},
                    deezer("2", "Second"),
                ],
                "index": 0
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["action"], "set");
        assert_eq!(body["message"], "Queue set completed");
        assert_eq!(body["total"], 2);
        assert_eq!(body["currentIndex"], 0);
        assert_eq!(body["isLoading"], false);
        // YouTube never streams directly: open-in notice, nothing playing
        assert_eq!(body["notice"]["kind"], "external");
        assert_eq!(body["notice"]["url"], "https://www.youtube.com/watch?v=abc");
        assert_eq!(body["isPlaying"], false);
        assert_eq!(body["media"]["source"], Value::Null);

        let req = test::TestRequest::post()
            .uri("/api/music/queue")
            .set_json(json!({"action": "play"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ignored"], "nothingLoaded");
        assert_eq!(body["isPlaying"], false);
        assert_eq!(body["media"]["playing"], false);
    }

    #[actix_web::test]
    async fn test_invalid_index_is_rejected() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/music/queue")
            .set_json(json!({"action": "add", "track": {"source": "youtube", "sid": "abc"}}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["current"]["title"], "Unknown Title");

        let req = test::TestRequest::post()
            .uri("/api/music/queue")
            .set_json(json!({"action": "remove", "index": 5}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["message"], "Invalid index");
    }

    #[actix_web::test]
    async fn test_unknown_action() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/music/queue")
            .set_json(json!({"action": "explode"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 400);
    }

    #[actix_web::test]
    async fn test_ignored_action_reports_reason() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/music/queue")
            .set_json(json!({"action": "next"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["ignored"], "emptyQueue");
        assert_eq!(body["currentIndex"], -1);
    }

    #[actix_web::test]
    async fn test_sessions_do_not_share_queues() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/music/queue")
            .insert_header((SESSION_HEADER, "one"))
            .set_json(json!({"action": "add", "track": deezer("1", "First")}))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::get()
            .uri("/api/music/queue")
            .insert_header((SESSION_HEADER, "two"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 0);

        let req = test::TestRequest::get()
            .uri("/api/music/queue/find?q=first")
            .insert_header((SESSION_HEADER, "one"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total"], 1);
        assert_eq!(body["matches"][0]["index"], 0);
    }

    #[actix_web::test]
    async fn test_media_error_keeps_position() {
        let (state, _dir) = test_state().await;
        let app = test_app!(state);

        let req = test::TestRequest::post()
            .uri("/api/music/queue")
            .set_json(json!({
                "action": "set",
                "tracks": [
                    {"source": "youtube", "sid": "a"},
                    {"source": "youtube", "sid": "b"}
                ],
                "index": 1
            }))
            .to_request();
        test::call_service(&app, req).await;

        let req = test::TestRequest::post()
            .uri("/api/music/queue/events")
            .set_json(json!({"type": "error", "message": "decode failed"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["currentIndex"], 1);
        assert_eq!(body["notice"]["kind"], "error");
        assert_eq!(body["notice"]["message"], "decode failed");
    }

    #[actix_web::test]
    async fn test_media_events_are_rate_limited() {
        let mut config = AppConfig::default();
        config.rate_limits.queue = BucketConfig::new(1.0, 0.1);
        let (state, _dir) = test_state_with(config).await;
        let app = test_app!(state);

        let event = || {
            test::TestRequest::post()
                .uri("/api/music/queue/events")
                .set_json(json!({"type": "timeUpdate", "time": 1.0}))
                .to_request()
        };
        let resp = test::call_service(&app, event()).await;
        assert_eq!(resp.status(), 200);

        let resp = test::call_service(&app, event()).await;
        assert_eq!(resp.status(), 429);
        assert_eq!(resp.headers().get("retry-after").unwrap(), "10");
    }
}
