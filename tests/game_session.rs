// Native integration tests for the game controller.
// A recording host stands in for the page so sessions, penalties and the
// countdown can be driven tick by tick.

use scab_picker::game::store::{BEST_SCORE_KEY, LIBRARY_KEY};
use scab_picker::game::{CLEAR_PROMPT, EMPTY_LIBRARY_HINT, LOAD_FIRST_ALERT};
use scab_picker::{
    Error, GameConfig, GameController, Host, ImageEntry, ImageSource, KeyValueStore, MemoryStore,
    Phase, PickOutcome, RandomSampler, SessionEnd,
};

#[derive(Default)]
struct RecordingHost {
    accept_confirm: bool,
    prompts: Vec<String>,
    alerts: Vec<String>,
    vibrations: Vec<Vec<u32>>,
    renders: usize,
    hint: Option<String>,
    target: Option<String>,
    score: Option<u32>,
    time: Option<u32>,
    best: Option<u32>,
    revoked: Vec<String>,
    countdown_starts: u32,
    countdown_stops: u32,
    countdown_running: bool,
}

impl Host for RecordingHost {
    fn render(&mut self, _library: &[ImageEntry]) {
        self.renders += 1;
    }

    fn show_hint(&mut self, hint: Option<&str>) {
        self.hint = hint.map(str::to_string);
    }

    fn show_target(&mut self, url: Option<&str>) {
        self.target = url.map(str::to_string);
    }

    fn show_score(&mut self, score: u32) {
        self.score = Some(score);
    }

    fn show_time(&mut self, seconds: u32) {
        self.time = Some(seconds);
    }

    fn show_best(&mut self, best: u32) {
        self.best = Some(best);
    }

    fn confirm(&mut self, message: &str) -> bool {
        self.prompts.push(message.to_string());
        self.accept_confirm
    }

    fn alert(&mut self, message: &str) {
        self.alerts.push(message.to_string());
    }

    fn vibrate(&mut self, pattern: &[u32]) -> bool {
        self.vibrations.push(pattern.to_vec());
        true
    }

    fn revoke_object_url(&mut self, url: &str) {
        self.revoked.push(url.to_string());
    }

    fn start_countdown(&mut self, _period_ms: u32) {
        assert!(!self.countdown_running, "countdown stacked");
        self.countdown_starts += 1;
        self.countdown_running = true;
    }

    fn stop_countdown(&mut self) {
        self.countdown_stops += 1;
        self.countdown_running = false;
    }

    fn now_ms(&self) -> u64 {
        1_700_000_000_000
    }
}

type TestGame = GameController<MemoryStore, RandomSampler, RecordingHost>;

fn data_url(n: usize) -> String {
    format!("data:image/png;base64,IMG{n}")
}

fn saved_library(ids: &[&str]) -> String {
    let entries: Vec<String> = ids
        .iter()
        .enumerate()
        .map(|(i, id)| format!(r#"{{"url":"{}","id":"{id}"}}"#, data_url(i)))
        .collect();
    format!("[{}]", entries.join(","))
}

fn boot_with(store: MemoryStore, config: GameConfig) -> TestGame {
    let host = RecordingHost {
        accept_confirm: true,
        ..Default::default()
    };
    GameController::boot(config, store, RandomSampler::seeded(42), host)
}

fn boot_abc() -> TestGame {
    let store = MemoryStore::new().with(LIBRARY_KEY, &saved_library(&["a", "b", "c"]));
    boot_with(store, GameConfig::default())
}

fn target_id(game: &TestGame) -> String {
    game.round().expect("round").target().id.clone()
}

fn non_target_id(game: &TestGame) -> String {
    let round = game.round().expect("round");
    game.library()
        .entries()
        .iter()
        .find(|e| !round.is_target(&e.id))
        .expect("library has a non-target")
        .id
        .clone()
}

#[test]
fn boot_restores_library_and_shows_best() {
    let store = MemoryStore::new()
        .with(LIBRARY_KEY, &saved_library(&["a", "b"]))
        .with(BEST_SCORE_KEY, "7");
    let game = boot_with(store, GameConfig::default());
    assert_eq!(game.library().len(), 2);
    assert_eq!(game.host().best, Some(7));
    assert_eq!(game.host().hint, None);
    assert!(game.host().target.is_some());
    assert_eq!(game.session().phase, Phase::Idle);
}

#[test]
fn corrupt_saved_library_boots_empty() {
    let store = MemoryStore::new().with(LIBRARY_KEY, "{{{");
    let game = boot_with(store, GameConfig::default());
    assert!(game.library().is_empty());
    assert!(game.round().is_none());
    assert_eq!(game.host().target, None);
    assert_eq!(game.host().hint.as_deref(), Some(EMPTY_LIBRARY_HINT));
}

#[test]
fn start_without_images_alerts_and_stays_idle() {
    let mut game = boot_with(MemoryStore::new(), GameConfig::default());
    let result = game.start_session();
    assert!(matches!(result, Err(Error::EmptyLibrary)));
    assert_eq!(game.host().alerts, vec![LOAD_FIRST_ALERT.to_string()]);
    assert_eq!(game.session().phase, Phase::Idle);
    assert_eq!(game.host().countdown_starts, 0);
}

#[test]
fn start_resets_state_and_arms_one_countdown() {
    let mut game = boot_abc();
    game.start_session().unwrap();
    let session = game.session();
    assert_eq!(session.phase, Phase::Playing);
    assert_eq!(session.score, 0);
    assert_eq!(session.time_remaining, 60);
    assert_eq!(game.host().score, Some(0));
    assert_eq!(game.host().time, Some(60));
    assert_eq!(game.host().countdown_starts, 1);

    // Restarting replaces the countdown instead of stacking a second one.
    game.tick();
    game.start_session().unwrap();
    assert_eq!(game.host().countdown_stops, 1);
    assert_eq!(game.host().countdown_starts, 2);
    assert_eq!(game.session().time_remaining, 60);
}

#[test]
fn picking_the_target_scores_and_draws_again() {
    let mut game = boot_abc();
    game.start_session().unwrap();
    let target = target_id(&game);

    assert_eq!(game.pick(&target), PickOutcome::Hit { score: 1 });
    assert_eq!(game.session().score, 1);
    assert_eq!(game.session().time_remaining, 60);
    assert_eq!(game.host().score, Some(1));
    assert_eq!(game.host().vibrations, vec![vec![30]]);
    let round = game.round().unwrap();
    assert_eq!(round.entries().len(), 3);
    assert!(round.entries().iter().any(|e| e.id == round.target().id));
}

#[test]
fn picking_a_wrong_image_costs_two_seconds() {
    let mut game = boot_abc();
    game.start_session().unwrap();
    let wrong = non_target_id(&game);
    let target_before = target_id(&game);

    assert_eq!(game.pick(&wrong), PickOutcome::Miss { time_remaining: 58 });
    assert_eq!(game.session().score, 0);
    assert_eq!(game.host().time, Some(58));
    assert_eq!(game.host().vibrations, vec![vec![40, 40, 40]]);
    // A miss keeps the same round.
    assert_eq!(target_id(&game), target_before);
}

#[test]
fn picks_outside_a_session_are_ignored() {
    let mut game = boot_abc();
    let target = target_id(&game);
    assert_eq!(game.pick(&target), PickOutcome::Ignored);
    assert!(game.host().vibrations.is_empty());
    assert_eq!(game.session().score, 0);
}

#[test]
fn sixty_idle_ticks_end_the_session_once() {
    let mut game = boot_abc();
    game.start_session().unwrap();
    let mut ends = Vec::new();
    for _ in 0..60 {
        if let Some(end) = game.tick() {
            ends.push(end);
        }
    }
    assert_eq!(ends, vec![SessionEnd::Scored { score: 0, best: 0 }]);
    assert_eq!(game.session().phase, Phase::Ended);
    assert_eq!(game.host().time, Some(0));
    assert_eq!(game.host().alerts, vec!["Time! Score: 0  (Best: 0)".to_string()]);
    assert_eq!(game.host().countdown_stops, 1);

    // Stray ticks after the end change nothing.
    assert_eq!(game.tick(), None);
    assert_eq!(game.host().alerts.len(), 1);
    assert_eq!(game.store().get(BEST_SCORE_KEY).unwrap(), None);
    let target = target_id(&game);
    assert_eq!(game.pick(&target), PickOutcome::Ignored);
}

fn play_session(game: &mut TestGame, hits: u32) -> SessionEnd {
    game.start_session().unwrap();
    for _ in 0..hits {
        let target = target_id(game);
        game.pick(&target);
    }
    loop {
        if let Some(end) = game.tick() {
            return end;
        }
    }
}

#[test]
fn best_score_never_decreases() {
    let mut game = boot_abc();
    assert_eq!(play_session(&mut game, 3), SessionEnd::NewBest { score: 3 });
    assert_eq!(game.host().alerts.last().unwrap(), "Time! New best score: 3");
    assert_eq!(game.host().best, Some(3));

    assert_eq!(play_session(&mut game, 1), SessionEnd::Scored { score: 1, best: 3 });
    assert_eq!(game.host().alerts.last().unwrap(), "Time! Score: 1  (Best: 3)");

    assert_eq!(play_session(&mut game, 5), SessionEnd::NewBest { score: 5 });
    assert_eq!(game.best(), 5);
    assert_eq!(game.store().get(BEST_SCORE_KEY).unwrap().as_deref(), Some("5"));
}

#[test]
fn stored_best_from_an_earlier_visit_is_respected() {
    let store = MemoryStore::new()
        .with(LIBRARY_KEY, &saved_library(&["a", "b", "c"]))
        .with(BEST_SCORE_KEY, "10");
    let mut game = boot_with(store, GameConfig::default());
    assert_eq!(play_session(&mut game, 2), SessionEnd::Scored { score: 2, best: 10 });
    assert_eq!(game.store().get(BEST_SCORE_KEY).unwrap().as_deref(), Some("10"));
}

#[test]
fn penalty_to_zero_ends_the_session_immediately() {
    let config = GameConfig {
        session_seconds: 3,
        ..GameConfig::default()
    };
    let store = MemoryStore::new().with(LIBRARY_KEY, &saved_library(&["a", "b", "c"]));
    let mut game = boot_with(store, config);
    game.start_session().unwrap();

    let wrong = non_target_id(&game);
    assert_eq!(game.pick(&wrong), PickOutcome::Miss { time_remaining: 1 });
    assert_eq!(game.session().phase, Phase::Playing);
    let wrong = non_target_id(&game);
    assert_eq!(game.pick(&wrong), PickOutcome::Miss { time_remaining: 0 });
    assert_eq!(game.session().phase, Phase::Ended);
    assert_eq!(game.host().time, Some(0));
    assert_eq!(game.host().alerts.len(), 1);
    assert!(!game.host().countdown_running);

    assert_eq!(game.tick(), None);
    assert_eq!(game.host().alerts.len(), 1);
}

#[test]
fn import_is_capped_and_only_data_urls_are_saved() {
    let mut game = boot_with(MemoryStore::new(), GameConfig::default());
    let mut sources: Vec<ImageSource> = vec![ImageSource::ObjectUrl("blob:https://game/1".into())];
    sources.extend((0..80).map(|n| ImageSource::DataUrl(data_url(n))));

    assert_eq!(game.add_images(sources), 60);
    assert_eq!(game.library().len(), 60);
    assert_eq!(game.round().unwrap().entries().len(), 9);

    let more = (100..130).map(|n| ImageSource::DataUrl(data_url(n)));
    assert_eq!(game.add_images(more), 30);
    assert_eq!(game.library().len(), 90);

    let saved = game.store().get(LIBRARY_KEY).unwrap().unwrap();
    let saved: Vec<serde_json::Value> = serde_json::from_str(&saved).unwrap();
    assert_eq!(saved.len(), 60);
    assert!(saved.iter().all(|e| e["url"].as_str().unwrap().starts_with("data:")));
    assert!(saved.iter().all(|e| e["id"].is_string()));
}

#[test]
fn empty_import_is_harmless() {
    let mut game = boot_with(MemoryStore::new(), GameConfig::default());
    assert_eq!(game.add_images(Vec::new()), 0);
    assert!(game.library().is_empty());
    assert_eq!(game.host().target, None);
}

#[test]
fn encoded_bytes_become_embedded_entries() {
    let mut game = boot_with(MemoryStore::new(), GameConfig::default());
    game.add_images([ImageSource::Encoded {
        mime: "image/png".into(),
        bytes: vec![0x89, 0x50, 0x4e, 0x47],
    }]);
    let entry = &game.library().entries()[0];
    assert_eq!(entry.url, "data:image/png;base64,iVBORw==");
    assert_eq!(game.host().target.as_deref(), Some(entry.url.as_str()));
}

#[test]
fn declined_clear_changes_nothing() {
    let mut game = boot_abc();
    game.host_mut().accept_confirm = false;
    assert!(!game.clear_library());
    assert_eq!(game.host().prompts, vec![CLEAR_PROMPT.to_string()]);
    assert_eq!(game.library().len(), 3);
    assert!(game.store().get(LIBRARY_KEY).unwrap().is_some());
}

#[test]
fn confirmed_clear_empties_everything() {
    let mut game = boot_abc();
    game.add_images([ImageSource::ObjectUrl("blob:https://game/xyz".into())]);
    assert!(game.clear_library());
    assert!(game.library().is_empty());
    assert!(game.round().is_none());
    assert_eq!(game.store().get(LIBRARY_KEY).unwrap(), None);
    assert_eq!(game.host().revoked, vec!["blob:https://game/xyz".to_string()]);
    assert_eq!(game.host().target, None);
    assert_eq!(game.host().hint.as_deref(), Some(EMPTY_LIBRARY_HINT));
}

#[test]
fn import_racing_a_clear_is_dropped() {
    let mut game = boot_abc();
    let ticket = game.import_ticket();
    assert!(game.clear_library());
    let added = game.add_imported(ticket, [ImageSource::DataUrl(data_url(9))]);
    assert_eq!(added, 0);
    assert!(game.library().is_empty());

    let fresh = game.import_ticket();
    assert_eq!(game.add_imported(fresh, [ImageSource::DataUrl(data_url(9))]), 1);
}
