//! Game controller: image library, rounds, scoring and the session countdown.
//!
//! The controller is plain state plus methods. The page glue forwards clicks,
//! imports and countdown ticks to it, and everything the controller wants to
//! show or schedule goes back out through [`Host`].
//!
//! Session lifecycle:
//! - `Idle -> Playing` on [`GameController::start_session`] with a non-empty library
//! - `Playing -> Playing` on each tick that leaves time on the clock
//! - `Playing -> Ended` when a tick or a penalty brings the clock to zero
//! - `Ended -> Playing` only through another `start_session`

pub mod library;
pub mod round;
pub mod store;

use crate::config::GameConfig;
use crate::error::{Error, Result};

use library::{ImageEntry, ImageSource, Library};
use round::{Round, Sampler};
use store::{KeyValueStore, LIBRARY_KEY};

pub const EMPTY_LIBRARY_HINT: &str = "Add images with the button above, or load samples.";
pub const CLEAR_PROMPT: &str = "Clear your local image library?";
pub const LOAD_FIRST_ALERT: &str = "Load images first.";

/// Everything the controller needs from the page.
pub trait Host {
    fn render(&mut self, library: &[ImageEntry]);
    fn show_hint(&mut self, hint: Option<&str>);
    /// `None` clears the target image.
    fn show_target(&mut self, url: Option<&str>);
    fn show_score(&mut self, score: u32);
    fn show_time(&mut self, seconds: u32);
    fn show_best(&mut self, best: u32);
    /// Blocking yes/no prompt.
    fn confirm(&mut self, message: &str) -> bool;
    /// Blocking notice.
    fn alert(&mut self, message: &str);
    /// Best effort; returns whether the platform accepted the pattern.
    fn vibrate(&mut self, pattern: &[u32]) -> bool;
    fn revoke_object_url(&mut self, url: &str);
    /// Arms the recurring countdown. Replaces any countdown already running.
    fn start_countdown(&mut self, period_ms: u32);
    fn stop_countdown(&mut self);
    fn now_ms(&self) -> u64;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Playing,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Session {
    pub phase: Phase,
    pub score: u32,
    pub time_remaining: u32,
}

/// Result of a tap on a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PickOutcome {
    Ignored,
    Hit { score: u32 },
    Miss { time_remaining: u32 },
}

/// How a finished session compared to the stored best.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    NewBest { score: u32 },
    Scored { score: u32, best: u32 },
}

/// Taken before an asynchronous import starts. A clear in the meantime
/// makes it stale and the import is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImportTicket {
    epoch: u64,
}

pub struct GameController<S, R, H> {
    config: GameConfig,
    store: S,
    sampler: R,
    host: H,
    library: Library,
    library_epoch: u64,
    round: Option<Round>,
    session: Session,
    best: u32,
    countdown_armed: bool,
}

impl<S, R, H> GameController<S, R, H>
where
    S: KeyValueStore,
    R: Sampler,
    H: Host,
{
    /// Shows the stored best, restores the saved library, renders it and
    /// draws the first round.
    pub fn boot(config: GameConfig, store: S, sampler: R, host: H) -> Self {
        let best = store::load_best(&store);
        let mut ctl = Self {
            config,
            store,
            sampler,
            host,
            library: Library::new(),
            library_epoch: 0,
            round: None,
            session: Session {
                phase: Phase::Idle,
                score: 0,
                time_remaining: 0,
            },
            best,
            countdown_armed: false,
        };
        ctl.host.show_best(best);
        ctl.library = ctl.load_library();
        tracing::info!(entries = ctl.library.len(), best, "game booted");
        ctl.render();
        ctl.acquire_round();
        ctl
    }

    fn load_library(&self) -> Library {
        let raw = match self.store.get(LIBRARY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Library::new(),
            Err(err) => {
                tracing::warn!("saved library unreadable: {err}");
                return Library::new();
            }
        };
        Library::restore(&raw, self.host.now_ms()).unwrap_or_else(|err| {
            tracing::warn!("discarding saved library: {err}");
            Library::new()
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn round(&self) -> Option<&Round> {
        self.round.as_ref()
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn best(&self) -> u32 {
        self.best
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn import_ticket(&self) -> ImportTicket {
        ImportTicket {
            epoch: self.library_epoch,
        }
    }

    /// Imports sources that are already converted, e.g. bundled samples.
    pub fn add_images<I>(&mut self, sources: I) -> usize
    where
        I: IntoIterator<Item = ImageSource>,
    {
        let ticket = self.import_ticket();
        self.add_imported(ticket, sources)
    }

    /// Finishes an import started with `ticket`. Returns how many entries
    /// were appended; zero when the library was cleared in the meantime.
    pub fn add_imported<I>(&mut self, ticket: ImportTicket, sources: I) -> usize
    where
        I: IntoIterator<Item = ImageSource>,
    {
        if ticket.epoch != self.library_epoch {
            tracing::info!("dropping import that raced a library clear");
            return 0;
        }
        let mut added = 0;
        for source in sources.into_iter().take(self.config.import_cap) {
            if self.library.push(ImageEntry::fresh(source.into_url())) {
                added += 1;
            }
        }
        tracing::info!(added, entries = self.library.len(), "images added");
        self.persist_library();
        self.render();
        self.acquire_round();
        added
    }

    fn persist_library(&mut self) {
        let saved = self
            .library
            .to_json(self.config.library_cap)
            .and_then(|json| self.store.set(LIBRARY_KEY, &json));
        if let Err(err) = saved {
            tracing::warn!("library not saved: {err}");
        }
    }

    /// Empties the library after the player confirms. Returns whether it did.
    pub fn clear_library(&mut self) -> bool {
        if !self.host.confirm(CLEAR_PROMPT) {
            return false;
        }
        let transient: Vec<String> = self
            .library
            .entries()
            .iter()
            .filter(|e| !e.is_embedded())
            .map(|e| e.url.clone())
            .collect();
        self.library.clear();
        self.library_epoch += 1;
        self.round = None;
        if let Err(err) = self.store.remove(LIBRARY_KEY) {
            tracing::warn!("saved library not removed: {err}");
        }
        for url in &transient {
            self.host.revoke_object_url(url);
        }
        self.host.show_target(None);
        self.render();
        tracing::info!(revoked = transient.len(), "library cleared");
        true
    }

    fn render(&mut self) {
        self.host.render(self.library.entries());
        let hint = self.library.is_empty().then_some(EMPTY_LIBRARY_HINT);
        self.host.show_hint(hint);
    }

    /// Draws a new round and shows its target. Clears the target when the
    /// library is empty.
    pub fn acquire_round(&mut self) {
        self.round = Round::draw(&self.library, self.config.round_size, &mut self.sampler);
        let url = self.round.as_ref().map(|r| r.target().url.as_str());
        self.host.show_target(url);
        if let Some(round) = &self.round {
            tracing::debug!(size = round.entries().len(), target = %round.target().id, "round drawn");
        }
    }

    pub fn start_session(&mut self) -> Result<()> {
        if self.library.is_empty() {
            self.host.alert(LOAD_FIRST_ALERT);
            return Err(Error::EmptyLibrary);
        }
        self.session = Session {
            phase: Phase::Playing,
            score: 0,
            time_remaining: self.config.session_seconds,
        };
        self.host.show_score(0);
        self.host.show_time(self.session.time_remaining);
        self.acquire_round();
        self.stop_countdown();
        self.host.start_countdown(self.config.tick_ms);
        self.countdown_armed = true;
        tracing::info!(seconds = self.session.time_remaining, "session started");
        Ok(())
    }

    fn stop_countdown(&mut self) {
        if self.countdown_armed {
            self.host.stop_countdown();
            self.countdown_armed = false;
        }
    }

    pub fn pick(&mut self, id: &str) -> PickOutcome {
        if self.session.phase != Phase::Playing {
            return PickOutcome::Ignored;
        }
        let hit = self.round.as_ref().is_some_and(|r| r.is_target(id));
        if hit {
            self.session.score += 1;
            self.host.show_score(self.session.score);
            self.acquire_round();
            let pattern = self.config.success_vibration.clone();
            self.feedback(&pattern);
            return PickOutcome::Hit {
                score: self.session.score,
            };
        }

        let remaining = self
            .session
            .time_remaining
            .saturating_sub(self.config.penalty_seconds);
        self.session.time_remaining = remaining;
        self.host.show_time(remaining);
        let pattern = self.config.failure_vibration.clone();
        self.feedback(&pattern);
        if remaining == 0 {
            self.finish();
        }
        PickOutcome::Miss {
            time_remaining: remaining,
        }
    }

    fn feedback(&mut self, pattern: &[u32]) {
        if !self.host.vibrate(pattern) {
            tracing::debug!("haptics unavailable");
        }
    }

    /// One countdown period elapsed. Returns how the session ended, if it did.
    pub fn tick(&mut self) -> Option<SessionEnd> {
        if self.session.phase != Phase::Playing {
            return None;
        }
        self.session.time_remaining = self.session.time_remaining.saturating_sub(1);
        self.host.show_time(self.session.time_remaining);
        if self.session.time_remaining == 0 {
            return Some(self.finish());
        }
        None
    }

    fn finish(&mut self) -> SessionEnd {
        self.stop_countdown();
        self.session.phase = Phase::Ended;
        let score = self.session.score;
        // Re-read so a best written by another tab is respected.
        let best = store::load_best(&self.store).max(self.best);
        let end = if score > best {
            self.best = score;
            if let Err(err) = store::save_best(&mut self.store, score) {
                tracing::warn!("best score not saved: {err}");
            }
            self.host.show_best(score);
            self.host.alert(&format!("Time! New best score: {score}"));
            SessionEnd::NewBest { score }
        } else {
            self.best = best;
            self.host.alert(&format!("Time! Score: {score}  (Best: {best})"));
            SessionEnd::Scored { score, best }
        };
        tracing::info!(score, best = self.best, "session ended");
        end
    }
}
