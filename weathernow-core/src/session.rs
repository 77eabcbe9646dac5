//! Lookup orchestration.
//!
//! A [`Session`] owns the screen state and runs as a single task. Every
//! suspension point (debounce deadline, refresh tick, fetch result,
//! geolocation result) is a branch of one `select!` loop, so state is only
//! ever touched from that task and needs no locking.
//!
//! Fetches and position requests are spawned and report back on an outcome
//! channel. They are never cancelled, and their results are applied in
//! arrival order: a slow response can land after a newer one.

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    config::Config,
    debounce::Debouncer,
    error::LookupError,
    location::{Geolocator, PositionOptions},
    model::{Coordinates, LookupTarget, RequestState, WeatherRecord},
    provider::WeatherSource,
    refresh::RefreshScheduler,
};

/// User actions fed into a running session.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// The search text changed.
    Input(String),
    UseLocation,
    Clear,
    Shutdown,
}

/// Snapshot of what the screen should show.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct View {
    pub query: String,
    pub loading: bool,
    pub error: Option<String>,
    pub weather: Option<WeatherRecord>,
    /// Target the refresh timer is bound to, if one is installed.
    pub refreshing: Option<LookupTarget>,
}

impl View {
    /// Loading wins over an error, which wins over a record.
    ///
    /// Renderers still show `error` alongside the loading banner.
    pub fn state(&self) -> RequestState {
        if self.loading {
            RequestState::Loading
        } else if let Some(message) = &self.error {
            RequestState::Error(message.clone())
        } else if let Some(record) = &self.weather {
            RequestState::Success(record.clone())
        } else {
            RequestState::Idle
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub debounce: Duration,
    pub refresh_period: Duration,
    pub position: PositionOptions,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: config.timing.debounce(),
            refresh_period: config.timing.refresh_period(),
            position: PositionOptions::from_config(config),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("lookup session has stopped")]
pub struct SessionClosed;

#[derive(Debug)]
enum Outcome {
    Fetched {
        target: LookupTarget,
        result: Result<WeatherRecord, LookupError>,
    },
    Located(Result<Coordinates, LookupError>),
}

pub struct Session {
    source: Arc<dyn WeatherSource>,
    locator: Arc<dyn Geolocator>,
    position: PositionOptions,
    debouncer: Debouncer<String>,
    refresh: RefreshScheduler,
    view: View,
    view_tx: watch::Sender<View>,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcome_rx: mpsc::UnboundedReceiver<Outcome>,
}

impl Session {
    /// Start a session on the current runtime.
    pub fn spawn(
        source: Arc<dyn WeatherSource>,
        locator: Arc<dyn Geolocator>,
        settings: SessionSettings,
    ) -> SessionHandle {
        let (commands_tx, commands_rx) = mpsc::channel(64);
        let (view_tx, view_rx) = watch::channel(View::default());
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();

        let session = Session {
            source,
            locator,
            position: settings.position,
            debouncer: Debouncer::new(String::new(), settings.debounce),
            refresh: RefreshScheduler::new(settings.refresh_period),
            view: View::default(),
            view_tx,
            outcome_tx,
            outcome_rx,
        };

        SessionHandle {
            commands: commands_tx,
            view: view_rx,
            task: tokio::spawn(session.run(commands_rx)),
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        tracing::debug!("session started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                query = self.debouncer.settled() => self.on_settled(query),
                target = self.refresh.tick() => self.begin_fetch(target),
                Some(outcome) = self.outcome_rx.recv() => self.apply(outcome),
            }
            self.publish();
        }

        self.debouncer.cancel();
        self.refresh.cancel();
        tracing::debug!("session stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Input(text) => {
                self.view.query.clone_from(&text);
                self.debouncer.push(text);
            }
            Command::UseLocation => self.locate(),
            Command::Clear => {
                // The refresh timer is left alone and may repopulate the card.
                self.view.query.clear();
                self.view.weather = None;
                self.view.error = None;
                self.debouncer.push(String::new());
            }
            Command::Shutdown => {}
        }
    }

    fn on_settled(&mut self, query: String) {
        let city = query.trim();
        if city.is_empty() {
            tracing::debug!("settled on empty query");
            return;
        }
        self.retarget(LookupTarget::city(city));
    }

    /// Fetch `target` now and every refresh period from here on.
    fn retarget(&mut self, target: LookupTarget) {
        self.begin_fetch(target.clone());
        self.refresh.reset(target);
        self.view.refreshing = self.refresh.active_target().cloned();
    }

    fn begin_fetch(&mut self, target: LookupTarget) {
        tracing::info!(%target, "fetching weather");
        self.view.loading = true;
        self.view.error = None;

        let source = Arc::clone(&self.source);
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result = source.fetch(&target).await;
            let _ = tx.send(Outcome::Fetched { target, result });
        });
    }

    fn locate(&mut self) {
        if !self.locator.is_available() {
            tracing::warn!("geolocation requested but unavailable");
            self.view.error = Some(LookupError::UnsupportedCapability.to_string());
            return;
        }

        let locator = Arc::clone(&self.locator);
        let options = self.position;
        let tx = self.outcome_tx.clone();
        tokio::spawn(async move {
            let result =
                match tokio::time::timeout(options.timeout, locator.current_position(&options))
                    .await
                {
                    Ok(result) => result,
                    Err(_) => Err(LookupError::geolocation("Location request timed out")),
                };
            let _ = tx.send(Outcome::Located(result));
        });
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Fetched { target, result } => {
                self.view.loading = false;
                match result {
                    Ok(record) => {
                        tracing::info!(%target, city = %record.city, "weather updated");
                        self.view.weather = Some(record);
                    }
                    Err(err) => {
                        tracing::warn!(%target, kind = err.kind(), error = %err, "lookup failed");
                        self.view.error = Some(err.to_string());
                        self.view.weather = None;
                    }
                }
            }
            Outcome::Located(Ok(coords)) => {
                tracing::info!(lat = coords.latitude, lon = coords.longitude, "position acquired");
                self.retarget(LookupTarget::coords(coords));
            }
            Outcome::Located(Err(err)) => {
                tracing::warn!(kind = err.kind(), error = %err, "geolocation failed");
                self.view.error = Some(err.to_string());
            }
        }
    }

    fn publish(&self) {
        self.view_tx.send_if_modified(|shown| {
            if *shown == self.view {
                false
            } else {
                *shown = self.view.clone();
                true
            }
        });
    }
}

/// Client side of a running [`Session`].
#[derive(Debug)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<View>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub async fn send(&self, command: Command) -> Result<(), SessionClosed> {
        self.commands.send(command).await.map_err(|_| SessionClosed)
    }

    pub async fn input(&self, text: impl Into<String>) -> Result<(), SessionClosed> {
        self.send(Command::Input(text.into())).await
    }

    pub async fn use_location(&self) -> Result<(), SessionClosed> {
        self.send(Command::UseLocation).await
    }

    pub async fn clear(&self) -> Result<(), SessionClosed> {
        self.send(Command::Clear).await
    }

    /// Latest published snapshot.
    pub fn view(&self) -> View {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.clone()
    }

    /// Stop the session and wait for its timers to be torn down.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown).await;
        if let Err(err) = self.task.await {
            tracing::error!(error = %err, "session task failed");
        }
    }
}
