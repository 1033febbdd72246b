use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use inquire::{Confirm, CustomType, Password, PasswordDisplayMode};
use tokio::sync::mpsc;
use tracing::{debug, info};
use weather_core::{
    ClientEvent, ClientState, Config, EventReceiver, Location, SensorLocationProvider, StaticSensor,
    WeatherSession, fetcher_from_config,
};

use crate::render::render_state;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Current weather for your location or any city")]
pub struct Cli {
    /// Log debug output to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key, a default location and the refresh interval.
    Configure,

    /// Show the current weather once.
    Show {
        /// Search a city by name instead of using the device location.
        #[arg(long, conflicts_with_all = ["lat", "lon"])]
        city: Option<String>,

        #[command(flatten)]
        location: LocationArgs,

        /// Also print a shareable summary.
        #[arg(long)]
        share: bool,
    },

    /// Keep showing the weather, refreshing in the background.
    Watch {
        #[command(flatten)]
        location: LocationArgs,

        /// Seconds between background refreshes; overrides the config.
        #[arg(long)]
        interval: Option<u64>,
    },
}

/// Where the "device" location comes from and how permission is answered.
#[derive(Debug, Args)]
pub struct LocationArgs {
    /// Latitude reported as the device location.
    #[arg(long, requires = "lon", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude reported as the device location.
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Grant location permission without asking.
    #[arg(long, conflicts_with = "deny_location")]
    pub allow_location: bool,

    /// Refuse location permission without asking.
    #[arg(long)]
    pub deny_location: bool,
}

impl LocationArgs {
    fn coordinates(&self) -> Result<Option<Location>> {
        let (Some(lat), Some(lon)) = (self.lat, self.lon) else {
            return Ok(None);
        };

        let location = Location::new(lat, lon);
        if !location.is_valid() {
            bail!("Coordinates out of range: {lat}, {lon}");
        }
        Ok(Some(location))
    }
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show {
                city,
                location,
                share,
            } => show(city, location, share).await,
            Command::Watch { location, interval } => watch(location, interval).await,
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .with_help_message("Leave empty to keep the stored key")
        .prompt()?;
    if !api_key.trim().is_empty() {
        config.api_key = Some(api_key.trim().to_string());
    }

    let set_location = Confirm::new("Set a default location?")
        .with_default(config.default_location.is_none())
        .with_help_message("Used as the device location when --lat/--lon are not given")
        .prompt()?;
    if set_location {
        let latitude = CustomType::<f64>::new("Latitude:")
            .with_error_message("Please type a decimal number, e.g. -34.6037")
            .prompt()?;
        let longitude = CustomType::<f64>::new("Longitude:")
            .with_error_message("Please type a decimal number, e.g. -58.3816")
            .prompt()?;

        let location = Location::new(latitude, longitude);
        if !location.is_valid() {
            bail!("Coordinates out of range: {latitude}, {longitude}");
        }
        config.default_location = Some(location);
    }

    config.refresh_interval_secs = CustomType::<u64>::new("Refresh interval (seconds):")
        .with_default(config.refresh_interval_secs)
        .with_error_message("Please type a whole number of seconds")
        .prompt()?;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());

    if !config.is_configured() {
        println!("No API key stored yet; set OPENWEATHER_API_KEY or run `weather configure` again.");
    }

    Ok(())
}

async fn show(city: Option<String>, location: LocationArgs, share: bool) -> Result<()> {
    let mut frontend = Frontend::open(&location, None)?;

    match city {
        Some(city) if city.trim().is_empty() => bail!("City name must not be empty"),
        Some(city) => frontend.session.search_city(&city).await,
        None => frontend.session.request_permission(),
    }
    frontend.pump_events().await?;

    println!("{}", render_state(&frontend.session.state()));

    if share {
        frontend.session.on_share_click();
        frontend.pump_events().await?;
    }

    frontend.session.shutdown();
    Ok(())
}

async fn watch(location: LocationArgs, interval: Option<u64>) -> Result<()> {
    let mut frontend = Frontend::open(&location, interval)?;
    let mut updates = frontend.session.subscribe();

    frontend.session.request_permission();
    frontend.pump_events().await?;
    print_state(&updates.borrow_and_update().clone());

    // Prompts are done by now; stdin belongs to the command reader from here on.
    let mut commands = spawn_stdin_reader();
    eprintln!(
        "Commands: r = refresh, / <city> = search, s = share, o = settings, q = quit (or Ctrl-C)."
    );

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                print_state(&state);
            }
            Some(event) = frontend.events.recv() => {
                handle_event(&frontend.session, &mut frontend.permission, event).await?;
            }
            Some(line) = commands.recv() => match WatchCommand::parse(&line) {
                Some(WatchCommand::Refresh) => frontend.session.refresh().await,
                Some(WatchCommand::Search(city)) => frontend.session.search_city(&city).await,
                Some(WatchCommand::Share) => frontend.session.on_share_click(),
                Some(WatchCommand::Settings) => frontend.session.on_settings_click(),
                Some(WatchCommand::Quit) => break,
                None => eprintln!("Unknown command {:?}; use r, / <city>, s, o or q.", line.trim()),
            },
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    frontend.session.shutdown();
    Ok(())
}

fn print_state(state: &ClientState) {
    println!("[{}]\n{}\n", Local::now().format("%H:%M:%S"), render_state(state));
}

/// Session plus everything needed to answer its events.
#[derive(Debug)]
struct Frontend {
    session: WeatherSession,
    events: EventReceiver,
    permission: Permission,
}

impl Frontend {
    fn open(location: &LocationArgs, interval: Option<u64>) -> Result<Self> {
        let mut config = Config::load()?.with_env_overrides();
        if let Some(secs) = interval {
            config.refresh_interval_secs = secs;
        }

        let fetcher = fetcher_from_config(&config)?;

        let fix = location.coordinates()?.or(config.default_location);
        if fix.is_none() {
            debug!("No coordinates given or configured; location will report as disabled");
        }
        let provider = SensorLocationProvider::new(Arc::new(StaticSensor::new(fix)));

        let (session, events) = WeatherSession::new(
            Arc::new(provider),
            Arc::new(fetcher),
            config.session_settings(),
        );

        Ok(Self {
            session,
            events,
            permission: Permission::from_flags(location),
        })
    }

    /// Answer every event queued so far, including ones raised while answering.
    async fn pump_events(&mut self) -> Result<()> {
        while let Ok(event) = self.events.try_recv() {
            handle_event(&self.session, &mut self.permission, event).await?;
        }
        Ok(())
    }
}

async fn handle_event(
    session: &WeatherSession,
    permission: &mut Permission,
    event: ClientEvent,
) -> Result<()> {
    debug!(?event, "Handling client event");

    match event {
        ClientEvent::RequestLocationPermission => {
            let granted = permission.resolve()?;
            session.on_permission_result(granted).await;
        }
        ClientEvent::OpenLocationSettings => {
            eprintln!(
                "Location is off. Pass --lat/--lon, or store a default location with `weather configure`."
            );
        }
        ClientEvent::OpenSettings => {
            println!("Settings file: {}", Config::config_file_path()?.display());
            println!("Edit it directly or run `weather configure`.");
        }
        ClientEvent::ShareWeather => match session.state().weather {
            Some(weather) => println!("{}", weather.share_text()),
            None => eprintln!("Nothing to share yet."),
        },
    }

    Ok(())
}

/// Answers location permission requests. The first answer is remembered.
#[derive(Debug)]
struct Permission {
    answer: Option<bool>,
}

impl Permission {
    fn from_flags(args: &LocationArgs) -> Self {
        let answer = match (args.allow_location, args.deny_location) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        Self { answer }
    }

    fn resolve(&mut self) -> Result<bool> {
        if let Some(answer) = self.answer {
            return Ok(answer);
        }

        let granted = Confirm::new("Allow weather to use your location?")
            .with_default(true)
            .prompt()
            .context("Failed to read the location permission answer")?;
        self.answer = Some(granted);
        Ok(granted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum WatchCommand {
    Refresh,
    Search(String),
    Share,
    Settings,
    Quit,
}

impl WatchCommand {
    fn parse(line: &str) -> Option<Self> {
        let line = line.trim();

        let query = line
            .strip_prefix('/')
            .or_else(|| line.strip_prefix("search "))
            .map(str::trim);
        if let Some(city) = query {
            return (!city.is_empty()).then(|| Self::Search(city.to_string()));
        }

        match line.to_ascii_lowercase().as_str() {
            "r" | "refresh" => Some(Self::Refresh),
            "s" | "share" => Some(Self::Share),
            "o" | "settings" => Some(Self::Settings),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Forward stdin lines from a plain thread; it dies with the process.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}
