use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use inquire::{CustomType, Password, PasswordDisplayMode, Select};
use weathernow_core::{
    Config, GeolocationProvider, LookupError, PositionOptions, WeatherRecord,
    location::geolocator_from_config, provider::source_from_config,
};

use crate::{card, logging, tui};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weathernow", version, about = "Current weather in your terminal")]
pub struct Cli {
    /// Default log level when RUST_LOG is not set.
    #[arg(long, global = true, default_value = "info", value_parser = logging::LEVELS)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search interactively; the shown weather refreshes every minute (default).
    Watch,

    /// Print the current weather once.
    Show {
        /// City name, e.g. "London".
        #[arg(required_unless_present = "here")]
        city: Option<String>,

        /// Use the configured geolocation instead of a city name.
        #[arg(long, conflicts_with = "city")]
        here: bool,
    },

    /// Configure the API key and geolocation.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command.unwrap_or(Command::Watch) {
            Command::Watch => {
                let _guard = logging::init_file(&Config::log_dir()?, &self.log_level)?;
                tui::run(Config::load()?).await
            }
            Command::Show { city, here } => {
                logging::init_stderr(&self.log_level);
                let config = Config::load()?;
                let record = show(&config, city, here).await?;
                print!("{}", card::render_plain(&record, &config.endpoints.icon_url));
                Ok(())
            }
            Command::Configure => {
                logging::init_stderr(&self.log_level);
                configure()
            }
        }
    }
}

async fn show(
    config: &Config,
    city: Option<String>,
    here: bool,
) -> anyhow::Result<WeatherRecord> {
    let source = source_from_config(config)?;

    let result = if here {
        let locator = geolocator_from_config(config)?;
        if locator.is_available() {
            match locator
                .current_position(&PositionOptions::from_config(config))
                .await
            {
                Ok(coords) => source.fetch_by_coords(coords).await,
                Err(err) => Err(err),
            }
        } else {
            Err(LookupError::UnsupportedCapability)
        }
    } else {
        let city = city.unwrap_or_default();
        let city = city.trim();
        if city.is_empty() {
            bail!("Nothing to look up: the city name is empty.");
        }
        source.fetch_by_city(city).await
    };

    result.map_err(|err| {
        tracing::debug!(kind = err.kind(), "lookup failed");
        anyhow::anyhow!(err)
    })
}

fn configure() -> anyhow::Result<()> {
    let path = Config::config_file_path()?;
    // The file only; environment overrides must not end up persisted.
    let mut cfg = Config::load_from(&path)?;

    let key = Password::new("OpenWeatherMap API key:")
        .with_help_message(if cfg.has_api_key() {
            "Leave empty to keep the current key"
        } else {
            "Get one at https://openweathermap.org/api"
        })
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !key.trim().is_empty() {
        cfg.api_key = Some(key.trim().to_string());
    }

    let provider = Select::new(
        "Where should \"use my location\" get coordinates from?",
        GeolocationProvider::all().to_vec(),
    )
    .prompt()
    .context("Failed to read geolocation provider")?;
    cfg.geolocation.provider = provider;

    if provider == GeolocationProvider::Fixed {
        cfg.geolocation.latitude = Some(
            CustomType::<f64>::new("Latitude:")
                .with_error_message("Please enter a decimal number, e.g. 51.5072")
                .prompt()
                .context("Failed to read latitude")?,
        );
        cfg.geolocation.longitude = Some(
            CustomType::<f64>::new("Longitude:")
                .with_error_message("Please enter a decimal number, e.g. -0.1276")
                .prompt()
                .context("Failed to read longitude")?,
        );
    }

    cfg.save_to(&path)?;
    tracing::info!(path = %path.display(), "configuration saved");
    println!("Saved configuration to {}", path.display());
    Ok(())
}
