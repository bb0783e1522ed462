//! clima: command-line driver for clima-weather
//!
//! Usage examples
//! --------------
//!
//! - Weather for a city by name
//!   $ clima city "Belo Horizonte"
//!
//! - Weather at coordinates (comma decimals accepted)
//!   $ clima coords -- -23,55 -46,63
//!
//! - Municipality suggestions
//!   $ clima suggest jeti
//!
//! - No command: the default location (São Paulo)
//!   $ clima
//!
//! The OpenWeatherMap key is read from `OPENWEATHER_API_KEY` or the config file.
mod args;

use std::process::ExitCode;

use clap::Parser;
use clima_core::{App, AppError, ConfigError, TemperatureUnit};
use clima_weather::{suggest, SearchOutcome, WeatherReport, WeatherSession};

use crate::args::{CliArgs, Commands};

/// Shown when no location is given (Praça da Sé, São Paulo).
const DEFAULT_LATITUDE: f64 = -23.533773;
const DEFAULT_LONGITUDE: f64 = -46.625290;
const DEFAULT_LABEL: &str = "São Paulo - SP";

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> Result<ExitCode, AppError> {
    clima_core::init()?;

    let mut app = App::new(args.config.as_deref())
        .map_err(|e| ConfigError::Invalid(format!("{:#}", e)))?;
    for warning in app.warnings() {
        tracing::warn!("Config warning: {}", warning);
    }

    let session = WeatherSession::from_config(app.config())?;
    let unit = app.config().weather.temperature_unit;

    let code = match args.command {
        Some(Commands::Suggest { query }) => {
            let index = session.locality_index().await;
            if !index.is_available() {
                eprintln!("{}", index.placeholder());
                return Ok(ExitCode::FAILURE);
            }
            for entry in suggest::filter(&query, index.entries()) {
                match &entry.state_abbreviation {
                    Some(uf) => println!("{} - {}", entry.display_name, uf),
                    None => println!("{}", entry.display_name),
                }
            }
            ExitCode::SUCCESS
        }

        Some(Commands::City { name, raw: true }) => {
            let report = session.provider().fetch_by_name(&name).await?;
            print_report(&report, unit, args.json)?;
            ExitCode::SUCCESS
        }

        Some(Commands::City { name, raw: false }) => {
            let outcome = session.search_by_name(&name).await;
            finish(&session, outcome, unit, args.json)?
        }

        Some(Commands::Coords { lat, lon, label }) => {
            let outcome = session
                .search_by_coordinates(lat, lon, label.as_deref())
                .await;
            finish(&session, outcome, unit, args.json)?
        }

        None => {
            let outcome = session
                .search_by_coordinates(DEFAULT_LATITUDE, DEFAULT_LONGITUDE, Some(DEFAULT_LABEL))
                .await;
            finish(&session, outcome, unit, args.json)?
        }
    };

    app.shutdown()?;
    Ok(code)
}

/// Print the applied report, or the session's error slot on failure.
fn finish(
    session: &WeatherSession,
    outcome: SearchOutcome,
    unit: TemperatureUnit,
    json: bool,
) -> Result<ExitCode, AppError> {
    let snapshot = session.snapshot();
    let report = match (outcome, &snapshot.report) {
        (SearchOutcome::Applied, Some(report)) => report,
        _ => {
            eprintln!(
                "{}",
                snapshot.error.as_deref().unwrap_or("Search did not complete")
            );
            return Ok(ExitCode::FAILURE);
        }
    };

    if json {
        let out = serde_json::to_string_pretty(&snapshot).map_err(anyhow::Error::from)?;
        println!("{}", out);
        return Ok(ExitCode::SUCCESS);
    }
    print_report(report, unit, false)?;
    Ok(ExitCode::SUCCESS)
}

fn print_report(report: &WeatherReport, unit: TemperatureUnit, json: bool) -> Result<(), AppError> {
    if json {
        let out = serde_json::to_string_pretty(report).map_err(anyhow::Error::from)?;
        println!("{}", out);
        return Ok(());
    }

    let symbol = match unit {
        TemperatureUnit::Fahrenheit => "°F",
        TemperatureUnit::Auto | TemperatureUnit::Celsius => "°C",
    };
    let current = &report.current;
    println!("{}", current.place_name());
    if let Some(summary) = current.summary() {
        println!("  {} ({})", summary.description, summary.condition().description());
    }
    println!(
        "  {:.0}{} (feels like {:.0}{}), min {:.0}{} / max {:.0}{}",
        current.main.temp,
        symbol,
        current.main.feels_like,
        symbol,
        current.main.temp_min,
        symbol,
        current.main.temp_max,
        symbol
    );
    println!("  Humidity: {:.0}%", current.main.humidity);
    if let Some(wind) = &current.wind {
        println!("  Wind: {:.1} ({:.0}°)", wind.speed, wind.deg);
    }

    let outlook = report.forecast.daily_outlook();
    if !outlook.is_empty() {
        println!();
        for day in outlook {
            println!(
                "  {}  {:>4.0}{} {:>4.0}{}  {:>3}%  {}",
                day.date.format("%a %d/%m"),
                day.low,
                symbol,
                day.high,
                symbol,
                day.precipitation_chance,
                day.description
            );
        }
    }
    Ok(())
}
