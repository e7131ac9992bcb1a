use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, anyhow};
use chrono::{DateTime, Local, NaiveDateTime};
use clap::{Parser, Subcommand};
use inquire::Text;
use nowcast_core::{
    CityForecast, Config, ForecastService, ModelBundle, Observation, OpenMeteoProvider,
    train_and_save,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nowcast", version, about = "Next-hour temperature prediction")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the default city and model location.
    Configure,

    /// Generate a synthetic corpus, fit the model and save the bundle.
    Train {
        /// Number of synthetic samples.
        #[arg(long)]
        samples: Option<usize>,

        /// Random seed for data generation, the split and the forest.
        #[arg(long)]
        seed: Option<u64>,

        /// Number of trees in the forest.
        #[arg(long)]
        trees: Option<usize>,

        /// Depth limit per tree; unlimited if absent.
        #[arg(long)]
        max_depth: Option<usize>,

        /// Where to write the bundle; defaults to the configured model path.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Predict next-hour temperature for a city from live conditions.
    Predict {
        /// City name; defaults to the configured city.
        city: Option<String>,

        /// Model bundle to use instead of the configured one.
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Predict from manually entered conditions, without network access.
    Estimate {
        #[arg(long, allow_hyphen_values = true)]
        temp_c: f64,

        /// Relative humidity, percent.
        #[arg(long)]
        humidity: f64,

        #[arg(long)]
        pressure_hpa: f64,

        #[arg(long)]
        wind_kph: f64,

        /// Cloud cover, percent.
        #[arg(long)]
        cloud_pct: f64,

        /// Observation time (RFC 3339 or `YYYY-MM-DDTHH:MM`); defaults to now.
        #[arg(long)]
        at: Option<String>,

        /// Model bundle to use instead of the configured one.
        #[arg(long)]
        model: Option<PathBuf>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config)?,
            Command::Train { samples, seed, trees, max_depth, out } => {
                let mut options = config.training.to_options();
                options.num_samples = samples.unwrap_or(options.num_samples);
                options.seed = seed.unwrap_or(options.seed);
                options.n_trees = trees.unwrap_or(options.n_trees);
                options.max_depth = max_depth;

                let path = match out {
                    Some(path) => path,
                    None => config.resolved_model_path()?,
                };

                let bundle = train_and_save(&options, &path).with_context(|| {
                    format!("Training failed; nothing written to {}", path.display())
                })?;

                println!("Model trained and saved to {}", path.display());
                println!("  samples:   {}", options.num_samples);
                println!("  trees:     {}", bundle.model.n_trees());
                println!("  train MAE: {:.3} °C", bundle.metrics.train_mae);
                println!("  valid MAE: {:.3} °C", bundle.metrics.valid_mae);

                let bytes = std::fs::metadata(&path)
                    .with_context(|| format!("Failed to stat {}", path.display()))?
                    .len();
                println!("  size:      {:.1} MB", bytes as f64 / 1e6);
                if let Some(hint) = size_hint(bytes, max_depth) {
                    eprintln!("{hint}");
                }
            }
            Command::Predict { city, model } => {
                let city = city.unwrap_or_else(|| config.default_city().to_string());
                let bundle = load_bundle(&config, model)?;
                let provider = OpenMeteoProvider::with_base_urls(
                    config.geocoding_url(),
                    config.forecast_url(),
                )?;

                let service = ForecastService::new(provider, Arc::new(bundle));
                let forecast = service.predict_for_city(&city).await?;
                print_forecast(&forecast);
            }
            Command::Estimate {
                temp_c,
                humidity,
                pressure_hpa,
                wind_kph,
                cloud_pct,
                at,
                model,
            } => {
                let observation =
                    Observation { temp_c, humidity, pressure_hpa, wind_kph, cloud_pct };
                let when = match at {
                    Some(raw) => parse_when(&raw)?,
                    None => Local::now().naive_local(),
                };

                let bundle = load_bundle(&config, model)?;
                let predicted = bundle.predict(&observation, &when)?;

                println!("Conditions at {}:", when.format("%Y-%m-%d %H:%M"));
                print_observation(&observation);
                println!("Predicted temperature in one hour: {predicted:.2} °C");
            }
        }

        Ok(())
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let city = Text::new("Default city:")
        .with_default(config.default_city())
        .prompt()
        .context("Failed to read default city")?;

    let current_model = config.resolved_model_path()?;
    let model = Text::new("Model bundle path:")
        .with_default(&current_model.to_string_lossy())
        .prompt()
        .context("Failed to read model path")?;

    config.default_city = Some(city.trim().to_string());
    config.model_path = Some(PathBuf::from(model.trim()));
    config.save()?;

    println!("Configuration saved to {}", Config::config_file_path()?.display());
    Ok(())
}

/// Bundles past this size load slowly enough to be worth a hint.
const LARGE_BUNDLE_BYTES: u64 = 100_000_000;

fn size_hint(bytes: u64, max_depth: Option<usize>) -> Option<String> {
    if bytes < LARGE_BUNDLE_BYTES {
        return None;
    }
    let advice = match max_depth {
        None => "pass --max-depth (e.g. 20) or fewer --trees",
        Some(_) => "lower --max-depth or pass fewer --trees",
    };
    Some(format!(
        "Note: the bundle is {:.0} MB and will be slow to load; {advice} to shrink it.",
        bytes as f64 / 1e6
    ))
}

fn load_bundle(config: &Config, model: Option<PathBuf>) -> anyhow::Result<ModelBundle> {
    let path = match model {
        Some(path) => path,
        None => config.resolved_model_path()?,
    };
    Ok(ModelBundle::load(&path)?)
}

/// Accept RFC 3339 (converted to its own local wall time) or a naive local time.
fn parse_when(raw: &str) -> anyhow::Result<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }

    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .ok_or_else(|| {
            anyhow!("Could not parse time '{raw}'. Use RFC 3339 or YYYY-MM-DDTHH:MM.")
        })
}

fn print_observation(obs: &Observation) {
    println!("  temperature: {:.1} °C", obs.temp_c);
    println!("  humidity:    {:.0} %", obs.humidity);
    println!("  pressure:    {:.1} hPa", obs.pressure_hpa);
    println!("  wind:        {:.1} km/h", obs.wind_kph);
    println!("  cloud cover: {:.0} %", obs.cloud_pct);
}

fn print_forecast(forecast: &CityForecast) {
    println!(
        "Current weather in {} ({} local time):",
        forecast.place,
        forecast.observed_at.format("%Y-%m-%d %H:%M")
    );
    print_observation(&forecast.observation);
    println!(
        "Predicted temperature in one hour: {:.2} °C",
        forecast.predicted_temp_c_next_hour
    );
}
