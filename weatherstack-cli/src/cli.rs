use std::{path::PathBuf, time::Duration};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use weatherstack_core::{
    Config, Credential, CurrentWeatherApi, Outcome, Suite, SuiteReport, WeatherRequest,
    WeatherstackClient,
};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weatherstack", version, about = "Weatherstack API conformance checker")]
pub struct Cli {
    /// Credential file, `{"api_key": "..."}`. Defaults to the configured path or `api_key.json`.
    #[arg(long, global = true)]
    pub credentials: Option<PathBuf>,

    /// Upstream base URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full conformance suite against the current-weather endpoint.
    Run {
        /// Delay before each rate-limited call, in milliseconds.
        #[arg(long)]
        delay_ms: Option<u64>,
    },

    /// Send a single current-weather request and print the raw response.
    Current {
        /// City, postal code, "lat,lon", IP address or `fetch:ip`.
        query: String,

        #[arg(long)]
        language: Option<String>,

        #[arg(long)]
        units: Option<String>,
    },

    /// Store the access key in the credential file.
    Configure,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let mut config = Config::load()?;
        if let Some(path) = self.credentials {
            config.credentials_path = Some(path);
        }
        if let Some(url) = self.base_url {
            config.base_url = Some(url);
        }

        match self.command {
            Command::Run { delay_ms } => {
                if let Some(ms) = delay_ms {
                    config.pacing_ms = Some(ms);
                }
                run_suite(&config).await
            }
            Command::Current { query, language, units } => {
                let request = WeatherRequest { query, language, units };
                show_current(&config, &request).await
            }
            Command::Configure => configure(&config),
        }
    }
}

async fn run_suite(config: &Config) -> anyhow::Result<()> {
    let path = config.credentials_path();
    let credential = Credential::load(&path)?;
    if credential.is_none() {
        eprintln!(
            "Credential file {} not found; every case will be skipped.\n\
             Hint: run `weatherstack configure` first.",
            path.display()
        );
    }

    let client = WeatherstackClient::from_config(config)?;
    let report = Suite::new(client, credential).with_pacing(config.pacing()).run().await;

    print_report(&report);

    if !report.is_success() {
        bail!("{} conformance case(s) failed", report.failed());
    }
    Ok(())
}

fn print_report(report: &SuiteReport) {
    for case in &report.cases {
        match &case.outcome {
            Outcome::Passed => println!("PASS  {}", case.id),
            Outcome::Failed(message) => println!("FAIL  {}\n      {message}", case.id),
            Outcome::Skipped(reason) => println!("SKIP  {} ({reason})", case.id),
        }
    }

    let elapsed = report.duration().to_std().unwrap_or(Duration::ZERO);
    println!(
        "\n{} passed, {} failed, {} skipped in {:.1}s (started {})",
        report.passed(),
        report.failed(),
        report.skipped(),
        elapsed.as_secs_f64(),
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
    );
}

async fn show_current(config: &Config, request: &WeatherRequest) -> anyhow::Result<()> {
    let path = config.credentials_path();
    let credential = Credential::load(&path)?.with_context(|| {
        format!(
            "No access key found at {}.\n\
             Hint: run `weatherstack configure` and enter your access key.",
            path.display()
        )
    })?;

    let client = WeatherstackClient::from_config(config)?;
    let response = client.current(&credential.api_key, request).await?;

    println!("HTTP {}", response.status);
    println!("{}", serde_json::to_string_pretty(&response.body)?);

    if !response.classify().is_ok_and(|parsed| parsed.is_success()) {
        eprintln!("warning: response is not a success payload");
    }
    Ok(())
}

fn configure(config: &Config) -> anyhow::Result<()> {
    let path = config.credentials_path();

    let api_key = inquire::Password::new("weatherstack access key:")
        .without_confirmation()
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read access key")?;

    let api_key = api_key.trim();
    if api_key.is_empty() {
        bail!("Access key must not be empty");
    }

    Credential::new(api_key).save(&path)?;
    println!("Saved access key to {}", path.display());
    Ok(())
}
