use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::fmt::time::ChronoLocal;

use afrolearn_audio::device;
use afrolearn_core::language::SUPPORTED_LANGUAGES;
use afrolearn_core::onboarding::{Onboarding, UserSession};

mod config;
mod live;
mod narrator;
mod session;

use config::Config;

#[derive(Debug, Parser)]
#[command(name = "afrolearn", about = "Voice-enabled AI study assistant")]
struct Cli {
    /// List audio devices and exit.
    #[arg(long)]
    list_devices: bool,

    /// Input device name; the host default is used when omitted.
    #[arg(long)]
    input_device: Option<String>,

    /// Output device name; the host default is used when omitted.
    #[arg(long)]
    output_device: Option<String>,

    /// Load the canned demo session after onboarding.
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_devices {
        println!("Input devices:\n{}", device::describe_inputs()?);
        println!("Output devices:\n{}", device::describe_outputs()?);
        return Ok(());
    }

    let config = Config::from_env().context("configuration error")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(config.log_level.to_string())),
        )
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    let input_device = device::get_or_default_input(cli.input_device.as_deref())?;
    let output_device = device::get_or_default_output(cli.output_device.as_deref())?;

    let user = onboard().await?;
    session::run(config, user, input_device, output_device, cli.demo).await
}

/// Language selection gate: no way into the workspace without a choice.
async fn onboard() -> Result<UserSession> {
    let mut onboarding = Onboarding::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Welcome to AfroLearnAI");
    println!("Select your preferred language to get started:\n");
    for (i, lang) in SUPPORTED_LANGUAGES.iter().enumerate() {
        println!(
            "  {}. {} {} ({}) — \"{}\"",
            i + 1,
            lang.flag,
            lang.native_name,
            lang.name,
            lang.greeting
        );
    }

    loop {
        println!("\n{}", onboarding.continue_label());
        let Some(line) = lines.next_line().await.context("stdin closed")? else {
            anyhow::bail!("stdin closed during onboarding");
        };
        let choice = line.trim();

        if choice.is_empty() {
            // Empty line means "continue" once something is selected.
            if let Some(user) = onboarding.complete() {
                println!("{}! Let's learn.", user.language.greeting);
                return Ok(user);
            }
            continue;
        }

        let id = choice
            .parse::<usize>()
            .ok()
            .and_then(|n| SUPPORTED_LANGUAGES.get(n.wrapping_sub(1)))
            .map(|l| l.id)
            .unwrap_or(choice);
        match onboarding.select(id) {
            Some(lang) => println!("Selected {} ({}).", lang.native_name, lang.name),
            None => println!("Unknown language {choice:?}; pick a number or id."),
        }
    }
}
