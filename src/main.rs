use anyhow::Context;
use clap::{Arg, ArgMatches, Command};
use std::process;
use std::time::Duration;
use textcheck::config::{config_or_default, load_config, startup_log_level, AppConfig};
use textcheck::consent::{ConsentDecision, ConsentPrompt, ConsentPrompter};
use textcheck::orchestrator::{CheckCause, CheckOrchestrator, OrchestratorOptions};
use textcheck::server::attribution;
use textcheck::service::LanguageToolClient;
use textcheck::settings::{JsonFileSettingsStore, SettingsStore};
use textcheck::transport::StaticPageTransport;
use textcheck::usage;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Asks on the terminal, or accepts right away with `--yes`.
struct TerminalPrompter {
    assume_yes: bool,
}

impl ConsentPrompter for TerminalPrompter {
    async fn ask(&self, prompt: &ConsentPrompt) -> ConsentDecision {
        let auto_check = match prompt {
            ConsentPrompt::DefaultServer {
                product_url,
                privacy_url,
                auto_check,
            } => {
                eprintln!("Your text will be sent to the checking service ({product_url}).");
                eprintln!("Privacy policy: {privacy_url}");
                *auto_check
            }
            ConsentPrompt::CustomServer {
                server_url,
                auto_check,
            } => {
                eprintln!("Your text will be sent to {server_url}.");
                *auto_check
            }
        };
        if self.assume_yes {
            return ConsentDecision::Accept { auto_check };
        }

        eprint!("Continue? [y/N] ");
        let mut answer = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut answer).await {
            Ok(_) if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") => {
                ConsentDecision::Accept { auto_check }
            }
            Ok(_) => ConsentDecision::Cancel,
            Err(e) => {
                log::warn!("Could not read answer: {e}");
                ConsentDecision::Cancel
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let matches = Command::new("textcheck")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Check the text of a page against a LanguageTool-compatible server")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("textcheck.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("settings")
                .short('s')
                .long("settings")
                .value_name("FILE")
                .help("Settings file, overrides settings_path from the config")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("page-url")
                .long("page-url")
                .value_name("URL")
                .help("URL of the page the text comes from")
                .required_unless_present("generate-config"),
        )
        .arg(
            Arg::new("text")
                .long("text")
                .value_name("FILE")
                .help("File holding the page text")
                .required_unless_present("generate-config"),
        )
        .arg(
            Arg::new("editable")
                .long("editable")
                .help("Treat the text as editable so corrections can be applied")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("yes")
                .short('y')
                .long("yes")
                .help("Agree to sending the text without asking")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        match AppConfig::default().to_file(generate_path) {
            Ok(()) => println!("Default configuration written to: {generate_path}"),
            Err(e) => {
                eprintln!("Error writing configuration file: {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    let config_path = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("textcheck.yaml");
    let loaded = load_config(config_path);

    // Initialize logger based on verbose flag, then the config file
    let log_level = startup_log_level(matches.get_flag("verbose"), loaded.as_ref().ok());

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    let config = config_or_default(loaded);

    match run(&matches, &config).await {
        Ok(failed) => {
            if failed {
                process::exit(2);
            }
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            process::exit(1);
        }
    }
}

/// Runs one check and prints the outcome. Returns whether the outcome
/// is a failure.
async fn run(matches: &ArgMatches, config: &AppConfig) -> anyhow::Result<bool> {
    let page_url = matches
        .get_one::<String>("page-url")
        .context("--page-url is required")?;
    let text_path = matches
        .get_one::<String>("text")
        .context("--text is required")?;
    let settings_path = matches
        .get_one::<String>("settings")
        .unwrap_or(&config.settings_path);

    let text = tokio::fs::read_to_string(text_path)
        .await
        .with_context(|| format!("Failed to read {text_path}"))?;
    let store = JsonFileSettingsStore::new(settings_path);
    let page = StaticPageTransport::new(page_url, &text, matches.get_flag("editable"));
    let service = LanguageToolClient::new(config.service.timeout_seconds, &config.service.user_agent)
        .context("Failed to build HTTP client")?;
    let prompter = TerminalPrompter {
        assume_yes: matches.get_flag("yes"),
    };
    let options = OrchestratorOptions {
        page_timeout: Duration::from_secs(config.page_timeout_seconds),
        extension_version: config.extension_version.clone(),
        is_firefox: config.is_firefox,
    };

    let mut orchestrator = CheckOrchestrator::with_options(store, page, service, prompter, options);
    let outcome = orchestrator.run(page_url, CheckCause::ManuallyTriggered).await;
    log::info!("Check finished: {}", outcome.kind());

    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let Some(session) = orchestrator.session() {
        let settings = orchestrator.store().load().await?;
        log::debug!("{:?}", attribution(&session.server_url));
        if let Some(hint) = usage::hint_to_show(&settings, &session.server_url, false) {
            log::info!("Hint available: {hint:?}");
        }
        if usage::show_review_request(&settings) {
            log::info!("Enjoying textcheck? Consider leaving a review.");
        }
        if let Some(url) = &session.uninstall_url {
            log::debug!("Uninstall survey: {url}");
        }
    }

    Ok(outcome.is_failure())
}
