use anyhow::Result;
use is_terminal::IsTerminal;
use sbxgpt::{
    cli::Cli,
    config::Config,
    extract::FencePolicy,
    pipeline::{self, RunOptions},
    prompt::PromptPair,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn setup_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(args.verbose);

    // Pull credentials from .env before reading the environment.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            tracing::warn!(error = %e, "could not load .env");
        }
    }
    let cfg = Config::load();

    let model = args
        .model
        .clone()
        .or_else(|| cfg.get("DEFAULT_MODEL"))
        .unwrap_or_else(|| "llama-3.3-70b-versatile".to_string());

    let mut prompt = PromptPair::default();
    if let Some(system) = args.system {
        prompt = prompt.with_system(system);
    }
    if let Some(user) = args.prompt.filter(|p| !p.trim().is_empty()) {
        prompt = prompt.with_user(user);
    }

    let markdown = if args.no_md {
        false
    } else if args.md {
        true
    } else {
        cfg.get_bool("PRETTIFY_MARKDOWN") && std::io::stdout().is_terminal()
    };

    let opts = RunOptions {
        prompt,
        model,
        temperature: args.temperature,
        top_p: args.top_p,
        language: args.language,
        setup: args.setup,
        fence_policy: if args.pass_through { FencePolicy::PassThrough } else { FencePolicy::Require },
        all_output: args.all_output,
        markdown,
        echo: true,
    };

    pipeline::run(&cfg, &opts).await?;
    Ok(())
}
