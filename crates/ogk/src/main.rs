use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use tracing::{error, info, warn};

use ogk_core::{
    collector,
    config::{self, Config},
    domain::{parse_date, DateRange},
    messaging::chunked::ChunkedSender,
    portal::PortalClient,
};
use ogk_portal::ReqwestTransport;
use ogk_telegram::TelegramMessenger;

/// Collect newly published original documents from open.go.kr and post a
/// digest to Telegram.
#[derive(Debug, Parser)]
#[command(name = "ogk", version)]
struct Args {
    /// First day to collect (YYYY-MM-DD). Defaults to the previous publishing window.
    #[arg(long)]
    start_date: Option<String>,

    /// Last day to collect (YYYY-MM-DD). Defaults to the start date.
    #[arg(long, requires = "start_date")]
    end_date: Option<String>,

    /// Agency list (YAML). Defaults to config/agencies.yaml.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn date_range(args: &Args) -> anyhow::Result<DateRange> {
    let Some(start) = args.start_date.as_deref() else {
        return Ok(DateRange::previous_window(Local::now().date_naive()));
    };
    let start = parse_date(start)?;
    let end = match args.end_date.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => start,
    };
    Ok(DateRange::new(start, end)?)
}

async fn run(args: Args) -> anyhow::Result<bool> {
    let range = date_range(&args)?;

    let (agencies_file, agencies) = config::resolve_agencies(args.config.as_deref())?;
    if agencies.is_empty() {
        warn!(path = %agencies_file.display(), "no agencies configured; nothing to do");
        return Ok(true);
    }

    let cfg = Config::with_agencies(agencies_file, agencies)?;
    info!(range = %range.label(), chat = %cfg.telegram.chat, "configuration loaded");

    let transport = ReqwestTransport::new()?;
    let client = PortalClient::new(cfg.portal.clone(), Arc::new(transport))
        .context("portal client setup failed")?;

    let messenger = TelegramMessenger::from_token(cfg.telegram.bot_token.clone());
    let sender = ChunkedSender::new(Arc::new(messenger), cfg.telegram.chat.clone())
        .with_max_len(cfg.telegram.max_message_len);

    let report = collector::run(&client, &sender, &cfg.agencies, &range, cfg.run).await;

    for failure in &report.collected.failures {
        error!(
            agency = %failure.agency.name,
            code = %failure.agency.code,
            error = %failure.error,
            "agency not included in digest"
        );
    }

    Ok(report.success())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    if let Err(e) = ogk_core::logging::init("ogk") {
        eprintln!("{e}");
    }

    match run(Args::parse()).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => {
            error!("run finished with failures");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), "run aborted");
            ExitCode::FAILURE
        }
    }
}
