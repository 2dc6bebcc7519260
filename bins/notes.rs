use clap::{Parser, Subcommand, ValueEnum};
use common::LogFormat;
use dotenvy::dotenv;
use models::{ItemId, Patch};
use service::runtime::Stores;
use std::future::Future;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect and edit ONO note collections")]
struct Args {
    /// Config file (defaults to $CONFIG_PATH, then ono.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the collection and its occupancy flag as JSON
    Show { collection: Collection },
    /// Upsert one item: merge PATCH (a JSON object) into the item with ID
    Update { collection: Collection, id: String, patch: String },
    /// Clear an occupancy flag left behind by a crashed writer
    Release { collection: Collection },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Collection {
    Notes,
    Groups,
}

impl Collection {
    fn as_str(self) -> &'static str {
        match self {
            Collection::Notes => "notes",
            Collection::Groups => "groups",
        }
    }
}

/// How a command ended when Ctrl+C may interrupt it.
#[derive(Debug, PartialEq)]
enum Outcome<T> {
    Done(T),
    /// Interrupted before it wrote anything that needs cleanup.
    Abandoned,
    /// Interrupted twice while finishing a write.
    Aborted,
}

/// Drive `work` until it completes or `interrupt` fires. With `finish_writes`
/// the first interrupt only warns and the work keeps running, since dropping
/// an update between its two writes leaves the collection occupied.
async fn drive<T, W, S, Fut>(work: W, mut interrupt: S, finish_writes: bool) -> Outcome<T>
where
    W: Future<Output = T>,
    S: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    tokio::pin!(work);
    tokio::select! {
        out = &mut work => return Outcome::Done(out),
        _ = interrupt() => {}
    }
    if !finish_writes {
        return Outcome::Abandoned;
    }
    warn!(service = "ono-notes", event = "shutdown_deferred", "Ctrl+C received, finishing the update; press Ctrl+C again to abort");
    tokio::select! {
        out = &mut work => Outcome::Done(out),
        _ = interrupt() => Outcome::Aborted,
    }
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn init_logging(format: &str) {
    let format = format.parse::<LogFormat>().unwrap_or_default();
    common::init_logging(format);
    info!(service = "ono-notes", event = "logger_init", "tracing subscriber initialized");
}

fn load_config(path: Option<&str>) -> anyhow::Result<configs::AppConfig> {
    let mut cfg = match path {
        Some(p) => configs::load_from_file(p)?,
        None => configs::load_default()?,
    };
    cfg.normalize_and_validate()?;
    Ok(cfg)
}

fn parse_patch(raw: &str) -> anyhow::Result<Patch> {
    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(anyhow::anyhow!("patch must be a JSON object, got {other}")),
    }
}

async fn run(stores: Stores, command: Command) -> anyhow::Result<serde_json::Value> {
    let out = match command {
        Command::Show { collection: Collection::Notes } => {
            let s = stores.notes.try_load().await?;
            serde_json::json!({ "items": s.items, "occupied": s.occupied })
        }
        Command::Show { collection: Collection::Groups } => {
            let s = stores.groups.try_load().await?;
            serde_json::json!({ "items": s.items, "occupied": s.occupied })
        }
        Command::Update { collection, id, patch } => {
            let id = ItemId::parse_lenient(&id);
            let patch = parse_patch(&patch)?;
            match collection {
                Collection::Notes => serde_json::to_value(stores.notes.update(&id, &patch).await?.items)?,
                Collection::Groups => serde_json::to_value(stores.groups.update(&id, &patch).await?.items)?,
            }
        }
        Command::Release { collection: Collection::Notes } => {
            serde_json::json!({ "released": stores.notes.key().to_string(), "items": stores.notes.release().await?.items.len() })
        }
        Command::Release { collection: Collection::Groups } => {
            serde_json::json!({ "released": stores.groups.key().to_string(), "items": stores.groups.release().await?.items.len() })
        }
    };
    Ok(out)
}

fn main() -> std::process::ExitCode {
    dotenv().ok();
    let args = Args::parse();

    let cfg = match load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            common::init_logging(LogFormat::Compact);
            error!(service = "ono-notes", event = "config_invalid", error = %e, "cannot load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };
    init_logging(&cfg.log.format);

    let run_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service = "ono-notes", event = "panic", %run_id, pid, message = %info, "unhandled panic occurred");
    }));

    info!(
        service = "ono-notes",
        event = "start",
        %run_id,
        pid,
        version,
        operator_name = %cfg.operator.name,
        operator_surname = %cfg.operator.surname,
        "ono-notes starting"
    );

    let rt = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "ono-notes", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    let stores = match Stores::from_config(&cfg) {
        Ok(stores) => stores,
        Err(e) => {
            error!(service = "ono-notes", event = "transport_init_failed", code = e.code(), error = %e, "cannot build ONO transport");
            return std::process::ExitCode::FAILURE;
        }
    };

    let pending_update = match &args.command {
        Command::Update { collection, .. } => Some(collection.as_str()),
        _ => None,
    };

    rt.block_on(async move {
        match drive(run(stores, args.command), ctrl_c, pending_update.is_some()).await {
            Outcome::Done(Ok(out)) => {
                println!("{}", serde_json::to_string_pretty(&out).unwrap_or_else(|_| out.to_string()));
                info!(service = "ono-notes", event = "stop", %run_id, "command finished");
                std::process::ExitCode::SUCCESS
            }
            Outcome::Done(Err(e)) => {
                error!(service = "ono-notes", event = "command_failed", error = %e, "command failed");
                std::process::ExitCode::FAILURE
            }
            Outcome::Abandoned => {
                info!(service = "ono-notes", event = "shutdown_signal", %run_id, "received Ctrl+C, abandoning command");
                std::process::ExitCode::FAILURE
            }
            Outcome::Aborted => {
                let collection = pending_update.unwrap_or("<collection>");
                error!(
                    service = "ono-notes",
                    event = "update_aborted",
                    %run_id,
                    collection,
                    "update aborted mid-write; the collection may stay occupied, run `ono-notes release {collection}`"
                );
                std::process::ExitCode::FAILURE
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn slow_work() -> u32 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        7
    }

    fn interrupt_once() -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = ()>>> {
        let mut fired = false;
        move || {
            let first = !fired;
            fired = true;
            Box::pin(async move {
                if !first {
                    std::future::pending::<()>().await;
                }
            })
        }
    }

    #[tokio::test]
    async fn update_is_finished_after_one_interrupt() {
        assert_eq!(drive(slow_work(), interrupt_once(), true).await, Outcome::Done(7));
    }

    #[tokio::test]
    async fn read_only_command_is_abandoned_on_interrupt() {
        assert_eq!(drive(slow_work(), interrupt_once(), false).await, Outcome::Abandoned);
    }

    #[tokio::test]
    async fn second_interrupt_aborts_the_update() {
        let always = || async {};
        assert_eq!(drive(slow_work(), always, true).await, Outcome::Aborted);
    }

    #[tokio::test]
    async fn work_that_finishes_first_is_done() {
        let never = || std::future::pending::<()>();
        assert_eq!(drive(async { 3 }, never, true).await, Outcome::Done(3));
    }

    #[test]
    fn patch_must_be_an_object() {
        assert!(parse_patch(r#"{"title": "x"}"#).is_ok());
        assert!(parse_patch("[1, 2]").is_err());
    }
}
