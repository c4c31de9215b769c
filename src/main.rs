//! Binary entrypoint for the petconomy operator console.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and create the database
//! - `status` - print database location and record count
//! - `balance`, `show` - inspect a user's balance or full record
//! - `daily`, `work` - cooldown-gated currency claims
//! - `scene`, `play` - open a minigame scene and resolve a choice against it
//! - `pet`, `incubate`, `hatch`, `explore` - pet lifecycle
//! - `give`, `give-item`, `grant` - transfers and operator grants
//!
//! Every engine result is printed as JSON. See the library crate docs for
//! module-level details: `petconomy::`.
use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;

use petconomy::config::Config;
use petconomy::economy::{
    ActivityKind, CareAction, Choice, EconomyService, EconomyStore, Scene, SceneModeKind, StatKind,
};

#[derive(Parser)]
#[command(name = "petconomy")]
#[command(about = "Reward economy and virtual pet engine for chat bots")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and create the database
    Init,
    /// Show database location and record count
    Status,
    /// Show a user's balance
    Balance { user: String },
    /// Dump a user's full economy record
    Show { user: String },
    /// Claim the daily reward
    Daily { user: String },
    /// Claim the work reward
    Work { user: String },
    /// Open a minigame scene (fishing, mining, chopping, exploring, foraging)
    Scene { kind: String },
    /// Resolve a choice against a scene rebuilt from its seed
    Play {
        user: String,
        kind: String,
        zone: String,
        /// Seed printed by `scene`
        #[arg(long)]
        seed: u64,
        /// Scene mode printed by `scene` (methods, doors, wires)
        #[arg(long, default_value = "methods")]
        mode: String,
        /// Method id, `door:N` or `wire:N`
        choice: String,
    },
    /// Pet care and management
    Pet {
        user: String,
        #[command(subcommand)]
        action: PetCommand,
    },
    /// Start incubating an egg from the inventory
    Incubate { user: String, egg: String },
    /// Hatch the incubating egg (or just check it with --check)
    Hatch {
        user: String,
        #[arg(long)]
        check: bool,
    },
    /// Send the active pet exploring or collect it
    Explore {
        user: String,
        #[command(subcommand)]
        action: ExploreCommand,
    },
    /// Transfer coins between users
    Give { from: String, to: String, amount: i64 },
    /// Transfer items between users
    GiveItem {
        from: String,
        to: String,
        item: String,
        #[arg(default_value_t = 1)]
        amount: u32,
    },
    /// Grant items to a user (operator)
    Grant {
        user: String,
        item: String,
        #[arg(default_value_t = 1)]
        amount: u32,
    },
}

#[derive(Subcommand)]
enum PetCommand {
    /// play, feed, clean or train the active pet
    Care { action: String },
    /// Bring an away pet back home
    Recall,
    /// Show the active pet
    Status,
    Rename { name: String },
    /// Spend one stat point (attack, defense, resistance, hunt)
    Stat { stat: String },
    /// Switch the active pet
    Active { pet_id: String },
}

#[derive(Subcommand)]
enum ExploreCommand {
    Start { zone: String },
    Finish,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(&None, cli.verbose);
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        let config = Config::load(&cli.config).await?;
        let db_path = config.storage.db_path();
        EconomyStore::open(&db_path)?;
        info!("Economy database ready at {}", db_path.display());
        return Ok(());
    }

    let config = match Config::load(&cli.config).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} (run `petconomy init` first; using defaults)", e);
            Config::default()
        }
    };
    init_logging(&Some(config.clone()), cli.verbose);
    let service = EconomyService::open(config)?;

    match cli.command {
        Commands::Init => {}
        Commands::Status => {
            let records = service
                .record_count()
                .await
                .map_err(|reason| anyhow!("status unavailable: {}", reason))?;
            print_json(&serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "db_path": service.config().storage.db_path().display().to_string(),
                "records": records,
            }))?;
        }
        Commands::Balance { user } => print_json(&service.balance(&user).await)?,
        Commands::Show { user } => {
            let record = service
                .record(&user)
                .await
                .map_err(|reason| anyhow!("lookup failed: {}", reason))?;
            print_json(&record)?;
        }
        Commands::Daily { user } => print_json(&service.claim_daily(&user).await)?,
        Commands::Work { user } => print_json(&service.claim_work(&user).await)?,
        Commands::Scene { kind } => {
            print_json(&service.open_scene(parse_kind(&kind)?).await)?;
        }
        Commands::Play {
            user,
            kind,
            zone,
            seed,
            mode,
            choice,
        } => {
            let scene = Scene::rebuild(parse_kind(&kind)?, seed, parse_mode(&mode)?);
            let choice = Choice::parse(&choice).ok_or_else(|| anyhow!("invalid choice: {}", choice))?;
            print_json(&service.play(&user, &zone, &scene, &choice).await)?;
        }
        Commands::Pet { user, action } => {
            let result = match action {
                PetCommand::Care { action } => {
                    let action = CareAction::parse(&action)
                        .ok_or_else(|| anyhow!("unknown care action: {}", action))?;
                    service.care(&user, action).await
                }
                PetCommand::Recall => service.recall_pet(&user).await,
                PetCommand::Status => service.pet_status(&user).await,
                PetCommand::Rename { name } => service.rename_pet(&user, &name).await,
                PetCommand::Stat { stat } => {
                    let stat = StatKind::parse(&stat).ok_or_else(|| anyhow!("unknown stat: {}", stat))?;
                    service.allocate_stat(&user, stat).await
                }
                PetCommand::Active { pet_id } => service.set_active_pet(&user, &pet_id).await,
            };
            print_json(&result)?;
        }
        Commands::Incubate { user, egg } => print_json(&service.start_incubation(&user, &egg).await)?,
        Commands::Hatch { user, check } => {
            let result = if check {
                service.incubation_status(&user).await
            } else {
                service.hatch(&user).await
            };
            print_json(&result)?;
        }
        Commands::Explore { user, action } => {
            let result = match action {
                ExploreCommand::Start { zone } => service.start_exploration(&user, &zone).await,
                ExploreCommand::Finish => service.finish_exploration(&user).await,
            };
            print_json(&result)?;
        }
        Commands::Give { from, to, amount } => print_json(&service.transfer(&from, &to, amount).await)?,
        Commands::GiveItem {
            from,
            to,
            item,
            amount,
        } => print_json(&service.transfer_item(&from, &to, &item, amount).await)?,
        Commands::Grant { user, item, amount } => {
            print_json(&service.grant_item(&user, &item, amount).await)?
        }
    }

    Ok(())
}

fn parse_kind(input: &str) -> Result<ActivityKind> {
    ActivityKind::parse(input).ok_or_else(|| anyhow!("unknown activity: {}", input))
}

fn parse_mode(input: &str) -> Result<SceneModeKind> {
    match input.trim().to_ascii_lowercase().as_str() {
        "methods" => Ok(SceneModeKind::Methods),
        "doors" => Ok(SceneModeKind::Doors),
        "wires" => Ok(SceneModeKind::Wires),
        other => bail!("unknown scene mode: {}", other),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // Config level is the floor; each -v raises it one step
    let configured = config
        .as_ref()
        .and_then(|cfg| cfg.logging.level.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    let base_level = match verbosity {
        0 => configured,
        1 => configured.max(log::LevelFilter::Debug),
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only in the foreground
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
