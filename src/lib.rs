//! # Petconomy - Reward Economy and Virtual Pet Engine
//!
//! Petconomy is the currency, minigame and pet engine behind a chat bot that
//! serves many independent communities. Each member owns one economy record
//! (balance, inventory, pets) that is mutated by timed activities.
//!
//! ## Features
//!
//! - **Race-safe claims**: cooldown-gated rewards built on single-document
//!   compare-and-swap updates in a sled store.
//! - **Minigames**: fishing, mining, chopping, exploring and foraging scenes
//!   with method, door and wire modes, scaled rewards and drop tables.
//! - **Anti-spam**: an in-memory sliding-window rate limiter behind a trait.
//! - **Pets**: care decay, neglect, leveling, stat points, egg incubation and
//!   exploration trips.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use petconomy::config::Config;
//! use petconomy::economy::EconomyService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     let service = EconomyService::open(config)?;
//!
//!     let result = service.claim_daily("user-42").await;
//!     println!("{}", serde_json::to_string(&result)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`economy`] - records, store, gates, minigames and pet lifecycle
//! - [`config`] - TOML configuration and defaults

pub mod config;
pub mod economy;
