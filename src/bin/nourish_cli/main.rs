// ABOUTME: Nourish CLI - run pipeline stages, price lists and send reminders from the shell
// ABOUTME: Prints JSON results to stdout; logs go to stderr
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org
//!
//! Usage:
//! ```bash
//! # Run the batch for every stored user
//! nourish-cli pipeline run
//!
//! # Run the batch for one user
//! nourish-cli pipeline run --user-id 7f1c...
//!
//! # Run a single stage
//! nourish-cli stage recipes --user-id 7f1c...
//!
//! # Price every shopping list
//! nourish-cli price all
//!
//! # Send the lunch reminder now
//! nourish-cli notify send --slot-index 1
//!
//! # Compute targets without touching the database
//! nourish-cli calc --age 30 --gender male --weight 70 --height 175 \
//!     --activity "moderately active" --goal "weight loss"
//!
//! # List stored users
//! nourish-cli users list
//! ```

mod commands;
mod helpers;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use nourish_server::{
    config::{DatabaseUrl, ServerConfig},
    database::Database,
    errors::AppResult,
    resources::ServerResources,
};
use tracing::info;
use uuid::Uuid;

type Result<T> = AppResult<T>;

#[derive(Parser)]
#[command(
    name = "nourish-cli",
    about = "Nourish meal-planning pipeline CLI",
    long_about = "Run pipeline stages, price shopping lists, send meal reminders and compute nutrition targets."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Pipeline commands
    Pipeline {
        #[command(subcommand)]
        action: PipelineCommand,
    },

    /// Run one stage for one user
    Stage {
        /// Stage name (nutrition, meal_plan, images, recipes, shopping_list, pricing)
        stage: String,

        /// User id
        #[arg(long)]
        user_id: Uuid,
    },

    /// Pricing commands
    Price {
        #[command(subcommand)]
        action: PriceCommand,
    },

    /// Reminder commands
    Notify {
        #[command(subcommand)]
        action: NotifyCommand,
    },

    /// Compute daily nutrition targets
    Calc {
        /// Age in years
        #[arg(long)]
        age: u32,

        /// Gender descriptor
        #[arg(long)]
        gender: String,

        /// Weight in kilograms
        #[arg(long)]
        weight: f64,

        /// Height in centimeters
        #[arg(long)]
        height: f64,

        /// Activity descriptor
        #[arg(long)]
        activity: String,

        /// Goal descriptor
        #[arg(long)]
        goal: String,

        /// Diet descriptor
        #[arg(long, default_value = "")]
        diet: String,
    },

    /// User commands
    Users {
        #[command(subcommand)]
        action: UsersCommand,
    },
}

#[non_exhaustive]
#[derive(Subcommand)]
enum PipelineCommand {
    /// Run the batch stages for every user, or one user
    Run {
        /// Restrict the run to one user
        #[arg(long)]
        user_id: Option<Uuid>,
    },
}

#[non_exhaustive]
#[derive(Subcommand)]
enum PriceCommand {
    /// Price every stored shopping list
    All,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum NotifyCommand {
    /// Send reminders for every meal plan now
    Send {
        /// Schedule position to send; omit for every slot of the day
        #[arg(long)]
        slot_index: Option<usize>,

        /// Day label; omit for today's rotation day
        #[arg(long)]
        day: Option<String>,
    },
}

#[non_exhaustive]
#[derive(Subcommand)]
enum UsersCommand {
    /// List stored users
    List,
}

async fn open_database(config: &ServerConfig) -> Result<Database> {
    info!("Connecting to database: {}", config.database);
    Database::new(&config.database.to_connection_string()).await
}

async fn build_resources(config: ServerConfig) -> Result<ServerResources> {
    let database = open_database(&config).await?;
    ServerResources::from_config(database, Arc::new(config))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let command = match cli.command {
        Command::Calc {
            age,
            gender,
            weight,
            height,
            activity,
            goal,
            diet,
        } => return commands::calc::run(age, gender, weight, height, activity, goal, diet),
        other => other,
    };

    let mut config = ServerConfig::from_env()?;
    if let Some(url) = &cli.database_url {
        config.database = DatabaseUrl::parse_url(url);
    }

    match command {
        Command::Pipeline { action } => match action {
            PipelineCommand::Run { user_id } => {
                let resources = build_resources(config).await?;
                commands::pipeline::run(&resources, user_id).await?;
            }
        },
        Command::Stage { stage, user_id } => {
            let resources = build_resources(config).await?;
            commands::pipeline::stage(&resources, &stage, user_id).await?;
        }
        Command::Price { action } => match action {
            PriceCommand::All => {
                let resources = build_resources(config).await?;
                commands::pipeline::price_all(&resources).await?;
            }
        },
        Command::Notify { action } => match action {
            NotifyCommand::Send { slot_index, day } => {
                let resources = build_resources(config).await?;
                commands::notify::send(&resources, slot_index, day).await?;
            }
        },
        Command::Users { action } => match action {
            UsersCommand::List => {
                let database = open_database(&config).await?;
                commands::users::list(&database).await?;
            }
        },
        Command::Calc { .. } => {}
    }

    Ok(())
}
