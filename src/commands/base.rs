/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use super::*;
use crate::config::*;
use crate::input::*;
use crate::session::UserState;
use anyhow::{Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use connector::*;
use std::io;
use strum::IntoEnumIterator;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "Mini Jenkins", display_name = "Mini Jenkins", bin_name = "minijenkins", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Option<MainCommands>,
    #[arg(long, value_enum)]
    generate_completions: Option<Shell>,
    /// Log requests and internal state to stderr.
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand, Debug)]
enum MainCommands {
    /// Show or set a configuration value.
    Config {
        key: String,
        value: Option<String>,
        #[arg(long, conflicts_with = "value")]
        unset: bool,
    },
    /// Show configured services and the session.
    Status,
    Register {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        email: Option<String>,
    },
    Login {
        #[arg(short, long)]
        email: Option<String>,
    },
    Logout,
    /// Show the logged-in user.
    Info,
    Project {
        #[command(subcommand)]
        cmd: project::Commands,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub async fn run_cli(cli: Cli) -> Result<()> {
    if let Some(shell) = cli.generate_completions {
        let mut app = Cli::command();
        let bin_name = app.get_bin_name().unwrap_or("minijenkins").to_string();
        generate(shell, &mut app, bin_name, &mut io::stdout());
        return Ok(());
    }

    let Some(cmd) = cli.cmd else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match cmd {
        MainCommands::Config { key, value, unset } => {
            if unset {
                unset_value(key.parse()?)?;
                println!("{} unset", key.to_lowercase());
            } else {
                set_get_value_from_string(key, value, false)?;
            }
        }

        MainCommands::Status => {
            let ctx = Context::load()?;

            for key in ConfigKey::iter() {
                println!(
                    "{}: {}",
                    key,
                    get_value(&ctx.config, key).unwrap_or_else(|| "[unset]".to_string())
                );
            }

            match ctx.session.state() {
                UserState::LoggedIn(user) => println!("Logged in as {} <{}>.", user.name, user.email),
                _ => println!("Not logged in."),
            }
        }

        MainCommands::Register { name, email } => {
            ask_for_missing_servers()?;
            let ctx = Context::load()?;
            let request_config = ctx.request_config()?;

            let input_fields = [("Name", name), ("Email", email)]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();

            let input = handle_input(input_fields, true, &[])?;
            let password = ask_for_password()?;

            let user = auth::post_register(
                &request_config,
                field(&input, "Email")?,
                password,
                field(&input, "Name")?,
            )
            .await
            .map_err(|e| anyhow::anyhow!("Registration failed: {}", e))?;

            debug!(user_id = %user.user_id, "registered user");
            println!("Registration successful. Please log in.");
        }

        MainCommands::Login { email } => {
            ask_for_missing_servers()?;
            let mut ctx = Context::load()?;
            let request_config = ctx.request_config()?;

            let email = match email {
                Some(email) => email,
                None => ask_for_input("Email")?,
            };

            let password = ask_for_password()?;

            let res = auth::post_login(&request_config, email, password)
                .await
                .map_err(|e| anyhow::anyhow!("Login failed: {}", e))?;

            let name = res.user.name.clone();
            ctx.session.login(res.user, res.token)?;
            println!("Logged in as {}.", name);
        }

        MainCommands::Logout => {
            let mut ctx = Context::load()?;
            ctx.session.logout()?;
            println!("Logged out.");
        }

        MainCommands::Info => {
            let ctx = Context::load()?;
            let user = ctx.user()?;

            println!("User ID: {}", user.user_id);
            println!("Name: {}", user.name);
            println!("Email: {}", user.email);
        }

        MainCommands::Project { cmd } => project::handle(cmd).await?,
    }

    Ok(())
}

/// Prompts for every service URL that is neither stored nor overridden.
fn ask_for_missing_servers() -> Result<()> {
    let config = load_config()?;

    for key in missing_servers(&config) {
        set_get_value(key, Some(ask_for_input(&format!("{} URL", key))?), true)?;
    }

    Ok(())
}

fn missing_servers(config: &Config) -> Vec<ConfigKey> {
    ConfigKey::iter()
        .filter(|key| key.env_var().is_some())
        .filter(|key| get_value(config, *key).is_none())
        .collect()
}

fn field(input: &std::collections::HashMap<String, String>, key: &str) -> Result<String> {
    match input.get(key) {
        Some(value) => Ok(value.clone()),
        None => bail!("{} is required.", key),
    }
}
