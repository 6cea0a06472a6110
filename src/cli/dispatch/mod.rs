use crate::cli::{actions::Action, globals::GlobalArgs};
use anyhow::Result;
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<(Action, GlobalArgs)> {
    let dsn = matches
        .get_one("dsn")
        .map(|s: &String| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --dsn"))?;

    let frontend_url = matches
        .get_one("frontend-url")
        .map(|s: &String| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --frontend-url"))?;

    let token_seed = matches
        .get_one("token-seed")
        .map(|s: &String| SecretString::from(s.to_string()))
        .ok_or_else(|| anyhow::anyhow!("missing required argument: --token-seed"))?;

    let globals = GlobalArgs::new(frontend_url, token_seed);

    let action = match matches.subcommand_name() {
        Some("repair-members") => Action::RepairMembers { dsn },
        _ => Action::Server {
            port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
            dsn,
        },
    };

    Ok((action, globals))
}
