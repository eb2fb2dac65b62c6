// Runtime configuration.
//
// Built once in `main` from the environment (after `.env` is loaded) and
// shared with every command through `Data`.

use crate::core::boards::BoardSlots;
use anyhow::{anyhow, Context};
use std::env;

/// Admin roles on the production server (club leads and moderators).
const PROD_ADMIN_ROLE_IDS: [u64; 8] = [
    793988624181231616,
    809103744042139688,
    850122172026060842,
    906620777623846932,
    1014573384216084480,
    627149592579801128,
    927261770308005949,
    110930694670123008,
];

/// Admin roles on the development/test servers.
const DEV_ADMIN_ROLE_IDS: [u64; 2] = [813144788714520586, 813294637958823986];

const PROD_DATABASE: &str = "data/prod.db";
const DEV_DATABASE: &str = "data/main.db";

pub const COMMAND_PREFIX: &str = "bc! ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Production,
    Development,
}

impl Environment {
    /// `prod` selects production; anything else (or nothing) is development.
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("prod") => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub discord_token: String,
    pub environment: Environment,
    pub admin_role_ids: Vec<u64>,
    pub database_path: String,
    pub command_prefix: String,
    /// Guild whose boards are refreshed at startup.
    pub board_guild_id: Option<u64>,
    pub boards: BoardSlots,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let discord_token = lookup("DISCORD_TOKEN").ok_or_else(|| {
            anyhow!("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.")
        })?;

        let environment = Environment::from_value(lookup("ENV").as_deref());

        let admin_role_ids = match lookup("ADMIN_ROLE_IDS") {
            Some(list) => parse_id_list(&list).context("ADMIN_ROLE_IDS must be comma separated ids")?,
            None => match environment {
                Environment::Production => PROD_ADMIN_ROLE_IDS.to_vec(),
                Environment::Development => DEV_ADMIN_ROLE_IDS.to_vec(),
            },
        };

        let database_path = lookup("DATABASE_PATH").unwrap_or_else(|| {
            match environment {
                Environment::Production => PROD_DATABASE,
                Environment::Development => DEV_DATABASE,
            }
            .to_string()
        });

        let board_guild_id = lookup("BOARD_GUILD_ID")
            .map(|v| v.trim().parse::<u64>())
            .transpose()
            .context("BOARD_GUILD_ID must be a numeric id")?;

        let boards = match lookup("BOARD_CHANNEL_ID") {
            Some(channel) => {
                let channel_id: u64 = channel
                    .trim()
                    .parse()
                    .context("BOARD_CHANNEL_ID must be a numeric id")?;
                BoardSlots::parse(channel_id, &lookup("BOARD_MESSAGES").unwrap_or_default())?
            }
            None => BoardSlots::default(),
        };

        let command_prefix = lookup("COMMAND_PREFIX").unwrap_or_else(|| COMMAND_PREFIX.to_string());

        Ok(Self {
            discord_token,
            environment,
            admin_role_ids,
            database_path,
            command_prefix,
            board_guild_id,
            boards,
        })
    }

    /// True when any of the member's roles is a configured admin role.
    pub fn is_admin(&self, member_role_ids: &[u64]) -> bool {
        member_role_ids
            .iter()
            .any(|role| self.admin_role_ids.contains(role))
    }
}

fn parse_id_list(list: &str) -> Result<Vec<u64>, std::num::ParseIntError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::boards::BoardTarget;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_missing_token_is_an_error() {
        assert!(config_from(&[]).is_err());
    }

    #[test]
    fn test_development_defaults() {
        let config = config_from(&[("DISCORD_TOKEN", "t")]).unwrap();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.database_path, DEV_DATABASE);
        assert_eq!(config.admin_role_ids, DEV_ADMIN_ROLE_IDS.to_vec());
        assert_eq!(config.command_prefix, "bc! ");
        assert!(config.boards.is_empty());
        assert!(config.board_guild_id.is_none());
    }

    #[test]
    fn test_production_selects_prod_roles_and_database() {
        let config = config_from(&[("DISCORD_TOKEN", "t"), ("ENV", "prod")]).unwrap();
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.database_path, PROD_DATABASE);
        assert!(config.is_admin(&[1, 627149592579801128]));
        assert!(!config.is_admin(&[813144788714520586]));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "t"),
            ("ADMIN_ROLE_IDS", "5, 6"),
            ("DATABASE_PATH", "/tmp/x.db"),
            ("BOARD_GUILD_ID", "42"),
            ("BOARD_CHANNEL_ID", "7"),
            ("BOARD_MESSAGES", "VN3=100,ALL=101"),
        ])
        .unwrap();

        assert_eq!(config.admin_role_ids, vec![5, 6]);
        assert_eq!(config.database_path, "/tmp/x.db");
        assert_eq!(config.board_guild_id, Some(42));
        assert_eq!(config.boards.channel_id, 7);
        assert_eq!(config.boards.message_for(&BoardTarget::All), Some(101));
    }

    #[test]
    fn test_bad_ids_are_rejected() {
        assert!(config_from(&[("DISCORD_TOKEN", "t"), ("ADMIN_ROLE_IDS", "x")]).is_err());
        assert!(config_from(&[("DISCORD_TOKEN", "t"), ("BOARD_GUILD_ID", "x")]).is_err());
    }

    #[test]
    fn test_non_admin() {
        let config = config_from(&[("DISCORD_TOKEN", "t"), ("ADMIN_ROLE_IDS", "5")]).unwrap();
        assert!(!config.is_admin(&[]));
        assert!(!config.is_admin(&[4, 6]));
        assert!(config.is_admin(&[5]));
    }
}
