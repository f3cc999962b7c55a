//! Fns to read variables from the environment more conveniently, and the config the service
//! runs with.

use std::{env, path::PathBuf, time::Duration};

use lazy_static::lazy_static;
use tracing::debug;

const SECRET_LOG_BLACKLIST: [&str; 1] = ["EXPLORER_API_KEY"];

const DEFAULT_EXPLORER_API_URL: &str = "https://blockscout.shardeum.org/api";

lazy_static! {
    pub static ref ENV_CONFIG: EnvConfig = get_env_config();
}

fn obfuscate_if_secret(blacklist: &[&str], key: &str, value: &str) -> String {
    if blacklist.contains(&key) {
        let mut last_four = value.to_string();
        last_four.drain(0..value.len().saturating_sub(4));
        format!("****{last_four}")
    } else {
        value.to_string()
    }
}

/// Get an environment variable, encoding found or missing as Option, and panic otherwise.
pub fn get_env_var(key: &str) -> Option<String> {
    let var = match env::var(key) {
        Err(env::VarError::NotPresent) => None,
        Err(e) => panic!("{e}"),
        Ok(var) => Some(var),
    };

    if let Some(ref existing_var) = var {
        let output = obfuscate_if_secret(&SECRET_LOG_BLACKLIST, key, existing_var);
        debug!("env var {key}: {output}");
    } else {
        debug!("env var {key} requested but not found")
    };

    var
}

pub fn get_env_bool(key: &str) -> Option<bool> {
    get_env_var(key).map(|var| match var.to_lowercase().as_str() {
        "true" => true,
        "false" => false,
        "t" => true,
        "f" => false,
        "1" => true,
        "0" => false,
        str => panic!("invalid bool value {str} for {key}"),
    })
}

pub fn get_env_u64(key: &str) -> Option<u64> {
    get_env_var(key).map(|var| {
        var.parse::<u64>()
            .unwrap_or_else(|_| panic!("invalid integer value {var} for {key}"))
    })
}

pub struct EnvConfig {
    pub balance_cache_path: PathBuf,
    pub bind_public_interface: bool,
    pub explorer_api_key: Option<String>,
    pub explorer_api_url: String,
    pub explorer_timeout: Duration,
    pub log_json: bool,
    pub log_perf: bool,
    pub port: u16,
    pub wallets_path: PathBuf,
}

pub fn get_env_config() -> EnvConfig {
    EnvConfig {
        balance_cache_path: get_env_var("BALANCE_CACHE_PATH")
            .unwrap_or_else(|| "balances-cache.json".to_string())
            .into(),
        bind_public_interface: get_env_bool("BIND_PUBLIC_INTERFACE").unwrap_or(true),
        explorer_api_key: get_env_var("EXPLORER_API_KEY"),
        explorer_api_url: get_env_var("EXPLORER_API_URL")
            .unwrap_or_else(|| DEFAULT_EXPLORER_API_URL.to_string()),
        explorer_timeout: Duration::from_secs(get_env_u64("EXPLORER_TIMEOUT_SECS").unwrap_or(10)),
        log_json: get_env_bool("LOG_JSON").unwrap_or(false),
        log_perf: get_env_bool("LOG_PERF").unwrap_or(false),
        port: get_env_var("PORT")
            .map(|port| port.parse().expect("PORT to be a valid port number"))
            .unwrap_or(3002),
        wallets_path: get_env_var("WALLETS_PATH")
            .unwrap_or_else(|| "wallets.txt".to_string())
            .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_env_var_safe_some() {
        let test_key = "TEST_KEY_SAFE_SOME";
        let test_value = "my-env-value";
        std::env::set_var(test_key, test_value);
        assert_eq!(get_env_var(test_key), Some(test_value.to_string()));
    }

    #[test]
    fn test_get_env_var_safe_none() {
        let key = get_env_var("DOESNT_EXIST");
        assert!(key.is_none());
    }

    #[test]
    fn test_get_env_bool_not_there() {
        let flag = get_env_bool("DOESNT_EXIST");
        assert_eq!(flag, None);
    }

    #[test]
    fn test_get_env_bool_true_upper() {
        let test_key = "TEST_KEY_BOOL_TRUE2";
        std::env::set_var(test_key, "TRUE");
        assert_eq!(get_env_bool(test_key), Some(true));
    }

    #[test]
    fn test_get_env_bool_false() {
        let test_key = "TEST_KEY_BOOL_FALSE";
        std::env::set_var(test_key, "0");
        assert_eq!(get_env_bool(test_key), Some(false));
    }

    #[test]
    fn test_get_env_u64() {
        let test_key = "TEST_KEY_U64";
        std::env::set_var(test_key, "25");
        assert_eq!(get_env_u64(test_key), Some(25));
    }

    #[test]
    #[should_panic]
    fn test_get_env_u64_invalid_panics() {
        let test_key = "TEST_KEY_U64_INVALID";
        std::env::set_var(test_key, "ten");
        get_env_u64(test_key);
    }

    #[test]
    fn test_obfuscate_if_secret() {
        let secret_key = "SECRET_KEY";
        let blacklist = vec![secret_key];
        assert_eq!(
            obfuscate_if_secret(&blacklist, secret_key, "my_secret_value"),
            "****alue"
        );

        let normal_key = "NORMAL_KEY";
        assert_eq!(
            obfuscate_if_secret(&blacklist, normal_key, "my_normal_value"),
            "my_normal_value"
        );
    }
}
