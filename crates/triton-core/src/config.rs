use std::{env, fs, path::Path, time::Duration};

use chrono::FixedOffset;

use crate::{domain::Address, errors::Error, Result};

/// Typed configuration for the bot.
///
/// Secrets and knobs come from the environment (a `.env` file is loaded if
/// present, never overriding existing variables); the operator → operate
/// daemon map comes from `config.yaml`.
#[derive(Clone, Debug)]
pub struct Config {
    // Core
    pub gnosis_rpc: String,
    pub telegram_token: String,
    pub chat_id: i64,

    /// Operate daemons, in declaration order: (operator name, endpoint URL).
    pub operators: Vec<(String, String)>,

    // Claiming / withdrawal
    pub withdrawal_address: Option<Address>,
    pub autoclaim: bool,
    pub manual_claim: bool,
    pub autoclaim_day: u32,
    pub autoclaim_hour_utc: u32,

    // Balance alert thresholds (native units)
    pub agent_balance_threshold: f64,
    pub safe_balance_threshold: f64,
    pub master_safe_balance_threshold: f64,

    // Rendering / transport
    pub local_time_offset: FixedOffset,
    pub coingecko_api_key: Option<String>,
    pub http_timeout: Duration,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.yaml"))
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let gnosis_rpc = env_str("GNOSIS_RPC").and_then(non_empty).ok_or_else(|| {
            Error::Config("GNOSIS_RPC environment variable is required".to_string())
        })?;
        let telegram_token = env_str("TELEGRAM_TOKEN").and_then(non_empty).ok_or_else(|| {
            Error::Config("TELEGRAM_TOKEN environment variable is required".to_string())
        })?;
        let chat_id = env_str("CHAT_ID")
            .and_then(|s| s.trim().parse::<i64>().ok())
            .ok_or_else(|| {
                Error::Config("CHAT_ID environment variable is required".to_string())
            })?;

        // OPERATE_ENDPOINTS overrides config.yaml (useful in containers).
        let operators = match env_str("OPERATE_ENDPOINTS").and_then(non_empty) {
            Some(raw) => parse_operator_csv(&raw)?,
            None => {
                let text = fs::read_to_string(config_path).map_err(|e| {
                    Error::Config(format!(
                        "failed to read {}: {e}",
                        config_path.display()
                    ))
                })?;
                parse_operators_yaml(&text)?
            }
        };
        if operators.is_empty() {
            return Err(Error::Config(
                "no operators configured (config.yaml or OPERATE_ENDPOINTS)".to_string(),
            ));
        }

        let withdrawal_address = match env_str("WITHDRAWAL_ADDRESS").and_then(non_empty) {
            Some(raw) => Some(Address::new(&raw).map_err(|_| {
                Error::Config(format!("WITHDRAWAL_ADDRESS is not a valid address: {raw}"))
            })?),
            None => None,
        };

        let autoclaim = env_bool("AUTOCLAIM").unwrap_or(false);
        let manual_claim = env_bool("MANUAL_CLAIM").unwrap_or(true);
        let autoclaim_day = env_u32("AUTOCLAIM_DAY").unwrap_or(1).clamp(1, 28);
        let autoclaim_hour_utc = env_u32("AUTOCLAIM_HOUR_UTC").unwrap_or(9).min(23);

        let agent_balance_threshold = env_f64("AGENT_BALANCE_THRESHOLD").unwrap_or(0.1);
        let safe_balance_threshold = env_f64("SAFE_BALANCE_THRESHOLD").unwrap_or(1.0);
        let master_safe_balance_threshold =
            env_f64("MASTER_SAFE_BALANCE_THRESHOLD").unwrap_or(5.0);

        let offset_raw = env_str("LOCAL_TIME_OFFSET").unwrap_or_else(|| "+00:00".to_string());
        let local_time_offset = parse_utc_offset(&offset_raw)?;

        let coingecko_api_key = env_str("COINGECKO_API_KEY").and_then(non_empty);
        let http_timeout = Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS").unwrap_or(30));

        Ok(Self {
            gnosis_rpc,
            telegram_token,
            chat_id,
            operators,
            withdrawal_address,
            autoclaim,
            manual_claim,
            autoclaim_day,
            autoclaim_hour_utc,
            agent_balance_threshold,
            safe_balance_threshold,
            master_safe_balance_threshold,
            local_time_offset,
            coingecko_api_key,
            http_timeout,
        })
    }
}

/// Parse the `operators:` map out of `config.yaml`.
///
/// A tiny YAML subset: one top-level `operators:` key with indented
/// `name: url` pairs. Comments and blank lines are tolerated.
fn parse_operators_yaml(input: &str) -> Result<Vec<(String, String)>> {
    let mut operators = Vec::new();
    let mut in_operators = false;

    for raw in input.lines() {
        let line = raw.trim_end_matches('\r').trim_end();
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indent = count_indent(line);
        if indent == 0 {
            in_operators = trimmed == "operators:";
            continue;
        }

        if !in_operators {
            continue;
        }

        let Some((name, url)) = trimmed.split_once(':') else {
            return Err(Error::Config(format!(
                "malformed operator entry in config.yaml: {trimmed}"
            )));
        };
        let name = strip_quotes(name.trim());
        let url = strip_quotes(url.trim());
        if name.is_empty() || url.is_empty() {
            return Err(Error::Config(format!(
                "operator entry missing name or endpoint: {trimmed}"
            )));
        }
        operators.push((name.to_string(), url.to_string()));
    }

    Ok(operators)
}

/// `name=url,name2=url2` form of the operator map.
fn parse_operator_csv(input: &str) -> Result<Vec<(String, String)>> {
    input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|entry| {
            let (name, url) = entry.split_once('=').ok_or_else(|| {
                Error::Config(format!("malformed OPERATE_ENDPOINTS entry: {entry}"))
            })?;
            Ok((name.trim().to_string(), url.trim().to_string()))
        })
        .collect()
}

/// Parse `+HH:MM` / `-HH:MM` into a fixed offset.
fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    let err = || Error::Config(format!("LOCAL_TIME_OFFSET must look like +02:00, got {raw}"));

    let (sign, rest) = match raw.as_bytes().first() {
        Some(b'+') => (1i32, &raw[1..]),
        Some(b'-') => (-1i32, &raw[1..]),
        _ => return Err(err()),
    };
    let (hours, minutes) = rest.split_once(':').ok_or_else(err)?;
    let hours: i32 = hours.parse().map_err(|_| err())?;
    let minutes: i32 = minutes.parse().map_err(|_| err())?;
    if hours > 14 || minutes > 59 {
        return Err(err());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(err)
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        env::set_var(key, strip_quotes(v.trim()));
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_u32(key: &str) -> Option<u32> {
    env_str(key).and_then(|s| s.trim().parse::<u32>().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_f64(key: &str) -> Option<f64> {
    env_str(key).and_then(|s| s.trim().parse::<f64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

fn strip_quotes(s: &str) -> &str {
    let t = s.trim();
    if t.len() >= 2
        && ((t.starts_with('"') && t.ends_with('"'))
            || (t.starts_with('\'') && t.ends_with('\'')))
    {
        return &t[1..t.len() - 1];
    }
    t
}

fn count_indent(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ').count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operators_yaml_parses_pairs_in_order() {
        let yaml = r#"
# operator fleet
operators:
  alice: http://127.0.0.1:8000
  bob: "http://10.0.0.2:8000"
"#;
        let ops = parse_operators_yaml(yaml).unwrap();
        assert_eq!(
            ops,
            vec![
                ("alice".to_string(), "http://127.0.0.1:8000".to_string()),
                ("bob".to_string(), "http://10.0.0.2:8000".to_string()),
            ]
        );
    }

    #[test]
    fn operators_yaml_ignores_other_top_level_keys() {
        let yaml = r#"
other:
  ignored: value
operators:
  alice: http://127.0.0.1:8000
"#;
        let ops = parse_operators_yaml(yaml).unwrap();
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].0, "alice");
    }

    #[test]
    fn operators_yaml_rejects_malformed_entries() {
        assert!(parse_operators_yaml("operators:\n  just-a-name\n").is_err());
    }

    #[test]
    fn operator_csv_parses() {
        let ops = parse_operator_csv("alice=http://a:1, bob=http://b:2").unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1], ("bob".to_string(), "http://b:2".to_string()));
        assert!(parse_operator_csv("no-equals-sign").is_err());
    }

    #[test]
    fn utc_offset_parses_both_signs() {
        assert_eq!(
            parse_utc_offset("+02:00").unwrap(),
            FixedOffset::east_opt(2 * 3600).unwrap()
        );
        assert_eq!(
            parse_utc_offset("-05:30").unwrap(),
            FixedOffset::west_opt(5 * 3600 + 30 * 60).unwrap()
        );
        assert_eq!(
            parse_utc_offset("+00:00").unwrap(),
            FixedOffset::east_opt(0).unwrap()
        );
        assert!(parse_utc_offset("02:00").is_err());
        assert!(parse_utc_offset("+2").is_err());
        assert!(parse_utc_offset("+15:00").is_err());
    }
}
