use clap::Subcommand;
use questline_core::Config;
use serde_json::Value;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one setting, addressed by its dotted key
    Get {
        /// e.g. "tokens.max_tokens", "breaks.extension_secs", "rewards"
        key: String,
    },
    /// Change one setting and save it
    Set {
        key: String,
        /// Plain value for numbers; JSON for the reward list
        value: String,
    },
    /// Print every setting as `key = value` lines
    List {
        /// Print the whole config as one JSON document instead
        #[arg(long)]
        json: bool,
    },
    /// Overwrite the config file with defaults
    Reset,
    /// Print the config file location
    Path,
}

/// Leaf settings in dotted form. Lists stay whole, as `set` expects them.
fn dotted(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (name, child) in map {
                let key = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}.{name}")
                };
                dotted(&key, child, out);
            }
        }
        leaf => out.push((prefix.to_string(), leaf.to_string())),
    }
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Get { key } => {
            let value = Config::load()?
                .get(&key)
                .ok_or_else(|| format!("unknown key: {key}"))?;
            println!("{value}");
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            tracing::info!(%key, "config updated");
            println!("{key} = {}", config.get(&key).unwrap_or(value));
        }
        ConfigAction::List { json: true } => {
            println!("{}", serde_json::to_string_pretty(&Config::load()?)?);
        }
        ConfigAction::List { json: false } => {
            let mut settings = Vec::new();
            dotted("", &serde_json::to_value(Config::load()?)?, &mut settings);
            for (key, value) in settings {
                println!("{key} = {value}");
            }
        }
        ConfigAction::Reset => {
            Config::reset()?;
            println!("{} reset to defaults", Config::path()?.display());
        }
        ConfigAction::Path => println!("{}", Config::path()?.display()),
    }
    Ok(())
}
