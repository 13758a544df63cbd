use std::env;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub settings_module: String,
    pub debug: bool,
    pub template_dir: PathBuf,
    pub static_dir: PathBuf,
    pub static_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if it exists (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source, falling
    /// back to the development defaults for anything missing.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port = lookup("PORT")
            .unwrap_or_else(|| "8000".to_string())
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid PORT value: {}", e))?;

        let settings_module =
            lookup("SETTINGS_MODULE").unwrap_or_else(|| "web.settings".to_string());

        let debug = match lookup("DEBUG") {
            Some(value) => parse_flag(&value)
                .ok_or_else(|| anyhow::anyhow!("Invalid DEBUG value: {}", value))?,
            None => true,
        };

        let template_dir = lookup("TEMPLATE_DIR")
            .unwrap_or_else(|| "web/templates".to_string())
            .into();
        let static_dir = lookup("STATIC_ROOT")
            .unwrap_or_else(|| "web/static".to_string())
            .into();
        let static_url = normalize_static_url(
            &lookup("STATIC_URL").unwrap_or_else(|| "/static".to_string()),
        )?;

        Ok(Config {
            host,
            port,
            settings_module,
            debug,
            template_dir,
            static_dir,
            static_url,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Static files are mounted as a nested service, which needs exactly one
/// leading slash and no trailing one.
fn normalize_static_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        anyhow::bail!("Invalid STATIC_URL value: {:?}", raw);
    }
    Ok(format!("/{}", trimmed))
}
