use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    domain::{Agency, ChatTarget},
    errors::Error,
    Result,
};

pub const DEFAULT_AGENCIES_FILE: &str = "config/agencies.yaml";
pub const QUIET_WHEN_EMPTY_ENV: &str = "OGK_QUIET_WHEN_EMPTY";

/// Portal endpoint and payload layout.
///
/// Key names are whatever the portal currently emits; they live here rather than
/// in the parser so a layout change is a config edit.
#[derive(Clone, Debug)]
pub struct PortalConfig {
    pub list_url: String,
    pub detail_url: String,
    pub page_size: usize,
    pub max_pages: usize,
    pub timeout: Duration,

    /// Identifier on the left of `<marker> = {...};` in the page script.
    pub payload_marker: String,
    pub list_key: String,
    pub total_key: String,

    pub title_key: String,
    pub produced_at_key: String,
    pub agency_name_key: String,
    pub registration_no_key: String,
    pub institution_kind_key: String,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            list_url: "https://www.open.go.kr/othicInfo/infoList/orginlInfoList.do".to_string(),
            detail_url: "https://www.open.go.kr/othicInfo/infoList/orginlInfoDetail.do"
                .to_string(),
            page_size: 10,
            max_pages: 500,
            timeout: Duration::from_secs(30),
            payload_marker: "result".to_string(),
            list_key: "rtnList".to_string(),
            total_key: "rtnTotal".to_string(),
            title_key: "INFO_SJ".to_string(),
            produced_at_key: "PRDCTN_DT".to_string(),
            agency_name_key: "PROC_INSTT_NM".to_string(),
            registration_no_key: "PRDCTN_INSTT_REGIST_NO".to_string(),
            institution_kind_key: "INSTT_SE_CD".to_string(),
        }
    }
}

impl PortalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("portal page size must be positive".to_string()));
        }
        if self.max_pages == 0 {
            return Err(Error::Config("portal max pages must be positive".to_string()));
        }
        if self.payload_marker.trim().is_empty() {
            return Err(Error::Config("portal payload marker is empty".to_string()));
        }
        for (name, raw) in [("list", &self.list_url), ("detail", &self.detail_url)] {
            url::Url::parse(raw)
                .map_err(|e| Error::Config(format!("invalid portal {name} url `{raw}`: {e}")))?;
        }
        Ok(())
    }
}

/// Messenger credentials.
#[derive(Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat: ChatTarget,
    pub max_message_len: usize,
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"<redacted>")
            .field("chat", &self.chat)
            .field("max_message_len", &self.max_message_len)
            .finish()
    }
}

impl TelegramConfig {
    pub fn from_env() -> Result<Self> {
        let bot_token = env_str("TELEGRAM_BOT_TOKEN").and_then(non_empty);
        let chat = env_str("TELEGRAM_CHAT_ID").and_then(non_empty);

        let (Some(bot_token), Some(chat)) = (bot_token, chat) else {
            return Err(Error::Config(
                "TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID environment variables are required"
                    .to_string(),
            ));
        };

        Ok(Self {
            bot_token,
            chat: chat.parse()?,
            max_message_len: env_usize("TELEGRAM_MESSAGE_LIMIT").unwrap_or(4096),
        })
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    /// Stay silent instead of delivering the "no documents" digest.
    pub quiet_when_empty: bool,
}

impl RunOptions {
    pub fn from_env() -> Self {
        Self {
            quiet_when_empty: env_bool(QUIET_WHEN_EMPTY_ENV).unwrap_or(false),
        }
    }
}

/// Everything the binary needs, resolved from env + files.
#[derive(Clone, Debug)]
pub struct Config {
    pub portal: PortalConfig,
    pub telegram: TelegramConfig,
    pub run: RunOptions,
    pub agencies: Vec<Agency>,
    pub agencies_file: PathBuf,
}

impl Config {
    /// Resolve the agency list, then messenger credentials and run options from env.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (agencies_file, agencies) = resolve_agencies(explicit)?;
        Self::with_agencies(agencies_file, agencies)
    }

    pub fn with_agencies(agencies_file: PathBuf, agencies: Vec<Agency>) -> Result<Self> {
        let portal = PortalConfig::default();
        portal.validate()?;

        Ok(Self {
            portal,
            telegram: TelegramConfig::from_env()?,
            run: RunOptions::from_env(),
            agencies,
            agencies_file,
        })
    }
}

/// Read `.env` (if any), locate the agency file and load it.
///
/// Split from [`Config::load`] so an empty list can end the run before
/// credentials are required.
pub fn resolve_agencies(explicit: Option<&Path>) -> Result<(PathBuf, Vec<Agency>)> {
    load_dotenv_if_present(Path::new(".env"));
    let path = find_agencies_file(explicit)?;
    let agencies = load_agencies(&path)?;
    info!(path = %path.display(), count = agencies.len(), "loaded agencies");
    Ok((path, agencies))
}

#[derive(Deserialize)]
struct AgenciesFile {
    #[serde(default)]
    agencies: Vec<Agency>,
}

/// Parse `{ agencies: [ {code, name}, ... ] }`, keeping file order.
pub fn parse_agencies(raw: &str) -> Result<Vec<Agency>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let file: AgenciesFile = serde_yaml::from_str(raw)
        .map_err(|e| Error::Config(format!("invalid agencies file: {e}")))?;
    Ok(file.agencies)
}

pub fn load_agencies(path: &Path) -> Result<Vec<Agency>> {
    if !path.is_file() {
        return Err(Error::Config(format!(
            "agencies file not found: {}",
            path.display()
        )));
    }
    let raw = fs::read_to_string(path)?;
    parse_agencies(&raw)
}

/// Resolve the agency file: explicit path, else `config/agencies.yaml` under the
/// working dir, else next to the executable (and one level up, for `bin/` installs).
pub fn find_agencies_file(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = explicit {
        return Ok(p.to_path_buf());
    }

    let mut candidates = vec![PathBuf::from(DEFAULT_AGENCIES_FILE)];
    if let Some(dir) = env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        candidates.push(dir.join(DEFAULT_AGENCIES_FILE));
        if let Some(parent) = dir.parent() {
            candidates.push(parent.join(DEFAULT_AGENCIES_FILE));
        }
    }

    first_existing(&candidates).ok_or_else(|| {
        Error::Config(format!(
            "{DEFAULT_AGENCIES_FILE} not found (tried {})",
            candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))
    })
}

fn first_existing(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|p| p.is_file()).cloned()
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };
    debug!(path = %path.display(), "reading dotenv file");

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

        let mut val = v.trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_bool(key: &str) -> Option<bool> {
    env_str(key).map(|s| {
        matches!(
            s.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}
