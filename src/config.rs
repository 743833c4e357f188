use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

pub const USER_ID: &str = "user_id";
pub const API_KEY: &str = "api_key";

/// Where credentials live when they are not passed on the command line.
pub trait CredentialStore {
    fn get(&self, key: &str) -> Option<String>;
}

/// Reads `GOODREADS_<KEY>` environment variables (`GOODREADS_USER_ID`, `GOODREADS_API_KEY`).
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvCredentialStore;

impl CredentialStore for EnvCredentialStore {
    fn get(&self, key: &str) -> Option<String> {
        let var = format!("GOODREADS_{}", key.to_ascii_uppercase());
        std::env::var(var)
            .ok()
            .filter(|value| !value.trim().is_empty())
    }
}

impl CredentialStore for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// An API key that never shows up in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl FromStr for ApiKey {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user_id: String,
    /// Only resolved when a phase talks to the review API.
    pub api_key: Option<ApiKey>,
}

/// Flags win over the store; a value missing from both is an error naming the flag.
pub fn resolve_credentials(
    store: &impl CredentialStore,
    user_id_flag: Option<&str>,
    api_key_flag: Option<&ApiKey>,
    need_api_key: bool,
) -> anyhow::Result<Credentials> {
    let user_id = match user_id_flag {
        Some(user_id) => user_id.to_owned(),
        None => store.get(USER_ID).ok_or_else(|| {
            anyhow::anyhow!("no user id configured; pass --user-id or set GOODREADS_USER_ID")
        })?,
    };

    let api_key = match (api_key_flag, need_api_key) {
        (Some(key), _) => Some(key.clone()),
        (None, true) => Some(store.get(API_KEY).map(ApiKey::new).ok_or_else(|| {
            anyhow::anyhow!("no API key configured; pass --api-key or set GOODREADS_API_KEY")
        })?),
        (None, false) => store.get(API_KEY).map(ApiKey::new),
    };

    Ok(Credentials { user_id, api_key })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect()
    }

    #[test]
    fn flags_override_store() -> anyhow::Result<()> {
        let store = store(&[(USER_ID, "1"), (API_KEY, "stored")]);
        let flag_key = ApiKey::new("flag");

        let creds = resolve_credentials(&store, Some("2"), Some(&flag_key), true)?;

        assert_eq!(creds.user_id, "2");
        assert_eq!(creds.api_key, Some(flag_key));
        Ok(())
    }

    #[test]
    fn store_fills_missing_flags() -> anyhow::Result<()> {
        let store = store(&[(USER_ID, "1"), (API_KEY, "stored")]);

        let creds = resolve_credentials(&store, None, None, true)?;

        assert_eq!(creds.user_id, "1");
        assert_eq!(creds.api_key.as_ref().map(ApiKey::expose), Some("stored"));
        Ok(())
    }

    #[test]
    fn missing_values_name_the_flag() {
        let err = resolve_credentials(&store(&[]), None, None, false).expect_err("no user");
        assert!(err.to_string().contains("--user-id"));

        let err = resolve_credentials(&store(&[(USER_ID, "1")]), None, None, true)
            .expect_err("no key");
        assert!(err.to_string().contains("--api-key"));
    }

    #[test]
    fn api_key_is_optional_for_status_only_runs() -> anyhow::Result<()> {
        let creds = resolve_credentials(&store(&[(USER_ID, "1")]), None, None, false)?;
        assert!(creds.api_key.is_none());
        Ok(())
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let rendered = format!("{:?}", ApiKey::new("hunter2"));
        assert!(!rendered.contains("hunter2"));
    }
}
