//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults. The
//! client secret is loaded from the BOOTH_CLIENT_SECRET env var or
//! `client_secret_file`, never stored in the TOML directly to avoid leaking
//! secrets. Defaults target the Google Drive photo-booth demo.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use serde::Deserialize;

use booth_auth::OAuthConfig;
use booth_upload::UploadTarget;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub oauth: OAuthSection,
    #[serde(default)]
    pub upload: UploadSection,
    #[serde(default)]
    pub callback: CallbackSection,
}

/// OAuth client settings
#[derive(Debug, Deserialize)]
pub struct OAuthSection {
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the
    /// BOOTH_CLIENT_SECRET env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default = "default_authorize_endpoint")]
    pub authorize_endpoint: String,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    /// Defaults to the loopback listener's address when omitted
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Opt-in: disables callback CSRF protection for providers that do not
    /// echo `state` back
    #[serde(default)]
    pub skip_state_check: bool,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
}

/// Upload destination settings
#[derive(Debug, Deserialize)]
pub struct UploadSection {
    #[serde(default = "default_upload_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_field_name")]
    pub field_name: String,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_mime_type")]
    pub mime_type: String,
}

/// Loopback redirect listener settings
#[derive(Debug, Deserialize)]
pub struct CallbackSection {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

fn default_authorize_endpoint() -> String {
    "https://accounts.google.com/o/oauth2/auth".into()
}

fn default_token_endpoint() -> String {
    "https://accounts.google.com/o/oauth2/token".into()
}

fn default_scopes() -> Vec<String> {
    vec!["https://www.googleapis.com/auth/drive".into()]
}

fn default_upload_endpoint() -> String {
    "https://www.googleapis.com/upload/drive/v2/files".into()
}

fn default_field_name() -> String {
    "file".into()
}

fn default_file_name() -> String {
    "incognito_photo".into()
}

fn default_mime_type() -> String {
    "image/jpg".into()
}

fn default_timeout() -> u64 {
    30
}

fn default_listen_addr() -> SocketAddr {
    ([127, 0, 0, 1], 7878).into()
}

impl Default for UploadSection {
    fn default() -> Self {
        Self {
            endpoint: default_upload_endpoint(),
            field_name: default_field_name(),
            file_name: default_file_name(),
            mime_type: default_mime_type(),
        }
    }
}

impl Default for CallbackSection {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables and validate.
    ///
    /// Client secret resolution order:
    /// 1. BOOTH_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(secret) = std::env::var("BOOTH_CLIENT_SECRET") {
            config.oauth.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.oauth.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.oauth.client_secret = Some(Secret::new(secret));
            }
        }

        if !config.upload.endpoint.starts_with("http://")
            && !config.upload.endpoint.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "upload endpoint must start with http:// or https://, got: {}",
                config.upload.endpoint
            )));
        }

        config.oauth_config().validate()?;
        Ok(config)
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("config.toml")
    }

    /// The OAuth config for the core, redirect URI defaulted to the
    /// loopback listener.
    pub fn oauth_config(&self) -> OAuthConfig {
        let redirect_uri = self
            .oauth
            .redirect_uri
            .clone()
            .unwrap_or_else(|| format!("http://{}/oauth2redirect", self.callback.listen_addr));

        let mut config = OAuthConfig::new(
            self.oauth.client_id.clone(),
            self.oauth.authorize_endpoint.clone(),
            self.oauth.token_endpoint.clone(),
            redirect_uri,
            self.oauth.scopes.clone(),
        )
        .with_request_timeout(Duration::from_secs(self.oauth.request_timeout_secs));

        if let Some(secret) = &self.oauth.client_secret {
            config = config.with_client_secret(secret.clone());
        }
        if self.oauth.skip_state_check {
            config = config.with_skip_state_check();
        }
        config
    }

    pub fn upload_target(&self) -> UploadTarget {
        UploadTarget {
            endpoint: self.upload.endpoint.clone(),
            field_name: self.upload.field_name.clone(),
            file_name: self.upload.file_name.clone(),
            mime_type: self.upload.mime_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn minimal_config_gets_drive_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[oauth]
client_id = "1019735259146.apps.googleusercontent.com"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.oauth.authorize_endpoint,
            "https://accounts.google.com/o/oauth2/auth"
        );
        assert_eq!(
            config.upload.endpoint,
            "https://www.googleapis.com/upload/drive/v2/files"
        );
        assert_eq!(config.upload.field_name, "file");
        assert_eq!(config.upload.file_name, "incognito_photo");
        assert_eq!(config.upload.mime_type, "image/jpg");
        assert_eq!(config.callback.listen_addr.port(), 7878);
        assert!(!config.oauth.skip_state_check);
    }

    #[test]
    fn redirect_uri_defaults_to_loopback_listener() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[oauth]
client_id = "abc"

[callback]
listen_addr = "127.0.0.1:9099"
"#,
        );

        let config = Config::load(&path).unwrap();
        let oauth = config.oauth_config();
        assert_eq!(oauth.redirect_uri, "http://127.0.0.1:9099/oauth2redirect");
    }

    #[test]
    fn explicit_redirect_uri_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[oauth]
client_id = "abc"
redirect_uri = "com.zm1caps.Incognito:/oauth2Callback"
"#,
        );

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.oauth_config().redirect_uri,
            "com.zm1caps.Incognito:/oauth2Callback"
        );
    }

    #[test]
    fn client_secret_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let secret_path = dir.path().join("secret");
        std::fs::write(&secret_path, "s3cret\n").unwrap();
        let path = write_config(
            &dir,
            &format!(
                r#"
[oauth]
client_id = "abc"
client_secret_file = "{}"
"#,
                secret_path.display()
            ),
        );

        let config = Config::load(&path).unwrap();
        let secret = config.oauth.client_secret.expect("secret must be loaded");
        assert_eq!(secret.expose(), "s3cret");
    }

    #[test]
    fn missing_client_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[oauth]
client_id = ""
"#,
        );
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn non_http_upload_endpoint_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[oauth]
client_id = "abc"

[upload]
endpoint = "gopher://drive"
"#,
        );
        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("upload endpoint"), "got: {err}");
    }

    #[test]
    fn resolve_path_prefers_cli_argument() {
        let path = Config::resolve_path(Some("/etc/booth/config.toml"));
        assert_eq!(path, PathBuf::from("/etc/booth/config.toml"));
    }
}
