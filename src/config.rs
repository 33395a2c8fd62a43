use std::path::{Path, PathBuf};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::resources::PriceClass;

/// the config file read when no path is given. It is optional.
pub const DEFAULT_CONFIG_FILE: &str = "Site.toml";

/// environment variables with this prefix override the config file, eg: `SITE_DOMAIN=abc.com`
pub const ENV_PREFIX: &str = "SITE_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    pub project: String,
    pub stack: String,
    pub region: String,
    /// used by the local engine when building ARNs.
    pub account_id: String,
    /// directory whose files get uploaded to the bucket. Not recursive.
    pub content_dir: PathBuf,
    /// physical bucket name. When left unset the engine picks one.
    pub bucket_name: Option<String>,
    pub index_document: String,
    pub error_document: String,
    pub oai_comment: String,
    pub price_class: PriceClass,
    /// domain of the hosted zone, eg: `abc.com`
    pub domain: String,
    /// name of the alias record pointing at the distribution, eg: `www.abc.com`
    pub record_name: String,
    /// where the state document gets written.
    pub output_path: PathBuf,
    /// leave every cloud computed value unknown.
    pub dry_run: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            project: "s3-static-website".into(),
            stack: "dev".into(),
            region: "us-east-1".into(),
            account_id: "000000000000".into(),
            content_dir: PathBuf::from("./content"),
            bucket_name: None,
            index_document: "index.html".into(),
            error_document: "error.html".into(),
            oai_comment: "OAI for accessing S3 bucket".into(),
            price_class: PriceClass::PriceClass100,
            domain: "abc.com".into(),
            record_name: "www.abc.com".into(),
            output_path: PathBuf::from("site-state.json"),
            dry_run: false,
        }
    }
}

impl SiteConfig {
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let file = config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        Figment::from(Serialized::defaults(SiteConfig::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX))
    }

    /// defaults, then the toml file (if it exists), then `SITE_*` env vars.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        info!(file = ?config_file.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE)), "loading site configuration");
        Ok(Self::figment(config_file).extract()?)
    }
}
