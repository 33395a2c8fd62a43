//! Declarative description of a static website on AWS: a private S3 bucket holding the
//! site content, served through CloudFront via an origin access identity, with a Route53
//! alias record pointing a friendly name at the distribution.
//!
//! [`evaluate`] runs the whole description against the offline [`engine::LocalEngine`]
//! and returns the resulting [`stack::StackDocument`].

pub mod config;
pub mod content_type;
pub mod engine;
pub mod error;
pub mod output;
pub mod resources;
pub mod stack;

pub use error::{Error, Result};

use config::SiteConfig;
use engine::LocalEngine;
use stack::{Stack, StackDocument};

pub fn evaluate(conf: &SiteConfig) -> Result<StackDocument> {
    let mut engine = LocalEngine::new(&conf.region, &conf.account_id).dry_run(conf.dry_run);
    let mut stack = Stack::new(&conf.project, &conf.stack, &mut engine)?;
    resources::declare_site(&mut stack, conf)?;
    Ok(stack.finish())
}
