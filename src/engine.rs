//! the seam between the site description and whatever provisions it.
//!
//! The description registers each resource with an [`Engine`] and gets back the
//! attributes the engine resolved for it. A real engine would diff against live state
//! and call the AWS APIs; [`LocalEngine`] just assigns the values AWS would assign, in a
//! deterministic way, so a description can be evaluated and inspected offline.

use std::collections::BTreeMap;

use base64::{engine::general_purpose, Engine as _};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::Result;
use crate::output::UNKNOWN_KEY;
use crate::resources::{
    BUCKET_OBJECT_TYPE, BUCKET_POLICY_TYPE, BUCKET_TYPE, BUCKET_WEBSITE_CONFIGURATION_TYPE,
    DISTRIBUTION_TYPE, ORIGIN_ACCESS_IDENTITY_TYPE, RECORD_TYPE, ZONE_TYPE,
};

/// hosted zone that every cloudfront distribution lives in.
pub const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

/// resolved attributes of a resource. `None` means the engine doesn't know the value yet.
pub type Attributes = BTreeMap<String, Option<Value>>;

#[derive(Debug, Clone, Copy)]
pub struct RegisterRequest<'a> {
    pub urn: &'a str,
    pub type_token: &'a str,
    pub name: &'a str,
    /// serialized properties. unknown inputs appear as `{"$unknown": [..]}`
    pub properties: &'a Value,
}

pub trait Engine {
    fn register(&mut self, request: &RegisterRequest<'_>) -> Result<Attributes>;
}

const UPPER_ALNUM: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const LOWER_ALNUM: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const HEX: &[u8] = b"0123456789abcdef";

#[derive(Debug, Clone)]
pub struct LocalEngine {
    pub region: String,
    pub account_id: String,
    /// when set, every value the cloud would compute is left unknown,
    /// like a preview before anything is applied.
    pub dry_run: bool,
    registered: usize,
}

impl LocalEngine {
    pub fn new(region: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            account_id: account_id.into(),
            dry_run: false,
            registered: 0,
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// number of resources registered so far.
    pub fn registered(&self) -> usize {
        self.registered
    }

    fn computed(&self, req: &RegisterRequest<'_>, inputs: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        let urn = req.urn;
        let input_str = |key: &str| -> Option<String> {
            inputs.get(key).and_then(Value::as_str).map(str::to_string)
        };
        match req.type_token {
            BUCKET_TYPE => {
                let bucket = input_str("bucket").unwrap_or_else(|| auto_name(req.name, urn));
                out.insert("id".into(), bucket.clone().into());
                out.insert("arn".into(), format!("arn:aws:s3:::{bucket}").into());
                out.insert("bucketDomainName".into(), format!("{bucket}.s3.amazonaws.com").into());
                out.insert(
                    "bucketRegionalDomainName".into(),
                    format!("{bucket}.s3.{}.amazonaws.com", self.region).into(),
                );
                out.insert("region".into(), self.region.clone().into());
                out.insert("bucket".into(), bucket.into());
            }
            BUCKET_WEBSITE_CONFIGURATION_TYPE => {
                if let Some(bucket) = input_str("bucket") {
                    let domain = format!("s3-website-{}.amazonaws.com", self.region);
                    out.insert("id".into(), bucket.clone().into());
                    out.insert("websiteEndpoint".into(), format!("{bucket}.{domain}").into());
                    out.insert("websiteDomain".into(), domain.into());
                }
            }
            BUCKET_POLICY_TYPE => {
                if let Some(bucket) = input_str("bucket") {
                    out.insert("id".into(), bucket.into());
                }
            }
            BUCKET_OBJECT_TYPE => {
                if let Some(key) = input_str("key") {
                    out.insert("id".into(), key.into());
                }
                if let Some(md5) = input_str("contentMd5") {
                    // s3 etags for single part uploads are the hex md5 of the body
                    if let Ok(bytes) = general_purpose::STANDARD.decode(md5) {
                        out.insert("etag".into(), hex::encode(bytes).into());
                    }
                }
            }
            ORIGIN_ACCESS_IDENTITY_TYPE => {
                let id = format!("E{}", pseudo_id(urn, 13, UPPER_ALNUM));
                out.insert(
                    "iamArn".into(),
                    format!("arn:aws:iam::cloudfront:user/CloudFront Origin Access Identity {id}").into(),
                );
                out.insert(
                    "cloudfrontAccessIdentityPath".into(),
                    format!("origin-access-identity/cloudfront/{id}").into(),
                );
                out.insert(
                    "s3CanonicalUserId".into(),
                    pseudo_id(&format!("{urn}#canonical"), 64, HEX).into(),
                );
                out.insert("etag".into(), pseudo_id(&format!("{urn}#etag"), 14, UPPER_ALNUM).into());
                out.insert("id".into(), id.into());
            }
            DISTRIBUTION_TYPE => {
                let id = format!("E{}", pseudo_id(urn, 13, UPPER_ALNUM));
                let domain = format!("d{}.cloudfront.net", pseudo_id(&format!("{urn}#domain"), 13, LOWER_ALNUM));
                out.insert(
                    "arn".into(),
                    format!("arn:aws:cloudfront::{}:distribution/{id}", self.account_id).into(),
                );
                out.insert("domainName".into(), domain.into());
                out.insert("hostedZoneId".into(), CLOUDFRONT_HOSTED_ZONE_ID.into());
                out.insert("status".into(), "Deployed".into());
                out.insert("etag".into(), pseudo_id(&format!("{urn}#etag"), 14, UPPER_ALNUM).into());
                out.insert("id".into(), id.into());
            }
            ZONE_TYPE => {
                let zone_id = format!("Z{}", pseudo_id(urn, 20, UPPER_ALNUM));
                out.insert("arn".into(), format!("arn:aws:route53:::hostedzone/{zone_id}").into());
                out.insert("nameServers".into(), name_servers(urn).into());
                out.insert("id".into(), zone_id.clone().into());
                out.insert("zoneId".into(), zone_id.into());
            }
            RECORD_TYPE => {
                if let Some(name) = input_str("name") {
                    if let (Some(zone_id), Some(ty)) = (input_str("zoneId"), input_str("type")) {
                        out.insert("id".into(), format!("{zone_id}_{name}_{ty}").into());
                    }
                    out.insert("fqdn".into(), name.into());
                }
            }
            _ => {
                out.insert("id".into(), req.name.into());
            }
        }
        out
    }
}

impl Engine for LocalEngine {
    fn register(&mut self, req: &RegisterRequest<'_>) -> Result<Attributes> {
        debug!(urn = req.urn, dry_run = self.dry_run, "registering resource");
        let inputs = match req.properties {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        let mut attributes = Attributes::new();
        let mut known_inputs = Map::new();
        for (key, value) in inputs {
            if is_unknown(&value) {
                attributes.insert(key, None);
            } else {
                known_inputs.insert(key.clone(), value.clone());
                attributes.insert(key, Some(value));
            }
        }
        for (key, value) in self.computed(req, &known_inputs) {
            // a preview knows what was passed in, but nothing the cloud computes
            let value = if self.dry_run && !known_inputs.contains_key(&key) {
                None
            } else {
                Some(value)
            };
            attributes.insert(key, value);
        }
        self.registered += 1;
        Ok(attributes)
    }
}

fn is_unknown(value: &Value) -> bool {
    match value {
        Value::Object(map) => map.contains_key(UNKNOWN_KEY),
        _ => false,
    }
}

/// engine assigned physical name: the logical name plus a short
/// hash of the urn, eg: `sitebucket-0a1b2c3`
pub fn auto_name(name: &str, urn: &str) -> String {
    let mut base: String = name
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    // leave room for the suffix within the 63 char s3 limit
    base.truncate(55);
    let mut hash_str = format!("{:08x}", adler::adler32_slice(urn.as_bytes()));
    hash_str.truncate(7);
    format!("{base}-{hash_str}")
}

fn pseudo_id(seed: &str, len: usize, alphabet: &[u8]) -> String {
    let mut state = adler::adler32_slice(seed.as_bytes());
    let mut out = String::with_capacity(len);
    for i in 0..len {
        state = state.wrapping_mul(0x9E37_79B1).rotate_left(13) ^ (i as u32);
        out.push(alphabet[(state % alphabet.len() as u32) as usize] as char);
    }
    out
}

fn name_servers(urn: &str) -> Vec<String> {
    let seed = adler::adler32_slice(urn.as_bytes());
    ["com", "net", "org", "co.uk"]
        .iter()
        .enumerate()
        .map(|(i, tld)| {
            let mixed = seed.wrapping_mul(0x9E37_79B1).rotate_left(7 * (i as u32 + 1));
            format!("ns-{}.awsdns-{:02}.{tld}", mixed % 2048, (mixed >> 11) % 64)
        })
        .collect()
}
