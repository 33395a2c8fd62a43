use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::*;

pub const ORIGIN_ACCESS_IDENTITY_TYPE: &str = "aws:cloudfront/originAccessIdentity:OriginAccessIdentity";
pub const DISTRIBUTION_TYPE: &str = "aws:cloudfront/distribution:Distribution";

#[derive(Debug, Clone, Default, Serialize)]
pub struct OriginAccessIdentity {
    pub comment: String,
}

#[derive(Debug, Clone)]
pub struct DeclaredOriginAccessIdentity {
    pub resource: Registered,
    /// the principal to grant bucket access to.
    pub iam_arn: Output<String>,
    /// what the distribution's s3 origin references.
    pub cloudfront_access_identity_path: Output<String>,
}

impl Resource for OriginAccessIdentity {
    fn type_token(&self) -> &'static str {
        ORIGIN_ACCESS_IDENTITY_TYPE
    }

    fn validate(&self) -> Result<(), String> {
        if self.comment.len() > 128 {
            return Err(format!("Origin access identity comment must be at most 128 characters, found {}", self.comment.len()));
        }
        Ok(())
    }
}

impl OriginAccessIdentity {
    pub fn declare(&self, stack: &mut Stack<'_>, name: &str) -> crate::Result<DeclaredOriginAccessIdentity> {
        let resource = stack.register(name, self)?;
        Ok(DeclaredOriginAccessIdentity {
            iam_arn: resource.output("iamArn")?,
            cloudfront_access_identity_path: resource.output("cloudfrontAccessIdentityPath")?,
            resource,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Head,
    Options,
    Put,
    Post,
    Patch,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewerProtocolPolicy {
    AllowAll,
    HttpsOnly,
    RedirectToHttps,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriceClass {
    #[default]
    #[serde(rename = "PriceClass_100")]
    PriceClass100,
    #[serde(rename = "PriceClass_200")]
    PriceClass200,
    #[serde(rename = "PriceClass_All")]
    PriceClassAll,
}

impl PriceClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceClass::PriceClass100 => "PriceClass_100",
            PriceClass::PriceClass200 => "PriceClass_200",
            PriceClass::PriceClassAll => "PriceClass_All",
        }
    }
}

impl fmt::Display for PriceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PriceClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PriceClass_100" => Ok(PriceClass::PriceClass100),
            "PriceClass_200" => Ok(PriceClass::PriceClass200),
            "PriceClass_All" => Ok(PriceClass::PriceClassAll),
            x => Err(format!("Unknown price class '{x}', expected PriceClass_100, PriceClass_200 or PriceClass_All")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CookieForward {
    None,
    Whitelist,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cookies {
    pub forward: CookieForward,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardedValues {
    pub query_string: bool,
    pub cookies: Cookies,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DefaultCacheBehavior {
    pub target_origin_id: Output<String>,
    pub viewer_protocol_policy: ViewerProtocolPolicy,
    pub allowed_methods: Vec<Method>,
    pub cached_methods: Vec<Method>,
    pub forwarded_values: ForwardedValues,
    pub min_ttl: u64,
    pub default_ttl: u64,
    pub max_ttl: u64,
}

impl DefaultCacheBehavior {
    /// https only, read-only methods, nothing forwarded to the origin,
    /// cached for an hour by default and a day at most.
    pub fn static_site(target_origin_id: &Output<String>) -> Self {
        Self {
            target_origin_id: target_origin_id.clone(),
            viewer_protocol_policy: ViewerProtocolPolicy::RedirectToHttps,
            allowed_methods: vec![Method::Get, Method::Head, Method::Options],
            cached_methods: vec![Method::Get, Method::Head],
            forwarded_values: ForwardedValues {
                query_string: false,
                cookies: Cookies { forward: CookieForward::None },
            },
            min_ttl: 0,
            default_ttl: 3600,
            max_ttl: 86400,
        }
    }

    fn validate(&self) -> Result<(), String> {
        if !(self.min_ttl <= self.default_ttl && self.default_ttl <= self.max_ttl) {
            return Err(format!(
                "Cache TTLs must satisfy min <= default <= max, found {} / {} / {}",
                self.min_ttl, self.default_ttl, self.max_ttl
            ));
        }
        // cloudfront only accepts these exact method sets
        use Method::*;
        let allowed: BTreeSet<Method> = self.allowed_methods.iter().copied().collect();
        let valid_allowed = [
            vec![Get, Head],
            vec![Get, Head, Options],
            vec![Get, Head, Options, Put, Post, Patch, Delete],
        ];
        if !valid_allowed.iter().any(|set| set.iter().copied().collect::<BTreeSet<_>>() == allowed) {
            return Err(format!("Invalid allowed methods {:?}", self.allowed_methods));
        }
        let cached: BTreeSet<Method> = self.cached_methods.iter().copied().collect();
        if !cached.is_subset(&allowed) || !cached.contains(&Get) || !cached.contains(&Head) {
            return Err(format!(
                "Cached methods {:?} must include GET and HEAD and be a subset of the allowed methods {:?}",
                self.cached_methods, self.allowed_methods
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct S3OriginConfig {
    pub origin_access_identity: Output<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Origin {
    pub origin_id: Output<String>,
    pub domain_name: Output<String>,
    pub s3_origin_config: S3OriginConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GeoRestrictionType {
    None,
    Whitelist,
    Blacklist,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoRestriction {
    pub restriction_type: GeoRestrictionType,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Restrictions {
    pub geo_restriction: GeoRestriction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerCertificate {
    pub cloudfront_default_certificate: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub origins: Vec<Origin>,
    pub enabled: bool,
    pub default_root_object: String,
    pub default_cache_behavior: DefaultCacheBehavior,
    pub price_class: PriceClass,
    pub restrictions: Restrictions,
    pub viewer_certificate: ViewerCertificate,
}

#[derive(Debug, Clone)]
pub struct DeclaredDistribution {
    pub resource: Registered,
    pub id: Output<String>,
    pub arn: Output<String>,
    pub domain_name: Output<String>,
    pub hosted_zone_id: Output<String>,
}

impl Distribution {
    /// a distribution serving `bucket` through `identity`, so the
    /// bucket itself never has to be public.
    pub fn s3_website(
        bucket: &DeclaredBucket,
        identity: &DeclaredOriginAccessIdentity,
        default_root_object: &str,
        price_class: PriceClass,
    ) -> Self {
        let origin = Origin {
            origin_id: bucket.arn.clone(),
            domain_name: bucket.bucket_regional_domain_name.clone(),
            s3_origin_config: S3OriginConfig {
                origin_access_identity: identity.cloudfront_access_identity_path.clone(),
            },
        };
        Self {
            origins: vec![origin],
            enabled: true,
            default_root_object: default_root_object.to_string(),
            default_cache_behavior: DefaultCacheBehavior::static_site(&bucket.arn),
            price_class,
            restrictions: Restrictions {
                geo_restriction: GeoRestriction {
                    restriction_type: GeoRestrictionType::None,
                    locations: vec![],
                },
            },
            viewer_certificate: ViewerCertificate {
                cloudfront_default_certificate: true,
            },
        }
    }

    pub fn declare(&self, stack: &mut Stack<'_>, name: &str) -> crate::Result<DeclaredDistribution> {
        let resource = stack.register(name, self)?;
        Ok(DeclaredDistribution {
            id: resource.output("id")?,
            arn: resource.output("arn")?,
            domain_name: resource.output("domainName")?,
            hosted_zone_id: resource.output("hostedZoneId")?,
            resource,
        })
    }
}

impl Resource for Distribution {
    fn type_token(&self) -> &'static str {
        DISTRIBUTION_TYPE
    }

    fn depends_on(&self) -> BTreeSet<String> {
        let mut deps = self.default_cache_behavior.target_origin_id.depends_on();
        for origin in &self.origins {
            deps.extend(origin.origin_id.depends_on());
            deps.extend(origin.domain_name.depends_on());
            deps.extend(origin.s3_origin_config.origin_access_identity.depends_on());
        }
        deps
    }

    fn validate(&self) -> Result<(), String> {
        if self.origins.is_empty() {
            return Err("Must provide at least one origin to cloudfront distribution".to_string());
        }
        if self.default_root_object.starts_with('/') {
            return Err(format!("Default root object {:?} cannot start with a slash", self.default_root_object));
        }
        if let Some(target) = self.default_cache_behavior.target_origin_id.value() {
            let known_ids: Vec<&String> = self.origins.iter().filter_map(|o| o.origin_id.value()).collect();
            // only checkable once every origin id is resolved
            if known_ids.len() == self.origins.len() && !known_ids.contains(&target) {
                return Err(format!("Default cache behavior targets unknown origin {target:?}"));
            }
        }
        if self.restrictions.geo_restriction.restriction_type == GeoRestrictionType::None
            && !self.restrictions.geo_restriction.locations.is_empty()
        {
            return Err("Geo restriction type none cannot list locations".to_string());
        }
        self.default_cache_behavior.validate()
    }
}
