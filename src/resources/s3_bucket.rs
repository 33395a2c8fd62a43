use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::*;

pub const BUCKET_TYPE: &str = "aws:s3/bucket:Bucket";
pub const BUCKET_WEBSITE_CONFIGURATION_TYPE: &str =
    "aws:s3/bucketWebsiteConfigurationV2:BucketWebsiteConfigurationV2";
pub const BUCKET_POLICY_TYPE: &str = "aws:s3/bucketPolicy:BucketPolicy";

pub const POLICY_VERSION: &str = "2012-10-17";

pub const VALID_AWS_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "ca-central-1",
    "eu-north-1",
    "eu-west-3",
    "eu-west-2",
    "eu-west-1",
    "eu-central-1",
    "eu-south-1",
    "ap-south-1",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-east-1",
    "sa-east-1",
    "cn-north-1",
    "cn-northwest-1",
    "us-gov-east-1",
    "us-gov-west-1",
    "me-south-1",
    "af-south-1",
];

pub fn validate_region(region: &str) -> Result<(), String> {
    if !VALID_AWS_REGIONS.contains(&region) {
        return Err(format!("Invalid region code {:?}\nMust be one of {:?}", region, VALID_AWS_REGIONS));
    }
    Ok(())
}

pub fn validate_bucket_name(bucket_name: &str) -> Result<(), String> {
    if bucket_name.len() > 63 || bucket_name.len() < 3 {
        return Err(format!("Invalid bucket name {:?}\nMust be between 3 and 63 characters", bucket_name));
    }
    let valid_char_check = |c: char| -> bool {
        c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-'
    };
    if !bucket_name.chars().all(valid_char_check) {
        return Err(format!("Invalid bucket name {:?}\nMay only contain lowercase letters, numbers, dots, and dashes", bucket_name));
    }
    let first_last_ok = bucket_name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && bucket_name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if !first_last_ok {
        return Err(format!("Invalid bucket name {:?}\nFirst and last character must be either lowercase letter, or number", bucket_name));
    }
    if bucket_name.contains("..") {
        return Err(format!("Invalid bucket name {:?}\nMay not contain two consecutive dots", bucket_name));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// physical name of the bucket. Must be globally unique.
    /// Leave unset to let the engine generate one from the logical name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,
    /// delete every object in the bucket when the bucket itself is deleted.
    /// without this, destroying a non-empty bucket fails.
    pub force_destroy: bool,
}

#[derive(Debug, Clone)]
pub struct DeclaredBucket {
    pub resource: Registered,
    pub bucket: Output<String>,
    pub arn: Output<String>,
    pub bucket_regional_domain_name: Output<String>,
}

impl Resource for Bucket {
    fn type_token(&self) -> &'static str {
        BUCKET_TYPE
    }

    fn validate(&self) -> Result<(), String> {
        match &self.bucket {
            Some(name) => validate_bucket_name(name),
            None => Ok(()),
        }
    }
}

impl Bucket {
    pub fn declare(&self, stack: &mut Stack<'_>, name: &str) -> crate::Result<DeclaredBucket> {
        let resource = stack.register(name, self)?;
        Ok(DeclaredBucket {
            bucket: resource.output("bucket")?,
            arn: resource.output("arn")?,
            bucket_regional_domain_name: resource.output("bucketRegionalDomainName")?,
            resource,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDocument {
    pub suffix: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorDocument {
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketWebsiteConfiguration {
    pub bucket: Output<String>,
    pub index_document: IndexDocument,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_document: Option<ErrorDocument>,
}

impl BucketWebsiteConfiguration {
    pub fn new(bucket: &Output<String>, index_document: &str, error_document: &str) -> Self {
        Self {
            bucket: bucket.clone(),
            index_document: IndexDocument { suffix: index_document.to_string() },
            error_document: Some(ErrorDocument { key: error_document.to_string() }),
        }
    }

    pub fn declare(&self, stack: &mut Stack<'_>, name: &str) -> crate::Result<Registered> {
        stack.register(name, self)
    }
}

impl Resource for BucketWebsiteConfiguration {
    fn type_token(&self) -> &'static str {
        BUCKET_WEBSITE_CONFIGURATION_TYPE
    }

    fn depends_on(&self) -> BTreeSet<String> {
        self.bucket.depends_on()
    }

    fn validate(&self) -> Result<(), String> {
        let suffix = &self.index_document.suffix;
        if suffix.is_empty() || suffix.contains('/') {
            return Err(format!("Invalid index document suffix {suffix:?}\nMust be non-empty and cannot contain a slash"));
        }
        if let Some(error_document) = &self.error_document {
            if error_document.key.is_empty() {
                return Err("Error document key cannot be empty".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    #[serde(rename = "AWS")]
    pub aws: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub effect: String,
    pub principal: Principal,
    pub action: String,
    pub resource: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

pub fn objects_arn(bucket: &str) -> String {
    format!("arn:aws:s3:::{bucket}/*")
}

/// a policy allowing exactly `principal_arn` to read every object in `bucket`.
pub fn read_only_policy(bucket: &str, principal_arn: &str) -> PolicyDocument {
    PolicyDocument {
        version: POLICY_VERSION.to_string(),
        statement: vec![Statement {
            effect: "Allow".to_string(),
            principal: Principal { aws: principal_arn.to_string() },
            action: "s3:GetObject".to_string(),
            resource: objects_arn(bucket),
        }],
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BucketPolicy {
    pub bucket: Output<String>,
    /// the policy document, as a json string.
    pub policy: Output<String>,
}

impl BucketPolicy {
    /// only composed once both the bucket name and the identity arn are known.
    /// Until then the policy itself stays unknown.
    pub fn for_origin_access(bucket: &Output<String>, principal_arn: &Output<String>) -> crate::Result<Self> {
        let policy = all((bucket.clone(), principal_arn.clone())).try_apply(|(bucket, arn)| {
            serde_json::to_string(&read_only_policy(&bucket, &arn))
        })?;
        Ok(Self {
            bucket: bucket.clone(),
            policy,
        })
    }

    pub fn declare(&self, stack: &mut Stack<'_>, name: &str) -> crate::Result<Registered> {
        stack.register(name, self)
    }
}

impl Resource for BucketPolicy {
    fn type_token(&self) -> &'static str {
        BUCKET_POLICY_TYPE
    }

    fn depends_on(&self) -> BTreeSet<String> {
        let mut deps = self.bucket.depends_on();
        deps.extend(self.policy.depends_on());
        deps
    }

    fn validate(&self) -> Result<(), String> {
        let (bucket, policy) = match (self.bucket.value(), self.policy.value()) {
            (Some(b), Some(p)) => (b, p),
            _ => return Ok(()),
        };
        let doc: PolicyDocument = serde_json::from_str(policy)
            .map_err(|e| format!("Policy is not a valid policy document: {e}"))?;
        let bucket_arn = format!("arn:aws:s3:::{bucket}");
        let objects = objects_arn(bucket);
        for statement in &doc.statement {
            if statement.resource != bucket_arn && statement.resource != objects {
                return Err(format!(
                    "Policy statement resource {:?} doesn't belong to bucket {bucket:?}",
                    statement.resource
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::LocalEngine;
    use serde_json::json;

    #[test]
    fn policy_grants_get_object_to_one_principal() {
        let doc = read_only_policy("my-bucket", "arn:aws:iam::cloudfront:user/CloudFront Origin Access Identity E1");
        let v = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            v,
            json!({
                "Version": "2012-10-17",
                "Statement": [{
                    "Effect": "Allow",
                    "Principal": { "AWS": "arn:aws:iam::cloudfront:user/CloudFront Origin Access Identity E1" },
                    "Action": "s3:GetObject",
                    "Resource": "arn:aws:s3:::my-bucket/*",
                }]
            })
        );
    }

    #[test]
    fn policy_is_deterministic_for_odd_bucket_names() {
        let long = "a".repeat(63);
        for bucket in ["abc", "my.dotted.bucket", long.as_str(), "we\"ird"] {
            let a = BucketPolicy::for_origin_access(&bucket.into(), &"arn:x".into()).unwrap();
            let b = BucketPolicy::for_origin_access(&bucket.into(), &"arn:x".into()).unwrap();
            assert_eq!(a.policy.value(), b.policy.value());
            let doc: PolicyDocument = serde_json::from_str(a.policy.value().unwrap()).unwrap();
            assert_eq!(doc.statement.len(), 1);
            assert_eq!(doc.statement[0].principal.aws, "arn:x");
            assert_eq!(doc.statement[0].resource, format!("arn:aws:s3:::{bucket}/*"));
        }
    }

    #[test]
    fn unresolved_inputs_leave_policy_unknown() {
        let mut engine = LocalEngine::new("us-east-1", "000000000000").dry_run(true);
        let mut stack = Stack::new("site", "dev", &mut engine).unwrap();
        let bucket = Bucket::default().declare(&mut stack, "siteBucket").unwrap();
        assert!(!bucket.bucket.is_known());
        let policy = BucketPolicy::for_origin_access(&bucket.bucket, &"arn:x".into()).unwrap();
        assert!(!policy.policy.is_known());
        let v = serde_json::to_value(&policy).unwrap();
        assert_eq!(v["policy"], json!({ "$unknown": ["siteBucket.bucket"] }));
    }

    #[test]
    fn policy_for_another_bucket_is_rejected() {
        let policy = BucketPolicy {
            bucket: "bucket-a".into(),
            policy: serde_json::to_string(&read_only_policy("bucket-b", "arn:x")).unwrap().into(),
        };
        assert!(policy.validate().unwrap_err().contains("doesn't belong to bucket"));
    }

    #[test]
    fn bucket_names() {
        assert!(validate_bucket_name("my-site-bucket").is_ok());
        assert!(validate_bucket_name("ab").unwrap_err().contains("between 3 and 63"));
        assert!(validate_bucket_name("My-Bucket").unwrap_err().contains("lowercase"));
        assert!(validate_bucket_name("something..exact").unwrap_err().contains("two consecutive dots"));
        assert!(validate_bucket_name("-bucket").unwrap_err().contains("First and last character must be"));
        let mut engine = LocalEngine::new("us-east-1", "000000000000");
        let mut stack = Stack::new("site", "dev", &mut engine).unwrap();
        let bucket = Bucket { bucket: Some("Bad_Name".into()), ..Default::default() };
        assert!(matches!(bucket.declare(&mut stack, "b"), Err(crate::Error::Validation { .. })));
    }

    #[test]
    fn regions() {
        assert!(validate_region("us-east-1").is_ok());
        assert!(validate_region("mars-north-1").is_err());
    }

    #[test]
    fn website_suffix_cannot_have_slash() {
        let conf = BucketWebsiteConfiguration::new(&"b".into(), "pages/index.html", "error.html");
        assert!(conf.validate().is_err());
        let conf = BucketWebsiteConfiguration::new(&"b".into(), "index.html", "error.html");
        assert!(conf.validate().is_ok());
    }
}
