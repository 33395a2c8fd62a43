use super::*;
use crate::config::SiteConfig;
use crate::error::Error;

/// what the operator gets back after the site is applied.
#[derive(Debug, Clone)]
pub struct SiteOutputs {
    pub bucket_name: Output<String>,
    pub cdn_url: Output<String>,
    pub name_servers: Output<Vec<String>>,
}

/// logical name of the hosted zone, eg: `abc.com` -> `abc-com-zone`
pub fn zone_resource_name(domain: &str) -> String {
    format!("{}-zone", domain.trim_end_matches('.').replace('.', "-"))
}

/// declares the whole site: a private bucket with the site content, a cloudfront
/// distribution reading it through an origin access identity, and a route53 alias
/// pointing `record_name` at the distribution.
pub fn declare_site(stack: &mut Stack<'_>, conf: &SiteConfig) -> crate::Result<SiteOutputs> {
    validate_region(&conf.region).map_err(|e| Error::validation("config", e))?;

    let bucket = Bucket {
        bucket: conf.bucket_name.clone(),
        ..Default::default()
    }
    .declare(stack, "siteBucket")?;

    BucketWebsiteConfiguration::new(&bucket.bucket, &conf.index_document, &conf.error_document)
        .declare(stack, "siteBucketWebsiteConfig")?;

    let identity = OriginAccessIdentity {
        comment: conf.oai_comment.clone(),
    }
    .declare(stack, "originAccessIdentity")?;

    BucketPolicy::for_origin_access(&bucket.bucket, &identity.iam_arn)?.declare(stack, "bucketPolicy")?;

    upload_directory(stack, &bucket.bucket, &conf.content_dir)?;

    let cdn = Distribution::s3_website(&bucket, &identity, &conf.index_document, conf.price_class)
        .declare(stack, "cdn")?;

    let zone = Zone::new(&conf.domain).declare(stack, &zone_resource_name(&conf.domain))?;

    Record::alias(&zone, &conf.record_name, RecordType::A, Alias::to_distribution(&cdn))
        .declare(stack, "cdnAliasRecord")?;

    let outputs = SiteOutputs {
        bucket_name: bucket.bucket,
        cdn_url: cdn.domain_name,
        name_servers: zone.name_servers,
    };
    stack.export("bucketName", &outputs.bucket_name)?;
    stack.export("cdnUrl", &outputs.cdn_url)?;
    stack.export("nameServers", &outputs.name_servers)?;
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::engine::LocalEngine;
    use crate::stack::StackDocument;
    use serde_json::json;

    fn site_dir(files: &[&str]) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        for f in files {
            std::fs::write(dir.path().join(f), format!("contents of {f}")).unwrap();
        }
        dir
    }

    fn conf(content_dir: &Path) -> SiteConfig {
        SiteConfig {
            content_dir: content_dir.to_path_buf(),
            ..Default::default()
        }
    }

    fn evaluate(conf: &SiteConfig, dry_run: bool) -> (SiteOutputs, StackDocument) {
        let mut engine = LocalEngine::new(&conf.region, &conf.account_id).dry_run(dry_run);
        let mut stack = Stack::new(&conf.project, &conf.stack, &mut engine).unwrap();
        let outputs = declare_site(&mut stack, conf).unwrap();
        (outputs, stack.finish())
    }

    #[test]
    fn index_and_style_site() {
        let dir = site_dir(&["index.html", "style.css"]);
        let (_, doc) = evaluate(&conf(dir.path()), false);
        let objects: Vec<_> = doc.resources_of_type(BUCKET_OBJECT_TYPE).collect();
        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].properties["key"], "index.html");
        assert_eq!(objects[0].properties["contentType"], "text/html");
        assert_eq!(objects[1].properties["key"], "style.css");
        assert_eq!(objects[1].properties["contentType"], "text/css");
        // bucket, website config, oai, policy, 2 objects, cdn, zone, record
        assert_eq!(doc.resources.len(), 9);
    }

    #[test]
    fn empty_site_has_no_objects() {
        let dir = site_dir(&[]);
        let (_, doc) = evaluate(&conf(dir.path()), false);
        assert_eq!(doc.resources_of_type(BUCKET_OBJECT_TYPE).count(), 0);
        assert_eq!(doc.resources.len(), 7);
    }

    #[test]
    fn policy_matches_bucket_and_identity() {
        let dir = site_dir(&["index.html"]);
        let (outputs, doc) = evaluate(&conf(dir.path()), false);
        let bucket_name = outputs.bucket_name.value().unwrap();
        let oai = doc.resource(ORIGIN_ACCESS_IDENTITY_TYPE, "originAccessIdentity").unwrap();
        let iam_arn = oai.attributes["iamArn"].clone().unwrap();
        let policy = doc.resource(BUCKET_POLICY_TYPE, "bucketPolicy").unwrap();
        assert_eq!(policy.properties["bucket"], json!(bucket_name));
        let doc: PolicyDocument = serde_json::from_str(policy.properties["policy"].as_str().unwrap()).unwrap();
        assert_eq!(doc, read_only_policy(bucket_name, iam_arn.as_str().unwrap()));
        assert_eq!(policy.depends_on.len(), 2);
    }

    #[test]
    fn alias_record_targets_the_distribution() {
        let dir = site_dir(&["index.html"]);
        let (outputs, doc) = evaluate(&conf(dir.path()), false);
        let cdn = doc.resource(DISTRIBUTION_TYPE, "cdn").unwrap();
        let record = doc.resource(RECORD_TYPE, "cdnAliasRecord").unwrap();
        assert_eq!(record.properties["name"], "www.abc.com");
        assert_eq!(record.properties["type"], "A");
        let alias = &record.properties["aliases"][0];
        assert_eq!(Some(&alias["name"]), cdn.attributes["domainName"].as_ref());
        assert_eq!(Some(&alias["zoneId"]), cdn.attributes["hostedZoneId"].as_ref());
        assert_eq!(alias["evaluateTargetHealth"], false);
        assert!(record.properties.get("records").is_none());
        assert_eq!(Some(json!(outputs.cdn_url.value())), cdn.attributes["domainName"]);
        let zone = doc.resource(ZONE_TYPE, "abc-com-zone").unwrap();
        assert_eq!(zone.properties["name"], "abc.com");
    }

    #[test]
    fn price_class_doesnt_change_record_wiring() {
        let dir = site_dir(&["index.html"]);
        let mut all_conf = conf(dir.path());
        all_conf.price_class = PriceClass::PriceClassAll;
        let (_, a) = evaluate(&conf(dir.path()), false);
        let (_, b) = evaluate(&all_conf, false);
        let cdn_a = a.resource(DISTRIBUTION_TYPE, "cdn").unwrap();
        let cdn_b = b.resource(DISTRIBUTION_TYPE, "cdn").unwrap();
        assert_ne!(cdn_a.properties["priceClass"], cdn_b.properties["priceClass"]);
        let rec_a = a.resource(RECORD_TYPE, "cdnAliasRecord").unwrap();
        let rec_b = b.resource(RECORD_TYPE, "cdnAliasRecord").unwrap();
        assert_eq!(rec_a.properties, rec_b.properties);
        assert_eq!(rec_a.depends_on, rec_b.depends_on);
        assert!(rec_a.depends_on.contains(&cdn_a.urn));
    }

    #[test]
    fn distribution_serves_bucket_through_identity() {
        let dir = site_dir(&["index.html"]);
        let (_, doc) = evaluate(&conf(dir.path()), false);
        let bucket = doc.resource(BUCKET_TYPE, "siteBucket").unwrap();
        let oai = doc.resource(ORIGIN_ACCESS_IDENTITY_TYPE, "originAccessIdentity").unwrap();
        let cdn = doc.resource(DISTRIBUTION_TYPE, "cdn").unwrap();
        let origin = &cdn.properties["origins"][0];
        assert_eq!(Some(&origin["originId"]), bucket.attributes["arn"].as_ref());
        assert_eq!(Some(&origin["domainName"]), bucket.attributes["bucketRegionalDomainName"].as_ref());
        assert_eq!(
            Some(&origin["s3OriginConfig"]["originAccessIdentity"]),
            oai.attributes["cloudfrontAccessIdentityPath"].as_ref()
        );
        assert_eq!(cdn.properties["defaultCacheBehavior"]["targetOriginId"], origin["originId"]);
        assert_eq!(cdn.properties["enabled"], true);
        assert_eq!(cdn.properties["defaultRootObject"], "index.html");
        assert_eq!(cdn.properties["priceClass"], "PriceClass_100");
        assert_eq!(cdn.properties["restrictions"], json!({ "geoRestriction": { "restrictionType": "none" } }));
        assert_eq!(cdn.properties["viewerCertificate"], json!({ "cloudfrontDefaultCertificate": true }));
    }

    #[test]
    fn outputs_are_exported() {
        let dir = site_dir(&["index.html"]);
        let (outputs, doc) = evaluate(&conf(dir.path()), false);
        assert_eq!(doc.outputs["bucketName"], json!(outputs.bucket_name.value().unwrap()));
        assert_eq!(doc.outputs["nameServers"].as_array().unwrap().len(), 4);
        assert!(doc.outputs["cdnUrl"].as_str().unwrap().ends_with(".cloudfront.net"));
    }

    #[test]
    fn dry_run_never_writes_a_placeholder_policy() {
        let dir = site_dir(&["index.html"]);
        let (outputs, doc) = evaluate(&conf(dir.path()), true);
        assert!(!outputs.bucket_name.is_known());
        let policy = doc.resource(BUCKET_POLICY_TYPE, "bucketPolicy").unwrap();
        assert_eq!(
            policy.properties["policy"],
            json!({ "$unknown": ["originAccessIdentity.iamArn", "siteBucket.bucket"] })
        );
        assert_eq!(doc.outputs["cdnUrl"], json!({ "$unknown": ["cdn.domainName"] }));
    }

    #[test]
    fn invalid_region_is_rejected() {
        let dir = site_dir(&[]);
        let mut c = conf(dir.path());
        c.region = "moon-1".into();
        let mut engine = LocalEngine::new(&c.region, &c.account_id);
        let mut stack = Stack::new(&c.project, &c.stack, &mut engine).unwrap();
        assert!(matches!(declare_site(&mut stack, &c), Err(Error::Validation { .. })));
    }

    #[test]
    fn missing_content_dir_fails_everything() {
        let dir = site_dir(&[]);
        let c = conf(&dir.path().join("content"));
        let mut engine = LocalEngine::new(&c.region, &c.account_id);
        let mut stack = Stack::new(&c.project, &c.stack, &mut engine).unwrap();
        assert!(matches!(declare_site(&mut stack, &c), Err(Error::ContentDir { .. })));
    }

    #[test]
    fn explicit_bucket_name() {
        let dir = site_dir(&[]);
        let mut c = conf(dir.path());
        c.bucket_name = Some("www.abc.com".into());
        let (outputs, _) = evaluate(&c, false);
        assert_eq!(outputs.bucket_name.value().map(String::as_str), Some("www.abc.com"));
    }

    #[test]
    fn zone_names() {
        assert_eq!(zone_resource_name("abc.com"), "abc-com-zone");
        assert_eq!(zone_resource_name("docs.abc.com."), "docs-abc-com-zone");
    }
}
