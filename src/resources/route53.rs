use std::collections::BTreeSet;

use serde::Serialize;

use super::*;

pub const ZONE_TYPE: &str = "aws:route53/zone:Zone";
pub const RECORD_TYPE: &str = "aws:route53/record:Record";

fn validate_domain(domain: &str) -> Result<(), String> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    if domain.is_empty() || domain.len() > 253 {
        return Err(format!("Invalid domain {domain:?}\nMust be between 1 and 253 characters"));
    }
    for label in domain.split('.') {
        let valid = !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '*');
        if !valid {
            return Err(format!("Invalid domain {domain:?}\nlabel {label:?} is not a valid dns label"));
        }
    }
    Ok(())
}

fn normalize(domain: &str) -> String {
    domain.trim_end_matches('.').to_ascii_lowercase()
}

#[derive(Debug, Clone, Serialize)]
pub struct Zone {
    /// the domain this zone is authoritative for, eg: `abc.com`
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct DeclaredZone {
    pub resource: Registered,
    pub name: String,
    pub zone_id: Output<String>,
    /// the nameservers to delegate the domain to, in the order route53 returns them.
    pub name_servers: Output<Vec<String>>,
}

impl Resource for Zone {
    fn type_token(&self) -> &'static str {
        ZONE_TYPE
    }

    fn validate(&self) -> Result<(), String> {
        validate_domain(&self.name)
    }
}

impl Zone {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string() }
    }

    pub fn declare(&self, stack: &mut Stack<'_>, name: &str) -> crate::Result<DeclaredZone> {
        let resource = stack.register(name, self)?;
        Ok(DeclaredZone {
            name: self.name.clone(),
            zone_id: resource.output("zoneId")?,
            name_servers: resource.output("nameServers")?,
            resource,
        })
    }
}

/// alias records can only be A or AAAA records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordType {
    A,
    #[allow(clippy::upper_case_acronyms)]
    AAAA,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alias {
    pub name: Output<String>,
    pub zone_id: Output<String>,
    pub evaluate_target_health: bool,
}

impl Alias {
    /// points at a cloudfront distribution. Cloudfront doesn't support
    /// target health evaluation, so it is always off.
    pub fn to_distribution(distribution: &DeclaredDistribution) -> Self {
        Self {
            name: distribution.domain_name.clone(),
            zone_id: distribution.hosted_zone_id.clone(),
            evaluate_target_health: false,
        }
    }
}

/// a dns record aliasing a name to another aws resource.
/// Only constructible through [`Record::alias`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    zone_id: Output<String>,
    name: String,
    #[serde(rename = "type")]
    record_type: RecordType,
    aliases: Vec<Alias>,
    #[serde(skip)]
    zone_name: String,
}

#[derive(Debug, Clone)]
pub struct DeclaredRecord {
    pub resource: Registered,
    pub fqdn: Output<String>,
}

impl Record {
    pub fn alias(zone: &DeclaredZone, name: &str, record_type: RecordType, target: Alias) -> Self {
        Self {
            zone_id: zone.zone_id.clone(),
            name: name.to_string(),
            record_type,
            aliases: vec![target],
            zone_name: zone.name.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    pub fn declare(&self, stack: &mut Stack<'_>, name: &str) -> crate::Result<DeclaredRecord> {
        let resource = stack.register(name, self)?;
        Ok(DeclaredRecord {
            fqdn: resource.output("fqdn")?,
            resource,
        })
    }
}

impl Resource for Record {
    fn type_token(&self) -> &'static str {
        RECORD_TYPE
    }

    fn depends_on(&self) -> BTreeSet<String> {
        let mut deps = self.zone_id.depends_on();
        for alias in &self.aliases {
            deps.extend(alias.name.depends_on());
            deps.extend(alias.zone_id.depends_on());
        }
        deps
    }

    fn validate(&self) -> Result<(), String> {
        validate_domain(&self.name)?;
        if self.aliases.len() != 1 {
            return Err(format!("Alias record {} must have exactly one alias target", self.name));
        }
        let name = normalize(&self.name);
        let zone = normalize(&self.zone_name);
        if name != zone && !name.ends_with(&format!(".{zone}")) {
            return Err(format!("Record {} is not part of hosted zone {}", self.name, self.zone_name));
        }
        Ok(())
    }
}
