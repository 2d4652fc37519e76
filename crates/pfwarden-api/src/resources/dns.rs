// ── DNS resolver overrides ──
//
// Domain overrides forward a whole zone to another server; host overrides
// answer for one name locally. Both live under the resolver's section of
// the config and share its list page for deletes and the apply step.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::Client;
use crate::coordinator::LockCategory;
use crate::decode;
use crate::error::Error;
use crate::form::{Form, Page};
use crate::resource::{Endpoint, Indexed, ManagedResource};
use crate::resources::{check_domain, check_label};

const DOMAIN_OVERRIDES_PATH: &str = "unbound/domainoverrides";
const HOST_OVERRIDES_PATH: &str = "unbound/hosts";
const DOMAIN_OVERRIDE_PAGE: &str = "/services_unbound_domainoverride_edit.php";
const HOST_OVERRIDE_PAGE: &str = "/services_unbound_host_edit.php";
pub(crate) const RESOLVER_PAGE: &str = "/services_unbound.php";

/// Forward lookups for `domain` (and its subdomains) to another server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainOverride {
    pub domain: String,
    /// Upstream server, optionally with a port as `address@port`.
    pub ip_address: String,
    /// Query the upstream over TLS.
    #[serde(default)]
    pub tls_queries: bool,
    /// Name to verify the upstream's certificate against.
    #[serde(default)]
    pub tls_hostname: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// An extra name answered with the same addresses as its host override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostOverrideAlias {
    pub host: String,
    pub domain: String,
    #[serde(default)]
    pub description: String,
}

/// Answer `host.domain` locally with fixed addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostOverride {
    pub host: String,
    pub domain: String,
    pub ip_addresses: Vec<IpAddr>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub aliases: Vec<HostOverrideAlias>,
}

impl ManagedResource for DomainOverride {
    fn natural_key(&self) -> String {
        self.domain.clone()
    }
}

impl ManagedResource for HostOverride {
    fn natural_key(&self) -> String {
        format!("{}.{}", self.host, self.domain)
    }
}

// ── Wire shapes ──

#[derive(Debug, Deserialize)]
struct RawDomainOverride {
    #[serde(default, deserialize_with = "decode::text")]
    domain: String,
    #[serde(default, deserialize_with = "decode::text")]
    ip: String,
    #[serde(default, deserialize_with = "decode::text")]
    descr: String,
    #[serde(default, deserialize_with = "decode::presence")]
    forward_tls_upstream: bool,
    #[serde(default, deserialize_with = "decode::non_empty")]
    tls_hostname: Option<String>,
}

impl From<RawDomainOverride> for DomainOverride {
    fn from(raw: RawDomainOverride) -> Self {
        Self {
            domain: raw.domain,
            ip_address: raw.ip,
            tls_queries: raw.forward_tls_upstream,
            tls_hostname: raw.tls_hostname,
            description: raw.descr,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawHostOverride {
    #[serde(default, deserialize_with = "decode::text")]
    host: String,
    #[serde(default, deserialize_with = "decode::text")]
    domain: String,
    #[serde(default, deserialize_with = "decode::list")]
    ip: Vec<String>,
    #[serde(default, deserialize_with = "decode::text")]
    descr: String,
    #[serde(default, deserialize_with = "decode::items")]
    aliases: Vec<RawHostAlias>,
}

#[derive(Debug, Deserialize)]
struct RawHostAlias {
    #[serde(default, deserialize_with = "decode::text")]
    host: String,
    #[serde(default, deserialize_with = "decode::text")]
    domain: String,
    #[serde(default, deserialize_with = "decode::text")]
    description: String,
}

impl TryFrom<RawHostOverride> for HostOverride {
    type Error = Error;

    fn try_from(raw: RawHostOverride) -> Result<Self, Error> {
        let ip_addresses = raw
            .ip
            .iter()
            .map(|ip| {
                ip.parse().map_err(|_| {
                    Error::parse(format!(
                        "host override {}.{} has invalid address '{ip}'",
                        raw.host, raw.domain
                    ))
                })
            })
            .collect::<Result<Vec<IpAddr>, Error>>()?;

        Ok(Self {
            host: raw.host,
            domain: raw.domain,
            ip_addresses,
            description: raw.descr,
            aliases: raw
                .aliases
                .into_iter()
                .map(|alias| HostOverrideAlias {
                    host: alias.host,
                    domain: alias.domain,
                    description: alias.description,
                })
                .collect(),
        })
    }
}

/// `address` or `address@port`.
fn check_upstream(value: &str) -> Result<(), Error> {
    let (address, port) = match value.split_once('@') {
        Some((address, port)) => (address, Some(port)),
        None => (value, None),
    };
    if address.parse::<IpAddr>().is_err() {
        return Err(Error::invalid(
            "ip_address",
            format!("'{address}' is not an IP address"),
        ));
    }
    match port.map(str::parse::<u16>) {
        None | Some(Ok(1..)) => Ok(()),
        Some(_) => Err(Error::invalid(
            "ip_address",
            format!("'{value}' has an invalid port"),
        )),
    }
}

// ── Endpoints ──

pub(crate) struct DomainOverrides;

impl Endpoint for DomainOverrides {
    type Record = DomainOverride;

    const RESOURCE: &'static str = "DNS resolver domain override";
    const CATEGORY: LockCategory = LockCategory::DnsDomainOverrides;

    fn config_path(&self) -> String {
        DOMAIN_OVERRIDES_PATH.to_owned()
    }

    fn decode(&self, raw: Value) -> Result<Vec<Indexed<DomainOverride>>, Error> {
        Ok(decode::records::<RawDomainOverride>(raw)?
            .into_iter()
            .enumerate()
            .map(|(index, raw)| Indexed {
                index,
                record: raw.into(),
            })
            .collect())
    }

    fn validate(&self, record: &DomainOverride) -> Result<(), Error> {
        check_domain("domain", &record.domain)?;
        check_upstream(&record.ip_address)?;
        if let Some(name) = &record.tls_hostname {
            check_domain("tls_hostname", name)?;
        }
        Ok(())
    }

    fn save_page(&self) -> Page {
        Page::new(DOMAIN_OVERRIDE_PAGE)
    }

    fn save_form(&self, record: &DomainOverride) -> Form {
        Form::new()
            .field("domain", record.domain.as_str())
            .field("ip", record.ip_address.as_str())
            .field("descr", record.description.as_str())
            .checkbox("forward_tls_upstream", record.tls_queries)
            .optional("tls_hostname", record.tls_hostname.as_deref())
            .field("save", "Save")
    }

    fn delete_page(&self) -> Page {
        Page::new(RESOLVER_PAGE)
    }

    fn delete_form(&self) -> Form {
        Form::new().field("type", "doverride").field("act", "del")
    }
}

pub(crate) struct HostOverrides;

impl Endpoint for HostOverrides {
    type Record = HostOverride;

    const RESOURCE: &'static str = "DNS resolver host override";
    const CATEGORY: LockCategory = LockCategory::DnsHostOverrides;

    fn config_path(&self) -> String {
        HOST_OVERRIDES_PATH.to_owned()
    }

    fn decode(&self, raw: Value) -> Result<Vec<Indexed<HostOverride>>, Error> {
        decode::records::<RawHostOverride>(raw)?
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                Ok(Indexed {
                    index,
                    record: raw.try_into()?,
                })
            })
            .collect()
    }

    fn validate(&self, record: &HostOverride) -> Result<(), Error> {
        check_label("host", &record.host)?;
        check_domain("domain", &record.domain)?;
        if record.ip_addresses.is_empty() {
            return Err(Error::invalid("ip_addresses", "at least one address is required"));
        }
        for alias in &record.aliases {
            check_label("aliases.host", &alias.host)?;
            check_domain("aliases.domain", &alias.domain)?;
        }
        Ok(())
    }

    fn save_page(&self) -> Page {
        Page::new(HOST_OVERRIDE_PAGE)
    }

    fn save_form(&self, record: &HostOverride) -> Form {
        let ips = record
            .ip_addresses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        Form::new()
            .field("host", record.host.as_str())
            .field("domain", record.domain.as_str())
            .field("ip", ips)
            .field("descr", record.description.as_str())
            .indexed("aliashost", record.aliases.iter().map(|a| a.host.as_str()))
            .indexed("aliasdomain", record.aliases.iter().map(|a| a.domain.as_str()))
            .indexed(
                "aliasdescription",
                record.aliases.iter().map(|a| a.description.as_str()),
            )
            .field("save", "Save")
    }

    fn delete_page(&self) -> Page {
        Page::new(RESOLVER_PAGE)
    }

    fn delete_form(&self) -> Form {
        Form::new().field("type", "host").field("act", "del")
    }
}

// ── Client operations ──

impl Client {
    pub async fn list_domain_overrides(&self) -> Result<Vec<DomainOverride>, Error> {
        self.list_records(&DomainOverrides).await
    }

    pub async fn get_domain_override(&self, domain: &str) -> Result<DomainOverride, Error> {
        self.get_record(&DomainOverrides, domain).await
    }

    pub async fn create_domain_override(
        &self,
        record: &DomainOverride,
    ) -> Result<DomainOverride, Error> {
        self.create_record(&DomainOverrides, record).await
    }

    pub async fn update_domain_override(
        &self,
        record: &DomainOverride,
    ) -> Result<DomainOverride, Error> {
        self.update_record(&DomainOverrides, record).await
    }

    pub async fn delete_domain_override(&self, domain: &str) -> Result<(), Error> {
        self.delete_record(&DomainOverrides, domain).await
    }

    pub async fn list_host_overrides(&self) -> Result<Vec<HostOverride>, Error> {
        self.list_records(&HostOverrides).await
    }

    /// Look up a host override by its full name, `host.domain`.
    pub async fn get_host_override(&self, fqdn: &str) -> Result<HostOverride, Error> {
        self.get_record(&HostOverrides, fqdn).await
    }

    pub async fn create_host_override(&self, record: &HostOverride) -> Result<HostOverride, Error> {
        self.create_record(&HostOverrides, record).await
    }

    pub async fn update_host_override(&self, record: &HostOverride) -> Result<HostOverride, Error> {
        self.update_record(&HostOverrides, record).await
    }

    pub async fn delete_host_override(&self, fqdn: &str) -> Result<(), Error> {
        self.delete_record(&HostOverrides, fqdn).await
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_domain_override() {
        let records = DomainOverrides
            .decode(json!([
                { "domain": "example.com", "ip": "203.0.113.53", "descr": "" },
                { "domain": "corp.lan", "ip": "10.0.0.53@853", "descr": "corp",
                  "forward_tls_upstream": "", "tls_hostname": "dns.corp.lan" }
            ]))
            .unwrap();

        assert_eq!(
            records[0].record,
            DomainOverride {
                domain: "example.com".into(),
                ip_address: "203.0.113.53".into(),
                tls_queries: false,
                tls_hostname: None,
                description: String::new(),
            }
        );
        assert!(records[1].record.tls_queries);
        assert_eq!(records[1].index, 1);
        assert_eq!(records[1].record.tls_hostname.as_deref(), Some("dns.corp.lan"));
    }

    #[test]
    fn domain_override_form_omits_unchecked_tls() {
        let form = DomainOverrides.save_form(&DomainOverride {
            domain: "example.com".into(),
            ip_address: "203.0.113.53".into(),
            tls_queries: false,
            tls_hostname: None,
            description: "test".into(),
        });

        assert_eq!(form.get("domain"), Some("example.com"));
        assert_eq!(form.get("ip"), Some("203.0.113.53"));
        assert_eq!(form.get("forward_tls_upstream"), None);
        assert_eq!(form.get("tls_hostname"), Some(""));
    }

    #[test]
    fn upstream_accepts_optional_port() {
        assert!(check_upstream("203.0.113.53").is_ok());
        assert!(check_upstream("2001:db8::53@853").is_ok());
        assert!(check_upstream("10.0.0.53@0").is_err());
        assert!(check_upstream("dns.example.com").is_err());
    }

    #[test]
    fn decodes_host_override_with_aliases() {
        let records = HostOverrides
            .decode(json!([
                { "host": "nas", "domain": "home.arpa", "ip": "10.0.0.5,fd00::5", "descr": "NAS",
                  "aliases": { "item": [
                      { "host": "files", "domain": "home.arpa", "description": "" },
                      { "host": "backup", "domain": "home.arpa", "description": "nightly" }
                  ] } },
                { "host": "printer", "domain": "home.arpa", "ip": "10.0.0.9", "descr": "", "aliases": "" }
            ]))
            .unwrap();

        let nas = &records[0].record;
        assert_eq!(nas.natural_key(), "nas.home.arpa");
        assert_eq!(nas.ip_addresses.len(), 2);
        assert_eq!(nas.aliases[1].description, "nightly");
        assert!(records[1].record.aliases.is_empty());
    }

    #[test]
    fn host_override_with_bad_address_is_a_parse_error() {
        let err = HostOverrides
            .decode(json!([{ "host": "nas", "domain": "home.arpa", "ip": "not-an-ip" }]))
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    #[test]
    fn host_override_form_joins_addresses() {
        let form = HostOverrides.save_form(&HostOverride {
            host: "nas".into(),
            domain: "home.arpa".into(),
            ip_addresses: vec!["10.0.0.5".parse().unwrap(), "fd00::5".parse().unwrap()],
            description: String::new(),
            aliases: vec![HostOverrideAlias {
                host: "files".into(),
                domain: "home.arpa".into(),
                description: "share".into(),
            }],
        });

        assert_eq!(form.get("ip"), Some("10.0.0.5,fd00::5"));
        assert_eq!(form.get("aliashost0"), Some("files"));
        assert_eq!(form.get("aliasdescription0"), Some("share"));
    }

    #[test]
    fn host_label_must_not_contain_dots() {
        let record = HostOverride {
            host: "nas.home".into(),
            domain: "arpa".into(),
            ip_addresses: vec!["10.0.0.5".parse().unwrap()],
            description: String::new(),
            aliases: Vec::new(),
        };
        let err = HostOverrides.validate(&record).unwrap_err();
        assert!(matches!(err, Error::ClientValidation { ref field, .. } if field == "host"));
    }
}
