// ── DHCPv4 static mappings ──
//
// Static mappings are kept per interface, so every operation is scoped by
// an interface name that becomes part of both the config path and the page
// query string. MAC addresses are matched case-insensitively.

use std::net::Ipv4Addr;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::Client;
use crate::coordinator::LockCategory;
use crate::decode;
use crate::error::{Error, Operation};
use crate::form::{Form, Page};
use crate::resource::{Endpoint, Indexed, ManagedResource};
use crate::resources::{check_domain, check_label};

const EDIT_PAGE: &str = "/services_dhcp_edit.php";
pub(crate) const DHCP_PAGE: &str = "/services_dhcp.php";
const INTERFACE_QUERY: &str = "if";

pub const MAX_WINS_SERVERS: usize = 2;
pub const MAX_DNS_SERVERS: usize = 4;

static INTERFACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_]+$").expect("interface pattern is valid"));

static MAC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9A-Fa-f]{2}(:[0-9A-Fa-f]{2}){5}$").expect("MAC pattern is valid")
});

/// A fixed DHCPv4 lease for one client on one interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMapping {
    /// Interface identifier as used in the config, e.g. `lan` or `opt1`.
    pub interface: String,
    pub mac: String,
    #[serde(default)]
    pub client_identifier: Option<String>,
    #[serde(default)]
    pub ip_address: Option<Ipv4Addr>,
    /// Pin the MAC/IP pair in the ARP table.
    #[serde(default)]
    pub arp_table_static_entry: bool,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub wins_servers: Vec<Ipv4Addr>,
    #[serde(default)]
    pub dns_servers: Vec<Ipv4Addr>,
    #[serde(default)]
    pub gateway: Option<Ipv4Addr>,
    #[serde(default)]
    pub domain_name: Option<String>,
    #[serde(default)]
    pub domain_search_list: Vec<String>,
    #[serde(default, with = "decode::humantime_opt")]
    pub default_lease_time: Option<Duration>,
    #[serde(default, with = "decode::humantime_opt")]
    pub maximum_lease_time: Option<Duration>,
}

impl ManagedResource for StaticMapping {
    fn natural_key(&self) -> String {
        self.mac.to_ascii_lowercase()
    }
}

#[derive(Debug, Deserialize)]
struct RawStaticMapping {
    #[serde(default, deserialize_with = "decode::text")]
    mac: String,
    #[serde(default, deserialize_with = "decode::non_empty")]
    cid: Option<String>,
    #[serde(default, deserialize_with = "decode::non_empty")]
    ipaddr: Option<String>,
    #[serde(default, deserialize_with = "decode::presence")]
    arp_table_static_entry: bool,
    #[serde(default, deserialize_with = "decode::non_empty")]
    hostname: Option<String>,
    #[serde(default, deserialize_with = "decode::text")]
    descr: String,
    #[serde(default, deserialize_with = "decode::list")]
    winsserver: Vec<String>,
    #[serde(default, deserialize_with = "decode::list")]
    dnsserver: Vec<String>,
    #[serde(default, deserialize_with = "decode::non_empty")]
    gateway: Option<String>,
    #[serde(default, deserialize_with = "decode::non_empty")]
    domain: Option<String>,
    #[serde(default, deserialize_with = "decode::list")]
    domainsearchlist: Vec<String>,
    #[serde(default, deserialize_with = "decode::seconds")]
    defaultleasetime: Option<Duration>,
    #[serde(default, deserialize_with = "decode::seconds")]
    maxleasetime: Option<Duration>,
}

impl RawStaticMapping {
    fn into_mapping(self, interface: &str) -> Result<StaticMapping, Error> {
        let mac = self.mac;
        let ipv4 = |field: &str, text: &str| {
            text.parse::<Ipv4Addr>().map_err(|_| {
                Error::parse(format!(
                    "static mapping {mac} has invalid {field} '{text}'"
                ))
            })
        };

        let ip_address = self.ipaddr.as_deref().map(|t| ipv4("ipaddr", t)).transpose()?;
        let gateway = self.gateway.as_deref().map(|t| ipv4("gateway", t)).transpose()?;
        let wins_servers = self
            .winsserver
            .iter()
            .map(|t| ipv4("winsserver", t))
            .collect::<Result<_, _>>()?;
        let dns_servers = self
            .dnsserver
            .iter()
            .map(|t| ipv4("dnsserver", t))
            .collect::<Result<_, _>>()?;

        Ok(StaticMapping {
            interface: interface.to_owned(),
            mac,
            client_identifier: self.cid,
            ip_address,
            arp_table_static_entry: self.arp_table_static_entry,
            hostname: self.hostname,
            description: self.descr,
            wins_servers,
            dns_servers,
            gateway,
            domain_name: self.domain,
            domain_search_list: self.domainsearchlist,
            default_lease_time: self.defaultleasetime,
            maximum_lease_time: self.maxleasetime,
        })
    }
}

/// Interface identifiers are lowercase config keys such as `lan` or `opt2`.
pub(crate) fn check_interface(interface: &str) -> Result<(), Error> {
    if INTERFACE.is_match(interface) {
        Ok(())
    } else {
        Err(Error::invalid(
            "interface",
            format!("'{interface}' must be lowercase letters, digits or underscores"),
        ))
    }
}

fn check_mac(mac: &str) -> Result<(), Error> {
    if MAC.is_match(mac) {
        Ok(())
    } else {
        Err(Error::invalid(
            "mac",
            format!("'{mac}' is not a MAC address (xx:xx:xx:xx:xx:xx)"),
        ))
    }
}

fn seconds(value: Option<Duration>) -> String {
    value.map(|d| d.as_secs().to_string()).unwrap_or_default()
}

pub(crate) struct StaticMappings<'a> {
    interface: &'a str,
}

impl<'a> StaticMappings<'a> {
    fn new(interface: &'a str, op: Operation) -> Result<Self, Error> {
        check_interface(interface)
            .map(|()| Self { interface })
            .map_err(|e| Error::operation(op, Self::RESOURCE, e))
    }
}

impl Endpoint for StaticMappings<'_> {
    type Record = StaticMapping;

    const RESOURCE: &'static str = "DHCPv4 static mapping";
    const CATEGORY: LockCategory = LockCategory::DhcpStaticMappings;

    fn config_path(&self) -> String {
        format!("dhcpd/{}/staticmap", self.interface)
    }

    fn decode(&self, raw: Value) -> Result<Vec<Indexed<StaticMapping>>, Error> {
        decode::records::<RawStaticMapping>(raw)?
            .into_iter()
            .enumerate()
            .map(|(index, raw)| {
                Ok(Indexed {
                    index,
                    record: raw.into_mapping(self.interface)?,
                })
            })
            .collect()
    }

    fn key_matches(&self, record: &StaticMapping, key: &str) -> bool {
        record.mac.eq_ignore_ascii_case(key)
    }

    fn validate(&self, record: &StaticMapping) -> Result<(), Error> {
        check_mac(&record.mac)?;
        if let Some(hostname) = &record.hostname {
            check_label("hostname", hostname)?;
        }
        if let Some(domain) = &record.domain_name {
            check_domain("domain_name", domain)?;
        }
        for domain in &record.domain_search_list {
            check_domain("domain_search_list", domain)?;
        }
        if let Some(cid) = &record.client_identifier {
            if cid.contains(char::is_whitespace) {
                return Err(Error::invalid("client_identifier", "must not contain whitespace"));
            }
        }
        if record.wins_servers.len() > MAX_WINS_SERVERS {
            return Err(Error::invalid(
                "wins_servers",
                format!("at most {MAX_WINS_SERVERS} servers are allowed"),
            ));
        }
        if record.dns_servers.len() > MAX_DNS_SERVERS {
            return Err(Error::invalid(
                "dns_servers",
                format!("at most {MAX_DNS_SERVERS} servers are allowed"),
            ));
        }
        Ok(())
    }

    fn save_page(&self) -> Page {
        Page::new(EDIT_PAGE).with_query(INTERFACE_QUERY, self.interface)
    }

    fn save_form(&self, record: &StaticMapping) -> Form {
        Form::new()
            .field("mac", record.mac.as_str())
            .optional("cid", record.client_identifier.as_deref())
            .optional("ipaddr", record.ip_address)
            .checkbox("arp_table_static_entry", record.arp_table_static_entry)
            .optional("hostname", record.hostname.as_deref())
            .field("descr", record.description.as_str())
            .indexed("winsserver", &record.wins_servers)
            .indexed("dnsserver", &record.dns_servers)
            .optional("gateway", record.gateway)
            .optional("domain", record.domain_name.as_deref())
            .field("domainsearchlist", record.domain_search_list.join(";"))
            .field("defaultleasetime", seconds(record.default_lease_time))
            .field("maxleasetime", seconds(record.maximum_lease_time))
            .field("save", "Save")
    }

    fn delete_page(&self) -> Page {
        Page::new(DHCP_PAGE).with_query(INTERFACE_QUERY, self.interface)
    }

    fn delete_form(&self) -> Form {
        Form::new().field("act", "del")
    }
}

// ── Client operations ──

impl Client {
    pub async fn list_static_mappings(&self, interface: &str) -> Result<Vec<StaticMapping>, Error> {
        let endpoint = StaticMappings::new(interface, Operation::Get)?;
        self.list_records(&endpoint).await
    }

    pub async fn get_static_mapping(
        &self,
        interface: &str,
        mac: &str,
    ) -> Result<StaticMapping, Error> {
        let endpoint = StaticMappings::new(interface, Operation::Get)?;
        self.get_record(&endpoint, mac).await
    }

    /// Create a mapping on `mapping.interface`. Fails if the MAC is taken.
    pub async fn create_static_mapping(
        &self,
        mapping: &StaticMapping,
    ) -> Result<StaticMapping, Error> {
        let endpoint = StaticMappings::new(&mapping.interface, Operation::Create)?;
        self.create_record(&endpoint, mapping).await
    }

    pub async fn update_static_mapping(
        &self,
        mapping: &StaticMapping,
    ) -> Result<StaticMapping, Error> {
        let endpoint = StaticMappings::new(&mapping.interface, Operation::Update)?;
        self.update_record(&endpoint, mapping).await
    }

    pub async fn delete_static_mapping(&self, interface: &str, mac: &str) -> Result<(), Error> {
        let endpoint = StaticMappings::new(interface, Operation::Delete)?;
        self.delete_record(&endpoint, mac).await
    }
}
