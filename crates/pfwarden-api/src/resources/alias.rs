// ── Firewall aliases ──
//
// IP (host/network) and port aliases are stored in one list on the
// appliance, told apart by `type`. Edits and deletes address an alias by
// its offset in that combined list, so both kinds decode from the full
// list and keep their unfiltered position.

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::Client;
use crate::coordinator::LockCategory;
use crate::decode;
use crate::error::Error;
use crate::form::{Form, Page};
use crate::resource::{Endpoint, Indexed, ManagedResource};
use crate::resources::check_no_separator;

const CONFIG_PATH: &str = "aliases/alias";
const SAVE_PAGE: &str = "/firewall_aliases_edit.php";
const DELETE_PAGE: &str = "/firewall_aliases.php";
const DETAIL_SEPARATOR: &str = "||";

static ALIAS_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{1,31}$").expect("alias name pattern is valid"));

static PORT_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,5})(?::(\d{1,5}))?$").expect("port pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IpAliasKind {
    Host,
    Network,
}

impl IpAliasKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Network => "network",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// Address, range, FQDN or `address/prefix` for network aliases.
    pub address: String,
    #[serde(default)]
    pub description: String,
}

/// Host or network alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpAlias {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub kind: IpAliasKind,
    #[serde(default)]
    pub entries: Vec<AliasEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAliasEntry {
    /// A port number or an inclusive `low:high` range.
    pub port: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortAlias {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub entries: Vec<PortAliasEntry>,
}

impl ManagedResource for IpAlias {
    fn natural_key(&self) -> String {
        self.name.clone()
    }
}

impl ManagedResource for PortAlias {
    fn natural_key(&self) -> String {
        self.name.clone()
    }
}

// ── Wire shape ──

#[derive(Debug, Deserialize)]
struct RawAlias {
    #[serde(default, deserialize_with = "decode::text")]
    name: String,
    #[serde(rename = "type", default, deserialize_with = "decode::text")]
    kind: String,
    #[serde(default, deserialize_with = "decode::text")]
    descr: String,
    #[serde(default, deserialize_with = "decode::list")]
    address: Vec<String>,
    #[serde(default, deserialize_with = "decode::pipe_list")]
    detail: Vec<String>,
}

impl RawAlias {
    fn into_ip_alias(self) -> Option<IpAlias> {
        let kind = match self.kind.as_str() {
            "host" => IpAliasKind::Host,
            "network" => IpAliasKind::Network,
            _ => return None,
        };
        Some(IpAlias {
            name: self.name,
            description: self.descr,
            kind,
            entries: rows(self.address, self.detail)
                .map(|(address, description)| AliasEntry {
                    address,
                    description,
                })
                .collect(),
        })
    }

    fn into_port_alias(self) -> Option<PortAlias> {
        if self.kind != "port" {
            return None;
        }
        Some(PortAlias {
            name: self.name,
            description: self.descr,
            entries: rows(self.address, self.detail)
                .map(|(port, description)| PortAliasEntry { port, description })
                .collect(),
        })
    }
}

/// Address/detail pairs. Missing details read as empty descriptions.
fn rows(address: Vec<String>, detail: Vec<String>) -> impl Iterator<Item = (String, String)> {
    let mut details = detail.into_iter();
    address
        .into_iter()
        .map(move |address| (address, details.next().unwrap_or_default()))
}

/// Decode the whole alias list and keep the records `select` accepts,
/// indexed by their position in the unfiltered list.
fn decode_aliases<T>(raw: Value, select: fn(RawAlias) -> Option<T>) -> Result<Vec<Indexed<T>>, Error> {
    Ok(decode::records::<RawAlias>(raw)?
        .into_iter()
        .enumerate()
        .filter_map(|(index, alias)| select(alias).map(|record| Indexed { index, record }))
        .collect())
}

/// One `address<i>`/`address_subnet<i>`/`detail<i>` row per entry.
fn alias_form<'a>(
    name: &str,
    description: &str,
    kind: &str,
    rows: impl Iterator<Item = (&'a str, &'a str)>,
) -> Form {
    let mut form = Form::new()
        .field("name", name)
        .field("descr", description)
        .field("type", kind);
    for (i, (address, detail)) in rows.enumerate() {
        let (address, subnet) = address.split_once('/').unwrap_or((address, ""));
        form.push(format!("address{i}"), address);
        form.push(format!("address_subnet{i}"), subnet);
        form.push(format!("detail{i}"), detail);
    }
    form.field("save", "Save")
}

fn check_alias_name(name: &str) -> Result<(), Error> {
    if !ALIAS_NAME.is_match(name) {
        return Err(Error::invalid(
            "name",
            format!("'{name}' must be 1 to 31 letters, digits or underscores"),
        ));
    }
    if name.chars().all(|c| c.is_ascii_digit()) {
        return Err(Error::invalid("name", "must not be purely numeric"));
    }
    Ok(())
}

fn check_address(kind: IpAliasKind, address: &str) -> Result<(), Error> {
    if address.is_empty() || address.contains(char::is_whitespace) {
        return Err(Error::invalid(
            "address",
            format!("'{address}' must be a single non-empty value"),
        ));
    }
    let Some((network, prefix)) = address.split_once('/') else {
        return Ok(());
    };
    if kind == IpAliasKind::Host {
        return Err(Error::invalid(
            "address",
            format!("'{address}' is a network, use a network alias"),
        ));
    }
    let ip: IpAddr = network
        .parse()
        .map_err(|_| Error::invalid("address", format!("'{network}' is not an IP address")))?;
    let max = if ip.is_ipv4() { 32 } else { 128 };
    match prefix.parse::<u8>() {
        Ok(bits) if bits <= max => Ok(()),
        _ => Err(Error::invalid(
            "address",
            format!("'{prefix}' is not a prefix length between 0 and {max}"),
        )),
    }
}

/// A port or `low:high` range within 1..=65535.
pub(crate) fn check_port(entry: &str) -> Result<(), Error> {
    let invalid = || {
        Error::invalid(
            "port",
            format!("'{entry}' must be a port or a low:high range"),
        )
    };
    let caps = PORT_ENTRY.captures(entry).ok_or_else(invalid)?;
    let parse = |text: &str| text.parse::<u16>().ok().filter(|port| *port > 0);

    let low = parse(&caps[1]).ok_or_else(invalid)?;
    match caps.get(2) {
        None => Ok(()),
        Some(high) => match parse(high.as_str()) {
            Some(high) if high >= low => Ok(()),
            _ => Err(invalid()),
        },
    }
}

// ── Endpoints ──

pub(crate) struct IpAliases;

impl Endpoint for IpAliases {
    type Record = IpAlias;

    const RESOURCE: &'static str = "firewall IP alias";
    const CATEGORY: LockCategory = LockCategory::Aliases;

    fn config_path(&self) -> String {
        CONFIG_PATH.to_owned()
    }

    fn decode(&self, raw: Value) -> Result<Vec<Indexed<IpAlias>>, Error> {
        decode_aliases(raw, RawAlias::into_ip_alias)
    }

    fn validate(&self, alias: &IpAlias) -> Result<(), Error> {
        check_alias_name(&alias.name)?;
        for entry in &alias.entries {
            check_address(alias.kind, &entry.address)?;
            check_no_separator("description", &entry.description, DETAIL_SEPARATOR)?;
        }
        Ok(())
    }

    fn save_page(&self) -> Page {
        Page::new(SAVE_PAGE)
    }

    fn save_form(&self, alias: &IpAlias) -> Form {
        alias_form(
            &alias.name,
            &alias.description,
            alias.kind.as_str(),
            alias
                .entries
                .iter()
                .map(|e| (e.address.as_str(), e.description.as_str())),
        )
    }

    fn delete_page(&self) -> Page {
        Page::new(DELETE_PAGE)
    }

    fn delete_form(&self) -> Form {
        Form::new().field("act", "del")
    }
}

pub(crate) struct PortAliases;

impl Endpoint for PortAliases {
    type Record = PortAlias;

    const RESOURCE: &'static str = "firewall port alias";
    const CATEGORY: LockCategory = LockCategory::Aliases;

    fn config_path(&self) -> String {
        CONFIG_PATH.to_owned()
    }

    fn decode(&self, raw: Value) -> Result<Vec<Indexed<PortAlias>>, Error> {
        decode_aliases(raw, RawAlias::into_port_alias)
    }

    fn validate(&self, alias: &PortAlias) -> Result<(), Error> {
        check_alias_name(&alias.name)?;
        for entry in &alias.entries {
            check_port(&entry.port)?;
            check_no_separator("description", &entry.description, DETAIL_SEPARATOR)?;
        }
        Ok(())
    }

    fn save_page(&self) -> Page {
        Page::new(SAVE_PAGE)
    }

    fn save_form(&self, alias: &PortAlias) -> Form {
        alias_form(
            &alias.name,
            &alias.description,
            "port",
            alias
                .entries
                .iter()
                .map(|e| (e.port.as_str(), e.description.as_str())),
        )
    }

    fn delete_page(&self) -> Page {
        Page::new(DELETE_PAGE)
    }

    fn delete_form(&self) -> Form {
        Form::new().field("act", "del")
    }
}

// ── Client operations ──

impl Client {
    pub async fn list_ip_aliases(&self) -> Result<Vec<IpAlias>, Error> {
        self.list_records(&IpAliases).await
    }

    pub async fn get_ip_alias(&self, name: &str) -> Result<IpAlias, Error> {
        self.get_record(&IpAliases, name).await
    }

    /// Create a host or network alias. Fails if the name is taken.
    pub async fn create_ip_alias(&self, alias: &IpAlias) -> Result<IpAlias, Error> {
        self.create_record(&IpAliases, alias).await
    }

    pub async fn update_ip_alias(&self, alias: &IpAlias) -> Result<IpAlias, Error> {
        self.update_record(&IpAliases, alias).await
    }

    pub async fn delete_ip_alias(&self, name: &str) -> Result<(), Error> {
        self.delete_record(&IpAliases, name).await
    }

    pub async fn list_port_aliases(&self) -> Result<Vec<PortAlias>, Error> {
        self.list_records(&PortAliases).await
    }

    pub async fn get_port_alias(&self, name: &str) -> Result<PortAlias, Error> {
        self.get_record(&PortAliases, name).await
    }

    pub async fn create_port_alias(&self, alias: &PortAlias) -> Result<PortAlias, Error> {
        self.create_record(&PortAliases, alias).await
    }

    pub async fn update_port_alias(&self, alias: &PortAlias) -> Result<PortAlias, Error> {
        self.update_record(&PortAliases, alias).await
    }

    pub async fn delete_port_alias(&self, name: &str) -> Result<(), Error> {
        self.delete_record(&PortAliases, name).await
    }
}
