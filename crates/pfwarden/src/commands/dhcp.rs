//! DHCPv4 static mapping command handlers.

use std::time::Duration;

use tabled::Tabled;

use pfwarden_api::{Client, ManagedResource, StaticMapping};

use crate::cli::{GlobalOpts, StaticMappingsArgs, StaticMappingsCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct StaticMappingRow {
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "Hostname")]
    hostname: String,
    #[tabled(rename = "Static ARP")]
    arp: &'static str,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&StaticMapping> for StaticMappingRow {
    fn from(m: &StaticMapping) -> Self {
        Self {
            mac: m.mac.clone(),
            ip: m
                .ip_address
                .map_or_else(|| "-".into(), |ip| ip.to_string()),
            hostname: m.hostname.clone().unwrap_or_else(|| "-".into()),
            arp: if m.arp_table_static_entry { "yes" } else { "no" },
            description: util::or_dash(&m.description),
        }
    }
}

fn lease(value: Option<Duration>) -> String {
    value.map_or_else(
        || "-".into(),
        |d| humantime::format_duration(d).to_string(),
    )
}

fn static_mapping_detail(m: &StaticMapping) -> String {
    let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "-".into());
    [
        format!("Interface:     {}", m.interface),
        format!("MAC:           {}", m.mac),
        format!("Client ID:     {}", opt(&m.client_identifier)),
        format!(
            "IP:            {}",
            m.ip_address.map_or_else(|| "-".into(), |ip| ip.to_string())
        ),
        format!("Static ARP:    {}", m.arp_table_static_entry),
        format!("Hostname:      {}", opt(&m.hostname)),
        format!("Description:   {}", util::or_dash(&m.description)),
        format!("WINS servers:  {}", util::join_or_dash(&m.wins_servers)),
        format!("DNS servers:   {}", util::join_or_dash(&m.dns_servers)),
        format!(
            "Gateway:       {}",
            m.gateway.map_or_else(|| "-".into(), |gw| gw.to_string())
        ),
        format!("Domain:        {}", opt(&m.domain_name)),
        format!("Search list:   {}", util::join_or_dash(&m.domain_search_list)),
        format!("Default lease: {}", lease(m.default_lease_time)),
        format!("Max lease:     {}", lease(m.maximum_lease_time)),
    ]
    .join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &Client,
    args: StaticMappingsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let interface = args.interface;
    match args.command {
        StaticMappingsCommand::List => {
            let mappings = client.list_static_mappings(&interface).await?;
            let out = output::render_list(
                global.output,
                &mappings,
                |m| StaticMappingRow::from(m),
                ManagedResource::natural_key,
            )?;
            output::print_output(&out, global.quiet);
        }

        StaticMappingsCommand::Get { mac } => {
            let mapping = client.get_static_mapping(&interface, &mac).await?;
            let out = output::render_single(
                global.output,
                &mapping,
                static_mapping_detail,
                ManagedResource::natural_key,
            )?;
            output::print_output(&out, global.quiet);
        }

        // The record's own `interface` field picks the target.
        StaticMappingsCommand::Create { from_file } => {
            let mapping: StaticMapping = util::read_record(&from_file)?;
            let created = client.create_static_mapping(&mapping).await?;
            output::status(
                &format!(
                    "Static mapping '{}' created on {}",
                    created.mac, created.interface
                ),
                global.quiet,
            );
            output::status(
                &format!(
                    "Run `pfwarden apply dhcp --interface {}` to activate it.",
                    created.interface
                ),
                global.quiet,
            );
        }

        StaticMappingsCommand::Update { from_file } => {
            let mapping: StaticMapping = util::read_record(&from_file)?;
            let updated = client.update_static_mapping(&mapping).await?;
            output::status(
                &format!(
                    "Static mapping '{}' updated on {}",
                    updated.mac, updated.interface
                ),
                global.quiet,
            );
        }

        StaticMappingsCommand::Delete { mac } => {
            if !util::confirm(
                &format!("Delete static mapping '{mac}' on {interface}?"),
                global.yes,
            )? {
                return Ok(());
            }
            client.delete_static_mapping(&interface, &mac).await?;
            output::status(
                &format!("Static mapping '{mac}' deleted from {interface}"),
                global.quiet,
            );
        }
    }
    Ok(())
}
