//! Firewall alias command handlers (IP + port).

use tabled::Tabled;

use pfwarden_api::{Client, IpAlias, PortAlias};

use crate::cli::{GlobalOpts, ResourceArgs, ResourceCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── IP alias table row ──────────────────────────────────────────────

#[derive(Tabled)]
struct IpAliasRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: &'static str,
    #[tabled(rename = "Entries")]
    entries: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&IpAlias> for IpAliasRow {
    fn from(a: &IpAlias) -> Self {
        let addresses: Vec<&str> = a.entries.iter().map(|e| e.address.as_str()).collect();
        Self {
            name: a.name.clone(),
            kind: a.kind.as_str(),
            entries: util::join_or_dash(&addresses),
            description: util::or_dash(&a.description),
        }
    }
}

fn ip_alias_detail(a: &IpAlias) -> String {
    let mut lines = vec![
        format!("Name:        {}", a.name),
        format!("Type:        {}", a.kind.as_str()),
        format!("Description: {}", util::or_dash(&a.description)),
        "Entries:".to_owned(),
    ];
    lines.extend(a.entries.iter().map(|e| {
        if e.description.is_empty() {
            format!("  - {}", e.address)
        } else {
            format!("  - {}  ({})", e.address, e.description)
        }
    }));
    lines.join("\n")
}

// ── Port alias table row ────────────────────────────────────────────

#[derive(Tabled)]
struct PortAliasRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Ports")]
    ports: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&PortAlias> for PortAliasRow {
    fn from(a: &PortAlias) -> Self {
        let ports: Vec<&str> = a.entries.iter().map(|e| e.port.as_str()).collect();
        Self {
            name: a.name.clone(),
            ports: util::join_or_dash(&ports),
            description: util::or_dash(&a.description),
        }
    }
}

fn port_alias_detail(a: &PortAlias) -> String {
    let mut lines = vec![
        format!("Name:        {}", a.name),
        format!("Description: {}", util::or_dash(&a.description)),
        "Ports:".to_owned(),
    ];
    lines.extend(a.entries.iter().map(|e| {
        if e.description.is_empty() {
            format!("  - {}", e.port)
        } else {
            format!("  - {}  ({})", e.port, e.description)
        }
    }));
    lines.join("\n")
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_ip(
    client: &Client,
    args: ResourceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ResourceCommand::List => {
            let aliases = client.list_ip_aliases().await?;
            let out = output::render_list(
                global.output,
                &aliases,
                |a| IpAliasRow::from(a),
                |a| a.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
        }

        ResourceCommand::Get { key } => {
            let alias = client.get_ip_alias(&key).await?;
            let out =
                output::render_single(global.output, &alias, ip_alias_detail, |a| a.name.clone())?;
            output::print_output(&out, global.quiet);
        }

        ResourceCommand::Create { from_file } => {
            let alias: IpAlias = util::read_record(&from_file)?;
            let created = client.create_ip_alias(&alias).await?;
            output::status(&format!("IP alias '{}' created", created.name), global.quiet);
            output::status("Run `pfwarden apply filter` to activate it.", global.quiet);
        }

        ResourceCommand::Update { from_file } => {
            let alias: IpAlias = util::read_record(&from_file)?;
            let updated = client.update_ip_alias(&alias).await?;
            output::status(&format!("IP alias '{}' updated", updated.name), global.quiet);
        }

        ResourceCommand::Delete { key } => {
            if !util::confirm(&format!("Delete IP alias '{key}'?"), global.yes)? {
                return Ok(());
            }
            client.delete_ip_alias(&key).await?;
            output::status(&format!("IP alias '{key}' deleted"), global.quiet);
        }
    }
    Ok(())
}

pub async fn handle_port(
    client: &Client,
    args: ResourceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ResourceCommand::List => {
            let aliases = client.list_port_aliases().await?;
            let out = output::render_list(
                global.output,
                &aliases,
                |a| PortAliasRow::from(a),
                |a| a.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
        }

        ResourceCommand::Get { key } => {
            let alias = client.get_port_alias(&key).await?;
            let out = output::render_single(global.output, &alias, port_alias_detail, |a| {
                a.name.clone()
            })?;
            output::print_output(&out, global.quiet);
        }

        ResourceCommand::Create { from_file } => {
            let alias: PortAlias = util::read_record(&from_file)?;
            let created = client.create_port_alias(&alias).await?;
            output::status(&format!("Port alias '{}' created", created.name), global.quiet);
            output::status("Run `pfwarden apply filter` to activate it.", global.quiet);
        }

        ResourceCommand::Update { from_file } => {
            let alias: PortAlias = util::read_record(&from_file)?;
            let updated = client.update_port_alias(&alias).await?;
            output::status(&format!("Port alias '{}' updated", updated.name), global.quiet);
        }

        ResourceCommand::Delete { key } => {
            if !util::confirm(&format!("Delete port alias '{key}'?"), global.yes)? {
                return Ok(());
            }
            client.delete_port_alias(&key).await?;
            output::status(&format!("Port alias '{key}' deleted"), global.quiet);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pfwarden_api::{AliasEntry, IpAliasKind};

    use super::*;

    #[test]
    fn ip_alias_row_joins_addresses() {
        let alias = IpAlias {
            name: "dmz".into(),
            description: String::new(),
            kind: IpAliasKind::Network,
            entries: vec![
                AliasEntry {
                    address: "10.0.0.0/24".into(),
                    description: "servers".into(),
                },
                AliasEntry {
                    address: "10.0.1.0/24".into(),
                    description: String::new(),
                },
            ],
        };
        let row = IpAliasRow::from(&alias);

        assert_eq!(row.kind, "network");
        assert_eq!(row.entries, "10.0.0.0/24, 10.0.1.0/24");
        assert_eq!(row.description, "-");
        assert!(ip_alias_detail(&alias).contains("10.0.0.0/24  (servers)"));
    }
}
