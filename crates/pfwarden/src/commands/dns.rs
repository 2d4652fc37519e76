//! DNS resolver command handlers (domain + host overrides).

use tabled::Tabled;

use pfwarden_api::{Client, DomainOverride, HostOverride, ManagedResource};

use crate::cli::{GlobalOpts, ResourceArgs, ResourceCommand};
use crate::error::CliError;
use crate::output;

use super::util;

const APPLY_HINT: &str = "Run `pfwarden apply dns-resolver` to activate it.";

// ── Domain override table row ───────────────────────────────────────

#[derive(Tabled)]
struct DomainOverrideRow {
    #[tabled(rename = "Domain")]
    domain: String,
    #[tabled(rename = "Upstream")]
    upstream: String,
    #[tabled(rename = "TLS")]
    tls: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&DomainOverride> for DomainOverrideRow {
    fn from(d: &DomainOverride) -> Self {
        Self {
            domain: d.domain.clone(),
            upstream: d.ip_address.clone(),
            tls: match (d.tls_queries, d.tls_hostname.as_deref()) {
                (false, _) => "no".into(),
                (true, None) => "yes".into(),
                (true, Some(host)) => host.to_owned(),
            },
            description: util::or_dash(&d.description),
        }
    }
}

fn domain_override_detail(d: &DomainOverride) -> String {
    [
        format!("Domain:       {}", d.domain),
        format!("Upstream:     {}", d.ip_address),
        format!("TLS queries:  {}", d.tls_queries),
        format!(
            "TLS hostname: {}",
            d.tls_hostname.as_deref().unwrap_or("-")
        ),
        format!("Description:  {}", util::or_dash(&d.description)),
    ]
    .join("\n")
}

// ── Host override table row ─────────────────────────────────────────

#[derive(Tabled)]
struct HostOverrideRow {
    #[tabled(rename = "Host")]
    fqdn: String,
    #[tabled(rename = "Addresses")]
    addresses: String,
    #[tabled(rename = "Aliases")]
    aliases: usize,
    #[tabled(rename = "Description")]
    description: String,
}

impl From<&HostOverride> for HostOverrideRow {
    fn from(h: &HostOverride) -> Self {
        Self {
            fqdn: h.natural_key(),
            addresses: util::join_or_dash(&h.ip_addresses),
            aliases: h.aliases.len(),
            description: util::or_dash(&h.description),
        }
    }
}

fn host_override_detail(h: &HostOverride) -> String {
    let mut lines = vec![
        format!("Host:        {}", h.host),
        format!("Domain:      {}", h.domain),
        format!("Addresses:   {}", util::join_or_dash(&h.ip_addresses)),
        format!("Description: {}", util::or_dash(&h.description)),
    ];
    if !h.aliases.is_empty() {
        lines.push("Aliases:".to_owned());
        lines.extend(
            h.aliases
                .iter()
                .map(|a| format!("  - {}.{}", a.host, a.domain)),
        );
    }
    lines.join("\n")
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn handle_domain_overrides(
    client: &Client,
    args: ResourceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ResourceCommand::List => {
            let records = client.list_domain_overrides().await?;
            let out = output::render_list(
                global.output,
                &records,
                |d| DomainOverrideRow::from(d),
                |d| d.domain.clone(),
            )?;
            output::print_output(&out, global.quiet);
        }

        ResourceCommand::Get { key } => {
            let record = client.get_domain_override(&key).await?;
            let out = output::render_single(global.output, &record, domain_override_detail, |d| {
                d.domain.clone()
            })?;
            output::print_output(&out, global.quiet);
        }

        ResourceCommand::Create { from_file } => {
            let record: DomainOverride = util::read_record(&from_file)?;
            let created = client.create_domain_override(&record).await?;
            output::status(
                &format!("Domain override '{}' created", created.domain),
                global.quiet,
            );
            output::status(APPLY_HINT, global.quiet);
        }

        ResourceCommand::Update { from_file } => {
            let record: DomainOverride = util::read_record(&from_file)?;
            let updated = client.update_domain_override(&record).await?;
            output::status(
                &format!("Domain override '{}' updated", updated.domain),
                global.quiet,
            );
        }

        ResourceCommand::Delete { key } => {
            if !util::confirm(&format!("Delete domain override '{key}'?"), global.yes)? {
                return Ok(());
            }
            client.delete_domain_override(&key).await?;
            output::status(&format!("Domain override '{key}' deleted"), global.quiet);
        }
    }
    Ok(())
}

pub async fn handle_host_overrides(
    client: &Client,
    args: ResourceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        ResourceCommand::List => {
            let records = client.list_host_overrides().await?;
            let out = output::render_list(
                global.output,
                &records,
                |h| HostOverrideRow::from(h),
                ManagedResource::natural_key,
            )?;
            output::print_output(&out, global.quiet);
        }

        ResourceCommand::Get { key } => {
            let record = client.get_host_override(&key).await?;
            let out = output::render_single(
                global.output,
                &record,
                host_override_detail,
                ManagedResource::natural_key,
            )?;
            output::print_output(&out, global.quiet);
        }

        ResourceCommand::Create { from_file } => {
            let record: HostOverride = util::read_record(&from_file)?;
            let created = client.create_host_override(&record).await?;
            output::status(
                &format!("Host override '{}' created", created.natural_key()),
                global.quiet,
            );
            output::status(APPLY_HINT, global.quiet);
        }

        ResourceCommand::Update { from_file } => {
            let record: HostOverride = util::read_record(&from_file)?;
            let updated = client.update_host_override(&record).await?;
            output::status(
                &format!("Host override '{}' updated", updated.natural_key()),
                global.quiet,
            );
        }

        ResourceCommand::Delete { key } => {
            if !util::confirm(&format!("Delete host override '{key}'?"), global.yes)? {
                return Ok(());
            }
            client.delete_host_override(&key).await?;
            output::status(&format!("Host override '{key}' deleted"), global.quiet);
        }
    }
    Ok(())
}
