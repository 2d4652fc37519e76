//! Activation command handlers.

use pfwarden_api::Client;

use crate::cli::{ApplyArgs, ApplyCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub async fn handle(client: &Client, args: ApplyArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ApplyCommand::Filter => {
            client.reload_firewall_filter().await?;
            output::status("Firewall filter reloaded", global.quiet);
        }
        ApplyCommand::DnsResolver => {
            client.apply_dns_resolver_changes().await?;
            output::status("DNS resolver changes applied", global.quiet);
        }
        ApplyCommand::Dhcp { interface } => {
            client.apply_dhcpv4_changes(&interface).await?;
            output::status(
                &format!("DHCPv4 changes applied on {interface}"),
                global.quiet,
            );
        }
    }
    Ok(())
}
