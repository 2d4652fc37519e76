//! Command dispatch: bridges CLI args -> client calls -> output formatting.

pub mod aliases;
pub mod apply;
pub mod config_cmd;
pub mod dhcp;
pub mod dns;
pub mod exec;
pub mod util;

use pfwarden_api::Client;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a console-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, client: &Client, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::IpAliases(args) => aliases::handle_ip(client, args, global).await,
        Command::PortAliases(args) => aliases::handle_port(client, args, global).await,
        Command::DomainOverrides(args) => dns::handle_domain_overrides(client, args, global).await,
        Command::HostOverrides(args) => dns::handle_host_overrides(client, args, global).await,
        Command::StaticMappings(args) => dhcp::handle(client, args, global).await,
        Command::Apply(args) => apply::handle(client, args, global).await,
        Command::Exec(args) => exec::handle_exec(client, args, global).await,
        Command::Read { path } => exec::handle_read(client, &path, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
