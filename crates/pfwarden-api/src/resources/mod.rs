// ── Managed resource types ──
//
// One module per console area. Each defines the public record types, the
// raw shapes the config JSON decodes into, and the `Endpoint` binding that
// plugs them into the shared accessor template.

pub mod alias;
pub mod dhcp;
pub mod dns;

pub use alias::{AliasEntry, IpAlias, IpAliasKind, PortAlias, PortAliasEntry};
pub use dhcp::StaticMapping;
pub use dns::{DomainOverride, HostOverride, HostOverrideAlias};

use crate::error::Error;

/// A single DNS label: non-empty, no dots, letters, digits and inner hyphens.
pub(crate) fn check_label(field: &str, value: &str) -> Result<(), Error> {
    let valid = !value.is_empty()
        && value.len() <= 63
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        && !value.starts_with('-')
        && !value.ends_with('-');
    if valid {
        Ok(())
    } else {
        Err(Error::invalid(
            field,
            format!("'{value}' is not a valid host label"),
        ))
    }
}

/// A dotted domain name made of valid labels.
pub(crate) fn check_domain(field: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::invalid(field, "must not be empty"));
    }
    value
        .split('.')
        .try_for_each(|label| check_label(field, label))
        .map_err(|_| Error::invalid(field, format!("'{value}' is not a valid domain name")))
}

/// Text that ends up inside a delimited list on the console.
pub(crate) fn check_no_separator(field: &str, value: &str, separator: &str) -> Result<(), Error> {
    if value.contains(separator) {
        Err(Error::invalid(
            field,
            format!("must not contain '{separator}'"),
        ))
    } else {
        Ok(())
    }
}
