// Apply operations
//
// Saved changes sit in the config until the owning service is reloaded.
// These are kept apart from the writes so a caller can batch several
// writes and apply once. Each takes the write locks of the categories
// whose pending changes it activates.

use tracing::debug;

use crate::client::Client;
use crate::coordinator::LockCategory;
use crate::error::Error;
use crate::form::{Form, Page};
use crate::resources::dhcp::{DHCP_PAGE, check_interface};
use crate::resources::dns::RESOLVER_PAGE;

const FILTER_RELOAD_PAGE: &str = "/status_filter_reload.php";

impl Client {
    /// Reload the firewall filter so alias changes take effect.
    pub async fn reload_firewall_filter(&self) -> Result<(), Error> {
        let form = Form::new().field("reloadfilter", "Reload Filter");
        self.apply(
            "firewall filter",
            &[LockCategory::Aliases],
            &Page::new(FILTER_RELOAD_PAGE),
            form,
        )
        .await
    }

    /// Restart the DNS resolver with pending override changes.
    pub async fn apply_dns_resolver_changes(&self) -> Result<(), Error> {
        let form = Form::new().field("apply", "Apply Changes");
        self.apply(
            "DNS resolver",
            &[
                LockCategory::DnsDomainOverrides,
                LockCategory::DnsHostOverrides,
            ],
            &Page::new(RESOLVER_PAGE),
            form,
        )
        .await
    }

    /// Apply pending DHCPv4 changes on `interface`.
    pub async fn apply_dhcpv4_changes(&self, interface: &str) -> Result<(), Error> {
        const SCOPE: &str = "DHCPv4 server";

        check_interface(interface).map_err(|e| Error::ApplyFailed {
            scope: SCOPE,
            source: Box::new(e),
        })?;
        let form = Form::new().field("apply", "Apply Changes");
        self.apply(
            SCOPE,
            &[LockCategory::DhcpStaticMappings],
            &Page::new(DHCP_PAGE).with_query("if", interface),
            form,
        )
        .await
    }

    async fn apply(
        &self,
        scope: &'static str,
        categories: &[LockCategory],
        page: &Page,
        form: Form,
    ) -> Result<(), Error> {
        let result = async {
            let _guard = self.write_lock(categories).await?;
            debug!(scope, path = page.path, "applying changes");
            self.submit(page, form, None).await.map(|_| ())
        }
        .await;

        result.map_err(|e| Error::ApplyFailed {
            scope,
            source: Box::new(e),
        })
    }
}
