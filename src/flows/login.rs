use std::time::Duration;

use tracing::info;

use crate::app::Result;
use crate::browser::{wait, Page};

pub const EXPLORE_URL: &str = "https://www.xiaohongshu.com/explore";

/// Rendered only for a logged-in account.
pub const LOGGED_IN_MARKER: &str = ".main-container .user .link-wrapper .channel";

/// Whether the stored login is still valid.
///
/// A missing marker is `Ok(false)`; only a failing page query is an error.
/// The whole check is bounded by the page timeout.
pub async fn check_login_status<P: Page>(page: &P) -> Result<bool> {
    let page = page.with_timeout(page.timeouts().page());
    page.navigate(EXPLORE_URL).await?;
    wait::wait_load(&page).await?;
    wait::settle(&page, "login marker render", Duration::from_secs(1)).await?;

    let logged_in = page.has(LOGGED_IN_MARKER).await?;
    info!(logged_in, "Checked login status");
    Ok(logged_in)
}

/// Open the explore page and block until the account is logged in.
///
/// Visiting the page shows the QR code dialog when logged out. Loading the
/// page is bounded by the page timeout; the wait for the marker has no
/// deadline and only cancellation ends it.
pub async fn login<P: Page>(page: &P) -> Result<()> {
    let setup = page.with_timeout(page.timeouts().page());
    setup.navigate(EXPLORE_URL).await?;
    wait::wait_load(&setup).await?;
    wait::settle(&setup, "QR dialog render", Duration::from_secs(2)).await?;

    if setup.has(LOGGED_IN_MARKER).await? {
        info!("Already logged in");
        return Ok(());
    }

    info!("Waiting for QR code login");
    wait::wait_present(&page.without_timeout(), LOGGED_IN_MARKER).await?;
    info!("Login completed");
    Ok(())
}
