use crate::app::error::Result;
use crate::app::service::XhsService;
use crate::config::Config;
use crate::images::ImageResolver;

pub struct AppContext {
    pub config: Config,
    pub service: XhsService,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let images = ImageResolver::new(ImageResolver::default_cache_dir())?;
        let service = XhsService::new(config.browser.clone(), config.archive.clone(), images);

        Ok(Self { config, service })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_uses_configured_browser() {
        let mut config = Config::default();
        config.browser.headless = false;
        config.browser.username = Some("tester".into());

        let ctx = AppContext::new(config).unwrap();
        assert!(!ctx.service.browser_settings().headless);
        assert_eq!(ctx.service.browser_settings().username.as_deref(), Some("tester"));
    }
}
