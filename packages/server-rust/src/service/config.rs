use std::path::PathBuf;

use catalog_core::ApiVersion;

/// Gateway-level configuration for action dispatch and the utility routes.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Public base URL of the site, used to build `help` links. No trailing slash.
    pub site_url: String,
    /// Human-readable site name reported by `status_show`.
    pub site_title: String,
    /// Path prefix all API routes live under (e.g. `/api`).
    pub api_prefix: String,
    /// Version assumed for unversioned action routes.
    pub default_api_version: ApiVersion,
    /// Highest version accepted in a route.
    pub max_api_version: ApiVersion,
    /// Locales served by the i18n route.
    pub locales: Vec<String>,
    /// Directory holding `<lang>.js` translation files.
    pub i18n_dir: PathBuf,
}

impl GatewayConfig {
    /// Documentation link for an action, as placed in every resolved envelope.
    #[must_use]
    pub fn help_url(&self, version: ApiVersion, action: &str) -> String {
        let name: String = url::form_urlencoded::byte_serialize(action.as_bytes()).collect();
        format!(
            "{}{}/{version}/action/help_show?name={name}",
            self.site_url.trim_end_matches('/'),
            self.api_prefix.trim_end_matches('/')
        )
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            site_url: "http://localhost:5000".to_string(),
            site_title: "Data Catalog".to_string(),
            api_prefix: "/api".to_string(),
            default_api_version: ApiVersion::V3,
            max_api_version: ApiVersion::V3,
            locales: vec!["en".to_string()],
            i18n_dir: PathBuf::from("i18n"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gateway_config_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.api_prefix, "/api");
        assert_eq!(config.default_api_version, ApiVersion::V3);
        assert_eq!(config.max_api_version, ApiVersion::V3);
        assert_eq!(config.locales, vec!["en"]);
    }

    #[test]
    fn help_url_is_deterministic() {
        let config = GatewayConfig {
            site_url: "https://data.example.org/".to_string(),
            ..GatewayConfig::default()
        };
        assert_eq!(
            config.help_url(ApiVersion::V3, "package_show"),
            "https://data.example.org/api/3/action/help_show?name=package_show"
        );
        assert_eq!(
            config.help_url(ApiVersion::V3, "package_show"),
            config.help_url(ApiVersion::V3, "package_show")
        );
    }

    #[test]
    fn help_url_ignores_trailing_prefix_slash() {
        let config = GatewayConfig {
            site_url: "https://data.example.org".to_string(),
            api_prefix: "/api/".to_string(),
            ..GatewayConfig::default()
        };
        assert_eq!(
            config.help_url(ApiVersion::V3, "package_show"),
            "https://data.example.org/api/3/action/help_show?name=package_show"
        );
    }

    #[test]
    fn help_url_encodes_name() {
        let config = GatewayConfig::default();
        assert!(config
            .help_url(ApiVersion::V3, "a b&c")
            .ends_with("help_show?name=a+b%26c"));
    }
}
