use rocket::serde::Deserialize;

/// Application settings, read from the same figment Rocket uses
/// (`Rocket.toml` and `ROCKET_*` environment variables).
#[derive(Debug, Clone, Deserialize)]
#[serde(crate = "rocket::serde", default)]
pub struct AppConfig {
    /// Key used for symmetric token signing.
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub permitted_email_domains: Vec<String>,
    /// Addresses allowed to register regardless of their domain.
    pub test_accounts: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev_jwt_secret_key".to_string(),
            token_ttl_hours: 24,
            permitted_email_domains: vec!["connect.hkust-gz.edu.cn".to_string()],
            test_accounts: vec!["teststudent@university.edu".to_string()],
        }
    }
}

impl AppConfig {
    pub fn is_email_permitted(&self, email: &str) -> bool {
        if self.test_accounts.iter().any(|account| account == email) {
            return true;
        }

        match email.rsplit_once('@') {
            Some((local, domain)) if !local.is_empty() => self
                .permitted_email_domains
                .iter()
                .any(|permitted| permitted.eq_ignore_ascii_case(domain)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permits_school_domain_and_test_accounts() {
        let config = AppConfig::default();

        assert!(config.is_email_permitted("student@connect.hkust-gz.edu.cn"));
        assert!(config.is_email_permitted("student@CONNECT.hkust-gz.edu.cn"));
        assert!(config.is_email_permitted("teststudent@university.edu"));
        assert!(!config.is_email_permitted("someone@gmail.com"));
        assert!(!config.is_email_permitted("@connect.hkust-gz.edu.cn"));
        assert!(!config.is_email_permitted("no-at-sign"));
    }
}
