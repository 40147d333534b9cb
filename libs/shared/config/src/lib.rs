use std::env;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Elevated key for background jobs that run without a user JWT.
    pub supabase_service_role_key: String,
    pub supabase_jwt_secret: String,
    /// How often the slot maintenance job rolls the booking horizon forward.
    pub maintenance_interval_hours: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_service_role_key: env::var("SUPABASE_SERVICE_ROLE_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_SERVICE_ROLE_KEY not set, scheduled maintenance will run with the anon key");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            maintenance_interval_hours: env::var("SLOT_MAINTENANCE_INTERVAL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }

    /// Token for background jobs: the service-role key, or the anon key as a
    /// degraded fallback when none is configured.
    pub fn maintenance_token(&self) -> &str {
        if self.supabase_service_role_key.is_empty() {
            &self.supabase_anon_key
        } else {
            &self.supabase_service_role_key
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_keys(service_role_key: &str) -> AppConfig {
        AppConfig {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "anon-key".to_string(),
            supabase_service_role_key: service_role_key.to_string(),
            supabase_jwt_secret: "secret".to_string(),
            maintenance_interval_hours: 24,
        }
    }

    #[test]
    fn maintenance_token_prefers_the_service_role_key() {
        let config = config_with_keys("service-role-key");
        assert_eq!(config.maintenance_token(), "service-role-key");
    }

    #[test]
    fn maintenance_token_falls_back_to_the_anon_key() {
        let config = config_with_keys("");
        assert_eq!(config.maintenance_token(), "anon-key");
    }
}
