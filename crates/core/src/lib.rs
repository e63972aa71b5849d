pub mod domain;
pub mod ingest;
pub mod poll;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub base_url: Option<String>,
        pub api_token: Option<String>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                base_url: std::env::var("VOLGUARD_BASE_URL").ok(),
                api_token: std::env::var("VOLGUARD_API_TOKEN").ok(),
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_base_url(&self) -> anyhow::Result<&str> {
            self.base_url
                .as_deref()
                .context("VOLGUARD_BASE_URL is required")
        }
    }
}
