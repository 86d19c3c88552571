use core_config::{AppInfo, FromEnv, app_info, server::ServerConfig};
use domain_notifications::{DeliveryPolicy, TransportConfig};

pub use core_config::Environment;

/// Application configuration, composed from the shared config pieces.
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub server: ServerConfig,
    pub environment: Environment,
    pub transport: TransportConfig,
    pub delivery: DeliveryPolicy,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        Ok(Self {
            app: app_info!(),
            server: ServerConfig::from_env()?, // HOST=0.0.0.0, PORT=3000, REQUEST_TIMEOUT_MS=30000
            environment: Environment::from_env(),
            transport: TransportConfig::from_env()?, // MAIL_TRANSPORT=smtp unless set
            delivery: DeliveryPolicy::from_env()?,
        })
    }
}
