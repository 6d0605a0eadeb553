use config::{Config, File};
use gethostname::gethostname;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::io::ErrorKind;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::enums::BindingMode;
use crate::{LWM2M_VERSION, SSID_ANY, Ssid};

static CONFIG_LOCATIONS: LazyLock<Vec<&'static str>> =
    LazyLock::new(|| ["./goatm2m.json", "~/.config/goatm2m.json"].to_vec());

#[derive(Debug, Deserialize, Serialize, Eq, PartialEq, Clone)]
/// One server entry in the config file
pub struct ServerConfig {
    /// Short Server ID, must be non-zero
    pub ssid: Ssid,
    /// `coap://` or `coaps://` endpoint URI
    pub uri: String,
    /// Bootstrap servers skip the Update pipeline and only get the
    /// reconnect hook
    #[serde(default)]
    pub bootstrap: bool,
}

#[derive(Debug, Deserialize, Eq, PartialEq, Clone, Serialize)]
/// The main config blob for goatm2m, write this as a JSON file and load it
/// and it'll make things go.
pub struct ConfigFile {
    /// Endpoint client name sent as `ep=`, defaults to the machine hostname
    pub endpoint_name: String,
    /// Enabler version sent as `lwm2m=`
    pub lwm2m_version: String,
    /// Registration lifetime in seconds, default is a day
    pub lifetime: i64,
    /// Transport binding advertised at Register time
    pub binding: BindingMode,
    /// MSISDN for the SMS bindings
    pub sms_msisdn: Option<String>,
    /// Local UDP port to bind client sockets to, ephemeral when unset
    pub local_port: Option<u16>,
    /// Default is "INFO"
    pub log_level: String,
    /// The servers to keep registrations alive with
    pub servers: Vec<ServerConfig>,
}

impl ConfigFile {
    /// JSONify the configfile in a pretty way using serde
    pub fn as_json_pretty(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e:?}"))
    }

    /// Checks for things that would break the client at runtime, collecting
    /// every problem rather than stopping at the first
    pub fn check_config(&self) -> Result<(), Vec<String>> {
        let mut errors: Vec<String> = vec![];

        if self.endpoint_name.is_empty() {
            errors.push("endpoint_name must not be empty".to_string());
        }
        if self.lifetime <= 0 {
            errors.push(format!(
                "lifetime must be positive, got {}",
                self.lifetime
            ));
        }

        let mut seen_ssids: Vec<Ssid> = vec![];
        for server in &self.servers {
            if server.ssid == SSID_ANY {
                errors.push(format!("SSID 0 is reserved, URI {}", server.uri));
            }
            if seen_ssids.contains(&server.ssid) {
                errors.push(format!("Duplicate SSID {}", server.ssid));
            } else {
                seen_ssids.push(server.ssid);
            }
            match Endpoint::parse(&server.uri) {
                Ok(endpoint) => {
                    if endpoint.transport().is_none() {
                        errors.push(format!(
                            "Unsupported scheme {:?} in URI {}",
                            endpoint.scheme, server.uri
                        ));
                    }
                }
                Err(error) => {
                    errors.push(format!("Failed to parse URI {}: {error:?}", server.uri))
                }
            }
        }

        match errors.is_empty() {
            true => Ok(()),
            false => Err(errors),
        }
    }

    /// Loads the configuration from a given file, or from the first of
    /// `./goatm2m.json` and `~/.config/goatm2m.json` that exists, with
    /// `GOATM2M_*` environment variables layered on top.
    ///
    /// There is only ever one flat config blob, so the first location that
    /// exists wins, and a file that exists but doesn't load is an error
    /// rather than something to fall back from.
    pub fn try_from(config_path: Option<&String>) -> Result<ConfigFile, std::io::Error> {
        let candidates: Vec<String> = match config_path {
            Some(value) => vec![shellexpand::tilde(value).into_owned()],
            None => CONFIG_LOCATIONS
                .iter()
                .map(|location| shellexpand::tilde(location).into_owned())
                .collect(),
        };

        let filename = candidates
            .iter()
            .find(|path| std::path::Path::new(path).exists())
            .ok_or_else(|| {
                std::io::Error::new(
                    ErrorKind::NotFound,
                    format!("No config file found, tried: {}", candidates.join(", ")),
                )
            })?;

        let config = Config::builder()
            .add_source(File::new(filename, config::FileFormat::Json))
            .add_source(config::Environment::with_prefix("goatm2m"))
            .build()
            .map_err(|e| {
                std::io::Error::other(format!("Couldn't load config from {filename}: {e:?}"))
            })?;

        debug!("Loaded config from {filename}");
        Ok(config.into())
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        let hostname = gethostname();
        let hostname = hostname
            .into_string()
            .unwrap_or_else(|_| "goatm2m".to_string());
        Self {
            endpoint_name: hostname,
            lwm2m_version: LWM2M_VERSION.to_string(),
            lifetime: 86400, // one day
            binding: BindingMode::U,
            sms_msisdn: None,
            local_port: None,
            log_level: "INFO".to_string(),
            servers: vec![],
        }
    }
}

impl Display for ConfigFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let server_uris: Vec<&str> = self.servers.iter().map(|s| s.uri.as_str()).collect();
        f.write_fmt(format_args!(
            "endpoint_name=\"{}\" lwm2m_version={} lifetime={}s binding={} log_level={} servers={:?}",
            self.endpoint_name,
            self.lwm2m_version,
            self.lifetime,
            self.binding,
            self.log_level,
            server_uris,
        ))
    }
}

impl From<Config> for ConfigFile {
    fn from(config: Config) -> Self {
        ConfigFile {
            endpoint_name: config
                .get("endpoint_name")
                .unwrap_or(Self::default().endpoint_name),
            lwm2m_version: config
                .get("lwm2m_version")
                .unwrap_or(Self::default().lwm2m_version),
            lifetime: config.get("lifetime").unwrap_or(Self::default().lifetime),
            binding: config.get("binding").unwrap_or(Self::default().binding),
            sms_msisdn: config.get("sms_msisdn").unwrap_or_default(),
            local_port: config.get("local_port").unwrap_or_default(),
            log_level: config.get("log_level").unwrap_or(Self::default().log_level),
            servers: config.get("servers").unwrap_or_default(),
        }
    }
}

impl FromStr for ConfigFile {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let configfile = File::from_str(input, config::FileFormat::Json);

        let res = Config::builder()
            .add_source(configfile)
            .build()
            .map_err(|e| format!("{e:?}"))?;

        let res: ConfigFile = res.into();
        Ok(res)
    }
}
