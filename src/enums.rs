use enum_iterator::Sequence;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::Display;
use tracing::warn;

/// LwM2M binding mode, the transports a server expects traffic over.
/// Ref OMA-TS-LightweightM2M table "Behaviour with Current Transport Binding
/// and Modes".
#[allow(clippy::upper_case_acronyms)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Sequence)]
pub enum BindingMode {
    /// UDP
    U,
    /// UDP with queue mode
    UQ,
    /// SMS
    S,
    /// SMS with queue mode
    SQ,
    /// UDP and SMS
    US,
    /// UDP queue mode and SMS
    UQS,
    /// No binding selected, or an unknown one from the wire
    None,
}

/// The fixed bidirectional table between the modes and their short form
const BINDING_MODES: [(BindingMode, &str); 6] = [
    (BindingMode::U, "U"),
    (BindingMode::UQ, "UQ"),
    (BindingMode::S, "S"),
    (BindingMode::SQ, "SQ"),
    (BindingMode::US, "US"),
    (BindingMode::UQS, "UQS"),
];

impl BindingMode {
    /// The short string form, or `None` for [BindingMode::None]
    pub fn as_str(self) -> Option<&'static str> {
        BINDING_MODES
            .iter()
            .find(|(mode, _)| *mode == self)
            .map(|(_, text)| *text)
    }
}

impl From<&str> for BindingMode {
    fn from(input: &str) -> Self {
        match BINDING_MODES.iter().find(|(_, text)| *text == input) {
            Some((mode, _)) => *mode,
            None => {
                warn!("Unknown binding mode {input:?}, treating it as no binding");
                BindingMode::None
            }
        }
    }
}

impl From<String> for BindingMode {
    fn from(input: String) -> Self {
        let input: BindingMode = input.as_str().into();
        input
    }
}

impl Display for BindingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str().unwrap_or(""))
    }
}

impl Serialize for BindingMode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str().unwrap_or(""))
    }
}

impl<'de> Deserialize<'de> for BindingMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(value.into())
    }
}

/// Which transport a server connection runs over
#[derive(Clone, Copy, Debug, PartialEq, Eq, Sequence)]
pub enum TransportKind {
    Udp,
    Dtls,
}

impl TransportKind {
    /// Maps an endpoint scheme to its transport, `None` for schemes this
    /// client can't carry
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme {
            "coap" => Some(TransportKind::Udp),
            "coaps" => Some(TransportKind::Dtls),
            _ => None,
        }
    }

    /// IANA default port for the matching scheme
    pub fn default_port(self) -> u16 {
        match self {
            TransportKind::Udp => 5683,
            TransportKind::Dtls => 5684,
        }
    }
}

impl Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::Udp => write!(f, "UDP"),
            TransportKind::Dtls => write!(f, "DTLS"),
        }
    }
}
