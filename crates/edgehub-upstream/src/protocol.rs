// ── Upstream protocols ──
//
// Wire protocols the hub accepts and the ordered fallback list walked when
// no protocol is pinned.

use std::slice;

use crate::error::Error;

/// Transport protocol for the upstream connection.
///
/// Parsed case-insensitively from settings (`"amqpws"`, `"MqttWs"`, ...).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(ascii_case_insensitive)]
pub enum UpstreamProtocol {
    Amqp,
    AmqpWs,
    Mqtt,
    MqttWs,
    Http,
}

impl UpstreamProtocol {
    /// Tunnels over WebSocket on 443.
    pub fn uses_websocket(self) -> bool {
        matches!(self, Self::AmqpWs | Self::MqttWs)
    }

    /// Can traverse an HTTP proxy. Raw AMQP and MQTT cannot.
    pub fn supports_proxy(self) -> bool {
        self.uses_websocket() || self == Self::Http
    }

    pub fn default_port(self) -> u16 {
        match self {
            Self::Amqp => 5671,
            Self::Mqtt => 8883,
            Self::AmqpWs | Self::MqttWs | Self::Http => 443,
        }
    }
}

// ── ProtocolOrder ───────────────────────────────────────────────────

/// Non-empty, duplicate-free fallback order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolOrder(Vec<UpstreamProtocol>);

impl ProtocolOrder {
    pub fn new(protocols: Vec<UpstreamProtocol>) -> Result<Self, Error> {
        if protocols.is_empty() {
            return Err(Error::InvalidConfiguration(
                "protocol fallback order must not be empty".into(),
            ));
        }
        for (i, protocol) in protocols.iter().enumerate() {
            if protocols[..i].contains(protocol) {
                return Err(Error::InvalidConfiguration(format!(
                    "protocol {protocol} listed more than once in fallback order"
                )));
            }
        }
        Ok(Self(protocols))
    }

    /// Parse a list of protocol names.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self, Error> {
        let protocols = names
            .iter()
            .map(|name| {
                let name = name.as_ref().trim();
                name.parse::<UpstreamProtocol>().map_err(|_| {
                    Error::InvalidConfiguration(format!("unknown upstream protocol '{name}'"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(protocols)
    }

    pub fn iter(&self) -> slice::Iter<'_, UpstreamProtocol> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[UpstreamProtocol] {
        &self.0
    }
}

impl Default for ProtocolOrder {
    /// AMQP, AMQP over WebSocket, MQTT, MQTT over WebSocket.
    fn default() -> Self {
        Self(vec![
            UpstreamProtocol::Amqp,
            UpstreamProtocol::AmqpWs,
            UpstreamProtocol::Mqtt,
            UpstreamProtocol::MqttWs,
        ])
    }
}

impl<'a> IntoIterator for &'a ProtocolOrder {
    type Item = &'a UpstreamProtocol;
    type IntoIter = slice::Iter<'a, UpstreamProtocol>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use strum::IntoEnumIterator;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("amqpws".parse::<UpstreamProtocol>().unwrap(), UpstreamProtocol::AmqpWs);
        assert_eq!("MQTT".parse::<UpstreamProtocol>().unwrap(), UpstreamProtocol::Mqtt);
        assert!("Websocket".parse::<UpstreamProtocol>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for protocol in UpstreamProtocol::iter() {
            assert_eq!(protocol.to_string().parse::<UpstreamProtocol>().unwrap(), protocol);
        }
    }

    #[test]
    fn only_tunnelled_protocols_cross_a_proxy() {
        let proxied: Vec<_> = UpstreamProtocol::iter().filter(|p| p.supports_proxy()).collect();
        assert_eq!(
            proxied,
            vec![UpstreamProtocol::AmqpWs, UpstreamProtocol::MqttWs, UpstreamProtocol::Http]
        );
        assert_eq!(UpstreamProtocol::Amqp.default_port(), 5671);
        assert_eq!(UpstreamProtocol::MqttWs.default_port(), 443);
    }

    #[test]
    fn default_order() {
        assert_eq!(
            ProtocolOrder::default().as_slice(),
            &[
                UpstreamProtocol::Amqp,
                UpstreamProtocol::AmqpWs,
                UpstreamProtocol::Mqtt,
                UpstreamProtocol::MqttWs,
            ]
        );
    }

    #[test]
    fn rejects_empty_and_duplicate_orders() {
        assert!(matches!(ProtocolOrder::new(vec![]), Err(Error::InvalidConfiguration(_))));
        assert!(matches!(
            ProtocolOrder::new(vec![UpstreamProtocol::Mqtt, UpstreamProtocol::Mqtt]),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn parses_name_lists() {
        let order = ProtocolOrder::parse(&["mqttws", " AmqpWs "]).unwrap();
        assert_eq!(order.as_slice(), &[UpstreamProtocol::MqttWs, UpstreamProtocol::AmqpWs]);
        assert!(ProtocolOrder::parse(&["smtp"]).is_err());
    }
}
