use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Card network a merchant accepts through the payment sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CardNetwork {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Jcb,
    UnionPay,
    Interac,
    Maestro,
}

impl CardNetwork {
    /// Networks accepted when the configuration names none
    pub fn defaults() -> BTreeSet<CardNetwork> {
        BTreeSet::from([CardNetwork::Visa, CardNetwork::Mastercard, CardNetwork::Amex])
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardNetwork::Visa => "visa",
            CardNetwork::Mastercard => "mastercard",
            CardNetwork::Amex => "amex",
            CardNetwork::Discover => "discover",
            CardNetwork::Jcb => "jcb",
            CardNetwork::UnionPay => "unionpay",
            CardNetwork::Interac => "interac",
            CardNetwork::Maestro => "maestro",
        }
    }
}

impl fmt::Display for CardNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CardNetwork {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match normalized.as_str() {
            "visa" => Ok(CardNetwork::Visa),
            "mastercard" => Ok(CardNetwork::Mastercard),
            "amex" | "americanexpress" => Ok(CardNetwork::Amex),
            "discover" => Ok(CardNetwork::Discover),
            "jcb" => Ok(CardNetwork::Jcb),
            "unionpay" | "chinaunionpay" => Ok(CardNetwork::UnionPay),
            "interac" => Ok(CardNetwork::Interac),
            "maestro" => Ok(CardNetwork::Maestro),
            _ => Err(ValidationError::UnknownCardNetwork(s.to_string())),
        }
    }
}

impl Serialize for CardNetwork {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CardNetwork {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_network_spellings() {
        assert_eq!("masterCard".parse::<CardNetwork>().unwrap(), CardNetwork::Mastercard);
        assert_eq!("master_card".parse::<CardNetwork>().unwrap(), CardNetwork::Mastercard);
        assert_eq!("American Express".parse::<CardNetwork>().unwrap(), CardNetwork::Amex);
        assert_eq!("VISA".parse::<CardNetwork>().unwrap(), CardNetwork::Visa);
    }

    #[test]
    fn test_unknown_network_is_rejected() {
        assert_eq!(
            "dinersclub".parse::<CardNetwork>(),
            Err(ValidationError::UnknownCardNetwork("dinersclub".to_string()))
        );
    }

    #[test]
    fn test_default_networks() {
        let defaults = CardNetwork::defaults();
        assert_eq!(defaults.len(), 3);
        assert!(defaults.contains(&CardNetwork::Amex));
    }
}
