//! Contract classes and quota bucket rules.

use serde::{Deserialize, Serialize};

/// Local (state-governed) contract classes, subject to the regulated/internal
/// quota split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocalContract {
    Estado,
    Serra,
    Salgueiro,
}

/// Municipal contract classes, exempt from the regulated/internal split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MunicipalContract {
    Recife,
    Jaboatao,
}

/// Contract class attached to an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContractClass {
    Local(LocalContract),
    Municipal(MunicipalContract),
}

impl ContractClass {
    /// Parse a wire contract name (case-insensitive, tilde optional).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "ESTADO" => Some(Self::Local(LocalContract::Estado)),
            "SERRA" => Some(Self::Local(LocalContract::Serra)),
            "SALGUEIRO" => Some(Self::Local(LocalContract::Salgueiro)),
            "RECIFE" => Some(Self::Municipal(MunicipalContract::Recife)),
            "JABOATÃO" | "JABOATAO" => Some(Self::Municipal(MunicipalContract::Jaboatao)),
            _ => None,
        }
    }

    /// Canonical wire name.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Local(LocalContract::Estado) => "ESTADO",
            Self::Local(LocalContract::Serra) => "SERRA",
            Self::Local(LocalContract::Salgueiro) => "SALGUEIRO",
            Self::Municipal(MunicipalContract::Recife) => "RECIFE",
            Self::Municipal(MunicipalContract::Jaboatao) => "JABOATÃO",
        }
    }

    pub fn is_municipal(&self) -> bool {
        matches!(self, Self::Municipal(_))
    }
}

impl TryFrom<String> for ContractClass {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s).ok_or_else(|| format!("Unknown contract class: {}", s))
    }
}

impl From<ContractClass> for String {
    fn from(contract: ContractClass) -> Self {
        contract.wire_name().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_contracts() {
        assert_eq!(
            ContractClass::parse("ESTADO"),
            Some(ContractClass::Local(LocalContract::Estado))
        );
        assert_eq!(
            ContractClass::parse("serra"),
            Some(ContractClass::Local(LocalContract::Serra))
        );
        assert!(!ContractClass::parse("SALGUEIRO").unwrap().is_municipal());
    }

    #[test]
    fn test_parse_municipal_with_and_without_tilde() {
        let with = ContractClass::parse("JABOATÃO").unwrap();
        let without = ContractClass::parse("jaboatao").unwrap();
        assert_eq!(with, without);
        assert!(with.is_municipal());
        assert_eq!(with.wire_name(), "JABOATÃO");
    }

    #[test]
    fn test_parse_unknown_is_none() {
        assert_eq!(ContractClass::parse("PARTICULAR"), None);
        assert_eq!(ContractClass::parse(""), None);
    }
}
