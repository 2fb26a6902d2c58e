//! Network descriptors and the registry of built-in and custom networks.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

use crate::derivation::{paths, DerivationPath, Purpose};
use crate::error::{WalletError, WalletResult};

pub const REGISTRY_VERSION: u32 = 1;
pub const DEFAULT_EVM_PATH: &str = "m/44'/60'/0'/0/{index}";
const INDEX_PLACEHOLDER: &str = "{index}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkFamily {
    Evm,
    Utxo,
    Xrp,
}

impl fmt::Display for NetworkFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            NetworkFamily::Evm => "evm",
            NetworkFamily::Utxo => "utxo",
            NetworkFamily::Xrp => "xrp",
        })
    }
}

/// Bitcoin output script flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressType {
    /// Legacy: 1...
    #[serde(rename = "P2PKH")]
    P2pkh,
    /// SegWit-compatible: 3...
    #[serde(rename = "P2SH-P2WPKH")]
    P2shP2wpkh,
    /// Native SegWit: bc1...
    #[serde(rename = "P2WPKH")]
    P2wpkh,
}

impl AddressType {
    pub fn purpose(self) -> Purpose {
        match self {
            AddressType::P2pkh => Purpose::Bip44,
            AddressType::P2shP2wpkh => Purpose::Bip49,
            AddressType::P2wpkh => Purpose::Bip84,
        }
    }
}

/// Describes one network the engine can derive accounts and sign for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkDescriptor {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub family: NetworkFamily,
    #[serde(default)]
    pub symbol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_type: Option<AddressType>,
    /// SLIP-44 coin type. Filled in from the path's second level when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coin_type: Option<u32>,
    pub derivation_path: String,
    #[serde(default)]
    pub testnet: bool,
}

impl NetworkDescriptor {
    pub fn ethereum() -> Self {
        NetworkDescriptor {
            key: "ETH".to_string(),
            name: "Ethereum".to_string(),
            family: NetworkFamily::Evm,
            symbol: "ETH".to_string(),
            chain_id: Some(1),
            address_type: None,
            coin_type: Some(paths::ETHEREUM),
            derivation_path: DEFAULT_EVM_PATH.to_string(),
            testnet: false,
        }
    }

    pub fn xdc() -> Self {
        NetworkDescriptor {
            key: "XDC".to_string(),
            name: "XDC Network".to_string(),
            family: NetworkFamily::Evm,
            symbol: "XDC".to_string(),
            chain_id: Some(50),
            address_type: None,
            coin_type: Some(paths::ETHEREUM),
            derivation_path: DEFAULT_EVM_PATH.to_string(),
            testnet: false,
        }
    }

    pub fn bitcoin() -> Self {
        NetworkDescriptor {
            key: "BTC".to_string(),
            name: "Bitcoin".to_string(),
            family: NetworkFamily::Utxo,
            symbol: "BTC".to_string(),
            chain_id: None,
            address_type: Some(AddressType::P2wpkh),
            coin_type: Some(paths::BITCOIN),
            derivation_path: "m/84'/0'/0'/0/{index}".to_string(),
            testnet: false,
        }
    }

    pub fn xrp() -> Self {
        NetworkDescriptor {
            key: "XRP".to_string(),
            name: "XRP Ledger".to_string(),
            family: NetworkFamily::Xrp,
            symbol: "XRP".to_string(),
            chain_id: None,
            address_type: None,
            coin_type: Some(paths::RIPPLE),
            derivation_path: "m/44'/144'/0'/0/{index}".to_string(),
            testnet: false,
        }
    }

    pub fn builtins() -> Vec<Self> {
        vec![Self::ethereum(), Self::xdc(), Self::bitcoin(), Self::xrp()]
    }

    /// Bitcoin script type, defaulting to native SegWit.
    pub fn utxo_address_type(&self) -> AddressType {
        self.address_type.unwrap_or(AddressType::P2wpkh)
    }

    pub fn validate(&self) -> WalletResult<()> {
        if self.key.trim().is_empty() {
            return Err(WalletError::config("network key is required"));
        }
        if self.family == NetworkFamily::Evm && self.chain_id.is_none() {
            return Err(WalletError::config(format!(
                "EVM network {} requires a chain_id",
                self.key
            )));
        }
        let path = self.derivation_path(0)?;

        if let Some(coin_type) = self.coin_type {
            if path.coin_type() != Some(coin_type) {
                return Err(WalletError::config(format!(
                    "network {} has coin type {} but path {} does not",
                    self.key, coin_type, path
                )));
            }
        }

        if self.family == NetworkFamily::Utxo {
            let purpose = self.utxo_address_type().purpose() as u32;
            if path.purpose() != Some(purpose) {
                return Err(WalletError::config(format!(
                    "network {} uses {:?} addresses, which derive under m/{}' and not {}",
                    self.key,
                    self.utxo_address_type(),
                    purpose,
                    path
                )));
            }
        }
        Ok(())
    }

    // Missing coin types come from the path once it has validated.
    fn fill_coin_type(&mut self) {
        if self.coin_type.is_none() {
            self.coin_type = self
                .derivation_path(0)
                .ok()
                .and_then(|path| path.coin_type());
        }
    }

    /// Concrete path for `index`. A template without `{index}` is taken as
    /// is, in which case the path's leaf is the account index.
    pub fn derivation_path(&self, index: u32) -> WalletResult<DerivationPath> {
        let template = self.derivation_path.trim();
        let path = if template.contains(INDEX_PLACEHOLDER) {
            template.replace(INDEX_PLACEHOLDER, &index.to_string())
        } else {
            template.to_string()
        };
        path.parse::<DerivationPath>().map_err(WalletError::from)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct RegistryDocument {
    version: u32,
    #[serde(default)]
    networks: Vec<NetworkDescriptor>,
}

/// Built-in networks plus user supplied EVM networks, keyed by upper-case key.
#[derive(Debug, Clone)]
pub struct NetworkRegistry {
    networks: BTreeMap<String, NetworkDescriptor>,
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        let networks = NetworkDescriptor::builtins()
            .into_iter()
            .map(|n| (n.key.clone(), n))
            .collect();
        NetworkRegistry { networks }
    }
}

impl NetworkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a registry document. Built-ins missing from it are restored.
    pub fn from_json(json: &str) -> WalletResult<Self> {
        let document: RegistryDocument = serde_json::from_str(json)?;
        if document.version != REGISTRY_VERSION {
            return Err(WalletError::config(format!(
                "unsupported network registry version {}",
                document.version
            )));
        }

        let mut registry = NetworkRegistry {
            networks: BTreeMap::new(),
        };
        for mut network in document.networks {
            network.key = network.key.trim().to_uppercase();
            if let Err(e) = network.validate() {
                warn!(key = %network.key, error = %e, "skipping invalid network entry");
                continue;
            }
            network.fill_coin_type();
            registry.networks.insert(network.key.clone(), network);
        }

        for builtin in NetworkDescriptor::builtins() {
            if !registry.networks.contains_key(&builtin.key) {
                debug!(key = %builtin.key, "restoring built-in network");
                registry.networks.insert(builtin.key.clone(), builtin);
            }
        }

        Ok(registry)
    }

    pub fn to_json(&self) -> WalletResult<String> {
        let document = RegistryDocument {
            version: REGISTRY_VERSION,
            networks: self.networks.values().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&document)?)
    }

    pub fn get(&self, key: &str) -> Option<&NetworkDescriptor> {
        self.networks.get(&key.trim().to_uppercase())
    }

    pub fn list(&self) -> impl Iterator<Item = &NetworkDescriptor> {
        self.networks.values()
    }

    pub fn len(&self) -> usize {
        self.networks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    /// Adds or replaces a custom EVM network.
    pub fn add_custom(&mut self, mut network: NetworkDescriptor) -> WalletResult<()> {
        network.key = network.key.trim().to_uppercase();
        if network.key.is_empty() {
            return Err(WalletError::config("network key is required"));
        }
        if network.family != NetworkFamily::Evm {
            return Err(WalletError::config(
                "only EVM networks can be added as custom networks",
            ));
        }
        if network.chain_id.is_none() {
            return Err(WalletError::config("custom networks require a chain_id"));
        }
        if let Some(existing) = self.networks.get(&network.key) {
            if existing.family != NetworkFamily::Evm {
                return Err(WalletError::config(format!(
                    "network {} cannot be replaced",
                    network.key
                )));
            }
        }
        if network.derivation_path.trim().is_empty() {
            network.derivation_path = DEFAULT_EVM_PATH.to_string();
        }
        if network.name.is_empty() {
            network.name = network.key.clone();
        }
        if network.symbol.is_empty() {
            network.symbol = network.key.clone();
        }
        network.validate()?;
        network.fill_coin_type();

        debug!(key = %network.key, chain_id = ?network.chain_id, "registered custom network");
        self.networks.insert(network.key.clone(), network);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygon() -> NetworkDescriptor {
        NetworkDescriptor {
            key: "matic".to_string(),
            name: String::new(),
            family: NetworkFamily::Evm,
            symbol: String::new(),
            chain_id: Some(137),
            address_type: None,
            coin_type: Some(paths::ETHEREUM),
            derivation_path: String::new(),
            testnet: false,
        }
    }

    #[test]
    fn test_builtin_paths() {
        let registry = NetworkRegistry::new();
        assert_eq!(registry.len(), 4);

        let btc = registry.get("btc").unwrap();
        assert_eq!(btc.derivation_path(3).unwrap().to_string(), "m/84'/0'/0'/0/3");
        assert_eq!(btc.utxo_address_type(), AddressType::P2wpkh);

        let xrp = registry.get("XRP").unwrap();
        assert_eq!(xrp.derivation_path(0).unwrap().to_string(), "m/44'/144'/0'/0/0");

        assert_eq!(registry.get("XDC").unwrap().chain_id, Some(50));
    }

    #[test]
    fn test_template_without_placeholder() {
        let mut network = NetworkDescriptor::ethereum();
        network.derivation_path = "m/44'/60'/0'/0/7".to_string();
        let path = network.derivation_path(0).unwrap();
        assert_eq!(path.to_string(), "m/44'/60'/0'/0/7");
        assert_eq!(path.leaf_index(), 7);
    }

    #[test]
    fn test_descriptor_json_field_names() {
        let json = r#"{
            "key": "BTC-TEST",
            "name": "Bitcoin Testnet",
            "type": "utxo",
            "symbol": "tBTC",
            "address_type": "P2SH-P2WPKH",
            "coin_type": 1,
            "derivation_path": "m/49'/1'/0'/0/{index}",
            "testnet": true
        }"#;
        let network: NetworkDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(network.family, NetworkFamily::Utxo);
        assert_eq!(network.address_type, Some(AddressType::P2shP2wpkh));
        assert!(network.testnet);
        assert!(network.validate().is_ok());

        let value = serde_json::to_value(&NetworkDescriptor::ethereum()).unwrap();
        assert_eq!(value["type"], "evm");
        assert_eq!(value["chain_id"], 1);
        assert!(value.get("address_type").is_none());
    }

    #[test]
    fn test_evm_requires_chain_id() {
        let mut network = NetworkDescriptor::ethereum();
        network.chain_id = None;
        assert!(network.validate().is_err());
    }

    #[test]
    fn test_add_custom_network() {
        let mut registry = NetworkRegistry::new();
        registry.add_custom(polygon()).unwrap();

        let matic = registry.get("MATIC").unwrap();
        assert_eq!(matic.derivation_path, DEFAULT_EVM_PATH);
        assert_eq!(matic.name, "MATIC");

        let mut replacement = polygon();
        replacement.chain_id = Some(80001);
        registry.add_custom(replacement).unwrap();
        assert_eq!(registry.get("MATIC").unwrap().chain_id, Some(80001));
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_add_custom_rules() {
        let mut registry = NetworkRegistry::new();

        let mut btc = polygon();
        btc.key = "btc".to_string();
        assert!(registry.add_custom(btc).is_err());

        let mut no_chain = polygon();
        no_chain.chain_id = None;
        assert!(registry.add_custom(no_chain).is_err());

        let mut utxo = polygon();
        utxo.family = NetworkFamily::Utxo;
        assert!(registry.add_custom(utxo).is_err());

        let mut bad_path = polygon();
        bad_path.derivation_path = "44'/60'".to_string();
        assert!(registry.add_custom(bad_path).is_err());
    }

    #[test]
    fn test_registry_json_restores_builtins() {
        let json = r#"{
            "version": 1,
            "networks": [
                {"key": "bsc", "type": "evm", "chain_id": 56, "coin_type": 60,
                 "derivation_path": "m/44'/60'/0'/0/{index}"}
            ]
        }"#;
        let registry = NetworkRegistry::from_json(json).unwrap();
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.get("BSC").unwrap().chain_id, Some(56));
        assert!(registry.get("ETH").is_some());

        let reloaded = NetworkRegistry::from_json(&registry.to_json().unwrap()).unwrap();
        assert_eq!(reloaded.len(), 5);
    }

    #[test]
    fn test_loads_document_without_coin_types() {
        let json = r#"{
            "version": 1,
            "networks": [
                {"key": "ETH", "name": "Ethereum", "type": "evm", "symbol": "ETH",
                 "chain_id": 1, "derivation_path": "m/44'/60'/0'/0/{index}"},
                {"key": "XDC", "name": "XDC Network", "type": "evm", "symbol": "XDC",
                 "chain_id": 50, "derivation_path": "m/44'/60'/0'/0/{index}"},
                {"key": "BTC", "name": "Bitcoin", "type": "utxo", "symbol": "BTC",
                 "address_type": "P2WPKH", "coin_type": 0,
                 "derivation_path": "m/84'/0'/0'/0/{index}"},
                {"key": "XRP", "name": "XRP Ledger", "type": "xrp", "symbol": "XRP",
                 "derivation_path": "m/44'/144'/0'/0/{index}"}
            ]
        }"#;
        let registry = NetworkRegistry::from_json(json).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get("ETH").unwrap(), &NetworkDescriptor::ethereum());
        assert_eq!(registry.get("XDC").unwrap(), &NetworkDescriptor::xdc());
        assert_eq!(registry.get("BTC").unwrap(), &NetworkDescriptor::bitcoin());
        assert_eq!(registry.get("XRP").unwrap(), &NetworkDescriptor::xrp());
    }

    #[test]
    fn test_coin_type_must_match_path() {
        let mut network = NetworkDescriptor::ethereum();
        network.coin_type = Some(paths::RIPPLE);
        assert!(network.validate().is_err());

        network.coin_type = None;
        assert!(network.validate().is_ok());
    }

    #[test]
    fn test_address_type_must_match_purpose() {
        let legacy_on_segwit_path = NetworkDescriptor {
            address_type: Some(AddressType::P2pkh),
            ..NetworkDescriptor::bitcoin()
        };
        let err = legacy_on_segwit_path.validate().unwrap_err();
        assert!(err.to_string().contains("m/44'"));

        let legacy = NetworkDescriptor {
            address_type: Some(AddressType::P2pkh),
            derivation_path: "m/44'/0'/0'/0/{index}".to_string(),
            ..NetworkDescriptor::bitcoin()
        };
        assert!(legacy.validate().is_ok());

        let nested = NetworkDescriptor {
            address_type: Some(AddressType::P2shP2wpkh),
            derivation_path: "m/84'/0'/0'/0/{index}".to_string(),
            ..NetworkDescriptor::bitcoin()
        };
        assert!(nested.validate().is_err());

        // mismatched entries are skipped on load and the built-in comes back
        let json = r#"{
            "version": 1,
            "networks": [
                {"key": "BTC", "type": "utxo", "address_type": "P2PKH",
                 "derivation_path": "m/84'/0'/0'/0/{index}"}
            ]
        }"#;
        let registry = NetworkRegistry::from_json(json).unwrap();
        assert_eq!(registry.get("BTC").unwrap(), &NetworkDescriptor::bitcoin());
    }

    #[test]
    fn test_registry_rejects_unknown_version() {
        let json = r#"{"version": 2, "networks": []}"#;
        assert!(NetworkRegistry::from_json(json).is_err());
    }
}
