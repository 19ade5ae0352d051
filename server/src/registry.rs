use std::collections::HashMap;

use protocol::{CipherBinding, ClientLanguage, ClientVersion};

use crate::error::{ConnectServerError, Result};
use crate::settings::{CipherKind, Settings};

/// Maps protocol generations to their cipher pairs.
///
/// Populated fully before the listener accepts its first connection and
/// never mutated afterwards, so lookups need no locking.
pub struct CipherRegistry {
    bindings: HashMap<ClientVersion, CipherBinding>,
    default_version: ClientVersion,
}

impl CipherRegistry {
    #[must_use]
    pub fn new(default_version: ClientVersion) -> Self {
        Self {
            bindings: HashMap::new(),
            default_version,
        }
    }

    /// Builds the registry from the static registration table in the
    /// settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let mut registry = Self::new(settings.default_client_version);
        for client in &settings.clients {
            let binding = match client.cipher {
                CipherKind::Classic => CipherBinding::classic(),
                CipherKind::Plaintext => CipherBinding::plaintext(),
            };
            registry.register(client.version, binding)?;
        }
        Ok(registry)
    }

    /// Registers a cipher binding for one exact version key.
    ///
    /// A duplicate exact key is a configuration error and fails fast at
    /// startup.
    pub fn register(&mut self, version: ClientVersion, binding: CipherBinding) -> Result<()> {
        match self.bindings.entry(version) {
            std::collections::hash_map::Entry::Occupied(_) => {
                Err(ConnectServerError::DuplicateVersion(version))
            }
            std::collections::hash_map::Entry::Vacant(slot) => {
                slot.insert(binding);
                Ok(())
            }
        }
    }

    /// Resolves the binding for a declared client version.
    ///
    /// An exact-language registration wins over an `Invariant` one; when
    /// nothing matches the caller must fall back to the configured default
    /// version rather than guess a cipher.
    #[must_use]
    pub fn resolve(&self, declared: &ClientVersion) -> Option<&CipherBinding> {
        if let Some(binding) = self.bindings.get(declared) {
            return Some(binding);
        }
        let invariant = ClientVersion::new(declared.season, declared.episode, ClientLanguage::Invariant);
        self.bindings.get(&invariant)
    }

    /// Resolves `declared`, falling back to the configured default version.
    pub fn resolve_or_default(&self, declared: &ClientVersion) -> Result<&CipherBinding> {
        if let Some(binding) = self.resolve(declared) {
            return Ok(binding);
        }
        log::debug!(
            "no cipher registered for {}, falling back to default version {}",
            declared,
            self.default_version
        );
        self.resolve(&self.default_version)
            .ok_or(ConnectServerError::UnknownVersion(self.default_version))
    }

    #[must_use]
    pub const fn default_version(&self) -> ClientVersion {
        self.default_version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::CipherAlgorithm;

    fn invariant(season: u8, episode: u8) -> ClientVersion {
        ClientVersion::new(season, episode, ClientLanguage::Invariant)
    }

    #[test]
    fn duplicate_registration_fails_fast() {
        let mut registry = CipherRegistry::new(invariant(6, 3));
        registry
            .register(invariant(6, 3), CipherBinding::classic())
            .unwrap();

        let result = registry.register(invariant(6, 3), CipherBinding::plaintext());
        assert!(matches!(
            result,
            Err(ConnectServerError::DuplicateVersion(_))
        ));
    }

    #[test]
    fn invariant_binding_serves_any_language() {
        let mut registry = CipherRegistry::new(invariant(6, 3));
        registry
            .register(invariant(6, 3), CipherBinding::classic())
            .unwrap();

        let declared = ClientVersion::new(6, 3, ClientLanguage::Thai);
        assert!(registry.resolve(&declared).is_some());
    }

    #[test]
    fn exact_language_wins_over_invariant() {
        let mut registry = CipherRegistry::new(invariant(6, 3));
        registry
            .register(invariant(6, 3), CipherBinding::classic())
            .unwrap();
        registry
            .register(
                ClientVersion::new(6, 3, ClientLanguage::English),
                CipherBinding::plaintext(),
            )
            .unwrap();

        let declared = ClientVersion::new(6, 3, ClientLanguage::English);
        let binding = registry.resolve(&declared).unwrap();
        assert!(matches!(
            binding.client_to_server,
            CipherAlgorithm::Identity
        ));

        // Any other language still reaches the invariant binding.
        let declared = ClientVersion::new(6, 3, ClientLanguage::Korean);
        let binding = registry.resolve(&declared).unwrap();
        assert!(matches!(
            binding.client_to_server,
            CipherAlgorithm::ChainedXor { .. }
        ));
    }

    #[test]
    fn unknown_version_falls_back_to_default() {
        let mut registry = CipherRegistry::new(invariant(6, 3));
        registry
            .register(invariant(6, 3), CipherBinding::classic())
            .unwrap();

        let declared = ClientVersion::new(1, 0, ClientLanguage::English);
        assert!(registry.resolve(&declared).is_none());
        assert!(registry.resolve_or_default(&declared).is_ok());
    }

    #[test]
    fn builds_from_settings() {
        let settings = Settings::default();
        let registry = CipherRegistry::from_settings(&settings).unwrap();
        assert_eq!(registry.len(), settings.clients.len());
        assert!(registry.resolve(&settings.default_client_version).is_some());
    }
}
