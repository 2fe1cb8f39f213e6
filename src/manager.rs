//! # DID Manager
//!
//! Creates the wallet of a device identity and publishes its DID document through an injected
//! name system. The name system is an external collaborator that derives device seeds, opens
//! identity instances for a key pair and publishes documents to them.

use serde::{Deserialize, Serialize};

use crate::document::{DidDocument, Service};
use crate::error::{Err, Error};
use crate::keys::{ed25519, KeyPair};
use crate::operation::builder::{PRIMARY_FRAGMENT, RECOVERY_FRAGMENT};
use crate::wallet::mapper::{qualify, to_did_document};
use crate::wallet::{KeyEntry, KeyRecord, Wallet};
use crate::{tracerr, Result};

/// Fragment of the key agreement key in a new wallet.
pub const KEY_AGREEMENT_FRAGMENT: &str = "#keyAgreement";

/// Fragment of the service instance key recorded in the wallet.
pub const SERVICE_FRAGMENT: &str = "#service";

/// Environment variable read by [`Parameters::from_env`].
pub const METHOD_ENV: &str = "DID_METHOD_NAME";

/// Manager configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    /// DID method name, e.g. `hypns`.
    pub did_method_name: String,

    /// Name of the data service whose instance is opened next to the identity.
    #[serde(default = "Parameters::default_service_name")]
    pub service_name: String,

    /// Index of the data service.
    #[serde(default)]
    pub service_index: u32,

    /// Fragment of the published service endpoint.
    #[serde(default = "Parameters::default_service_fragment")]
    pub service_fragment: String,

    /// Type of the published service endpoint.
    #[serde(default = "Parameters::default_service_type")]
    pub service_type: String,

    /// Scheme of the published service endpoint.
    #[serde(default = "Parameters::default_endpoint_scheme")]
    pub endpoint_scheme: String,

    /// Notes recorded with generated wallet keys.
    #[serde(default = "Parameters::default_notes")]
    pub notes: String,
}

impl Parameters {
    /// Parameters for a DID method with every other value defaulted.
    #[must_use]
    pub fn new(did_method_name: impl Into<String>) -> Self {
        Self {
            did_method_name: did_method_name.into(),
            service_name: Self::default_service_name(),
            service_index: 0,
            service_fragment: Self::default_service_fragment(),
            service_type: Self::default_service_type(),
            endpoint_scheme: Self::default_endpoint_scheme(),
            notes: Self::default_notes(),
        }
    }

    /// Parameters for the method named by the `DID_METHOD_NAME` environment variable.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidConfig` - the variable is unset or empty.
    pub fn from_env() -> Result<Self> {
        match std::env::var(METHOD_ENV) {
            Ok(method) if !method.trim().is_empty() => Ok(Self::new(method.trim())),
            _ => tracerr!(Err::InvalidConfig, "{METHOD_ENV} is not set"),
        }
    }

    /// Check the parameters can be used.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidConfig` - the method name is empty.
    pub fn validate(&self) -> Result<()> {
        if self.did_method_name.trim().is_empty() {
            tracerr!(Err::InvalidConfig, "didMethodName must not be empty");
        }
        Ok(())
    }

    /// DID for a name-system key: `did:<method>:<key>`.
    #[must_use]
    pub fn did(&self, key: &str) -> String {
        let method = self.did_method_name.strip_prefix("did:").unwrap_or(&self.did_method_name);
        format!("did:{method}:{key}")
    }

    fn default_service_name() -> String {
        "service".to_string()
    }

    fn default_service_fragment() -> String {
        "merkle-root".to_string()
    }

    fn default_service_type() -> String {
        "LinkedDomains".to_string()
    }

    fn default_endpoint_scheme() -> String {
        "hypns".to_string()
    }

    fn default_notes() -> String {
        "generated in did Manager.".to_string()
    }
}

/// Name system used to anchor and replicate DID documents.
#[allow(async_fn_in_trait)]
pub trait NameSystem {
    /// Instance type opened for a key pair.
    type Instance: NameInstance;

    /// Deterministic seed for a named device or service.
    async fn device_seed(&self, name: &str) -> anyhow::Result<Vec<u8>>;

    /// Key pair for a seed.
    async fn keypair(&self, seed: &[u8]) -> anyhow::Result<KeyPair>;

    /// Open the instance owned by a key pair.
    async fn open(&self, keypair: &KeyPair) -> anyhow::Result<Self::Instance>;
}

/// An opened name-system instance.
#[allow(async_fn_in_trait)]
pub trait NameInstance {
    /// Wait until the instance is ready.
    async fn ready(&self) -> anyhow::Result<()>;

    /// The latest document published to the instance, if any.
    async fn latest(&self) -> anyhow::Result<Option<DidDocument>>;

    /// Publish a document.
    async fn publish(&self, document: &DidDocument) -> anyhow::Result<()>;

    /// Stable identifier of the instance.
    fn key(&self) -> String;
}

fn name_system_err(e: anyhow::Error) -> Error {
    tracing::error!("name system: {e}");
    Error::from(e.context(Err::NameSystem))
}

/// Manages the wallet and DID document of a device.
#[derive(Debug)]
pub struct DidManager<N: NameSystem> {
    parameters: Parameters,
    name_system: N,
    wallet: Option<Wallet>,
    service_key: Option<String>,
}

impl<N: NameSystem> DidManager<N> {
    /// Start building a manager.
    #[must_use]
    pub const fn builder() -> DidManagerBuilder<N> {
        DidManagerBuilder {
            parameters: None,
            name_system: None,
        }
    }

    /// Manager configuration.
    #[must_use]
    pub const fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The wallet of the last successful [`DidManager::did_document`] call.
    #[must_use]
    pub const fn wallet(&self) -> Option<&Wallet> {
        self.wallet.as_ref()
    }

    /// Key of the service instance opened by the last published document.
    #[must_use]
    pub fn service_key(&self) -> Option<&str> {
        self.service_key.as_deref()
    }

    /// Build a new wallet: an Ed25519 `#primary` key from the seed, a random Ed25519 `#recovery`
    /// key and the X25519 `#keyAgreement` key of the primary.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidKey` - the seed is shorter than 32 bytes.
    pub fn new_wallet(&self, seed: &[u8]) -> Result<Wallet> {
        let primary = ed25519::keys_from_seed(seed)?;
        let recovery = ed25519::generate();
        let agreement = ed25519::to_x25519(&primary)?;
        let notes = &self.parameters.notes;

        let mut wallet = Wallet::new();
        wallet.add(KeyRecord::Signing(
            KeyEntry::new(&primary).fragment(PRIMARY_FRAGMENT).notes(notes),
        ))?;
        wallet.add(KeyRecord::Signing(
            KeyEntry::new(&recovery).fragment(RECOVERY_FRAGMENT).notes(notes),
        ))?;
        wallet.add(KeyRecord::KeyAgreement(
            KeyEntry::new(&agreement).fragment(KEY_AGREEMENT_FRAGMENT).notes(notes),
        ))?;
        Ok(wallet)
    }

    /// Get the DID document of a device, publishing a new one when the device has none.
    ///
    /// A new document is mapped from a new wallet, published, extended with the endpoint of the
    /// device's data service and published again. The manager's wallet is only replaced once the
    /// whole flow succeeds.
    ///
    /// # Errors
    ///
    /// * `Err::NameSystem` - a name system call failed.
    /// * `Err::InvalidKey` - the device seed cannot produce keys.
    pub async fn did_document(&mut self, device_name: &str) -> Result<DidDocument> {
        let seed = self.name_system.device_seed(device_name).await.map_err(name_system_err)?;
        let mut wallet = self.new_wallet(&seed)?;
        let primary = wallet.key(PRIMARY_FRAGMENT)?.keypair();

        let instance = self.name_system.open(&primary).await.map_err(name_system_err)?;
        instance.ready().await.map_err(name_system_err)?;

        if let Some(document) = instance.latest().await.map_err(name_system_err)? {
            tracing::debug!("device {device_name} already has a published document");
            self.wallet = Some(wallet);
            return Ok(document);
        }

        let mut document = to_did_document(&wallet);
        instance.publish(&document).await.map_err(name_system_err)?;

        let service_key = self.open_service(device_name, &mut wallet).await?;
        let did = self.parameters.did(&instance.key());
        document.id = Some(did.clone());
        document.service.push(Service {
            id: format!("{did}#{}", self.parameters.service_fragment),
            type_: self.parameters.service_type.clone(),
            service_endpoint: format!("{}://{service_key}", self.parameters.endpoint_scheme),
        });
        qualify(&did, &mut wallet);

        instance.publish(&document).await.map_err(name_system_err)?;
        tracing::debug!("published {did}");

        self.wallet = Some(wallet);
        self.service_key = Some(service_key);
        Ok(document)
    }

    // Open the device's data service instance and record its key pair in the wallet.
    async fn open_service(&self, device_name: &str, wallet: &mut Wallet) -> Result<String> {
        let name = format!(
            "{device_name}.{}.{}",
            self.parameters.service_name, self.parameters.service_index
        );
        let seed = self.name_system.device_seed(&name).await.map_err(name_system_err)?;
        let keypair = self.name_system.keypair(&seed).await.map_err(name_system_err)?;

        let service = self.name_system.open(&keypair).await.map_err(name_system_err)?;
        service.ready().await.map_err(name_system_err)?;

        wallet.add(KeyRecord::Signing(
            KeyEntry::new(&keypair).fragment(SERVICE_FRAGMENT).notes(&self.parameters.notes),
        ))?;
        Ok(service.key())
    }
}

/// Builder for [`DidManager`]. Both the parameters and the name system are required.
#[derive(Debug)]
pub struct DidManagerBuilder<N: NameSystem> {
    parameters: Option<Parameters>,
    name_system: Option<N>,
}

impl<N: NameSystem> DidManagerBuilder<N> {
    /// Set the parameters.
    #[must_use]
    pub fn parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Set the name system.
    #[must_use]
    pub fn name_system(mut self, name_system: N) -> Self {
        self.name_system = Some(name_system);
        self
    }

    /// Build the manager.
    ///
    /// # Errors
    ///
    /// * `Err::InvalidConfig` - parameters or name system are missing, or the parameters are not
    ///   valid.
    pub fn build(self) -> Result<DidManager<N>> {
        let Some(parameters) = self.parameters else {
            tracerr!(Err::InvalidConfig, "parameters are required");
        };
        parameters.validate()?;
        let Some(name_system) = self.name_system else {
            tracerr!(Err::InvalidConfig, "a name system is required");
        };

        Ok(DidManager {
            parameters,
            name_system,
            wallet: None,
            service_key: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parameter_defaults() {
        let params: Parameters =
            serde_json::from_value(json!({"didMethodName": "hypns"})).expect("should deserialize");
        assert_eq!(params, Parameters::new("hypns"));

        insta::assert_yaml_snapshot!(params, @r###"
        didMethodName: hypns
        serviceName: service
        serviceIndex: 0
        serviceFragment: merkle-root
        serviceType: LinkedDomains
        endpointScheme: hypns
        notes: generated in did Manager.
        "###);
    }

    #[test]
    fn method_name_required() {
        assert!(serde_json::from_value::<Parameters>(json!({"serviceName": "svc"})).is_err());
        let err = Parameters::new(" ").validate().expect_err("should reject");
        assert!(err.is(Err::InvalidConfig));
    }

    #[test]
    fn did_format() {
        assert_eq!(Parameters::new("hypns").did("abc"), "did:hypns:abc");
        assert_eq!(Parameters::new("did:hypns").did("abc"), "did:hypns:abc");
    }
}
