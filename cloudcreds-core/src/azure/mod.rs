//! Azure credential record plus the Azure CLI's own files: the MSAL token
//! cache, `azureProfile.json` and the service-principal entries list.

pub mod cli_sync;
pub mod credentials;
pub mod env;
pub mod jwt;
pub mod msal;
pub mod profile;
pub mod service_principal;

pub use cli_sync::{AzureCliFiles, SyncReport};
pub use credentials::AzureFileManager;
pub use env::environment_variables;
pub use msal::{MsalCache, MsalCacheStore, MsalIdentity, ScopedToken};
pub use profile::{ActiveSubscription, AzureProfile, AzureProfileStore, PrincipalType, SubscriptionEntry};
pub use service_principal::{ServicePrincipalEntry, ServicePrincipalEntryStore};
