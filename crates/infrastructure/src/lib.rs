//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod access_token_provider;
mod filesystem_definition_store;
mod http_identity_provider_client;
mod impersonated_access_token_provider;

pub use access_token_provider::{
    AccessTokenProvider, MetadataServerTokenProvider, StaticAccessTokenProvider,
};
pub use filesystem_definition_store::FileSystemDefinitionStore;
pub use http_identity_provider_client::{HttpIdentityProviderClient, IdentityProviderEndpoints};
pub use impersonated_access_token_provider::{
    CLOUD_PLATFORM_SCOPE, ImpersonatedAccessTokenProvider,
};
