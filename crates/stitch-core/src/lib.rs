// crates/stitch-core/src/lib.rs
//
// stitch-core: Core types, traits, and crypto for the Stitch GraphQL gateway.
//
// This is the leaf crate the rest of the workspace depends on. It defines
// the error taxonomy and its client-facing translation, the operation and
// RPC envelope types, the credential store and RPC client seams, and the
// hybrid envelope cipher.

pub mod account;
pub mod crypto;
pub mod error;
pub mod operation;
pub mod traits;
pub mod translate;

// Re-export key types for ergonomic access from downstream crates.
// Usage: `use stitch_core::GatewayError;`

// Errors
pub use error::{codes, BackendError, ErrorEnvelope, GatewayError};
pub use translate::{translate, ErrorResponse};

// Operations and envelopes
pub use operation::{
    ExecutionResult, GraphQLRequest, Operation, OperationContext, RpcRequestEnvelope,
    RpcResponseEnvelope,
};

// Accounts
pub use account::{lookup_account, AccountRecord};

// Crypto
pub use crypto::{EncryptedPayload, EnvelopeCipher, SymmetricAlgorithm};

// Traits
pub use traits::{CredentialStore, RpcClient, RpcMethod};
