//! Data types shared across the resolver.

pub mod address;
pub mod config;
pub mod listing;
pub mod result;
pub mod status;

pub use address::{Address, AddressInputType};
pub use config::ResolverConfig;
pub use listing::{spec_keys, MlsInfo, PropertyRecord};
pub use result::{
    FetchPropertyRequest, FetchPropertyResponse, FetchPropertyResult, PurgeOutcome, PurgeRequest,
    PurgeResponse, ResolveRequest, CACHE_SOURCE,
};
pub use status::{ActionState, ActionStatus};
