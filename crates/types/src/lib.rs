//! Core types for the loadbot harness.
//!
//! Two groups of types live here:
//!
//! - **Wire records** ([`records`]): typed request and response bodies for every
//!   endpoint of the content-and-voting API. The client decodes responses into
//!   these at its boundary so no open-ended JSON travels deeper into the harness.
//! - **Domain types** ([`actor`]): the simulated [`Actor`] and the
//!   [`ContentItem`] / [`VoteAction`] values produced on its behalf.

pub mod actor;
pub mod records;

pub use actor::{Actor, ContentItem, VoteAction, VoteDirection};
pub use records::{
    NewPostRequest, PostRecord, RegistrationRequest, RegistrationResponse, TokenRequest,
    TokenResponse, UserRecord, VerifyTokenRequest, VoteRecord,
};

/// Remote user identifier as assigned by the API.
pub type UserId = u64;

/// Remote post identifier as assigned by the API.
pub type PostId = u64;
