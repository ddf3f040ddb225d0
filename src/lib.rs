//! # Vestibule
//!
//! `vestibule` is a credential authentication and session service. A visitor
//! is authenticated either against a locally stored password or by delegating
//! identity to a federated provider (Google-style OAuth); on success the
//! service issues an opaque session token so subsequent requests are
//! recognized without re-authenticating.
//!
//! Authentication is pluggable: each mechanism is a named [`auth::Strategy`]
//! dispatched through a registry, all of them funneling into the same
//! tri-state outcome (success, user-facing failure, internal fault). Session
//! tokens are random values handed to the client once; the store only ever
//! sees their SHA-256 hash.
//!
//! The service object ([`auth::AuthService`]) is constructed explicitly at
//! startup from a hasher, a user repository, and a session store. There is no
//! ambient global state; the HTTP layer receives the service through an
//! [`axum::Extension`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod users;
