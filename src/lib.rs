//! Distributed access/refresh-token rotation coordinator: single-flight renewal, grace-window
//! lineage, and fail-closed token stores for services that run as many concurrent replicas.
//!
//! The entry point is [`coordinator::RefreshCoordinator`]. It composes a
//! [`codec::TokenCodec`] for stateless access credentials, a [`store::RefreshTokenStore`] for
//! refresh lineage, and the [`lock::SingleFlightLock`] + [`cache::RenewalResultCache`] pair that
//! makes concurrent renewals for one principal converge on a single rotation. The
//! [`gate::Gate`] turns that into a per-request decision and scopes an [`context::AuthContext`].

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod cache;
pub mod clock;
pub mod codec;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod gate;
pub mod kv;
pub mod lock;
pub mod obs;
pub mod store;

mod _prelude {
	pub use std::{
		collections::{BTreeSet, HashMap, HashSet},
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

pub use jsonwebtoken;
pub use time;
