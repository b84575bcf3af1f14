//! Inbound verify-or-renew decision and request-scoped context handling.
//!
//! The gate sits between the HTTP layer and the coordinator. It receives raw header values,
//! decides whether the bearer credential is good enough or a renewal is needed, and hands back
//! the directives the response must carry so the client's next request already presents the
//! rotated pair. Translating [`Error`]s into status codes stays with the caller; use
//! [`Error::disposition`] to tell "log in again" from "retry shortly".

// self
use crate::{
	_prelude::*,
	auth::TokenPair,
	context::{AuthContext, AuthenticatedPrincipal},
	coordinator::RefreshCoordinator,
};

/// Credentials carried by one inbound request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct InboundCredentials {
	/// Access credential from `Authorization: Bearer <token>`.
	pub bearer: Option<String>,
	/// Refresh credential from the refresh cookie.
	pub refresh: Option<String>,
}
impl InboundCredentials {
	/// Extracts credentials from raw `Authorization` and `Cookie` header values.
	pub fn from_headers(
		authorization: Option<&str>,
		cookie: Option<&str>,
		cookie_name: &str,
	) -> Self {
		Self {
			bearer: authorization.and_then(parse_bearer),
			refresh: cookie.and_then(|header| parse_cookie(header, cookie_name)),
		}
	}
}
impl Debug for InboundCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("InboundCredentials")
			.field("bearer", &self.bearer.as_ref().map(|_| "<redacted>"))
			.field("refresh", &self.refresh.as_ref().map(|_| "<redacted>"))
			.finish()
	}
}

/// Response directives applied after a renewal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenewalDirectives {
	/// The renewed pair.
	pub pair: TokenPair,
	access_header: String,
	refresh_cookie: String,
	max_age: Duration,
}
impl RenewalDirectives {
	/// Header `(name, value)` carrying the new access credential.
	pub fn access_header(&self) -> (&str, &str) {
		(&self.access_header, self.pair.access.token.expose())
	}

	/// `Set-Cookie` value carrying the new refresh credential.
	pub fn set_cookie(&self) -> String {
		cookie_directive(
			&self.refresh_cookie,
			self.pair.refresh.value.expose(),
			self.max_age.whole_seconds(),
		)
	}
}

/// Result of [`Gate::authorize`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GateDecision {
	/// Principal to place into the request context.
	pub principal: AuthenticatedPrincipal,
	/// Present when the request was authorized through a renewal.
	pub renewal: Option<RenewalDirectives>,
}

/// Handler output together with any renewal directives for the response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Served<T> {
	/// Value returned by the handler.
	pub value: T,
	/// Present when the request was authorized through a renewal.
	pub renewal: Option<RenewalDirectives>,
}

/// Inbound gate over a shared coordinator.
#[derive(Clone, Debug)]
pub struct Gate {
	coordinator: Arc<RefreshCoordinator>,
}
impl Gate {
	/// Creates a gate for `coordinator`.
	pub fn new(coordinator: Arc<RefreshCoordinator>) -> Self {
		Self { coordinator }
	}

	/// Underlying coordinator.
	pub fn coordinator(&self) -> &RefreshCoordinator {
		&self.coordinator
	}

	/// Parses raw header values using the configured cookie name.
	pub fn credentials(
		&self,
		authorization: Option<&str>,
		cookie: Option<&str>,
	) -> InboundCredentials {
		InboundCredentials::from_headers(
			authorization,
			cookie,
			&self.coordinator.config().refresh_cookie,
		)
	}

	/// Verifies the bearer credential, renewing through the refresh cookie when it is missing or
	/// no longer valid.
	pub async fn authorize(&self, credentials: &InboundCredentials) -> Result<GateDecision> {
		if let Some(bearer) = &credentials.bearer {
			match self.coordinator.verify(bearer) {
				Ok(claims) => return Ok(GateDecision { principal: claims.into(), renewal: None }),
				Err(Error::AccessInvalid) => {},
				Err(e) => return Err(e),
			}
		}

		let Some(refresh) = &credentials.refresh else {
			return Err(if credentials.bearer.is_some() {
				Error::AccessInvalid
			} else {
				Error::Unauthenticated
			});
		};
		let pair = self.coordinator.renew_presented(refresh).await?;
		let config = self.coordinator.config();

		Ok(GateDecision {
			principal: (&pair.access).into(),
			renewal: Some(RenewalDirectives {
				pair,
				access_header: config.access_header.clone(),
				refresh_cookie: config.refresh_cookie.clone(),
				max_age: config.refresh_ttl,
			}),
		})
	}

	/// Authorizes the request, runs `handler` with `ctx` populated, and clears `ctx` on every
	/// exit path.
	pub async fn serve<T, F>(
		&self,
		ctx: &AuthContext,
		credentials: &InboundCredentials,
		handler: F,
	) -> Result<Served<T>>
	where
		F: AsyncFnOnce(&AuthContext) -> Result<T>,
	{
		let decision = match self.authorize(credentials).await {
			Ok(decision) => decision,
			Err(e) => {
				ctx.clear();

				return Err(e);
			},
		};
		let guard = ctx.enter(decision.principal);
		let value = handler(ctx).await?;

		drop(guard);

		Ok(Served { value, renewal: decision.renewal })
	}

	/// Revokes the principal's refresh records and returns a `Set-Cookie` value that expires the
	/// client's refresh cookie.
	pub async fn logout(&self, ctx: &AuthContext) -> Result<String> {
		let principal = ctx.require()?;

		self.coordinator.logout(&principal.principal).await?;
		ctx.clear();

		Ok(cookie_directive(&self.coordinator.config().refresh_cookie, "", 0))
	}
}

fn cookie_directive(name: &str, value: &str, max_age_secs: i64) -> String {
	format!("{name}={value}; Max-Age={max_age_secs}; Path=/; HttpOnly; Secure; SameSite=Strict")
}

fn parse_bearer(header: &str) -> Option<String> {
	let (scheme, token) = header.trim().split_once(' ')?;
	let token = token.trim();

	(scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then(|| token.to_owned())
}

fn parse_cookie(header: &str, name: &str) -> Option<String> {
	header
		.split(';')
		.filter_map(|pair| pair.trim().split_once('='))
		.find(|(key, _)| key.trim() == name)
		.map(|(_, value)| value.trim().trim_matches('"').to_owned())
		.filter(|value| !value.is_empty())
}
