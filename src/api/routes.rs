//! API Route Definitions
//!
//! HTTP routes and their handlers behind a builder pattern. The
//! RouterBuilder allows selective enabling/disabling of endpoints so a
//! deployment can expose only what it needs, such as an
//! issuance-only instance behind an admin console.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::*;

/// Builder for creating API routes with configurable endpoints
#[derive(Default)]
pub struct RouterBuilder {
    /// Whether to enable the health check endpoint (GET /health)
    health_check: bool,
    /// Whether to enable the issuance endpoint (POST /recovery/issue)
    issue_code: bool,
    /// Whether to enable the verification endpoint (POST /recovery/verify)
    verify_code: bool,
}

impl RouterBuilder {
    /// Creates a new router builder with all routes disabled by default
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a router builder with all routes enabled
    pub fn with_all_routes() -> Self {
        Self {
            health_check: true,
            issue_code: true,
            verify_code: true,
        }
    }

    /// Creates a router with only the health check endpoint
    pub fn with_minimal_routes() -> Self {
        Self {
            health_check: true,
            issue_code: false,
            verify_code: false,
        }
    }

    /// Enables or disables the health check endpoint (GET /health)
    pub fn health_check(mut self, enabled: bool) -> Self {
        self.health_check = enabled;
        self
    }

    /// Enables or disables the issuance endpoint (POST /recovery/issue)
    pub fn issue_code(mut self, enabled: bool) -> Self {
        self.issue_code = enabled;
        self
    }

    /// Enables or disables the verification endpoint (POST /recovery/verify)
    pub fn verify_code(mut self, enabled: bool) -> Self {
        self.verify_code = enabled;
        self
    }

    /// Builds the Axum router with the configured routes
    pub fn build(self) -> Router<AppState> {
        let mut router = Router::new();

        if self.health_check {
            router = router.route("/health", get(health_check));
        }

        if self.issue_code {
            router = router.route("/recovery/issue", post(issue_recovery_code));
        }

        if self.verify_code {
            router = router.route("/recovery/verify", post(verify_recovery_code));
        }

        router
    }
}

/// Creates all API routes
pub fn create_routes() -> Router<AppState> {
    RouterBuilder::with_all_routes().build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_builder_new() {
        let builder = RouterBuilder::new();

        assert!(!builder.health_check);
        assert!(!builder.issue_code);
        assert!(!builder.verify_code);
    }

    #[test]
    fn test_router_builder_with_all_routes() {
        let builder = RouterBuilder::with_all_routes();

        assert!(builder.health_check);
        assert!(builder.issue_code);
        assert!(builder.verify_code);
    }

    #[test]
    fn test_router_builder_with_minimal_routes() {
        let builder = RouterBuilder::with_minimal_routes();

        assert!(builder.health_check);
        assert!(!builder.issue_code);
        assert!(!builder.verify_code);
    }

    #[test]
    fn test_router_builder_individual_methods() {
        let builder = RouterBuilder::new()
            .health_check(true)
            .issue_code(true)
            .verify_code(false);

        assert!(builder.health_check);
        assert!(builder.issue_code);
        assert!(!builder.verify_code);
    }

    #[test]
    fn test_create_routes_builds() {
        let _router = create_routes();
    }
}
