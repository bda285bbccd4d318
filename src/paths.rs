//! Path constants for the provider API and the read API.

/// Blockchair endpoints, relative to the per-network base URL
pub mod provider {
    pub const ADDRESS_DASHBOARD: &str = "/dashboards/address";
    pub const STATS: &str = "/stats";
    pub const PUSH_TRANSACTION: &str = "/push/transaction";

    pub const TRANSACTION_DETAILS_QUERY: &str = "transaction_details=true";
    pub const PUSH_FIELD: &str = "data";
}

/// Read API routes (`server` feature)
pub mod routes {
    pub const HEALTH: &str = "/health";
    pub const CHECK_PAYMENT: &str = "/check-payment";
    pub const ADDRESS: &str = "/address/:index";
    pub const DECODE: &str = "/decode/:address";
}
