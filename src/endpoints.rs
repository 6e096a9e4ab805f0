//! The API endpoints URIs.

/// The route to request a cup of coffee (experimental).
pub const COFFEE: &str = "/api/coffee";
/// The route to create and list transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to get or delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to set and list budget limits.
pub const LIMITS: &str = "/api/limits";
/// The route to get the budget limit of a single category.
pub const LIMIT: &str = "/api/limits/{category}";
