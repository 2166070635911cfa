//! The API endpoint URIs.

/// The route for checking that the server is up.
pub const HEALTH: &str = "/health";
/// The route for registering a new user.
pub const REGISTER: &str = "/auth/register";
/// The route for logging in an existing user.
pub const LOG_IN: &str = "/auth/login";
/// The route for listing and creating categories.
pub const CATEGORIES: &str = "/categories";
/// The route for listing and creating transactions.
pub const TRANSACTIONS: &str = "/transactions";
/// The route for deleting a single transaction.
pub const TRANSACTION: &str = "/transactions/{transaction_id}";
