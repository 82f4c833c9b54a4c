/// Router Module Index
///
/// Splits the route table by access level so the token gate is applied at the
/// module boundary rather than inside individual handlers.

/// User CRUD and login. No authentication required.
pub mod public;

/// Subject CRUD. Every route in this module sits behind the bearer-token
/// middleware layered on in `create_router`.
pub mod protected;
