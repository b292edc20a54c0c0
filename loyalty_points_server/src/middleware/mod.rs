mod jwt;

pub use jwt::{AuthenticatedUser, JwtAuthMiddlewareFactory};
