use middleware::auth::AuthMiddleware;

pub mod middleware {
    pub mod auth;
}

pub fn auth_middleware() -> AuthMiddleware {
    AuthMiddleware::new()
}
