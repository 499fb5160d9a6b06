use std::{future::Future, pin::Pin, sync::Arc};

use actix_web::{
    Error, HttpMessage, HttpResponse, web,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures::future::{Ready, ok};

use common::{env_config::Config, jwt};

/// Bearer-JWT guard for the secured API scope. Validates the token
/// locally and inserts the claims into request extensions, so handlers
/// can take `web::ReqData<JwtClaims>`. Token issuance and the user
/// directory live in the identity service.
pub struct AuthMiddleware {}

impl AuthMiddleware {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for AuthMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddlewareService {
            service: Arc::new(service),
        })
    }
}

pub struct AuthMiddlewareService<S> {
    service: Arc<S>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<actix_web::body::BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // retrieve token from authorization header
        let token = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|auth_value| {
                if auth_value.starts_with("Bearer ") {
                    Some(auth_value[7..].to_owned())
                } else {
                    None
                }
            });

        let config = req
            .app_data::<web::Data<Arc<Config>>>()
            .expect("Config must be registered as app data")
            .clone();
        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            let Some(token) = token else {
                let response = HttpResponse::Unauthorized()
                    .json(serde_json::json!({ "error": "No authorization token provided" }))
                    .map_into_boxed_body();
                return Ok(req.into_response(response));
            };

            match jwt::validate_jwt(&token, &config.jwt_config.secret) {
                Ok(claims) => {
                    // claims are available to handlers via web::ReqData
                    req.extensions_mut().insert(claims);
                    srv.call(req).await.map(|res| res.map_into_boxed_body())
                }
                Err(_) => {
                    let response = HttpResponse::Unauthorized()
                        .json(serde_json::json!({ "error": "Invalid token" }))
                        .map_into_boxed_body();
                    Ok(req.into_response(response))
                }
            }
        })
    }
}
