use std::collections::HashMap;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use actix_web::{
    Error, web,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use chrono::Utc;
use colored::Colorize;
use futures::future::{Ready, ready};
use log::info;
use serde_json::json;
use sqlx::PgPool;
use sqlx::types::ipnetwork::IpNetwork;

use common::{env_config::Config, jwt};
use db::models::log::RequestLog;

/// Request logging: one colored console line and one `request_logs` row
/// per handled request. Bodies are never captured; tutor messages stay
/// out of the logs.
pub struct LoggerMiddleware {}

impl LoggerMiddleware {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for LoggerMiddleware {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, B> Transform<S, ServiceRequest> for LoggerMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = LoggerMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LoggerMiddlewareService {
            service: Arc::new(service),
        }))
    }
}

pub struct LoggerMiddlewareService<S> {
    service: Arc<S>,
}

impl<S, B> Service<ServiceRequest> for LoggerMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: actix_web::body::MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // Common request info
        let method = req.method().to_string();
        let path = req.path().to_string();
        let query_string = req.query_string().to_string();

        // IP
        let ip_str = req
            .connection_info()
            .realip_remote_addr()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let ip_address = IpNetwork::from_str(&ip_str)
            .unwrap_or_else(|_| IpNetwork::from_str("0.0.0.0").unwrap());

        // Agent
        let user_agent = req
            .headers()
            .get("User-Agent")
            .map(|ua| ua.to_str().unwrap_or_default().to_string())
            .unwrap_or_default();

        let pool = req
            .app_data::<web::Data<Arc<PgPool>>>()
            .expect("PgPool must be registered as app data")
            .clone();
        let config = req
            .app_data::<web::Data<Arc<Config>>>()
            .expect("Config must be registered as app data")
            .clone();
        let console_logging_enabled = config.console_logging_enabled;

        let started = Instant::now();
        let srv = Arc::clone(&self.service);

        Box::pin(async move {
            let res = srv.call(req).await?;

            let status_code = res.status().as_u16() as i32;
            let timestamp = Utc::now();
            let latency_ms = started.elapsed().as_millis() as i64;

            // the auth guard runs inside this middleware, so claims are
            // read back off the request after the inner call
            let user_id = jwt::get_jwt_claims(res.request()).map(|claims| claims.user_id);

            let params_json = if !query_string.is_empty() {
                let mut params_map = HashMap::new();
                for pair in query_string.split('&') {
                    if let Some(pos) = pair.find('=') {
                        params_map.insert(pair[0..pos].to_string(), json!(&pair[pos + 1..]));
                    } else {
                        params_map.insert(pair.to_string(), json!(true));
                    }
                }
                json!(params_map)
            } else {
                json!({})
            };

            if console_logging_enabled {
                let colored_status = match status_code {
                    200..=299 => status_code.to_string().green(),
                    300..=399 => status_code.to_string().yellow(),
                    400..=499 => status_code.to_string().bright_red(),
                    _ => status_code.to_string().red(),
                };

                let colored_method = match method.as_str() {
                    "GET" => method.blue(),
                    "POST" => method.yellow(),
                    "PUT" => method.purple(),
                    "DELETE" => method.red(),
                    _ => method.normal(),
                };

                info!(
                    "[{}] {} {} {} user_id={} params={}",
                    colored_status,
                    colored_method,
                    path.bright_white(),
                    format!("({}ms)", latency_ms).bright_black(),
                    user_id
                        .map_or("None".to_string(), |id| id.to_string())
                        .bright_blue(),
                    params_json.to_string().bright_cyan(),
                );
            }

            // a logging failure must not fail the request it describes
            if let Err(error) = db::log::insert_log(
                &***pool,
                RequestLog {
                    id: uuid::Uuid::nil(), // auto-generated
                    timestamp,
                    method,
                    path,
                    status_code,
                    user_id,
                    params: Some(params_json),
                    ip_address,
                    user_agent,
                    latency_ms,
                },
            )
            .await
            {
                log::error!("failed to persist request log: {}", error);
            }

            Ok(res)
        })
    }
}
