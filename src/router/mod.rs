//! # Sistema de Routing
//! src/router/mod.rs
//!
//! ```text
//! Request → Router → Handler → Response
//! ```
//!
//! Cada ruta es un path exacto (`/job`) o un prefijo (`/status/`) más los
//! métodos que acepta. Si el path existe pero el método no, se responde
//! 405 con el header `Allow`; si ningún path coincide, 404.

use crate::http::{Method, Request, Response, StatusCode};

/// Un handler recibe un Request y retorna una Response
///
/// Es un closure para que pueda capturar el estado que necesita
/// (gateway, métricas, etc.).
pub type Handler = Box<dyn Fn(&Request) -> Response + Send + Sync>;

/// Valor del header `Server`
pub const SERVER_NAME: &str = "JobServer/1.0";

enum PathMatcher {
    Exact(String),
    Prefix(String),
}

impl PathMatcher {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Exact(p) => p == path,
            PathMatcher::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

struct Route {
    matcher: PathMatcher,
    method: Method,
    handler: Handler,
}

/// Router que mapea (método, path) a handlers
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Registra un handler para un path exacto
    ///
    /// # Ejemplo
    /// ```
    /// use job_server::router::Router;
    /// use job_server::http::{Method, Request, Response};
    /// use serde_json::json;
    ///
    /// let mut router = Router::new();
    /// router.register(Method::GET, "/hello", |_req: &Request| {
    ///     Response::json(&json!({"message": "Hello"}))
    /// });
    /// ```
    pub fn register<F>(&mut self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            matcher: PathMatcher::Exact(path.to_string()),
            method,
            handler: Box::new(handler),
        });
    }

    /// Registra un handler para todo path que empiece con `prefix`
    pub fn register_prefix<F>(&mut self, method: Method, prefix: &str, handler: F)
    where
        F: Fn(&Request) -> Response + Send + Sync + 'static,
    {
        self.routes.push(Route {
            matcher: PathMatcher::Prefix(prefix.to_string()),
            method,
            handler: Box::new(handler),
        });
    }

    /// Encuentra y ejecuta el handler apropiado para un request
    pub fn route(&self, request: &Request) -> Response {
        let path = request.path();

        let candidates: Vec<&Route> = self
            .routes
            .iter()
            .filter(|route| route.matcher.matches(path))
            .collect();

        let mut response = match candidates
            .iter()
            .find(|route| route.method == request.method())
        {
            Some(route) => (route.handler)(request),
            None if candidates.is_empty() => {
                Response::error(StatusCode::NotFound, &format!("Route not found: {}", path))
            }
            None => {
                let allowed: Vec<&str> = candidates.iter().map(|r| r.method.as_str()).collect();
                Response::error(
                    StatusCode::MethodNotAllowed,
                    &format!("Method {} not allowed", request.method().as_str()),
                )
                .with_header("Allow", &allowed.join(", "))
            }
        };

        add_common_headers(&mut response);
        response
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Headers comunes a todas las respuestas
pub fn add_common_headers(response: &mut Response) {
    response.add_header("Server", SERVER_NAME);
    response.add_header("Connection", "close");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(raw: &[u8]) -> Request {
        Request::parse(raw).unwrap()
    }

    fn router() -> Router {
        let mut router = Router::new();
        router.register(Method::POST, "/job", |_req: &Request| {
            Response::json_with_status(StatusCode::Accepted, &json!({"job_id": 1}))
        });
        router.register_prefix(Method::GET, "/status/", |req: &Request| {
            Response::json(&json!({"path": req.path()}))
        });
        router
    }

    #[test]
    fn test_router_creation() {
        assert!(Router::new().is_empty());
        assert_eq!(router().len(), 2);
    }

    #[test]
    fn test_exact_route_found() {
        let response = router().route(&request(b"POST /job HTTP/1.0\r\n\r\n"));

        assert_eq!(response.status(), StatusCode::Accepted);
        assert_eq!(response.header("Connection"), Some("close"));
        assert_eq!(response.header("Server"), Some(SERVER_NAME));
    }

    #[test]
    fn test_prefix_route_found() {
        let response = router().route(&request(b"GET /status/42 HTTP/1.0\r\n\r\n"));

        assert_eq!(response.status(), StatusCode::Ok);
        let body: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(body["path"], "/status/42");
    }

    #[test]
    fn test_wrong_method_is_405() {
        let response = router().route(&request(b"GET /job HTTP/1.0\r\n\r\n"));

        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
        assert_eq!(response.header("Allow"), Some("POST"));

        let response = router().route(&request(b"DELETE /status/1 HTTP/1.0\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::MethodNotAllowed);
    }

    #[test]
    fn test_route_not_found() {
        let response = router().route(&request(b"GET /nonexistent HTTP/1.0\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::NotFound);

        // "/job" es exacto: "/jobs" no coincide
        let response = router().route(&request(b"POST /jobs HTTP/1.0\r\n\r\n"));
        assert_eq!(response.status(), StatusCode::NotFound);
    }
}
