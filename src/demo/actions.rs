use actix_web::http::Method;
use actix_web::web::Bytes;
use actix_web::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use log::warn;
use rbac_gate::session::SessionBinding;
use rbac_gate::{Action, Capabilities, Registry};

pub fn register(registry: &mut Registry) {
    registry
        .register::<PermWrite>()
        .register::<PermReadWrite>()
        .register::<RoleWriter>()
        .register::<RoleReaderWriter>()
        .register::<Roles>();
}

fn text(s: &str) -> HttpResponse {
    HttpResponse::Ok().body(s.to_string())
}

/// Requires the `write` permission for every method.
#[derive(Default)]
pub struct PermWrite;

impl Capabilities for PermWrite {}

#[async_trait(?Send)]
impl Action for PermWrite {
    const PERM: &'static str = "write";

    async fn handle(&mut self, _req: &HttpRequest, _body: Bytes) -> HttpResponse {
        text("You have write permission")
    }
}

/// Requires `read` to get and `write` to post.
#[derive(Default)]
pub struct PermReadWrite;

impl Capabilities for PermReadWrite {}

#[async_trait(?Send)]
impl Action for PermReadWrite {
    const PERM: &'static str = r#"GET:"read" POST:"write""#;

    async fn handle(&mut self, req: &HttpRequest, _body: Bytes) -> HttpResponse {
        match *req.method() {
            Method::GET => text("You have read permission"),
            Method::POST => text("You have write permission"),
            _ => HttpResponse::MethodNotAllowed().finish(),
        }
    }
}

/// Requires the `writer` role.
#[derive(Default)]
pub struct RoleWriter;

impl Capabilities for RoleWriter {}

#[async_trait(?Send)]
impl Action for RoleWriter {
    const ROLE: &'static str = "writer";

    async fn handle(&mut self, _req: &HttpRequest, _body: Bytes) -> HttpResponse {
        text("You are a writer")
    }
}

/// Reports its role tag itself instead of declaring it.
#[derive(Default)]
pub struct RoleReaderWriter;

impl Capabilities for RoleReaderWriter {
    fn role_tag(&self) -> Option<String> {
        Some(String::from(r#"GET:"reader" POST:"writer""#))
    }
}

#[async_trait(?Send)]
impl Action for RoleReaderWriter {
    async fn handle(&mut self, req: &HttpRequest, _body: Bytes) -> HttpResponse {
        match *req.method() {
            Method::GET => text("You are a reader"),
            Method::POST => text("You are a writer"),
            _ => HttpResponse::MethodNotAllowed().finish(),
        }
    }
}

/// Shows or replaces the roles of the current session. Open to everyone.
#[derive(Default)]
pub struct Roles {
    session: Option<SessionBinding>,
}

impl Capabilities for Roles {
    fn bind_session(&mut self, session: SessionBinding) {
        self.session = Some(session);
    }
}

#[async_trait(?Send)]
impl Action for Roles {
    async fn handle(&mut self, req: &HttpRequest, body: Bytes) -> HttpResponse {
        let session = match self.session.as_ref() {
            Some(session) => session,
            None => return HttpResponse::InternalServerError().finish(),
        };

        match *req.method() {
            Method::GET => match session.roles() {
                Ok(roles) => HttpResponse::Ok().json(roles.unwrap_or_default()),
                Err(e) => {
                    warn!("Read session roles error: {e:#}");
                    HttpResponse::InternalServerError().body(format!("{e:#}"))
                }
            },
            Method::PUT => {
                let roles: Vec<String> = match serde_json::from_slice(&body) {
                    Ok(roles) => roles,
                    Err(e) => {
                        return HttpResponse::BadRequest().body(format!("decode roles: {e}"))
                    }
                };
                match session.set_roles(roles) {
                    Ok(()) => HttpResponse::NoContent().finish(),
                    Err(e) => HttpResponse::BadRequest().body(format!("{e:#}")),
                }
            }
            _ => HttpResponse::MethodNotAllowed().finish(),
        }
    }
}
