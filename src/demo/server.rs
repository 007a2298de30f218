use std::sync::Arc;
use std::time::Duration;

use actix_web::cookie::Cookie;
use actix_web::web::{self, Data, Query};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use log::info;
use rbac_gate::dispatch::route;
use rbac_gate::session::MemorySessionStore;
use rbac_gate::Rbac;
use sd_notify::NotifyState;
use serde::Deserialize;

use super::actions::{PermReadWrite, PermWrite, RoleReaderWriter, RoleWriter, Roles};

pub struct DemoServer {
    bind: String,

    rbac: Arc<Rbac>,
    sessions: Arc<MemorySessionStore>,

    keep_alive_secs: Option<u64>,
    workers: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LoginQuery {
    #[serde(default)]
    roles: String,
}

impl DemoServer {
    pub fn new(bind: String, rbac: Arc<Rbac>, sessions: Arc<MemorySessionStore>) -> Self {
        Self {
            bind,
            rbac,
            sessions,
            keep_alive_secs: None,
            workers: None,
        }
    }

    pub fn set_keep_alive_secs(&mut self, keep_alive_secs: u64) {
        self.keep_alive_secs = Some(keep_alive_secs);
    }

    pub fn set_workers(&mut self, workers: u64) {
        self.workers = Some(workers);
    }

    pub fn configure(
        rbac: Arc<Rbac>,
        sessions: Arc<MemorySessionStore>,
    ) -> impl FnOnce(&mut web::ServiceConfig) {
        move |cfg| {
            cfg.app_data(Data::from(rbac))
                .app_data(Data::from(sessions))
                .route("/login", web::post().to(Self::handle_login))
                .route("/logout", web::post().to(Self::handle_logout))
                .route("/roles", route::<Roles>())
                .route("/perm/write", route::<PermWrite>())
                .route("/perm/read_write", route::<PermReadWrite>())
                .route("/role/writer", route::<RoleWriter>())
                .route("/role/reader_writer", route::<RoleReaderWriter>());
        }
    }

    pub async fn run(self) -> Result<()> {
        let rbac = self.rbac.clone();
        let sessions = self.sessions.clone();
        let mut srv = HttpServer::new(move || {
            App::new().configure(Self::configure(rbac.clone(), sessions.clone()))
        });

        info!("Binding to http://{}", self.bind);
        srv = srv.bind(&self.bind).context("bind server")?;

        if let Some(keep_alive) = self.keep_alive_secs {
            srv = srv.keep_alive(Duration::from_secs(keep_alive));
        }
        if let Some(workers) = self.workers {
            srv = srv.workers(workers as usize);
        }

        sd_notify::notify(true, &[NotifyState::Ready]).context("notify systemd")?;
        info!("Starting demo server");
        srv.run().await.context("run server")?;

        info!("Server stopped by user");
        Ok(())
    }

    /// Opens a session holding the comma separated `roles` of the query.
    async fn handle_login(
        query: Query<LoginQuery>,
        rbac: Data<Rbac>,
        sessions: Data<MemorySessionStore>,
    ) -> HttpResponse {
        let roles: Vec<String> = query
            .roles
            .split(',')
            .map(|r| r.trim())
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect();

        let id = sessions.open();
        sessions.insert(&id, rbac.options().role_session_key(), roles.clone());
        info!("Login session {id} with roles {roles:?}");

        let cookie = Cookie::build(sessions.cookie().to_string(), id)
            .path("/")
            .http_only(true)
            .finish();
        HttpResponse::Ok().cookie(cookie).json(roles)
    }

    /// Drops the caller's session and clears its cookie.
    async fn handle_logout(req: HttpRequest, sessions: Data<MemorySessionStore>) -> HttpResponse {
        if !sessions.close(&req) {
            return HttpResponse::NoContent().finish();
        }

        let mut cookie = Cookie::build(sessions.cookie().to_string(), "")
            .path("/")
            .http_only(true)
            .finish();
        cookie.make_removal();
        HttpResponse::NoContent().cookie(cookie).finish()
    }
}

#[cfg(test)]
mod tests {
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};

    use rbac_gate::config::CommonConfig;

    use crate::demo::config::ServerConfig;

    use super::*;

    #[actix_web::test]
    async fn test_demo_server() {
        let mut cfg = ServerConfig::default();
        cfg.complete().unwrap();
        let srv = cfg.build_server();
        let app = test::init_service(
            App::new().configure(DemoServer::configure(srv.rbac.clone(), srv.sessions.clone())),
        )
        .await;

        // Anonymous callers are denied
        let req = TestRequest::get().uri("/perm/write").to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, rbac_gate::config::DEFAULT_NO_PERM_MESSAGE);

        let req = TestRequest::post()
            .uri("/login?roles=reader")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let cookie = resp
            .response()
            .cookies()
            .find(|c| c.name() == MemorySessionStore::DEFAULT_COOKIE)
            .unwrap()
            .into_owned();

        let req = TestRequest::get()
            .uri("/perm/read_write")
            .cookie(cookie.clone())
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "You have read permission");

        let req = TestRequest::post()
            .uri("/perm/read_write")
            .cookie(cookie.clone())
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, rbac_gate::config::DEFAULT_NO_PERM_MESSAGE);

        // Promote the session through the role assignment action
        let req = TestRequest::put()
            .uri("/roles")
            .cookie(cookie.clone())
            .set_payload(r#"["writer"]"#)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let req = TestRequest::get()
            .uri("/roles")
            .cookie(cookie.clone())
            .to_request();
        let roles: Vec<String> = test::call_and_read_body_json(&app, req).await;
        assert_eq!(roles, vec!["writer"]);

        let req = TestRequest::post()
            .uri("/perm/read_write")
            .cookie(cookie.clone())
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "You have write permission");

        let req = TestRequest::post()
            .uri("/role/reader_writer")
            .cookie(cookie.clone())
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "You are a writer");

        let req = TestRequest::get()
            .uri("/role/reader_writer")
            .cookie(cookie.clone())
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, rbac_gate::config::DEFAULT_NO_PERM_MESSAGE);

        // Logout drops the session, the cookie no longer grants anything
        assert_eq!(srv.sessions.len(), 1);
        let req = TestRequest::post()
            .uri("/logout")
            .cookie(cookie.clone())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert!(srv.sessions.is_empty());

        let req = TestRequest::post()
            .uri("/perm/read_write")
            .cookie(cookie.clone())
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, rbac_gate::config::DEFAULT_NO_PERM_MESSAGE);

        let req = TestRequest::post().uri("/logout").cookie(cookie).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
