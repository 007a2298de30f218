use actix_web::http::StatusCode;
use actix_web::web::{self, Bytes, Data};
use actix_web::{HttpRequest, HttpResponse, Route};
use log::error;
use serde::Serialize;

use crate::action::{Action, BoundAction};
use crate::engine::{Decision, Rbac};

pub const AUTHZ_ERROR: &str = "Authorization failed";

#[derive(Debug, Serialize)]
struct ErrorResponse {
    code: u16,
    message: String,
}

/// Serves a request with a fresh `A`, after the authorizer allowed it.
///
/// Register it with `web::route().to(dispatch::<A>)`, the app must hold a
/// `Data<Rbac>`. Denied requests get the rejection callback response. Errors
/// of the session store or the grant relation are logged and answered with a
/// `500` JSON body carrying [`AUTHZ_ERROR`] only.
pub async fn dispatch<A>(req: HttpRequest, body: Bytes, rbac: Data<Rbac>) -> HttpResponse
where
    A: Action + Default,
{
    let mut action = A::default();

    match rbac.authorize(&req, Some(BoundAction::new(&mut action))) {
        Ok(Decision::Allow) => action.handle(&req, body).await,
        Ok(Decision::Deny) => rbac.options().reject(&req),
        Err(e) => {
            error!("Authorize {} {} error: {:#}", req.method(), req.path(), e);
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            HttpResponse::build(status).json(ErrorResponse {
                code: status.as_u16(),
                message: String::from(AUTHZ_ERROR),
            })
        }
    }
}

/// A route accepting every method, guarded for action `A`.
pub fn route<A>() -> Route
where
    A: Action + Default,
{
    web::route().to(dispatch::<A>)
}
