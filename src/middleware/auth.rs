use axum::{
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use crate::utils::token::{decode_token, Claims};

fn reject(status: StatusCode, code: &str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

fn bearer_claims(req: &Request) -> Result<Claims, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "missing_authorization"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "bad_authorization"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "unsupported_scheme"));
    };

    let config = crate::config::get_config();
    match decode_token(&config.jwt_secret, token.trim()) {
        Ok(claims) if claims.user_id().is_some() => Ok(claims),
        _ => Err(reject(StatusCode::UNAUTHORIZED, "invalid_token")),
    }
}

pub async fn require_bearer_auth(mut req: Request, next: Next) -> Response {
    match bearer_claims(&req) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(resp) => resp,
    }
}

pub async fn require_staff(mut req: Request, next: Next) -> Response {
    match bearer_claims(&req) {
        Ok(claims) if claims.is_staff() => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Ok(_) => reject(StatusCode::FORBIDDEN, "forbidden"),
        Err(resp) => resp,
    }
}
