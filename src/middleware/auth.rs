use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{dto::auth::Claims, error::AppError, state::AppState};

/// Caller identity resolved from the bearer token. Services trust `user_id`
/// as the owner of any reservation they create or touch.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: String,
}

pub fn ensure_role(user: &AuthUser, role: &str) -> Result<(), AppError> {
    if user.role != role {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, "admin")
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    Ok(AuthUser {
        user_id,
        role: decoded.claims.role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?
            .trim();

        decode_token(token, &state.config.jwt_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token_for(sub: &str, role: &str, secret: &str) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            role: role.to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn decodes_valid_token() {
        let id = Uuid::new_v4();
        let user = decode_token(&token_for(&id.to_string(), "admin", "s3cret"), "s3cret").unwrap();
        assert_eq!(user.user_id, id);
        assert!(ensure_admin(&user).is_ok());
    }

    #[test]
    fn rejects_wrong_secret_and_bad_subject() {
        let id = Uuid::new_v4().to_string();
        assert!(matches!(
            decode_token(&token_for(&id, "user", "a"), "b"),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            decode_token(&token_for("not-a-uuid", "user", "a"), "a"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn non_admin_is_forbidden() {
        let user = AuthUser {
            user_id: Uuid::new_v4(),
            role: "user".into(),
        };
        assert!(matches!(ensure_admin(&user), Err(AppError::Forbidden)));
    }
}
