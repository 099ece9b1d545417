use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::utils::errors::ServiceError;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub exp: usize,
}

/// Resolves the optional bearer token to the acting user's id.
///
/// No header means an anonymous request. A header carrying a token that
/// does not verify against `jwt_secret` is rejected.
pub fn acting_user(auth: Option<BearerAuth>, config: &AppConfig) -> Result<Option<i64>, ServiceError> {
    let Some(auth) = auth else {
        return Ok(None);
    };

    let claims = decode::<Claims>(
        auth.token(),
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &Validation::default(),
    )
    .map_err(|e| {
        log::warn!("Rejected bearer token: {}", e);
        ServiceError::Unauthorized("Invalid token".to_string())
    })?;

    Ok(Some(claims.claims.user_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;
    use actix_web::FromRequest;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn config() -> AppConfig {
        AppConfig {
            database_url: "postgres://unused".to_string(),
            server_port: 8080,
            jwt_secret: "secret".to_string(),
            environment: "test".to_string(),
            cors_allowed_origins: vec![],
            run_migrations: false,
        }
    }

    fn token(user_id: i64, secret: &str, hours: i64) -> String {
        let exp = (Utc::now() + Duration::hours(hours)).timestamp() as usize;
        encode(&Header::default(), &Claims { user_id, exp }, &EncodingKey::from_secret(secret.as_ref())).unwrap()
    }

    async fn bearer(token: &str) -> BearerAuth {
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .to_http_request();
        BearerAuth::extract(&req).await.unwrap()
    }

    #[actix_web::test]
    async fn valid_token_names_the_acting_user() {
        let auth = bearer(&token(7, "secret", 1)).await;
        assert_eq!(acting_user(Some(auth), &config()).unwrap(), Some(7));
    }

    #[actix_web::test]
    async fn missing_header_is_anonymous() {
        assert_eq!(acting_user(None, &config()).unwrap(), None);
    }

    #[actix_web::test]
    async fn expired_or_foreign_tokens_are_rejected() {
        for token in [token(7, "secret", -2), token(7, "other", 1)] {
            let auth = bearer(&token).await;
            assert!(matches!(acting_user(Some(auth), &config()), Err(ServiceError::Unauthorized(_))));
        }
    }
}
