use actix_web::{web, HttpMessage, HttpRequest, HttpResponse, Responder};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{error, info};
use mongodb::bson::doc;
use mongodb::Database;
use serde::{Deserialize, Serialize};

use crate::app_state::AppState;
use crate::models::User;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username of the authenticated user.
    pub sub: String,
    pub user_id: i64,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginInfo {
    pub username: String,
    pub password: String,
}

// JWT Creation
pub fn create_jwt(
    username: &str,
    user_id: i64,
    secret: &str,
    expiration_hours: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now() + Duration::hours(expiration_hours);
    let claims = Claims {
        sub: username.to_string(),
        user_id,
        exp: expiration.timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref()))
}

// JWT Validation
pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

/// Claims injected into request extensions by the authentication middleware.
/// `None` means the request carried no valid bearer token.
pub fn current_user(req: &HttpRequest) -> Option<Claims> {
    req.extensions().get::<Claims>().cloned()
}

// Login Endpoint
pub async fn login(data: web::Data<AppState>, login_info: web::Json<LoginInfo>) -> impl Responder {
    let users_collection = data.mongodb.db.collection::<User>("users");
    let user_doc = users_collection
        .find_one(doc! { "username": &login_info.username })
        .await;

    match user_doc {
        Ok(Some(user)) => {
            if verify(&login_info.password, &user.hashed_password).unwrap_or(false) {
                match create_jwt(
                    &user.username,
                    user.id,
                    &data.config.jwt_secret,
                    data.config.jwt_expiration_hours,
                ) {
                    Ok(token) => HttpResponse::Ok().json(Token {
                        access_token: token,
                        token_type: "bearer".to_string(),
                    }),
                    Err(e) => {
                        error!("Error signing token: {}", e);
                        HttpResponse::InternalServerError().body("Error logging in")
                    }
                }
            } else {
                HttpResponse::Unauthorized().body("Incorrect username or password")
            }
        }
        Ok(None) => HttpResponse::Unauthorized().body("Incorrect username or password"),
        Err(e) => {
            error!("Error looking up user: {}", e);
            HttpResponse::InternalServerError().body("Error logging in")
        }
    }
}

/// Seed the single admin account (admin/admin) when the users collection is
/// empty. Runs once at startup.
pub async fn ensure_default_admin(db: &Database) -> mongodb::error::Result<()> {
    let users_collection = db.collection::<User>("users");
    if users_collection.count_documents(doc! {}).await? > 0 {
        info!("Database already initialized");
        return Ok(());
    }

    let hashed_password =
        hash("admin", DEFAULT_COST).expect("Failed to hash default admin password");
    let admin = User {
        id: 1,
        username: "admin".to_string(),
        hashed_password,
    };
    users_collection.insert_one(&admin).await?;
    info!("Default admin user created");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwt_round_trip_preserves_claims() {
        let token = create_jwt("admin", 1, "test-secret", 24).unwrap();
        let claims = validate_jwt(&token, "test-secret").unwrap();
        assert_eq!(claims.sub, "admin");
        assert_eq!(claims.user_id, 1);
    }

    #[test]
    fn jwt_rejects_wrong_secret() {
        let token = create_jwt("admin", 1, "test-secret", 24).unwrap();
        assert!(validate_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn jwt_rejects_expired_token() {
        // Negative TTL puts exp well past the default validation leeway.
        let token = create_jwt("admin", 1, "test-secret", -2).unwrap();
        assert!(validate_jwt(&token, "test-secret").is_err());
    }

    #[test]
    fn jwt_rejects_garbage() {
        assert!(validate_jwt("not-a-token", "test-secret").is_err());
    }

    #[test]
    fn bcrypt_hash_verifies_original_password_only() {
        let hashed = hash("admin", DEFAULT_COST).unwrap();
        assert!(verify("admin", &hashed).unwrap());
        assert!(!verify("wrong", &hashed).unwrap());
    }
}
