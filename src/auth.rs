//! Token-based authentication: issuing and verifying access tokens, and the
//! route handlers for registering and logging in.
//!
//! Protected route handlers take a [CurrentUser] argument, which extracts and
//! verifies the bearer token from the `Authorization` header and resolves it
//! to the acting user's ID. Handlers then pass that ID into every data access
//! call so that each request only ever touches the acting user's records.

use axum::{
    Json, RequestPartsExt,
    extract::{FromRef, FromRequestParts, State},
    http::{StatusCode, request::Parts},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use time::OffsetDateTime;

use crate::{
    AppConfig, AppJson, Error,
    db::{Insert, SelectBy},
    models::{NewUser, PasswordHash, User, UserID},
};

/// The contents of an access token.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// The ID of the user the token was issued to, as a decimal string.
    pub sub: String,
    /// The time the token was issued, in unix seconds.
    pub iat: usize,
}

/// Issue an access token for `user_id`.
///
/// Tokens do not carry an expiry: they stay valid until the signing secret
/// changes.
pub fn encode_token(user_id: UserID, encoding_key: &EncodingKey) -> Result<String, Error> {
    let claims = Claims {
        sub: user_id.to_string(),
        iat: OffsetDateTime::now_utc().unix_timestamp() as usize,
    };

    encode(&Header::default(), &claims, encoding_key).map_err(|_| Error::TokenCreation)
}

/// Verify a token's signature and return its claims.
///
/// # Errors
///
/// This function will return [Error::InvalidToken] if the token is malformed
/// or its signature does not match.
pub fn decode_token(token: &str, decoding_key: &DecodingKey) -> Result<Claims, Error> {
    // Tokens are issued without an expiry, so the default validation (which
    // demands an `exp` claim) must be relaxed.
    let mut validation = Validation::default();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    decode::<Claims>(token, decoding_key, &validation)
        .map(|token_data| token_data.claims)
        .map_err(|_| Error::InvalidToken)
}

/// The verified identity of the user making a request.
///
/// Extracting this type rejects the request with a 401 response if the
/// bearer token is missing, malformed, or fails verification.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    /// The ID of the acting user.
    pub user_id: UserID,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    AppConfig: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| Error::InvalidToken)?;

        let config = AppConfig::from_ref(state);
        let claims = decode_token(bearer.token(), config.decoding_key())?;

        let user_id = claims
            .sub
            .parse()
            .map(UserID::new)
            .map_err(|_| Error::InvalidToken)?;

        Ok(CurrentUser { user_id })
    }
}

/// The request body for the register and login endpoints.
///
/// Missing fields deserialize as empty strings and are rejected by the
/// handlers, keeping the error shape consistent with the other validation
/// failures.
#[derive(Debug, Deserialize)]
pub struct Credentials {
    /// Email entered during registration or sign-in.
    #[serde(default)]
    pub email: String,
    /// Password entered during registration or sign-in.
    #[serde(default)]
    pub password: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Handler for registration requests.
///
/// Creates a user with the normalized email and a hash of the password, then
/// responds with an access token so that the client is logged in immediately.
///
/// # Errors
///
/// This function will return an error if:
/// - the email or password is empty,
/// - the email is already registered.
pub async fn register(
    State(state): State<AppConfig>,
    AppJson(credentials): AppJson<Credentials>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let email = normalize_email(&credentials.email);

    if email.is_empty() || credentials.password.is_empty() {
        return Err(Error::MissingCredentials);
    }

    let password_hash = PasswordHash::new(&credentials.password, PasswordHash::DEFAULT_COST)?;

    let user = {
        let connection = state.db_connection().lock().unwrap();

        NewUser {
            email,
            password_hash,
        }
        .insert(&connection)?
    };

    let token = encode_token(user.id(), state.encoding_key())?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "ok", "access_token": token })),
    ))
}

/// Handler for sign-in requests.
///
/// An unknown email and a wrong password both produce the same
/// [Error::InvalidCredentials] response so that clients cannot probe which
/// email addresses are registered.
pub async fn log_in(
    State(state): State<AppConfig>,
    AppJson(credentials): AppJson<Credentials>,
) -> Result<Json<Value>, Error> {
    let email = normalize_email(&credentials.email);

    let user = {
        let connection = state.db_connection().lock().unwrap();

        User::select(email.as_str(), &connection).map_err(|error| match error {
            Error::NotFound => Error::InvalidCredentials,
            error => error,
        })?
    };

    let password_is_correct = user
        .password_hash()
        .verify(&credentials.password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !password_is_correct {
        return Err(Error::InvalidCredentials);
    }

    let token = encode_token(user.id(), state.encoding_key())?;

    Ok(Json(json!({ "message": "ok", "access_token": token })))
}

#[cfg(test)]
mod token_tests {
    use jsonwebtoken::{DecodingKey, EncodingKey};

    use crate::{
        Error,
        auth::{decode_token, encode_token},
        models::UserID,
    };

    #[test]
    fn decode_token_gives_back_the_user_id() {
        let encoding_key = EncodingKey::from_secret("foobar".as_ref());
        let decoding_key = DecodingKey::from_secret("foobar".as_ref());

        let token = encode_token(UserID::new(42), &encoding_key).unwrap();
        let claims = decode_token(&token, &decoding_key).unwrap();

        assert_eq!(claims.sub, "42");
    }

    #[test]
    fn decode_token_fails_with_the_wrong_secret() {
        let encoding_key = EncodingKey::from_secret("foobar".as_ref());
        let decoding_key = DecodingKey::from_secret("notfoobar".as_ref());

        let token = encode_token(UserID::new(42), &encoding_key).unwrap();

        assert_eq!(decode_token(&token, &decoding_key), Err(Error::InvalidToken));
    }

    #[test]
    fn decode_token_fails_on_garbage() {
        let decoding_key = DecodingKey::from_secret("foobar".as_ref());

        assert_eq!(
            decode_token("not.a.token", &decoding_key),
            Err(Error::InvalidToken)
        );
    }
}
