//! JWT token issuing and verification.
//!
//! The codec is stateless: it signs and checks tokens but never looks at
//! sessions or the blacklist. All tokens are HS256 with a single process-wide
//! secret. Rotating that secret (restarting with a different one) invalidates
//! every outstanding access and refresh token at once; there is no key id and
//! no grace period.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::now_secs;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token - stateless, no JTI
    Access,
    /// Long-lived refresh token - correlated to a session by its JTI
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// Default access token duration: 5 minutes
pub const ACCESS_TOKEN_DURATION_SECS: i64 = 5 * 60;

/// Default refresh token duration: 2 weeks
pub const REFRESH_TOKEN_DURATION_SECS: i64 = 14 * 24 * 60 * 60;

/// Registered claim names the codec owns. Extra claims may not override them.
const RESERVED_CLAIMS: [&str; 5] = ["sub", "jti", "typ", "iat", "exp"];

/// Application claims carried next to the registered ones (e.g. `role`).
pub type ExtraClaims = Map<String, Value>;

/// Claims as they appear inside the signed payload.
#[derive(Debug, Serialize, Deserialize)]
struct WireClaims {
    sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    jti: Option<String>,
    #[serde(rename = "typ")]
    token_type: TokenType,
    iat: i64,
    exp: i64,
    #[serde(flatten)]
    extra: ExtraClaims,
}

/// Verified claims of a token whose signature, expiry and type checked out.
#[derive(Debug, Clone)]
pub struct Claims {
    /// Subject user id
    pub user_id: i64,
    /// Session id, always present on refresh tokens
    pub jti: Option<String>,
    pub token_type: TokenType,
    /// Issued at (Unix seconds)
    pub issued_at: i64,
    /// Expiration time (Unix seconds)
    pub expires_at: i64,
    pub extra: ExtraClaims,
}

impl Claims {
    /// Look up a string-valued extra claim.
    pub fn extra_str(&self, name: &str) -> Option<&str> {
        self.extra.get(name).and_then(Value::as_str)
    }
}

/// Lifetimes for both token types, in seconds.
///
/// Signed so that tests can issue tokens that are already expired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTtls {
    pub access: i64,
    pub refresh: i64,
}

impl Default for TokenTtls {
    fn default() -> Self {
        Self {
            access: ACCESS_TOKEN_DURATION_SECS,
            refresh: REFRESH_TOKEN_DURATION_SECS,
        }
    }
}

impl TokenTtls {
    pub fn for_type(&self, token_type: TokenType) -> i64 {
        match token_type {
            TokenType::Access => self.access,
            TokenType::Refresh => self.refresh,
        }
    }
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// The JWT token string
    pub token: String,
    /// JWT ID, set for refresh tokens only
    pub jti: Option<String>,
    /// Issued at timestamp (Unix seconds)
    pub issued_at: i64,
    /// Expiration timestamp (Unix seconds)
    pub expires_at: i64,
    /// Token duration in seconds
    pub duration: i64,
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttls: TokenTtls,
}

impl JwtConfig {
    /// Create a new JWT configuration with the given secret and default lifetimes.
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttls(secret, TokenTtls::default())
    }

    pub fn with_ttls(secret: &[u8], ttls: TokenTtls) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttls,
        }
    }

    pub fn ttls(&self) -> TokenTtls {
        self.ttls
    }

    /// Sign a token for `user_id` that expires `ttl(token_type)` seconds from now.
    ///
    /// Refresh tokens get a fresh random JTI. Extra claims that collide with a
    /// registered claim name are dropped.
    pub fn issue(
        &self,
        user_id: i64,
        token_type: TokenType,
        mut extra: ExtraClaims,
    ) -> Result<IssuedToken, JwtError> {
        let now = now_secs();
        if now <= 0 {
            return Err(JwtError::TimeError);
        }

        let duration = self.ttls.for_type(token_type);
        let exp = now + duration;

        let jti = match token_type {
            TokenType::Access => None,
            TokenType::Refresh => Some(uuid::Uuid::new_v4().to_string()),
        };

        for name in RESERVED_CLAIMS {
            extra.remove(name);
        }

        let claims = WireClaims {
            sub: user_id.to_string(),
            jti: jti.clone(),
            token_type,
            iat: now,
            exp,
            extra,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(JwtError::Encoding)?;

        Ok(IssuedToken {
            token,
            jti,
            issued_at: now,
            expires_at: exp,
            duration,
        })
    }

    /// Decode a token and check signature, expiry, type and claim shape.
    pub fn verify(&self, token: &str, expected: TokenType) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        // Expiry is checked below so that `exp == now` counts as expired.
        validation.validate_exp = false;

        let token_data = jsonwebtoken::decode::<WireClaims>(token, &self.decoding_key, &validation)
            .map_err(JwtError::Decoding)?;
        let wire = token_data.claims;

        if wire.exp <= now_secs() {
            return Err(JwtError::Expired);
        }

        if wire.token_type != expected {
            return Err(JwtError::WrongTokenType);
        }

        let user_id = wire
            .sub
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .ok_or(JwtError::MalformedClaims("sub"))?;

        let jti = wire.jti.filter(|jti| !jti.is_empty());
        if expected == TokenType::Refresh && jti.is_none() {
            return Err(JwtError::MalformedClaims("jti"));
        }

        Ok(Claims {
            user_id,
            jti,
            token_type: wire.token_type,
            issued_at: wire.iat,
            expires_at: wire.exp,
            extra: wire.extra,
        })
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Malformed token or bad signature
    Decoding(jsonwebtoken::errors::Error),
    /// Signature is valid but `exp` has passed
    Expired,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
    /// A claim is missing or has the wrong shape
    MalformedClaims(&'static str),
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Decoding(e) => write!(f, "Failed to decode token: {}", e),
            JwtError::Expired => write!(f, "Token has expired"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
            JwtError::MalformedClaims(claim) => write!(f, "Malformed claim: {}", claim),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
