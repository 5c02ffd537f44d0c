use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::{
    error::AppError,
    types::{Claims, Identity},
};

/// Signs and verifies HS256 bearer tokens carrying an [`Identity`].
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Option<Duration>,
}

impl TokenIssuer {
    /// Without a lifetime, tokens carry no `exp` claim and stay valid until the secret rotates.
    pub fn new(secret: &str, lifetime: Option<Duration>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime,
        }
    }

    pub fn issue(&self, identity: &Identity) -> Result<String, AppError> {
        let exp = self.lifetime.map(|lifetime| {
            (SystemTime::now() + lifetime)
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        });

        let claims = Claims {
            username: identity.username.clone(),
            id: identity.id.clone(),
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|source| AppError::TokenSigning { source })
    }

    pub fn verify(&self, token: &str) -> Result<Identity, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_exp = self.lifetime.is_some();
        if validation.validate_exp {
            validation.required_spec_claims.insert("exp".to_owned());
        }

        let token = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|source| AppError::AuthInvalid { source })?;

        Ok(Identity {
            username: token.claims.username,
            id: token.claims.id,
        })
    }
}
