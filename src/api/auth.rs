use std::hint::black_box;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::api::AppState;
use crate::error::{ServiceError, ServiceResult};

pub const API_KEY_HEADER: &str = "MS-API-Key";

/// Allow-list of opaque, case-sensitive API keys.
#[derive(Clone, Debug, Default)]
pub struct ApiKeys {
    keys: Vec<String>,
}

impl ApiKeys {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys
                .into_iter()
                .map(Into::into)
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn authenticate(&self, provided: Option<&str>) -> ServiceResult<()> {
        let provided = provided.ok_or(ServiceError::Unauthorized)?;

        // every key is compared in full so the timing does not reveal which one matched
        let mut is_valid = false;
        for key in &self.keys {
            is_valid |= black_box(constant_time_eq(key.as_bytes(), provided.as_bytes()));
        }

        if is_valid {
            Ok(())
        } else {
            Err(ServiceError::Unauthorized)
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ServiceResult<Response> {
    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    state.api_keys.authenticate(provided)?;
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> ApiKeys {
        ApiKeys::new(["AAAAAA", "BBBBB", "CCCCC"])
    }

    #[test]
    fn accepts_listed_keys() {
        assert!(keys().authenticate(Some("AAAAAA")).is_ok());
        assert!(keys().authenticate(Some("CCCCC")).is_ok());
    }

    #[test]
    fn rejects_missing_and_unknown_keys() {
        assert!(matches!(
            keys().authenticate(None),
            Err(ServiceError::Unauthorized)
        ));
        assert!(keys().authenticate(Some("DDDDD")).is_err());
        assert!(keys().authenticate(Some("")).is_err());
    }

    #[test]
    fn comparison_is_case_sensitive_and_exact() {
        assert!(keys().authenticate(Some("aaaaaa")).is_err());
        assert!(keys().authenticate(Some("AAAAA")).is_err());
        assert!(keys().authenticate(Some("AAAAAAA")).is_err());
    }

    #[test]
    fn empty_allow_list_rejects_everything() {
        let keys = ApiKeys::new(Vec::<String>::new());
        assert!(keys.is_empty());
        assert!(keys.authenticate(Some("AAAAAA")).is_err());
    }
}
