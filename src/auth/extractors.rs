use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};

use crate::auth::token::Claims;
use crate::error::AppError;
use crate::models::user::Role;

/// The caller, as described by the claims `AuthMiddleware` validated.
///
/// Extraction fails with `AppError::Unauthorized` when the middleware did not
/// run for the route.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthenticatedUser {
    pub id: i32,
    pub username: String,
    pub role: Role,
    pub company_id: Option<i32>,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        AuthenticatedUser {
            id: claims.sub,
            username: claims.username,
            role: claims.role,
            company_id: claims.company_id,
        }
    }
}

impl AuthenticatedUser {
    /// Fails with 403 unless the caller has one of `roles`.
    pub fn require_role(&self, roles: &[Role]) -> Result<(), AppError> {
        if roles.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".into()))
        }
    }

    pub fn is_manager(&self) -> bool {
        self.role == Role::Manager
    }

    /// Admins and operators see every company, a manager only their own.
    pub fn can_access_company(&self, company_id: i32) -> bool {
        match self.role {
            Role::Admin | Role::Operator => true,
            Role::Manager => self.company_id == Some(company_id),
        }
    }

    /// Fails with 403 when `can_access_company` is false.
    pub fn require_company(&self, company_id: i32) -> Result<(), AppError> {
        if self.can_access_company(company_id) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Access denied to this company".into()))
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<Claims>().cloned() {
            Some(claims) => ready(Ok(AuthenticatedUser::from(claims))),
            None => {
                let err = AppError::Unauthorized(
                    "Claims not found in request. Ensure AuthMiddleware is active.".to_string(),
                );
                ready(Err(err.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn user(role: Role, company_id: Option<i32>) -> AuthenticatedUser {
        AuthenticatedUser {
            id: 1,
            username: "someone".into(),
            role,
            company_id,
        }
    }

    #[test]
    fn test_require_role() {
        let operator = user(Role::Operator, None);
        assert!(operator.require_role(&[Role::Admin, Role::Operator]).is_ok());
        assert!(matches!(
            operator.require_role(&[Role::Admin]),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_company_access() {
        assert!(user(Role::Admin, None).can_access_company(3));
        assert!(user(Role::Operator, None).can_access_company(3));
        assert!(user(Role::Manager, Some(3)).can_access_company(3));
        assert!(!user(Role::Manager, Some(2)).can_access_company(3));
        assert!(!user(Role::Manager, None).can_access_company(3));
        assert!(user(Role::Manager, Some(2)).require_company(3).is_err());
    }

    #[actix_rt::test]
    async fn test_extracts_claims_from_extensions() {
        let req = TestRequest::default().to_http_request();
        req.extensions_mut().insert(Claims {
            sub: 9,
            username: "manager_esk".into(),
            role: Role::Manager,
            company_id: Some(2),
            exp: 0,
        });
        let extracted = AuthenticatedUser::extract(&req).await.unwrap();
        assert_eq!(extracted, user_with_id(9));

        let bare = TestRequest::default().to_http_request();
        assert!(AuthenticatedUser::extract(&bare).await.is_err());
    }

    fn user_with_id(id: i32) -> AuthenticatedUser {
        AuthenticatedUser {
            id,
            username: "manager_esk".into(),
            role: Role::Manager,
            company_id: Some(2),
        }
    }
}
