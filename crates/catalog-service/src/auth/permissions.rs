//! Permission check over verified claims.

use crate::auth::claims::Claims;
use crate::auth::AuthError;

/// Succeed iff `claims.permissions` is an array holding the string `required`.
///
/// Comparison is case-sensitive with no wildcard or prefix semantics.
///
/// # Errors
///
/// - `AuthError::PermissionsClaimMissing` - No `permissions` claim (or `null`)
/// - `AuthError::PermissionDenied` - Claim present without `required`, or not
///   an array at all
pub fn check_permission(claims: &Claims, required: &str) -> Result<(), AuthError> {
    let permissions = claims.permissions.as_ref().ok_or_else(|| {
        tracing::debug!(target: "catalog.auth.permissions", "Token has no permissions claim");
        AuthError::PermissionsClaimMissing
    })?;

    let granted = permissions
        .as_array()
        .is_some_and(|granted| granted.iter().any(|p| p.as_str() == Some(required)));

    if granted {
        Ok(())
    } else {
        tracing::debug!(
            target: "catalog.auth.permissions",
            required = %required,
            "Required permission not granted"
        );
        Err(AuthError::PermissionDenied)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn claims_with(permissions: Option<&[&str]>) -> Claims {
        let mut payload = serde_json::json!({"sub": "user", "exp": 1});
        if let Some(perms) = permissions {
            payload
                .as_object_mut()
                .unwrap()
                .insert("permissions".to_string(), serde_json::json!(perms));
        }
        serde_json::from_value(payload).unwrap()
    }

    #[test]
    fn test_granted_permission() {
        let claims = claims_with(Some(&["get:movies", "post:movies"]));
        assert!(check_permission(&claims, "post:movies").is_ok());
    }

    #[test]
    fn test_missing_claim() {
        let claims = claims_with(None);
        assert_eq!(
            check_permission(&claims, "get:movies"),
            Err(AuthError::PermissionsClaimMissing)
        );
    }

    #[test]
    fn test_empty_list_is_denied_not_missing() {
        let claims = claims_with(Some(&[]));
        assert_eq!(
            check_permission(&claims, "get:movies"),
            Err(AuthError::PermissionDenied)
        );
    }

    fn claims_with_raw(permissions: serde_json::Value) -> Claims {
        serde_json::from_value(serde_json::json!({
            "sub": "user",
            "exp": 1,
            "permissions": permissions,
        }))
        .unwrap()
    }

    #[test]
    fn test_wrong_shapes_are_denied() {
        for permissions in [
            serde_json::json!("get:movies"),
            serde_json::json!({"get:movies": true}),
            serde_json::json!([1, 2]),
            serde_json::json!(true),
        ] {
            assert_eq!(
                check_permission(&claims_with_raw(permissions.clone()), "get:movies"),
                Err(AuthError::PermissionDenied),
                "permissions {permissions}"
            );
        }
    }

    #[test]
    fn test_non_string_entries_are_skipped() {
        let claims = claims_with_raw(serde_json::json!([7, null, "get:movies"]));
        assert!(check_permission(&claims, "get:movies").is_ok());
    }

    #[test]
    fn test_exact_match_only() {
        let claims = claims_with(Some(&["GET:movies", "get:*", "get:movie", "get:movies:extra"]));
        assert_eq!(
            check_permission(&claims, "get:movies"),
            Err(AuthError::PermissionDenied)
        );
    }
}
