//! Edge case tests for the authentication core
//!
//! Boundary conditions that sit between modules:
//! - TOTP window limits around the ±2-step drift tolerance
//! - Session token expiry vs. forgery rejection kinds
//! - Cookie lifetime agreeing with token lifetime
//! - Policy tie-breaks for overlapping lead/assignment membership

#[cfg(test)]
mod totp_window_tests {
    use super::super::totp::*;

    const ACCOUNT: &str = "edge-case@tests";

    // Aligned to a step boundary so each offset lands in a known step.
    const T: u64 = 1_700_000_100 - (1_700_000_100 % TOTP_STEP);

    fn code_for(secret: &str, timestamp: u64) -> String {
        // Build through the public surface: a code the authenticator app
        // would display at `timestamp`.
        let uri = provisioning_uri(secret, ACCOUNT).unwrap();
        assert!(uri.contains(secret));
        generate_for_test(secret, timestamp)
    }

    fn generate_for_test(secret: &str, timestamp: u64) -> String {
        use totp_rs::{Algorithm, Secret, TOTP};
        let bytes = Secret::Encoded(secret.to_string()).to_bytes().unwrap();
        TOTP::new(
            Algorithm::SHA1,
            TOTP_DIGITS,
            TOTP_SKEW,
            TOTP_STEP,
            bytes,
            Some(TOTP_ISSUER.to_string()),
            ACCOUNT.to_string(),
        )
        .unwrap()
        .generate(timestamp)
    }

    #[test]
    fn skew_constant_is_two_steps() {
        assert_eq!(TOTP_SKEW, 2, "drift tolerance is ±2 steps (60 seconds)");
        assert_eq!(TOTP_STEP, 30);
        assert_eq!(TOTP_DIGITS, 6);
    }

    #[test]
    fn code_accepted_at_exact_window_edges() {
        let secret = generate_secret();
        let code = code_for(&secret, T);

        for offset in [0i64, 30, 60, -30, -60] {
            let at = T.checked_add_signed(offset).unwrap();
            assert!(
                crate::auth::totp::verify_code_at(&secret, &code, ACCOUNT, at).unwrap(),
                "code should verify at offset {offset}s"
            );
        }
    }

    #[test]
    fn code_rejected_one_step_past_the_window() {
        let secret = generate_secret();
        let code = code_for(&secret, T);

        for offset in [90i64, -90, 120, -120] {
            let at = T.checked_add_signed(offset).unwrap();
            assert!(
                !crate::auth::totp::verify_code_at(&secret, &code, ACCOUNT, at).unwrap(),
                "code should be rejected at offset {offset}s"
            );
        }
    }

    #[test]
    fn code_from_a_different_secret_never_verifies() {
        let enrolled = generate_secret();
        let other = generate_secret();
        let code = code_for(&other, T);

        // An enable request pairing a code with the wrong candidate secret
        // must fail, leaving nothing persisted.
        assert!(!crate::auth::totp::verify_code_at(&enrolled, &code, ACCOUNT, T).unwrap());
    }
}

#[cfg(test)]
mod token_tests {
    use super::super::jwt::*;
    use super::super::session;
    use crate::db::users::Role;
    use time::Duration;
    use uuid::Uuid;

    const TEST_SECRET: &str = "test-secret-key-at-least-32-chars!";

    #[test]
    fn expiry_and_forgery_are_distinct_rejections() {
        let jwt = JwtManager::new(TEST_SECRET);
        let forger = JwtManager::new("attacker-controlled-secret-key!!");

        let expired = jwt
            .issue_with_ttl(Uuid::new_v4(), Role::Developer, Duration::seconds(-61))
            .unwrap();
        let forged = forger.issue(Uuid::new_v4(), Role::Admin).unwrap();

        assert_eq!(jwt.verify(&expired), Err(TokenError::Expired));
        assert_eq!(jwt.verify(&forged), Err(TokenError::Invalid));
    }

    #[test]
    fn token_just_inside_ttl_still_verifies() {
        let jwt = JwtManager::new(TEST_SECRET);
        let token = jwt
            .issue_with_ttl(Uuid::new_v4(), Role::Developer, Duration::seconds(5))
            .unwrap();

        assert!(jwt.verify(&token).is_ok());
    }

    #[test]
    fn cookie_max_age_matches_token_lifetime() {
        let cookie = session::session_cookie("tok", false);
        let max_age = SESSION_TTL_DAYS * 24 * 60 * 60;
        assert!(cookie.contains(&format!("Max-Age={max_age}")));
    }

    #[test]
    fn claims_are_immutable_value_types() {
        // Claims round-trip through serde without losing the role.
        let jwt = JwtManager::new(TEST_SECRET);
        let user_id = Uuid::new_v4();
        let token = jwt.issue(user_id, Role::ProjectLead).unwrap();
        let claims = jwt.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::ProjectLead);
        assert!(claims.exp > claims.iat);
    }
}

#[cfg(test)]
mod policy_edge_tests {
    use super::super::policy::*;
    use crate::db::projects::ProjectStatus;
    use crate::db::users::Role;
    use uuid::Uuid;

    #[test]
    fn lead_in_assigned_set_is_still_a_lead_everywhere() {
        let lead = Uuid::new_v4();
        let project = ProjectAccess {
            lead,
            status: ProjectStatus::Completed,
            developer_ids: vec![lead],
        };

        // Lead-derived permissions hold even on a completed project and
        // regardless of the spurious assignment entry.
        assert!(can_view_project(Role::ProjectLead, lead, &project));
        assert!(can_assign_developers(Role::ProjectLead, lead, &project));
        assert!(can_upload_document(Role::ProjectLead, lead, &project));
    }

    #[test]
    fn assigned_developer_on_completed_project_keeps_read_access() {
        let dev = Uuid::new_v4();
        let project = ProjectAccess {
            lead: Uuid::new_v4(),
            status: ProjectStatus::Completed,
            developer_ids: vec![dev],
        };

        assert!(can_view_project(Role::Developer, dev, &project));
        assert!(can_view_documents(Role::Developer, dev, &project));
        assert!(!can_upload_document(Role::Developer, dev, &project));
    }

    #[test]
    fn admin_needs_no_membership_at_all() {
        let admin = Uuid::new_v4();
        let project = ProjectAccess {
            lead: Uuid::new_v4(),
            status: ProjectStatus::Completed,
            developer_ids: vec![],
        };

        assert!(can_view_project(Role::Admin, admin, &project));
        assert!(can_view_documents(Role::Admin, admin, &project));
        assert!(can_assign_developers(Role::Admin, admin, &project));
        assert!(can_upload_document(Role::Admin, admin, &project));
    }
}
