mod common;

use anyhow::Result;
use chrono::{Duration, Utc};
use common::{token_from_link, TestApp};
use std::collections::BTreeSet;
use upkeep_api::services::{
    ErrorKind, InviteRequest, ServiceError, SignupRequest, StateConflict,
};
use upkeep_api::types::{Permission, Role, UserStatus};

fn invite(email: &str, role: &str) -> InviteRequest {
    InviteRequest {
        email: email.to_string(),
        role: role.to_string(),
        permissions: None,
    }
}

fn signup(token: &str, name: &str, password: &str) -> SignupRequest {
    SignupRequest {
        token: token.to_string(),
        name: name.to_string(),
        password: password.to_string(),
    }
}

#[tokio::test]
async fn invite_verify_redeem_end_to_end() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;

    let issued = app
        .state
        .invitations
        .issue(&admin, invite("Bob@Example.com", "TECHNICIAN"))
        .await?;
    assert_eq!(issued.invitation.email, "bob@example.com");
    assert_eq!(issued.invitation.role, Role::Technician);
    assert!(issued.email_delivered);
    assert!(issued.invite_link.starts_with("https://app.example.com/signup?token="));

    let sent = app.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "bob@example.com");
    assert!(sent[0].text.contains(&issued.invite_link));

    let token = token_from_link(&issued.invite_link)?;
    let verified = app.state.invitations.verify(&token).await?;
    assert_eq!(verified.email, "bob@example.com");
    assert_eq!(verified.role, Role::Technician);

    let result = app
        .state
        .invitations
        .redeem(signup(&token, "Bob", "secret123"))
        .await?;
    assert_eq!(result.user.status, UserStatus::Active);
    assert_eq!(result.user.role, Role::Technician);
    assert_eq!(result.user.invited_by, Some(admin.id));
    assert_eq!(result.user.permissions, Role::Technician.default_permissions());
    let session = result.session.expect("signup should sign the new user in");
    assert_eq!(session.user_id, result.user.id);

    let second = app
        .state
        .invitations
        .redeem(signup(&token, "Bob Again", "secret123"))
        .await
        .unwrap_err();
    assert!(matches!(
        second,
        ServiceError::Conflict(StateConflict::AlreadyUsed)
    ));

    let actions = app.activity_actions().await;
    assert!(actions.contains(&"Invited User".to_string()));
    assert!(actions.contains(&"User Signed Up".to_string()));
    Ok(())
}

#[tokio::test]
async fn verification_is_idempotent_and_read_only() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;
    let issued = app
        .state
        .invitations
        .issue(&admin, invite("carol@example.com", "MANAGER"))
        .await?;
    let token = token_from_link(&issued.invite_link)?;

    let first = app.state.invitations.verify(&token).await?;
    let second = app.state.invitations.verify(&token).await?;
    let third = app.state.invitations.verify(&token).await?;
    assert_eq!(first, second);
    assert_eq!(second, third);

    let stored = app.records.invitations().await;
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].used);
    Ok(())
}

#[tokio::test]
async fn expired_invitation_reports_expired_even_when_used() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;

    let expired = app
        .raw_invitation(
            "late@example.com",
            Role::Technician,
            admin.id,
            Utc::now() - Duration::hours(1),
        )
        .await?;

    let verify_err = app.state.invitations.verify(&expired.token).await.unwrap_err();
    assert!(matches!(
        verify_err,
        ServiceError::Conflict(StateConflict::Expired { .. })
    ));

    let redeem_err = app
        .state
        .invitations
        .redeem(signup(&expired.token, "Late", "secret123"))
        .await
        .unwrap_err();
    assert!(matches!(
        redeem_err,
        ServiceError::Conflict(StateConflict::Expired { .. })
    ));
    assert_eq!(app.credentials.credential_count().await, 1);

    // Same outcome for an invitation that was used before it expired
    let used = app
        .raw_invitation(
            "used@example.com",
            Role::Technician,
            admin.id,
            Utc::now() + Duration::minutes(5),
        )
        .await?;
    app.state
        .invitations
        .redeem(signup(&used.token, "Used", "secret123"))
        .await?;
    assert!(
        app.records
            .set_invitation_expiry(&used.token, Utc::now() - Duration::minutes(1))
            .await
    );

    for err in [
        app.state.invitations.verify(&used.token).await.unwrap_err(),
        app.state
            .invitations
            .redeem(signup(&used.token, "Used", "secret123"))
            .await
            .unwrap_err(),
    ] {
        assert!(matches!(
            err,
            ServiceError::Conflict(StateConflict::Expired { .. })
        ));
    }
    Ok(())
}

#[tokio::test]
async fn unknown_token_is_not_found() -> Result<()> {
    let app = TestApp::new()?;

    let err = app.state.invitations.verify("deadbeef").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = app.state.invitations.verify("   ").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    Ok(())
}

#[tokio::test]
async fn non_admins_cannot_invite_admins() -> Result<()> {
    let app = TestApp::new()?;
    let manager = app.manager().await?;

    let err = app
        .state
        .invitations
        .issue(&manager, invite("  Boss@Example.COM ", "ADMIN"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Authz);
    assert!(app.records.invitations().await.is_empty());
    assert!(app.mailer.sent().is_empty());

    let activities = app.records.activities().await;
    let blocked = activities
        .iter()
        .find(|a| a.action == "Blocked Admin Invitation")
        .expect("blocked invitation audit entry");
    assert_eq!(blocked.user_id, Some(manager.id));
    assert_eq!(blocked.details["email"], "boss@example.com");

    // Managers with MANAGE_TEAM may still invite below admin
    app.state
        .invitations
        .issue(&manager, invite("tech2@example.com", "TECHNICIAN"))
        .await?;
    Ok(())
}

#[tokio::test]
async fn inviting_requires_manage_team() -> Result<()> {
    let app = TestApp::new()?;
    let tech = app.technician().await?;

    let err = app
        .state
        .invitations
        .issue(&tech, invite("friend@example.com", "TECHNICIAN"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = app.state.invitations.list_pending(&tech).await.unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn invalid_invite_input_is_a_validation_error() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;

    for request in [
        invite("not-an-email", "TECHNICIAN"),
        invite("dave@example.com", "JANITOR"),
        InviteRequest {
            email: "dave@example.com".into(),
            role: "TECHNICIAN".into(),
            permissions: Some(vec!["FLY_PLANES".into()]),
        },
    ] {
        let err = app.state.invitations.issue(&admin, request).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
    Ok(())
}

#[tokio::test]
async fn explicit_permissions_override_role_defaults() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;

    let issued = app
        .state
        .invitations
        .issue(
            &admin,
            InviteRequest {
                email: "erin@example.com".into(),
                role: "technician".into(),
                permissions: Some(vec!["MANAGE_INVENTORY".into(), "view_reports".into()]),
            },
        )
        .await?;
    let token = token_from_link(&issued.invite_link)?;

    let result = app
        .state
        .invitations
        .redeem(signup(&token, "Erin", "secret123"))
        .await?;
    assert_eq!(
        result.user.permissions,
        BTreeSet::from([Permission::ManageInventory, Permission::ViewReports])
    );
    Ok(())
}

#[tokio::test]
async fn email_failure_does_not_fail_issuance() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;
    app.mailer.set_failing(true);

    let issued = app
        .state
        .invitations
        .issue(&admin, invite("frank@example.com", "TECHNICIAN"))
        .await?;
    assert!(!issued.email_delivered);

    let token = token_from_link(&issued.invite_link)?;
    app.state.invitations.verify(&token).await?;
    Ok(())
}

#[tokio::test]
async fn inviting_an_existing_user_is_a_duplicate() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;
    app.technician().await?;

    let err = app
        .state
        .invitations
        .issue(&admin, invite("TECH@example.com", "TECHNICIAN"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conflict(StateConflict::DuplicateUser { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn failed_profile_insert_removes_the_credential() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;
    let issued = app
        .state
        .invitations
        .issue(&admin, invite("gina@example.com", "TECHNICIAN"))
        .await?;
    let token = token_from_link(&issued.invite_link)?;

    app.records.fail_profile_inserts(true);
    let err = app
        .state
        .invitations
        .redeem(signup(&token, "Gina", "secret123"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Dependency);
    app.records.fail_profile_inserts(false);

    // Only the admin's credential remains, so the email cannot log in
    assert_eq!(app.credentials.credential_count().await, 1);
    let login = app
        .state
        .sessions
        .login(upkeep_api::services::LoginRequest {
            email: "gina@example.com".into(),
            password: "secret123".into(),
        })
        .await
        .unwrap_err();
    assert_eq!(login.kind(), ErrorKind::Unauthenticated);

    // The invitation was never claimed and can still be redeemed
    let result = app
        .state
        .invitations
        .redeem(signup(&token, "Gina", "secret123"))
        .await?;
    assert_eq!(result.user.email, "gina@example.com");
    Ok(())
}

#[tokio::test]
async fn failed_claim_undoes_the_account() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;
    let issued = app
        .state
        .invitations
        .issue(&admin, invite("hank@example.com", "TECHNICIAN"))
        .await?;
    let token = token_from_link(&issued.invite_link)?;

    app.records.fail_invitation_claims(true);
    let err = app
        .state
        .invitations
        .redeem(signup(&token, "Hank", "secret123"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Dependency);

    assert_eq!(app.records.profile_count().await, 1);
    assert_eq!(app.credentials.credential_count().await, 1);
    assert!(!app.records.invitations().await[0].used);
    Ok(())
}

#[tokio::test]
async fn claim_applied_before_a_timeout_keeps_the_account() -> Result<()> {
    let mut config = common::test_config();
    config.database.call_timeout_ms = 1000;
    let app = TestApp::with_config(config)?;
    let admin = app.admin().await?;
    let issued = app
        .state
        .invitations
        .issue(&admin, invite("jade@example.com", "TECHNICIAN"))
        .await?;
    let token = token_from_link(&issued.invite_link)?;

    // The claim lands, but its answer arrives after the call timeout
    app.records.delay_claim_ack(std::time::Duration::from_millis(2500));
    let result = app
        .state
        .invitations
        .redeem(signup(&token, "Jade", common::PASSWORD))
        .await?;
    assert_eq!(result.user.email, "jade@example.com");

    assert_eq!(app.records.profile_count().await, 2);
    assert_eq!(app.credentials.credential_count().await, 2);
    assert!(app.records.invitations().await[0].used);

    // The token is spent, but the invitee is not locked out
    let err = app
        .state
        .invitations
        .redeem(signup(&token, "Jade", common::PASSWORD))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(StateConflict::AlreadyUsed)));
    app.login_token("jade@example.com").await?;
    Ok(())
}

#[tokio::test]
async fn concurrent_redemptions_create_one_account() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;
    let issued = app
        .state
        .invitations
        .issue(&admin, invite("ivy@example.com", "TECHNICIAN"))
        .await?;
    let token = token_from_link(&issued.invite_link)?;

    let (a, b) = tokio::join!(
        app.state.invitations.redeem(signup(&token, "Ivy", "secret123")),
        app.state.invitations.redeem(signup(&token, "Ivy Too", "secret123")),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    let loser = if a.is_ok() { b } else { a };
    assert_eq!(loser.unwrap_err().kind(), ErrorKind::StateConflict);

    // admin + ivy
    assert_eq!(app.records.profile_count().await, 2);
    assert_eq!(app.credentials.credential_count().await, 2);
    Ok(())
}

#[tokio::test]
async fn failed_auto_sign_in_still_creates_the_account() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;
    let issued = app
        .state
        .invitations
        .issue(&admin, invite("jo@example.com", "TECHNICIAN"))
        .await?;
    let token = token_from_link(&issued.invite_link)?;

    app.credentials.fail_sign_in(true);
    let result = app
        .state
        .invitations
        .redeem(signup(&token, "Jo", "secret123"))
        .await?;
    assert!(result.session.is_none());
    assert!(app.records.invitations().await[0].used);
    Ok(())
}

#[tokio::test]
async fn signup_validates_name_and_password() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;
    let issued = app
        .state
        .invitations
        .issue(&admin, invite("kim@example.com", "TECHNICIAN"))
        .await?;
    let token = token_from_link(&issued.invite_link)?;

    let err = app
        .state
        .invitations
        .redeem(signup(&token, "Kim", "short"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = app
        .state
        .invitations
        .redeem(signup(&token, "   ", "secret123"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(!app.records.invitations().await[0].used);
    Ok(())
}

#[tokio::test]
async fn pending_list_omits_used_and_expired() -> Result<()> {
    let app = TestApp::new()?;
    let admin = app.admin().await?;

    let keep = app
        .state
        .invitations
        .issue(&admin, invite("pending@example.com", "TECHNICIAN"))
        .await?;
    let used = app
        .state
        .invitations
        .issue(&admin, invite("redeemed@example.com", "TECHNICIAN"))
        .await?;
    app.state
        .invitations
        .redeem(signup(&token_from_link(&used.invite_link)?, "R", "secret123"))
        .await?;
    app.raw_invitation(
        "stale@example.com",
        Role::Technician,
        admin.id,
        Utc::now() - Duration::days(1),
    )
    .await?;

    let pending = app.state.invitations.list_pending(&admin).await?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, keep.invitation.id);
    Ok(())
}
