//! Session/role gate: turns a password or a token into a [`KioskSession`].
//!
//! Both paths ask the server for data (this kiosk's record, or the user
//! list) and decide locally.  A wrong password or an unknown token is a
//! normal negative result ([`AuthOutcome::Mismatch`]); only a failed fetch is
//! an error, and the caller maps it to the error screen.

use pos_core::{verify_password, Role};
use tracing::{debug, info, warn};

use crate::application::ports::{
    ApiError, PosApi, ServerEndpoint, TokenSource, TokenSourceError,
};
use crate::application::session::KioskSession;

/// Result of an authentication attempt that reached the server.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Granted(KioskSession),
    Mismatch,
}

/// Password path: checks `password` against this kiosk's stored hash for
/// `role`.
///
/// An empty password is a mismatch and makes no request.  A kiosk id the
/// server does not know is also a mismatch (logged), since no password can
/// match a record that does not exist.
///
/// # Errors
///
/// Returns the [`ApiError`] if the kiosk list cannot be fetched.
pub async fn authenticate_password<A>(
    api: &A,
    endpoint: &ServerEndpoint,
    kiosk_id: u32,
    role: Role,
    password: &str,
) -> Result<AuthOutcome, ApiError>
where
    A: PosApi + ?Sized,
{
    if password.is_empty() {
        return Ok(AuthOutcome::Mismatch);
    }

    let kiosks = api.list_kiosks(endpoint).await?;
    let Some(record) = kiosks.into_iter().find(|k| k.id == kiosk_id) else {
        warn!(kiosk_id, "server has no record for this kiosk");
        return Ok(AuthOutcome::Mismatch);
    };

    let stored = record.password_hash_for(role).to_owned();
    let candidate = password.to_owned();
    // CPU-bound; run on the blocking pool.
    let matched = match tokio::task::spawn_blocking(move || verify_password(&stored, &candidate))
        .await
    {
        Ok(matched) => matched,
        Err(e) => {
            warn!("password verification task failed: {e}");
            false
        }
    };

    if matched {
        info!(kiosk_id, "password accepted for role {role}");
        Ok(AuthOutcome::Granted(KioskSession::for_role(role)))
    } else {
        debug!(kiosk_id, "password rejected for role {role}");
        Ok(AuthOutcome::Mismatch)
    }
}

/// Token path: finds the user whose stored RFID equals `token`.
///
/// The token is trimmed before matching; an empty token is a mismatch and
/// makes no request.
///
/// # Errors
///
/// Returns the [`ApiError`] if the user list cannot be fetched.
pub async fn authenticate_token<A>(
    api: &A,
    endpoint: &ServerEndpoint,
    token: &str,
) -> Result<AuthOutcome, ApiError>
where
    A: PosApi + ?Sized,
{
    let token = token.trim();
    if token.is_empty() {
        return Ok(AuthOutcome::Mismatch);
    }

    let users = api.list_users(endpoint).await?;
    match users
        .into_iter()
        .find(|u| u.rfid.as_deref() == Some(token))
    {
        Some(user) => {
            info!(user_id = user.id, "token matched user {}", user.username);
            Ok(AuthOutcome::Granted(KioskSession::for_user(user)))
        }
        None => {
            debug!("token matched no user");
            Ok(AuthOutcome::Mismatch)
        }
    }
}

// ── Token sources ─────────────────────────────────────────────────────────────

/// The hardware reader (if configured) and the manual-entry fallback.
pub struct TokenSources {
    hardware: Option<Box<dyn TokenSource>>,
    manual: Box<dyn TokenSource>,
}

impl TokenSources {
    pub fn new(hardware: Option<Box<dyn TokenSource>>, manual: Box<dyn TokenSource>) -> Self {
        Self { hardware, manual }
    }

    /// Manual entry only.
    pub fn manual_only(manual: Box<dyn TokenSource>) -> Self {
        Self::new(None, manual)
    }

    /// Reads one token, from the hardware reader when it is available and
    /// from manual entry otherwise.
    ///
    /// A hardware failure falls through to manual entry in the same call.
    ///
    /// # Errors
    ///
    /// Only errors from the manual source are returned.
    pub async fn read(&mut self) -> Result<Option<String>, TokenSourceError> {
        if let Some(hardware) = self.hardware.as_mut() {
            if hardware.is_available() {
                match hardware.read_token().await {
                    Ok(token) => return Ok(token),
                    Err(e) => warn!(
                        "{} failed, falling back to {}: {e}",
                        hardware.name(),
                        self.manual.name()
                    ),
                }
            } else {
                debug!("{} not available, using {}", hardware.name(), self.manual.name());
            }
        }
        self.manual.read_token().await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::MockPosApi;
    use async_trait::async_trait;
    use pos_core::{hash_password_with, KioskRecord, KioskStatus, Privilege, User};

    fn kiosk(id: u32) -> KioskRecord {
        KioskRecord {
            id,
            name: format!("kiosk-{id}"),
            password_kiosk: hash_password_with("staffpw", 1),
            password_teacher: hash_password_with("teachpw", 1),
            password_admin: hash_password_with("adminpw", 1),
            status: KioskStatus::Normal,
            ip_address: None,
        }
    }

    fn user(id: u32, privilege: Privilege, rfid: Option<&str>) -> User {
        User {
            id,
            username: format!("user{id}"),
            privilege,
            rfid: rfid.map(str::to_owned),
        }
    }

    fn endpoint() -> ServerEndpoint {
        ServerEndpoint::fallback()
    }

    #[tokio::test]
    async fn test_correct_admin_password_grants_admin_session() {
        // Arrange
        let mut api = MockPosApi::new();
        api.expect_list_kiosks()
            .times(1)
            .returning(|_| Ok(vec![kiosk(1), kiosk(2)]));

        // Act
        let outcome = authenticate_password(&api, &endpoint(), 2, Role::Admin, "adminpw")
            .await
            .unwrap();

        // Assert
        match outcome {
            AuthOutcome::Granted(session) => {
                assert_eq!(session.role(), Role::Admin);
                assert!(session.user().is_none());
            }
            AuthOutcome::Mismatch => panic!("expected a granted session"),
        }
    }

    #[tokio::test]
    async fn test_password_for_other_role_is_mismatch() {
        let mut api = MockPosApi::new();
        api.expect_list_kiosks().returning(|_| Ok(vec![kiosk(1)]));

        let outcome = authenticate_password(&api, &endpoint(), 1, Role::Admin, "teachpw")
            .await
            .unwrap();

        assert_eq!(outcome, AuthOutcome::Mismatch);
    }

    #[tokio::test]
    async fn test_unknown_kiosk_id_is_mismatch() {
        let mut api = MockPosApi::new();
        api.expect_list_kiosks().returning(|_| Ok(vec![kiosk(1)]));

        let outcome = authenticate_password(&api, &endpoint(), 9, Role::KioskStaff, "staffpw")
            .await
            .unwrap();

        assert_eq!(outcome, AuthOutcome::Mismatch);
    }

    #[tokio::test]
    async fn test_empty_password_makes_no_request() {
        // Arrange: no expectations, so any call would panic.
        let api = MockPosApi::new();

        // Act
        let outcome = authenticate_password(&api, &endpoint(), 1, Role::Admin, "")
            .await
            .unwrap();

        // Assert
        assert_eq!(outcome, AuthOutcome::Mismatch);
    }

    #[tokio::test]
    async fn test_kiosk_fetch_failure_is_error() {
        let mut api = MockPosApi::new();
        api.expect_list_kiosks().returning(|_| {
            Err(ApiError::Transport {
                path: "/api/kiosks".into(),
                message: "connection refused".into(),
            })
        });

        let result = authenticate_password(&api, &endpoint(), 1, Role::Admin, "adminpw").await;

        assert!(matches!(result, Err(ApiError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_token_match_binds_user_with_mapped_role() {
        // Arrange
        let mut api = MockPosApi::new();
        api.expect_list_users().times(1).returning(|_| {
            Ok(vec![
                user(1, Privilege::Admin, None),
                user(2, Privilege::Student, Some("04A1B2")),
                user(3, Privilege::Teacher, Some("99FF")),
            ])
        });

        // Act
        let outcome = authenticate_token(&api, &endpoint(), " 04A1B2\n").await.unwrap();

        // Assert
        match outcome {
            AuthOutcome::Granted(session) => {
                assert_eq!(session.role(), Role::KioskStaff);
                assert_eq!(session.user().map(|u| u.id), Some(2));
            }
            AuthOutcome::Mismatch => panic!("expected a granted session"),
        }
    }

    #[tokio::test]
    async fn test_teacher_token_unlocks_teacher_role() {
        let mut api = MockPosApi::new();
        api.expect_list_users()
            .returning(|_| Ok(vec![user(3, Privilege::Teacher, Some("99FF"))]));

        let outcome = authenticate_token(&api, &endpoint(), "99FF").await.unwrap();

        assert!(matches!(outcome, AuthOutcome::Granted(ref s) if s.role() == Role::Teacher));
    }

    #[tokio::test]
    async fn test_unknown_token_is_mismatch() {
        let mut api = MockPosApi::new();
        api.expect_list_users()
            .returning(|_| Ok(vec![user(2, Privilege::Student, Some("04A1B2"))]));

        let outcome = authenticate_token(&api, &endpoint(), "04a1b2").await.unwrap();

        assert_eq!(outcome, AuthOutcome::Mismatch);
    }

    #[tokio::test]
    async fn test_blank_token_makes_no_request() {
        let api = MockPosApi::new();
        let outcome = authenticate_token(&api, &endpoint(), "   ").await.unwrap();
        assert_eq!(outcome, AuthOutcome::Mismatch);
    }

    #[tokio::test]
    async fn test_user_fetch_failure_is_error() {
        let mut api = MockPosApi::new();
        api.expect_list_users().returning(|_| {
            Err(ApiError::Status {
                path: "/api/users".into(),
                status: 500,
            })
        });

        let result = authenticate_token(&api, &endpoint(), "04A1").await;

        assert!(result.is_err());
    }

    // ── TokenSources ──────────────────────────────────────────────────────────

    struct ScriptedSource {
        name: &'static str,
        available: bool,
        result: Option<Result<Option<String>, TokenSourceError>>,
        reads: std::sync::Arc<std::sync::atomic::AtomicUsize>,
    }

    impl ScriptedSource {
        fn boxed(
            name: &'static str,
            available: bool,
            result: Result<Option<String>, TokenSourceError>,
        ) -> (Box<dyn TokenSource>, std::sync::Arc<std::sync::atomic::AtomicUsize>) {
            let reads = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
            let source = Self {
                name,
                available,
                result: Some(result),
                reads: reads.clone(),
            };
            (Box::new(source), reads)
        }
    }

    #[async_trait]
    impl TokenSource for ScriptedSource {
        fn name(&self) -> &'static str {
            self.name
        }
        fn is_available(&self) -> bool {
            self.available
        }
        async fn read_token(&mut self) -> Result<Option<String>, TokenSourceError> {
            self.reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.result.take().unwrap_or(Ok(None))
        }
    }

    fn reads(counter: &std::sync::Arc<std::sync::atomic::AtomicUsize>) -> usize {
        counter.load(std::sync::atomic::Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_available_hardware_is_preferred() {
        // Arrange
        let (hw, hw_reads) = ScriptedSource::boxed("reader", true, Ok(Some("CARD".into())));
        let (manual, manual_reads) = ScriptedSource::boxed("manual", true, Ok(Some("TYPED".into())));
        let mut sources = TokenSources::new(Some(hw), manual);

        // Act
        let token = sources.read().await.unwrap();

        // Assert
        assert_eq!(token.as_deref(), Some("CARD"));
        assert_eq!(reads(&hw_reads), 1);
        assert_eq!(reads(&manual_reads), 0);
    }

    #[tokio::test]
    async fn test_absent_hardware_uses_manual_entry() {
        let (hw, hw_reads) = ScriptedSource::boxed("reader", false, Ok(Some("CARD".into())));
        let (manual, _) = ScriptedSource::boxed("manual", true, Ok(Some("TYPED".into())));
        let mut sources = TokenSources::new(Some(hw), manual);

        let token = sources.read().await.unwrap();

        assert_eq!(token.as_deref(), Some("TYPED"));
        assert_eq!(reads(&hw_reads), 0);
    }

    #[tokio::test]
    async fn test_hardware_failure_falls_back_to_manual_entry() {
        // Arrange
        let (hw, _) = ScriptedSource::boxed(
            "reader",
            true,
            Err(TokenSourceError::HardwareUnavailable("device unplugged".into())),
        );
        let (manual, manual_reads) = ScriptedSource::boxed("manual", true, Ok(Some("TYPED".into())));
        let mut sources = TokenSources::new(Some(hw), manual);

        // Act
        let token = sources.read().await.unwrap();

        // Assert
        assert_eq!(token.as_deref(), Some("TYPED"));
        assert_eq!(reads(&manual_reads), 1);
    }

    #[tokio::test]
    async fn test_manual_only_reads_manual() {
        let (manual, _) = ScriptedSource::boxed("manual", true, Ok(None));
        let mut sources = TokenSources::manual_only(manual);
        assert_eq!(sources.read().await.unwrap(), None);
    }
}
