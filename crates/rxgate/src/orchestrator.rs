//! The transmission orchestrator: one request from key check to compose URL.
//!
//! Each request walks a small state machine:
//!
//! ```text
//! Init -> [Resetting ->] Validating -> Valid               -> Composing | Blocked
//!                                   -> Invalid             -> ResetPending
//!                                   -> NetworkUnavailable  -> Blocked
//! ```
//!
//! A payload is only built from the [`VerifiedKey`] the validator just
//! produced, so a request can never encrypt under a key it did not check.

use std::sync::Arc;

use rxgate_cipher::{Cipher, KeyValidator, PayloadCipher, Verification, VerifiedKey};
use rxgate_core::{AccountId, InvalidReason, PatientId, ValidationStatus};
use rxgate_keystore::{KeyStore, StoreError};
use url::Url;

use crate::config::{Endpoints, GateConfig};
use crate::error::{Result, TransmitFailure};
use crate::source::{assemble_context, ContextSource};
use crate::view::{
    ComposeView, Notice, Redirect, ResetControl, CIPHER_FAILURE_MESSAGE, RESET_PARAM,
};

/// A single compose request from the page shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeRequest {
    pub account: AccountId,
    pub patient: PatientId,
    /// The clinician asked for a new key.
    pub reset_key: bool,
}

impl ComposeRequest {
    pub fn new(account: AccountId, patient: PatientId) -> Self {
        Self {
            account,
            patient,
            reset_key: false,
        }
    }

    /// Request a key reset before validation.
    pub fn with_reset(mut self) -> Self {
        self.reset_key = true;
        self
    }

    /// Build a request from the page's query string.
    ///
    /// The reset flag is set whenever the reset parameter is present,
    /// whatever its value.
    pub fn from_query(account: AccountId, patient: PatientId, query: &str) -> Self {
        let reset_key =
            url::form_urlencoded::parse(query.as_bytes()).any(|(name, _)| name == RESET_PARAM);
        Self {
            account,
            patient,
            reset_key,
        }
    }
}

/// States a request passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Init,
    Resetting,
    Validating,
    Valid,
    Invalid(InvalidReason),
    NetworkUnavailable,
    Composing,
    ResetPending,
    Blocked,
}

impl GateState {
    /// Check if no further transitions follow.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Composing | Self::ResetPending | Self::Blocked)
    }
}

/// Why a request was blocked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockReason {
    /// The payload could not be built. No URL exists.
    CipherFailure { message: String },
    /// Key infrastructure is unreachable; return to the chart.
    NetworkUnavailable { notice: Notice, redirect: Redirect },
}

/// Terminal outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransmissionOutcome {
    /// The key is valid and the payload is sealed.
    Composing { view: ComposeView, compose_url: Url },
    /// The key failed validation; the clinician must reset it.
    ///
    /// The view is absent when the chart context could not be looked up.
    /// The reset control is always offered.
    ResetPending {
        view: Option<ComposeView>,
        notice: Notice,
        reset: ResetControl,
    },
    /// The request cannot proceed.
    Blocked(BlockReason),
}

impl TransmissionOutcome {
    /// The outbound compose URL, if one was produced.
    pub fn compose_url(&self) -> Option<&Url> {
        match self {
            Self::Composing { compose_url, .. } => Some(compose_url),
            _ => None,
        }
    }

    /// The confirmation view, if the outcome renders one.
    pub fn view(&self) -> Option<&ComposeView> {
        match self {
            Self::Composing { view, .. } => Some(view),
            Self::ResetPending { view, .. } => view.as_ref(),
            Self::Blocked(_) => None,
        }
    }

    fn terminal_state(&self) -> GateState {
        match self {
            Self::Composing { .. } => GateState::Composing,
            Self::ResetPending { .. } => GateState::ResetPending,
            Self::Blocked(_) => GateState::Blocked,
        }
    }
}

/// Everything that happened during one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmissionReport {
    /// Every state visited, in order.
    pub trace: Vec<GateState>,
    /// The status of the last validation, or `Unknown` if none ran.
    ///
    /// A reset that fails on unreachable infrastructure ends the request
    /// before validation, so the status stays `Unknown`.
    pub status: ValidationStatus,
    /// Generation of the key the payload was sealed with.
    pub key_generation: Option<u64>,
    /// A reset was performed during this request.
    pub reset_performed: bool,
    pub outcome: TransmissionOutcome,
}

impl TransmissionReport {
    /// Classify why the request did not compose, if it did not.
    pub fn failure(&self) -> Option<TransmitFailure> {
        match &self.outcome {
            TransmissionOutcome::Composing { .. } => None,
            TransmissionOutcome::Blocked(BlockReason::CipherFailure { message }) => {
                Some(TransmitFailure::CipherFailure(message.clone()))
            }
            TransmissionOutcome::Blocked(BlockReason::NetworkUnavailable { .. }) => {
                Some(TransmitFailure::InfrastructureUnavailable)
            }
            TransmissionOutcome::ResetPending { .. } => TransmitFailure::from_status(self.status),
        }
    }
}

/// Outcome of one reset attempt.
enum ResetOutcome {
    Activated(u64),
    Superseded,
    Unavailable(String),
}

/// In-flight bookkeeping for one request.
struct Run {
    trace: Vec<GateState>,
    status: ValidationStatus,
    reset_performed: bool,
}

impl Run {
    fn new() -> Self {
        Self {
            trace: vec![GateState::Init],
            status: ValidationStatus::Unknown,
            reset_performed: false,
        }
    }

    fn enter(&mut self, state: GateState) {
        debug_assert!(
            !self.trace.last().is_some_and(|last| last.is_terminal()),
            "transition after terminal state"
        );
        tracing::debug!(?state, "gate transition");
        self.trace.push(state);
    }

    fn finish(
        mut self,
        outcome: TransmissionOutcome,
        key_generation: Option<u64>,
    ) -> TransmissionReport {
        self.enter(outcome.terminal_state());
        let report = TransmissionReport {
            trace: self.trace,
            status: self.status,
            key_generation,
            reset_performed: self.reset_performed,
            outcome,
        };

        if let Some(failure) = report.failure() {
            if failure.is_user_recoverable() {
                tracing::info!(%failure, "request awaits key reset");
            } else {
                tracing::warn!(%failure, "request blocked");
            }
        }
        report
    }
}

/// Drives a compose request through key validation to an outcome.
pub struct TransmissionOrchestrator<S, C, X = PayloadCipher>
where
    S: KeyStore + ?Sized,
    C: ContextSource + ?Sized,
    X: Cipher,
{
    store: Arc<S>,
    validator: KeyValidator<S>,
    source: Arc<C>,
    cipher: X,
    config: GateConfig,
    endpoints: Endpoints,
}

impl<S, C> TransmissionOrchestrator<S, C, PayloadCipher>
where
    S: KeyStore + ?Sized,
    C: ContextSource + ?Sized,
{
    /// Create an orchestrator with the production cipher.
    pub fn new(store: Arc<S>, source: Arc<C>, config: GateConfig) -> Result<Self> {
        Self::with_cipher(store, source, PayloadCipher::new(), config)
    }
}

impl<S, C, X> TransmissionOrchestrator<S, C, X>
where
    S: KeyStore + ?Sized,
    C: ContextSource + ?Sized,
    X: Cipher,
{
    /// Create an orchestrator with a specific cipher.
    ///
    /// Fails if the configured URLs cannot be resolved.
    pub fn with_cipher(
        store: Arc<S>,
        source: Arc<C>,
        cipher: X,
        config: GateConfig,
    ) -> Result<Self> {
        let endpoints = config.endpoints()?;
        Ok(Self {
            validator: KeyValidator::new(Arc::clone(&store)),
            store,
            source,
            cipher,
            config,
            endpoints,
        })
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    pub fn cipher(&self) -> &X {
        &self.cipher
    }

    /// Handle one compose request.
    ///
    /// Returns `Err` only for failures outside the state machine: context
    /// lookups and key store errors other than unavailability.
    pub async fn handle(&self, request: &ComposeRequest) -> Result<TransmissionReport> {
        let mut run = Run::new();

        if request.reset_key {
            let blocked = self
                .reset(&request.account, &request.patient, &mut run)
                .await?;
            if let Some(outcome) = blocked {
                return Ok(run.finish(outcome, None));
            }
        }

        loop {
            run.enter(GateState::Validating);
            let verification = self.validator.verify_key(&request.account).await;
            run.status = verification.status();

            match verification {
                Verification::Verified(key) => {
                    run.enter(GateState::Valid);
                    let generation = key.generation();
                    let outcome = self.compose(request, &key).await?;
                    return Ok(run.finish(outcome, Some(generation)));
                }
                Verification::Rejected(reason) => {
                    run.enter(GateState::Invalid(reason));

                    if self.config.auto_reset_on_invalid && !run.reset_performed {
                        tracing::info!(
                            account = %request.account,
                            ?reason,
                            "resetting invalid key automatically"
                        );
                        if let Some(outcome) =
                            self.reset(&request.account, &request.patient, &mut run).await?
                        {
                            return Ok(run.finish(outcome, None));
                        }
                        continue;
                    }

                    let outcome = self.reset_pending(request).await;
                    return Ok(run.finish(outcome, None));
                }
                Verification::Unavailable(_) => {
                    run.enter(GateState::NetworkUnavailable);
                    return Ok(run.finish(self.network_unavailable(&request.patient), None));
                }
            }
        }
    }

    /// Issue and activate a new key.
    ///
    /// Returns a terminal outcome if infrastructure is unreachable.
    async fn reset(
        &self,
        account: &AccountId,
        patient: &PatientId,
        run: &mut Run,
    ) -> Result<Option<TransmissionOutcome>> {
        run.enter(GateState::Resetting);
        run.reset_performed = true;

        let result = match self.issue_and_activate(account).await {
            Ok(result) => result,
            Err(StoreError::Unavailable(reason)) => ResetOutcome::Unavailable(reason),
            Err(e) => return Err(e.into()),
        };

        match result {
            ResetOutcome::Activated(generation) => {
                tracing::info!(account = %account, generation, "encryption key reset");
                Ok(None)
            }
            ResetOutcome::Superseded => {
                tracing::info!(account = %account, "key reset superseded by a newer one");
                Ok(None)
            }
            ResetOutcome::Unavailable(reason) => {
                tracing::warn!(
                    account = %account,
                    %reason,
                    "key reset failed: infrastructure unreachable"
                );
                run.enter(GateState::NetworkUnavailable);
                Ok(Some(self.network_unavailable(patient)))
            }
        }
    }

    async fn issue_and_activate(
        &self,
        account: &AccountId,
    ) -> rxgate_keystore::Result<ResetOutcome> {
        let key = self.store.invalidate_and_issue(account).await?;
        let generation = key.generation;

        match self.store.set(account, key).await {
            Ok(()) => Ok(ResetOutcome::Activated(generation)),
            Err(StoreError::StaleGeneration { .. }) => Ok(ResetOutcome::Superseded),
            Err(e) => Err(e),
        }
    }

    async fn compose(
        &self,
        request: &ComposeRequest,
        key: &VerifiedKey,
    ) -> Result<TransmissionOutcome> {
        let context =
            assemble_context(self.source.as_ref(), &request.account, &request.patient).await?;
        let view = ComposeView::from_context(&context, self.patient_summary(&request.patient));

        let payload = match self.cipher.build_payload(key, &context) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(
                    account = %request.account,
                    fingerprint = %key.fingerprint(),
                    error = %e,
                    "payload construction failed"
                );
                return Ok(TransmissionOutcome::Blocked(BlockReason::CipherFailure {
                    message: CIPHER_FAILURE_MESSAGE.to_string(),
                }));
            }
        };

        let mut compose_url = self.endpoints.compose.clone();
        compose_url
            .query_pairs_mut()
            .append_pair("useremail", context.provider_email())
            .append_pair("data", payload.as_str());

        tracing::info!(
            account = %request.account,
            patient = %request.patient,
            generation = key.generation(),
            fingerprint = %key.fingerprint(),
            "compose target ready"
        );

        Ok(TransmissionOutcome::Composing { view, compose_url })
    }

    /// Offer the reset control, with the confirmation view when the chart
    /// context is available.
    async fn reset_pending(&self, request: &ComposeRequest) -> TransmissionOutcome {
        let view = match assemble_context(self.source.as_ref(), &request.account, &request.patient)
            .await
        {
            Ok(context) => Some(ComposeView::from_context(
                &context,
                self.patient_summary(&request.patient),
            )),
            Err(e) => {
                tracing::warn!(
                    account = %request.account,
                    patient = %request.patient,
                    error = %e,
                    "context unavailable for reset prompt"
                );
                None
            }
        };

        TransmissionOutcome::ResetPending {
            view,
            notice: Notice::key_invalid(self.config.warning_interval()),
            reset: ResetControl::default(),
        }
    }

    fn network_unavailable(&self, patient: &PatientId) -> TransmissionOutcome {
        let interval = self.config.warning_interval();
        TransmissionOutcome::Blocked(BlockReason::NetworkUnavailable {
            notice: Notice::network_unavailable(interval),
            redirect: Redirect {
                target: self.patient_summary(patient),
                after: interval,
            },
        })
    }

    fn patient_summary(&self, patient: &PatientId) -> Url {
        let mut url = self.endpoints.patient_summary.clone();
        url.query_pairs_mut().append_pair("set_pid", patient.as_str());
        url
    }
}
