//! Directive engine — orchestrates one inbound Alexa invocation.
//!
//! Owns no cross-invocation state: everything durable lives in the
//! shadow store, the registry, or the state-report cache. Collaborators
//! are injected so tests can run the full paths against in-memory
//! doubles.

use std::sync::Arc;

use serde_json::{Value, json};
use uuid::Uuid;

use hl_mqtt_channel::{Channel, DevicePublish};
use hl_protocol::version::is_allowed_client_version;
use hl_protocol::{DirectiveEvent, DirectiveName, ReportedState, Template};

use crate::cache::{CacheLookup, PropsCache};
use crate::config::SkillConfig;
use crate::discovery::endpoints_for_devices;
use crate::envelope::{self, ErrorType};
use crate::gateway::EventGateway;
use crate::profile::ProfileFetcher;
use crate::registry::{CredentialsStore, DeviceRegistry};
use crate::resolver::{self, DesiredDelta, ResolveError};
use crate::shadow::ShadowAccessor;

pub struct DirectiveEngine {
    pub(crate) shadows: Arc<dyn ShadowAccessor>,
    pub(crate) channel: Arc<dyn Channel>,
    pub(crate) cache: Arc<dyn PropsCache>,
    pub(crate) gateway: Arc<dyn EventGateway>,
    pub(crate) registry: Arc<dyn DeviceRegistry>,
    pub(crate) credentials: Arc<dyn CredentialsStore>,
    pub(crate) profiles: Arc<dyn ProfileFetcher>,
    pub(crate) config: SkillConfig,
}

impl DirectiveEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        shadows: Arc<dyn ShadowAccessor>,
        channel: Arc<dyn Channel>,
        cache: Arc<dyn PropsCache>,
        gateway: Arc<dyn EventGateway>,
        registry: Arc<dyn DeviceRegistry>,
        credentials: Arc<dyn CredentialsStore>,
        profiles: Arc<dyn ProfileFetcher>,
        config: SkillConfig,
    ) -> Self {
        Self {
            shadows,
            channel,
            cache,
            gateway,
            registry,
            credentials,
            profiles,
            config,
        }
    }

    /// Entry point for inbound Alexa directives. Always produces a
    /// well-formed response document; protocol errors come back as
    /// `ErrorResponse`, never as an Err to the caller.
    pub async fn handle_skill(&self, raw: Value) -> Value {
        let event: DirectiveEvent = match serde_json::from_value(raw) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "malformed directive event");
                return malformed_event_response();
            }
        };

        let name = event.name();
        tracing::info!(
            directive = name.as_str(),
            endpoint_id = event.endpoint_id().unwrap_or("-"),
            "inbound directive"
        );

        let Some(access_token) = extract_access_token(&event) else {
            return envelope::error_response(
                &event,
                ErrorType::ExpiredAuthorizationCredential,
                "no bearer token in event",
                None,
            );
        };

        let profile = match self.profiles.fetch(access_token).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(error = %e, "profile lookup failed");
                return envelope::error_response(
                    &event,
                    ErrorType::ExpiredAuthorizationCredential,
                    "invalid token",
                    None,
                );
            }
        };

        let response = match name {
            DirectiveName::Discover => self.handle_discover(&event, &profile.user_id).await,
            DirectiveName::ReportState => self.handle_report_state(&event).await,
            _ => self.handle_directive(&event).await,
        };

        tracing::debug!(
            response_name = response["event"]["header"]["name"].as_str().unwrap_or("-"),
            "directive handled"
        );
        response
    }

    async fn handle_discover(&self, event: &DirectiveEvent, user_id: &str) -> Value {
        let devices = match self.registry.devices_of_user(user_id).await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::error!(user_id, error = %e, "registry lookup failed");
                Vec::new()
            }
        };
        envelope::discover_response(event, &endpoints_for_devices(&devices))
    }

    /// The regular device-directive path: gate on firmware version and
    /// connectivity, resolve, fan out to the device, answer immediately.
    async fn handle_directive(&self, event: &DirectiveEvent) -> Value {
        let Some(cookie) = event.cookie() else {
            return envelope::error_response(
                event,
                ErrorType::InvalidDirective,
                "directive has no routing cookie",
                None,
            );
        };
        let Some(endpoint_id) = event.endpoint_id() else {
            return envelope::error_response(
                event,
                ErrorType::InvalidDirective,
                "directive has no endpoint",
                None,
            );
        };
        let thing_id = cookie.thing_id.clone();
        let template = cookie.template;

        // Version and connectivity gates run before any directive logic,
        // version first.
        let thing_reported = match self.shadows.thing_shadow(&thing_id).await {
            Ok(doc) => doc.state.reported,
            Err(e) => {
                tracing::warn!(thing_id, error = %e, "thing shadow fetch failed");
                return envelope::error_response(
                    event,
                    ErrorType::EndpointUnreachable,
                    &format!("thing {thing_id} has no shadow"),
                    None,
                );
            }
        };

        let client_version = thing_reported
            .client_version
            .as_deref()
            .unwrap_or("0.0.0");
        if !is_allowed_client_version(client_version) {
            return envelope::error_response(
                event,
                ErrorType::FirmwareOutOfDate,
                &format!("client version {client_version} of thing {thing_id} is outdated"),
                None,
            );
        }

        if !thing_reported.connected.unwrap_or(false) {
            return envelope::error_response(
                event,
                ErrorType::EndpointUnreachable,
                &format!("thing {thing_id} is not connected"),
                None,
            );
        }

        let reported = match self.shadows.device_shadow(&thing_id, endpoint_id).await {
            Ok(doc) => doc.state.reported,
            // A device that never reported yet still accepts directives.
            Err(_) => ReportedState::default(),
        };

        let name = event.name();
        let resolution = match resolver::resolve(
            &name,
            &event.directive.payload,
            event.directive.header.instance.as_deref(),
            &reported,
            template,
        ) {
            Ok(resolution) => resolution,
            Err(e @ ResolveError::Unsupported(_)) | Err(e @ ResolveError::Payload(..)) => {
                tracing::warn!(directive = name.as_str(), error = %e, "unresolvable directive");
                return envelope::error_response(
                    event,
                    ErrorType::InvalidDirective,
                    &e.to_string(),
                    None,
                );
            }
        };

        // The device must not see skill-internal correlation metadata.
        let stub = event.sanitized();
        if let Err(e) = self
            .channel
            .publish_directive(&thing_id, endpoint_id, &stub)
            .await
        {
            tracing::error!(thing_id, endpoint_id, error = %e, "directive publish failed");
            return envelope::error_response(
                event,
                ErrorType::EndpointUnreachable,
                &format!("could not reach thing {thing_id}"),
                None,
            );
        }

        if template == Template::Scene {
            return envelope::scene_response(event, name == DirectiveName::Activate);
        }

        if resolution.desired != DesiredDelta::None {
            let delta = json!({
                "state": { "desired": resolution.desired },
                "source": "alexa",
                "directive": name.as_str(),
                "anticipatedProperties": resolution.properties,
            });
            if let Err(e) = self
                .channel
                .publish_shadow_update(&thing_id, endpoint_id, &delta)
                .await
            {
                tracing::error!(thing_id, endpoint_id, error = %e, "shadow update publish failed");
            }
        }

        envelope::deferred_response(event)
    }

    /// Synchronous `ReportState`: answer from cache if possible, else
    /// fall back to the ordinary deferred round-trip.
    async fn handle_report_state(&self, event: &DirectiveEvent) -> Value {
        let (Some(cookie), Some(endpoint_id)) = (event.cookie(), event.endpoint_id()) else {
            return envelope::error_response(
                event,
                ErrorType::InvalidDirective,
                "directive has no endpoint",
                None,
            );
        };
        let thing_id = cookie.thing_id.clone();

        match self.cache.read(&thing_id, endpoint_id).await {
            CacheLookup::Hit(properties) => {
                tracing::debug!(thing_id, endpoint_id, "state report served from cache");
                return envelope::cached_state_report(event, &properties);
            }
            CacheLookup::Miss => {
                tracing::debug!(thing_id, endpoint_id, "state report cache miss");
            }
            // A broken cache degrades exactly like a miss.
            CacheLookup::Error(cause) => {
                tracing::warn!(thing_id, endpoint_id, cause, "state report cache error");
            }
        }

        let stub = event.sanitized();
        if let Err(e) = self
            .channel
            .publish_directive(&thing_id, endpoint_id, &stub)
            .await
        {
            tracing::error!(thing_id, endpoint_id, error = %e, "report-state publish failed");
            return envelope::error_response(
                event,
                ErrorType::EndpointUnreachable,
                &format!("could not reach thing {thing_id}"),
                None,
            );
        }

        envelope::deferred_response(event)
    }
}

fn extract_access_token(event: &DirectiveEvent) -> Option<&str> {
    if event.name() == DirectiveName::Discover {
        return event.directive.payload["scope"]["token"].as_str();
    }
    event
        .directive
        .endpoint
        .as_ref()
        .and_then(|e| e.scope.as_ref())
        .map(|s| s.token.as_str())
}

fn malformed_event_response() -> Value {
    json!({
        "event": {
            "header": {
                "namespace": "Alexa",
                "name": "ErrorResponse",
                "messageId": Uuid::new_v4().to_string(),
                "payloadVersion": "3",
            },
            "payload": {
                "type": ErrorType::InvalidDirective.as_str(),
                "message": "malformed directive event",
            },
        },
    })
}
