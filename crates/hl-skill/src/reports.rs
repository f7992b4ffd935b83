//! Backchannel path — device-originated events turned into Alexa
//! reports.
//!
//! Dispatches on the event rule and cause type. Every handler returns a
//! plain bool: a failed gateway push or an unknown thing is logged and
//! reported as `false`, never propagated — a crash here would be
//! silently dropped by the hosting platform with no benefit.

use serde_json::{Value, json};

use hl_mqtt_channel::DevicePublish;
use hl_protocol::version::is_allowed_client_version;
use hl_protocol::{
    BackchannelEvent, CauseType, ChangedProperty, Property, Rule, Template, partition_changed,
};

use crate::discovery::endpoint_for_device;
use crate::engine::DirectiveEngine;
use crate::envelope;
use crate::projector;
use crate::registry::{DeviceRecord, UserCredentials, verify_user_id_token};
use crate::service;

impl DirectiveEngine {
    /// Entry point for inbound device events.
    pub async fn handle_backchannel(&self, event: BackchannelEvent) -> bool {
        tracing::info!(
            rule = ?event.rule,
            thing_id = %event.thing_id,
            endpoint_id = event.endpoint_id.as_deref().unwrap_or("-"),
            cause_type = ?event.cause_type,
            client_version = %event.client_version,
            "inbound backchannel event"
        );

        match event.rule {
            Rule::LegacyDiscover => {
                service::kill_device_due_to_outdated_version(&*self.channel, &event.thing_id).await
            }
            Rule::BulkDiscover => self.handle_bulk_discover(&event).await,
            Rule::BulkUndiscover => self.handle_bulk_undiscover(&event).await,
            Rule::ChangeReport => self.handle_change_report(&event).await,
            Rule::RequestConfig => self.handle_request_config(&event).await,
        }
    }

    async fn handle_bulk_discover(&self, event: &BackchannelEvent) -> bool {
        let Some(user_id) = self.user_for_thing(&event.thing_id).await else {
            return false;
        };

        let mut discovered = Vec::new();
        for stub in &event.devices {
            let record = DeviceRecord {
                device_id: stub.device_id.clone(),
                user_id: user_id.clone(),
                thing_id: event.thing_id.clone(),
                friendly_name: stub.friendly_name.clone(),
                template: stub.template,
            };
            if let Err(e) = self.registry.upsert_device(record.clone()).await {
                tracing::error!(device_id = %stub.device_id, error = %e, "device upsert failed");
                continue;
            }
            discovered.push(record);
        }

        let Some(creds) = self.credentials_for(&user_id).await else {
            return false;
        };

        let endpoints: Vec<Value> = discovered.iter().map(endpoint_for_device).collect();
        let report = envelope::add_or_update_report(&endpoints, &creds.access_token);

        if let Err(e) = self
            .gateway
            .push(&creds.skill_region, &creds.access_token, &report)
            .await
        {
            tracing::error!(thing_id = %event.thing_id, error = %e, "proactive discovery failed");
            // let the device surface the degraded state instead of
            // failing the whole batch
            service::set_device_status_degraded(
                &*self.channel,
                &event.thing_id,
                "proactive discovery failed",
                &discovered
                    .iter()
                    .map(|d| d.device_id.clone())
                    .collect::<Vec<_>>(),
            )
            .await;
            return false;
        }

        true
    }

    async fn handle_bulk_undiscover(&self, event: &BackchannelEvent) -> bool {
        let Some(user_id) = self.user_for_thing(&event.thing_id).await else {
            return false;
        };

        let mut removed_ids = Vec::new();
        for stub in &event.devices {
            if let Err(e) = self
                .registry
                .delete_device(&user_id, &event.thing_id, &stub.device_id)
                .await
            {
                tracing::error!(device_id = %stub.device_id, error = %e, "device delete failed");
                continue;
            }
            self.cache.delete(&event.thing_id, &stub.device_id).await;
            removed_ids.push(stub.device_id.clone());
        }

        let Some(creds) = self.credentials_for(&user_id).await else {
            return false;
        };

        let report = envelope::delete_report(&removed_ids, &creds.access_token);
        match self
            .gateway
            .push(&creds.skill_region, &creds.access_token, &report)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(thing_id = %event.thing_id, error = %e, "proactive undiscovery failed");
                false
            }
        }
    }

    async fn handle_change_report(&self, event: &BackchannelEvent) -> bool {
        let user_id = match &event.user_id_token {
            Some(token) => {
                match verify_user_id_token(token, &event.thing_id, &self.config.token_secret) {
                    Some(user_id) => Some(user_id),
                    None => {
                        tracing::warn!(thing_id = %event.thing_id, "user id token failed verification");
                        None
                    }
                }
            }
            // clients predating provisioned tokens
            None => self.user_for_thing(&event.thing_id).await,
        };
        let Some(user_id) = user_id else {
            return false;
        };

        let Some(endpoint_id) = event.endpoint_id.clone() else {
            tracing::warn!(thing_id = %event.thing_id, "change report without endpoint");
            return false;
        };

        let Some(creds) = self.credentials_for(&user_id).await else {
            return false;
        };

        if event.template == Some(Template::DoorbellEventSource) {
            return self.push_doorbell(event, &endpoint_id, &creds).await;
        }

        match (event.cause_type, event.correlation_token.as_deref()) {
            (Some(CauseType::VoiceInteraction), Some(token)) => {
                self.push_correlated(event, &endpoint_id, token, &creds, false)
                    .await
            }
            (Some(CauseType::StateReport), Some(token)) => {
                self.push_correlated(event, &endpoint_id, token, &creds, true)
                    .await
            }
            _ => self.push_change_report(event, &endpoint_id, &creds).await,
        }
    }

    /// Redeem a deferred directive (`Response`) or deferred ReportState
    /// (`StateReport`) with the device's current property set.
    async fn push_correlated(
        &self,
        event: &BackchannelEvent,
        endpoint_id: &str,
        correlation_token: &str,
        creds: &UserCredentials,
        state_report: bool,
    ) -> bool {
        let mut properties: Vec<Property> = event
            .properties
            .iter()
            .cloned()
            .map(ChangedProperty::into_property)
            .collect();

        // Some clients redeem with an empty property list; fall back to
        // projecting the device shadow.
        if properties.is_empty() {
            if let Ok(doc) = self
                .shadows
                .device_shadow(&event.thing_id, endpoint_id)
                .await
            {
                properties = projector::project(&doc.state.reported, None);
            }
        }

        let envelope = if state_report {
            envelope::async_state_report(
                endpoint_id,
                correlation_token,
                &creds.access_token,
                &properties,
            )
        } else {
            envelope::async_response(
                endpoint_id,
                correlation_token,
                &creds.access_token,
                &properties,
            )
        };

        if let Err(e) = self
            .gateway
            .push(&creds.skill_region, &creds.access_token, &envelope)
            .await
        {
            tracing::error!(endpoint_id, error = %e, "async report push failed");
            return false;
        }

        self.cache_properties(&event.thing_id, endpoint_id, properties)
            .await;
        true
    }

    async fn push_change_report(
        &self,
        event: &BackchannelEvent,
        endpoint_id: &str,
        creds: &UserCredentials,
    ) -> bool {
        if event.properties.is_empty() {
            tracing::warn!(endpoint_id, "change report without properties");
            return false;
        }

        let cause_type = event.cause_type.unwrap_or(CauseType::PhysicalInteraction);
        let (changed, unchanged) = partition_changed(event.properties.clone());

        let report = envelope::change_report(
            endpoint_id,
            &creds.access_token,
            cause_type,
            &changed,
            &unchanged,
        );

        if let Err(e) = self
            .gateway
            .push(&creds.skill_region, &creds.access_token, &report)
            .await
        {
            tracing::error!(endpoint_id, error = %e, "change report push failed");
            return false;
        }

        let mut all = changed;
        all.extend(unchanged);
        self.cache_properties(&event.thing_id, endpoint_id, all)
            .await;
        true
    }

    async fn push_doorbell(
        &self,
        event: &BackchannelEvent,
        endpoint_id: &str,
        creds: &UserCredentials,
    ) -> bool {
        // Button release / non-press telemetry must not ring the bell.
        let suppressed = event
            .properties
            .iter()
            .any(|p| p.property.value == json!("NOT_DETECTED"));
        if suppressed {
            tracing::debug!(endpoint_id, "doorbell event suppressed (NOT_DETECTED)");
            return false;
        }

        let press = envelope::doorbell_press(endpoint_id, &creds.access_token);
        match self
            .gateway
            .push(&creds.skill_region, &creds.access_token, &press)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(endpoint_id, error = %e, "doorbell press push failed");
                false
            }
        }
    }

    async fn handle_request_config(&self, event: &BackchannelEvent) -> bool {
        let thing_id = &event.thing_id;

        if !is_allowed_client_version(&event.client_version) {
            service::kill_device_due_to_outdated_version(&*self.channel, thing_id).await;
            return false;
        }

        let Some(user_id) = self.user_for_thing(thing_id).await else {
            service::kill_device(&*self.channel, thing_id, "No user found for thing").await;
            return false;
        };

        let account = match self.registry.user_account(&user_id).await {
            Ok(account) => account,
            Err(e) => {
                tracing::error!(user_id, error = %e, "account lookup failed");
                return false;
            }
        };

        if account.is_blocked {
            service::kill_device(&*self.channel, thing_id, "User account is blocked").await;
            return false;
        }

        let other_things = self
            .registry
            .device_count_excluding_thing(&user_id, thing_id)
            .await
            .unwrap_or(0);
        let allowance = account.allowed_device_count.saturating_sub(other_things);

        let payload = service::override_config_payload(
            &user_id,
            thing_id,
            &self.config.token_secret,
            allowance,
            &event.client_version,
        );

        if let Err(e) = self.channel.publish_service(thing_id, &payload).await {
            tracing::error!(thing_id, error = %e, "overrideConfig publish failed");
            return false;
        }
        true
    }

    /// Write the observed property set (plus synthetic health) for
    /// synchronous ReportState answers. Best-effort.
    async fn cache_properties(
        &self,
        thing_id: &str,
        endpoint_id: &str,
        mut properties: Vec<Property>,
    ) {
        properties.push(Property::connectivity(true));
        self.cache.write(thing_id, endpoint_id, &properties).await;
    }

    async fn user_for_thing(&self, thing_id: &str) -> Option<String> {
        match self.registry.user_id_for_thing(thing_id).await {
            Ok(Some(user_id)) => Some(user_id),
            Ok(None) => {
                tracing::warn!(thing_id, "no user registered for thing");
                None
            }
            Err(e) => {
                tracing::error!(thing_id, error = %e, "user lookup failed");
                None
            }
        }
    }

    async fn credentials_for(&self, user_id: &str) -> Option<UserCredentials> {
        match self.credentials.credentials(user_id).await {
            Ok(creds) => Some(creds),
            Err(e) => {
                tracing::error!(user_id, error = %e, "credential lookup failed");
                None
            }
        }
    }
}
