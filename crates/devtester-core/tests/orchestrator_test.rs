#![allow(clippy::unwrap_used)]

mod support;

use std::sync::Arc;

use devtester_core::busy::DYNAMIC_DATA;
use devtester_core::{
    BusyChange, CommandKind, CoreError, DeleteResult, DeviceField, FieldUpdate, OrchestratorConfig,
    OrchestratorEvent, PollPayload, ResourceInputs, SaveOutcome, SaveResult,
};
use devtester_core::model::validation::is_guid_shape;
use pretty_assertions::assert_eq;

use support::{Decline, Harness, ID_A, ID_B, device, fill_form};

// ── Initial load ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn initial_load_authenticates_each_device_independently() {
    let mut h = Harness::new(vec![
        device(ID_A, "10.0.0.1", Some(true)),
        device(ID_B, "10.0.0.2", Some(true)),
    ])
    .with_outcomes(&[false, true]);

    h.orchestrator.initialize().await;

    let states: Vec<_> = h
        .orchestrator
        .devices()
        .iter()
        .map(|d| d.is_authenticated())
        .collect();
    assert_eq!(states, vec![Some(false), Some(true)]);
    assert_eq!(h.repository.save_count(), 1);
    assert_eq!(h.repository.stored.lock().unwrap()[0].is_authenticated(), Some(false));
    assert!(!h.orchestrator.busy().any_loading());
}

#[tokio::test(start_paused = true)]
async fn bulk_outcomes_are_not_forced_uniform() {
    let devices = (0..32)
        .map(|i| device(&format!("00000000-0000-0000-0000-{i:012}"), &format!("10.0.1.{i}"), None))
        .collect();
    let mut h = Harness::new(devices);

    h.orchestrator.initialize().await;

    let authenticated = h
        .orchestrator
        .devices()
        .iter()
        .filter(|d| d.is_authenticated() == Some(true))
        .count();
    assert!(authenticated > 0 && authenticated < 32, "got {authenticated}/32");
}

#[tokio::test(start_paused = true)]
async fn empty_list_skips_bulk_authentication() {
    let mut h = Harness::new(Vec::new());
    let mut changes = h.orchestrator.busy().subscribe();

    h.orchestrator.initialize().await;

    assert!(h.orchestrator.devices().is_empty());
    assert!(changes.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn failed_load_reports_and_leaves_list_empty() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    *h.repository.fail_load.lock().unwrap() = true;

    assert!(!h.orchestrator.initialize().await);

    assert!(h.orchestrator.devices().is_empty());
    let message = h.last_message().unwrap();
    assert!(message.starts_with("Error loading devices"), "{message}");
}

#[tokio::test(start_paused = true)]
async fn failed_persist_after_bulk_auth_forces_unauthenticated() {
    let mut h = Harness::new(vec![
        device(ID_A, "10.0.0.1", None),
        device(ID_B, "10.0.0.2", None),
    ])
    .with_outcomes(&[true]);
    *h.repository.fail_save.lock().unwrap() = true;

    h.orchestrator.initialize().await;

    assert!(h
        .orchestrator
        .devices()
        .iter()
        .all(|d| d.is_authenticated() == Some(false)));
    assert!(h.last_message().unwrap().starts_with("Error saving devices"));
}

// ── Save ────────────────────────────────────────────────────────────

#[tokio::test]
async fn saving_new_device_assigns_identities_and_clears_form() {
    let mut h = Harness::new(Vec::new());
    fill_form(&mut h.orchestrator, "10.0.0.7");
    assert!(h.orchestrator.can_save());

    let result = h.orchestrator.save().await;

    let SaveResult::Saved(SaveOutcome::Created { device_id }) = result else {
        panic!("expected a created device");
    };
    let saved = &h.orchestrator.devices()[0];
    assert_eq!(saved.device_id(), device_id);
    assert!(is_guid_shape(saved.device_id()));
    assert!(is_guid_shape(saved.solution_id()));
    assert_eq!(saved.device_name(), "Device Redfish");
    assert_eq!(saved.is_authenticated(), None);
    assert_eq!(h.repository.stored_ids(), vec![device_id]);
    assert_eq!(h.last_message().unwrap(), "Device saved successfully!");

    let form = h.orchestrator.form().record();
    assert!(form.is_new());
    assert_eq!(form.username(), "");
    assert_eq!(form.port(), "9000");
}

#[tokio::test]
async fn new_devices_are_prepended() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.orchestrator.load_all(false).await;
    fill_form(&mut h.orchestrator, "10.0.0.2");

    h.orchestrator.save().await;

    assert_eq!(h.orchestrator.devices().len(), 2);
    assert_eq!(h.orchestrator.devices()[0].ip_address(), "10.0.0.2");
    assert_eq!(h.orchestrator.devices()[1].device_id(), ID_A);
}

#[tokio::test]
async fn duplicate_address_is_rejected_on_the_form() {
    let mut h = Harness::new(vec![device(ID_A, "127.0.0.1", Some(true))]);
    h.orchestrator.load_all(false).await;
    fill_form(&mut h.orchestrator, "127.0.0.1");

    assert_eq!(h.orchestrator.save().await, SaveResult::Duplicate);
    assert_eq!(
        h.orchestrator.form().error_message(),
        Some("A device with the same IP and Port already exists!")
    );
    assert_eq!(h.orchestrator.devices().len(), 1);
    assert_eq!(h.repository.save_count(), 0);
}

#[tokio::test]
async fn editing_selected_device_updates_in_place() {
    let mut h = Harness::new(vec![device(ID_A, "127.0.0.1", Some(true))]);
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();
    h.orchestrator
        .update_form(FieldUpdate::IpAddress("192.168.0.1".into()));

    let result = h.orchestrator.save().await;

    assert_eq!(
        result,
        SaveResult::Saved(SaveOutcome::Updated {
            device_id: ID_A.into()
        })
    );
    assert_eq!(h.orchestrator.devices().len(), 1);
    assert_eq!(h.orchestrator.devices()[0].ip_address(), "192.168.0.1");
    assert_eq!(h.last_message().unwrap(), "Device updated successfully!");
    assert!(h.orchestrator.selected().is_none());
}

#[tokio::test]
async fn invalid_form_is_not_saved() {
    let mut h = Harness::new(Vec::new());
    assert!(!h.orchestrator.can_save());

    let SaveResult::Invalid(messages) = h.orchestrator.save().await else {
        panic!("expected validation failure");
    };

    assert!(messages.contains(&"Username is required".to_owned()));
    assert!(messages.contains(&"Password is required".to_owned()));
    assert!(h.orchestrator.form().record().has_errors());
    assert!(h.orchestrator.devices().is_empty());
}

// ── Selection & form ────────────────────────────────────────────────

#[tokio::test]
async fn clearing_selection_restores_default_record() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();
    assert_eq!(h.orchestrator.form().record().device_id(), ID_A);

    h.orchestrator.select(None).unwrap();

    let form = h.orchestrator.form().record();
    assert_eq!(form.device_id(), "");
    assert_eq!(form.agent(), "Redfish");
    assert_eq!(form.ip_address(), "127.0.0.0");
    assert_eq!(form.port(), "9000");
    assert!(form.use_secure_connection());
}

#[tokio::test]
async fn form_edits_never_touch_the_list() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();

    h.orchestrator.update_form(FieldUpdate::IpAddress("10.9.9.9".into()));

    assert_eq!(h.orchestrator.devices()[0].ip_address(), "10.0.0.1");
}

#[tokio::test]
async fn agent_change_reloads_ports() {
    let mut h = Harness::new(Vec::new());
    h.orchestrator
        .update_form(FieldUpdate::Agent("EcoRT".into()));

    assert_eq!(h.orchestrator.form().available_ports(), ["51443", "51499", "Other"]);
    assert_eq!(h.orchestrator.form().record().port(), "51443");
}

#[tokio::test]
async fn clear_resets_agent_port_and_error() {
    let mut h = Harness::new(vec![device(ID_A, "127.0.0.1", Some(true))]);
    h.orchestrator.load_all(false).await;
    h.orchestrator
        .update_form(FieldUpdate::Agent("SoftdPACManager".into()));
    fill_form(&mut h.orchestrator, "127.0.0.1");
    h.orchestrator
        .update_form(FieldUpdate::Port("9000".into()));
    assert_eq!(h.orchestrator.save().await, SaveResult::Duplicate);

    h.orchestrator.clear();

    let form = h.orchestrator.form();
    assert_eq!(form.record().agent(), "Redfish");
    assert_eq!(form.record().port(), "9000");
    assert_eq!(form.error_message(), None);
    assert!(h.orchestrator.is_enabled(CommandKind::Clear, None));
}

// ── Delete ──────────────────────────────────────────────────────────

#[tokio::test]
async fn deleting_selected_device_resets_form() {
    let mut h = Harness::new(vec![
        device(ID_A, "10.0.0.1", Some(true)),
        device(ID_B, "10.0.0.2", Some(true)),
    ]);
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();

    let result = h.orchestrator.delete(ID_A).await.unwrap();

    assert_eq!(result, DeleteResult::Deleted);
    assert_eq!(h.repository.stored_ids(), vec![ID_B.to_owned()]);
    assert!(h.orchestrator.selected().is_none());
    assert!(h.orchestrator.form().record().is_new());
    assert_eq!(h.last_message().unwrap(), "Device deleted successfully");
}

#[tokio::test]
async fn declined_delete_changes_nothing() {
    let mut h = Harness::build(
        vec![device(ID_A, "10.0.0.1", Some(true))],
        Arc::new(Decline),
        OrchestratorConfig::immediate(),
    );
    h.orchestrator.load_all(false).await;

    assert_eq!(h.orchestrator.delete(ID_A).await.unwrap(), DeleteResult::Cancelled);
    assert_eq!(h.orchestrator.devices().len(), 1);
    assert_eq!(h.repository.save_count(), 0);
}

#[tokio::test]
async fn delete_of_unknown_device_is_unavailable() {
    let mut h = Harness::new(Vec::new());
    assert!(!h.orchestrator.is_enabled(CommandKind::Delete, Some(ID_A)));
    assert!(matches!(
        h.orchestrator.delete(ID_A).await,
        Err(CoreError::CommandUnavailable { .. })
    ));
}

// ── Authenticate ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn authenticate_updates_list_and_form() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", None)]).with_outcomes(&[true]);
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();

    assert!(h.orchestrator.authenticate(ID_A).await.unwrap());

    assert_eq!(h.orchestrator.devices()[0].is_authenticated(), Some(true));
    assert_eq!(h.orchestrator.form().record().is_authenticated(), Some(true));
    assert_eq!(
        h.repository.stored.lock().unwrap()[0].is_authenticated(),
        Some(true)
    );
    assert_eq!(h.last_message().unwrap(), "Authentication succeeded");
    assert!(!h.orchestrator.busy().any_loading());
}

#[tokio::test(start_paused = true)]
async fn failed_authentication_stops_polling_and_clears_payload() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]).with_outcomes(&[false]);
    h.provider
        .dynamic_payloads
        .lock()
        .unwrap()
        .insert(ID_A.into(), r#"{"load":1}"#.into());
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();
    h.orchestrator.fetch_dynamic().await.unwrap();
    assert!(h.orchestrator.is_polling());

    assert!(!h.orchestrator.authenticate(ID_A).await.unwrap());

    assert!(!h.orchestrator.is_polling());
    assert_eq!(h.provider.polling_for(), None);
    assert_eq!(h.orchestrator.payload(), None);
    assert_eq!(h.orchestrator.devices()[0].is_authenticated(), Some(false));
    assert_eq!(h.last_message().unwrap(), "Authentication failed");
    assert!(!h.orchestrator.can_fetch());
}

#[tokio::test(start_paused = true)]
async fn authenticate_reports_form_auth_change() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", None)]).with_outcomes(&[true]);
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();
    let mut events = h.orchestrator.subscribe();

    h.orchestrator.authenticate(ID_A).await.unwrap();

    let seen: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert!(seen.contains(&OrchestratorEvent::FormChanged(DeviceField::IsAuthenticated)));
}

#[tokio::test]
async fn authenticate_unknown_device_is_unavailable() {
    let mut h = Harness::new(Vec::new());
    let err = h.orchestrator.authenticate(ID_A).await.unwrap_err();
    assert!(matches!(err, CoreError::CommandUnavailable { .. }));
}

// ── Data feeds ──────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn fetch_static_displays_payload() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.provider
        .static_payloads
        .lock()
        .unwrap()
        .insert(ID_A.into(), r#"{"model":"X1"}"#.into());
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();
    assert!(h.orchestrator.is_enabled(CommandKind::FetchStatic, None));

    h.orchestrator.fetch_static().await.unwrap();

    assert_eq!(h.orchestrator.payload().as_deref(), Some(r#"{"model":"X1"}"#));
    assert!(!h.orchestrator.busy().any_loading());
}

#[tokio::test(start_paused = true)]
async fn missing_static_payload_is_displayed_as_error() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();

    h.orchestrator.fetch_static().await.unwrap();

    let shown = h.orchestrator.payload().unwrap();
    assert!(shown.starts_with("Static data not found"), "{shown}");
    assert!(!h.orchestrator.busy().is_fetching_data());
}

#[tokio::test]
async fn fetch_requires_authenticated_selection() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", None)]);
    h.orchestrator.load_all(false).await;

    let err = h.orchestrator.fetch_static().await.unwrap_err();
    assert!(err.to_string().contains("No device selected."), "{err}");

    h.orchestrator.select(Some(ID_A)).unwrap();
    assert!(!h.orchestrator.can_fetch());
    assert!(h.orchestrator.fetch_dynamic().await.is_err());
    assert!(h
        .orchestrator
        .manage_resources(ResourceInputs::default())
        .is_err());
}

#[tokio::test(start_paused = true)]
async fn fetch_dynamic_formats_then_streams() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.provider
        .dynamic_payloads
        .lock()
        .unwrap()
        .insert(ID_A.into(), r#"{"tick":0}"#.into());
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();
    let mut busy = h.orchestrator.busy().subscribe();

    h.orchestrator.fetch_dynamic().await.unwrap();

    assert_eq!(h.orchestrator.payload().as_deref(), Some("{\n  \"tick\": 0\n}"));
    assert_eq!(h.provider.polling_for().as_deref(), Some(ID_A));
    assert_eq!(
        busy.try_recv().unwrap(),
        BusyChange {
            key: DYNAMIC_DATA.into(),
            is_loading: true
        }
    );
    assert_eq!(
        busy.try_recv().unwrap(),
        BusyChange {
            key: DYNAMIC_DATA.into(),
            is_loading: false
        }
    );

    h.provider.push(PollPayload::Data(r#"{"tick":1}"#.into()));
    h.provider.push(PollPayload::Data("not json".into()));
    assert_eq!(h.orchestrator.apply_live_updates(), 2);
    let shown = h.orchestrator.payload().unwrap();
    assert!(shown.starts_with("Error parsing dynamic JSON: "), "{shown}");

    h.provider
        .push(PollPayload::Error("Error: Dynamic file not found: DynamicData2.json".into()));
    h.orchestrator.apply_live_updates();
    assert_eq!(
        h.orchestrator.payload().as_deref(),
        Some("Error: Dynamic file not found: DynamicData2.json")
    );
}

#[tokio::test(start_paused = true)]
async fn empty_dynamic_payload_has_placeholder() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.provider
        .dynamic_payloads
        .lock()
        .unwrap()
        .insert(ID_A.into(), String::new());
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();

    h.orchestrator.fetch_dynamic().await.unwrap();

    assert_eq!(h.orchestrator.payload().as_deref(), Some("Dynamic data is empty."));
}

#[tokio::test(start_paused = true)]
async fn failed_dynamic_fetch_does_not_start_polling() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();

    h.orchestrator.fetch_dynamic().await.unwrap();

    assert!(!h.orchestrator.is_polling());
    assert!(h.orchestrator.payload().unwrap().starts_with("Dynamic data not found"));
    assert!(!h.orchestrator.busy().is_loading(DYNAMIC_DATA));
}

#[tokio::test(start_paused = true)]
async fn switching_selection_stops_session_and_drops_stale_payloads() {
    let mut h = Harness::new(vec![
        device(ID_A, "10.0.0.1", Some(true)),
        device(ID_B, "10.0.0.2", Some(true)),
    ]);
    h.provider
        .dynamic_payloads
        .lock()
        .unwrap()
        .insert(ID_A.into(), r#"{"a":1}"#.into());
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();
    h.orchestrator.fetch_dynamic().await.unwrap();
    let stale = h.provider.callback.lock().unwrap().clone().unwrap();

    h.orchestrator.select(Some(ID_B)).unwrap();
    stale(PollPayload::Data(r#"{"a":2}"#.into()));

    assert!(!h.orchestrator.is_polling());
    assert_eq!(h.orchestrator.apply_live_updates(), 0);
    assert_eq!(h.orchestrator.payload(), None);
    assert_eq!(h.orchestrator.form().record().device_id(), ID_B);
}

#[tokio::test(start_paused = true)]
async fn reselecting_same_device_keeps_form_edits_and_session() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.provider
        .dynamic_payloads
        .lock()
        .unwrap()
        .insert(ID_A.into(), r#"{"a":1}"#.into());
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();
    h.orchestrator.fetch_dynamic().await.unwrap();
    h.orchestrator.update_form(FieldUpdate::IpAddress("10.9.9.9".into()));
    let mut events = h.orchestrator.subscribe();

    h.orchestrator.select(Some(ID_A)).unwrap();

    assert_eq!(h.orchestrator.form().record().ip_address(), "10.9.9.9");
    assert!(h.orchestrator.is_polling());
    assert!(h.orchestrator.payload().is_some());
    assert!(events.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn reload_while_polling_resets_selection_form_and_session() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.provider
        .dynamic_payloads
        .lock()
        .unwrap()
        .insert(ID_A.into(), r#"{"a":1}"#.into());
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();
    h.orchestrator.fetch_dynamic().await.unwrap();
    let mut events = h.orchestrator.subscribe();

    assert!(h.orchestrator.load_all(false).await);

    assert_eq!(h.orchestrator.selected().map(|d| d.device_id().to_owned()), None);
    assert!(!h.orchestrator.is_polling());
    assert_eq!(h.provider.polling_for(), None);
    assert_eq!(h.orchestrator.payload(), None);
    assert!(h.orchestrator.form().record().is_new());
    assert_eq!(h.orchestrator.devices().len(), 1);

    let seen: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
    assert!(seen.contains(&OrchestratorEvent::SelectionChanged(None)));
    assert!(seen.contains(&OrchestratorEvent::FormReplaced));
}

#[tokio::test(start_paused = true)]
async fn failed_reload_while_polling_still_stops_session() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.provider
        .dynamic_payloads
        .lock()
        .unwrap()
        .insert(ID_A.into(), r#"{"a":1}"#.into());
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();
    h.orchestrator.fetch_dynamic().await.unwrap();
    *h.repository.fail_load.lock().unwrap() = true;

    assert!(!h.orchestrator.initialize().await);

    assert!(h.orchestrator.selected().is_none());
    assert!(!h.orchestrator.is_polling());
    assert_eq!(h.provider.polling_for(), None);
    assert_eq!(h.orchestrator.payload(), None);
    assert!(h.orchestrator.form().record().is_new());
}

#[tokio::test(start_paused = true)]
async fn next_live_update_waits_for_provider() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.provider
        .dynamic_payloads
        .lock()
        .unwrap()
        .insert(ID_A.into(), "{}".into());
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();
    h.orchestrator.fetch_dynamic().await.unwrap();

    let provider = Arc::clone(&h.provider);
    tokio::spawn(async move {
        provider.push(PollPayload::Data(r#"{"fan":"ok"}"#.into()));
    });

    let shown = h.orchestrator.next_live_update().await.unwrap();
    assert_eq!(shown, "{\n  \"fan\": \"ok\"\n}");

    h.orchestrator.stop_live_updates();
    assert!(h.orchestrator.next_live_update().await.is_none());
}

#[tokio::test]
async fn manage_resources_stores_inputs() {
    let mut h = Harness::new(vec![device(ID_A, "10.0.0.1", Some(true))]);
    h.orchestrator.load_all(false).await;
    h.orchestrator.select(Some(ID_A)).unwrap();

    let inputs = ResourceInputs {
        static_resource: "/redfish/v1/Systems".into(),
        dynamic_resource: "/redfish/v1/Chassis/1/Thermal".into(),
    };
    h.orchestrator.manage_resources(inputs.clone()).unwrap();

    assert_eq!(h.orchestrator.resources(), &inputs);
    assert_eq!(h.last_message().unwrap(), "Configurations saved");
}
