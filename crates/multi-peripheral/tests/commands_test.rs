// Integration tests for session command wrapping: id scoping, payload
// encoding and pass-through of engine failures

mod common;

use common::{Call, ScriptedEngine};
use multi_ble_peripheral::codec;
use multi_ble_peripheral::{
    Advertisement, AdvertiseMode, AdvertiseOptions, AdvertiseServices, EngineError,
    PeripheralHost, RadioState, TxPowerLevel,
};
use std::collections::BTreeMap;

#[tokio::test]
async fn test_advertising_encodes_services_and_manufacturer_data() {
    let engine = ScriptedEngine::new();
    let host = PeripheralHost::new(engine.clone());
    let session = host.create_session().unwrap();
    session.settled().await;

    let advertisement = Advertisement::new()
        .with_services(
            AdvertiseServices::new()
                .with_uuid("180D")
                .with_data("FEAA", vec![0x10, 0x00, 0x01]),
        )
        .with_options(
            AdvertiseOptions::new()
                .mode(AdvertiseMode::LowLatency)
                .tx_power_level(TxPowerLevel::High)
                .connectable(true)
                .include_device_name(true)
                .manufacturer(0xFFFF, b"hi".to_vec()),
        );
    session.start_advertising(&advertisement).await.unwrap();

    let call = engine
        .calls()
        .into_iter()
        .find(|call| matches!(call, Call::StartAdvertising { .. }))
        .unwrap();
    let Call::StartAdvertising { id, services, options } = call else {
        unreachable!()
    };

    assert_eq!(id, session.id());
    let mut expected_services = BTreeMap::new();
    expected_services.insert("180D".to_string(), None);
    expected_services.insert("FEAA".to_string(), Some(codec::encode(&[0x10, 0x00, 0x01])));
    assert_eq!(services, Some(expected_services));

    assert_eq!(options.mode, Some(AdvertiseMode::LowLatency));
    assert_eq!(options.tx_power_level, Some(TxPowerLevel::High));
    assert_eq!(options.connectable, Some(true));
    assert_eq!(options.include_device_name, Some(true));
    assert_eq!(options.include_tx_power_level, None);
    assert_eq!(options.manufacturer_id, Some(0xFFFF));
    assert_eq!(options.manufacturer_data.as_deref(), Some("aGk="));
}

#[tokio::test]
async fn test_empty_service_map_is_distinct_from_no_services() {
    let engine = ScriptedEngine::new();
    let host = PeripheralHost::new(engine.clone());
    let session = host.create_session().unwrap();
    session.settled().await;

    session
        .start_advertising(&Advertisement::new().with_services(AdvertiseServices::new()))
        .await
        .unwrap();
    session.start_advertising(&Advertisement::new()).await.unwrap();

    let services: Vec<_> = engine
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::StartAdvertising { services, .. } => Some(services),
            _ => None,
        })
        .collect();
    assert_eq!(services, vec![Some(BTreeMap::new()), None]);
}

#[tokio::test]
async fn test_value_payloads_are_encoded() {
    let engine = ScriptedEngine::new();
    let host = PeripheralHost::new(engine.clone());
    let session = host.create_session().unwrap();
    session.settled().await;
    let id = session.id();

    session.update_value("180D", "2A37", &[0x00, 0x48]).await.unwrap();
    session.notify("180D", "2A37", &[0x00, 0x49]).await.unwrap();
    session
        .send_notification("180D", "2A37", &[0x00, 0x4A], true)
        .await
        .unwrap();
    session
        .send_response("AA:BB", 7, 0, 2, b"ok")
        .await
        .unwrap();
    session.stop_advertising().await.unwrap();

    let calls = engine.calls();
    assert!(calls.contains(&Call::UpdateValue {
        id,
        service_uuid: "180D".to_string(),
        characteristic_uuid: "2A37".to_string(),
        value: codec::encode(&[0x00, 0x48]),
    }));
    assert!(calls.contains(&Call::SendNotification {
        id,
        service_uuid: "180D".to_string(),
        characteristic_uuid: "2A37".to_string(),
        value: codec::encode(&[0x00, 0x49]),
        is_indication: false,
    }));
    assert!(calls.contains(&Call::SendNotification {
        id,
        service_uuid: "180D".to_string(),
        characteristic_uuid: "2A37".to_string(),
        value: codec::encode(&[0x00, 0x4A]),
        is_indication: true,
    }));
    assert!(calls.contains(&Call::SendResponse {
        id,
        device: "AA:BB".to_string(),
        request_id: 7,
        status: 0,
        offset: 2,
        value: "b2s=".to_string(),
    }));
    assert_eq!(calls.last(), Some(&Call::StopAdvertising(id)));
}

#[tokio::test]
async fn test_commands_are_scoped_to_their_session() {
    let engine = ScriptedEngine::new();
    let host = PeripheralHost::new(engine.clone());
    let first = host.create_session().unwrap();
    let second = host.create_session().unwrap();
    first.settled().await;
    second.settled().await;

    first.add_service("1111", true).await.unwrap();
    second.add_service("2222", false).await.unwrap();

    let services: Vec<_> = engine
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::AddService { id, uuid, .. } => Some((id, uuid)),
            _ => None,
        })
        .collect();
    assert_eq!(
        services,
        vec![
            (first.id(), "1111".to_string()),
            (second.id(), "2222".to_string())
        ]
    );
}

#[tokio::test]
async fn test_check_state_maps_engine_string() {
    let engine = ScriptedEngine::new();
    let host = PeripheralHost::new(engine.clone());
    let session = host.create_session().unwrap();
    session.settled().await;

    assert_eq!(session.check_state().await.unwrap(), RadioState::PoweredOn);

    engine.set_state("unauthorized");
    assert_eq!(session.check_state().await.unwrap(), RadioState::Unauthorized);

    engine.set_state("STATE_TURNING_ON");
    assert_eq!(
        session.check_state().await.unwrap(),
        RadioState::Other("STATE_TURNING_ON".to_string())
    );
}

#[tokio::test]
async fn test_command_failures_pass_through_unchanged() {
    let engine = ScriptedEngine::new();
    let host = PeripheralHost::new(engine.clone());
    let session = host.create_session().unwrap();
    session.settled().await;

    let rejection = EngineError::with_code("ADVERTISE_FAILED", "too many advertisers");
    engine.fail_commands_with(rejection.clone());

    let err = session
        .start_advertising(&Advertisement::new())
        .await
        .unwrap_err();
    assert_eq!(err.as_engine(), Some(&rejection));
    assert_eq!(err.to_string(), rejection.to_string());

    let err = session.check_state().await.unwrap_err();
    assert_eq!(err.as_engine(), Some(&rejection));

    // No retry: one call per invocation
    let advertise_calls = engine
        .calls()
        .iter()
        .filter(|call| matches!(call, Call::StartAdvertising { .. }))
        .count();
    assert_eq!(advertise_calls, 1);
}

#[tokio::test]
async fn test_set_device_name_is_process_wide() {
    let engine = ScriptedEngine::new();
    let host = PeripheralHost::new(engine.clone());

    host.set_device_name("Multi Sensor").await.unwrap();
    assert_eq!(engine.calls(), vec![Call::SetDeviceName("Multi Sensor".to_string())]);
}
