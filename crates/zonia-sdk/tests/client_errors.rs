use std::sync::Arc;
use zonia_sdk::{
    AgentError, ErrorKind, GetThreadInput, Locator, PaginationState, RejectCode, SdkConfig,
    ZoniaClient,
};
use zonia_testkit::{aggregator_for, client_for, InMemoryCanister};

#[tokio::test]
async fn malformed_config_is_invalid_input() {
    let canister = InMemoryCanister::new();
    let configs = [
        SdkConfig::new("definitely not a principal"),
        canister.config().with_host("localhost:4943"),
        canister.config().with_page_limit(0),
    ];

    for config in configs {
        let err = ZoniaClient::new(config, Arc::new(canister.clone())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}

#[tokio::test]
async fn rejects_are_normalized() {
    let canister = InMemoryCanister::new();
    let client = client_for(&canister).unwrap();
    let cases = [
        (AgentError::rejected(RejectCode::DestinationInvalid, "no canister"), ErrorKind::NotFound),
        (
            AgentError::rejected(RejectCode::CanisterReject, "channel not found"),
            ErrorKind::NotFound,
        ),
        (
            AgentError::rejected(RejectCode::CanisterReject, "limit too large"),
            ErrorKind::InvalidInput,
        ),
        (AgentError::rejected(RejectCode::CanisterError, "trap"), ErrorKind::Internal),
        (AgentError::Transport("timed out".into()), ErrorKind::Internal),
    ];

    for (raw, expected) in cases {
        canister.fail_next(raw);
        let err = client.get_thread(GetThreadInput::new("c1")).await.unwrap_err();
        assert_eq!(err.kind(), expected, "{err}");
    }
}

#[tokio::test]
async fn wrong_canister_is_not_found() {
    let canister = InMemoryCanister::new();
    let other = SdkConfig::new("ryjl3-tyaaa-aaaaa-aaaba-cai");
    let client = ZoniaClient::new(other, Arc::new(canister)).unwrap();

    let err = client.get_thread(GetThreadInput::new("c1")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn cursor_on_unknown_post_is_not_found() {
    let canister = InMemoryCanister::new();
    let client = client_for(&canister).unwrap();

    let err = client
        .get_thread(GetThreadInput::new("c1").after(Some("gone".into())))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn failed_initial_load_leaves_no_tree() {
    let canister = InMemoryCanister::new();
    canister.insert_comment("c1", "A", "a");
    let view = aggregator_for(&canister).unwrap();
    canister.reject_next(RejectCode::SysFatal, "replica down");

    let err = view.load_initial("c1", None, None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(view.channel_id().is_none());
    assert_eq!(view.snapshot().total_posts(), 0);
    assert_eq!(
        view.pagination(&Locator::root()),
        Some(PaginationState::NotLoaded)
    );
    let err = view.load_more(&Locator::root()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
