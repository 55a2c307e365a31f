//! Workspace-level integration tests: a call driven end-to-end through
//! the public `ivr` crate, config documents on disk, no host-session
//! mocking beyond `MockHostSession`.

use ivr::ivr_config::FileNames;
use ivr_core::test_utils::{MockHostSession, RecordedCall};
use std::io::Write;
use std::sync::Arc;

fn write_file(dir: &std::path::Path, name: &str, contents: &str) {
    let mut f = std::fs::File::create(dir.join(name)).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
}

fn names() -> FileNames {
    FileNames {
        ivr: "ivr.json".to_string(),
        webapi: "webapi.json".to_string(),
        extensions: "ext.json".to_string(),
        recording: "rec.json".to_string(),
    }
}

const MENU_FLOW: &str = r#"{
    "IVRConfiguration": [{
        "IVRProcessFlow": [
            {"NodeId": 1, "OperationCode": 31, "IsStartNode": true,
             "ChildNodeConfig": [
                {"ChildNodeId": 2, "InputKeys": "1"},
                {"ChildNodeId": 3, "InputKeys": "2"}
             ],
             "AudioFile": "menu.wav", "MaxDigits": 1, "Timeout": 5000},
            {"NodeId": 2, "OperationCode": 10, "IsStartNode": false,
             "ChildNodeConfig": [{"ChildNodeId": 4}], "AudioFile": "sales.wav"},
            {"NodeId": 3, "OperationCode": 10, "IsStartNode": false,
             "ChildNodeConfig": [{"ChildNodeId": 4}], "AudioFile": "support.wav"},
            {"NodeId": 4, "OperationCode": 200, "IsStartNode": false, "ChildNodeConfig": []}
        ],
        "GeneralSettingValues": {}
    }]
}"#;

#[tokio::test]
async fn full_call_through_bootstrapped_engine_routes_on_dtmf() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "ivr.json", MENU_FLOW);
    write_file(dir.path(), "webapi.json", r#"{"result": {}}"#);
    write_file(dir.path(), "ext.json", "{}");
    write_file(dir.path(), "rec.json", "{}");

    let engine = ivr::bootstrap::Engine::new(dir.path(), names());
    let (_, errs) = engine.load().await;
    assert!(errs.is_empty(), "{errs:?}");

    let interpreter = engine.interpreter().await.unwrap();
    let host = Arc::new(MockHostSession::new().with_global("sounds_dir", "/snd"));
    host.queue_digits("2");
    let ctx = engine.begin_call(host.clone()).await.unwrap();

    interpreter.start(&ctx).await.unwrap();

    let calls = host.calls();
    assert!(calls.contains(&RecordedCall::Execute("playback".to_string(), vec!["/snd/ivr_audiofiles_tts_new/support.wav".to_string()])));
    assert!(!calls.contains(&RecordedCall::Execute("playback".to_string(), vec!["/snd/ivr_audiofiles_tts_new/sales.wav".to_string()])));
    assert!(calls.contains(&RecordedCall::Hangup));
}

#[tokio::test]
async fn reload_picks_up_a_changed_flow_for_the_next_call() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "ivr.json", MENU_FLOW);
    write_file(dir.path(), "webapi.json", r#"{"result": {}}"#);
    write_file(dir.path(), "ext.json", "{}");
    write_file(dir.path(), "rec.json", "{}");

    let engine = ivr::bootstrap::Engine::new(dir.path(), names());
    engine.load().await;

    let updated = MENU_FLOW.replace("sales.wav", "sales_v2.wav");
    write_file(dir.path(), "ivr.json", &updated);
    engine.config().reload(ivr::ivr_config::DocumentName::Ivr).await.unwrap();

    let interpreter = engine.interpreter().await.unwrap();
    let host = Arc::new(MockHostSession::new().with_global("sounds_dir", "/snd"));
    host.queue_digits("1");
    let ctx = engine.begin_call(host.clone()).await.unwrap();

    interpreter.start(&ctx).await.unwrap();

    assert!(host
        .calls()
        .contains(&RecordedCall::Execute("playback".to_string(), vec!["/snd/ivr_audiofiles_tts_new/sales_v2.wav".to_string()])));
}
