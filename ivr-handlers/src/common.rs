//! Shared helpers every handler family leans on: the answer-if-needed
//! entry contract (§4.4), sound-directory resolution, and the
//! DTMF-routing handoff via [`ivr_core::handler::ROUTE_KEY_VAR`].

use ivr_core::context::CallContext;
use ivr_core::host::AppArgs;

const DEFAULT_SOUNDS_DIR: &str = "/usr/local/freeswitch/sounds";
const AUDIO_FILES_DIR: &str = "ivr_audiofiles_tts_new";

/// Answer the call and wait for media if it hasn't been already. Every
/// handler family calls this first, per the §4.4 shared contract.
pub async fn ensure_answered(ctx: &dyn CallContext) {
    if !ctx.host().answered().await {
        ctx.host().answer().await;
        ctx.host()
            .execute("wait_for_silence", AppArgs::new(["500", "1000", "5", "100"]))
            .await;
    }
}

/// Resolve `filename` against the host's configured sound directory,
/// falling back to a conventional default if the host has none set.
async fn sounds_dir(ctx: &dyn CallContext) -> String {
    ctx.host()
        .global_variable("sounds_dir")
        .await
        .unwrap_or_else(|| DEFAULT_SOUNDS_DIR.to_string())
}

/// Resolve a prompt/menu `filename` under the host's configured sound
/// directory's `ivr_audiofiles_tts_new/` subdirectory — the convention
/// every recorded-prompt node (opcodes 10/11/30/31, `InvalidInputAudioFile`)
/// plays from.
pub async fn resolve_sound_path(ctx: &dyn CallContext, filename: &str) -> String {
    format!("{}/{AUDIO_FILES_DIR}/{filename}", sounds_dir(ctx).await)
}

/// Resolve a path under the host's configured sound directory directly,
/// with no subdirectory prepended — for conventions like digit-by-digit
/// playback (`digits/{d}.wav`) that live outside `ivr_audiofiles_tts_new/`.
pub async fn resolve_sound_path_raw(ctx: &dyn CallContext, relative: &str) -> String {
    format!("{}/{relative}", sounds_dir(ctx).await)
}

/// Record the digits (or branch label) a handler selected so the
/// interpreter can perform DTMF-keyed edge lookup after this node's
/// `execute` returns [`ivr_core::handler::HandlerOutcome::Continue`].
pub async fn set_route_key(ctx: &dyn CallContext, key: impl Into<String>) {
    ctx.set_variable(ivr_core::handler::ROUTE_KEY_VAR, key.into(), false)
        .await;
}
