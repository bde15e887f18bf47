use serde::Deserialize;

/// Progress report sent by [`progress_watch_script`].
#[derive(Debug, Clone, Deserialize)]
pub(super) struct ProgressMessage {
    pub key: String,
    pub event: String,
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub duration: f64,
}

pub(super) fn audio_element_id(key: &str) -> String {
    format!("audio-{key}")
}

/// Pause every other track, rewind this one and start it.
///
/// Resolves to `playing`, `blocked` (autoplay refused) or `error`.
pub(super) fn play_script(key: &str) -> String {
    let id = audio_element_id(key);
    format!(
        r#"(async function() {{
                    const target = document.getElementById({id:?});
                    if (!target) return "error";
                    document.querySelectorAll("audio.story-audio").forEach((el) => {{
                        if (el !== target) {{
                            el.pause();
                        }}
                    }});
                    target.currentTime = 0;
                    try {{
                        await target.play();
                        return "playing";
                    }} catch (err) {{
                        return err && err.name === "NotAllowedError" ? "blocked" : "error";
                    }}
                }})()"#,
    )
}

/// Retry a refused playback on the next click anywhere in the document.
///
/// Sends `playing` or `error` once the retry settles.
pub(super) fn gesture_retry_script(key: &str) -> String {
    let id = audio_element_id(key);
    format!(
        r#"(function() {{
                    const retry = async () => {{
                        const target = document.getElementById({id:?});
                        if (!target) {{
                            dioxus.send("error");
                            return;
                        }}
                        try {{
                            await target.play();
                            dioxus.send("playing");
                        }} catch (err) {{
                            dioxus.send("error");
                        }}
                    }};
                    document.addEventListener("click", retry, {{ once: true }});
                }})();"#,
    )
}

/// Stream `timeupdate`, `play` and `ended` events of every story track.
pub(super) fn progress_watch_script() -> &'static str {
    r#"(function() {
                    const report = (el, event) => {
                        dioxus.send({
                            key: el.dataset.key,
                            event: event,
                            current: el.currentTime || 0,
                            duration: isFinite(el.duration) ? el.duration : 0,
                        });
                    };
                    document.querySelectorAll("audio.story-audio").forEach((el) => {
                        if (el.dataset.watched) return;
                        el.dataset.watched = "1";
                        el.addEventListener("timeupdate", () => report(el, "timeupdate"));
                        el.addEventListener("play", () => report(el, "play"));
                        el.addEventListener("ended", () => report(el, "ended"));
                    });
                })();"#
}

pub(super) fn focus_story_script() -> &'static str {
    r#"document.getElementById("story-root")?.focus();"#
}
