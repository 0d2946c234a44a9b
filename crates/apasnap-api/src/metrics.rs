use std::fmt::{self, Write};
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use uuid::Uuid;

use apasnap_core::MediaType;

use crate::state::{AppState, LoadStats};

struct SessionSample {
    id: Uuid,
    images: usize,
    videos: usize,
    manifest_mode: bool,
    uptime_secs: f64,
}

pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let sessions: Vec<_> = state
        .sessions
        .iter()
        .map(|e| Arc::clone(e.value()))
        .collect();

    let mut samples = Vec::with_capacity(sessions.len());
    for session in &sessions {
        let gallery = session.gallery.read().await;
        let count = |t: MediaType| gallery.items().iter().filter(|i| i.media_type == t).count();
        samples.push(SessionSample {
            id: session.id(),
            images: count(MediaType::Image),
            videos: count(MediaType::Video),
            manifest_mode: gallery.manifest_mode(),
            uptime_secs: (chrono::Utc::now() - session.created_at()).num_milliseconds() as f64
                / 1000.0,
        });
    }

    let mut out = String::with_capacity(2048);
    if let Err(e) = render(&mut out, &state, &samples) {
        tracing::error!(error = %e, "Failed to render metrics");
    }

    (
        [(
            header::CONTENT_TYPE,
            "application/openmetrics-text; version=1.0.0; charset=utf-8",
        )],
        out,
    )
}

fn render(out: &mut String, state: &AppState, samples: &[SessionSample]) -> fmt::Result {
    let stats = &state.stats;
    let counters = [
        ("apasnap_loads_started", "Gallery loads started", &stats.started),
        ("apasnap_loads_succeeded", "Gallery loads that produced items", &stats.succeeded),
        ("apasnap_loads_failed", "Gallery loads that ended in an error", &stats.failed),
        ("apasnap_loads_superseded", "Gallery load results discarded as stale", &stats.superseded),
        ("apasnap_items_enriched", "Images that received a GPS position", &stats.items_enriched),
    ];
    for (name, help, counter) in counters {
        writeln!(out, "# TYPE {name} counter")?;
        writeln!(out, "# HELP {name} {help}")?;
        writeln!(out, "{name}_total {}", LoadStats::get(counter))?;
    }

    writeln!(out, "# TYPE apasnap_sessions gauge")?;
    writeln!(out, "# HELP apasnap_sessions Number of open gallery sessions")?;
    writeln!(out, "apasnap_sessions {}", samples.len())?;

    writeln!(out, "# TYPE apasnap_session_items gauge")?;
    writeln!(out, "# HELP apasnap_session_items Items in the session collection by media type")?;
    for s in samples {
        for (media_type, count) in [(MediaType::Image, s.images), (MediaType::Video, s.videos)] {
            writeln!(
                out,
                "apasnap_session_items{{session_id=\"{}\",media_type=\"{}\"}} {}",
                s.id, media_type, count
            )?;
        }
    }

    writeln!(out, "# TYPE apasnap_session_manifest_mode gauge")?;
    writeln!(
        out,
        "# HELP apasnap_session_manifest_mode Whether the collection came from a manifest"
    )?;
    for s in samples {
        writeln!(
            out,
            "apasnap_session_manifest_mode{{session_id=\"{}\"}} {}",
            s.id,
            u8::from(s.manifest_mode)
        )?;
    }

    writeln!(out, "# TYPE apasnap_session_uptime_seconds gauge")?;
    writeln!(out, "# HELP apasnap_session_uptime_seconds Time since the session was created")?;
    for s in samples {
        writeln!(
            out,
            "apasnap_session_uptime_seconds{{session_id=\"{}\"}} {:.3}",
            s.id, s.uptime_secs
        )?;
    }

    writeln!(out, "# EOF")
}
