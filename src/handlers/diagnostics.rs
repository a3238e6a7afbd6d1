use crate::{models::{DiagnosticsResponse, ErrorResponse}, state::AppState};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use std::sync::{Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Live session counters plus host load
pub async fn diagnostics(
    State(app_state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<DiagnosticsResponse>), (StatusCode, Json<ErrorResponse>)> {

    let stats = app_state.registry().stats().await;

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| {
            Mutex::new(System::new_all())
        });
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0)
        }
    };

    info!(
        "Diagnostics: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Sessions: {}",
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        stats.n_conn,
        stats.n_sessions
    );

    Ok((
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_conn: stats.n_conn,
            n_sessions: stats.n_sessions,
            n_presence: stats.n_presence,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    ))
}
