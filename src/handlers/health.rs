/// Liveness check
/// GET /api/health
pub async fn health() -> &'static str {
    "OK"
}
